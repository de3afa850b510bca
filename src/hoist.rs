//! Declaration hoisting analysis
//!
//! `var` declarations are hoisted to the top of their function scope, function
//! declarations to the top of their enclosing body or block, and `let`/`const`
//! create uninitialized bindings when their block is entered. The parser runs
//! these passes once per body and stores the result on the AST so that the
//! evaluator can instantiate scopes without walking statements again.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::ast::{
    BlockScope, ExportDeclaration, ForInOfLeft, ForInit, FunctionNode, LexicalName, Statement,
    VarScope, VariableDeclaration, VariableKind,
};
use crate::value::{CheapClone, JsString};

/// Build the hoisting record of a function body, script or module
pub fn var_scope(body: &[Statement]) -> VarScope {
    let mut var_names = Vec::new();
    collect_hoisted_vars(body, &mut var_names);
    dedup(&mut var_names);

    let mut functions = Vec::new();
    let mut lexical = Vec::new();
    for stmt in body {
        collect_top_level(stmt, &mut functions, &mut lexical);
    }

    // Later declarations of the same name replace earlier ones
    let mut seen = FxHashSet::default();
    let mut deduped: Vec<Rc<FunctionNode>> = Vec::new();
    for func in functions.into_iter().rev() {
        let name = function_binding_name(&func);
        if seen.insert(name) {
            deduped.push(func);
        }
    }
    deduped.reverse();

    let mut block_functions = Vec::new();
    for stmt in body {
        collect_block_functions(stmt, false, &mut block_functions);
    }
    dedup(&mut block_functions);

    VarScope {
        var_names,
        functions: deduped,
        lexical,
        block_functions,
    }
}

/// Build the lexical scope of a block. Returns None when nothing is declared.
pub fn block_scope<'a>(body: impl IntoIterator<Item = &'a Statement>) -> Option<Rc<BlockScope>> {
    let mut scope = BlockScope::default();
    for stmt in body {
        match stmt {
            Statement::VariableDeclaration(decl) if decl.kind != VariableKind::Var => {
                push_lexical(decl, &mut scope.lexical);
            }
            Statement::FunctionDeclaration(func) => scope.functions.push(func.cheap_clone()),
            _ => {}
        }
    }
    if scope.is_empty() {
        None
    } else {
        Some(Rc::new(scope))
    }
}

/// Name a hoisted function declaration binds (`*default*` for anonymous default exports)
pub fn function_binding_name(func: &FunctionNode) -> JsString {
    match &func.id {
        Some(id) => id.name.cheap_clone(),
        None => JsString::from("*default*"),
    }
}

fn dedup(names: &mut Vec<JsString>) {
    let mut seen = FxHashSet::default();
    names.retain(|name| seen.insert(name.cheap_clone()));
}

fn push_lexical(decl: &VariableDeclaration, out: &mut Vec<LexicalName>) {
    let constant = decl.kind == VariableKind::Const;
    let mut names = Vec::new();
    for declarator in &decl.declarations {
        declarator.id.collect_bound_names(&mut names);
    }
    out.extend(names.into_iter().map(|name| LexicalName { name, constant }));
}

fn collect_top_level(
    stmt: &Statement,
    functions: &mut Vec<Rc<FunctionNode>>,
    lexical: &mut Vec<LexicalName>,
) {
    match stmt {
        Statement::FunctionDeclaration(func) => functions.push(func.cheap_clone()),
        Statement::VariableDeclaration(decl) if decl.kind != VariableKind::Var => {
            push_lexical(decl, lexical);
        }
        Statement::Export(export) => match export.as_ref() {
            ExportDeclaration::Declaration(inner) => collect_top_level(inner, functions, lexical),
            ExportDeclaration::DefaultFunction(func) => functions.push(func.cheap_clone()),
            _ => {}
        },
        _ => {}
    }
}

/// Recursively collect all var declaration names from statements.
/// Function bodies are separate scopes and are not entered.
fn collect_hoisted_vars(statements: &[Statement], names: &mut Vec<JsString>) {
    for stmt in statements {
        collect_hoisted_vars_stmt(stmt, names);
    }
}

fn collect_hoisted_vars_stmt(stmt: &Statement, names: &mut Vec<JsString>) {
    match stmt {
        Statement::VariableDeclaration(decl) => {
            if decl.kind == VariableKind::Var {
                collect_hoisted_vars_decl(decl, names);
            }
        }
        Statement::Block(block) => collect_hoisted_vars(&block.body, names),
        Statement::If(if_stmt) => {
            collect_hoisted_vars_stmt(&if_stmt.consequent, names);
            if let Some(alt) = &if_stmt.alternate {
                collect_hoisted_vars_stmt(alt, names);
            }
        }
        Statement::While(loop_stmt) | Statement::DoWhile(loop_stmt) => {
            collect_hoisted_vars_stmt(&loop_stmt.body, names);
        }
        Statement::For(for_stmt) => {
            if let Some(ForInit::Variable(decl)) = &for_stmt.init
                && decl.kind == VariableKind::Var
            {
                collect_hoisted_vars_decl(decl, names);
            }
            collect_hoisted_vars_stmt(&for_stmt.body, names);
        }
        Statement::ForIn(for_stmt) | Statement::ForOf(for_stmt) => {
            if let ForInOfLeft::Variable(VariableKind::Var, pattern) = &for_stmt.left {
                pattern.collect_bound_names(names);
            }
            collect_hoisted_vars_stmt(&for_stmt.body, names);
        }
        Statement::Switch(switch_stmt) => {
            for case in &switch_stmt.cases {
                collect_hoisted_vars(&case.consequent, names);
            }
        }
        Statement::Try(try_stmt) => {
            collect_hoisted_vars(&try_stmt.block.body, names);
            if let Some(handler) = &try_stmt.handler {
                collect_hoisted_vars(&handler.body.body, names);
            }
            if let Some(finalizer) = &try_stmt.finalizer {
                collect_hoisted_vars(&finalizer.body, names);
            }
        }
        Statement::With(with_stmt) => collect_hoisted_vars_stmt(&with_stmt.body, names),
        Statement::Labeled(labeled) => collect_hoisted_vars_stmt(&labeled.body, names),
        Statement::Export(export) => {
            if let ExportDeclaration::Declaration(inner) = export.as_ref() {
                collect_hoisted_vars_stmt(inner, names);
            }
        }
        Statement::FunctionDeclaration(_)
        | Statement::Return(..)
        | Statement::Break(..)
        | Statement::Continue(..)
        | Statement::Throw(..)
        | Statement::Import(_)
        | Statement::Expression(..)
        | Statement::Empty
        | Statement::Debugger => {}
    }
}

fn collect_hoisted_vars_decl(decl: &VariableDeclaration, names: &mut Vec<JsString>) {
    for declarator in &decl.declarations {
        declarator.id.collect_bound_names(names);
    }
}

/// Function declarations nested in blocks, switch cases and labels
fn collect_block_functions(stmt: &Statement, nested: bool, names: &mut Vec<JsString>) {
    match stmt {
        Statement::FunctionDeclaration(func) if nested => {
            if let Some(id) = &func.id
                && !func.generator
                && !func.async_
            {
                names.push(id.name.cheap_clone());
            }
        }
        Statement::Block(block) => {
            for s in block.body.iter() {
                collect_block_functions(s, true, names);
            }
        }
        Statement::If(if_stmt) => {
            collect_block_functions(&if_stmt.consequent, true, names);
            if let Some(alt) = &if_stmt.alternate {
                collect_block_functions(alt, true, names);
            }
        }
        Statement::While(loop_stmt) | Statement::DoWhile(loop_stmt) => {
            collect_block_functions(&loop_stmt.body, true, names);
        }
        Statement::For(for_stmt) => collect_block_functions(&for_stmt.body, true, names),
        Statement::ForIn(for_stmt) | Statement::ForOf(for_stmt) => {
            collect_block_functions(&for_stmt.body, true, names);
        }
        Statement::Switch(switch_stmt) => {
            for case in &switch_stmt.cases {
                for s in case.consequent.iter() {
                    collect_block_functions(s, true, names);
                }
            }
        }
        Statement::Try(try_stmt) => {
            for s in try_stmt.block.body.iter() {
                collect_block_functions(s, true, names);
            }
            if let Some(handler) = &try_stmt.handler {
                for s in handler.body.body.iter() {
                    collect_block_functions(s, true, names);
                }
            }
            if let Some(finalizer) = &try_stmt.finalizer {
                for s in finalizer.body.iter() {
                    collect_block_functions(s, true, names);
                }
            }
        }
        Statement::With(with_stmt) => collect_block_functions(&with_stmt.body, true, names),
        Statement::Labeled(labeled) => collect_block_functions(&labeled.body, nested, names),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SourceType;
    use crate::parser::Parser;
    use crate::string_dict::StringDict;

    fn scope_of(source: &str) -> Rc<VarScope> {
        let mut dict = StringDict::new();
        let program = Parser::new(source, &mut dict)
            .parse_program(SourceType::Script)
            .expect("parse");
        program.scope
    }

    fn names(list: &[JsString]) -> Vec<&str> {
        list.iter().map(JsString::as_str).collect()
    }

    #[test]
    fn test_vars_hoist_out_of_blocks_but_not_functions() {
        let scope = scope_of(
            "var a; { var b; } for (var c = 0;;) {} for (var d of []) {} \
             function f() { var inner; } try { var e } catch (x) { var g }",
        );
        assert_eq!(names(&scope.var_names), vec!["a", "b", "c", "d", "e", "g"]);
    }

    #[test]
    fn test_last_function_declaration_wins() {
        let scope = scope_of("function f() { return 1 } function g() {} function f() { return 2 }");
        assert_eq!(scope.functions.len(), 2);
        let last = scope.functions.last().map(|f| function_binding_name(f));
        assert_eq!(last, Some(JsString::from("f")));
    }

    #[test]
    fn test_lexical_and_block_functions() {
        let scope = scope_of("let x = 1; const y = 2; if (true) { function inner() {} }");
        assert_eq!(scope.lexical.len(), 2);
        assert!(scope.lexical.iter().any(|l| l.name == "y" && l.constant));
        assert_eq!(names(&scope.block_functions), vec!["inner"]);
    }
}
