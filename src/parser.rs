//! Parser for JavaScript source code
//!
//! Uses recursive descent with Pratt parsing for binary expressions. Besides
//! building the AST the parser resolves the cover grammars (arrow heads and
//! destructuring assignment), tracks strictness from directive prologues,
//! computes the hoisting record of every body and reports early errors.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::ast::*;
use crate::error::JsError;
use crate::hoist;
use crate::lexer::{Lexer, LexerCheckpoint, Span, Token, TokenKind};
use crate::string_dict::StringDict;
use crate::value::{CheapClone, JsString, number_to_string};

/// Words that may not be used as binding names in strict mode code
const STRICT_RESERVED: &[&str] = &[
    "implements",
    "interface",
    "package",
    "private",
    "protected",
    "public",
    "static",
];

#[derive(Debug, Clone)]
struct Label {
    name: JsString,
    is_loop: bool,
}

/// State that resets at every function boundary
#[derive(Debug, Clone, Default)]
struct FunctionContext {
    in_function: bool,
    generator: bool,
    async_: bool,
    /// `new.target` is valid (any non-arrow function, or an arrow inside one)
    new_target: bool,
    labels: Vec<Label>,
    breakable_depth: u32,
    iteration_depth: u32,
}

/// Everything speculative parsing has to roll back
struct ParserSnapshot {
    lexer: LexerCheckpoint,
    current: Token,
    previous: Token,
    cover_errors: usize,
}

/// Parser for JavaScript source code
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
    strict: bool,
    module: bool,
    ctx: FunctionContext,
    /// Labels pushed directly in front of the statement being parsed
    pending_labels: usize,
    /// Nesting of blocks and sub-statements within the current body
    statement_depth: u32,
    /// `in` is not a binary operator while parsing a for-statement head
    no_in: bool,
    /// Shorthand initializers (`{ a = 1 }`) not yet turned into patterns
    cover_errors: Vec<Span>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, string_dict: &'a mut StringDict) -> Self {
        let mut lexer = Lexer::new(source, string_dict);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            previous: Token::eof(0, 1, 1),
            strict: false,
            module: false,
            ctx: FunctionContext::default(),
            pending_labels: 0,
            statement_depth: 0,
            no_in: false,
            cover_errors: Vec::new(),
        }
    }

    /// Treat a script as strict code even without a directive
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Helper to intern a string in the dictionary
    #[inline]
    fn intern(&mut self, s: &str) -> JsString {
        self.lexer.string_dict().get_or_insert(s)
    }

    /// Parse a complete program
    pub fn parse_program(&mut self, source_type: SourceType) -> Result<Program, JsError> {
        self.module = source_type == SourceType::Module;
        if self.module {
            self.strict = true;
            // Top-level await
            self.ctx.async_ = true;
        }

        let start = self.current.span;
        let body = self.parse_directives_and_statements(|p| p.is_at_end())?;

        if let Some(span) = self.cover_errors.first() {
            return Err(JsError::syntax_error(
                "Invalid shorthand property initializer",
                span.line,
                span.column,
            ));
        }

        let scope = hoist::var_scope(&body);
        let mut lexical_names: Vec<JsString> =
            scope.lexical.iter().map(|l| l.name.cheap_clone()).collect();
        if self.module {
            for stmt in &body {
                if let Statement::Import(import) = stmt {
                    lexical_names.extend(import.specifiers.iter().map(|s| s.local().cheap_clone()));
                }
            }
        }
        let mut var_like = scope.var_names.clone();
        var_like.extend(scope.functions.iter().map(|f| hoist::function_binding_name(f)));
        self.check_lexical_conflicts(&lexical_names, &var_like, start)?;

        if self.module {
            self.check_module_exports(&body, &scope, &lexical_names)?;
        }

        Ok(Program {
            body: body.into(),
            source_type,
            strict: self.strict,
            scope: Rc::new(scope),
        })
    }

    /// Parse a statement list that may open with a directive prologue.
    /// Switches the parser to strict mode when `"use strict"` is found.
    fn parse_directives_and_statements(
        &mut self,
        at_end: impl Fn(&Self) -> bool,
    ) -> Result<Vec<Statement>, JsError> {
        let mut body = Vec::new();
        let mut in_prologue = true;

        while !at_end(self) {
            if self.is_at_end() {
                return Err(self.unexpected_token("'}'"));
            }
            if in_prologue {
                if let TokenKind::String(_) = self.current.kind {
                    let token_span = self.current.span;
                    let raw = self
                        .lexer
                        .source()
                        .get(token_span.start..token_span.end)
                        .unwrap_or("");
                    let is_use_strict = raw == "'use strict'" || raw == "\"use strict\"";
                    let stmt = self.parse_statement()?;
                    let is_directive = matches!(
                        &stmt,
                        Statement::Expression(Expression::Literal(LiteralValue::String(_), span), _)
                            if span.start == token_span.start && span.end == token_span.end
                    );
                    if is_directive {
                        if is_use_strict {
                            self.strict = true;
                        }
                    } else {
                        in_prologue = false;
                    }
                    body.push(stmt);
                    continue;
                }
                in_prologue = false;
            }
            body.push(self.parse_statement()?);
        }

        Ok(body)
    }

    /// Run `f` with a fresh function context, restoring the outer one afterwards
    fn with_function_context<T>(
        &mut self,
        ctx: FunctionContext,
        f: impl FnOnce(&mut Self) -> Result<T, JsError>,
    ) -> Result<T, JsError> {
        let saved_ctx = std::mem::replace(&mut self.ctx, ctx);
        let saved_strict = self.strict;
        let saved_pending = std::mem::take(&mut self.pending_labels);
        let saved_depth = std::mem::take(&mut self.statement_depth);
        let saved_no_in = std::mem::take(&mut self.no_in);
        let result = f(self);
        self.ctx = saved_ctx;
        self.strict = saved_strict;
        self.pending_labels = saved_pending;
        self.statement_depth = saved_depth;
        self.no_in = saved_no_in;
        result
    }

    /// Run `f` with the `in` operator allowed (inside brackets, parens, bodies)
    fn allow_in<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, JsError>,
    ) -> Result<T, JsError> {
        let saved = std::mem::take(&mut self.no_in);
        let result = f(self);
        self.no_in = saved;
        result
    }

    fn snapshot(&self) -> ParserSnapshot {
        ParserSnapshot {
            lexer: self.lexer.checkpoint(),
            current: self.current.clone(),
            previous: self.previous.clone(),
            cover_errors: self.cover_errors.len(),
        }
    }

    fn restore(&mut self, snapshot: ParserSnapshot) {
        self.lexer.restore(snapshot.lexer);
        self.current = snapshot.current;
        self.previous = snapshot.previous;
        self.cover_errors.truncate(snapshot.cover_errors);
    }

    // ============ STATEMENTS ============

    fn parse_statement(&mut self) -> Result<Statement, JsError> {
        let pending = std::mem::take(&mut self.pending_labels);

        // Labeled statement (identifier followed by colon)
        if self.check_identifier_reference() && self.peek_is(&TokenKind::Colon) {
            self.pending_labels = pending;
            return self.parse_labeled_statement();
        }

        match self.current.kind.clone() {
            TokenKind::Var | TokenKind::Const => Ok(Statement::VariableDeclaration(
                self.parse_variable_declaration()?,
            )),
            TokenKind::Let if self.let_starts_declaration() => Ok(
                Statement::VariableDeclaration(self.parse_variable_declaration()?),
            ),
            TokenKind::Function => Ok(Statement::FunctionDeclaration(
                self.parse_function_declaration(false)?,
            )),
            TokenKind::Identifier(name) if name == "async" && self.async_function_follows() => {
                self.advance(); // consume 'async'
                Ok(Statement::FunctionDeclaration(
                    self.parse_function_declaration(true)?,
                ))
            }
            TokenKind::Class => Err(self.unsupported("class syntax")),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::For => {
                self.mark_loop_labels(pending);
                self.parse_for_statement()
            }
            TokenKind::While => {
                self.mark_loop_labels(pending);
                self.parse_while_statement()
            }
            TokenKind::Do => {
                self.mark_loop_labels(pending);
                self.parse_do_while_statement()
            }
            TokenKind::Switch => self.parse_switch_statement(),
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::With => self.parse_with_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Break => self.parse_break_statement(),
            TokenKind::Continue => self.parse_continue_statement(),
            TokenKind::Throw => self.parse_throw_statement(),
            TokenKind::LBrace => Ok(Statement::Block(self.parse_block_statement()?)),
            TokenKind::Semicolon => {
                self.advance();
                Ok(Statement::Empty)
            }
            TokenKind::Debugger => {
                self.advance();
                self.expect_semicolon()?;
                Ok(Statement::Debugger)
            }
            TokenKind::Import
                if !self.peek_is(&TokenKind::LParen) && !self.peek_is(&TokenKind::Dot) =>
            {
                self.parse_import_declaration()
            }
            TokenKind::Export => self.parse_export_declaration(),
            _ => self.parse_expression_statement(),
        }
    }

    /// Body of `if`, loops, labels and `with`: no lexical declarations allowed
    fn parse_substatement(&mut self, allow_function: bool) -> Result<Statement, JsError> {
        self.statement_depth += 1;
        let result = self.parse_substatement_inner(allow_function);
        self.statement_depth -= 1;
        result
    }

    fn parse_substatement_inner(&mut self, allow_function: bool) -> Result<Statement, JsError> {
        match self.current.kind.clone() {
            TokenKind::Const => Err(self.error(
                "Lexical declaration cannot appear in a single-statement context",
            )),
            TokenKind::Let if self.let_starts_declaration() => Err(self.error(
                "Lexical declaration cannot appear in a single-statement context",
            )),
            TokenKind::Function if !allow_function || self.strict => Err(self.error(
                "In strict mode code, functions can only be declared at top level or inside a block",
            )),
            TokenKind::Function => {
                // Annex B: `if (x) function f() {}` behaves like a braced block
                let start = self.current.span;
                let func = self.parse_function_declaration(false)?;
                if func.generator || func.async_ {
                    return Err(JsError::syntax_error(
                        "Generator and async function declarations are not allowed here",
                        start.line,
                        start.column,
                    ));
                }
                let body: Rc<[Statement]> = Rc::from(vec![Statement::FunctionDeclaration(func)]);
                let scope = hoist::block_scope(body.iter());
                let span = self.span_from(start);
                Ok(Statement::Block(Rc::new(BlockStatement { body, scope, span })))
            }
            _ => self.parse_statement(),
        }
    }

    fn mark_loop_labels(&mut self, count: usize) {
        let len = self.ctx.labels.len();
        for label in self.ctx.labels.iter_mut().skip(len.saturating_sub(count)) {
            label.is_loop = true;
        }
    }

    /// `let` followed by a binding starts a declaration; otherwise it is an identifier
    fn let_starts_declaration(&mut self) -> bool {
        if self.strict {
            return true;
        }
        let checkpoint = self.lexer.checkpoint();
        let next = self.lexer.next_token();
        self.lexer.restore(checkpoint);
        matches!(
            next.kind,
            TokenKind::Identifier(_)
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Let
                | TokenKind::Yield
                | TokenKind::Await
        )
    }

    /// `async function` with no line break in between
    fn async_function_follows(&mut self) -> bool {
        let (next, newline) = self.peek_token();
        next.kind == TokenKind::Function && !newline
    }

    fn parse_variable_declaration(&mut self) -> Result<Rc<VariableDeclaration>, JsError> {
        let decl = self.parse_variable_declaration_list(false)?;
        self.expect_semicolon()?;
        Ok(decl)
    }

    /// Parse `var|let|const` and its declarators without the trailing semicolon.
    /// In a for-statement head initializers are optional and checked by the caller.
    fn parse_variable_declaration_list(
        &mut self,
        in_for_head: bool,
    ) -> Result<Rc<VariableDeclaration>, JsError> {
        let start = self.current.span;
        let kind = match self.current.kind {
            TokenKind::Var => VariableKind::Var,
            TokenKind::Let => VariableKind::Let,
            TokenKind::Const => VariableKind::Const,
            _ => return Err(self.unexpected_token("'var', 'let' or 'const'")),
        };
        self.advance();

        let mut declarations = Vec::new();
        loop {
            let decl_start = self.current.span;
            let id = self.parse_binding_target()?;
            if kind != VariableKind::Var {
                let mut names = Vec::new();
                id.collect_bound_names(&mut names);
                if names.iter().any(|n| n == "let") {
                    return Err(JsError::syntax_error(
                        "let is disallowed as a lexically bound name",
                        decl_start.line,
                        decl_start.column,
                    ));
                }
            }

            let init = if self.match_token(&TokenKind::Eq) {
                Some(self.parse_assignment_expression()?)
            } else {
                None
            };

            if init.is_none() && !in_for_head {
                if kind == VariableKind::Const {
                    return Err(JsError::syntax_error(
                        "Missing initializer in const declaration",
                        decl_start.line,
                        decl_start.column,
                    ));
                }
                if !matches!(id, Pattern::Identifier(_)) {
                    return Err(JsError::syntax_error(
                        "Missing initializer in destructuring declaration",
                        decl_start.line,
                        decl_start.column,
                    ));
                }
            }

            let span = self.span_from(decl_start);
            declarations.push(VariableDeclarator { id, init, span });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        let span = self.span_from(start);
        Ok(Rc::new(VariableDeclaration {
            kind,
            declarations,
            span,
        }))
    }

    fn parse_function_declaration(&mut self, is_async: bool) -> Result<Rc<FunctionNode>, JsError> {
        let start = if is_async {
            self.previous.span
        } else {
            self.current.span
        };
        self.require_token(&TokenKind::Function)?;
        let generator = self.match_token(&TokenKind::Star);
        if is_async && generator {
            return Err(self.unsupported("async generator function"));
        }
        let id = self.parse_binding_identifier()?;
        self.parse_function_rest(Some(id), FunctionKind::Normal, generator, is_async, start)
    }

    fn parse_if_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::If)?;
        self.require_token(&TokenKind::LParen)?;
        let test = self.allow_in(|p| p.parse_expression())?;
        self.require_token(&TokenKind::RParen)?;

        let consequent = self.parse_substatement(true)?;
        let alternate = if self.match_token(&TokenKind::Else) {
            Some(self.parse_substatement(true)?)
        } else {
            None
        };

        let span = self.span_from(start);
        Ok(Statement::If(Rc::new(IfStatement {
            test,
            consequent,
            alternate,
            span,
        })))
    }

    fn parse_loop_body(&mut self) -> Result<Statement, JsError> {
        self.ctx.breakable_depth += 1;
        self.ctx.iteration_depth += 1;
        let body = self.parse_substatement(false);
        self.ctx.breakable_depth -= 1;
        self.ctx.iteration_depth -= 1;
        body
    }

    fn parse_for_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::For)?;
        if self.check(&TokenKind::Await) {
            return Err(self.unsupported("for await loops"));
        }
        self.require_token(&TokenKind::LParen)?;

        // for (;;)
        if self.match_token(&TokenKind::Semicolon) {
            return self.parse_for_rest(None, start);
        }

        let is_declaration = match self.current.kind {
            TokenKind::Var | TokenKind::Const => true,
            TokenKind::Let => self.let_starts_declaration(),
            _ => false,
        };

        if is_declaration {
            self.no_in = true;
            let decl = self.parse_variable_declaration_list(true);
            self.no_in = false;
            let decl = decl?;

            let is_of = self.check_contextual("of");
            if is_of || self.check(&TokenKind::In) {
                let [declarator] = decl.declarations.as_slice() else {
                    return Err(self.error("Invalid left-hand side in for-in/of loop: must have a single binding"));
                };
                if declarator.init.is_some() {
                    return Err(JsError::syntax_error(
                        "for-in/of loop variable declaration may not have an initializer",
                        declarator.span.line,
                        declarator.span.column,
                    ));
                }
                let left = ForInOfLeft::Variable(decl.kind, declarator.id.cheap_clone());
                return self.parse_for_in_of_rest(left, is_of, start);
            }

            for declarator in &decl.declarations {
                if declarator.init.is_none() {
                    if decl.kind == VariableKind::Const {
                        return Err(JsError::syntax_error(
                            "Missing initializer in const declaration",
                            declarator.span.line,
                            declarator.span.column,
                        ));
                    }
                    if !matches!(declarator.id, Pattern::Identifier(_)) {
                        return Err(JsError::syntax_error(
                            "Missing initializer in destructuring declaration",
                            declarator.span.line,
                            declarator.span.column,
                        ));
                    }
                }
            }
            self.require_token(&TokenKind::Semicolon)?;
            return self.parse_for_rest(Some(ForInit::Variable(decl)), start);
        }

        let cover_mark = self.cover_errors.len();
        self.no_in = true;
        let init = self.parse_expression();
        self.no_in = false;
        let init = init?;

        let is_of = self.check_contextual("of");
        if is_of || self.check(&TokenKind::In) {
            let pattern = self.expression_to_pattern(&init)?;
            self.cover_errors.truncate(cover_mark);
            return self.parse_for_in_of_rest(ForInOfLeft::Pattern(pattern), is_of, start);
        }

        self.require_token(&TokenKind::Semicolon)?;
        self.parse_for_rest(Some(ForInit::Expression(init)), start)
    }

    /// Parse `test; update) body` after the initializer of a C-style for loop
    fn parse_for_rest(&mut self, init: Option<ForInit>, start: Span) -> Result<Statement, JsError> {
        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.allow_in(|p| p.parse_expression())?)
        };
        self.require_token(&TokenKind::Semicolon)?;

        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.allow_in(|p| p.parse_expression())?)
        };
        self.require_token(&TokenKind::RParen)?;

        let body = self.parse_loop_body()?;
        let span = self.span_from(start);
        Ok(Statement::For(Rc::new(ForStatement {
            init,
            test,
            update,
            body,
            span,
        })))
    }

    fn parse_for_in_of_rest(
        &mut self,
        left: ForInOfLeft,
        is_of: bool,
        start: Span,
    ) -> Result<Statement, JsError> {
        self.advance(); // consume 'of' / 'in'
        let right = if is_of {
            self.allow_in(|p| p.parse_assignment_expression())?
        } else {
            self.allow_in(|p| p.parse_expression())?
        };
        self.require_token(&TokenKind::RParen)?;

        let body = self.parse_loop_body()?;
        let span = self.span_from(start);
        let node = Rc::new(ForInOfStatement {
            left,
            right,
            body,
            span,
        });
        Ok(if is_of {
            Statement::ForOf(node)
        } else {
            Statement::ForIn(node)
        })
    }

    fn parse_while_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::While)?;
        self.require_token(&TokenKind::LParen)?;
        let test = self.allow_in(|p| p.parse_expression())?;
        self.require_token(&TokenKind::RParen)?;

        let body = self.parse_loop_body()?;
        let span = self.span_from(start);
        Ok(Statement::While(Rc::new(WhileStatement { test, body, span })))
    }

    fn parse_do_while_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::Do)?;

        let body = self.parse_loop_body()?;

        self.require_token(&TokenKind::While)?;
        self.require_token(&TokenKind::LParen)?;
        let test = self.allow_in(|p| p.parse_expression())?;
        self.require_token(&TokenKind::RParen)?;
        // The semicolon after do-while is always optional
        self.match_token(&TokenKind::Semicolon);

        let span = self.span_from(start);
        Ok(Statement::DoWhile(Rc::new(WhileStatement { test, body, span })))
    }

    fn parse_switch_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::Switch)?;
        self.require_token(&TokenKind::LParen)?;
        let discriminant = self.allow_in(|p| p.parse_expression())?;
        self.require_token(&TokenKind::RParen)?;
        self.require_token(&TokenKind::LBrace)?;

        self.ctx.breakable_depth += 1;
        self.statement_depth += 1;
        let cases = self.parse_switch_cases();
        self.ctx.breakable_depth -= 1;
        self.statement_depth -= 1;
        let cases = cases?;

        let scope = hoist::block_scope(cases.iter().flat_map(|c| c.consequent.iter()));
        if let Some(scope) = &scope {
            let all: Vec<Statement> = cases
                .iter()
                .flat_map(|c| c.consequent.iter().cloned())
                .collect();
            let vars = hoist::var_scope(&all).var_names;
            self.check_block_scope(scope, &vars, start)?;
        }

        let span = self.span_from(start);
        Ok(Statement::Switch(Rc::new(SwitchStatement {
            discriminant,
            cases,
            scope,
            span,
        })))
    }

    fn parse_switch_cases(&mut self) -> Result<Vec<SwitchCase>, JsError> {
        let mut cases = Vec::new();
        let mut seen_default = false;

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let case_start = self.current.span;
            let test = if self.match_token(&TokenKind::Case) {
                Some(self.allow_in(|p| p.parse_expression())?)
            } else if self.match_token(&TokenKind::Default) {
                if seen_default {
                    return Err(JsError::syntax_error(
                        "More than one default clause in switch statement",
                        case_start.line,
                        case_start.column,
                    ));
                }
                seen_default = true;
                None
            } else {
                return Err(self.unexpected_token("'case' or 'default'"));
            };
            self.require_token(&TokenKind::Colon)?;

            let mut consequent = Vec::new();
            while !self.check(&TokenKind::Case)
                && !self.check(&TokenKind::Default)
                && !self.check(&TokenKind::RBrace)
                && !self.is_at_end()
            {
                consequent.push(self.parse_statement()?);
            }

            let span = self.span_from(case_start);
            cases.push(SwitchCase {
                test,
                consequent: consequent.into(),
                span,
            });
        }

        self.require_token(&TokenKind::RBrace)?;
        Ok(cases)
    }

    fn parse_try_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::Try)?;
        let block = self.parse_block_statement()?;

        let handler = if self.check(&TokenKind::Catch) {
            let catch_start = self.current.span;
            self.advance();
            let param = if self.match_token(&TokenKind::LParen) {
                let param = self.parse_binding_target()?;
                self.require_token(&TokenKind::RParen)?;
                Some(param)
            } else {
                None
            };
            let body = self.parse_block_statement()?;

            if let Some(param) = &param {
                let mut names = Vec::new();
                param.collect_bound_names(&mut names);
                self.check_duplicate_names(&names, catch_start)?;
                if let Some(scope) = &body.scope {
                    self.check_lexical_conflicts(
                        &scope.lexical.iter().map(|l| l.name.cheap_clone()).collect::<Vec<_>>(),
                        &names,
                        body.span,
                    )?;
                }
            }

            let span = self.span_from(catch_start);
            Some(CatchClause { param, body, span })
        } else {
            None
        };

        let finalizer = if self.match_token(&TokenKind::Finally) {
            Some(self.parse_block_statement()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("Missing catch or finally after try"));
        }

        let span = self.span_from(start);
        Ok(Statement::Try(Rc::new(TryStatement {
            block,
            handler,
            finalizer,
            span,
        })))
    }

    fn parse_with_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        if self.strict {
            return Err(self.error("Strict mode code may not include a with statement"));
        }
        self.require_token(&TokenKind::With)?;
        self.require_token(&TokenKind::LParen)?;
        let object = self.allow_in(|p| p.parse_expression())?;
        self.require_token(&TokenKind::RParen)?;
        let body = self.parse_substatement(false)?;

        let span = self.span_from(start);
        Ok(Statement::With(Rc::new(WithStatement { object, body, span })))
    }

    fn parse_labeled_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        let label = self.parse_identifier_reference_name()?;
        self.require_token(&TokenKind::Colon)?;

        if self.ctx.labels.iter().any(|l| l.name == label) {
            return Err(JsError::syntax_error(
                format!("Label '{}' has already been declared", label),
                start.line,
                start.column,
            ));
        }

        self.ctx.labels.push(Label {
            name: label.cheap_clone(),
            is_loop: false,
        });
        self.pending_labels += 1;
        let body = if self.check(&TokenKind::Function) {
            if self.strict {
                Err(self.error("In strict mode code, functions can only be declared at top level or inside a block"))
            } else {
                self.pending_labels = 0;
                self.parse_function_declaration(false)
                    .map(Statement::FunctionDeclaration)
            }
        } else {
            self.parse_substatement(false)
        };
        self.pending_labels = 0;
        self.ctx.labels.pop();
        let body = body?;

        let span = self.span_from(start);
        Ok(Statement::Labeled(Rc::new(LabeledStatement { label, body, span })))
    }

    fn parse_return_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        if !self.ctx.in_function {
            return Err(self.error("Illegal return statement"));
        }
        self.require_token(&TokenKind::Return)?;

        let argument = if self.at_statement_end() {
            None
        } else {
            Some(self.allow_in(|p| p.parse_expression())?)
        };
        self.expect_semicolon()?;

        let span = self.span_from(start);
        Ok(Statement::Return(argument, span))
    }

    fn parse_break_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::Break)?;

        let label = if !self.lexer.had_newline_before() && self.check_identifier_reference() {
            let label = self.parse_identifier_reference_name()?;
            if !self.ctx.labels.iter().any(|l| l.name == label) {
                return Err(JsError::syntax_error(
                    format!("Undefined label '{}'", label),
                    start.line,
                    start.column,
                ));
            }
            Some(label)
        } else {
            if self.ctx.breakable_depth == 0 {
                return Err(JsError::syntax_error(
                    "Illegal break statement",
                    start.line,
                    start.column,
                ));
            }
            None
        };
        self.expect_semicolon()?;

        let span = self.span_from(start);
        Ok(Statement::Break(label, span))
    }

    fn parse_continue_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::Continue)?;

        if self.ctx.iteration_depth == 0 {
            return Err(JsError::syntax_error(
                "Illegal continue statement: no surrounding iteration statement",
                start.line,
                start.column,
            ));
        }

        let label = if !self.lexer.had_newline_before() && self.check_identifier_reference() {
            let label = self.parse_identifier_reference_name()?;
            match self.ctx.labels.iter().find(|l| l.name == label) {
                Some(l) if l.is_loop => {}
                Some(_) => {
                    return Err(JsError::syntax_error(
                        format!(
                            "Illegal continue statement: '{}' does not denote an iteration statement",
                            label
                        ),
                        start.line,
                        start.column,
                    ));
                }
                None => {
                    return Err(JsError::syntax_error(
                        format!("Undefined label '{}'", label),
                        start.line,
                        start.column,
                    ));
                }
            }
            Some(label)
        } else {
            None
        };
        self.expect_semicolon()?;

        let span = self.span_from(start);
        Ok(Statement::Continue(label, span))
    }

    fn parse_throw_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::Throw)?;

        if self.lexer.had_newline_before() {
            return Err(self.error("Illegal newline after throw"));
        }

        let argument = self.allow_in(|p| p.parse_expression())?;
        self.expect_semicolon()?;

        let span = self.span_from(start);
        Ok(Statement::Throw(argument, span))
    }

    fn parse_block_statement(&mut self) -> Result<Rc<BlockStatement>, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::LBrace)?;

        self.statement_depth += 1;
        let body = self.parse_block_body();
        self.statement_depth -= 1;
        let body = body?;
        self.require_token(&TokenKind::RBrace)?;

        let scope = hoist::block_scope(body.iter());
        if let Some(scope) = &scope {
            let vars = hoist::var_scope(&body).var_names;
            self.check_block_scope(scope, &vars, start)?;
        }

        let span = self.span_from(start);
        Ok(Rc::new(BlockStatement {
            body: body.into(),
            scope,
            span,
        }))
    }

    fn parse_block_body(&mut self) -> Result<Vec<Statement>, JsError> {
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        let expr = self.parse_expression()?;
        self.expect_semicolon()?;
        let span = self.span_from(start);
        Ok(Statement::Expression(expr, span))
    }

    // ============ MODULES ============

    fn parse_import_declaration(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        if !self.module {
            return Err(self.error("Cannot use import statement outside a module"));
        }
        if self.ctx.in_function || self.statement_depth > 0 {
            return Err(self.error("Import declarations may only appear at top level of a module"));
        }
        self.require_token(&TokenKind::Import)?;

        let mut specifiers = Vec::new();

        // import "module"
        if let TokenKind::String(source) = &self.current.kind {
            let source = source.cheap_clone();
            self.advance();
            self.expect_semicolon()?;
            let span = self.span_from(start);
            return Ok(Statement::Import(Rc::new(ImportDeclaration {
                specifiers,
                source,
                span,
            })));
        }

        // Default import
        if self.check_identifier_reference() {
            let local = self.parse_binding_identifier()?.name;
            specifiers.push(ImportSpecifier::Default { local });
            if !self.match_token(&TokenKind::Comma) {
                return self.finish_import(specifiers, start);
            }
        }

        if self.match_token(&TokenKind::Star) {
            self.require_contextual("as")?;
            let local = self.parse_binding_identifier()?.name;
            specifiers.push(ImportSpecifier::Namespace { local });
        } else if self.match_token(&TokenKind::LBrace) {
            while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
                let imported = self.parse_module_export_name()?;
                let local = if self.check_contextual("as") {
                    self.advance();
                    self.parse_binding_identifier()?.name
                } else {
                    let span = self.previous.span;
                    self.check_binding_name(&imported, span)?;
                    imported.cheap_clone()
                };
                specifiers.push(ImportSpecifier::Named { imported, local });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.require_token(&TokenKind::RBrace)?;
        } else {
            return Err(self.unexpected_token("import specifier"));
        }

        self.finish_import(specifiers, start)
    }

    fn finish_import(
        &mut self,
        specifiers: Vec<ImportSpecifier>,
        start: Span,
    ) -> Result<Statement, JsError> {
        self.require_contextual("from")?;
        let source = self.parse_module_specifier()?;
        self.expect_semicolon()?;

        let names: Vec<JsString> = specifiers.iter().map(|s| s.local().cheap_clone()).collect();
        self.check_duplicate_names(&names, start)?;

        let span = self.span_from(start);
        Ok(Statement::Import(Rc::new(ImportDeclaration {
            specifiers,
            source,
            span,
        })))
    }

    fn parse_export_declaration(&mut self) -> Result<Statement, JsError> {
        if !self.module {
            return Err(self.error("Unexpected token 'export'"));
        }
        if self.ctx.in_function || self.statement_depth > 0 {
            return Err(self.error("Export declarations may only appear at top level of a module"));
        }
        self.require_token(&TokenKind::Export)?;

        let export = match self.current.kind.clone() {
            TokenKind::Star => {
                self.advance();
                let alias = if self.check_contextual("as") {
                    self.advance();
                    Some(self.parse_module_export_name()?)
                } else {
                    None
                };
                self.require_contextual("from")?;
                let source = self.parse_module_specifier()?;
                self.expect_semicolon()?;
                ExportDeclaration::All { source, alias }
            }
            TokenKind::LBrace => {
                self.advance();
                let mut specifiers = Vec::new();
                while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
                    let local = self.parse_module_export_name()?;
                    let exported = if self.check_contextual("as") {
                        self.advance();
                        self.parse_module_export_name()?
                    } else {
                        local.cheap_clone()
                    };
                    specifiers.push(ExportSpecifier { local, exported });
                    if !self.match_token(&TokenKind::Comma) {
                        break;
                    }
                }
                self.require_token(&TokenKind::RBrace)?;
                let source = if self.check_contextual("from") {
                    self.advance();
                    Some(self.parse_module_specifier()?)
                } else {
                    None
                };
                self.expect_semicolon()?;
                ExportDeclaration::Named { specifiers, source }
            }
            TokenKind::Default => {
                self.advance();
                self.parse_export_default()?
            }
            TokenKind::Var | TokenKind::Let | TokenKind::Const => ExportDeclaration::Declaration(
                Statement::VariableDeclaration(self.parse_variable_declaration()?),
            ),
            TokenKind::Function => ExportDeclaration::Declaration(Statement::FunctionDeclaration(
                self.parse_function_declaration(false)?,
            )),
            TokenKind::Identifier(name) if name == "async" && self.async_function_follows() => {
                self.advance();
                ExportDeclaration::Declaration(Statement::FunctionDeclaration(
                    self.parse_function_declaration(true)?,
                ))
            }
            TokenKind::Class => return Err(self.unsupported("class syntax")),
            _ => return Err(self.unexpected_token("declaration or export specifier")),
        };

        Ok(Statement::Export(Rc::new(export)))
    }

    fn parse_export_default(&mut self) -> Result<ExportDeclaration, JsError> {
        let is_async = self.check_contextual("async") && self.async_function_follows();
        if self.check(&TokenKind::Function) || is_async {
            let start = self.current.span;
            if is_async {
                self.advance();
            }
            self.require_token(&TokenKind::Function)?;
            let generator = self.match_token(&TokenKind::Star);
            if is_async && generator {
                return Err(self.unsupported("async generator function"));
            }
            let id = if self.check(&TokenKind::LParen) {
                None
            } else {
                Some(self.parse_binding_identifier()?)
            };
            let func = self.parse_function_rest(id, FunctionKind::Normal, generator, is_async, start)?;
            return Ok(ExportDeclaration::DefaultFunction(func));
        }
        if self.check(&TokenKind::Class) {
            return Err(self.unsupported("class syntax"));
        }

        let expr = self.allow_in(|p| p.parse_assignment_expression())?;
        self.expect_semicolon()?;
        Ok(ExportDeclaration::DefaultExpression(expr))
    }

    fn parse_module_specifier(&mut self) -> Result<JsString, JsError> {
        match &self.current.kind {
            TokenKind::String(s) => {
                let s = s.cheap_clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected_token("module specifier string")),
        }
    }

    /// Identifier names (keywords included) or string literals
    fn parse_module_export_name(&mut self) -> Result<JsString, JsError> {
        if let TokenKind::String(s) = &self.current.kind {
            let s = s.cheap_clone();
            self.advance();
            return Ok(s);
        }
        self.parse_identifier_name()
    }

    fn check_module_exports(
        &self,
        body: &[Statement],
        scope: &VarScope,
        lexical_names: &[JsString],
    ) -> Result<(), JsError> {
        let mut declared: FxHashSet<&str> = FxHashSet::default();
        declared.extend(scope.var_names.iter().map(JsString::as_str));
        declared.extend(lexical_names.iter().map(JsString::as_str));
        let function_names: Vec<JsString> = scope
            .functions
            .iter()
            .map(|f| hoist::function_binding_name(f))
            .collect();
        declared.extend(function_names.iter().map(JsString::as_str));

        let mut exported: FxHashSet<JsString> = FxHashSet::default();
        let mut add_export = |name: JsString| -> Result<(), JsError> {
            if exported.insert(name.cheap_clone()) {
                Ok(())
            } else {
                Err(JsError::syntax_error_simple(format!("Duplicate export of '{}'", name)))
            }
        };

        for stmt in body {
            let Statement::Export(export) = stmt else {
                continue;
            };
            match export.as_ref() {
                ExportDeclaration::Named { specifiers, source } => {
                    for spec in specifiers {
                        if source.is_none() && !declared.contains(spec.local.as_str()) {
                            return Err(JsError::syntax_error_simple(format!(
                                "Export '{}' is not defined in module",
                                spec.local
                            )));
                        }
                        add_export(spec.exported.cheap_clone())?;
                    }
                }
                ExportDeclaration::Declaration(Statement::VariableDeclaration(decl)) => {
                    let mut names = Vec::new();
                    for d in &decl.declarations {
                        d.id.collect_bound_names(&mut names);
                    }
                    for name in names {
                        add_export(name)?;
                    }
                }
                ExportDeclaration::Declaration(Statement::FunctionDeclaration(func)) => {
                    add_export(hoist::function_binding_name(func))?;
                }
                ExportDeclaration::Declaration(_) => {}
                ExportDeclaration::DefaultExpression(_) | ExportDeclaration::DefaultFunction(_) => {
                    add_export(JsString::from("default"))?;
                }
                ExportDeclaration::All { alias, .. } => {
                    if let Some(alias) = alias {
                        add_export(alias.cheap_clone())?;
                    }
                }
            }
        }
        Ok(())
    }

    // ============ FUNCTIONS ============

    /// Parse `(params) { body }` of a function declaration, expression or method
    fn parse_function_rest(
        &mut self,
        id: Option<Identifier>,
        kind: FunctionKind,
        generator: bool,
        is_async: bool,
        start: Span,
    ) -> Result<Rc<FunctionNode>, JsError> {
        let ctx = FunctionContext {
            in_function: true,
            generator,
            async_: is_async,
            new_target: true,
            ..FunctionContext::default()
        };
        self.with_function_context(ctx, |p| {
            p.require_token(&TokenKind::LParen)?;
            let (params, rest) = p.parse_formal_parameters()?;
            p.require_token(&TokenKind::RParen)?;

            p.require_token(&TokenKind::LBrace)?;
            let outer_strict = p.strict;
            let body = p.parse_directives_and_statements(|p| p.check(&TokenKind::RBrace))?;
            p.require_token(&TokenKind::RBrace)?;

            let header = FunctionHeader {
                id,
                params,
                rest,
                kind,
                generator,
                is_async,
                became_strict: p.strict && !outer_strict,
                start,
            };
            p.finish_function(header, FunctionBody::Block(body.into()))
        })
    }

    /// Parse `=> body` once the parameter list of an arrow function is known
    fn parse_arrow_function(
        &mut self,
        params: Vec<Pattern>,
        rest: Option<Pattern>,
        is_async: bool,
        start: Span,
    ) -> Result<Expression, JsError> {
        let ctx = FunctionContext {
            in_function: true,
            generator: false,
            async_: is_async,
            new_target: self.ctx.new_target,
            ..FunctionContext::default()
        };
        let func = self.with_function_context(ctx, |p| {
            if p.lexer.had_newline_before() {
                return Err(p.error("Line terminator not permitted before arrow"));
            }
            p.require_token(&TokenKind::Arrow)?;

            let outer_strict = p.strict;
            let body = if p.match_token(&TokenKind::LBrace) {
                let body = p.parse_directives_and_statements(|p| p.check(&TokenKind::RBrace))?;
                p.require_token(&TokenKind::RBrace)?;
                FunctionBody::Block(body.into())
            } else {
                FunctionBody::Expression(p.parse_assignment_expression()?)
            };

            let header = FunctionHeader {
                id: None,
                params,
                rest,
                kind: FunctionKind::Arrow,
                generator: false,
                is_async,
                became_strict: p.strict && !outer_strict,
                start,
            };
            p.finish_function(header, body)
        })?;
        Ok(Expression::ArrowFunction(func))
    }

    /// Validate a parsed function and compute its hoisting record
    fn finish_function(
        &mut self,
        header: FunctionHeader,
        body: FunctionBody,
    ) -> Result<Rc<FunctionNode>, JsError> {
        let FunctionHeader {
            id,
            params,
            rest,
            kind,
            generator,
            is_async,
            became_strict,
            start,
        } = header;

        let simple_params =
            rest.is_none() && params.iter().all(|p| matches!(p, Pattern::Identifier(_)));
        if became_strict && !simple_params {
            return Err(JsError::syntax_error(
                "Illegal 'use strict' directive in function with non-simple parameter list",
                start.line,
                start.column,
            ));
        }

        match kind {
            FunctionKind::Getter if !params.is_empty() || rest.is_some() => {
                return Err(JsError::syntax_error(
                    "Getter must not have any formal parameters",
                    start.line,
                    start.column,
                ));
            }
            FunctionKind::Setter if params.len() != 1 || rest.is_some() => {
                return Err(JsError::syntax_error(
                    "Setter must have exactly one formal parameter",
                    start.line,
                    start.column,
                ));
            }
            _ => {}
        }

        let mut param_names = Vec::new();
        for param in &params {
            param.collect_bound_names(&mut param_names);
        }
        if let Some(rest) = &rest {
            rest.collect_bound_names(&mut param_names);
        }

        // Retroactive checks once the body's strictness is known
        if self.strict {
            if let Some(id) = &id {
                self.check_binding_name(&id.name, id.span)?;
            }
            for name in &param_names {
                self.check_binding_name(name, start)?;
            }
        }
        let unique_params_required =
            self.strict || !simple_params || kind != FunctionKind::Normal;
        if unique_params_required && let Some(dup) = find_duplicate(&param_names) {
            return Err(JsError::syntax_error(
                format!("Duplicate parameter name '{}' not allowed in this context", dup),
                start.line,
                start.column,
            ));
        }

        let scope = match &body {
            FunctionBody::Block(statements) => hoist::var_scope(statements),
            FunctionBody::Expression(_) => VarScope::default(),
        };
        let lexical: Vec<JsString> = scope.lexical.iter().map(|l| l.name.cheap_clone()).collect();
        if !lexical.is_empty() {
            let mut var_like = param_names.clone();
            var_like.extend(scope.var_names.iter().cloned());
            var_like.extend(scope.functions.iter().map(|f| hoist::function_binding_name(f)));
            self.check_lexical_conflicts(&lexical, &var_like, start)?;
        }

        let length = params
            .iter()
            .take_while(|p| !matches!(p, Pattern::Assignment(_)))
            .count() as u32;

        let span = self.span_from(start);
        Ok(Rc::new(FunctionNode {
            id,
            params: params.into(),
            rest,
            body,
            kind,
            generator,
            async_: is_async,
            strict: self.strict,
            scope: Rc::new(scope),
            param_names: param_names.into(),
            simple_params,
            length,
            span,
        }))
    }

    /// Parse formal parameters up to (not including) the closing paren
    fn parse_formal_parameters(&mut self) -> Result<(Vec<Pattern>, Option<Pattern>), JsError> {
        let mut params = Vec::new();
        let mut rest = None;

        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            if self.match_token(&TokenKind::DotDotDot) {
                rest = Some(self.parse_binding_target()?);
                if !self.check(&TokenKind::RParen) {
                    return Err(self.error("Rest parameter must be last formal parameter"));
                }
                break;
            }

            params.push(self.parse_binding_element()?);

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok((params, rest))
    }

    /// Speculatively parse `(params) =>`. Restores the parser and returns None
    /// when the parenthesized text is not an arrow head.
    fn try_parse_arrow_head(&mut self) -> Option<(Vec<Pattern>, Option<Pattern>)> {
        let snapshot = self.snapshot();
        match self.parse_arrow_head() {
            Ok(head) => Some(head),
            Err(_) => {
                self.restore(snapshot);
                None
            }
        }
    }

    fn parse_arrow_head(&mut self) -> Result<(Vec<Pattern>, Option<Pattern>), JsError> {
        self.require_token(&TokenKind::LParen)?;
        let head = self.allow_in(|p| p.parse_formal_parameters())?;
        self.require_token(&TokenKind::RParen)?;
        if self.check(&TokenKind::Arrow) && !self.lexer.had_newline_before() {
            Ok(head)
        } else {
            Err(self.unexpected_token("'=>'"))
        }
    }

    /// Arrow functions start an assignment expression: `x =>`, `(..) =>`,
    /// `async x =>` and `async (..) =>`
    fn try_parse_arrow_function(&mut self) -> Result<Option<Expression>, JsError> {
        let start = self.current.span;

        if self.check(&TokenKind::LParen) {
            return match self.try_parse_arrow_head() {
                Some((params, rest)) => Ok(Some(self.parse_arrow_function(params, rest, false, start)?)),
                None => Ok(None),
            };
        }

        if !self.check_identifier_reference() {
            return Ok(None);
        }

        let (next, newline) = self.peek_token();
        if self.check_contextual("async") && !newline {
            match next.kind {
                TokenKind::LParen => {
                    let snapshot = self.snapshot();
                    self.advance(); // consume 'async'
                    if let Some((params, rest)) = self.try_parse_arrow_head() {
                        return Ok(Some(self.parse_arrow_function(params, rest, true, start)?));
                    }
                    self.restore(snapshot);
                    return Ok(None);
                }
                TokenKind::Identifier(_)
                | TokenKind::Let
                | TokenKind::Yield
                | TokenKind::Await => {
                    let snapshot = self.snapshot();
                    self.advance(); // consume 'async'
                    let (after, newline) = self.peek_token();
                    if after.kind == TokenKind::Arrow && !newline {
                        let param = self.parse_binding_identifier()?;
                        return Ok(Some(self.parse_arrow_function(
                            vec![Pattern::Identifier(param)],
                            None,
                            true,
                            start,
                        )?));
                    }
                    self.restore(snapshot);
                    return Ok(None);
                }
                _ => {}
            }
        }

        if next.kind == TokenKind::Arrow && !newline {
            let param = self.parse_binding_identifier()?;
            return Ok(Some(self.parse_arrow_function(
                vec![Pattern::Identifier(param)],
                None,
                false,
                start,
            )?));
        }

        Ok(None)
    }

    // ============ PATTERNS ============

    /// Binding target with an optional default value
    fn parse_binding_element(&mut self) -> Result<Pattern, JsError> {
        let start = self.current.span;
        let target = self.parse_binding_target()?;
        if self.match_token(&TokenKind::Eq) {
            let default = self.allow_in(|p| p.parse_assignment_expression())?;
            let span = self.span_from(start);
            return Ok(Pattern::Assignment(Rc::new(AssignmentPattern {
                target,
                default,
                span,
            })));
        }
        Ok(target)
    }

    /// Identifier, array pattern or object pattern
    fn parse_binding_target(&mut self) -> Result<Pattern, JsError> {
        match self.current.kind {
            TokenKind::LBracket => self.parse_array_binding_pattern(),
            TokenKind::LBrace => self.parse_object_binding_pattern(),
            _ => Ok(Pattern::Identifier(self.parse_binding_identifier()?)),
        }
    }

    fn parse_array_binding_pattern(&mut self) -> Result<Pattern, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::LBracket)?;

        let mut elements = Vec::new();
        let mut rest = None;
        while !self.check(&TokenKind::RBracket) && !self.is_at_end() {
            if self.match_token(&TokenKind::Comma) {
                elements.push(None);
                continue;
            }
            if self.match_token(&TokenKind::DotDotDot) {
                rest = Some(self.parse_binding_target()?);
                break;
            }
            elements.push(Some(self.parse_binding_element()?));
            if !self.check(&TokenKind::RBracket) {
                self.require_token(&TokenKind::Comma)?;
            }
        }
        self.require_token(&TokenKind::RBracket)?;

        let span = self.span_from(start);
        Ok(Pattern::Array(Rc::new(ArrayPattern {
            elements,
            rest,
            span,
        })))
    }

    fn parse_object_binding_pattern(&mut self) -> Result<Pattern, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::LBrace)?;

        let mut properties = Vec::new();
        let mut rest = None;
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.match_token(&TokenKind::DotDotDot) {
                rest = Some(Pattern::Identifier(self.parse_binding_identifier()?));
                break;
            }

            let prop_start = self.current.span;
            let (key, shorthand) = self.parse_property_name()?;
            let value = if self.match_token(&TokenKind::Colon) {
                self.parse_binding_element()?
            } else {
                let Some(id) = shorthand else {
                    return Err(self.unexpected_token("':'"));
                };
                self.check_binding_name(&id.name, id.span)?;
                let target = Pattern::Identifier(id);
                if self.match_token(&TokenKind::Eq) {
                    let default = self.allow_in(|p| p.parse_assignment_expression())?;
                    let span = self.span_from(prop_start);
                    Pattern::Assignment(Rc::new(AssignmentPattern {
                        target,
                        default,
                        span,
                    }))
                } else {
                    target
                }
            };
            properties.push(ObjectPatternProperty { key, value });

            if !self.check(&TokenKind::RBrace) {
                self.require_token(&TokenKind::Comma)?;
            }
        }
        self.require_token(&TokenKind::RBrace)?;

        let span = self.span_from(start);
        Ok(Pattern::Object(Rc::new(ObjectPattern {
            properties,
            rest,
            span,
        })))
    }

    /// Reinterpret an expression parsed through the cover grammar as an
    /// assignment pattern (`[a, b] = ..`, `for ({ x } of ..)`)
    fn expression_to_pattern(&self, expr: &Expression) -> Result<Pattern, JsError> {
        match expr {
            Expression::Identifier(id) => {
                self.check_assignment_name(&id.name, id.span)?;
                Ok(Pattern::Identifier(id.clone()))
            }
            Expression::Member(_) => Ok(Pattern::Expression(expr.cheap_clone())),
            Expression::Array(array) => {
                let mut elements = Vec::new();
                let mut rest = None;
                let count = array.elements.len();
                for (index, element) in array.elements.iter().enumerate() {
                    match element {
                        None => elements.push(None),
                        Some(ArrayElement::Expression(e)) => {
                            elements.push(Some(self.expression_to_pattern(e)?));
                        }
                        Some(ArrayElement::Spread(e)) => {
                            if index + 1 != count {
                                return Err(invalid_target(e, "Rest element must be last element"));
                            }
                            let target = self.expression_to_pattern(e)?;
                            if matches!(target, Pattern::Assignment(_)) {
                                return Err(invalid_target(e, "Rest element may not have a default initializer"));
                            }
                            rest = Some(target);
                        }
                    }
                }
                Ok(Pattern::Array(Rc::new(ArrayPattern {
                    elements,
                    rest,
                    span: array.span,
                })))
            }
            Expression::Object(object) => {
                let mut properties = Vec::new();
                let mut rest = None;
                let count = object.properties.len();
                for (index, member) in object.properties.iter().enumerate() {
                    match member {
                        ObjectMember::Property { key, value, .. } => {
                            properties.push(ObjectPatternProperty {
                                key: key.clone(),
                                value: self.expression_to_pattern(value)?,
                            });
                        }
                        ObjectMember::Spread(e) => {
                            if index + 1 != count {
                                return Err(invalid_target(e, "Rest element must be last element"));
                            }
                            if !matches!(e, Expression::Identifier(_) | Expression::Member(_)) {
                                return Err(invalid_target(e, "Invalid rest element"));
                            }
                            rest = Some(self.expression_to_pattern(e)?);
                        }
                        ObjectMember::Method { function, .. } => {
                            return Err(JsError::syntax_error(
                                "Invalid destructuring assignment target",
                                function.span.line,
                                function.span.column,
                            ));
                        }
                    }
                }
                Ok(Pattern::Object(Rc::new(ObjectPattern {
                    properties,
                    rest,
                    span: object.span,
                })))
            }
            Expression::Assignment(assign) if assign.operator == AssignmentOp::Assign => {
                let target = match &assign.target {
                    AssignmentTarget::Simple(e) => self.expression_to_pattern(e)?,
                    AssignmentTarget::Pattern(p) => p.cheap_clone(),
                };
                Ok(Pattern::Assignment(Rc::new(AssignmentPattern {
                    target,
                    default: assign.value.cheap_clone(),
                    span: assign.span,
                })))
            }
            _ => Err(invalid_target(expr, "Invalid destructuring assignment target")),
        }
    }

    // ============ EXPRESSIONS ============

    fn parse_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        let first = self.parse_assignment_expression()?;

        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut expressions = vec![first];
        while self.match_token(&TokenKind::Comma) {
            expressions.push(self.parse_assignment_expression()?);
        }
        let span = self.span_from(start);
        Ok(Expression::Sequence(expressions.into(), span))
    }

    fn parse_assignment_expression(&mut self) -> Result<Expression, JsError> {
        if self.ctx.generator && self.check(&TokenKind::Yield) {
            return self.parse_yield_expression();
        }

        if let Some(arrow) = self.try_parse_arrow_function()? {
            return Ok(arrow);
        }

        let start = self.current.span;
        let cover_mark = self.cover_errors.len();
        let expr = self.parse_conditional_expression()?;

        let Some(operator) = self.current_assignment_op() else {
            return Ok(expr);
        };

        let target = if operator == AssignmentOp::Assign
            && matches!(expr, Expression::Array(_) | Expression::Object(_))
        {
            let pattern = self.expression_to_pattern(&expr)?;
            self.cover_errors.truncate(cover_mark);
            AssignmentTarget::Pattern(pattern)
        } else {
            self.check_simple_target(&expr, "Invalid left-hand side in assignment")?;
            AssignmentTarget::Simple(expr)
        };
        self.advance();

        let value = self.parse_assignment_expression()?;
        let span = self.span_from(start);
        Ok(Expression::Assignment(Rc::new(AssignmentExpression {
            operator,
            target,
            value,
            span,
        })))
    }

    fn parse_yield_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::Yield)?;

        let delegate = !self.lexer.had_newline_before() && self.match_token(&TokenKind::Star);

        // yield without an argument ends at a line break or a closing token
        let argument = if delegate {
            Some(self.parse_assignment_expression()?)
        } else if self.lexer.had_newline_before()
            || matches!(
                self.current.kind,
                TokenKind::RParen
                    | TokenKind::RBracket
                    | TokenKind::RBrace
                    | TokenKind::Comma
                    | TokenKind::Semicolon
                    | TokenKind::Colon
                    | TokenKind::Eof
            )
        {
            None
        } else {
            Some(self.parse_assignment_expression()?)
        };

        let span = self.span_from(start);
        Ok(Expression::Yield(Rc::new(YieldExpression {
            argument,
            delegate,
            span,
        })))
    }

    fn parse_conditional_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        let test = self.parse_binary_expression(0)?;

        if !self.match_token(&TokenKind::Question) {
            return Ok(test);
        }

        let consequent = self.allow_in(|p| p.parse_assignment_expression())?;
        self.require_token(&TokenKind::Colon)?;
        let alternate = self.parse_assignment_expression()?;
        let span = self.span_from(start);
        Ok(Expression::Conditional(Rc::new(ConditionalExpression {
            test,
            consequent,
            alternate,
            span,
        })))
    }

    /// Pratt parser for binary and logical expressions
    fn parse_binary_expression(&mut self, min_prec: u8) -> Result<Expression, JsError> {
        let start = self.current.span;
        let starts_with_unary = self.current_unary_op().is_some()
            || (self.ctx.async_ && self.check(&TokenKind::Await));
        let mut left = self.parse_unary_expression()?;

        while let Some((op, prec)) = self.current_binary_op() {
            if prec < min_prec {
                break;
            }

            if op == InfixOp::Binary(BinaryOp::Exp)
                && starts_with_unary
                && matches!(left, Expression::Unary(_) | Expression::Await(..))
            {
                return Err(self.error(
                    "Unary operator used immediately before exponentiation expression; parentheses required",
                ));
            }
            self.advance();

            // ** is right-associative
            let next_prec = if op == InfixOp::Binary(BinaryOp::Exp) {
                prec
            } else {
                prec + 1
            };
            let right = self.parse_binary_expression(next_prec)?;

            let span = self.span_from(start);
            left = match op {
                InfixOp::Logical(operator) => Expression::Logical(Rc::new(LogicalExpression {
                    operator,
                    left,
                    right,
                    span,
                })),
                InfixOp::Binary(operator) => Expression::Binary(Rc::new(BinaryExpression {
                    operator,
                    left,
                    right,
                    span,
                })),
            };
        }

        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;

        if let Some(operator) = self.current_unary_op() {
            self.advance();
            let argument = self.parse_unary_expression()?;

            if operator == UnaryOp::Delete
                && self.strict
                && let Expression::Identifier(id) = &argument
            {
                return Err(JsError::syntax_error(
                    "Delete of an unqualified identifier in strict mode",
                    id.span.line,
                    id.span.column,
                ));
            }

            let span = self.span_from(start);
            return Ok(Expression::Unary(Rc::new(UnaryExpression {
                operator,
                argument,
                span,
            })));
        }

        if self.ctx.async_ && self.check(&TokenKind::Await) {
            self.advance();
            let argument = self.parse_unary_expression()?;
            let span = self.span_from(start);
            return Ok(Expression::Await(Rc::new(argument), span));
        }

        // Prefix update
        if let Some(operator) = self.current_update_op() {
            self.advance();
            let argument = self.parse_unary_expression()?;
            self.check_simple_target(
                &argument,
                "Invalid left-hand side expression in prefix operation",
            )?;
            let span = self.span_from(start);
            return Ok(Expression::Update(Rc::new(UpdateExpression {
                operator,
                argument,
                prefix: true,
                span,
            })));
        }

        self.parse_postfix_expression()
    }

    fn parse_postfix_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        let expr = self.parse_left_hand_side_expression()?;

        if self.lexer.had_newline_before() {
            return Ok(expr);
        }
        let Some(operator) = self.current_update_op() else {
            return Ok(expr);
        };

        self.check_simple_target(&expr, "Invalid left-hand side expression in postfix operation")?;
        self.advance();
        let span = self.span_from(start);
        Ok(Expression::Update(Rc::new(UpdateExpression {
            operator,
            argument: expr,
            prefix: false,
            span,
        })))
    }

    fn parse_left_hand_side_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        let mut expr = if self.check(&TokenKind::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary_expression()?
        };

        let mut in_optional_chain = false;
        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.parse_identifier_name()?;
                    expr = self.member(expr, MemberProperty::Identifier(name), false, start);
                }
                TokenKind::LBracket => {
                    self.advance();
                    let property = self.allow_in(|p| p.parse_expression())?;
                    self.require_token(&TokenKind::RBracket)?;
                    expr = self.member(expr, MemberProperty::Expression(property), false, start);
                }
                TokenKind::LParen => {
                    let arguments = self.parse_arguments()?;
                    let span = self.span_from(start);
                    expr = Expression::Call(Rc::new(CallExpression {
                        callee: expr,
                        arguments,
                        optional: false,
                        span,
                    }));
                }
                TokenKind::QuestionDot => {
                    self.advance();
                    in_optional_chain = true;
                    match self.current.kind {
                        TokenKind::LParen => {
                            let arguments = self.parse_arguments()?;
                            let span = self.span_from(start);
                            expr = Expression::Call(Rc::new(CallExpression {
                                callee: expr,
                                arguments,
                                optional: true,
                                span,
                            }));
                        }
                        TokenKind::LBracket => {
                            self.advance();
                            let property = self.allow_in(|p| p.parse_expression())?;
                            self.require_token(&TokenKind::RBracket)?;
                            expr = self.member(expr, MemberProperty::Expression(property), true, start);
                        }
                        TokenKind::TemplateHead(_) | TokenKind::TemplateNoSub(_) => {
                            return Err(self.error("Invalid tagged template on optional chain"));
                        }
                        _ => {
                            let name = self.parse_identifier_name()?;
                            expr = self.member(expr, MemberProperty::Identifier(name), true, start);
                        }
                    }
                }
                TokenKind::TemplateHead(_) | TokenKind::TemplateNoSub(_) => {
                    return Err(self.unsupported("tagged template"));
                }
                _ => break,
            }
        }

        if in_optional_chain {
            let span = self.span_from(start);
            expr = Expression::OptionalChain(Rc::new(expr), span);
        }
        Ok(expr)
    }

    fn member(
        &self,
        object: Expression,
        property: MemberProperty,
        optional: bool,
        start: Span,
    ) -> Expression {
        let span = self.span_from(start);
        Expression::Member(Rc::new(MemberExpression {
            object,
            property,
            optional,
            span,
        }))
    }

    /// `new callee(args)`, `new callee` and `new.target`
    fn parse_new_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::New)?;

        if self.match_token(&TokenKind::Dot) {
            if !self.check_contextual("target") {
                return Err(self.unexpected_token("'target'"));
            }
            if !self.ctx.new_target {
                return Err(self.error("new.target expression is not allowed here"));
            }
            self.advance();
            return Ok(Expression::NewTarget(self.span_from(start)));
        }

        let callee_start = self.current.span;
        let mut callee = if self.check(&TokenKind::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary_expression()?
        };

        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.parse_identifier_name()?;
                    callee = self.member(callee, MemberProperty::Identifier(name), false, callee_start);
                }
                TokenKind::LBracket => {
                    self.advance();
                    let property = self.allow_in(|p| p.parse_expression())?;
                    self.require_token(&TokenKind::RBracket)?;
                    callee = self.member(callee, MemberProperty::Expression(property), false, callee_start);
                }
                TokenKind::QuestionDot => {
                    return Err(self.error("Invalid optional chain from new expression"));
                }
                TokenKind::TemplateHead(_) | TokenKind::TemplateNoSub(_) => {
                    return Err(self.unsupported("tagged template"));
                }
                _ => break,
            }
        }

        let arguments = if self.check(&TokenKind::LParen) {
            self.parse_arguments()?
        } else {
            Rc::from(Vec::new())
        };

        let span = self.span_from(start);
        Ok(Expression::New(Rc::new(CallExpression {
            callee,
            arguments,
            optional: false,
            span,
        })))
    }

    fn parse_arguments(&mut self) -> Result<Rc<[Argument]>, JsError> {
        self.require_token(&TokenKind::LParen)?;
        let arguments = self.allow_in(|p| {
            let mut arguments = Vec::new();
            while !p.check(&TokenKind::RParen) && !p.is_at_end() {
                if p.match_token(&TokenKind::DotDotDot) {
                    arguments.push(Argument::Spread(p.parse_assignment_expression()?));
                } else {
                    arguments.push(Argument::Expression(p.parse_assignment_expression()?));
                }
                if !p.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            Ok(arguments)
        })?;
        self.require_token(&TokenKind::RParen)?;
        Ok(arguments.into())
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;

        match self.current.kind.clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expression::Literal(LiteralValue::Number(n), start))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expression::Literal(LiteralValue::String(s), start))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Literal(LiteralValue::Boolean(true), start))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Literal(LiteralValue::Boolean(false), start))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expression::Literal(LiteralValue::Null, start))
            }
            TokenKind::This => {
                self.advance();
                Ok(Expression::This(start))
            }
            TokenKind::TemplateNoSub(_) | TokenKind::TemplateHead(_) => self.parse_template_literal(),
            TokenKind::Function => self.parse_function_expression(false),
            TokenKind::Identifier(name) if name == "async" && self.async_function_follows() => {
                self.advance(); // consume 'async'
                self.parse_function_expression(true)
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.allow_in(|p| p.parse_expression())?;
                self.require_token(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            TokenKind::Class => Err(self.unsupported("class syntax")),
            TokenKind::Super => Err(self.unsupported("super")),
            TokenKind::Import => {
                if self.peek_is(&TokenKind::Dot) {
                    Err(self.unsupported("import.meta"))
                } else {
                    Err(self.unsupported("dynamic import"))
                }
            }
            TokenKind::Slash | TokenKind::SlashEq => {
                Err(self.unsupported("regular expression literal"))
            }
            TokenKind::BigInt => Err(self.unsupported("BigInt literal")),
            TokenKind::Await if self.module || self.ctx.async_ => Err(self.error(
                "await is only valid in async functions and the top level bodies of modules",
            )),
            _ if self.check_identifier_reference() => {
                let name = self.parse_identifier_reference_name()?;
                Ok(Expression::Identifier(Identifier { name, span: start }))
            }
            _ => Err(self.unexpected_token("expression")),
        }
    }

    fn parse_function_expression(&mut self, is_async: bool) -> Result<Expression, JsError> {
        let start = if is_async {
            self.previous.span
        } else {
            self.current.span
        };
        self.require_token(&TokenKind::Function)?;
        let generator = self.match_token(&TokenKind::Star);
        if is_async && generator {
            return Err(self.unsupported("async generator function"));
        }

        let id = if self.check(&TokenKind::LParen) {
            None
        } else {
            Some(self.parse_binding_identifier()?)
        };
        let func = self.parse_function_rest(id, FunctionKind::Normal, generator, is_async, start)?;
        Ok(Expression::Function(func))
    }

    fn parse_template_literal(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();

        match self.current.kind.clone() {
            TokenKind::TemplateNoSub(text) => {
                self.advance();
                quasis.push(text);
            }
            TokenKind::TemplateHead(text) => {
                self.advance();
                quasis.push(text);
                loop {
                    expressions.push(self.allow_in(|p| p.parse_expression())?);
                    if !self.check(&TokenKind::RBrace) {
                        return Err(self.unexpected_token("'}' to close template substitution"));
                    }
                    self.current = self.lexer.rescan_template_continuation(self.current.span);
                    match self.current.kind.clone() {
                        TokenKind::TemplateMiddle(text) => {
                            self.advance();
                            quasis.push(text);
                        }
                        TokenKind::TemplateTail(text) => {
                            self.advance();
                            quasis.push(text);
                            break;
                        }
                        _ => return Err(self.error("Unterminated template literal")),
                    }
                }
            }
            _ => return Err(self.unexpected_token("template literal")),
        }

        let span = self.span_from(start);
        Ok(Expression::Template(Rc::new(TemplateLiteral {
            quasis,
            expressions,
            span,
        })))
    }

    fn parse_array_literal(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::LBracket)?;

        let elements = self.allow_in(|p| {
            let mut elements = Vec::new();
            while !p.check(&TokenKind::RBracket) && !p.is_at_end() {
                if p.match_token(&TokenKind::Comma) {
                    elements.push(None);
                    continue;
                }
                let element = if p.match_token(&TokenKind::DotDotDot) {
                    ArrayElement::Spread(p.parse_assignment_expression()?)
                } else {
                    ArrayElement::Expression(p.parse_assignment_expression()?)
                };
                elements.push(Some(element));
                if !p.check(&TokenKind::RBracket) {
                    p.require_token(&TokenKind::Comma)?;
                }
            }
            Ok(elements)
        })?;
        self.require_token(&TokenKind::RBracket)?;

        let span = self.span_from(start);
        Ok(Expression::Array(Rc::new(ArrayExpression { elements, span })))
    }

    fn parse_object_literal(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::LBrace)?;

        let properties = self.allow_in(|p| {
            let mut properties = Vec::new();
            while !p.check(&TokenKind::RBrace) && !p.is_at_end() {
                properties.push(p.parse_object_member()?);
                if !p.check(&TokenKind::RBrace) {
                    p.require_token(&TokenKind::Comma)?;
                }
            }
            Ok(properties)
        })?;
        self.require_token(&TokenKind::RBrace)?;

        let span = self.span_from(start);
        Ok(Expression::Object(Rc::new(ObjectExpression { properties, span })))
    }

    fn parse_object_member(&mut self) -> Result<ObjectMember, JsError> {
        let start = self.current.span;

        if self.match_token(&TokenKind::DotDotDot) {
            return Ok(ObjectMember::Spread(self.parse_assignment_expression()?));
        }

        // get/set/async prefixes only apply when a property name follows
        let prefix = match &self.current.kind {
            TokenKind::Identifier(name) if name == "get" || name == "set" || name == "async" => {
                Some(name.cheap_clone())
            }
            _ => None,
        };
        if let Some(prefix) = prefix {
            let (next, newline) = self.peek_token();
            let name_follows = !matches!(
                next.kind,
                TokenKind::LParen
                    | TokenKind::Colon
                    | TokenKind::Comma
                    | TokenKind::RBrace
                    | TokenKind::Eq
            );
            if name_follows && !(prefix == "async" && newline) {
                self.advance();
                if prefix == "async" {
                    if self.check(&TokenKind::Star) {
                        return Err(self.unsupported("async generator method"));
                    }
                    let (key, _) = self.parse_property_name()?;
                    let function = self.parse_function_rest(None, FunctionKind::Method, false, true, start)?;
                    return Ok(ObjectMember::Method {
                        key,
                        function,
                        kind: MethodKind::Method,
                    });
                }
                let (key, _) = self.parse_property_name()?;
                let (fn_kind, kind) = if prefix == "get" {
                    (FunctionKind::Getter, MethodKind::Get)
                } else {
                    (FunctionKind::Setter, MethodKind::Set)
                };
                let function = self.parse_function_rest(None, fn_kind, false, false, start)?;
                return Ok(ObjectMember::Method {
                    key,
                    function,
                    kind,
                });
            }
        }

        if self.match_token(&TokenKind::Star) {
            let (key, _) = self.parse_property_name()?;
            let function = self.parse_function_rest(None, FunctionKind::Method, true, false, start)?;
            return Ok(ObjectMember::Method {
                key,
                function,
                kind: MethodKind::Method,
            });
        }

        let (key, shorthand) = self.parse_property_name()?;

        if self.check(&TokenKind::LParen) {
            let function = self.parse_function_rest(None, FunctionKind::Method, false, false, start)?;
            return Ok(ObjectMember::Method {
                key,
                function,
                kind: MethodKind::Method,
            });
        }

        if self.match_token(&TokenKind::Colon) {
            let value = self.parse_assignment_expression()?;
            return Ok(ObjectMember::Property {
                key,
                value,
                shorthand: false,
            });
        }

        let Some(id) = shorthand else {
            return Err(self.unexpected_token("':'"));
        };

        // `{ a = 1 }` is only valid once the literal becomes a pattern
        let value = if self.check(&TokenKind::Eq) {
            self.cover_errors.push(self.current.span);
            self.advance();
            let default = self.parse_assignment_expression()?;
            let span = self.span_from(start);
            Expression::Assignment(Rc::new(AssignmentExpression {
                operator: AssignmentOp::Assign,
                target: AssignmentTarget::Simple(Expression::Identifier(id)),
                value: default,
                span,
            }))
        } else {
            Expression::Identifier(id)
        };

        Ok(ObjectMember::Property {
            key,
            value,
            shorthand: true,
        })
    }

    /// Parse a property name. The second element is the identifier a
    /// shorthand property would refer to.
    fn parse_property_name(&mut self) -> Result<(PropertyName, Option<Identifier>), JsError> {
        let span = self.current.span;
        let shorthand = if self.check_identifier_reference() {
            Some(self.parse_identifier_reference_name()?)
        } else {
            None
        };
        if let Some(name) = shorthand {
            let id = Identifier {
                name: name.cheap_clone(),
                span,
            };
            return Ok((PropertyName::Static(name), Some(id)));
        }

        let key = match self.current.kind.clone() {
            TokenKind::String(s) => {
                self.advance();
                PropertyName::Static(s)
            }
            TokenKind::Number(n) => {
                self.advance();
                PropertyName::Static(self.intern(&number_to_string(n)))
            }
            TokenKind::LBracket => {
                self.advance();
                let expr = self.allow_in(|p| p.parse_assignment_expression())?;
                self.require_token(&TokenKind::RBracket)?;
                PropertyName::Computed(expr)
            }
            TokenKind::BigInt => return Err(self.unsupported("BigInt literal")),
            _ => PropertyName::Static(self.parse_identifier_name()?),
        };
        Ok((key, None))
    }

    // ============ IDENTIFIERS ============

    /// Whether the current token can be used as an identifier reference here
    fn check_identifier_reference(&self) -> bool {
        match self.current.kind {
            TokenKind::Identifier(_) => true,
            TokenKind::Let => !self.strict,
            TokenKind::Yield => !self.strict && !self.ctx.generator,
            TokenKind::Await => !self.module && !self.ctx.async_,
            _ => false,
        }
    }

    fn parse_identifier_reference_name(&mut self) -> Result<JsString, JsError> {
        let name = if let TokenKind::Identifier(name) = &self.current.kind {
            name.cheap_clone()
        } else if self.check_identifier_reference()
            && let Some(text) = self.current.kind.keyword_text()
        {
            self.intern(text)
        } else {
            return Err(self.unexpected_token("identifier"));
        };
        self.advance();
        Ok(name)
    }

    fn parse_binding_identifier(&mut self) -> Result<Identifier, JsError> {
        let span = self.current.span;
        let name = self.parse_identifier_reference_name()?;
        self.check_binding_name(&name, span)?;
        Ok(Identifier { name, span })
    }

    /// Property names after `.`, in object literals and export lists: keywords allowed
    fn parse_identifier_name(&mut self) -> Result<JsString, JsError> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let name = name.cheap_clone();
            self.advance();
            return Ok(name);
        }
        if let Some(text) = self.current.kind.keyword_text() {
            let name = self.intern(text);
            self.advance();
            return Ok(name);
        }
        Err(self.unexpected_token("identifier"))
    }

    fn check_binding_name(&self, name: &JsString, span: Span) -> Result<(), JsError> {
        if !self.strict {
            return Ok(());
        }
        if name == "eval" || name == "arguments" {
            return Err(JsError::syntax_error(
                format!("Unexpected eval or arguments in strict mode ('{}')", name),
                span.line,
                span.column,
            ));
        }
        if name == "let" || name == "yield" || STRICT_RESERVED.contains(&name.as_str()) {
            return Err(JsError::syntax_error(
                format!("Unexpected strict mode reserved word '{}'", name),
                span.line,
                span.column,
            ));
        }
        Ok(())
    }

    fn check_assignment_name(&self, name: &JsString, span: Span) -> Result<(), JsError> {
        if self.strict && (name == "eval" || name == "arguments") {
            return Err(JsError::syntax_error(
                format!("Unexpected eval or arguments in strict mode ('{}')", name),
                span.line,
                span.column,
            ));
        }
        Ok(())
    }

    /// Identifier or member expression
    fn check_simple_target(&self, expr: &Expression, message: &str) -> Result<(), JsError> {
        match expr {
            Expression::Identifier(id) => self.check_assignment_name(&id.name, id.span),
            Expression::Member(_) => Ok(()),
            _ => Err(invalid_target(expr, message)),
        }
    }

    // ============ SCOPE CHECKS ============

    /// Lexical names must be unique and must not collide with var-scoped names
    fn check_lexical_conflicts(
        &self,
        lexical: &[JsString],
        var_like: &[JsString],
        span: Span,
    ) -> Result<(), JsError> {
        if let Some(dup) = find_duplicate(lexical) {
            return Err(already_declared(dup, span));
        }
        let lexical_set: FxHashSet<&JsString> = lexical.iter().collect();
        if let Some(conflict) = var_like.iter().find(|n| lexical_set.contains(n)) {
            return Err(already_declared(conflict, span));
        }
        Ok(())
    }

    /// Block-level declarations: functions in blocks are lexical, but sloppy
    /// code tolerates repeated function declarations of one name
    fn check_block_scope(
        &self,
        scope: &BlockScope,
        vars: &[JsString],
        span: Span,
    ) -> Result<(), JsError> {
        let mut seen: rustc_hash::FxHashMap<JsString, bool> = rustc_hash::FxHashMap::default();
        for lexical in &scope.lexical {
            if seen.insert(lexical.name.cheap_clone(), false).is_some() {
                return Err(already_declared(&lexical.name, span));
            }
        }
        for func in &scope.functions {
            let name = hoist::function_binding_name(func);
            match seen.get(&name) {
                Some(false) => return Err(already_declared(&name, span)),
                Some(true) if self.strict => return Err(already_declared(&name, span)),
                _ => {
                    seen.insert(name, true);
                }
            }
        }
        if let Some(conflict) = vars.iter().find(|v| seen.contains_key(*v)) {
            return Err(already_declared(conflict, span));
        }
        Ok(())
    }

    fn check_duplicate_names(&self, names: &[JsString], span: Span) -> Result<(), JsError> {
        match find_duplicate(names) {
            Some(dup) => Err(already_declared(dup, span)),
            None => Ok(()),
        }
    }

    // ============ TOKEN HELPERS ============

    fn is_at_end(&self) -> bool {
        self.check(&TokenKind::Eof)
    }

    fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, self.lexer.next_token());
    }

    fn require_token(&mut self, kind: &TokenKind) -> Result<(), JsError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected_token(&format!("'{}'", token_text(kind))))
        }
    }

    fn expect_semicolon(&mut self) -> Result<(), JsError> {
        if self.match_token(&TokenKind::Semicolon) {
            return Ok(());
        }

        // ASI: accept if at end, before }, or after newline
        if self.is_at_end() || self.check(&TokenKind::RBrace) || self.lexer.had_newline_before() {
            return Ok(());
        }

        Err(self.unexpected_token("';'"))
    }

    /// A return/break argument is omitted at `;`, `}`, end of input or a line break
    fn at_statement_end(&self) -> bool {
        self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RBrace)
            || self.is_at_end()
            || self.lexer.had_newline_before()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    /// Contextual keywords (`of`, `as`, `from`, `async`, `target`) are plain identifiers
    fn check_contextual(&self, word: &str) -> bool {
        matches!(&self.current.kind, TokenKind::Identifier(s) if s == word)
    }

    fn require_contextual(&mut self, word: &str) -> Result<(), JsError> {
        if self.check_contextual(word) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected_token(&format!("'{}'", word)))
        }
    }

    /// The token after the current one, and whether a line break precedes it
    fn peek_token(&mut self) -> (Token, bool) {
        let checkpoint = self.lexer.checkpoint();
        let next = self.lexer.next_token();
        let newline = self.lexer.had_newline_before();
        self.lexer.restore(checkpoint);
        (next, newline)
    }

    /// Check if the next token (after current) is of the given kind
    fn peek_is(&mut self, kind: &TokenKind) -> bool {
        let (next, _) = self.peek_token();
        std::mem::discriminant(&next.kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn span_from(&self, start: Span) -> Span {
        Span::new(
            start.start,
            self.previous.span.end,
            start.line,
            start.column,
        )
    }

    fn error(&self, message: &str) -> JsError {
        JsError::syntax_error(message, self.current.span.line, self.current.span.column)
    }

    fn unsupported(&self, what: &str) -> JsError {
        self.error(&format!("{} is not supported", what))
    }

    fn unexpected_token(&self, expected: &str) -> JsError {
        let message = match &self.current.kind {
            TokenKind::UnterminatedString => "Unterminated string literal".to_string(),
            TokenKind::Invalid(c) => format!("Invalid or unexpected token '{}'", c),
            kind => format!("Unexpected {}, expected {}", describe_token(kind), expected),
        };
        JsError::syntax_error(message, self.current.span.line, self.current.span.column)
    }

    fn current_binary_op(&self) -> Option<(InfixOp, u8)> {
        use InfixOp::{Binary, Logical};
        let op = match &self.current.kind {
            TokenKind::QuestionQuestion => (Logical(LogicalOp::NullishCoalescing), 1),
            TokenKind::PipePipe => (Logical(LogicalOp::Or), 2),
            TokenKind::AmpAmp => (Logical(LogicalOp::And), 3),
            TokenKind::Pipe => (Binary(BinaryOp::BitOr), 4),
            TokenKind::Caret => (Binary(BinaryOp::BitXor), 5),
            TokenKind::Amp => (Binary(BinaryOp::BitAnd), 6),
            TokenKind::EqEq => (Binary(BinaryOp::Eq), 7),
            TokenKind::BangEq => (Binary(BinaryOp::NotEq), 7),
            TokenKind::EqEqEq => (Binary(BinaryOp::StrictEq), 7),
            TokenKind::BangEqEq => (Binary(BinaryOp::StrictNotEq), 7),
            TokenKind::Lt => (Binary(BinaryOp::Lt), 8),
            TokenKind::LtEq => (Binary(BinaryOp::LtEq), 8),
            TokenKind::Gt => (Binary(BinaryOp::Gt), 8),
            TokenKind::GtEq => (Binary(BinaryOp::GtEq), 8),
            TokenKind::Instanceof => (Binary(BinaryOp::Instanceof), 8),
            TokenKind::In if !self.no_in => (Binary(BinaryOp::In), 8),
            TokenKind::LtLt => (Binary(BinaryOp::LShift), 9),
            TokenKind::GtGt => (Binary(BinaryOp::RShift), 9),
            TokenKind::GtGtGt => (Binary(BinaryOp::URShift), 9),
            TokenKind::Plus => (Binary(BinaryOp::Add), 10),
            TokenKind::Minus => (Binary(BinaryOp::Sub), 10),
            TokenKind::Star => (Binary(BinaryOp::Mul), 11),
            TokenKind::Slash => (Binary(BinaryOp::Div), 11),
            TokenKind::Percent => (Binary(BinaryOp::Mod), 11),
            TokenKind::StarStar => (Binary(BinaryOp::Exp), 12),
            _ => return None,
        };
        Some(op)
    }

    fn current_unary_op(&self) -> Option<UnaryOp> {
        match &self.current.kind {
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::Delete => Some(UnaryOp::Delete),
            _ => None,
        }
    }

    fn current_update_op(&self) -> Option<UpdateOp> {
        match &self.current.kind {
            TokenKind::PlusPlus => Some(UpdateOp::Increment),
            TokenKind::MinusMinus => Some(UpdateOp::Decrement),
            _ => None,
        }
    }

    fn current_assignment_op(&self) -> Option<AssignmentOp> {
        match &self.current.kind {
            TokenKind::Eq => Some(AssignmentOp::Assign),
            TokenKind::PlusEq => Some(AssignmentOp::AddAssign),
            TokenKind::MinusEq => Some(AssignmentOp::SubAssign),
            TokenKind::StarEq => Some(AssignmentOp::MulAssign),
            TokenKind::SlashEq => Some(AssignmentOp::DivAssign),
            TokenKind::PercentEq => Some(AssignmentOp::ModAssign),
            TokenKind::StarStarEq => Some(AssignmentOp::ExpAssign),
            TokenKind::AmpEq => Some(AssignmentOp::BitAndAssign),
            TokenKind::PipeEq => Some(AssignmentOp::BitOrAssign),
            TokenKind::CaretEq => Some(AssignmentOp::BitXorAssign),
            TokenKind::LtLtEq => Some(AssignmentOp::LShiftAssign),
            TokenKind::GtGtEq => Some(AssignmentOp::RShiftAssign),
            TokenKind::GtGtGtEq => Some(AssignmentOp::URShiftAssign),
            TokenKind::AmpAmpEq => Some(AssignmentOp::AndAssign),
            TokenKind::PipePipeEq => Some(AssignmentOp::OrAssign),
            TokenKind::QuestionQuestionEq => Some(AssignmentOp::NullishAssign),
            _ => None,
        }
    }
}

/// Binary and logical operators share one precedence table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InfixOp {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

/// Everything `finish_function` needs besides the body
struct FunctionHeader {
    id: Option<Identifier>,
    params: Vec<Pattern>,
    rest: Option<Pattern>,
    kind: FunctionKind,
    generator: bool,
    is_async: bool,
    /// The body's own directive prologue switched to strict mode
    became_strict: bool,
    start: Span,
}

fn find_duplicate(names: &[JsString]) -> Option<&JsString> {
    let mut seen = FxHashSet::default();
    names.iter().find(|name| !seen.insert(*name))
}

fn already_declared(name: &JsString, span: Span) -> JsError {
    JsError::syntax_error(
        format!("Identifier '{}' has already been declared", name),
        span.line,
        span.column,
    )
}

fn invalid_target(expr: &Expression, message: &str) -> JsError {
    let span = expr.span();
    JsError::syntax_error(message, span.line, span.column)
}

fn describe_token(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Eof => "end of input".to_string(),
        TokenKind::Identifier(name) => format!("identifier '{}'", name),
        TokenKind::Number(n) => format!("number {}", number_to_string(*n)),
        TokenKind::String(_) => "string".to_string(),
        TokenKind::TemplateHead(_)
        | TokenKind::TemplateMiddle(_)
        | TokenKind::TemplateTail(_)
        | TokenKind::TemplateNoSub(_) => "template string".to_string(),
        TokenKind::BigInt => "BigInt literal".to_string(),
        other => format!("token '{}'", token_text(other)),
    }
}

/// Source text of keyword and punctuator tokens
fn token_text(kind: &TokenKind) -> &'static str {
    if let Some(text) = kind.keyword_text() {
        return text;
    }
    match kind {
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::Slash => "/",
        TokenKind::Percent => "%",
        TokenKind::StarStar => "**",
        TokenKind::PlusPlus => "++",
        TokenKind::MinusMinus => "--",
        TokenKind::Eq => "=",
        TokenKind::EqEq => "==",
        TokenKind::EqEqEq => "===",
        TokenKind::BangEq => "!=",
        TokenKind::BangEqEq => "!==",
        TokenKind::Lt => "<",
        TokenKind::LtEq => "<=",
        TokenKind::Gt => ">",
        TokenKind::GtEq => ">=",
        TokenKind::LtLt => "<<",
        TokenKind::GtGt => ">>",
        TokenKind::GtGtGt => ">>>",
        TokenKind::Amp => "&",
        TokenKind::AmpAmp => "&&",
        TokenKind::Pipe => "|",
        TokenKind::PipePipe => "||",
        TokenKind::Caret => "^",
        TokenKind::Tilde => "~",
        TokenKind::Bang => "!",
        TokenKind::Question => "?",
        TokenKind::QuestionQuestion => "??",
        TokenKind::QuestionDot => "?.",
        TokenKind::PlusEq => "+=",
        TokenKind::MinusEq => "-=",
        TokenKind::StarEq => "*=",
        TokenKind::SlashEq => "/=",
        TokenKind::PercentEq => "%=",
        TokenKind::StarStarEq => "**=",
        TokenKind::AmpEq => "&=",
        TokenKind::PipeEq => "|=",
        TokenKind::CaretEq => "^=",
        TokenKind::LtLtEq => "<<=",
        TokenKind::GtGtEq => ">>=",
        TokenKind::GtGtGtEq => ">>>=",
        TokenKind::AmpAmpEq => "&&=",
        TokenKind::PipePipeEq => "||=",
        TokenKind::QuestionQuestionEq => "??=",
        TokenKind::LParen => "(",
        TokenKind::RParen => ")",
        TokenKind::LBrace => "{",
        TokenKind::RBrace => "}",
        TokenKind::LBracket => "[",
        TokenKind::RBracket => "]",
        TokenKind::Dot => ".",
        TokenKind::DotDotDot => "...",
        TokenKind::Comma => ",",
        TokenKind::Colon => ":",
        TokenKind::Semicolon => ";",
        TokenKind::Arrow => "=>",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        let mut dict = StringDict::new();
        let mut parser = Parser::new(source, &mut dict);
        parser.parse_program(SourceType::Script).unwrap()
    }

    fn parse_module(source: &str) -> Program {
        let mut dict = StringDict::new();
        let mut parser = Parser::new(source, &mut dict);
        parser.parse_program(SourceType::Module).unwrap()
    }

    fn parse_error(source: &str) -> String {
        let mut dict = StringDict::new();
        let mut parser = Parser::new(source, &mut dict);
        match parser.parse_program(SourceType::Script) {
            Ok(_) => panic!("expected a syntax error for {:?}", source),
            Err(JsError::SyntaxError { message, .. }) => message,
            Err(other) => panic!("expected a syntax error, got {:?}", other),
        }
    }

    fn first_expression(program: &Program) -> &Expression {
        match program.body.first() {
            Some(Statement::Expression(expr, _)) => expr,
            other => panic!("expected an expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_variable_declaration() {
        let prog = parse("let x = 1;");
        assert_eq!(prog.body.len(), 1);
        match &prog.body[0] {
            Statement::VariableDeclaration(decl) => {
                assert_eq!(decl.kind, VariableKind::Let);
                assert_eq!(decl.declarations.len(), 1);
            }
            other => panic!("unexpected statement {:?}", other),
        }
        assert_eq!(prog.scope.lexical.len(), 1);
    }

    #[test]
    fn test_binary_precedence() {
        let prog = parse("1 + 2 * 3;");
        let Expression::Binary(add) = first_expression(&prog) else {
            panic!("expected binary expression");
        };
        assert_eq!(add.operator, BinaryOp::Add);
        assert!(matches!(&add.right, Expression::Binary(mul) if mul.operator == BinaryOp::Mul));
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let prog = parse("2 ** 3 ** 2;");
        let Expression::Binary(outer) = first_expression(&prog) else {
            panic!("expected binary expression");
        };
        assert!(matches!(&outer.left, Expression::Literal(LiteralValue::Number(n), _) if *n == 2.0));
        assert!(matches!(&outer.right, Expression::Binary(_)));
        assert!(parse_error("-2 ** 2;").contains("exponentiation"));
        parse("(-2) ** 2;");
    }

    #[test]
    fn test_logical_operators() {
        let prog = parse("a ?? b; c || d && e;");
        assert!(matches!(
            first_expression(&prog),
            Expression::Logical(l) if l.operator == LogicalOp::NullishCoalescing
        ));
        let Some(Statement::Expression(Expression::Logical(or), _)) = prog.body.get(1) else {
            panic!("expected logical expression");
        };
        assert_eq!(or.operator, LogicalOp::Or);
        assert!(matches!(&or.right, Expression::Logical(and) if and.operator == LogicalOp::And));
    }

    #[test]
    fn test_arrow_functions() {
        let prog = parse("const f = (a, b = 2, ...rest) => a + b; const g = x => x; (a);");
        let Statement::VariableDeclaration(decl) = &prog.body[0] else {
            panic!("expected declaration");
        };
        let Some(Expression::ArrowFunction(f)) = &decl.declarations[0].init else {
            panic!("expected arrow function");
        };
        assert_eq!(f.params.len(), 2);
        assert!(f.rest.is_some());
        assert_eq!(f.length, 1);
        assert!(!f.simple_params);
        assert!(matches!(f.body, FunctionBody::Expression(_)));

        // A parenthesized identifier stays an identifier
        assert!(matches!(&prog.body[2], Statement::Expression(Expression::Identifier(_), _)));
    }

    #[test]
    fn test_async_arrow_and_async_call() {
        let prog = parse("const f = async (x) => await x; async(1, 2);");
        let Statement::VariableDeclaration(decl) = &prog.body[0] else {
            panic!("expected declaration");
        };
        assert!(matches!(
            &decl.declarations[0].init,
            Some(Expression::ArrowFunction(f)) if f.async_
        ));
        assert!(matches!(&prog.body[1], Statement::Expression(Expression::Call(_), _)));
    }

    #[test]
    fn test_destructuring_assignment() {
        let prog = parse("[a, b] = [b, a]; ({ x, y: [z = 1] } = obj);");
        assert!(matches!(
            first_expression(&prog),
            Expression::Assignment(a) if matches!(a.target, AssignmentTarget::Pattern(Pattern::Array(_)))
        ));
        assert!(matches!(
            &prog.body[1],
            Statement::Expression(Expression::Assignment(a), _)
                if matches!(a.target, AssignmentTarget::Pattern(Pattern::Object(_)))
        ));
    }

    #[test]
    fn test_shorthand_initializer_requires_pattern() {
        parse("({ a = 1 } = {});");
        parse("[{ a = 1 }] = [{}];");
        assert!(parse_error("({ a = 1 });").contains("shorthand"));
    }

    #[test]
    fn test_invalid_assignment_targets() {
        assert!(parse_error("1 = 2;").contains("left-hand side"));
        assert!(parse_error("a?.b = 1;").contains("left-hand side"));
        assert!(parse_error("f()++;").contains("postfix"));
    }

    #[test]
    fn test_optional_chain_wraps_whole_chain() {
        let prog = parse("a?.b.c();");
        let Expression::OptionalChain(inner, _) = first_expression(&prog) else {
            panic!("expected optional chain");
        };
        assert!(matches!(inner.as_ref(), Expression::Call(_)));
    }

    #[test]
    fn test_template_literal() {
        let prog = parse("`a${1}b${2}c`;");
        let Expression::Template(t) = first_expression(&prog) else {
            panic!("expected template literal");
        };
        assert_eq!(t.quasis.len(), 3);
        assert_eq!(t.expressions.len(), 2);
        assert_eq!(t.quasis[2], "c");
    }

    #[test]
    fn test_use_strict_directive() {
        assert!(parse("'use strict'; var x;").strict);
        assert!(!parse("var x; 'use strict';").strict);
        assert!(parse_error("'use strict'; with (a) {}").contains("with"));
        assert!(parse_error("function f(a, a) { 'use strict'; }").contains("Duplicate"));
        parse("function f(a, a) {}");
        assert!(parse_error("function f(a = 1) { 'use strict'; }").contains("non-simple"));
    }

    #[test]
    fn test_labels_and_jumps() {
        parse("outer: for (;;) { inner: for (;;) { continue outer; } break; }");
        parse("a: b: while (true) { continue a; }");
        parse("block: { break block; }");
        assert!(parse_error("break;").contains("Illegal break"));
        assert!(parse_error("while (1) { continue nope; }").contains("Undefined label"));
        assert!(parse_error("block: { for (;;) { continue block; } }").contains("iteration"));
        assert!(parse_error("a: a: ;").contains("already been declared"));
        assert!(parse_error("return 1;").contains("Illegal return"));
        assert!(parse_error("while (1) { function f() { break; } }").contains("Illegal break"));
    }

    #[test]
    fn test_for_in_of_heads() {
        let prog = parse("for (const [k, v] of pairs) {} for (key in obj) {} for (o.p of list);");
        assert!(matches!(&prog.body[0], Statement::ForOf(f) if matches!(f.left, ForInOfLeft::Variable(VariableKind::Const, _))));
        assert!(matches!(&prog.body[1], Statement::ForIn(f) if matches!(f.left, ForInOfLeft::Pattern(Pattern::Identifier(_)))));
        assert!(matches!(&prog.body[2], Statement::ForOf(f) if matches!(f.left, ForInOfLeft::Pattern(Pattern::Expression(_)))));
        // `in` inside parentheses is allowed in the init of a C-style loop
        parse("for (var i = ('a' in o) ? 1 : 0; i < 3; i++) {}");
    }

    #[test]
    fn test_lexical_redeclaration() {
        assert!(parse_error("let a; let a;").contains("already been declared"));
        assert!(parse_error("let a; var a;").contains("already been declared"));
        assert!(parse_error("{ const b = 1; var b; }").contains("already been declared"));
        assert!(parse_error("function f(x) { let x; }").contains("already been declared"));
        parse("var a; var a; function a() {}");
    }

    #[test]
    fn test_unsupported_constructs() {
        assert!(parse_error("class A {}").contains("not supported"));
        assert!(parse_error("let r = /ab+c/;").contains("regular expression"));
        assert!(parse_error("let n = 10n;").contains("BigInt"));
        assert!(parse_error("async function* g() {}").contains("async generator"));
        assert!(parse_error("tag`x`;").contains("tagged template"));
    }

    #[test]
    fn test_asi_and_restricted_productions() {
        let prog = parse("function f() { return\n1 }");
        let Statement::FunctionDeclaration(f) = &prog.body[0] else {
            panic!("expected function");
        };
        let FunctionBody::Block(body) = &f.body else {
            panic!("expected block body");
        };
        assert!(matches!(body[0], Statement::Return(None, _)));
        assert!(parse_error("throw\nnew Error()").contains("newline"));
        let prog = parse("a\n++b");
        assert_eq!(prog.body.len(), 2);
    }

    #[test]
    fn test_object_literal_members() {
        let prog = parse("({ a, b: 1, [c]: 2, 3: 4, get d() { return 1 }, set d(v) {}, m() {}, *g() {}, async h() {}, ...rest, if: 5 });");
        let Expression::Object(obj) = first_expression(&prog) else {
            panic!("expected object literal");
        };
        assert_eq!(obj.properties.len(), 11);
        assert!(matches!(&obj.properties[4], ObjectMember::Method { kind: MethodKind::Get, .. }));
        assert!(matches!(&obj.properties[7], ObjectMember::Method { function, .. } if function.generator));
        assert!(parse_error("({ get x(a) {} });").contains("Getter"));
    }

    #[test]
    fn test_generator_and_yield() {
        let prog = parse("function* g() { const x = yield 1; yield* other(); yield\n}");
        let Statement::FunctionDeclaration(g) = &prog.body[0] else {
            panic!("expected function");
        };
        assert!(g.generator);
        // Outside generators `yield` is an ordinary identifier in sloppy code
        parse("var yield = 1;");
    }

    #[test]
    fn test_annex_b_function_in_if() {
        let prog = parse("if (true) function f() {}");
        let Statement::If(stmt) = &prog.body[0] else {
            panic!("expected if");
        };
        assert!(matches!(&stmt.consequent, Statement::Block(b) if b.scope.is_some()));
        assert_eq!(prog.scope.block_functions.len(), 1);
    }

    #[test]
    fn test_module_declarations() {
        let prog = parse_module(
            "import def, { a as b, c } from 'dep'; import * as ns from 'other';\n\
             export const x = 1; export function f() {} export default 42; export { b as y };\n\
             export * from 'more';",
        );
        assert!(prog.strict);
        assert!(matches!(&prog.body[0], Statement::Import(i) if i.specifiers.len() == 3));
        assert!(matches!(&prog.body[1], Statement::Import(i) if matches!(i.specifiers[0], ImportSpecifier::Namespace { .. })));

        let mut dict = StringDict::new();
        let err = Parser::new("export { missing };", &mut dict).parse_program(SourceType::Module);
        assert!(err.is_err());
        assert!(parse_error("import x from 'y';").contains("outside a module"));
    }

    #[test]
    fn test_top_level_await_in_module() {
        let prog = parse_module("const v = await Promise.resolve(1);");
        let Statement::VariableDeclaration(decl) = &prog.body[0] else {
            panic!("expected declaration");
        };
        assert!(matches!(&decl.declarations[0].init, Some(Expression::Await(..))));
        // In scripts `await` is an identifier
        parse("var await = 1;");
    }

    #[test]
    fn test_new_expressions() {
        let prog = parse("new Foo; new a.b.C(1)(2); function f() { return new.target; }");
        assert!(matches!(first_expression(&prog), Expression::New(n) if n.arguments.is_empty()));
        assert!(matches!(&prog.body[1], Statement::Expression(Expression::Call(c), _) if matches!(c.callee, Expression::New(_))));
        assert!(parse_error("new.target;").contains("new.target"));
    }
}
