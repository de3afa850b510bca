//! Statement evaluation: blocks, control flow, loops, `switch` and `try`

use std::rc::Rc;

use crate::ast::{
    BlockScope, BlockStatement, ExportDeclaration, Expression, ForInOfLeft, ForInOfStatement, ForInit,
    ForStatement, FunctionNode, IfStatement, Pattern, Program, Statement, SwitchStatement, TryStatement,
    VariableDeclaration, VariableKind, WhileStatement, WithStatement,
};
use crate::completion::Completion;
use crate::environment::{
    EnvRef, EnvironmentRecord, copy_declarative_environment, new_declarative_environment,
    new_object_environment,
};
use crate::error::JsError;
use crate::hoist::function_binding_name;
use crate::interpreter::Interpreter;
use crate::interpreter::frame::{
    BindMode, ExecutionContext, ForInOfKind, ForInOfPhase, ForInOfSource, ForPhase, Frame, Labels,
    LoopPhase, StackHeight, SwitchPhase, TryPhase,
};
use crate::interpreter::iteration::ForInIterator;
use crate::interpreter::reference::same_env;
use crate::value::{CheapClone, JsString, JsValue};

impl Interpreter {
    // ═══════════════════════════════════════════════════════════════════════
    // Dispatch
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn exec_statement(
        &mut self,
        ctx: &mut ExecutionContext,
        stmt: Statement,
        labels: Labels,
    ) -> Result<(), JsError> {
        match stmt {
            Statement::VariableDeclaration(decl) => ctx.push(Frame::VarDeclaration { decl, index: 0 }),
            Statement::FunctionDeclaration(func) => {
                self.block_function_evaluation(ctx, &func)?;
                ctx.complete(None);
            }
            Statement::Block(block) => self.enter_block(ctx, &block),
            Statement::If(node) => {
                let test = node.test.cheap_clone();
                ctx.push(Frame::If(node));
                ctx.push(Frame::Expr(test));
            }
            Statement::While(node) => {
                let test = node.test.cheap_clone();
                ctx.push(Frame::While {
                    node,
                    labels,
                    value: JsValue::Undefined,
                    phase: LoopPhase::Test,
                });
                ctx.push(Frame::Expr(test));
            }
            Statement::DoWhile(node) => {
                let body = node.body.cheap_clone();
                ctx.push(Frame::DoWhile {
                    node,
                    labels,
                    value: JsValue::Undefined,
                    phase: LoopPhase::Body,
                });
                ctx.push(Frame::Stmt(body));
            }
            Statement::For(node) => self.start_for(ctx, node, labels),
            Statement::ForIn(node) => self.start_for_in_of(ctx, node, ForInOfKind::In, labels),
            Statement::ForOf(node) => self.start_for_in_of(ctx, node, ForInOfKind::Of, labels),
            Statement::Switch(node) => {
                let discriminant = node.discriminant.cheap_clone();
                ctx.push(Frame::Switch {
                    node,
                    phase: SwitchPhase::Discriminant,
                    value: JsValue::Undefined,
                    outer_env: ctx.env.cheap_clone(),
                    height: ctx.height(),
                });
                ctx.push(Frame::Expr(discriminant));
            }
            Statement::Try(node) => {
                let block = node.block.cheap_clone();
                ctx.push(Frame::Try {
                    node,
                    phase: TryPhase::Block,
                    pending: None,
                    env: ctx.env.cheap_clone(),
                    height: ctx.height(),
                });
                self.enter_block(ctx, &block);
            }
            Statement::With(node) => {
                let object = node.object.cheap_clone();
                ctx.push(Frame::With(node));
                ctx.push(Frame::Expr(object));
            }
            Statement::Labeled(node) => {
                let mut label_set = labels.to_vec();
                label_set.push(node.label.cheap_clone());
                ctx.push(Frame::Labeled {
                    label: node.label.cheap_clone(),
                    height: ctx.height(),
                });
                ctx.push(Frame::LabeledStmt {
                    stmt: node.body.cheap_clone(),
                    labels: Rc::from(label_set),
                });
            }
            Statement::Return(argument, _) => match argument {
                Some(expr) => {
                    ctx.push(Frame::Return);
                    ctx.push(Frame::Expr(expr));
                }
                None => ctx.abrupt(Completion::Return(JsValue::Undefined)),
            },
            Statement::Break(label, _) => ctx.abrupt(Completion::Break(label, None)),
            Statement::Continue(label, _) => ctx.abrupt(Completion::Continue(label, None)),
            Statement::Throw(expr, _) => {
                ctx.push(Frame::Throw);
                ctx.push(Frame::Expr(expr));
            }
            Statement::Export(export) => match export.as_ref() {
                ExportDeclaration::Declaration(inner) => ctx.push(Frame::Stmt(inner.cheap_clone())),
                ExportDeclaration::DefaultExpression(expr) => {
                    ctx.push(Frame::ExportDefault);
                    self.push_named_expr(ctx, expr, Some(JsString::from("default")));
                }
                _ => ctx.complete(None),
            },
            Statement::Expression(expr, _) => {
                ctx.push(Frame::ExpressionStatement);
                ctx.push(Frame::Expr(expr));
            }
            Statement::Import(_) | Statement::Empty | Statement::Debugger => ctx.complete(None),
        }
        Ok(())
    }

    /// Run `body[index]`, remembering the last non-empty value
    pub(crate) fn statement_list(
        &mut self,
        ctx: &mut ExecutionContext,
        body: Rc<[Statement]>,
        index: usize,
        last: Option<JsValue>,
    ) {
        let last = match &ctx.completion {
            Completion::Normal(Some(value)) if index > 0 => Some(value.cheap_clone()),
            _ => last,
        };
        let Some(stmt) = body.get(index).cloned() else {
            ctx.complete(last);
            return;
        };
        ctx.push(Frame::StatementList {
            body,
            index: index + 1,
            last,
        });
        ctx.complete(None);
        ctx.push(Frame::Stmt(stmt));
    }

    /// Evaluate an expression that may be an anonymous function taking its
    /// name from the binding it initializes
    pub(crate) fn push_named_expr(&mut self, ctx: &mut ExecutionContext, expr: &Expression, name: Option<JsString>) {
        match (expr, name) {
            (Expression::Function(func) | Expression::ArrowFunction(func), Some(name))
                if expr.is_anonymous_function_definition() =>
            {
                let env = ctx.env.cheap_clone();
                let function = self.instantiate_function_object(func, &env, Some(name));
                ctx.push_value(JsValue::Object(function));
            }
            _ => ctx.push(Frame::Expr(expr.cheap_clone())),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Declarations and blocks
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn var_declaration(
        &mut self,
        ctx: &mut ExecutionContext,
        decl: Rc<VariableDeclaration>,
        index: usize,
    ) -> Result<(), JsError> {
        let Some(declarator) = decl.declarations.get(index).cloned() else {
            ctx.complete(None);
            return Ok(());
        };
        let kind = decl.kind;
        ctx.push(Frame::VarDeclaration { decl, index: index + 1 });
        match (&declarator.init, &declarator.id) {
            (None, Pattern::Identifier(id)) => {
                if kind == VariableKind::Let {
                    let env = ctx.env.cheap_clone();
                    self.initialize_binding(&env, &id.name, JsValue::Undefined)?;
                }
            }
            (None, _) => {}
            (Some(init), pattern) => {
                let mode = match kind {
                    VariableKind::Var => BindMode::Put,
                    VariableKind::Let | VariableKind::Const => BindMode::Initialize(ctx.env.cheap_clone()),
                };
                let name = match pattern {
                    Pattern::Identifier(id) => Some(id.name.cheap_clone()),
                    _ => None,
                };
                ctx.push(Frame::Bind {
                    pattern: pattern.cheap_clone(),
                    mode,
                });
                self.push_named_expr(ctx, init, name);
            }
        }
        Ok(())
    }

    /// Enter a block: new scope if it declares anything, then its statements
    pub(crate) fn enter_block(&mut self, ctx: &mut ExecutionContext, block: &Rc<BlockStatement>) {
        if let Some(scope) = &block.scope {
            let outer = ctx.env.cheap_clone();
            let env = new_declarative_environment(&outer);
            self.block_declaration_instantiation(&env, scope);
            ctx.push(Frame::RestoreEnv(outer));
            ctx.env = env;
        }
        ctx.push(Frame::StatementList {
            body: block.body.cheap_clone(),
            index: 0,
            last: None,
        });
    }

    /// BlockDeclarationInstantiation
    pub(crate) fn block_declaration_instantiation(&mut self, env: &EnvRef, scope: &BlockScope) {
        let functions: Vec<(JsString, JsValue)> = scope
            .functions
            .iter()
            .map(|func| {
                let name = function_binding_name(func);
                let object = self.instantiate_function_object(func, env, None);
                (name, JsValue::Object(object))
            })
            .collect();

        let mut e = env.borrow_mut();
        let Some(decl) = e.declarative_mut() else {
            return;
        };
        for lexical in &scope.lexical {
            if lexical.constant {
                decl.create_immutable_binding(lexical.name.cheap_clone(), true);
            } else {
                decl.create_mutable_binding(lexical.name.cheap_clone(), false);
            }
        }
        for (name, function) in functions {
            if !decl.has_binding(&name) {
                decl.create_mutable_binding(name.cheap_clone(), false);
            }
            decl.initialize_binding(&name, function);
        }
    }

    /// Sloppy-mode block functions also assign the same-named var binding
    /// when their declaration is evaluated
    fn block_function_evaluation(&mut self, ctx: &mut ExecutionContext, func: &FunctionNode) -> Result<(), JsError> {
        if ctx.strict || func.strict || same_env(&ctx.env, &ctx.var_env) {
            return Ok(());
        }
        let Some(id) = &func.id else {
            return Ok(());
        };
        let name = &id.name;

        // A lexical declaration between the block and the var scope wins
        let mut current = ctx.env.borrow().outer.clone();
        while let Some(env) = current {
            if same_env(&env, &ctx.var_env) {
                break;
            }
            let e = env.borrow();
            if e.declarative().is_some_and(|decl| decl.has_binding(name)) {
                return Ok(());
            }
            current = e.outer.clone();
        }

        let value = ctx.env.borrow().declarative().and_then(|decl| decl.peek(name));
        let Some(value) = value else {
            return Ok(());
        };
        let hoisted = {
            let var_env = ctx.var_env.borrow();
            match &var_env.record {
                EnvironmentRecord::Global(global) => global.has_var_declaration(name),
                _ => var_env.declarative().is_some_and(|decl| decl.is_initialized(name)),
            }
        };
        if hoisted {
            let var_env = ctx.var_env.cheap_clone();
            self.set_mutable_binding(&var_env, name, value, false)?;
        }
        Ok(())
    }

    /// GlobalDeclarationInstantiation
    pub(crate) fn global_declaration_instantiation(
        &mut self,
        ctx: &mut ExecutionContext,
        program: &Program,
    ) -> Result<(), JsError> {
        let scope = program.scope.cheap_clone();
        let env = ctx.env.cheap_clone();
        {
            let e = env.borrow();
            let EnvironmentRecord::Global(global) = &e.record else {
                return Err(JsError::internal_error("script instantiated outside the global scope"));
            };
            for lexical in &scope.lexical {
                let name = &lexical.name;
                if global.has_var_declaration(name)
                    || global.has_lexical_declaration(name)
                    || global.has_restricted_global_property(name)
                {
                    return Err(already_declared(name));
                }
            }
            let function_names = scope.functions.iter().map(|f| function_binding_name(f));
            for name in scope.var_names.iter().cloned().chain(function_names) {
                if global.has_lexical_declaration(&name) {
                    return Err(already_declared(&name));
                }
            }
            for func in &scope.functions {
                let name = function_binding_name(func);
                if !global.can_declare_global_function(&name) {
                    return Err(JsError::type_error(format!("Cannot declare global function '{}'", name)));
                }
            }
            for name in &scope.var_names {
                if !global.can_declare_global_var(name) {
                    return Err(JsError::type_error(format!("Cannot declare global variable '{}'", name)));
                }
            }
        }

        let functions: Vec<(JsString, JsValue)> = scope
            .functions
            .iter()
            .map(|func| {
                let object = self.instantiate_function_object(func, &env, None);
                (function_binding_name(func), JsValue::Object(object))
            })
            .collect();

        let mut e = env.borrow_mut();
        let EnvironmentRecord::Global(global) = &mut e.record else {
            return Err(JsError::internal_error("script instantiated outside the global scope"));
        };
        if !program.strict {
            for name in &scope.block_functions {
                if !global.has_lexical_declaration(name) && global.can_declare_global_var(name) {
                    global.create_global_var_binding(name.cheap_clone(), false);
                }
            }
        }
        for lexical in &scope.lexical {
            if lexical.constant {
                global.decl.create_immutable_binding(lexical.name.cheap_clone(), true);
            } else {
                global.decl.create_mutable_binding(lexical.name.cheap_clone(), false);
            }
        }
        for (name, function) in functions {
            if !global.create_global_function_binding(name.cheap_clone(), function, false) {
                return Err(JsError::type_error(format!("Cannot declare global function '{}'", name)));
            }
        }
        for name in &scope.var_names {
            global.create_global_var_binding(name.cheap_clone(), false);
        }
        ctx.complete(None);
        Ok(())
    }

    pub(crate) fn export_default(&mut self, ctx: &mut ExecutionContext) -> Result<(), JsError> {
        let value = ctx.pop_value()?;
        let env = ctx.env.cheap_clone();
        self.initialize_binding(&env, &JsString::from("*default*"), value)?;
        ctx.complete(None);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Simple control flow
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn if_statement(&mut self, ctx: &mut ExecutionContext, node: Rc<IfStatement>) -> Result<(), JsError> {
        let test = ctx.pop_value()?.to_boolean();
        let branch = if test {
            Some(node.consequent.cheap_clone())
        } else {
            node.alternate.clone()
        };
        match branch {
            Some(stmt) => {
                ctx.push(Frame::UpdateEmpty);
                ctx.push(Frame::Stmt(stmt));
            }
            None => ctx.complete(Some(JsValue::Undefined)),
        }
        Ok(())
    }

    pub(crate) fn with_statement(&mut self, ctx: &mut ExecutionContext, node: Rc<WithStatement>) -> Result<(), JsError> {
        let value = ctx.pop_value()?;
        let object = self.to_object(&value)?;
        let outer = ctx.env.cheap_clone();
        ctx.push(Frame::UpdateEmpty);
        ctx.push(Frame::RestoreEnv(outer.cheap_clone()));
        ctx.env = new_object_environment(object, true, &outer);
        ctx.push(Frame::Stmt(node.body.cheap_clone()));
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Loops
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn while_loop(
        &mut self,
        ctx: &mut ExecutionContext,
        node: Rc<WhileStatement>,
        labels: Labels,
        value: JsValue,
        phase: LoopPhase,
    ) -> Result<(), JsError> {
        match phase {
            LoopPhase::Test => {
                if !ctx.pop_value()?.to_boolean() {
                    ctx.complete(Some(value));
                    return Ok(());
                }
                let body = node.body.cheap_clone();
                ctx.push(Frame::While {
                    node,
                    labels,
                    value,
                    phase: LoopPhase::Body,
                });
                ctx.complete(None);
                ctx.push(Frame::Stmt(body));
            }
            LoopPhase::Body => {
                let value = body_value(ctx, value);
                let test = node.test.cheap_clone();
                ctx.push(Frame::While {
                    node,
                    labels,
                    value,
                    phase: LoopPhase::Test,
                });
                ctx.push(Frame::Expr(test));
            }
        }
        Ok(())
    }

    pub(crate) fn do_while_loop(
        &mut self,
        ctx: &mut ExecutionContext,
        node: Rc<WhileStatement>,
        labels: Labels,
        value: JsValue,
        phase: LoopPhase,
    ) -> Result<(), JsError> {
        match phase {
            LoopPhase::Body => {
                let value = body_value(ctx, value);
                let test = node.test.cheap_clone();
                ctx.push(Frame::DoWhile {
                    node,
                    labels,
                    value,
                    phase: LoopPhase::Test,
                });
                ctx.push(Frame::Expr(test));
            }
            LoopPhase::Test => {
                if !ctx.pop_value()?.to_boolean() {
                    ctx.complete(Some(value));
                    return Ok(());
                }
                let body = node.body.cheap_clone();
                ctx.push(Frame::DoWhile {
                    node,
                    labels,
                    value,
                    phase: LoopPhase::Body,
                });
                ctx.complete(None);
                ctx.push(Frame::Stmt(body));
            }
        }
        Ok(())
    }

    fn start_for(&mut self, ctx: &mut ExecutionContext, node: Rc<ForStatement>, labels: Labels) {
        let outer_env = ctx.env.cheap_clone();
        let mut per_iteration = Vec::new();
        if let Some(ForInit::Variable(decl)) = &node.init
            && decl.kind != VariableKind::Var
        {
            let loop_env = new_declarative_environment(&outer_env);
            if let Some(bindings) = loop_env.borrow_mut().declarative_mut() {
                for declarator in &decl.declarations {
                    let mut names = Vec::new();
                    declarator.id.collect_bound_names(&mut names);
                    for name in names {
                        if decl.kind == VariableKind::Const {
                            bindings.create_immutable_binding(name, true);
                        } else {
                            bindings.create_mutable_binding(name.cheap_clone(), false);
                            per_iteration.push(name);
                        }
                    }
                }
            }
            ctx.env = loop_env;
        }
        let init = node.init.clone();
        ctx.push(Frame::For {
            node,
            labels,
            value: JsValue::Undefined,
            phase: ForPhase::Init,
            per_iteration: Rc::from(per_iteration),
            outer_env,
        });
        match init {
            Some(ForInit::Variable(decl)) => ctx.push(Frame::VarDeclaration { decl, index: 0 }),
            Some(ForInit::Expression(expr)) => {
                ctx.push(Frame::Discard);
                ctx.push(Frame::Expr(expr));
            }
            None => {}
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn for_loop(
        &mut self,
        ctx: &mut ExecutionContext,
        node: Rc<ForStatement>,
        labels: Labels,
        value: JsValue,
        phase: ForPhase,
        per_iteration: Rc<[JsString]>,
        outer_env: EnvRef,
    ) -> Result<(), JsError> {
        let next_phase = match phase {
            ForPhase::Init => {
                if !per_iteration.is_empty() {
                    ctx.env = copy_declarative_environment(&ctx.env);
                }
                ForPhase::Test
            }
            ForPhase::Test => {
                if !ctx.pop_value()?.to_boolean() {
                    ctx.env = outer_env;
                    ctx.complete(Some(value));
                    return Ok(());
                }
                ForPhase::Body
            }
            ForPhase::Body => {
                let value = body_value(ctx, value);
                if !per_iteration.is_empty() {
                    ctx.env = copy_declarative_environment(&ctx.env);
                }
                if let Some(update) = node.update.clone() {
                    ctx.push(Frame::For {
                        node,
                        labels,
                        value,
                        phase: ForPhase::Update,
                        per_iteration,
                        outer_env,
                    });
                    ctx.push(Frame::Discard);
                    ctx.push(Frame::Expr(update));
                    return Ok(());
                }
                return self.for_loop(ctx, node, labels, value, ForPhase::Update, per_iteration, outer_env);
            }
            ForPhase::Update => ForPhase::Test,
        };

        match (next_phase, node.test.clone()) {
            (ForPhase::Test, Some(test)) => {
                ctx.push(Frame::For {
                    node,
                    labels,
                    value,
                    phase: ForPhase::Test,
                    per_iteration,
                    outer_env,
                });
                ctx.push(Frame::Expr(test));
            }
            _ => {
                let body = node.body.cheap_clone();
                ctx.push(Frame::For {
                    node,
                    labels,
                    value,
                    phase: ForPhase::Body,
                    per_iteration,
                    outer_env,
                });
                ctx.complete(None);
                ctx.push(Frame::Stmt(body));
            }
        }
        Ok(())
    }

    fn start_for_in_of(
        &mut self,
        ctx: &mut ExecutionContext,
        node: Rc<ForInOfStatement>,
        kind: ForInOfKind,
        labels: Labels,
    ) {
        let outer_env = ctx.env.cheap_clone();
        // let/const names are in their TDZ while the right-hand side runs
        if let ForInOfLeft::Variable(var_kind, pattern) = &node.left
            && *var_kind != VariableKind::Var
        {
            let mut names = Vec::new();
            pattern.collect_bound_names(&mut names);
            if !names.is_empty() {
                let tdz = new_declarative_environment(&outer_env);
                if let Some(bindings) = tdz.borrow_mut().declarative_mut() {
                    for name in names {
                        bindings.create_mutable_binding(name, false);
                    }
                }
                ctx.env = tdz;
            }
        }
        let right = node.right.cheap_clone();
        ctx.push(Frame::ForInOf {
            node,
            kind,
            labels,
            value: JsValue::Undefined,
            phase: ForInOfPhase::Source,
            source: None,
            outer_env,
        });
        ctx.push(Frame::Expr(right));
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn for_in_of(
        &mut self,
        ctx: &mut ExecutionContext,
        node: Rc<ForInOfStatement>,
        kind: ForInOfKind,
        labels: Labels,
        value: JsValue,
        phase: ForInOfPhase,
        source: Option<ForInOfSource>,
        outer_env: EnvRef,
    ) -> Result<(), JsError> {
        ctx.env = outer_env.cheap_clone();
        let (mut source, value) = match (phase, source) {
            (ForInOfPhase::Source, _) => {
                let subject = ctx.pop_value()?;
                let source = match kind {
                    ForInOfKind::In => {
                        if subject.is_null_or_undefined() {
                            ctx.complete(Some(JsValue::Undefined));
                            return Ok(());
                        }
                        ForInOfSource::Keys(ForInIterator::new(self.to_object(&subject)?))
                    }
                    ForInOfKind::Of => ForInOfSource::Iterator(self.get_iterator(&subject)?),
                };
                (source, value)
            }
            (ForInOfPhase::Body, Some(source)) => (source, body_value(ctx, value)),
            (ForInOfPhase::Body, None) => {
                return Err(JsError::internal_error("for-in/of body without an iteration source"));
            }
        };

        let next = match &mut source {
            ForInOfSource::Keys(keys) => keys.next_key(),
            ForInOfSource::Iterator(record) => self.iterator_step_value(record)?,
        };
        let Some(next) = next else {
            ctx.complete(Some(value));
            return Ok(());
        };

        let left = node.left.clone();
        let body = node.body.cheap_clone();
        ctx.push(Frame::ForInOf {
            node,
            kind,
            labels,
            value,
            phase: ForInOfPhase::Body,
            source: Some(source),
            outer_env: outer_env.cheap_clone(),
        });
        ctx.complete(None);
        ctx.push(Frame::Stmt(body));
        match left {
            ForInOfLeft::Variable(VariableKind::Var, pattern) | ForInOfLeft::Pattern(pattern) => {
                ctx.push(Frame::Bind {
                    pattern,
                    mode: BindMode::Put,
                });
            }
            ForInOfLeft::Variable(var_kind, pattern) => {
                let iteration_env = new_declarative_environment(&outer_env);
                let mut names = Vec::new();
                pattern.collect_bound_names(&mut names);
                if let Some(bindings) = iteration_env.borrow_mut().declarative_mut() {
                    for name in names {
                        if var_kind == VariableKind::Const {
                            bindings.create_immutable_binding(name, true);
                        } else {
                            bindings.create_mutable_binding(name, false);
                        }
                    }
                }
                ctx.env = iteration_env.cheap_clone();
                ctx.push(Frame::Bind {
                    pattern,
                    mode: BindMode::Initialize(iteration_env),
                });
            }
        }
        ctx.push_value(next);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // switch
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn switch_statement(
        &mut self,
        ctx: &mut ExecutionContext,
        node: Rc<SwitchStatement>,
        phase: SwitchPhase,
        value: JsValue,
        outer_env: EnvRef,
        height: StackHeight,
    ) -> Result<(), JsError> {
        let (discriminant, start) = match phase {
            SwitchPhase::Discriminant => {
                let discriminant = ctx.pop_value()?;
                if let Some(scope) = node.scope.clone() {
                    let env = new_declarative_environment(&outer_env);
                    self.block_declaration_instantiation(&env, &scope);
                    ctx.env = env;
                }
                ctx.complete(None);
                (discriminant, 0)
            }
            SwitchPhase::Test { discriminant, index } => {
                let candidate = ctx.pop_value()?;
                if discriminant.strict_equals(&candidate) {
                    return self.switch_run(ctx, node, index, value, outer_env, height);
                }
                (discriminant, index + 1)
            }
            SwitchPhase::Run { next } => {
                let value = body_value(ctx, value);
                return self.switch_run(ctx, node, next, value, outer_env, height);
            }
        };

        let next_test = node
            .cases
            .iter()
            .enumerate()
            .skip(start)
            .find_map(|(index, case)| case.test.clone().map(|test| (index, test)));
        if let Some((index, test)) = next_test {
            ctx.push(Frame::Switch {
                node,
                phase: SwitchPhase::Test { discriminant, index },
                value,
                outer_env,
                height,
            });
            ctx.push(Frame::Expr(test));
            return Ok(());
        }
        match node.cases.iter().position(|case| case.test.is_none()) {
            Some(default) => self.switch_run(ctx, node, default, value, outer_env, height),
            None => {
                ctx.env = outer_env;
                ctx.complete(Some(value));
                Ok(())
            }
        }
    }

    /// Run the case at `index`; later cases follow by fallthrough
    fn switch_run(
        &mut self,
        ctx: &mut ExecutionContext,
        node: Rc<SwitchStatement>,
        index: usize,
        value: JsValue,
        outer_env: EnvRef,
        height: StackHeight,
    ) -> Result<(), JsError> {
        let Some(body) = node.cases.get(index).map(|case| case.consequent.cheap_clone()) else {
            ctx.env = outer_env;
            ctx.complete(Some(value));
            return Ok(());
        };
        ctx.push(Frame::Switch {
            node,
            phase: SwitchPhase::Run { next: index + 1 },
            value,
            outer_env,
            height,
        });
        ctx.complete(None);
        ctx.push(Frame::StatementList {
            body,
            index: 0,
            last: None,
        });
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // try
    // ═══════════════════════════════════════════════════════════════════════

    /// A try block, catch block or finally block completed normally
    pub(crate) fn try_statement(
        &mut self,
        ctx: &mut ExecutionContext,
        node: Rc<TryStatement>,
        phase: TryPhase,
        pending: Option<Completion>,
        env: EnvRef,
        height: StackHeight,
    ) {
        ctx.env = env.cheap_clone();
        match phase {
            TryPhase::Block | TryPhase::Catch => match node.finalizer.clone() {
                Some(finalizer) => {
                    let completion = ctx.take_completion();
                    ctx.push(Frame::Try {
                        node,
                        phase: TryPhase::Finally,
                        pending: Some(completion),
                        env,
                        height,
                    });
                    self.enter_block(ctx, &finalizer);
                }
                None => {
                    let completion = ctx.take_completion().update_empty(Some(&JsValue::Undefined));
                    ctx.abrupt(completion);
                }
            },
            TryPhase::Finally => {
                let completion = pending.unwrap_or_default().update_empty(Some(&JsValue::Undefined));
                ctx.abrupt(completion);
            }
        }
    }

    /// An abrupt completion reached a try statement
    pub(crate) fn unwind_try(
        &mut self,
        ctx: &mut ExecutionContext,
        node: Rc<TryStatement>,
        phase: TryPhase,
        env: EnvRef,
        height: StackHeight,
    ) {
        ctx.env = env.cheap_clone();
        if phase == TryPhase::Block
            && let Some(handler) = node.handler.clone()
            && let Completion::Throw(thrown) = &ctx.completion
        {
            let thrown = thrown.cheap_clone();
            ctx.truncate(height);
            ctx.complete(None);
            ctx.push(Frame::Try {
                node,
                phase: TryPhase::Catch,
                pending: None,
                env: env.cheap_clone(),
                height,
            });
            match handler.param {
                Some(param) => {
                    let catch_env = new_declarative_environment(&env);
                    let mut names = Vec::new();
                    param.collect_bound_names(&mut names);
                    if let Some(bindings) = catch_env.borrow_mut().declarative_mut() {
                        for name in names {
                            bindings.create_mutable_binding(name, false);
                        }
                    }
                    ctx.env = catch_env.cheap_clone();
                    self.enter_block(ctx, &handler.body);
                    ctx.push_value(thrown);
                    ctx.push(Frame::Bind {
                        pattern: param,
                        mode: BindMode::Initialize(catch_env),
                    });
                }
                None => self.enter_block(ctx, &handler.body),
            }
            return;
        }

        if phase != TryPhase::Finally
            && let Some(finalizer) = node.finalizer.clone()
        {
            ctx.truncate(height);
            let pending = ctx.take_completion();
            ctx.push(Frame::Try {
                node,
                phase: TryPhase::Finally,
                pending: Some(pending),
                env,
                height,
            });
            self.enter_block(ctx, &finalizer);
            return;
        }

        let completion = ctx.take_completion().update_empty(Some(&JsValue::Undefined));
        ctx.abrupt(completion);
    }
}

/// The loop's running value after its body completed normally
fn body_value(ctx: &ExecutionContext, value: JsValue) -> JsValue {
    match &ctx.completion {
        Completion::Normal(Some(v)) => v.cheap_clone(),
        _ => value,
    }
}

fn already_declared(name: &JsString) -> JsError {
    JsError::syntax_error_simple(format!("Identifier '{}' has already been declared", name))
}
