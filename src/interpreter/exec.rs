//! The frame scheduler: dispatch, unwinding and drive loops
//!
//! [`Interpreter::step_context`] is the single place where frames are popped.
//! A normal completion routes the frame to its handler; an abrupt completion
//! routes it to [`Interpreter::unwind`], which lets the few frames that
//! intercept completions (loops, labels, `switch`, `try`, call boundaries and
//! context roots) act and drops everything else.

use log::{debug, warn};

use crate::completion::Completion;
use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::frame::{
    Command, ExecutionContext, ForInOfSource, ForInOfPhase, Frame, TryPhase, YieldValue,
};
use crate::interpreter::iteration::IteratorRecord;
use crate::object::PropertyKey;
use crate::value::{CheapClone, JsValue};

/// Native-to-script calls nest drive loops on the Rust stack
const MAX_NESTED_DRIVES: usize = 32;

/// How a drive loop over one context ended
pub enum RunOutcome {
    /// No frames left; the result is in the completion register
    Finished(Box<ExecutionContext>),
    Awaiting(Box<ExecutionContext>, JsValue),
    Yielded(Box<ExecutionContext>, YieldValue),
    Parked(Box<ExecutionContext>),
}

impl Interpreter {
    // ═══════════════════════════════════════════════════════════════════════
    // Stepping
    // ═══════════════════════════════════════════════════════════════════════

    /// Dispatch exactly one frame of `ctx`
    pub(crate) fn step_context(&mut self, ctx: &mut ExecutionContext) -> Result<Command, JsError> {
        if let Some(reason) = self.budget.tick(&self.config) {
            debug!("aborting task: {} after {} steps", reason, self.budget.steps());
            let err = self.budget.abort_error(reason);
            self.begin_abort(ctx, err);
        } else if ctx.aborting.is_none()
            && let Some(reason) = self.budget.aborted()
        {
            // A context entered after the abort was signalled
            let err = self.budget.abort_error(reason);
            self.begin_abort(ctx, err);
        }

        if ctx.aborting.is_some() && !self.budget.consume_grace(&self.config) {
            warn!("abort grace period exhausted, dropping {} frames", ctx.frames.len());
            ctx.frames.clear();
            return Ok(Command::Proceed);
        }

        let Some(frame) = ctx.frames.pop() else {
            return Ok(Command::Proceed);
        };
        let result = if ctx.completion.is_abrupt() {
            self.unwind(ctx, frame)
        } else {
            self.run_frame(ctx, frame)
        };
        match result {
            Ok(Command::Proceed) => Ok(Command::Proceed),
            // An aborted task never suspends again
            Ok(_) if ctx.aborting.is_some() => {
                ctx.frames.clear();
                Ok(Command::Proceed)
            }
            Ok(command) => Ok(command),
            Err(err) => {
                self.raise(ctx, err)?;
                Ok(Command::Proceed)
            }
        }
    }

    /// Switch `ctx` into abort mode: only `finally` blocks run from here on
    fn begin_abort(&mut self, ctx: &mut ExecutionContext, err: JsError) {
        if ctx.aborting.is_none() {
            ctx.aborting = Some(err);
        }
        ctx.abrupt(Completion::Throw(JsValue::Undefined));
    }

    /// Turn a Rust-level error into a throw completion of `ctx`.
    /// Uncatchable errors escape the context.
    pub(crate) fn raise(&mut self, ctx: &mut ExecutionContext, err: JsError) -> Result<(), JsError> {
        if err.is_abort() {
            self.begin_abort(ctx, err);
            return Ok(());
        }
        if ctx.aborting.is_some() {
            ctx.abrupt(Completion::Throw(JsValue::Undefined));
            return Ok(());
        }
        if !err.is_catchable() {
            return Err(err);
        }
        let value = self.error_value(err);
        ctx.abrupt(Completion::Throw(value));
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Drive loops
    // ═══════════════════════════════════════════════════════════════════════

    /// Step `ctx` until it finishes or suspends
    pub(crate) fn run_context(&mut self, mut ctx: Box<ExecutionContext>) -> Result<RunOutcome, JsError> {
        loop {
            if ctx.frames.is_empty() {
                if let Some(err) = ctx.aborting.take() {
                    return Err(err);
                }
                return Ok(RunOutcome::Finished(ctx));
            }
            match self.step_context(&mut ctx)? {
                Command::Proceed => {}
                Command::Await(value) => return Ok(RunOutcome::Awaiting(ctx, value)),
                Command::Yield(value) => return Ok(RunOutcome::Yielded(ctx, value)),
                Command::Park => return Ok(RunOutcome::Parked(ctx)),
            }
        }
    }

    /// A drive loop started from native code (getters, callbacks, generator
    /// resumption). Nesting is bounded.
    pub(crate) fn drive_nested(&mut self, ctx: Box<ExecutionContext>) -> Result<RunOutcome, JsError> {
        if self.nesting >= MAX_NESTED_DRIVES {
            return Err(JsError::range_error("Maximum call stack size exceeded"));
        }
        self.nesting += 1;
        let outcome = self.run_context(ctx);
        self.nesting -= 1;
        outcome
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Dispatch
    // ═══════════════════════════════════════════════════════════════════════

    fn run_frame(&mut self, ctx: &mut ExecutionContext, frame: Frame) -> Result<Command, JsError> {
        match frame {
            // Statements
            Frame::Stmt(stmt) => {
                let labels = self.empty_labels.cheap_clone();
                self.exec_statement(ctx, stmt, labels)?;
            }
            Frame::LabeledStmt { stmt, labels } => self.exec_statement(ctx, stmt, labels)?,
            Frame::StatementList { body, index, last } => self.statement_list(ctx, body, index, last),
            Frame::RestoreEnv(env) => ctx.env = env,
            Frame::UpdateEmpty => {
                let completion = ctx.take_completion().update_empty(Some(&JsValue::Undefined));
                ctx.abrupt(completion);
            }
            Frame::ExpressionStatement => {
                let value = ctx.pop_value()?;
                ctx.complete(Some(value));
            }
            Frame::VarDeclaration { decl, index } => self.var_declaration(ctx, decl, index)?,
            Frame::If(node) => self.if_statement(ctx, node)?,
            Frame::While {
                node,
                labels,
                value,
                phase,
            } => self.while_loop(ctx, node, labels, value, phase)?,
            Frame::DoWhile {
                node,
                labels,
                value,
                phase,
            } => self.do_while_loop(ctx, node, labels, value, phase)?,
            Frame::For {
                node,
                labels,
                value,
                phase,
                per_iteration,
                outer_env,
            } => self.for_loop(ctx, node, labels, value, phase, per_iteration, outer_env)?,
            Frame::ForInOf {
                node,
                kind,
                labels,
                value,
                phase,
                source,
                outer_env,
            } => self.for_in_of(ctx, node, kind, labels, value, phase, source, outer_env)?,
            Frame::Switch {
                node,
                phase,
                value,
                outer_env,
                height,
            } => self.switch_statement(ctx, node, phase, value, outer_env, height)?,
            Frame::Try {
                node,
                phase,
                pending,
                env,
                height,
            } => self.try_statement(ctx, node, phase, pending, env, height),
            Frame::Labeled { .. } => {}
            Frame::Return => {
                let value = ctx.pop_value()?;
                ctx.abrupt(Completion::Return(value));
            }
            Frame::Throw => {
                let value = ctx.pop_value()?;
                ctx.abrupt(Completion::Throw(value));
            }
            Frame::With(node) => self.with_statement(ctx, node)?,
            Frame::ExportDefault => self.export_default(ctx)?,
            Frame::ModuleBody(module) => self.module_body(ctx, &module)?,
            Frame::ModuleDone(module) => self.module_done(ctx, &module),

            // Expressions
            Frame::Expr(expr) => self.eval_expression(ctx, expr)?,
            Frame::EvalRef(expr) => self.eval_reference(ctx, expr)?,
            Frame::Dup => {
                let value = ctx.peek_value()?.cheap_clone();
                ctx.push_value(value);
            }
            Frame::Discard => {
                ctx.pop_value()?;
            }
            Frame::Sequence { exprs, index } => self.sequence(ctx, exprs, index)?,
            Frame::Template { node, index, text } => self.template(ctx, node, index, text)?,
            Frame::ArrayLiteral {
                node,
                index,
                array,
                pending,
            } => self.array_literal(ctx, node, index, array, pending)?,
            Frame::ObjectLiteral {
                node,
                index,
                object,
                step,
            } => self.object_literal(ctx, node, index, object, step)?,
            Frame::Unary(op) => self.unary(ctx, op)?,
            Frame::DeleteRef => self.delete_ref(ctx)?,
            Frame::BinaryRight(node) => {
                ctx.push(Frame::BinaryApply(node.operator));
                ctx.push(Frame::Expr(node.right.cheap_clone()));
            }
            Frame::BinaryApply(op) => {
                let right = ctx.pop_value()?;
                let left = ctx.pop_value()?;
                let value = self.apply_binary(op, &left, &right)?;
                ctx.push_value(value);
            }
            Frame::LogicalRight(node) => self.logical_right(ctx, node)?,
            Frame::Conditional(node) => self.conditional(ctx, node)?,
            Frame::AssignValue(node) => self.assign_value(ctx, node),
            Frame::AssignRef => {
                let value = ctx.pop_value()?;
                let reference = ctx.pop_ref()?;
                self.put_value(&reference, value.cheap_clone())?;
                ctx.push_value(value);
            }
            Frame::PutRef => {
                let value = ctx.pop_value()?;
                let reference = ctx.pop_ref()?;
                self.put_value(&reference, value)?;
            }
            Frame::CompoundGet(node) => self.compound_get(ctx, node)?,
            Frame::CompoundApply(node) => self.compound_apply(ctx, node)?,
            Frame::UpdateApply(node) => self.update_apply(ctx, node)?,
            Frame::MemberGet(node) => self.member_get(ctx, node)?,
            Frame::MemberGetKey(node) => self.member_get_key(ctx, node)?,
            Frame::MemberRef(node) => self.member_ref(ctx, node)?,
            Frame::MemberRefKey(node) => self.member_ref_key(ctx, node)?,
            Frame::OptionalChainEnd(_) => {}
            Frame::CalleeMember { member, call } => self.callee_member(ctx, member, call)?,
            Frame::CalleeMemberKey { member, call } => self.callee_member_key(ctx, member, call)?,
            Frame::CalleeValue(call) => self.callee_value(ctx, call)?,
            Frame::Arguments {
                list,
                index,
                args,
                pending,
                then,
            } => self.arguments(ctx, list, index, args, pending, then)?,
            Frame::YieldValue => {
                let value = ctx.pop_value()?;
                return Ok(Command::Yield(YieldValue::Value(value)));
            }
            Frame::YieldStarStart => self.yield_star_start(ctx)?,
            Frame::YieldStar(record) => return self.yield_star(ctx, record),
            Frame::AwaitValue => {
                let value = ctx.pop_value()?;
                return Ok(Command::Await(value));
            }

            // Functions
            Frame::CallReturn {
                env,
                var_env,
                strict,
                height,
                construct,
            } => {
                ctx.env = env;
                ctx.var_env = var_env;
                ctx.strict = strict;
                ctx.call_depth = ctx.call_depth.saturating_sub(1);
                ctx.truncate(height);
                let value = construct.map(JsValue::Object).unwrap_or_default();
                ctx.push_value(value);
                ctx.complete(None);
            }
            Frame::BindParameters { node, args, index } => self.bind_parameters(ctx, node, args, index)?,
            Frame::InstantiateBody(node) => self.instantiate_body(ctx, &node)?,
            Frame::GeneratorStart => return Ok(Command::Park),
            Frame::GeneratorRoot => ctx.complete(Some(JsValue::Undefined)),
            Frame::AsyncRoot(promise) => {
                self.resolve_promise_with(&promise, JsValue::Undefined)?;
                ctx.complete(None);
            }
            Frame::ReactionRoot(capability) => {
                let value = ctx.pop_value()?;
                if let Some(capability) = capability {
                    self.call_function(&capability.resolve, JsValue::Undefined, &[value])?;
                }
                ctx.complete(None);
            }
            Frame::ThenableRoot { .. } | Frame::TaskRoot => {
                ctx.values.clear();
                ctx.complete(None);
            }
            Frame::GlobalInstantiation(program) => self.global_declaration_instantiation(ctx, &program)?,

            // Patterns
            Frame::Bind { pattern, mode } => self.bind_pattern(ctx, pattern, mode)?,
            Frame::BindElement {
                target,
                default,
                mode,
                has_ref,
            } => self.bind_element(ctx, target, default, mode, has_ref)?,
            Frame::BindDefault { node, mode } => self.bind_default(ctx, node, mode)?,
            Frame::ObjectPattern {
                node,
                mode,
                source,
                index,
                excluded,
                step,
            } => self.object_pattern(ctx, node, mode, source, index, excluded, step)?,
            Frame::ArrayPattern {
                node,
                mode,
                iter,
                index,
                step,
            } => self.array_pattern(ctx, node, mode, iter, index, step)?,
        }
        Ok(Command::Proceed)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Unwinding
    // ═══════════════════════════════════════════════════════════════════════

    /// Offer the abrupt completion in the register to `frame`
    fn unwind(&mut self, ctx: &mut ExecutionContext, frame: Frame) -> Result<Command, JsError> {
        if ctx.aborting.is_some() {
            self.unwind_aborting(ctx, frame);
            return Ok(Command::Proceed);
        }
        match frame {
            Frame::StatementList { last, .. } => {
                let completion = ctx.take_completion().update_empty(last.as_ref());
                ctx.abrupt(completion);
            }
            Frame::UpdateEmpty => {
                let completion = ctx.take_completion().update_empty(Some(&JsValue::Undefined));
                ctx.abrupt(completion);
            }
            Frame::RestoreEnv(env) => ctx.env = env,
            Frame::Labeled { label, height } => {
                if ctx.completion.breaks_to(&label) {
                    ctx.truncate(height);
                    let value = ctx.completion.value().cloned();
                    ctx.complete(value);
                }
            }
            Frame::While { ref labels, ref value, .. } | Frame::DoWhile { ref labels, ref value, .. } => {
                if ctx.completion.loop_continues(labels) {
                    let carried = ctx.completion.value().cloned();
                    ctx.complete(carried);
                    return self.run_frame(ctx, frame);
                }
                let value = value.cheap_clone();
                exit_breakable(ctx, &value);
            }
            Frame::For {
                ref labels,
                ref value,
                ref outer_env,
                ..
            } => {
                if ctx.completion.loop_continues(labels) {
                    let carried = ctx.completion.value().cloned();
                    ctx.complete(carried);
                    return self.run_frame(ctx, frame);
                }
                ctx.env = outer_env.cheap_clone();
                let value = value.cheap_clone();
                exit_breakable(ctx, &value);
            }
            Frame::ForInOf {
                ref labels,
                ref value,
                ref outer_env,
                ref phase,
                ref source,
                ..
            } => {
                if matches!(phase, ForInOfPhase::Body) && ctx.completion.loop_continues(labels) {
                    let carried = ctx.completion.value().cloned();
                    ctx.complete(carried);
                    return self.run_frame(ctx, frame);
                }
                ctx.env = outer_env.cheap_clone();
                let value = value.cheap_clone();
                exit_breakable(ctx, &value);
                if matches!(phase, ForInOfPhase::Body)
                    && let Some(ForInOfSource::Iterator(record)) = source
                    && !record.done
                {
                    let throwing = matches!(ctx.completion, Completion::Throw(_));
                    self.iterator_close(record, throwing)?;
                }
            }
            Frame::Switch {
                value,
                outer_env,
                height,
                ..
            } => {
                ctx.env = outer_env;
                ctx.truncate(height);
                exit_breakable(ctx, &value);
            }
            Frame::Try {
                node,
                phase,
                env,
                height,
                ..
            } => self.unwind_try(ctx, node, phase, env, height),
            Frame::CallReturn {
                env,
                var_env,
                strict,
                height,
                construct,
            } => {
                ctx.env = env;
                ctx.var_env = var_env;
                ctx.strict = strict;
                ctx.call_depth = ctx.call_depth.saturating_sub(1);
                ctx.truncate(height);
                if let Completion::Return(value) = &ctx.completion {
                    let result = match construct {
                        Some(receiver) if !value.is_object() => JsValue::Object(receiver),
                        _ => value.cheap_clone(),
                    };
                    ctx.push_value(result);
                    ctx.complete(None);
                }
            }
            Frame::YieldStar(record) => return self.unwind_yield_star(ctx, record),
            Frame::ArrayPattern { iter, .. } => {
                if !iter.done {
                    let throwing = matches!(ctx.completion, Completion::Throw(_));
                    self.iterator_close(&iter, throwing)?;
                }
            }
            Frame::GeneratorRoot => {
                if let Completion::Return(value) = &ctx.completion {
                    let value = value.cheap_clone();
                    ctx.complete(Some(value));
                }
            }
            Frame::AsyncRoot(promise) => match ctx.take_completion() {
                Completion::Return(value) => {
                    ctx.complete(None);
                    self.resolve_promise_with(&promise, value)?;
                }
                Completion::Throw(reason) => {
                    ctx.complete(None);
                    self.reject_promise_with(&promise, reason);
                }
                other => ctx.abrupt(other),
            },
            Frame::ReactionRoot(Some(capability)) => {
                if let Completion::Throw(reason) = ctx.take_completion() {
                    ctx.complete(None);
                    self.call_function(&capability.reject, JsValue::Undefined, &[reason])?;
                }
            }
            Frame::ThenableRoot { reject } => {
                if let Completion::Throw(reason) = ctx.take_completion() {
                    ctx.complete(None);
                    self.call_function(&reject, JsValue::Undefined, &[reason])?;
                }
            }
            _ => {}
        }
        Ok(Command::Proceed)
    }

    /// While aborting only `finally` blocks run; call boundaries restore
    /// their caller's state so those blocks see the right scope.
    fn unwind_aborting(&mut self, ctx: &mut ExecutionContext, frame: Frame) {
        match frame {
            Frame::RestoreEnv(env) => ctx.env = env,
            Frame::CallReturn {
                env,
                var_env,
                strict,
                height,
                ..
            } => {
                ctx.env = env;
                ctx.var_env = var_env;
                ctx.strict = strict;
                ctx.call_depth = ctx.call_depth.saturating_sub(1);
                ctx.truncate(height);
            }
            Frame::Try {
                node,
                phase,
                env,
                height,
                ..
            } => {
                ctx.truncate(height);
                ctx.env = env.cheap_clone();
                if phase == TryPhase::Finally {
                    // Whatever the finally block did, the abort keeps propagating
                    ctx.abrupt(Completion::Throw(JsValue::Undefined));
                    return;
                }
                if let Some(finalizer) = node.finalizer.clone() {
                    let marker = ctx.take_completion();
                    ctx.push(Frame::Try {
                        node,
                        phase: TryPhase::Finally,
                        pending: Some(marker),
                        env,
                        height,
                    });
                    self.enter_block(ctx, &finalizer);
                }
            }
            _ => {}
        }
    }

    /// `yield*` forwards a throw or return delivered to the generator to the
    /// inner iterator
    fn unwind_yield_star(&mut self, ctx: &mut ExecutionContext, record: IteratorRecord) -> Result<Command, JsError> {
        let (method_name, argument, is_throw) = match &ctx.completion {
            Completion::Throw(value) => ("throw", value.cheap_clone(), true),
            Completion::Return(value) => ("return", value.cheap_clone(), false),
            _ => return Ok(Command::Proceed),
        };
        let method = self.get_method(&record.iterator, &PropertyKey::from(method_name))?;
        let Some(method) = method else {
            if is_throw {
                ctx.complete(None);
                self.iterator_close(&record, false)?;
                return Err(JsError::type_error("The iterator does not provide a 'throw' method"));
            }
            return Ok(Command::Proceed);
        };
        let result = self.call_function(&method, record.iterator.cheap_clone(), &[argument])?;
        if !result.is_object() {
            return Err(JsError::type_error(format!(
                "Iterator result {} is not an object",
                self.display_value(&result)
            )));
        }
        let done = self.get_v(&result, &PropertyKey::from("done"))?.to_boolean();
        if done {
            let value = self.get_v(&result, &PropertyKey::from("value"))?;
            if is_throw {
                ctx.complete(None);
                ctx.push_value(value);
            } else {
                ctx.abrupt(Completion::Return(value));
            }
            return Ok(Command::Proceed);
        }
        ctx.complete(None);
        ctx.push(Frame::YieldStar(record));
        Ok(Command::Yield(YieldValue::Delegate(result)))
    }
}

/// Leave a breakable statement: an untargeted break becomes normal, anything
/// else keeps propagating with its empty value filled from `value`
fn exit_breakable(ctx: &mut ExecutionContext, value: &JsValue) {
    let completion = ctx.take_completion().update_empty(Some(value));
    if completion.is_untargeted_break() {
        let value = completion.value().cloned();
        ctx.complete(value);
    } else {
        ctx.abrupt(completion);
    }
}
