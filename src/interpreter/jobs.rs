//! Promises, the job queue and task entry points
//!
//! Reactions are never run synchronously: settling a promise enqueues one
//! [`Job`] per reaction and [`Interpreter::step`] starts them once the current
//! task has no frames left. Awaiting contexts are parked inside the promise's
//! reaction lists and re-attached by their job.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::trace;

use crate::completion::Completion;
use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::exec::RunOutcome;
use crate::interpreter::frame::{ContextKind, ExecutionContext, Frame};
use crate::object::{
    ContextSlot, HostFunction, JsFunction, JsObject, JsObjectRef, ObjectKind, PromiseCapability,
    PromiseReaction, PromiseResolver, PromiseState, PromiseStatus, ReactionHandler, ReactionKind,
};
use crate::object::PropertyKey;
use crate::realm::{Job, Task, define_function_metadata};
use crate::value::{CheapClone, JsString, JsValue};

impl Interpreter {
    // ═══════════════════════════════════════════════════════════════════════
    // Promise objects
    // ═══════════════════════════════════════════════════════════════════════

    /// A pending promise inheriting from %Promise.prototype%
    pub(crate) fn create_promise(&mut self) -> JsObjectRef {
        let proto = self.realm.intrinsics.promise_prototype.cheap_clone();
        JsObject::new(ObjectKind::Promise(PromiseState::new()), Some(proto)).into_ref()
    }

    /// A pending promise with the given prototype (subclass construction)
    pub(crate) fn create_promise_with_proto(&mut self, proto: JsObjectRef) -> JsObjectRef {
        JsObject::new(ObjectKind::Promise(PromiseState::new()), Some(proto)).into_ref()
    }

    /// CreateResolvingFunctions
    pub(crate) fn create_resolving_functions(&mut self, promise: &JsObjectRef) -> (JsValue, JsValue) {
        let already_resolved = Rc::new(Cell::new(false));
        let make = |reject: bool| {
            let mut obj = JsObject::new(
                ObjectKind::Function(JsFunction::PromiseResolver(PromiseResolver {
                    promise: promise.cheap_clone(),
                    reject,
                    already_resolved: already_resolved.cheap_clone(),
                })),
                Some(self.realm.intrinsics.function_prototype.cheap_clone()),
            );
            define_function_metadata(&mut obj, JsString::from(""), 1);
            JsValue::Object(obj.into_ref())
        };
        let resolve = make(false);
        let reject = make(true);
        (resolve, reject)
    }

    /// Promise resolve and reject functions
    pub(crate) fn call_promise_resolver(
        &mut self,
        resolver: &PromiseResolver,
        args: &[JsValue],
    ) -> Result<JsValue, JsError> {
        if resolver.already_resolved.get() {
            return Ok(JsValue::Undefined);
        }
        resolver.already_resolved.set(true);
        let value = args.first().cloned().unwrap_or_default();
        if resolver.reject {
            self.reject_promise_with(&resolver.promise, value);
        } else {
            self.resolve_promise_with(&resolver.promise, value)?;
        }
        Ok(JsValue::Undefined)
    }

    /// The body of a promise resolve function: adopt thenables, fulfill
    /// with anything else
    pub(crate) fn resolve_promise_with(&mut self, promise: &JsObjectRef, value: JsValue) -> Result<(), JsError> {
        let JsValue::Object(resolution) = &value else {
            self.fulfill_promise(promise, value);
            return Ok(());
        };
        if Rc::ptr_eq(resolution, promise) {
            let err = JsError::type_error("Chaining cycle detected for promise #<Promise>");
            let reason = self.error_value(err);
            self.reject_promise_with(promise, reason);
            return Ok(());
        }
        let then = match self.get(resolution, &PropertyKey::from("then")) {
            Ok(then) => then,
            Err(err) if err.is_catchable() => {
                let reason = self.error_value(err);
                self.reject_promise_with(promise, reason);
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        if !then.is_callable() {
            self.fulfill_promise(promise, value);
            return Ok(());
        }
        trace!("enqueue thenable resolution");
        self.realm.jobs.push_back(Job::ResolveThenable {
            promise: promise.cheap_clone(),
            thenable: value,
            then,
        });
        Ok(())
    }

    pub(crate) fn fulfill_promise(&mut self, promise: &JsObjectRef, value: JsValue) {
        self.settle(promise, PromiseStatus::Fulfilled(value));
    }

    pub(crate) fn reject_promise_with(&mut self, promise: &JsObjectRef, reason: JsValue) {
        self.settle(promise, PromiseStatus::Rejected(reason));
    }

    /// Record the outcome and queue every reaction waiting for it
    fn settle(&mut self, promise: &JsObjectRef, status: PromiseStatus) {
        let (reactions, argument, unhandled) = {
            let mut p = promise.borrow_mut();
            let ObjectKind::Promise(state) = &mut p.kind else {
                return;
            };
            if !matches!(state.status, PromiseStatus::Pending) {
                return;
            }
            let fulfill = std::mem::take(&mut state.fulfill_reactions);
            let reject = std::mem::take(&mut state.reject_reactions);
            let (reactions, argument, unhandled) = match &status {
                PromiseStatus::Fulfilled(value) => (fulfill, value.cheap_clone(), false),
                PromiseStatus::Rejected(reason) => (reject, reason.cheap_clone(), !state.handled),
                PromiseStatus::Pending => (Vec::new(), JsValue::Undefined, false),
            };
            state.status = status;
            (reactions, argument, unhandled)
        };
        if unhandled {
            self.realm.rejections.rejected_without_handler(promise);
        }
        for reaction in reactions {
            self.enqueue_reaction(reaction, argument.cheap_clone());
        }
    }

    fn enqueue_reaction(&mut self, reaction: PromiseReaction, argument: JsValue) {
        trace!("enqueue {:?} reaction", reaction.kind);
        self.realm.jobs.push_back(Job::Reaction { reaction, argument });
    }

    /// PerformPromiseThen
    pub(crate) fn perform_then(
        &mut self,
        promise: &JsObjectRef,
        on_fulfilled: JsValue,
        on_rejected: JsValue,
        capability: Option<PromiseCapability>,
    ) {
        let handler = |callback: JsValue| {
            if callback.is_callable() {
                ReactionHandler::Callable(callback)
            } else {
                ReactionHandler::Default
            }
        };
        let fulfill = PromiseReaction {
            capability: capability.clone(),
            kind: ReactionKind::Fulfill,
            handler: handler(on_fulfilled),
        };
        let reject = PromiseReaction {
            capability,
            kind: ReactionKind::Reject,
            handler: handler(on_rejected),
        };
        self.add_reactions(promise, fulfill, reject);
    }

    fn add_reactions(&mut self, promise: &JsObjectRef, fulfill: PromiseReaction, reject: PromiseReaction) {
        let settled = {
            let mut p = promise.borrow_mut();
            let ObjectKind::Promise(state) = &mut p.kind else {
                return;
            };
            let was_handled = std::mem::replace(&mut state.handled, true);
            match &state.status {
                PromiseStatus::Pending => {
                    state.fulfill_reactions.push(fulfill);
                    state.reject_reactions.push(reject);
                    None
                }
                PromiseStatus::Fulfilled(value) => Some((fulfill, value.cheap_clone(), true)),
                PromiseStatus::Rejected(reason) => Some((reject, reason.cheap_clone(), was_handled)),
            }
        };
        if let Some((reaction, argument, was_handled)) = settled {
            if !was_handled {
                self.realm.rejections.handler_added(promise);
            }
            self.enqueue_reaction(reaction, argument);
        }
    }

    /// NewPromiseCapability(C)
    pub(crate) fn new_promise_capability(&mut self, constructor: &JsValue) -> Result<PromiseCapability, JsError> {
        if self.is_intrinsic_promise_constructor(constructor) {
            let promise = self.create_promise();
            let (resolve, reject) = self.create_resolving_functions(&promise);
            return Ok(PromiseCapability {
                promise: JsValue::Object(promise),
                resolve,
                reject,
            });
        }
        if !constructor.is_constructor() {
            return Err(JsError::type_error(format!(
                "{} is not a constructor",
                self.display_value(constructor)
            )));
        }

        let slots: Rc<RefCell<(JsValue, JsValue)>> = Rc::new(RefCell::new((JsValue::Undefined, JsValue::Undefined)));
        let captured = slots.cheap_clone();
        let executor = self.create_host_function("", move |_, _, args| {
            let mut slots = captured.borrow_mut();
            if !slots.0.is_undefined() || !slots.1.is_undefined() {
                return Err(JsError::type_error("Promise executor has already been invoked"));
            }
            slots.0 = args.first().cloned().unwrap_or_default();
            slots.1 = args.get(1).cloned().unwrap_or_default();
            Ok(JsValue::Undefined)
        });
        let promise = self.construct(constructor, &[JsValue::Object(executor)], None)?;
        let (resolve, reject) = slots.borrow().clone();
        if !resolve.is_callable() {
            return Err(JsError::type_error("Promise resolve function is not callable"));
        }
        if !reject.is_callable() {
            return Err(JsError::type_error("Promise reject function is not callable"));
        }
        Ok(PromiseCapability { promise, resolve, reject })
    }

    fn is_intrinsic_promise_constructor(&self, value: &JsValue) -> bool {
        match (value, &self.realm.intrinsics.promise_constructor) {
            (JsValue::Object(obj), Some(ctor)) => Rc::ptr_eq(obj, ctor),
            _ => false,
        }
    }

    /// PromiseResolve(C, x)
    pub(crate) fn promise_resolve(&mut self, constructor: &JsValue, value: JsValue) -> Result<JsValue, JsError> {
        if let JsValue::Object(obj) = &value
            && matches!(obj.borrow().kind, ObjectKind::Promise(_))
        {
            let value_constructor = self.get(obj, &PropertyKey::from("constructor"))?;
            if value_constructor.same_value(constructor) {
                return Ok(value);
            }
        }
        let capability = self.new_promise_capability(constructor)?;
        self.call_function(&capability.resolve, JsValue::Undefined, &[value])?;
        Ok(capability.promise)
    }

    fn promise_resolve_intrinsic(&mut self, value: JsValue) -> Result<JsObjectRef, JsError> {
        let constructor = self
            .realm
            .intrinsics
            .promise_constructor
            .clone()
            .map(JsValue::Object)
            .unwrap_or_default();
        match self.promise_resolve(&constructor, value)? {
            JsValue::Object(promise) if matches!(promise.borrow().kind, ObjectKind::Promise(_)) => Ok(promise),
            _ => Err(JsError::internal_error("PromiseResolve produced a non-promise")),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Await
    // ═══════════════════════════════════════════════════════════════════════

    /// Park `ctx` until `value` settles. Returns the context when it can
    /// continue right away (the value could not be turned into a promise).
    pub(crate) fn await_value(
        &mut self,
        mut ctx: Box<ExecutionContext>,
        value: JsValue,
    ) -> Result<Option<Box<ExecutionContext>>, JsError> {
        let promise = match self.promise_resolve_intrinsic(value) {
            Ok(promise) => promise,
            Err(err) => {
                self.raise(&mut ctx, err)?;
                return Ok(Some(ctx));
            }
        };
        trace!("detach {:?} context on await", ctx.kind);
        let slot: ContextSlot = Rc::new(RefCell::new(Some(ctx)));
        let fulfill = PromiseReaction {
            capability: None,
            kind: ReactionKind::Fulfill,
            handler: ReactionHandler::Resume(slot.cheap_clone()),
        };
        let reject = PromiseReaction {
            capability: None,
            kind: ReactionKind::Reject,
            handler: ReactionHandler::Resume(slot),
        };
        self.add_reactions(&promise, fulfill, reject);
        Ok(None)
    }

    /// Drive an async context from native code up to its first suspension
    pub(crate) fn run_async(&mut self, mut ctx: Box<ExecutionContext>) -> Result<(), JsError> {
        loop {
            match self.drive_nested(ctx)? {
                RunOutcome::Finished(_) => return Ok(()),
                RunOutcome::Awaiting(suspended, value) => match self.await_value(suspended, value)? {
                    Some(resumed) => ctx = resumed,
                    None => return Ok(()),
                },
                RunOutcome::Yielded(..) | RunOutcome::Parked(_) => {
                    return Err(JsError::internal_error("yield outside a generator"));
                }
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Jobs and tasks
    // ═══════════════════════════════════════════════════════════════════════

    /// Turn a job into the active context
    pub(crate) fn start_job(&mut self, job: Job) -> Result<(), JsError> {
        match job {
            Job::Reaction { reaction, argument } => {
                let PromiseReaction {
                    capability,
                    kind,
                    handler,
                } = reaction;
                let handler = match handler {
                    ReactionHandler::Resume(slot) => {
                        let Some(mut ctx) = slot.borrow_mut().take() else {
                            return Ok(());
                        };
                        trace!("attach {:?} context after await", ctx.kind);
                        match kind {
                            ReactionKind::Fulfill => ctx.push_value(argument),
                            ReactionKind::Reject => ctx.abrupt(Completion::Throw(argument)),
                        }
                        self.active = Some(ctx);
                        return Ok(());
                    }
                    ReactionHandler::Callable(callback) => Some(callback),
                    ReactionHandler::Default => None,
                };
                let mut ctx = self.job_context();
                ctx.push(Frame::ReactionRoot(capability));
                match (handler, kind) {
                    (Some(callback), _) => {
                        if let Err(err) = self.begin_call(&mut ctx, callback, JsValue::Undefined, vec![argument]) {
                            self.raise(&mut ctx, err)?;
                        }
                    }
                    (None, ReactionKind::Fulfill) => ctx.push_value(argument),
                    (None, ReactionKind::Reject) => ctx.abrupt(Completion::Throw(argument)),
                }
                self.active = Some(ctx);
            }
            Job::ResolveThenable {
                promise,
                thenable,
                then,
            } => {
                let (resolve, reject) = self.create_resolving_functions(&promise);
                let mut ctx = self.job_context();
                ctx.push(Frame::ThenableRoot { reject: reject.cheap_clone() });
                if let Err(err) = self.begin_call(&mut ctx, then, thenable, vec![resolve, reject]) {
                    self.raise(&mut ctx, err)?;
                }
                self.active = Some(ctx);
            }
        }
        Ok(())
    }

    fn job_context(&self) -> Box<ExecutionContext> {
        Box::new(ExecutionContext::new(
            ContextKind::Job,
            self.realm.global_env.cheap_clone(),
            false,
        ))
    }

    /// Turn a macrotask into the active context
    pub(crate) fn start_task(&mut self, task: Task) -> Result<(), JsError> {
        match task {
            Task::Evaluate(ctx) => self.active = Some(ctx),
            Task::Call { function, args } => {
                let mut ctx = Box::new(ExecutionContext::new(
                    ContextKind::Task,
                    self.realm.global_env.cheap_clone(),
                    false,
                ));
                ctx.push(Frame::TaskRoot);
                if let Err(err) = self.begin_call(&mut ctx, function, JsValue::Undefined, args) {
                    self.raise(&mut ctx, err)?;
                }
                self.active = Some(ctx);
            }
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Host surface
    // ═══════════════════════════════════════════════════════════════════════

    /// A promise the host settles later with [`Interpreter::resolve_promise`]
    /// or [`Interpreter::reject_promise`]. While script code awaits it,
    /// [`Interpreter::step`] reports `Suspended`.
    pub fn create_pending_promise(&mut self) -> JsObjectRef {
        let promise = self.create_promise();
        self.host_pending.push(promise.cheap_clone());
        promise
    }

    pub fn resolve_promise(&mut self, promise: &JsObjectRef, value: JsValue) -> Result<(), JsError> {
        if !is_pending(promise) {
            return Err(JsError::type_error("Promise is already settled"));
        }
        self.resolve_promise_with(promise, value)
    }

    pub fn reject_promise(&mut self, promise: &JsObjectRef, reason: JsValue) -> Result<(), JsError> {
        if !is_pending(promise) {
            return Err(JsError::type_error("Promise is already settled"));
        }
        self.reject_promise_with(promise, reason);
        Ok(())
    }

    /// Queue a call of `function` as its own macrotask
    pub fn enqueue_call(&mut self, function: JsValue, args: Vec<JsValue>) {
        self.realm.macrotasks.push_back(Task::Call { function, args });
    }

    /// A function backed by a Rust closure
    pub fn create_host_function<F>(&mut self, name: &str, func: F) -> JsObjectRef
    where
        F: Fn(&mut Interpreter, JsValue, &[JsValue]) -> Result<JsValue, JsError> + 'static,
    {
        let name = JsString::from(name);
        let mut obj = JsObject::new(
            ObjectKind::Function(JsFunction::Host(HostFunction {
                name: name.cheap_clone(),
                func: Rc::new(func),
            })),
            Some(self.realm.intrinsics.function_prototype.cheap_clone()),
        );
        define_function_metadata(&mut obj, name, 0);
        obj.into_ref()
    }
}

/// A promise object that has not settled yet
pub(crate) fn is_pending(promise: &JsObjectRef) -> bool {
    matches!(
        &promise.borrow().kind,
        ObjectKind::Promise(state) if matches!(state.status, PromiseStatus::Pending)
    )
}

/// A pending promise something is waiting on
pub(crate) fn has_reactions(promise: &JsObjectRef) -> bool {
    matches!(
        &promise.borrow().kind,
        ObjectKind::Promise(state) if !state.fulfill_reactions.is_empty()
    )
}
