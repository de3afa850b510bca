//! Function objects, calls and activations
//!
//! Plain interpreted functions called from script run inside the caller's
//! context: [`Interpreter::begin_call`] pushes a [`Frame::CallReturn`] and the
//! callee's activation frames. Calls made from native code (getters, array
//! callbacks, promise jobs) drive a fresh nested context instead.

use std::rc::Rc;

use log::trace;

use crate::ast::{FunctionBody, FunctionKind, FunctionNode, Pattern};
use crate::completion::Completion;
use crate::environment::{EnvRef, new_declarative_environment, new_function_environment};
use crate::error::JsError;
use crate::hoist::function_binding_name;
use crate::interpreter::Interpreter;
use crate::interpreter::exec::RunOutcome;
use crate::interpreter::frame::{BindMode, ContextKind, ExecutionContext, Frame};
use crate::interpreter::reference::same_env;
use crate::object::{
    GeneratorState, GeneratorStatus, InterpretedFunction, JsFunction, JsObject, JsObjectRef, ObjectKind,
    Property, PropertyKey, ThisMode,
};
use crate::realm::define_function_metadata;
use crate::value::{CheapClone, JsString, JsValue};

/// In-context call nesting limit
pub const MAX_CALL_DEPTH: usize = 10_000;

/// `new` state threaded into an activation
pub(crate) struct ConstructTarget {
    pub receiver: JsObjectRef,
    pub new_target: JsValue,
}

fn stack_overflow() -> JsError {
    JsError::range_error("Maximum call stack size exceeded")
}

impl Interpreter {
    // ═══════════════════════════════════════════════════════════════════════
    // Function objects
    // ═══════════════════════════════════════════════════════════════════════

    /// OrdinaryFunctionCreate + MakeConstructor/SetFunctionName
    pub(crate) fn instantiate_function_object(
        &mut self,
        node: &Rc<FunctionNode>,
        env: &EnvRef,
        name: Option<JsString>,
    ) -> JsObjectRef {
        let this_mode = if node.kind == FunctionKind::Arrow {
            ThisMode::Lexical
        } else if node.strict {
            ThisMode::Strict
        } else {
            ThisMode::Global
        };
        let constructor = node.kind == FunctionKind::Normal && !node.generator && !node.async_;
        let proto = if node.generator {
            self.realm.intrinsics.generator_function_prototype.cheap_clone()
        } else {
            self.realm.intrinsics.function_prototype.cheap_clone()
        };
        let name = name
            .or_else(|| node.id.as_ref().map(|id| id.name.cheap_clone()))
            .unwrap_or_else(|| JsString::from(""));

        let mut obj = JsObject::new(
            ObjectKind::Function(JsFunction::Interpreted(InterpretedFunction {
                node: node.cheap_clone(),
                env: env.cheap_clone(),
                this_mode,
                constructor,
            })),
            Some(proto),
        );
        define_function_metadata(&mut obj, name, node.length);
        let function = obj.into_ref();

        if constructor {
            let prototype = self.create_object();
            prototype
                .borrow_mut()
                .set_hidden("constructor", JsValue::Object(function.cheap_clone()));
            function.borrow_mut().insert_property(
                PropertyKey::from("prototype"),
                Property::with_attributes(JsValue::Object(prototype), true, false, false),
            );
        } else if node.generator {
            let prototype =
                JsObject::ordinary(Some(self.realm.intrinsics.generator_prototype.cheap_clone())).into_ref();
            function.borrow_mut().insert_property(
                PropertyKey::from("prototype"),
                Property::with_attributes(JsValue::Object(prototype), true, false, false),
            );
        }
        function
    }

    /// A function expression. A named one sees its own name in a scope of
    /// its own; the binding is immutable.
    pub(crate) fn function_expression(&mut self, ctx: &ExecutionContext, node: &Rc<FunctionNode>) -> JsValue {
        let Some(id) = &node.id else {
            return JsValue::Object(self.instantiate_function_object(node, &ctx.env, None));
        };
        if node.kind == FunctionKind::Arrow {
            return JsValue::Object(self.instantiate_function_object(node, &ctx.env, None));
        }
        let scope = new_declarative_environment(&ctx.env);
        let function = self.instantiate_function_object(node, &scope, None);
        if let Some(decl) = scope.borrow_mut().declarative_mut() {
            decl.create_immutable_binding(id.name.cheap_clone(), false);
            decl.initialize_binding(&id.name, JsValue::Object(function.cheap_clone()));
        }
        JsValue::Object(function)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // [[Call]] and [[Construct]]
    // ═══════════════════════════════════════════════════════════════════════

    /// Call a function value from native code
    pub fn call_function(&mut self, callee: &JsValue, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
        let JsValue::Object(obj) = callee else {
            return Err(not_a_function(&self.display_value(callee)));
        };
        let function = obj.borrow().function().cloned();
        match function {
            None => Err(not_a_function(&self.display_value(callee))),
            Some(JsFunction::Native(f)) => self.call_native(f.func, this, args, None),
            Some(JsFunction::Host(f)) => (f.func)(self, this, args),
            Some(JsFunction::Bound(bound)) => {
                let mut full = bound.args;
                full.extend_from_slice(args);
                self.call_function(&JsValue::Object(bound.target), bound.this, &full)
            }
            Some(JsFunction::PromiseResolver(resolver)) => self.call_promise_resolver(&resolver, args),
            Some(JsFunction::Interpreted(f)) => self.call_interpreted(obj, &f, this, args.to_vec(), None),
        }
    }

    /// Run a builtin with `new.target` visible through [`Interpreter::new_target`]
    fn call_native(
        &mut self,
        func: crate::object::NativeFn,
        this: JsValue,
        args: &[JsValue],
        new_target: Option<JsObjectRef>,
    ) -> Result<JsValue, JsError> {
        let saved = std::mem::replace(&mut self.native_new_target, new_target);
        let result = func(self, this, args);
        self.native_new_target = saved;
        result
    }

    fn call_interpreted(
        &mut self,
        fobj: &JsObjectRef,
        f: &InterpretedFunction,
        this: JsValue,
        args: Vec<JsValue>,
        construct: Option<ConstructTarget>,
    ) -> Result<JsValue, JsError> {
        if f.node.generator {
            return self.start_generator(fobj, f, this, args);
        }
        if f.node.async_ {
            return self.start_async(fobj, f, this, args);
        }
        let mut ctx = Box::new(ExecutionContext::new(ContextKind::Nested, f.env.cheap_clone(), f.node.strict));
        self.push_activation(&mut ctx, fobj, f, this, args, construct)?;
        match self.drive_nested(ctx)? {
            RunOutcome::Finished(mut ctx) => match ctx.take_completion() {
                Completion::Throw(value) => Err(JsError::Throw(value)),
                _ => ctx.pop_value(),
            },
            _ => Err(JsError::internal_error("function body suspended outside a coroutine")),
        }
    }

    /// Construct(F, args, newTarget)
    pub fn construct(
        &mut self,
        callee: &JsValue,
        args: &[JsValue],
        new_target: Option<&JsValue>,
    ) -> Result<JsValue, JsError> {
        let JsValue::Object(obj) = callee else {
            return Err(not_a_constructor(&self.display_value(callee)));
        };
        let new_target = new_target.cloned().unwrap_or_else(|| callee.cheap_clone());
        let function = obj.borrow().function().cloned();
        match function {
            Some(JsFunction::Interpreted(f)) if f.constructor => {
                let receiver = self.ordinary_create_from_constructor(&new_target)?;
                let target = ConstructTarget {
                    receiver: receiver.cheap_clone(),
                    new_target,
                };
                self.call_interpreted(obj, &f, JsValue::Object(receiver), args.to_vec(), Some(target))
            }
            Some(JsFunction::Native(f)) if f.constructor => {
                let target = new_target.as_object().cloned();
                self.call_native(f.func, JsValue::Undefined, args, target)
            }
            Some(JsFunction::Bound(bound)) if bound.target.borrow().is_constructor() => {
                let target = JsValue::Object(bound.target);
                let new_target = if new_target.as_object().is_some_and(|nt| Rc::ptr_eq(nt, obj)) {
                    target.cheap_clone()
                } else {
                    new_target
                };
                let mut full = bound.args;
                full.extend_from_slice(args);
                self.construct(&target, &full, Some(&new_target))
            }
            _ => Err(not_a_constructor(&self.display_value(callee))),
        }
    }

    /// OrdinaryCreateFromConstructor with %Object.prototype% as fallback
    pub(crate) fn ordinary_create_from_constructor(&mut self, constructor: &JsValue) -> Result<JsObjectRef, JsError> {
        let proto = match self.get_v(constructor, &PropertyKey::from("prototype"))? {
            JsValue::Object(proto) => proto,
            _ => self.realm.intrinsics.object_prototype.cheap_clone(),
        };
        Ok(JsObject::ordinary(Some(proto)).into_ref())
    }

    /// Prototype for a builtin instance: `newTarget.prototype` when it is an
    /// object, `fallback` otherwise
    pub(crate) fn prototype_from_new_target(&mut self, fallback: &JsObjectRef) -> Result<JsObjectRef, JsError> {
        let Some(target) = self.native_new_target.clone() else {
            return Ok(fallback.cheap_clone());
        };
        match self.get(&target, &PropertyKey::from("prototype"))? {
            JsValue::Object(proto) => Ok(proto),
            _ => Ok(fallback.cheap_clone()),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Calls from script
    // ═══════════════════════════════════════════════════════════════════════

    /// Start a call from a call expression. Plain interpreted functions run
    /// in `ctx`; everything else is called directly and its result pushed.
    pub(crate) fn begin_call(
        &mut self,
        ctx: &mut ExecutionContext,
        callee: JsValue,
        this: JsValue,
        args: Vec<JsValue>,
    ) -> Result<(), JsError> {
        if let JsValue::Object(obj) = &callee {
            let interpreted = match obj.borrow().function() {
                Some(JsFunction::Interpreted(f)) if !f.node.generator && !f.node.async_ => Some(f.clone()),
                _ => None,
            };
            if let Some(f) = interpreted {
                return self.push_activation(ctx, obj, &f, this, args, None);
            }
        }
        let value = self.call_function(&callee, this, &args)?;
        ctx.push_value(value);
        Ok(())
    }

    /// Start a `new` expression
    pub(crate) fn begin_construct(
        &mut self,
        ctx: &mut ExecutionContext,
        callee: JsValue,
        args: Vec<JsValue>,
    ) -> Result<(), JsError> {
        if let JsValue::Object(obj) = &callee {
            let interpreted = match obj.borrow().function() {
                Some(JsFunction::Interpreted(f)) if f.constructor => Some(f.clone()),
                _ => None,
            };
            if let Some(f) = interpreted {
                let receiver = self.ordinary_create_from_constructor(&callee)?;
                let target = ConstructTarget {
                    receiver: receiver.cheap_clone(),
                    new_target: callee.cheap_clone(),
                };
                return self.push_activation(ctx, obj, &f, JsValue::Object(receiver), args, Some(target));
            }
        }
        let value = self.construct(&callee, &args, None)?;
        ctx.push_value(value);
        Ok(())
    }

    /// Push a call boundary and the callee's activation onto `ctx`
    fn push_activation(
        &mut self,
        ctx: &mut ExecutionContext,
        fobj: &JsObjectRef,
        f: &InterpretedFunction,
        this: JsValue,
        args: Vec<JsValue>,
        construct: Option<ConstructTarget>,
    ) -> Result<(), JsError> {
        if ctx.call_depth >= MAX_CALL_DEPTH {
            return Err(stack_overflow());
        }
        let (receiver, new_target) = match construct {
            Some(target) => (Some(target.receiver), target.new_target),
            None => (None, JsValue::Undefined),
        };
        let boundary = Frame::CallReturn {
            env: ctx.env.cheap_clone(),
            var_env: ctx.var_env.cheap_clone(),
            strict: ctx.strict,
            height: ctx.height(),
            construct: receiver,
        };
        ctx.push(boundary);
        ctx.call_depth += 1;
        self.enter_function(ctx, fobj, f, this, args, new_target)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Activation
    // ═══════════════════════════════════════════════════════════════════════

    /// PrepareForOrdinaryCall + OrdinaryCallBindThis + the first half of
    /// FunctionDeclarationInstantiation. Parameter binding and body hoisting
    /// run as frames so that default values can call back into script.
    fn enter_function(
        &mut self,
        ctx: &mut ExecutionContext,
        fobj: &JsObjectRef,
        f: &InterpretedFunction,
        this: JsValue,
        args: Vec<JsValue>,
        new_target: JsValue,
    ) -> Result<(), JsError> {
        let node = f.node.cheap_clone();
        trace!("call {}", fobj.borrow().function().map(|f| f.debug_name()).unwrap_or_default());
        let lexical_this = f.this_mode == ThisMode::Lexical;
        let env = new_function_environment(fobj.cheap_clone(), lexical_this, new_target, &f.env);
        if !lexical_this {
            let this = match f.this_mode {
                ThisMode::Global if this.is_null_or_undefined() => {
                    JsValue::Object(self.realm.global_object.cheap_clone())
                }
                ThisMode::Global if !this.is_object() => JsValue::Object(self.to_object(&this)?),
                _ => this,
            };
            env.borrow_mut().bind_this_value(this)?;
        }
        ctx.env = env.cheap_clone();
        ctx.var_env = env.cheap_clone();
        ctx.strict = node.strict;

        let arguments = if needs_arguments_object(&node) {
            Some(self.create_arguments_object(&args, fobj, node.strict))
        } else {
            None
        };
        {
            let mut e = env.borrow_mut();
            let Some(decl) = e.declarative_mut() else {
                return Err(JsError::internal_error("function environment without storage"));
            };
            for name in node.param_names.iter() {
                if !decl.has_binding(name) {
                    decl.create_mutable_binding(name.cheap_clone(), false);
                }
            }
            if let Some(arguments) = arguments {
                let name = JsString::from("arguments");
                if node.strict {
                    decl.create_immutable_binding(name.cheap_clone(), false);
                } else {
                    decl.create_mutable_binding(name.cheap_clone(), false);
                }
                decl.initialize_binding(&name, JsValue::Object(arguments));
            }
            if node.simple_params {
                for (index, param) in node.params.iter().enumerate() {
                    if let Pattern::Identifier(id) = param {
                        decl.initialize_binding(&id.name, args.get(index).cloned().unwrap_or_default());
                    }
                }
            }
        }

        ctx.push(Frame::InstantiateBody(node.cheap_clone()));
        if !node.simple_params {
            ctx.push(Frame::BindParameters {
                node,
                args: Rc::from(args),
                index: 0,
            });
        }
        Ok(())
    }

    /// Unmapped arguments object
    fn create_arguments_object(&mut self, args: &[JsValue], callee: &JsObjectRef, strict: bool) -> JsObjectRef {
        let proto = self.realm.intrinsics.object_prototype.cheap_clone();
        let values = self
            .realm
            .intrinsics
            .array_prototype
            .borrow()
            .get_own_data(&PropertyKey::from("values"));
        let iterator_key = PropertyKey::Symbol(self.realm.symbols.iterator.cheap_clone());

        let mut obj = JsObject::new(ObjectKind::Arguments, Some(proto));
        for (index, value) in args.iter().enumerate() {
            obj.set_data(PropertyKey::from(index as u32), value.cheap_clone());
        }
        obj.set_hidden("length", JsValue::Number(args.len() as f64));
        if let Some(values) = values {
            obj.set_hidden(iterator_key, values);
        }
        if !strict {
            obj.set_hidden("callee", JsValue::Object(callee.cheap_clone()));
        }
        obj.into_ref()
    }

    /// Bind parameter `index`, then schedule the next one
    pub(crate) fn bind_parameters(
        &mut self,
        ctx: &mut ExecutionContext,
        node: Rc<FunctionNode>,
        args: Rc<[JsValue]>,
        index: usize,
    ) -> Result<(), JsError> {
        let env = ctx.env.cheap_clone();
        if let Some(param) = node.params.get(index).cloned() {
            let value = args.get(index).cloned().unwrap_or_default();
            ctx.push(Frame::BindParameters {
                node,
                args,
                index: index + 1,
            });
            ctx.push(Frame::Bind {
                pattern: param,
                mode: BindMode::Initialize(env),
            });
            ctx.push_value(value);
            return Ok(());
        }
        if let Some(rest) = node.rest.clone() {
            let rest_values = args.get(index..).map(<[JsValue]>::to_vec).unwrap_or_default();
            let array = self.create_array(rest_values);
            ctx.push(Frame::Bind {
                pattern: rest,
                mode: BindMode::Initialize(env),
            });
            ctx.push_value(JsValue::Object(array));
        }
        Ok(())
    }

    /// The second half of FunctionDeclarationInstantiation: vars, hoisted
    /// functions and lexical declarations, then the body itself
    pub(crate) fn instantiate_body(&mut self, ctx: &mut ExecutionContext, node: &Rc<FunctionNode>) -> Result<(), JsError> {
        let scope = node.scope.cheap_clone();
        let env = ctx.env.cheap_clone();

        // Parameter expressions get their own scope apart from the body's vars
        let var_env = if node.simple_params {
            env.cheap_clone()
        } else {
            new_declarative_environment(&env)
        };
        let separate = !same_env(&var_env, &env);
        let block_functions = scope.block_functions.iter().filter(|name| {
            !node.strict
                && !node.param_names.contains(name)
                && !scope.lexical.iter().any(|lexical| &lexical.name == *name)
        });
        let mut var_bindings = Vec::new();
        {
            let e = env.borrow();
            for name in scope.var_names.iter().chain(block_functions) {
                let initial = if separate {
                    e.declarative().and_then(|decl| decl.peek(name)).unwrap_or_default()
                } else {
                    JsValue::Undefined
                };
                var_bindings.push((name.cheap_clone(), initial));
            }
        }
        {
            let mut e = var_env.borrow_mut();
            let Some(decl) = e.declarative_mut() else {
                return Err(JsError::internal_error("function environment without storage"));
            };
            for (name, initial) in var_bindings {
                if !decl.has_binding(&name) {
                    decl.create_mutable_binding(name.cheap_clone(), false);
                    decl.initialize_binding(&name, initial);
                }
            }
        }

        // Sloppy functions keep lexical declarations apart so direct
        // var/let conflicts stay detectable
        let lex_env = if !node.strict && !scope.lexical.is_empty() {
            new_declarative_environment(&var_env)
        } else {
            var_env.cheap_clone()
        };
        {
            let mut e = lex_env.borrow_mut();
            if let Some(decl) = e.declarative_mut() {
                for lexical in &scope.lexical {
                    if decl.has_binding(&lexical.name) {
                        continue;
                    }
                    if lexical.constant {
                        decl.create_immutable_binding(lexical.name.cheap_clone(), true);
                    } else {
                        decl.create_mutable_binding(lexical.name.cheap_clone(), false);
                    }
                }
            }
        }
        let functions: Vec<(JsString, JsValue)> = scope
            .functions
            .iter()
            .map(|func| {
                let object = self.instantiate_function_object(func, &lex_env, None);
                (function_binding_name(func), JsValue::Object(object))
            })
            .collect();
        {
            let mut e = var_env.borrow_mut();
            if let Some(decl) = e.declarative_mut() {
                for (name, function) in functions {
                    decl.declare(name, function);
                }
            }
        }

        ctx.env = lex_env;
        ctx.var_env = var_env;
        match &node.body {
            FunctionBody::Block(body) => {
                ctx.complete(None);
                ctx.push(Frame::StatementList {
                    body: body.cheap_clone(),
                    index: 0,
                    last: None,
                });
            }
            FunctionBody::Expression(expr) => {
                ctx.push(Frame::Return);
                ctx.push(Frame::Expr(expr.cheap_clone()));
            }
        }
        if node.generator {
            ctx.push(Frame::GeneratorStart);
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Coroutines
    // ═══════════════════════════════════════════════════════════════════════

    /// Calling a generator function binds its arguments and returns a
    /// suspended generator object
    fn start_generator(
        &mut self,
        fobj: &JsObjectRef,
        f: &InterpretedFunction,
        this: JsValue,
        args: Vec<JsValue>,
    ) -> Result<JsValue, JsError> {
        let mut ctx = Box::new(ExecutionContext::new(ContextKind::Generator, f.env.cheap_clone(), f.node.strict));
        ctx.push(Frame::GeneratorRoot);
        self.enter_function(&mut ctx, fobj, f, this, args, JsValue::Undefined)?;
        let ctx = match self.drive_nested(ctx)? {
            RunOutcome::Parked(ctx) => ctx,
            RunOutcome::Finished(mut ctx) => match ctx.take_completion() {
                Completion::Throw(value) => return Err(JsError::Throw(value)),
                _ => return Err(JsError::internal_error("generator finished before its first resumption")),
            },
            _ => return Err(JsError::internal_error("generator suspended while binding arguments")),
        };

        let fallback = self.realm.intrinsics.generator_prototype.cheap_clone();
        let proto = match self.get(fobj, &PropertyKey::from("prototype"))? {
            JsValue::Object(proto) => proto,
            _ => fallback,
        };
        let generator = JsObject::new(
            ObjectKind::Generator(GeneratorState {
                status: GeneratorStatus::SuspendedStart,
                context: Some(ctx),
            }),
            Some(proto),
        );
        Ok(JsValue::Object(generator.into_ref()))
    }

    /// Calling an async function runs it up to its first `await` and
    /// returns the promise of its result
    fn start_async(
        &mut self,
        fobj: &JsObjectRef,
        f: &InterpretedFunction,
        this: JsValue,
        args: Vec<JsValue>,
    ) -> Result<JsValue, JsError> {
        let promise = self.create_promise();
        let mut ctx = Box::new(ExecutionContext::new(ContextKind::Async, f.env.cheap_clone(), f.node.strict));
        ctx.push(Frame::AsyncRoot(promise.cheap_clone()));
        if let Err(err) = self.enter_function(&mut ctx, fobj, f, this, args, JsValue::Undefined) {
            self.raise(&mut ctx, err)?;
        }
        self.run_async(ctx)?;
        Ok(JsValue::Object(promise))
    }
}

/// Non-arrow functions get an arguments object unless a parameter or a
/// top-level declaration already takes the name
fn needs_arguments_object(node: &FunctionNode) -> bool {
    if node.kind == FunctionKind::Arrow {
        return false;
    }
    let shadowed = node.param_names.iter().any(|name| name.as_str() == "arguments")
        || node
            .scope
            .functions
            .iter()
            .any(|func| function_binding_name(func).as_str() == "arguments")
        || node
            .scope
            .lexical
            .iter()
            .any(|lexical| lexical.name.as_str() == "arguments");
    !shadowed
}

pub(crate) fn not_a_function(description: &str) -> JsError {
    JsError::type_error(format!("{} is not a function", description))
}

pub(crate) fn not_a_constructor(description: &str) -> JsError {
    JsError::type_error(format!("{} is not a constructor", description))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_object_shadowing() {
        let mut dict = crate::string_dict::StringDict::new();
        let program = crate::parser::Parser::new(
            "function a(x) {} function b(arguments) {} function c() { let arguments; } var d = () => 1;",
            &mut dict,
        )
        .parse_program(crate::ast::SourceType::Script)
        .expect("parse");
        let functions = &program.scope.functions;
        let needs: Vec<bool> = functions.iter().map(|f| needs_arguments_object(f)).collect();
        assert_eq!(needs, vec![true, false, false]);
    }
}
