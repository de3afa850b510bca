//! Expression frames
//!
//! Each handler either produces its value on the context's value stack or
//! schedules a continuation frame above the frames of the operands it needs.

use std::rc::Rc;

use crate::ast::{
    Argument, ArrayElement, ArrayExpression, AssignmentExpression, AssignmentOp, AssignmentTarget,
    CallExpression, ConditionalExpression, Expression, FunctionNode, LiteralValue, LogicalExpression,
    LogicalOp, MemberExpression, MemberProperty, MethodKind, ObjectExpression, ObjectMember,
    PropertyName, TemplateLiteral, UnaryOp, UpdateExpression, UpdateOp,
};
use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::frame::{ArgsThen, BindMode, ExecutionContext, Frame, LiteralStep};
use crate::interpreter::iteration::IteratorRecord;
use crate::interpreter::ops::f64_to_int32;
use crate::interpreter::reference::Reference;
use crate::object::{JsObjectRef, PropertyDescriptor, PropertyKey};
use crate::value::{CheapClone, JsString, JsValue};

use super::frame::{Command, YieldValue};

impl Interpreter {
    /// Dispatch on the expression kind
    pub(crate) fn eval_expression(&mut self, ctx: &mut ExecutionContext, expr: Expression) -> Result<(), JsError> {
        match expr {
            Expression::Literal(literal, _) => ctx.push_value(literal_value(&literal)),
            Expression::Identifier(id) => {
                let env = ctx.env.cheap_clone();
                let value = self.lookup_identifier(&env, &id.name, ctx.strict)?;
                ctx.push_value(value);
            }
            Expression::This(_) => {
                let value = self.resolve_this_binding(&ctx.env)?;
                ctx.push_value(value);
            }
            Expression::NewTarget(_) => {
                let value = self.resolve_new_target(&ctx.env);
                ctx.push_value(value);
            }
            Expression::Template(node) => self.template(ctx, node, 0, String::new())?,
            Expression::Array(node) => {
                let array = self.create_array(Vec::new());
                self.array_literal(ctx, node, 0, array, None)?;
            }
            Expression::Object(node) => {
                let object = self.create_object();
                self.object_literal(ctx, node, 0, object, LiteralStep::Start)?;
            }
            Expression::Function(node) | Expression::ArrowFunction(node) => {
                let value = self.function_expression(ctx, &node);
                ctx.push_value(value);
            }
            Expression::Unary(node) => match (node.operator, &node.argument) {
                (UnaryOp::Typeof, Expression::Identifier(id)) => {
                    let env = ctx.env.cheap_clone();
                    let reference = self.resolve_binding(&env, &id.name, ctx.strict)?;
                    let type_name = if reference.is_unresolvable() {
                        "undefined"
                    } else {
                        self.get_value(&reference)?.type_of()
                    };
                    ctx.push_value(JsValue::from(type_name));
                }
                (UnaryOp::Delete, argument @ (Expression::Identifier(_) | Expression::Member(_))) => {
                    ctx.push(Frame::DeleteRef);
                    ctx.push(Frame::EvalRef(argument.cheap_clone()));
                }
                (op, argument) => {
                    ctx.push(Frame::Unary(op));
                    ctx.push(Frame::Expr(argument.cheap_clone()));
                }
            },
            Expression::Binary(node) => {
                let left = node.left.cheap_clone();
                ctx.push(Frame::BinaryRight(node));
                ctx.push(Frame::Expr(left));
            }
            Expression::Logical(node) => {
                let left = node.left.cheap_clone();
                ctx.push(Frame::LogicalRight(node));
                ctx.push(Frame::Expr(left));
            }
            Expression::Conditional(node) => {
                let test = node.test.cheap_clone();
                ctx.push(Frame::Conditional(node));
                ctx.push(Frame::Expr(test));
            }
            Expression::Assignment(node) => self.assignment(ctx, node),
            Expression::Update(node) => {
                let argument = node.argument.cheap_clone();
                ctx.push(Frame::UpdateApply(node));
                ctx.push(Frame::EvalRef(argument));
            }
            Expression::Sequence(exprs, _) => self.sequence_start(ctx, exprs),
            Expression::Member(node) => {
                let object = node.object.cheap_clone();
                ctx.push(Frame::MemberGet(node));
                ctx.push(Frame::Expr(object));
            }
            Expression::OptionalChain(inner, _) => {
                ctx.push(Frame::OptionalChainEnd(ctx.height()));
                ctx.push(Frame::Expr(inner.as_ref().cheap_clone()));
            }
            Expression::Call(call) => self.call_expression(ctx, call)?,
            Expression::New(call) => {
                let callee = call.callee.cheap_clone();
                ctx.push(Frame::Arguments {
                    list: call.arguments.cheap_clone(),
                    index: 0,
                    args: Vec::new(),
                    pending: None,
                    then: ArgsThen::Construct(call),
                });
                ctx.push(Frame::Expr(callee));
            }
            Expression::Yield(node) => match (&node.argument, node.delegate) {
                (Some(argument), true) => {
                    ctx.push(Frame::YieldStarStart);
                    ctx.push(Frame::Expr(argument.cheap_clone()));
                }
                (Some(argument), false) => {
                    ctx.push(Frame::YieldValue);
                    ctx.push(Frame::Expr(argument.cheap_clone()));
                }
                (None, _) => {
                    ctx.push(Frame::YieldValue);
                    ctx.push_value(JsValue::Undefined);
                }
            },
            Expression::Await(argument, _) => {
                ctx.push(Frame::AwaitValue);
                ctx.push(Frame::Expr(argument.as_ref().cheap_clone()));
            }
        }
        Ok(())
    }

    /// Evaluate a left-hand side to a reference on the reference stack
    pub(crate) fn eval_reference(&mut self, ctx: &mut ExecutionContext, expr: Expression) -> Result<(), JsError> {
        match expr {
            Expression::Identifier(id) => {
                let env = ctx.env.cheap_clone();
                let reference = self.resolve_binding(&env, &id.name, ctx.strict)?;
                ctx.refs.push(reference);
                Ok(())
            }
            Expression::Member(node) => {
                let object = node.object.cheap_clone();
                ctx.push(Frame::MemberRef(node));
                ctx.push(Frame::Expr(object));
                Ok(())
            }
            _ => Err(JsError::syntax_error_simple("Invalid left-hand side in assignment")),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Literals
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn sequence(&mut self, ctx: &mut ExecutionContext, exprs: Rc<[Expression]>, index: usize) -> Result<(), JsError> {
        let Some(expr) = exprs.get(index).cloned() else {
            return Ok(());
        };
        ctx.pop_value()?;
        if index + 1 < exprs.len() {
            ctx.push(Frame::Sequence {
                exprs: exprs.cheap_clone(),
                index: index + 1,
            });
        }
        ctx.push(Frame::Expr(expr));
        Ok(())
    }

    fn sequence_start(&mut self, ctx: &mut ExecutionContext, exprs: Rc<[Expression]>) {
        let Some(first) = exprs.first().cloned() else {
            ctx.push_value(JsValue::Undefined);
            return;
        };
        if exprs.len() > 1 {
            ctx.push(Frame::Sequence { exprs, index: 1 });
        }
        ctx.push(Frame::Expr(first));
    }

    /// Append substitution `index - 1` (on the stack) and chunk `index`
    pub(crate) fn template(
        &mut self,
        ctx: &mut ExecutionContext,
        node: Rc<TemplateLiteral>,
        index: usize,
        mut text: String,
    ) -> Result<(), JsError> {
        if index > 0 {
            let value = ctx.pop_value()?;
            let s = self.to_string(&value)?;
            text.push_str(s.as_str());
        }
        if let Some(chunk) = node.quasis.get(index) {
            text.push_str(chunk.as_str());
        }
        match node.expressions.get(index).cloned() {
            Some(expr) => {
                ctx.push(Frame::Template {
                    node,
                    index: index + 1,
                    text,
                });
                ctx.push(Frame::Expr(expr));
            }
            None => ctx.push_value(JsValue::String(JsString::from(text))),
        }
        Ok(())
    }

    pub(crate) fn array_literal(
        &mut self,
        ctx: &mut ExecutionContext,
        node: Rc<ArrayExpression>,
        mut index: usize,
        array: JsObjectRef,
        pending: Option<bool>,
    ) -> Result<(), JsError> {
        if let Some(spread) = pending {
            let value = ctx.pop_value()?;
            if spread {
                for element in self.iterate_to_list(&value)? {
                    array.borrow_mut().push_element(element);
                }
            } else {
                array.borrow_mut().push_element(value);
            }
        }
        while let Some(element) = node.elements.get(index) {
            index += 1;
            let (expr, spread) = match element {
                None => {
                    let mut a = array.borrow_mut();
                    let length = a.array_length().saturating_add(1);
                    a.grow_array_length(length);
                    continue;
                }
                Some(ArrayElement::Expression(expr)) => (expr.cheap_clone(), false),
                Some(ArrayElement::Spread(expr)) => (expr.cheap_clone(), true),
            };
            ctx.push(Frame::ArrayLiteral {
                node,
                index,
                array,
                pending: Some(spread),
            });
            ctx.push(Frame::Expr(expr));
            return Ok(());
        }
        ctx.push_value(JsValue::Object(array));
        Ok(())
    }

    pub(crate) fn object_literal(
        &mut self,
        ctx: &mut ExecutionContext,
        node: Rc<ObjectExpression>,
        mut index: usize,
        object: JsObjectRef,
        step: LiteralStep,
    ) -> Result<(), JsError> {
        match step {
            LiteralStep::Start => {}
            LiteralStep::Key => {
                let key_value = ctx.pop_value()?;
                let key = self.to_property_key(&key_value)?;
                match node.properties.get(index) {
                    Some(ObjectMember::Property { value, .. }) => {
                        let value = value.cheap_clone();
                        let name = key.function_name();
                        ctx.push(Frame::ObjectLiteral {
                            node,
                            index,
                            object,
                            step: LiteralStep::Value(key),
                        });
                        self.push_named_expr(ctx, &value, Some(name));
                        return Ok(());
                    }
                    Some(ObjectMember::Method { function, kind, .. }) => {
                        let function = function.cheap_clone();
                        self.define_method(ctx, &object, key, &function, *kind)?;
                    }
                    _ => return Err(JsError::internal_error("computed key for a spread member")),
                }
                index += 1;
            }
            LiteralStep::Value(key) => {
                let value = ctx.pop_value()?;
                let proto_setter = matches!(
                    node.properties.get(index),
                    Some(ObjectMember::Property {
                        key: PropertyName::Static(name),
                        shorthand: false,
                        ..
                    }) if name.as_str() == "__proto__"
                );
                if proto_setter {
                    match value {
                        JsValue::Object(proto) => object.borrow_mut().prototype = Some(proto),
                        JsValue::Null => object.borrow_mut().prototype = None,
                        _ => {}
                    }
                } else {
                    self.create_data_property_or_throw(&object, key, value)?;
                }
                index += 1;
            }
            LiteralStep::Spread => {
                let source = ctx.pop_value()?;
                self.copy_data_properties(&object, &source, &[])?;
                index += 1;
            }
        }

        // Static method keys need no evaluation; define them in one go
        while let Some(member) = node.properties.get(index) {
            match member {
                ObjectMember::Property { key, value, .. } => {
                    let value = value.cheap_clone();
                    let key = match key {
                        PropertyName::Static(name) => PropertyKey::from(name.cheap_clone()),
                        PropertyName::Computed(expr) => {
                            let expr = expr.cheap_clone();
                            ctx.push(Frame::ObjectLiteral {
                                node,
                                index,
                                object,
                                step: LiteralStep::Key,
                            });
                            ctx.push(Frame::Expr(expr));
                            return Ok(());
                        }
                    };
                    let name = key.function_name();
                    ctx.push(Frame::ObjectLiteral {
                        node,
                        index,
                        object,
                        step: LiteralStep::Value(key),
                    });
                    self.push_named_expr(ctx, &value, Some(name));
                    return Ok(());
                }
                ObjectMember::Method { key, function, kind } => match key {
                    PropertyName::Static(name) => {
                        let function = function.cheap_clone();
                        let kind = *kind;
                        let key = PropertyKey::from(name.cheap_clone());
                        self.define_method(ctx, &object, key, &function, kind)?;
                        index += 1;
                    }
                    PropertyName::Computed(expr) => {
                        let expr = expr.cheap_clone();
                        ctx.push(Frame::ObjectLiteral {
                            node,
                            index,
                            object,
                            step: LiteralStep::Key,
                        });
                        ctx.push(Frame::Expr(expr));
                        return Ok(());
                    }
                },
                ObjectMember::Spread(expr) => {
                    let expr = expr.cheap_clone();
                    ctx.push(Frame::ObjectLiteral {
                        node,
                        index,
                        object,
                        step: LiteralStep::Spread,
                    });
                    ctx.push(Frame::Expr(expr));
                    return Ok(());
                }
            }
        }
        ctx.push_value(JsValue::Object(object));
        Ok(())
    }

    /// MethodDefinitionEvaluation for object literal methods and accessors
    fn define_method(
        &mut self,
        ctx: &ExecutionContext,
        object: &JsObjectRef,
        key: PropertyKey,
        function: &Rc<FunctionNode>,
        kind: MethodKind,
    ) -> Result<(), JsError> {
        let base = key.function_name();
        let (name, desc) = match kind {
            MethodKind::Method => (base, None),
            MethodKind::Get => (JsString::from(format!("get {}", base)), Some(true)),
            MethodKind::Set => (JsString::from(format!("set {}", base)), Some(false)),
        };
        let closure = JsValue::Object(self.instantiate_function_object(function, &ctx.env, Some(name)));
        let descriptor = match desc {
            None => PropertyDescriptor::data(closure),
            Some(getter) => PropertyDescriptor {
                get: getter.then(|| closure.cheap_clone()),
                set: (!getter).then(|| closure.cheap_clone()),
                enumerable: Some(true),
                configurable: Some(true),
                ..PropertyDescriptor::default()
            },
        };
        self.define_property_or_throw(object, key, descriptor)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Operators
    // ═══════════════════════════════════════════════════════════════════════

    /// The operand is on the value stack
    pub(crate) fn unary(&mut self, ctx: &mut ExecutionContext, op: UnaryOp) -> Result<(), JsError> {
        let value = ctx.pop_value()?;
        let result = match op {
            UnaryOp::Minus => JsValue::Number(-self.to_number(&value)?),
            UnaryOp::Plus => JsValue::Number(self.to_number(&value)?),
            UnaryOp::Not => JsValue::Boolean(!value.to_boolean()),
            UnaryOp::BitNot => JsValue::Number(f64::from(!f64_to_int32(self.to_number(&value)?))),
            UnaryOp::Typeof => JsValue::from(value.type_of()),
            UnaryOp::Void => JsValue::Undefined,
            // `delete` of a non-reference evaluates its operand and succeeds
            UnaryOp::Delete => JsValue::Boolean(true),
        };
        ctx.push_value(result);
        Ok(())
    }

    pub(crate) fn delete_ref(&mut self, ctx: &mut ExecutionContext) -> Result<(), JsError> {
        let reference = ctx.pop_ref()?;
        let deleted = self.delete_reference(&reference)?;
        ctx.push_value(JsValue::Boolean(deleted));
        Ok(())
    }

    /// The left operand is on the value stack
    pub(crate) fn logical_right(&mut self, ctx: &mut ExecutionContext, node: Rc<LogicalExpression>) -> Result<(), JsError> {
        let left = ctx.peek_value()?;
        let short_circuit = match node.operator {
            LogicalOp::And => !left.to_boolean(),
            LogicalOp::Or => left.to_boolean(),
            LogicalOp::NullishCoalescing => !left.is_null_or_undefined(),
        };
        if !short_circuit {
            ctx.pop_value()?;
            ctx.push(Frame::Expr(node.right.cheap_clone()));
        }
        Ok(())
    }

    pub(crate) fn conditional(&mut self, ctx: &mut ExecutionContext, node: Rc<ConditionalExpression>) -> Result<(), JsError> {
        let test = ctx.pop_value()?;
        let branch = if test.to_boolean() {
            node.consequent.cheap_clone()
        } else {
            node.alternate.cheap_clone()
        };
        ctx.push(Frame::Expr(branch));
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Assignment
    // ═══════════════════════════════════════════════════════════════════════

    fn assignment(&mut self, ctx: &mut ExecutionContext, node: Rc<AssignmentExpression>) {
        match (&node.target, node.operator) {
            (AssignmentTarget::Pattern(pattern), _) => {
                let pattern = pattern.cheap_clone();
                let value = node.value.cheap_clone();
                ctx.push(Frame::Bind {
                    pattern,
                    mode: BindMode::Put,
                });
                ctx.push(Frame::Dup);
                ctx.push(Frame::Expr(value));
            }
            (AssignmentTarget::Simple(target), AssignmentOp::Assign) => {
                let target = target.cheap_clone();
                ctx.push(Frame::AssignValue(node));
                ctx.push(Frame::EvalRef(target));
            }
            (AssignmentTarget::Simple(target), _) => {
                let target = target.cheap_clone();
                ctx.push(Frame::CompoundGet(node));
                ctx.push(Frame::EvalRef(target));
            }
        }
    }

    /// The target reference of `target = value` is ready
    pub(crate) fn assign_value(&mut self, ctx: &mut ExecutionContext, node: Rc<AssignmentExpression>) {
        ctx.push(Frame::AssignRef);
        let name = assignment_name(&node);
        self.push_named_expr(ctx, &node.value, name);
    }

    /// Read the target of a compound or logical assignment
    pub(crate) fn compound_get(&mut self, ctx: &mut ExecutionContext, node: Rc<AssignmentExpression>) -> Result<(), JsError> {
        let reference = ctx.peek_ref()?.clone();
        let current = self.get_value(&reference)?;
        if let Some(op) = node.operator.logical_op() {
            let keep = match op {
                LogicalOp::And => !current.to_boolean(),
                LogicalOp::Or => current.to_boolean(),
                LogicalOp::NullishCoalescing => !current.is_null_or_undefined(),
            };
            if keep {
                ctx.pop_ref()?;
                ctx.push_value(current);
            } else {
                ctx.push(Frame::AssignRef);
                let name = assignment_name(&node);
                self.push_named_expr(ctx, &node.value, name);
            }
            return Ok(());
        }
        ctx.push_value(current);
        let value = node.value.cheap_clone();
        ctx.push(Frame::CompoundApply(node));
        ctx.push(Frame::Expr(value));
        Ok(())
    }

    pub(crate) fn compound_apply(&mut self, ctx: &mut ExecutionContext, node: Rc<AssignmentExpression>) -> Result<(), JsError> {
        let right = ctx.pop_value()?;
        let left = ctx.pop_value()?;
        let reference = ctx.pop_ref()?;
        let Some(op) = node.operator.binary_op() else {
            return Err(JsError::internal_error("compound assignment without an operator"));
        };
        let result = self.apply_binary(op, &left, &right)?;
        self.put_value(&reference, result.cheap_clone())?;
        ctx.push_value(result);
        Ok(())
    }

    pub(crate) fn update_apply(&mut self, ctx: &mut ExecutionContext, node: Rc<UpdateExpression>) -> Result<(), JsError> {
        let reference = ctx.pop_ref()?;
        let old_value = self.get_value(&reference)?;
        let old = self.to_number(&old_value)?;
        let new = match node.operator {
            UpdateOp::Increment => old + 1.0,
            UpdateOp::Decrement => old - 1.0,
        };
        self.put_value(&reference, JsValue::Number(new))?;
        ctx.push_value(JsValue::Number(if node.prefix { new } else { old }));
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Member access
    // ═══════════════════════════════════════════════════════════════════════

    /// The object is on the value stack
    pub(crate) fn member_get(&mut self, ctx: &mut ExecutionContext, node: Rc<MemberExpression>) -> Result<(), JsError> {
        if node.optional && ctx.peek_value()?.is_null_or_undefined() {
            return short_circuit(ctx);
        }
        match &node.property {
            MemberProperty::Identifier(name) => {
                let object = ctx.pop_value()?;
                let value = self.get_v(&object, &PropertyKey::from(name.cheap_clone()))?;
                ctx.push_value(value);
            }
            MemberProperty::Expression(expr) => {
                let expr = expr.cheap_clone();
                ctx.push(Frame::MemberGetKey(node));
                ctx.push(Frame::Expr(expr));
            }
        }
        Ok(())
    }

    /// The object and the computed key are on the value stack
    pub(crate) fn member_get_key(&mut self, ctx: &mut ExecutionContext, _node: Rc<MemberExpression>) -> Result<(), JsError> {
        let key_value = ctx.pop_value()?;
        let object = ctx.pop_value()?;
        if object.is_null_or_undefined() {
            return Err(JsError::type_error(format!(
                "Cannot read properties of {:?} (reading '{}')",
                object,
                self.display_value(&key_value)
            )));
        }
        let key = self.to_property_key(&key_value)?;
        let value = self.get_v(&object, &key)?;
        ctx.push_value(value);
        Ok(())
    }

    pub(crate) fn member_ref(&mut self, ctx: &mut ExecutionContext, node: Rc<MemberExpression>) -> Result<(), JsError> {
        match &node.property {
            MemberProperty::Identifier(name) => {
                let base = ctx.pop_value()?;
                ctx.refs.push(Reference::Property {
                    base,
                    key: PropertyKey::from(name.cheap_clone()),
                    strict: ctx.strict,
                });
            }
            MemberProperty::Expression(expr) => {
                let expr = expr.cheap_clone();
                ctx.push(Frame::MemberRefKey(node));
                ctx.push(Frame::Expr(expr));
            }
        }
        Ok(())
    }

    pub(crate) fn member_ref_key(&mut self, ctx: &mut ExecutionContext, _node: Rc<MemberExpression>) -> Result<(), JsError> {
        let key_value = ctx.pop_value()?;
        let base = ctx.pop_value()?;
        let key = self.to_property_key(&key_value)?;
        ctx.refs.push(Reference::Property {
            base,
            key,
            strict: ctx.strict,
        });
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════════

    fn call_expression(&mut self, ctx: &mut ExecutionContext, call: Rc<CallExpression>) -> Result<(), JsError> {
        match &call.callee {
            Expression::Member(member) => {
                let member = member.cheap_clone();
                let object = member.object.cheap_clone();
                ctx.push(Frame::CalleeMember { member, call });
                ctx.push(Frame::Expr(object));
            }
            Expression::Identifier(id) => {
                // The reference supplies `this` inside `with` blocks
                let env = ctx.env.cheap_clone();
                let reference = self.resolve_binding(&env, &id.name, ctx.strict)?;
                let callee = self.get_value(&reference)?;
                ctx.push_value(callee);
                self.begin_arguments(ctx, call, reference.this_value())?;
            }
            callee => {
                let callee = callee.cheap_clone();
                ctx.push(Frame::CalleeValue(call));
                ctx.push(Frame::Expr(callee));
            }
        }
        Ok(())
    }

    /// The object of a member callee is on the value stack
    pub(crate) fn callee_member(
        &mut self,
        ctx: &mut ExecutionContext,
        member: Rc<MemberExpression>,
        call: Rc<CallExpression>,
    ) -> Result<(), JsError> {
        if member.optional && ctx.peek_value()?.is_null_or_undefined() {
            return short_circuit(ctx);
        }
        match &member.property {
            MemberProperty::Identifier(name) => {
                let object = ctx.pop_value()?;
                let callee = self.get_v(&object, &PropertyKey::from(name.cheap_clone()))?;
                ctx.push_value(callee);
                self.begin_arguments(ctx, call, object)
            }
            MemberProperty::Expression(expr) => {
                let expr = expr.cheap_clone();
                ctx.push(Frame::CalleeMemberKey { member, call });
                ctx.push(Frame::Expr(expr));
                Ok(())
            }
        }
    }

    pub(crate) fn callee_member_key(
        &mut self,
        ctx: &mut ExecutionContext,
        _member: Rc<MemberExpression>,
        call: Rc<CallExpression>,
    ) -> Result<(), JsError> {
        let key_value = ctx.pop_value()?;
        let object = ctx.pop_value()?;
        let key = self.to_property_key(&key_value)?;
        let callee = self.get_v(&object, &key)?;
        ctx.push_value(callee);
        self.begin_arguments(ctx, call, object)
    }

    /// A callee that is not a property reference; `this` is undefined
    pub(crate) fn callee_value(&mut self, ctx: &mut ExecutionContext, call: Rc<CallExpression>) -> Result<(), JsError> {
        self.begin_arguments(ctx, call, JsValue::Undefined)
    }

    /// The callee is on the value stack; push `this` and evaluate the arguments
    fn begin_arguments(&mut self, ctx: &mut ExecutionContext, call: Rc<CallExpression>, this: JsValue) -> Result<(), JsError> {
        if call.optional && ctx.peek_value()?.is_null_or_undefined() {
            return short_circuit(ctx);
        }
        ctx.push_value(this);
        let list = call.arguments.cheap_clone();
        self.arguments(ctx, list, 0, Vec::new(), None, ArgsThen::Call(call))
    }

    /// Collect argument `index - 1` (on the stack) and schedule the next one;
    /// once all are evaluated, call or construct
    pub(crate) fn arguments(
        &mut self,
        ctx: &mut ExecutionContext,
        list: Rc<[Argument]>,
        index: usize,
        mut args: Vec<JsValue>,
        pending: Option<bool>,
        then: ArgsThen,
    ) -> Result<(), JsError> {
        if let Some(spread) = pending {
            let value = ctx.pop_value()?;
            if spread {
                args.extend(self.iterate_to_list(&value)?);
            } else {
                args.push(value);
            }
        }
        if let Some(argument) = list.get(index) {
            let (expr, spread) = match argument {
                Argument::Expression(expr) => (expr.cheap_clone(), false),
                Argument::Spread(expr) => (expr.cheap_clone(), true),
            };
            ctx.push(Frame::Arguments {
                list: list.cheap_clone(),
                index: index + 1,
                args,
                pending: Some(spread),
                then,
            });
            ctx.push(Frame::Expr(expr));
            return Ok(());
        }
        match then {
            ArgsThen::Call(call) => {
                let this = ctx.pop_value()?;
                let callee = ctx.pop_value()?;
                if !callee.is_callable() {
                    return Err(JsError::type_error(format!("{} is not a function", call.callee.describe())));
                }
                self.begin_call(ctx, callee, this, args)
            }
            ArgsThen::Construct(call) => {
                let callee = ctx.pop_value()?;
                if !callee.is_constructor() {
                    return Err(JsError::type_error(format!("{} is not a constructor", call.callee.describe())));
                }
                self.begin_construct(ctx, callee, args)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // yield*
    // ═══════════════════════════════════════════════════════════════════════

    /// The iterable of `yield*` is on the value stack
    pub(crate) fn yield_star_start(&mut self, ctx: &mut ExecutionContext) -> Result<(), JsError> {
        let iterable = ctx.pop_value()?;
        let record = self.get_iterator(&iterable)?;
        ctx.push(Frame::YieldStar(record));
        ctx.push_value(JsValue::Undefined);
        Ok(())
    }

    /// Forward the value the generator was resumed with to the inner iterator
    pub(crate) fn yield_star(&mut self, ctx: &mut ExecutionContext, mut record: IteratorRecord) -> Result<Command, JsError> {
        let received = ctx.pop_value()?;
        let result = self.iterator_next(&mut record, Some(received))?;
        let done = self.get_v(&result, &PropertyKey::from("done"))?.to_boolean();
        if done {
            let value = self.get_v(&result, &PropertyKey::from("value"))?;
            ctx.push_value(value);
            return Ok(Command::Proceed);
        }
        ctx.push(Frame::YieldStar(record));
        Ok(Command::Yield(YieldValue::Delegate(result)))
    }
}

/// Unwind to the end of the enclosing optional chain; the chain is undefined
fn short_circuit(ctx: &mut ExecutionContext) -> Result<(), JsError> {
    while let Some(frame) = ctx.frames.pop() {
        if let Frame::OptionalChainEnd(height) = frame {
            ctx.truncate(height);
            ctx.push_value(JsValue::Undefined);
            return Ok(());
        }
    }
    Err(JsError::internal_error("optional chain without an end marker"))
}

fn literal_value(literal: &LiteralValue) -> JsValue {
    match literal {
        LiteralValue::Null => JsValue::Null,
        LiteralValue::Boolean(b) => JsValue::Boolean(*b),
        LiteralValue::Number(n) => JsValue::Number(*n),
        LiteralValue::String(s) => JsValue::String(s.cheap_clone()),
    }
}

/// Anonymous functions assigned to a plain identifier take its name
fn assignment_name(node: &AssignmentExpression) -> Option<JsString> {
    match &node.target {
        AssignmentTarget::Simple(Expression::Identifier(id)) => Some(id.name.cheap_clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::{Interpreter, StepResult};
    use crate::value::JsValue;

    fn eval(source: &str) -> JsValue {
        let mut interp = Interpreter::new();
        interp.prepare(source).unwrap();
        match interp.run_to_completion().unwrap() {
            StepResult::Complete(value) => value,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_typeof_unresolvable_identifier() {
        assert_eq!(eval("typeof notDeclaredAnywhere"), JsValue::from("undefined"));
    }

    #[test]
    fn test_optional_chain_short_circuits_whole_chain() {
        assert_eq!(eval("let o = null; o?.a.b.c()"), JsValue::Undefined);
        assert_eq!(eval("let o = { a: { b: 2 } }; o?.a.b"), JsValue::Number(2.0));
        assert_eq!(eval("let f; f?.(1)"), JsValue::Undefined);
    }

    #[test]
    fn test_compound_and_logical_assignment() {
        assert_eq!(eval("let a = 1; a += 2; a *= 3; a"), JsValue::Number(9.0));
        assert_eq!(eval("let a = null; a ??= 5; a ||= 7; a &&= 8; a"), JsValue::Number(8.0));
        assert_eq!(eval("let a = 1; let b = a++; a + b * 10"), JsValue::Number(12.0));
    }

    #[test]
    fn test_template_and_spread() {
        assert_eq!(eval("let x = 2; `a${x}b${x + 1}`"), JsValue::from("a2b3"));
        assert_eq!(eval("[1, ...[2, 3], , 4].length"), JsValue::Number(5.0));
        assert_eq!(eval("((...a) => a.length)(...[1, 2], 3)"), JsValue::Number(3.0));
    }

    #[test]
    fn test_object_literal_accessors_and_proto() {
        assert_eq!(
            eval("let o = { get x() { return 4 }, ['y' + 1]: 2, __proto__: { z: 3 } }; o.x + o.y1 + o.z"),
            JsValue::Number(9.0)
        );
        assert_eq!(eval("let f = function () {}; ({ g: () => 1 }).g.name + f.name"), JsValue::from("gf"));
    }

    #[test]
    fn test_call_error_names_the_callee() {
        let mut interp = Interpreter::new();
        interp.prepare("let o = {}; o.missing()").unwrap();
        let err = interp.run_to_completion().unwrap_err();
        assert!(err.to_string().contains("o.missing is not a function"), "{}", err);
    }
}
