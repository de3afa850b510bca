//! Destructuring
//!
//! Patterns bind the value on top of the value stack. Member targets (only
//! legal in destructuring assignment) have their reference evaluated before
//! the value is read from the source, so those steps pass through the
//! reference stack.

use std::rc::Rc;

use crate::ast::{ArrayPattern, AssignmentPattern, Expression, ObjectPattern, Pattern, PropertyName};
use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::frame::{BindMode, ExecutionContext, Frame, PatternStep};
use crate::interpreter::iteration::IteratorRecord;
use crate::object::PropertyKey;
use crate::value::{CheapClone, JsString, JsValue};

impl Interpreter {
    /// Destructure the value on the stack into `pattern`
    pub(crate) fn bind_pattern(&mut self, ctx: &mut ExecutionContext, pattern: Pattern, mode: BindMode) -> Result<(), JsError> {
        match pattern {
            Pattern::Identifier(id) => {
                let value = ctx.pop_value()?;
                self.bind_name(ctx, &id.name, value, &mode)
            }
            Pattern::Expression(expr) => {
                ctx.push(Frame::PutRef);
                ctx.push(Frame::EvalRef(expr));
                Ok(())
            }
            Pattern::Assignment(node) => {
                if ctx.peek_value()?.is_undefined() {
                    ctx.pop_value()?;
                    let name = pattern_name(&node.target);
                    let default = node.default.cheap_clone();
                    ctx.push(Frame::BindDefault { node, mode });
                    self.push_named_expr(ctx, &default, name);
                } else {
                    ctx.push(Frame::Bind {
                        pattern: node.target.cheap_clone(),
                        mode,
                    });
                }
                Ok(())
            }
            Pattern::Object(node) => {
                let source = ctx.pop_value()?;
                if source.is_null_or_undefined() {
                    return Err(JsError::type_error(format!(
                        "Cannot destructure '{:?}' as it is {:?}.",
                        source, source
                    )));
                }
                self.object_pattern(ctx, node, mode, source, 0, Vec::new(), PatternStep::Start)
            }
            Pattern::Array(node) => {
                let source = ctx.pop_value()?;
                let iter = self.get_iterator(&source)?;
                self.array_pattern(ctx, node, mode, iter, 0, PatternStep::Start)
            }
        }
    }

    /// The default of `target = default` has been evaluated
    pub(crate) fn bind_default(
        &mut self,
        ctx: &mut ExecutionContext,
        node: Rc<AssignmentPattern>,
        mode: BindMode,
    ) -> Result<(), JsError> {
        self.bind_pattern(ctx, node.target.cheap_clone(), mode)
    }

    /// Store one destructured element, applying its default first
    pub(crate) fn bind_element(
        &mut self,
        ctx: &mut ExecutionContext,
        target: Pattern,
        default: Option<Expression>,
        mode: BindMode,
        has_ref: bool,
    ) -> Result<(), JsError> {
        if let Some(default) = default
            && ctx.peek_value()?.is_undefined()
        {
            ctx.pop_value()?;
            let name = pattern_name(&target);
            ctx.push(Frame::BindElement {
                target,
                default: None,
                mode,
                has_ref,
            });
            self.push_named_expr(ctx, &default, name);
            return Ok(());
        }
        if has_ref {
            let value = ctx.pop_value()?;
            let reference = ctx.pop_ref()?;
            return self.put_value(&reference, value);
        }
        self.bind_pattern(ctx, target, mode)
    }

    fn bind_name(&mut self, ctx: &ExecutionContext, name: &JsString, value: JsValue, mode: &BindMode) -> Result<(), JsError> {
        match mode {
            BindMode::Initialize(env) => self.initialize_binding(env, name, value),
            BindMode::Put => {
                let reference = self.resolve_binding(&ctx.env, name, ctx.strict)?;
                self.put_value(&reference, value)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Object patterns
    // ═══════════════════════════════════════════════════════════════════════

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn object_pattern(
        &mut self,
        ctx: &mut ExecutionContext,
        node: Rc<ObjectPattern>,
        mode: BindMode,
        source: JsValue,
        index: usize,
        mut excluded: Vec<PropertyKey>,
        step: PatternStep,
    ) -> Result<(), JsError> {
        let key = match step {
            PatternStep::Start => match node.properties.get(index) {
                Some(prop) => match &prop.key {
                    PropertyName::Static(name) => PropertyKey::from(name.cheap_clone()),
                    PropertyName::Computed(expr) => {
                        let expr = expr.cheap_clone();
                        ctx.push(Frame::ObjectPattern {
                            node,
                            mode,
                            source,
                            index,
                            excluded,
                            step: PatternStep::Key,
                        });
                        ctx.push(Frame::Expr(expr));
                        return Ok(());
                    }
                },
                None => return self.object_rest(ctx, node, mode, source, index, excluded),
            },
            PatternStep::Key => {
                let key_value = ctx.pop_value()?;
                self.to_property_key(&key_value)?
            }
            PatternStep::Target(Some(key)) => {
                let value = self.get_v(&source, &key)?;
                let (target, default) = match node.properties.get(index) {
                    Some(prop) => split_default(&prop.value),
                    None => return Err(JsError::internal_error("object pattern index out of range")),
                };
                excluded.push(key);
                ctx.push(Frame::ObjectPattern {
                    node,
                    mode: mode.clone(),
                    source,
                    index: index + 1,
                    excluded,
                    step: PatternStep::Start,
                });
                ctx.push(Frame::BindElement {
                    target,
                    default,
                    mode,
                    has_ref: true,
                });
                ctx.push_value(value);
                return Ok(());
            }
            PatternStep::Target(None) => {
                return Err(JsError::internal_error("object pattern target without a key"));
            }
            PatternStep::Rest => {
                let rest = self.create_object();
                self.copy_data_properties(&rest, &source, &excluded)?;
                let reference = ctx.pop_ref()?;
                return self.put_value(&reference, JsValue::Object(rest));
            }
        };

        let (target, default) = match node.properties.get(index) {
            Some(prop) => split_default(&prop.value),
            None => return Err(JsError::internal_error("object pattern index out of range")),
        };
        if let Pattern::Expression(expr) = &target {
            let expr = expr.cheap_clone();
            ctx.push(Frame::ObjectPattern {
                node,
                mode,
                source,
                index,
                excluded,
                step: PatternStep::Target(Some(key)),
            });
            ctx.push(Frame::EvalRef(expr));
            return Ok(());
        }
        let value = self.get_v(&source, &key)?;
        excluded.push(key);
        ctx.push(Frame::ObjectPattern {
            node,
            mode: mode.clone(),
            source,
            index: index + 1,
            excluded,
            step: PatternStep::Start,
        });
        ctx.push(Frame::BindElement {
            target,
            default,
            mode,
            has_ref: false,
        });
        ctx.push_value(value);
        Ok(())
    }

    /// `...rest` collects the remaining own enumerable properties
    fn object_rest(
        &mut self,
        ctx: &mut ExecutionContext,
        node: Rc<ObjectPattern>,
        mode: BindMode,
        source: JsValue,
        index: usize,
        excluded: Vec<PropertyKey>,
    ) -> Result<(), JsError> {
        let Some(rest) = node.rest.clone() else {
            return Ok(());
        };
        if let Pattern::Expression(expr) = rest {
            ctx.push(Frame::ObjectPattern {
                node,
                mode,
                source,
                index,
                excluded,
                step: PatternStep::Rest,
            });
            ctx.push(Frame::EvalRef(expr));
            return Ok(());
        }
        let object = self.create_object();
        self.copy_data_properties(&object, &source, &excluded)?;
        ctx.push(Frame::Bind { pattern: rest, mode });
        ctx.push_value(JsValue::Object(object));
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Array patterns
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn array_pattern(
        &mut self,
        ctx: &mut ExecutionContext,
        node: Rc<ArrayPattern>,
        mode: BindMode,
        mut iter: IteratorRecord,
        mut index: usize,
        step: PatternStep,
    ) -> Result<(), JsError> {
        match step {
            PatternStep::Start => {}
            PatternStep::Target(_) => {
                let (target, default) = match node.elements.get(index) {
                    Some(Some(element)) => split_default(element),
                    _ => return Err(JsError::internal_error("array pattern index out of range")),
                };
                let value = self.iterator_step_value(&mut iter)?.unwrap_or_default();
                ctx.push(Frame::ArrayPattern {
                    node,
                    mode: mode.clone(),
                    iter,
                    index: index + 1,
                    step: PatternStep::Start,
                });
                ctx.push(Frame::BindElement {
                    target,
                    default,
                    mode,
                    has_ref: true,
                });
                ctx.push_value(value);
                return Ok(());
            }
            PatternStep::Rest => {
                let rest = self.collect_rest(&mut iter)?;
                let reference = ctx.pop_ref()?;
                return self.put_value(&reference, JsValue::Object(rest));
            }
            PatternStep::Key => return Err(JsError::internal_error("array patterns have no computed keys")),
        }

        while let Some(element) = node.elements.get(index) {
            let Some(element) = element else {
                // Elision
                self.iterator_step_value(&mut iter)?;
                index += 1;
                continue;
            };
            let (target, default) = split_default(element);
            if let Pattern::Expression(expr) = &target {
                let expr = expr.cheap_clone();
                ctx.push(Frame::ArrayPattern {
                    node,
                    mode,
                    iter,
                    index,
                    step: PatternStep::Target(None),
                });
                ctx.push(Frame::EvalRef(expr));
                return Ok(());
            }
            let value = self.iterator_step_value(&mut iter)?.unwrap_or_default();
            ctx.push(Frame::ArrayPattern {
                node,
                mode: mode.clone(),
                iter,
                index: index + 1,
                step: PatternStep::Start,
            });
            ctx.push(Frame::BindElement {
                target,
                default,
                mode,
                has_ref: false,
            });
            ctx.push_value(value);
            return Ok(());
        }

        match node.rest.clone() {
            Some(Pattern::Expression(expr)) => {
                ctx.push(Frame::ArrayPattern {
                    node,
                    mode,
                    iter,
                    index,
                    step: PatternStep::Rest,
                });
                ctx.push(Frame::EvalRef(expr));
            }
            Some(rest) => {
                let array = self.collect_rest(&mut iter)?;
                ctx.push(Frame::Bind { pattern: rest, mode });
                ctx.push_value(JsValue::Object(array));
            }
            None => {
                if !iter.done {
                    self.iterator_close(&iter, false)?;
                }
            }
        }
        Ok(())
    }

    fn collect_rest(&mut self, iter: &mut IteratorRecord) -> Result<crate::object::JsObjectRef, JsError> {
        let mut values = Vec::new();
        while let Some(value) = self.iterator_step_value(iter)? {
            values.push(value);
        }
        Ok(self.create_array(values))
    }
}

/// `target = default` splits into its parts
fn split_default(pattern: &Pattern) -> (Pattern, Option<Expression>) {
    match pattern {
        Pattern::Assignment(node) => (node.target.cheap_clone(), Some(node.default.cheap_clone())),
        other => (other.cheap_clone(), None),
    }
}

/// Anonymous function defaults are named after a plain identifier target
fn pattern_name(target: &Pattern) -> Option<JsString> {
    match target {
        Pattern::Identifier(id) => Some(id.name.cheap_clone()),
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
    fn test_nested_patterns_with_defaults() {
        assert_eq!(
            eval("const { a, b: [c, , d = 4] = [], ...rest } = { a: 1, b: [2, 9], e: 5, f: 6 }; a + c + d + rest.e + rest.f"),
            JsValue::Number(18.0)
        );
    }

    #[test]
    fn test_assignment_pattern_with_member_targets() {
        assert_eq!(
            eval("let o = {}; let r = [o.x, o['y']] = [1, 2]; o.x + o.y + r.length"),
            JsValue::Number(5.0)
        );
    }

    #[test]
    fn test_array_pattern_closes_iterator() {
        assert_eq!(
            eval(
                "let closed = false;
                 let it = { [Symbol.iterator]() { return { next() { return { value: 1, done: false } }, return() { closed = true; return {} } } } };
                 let [x] = it;
                 closed && x === 1"
            ),
            JsValue::Boolean(true)
        );
    }

    #[test]
    fn test_destructuring_null_throws() {
        let mut interp = Interpreter::new();
        interp.prepare("let { a } = null").unwrap();
        let err = interp.run_to_completion().unwrap_err();
        assert!(err.to_string().starts_with("Uncaught TypeError"), "{}", err);
    }
}
