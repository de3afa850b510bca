//! Completion records
//!
//! Statements evaluate to a [`Completion`]. A `None` value means the
//! statement produced no value, as with an empty statement or a declaration.

use crate::value::{CheapClone, JsString, JsValue};

#[derive(Debug, Clone)]
pub enum Completion {
    Normal(Option<JsValue>),
    Break(Option<JsString>, Option<JsValue>),
    Continue(Option<JsString>, Option<JsValue>),
    Return(JsValue),
    Throw(JsValue),
}

impl Default for Completion {
    fn default() -> Self {
        Completion::Normal(None)
    }
}

impl Completion {
    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal(_))
    }

    /// The carried value, if any
    pub fn value(&self) -> Option<&JsValue> {
        match self {
            Completion::Normal(v) | Completion::Break(_, v) | Completion::Continue(_, v) => v.as_ref(),
            Completion::Return(v) | Completion::Throw(v) => Some(v),
        }
    }

    /// UpdateEmpty: fill an empty value with `value`
    pub fn update_empty(self, value: Option<&JsValue>) -> Completion {
        let fill = |v: Option<JsValue>| v.or_else(|| value.map(CheapClone::cheap_clone));
        match self {
            Completion::Normal(v) => Completion::Normal(fill(v)),
            Completion::Break(label, v) => Completion::Break(label, fill(v)),
            Completion::Continue(label, v) => Completion::Continue(label, fill(v)),
            other => other,
        }
    }

    /// LoopContinues
    pub fn loop_continues(&self, labels: &[JsString]) -> bool {
        match self {
            Completion::Normal(_) => true,
            Completion::Continue(None, _) => true,
            Completion::Continue(Some(label), _) => labels.contains(label),
            _ => false,
        }
    }

    /// An untargeted break, which ends the innermost breakable statement
    pub fn is_untargeted_break(&self) -> bool {
        matches!(self, Completion::Break(None, _))
    }

    /// A break aimed at `label`
    pub fn breaks_to(&self, label: &JsString) -> bool {
        matches!(self, Completion::Break(Some(target), _) if target == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_empty_fills_only_empty_values() {
        let one = JsValue::Number(1.0);
        let brk = Completion::Break(None, None).update_empty(Some(&one));
        assert!(matches!(brk, Completion::Break(None, Some(JsValue::Number(n))) if n == 1.0));

        let kept = Completion::Normal(Some(JsValue::Number(2.0))).update_empty(Some(&one));
        assert!(matches!(kept, Completion::Normal(Some(JsValue::Number(n))) if n == 2.0));

        let thrown = Completion::Throw(JsValue::Null).update_empty(Some(&one));
        assert!(matches!(thrown, Completion::Throw(JsValue::Null)));
    }

    #[test]
    fn test_loop_continues_with_labels() {
        let outer = JsString::from("outer");
        let labels = vec![outer.clone()];
        assert!(Completion::Normal(None).loop_continues(&labels));
        assert!(Completion::Continue(None, None).loop_continues(&[]));
        assert!(Completion::Continue(Some(outer.clone()), None).loop_continues(&labels));
        assert!(!Completion::Continue(Some(JsString::from("other")), None).loop_continues(&labels));
        assert!(!Completion::Break(None, None).loop_continues(&labels));
        assert!(Completion::Break(Some(outer.clone()), None).breaks_to(&outer));
    }
}
