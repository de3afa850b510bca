//! Iterator protocol and for-in enumeration

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::object::{JsObjectRef, MAX_PROTOTYPE_DEPTH, PropertyKey};
use crate::value::{CheapClone, JsValue};

/// An iterator together with its cached `next` method
#[derive(Clone)]
pub struct IteratorRecord {
    pub iterator: JsValue,
    pub next_method: JsValue,
    pub done: bool,
}

impl Interpreter {
    /// GetIterator(value, sync)
    pub fn get_iterator(&mut self, value: &JsValue) -> Result<IteratorRecord, JsError> {
        let key = PropertyKey::Symbol(self.realm.symbols.iterator.cheap_clone());
        let Some(method) = self.get_method(value, &key)? else {
            return Err(JsError::type_error(format!(
                "{} is not iterable",
                self.display_value(value)
            )));
        };
        let iterator = self.call_function(&method, value.cheap_clone(), &[])?;
        if !iterator.is_object() {
            return Err(JsError::type_error("Result of the Symbol.iterator method is not an object"));
        }
        let next_method = self.get_v(&iterator, &PropertyKey::from("next"))?;
        Ok(IteratorRecord {
            iterator,
            next_method,
            done: false,
        })
    }

    /// IteratorNext: the result object
    pub fn iterator_next(&mut self, record: &mut IteratorRecord, value: Option<JsValue>) -> Result<JsValue, JsError> {
        let args: Vec<JsValue> = value.into_iter().collect();
        let result = match self.call_function(&record.next_method, record.iterator.cheap_clone(), &args) {
            Ok(result) => result,
            Err(err) => {
                record.done = true;
                return Err(err);
            }
        };
        if !result.is_object() {
            record.done = true;
            return Err(JsError::type_error(format!(
                "Iterator result {} is not an object",
                self.display_value(&result)
            )));
        }
        Ok(result)
    }

    /// IteratorStepValue: the next value, or None once the iterator is done.
    /// Any failure marks the record done so it is not closed again.
    pub fn iterator_step_value(&mut self, record: &mut IteratorRecord) -> Result<Option<JsValue>, JsError> {
        if record.done {
            return Ok(None);
        }
        let result = self.iterator_next(record, None)?;
        let done = match self.get_v(&result, &PropertyKey::from("done")) {
            Ok(done) => done.to_boolean(),
            Err(err) => {
                record.done = true;
                return Err(err);
            }
        };
        if done {
            record.done = true;
            return Ok(None);
        }
        match self.get_v(&result, &PropertyKey::from("value")) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                record.done = true;
                Err(err)
            }
        }
    }

    /// IteratorClose. When closing because of a throw, errors from `return`
    /// are suppressed and the original throw wins.
    pub fn iterator_close(&mut self, record: &IteratorRecord, throwing: bool) -> Result<(), JsError> {
        let result = self
            .get_method(&record.iterator, &PropertyKey::from("return"))
            .and_then(|method| match method {
                Some(method) => self.call_function(&method, record.iterator.cheap_clone(), &[]).map(Some),
                None => Ok(None),
            });
        if throwing {
            // Only uncatchable errors escape
            return match result {
                Err(err) if !err.is_catchable() => Err(err),
                _ => Ok(()),
            };
        }
        match result? {
            Some(inner) if !inner.is_object() => {
                Err(JsError::type_error("Iterator result is not an object"))
            }
            _ => Ok(()),
        }
    }

    /// Drain an iterable into a list (spread, Array.from, collection constructors)
    pub fn iterate_to_list(&mut self, iterable: &JsValue) -> Result<Vec<JsValue>, JsError> {
        let mut record = self.get_iterator(iterable)?;
        let mut values = Vec::new();
        while let Some(value) = self.iterator_step_value(&mut record)? {
            values.push(value);
        }
        Ok(values)
    }

    /// CreateIterResultObject
    pub fn create_iter_result(&mut self, value: JsValue, done: bool) -> JsValue {
        let obj = self.create_object();
        {
            let mut o = obj.borrow_mut();
            o.set_data("value", value);
            o.set_data("done", JsValue::Boolean(done));
        }
        JsValue::Object(obj)
    }
}

/// EnumerateObjectProperties: string keys of an object and its prototypes.
///
/// Each object's keys are snapshotted when the walk reaches it. A key is
/// produced once, skipped when shadowed by an earlier object, and skipped when
/// it was deleted or made non-enumerable before being reached.
pub struct ForInIterator {
    current: Option<JsObjectRef>,
    pending: VecDeque<PropertyKey>,
    visited: FxHashSet<PropertyKey>,
    started: bool,
    depth: usize,
}

impl ForInIterator {
    pub fn new(object: JsObjectRef) -> Self {
        Self {
            current: Some(object),
            pending: VecDeque::new(),
            visited: FxHashSet::default(),
            started: false,
            depth: 0,
        }
    }

    pub fn next_key(&mut self) -> Option<JsValue> {
        loop {
            let object = self.current.clone()?;
            if !self.started {
                self.started = true;
                self.pending = object
                    .borrow()
                    .own_property_keys()
                    .into_iter()
                    .filter(|k| !k.is_symbol())
                    .collect();
            }
            let Some(key) = self.pending.pop_front() else {
                self.depth += 1;
                self.current = if self.depth < MAX_PROTOTYPE_DEPTH {
                    object.borrow().prototype.clone()
                } else {
                    None
                };
                self.started = false;
                continue;
            };
            if !self.visited.insert(key.cheap_clone()) {
                continue;
            }
            let enumerable = object
                .borrow()
                .get_own_property(&key)
                .is_some_and(|p| p.enumerable);
            if enumerable {
                return Some(key.to_value());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{JsObject, Property};

    #[test]
    fn test_for_in_skips_shadowed_and_hidden_keys() {
        let proto = JsObject::ordinary(None).into_ref();
        proto.borrow_mut().set_data("a", JsValue::Number(1.0));
        proto.borrow_mut().set_data("b", JsValue::Number(2.0));
        let obj = JsObject::ordinary(Some(proto)).into_ref();
        obj.borrow_mut().insert_property(PropertyKey::from("a"), Property::hidden(JsValue::Null));
        obj.borrow_mut().set_data("1", JsValue::Null);
        obj.borrow_mut().set_data("c", JsValue::Null);

        let mut iter = ForInIterator::new(obj);
        let mut keys = Vec::new();
        while let Some(key) = iter.next_key() {
            keys.push(key.as_str().unwrap_or_default().to_string());
        }
        assert_eq!(keys, vec!["1", "c", "b"]);
    }

    #[test]
    fn test_for_in_terminates_on_prototype_cycle() {
        let a = JsObject::ordinary(None).into_ref();
        let b = JsObject::ordinary(Some(a.cheap_clone())).into_ref();
        a.borrow_mut().prototype = Some(b.cheap_clone());
        a.borrow_mut().set_data("x", JsValue::Null);
        let mut iter = ForInIterator::new(b);
        assert!(iter.next_key().is_some());
        assert!(iter.next_key().is_none());
    }
}
