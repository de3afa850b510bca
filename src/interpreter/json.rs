//! Conversion between script values and `serde_json` values
//!
//! The host side of data exchange. Conversion to JSON reads own enumerable
//! data properties only and never runs script code.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::ops::MAX_LIST_LENGTH;
use crate::object::{JsObjectRef, ObjectKind, PropertyKey, PropertySlot};
use crate::value::{JsString, JsValue};

impl Interpreter {
    /// Build a script value from JSON data
    pub fn value_from_json(&mut self, json: &serde_json::Value) -> JsValue {
        match json {
            serde_json::Value::Null => JsValue::Null,
            serde_json::Value::Bool(b) => JsValue::Boolean(*b),
            serde_json::Value::Number(n) => JsValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => JsValue::String(JsString::from(s.as_str())),
            serde_json::Value::Array(items) => {
                let elements = items.iter().map(|item| self.value_from_json(item)).collect();
                JsValue::Object(self.create_array(elements))
            }
            serde_json::Value::Object(map) => {
                let obj = self.create_object();
                for (key, value) in map {
                    let value = self.value_from_json(value);
                    let key = PropertyKey::from(self.intern(key));
                    obj.borrow_mut().set_data(key, value);
                }
                JsValue::Object(obj)
            }
        }
    }

    /// Snapshot a script value as JSON data
    pub fn value_to_json(&self, value: &JsValue) -> Result<serde_json::Value, JsError> {
        let mut visited = FxHashSet::default();
        value_to_json_with_visited(value, &mut visited)
    }
}

fn value_to_json_with_visited(
    value: &JsValue,
    visited: &mut FxHashSet<*const ()>,
) -> Result<serde_json::Value, JsError> {
    Ok(match value {
        JsValue::Undefined | JsValue::Null | JsValue::Symbol(_) => serde_json::Value::Null,
        JsValue::Boolean(b) => serde_json::Value::Bool(*b),
        JsValue::Number(n) => number_to_json(*n),
        JsValue::String(s) => serde_json::Value::String(s.to_string()),
        JsValue::Object(obj) => {
            let id = Rc::as_ptr(obj) as *const ();
            if !visited.insert(id) {
                return Err(JsError::type_error("Converting circular structure to JSON"));
            }
            let result = object_to_json(obj, visited)?;
            visited.remove(&id);
            result
        }
    })
}

fn object_to_json(obj: &JsObjectRef, visited: &mut FxHashSet<*const ()>) -> Result<serde_json::Value, JsError> {
    let (is_array, length, entries) = {
        let o = obj.borrow();
        match &o.kind {
            ObjectKind::Function(_) => return Ok(serde_json::Value::Null),
            ObjectKind::Boolean(b) => return Ok(serde_json::Value::Bool(*b)),
            ObjectKind::Number(n) => return Ok(number_to_json(*n)),
            ObjectKind::String(s) => return Ok(serde_json::Value::String(s.to_string())),
            _ => {}
        }
        let entries: Vec<(PropertyKey, JsValue)> = o
            .own_property_keys()
            .into_iter()
            .filter(|key| !key.is_symbol())
            .filter_map(|key| {
                let prop = o.get_own_property(&key)?;
                match prop.slot {
                    PropertySlot::Data { value, .. } if prop.enumerable => Some((key, value)),
                    _ => None,
                }
            })
            .collect();
        (o.is_array(), o.array_length(), entries)
    };

    if is_array {
        if u64::from(length) > MAX_LIST_LENGTH {
            return Err(JsError::range_error(format!(
                "Array of length {} is too long to convert to JSON",
                length
            )));
        }
        let mut items = vec![serde_json::Value::Null; length as usize];
        for (key, value) in entries {
            if let Some(index) = key.as_index()
                && let Some(slot) = items.get_mut(index as usize)
            {
                *slot = value_to_json_with_visited(&value, visited)?;
            }
        }
        return Ok(serde_json::Value::Array(items));
    }

    let mut map = serde_json::Map::new();
    for (key, value) in entries {
        // Undefined and function-valued properties are left out, as JSON.stringify does
        if value.is_undefined() || value.is_callable() {
            continue;
        }
        map.insert(key.to_string(), value_to_json_with_visited(&value, visited)?);
    }
    Ok(serde_json::Value::Object(map))
}

fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return serde_json::Value::Number(serde_json::Number::from(n as i64));
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_round_trip_of_nested_data() {
        let mut interp = Interpreter::new();
        let input = json!({ "name": "widget", "tags": ["a", "b"], "size": 2.5, "count": 3, "extra": null });
        let value = interp.value_from_json(&input);
        assert_eq!(interp.value_to_json(&value).unwrap(), input);
    }

    #[test]
    fn test_value_to_json_skips_functions_and_detects_cycles() {
        let mut interp = Interpreter::new();
        interp
            .prepare("globalThis.data = { f() {}, u: undefined, n: NaN, list: [1, , 3] }; globalThis.cyc = {}; cyc.self = cyc;")
            .unwrap();
        interp.run_to_completion().unwrap();
        let data = interp.get_global("data").unwrap();
        assert_eq!(
            interp.value_to_json(&data).unwrap(),
            json!({ "n": null, "list": [1, null, 3] })
        );
        let cyc = interp.get_global("cyc").unwrap();
        assert!(interp.value_to_json(&cyc).is_err());
    }

    #[test]
    fn test_value_to_json_rejects_huge_sparse_arrays() {
        let mut interp = Interpreter::new();
        interp.prepare("globalThis.sparse = []; sparse[4294967294] = 1;").unwrap();
        interp.run_to_completion().unwrap();
        let sparse = interp.get_global("sparse").unwrap();
        let err = interp.value_to_json(&sparse).unwrap_err();
        assert!(err.to_string().contains("too long"), "{}", err);
    }
}
