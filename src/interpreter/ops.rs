//! Abstract operations: type conversion, operators and the property protocol

use crate::ast::BinaryOp;
use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::object::{
    JsFunction, JsObject, JsObjectRef, ObjectKind, Property, PropertyDescriptor, PropertyKey,
    PropertySlot, prototype_chain,
};
use crate::value::{CheapClone, JsString, JsValue, number_to_string, string_to_number};

/// Most elements CreateListFromArrayLike will copy out of an array-like
pub const MAX_LIST_LENGTH: u64 = 1 << 20;

/// Hint for ToPrimitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredType {
    Default,
    Number,
    String,
}

impl PreferredType {
    fn as_str(self) -> &'static str {
        match self {
            PreferredType::Default => "default",
            PreferredType::Number => "number",
            PreferredType::String => "string",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Numeric helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// ToInt32 on an already converted number
pub fn f64_to_int32(n: f64) -> i32 {
    f64_to_uint32(n) as i32
}

/// ToUint32 on an already converted number
pub fn f64_to_uint32(n: f64) -> u32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let int = n.trunc();
    let modulo = int.rem_euclid(4_294_967_296.0);
    modulo as u32
}

/// ToIntegerOrInfinity on an already converted number
pub fn integer_or_infinity(n: f64) -> f64 {
    if n.is_nan() {
        0.0
    } else if n.is_infinite() {
        n
    } else {
        // Also folds -0 into +0
        n.trunc() + 0.0
    }
}

/// Resolve a relative index (`slice`, `at`, ...) against a length
pub fn relative_index(relative: f64, len: u64) -> u64 {
    let len_f = len as f64;
    if relative < 0.0 {
        (len_f + relative).max(0.0) as u64
    } else {
        relative.min(len_f) as u64
    }
}

impl Interpreter {
    // ═══════════════════════════════════════════════════════════════════════
    // Conversions
    // ═══════════════════════════════════════════════════════════════════════

    /// ToPrimitive
    pub fn to_primitive(&mut self, value: &JsValue, hint: PreferredType) -> Result<JsValue, JsError> {
        let JsValue::Object(obj) = value else {
            return Ok(value.cheap_clone());
        };
        let key = PropertyKey::Symbol(self.realm.symbols.to_primitive.cheap_clone());
        if let Some(exotic) = self.get_method(value, &key)? {
            let result = self.call_function(&exotic, value.cheap_clone(), &[JsValue::from(hint.as_str())])?;
            if result.is_object() {
                return Err(JsError::type_error("Cannot convert object to primitive value"));
            }
            return Ok(result);
        }
        let order = match hint {
            PreferredType::String => ["toString", "valueOf"],
            PreferredType::Number | PreferredType::Default => ["valueOf", "toString"],
        };
        for name in order {
            let method = self.get(obj, &PropertyKey::from(name))?;
            if method.is_callable() {
                let result = self.call_function(&method, value.cheap_clone(), &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        Err(JsError::type_error("Cannot convert object to primitive value"))
    }

    /// ToNumber
    pub fn to_number(&mut self, value: &JsValue) -> Result<f64, JsError> {
        Ok(match value {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            JsValue::Number(n) => *n,
            JsValue::String(s) => string_to_number(s.as_str()),
            JsValue::Symbol(_) => {
                return Err(JsError::type_error("Cannot convert a Symbol value to a number"));
            }
            JsValue::Object(_) => {
                let prim = self.to_primitive(value, PreferredType::Number)?;
                return self.to_number(&prim);
            }
        })
    }

    /// ToString
    pub fn to_string(&mut self, value: &JsValue) -> Result<JsString, JsError> {
        Ok(match value {
            JsValue::Undefined => JsString::from("undefined"),
            JsValue::Null => JsString::from("null"),
            JsValue::Boolean(b) => JsString::from(if *b { "true" } else { "false" }),
            JsValue::Number(n) => JsString::from(number_to_string(*n)),
            JsValue::String(s) => s.cheap_clone(),
            JsValue::Symbol(_) => {
                return Err(JsError::type_error("Cannot convert a Symbol value to a string"));
            }
            JsValue::Object(_) => {
                let prim = self.to_primitive(value, PreferredType::String)?;
                return self.to_string(&prim);
            }
        })
    }

    /// ToObject: boxes primitives with the matching intrinsic prototype
    pub fn to_object(&mut self, value: &JsValue) -> Result<JsObjectRef, JsError> {
        let intrinsics = &self.realm.intrinsics;
        let (kind, proto) = match value {
            JsValue::Object(obj) => return Ok(obj.cheap_clone()),
            JsValue::Undefined | JsValue::Null => {
                return Err(JsError::type_error(format!(
                    "Cannot convert {:?} to object",
                    value
                )));
            }
            JsValue::Boolean(b) => (ObjectKind::Boolean(*b), &intrinsics.boolean_prototype),
            JsValue::Number(n) => (ObjectKind::Number(*n), &intrinsics.number_prototype),
            JsValue::String(s) => (ObjectKind::String(s.cheap_clone()), &intrinsics.string_prototype),
            JsValue::Symbol(sym) => (ObjectKind::Symbol(sym.cheap_clone()), &intrinsics.symbol_prototype),
        };
        Ok(JsObject::new(kind, Some(proto.cheap_clone())).into_ref())
    }

    /// ToPropertyKey
    pub fn to_property_key(&mut self, value: &JsValue) -> Result<PropertyKey, JsError> {
        match value {
            JsValue::String(s) => Ok(PropertyKey::from(s.cheap_clone())),
            JsValue::Symbol(sym) => Ok(PropertyKey::Symbol(sym.cheap_clone())),
            JsValue::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n < f64::from(u32::MAX) => {
                Ok(PropertyKey::from(*n as u32))
            }
            JsValue::Object(_) => {
                let prim = self.to_primitive(value, PreferredType::String)?;
                self.to_property_key(&prim)
            }
            other => Ok(PropertyKey::from(self.to_string(other)?)),
        }
    }

    pub fn to_int32(&mut self, value: &JsValue) -> Result<i32, JsError> {
        Ok(f64_to_int32(self.to_number(value)?))
    }

    pub fn to_uint32(&mut self, value: &JsValue) -> Result<u32, JsError> {
        Ok(f64_to_uint32(self.to_number(value)?))
    }

    pub fn to_integer_or_infinity(&mut self, value: &JsValue) -> Result<f64, JsError> {
        Ok(integer_or_infinity(self.to_number(value)?))
    }

    /// ToLength
    pub fn to_length(&mut self, value: &JsValue) -> Result<u64, JsError> {
        let len = self.to_integer_or_infinity(value)?;
        if len <= 0.0 {
            return Ok(0);
        }
        Ok(len.min(9_007_199_254_740_991.0) as u64)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Equality and comparison
    // ═══════════════════════════════════════════════════════════════════════

    /// IsLooselyEqual (==)
    pub fn loosely_equals(&mut self, x: &JsValue, y: &JsValue) -> Result<bool, JsError> {
        if x.type_tag() == y.type_tag() {
            return Ok(x.strict_equals(y));
        }
        Ok(match (x, y) {
            (JsValue::Undefined | JsValue::Null, JsValue::Undefined | JsValue::Null) => true,
            (JsValue::Number(a), JsValue::String(s)) => *a == string_to_number(s.as_str()),
            (JsValue::String(s), JsValue::Number(b)) => string_to_number(s.as_str()) == *b,
            (JsValue::Boolean(b), other) => {
                let n = JsValue::Number(if *b { 1.0 } else { 0.0 });
                return self.loosely_equals(&n, other);
            }
            (other, JsValue::Boolean(b)) => {
                let n = JsValue::Number(if *b { 1.0 } else { 0.0 });
                return self.loosely_equals(other, &n);
            }
            (JsValue::Number(_) | JsValue::String(_) | JsValue::Symbol(_), JsValue::Object(_)) => {
                let prim = self.to_primitive(y, PreferredType::Default)?;
                return self.loosely_equals(x, &prim);
            }
            (JsValue::Object(_), JsValue::Number(_) | JsValue::String(_) | JsValue::Symbol(_)) => {
                let prim = self.to_primitive(x, PreferredType::Default)?;
                return self.loosely_equals(&prim, y);
            }
            _ => false,
        })
    }

    /// IsLessThan. `None` stands for undefined (a NaN was involved).
    pub fn is_less_than(&mut self, x: &JsValue, y: &JsValue, left_first: bool) -> Result<Option<bool>, JsError> {
        let (px, py) = if left_first {
            let px = self.to_primitive(x, PreferredType::Number)?;
            let py = self.to_primitive(y, PreferredType::Number)?;
            (px, py)
        } else {
            let py = self.to_primitive(y, PreferredType::Number)?;
            let px = self.to_primitive(x, PreferredType::Number)?;
            (px, py)
        };
        if let (JsValue::String(a), JsValue::String(b)) = (&px, &py) {
            // Code unit order, which differs from UTF-8 byte order for astral characters
            return Ok(Some(a.as_str().encode_utf16().lt(b.as_str().encode_utf16())));
        }
        let nx = self.to_number(&px)?;
        let ny = self.to_number(&py)?;
        if nx.is_nan() || ny.is_nan() {
            return Ok(None);
        }
        Ok(Some(nx < ny))
    }

    /// InstanceofOperator
    pub fn instance_of(&mut self, value: &JsValue, target: &JsValue) -> Result<bool, JsError> {
        if !target.is_object() {
            return Err(JsError::type_error(
                "Right-hand side of 'instanceof' is not an object",
            ));
        }
        let key = PropertyKey::Symbol(self.realm.symbols.has_instance.cheap_clone());
        if let Some(handler) = self.get_method(target, &key)? {
            let result = self.call_function(&handler, target.cheap_clone(), &[value.cheap_clone()])?;
            return Ok(result.to_boolean());
        }
        if !target.is_callable() {
            return Err(JsError::type_error(
                "Right-hand side of 'instanceof' is not callable",
            ));
        }
        self.ordinary_has_instance(target, value)
    }

    /// OrdinaryHasInstance
    pub fn ordinary_has_instance(&mut self, constructor: &JsValue, value: &JsValue) -> Result<bool, JsError> {
        let JsValue::Object(ctor) = constructor else {
            return Ok(false);
        };
        let bound_target = match ctor.borrow().function() {
            Some(JsFunction::Bound(bound)) => Some(bound.target.cheap_clone()),
            Some(_) => None,
            None => return Ok(false),
        };
        if let Some(target) = bound_target {
            return self.instance_of(value, &JsValue::Object(target));
        }
        let JsValue::Object(obj) = value else {
            return Ok(false);
        };
        let proto = self.get(ctor, &PropertyKey::from("prototype"))?;
        let JsValue::Object(proto) = proto else {
            return Err(JsError::type_error(
                "Function has non-object prototype in instanceof check",
            ));
        };
        Ok(crate::object::is_prototype_of(&proto, obj))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Operators
    // ═══════════════════════════════════════════════════════════════════════

    /// ApplyStringOrNumericBinaryOperator and the relational/equality operators
    pub fn apply_binary(&mut self, op: BinaryOp, left: &JsValue, right: &JsValue) -> Result<JsValue, JsError> {
        // Number fast path for the common arithmetic case
        if let (JsValue::Number(a), JsValue::Number(b)) = (left, right)
            && let Some(result) = numeric_binary(op, *a, *b)
        {
            return Ok(result);
        }
        Ok(match op {
            BinaryOp::Add => {
                let lp = self.to_primitive(left, PreferredType::Default)?;
                let rp = self.to_primitive(right, PreferredType::Default)?;
                if matches!(lp, JsValue::String(_)) || matches!(rp, JsValue::String(_)) {
                    let ls = self.to_string(&lp)?;
                    let rs = self.to_string(&rp)?;
                    JsValue::String(ls.concat(&rs))
                } else {
                    JsValue::Number(self.to_number(&lp)? + self.to_number(&rp)?)
                }
            }
            BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::Exp
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::LShift
            | BinaryOp::RShift
            | BinaryOp::URShift => {
                let a = self.to_number(left)?;
                let b = self.to_number(right)?;
                numeric_binary(op, a, b)
                    .ok_or_else(|| JsError::internal_error("non-numeric operator in numeric path"))?
            }
            BinaryOp::Eq => JsValue::Boolean(self.loosely_equals(left, right)?),
            BinaryOp::NotEq => JsValue::Boolean(!self.loosely_equals(left, right)?),
            BinaryOp::StrictEq => JsValue::Boolean(left.strict_equals(right)),
            BinaryOp::StrictNotEq => JsValue::Boolean(!left.strict_equals(right)),
            BinaryOp::Lt => JsValue::Boolean(self.is_less_than(left, right, true)? == Some(true)),
            BinaryOp::Gt => JsValue::Boolean(self.is_less_than(right, left, false)? == Some(true)),
            BinaryOp::LtEq => JsValue::Boolean(self.is_less_than(right, left, false)? == Some(false)),
            BinaryOp::GtEq => JsValue::Boolean(self.is_less_than(left, right, true)? == Some(false)),
            BinaryOp::In => {
                let JsValue::Object(obj) = right else {
                    return Err(JsError::type_error(format!(
                        "Cannot use 'in' operator to search for '{}' in {}",
                        self.display_value(left),
                        self.display_value(right)
                    )));
                };
                let key = self.to_property_key(left)?;
                JsValue::Boolean(crate::object::has_property(obj, &key))
            }
            BinaryOp::Instanceof => JsValue::Boolean(self.instance_of(left, right)?),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Property access
    // ═══════════════════════════════════════════════════════════════════════

    /// [[Get]] with the object itself as receiver
    pub fn get(&mut self, obj: &JsObjectRef, key: &PropertyKey) -> Result<JsValue, JsError> {
        let receiver = JsValue::Object(obj.cheap_clone());
        self.get_with_receiver(obj, key, &receiver)
    }

    /// [[Get]]: data values, getters called with `receiver`, undefined when absent
    pub fn get_with_receiver(
        &mut self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        receiver: &JsValue,
    ) -> Result<JsValue, JsError> {
        for current in prototype_chain(obj) {
            let found = {
                let o = current.borrow();
                if let (ObjectKind::ModuleNamespace(ns), PropertyKey::String(name)) = (&o.kind, key)
                    && let Some((env, binding)) = ns.exports.get(name)
                {
                    let e = env.borrow();
                    let decl = e
                        .declarative()
                        .ok_or_else(|| JsError::internal_error("namespace over a record without storage"))?;
                    return decl.get_binding_value(binding);
                }
                o.get_own_property(key)
            };
            if let Some(prop) = found {
                return match prop.slot {
                    PropertySlot::Data { value, .. } => Ok(value),
                    PropertySlot::Accessor { get: Some(getter), .. } => {
                        self.call_function(&JsValue::Object(getter), receiver.cheap_clone(), &[])
                    }
                    PropertySlot::Accessor { get: None, .. } => Ok(JsValue::Undefined),
                };
            }
        }
        Ok(JsValue::Undefined)
    }

    /// GetV: property read on any value (primitives read through their prototype)
    pub fn get_v(&mut self, value: &JsValue, key: &PropertyKey) -> Result<JsValue, JsError> {
        match value {
            JsValue::Object(obj) => self.get_with_receiver(obj, key, value),
            JsValue::Undefined | JsValue::Null => Err(JsError::type_error(format!(
                "Cannot read properties of {:?} (reading '{}')",
                value, key
            ))),
            JsValue::String(s) => {
                if key.eq_str("length") {
                    return Ok(JsValue::Number(s.utf16_len() as f64));
                }
                if let Some(index) = key.as_index() {
                    if let Some(ch) = s.char_at(index as usize) {
                        return Ok(JsValue::String(ch));
                    }
                }
                let proto = self.realm.intrinsics.string_prototype.cheap_clone();
                self.get_with_receiver(&proto, key, value)
            }
            JsValue::Number(_) => {
                let proto = self.realm.intrinsics.number_prototype.cheap_clone();
                self.get_with_receiver(&proto, key, value)
            }
            JsValue::Boolean(_) => {
                let proto = self.realm.intrinsics.boolean_prototype.cheap_clone();
                self.get_with_receiver(&proto, key, value)
            }
            JsValue::Symbol(_) => {
                let proto = self.realm.intrinsics.symbol_prototype.cheap_clone();
                self.get_with_receiver(&proto, key, value)
            }
        }
    }

    /// GetMethod: None for undefined/null, TypeError for non-callables
    pub fn get_method(&mut self, value: &JsValue, key: &PropertyKey) -> Result<Option<JsValue>, JsError> {
        let func = self.get_v(value, key)?;
        if func.is_null_or_undefined() {
            return Ok(None);
        }
        if !func.is_callable() {
            return Err(JsError::type_error(format!("{} is not a function", self.display_value(&func))));
        }
        Ok(Some(func))
    }

    /// OrdinarySet. Returns false when the assignment is refused.
    pub fn set_property(
        &mut self,
        obj: &JsObjectRef,
        key: PropertyKey,
        value: JsValue,
        receiver: &JsValue,
    ) -> Result<bool, JsError> {
        let mut found = None;
        for current in prototype_chain(obj) {
            if let Some(prop) = current.borrow().get_own_property(&key) {
                found = Some(prop);
                break;
            }
        }
        match found {
            Some(Property {
                slot: PropertySlot::Accessor { set, .. },
                ..
            }) => match set {
                Some(setter) => {
                    self.call_function(&JsValue::Object(setter), receiver.cheap_clone(), &[value])?;
                    Ok(true)
                }
                None => Ok(false),
            },
            Some(Property {
                slot: PropertySlot::Data { writable: false, .. },
                ..
            }) => Ok(false),
            _ => {
                let JsValue::Object(target) = receiver else {
                    return Ok(false);
                };
                let existing = target.borrow().get_own_property(&key);
                match existing {
                    Some(prop) if prop.is_accessor() || !prop.is_writable() => Ok(false),
                    Some(_) => self.define_own_property(
                        target,
                        key,
                        PropertyDescriptor {
                            value: Some(value),
                            ..PropertyDescriptor::default()
                        },
                    ),
                    None => self.define_own_property(target, key, PropertyDescriptor::data(value)),
                }
            }
        }
    }

    /// Set(O, P, V, true)
    pub fn set(&mut self, obj: &JsObjectRef, key: impl Into<PropertyKey>, value: JsValue) -> Result<(), JsError> {
        let key = key.into();
        let receiver = JsValue::Object(obj.cheap_clone());
        if self.set_property(obj, key.cheap_clone(), value, &receiver)? {
            Ok(())
        } else {
            Err(JsError::type_error(format!(
                "Cannot assign to read only property '{}' of object",
                key
            )))
        }
    }

    /// [[DefineOwnProperty]] with array `length` values converted first
    pub fn define_own_property(
        &mut self,
        obj: &JsObjectRef,
        key: PropertyKey,
        mut desc: PropertyDescriptor,
    ) -> Result<bool, JsError> {
        let is_array_length = obj.borrow().is_array() && key.eq_str("length");
        if is_array_length && let Some(value) = &desc.value {
            let value = value.cheap_clone();
            let new_len = self.to_uint32(&value)?;
            let number_len = self.to_number(&value)?;
            if f64::from(new_len) != number_len {
                return Err(JsError::range_error("Invalid array length"));
            }
            desc.value = Some(JsValue::Number(f64::from(new_len)));
        }
        Ok(obj.borrow_mut().define_own_property(key, desc))
    }

    /// DefinePropertyOrThrow
    pub fn define_property_or_throw(
        &mut self,
        obj: &JsObjectRef,
        key: PropertyKey,
        desc: PropertyDescriptor,
    ) -> Result<(), JsError> {
        let display = key.to_string();
        if self.define_own_property(obj, key, desc)? {
            Ok(())
        } else {
            Err(JsError::type_error(format!("Cannot redefine property: {}", display)))
        }
    }

    /// CreateDataPropertyOrThrow
    pub fn create_data_property_or_throw(
        &mut self,
        obj: &JsObjectRef,
        key: impl Into<PropertyKey>,
        value: JsValue,
    ) -> Result<(), JsError> {
        let key = key.into();
        let display = key.to_string();
        if obj.borrow_mut().define_own_property(key, PropertyDescriptor::data(value)) {
            Ok(())
        } else {
            Err(JsError::type_error(format!(
                "Cannot define property {}, object is not extensible",
                display
            )))
        }
    }

    /// DeletePropertyOrThrow
    pub fn delete_property_or_throw(&mut self, obj: &JsObjectRef, key: &PropertyKey) -> Result<(), JsError> {
        if obj.borrow_mut().delete(key) {
            Ok(())
        } else {
            Err(JsError::type_error(format!("Cannot delete property '{}'", key)))
        }
    }

    /// LengthOfArrayLike
    pub fn length_of_array_like(&mut self, obj: &JsObjectRef) -> Result<u64, JsError> {
        if let ObjectKind::Array(state) = &obj.borrow().kind {
            return Ok(u64::from(state.length));
        }
        let len = self.get(obj, &PropertyKey::from("length"))?;
        self.to_length(&len)
    }

    /// CreateListFromArrayLike
    pub fn create_list_from_array_like(&mut self, value: &JsValue) -> Result<Vec<JsValue>, JsError> {
        let JsValue::Object(obj) = value else {
            return Err(JsError::type_error("CreateListFromArrayLike called on non-object"));
        };
        let len = self.length_of_array_like(obj)?;
        if len > MAX_LIST_LENGTH {
            return Err(JsError::range_error(format!(
                "Array-like of length {} exceeds the {} element limit",
                len, MAX_LIST_LENGTH
            )));
        }
        let mut list = Vec::with_capacity(len.min(1024) as usize);
        for index in 0..len {
            self.charge_native_step()?;
            let key = index_key(index);
            list.push(self.get(obj, &key)?);
        }
        Ok(list)
    }

    /// Invoke: look up a method on a value and call it
    pub fn invoke(&mut self, value: &JsValue, key: &PropertyKey, args: &[JsValue]) -> Result<JsValue, JsError> {
        let func = self.get_v(value, key)?;
        if !func.is_callable() {
            return Err(JsError::type_error(format!("{} is not a function", key)));
        }
        self.call_function(&func, value.cheap_clone(), args)
    }

    /// CopyDataProperties (object spread and rest patterns)
    pub fn copy_data_properties(
        &mut self,
        target: &JsObjectRef,
        source: &JsValue,
        excluded: &[PropertyKey],
    ) -> Result<(), JsError> {
        if source.is_null_or_undefined() {
            return Ok(());
        }
        let from = self.to_object(source)?;
        let keys = from.borrow().own_property_keys();
        for key in keys {
            if excluded.contains(&key) {
                continue;
            }
            let enumerable = from
                .borrow()
                .get_own_property(&key)
                .is_some_and(|p| p.enumerable);
            if enumerable {
                let value = self.get(&from, &key)?;
                self.create_data_property_or_throw(target, key, value)?;
            }
        }
        Ok(())
    }

    /// EnumerableOwnProperties keys, in property order
    pub fn enumerable_own_keys(&mut self, obj: &JsObjectRef) -> Vec<PropertyKey> {
        let o = obj.borrow();
        o.own_property_keys()
            .into_iter()
            .filter(|k| !k.is_symbol())
            .filter(|k| o.get_own_property(k).is_some_and(|p| p.enumerable))
            .collect()
    }
}

/// Property key for an index that may exceed the array index range
pub fn index_key(index: u64) -> PropertyKey {
    match u32::try_from(index) {
        Ok(i) => PropertyKey::from(i),
        Err(_) => PropertyKey::from(JsString::from(index.to_string())),
    }
}

/// Numeric operators on two numbers; None for non-numeric operators
fn numeric_binary(op: BinaryOp, a: f64, b: f64) -> Option<JsValue> {
    let n = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => js_remainder(a, b),
        BinaryOp::Exp => js_pow(a, b),
        BinaryOp::BitAnd => f64::from(f64_to_int32(a) & f64_to_int32(b)),
        BinaryOp::BitOr => f64::from(f64_to_int32(a) | f64_to_int32(b)),
        BinaryOp::BitXor => f64::from(f64_to_int32(a) ^ f64_to_int32(b)),
        BinaryOp::LShift => f64::from(f64_to_int32(a).wrapping_shl(f64_to_uint32(b) & 31)),
        BinaryOp::RShift => f64::from(f64_to_int32(a) >> (f64_to_uint32(b) & 31)),
        BinaryOp::URShift => f64::from(f64_to_uint32(a) >> (f64_to_uint32(b) & 31)),
        BinaryOp::Lt => return Some(JsValue::Boolean(a < b)),
        BinaryOp::Gt => return Some(JsValue::Boolean(a > b)),
        BinaryOp::LtEq => return Some(JsValue::Boolean(a <= b)),
        BinaryOp::GtEq => return Some(JsValue::Boolean(a >= b)),
        BinaryOp::StrictEq | BinaryOp::Eq => return Some(JsValue::Boolean(a == b)),
        BinaryOp::StrictNotEq | BinaryOp::NotEq => return Some(JsValue::Boolean(a != b)),
        BinaryOp::In | BinaryOp::Instanceof => return None,
    };
    Some(JsValue::Number(n))
}

/// Number::remainder: the sign follows the dividend
fn js_remainder(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() || a.is_infinite() || b == 0.0 {
        return f64::NAN;
    }
    if b.is_infinite() || a == 0.0 {
        return a;
    }
    a % b
}

/// Number::exponentiate: 1 ** NaN and (±1) ** ±Infinity are NaN
fn js_pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() {
        return f64::NAN;
    }
    if exponent == 0.0 {
        return 1.0;
    }
    if base.abs() == 1.0 && exponent.is_infinite() {
        return f64::NAN;
    }
    base.powf(exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint32_and_int32_wrapping() {
        assert_eq!(f64_to_uint32(-1.0), u32::MAX);
        assert_eq!(f64_to_int32(4_294_967_295.0), -1);
        assert_eq!(f64_to_int32(2_147_483_648.0), i32::MIN);
        assert_eq!(f64_to_uint32(f64::NAN), 0);
        assert_eq!(f64_to_uint32(3.7), 3);
    }

    #[test]
    fn test_numeric_operators() {
        let rem = |a, b| js_remainder(a, b);
        assert_eq!(rem(-5.0, 3.0), -2.0);
        assert!(rem(5.0, 0.0).is_nan());
        assert_eq!(rem(5.0, f64::INFINITY), 5.0);
        assert!(js_pow(1.0, f64::INFINITY).is_nan());
        assert_eq!(js_pow(f64::NAN, 0.0), 1.0);
        assert!(matches!(
            numeric_binary(BinaryOp::URShift, -1.0, 0.0),
            Some(JsValue::Number(n)) if n == 4_294_967_295.0
        ));
    }

    #[test]
    fn test_relative_index() {
        assert_eq!(relative_index(-1.0, 5), 4);
        assert_eq!(relative_index(-10.0, 5), 0);
        assert_eq!(relative_index(7.0, 5), 5);
        assert_eq!(integer_or_infinity(-0.5), 0.0);
    }
}
