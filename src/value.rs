//! JavaScript value representation
//!
//! The core JsValue type plus the primitive payloads it carries. Objects live
//! in [`crate::object`]; this module only holds the handle.

use std::fmt;
use std::rc::Rc;

pub use crate::object::JsObjectRef;
use crate::object::ObjectKind;

/// Trait for types that have cheap (O(1), reference-counted) clones.
///
/// This trait makes it explicit when a clone is cheap (just incrementing a reference count)
/// vs when it might be expensive (copying data).
pub trait CheapClone: Clone {
    /// Create a cheap (reference-counted) clone of this value.
    fn cheap_clone(&self) -> Self {
        self.clone()
    }
}

// Implement CheapClone for Rc-based types (Rc<RefCell<T>> is covered by this)
impl<T: ?Sized> CheapClone for Rc<T> {}

/// A JavaScript value
#[derive(Clone, Default)]
pub enum JsValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Symbol(JsSymbol),
    Object(JsObjectRef),
}

// Every variant payload is either Copy or reference counted
impl CheapClone for JsValue {}

/// Runtime type code of a value, used for fast dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Symbol,
    Object,
}

impl JsValue {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            JsValue::Undefined => TypeTag::Undefined,
            JsValue::Null => TypeTag::Null,
            JsValue::Boolean(_) => TypeTag::Boolean,
            JsValue::Number(_) => TypeTag::Number,
            JsValue::String(_) => TypeTag::String,
            JsValue::Symbol(_) => TypeTag::Symbol,
            JsValue::Object(_) => TypeTag::Object,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    /// Check if this value is null or undefined
    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, JsValue::Null | JsValue::Undefined)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    pub fn as_object(&self) -> Option<&JsObjectRef> {
        match self {
            JsValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Check if this value is callable (a function)
    pub fn is_callable(&self) -> bool {
        match self {
            JsValue::Object(obj) => obj.borrow().is_callable(),
            _ => false,
        }
    }

    pub fn is_constructor(&self) -> bool {
        match self {
            JsValue::Object(obj) => obj.borrow().is_constructor(),
            _ => false,
        }
    }

    /// Get the typeof result for this value
    pub fn type_of(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "object",
            JsValue::Boolean(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Symbol(_) => "symbol",
            JsValue::Object(obj) => {
                if obj.borrow().is_callable() {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }

    /// ToBoolean
    pub fn to_boolean(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Boolean(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::String(s) => !s.is_empty(),
            JsValue::Symbol(_) | JsValue::Object(_) => true,
        }
    }

    /// Strict equality (===)
    pub fn strict_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            // NaN !== NaN and 0 === -0 fall out of IEEE comparison
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Symbol(a), JsValue::Symbol(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// SameValue: like strict equality, but NaN equals NaN and +0 differs from -0
    pub fn same_value(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Number(a), JsValue::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                a == b && a.is_sign_negative() == b.is_sign_negative()
            }
            _ => self.strict_equals(other),
        }
    }

    /// SameValueZero: NaN equals NaN and +0 equals -0
    pub fn same_value_zero(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Number(a), JsValue::Number(b)) => (a.is_nan() && b.is_nan()) || a == b,
            _ => self.strict_equals(other),
        }
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{}", b),
            JsValue::Number(n) => write!(f, "{}", number_to_string(*n)),
            JsValue::String(s) => write!(f, "\"{}\"", s.as_str()),
            JsValue::Symbol(s) => write!(f, "{}", s.descriptive_string()),
            JsValue::Object(obj) => match obj.try_borrow() {
                Ok(obj) => match &obj.kind {
                    ObjectKind::Array(_) => write!(f, "[...]"),
                    ObjectKind::Function(func) => write!(f, "[Function: {}]", func.debug_name()),
                    ObjectKind::Map(table) => write!(f, "Map({})", table.len()),
                    ObjectKind::Set(table) => write!(f, "Set({})", table.len()),
                    ObjectKind::Promise(state) => write!(f, "Promise {{{}}}", state.status_name()),
                    ObjectKind::Generator(_) => write!(f, "[object Generator]"),
                    ObjectKind::Error => write!(f, "[object Error]"),
                    _ => write!(f, "{{...}}"),
                },
                Err(_) => write!(f, "{{<borrowed>}}"),
            },
        }
    }
}

impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

// Conversions from Rust types

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<i32> for JsValue {
    fn from(n: i32) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<u32> for JsValue {
    fn from(n: u32) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

impl From<JsObjectRef> for JsValue {
    fn from(obj: JsObjectRef) -> Self {
        JsValue::Object(obj)
    }
}

/// Longest string a builtin will build, in bytes
pub const MAX_STRING_LENGTH: usize = 1 << 29;

/// Reference-counted immutable string.
///
/// Text is stored as UTF-8; `utf16_len` and `code_unit_at` expose the UTF-16
/// view that `length` and indexing observe.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsString(Rc<str>);

// JsString wraps Rc<str>, so clone is cheap (just reference count increment)
impl CheapClone for JsString {}

impl JsString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of UTF-16 code units
    pub fn utf16_len(&self) -> usize {
        if self.0.is_ascii() {
            return self.0.len();
        }
        self.0.chars().map(char::len_utf16).sum()
    }

    /// UTF-16 code unit at `index`
    pub fn code_unit_at(&self, index: usize) -> Option<u16> {
        if self.0.is_ascii() {
            return self.0.as_bytes().get(index).map(|b| u16::from(*b));
        }
        self.0.encode_utf16().nth(index)
    }

    /// The one-code-unit string at `index`. A lone surrogate half has no
    /// UTF-8 form and is rendered as U+FFFD.
    pub fn char_at(&self, index: usize) -> Option<JsString> {
        let unit = self.code_unit_at(index)?;
        let ch = char::from_u32(u32::from(unit)).unwrap_or('\u{FFFD}');
        Some(JsString::from(ch.to_string()))
    }

    /// Substring by UTF-16 code unit range (clamped)
    pub fn substring_utf16(&self, start: usize, end: usize) -> JsString {
        if start >= end {
            return JsString::from("");
        }
        let units: Vec<u16> = self.0.encode_utf16().skip(start).take(end - start).collect();
        JsString::from(String::from_utf16_lossy(&units))
    }

    /// Index of `needle` in UTF-16 code units, searching from `from`
    pub fn index_of_utf16(&self, needle: &str, from: usize) -> Option<usize> {
        let hay: Vec<u16> = self.0.encode_utf16().collect();
        let pat: Vec<u16> = needle.encode_utf16().collect();
        if pat.is_empty() {
            return Some(from.min(hay.len()));
        }
        if pat.len() > hay.len() {
            return None;
        }
        (from..=hay.len() - pat.len()).find(|&i| hay.get(i..i + pat.len()) == Some(pat.as_slice()))
    }

    pub fn concat(&self, other: &JsString) -> JsString {
        if other.is_empty() {
            return self.cheap_clone();
        }
        if self.is_empty() {
            return other.cheap_clone();
        }
        let mut s = String::with_capacity(self.0.len() + other.0.len());
        s.push_str(&self.0);
        s.push_str(&other.0);
        JsString::from(s)
    }
}

impl std::ops::Deref for JsString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for JsString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for JsString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for JsString {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for JsString {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString(s.into())
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString(s.into())
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// JavaScript Symbol primitive
/// Symbols are unique identifiers, optionally with a description
#[derive(Clone, Debug)]
pub struct JsSymbol {
    /// Unique identifier for this symbol, allocated by the realm
    id: u64,
    /// Optional description (from Symbol('description'))
    pub description: Option<JsString>,
}

impl CheapClone for JsSymbol {}

impl JsSymbol {
    pub fn new(id: u64, description: Option<JsString>) -> Self {
        Self { id, description }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// `Symbol(description)`, as produced by Symbol.prototype.toString
    pub fn descriptive_string(&self) -> String {
        match &self.description {
            Some(desc) => format!("Symbol({})", desc),
            None => "Symbol()".to_string(),
        }
    }
}

impl PartialEq for JsSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for JsSymbol {}

impl std::hash::Hash for JsSymbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Number <-> String
// ═══════════════════════════════════════════════════════════════════════════════

/// Number::toString(10): shortest round-trip digits, exponent form outside
/// the [1e-7, 1e21) range.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n < 0.0 {
        return format!("-{}", number_to_string(-n));
    }

    // `{:e}` yields the shortest round-trip digits as d.ddde±x
    let sci = format!("{:e}", n);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exp: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let point = exp + 1;

    if k <= point && point <= 21 {
        let mut s = digits;
        s.extend(std::iter::repeat_n('0', (point - k) as usize));
        s
    } else if 0 < point && point <= 21 {
        let (int_part, frac_part) = digits.split_at(point as usize);
        format!("{}.{}", int_part, frac_part)
    } else if -6 < point && point <= 0 {
        let mut s = String::from("0.");
        s.extend(std::iter::repeat_n('0', (-point) as usize));
        s.push_str(&digits);
        s
    } else {
        let e = point - 1;
        let sign = if e < 0 { '-' } else { '+' };
        let mut chars = digits.chars();
        let first = chars.next().unwrap_or('0');
        let rest: String = chars.collect();
        if rest.is_empty() {
            format!("{}e{}{}", first, sign, e.abs())
        } else {
            format!("{}.{}e{}{}", first, rest, sign, e.abs())
        }
    }
}

/// JS whitespace and line terminators, as trimmed by StringToNumber
pub fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\u{0009}'
            | '\u{000A}'
            | '\u{000B}'
            | '\u{000C}'
            | '\u{000D}'
            | '\u{0020}'
            | '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
                | '\u{2028}'
                | '\u{2029}'
                | '\u{202F}'
                | '\u{205F}'
                | '\u{3000}'
                | '\u{FEFF}'
    )
}

/// StringToNumber
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return 0.0;
    }

    let radix_prefix = |prefix: &[&str], radix: u32| -> Option<f64> {
        let rest = prefix.iter().find_map(|p| trimmed.strip_prefix(p))?;
        if rest.is_empty() || !rest.chars().all(|c| c.is_digit(radix)) {
            return Some(f64::NAN);
        }
        Some(
            rest.chars()
                .filter_map(|c| c.to_digit(radix))
                .fold(0.0, |acc, d| acc * radix as f64 + d as f64),
        )
    };
    if let Some(n) = radix_prefix(&["0x", "0X"], 16) {
        return n;
    }
    if let Some(n) = radix_prefix(&["0o", "0O"], 8) {
        return n;
    }
    if let Some(n) = radix_prefix(&["0b", "0B"], 2) {
        return n;
    }

    let (sign, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    if unsigned == "Infinity" {
        return sign * f64::INFINITY;
    }
    if !is_decimal_literal(unsigned) {
        return f64::NAN;
    }
    unsigned.parse::<f64>().map(|n| sign * n).unwrap_or(f64::NAN)
}

/// StrUnsignedDecimalLiteral: digits, optional fraction, optional exponent.
/// Rust's float parser also accepts "inf"/"nan", which JS does not.
fn is_decimal_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut int_digits = 0;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
        int_digits += 1;
    }
    let mut frac_digits = 0;
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
            frac_digits += 1;
        }
    }
    if int_digits + frac_digits == 0 {
        return false;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let start = i;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        if i == start {
            return false;
        }
    }
    i == bytes.len()
}

/// Canonical numeric string check used by PropertyKey: "0", "1", ... but not "01"
pub fn parse_array_index(s: &str) -> Option<u32> {
    let bytes = s.as_bytes();
    let first = *bytes.first()?;
    if !first.is_ascii_digit() || (first == b'0' && bytes.len() > 1) {
        return None;
    }
    if !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let n: u64 = s.parse().ok()?;
    // 2^32 - 1 is not an array index
    if n < u64::from(u32::MAX) {
        Some(n as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(1.0), "1");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(123456789012345680000.0), "123456789012345680000");
        assert_eq!(number_to_string(1e-7), "1e-7");
        assert_eq!(number_to_string(0.000001), "0.000001");
        assert_eq!(number_to_string(1.5e-10), "1.5e-10");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_to_string(-42.5), "-42.5");
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("  \n42\t"), 42.0);
        assert_eq!(string_to_number("0x1F"), 31.0);
        assert_eq!(string_to_number("0b101"), 5.0);
        assert_eq!(string_to_number("0o17"), 15.0);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(string_to_number(".5"), 0.5);
        assert_eq!(string_to_number("5."), 5.0);
        assert_eq!(string_to_number("1e3"), 1000.0);
        assert!(string_to_number("1_000").is_nan());
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("-0x10").is_nan());
    }

    #[test]
    fn test_equality_family() {
        let pos = JsValue::Number(0.0);
        let neg = JsValue::Number(-0.0);
        let nan = JsValue::Number(f64::NAN);
        assert!(pos.strict_equals(&neg));
        assert!(!pos.same_value(&neg));
        assert!(pos.same_value_zero(&neg));
        assert!(!nan.strict_equals(&nan));
        assert!(nan.same_value(&nan));
        assert!(nan.same_value_zero(&nan));
    }

    #[test]
    fn test_utf16_view() {
        let s = JsString::from("a😀b");
        assert_eq!(s.utf16_len(), 4);
        assert_eq!(s.code_unit_at(0), Some(u16::from(b'a')));
        assert_eq!(s.char_at(3), Some(JsString::from("b")));
        assert_eq!(s.char_at(1), Some(JsString::from("\u{FFFD}")));
        assert_eq!(s.substring_utf16(1, 3), JsString::from("😀"));
        assert_eq!(JsString::from("hello").index_of_utf16("ll", 0), Some(2));
    }

    #[test]
    fn test_array_index() {
        assert_eq!(parse_array_index("0"), Some(0));
        assert_eq!(parse_array_index("42"), Some(42));
        assert_eq!(parse_array_index("01"), None);
        assert_eq!(parse_array_index("4294967295"), None);
        assert_eq!(parse_array_index("4294967294"), Some(4294967294));
        assert_eq!(parse_array_index("-1"), None);
    }
}
