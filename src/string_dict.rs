//! Interning for identifier names, property keys and literals
//!
//! The lexer, the parser and the JSON bridge all intern through the same
//! dictionary owned by the [`Interpreter`](crate::Interpreter), so a name
//! that appears in source and in a builtin shares one allocation.

use rustc_hash::FxHashMap;

use crate::value::{CheapClone, JsString};

/// Names the evaluator and the builtins look up on nearly every run
const PRELOADED: &[&str] = &[
    "length",
    "prototype",
    "constructor",
    "__proto__",
    "name",
    "message",
    "cause",
    "value",
    "writable",
    "enumerable",
    "configurable",
    "get",
    "set",
    "toString",
    "valueOf",
    "next",
    "done",
    "return",
    "throw",
    "then",
    "arguments",
    "default",
    "undefined",
    "callee",
];

#[derive(Default)]
pub struct StringDict {
    interned: FxHashMap<Box<str>, JsString>,
}

impl StringDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dictionary that already holds the runtime's own property names
    pub fn with_common_strings() -> Self {
        let mut dict = Self::new();
        PRELOADED.iter().for_each(|name| {
            dict.get_or_insert(name);
        });
        dict
    }

    /// The shared instance of `text`, interning it on first sight
    pub fn get_or_insert(&mut self, text: &str) -> JsString {
        match self.interned.get(text) {
            Some(shared) => shared.cheap_clone(),
            None => {
                let shared = JsString::from(text);
                self.interned.insert(Box::from(text), shared.cheap_clone());
                shared
            }
        }
    }

    pub fn get(&self, text: &str) -> Option<JsString> {
        self.interned.get(text).map(CheapClone::cheap_clone)
    }

    pub fn len(&self) -> usize {
        self.interned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interned.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_text_shares_allocation() {
        let mut dict = StringDict::new();
        let first = dict.get_or_insert("hello");
        let second = dict.get_or_insert("hello");
        assert_eq!(first, second);
        assert!(std::ptr::eq(first.as_str(), second.as_str()));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn test_preloaded_names() {
        let dict = StringDict::with_common_strings();
        assert!(dict.get("prototype").is_some());
        assert!(dict.get("cause").is_some());
        assert!(dict.get("not_preloaded").is_none());
        assert_eq!(dict.len(), PRELOADED.len());
    }
}
