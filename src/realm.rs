//! The Realm: global object, global environment, intrinsics and task queues

use std::collections::VecDeque;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::environment::{EnvRef, new_global_environment};
use crate::interpreter::ExecutionContext;
use crate::interpreter::builtins;
use crate::object::{
    JsFunction, JsObject, JsObjectRef, NativeFn, NativeFunction, ObjectKind, Property, PromiseReaction,
    PropertyKey,
};
use crate::value::{CheapClone, JsString, JsSymbol, JsValue};

// ═══════════════════════════════════════════════════════════════════════════════
// Well-known symbols
// ═══════════════════════════════════════════════════════════════════════════════

pub struct WellKnownSymbols {
    pub iterator: JsSymbol,
    pub async_iterator: JsSymbol,
    pub has_instance: JsSymbol,
    pub to_primitive: JsSymbol,
    pub to_string_tag: JsSymbol,
    pub unscopables: JsSymbol,
}

impl WellKnownSymbols {
    fn new(next_id: &mut u64) -> Self {
        let mut make = |desc: &str| {
            *next_id += 1;
            JsSymbol::new(*next_id, Some(JsString::from(desc)))
        };
        Self {
            iterator: make("Symbol.iterator"),
            async_iterator: make("Symbol.asyncIterator"),
            has_instance: make("Symbol.hasInstance"),
            to_primitive: make("Symbol.toPrimitive"),
            to_string_tag: make("Symbol.toStringTag"),
            unscopables: make("Symbol.unscopables"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Intrinsics
// ═══════════════════════════════════════════════════════════════════════════════

/// The Error constructors of the realm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    TypeError,
    ReferenceError,
    RangeError,
    SyntaxError,
    EvalError,
    URIError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::Error,
        ErrorKind::TypeError,
        ErrorKind::ReferenceError,
        ErrorKind::RangeError,
        ErrorKind::SyntaxError,
        ErrorKind::EvalError,
        ErrorKind::URIError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::EvalError => "EvalError",
            ErrorKind::URIError => "URIError",
        }
    }
}

/// Prototypes and constructors the engine refers to directly
pub struct Intrinsics {
    pub object_prototype: JsObjectRef,
    pub function_prototype: JsObjectRef,
    pub array_prototype: JsObjectRef,
    pub string_prototype: JsObjectRef,
    pub number_prototype: JsObjectRef,
    pub boolean_prototype: JsObjectRef,
    pub symbol_prototype: JsObjectRef,
    pub error_prototypes: [JsObjectRef; 7],
    pub map_prototype: JsObjectRef,
    pub set_prototype: JsObjectRef,
    pub promise_prototype: JsObjectRef,
    pub iterator_prototype: JsObjectRef,
    pub array_iterator_prototype: JsObjectRef,
    pub map_iterator_prototype: JsObjectRef,
    pub set_iterator_prototype: JsObjectRef,
    pub string_iterator_prototype: JsObjectRef,
    /// %GeneratorFunction.prototype%
    pub generator_function_prototype: JsObjectRef,
    /// %GeneratorFunction.prototype.prototype%
    pub generator_prototype: JsObjectRef,
    /// %Promise%, filled in when the Promise builtin is installed
    pub promise_constructor: Option<JsObjectRef>,
}

impl Intrinsics {
    fn new() -> Self {
        let object_prototype = JsObject::ordinary(None).into_ref();
        let ordinary = || JsObject::ordinary(Some(object_prototype.cheap_clone())).into_ref();

        // Function.prototype is itself callable and returns undefined
        let function_prototype = JsObject::new(
            ObjectKind::Function(JsFunction::Native(NativeFunction {
                name: JsString::from(""),
                func: builtins::function::function_prototype_call,
                arity: 0,
                constructor: false,
            })),
            Some(object_prototype.cheap_clone()),
        )
        .into_ref();

        let array_prototype = JsObject::new(
            ObjectKind::Array(crate::object::ArrayState {
                length: 0,
                length_writable: true,
            }),
            Some(object_prototype.cheap_clone()),
        )
        .into_ref();

        let boxed = |kind: ObjectKind| JsObject::new(kind, Some(object_prototype.cheap_clone())).into_ref();
        let string_prototype = boxed(ObjectKind::String(JsString::from("")));
        let number_prototype = boxed(ObjectKind::Number(0.0));
        let boolean_prototype = boxed(ObjectKind::Boolean(false));

        let error_prototype = ordinary();
        let error_prototypes = ErrorKind::ALL.map(|kind| {
            if kind == ErrorKind::Error {
                error_prototype.cheap_clone()
            } else {
                JsObject::ordinary(Some(error_prototype.cheap_clone())).into_ref()
            }
        });

        let iterator_prototype = ordinary();
        let inherits_iterator = || JsObject::ordinary(Some(iterator_prototype.cheap_clone())).into_ref();
        let array_iterator_prototype = inherits_iterator();
        let map_iterator_prototype = inherits_iterator();
        let set_iterator_prototype = inherits_iterator();
        let string_iterator_prototype = inherits_iterator();
        let generator_prototype = inherits_iterator();

        let generator_function_prototype =
            JsObject::ordinary(Some(function_prototype.cheap_clone())).into_ref();

        Self {
            symbol_prototype: ordinary(),
            map_prototype: ordinary(),
            set_prototype: ordinary(),
            promise_prototype: ordinary(),
            object_prototype: object_prototype.cheap_clone(),
            function_prototype,
            array_prototype,
            string_prototype,
            number_prototype,
            boolean_prototype,
            error_prototypes,
            iterator_prototype,
            array_iterator_prototype,
            map_iterator_prototype,
            set_iterator_prototype,
            string_iterator_prototype,
            generator_function_prototype,
            generator_prototype,
            promise_constructor: None,
        }
    }

    pub fn error_prototype(&self, kind: ErrorKind) -> JsObjectRef {
        let index = ErrorKind::ALL.iter().position(|k| *k == kind).unwrap_or(0);
        self.error_prototypes
            .get(index)
            .unwrap_or(&self.object_prototype)
            .cheap_clone()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tasks and jobs
// ═══════════════════════════════════════════════════════════════════════════════

/// A microtask
pub enum Job {
    /// PromiseReactionJob
    Reaction {
        reaction: PromiseReaction,
        argument: JsValue,
    },
    /// PromiseResolveThenableJob
    ResolveThenable {
        promise: JsObjectRef,
        thenable: JsValue,
        then: JsValue,
    },
}

/// A macrotask
pub enum Task {
    /// A prepared script or module graph evaluation
    Evaluate(Box<ExecutionContext>),
    /// A function call queued by the host
    Call {
        function: JsValue,
        args: Vec<JsValue>,
    },
}

/// Promises rejected while nothing was listening
#[derive(Default)]
pub struct RejectionTracker {
    pending: Vec<JsObjectRef>,
}

impl RejectionTracker {
    pub fn rejected_without_handler(&mut self, promise: &JsObjectRef) {
        self.pending.push(promise.cheap_clone());
    }

    pub fn handler_added(&mut self, promise: &JsObjectRef) {
        self.pending.retain(|p| !Rc::ptr_eq(p, promise));
    }

    pub fn take(&mut self) -> Vec<JsObjectRef> {
        std::mem::take(&mut self.pending)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Realm
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Realm {
    pub global_object: JsObjectRef,
    pub global_env: EnvRef,
    pub intrinsics: Intrinsics,
    pub symbols: WellKnownSymbols,
    symbol_registry: FxHashMap<JsString, JsSymbol>,
    next_symbol_id: u64,
    pub macrotasks: VecDeque<Task>,
    pub jobs: VecDeque<Job>,
    pub rejections: RejectionTracker,
}

impl Realm {
    /// Create a realm with the baseline library installed
    pub fn new() -> Self {
        let mut next_symbol_id = 0;
        let symbols = WellKnownSymbols::new(&mut next_symbol_id);
        let intrinsics = Intrinsics::new();
        let global_object = JsObject::ordinary(Some(intrinsics.object_prototype.cheap_clone())).into_ref();
        let global_env = new_global_environment(global_object.cheap_clone());

        let mut realm = Self {
            global_object,
            global_env,
            intrinsics,
            symbols,
            symbol_registry: FxHashMap::default(),
            next_symbol_id,
            macrotasks: VecDeque::new(),
            jobs: VecDeque::new(),
            rejections: RejectionTracker::default(),
        };
        builtins::install(&mut realm);
        realm
    }

    pub fn new_symbol(&mut self, description: Option<JsString>) -> JsSymbol {
        self.next_symbol_id += 1;
        JsSymbol::new(self.next_symbol_id, description)
    }

    /// Symbol.for
    pub fn registered_symbol(&mut self, key: JsString) -> JsSymbol {
        if let Some(sym) = self.symbol_registry.get(&key) {
            return sym.cheap_clone();
        }
        let sym = self.new_symbol(Some(key.cheap_clone()));
        self.symbol_registry.insert(key, sym.cheap_clone());
        sym
    }

    /// Symbol.keyFor
    pub fn symbol_key(&self, sym: &JsSymbol) -> Option<JsString> {
        self.symbol_registry
            .iter()
            .find(|(_, s)| *s == sym)
            .map(|(k, _)| k.cheap_clone())
    }

    // ───────────────────────────────────────────────────────────────────────
    // Builtin construction helpers
    // ───────────────────────────────────────────────────────────────────────

    /// A builtin function object with `name` and `length`
    pub fn native_function(&self, name: &str, func: NativeFn, arity: u32) -> JsObjectRef {
        self.make_native(name, func, arity, false)
    }

    fn make_native(&self, name: &str, func: NativeFn, arity: u32, constructor: bool) -> JsObjectRef {
        let name = JsString::from(name);
        let mut obj = JsObject::new(
            ObjectKind::Function(JsFunction::Native(NativeFunction {
                name: name.cheap_clone(),
                func,
                arity,
                constructor,
            })),
            Some(self.intrinsics.function_prototype.cheap_clone()),
        );
        define_function_metadata(&mut obj, name, arity);
        obj.into_ref()
    }

    /// A builtin constructor linked with its prototype object
    pub fn native_constructor(
        &self,
        name: &str,
        func: NativeFn,
        arity: u32,
        prototype: &JsObjectRef,
    ) -> JsObjectRef {
        let ctor = self.make_native(name, func, arity, true);
        ctor.borrow_mut().insert_property(
            PropertyKey::from("prototype"),
            Property::frozen(JsValue::Object(prototype.cheap_clone())),
        );
        prototype
            .borrow_mut()
            .set_hidden("constructor", JsValue::Object(ctor.cheap_clone()));
        ctor
    }

    pub fn register_method(&self, obj: &JsObjectRef, name: &str, func: NativeFn, arity: u32) {
        let f = self.native_function(name, func, arity);
        obj.borrow_mut().set_hidden(name, JsValue::Object(f));
    }

    /// A method keyed by a symbol, named `[description]`
    pub fn register_symbol_method(&self, obj: &JsObjectRef, sym: &JsSymbol, func: NativeFn, arity: u32) {
        let key = PropertyKey::Symbol(sym.cheap_clone());
        let f = self.native_function(key.function_name().as_str(), func, arity);
        obj.borrow_mut().set_hidden(key, JsValue::Object(f));
    }

    pub fn register_getter(&self, obj: &JsObjectRef, name: &str, func: NativeFn) {
        let getter = self.native_function(&format!("get {}", name), func, 0);
        obj.borrow_mut().insert_property(
            PropertyKey::from(name),
            Property::accessor(Some(getter), None, false, true),
        );
    }

    pub fn define_global(&self, name: &str, value: JsValue) {
        self.global_object.borrow_mut().set_hidden(name, value);
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

/// `length` then `name`, both non-writable, non-enumerable, configurable
pub fn define_function_metadata(obj: &mut JsObject, name: JsString, length: u32) {
    obj.insert_property(
        PropertyKey::from("length"),
        Property::with_attributes(JsValue::Number(f64::from(length)), false, false, true),
    );
    obj.insert_property(
        PropertyKey::from("name"),
        Property::with_attributes(JsValue::String(name), false, false, true),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::has_property;

    #[test]
    fn test_symbol_registry_reuses_symbols() {
        let mut realm = Realm::new();
        let a = realm.registered_symbol(JsString::from("app"));
        let b = realm.registered_symbol(JsString::from("app"));
        assert_eq!(a, b);
        assert_eq!(realm.symbol_key(&a), Some(JsString::from("app")));
        let fresh = realm.new_symbol(Some(JsString::from("app")));
        assert_ne!(a, fresh);
        assert_eq!(realm.symbol_key(&fresh), None);
    }

    #[test]
    fn test_baseline_globals_installed() {
        let realm = Realm::new();
        for name in ["Object", "Array", "Promise", "Map", "Set", "Symbol", "TypeError", "console"] {
            assert!(
                has_property(&realm.global_object, &PropertyKey::from(name)),
                "missing global {}",
                name
            );
        }
    }

    #[test]
    fn test_error_prototype_chain() {
        let realm = Realm::new();
        let type_error = realm.intrinsics.error_prototype(ErrorKind::TypeError);
        let base = realm.intrinsics.error_prototype(ErrorKind::Error);
        let parent = type_error.borrow().prototype.clone();
        assert!(parent.is_some_and(|p| Rc::ptr_eq(&p, &base)));
    }
}
