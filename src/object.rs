//! Object model: property keys, property descriptors and object kinds
//!
//! Every object lives behind a shared handle ([`JsObjectRef`]). The methods on
//! [`JsObject`] implement the internal methods that never call back into
//! script code ([[GetOwnProperty]], [[DefineOwnProperty]], [[Delete]],
//! [[OwnPropertyKeys]]). Operations that may run getters, setters or other
//! user code ([[Get]], [[Set]]) live on the interpreter.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};

use crate::ast::FunctionNode;
use crate::environment::EnvRef;
use crate::error::JsError;
use crate::interpreter::{ExecutionContext, Interpreter};
use crate::value::{CheapClone, JsString, JsSymbol, JsValue, parse_array_index};

/// Shared handle to an object
pub type JsObjectRef = Rc<RefCell<JsObject>>;

/// Upper bound on prototype chain walks
pub const MAX_PROTOTYPE_DEPTH: usize = 10_000;

/// Chains shorter than this are walked without a visited set
const VISITED_SET_THRESHOLD: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════════
// Property Keys
// ═══════════════════════════════════════════════════════════════════════════════

/// Property key: canonical array indices are stored as `Index`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(JsString),
    Index(u32),
    Symbol(JsSymbol),
}

impl CheapClone for PropertyKey {}

impl PropertyKey {
    pub fn as_index(&self) -> Option<u32> {
        match self {
            PropertyKey::Index(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, PropertyKey::Symbol(_))
    }

    /// The key as a JS value (strings for indices)
    pub fn to_value(&self) -> JsValue {
        match self {
            PropertyKey::String(s) => JsValue::String(s.cheap_clone()),
            PropertyKey::Index(i) => JsValue::String(JsString::from(i.to_string())),
            PropertyKey::Symbol(sym) => JsValue::Symbol(sym.cheap_clone()),
        }
    }

    /// Name a function gets when defined under this key (SetFunctionName)
    pub fn function_name(&self) -> JsString {
        match self {
            PropertyKey::String(s) => s.cheap_clone(),
            PropertyKey::Index(i) => JsString::from(i.to_string()),
            PropertyKey::Symbol(sym) => match &sym.description {
                Some(desc) => JsString::from(format!("[{}]", desc)),
                None => JsString::from(""),
            },
        }
    }

    pub fn eq_str(&self, s: &str) -> bool {
        matches!(self, PropertyKey::String(k) if k == s)
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        match parse_array_index(s) {
            Some(i) => PropertyKey::Index(i),
            None => PropertyKey::String(JsString::from(s)),
        }
    }
}

impl From<JsString> for PropertyKey {
    fn from(s: JsString) -> Self {
        match parse_array_index(s.as_str()) {
            Some(i) => PropertyKey::Index(i),
            None => PropertyKey::String(s),
        }
    }
}

impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        // 2^32 - 1 is not an array index
        if i == u32::MAX {
            PropertyKey::String(JsString::from(i.to_string()))
        } else {
            PropertyKey::Index(i)
        }
    }
}

impl From<JsSymbol> for PropertyKey {
    fn from(sym: JsSymbol) -> Self {
        PropertyKey::Symbol(sym)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{}", s),
            PropertyKey::Index(i) => write!(f, "{}", i),
            PropertyKey::Symbol(sym) => write!(f, "{}", sym.descriptive_string()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Properties
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub enum PropertySlot {
    Data { value: JsValue, writable: bool },
    Accessor {
        get: Option<JsObjectRef>,
        set: Option<JsObjectRef>,
    },
}

/// A complete property record as stored on an object
#[derive(Clone, Debug)]
pub struct Property {
    pub slot: PropertySlot,
    pub enumerable: bool,
    pub configurable: bool,
}

impl Property {
    /// Writable, enumerable, configurable data property
    pub fn data(value: JsValue) -> Self {
        Self::with_attributes(value, true, true, true)
    }

    /// Writable, configurable but non-enumerable (builtin methods)
    pub fn hidden(value: JsValue) -> Self {
        Self::with_attributes(value, true, false, true)
    }

    /// Non-writable, non-enumerable, non-configurable
    pub fn frozen(value: JsValue) -> Self {
        Self::with_attributes(value, false, false, false)
    }

    pub fn with_attributes(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            slot: PropertySlot::Data { value, writable },
            enumerable,
            configurable,
        }
    }

    pub fn accessor(
        get: Option<JsObjectRef>,
        set: Option<JsObjectRef>,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        Self {
            slot: PropertySlot::Accessor { get, set },
            enumerable,
            configurable,
        }
    }

    pub fn value(&self) -> Option<&JsValue> {
        match &self.slot {
            PropertySlot::Data { value, .. } => Some(value),
            PropertySlot::Accessor { .. } => None,
        }
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self.slot, PropertySlot::Accessor { .. })
    }

    pub fn is_writable(&self) -> bool {
        matches!(self.slot, PropertySlot::Data { writable: true, .. })
    }
}

/// A partial descriptor: the input of [[DefineOwnProperty]]
#[derive(Clone, Debug, Default)]
pub struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    /// Getter function or `undefined`
    pub get: Option<JsValue>,
    /// Setter function or `undefined`
    pub set: Option<JsValue>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    /// `{ value, writable: true, enumerable: true, configurable: true }`
    pub fn data(value: JsValue) -> Self {
        Self {
            value: Some(value),
            writable: Some(true),
            enumerable: Some(true),
            configurable: Some(true),
        ..Self::default()
        }
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_accessor_descriptor() && !self.is_data_descriptor()
    }

    fn is_empty(&self) -> bool {
        self.is_generic_descriptor() && self.enumerable.is_none() && self.configurable.is_none()
    }
}

impl From<&Property> for PropertyDescriptor {
    fn from(prop: &Property) -> Self {
        let mut desc = PropertyDescriptor {
            enumerable: Some(prop.enumerable),
            configurable: Some(prop.configurable),
            ..PropertyDescriptor::default()
        };
        match &prop.slot {
            PropertySlot::Data { value, writable } => {
                desc.value = Some(value.cheap_clone());
                desc.writable = Some(*writable);
            }
            PropertySlot::Accessor { get, set } => {
                desc.get = Some(accessor_value(get));
                desc.set = Some(accessor_value(set));
            }
        }
        desc
    }
}

fn accessor_value(f: &Option<JsObjectRef>) -> JsValue {
    match f {
        Some(obj) => JsValue::Object(obj.cheap_clone()),
        None => JsValue::Undefined,
    }
}

fn accessor_object(v: &JsValue) -> Option<JsObjectRef> {
    match v {
        JsValue::Object(obj) => Some(obj.cheap_clone()),
        _ => None,
    }
}

fn same_accessor(a: &Option<JsObjectRef>, b: &Option<JsObjectRef>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// ValidateAndApplyPropertyDescriptor. `Ok(Some(p))` stores `p`, `Ok(None)`
/// means nothing changes, `Err(())` means the definition is rejected.
fn validate_and_apply(
    current: Option<&Property>,
    extensible: bool,
    desc: &PropertyDescriptor,
) -> Result<Option<Property>, ()> {
    let Some(current) = current else {
        if !extensible {
            return Err(());
        }
        let enumerable = desc.enumerable.unwrap_or(false);
        let configurable = desc.configurable.unwrap_or(false);
        let prop = if desc.is_accessor_descriptor() {
            Property::accessor(
                desc.get.as_ref().and_then(accessor_object),
                desc.set.as_ref().and_then(accessor_object),
                enumerable,
                configurable,
            )
        } else {
            Property::with_attributes(
                desc.value.clone().unwrap_or_default(),
                desc.writable.unwrap_or(false),
                enumerable,
                configurable,
            )
        };
        return Ok(Some(prop));
    };

    if desc.is_empty() {
        return Ok(None);
    }

    if !current.configurable {
        if desc.configurable == Some(true) {
            return Err(());
        }
        if desc.enumerable.is_some_and(|e| e != current.enumerable) {
            return Err(());
        }
        if !desc.is_generic_descriptor() && desc.is_accessor_descriptor() != current.is_accessor() {
            return Err(());
        }
        match &current.slot {
            PropertySlot::Accessor { get, set } => {
                if let Some(new_get) = &desc.get
                    && !same_accessor(&accessor_object(new_get), get)
                {
                    return Err(());
                }
                if let Some(new_set) = &desc.set
                    && !same_accessor(&accessor_object(new_set), set)
                {
                    return Err(());
                }
            }
            PropertySlot::Data { value, writable } => {
                if !*writable {
                    if desc.writable == Some(true) {
                        return Err(());
                    }
                    if let Some(new_value) = &desc.value
                        && !new_value.same_value(value)
                    {
                        return Err(());
                    }
                }
            }
        }
    }

    let enumerable = desc.enumerable.unwrap_or(current.enumerable);
    let configurable = desc.configurable.unwrap_or(current.configurable);
    let slot = match &current.slot {
        PropertySlot::Data { .. } if desc.is_accessor_descriptor() => PropertySlot::Accessor {
            get: desc.get.as_ref().and_then(accessor_object),
            set: desc.set.as_ref().and_then(accessor_object),
        },
        PropertySlot::Accessor { .. } if desc.is_data_descriptor() => PropertySlot::Data {
            value: desc.value.clone().unwrap_or_default(),
            writable: desc.writable.unwrap_or(false),
        },
        PropertySlot::Data { value, writable } => PropertySlot::Data {
            value: desc.value.clone().unwrap_or_else(|| value.cheap_clone()),
            writable: desc.writable.unwrap_or(*writable),
        },
        PropertySlot::Accessor { get, set } => PropertySlot::Accessor {
            get: match &desc.get {
                Some(g) => accessor_object(g),
                None => get.clone(),
            },
            set: match &desc.set {
                Some(s) => accessor_object(s),
                None => set.clone(),
            },
        },
    };
    Ok(Some(Property {
        slot,
        enumerable,
        configurable,
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Functions
// ═══════════════════════════════════════════════════════════════════════════════

/// Signature of builtin functions
pub type NativeFn = fn(&mut Interpreter, JsValue, &[JsValue]) -> Result<JsValue, JsError>;

/// Closure-backed function supplied by the host or built at runtime
pub type HostFn = Rc<dyn Fn(&mut Interpreter, JsValue, &[JsValue]) -> Result<JsValue, JsError>>;

/// How `this` is bound when an interpreted function is called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThisMode {
    /// Arrow functions use the `this` of their defining scope
    Lexical,
    /// `this` is passed through unchanged
    Strict,
    /// `undefined`/`null` become the global object, primitives are boxed
    Global,
}

#[derive(Clone)]
pub struct InterpretedFunction {
    pub node: Rc<FunctionNode>,
    pub env: EnvRef,
    pub this_mode: ThisMode,
    pub constructor: bool,
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: JsString,
    pub func: NativeFn,
    pub arity: u32,
    pub constructor: bool,
}

#[derive(Clone)]
pub struct HostFunction {
    pub name: JsString,
    pub func: HostFn,
}

#[derive(Clone)]
pub struct BoundFunction {
    pub target: JsObjectRef,
    pub this: JsValue,
    pub args: Vec<JsValue>,
}

/// The resolve/reject pair handed to a promise executor
#[derive(Clone)]
pub struct PromiseResolver {
    pub promise: JsObjectRef,
    pub reject: bool,
    /// Shared between the two functions of one pair
    pub already_resolved: Rc<Cell<bool>>,
}

#[derive(Clone)]
pub enum JsFunction {
    Interpreted(InterpretedFunction),
    Native(NativeFunction),
    Host(HostFunction),
    Bound(BoundFunction),
    PromiseResolver(PromiseResolver),
}

impl JsFunction {
    pub fn debug_name(&self) -> String {
        match self {
            JsFunction::Interpreted(f) => f
                .node
                .id
                .as_ref()
                .map(|id| id.name.to_string())
                .unwrap_or_else(|| "<anonymous>".to_string()),
            JsFunction::Native(f) => f.name.to_string(),
            JsFunction::Host(f) => f.name.to_string(),
            JsFunction::Bound(f) => match f.target.try_borrow() {
                Ok(target) => match &target.kind {
                    ObjectKind::Function(inner) => format!("bound {}", inner.debug_name()),
                    _ => "bound".to_string(),
                },
                Err(_) => "bound".to_string(),
            },
            JsFunction::PromiseResolver(r) => {
                if r.reject {
                    "reject".to_string()
                } else {
                    "resolve".to_string()
                }
            }
        }
    }

    pub fn is_constructor(&self) -> bool {
        match self {
            JsFunction::Interpreted(f) => f.constructor,
            JsFunction::Native(f) => f.constructor,
            JsFunction::Bound(f) => f.target.borrow().is_constructor(),
            JsFunction::Host(_) | JsFunction::PromiseResolver(_) => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Map / Set storage
// ═══════════════════════════════════════════════════════════════════════════════

/// Hashable SameValueZero identity of a value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TableKey {
    Undefined,
    Null,
    Boolean(bool),
    Number(u64),
    String(JsString),
    Symbol(u64),
    Object(usize),
}

impl TableKey {
    fn of(value: &JsValue) -> Self {
        match value {
            JsValue::Undefined => TableKey::Undefined,
            JsValue::Null => TableKey::Null,
            JsValue::Boolean(b) => TableKey::Boolean(*b),
            JsValue::Number(n) => {
                // +0 and -0 are one key, and every NaN is the same key
                let canonical = if *n == 0.0 {
                    0.0
                } else if n.is_nan() {
                    f64::NAN
                } else {
                    *n
                };
                TableKey::Number(canonical.to_bits())
            }
            JsValue::String(s) => TableKey::String(s.cheap_clone()),
            JsValue::Symbol(sym) => TableKey::Symbol(sym.id()),
            JsValue::Object(obj) => TableKey::Object(Rc::as_ptr(obj) as *const () as usize),
        }
    }
}

/// Insertion-ordered SameValueZero table backing Map and Set.
///
/// Deleted entries leave a hole so that live iterators keep their position;
/// entries added during iteration are visited.
#[derive(Default)]
pub struct OrderedTable {
    entries: Vec<Option<(JsValue, JsValue)>>,
    index: FxHashMap<TableKey, usize>,
}

impl OrderedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn get(&self, key: &JsValue) -> Option<&JsValue> {
        let slot = *self.index.get(&TableKey::of(key))?;
        self.entries.get(slot)?.as_ref().map(|(_, v)| v)
    }

    pub fn has(&self, key: &JsValue) -> bool {
        self.index.contains_key(&TableKey::of(key))
    }

    pub fn insert(&mut self, key: JsValue, value: JsValue) {
        // -0 is normalized to +0 on insertion
        let key = match key {
            JsValue::Number(n) if n == 0.0 => JsValue::Number(0.0),
            other => other,
        };
        let table_key = TableKey::of(&key);
        if let Some(&slot) = self.index.get(&table_key)
            && let Some(Some(entry)) = self.entries.get_mut(slot)
        {
            entry.1 = value;
            return;
        }
        self.index.insert(table_key, self.entries.len());
        self.entries.push(Some((key, value)));
    }

    pub fn remove(&mut self, key: &JsValue) -> bool {
        match self.index.remove(&TableKey::of(key)) {
            Some(slot) => {
                if let Some(entry) = self.entries.get_mut(slot) {
                    *entry = None;
                }
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.index.clear();
        for entry in &mut self.entries {
            *entry = None;
        }
    }

    /// The first live entry at or after `position`, with its slot
    pub fn next_entry(&self, position: usize) -> Option<(usize, JsValue, JsValue)> {
        self.entries
            .iter()
            .enumerate()
            .skip(position)
            .find_map(|(i, entry)| {
                entry
                    .as_ref()
                    .map(|(k, v)| (i, k.cheap_clone(), v.cheap_clone()))
            })
    }

    /// Snapshot of the live entries in insertion order
    pub fn entries(&self) -> Vec<(JsValue, JsValue)> {
        self.entries
            .iter()
            .flatten()
            .map(|(k, v)| (k.cheap_clone(), v.cheap_clone()))
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Promises
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub enum PromiseStatus {
    Pending,
    Fulfilled(JsValue),
    Rejected(JsValue),
}

/// A suspended execution context waiting for a promise to settle
pub type ContextSlot = Rc<RefCell<Option<Box<ExecutionContext>>>>;

/// PromiseCapability record
#[derive(Clone)]
pub struct PromiseCapability {
    pub promise: JsValue,
    pub resolve: JsValue,
    pub reject: JsValue,
}

#[derive(Clone)]
pub enum ReactionHandler {
    /// A script-supplied callback
    Callable(JsValue),
    /// `then` was given no callable: pass the value through (or rethrow)
    Default,
    /// Resume an awaiting async function or module body
    Resume(ContextSlot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Fulfill,
    Reject,
}

/// PromiseReaction record
#[derive(Clone)]
pub struct PromiseReaction {
    pub capability: Option<PromiseCapability>,
    pub kind: ReactionKind,
    pub handler: ReactionHandler,
}

pub struct PromiseState {
    pub status: PromiseStatus,
    pub fulfill_reactions: Vec<PromiseReaction>,
    pub reject_reactions: Vec<PromiseReaction>,
    /// A handler was attached at some point ([[PromiseIsHandled]])
    pub handled: bool,
}

impl PromiseState {
    pub fn new() -> Self {
        Self {
            status: PromiseStatus::Pending,
            fulfill_reactions: Vec::new(),
            reject_reactions: Vec::new(),
            handled: false,
        }
    }

    pub fn status_name(&self) -> &'static str {
        match self.status {
            PromiseStatus::Pending => "<pending>",
            PromiseStatus::Fulfilled(_) => "<fulfilled>",
            PromiseStatus::Rejected(_) => "<rejected>",
        }
    }
}

impl Default for PromiseState {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Generators and iterators
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorStatus {
    SuspendedStart,
    SuspendedYield,
    Executing,
    Completed,
}

pub struct GeneratorState {
    pub status: GeneratorStatus,
    /// The suspended body; taken out while the generator runs
    pub context: Option<Box<ExecutionContext>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationKind {
    Keys,
    Values,
    Entries,
}

/// %ArrayIteratorPrototype% instances
pub struct ArrayIteratorState {
    pub target: JsValue,
    pub index: u32,
    pub kind: IterationKind,
    pub done: bool,
}

/// %MapIteratorPrototype% and %SetIteratorPrototype% instances
pub struct TableIteratorState {
    pub table: JsObjectRef,
    pub position: usize,
    pub kind: IterationKind,
    pub done: bool,
}

/// %StringIteratorPrototype% instances (iterate code points)
pub struct StringIteratorState {
    pub text: JsString,
    /// Byte offset into the UTF-8 text
    pub offset: usize,
    pub done: bool,
}

/// Module namespace exotic object: export name to live binding
pub struct NamespaceState {
    pub exports: IndexMap<JsString, (EnvRef, JsString), FxBuildHasher>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Objects
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
pub struct ArrayState {
    pub length: u32,
    pub length_writable: bool,
}

/// Exotic behaviour and internal slots of an object
pub enum ObjectKind {
    Ordinary,
    Array(ArrayState),
    Function(JsFunction),
    Boolean(bool),
    Number(f64),
    String(JsString),
    Symbol(JsSymbol),
    Error,
    Arguments,
    Map(OrderedTable),
    Set(OrderedTable),
    Promise(PromiseState),
    Generator(GeneratorState),
    ArrayIterator(ArrayIteratorState),
    MapIterator(TableIteratorState),
    SetIterator(TableIteratorState),
    StringIterator(StringIteratorState),
    ModuleNamespace(NamespaceState),
}

pub struct JsObject {
    pub kind: ObjectKind,
    pub prototype: Option<JsObjectRef>,
    pub extensible: bool,
    properties: IndexMap<PropertyKey, Property, FxBuildHasher>,
}

// Objects may be cyclic, so Debug prints a summary only
impl fmt::Debug for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[object {}] ({} properties)", self.builtin_tag(), self.properties.len())
    }
}

impl JsObject {
    pub fn new(kind: ObjectKind, prototype: Option<JsObjectRef>) -> Self {
        Self {
            kind,
            prototype,
            extensible: true,
            properties: IndexMap::default(),
        }
    }

    pub fn ordinary(prototype: Option<JsObjectRef>) -> Self {
        Self::new(ObjectKind::Ordinary, prototype)
    }

    pub fn into_ref(self) -> JsObjectRef {
        Rc::new(RefCell::new(self))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, ObjectKind::Function(_))
    }

    pub fn is_constructor(&self) -> bool {
        match &self.kind {
            ObjectKind::Function(f) => f.is_constructor(),
            _ => false,
        }
    }

    pub fn function(&self) -> Option<&JsFunction> {
        match &self.kind {
            ObjectKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Array(_))
    }

    /// Length of an array object (0 for anything else)
    pub fn array_length(&self) -> u32 {
        match &self.kind {
            ObjectKind::Array(state) => state.length,
            _ => 0,
        }
    }

    /// Builtin tag used by Object.prototype.toString
    pub fn builtin_tag(&self) -> &'static str {
        match &self.kind {
            ObjectKind::Array(_) => "Array",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Error => "Error",
            ObjectKind::Boolean(_) => "Boolean",
            ObjectKind::Number(_) => "Number",
            ObjectKind::String(_) => "String",
            ObjectKind::Arguments => "Arguments",
            _ => "Object",
        }
    }

    // ───────────────────────────────────────────────────────────────────────
    // [[GetOwnProperty]]
    // ───────────────────────────────────────────────────────────────────────

    pub fn get_own_property(&self, key: &PropertyKey) -> Option<Property> {
        match (&self.kind, key) {
            (ObjectKind::Array(state), PropertyKey::String(s)) if s == "length" => {
                Some(Property::with_attributes(
                    JsValue::Number(f64::from(state.length)),
                    state.length_writable,
                    false,
                    false,
                ))
            }
            (ObjectKind::String(text), PropertyKey::String(s)) if s == "length" => Some(
                Property::frozen(JsValue::Number(text.utf16_len() as f64)),
            ),
            (ObjectKind::String(text), PropertyKey::Index(i)) if (*i as usize) < text.utf16_len() => {
                let ch = text.char_at(*i as usize)?;
                Some(Property::with_attributes(JsValue::String(ch), false, true, false))
            }
            (ObjectKind::ModuleNamespace(ns), PropertyKey::String(name)) => {
                let (env, binding) = ns.exports.get(name)?;
                let value = env
                    .borrow()
                    .declarative()
                    .and_then(|decl| decl.peek(binding))
                    .unwrap_or_default();
                Some(Property::with_attributes(value, true, true, false))
            }
            _ => self.properties.get(key).cloned(),
        }
    }

    pub fn has_own_property(&self, key: &PropertyKey) -> bool {
        match (&self.kind, key) {
            (ObjectKind::Array(_), PropertyKey::String(s)) if s == "length" => true,
            (ObjectKind::String(_), _) | (ObjectKind::ModuleNamespace(_), _) => {
                self.get_own_property(key).is_some()
            }
            _ => self.properties.contains_key(key),
        }
    }

    /// Own data value without running accessors
    pub fn get_own_data(&self, key: &PropertyKey) -> Option<JsValue> {
        self.get_own_property(key)
            .and_then(|prop| prop.value().cloned())
    }

    // ───────────────────────────────────────────────────────────────────────
    // [[DefineOwnProperty]]
    // ───────────────────────────────────────────────────────────────────────

    pub fn define_own_property(&mut self, key: PropertyKey, desc: PropertyDescriptor) -> bool {
        match &self.kind {
            ObjectKind::Array(_) if key.eq_str("length") => self.array_set_length(&desc),
            ObjectKind::Array(state) => {
                let state = *state;
                if let PropertyKey::Index(i) = key {
                    if i >= state.length && !state.length_writable {
                        return false;
                    }
                    if !self.ordinary_define_own_property(key, &desc) {
                        return false;
                    }
                    if i >= state.length
                        && let ObjectKind::Array(state) = &mut self.kind
                    {
                        state.length = i + 1;
                    }
                    true
                } else {
                    self.ordinary_define_own_property(key, &desc)
                }
            }
            ObjectKind::String(_) | ObjectKind::ModuleNamespace(_)
                if !key.is_symbol() && self.synthesized(&key) =>
            {
                // Synthesized properties only accept compatible redefinitions
                let current = self.get_own_property(&key);
                validate_and_apply(current.as_ref(), false, &desc).is_ok_and(|change| {
                    change.is_none_or(|p| {
                        current.as_ref().is_some_and(|c| same_property(c, &p))
                    })
                })
            }
            ObjectKind::ModuleNamespace(_) if !key.is_symbol() => false,
            _ => self.ordinary_define_own_property(key, &desc),
        }
    }

    fn synthesized(&self, key: &PropertyKey) -> bool {
        match (&self.kind, key) {
            (ObjectKind::String(_), PropertyKey::String(s)) => s == "length",
            (ObjectKind::String(text), PropertyKey::Index(i)) => (*i as usize) < text.utf16_len(),
            (ObjectKind::ModuleNamespace(ns), PropertyKey::String(name)) => {
                ns.exports.contains_key(name)
            }
            _ => false,
        }
    }

    fn ordinary_define_own_property(&mut self, key: PropertyKey, desc: &PropertyDescriptor) -> bool {
        match validate_and_apply(self.properties.get(&key), self.extensible, desc) {
            Ok(Some(prop)) => {
                self.properties.insert(key, prop);
                true
            }
            Ok(None) => true,
            Err(()) => false,
        }
    }

    /// ArraySetLength. The caller has already validated that a new length
    /// value is a valid uint32.
    fn array_set_length(&mut self, desc: &PropertyDescriptor) -> bool {
        let ObjectKind::Array(state) = self.kind else {
            return false;
        };
        if desc.configurable == Some(true)
            || desc.enumerable == Some(true)
            || desc.is_accessor_descriptor()
        {
            return false;
        }

        let Some(new_value) = &desc.value else {
            if desc.writable == Some(true) && !state.length_writable {
                return false;
            }
            if desc.writable == Some(false) {
                self.set_length_state(state.length, false);
            }
            return true;
        };

        let Some(new_len) = new_value.as_number().and_then(exact_u32) else {
            return false;
        };
        let keep_writable = desc.writable != Some(false);

        if new_len >= state.length {
            if !state.length_writable && new_len != state.length {
                return false;
            }
            if !state.length_writable && desc.writable == Some(true) {
                return false;
            }
            self.set_length_state(new_len, state.length_writable && keep_writable);
            return true;
        }
        if !state.length_writable {
            return false;
        }

        // Delete elements from the end, stopping at a non-configurable one
        let mut doomed: Vec<u32> = self
            .properties
            .keys()
            .filter_map(PropertyKey::as_index)
            .filter(|i| *i >= new_len)
            .collect();
        doomed.sort_unstable_by(|a, b| b.cmp(a));
        for index in doomed {
            let key = PropertyKey::Index(index);
            if self.properties.get(&key).is_some_and(|p| !p.configurable) {
                self.set_length_state(index + 1, keep_writable);
                return false;
            }
            self.properties.shift_remove(&key);
        }
        self.set_length_state(new_len, keep_writable);
        true
    }

    fn set_length_state(&mut self, length: u32, writable: bool) {
        if let ObjectKind::Array(state) = &mut self.kind {
            state.length = length;
            state.length_writable = writable;
        }
    }

    // ───────────────────────────────────────────────────────────────────────
    // [[Delete]], [[OwnPropertyKeys]], [[PreventExtensions]]
    // ───────────────────────────────────────────────────────────────────────

    pub fn delete(&mut self, key: &PropertyKey) -> bool {
        if matches!(self.kind, ObjectKind::Array(_)) && key.eq_str("length") {
            return false;
        }
        if self.synthesized(key) {
            return false;
        }
        match self.properties.get(key) {
            Some(prop) if !prop.configurable => false,
            Some(_) => {
                self.properties.shift_remove(key);
                true
            }
            None => true,
        }
    }

    /// Integer indices ascending, then strings and symbols in insertion order
    pub fn own_property_keys(&self) -> Vec<PropertyKey> {
        let mut indices: Vec<u32> = self
            .properties
            .keys()
            .filter_map(PropertyKey::as_index)
            .collect();
        if let ObjectKind::String(text) = &self.kind {
            indices.extend(0..text.utf16_len() as u32);
        }
        indices.sort_unstable();
        indices.dedup();

        let mut keys: Vec<PropertyKey> = indices.into_iter().map(PropertyKey::Index).collect();
        match &self.kind {
            ObjectKind::Array(_) | ObjectKind::String(_) => {
                keys.push(PropertyKey::String(JsString::from("length")));
            }
            ObjectKind::ModuleNamespace(ns) => {
                keys.extend(ns.exports.keys().map(|k| PropertyKey::String(k.cheap_clone())));
            }
            _ => {}
        }
        keys.extend(
            self.properties
                .keys()
                .filter(|k| matches!(k, PropertyKey::String(_)))
                .cloned(),
        );
        keys.extend(self.properties.keys().filter(|k| k.is_symbol()).cloned());
        keys
    }

    pub fn prevent_extensions(&mut self) -> bool {
        self.extensible = false;
        true
    }

    // ───────────────────────────────────────────────────────────────────────
    // Raw access for freshly created objects
    // ───────────────────────────────────────────────────────────────────────

    /// Store a property without validation. Only for objects the engine is
    /// building and whose existing properties it controls.
    pub fn insert_property(&mut self, key: PropertyKey, prop: Property) {
        if let (ObjectKind::Array(state), PropertyKey::Index(i)) = (&mut self.kind, &key)
            && *i >= state.length
        {
            state.length = *i + 1;
        }
        self.properties.insert(key, prop);
    }

    /// Store a writable, enumerable, configurable data property
    pub fn set_data(&mut self, key: impl Into<PropertyKey>, value: JsValue) {
        self.insert_property(key.into(), Property::data(value));
    }

    /// Store a builtin method or other non-enumerable property
    pub fn set_hidden(&mut self, key: impl Into<PropertyKey>, value: JsValue) {
        self.insert_property(key.into(), Property::hidden(value));
    }

    /// Append to an array object
    pub fn push_element(&mut self, value: JsValue) {
        let index = self.array_length();
        self.insert_property(PropertyKey::Index(index), Property::data(value));
    }

    /// Grow an array without storing elements (holes)
    pub fn grow_array_length(&mut self, length: u32) {
        if let ObjectKind::Array(state) = &mut self.kind
            && length > state.length
        {
            state.length = length;
        }
    }
}

fn same_property(a: &Property, b: &Property) -> bool {
    if a.enumerable != b.enumerable || a.configurable != b.configurable {
        return false;
    }
    match (&a.slot, &b.slot) {
        (
            PropertySlot::Data { value: va, writable: wa },
            PropertySlot::Data { value: vb, writable: wb },
        ) => wa == wb && va.same_value(vb),
        (PropertySlot::Accessor { get: ga, set: sa }, PropertySlot::Accessor { get: gb, set: sb }) => {
            same_accessor(ga, gb) && same_accessor(sa, sb)
        }
        _ => false,
    }
}

/// `n` as a uint32 if it is exactly representable
pub fn exact_u32(n: f64) -> Option<u32> {
    if n >= 0.0 && n <= f64::from(u32::MAX) && n.fract() == 0.0 {
        Some(n as u32)
    } else {
        None
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Prototype chains
// ═══════════════════════════════════════════════════════════════════════════════

/// Walks an object and its prototypes. Stops at null, after
/// [`MAX_PROTOTYPE_DEPTH`] objects, or when an object repeats.
pub struct PrototypeChain {
    next: Option<JsObjectRef>,
    visited: FxHashSet<usize>,
    depth: usize,
}

impl Iterator for PrototypeChain {
    type Item = JsObjectRef;

    fn next(&mut self) -> Option<JsObjectRef> {
        let current = self.next.take()?;
        if self.depth >= MAX_PROTOTYPE_DEPTH {
            return None;
        }
        if self.depth >= VISITED_SET_THRESHOLD
            && !self.visited.insert(Rc::as_ptr(&current) as *const () as usize)
        {
            return None;
        }
        self.depth += 1;
        self.next = current.borrow().prototype.clone();
        Some(current)
    }
}

/// The object itself followed by its prototypes
pub fn prototype_chain(start: &JsObjectRef) -> PrototypeChain {
    PrototypeChain {
        next: Some(start.cheap_clone()),
        visited: FxHashSet::default(),
        depth: 0,
    }
}

/// Find a property on the object or its prototypes
pub fn find_property(obj: &JsObjectRef, key: &PropertyKey) -> Option<Property> {
    prototype_chain(obj).find_map(|o| o.borrow().get_own_property(key))
}

/// [[HasProperty]]
pub fn has_property(obj: &JsObjectRef, key: &PropertyKey) -> bool {
    prototype_chain(obj).any(|o| o.borrow().has_own_property(key))
}

/// OrdinarySetPrototypeOf: fails on non-extensible objects and on cycles
pub fn set_prototype_of(obj: &JsObjectRef, proto: Option<JsObjectRef>) -> bool {
    {
        let current = obj.borrow();
        let unchanged = match (&current.prototype, &proto) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        };
        if unchanged {
            return true;
        }
        if !current.extensible {
            return false;
        }
    }
    if let Some(proto) = &proto
        && prototype_chain(proto).any(|p| Rc::ptr_eq(&p, obj))
    {
        return false;
    }
    obj.borrow_mut().prototype = proto;
    true
}

/// OrdinaryIsPrototypeOf-style walk: is `proto` on the chain above `obj`?
pub fn is_prototype_of(proto: &JsObjectRef, obj: &JsObjectRef) -> bool {
    prototype_chain(obj).skip(1).any(|p| Rc::ptr_eq(&p, proto))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj() -> JsObjectRef {
        JsObject::ordinary(None).into_ref()
    }

    fn array() -> JsObjectRef {
        JsObject::new(
            ObjectKind::Array(ArrayState {
                length: 0,
                length_writable: true,
            }),
            None,
        )
        .into_ref()
    }

    #[test]
    fn test_property_key_canonicalization() {
        assert_eq!(PropertyKey::from("0"), PropertyKey::Index(0));
        assert_eq!(PropertyKey::from("10"), PropertyKey::Index(10));
        assert_eq!(PropertyKey::from("010"), PropertyKey::String(JsString::from("010")));
        assert_eq!(
            PropertyKey::from(u32::MAX),
            PropertyKey::String(JsString::from("4294967295"))
        );
    }

    #[test]
    fn test_frozen_property_cannot_change() {
        let o = obj();
        let mut o = o.borrow_mut();
        assert!(o.define_own_property(
            PropertyKey::from("x"),
            PropertyDescriptor {
                value: Some(JsValue::Number(1.0)),
                writable: Some(false),
                enumerable: Some(true),
                configurable: Some(false),
                ..PropertyDescriptor::default()
            }
        ));
        let change = PropertyDescriptor {
            value: Some(JsValue::Number(2.0)),
            ..PropertyDescriptor::default()
        };
        assert!(!o.define_own_property(PropertyKey::from("x"), change));
        // Same value is allowed
        let same = PropertyDescriptor {
            value: Some(JsValue::Number(1.0)),
            ..PropertyDescriptor::default()
        };
        assert!(o.define_own_property(PropertyKey::from("x"), same));
        let reconfigure = PropertyDescriptor {
            configurable: Some(true),
            ..PropertyDescriptor::default()
        };
        assert!(!o.define_own_property(PropertyKey::from("x"), reconfigure));
        assert_eq!(
            o.get_own_data(&PropertyKey::from("x")),
            Some(JsValue::Number(1.0))
        );
        assert!(!o.delete(&PropertyKey::from("x")));
    }

    #[test]
    fn test_accessor_identity_is_fixed_when_non_configurable() {
        let getter = obj();
        let other = obj();
        let o = obj();
        let mut o = o.borrow_mut();
        assert!(o.define_own_property(
            PropertyKey::from("a"),
            PropertyDescriptor {
                get: Some(JsValue::Object(getter.clone())),
                configurable: Some(false),
                ..PropertyDescriptor::default()
            }
        ));
        assert!(!o.define_own_property(
            PropertyKey::from("a"),
            PropertyDescriptor {
                get: Some(JsValue::Object(other)),
                ..PropertyDescriptor::default()
            }
        ));
        assert!(o.define_own_property(
            PropertyKey::from("a"),
            PropertyDescriptor {
                get: Some(JsValue::Object(getter)),
                ..PropertyDescriptor::default()
            }
        ));
        // Cannot switch kinds either
        assert!(!o.define_own_property(
            PropertyKey::from("a"),
            PropertyDescriptor {
                value: Some(JsValue::Null),
                ..PropertyDescriptor::default()
            }
        ));
    }

    #[test]
    fn test_non_extensible_rejects_new_properties() {
        let o = obj();
        let mut o = o.borrow_mut();
        o.prevent_extensions();
        assert!(!o.define_own_property(PropertyKey::from("x"), PropertyDescriptor::data(JsValue::Null)));
    }

    #[test]
    fn test_own_property_keys_order() {
        let o = obj();
        let mut o = o.borrow_mut();
        o.set_data("b", JsValue::Null);
        o.set_data("2", JsValue::Null);
        o.set_data(JsSymbol::new(1, None), JsValue::Null);
        o.set_data("a", JsValue::Null);
        o.set_data("0", JsValue::Null);
        let keys: Vec<String> = o.own_property_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["0", "2", "b", "a", "Symbol()"]);
    }

    #[test]
    fn test_array_length_semantics() {
        let arr = array();
        let mut a = arr.borrow_mut();
        assert!(a.define_own_property(PropertyKey::Index(4), PropertyDescriptor::data(JsValue::Null)));
        assert_eq!(a.array_length(), 5);

        // Truncation stops at a non-configurable element
        a.insert_property(
            PropertyKey::Index(1),
            Property::with_attributes(JsValue::Null, true, true, false),
        );
        let shrink = PropertyDescriptor {
            value: Some(JsValue::Number(0.0)),
            ..PropertyDescriptor::default()
        };
        assert!(!a.define_own_property(PropertyKey::from("length"), shrink));
        assert_eq!(a.array_length(), 2);
        assert!(!a.has_own_property(&PropertyKey::Index(4)));

        // Non-writable length blocks growth
        let freeze_length = PropertyDescriptor {
            writable: Some(false),
            ..PropertyDescriptor::default()
        };
        assert!(a.define_own_property(PropertyKey::from("length"), freeze_length));
        assert!(!a.define_own_property(PropertyKey::Index(7), PropertyDescriptor::data(JsValue::Null)));
        assert_eq!(a.array_length(), 2);
    }

    #[test]
    fn test_prototype_cycle_terminates() {
        let a = obj();
        let b = obj();
        // Build the cycle directly, bypassing the set_prototype_of check
        a.borrow_mut().prototype = Some(b.clone());
        b.borrow_mut().prototype = Some(a.clone());

        let key = PropertyKey::from("missing");
        assert!(!has_property(&a, &key));
        assert!(find_property(&b, &key).is_none());
        assert!(prototype_chain(&a).count() <= VISITED_SET_THRESHOLD + 2);
    }

    #[test]
    fn test_set_prototype_of_rejects_cycles() {
        let a = obj();
        let b = obj();
        assert!(set_prototype_of(&a, Some(b.clone())));
        assert!(!set_prototype_of(&b, Some(a.clone())));
        assert!(is_prototype_of(&b, &a));
        b.borrow_mut().prevent_extensions();
        assert!(set_prototype_of(&b, None));
        assert!(!set_prototype_of(&b, Some(obj())));
    }

    #[test]
    fn test_ordered_table_same_value_zero() {
        let mut table = OrderedTable::new();
        table.insert(JsValue::Number(-0.0), JsValue::from("zero"));
        assert!(table.has(&JsValue::Number(0.0)));
        table.insert(JsValue::Number(f64::NAN), JsValue::from("nan"));
        assert_eq!(table.get(&JsValue::Number(f64::NAN)), Some(&JsValue::from("nan")));
        assert_eq!(table.len(), 2);

        // Holes keep iterator positions stable
        assert!(table.remove(&JsValue::Number(0.0)));
        let (slot, key, _) = table.next_entry(0).unwrap();
        assert_eq!(slot, 1);
        assert!(key.as_number().unwrap().is_nan());
        table.clear();
        assert!(table.is_empty());
        assert!(table.next_entry(0).is_none());
    }
}
