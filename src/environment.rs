//! Environment records
//!
//! Scopes form a singly linked chain of [`Environment`]s through `outer`.
//! Declarative bindings are stored here directly; object-backed bindings
//! (the global object, `with` objects) alias properties and need the
//! interpreter for property access, so those lookups live in
//! `interpreter::reference`.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::JsError;
use crate::object::{JsObjectRef, PropertyDescriptor, PropertyKey};
use crate::value::{CheapClone, JsString, JsValue};

/// Shared handle to an environment
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: JsValue,
    pub mutable: bool,
    pub initialized: bool,
    pub deletable: bool,
    /// Immutable bindings created strict throw on assignment even in sloppy code
    pub strict: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Declarative records
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct DeclarativeRecord {
    bindings: FxHashMap<JsString, Binding>,
}

impl DeclarativeRecord {
    pub fn has_binding(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn create_mutable_binding(&mut self, name: JsString, deletable: bool) {
        self.bindings.insert(
            name,
            Binding {
                value: JsValue::Undefined,
                mutable: true,
                initialized: false,
                deletable,
                strict: false,
            },
        );
    }

    pub fn create_immutable_binding(&mut self, name: JsString, strict: bool) {
        self.bindings.insert(
            name,
            Binding {
                value: JsValue::Undefined,
                mutable: false,
                initialized: false,
                deletable: false,
                strict,
            },
        );
    }

    pub fn initialize_binding(&mut self, name: &str, value: JsValue) {
        if let Some(binding) = self.bindings.get_mut(name) {
            binding.value = value;
            binding.initialized = true;
        }
    }

    /// Create (if needed) and initialize a mutable binding in one go
    pub fn declare(&mut self, name: JsString, value: JsValue) {
        self.bindings.insert(
            name,
            Binding {
                value,
                mutable: true,
                initialized: true,
                deletable: false,
                strict: false,
            },
        );
    }

    pub fn set_mutable_binding(&mut self, name: &str, value: JsValue, strict: bool) -> Result<(), JsError> {
        let Some(binding) = self.bindings.get_mut(name) else {
            if strict {
                return Err(JsError::reference_error(name));
            }
            self.declare(JsString::from(name), value);
            return Ok(());
        };
        if !binding.initialized {
            return Err(tdz_error(name));
        }
        if binding.mutable {
            binding.value = value;
            Ok(())
        } else if binding.strict || strict {
            Err(JsError::type_error("Assignment to constant variable."))
        } else {
            Ok(())
        }
    }

    pub fn get_binding_value(&self, name: &str) -> Result<JsValue, JsError> {
        match self.bindings.get(name) {
            Some(binding) if binding.initialized => Ok(binding.value.cheap_clone()),
            Some(_) => Err(tdz_error(name)),
            None => Err(JsError::reference_error(name)),
        }
    }

    /// Value of an initialized binding, without raising
    pub fn peek(&self, name: &str) -> Option<JsValue> {
        self.bindings
            .get(name)
            .filter(|b| b.initialized)
            .map(|b| b.value.cheap_clone())
    }

    pub fn is_initialized(&self, name: &str) -> bool {
        self.bindings.get(name).is_some_and(|b| b.initialized)
    }

    pub fn delete_binding(&mut self, name: &str) -> bool {
        match self.bindings.get(name) {
            Some(binding) if !binding.deletable => false,
            Some(_) => {
                self.bindings.remove(name);
                true
            }
            None => true,
        }
    }

    /// Snapshot of the binding names and states (per-iteration copies)
    pub fn bindings(&self) -> impl Iterator<Item = (&JsString, &Binding)> {
        self.bindings.iter()
    }

    pub fn insert_binding(&mut self, name: JsString, binding: Binding) {
        self.bindings.insert(name, binding);
    }
}

fn tdz_error(name: &str) -> JsError {
    JsError::reference_error_with_message(format!("Cannot access '{}' before initialization", name))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Other record kinds
// ═══════════════════════════════════════════════════════════════════════════════

/// Bindings are the properties of `object`
#[derive(Debug)]
pub struct ObjectRecord {
    pub object: JsObjectRef,
    pub with_environment: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThisBindingStatus {
    Lexical,
    Initialized,
    Uninitialized,
}

pub struct FunctionRecord {
    pub decl: DeclarativeRecord,
    pub this_status: ThisBindingStatus,
    pub this_value: JsValue,
    pub function: JsObjectRef,
    pub new_target: JsValue,
}

pub struct GlobalRecord {
    pub object: JsObjectRef,
    pub decl: DeclarativeRecord,
    pub var_names: FxHashSet<JsString>,
    pub this_value: JsObjectRef,
}

/// An import binding: a live view of a binding in another module
#[derive(Clone)]
pub struct IndirectBinding {
    pub env: EnvRef,
    pub name: JsString,
}

pub struct ModuleRecordEnv {
    pub decl: DeclarativeRecord,
    pub imports: FxHashMap<JsString, IndirectBinding>,
}

pub enum EnvironmentRecord {
    Declarative(DeclarativeRecord),
    Object(ObjectRecord),
    Function(FunctionRecord),
    Global(GlobalRecord),
    Module(ModuleRecordEnv),
}

pub struct Environment {
    pub outer: Option<EnvRef>,
    pub record: EnvironmentRecord,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.record {
            EnvironmentRecord::Declarative(_) => "Declarative",
            EnvironmentRecord::Object(_) => "Object",
            EnvironmentRecord::Function(_) => "Function",
            EnvironmentRecord::Global(_) => "Global",
            EnvironmentRecord::Module(_) => "Module",
        };
        write!(f, "Environment({})", kind)
    }
}

impl Environment {
    /// The declarative part of the record, if it has one
    pub fn declarative(&self) -> Option<&DeclarativeRecord> {
        match &self.record {
            EnvironmentRecord::Declarative(decl) => Some(decl),
            EnvironmentRecord::Function(f) => Some(&f.decl),
            EnvironmentRecord::Global(g) => Some(&g.decl),
            EnvironmentRecord::Module(m) => Some(&m.decl),
            EnvironmentRecord::Object(_) => None,
        }
    }

    pub fn declarative_mut(&mut self) -> Option<&mut DeclarativeRecord> {
        match &mut self.record {
            EnvironmentRecord::Declarative(decl) => Some(decl),
            EnvironmentRecord::Function(f) => Some(&mut f.decl),
            EnvironmentRecord::Global(g) => Some(&mut g.decl),
            EnvironmentRecord::Module(m) => Some(&mut m.decl),
            EnvironmentRecord::Object(_) => None,
        }
    }

    pub fn has_this_binding(&self) -> bool {
        match &self.record {
            EnvironmentRecord::Function(f) => f.this_status != ThisBindingStatus::Lexical,
            EnvironmentRecord::Global(_) | EnvironmentRecord::Module(_) => true,
            _ => false,
        }
    }

    pub fn bind_this_value(&mut self, value: JsValue) -> Result<(), JsError> {
        match &mut self.record {
            EnvironmentRecord::Function(f) => {
                if f.this_status == ThisBindingStatus::Initialized {
                    return Err(JsError::reference_error_with_message(
                        "'this' has already been initialized",
                    ));
                }
                f.this_value = value;
                f.this_status = ThisBindingStatus::Initialized;
                Ok(())
            }
            _ => Err(JsError::internal_error("bind_this_value on a record without this")),
        }
    }

    pub fn get_this_binding(&self) -> Result<JsValue, JsError> {
        match &self.record {
            EnvironmentRecord::Function(f) => match f.this_status {
                ThisBindingStatus::Initialized => Ok(f.this_value.cheap_clone()),
                _ => Err(JsError::reference_error_with_message(
                    "Must call super constructor before accessing 'this'",
                )),
            },
            EnvironmentRecord::Global(g) => Ok(JsValue::Object(g.this_value.cheap_clone())),
            EnvironmentRecord::Module(_) => Ok(JsValue::Undefined),
            _ => Err(JsError::internal_error("get_this_binding on a record without this")),
        }
    }

    /// WithBaseObject: the `this` for unqualified calls resolved here
    pub fn with_base_object(&self) -> Option<JsObjectRef> {
        match &self.record {
            EnvironmentRecord::Object(rec) if rec.with_environment => Some(rec.object.cheap_clone()),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Global record
// ═══════════════════════════════════════════════════════════════════════════════

impl GlobalRecord {
    pub fn has_var_declaration(&self, name: &str) -> bool {
        self.var_names.contains(name)
    }

    pub fn has_lexical_declaration(&self, name: &str) -> bool {
        self.decl.has_binding(name)
    }

    /// An own non-configurable property of the global object
    pub fn has_restricted_global_property(&self, name: &str) -> bool {
        self.object
            .borrow()
            .get_own_property(&PropertyKey::from(name))
            .is_some_and(|p| !p.configurable)
    }

    pub fn can_declare_global_var(&self, name: &str) -> bool {
        let global = self.object.borrow();
        global.has_own_property(&PropertyKey::from(name)) || global.extensible
    }

    pub fn can_declare_global_function(&self, name: &str) -> bool {
        let global = self.object.borrow();
        match global.get_own_property(&PropertyKey::from(name)) {
            None => global.extensible,
            Some(prop) => prop.configurable || (prop.is_writable() && prop.enumerable),
        }
    }

    pub fn create_global_var_binding(&mut self, name: JsString, deletable: bool) -> bool {
        let key = PropertyKey::from(name.cheap_clone());
        let mut global = self.object.borrow_mut();
        let defined = global.has_own_property(&key)
            || (global.extensible
                && global.define_own_property(
                    key,
                    PropertyDescriptor {
                        value: Some(JsValue::Undefined),
                        writable: Some(true),
                        enumerable: Some(true),
                        configurable: Some(deletable),
                        ..PropertyDescriptor::default()
                    },
                ));
        if defined {
            self.var_names.insert(name);
        }
        defined
    }

    pub fn create_global_function_binding(&mut self, name: JsString, value: JsValue, deletable: bool) -> bool {
        let key = PropertyKey::from(name.cheap_clone());
        let mut global = self.object.borrow_mut();
        let existing_configurable = global
            .get_own_property(&key)
            .is_none_or(|p| p.configurable);
        let desc = if existing_configurable {
            PropertyDescriptor {
                value: Some(value),
                writable: Some(true),
                enumerable: Some(true),
                configurable: Some(deletable),
                ..PropertyDescriptor::default()
            }
        } else {
            PropertyDescriptor {
                value: Some(value),
                ..PropertyDescriptor::default()
            }
        };
        let defined = global.define_own_property(key, desc);
        if defined {
            self.var_names.insert(name);
        }
        defined
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constructors
// ═══════════════════════════════════════════════════════════════════════════════

fn wrap(record: EnvironmentRecord, outer: Option<EnvRef>) -> EnvRef {
    Rc::new(RefCell::new(Environment { outer, record }))
}

pub fn new_declarative_environment(outer: &EnvRef) -> EnvRef {
    wrap(
        EnvironmentRecord::Declarative(DeclarativeRecord::default()),
        Some(outer.cheap_clone()),
    )
}

/// Function record; arrow functions get a lexical `this`
pub fn new_function_environment(
    function: JsObjectRef,
    lexical_this: bool,
    new_target: JsValue,
    outer: &EnvRef,
) -> EnvRef {
    let this_status = if lexical_this {
        ThisBindingStatus::Lexical
    } else {
        ThisBindingStatus::Uninitialized
    };
    wrap(
        EnvironmentRecord::Function(FunctionRecord {
            decl: DeclarativeRecord::default(),
            this_status,
            this_value: JsValue::Undefined,
            function,
            new_target,
        }),
        Some(outer.cheap_clone()),
    )
}

pub fn new_object_environment(object: JsObjectRef, with_environment: bool, outer: &EnvRef) -> EnvRef {
    wrap(
        EnvironmentRecord::Object(ObjectRecord {
            object,
            with_environment,
        }),
        Some(outer.cheap_clone()),
    )
}

pub fn new_global_environment(global: JsObjectRef) -> EnvRef {
    wrap(
        EnvironmentRecord::Global(GlobalRecord {
            object: global.cheap_clone(),
            decl: DeclarativeRecord::default(),
            var_names: FxHashSet::default(),
            this_value: global,
        }),
        None,
    )
}

pub fn new_module_environment(outer: &EnvRef) -> EnvRef {
    wrap(
        EnvironmentRecord::Module(ModuleRecordEnv {
            decl: DeclarativeRecord::default(),
            imports: FxHashMap::default(),
        }),
        Some(outer.cheap_clone()),
    )
}

/// GetThisEnvironment: the nearest record that binds `this`
pub fn get_this_environment(env: &EnvRef) -> EnvRef {
    let mut current = env.cheap_clone();
    loop {
        let next = {
            let e = current.borrow();
            if e.has_this_binding() {
                None
            } else {
                e.outer.clone()
            }
        };
        match next {
            Some(outer) => current = outer,
            None => return current,
        }
    }
}

/// Copy the bindings of a loop's iteration environment into a fresh one
/// (CreatePerIterationEnvironment)
pub fn copy_declarative_environment(env: &EnvRef) -> EnvRef {
    let source = env.borrow();
    let mut decl = DeclarativeRecord::default();
    if let Some(current) = source.declarative() {
        for (name, binding) in current.bindings() {
            decl.insert_binding(name.cheap_clone(), binding.clone());
        }
    }
    wrap(EnvironmentRecord::Declarative(decl), source.outer.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::JsObject;

    fn global_env() -> EnvRef {
        new_global_environment(JsObject::ordinary(None).into_ref())
    }

    #[test]
    fn test_tdz_and_const() {
        let env = new_declarative_environment(&global_env());
        let mut e = env.borrow_mut();
        let decl = e.declarative_mut().unwrap();
        decl.create_immutable_binding(JsString::from("c"), true);
        let err = decl.get_binding_value("c").unwrap_err();
        assert!(err.to_string().contains("before initialization"));
        decl.initialize_binding("c", JsValue::Number(1.0));
        assert_eq!(decl.get_binding_value("c").unwrap(), JsValue::Number(1.0));
        let err = decl
            .set_mutable_binding("c", JsValue::Number(2.0), false)
            .unwrap_err();
        assert!(err.to_string().contains("Assignment to constant variable."));
    }

    #[test]
    fn test_lookup_by_interned_name() {
        let name = JsString::from("counter");
        let mut decl = DeclarativeRecord::default();
        decl.create_mutable_binding(name.cheap_clone(), false);
        assert!(decl.has_binding(&name));
        decl.initialize_binding(&name, JsValue::Number(3.0));
        assert_eq!(decl.get_binding_value(&name).unwrap(), JsValue::Number(3.0));
    }

    #[test]
    fn test_sloppy_immutable_binding_ignores_writes() {
        let mut decl = DeclarativeRecord::default();
        decl.create_immutable_binding(JsString::from("f"), false);
        decl.initialize_binding("f", JsValue::Number(1.0));
        assert!(decl.set_mutable_binding("f", JsValue::Number(2.0), false).is_ok());
        assert_eq!(decl.peek("f"), Some(JsValue::Number(1.0)));
        assert!(decl.set_mutable_binding("f", JsValue::Number(2.0), true).is_err());
    }

    #[test]
    fn test_global_declaration_checks() {
        let env = global_env();
        let mut e = env.borrow_mut();
        let EnvironmentRecord::Global(global) = &mut e.record else {
            panic!("expected a global record");
        };
        assert!(global.can_declare_global_var("x"));
        assert!(global.create_global_var_binding(JsString::from("x"), false));
        assert!(global.has_var_declaration("x"));
        assert!(global.has_restricted_global_property("x"));
        assert!(global.can_declare_global_function("x") || !global.has_lexical_declaration("x"));
        global.object.borrow_mut().prevent_extensions();
        assert!(!global.can_declare_global_var("y"));
        assert!(!global.can_declare_global_function("y"));
    }

    #[test]
    fn test_this_environment_lookup() {
        let global = global_env();
        let f = JsObject::ordinary(None).into_ref();
        let func_env = new_function_environment(f, false, JsValue::Undefined, &global);
        func_env
            .borrow_mut()
            .bind_this_value(JsValue::Number(7.0))
            .unwrap();
        let block = new_declarative_environment(&func_env);
        let this_env = get_this_environment(&block);
        assert_eq!(this_env.borrow().get_this_binding().unwrap(), JsValue::Number(7.0));

        let arrow_env = new_function_environment(
            JsObject::ordinary(None).into_ref(),
            true,
            JsValue::Undefined,
            &global,
        );
        assert!(Rc::ptr_eq(&get_this_environment(&arrow_env), &global));
    }
}
