//! References and identifier resolution
//!
//! Declarative bindings are read straight out of their record. Object-backed
//! bindings (the global object, `with` objects) go through the property
//! protocol and may run accessors, which is why this lives on the interpreter.

use std::rc::Rc;

use crate::environment::{EnvRef, EnvironmentRecord, IndirectBinding};
use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::object::{JsObjectRef, PropertyKey, has_property};
use crate::value::{CheapClone, JsString, JsValue};

/// The result of evaluating a left-hand side expression
#[derive(Clone)]
pub enum Reference {
    Unresolvable {
        name: JsString,
        strict: bool,
    },
    Environment {
        env: EnvRef,
        name: JsString,
        strict: bool,
    },
    Property {
        base: JsValue,
        key: PropertyKey,
        strict: bool,
    },
}

impl Reference {
    /// The `this` value a call through this reference receives
    pub fn this_value(&self) -> JsValue {
        match self {
            Reference::Property { base, .. } => base.cheap_clone(),
            Reference::Environment { env, .. } => env
                .borrow()
                .with_base_object()
                .map(JsValue::Object)
                .unwrap_or_default(),
            Reference::Unresolvable { .. } => JsValue::Undefined,
        }
    }

    pub fn is_unresolvable(&self) -> bool {
        matches!(self, Reference::Unresolvable { .. })
    }
}

/// Where a binding lookup landed, extracted while the record is borrowed
enum Slot {
    Value(JsValue),
    Object(JsObjectRef),
    Import(IndirectBinding),
}

impl Interpreter {
    // ═══════════════════════════════════════════════════════════════════════
    // Resolution
    // ═══════════════════════════════════════════════════════════════════════

    /// GetIdentifierReference over the whole chain
    pub(crate) fn resolve_binding(
        &mut self,
        env: &EnvRef,
        name: &JsString,
        strict: bool,
    ) -> Result<Reference, JsError> {
        let mut current = Some(env.cheap_clone());
        while let Some(record) = current {
            if self.env_has_binding(&record, name)? {
                return Ok(Reference::Environment {
                    env: record,
                    name: name.cheap_clone(),
                    strict,
                });
            }
            current = record.borrow().outer.clone();
        }
        Ok(Reference::Unresolvable {
            name: name.cheap_clone(),
            strict,
        })
    }

    /// HasBinding for any record kind
    pub(crate) fn env_has_binding(&mut self, env: &EnvRef, name: &JsString) -> Result<bool, JsError> {
        let (object, with) = {
            let e = env.borrow();
            match &e.record {
                EnvironmentRecord::Declarative(decl) => return Ok(decl.has_binding(name)),
                EnvironmentRecord::Function(f) => return Ok(f.decl.has_binding(name)),
                EnvironmentRecord::Module(m) => {
                    return Ok(m.decl.has_binding(name) || m.imports.contains_key(name));
                }
                EnvironmentRecord::Global(g) => {
                    return Ok(g.decl.has_binding(name)
                        || has_property(&g.object, &PropertyKey::from(name.cheap_clone())));
                }
                EnvironmentRecord::Object(o) => (o.object.cheap_clone(), o.with_environment),
            }
        };
        let key = PropertyKey::from(name.cheap_clone());
        if !has_property(&object, &key) {
            return Ok(false);
        }
        if !with {
            return Ok(true);
        }
        let unscopables_key = PropertyKey::Symbol(self.realm.symbols.unscopables.cheap_clone());
        if let JsValue::Object(unscopables) = self.get(&object, &unscopables_key)? {
            let blocked = self.get(&unscopables, &key)?.to_boolean();
            return Ok(!blocked);
        }
        Ok(true)
    }

    /// Read an identifier. Declarative records along the chain are checked
    /// without building a reference.
    pub(crate) fn lookup_identifier(
        &mut self,
        env: &EnvRef,
        name: &JsString,
        strict: bool,
    ) -> Result<JsValue, JsError> {
        let mut current = env.cheap_clone();
        loop {
            let next = {
                let e = current.borrow();
                match &e.record {
                    EnvironmentRecord::Declarative(decl) if decl.has_binding(name) => {
                        return decl.get_binding_value(name);
                    }
                    EnvironmentRecord::Function(f) if f.decl.has_binding(name) => {
                        return f.decl.get_binding_value(name);
                    }
                    EnvironmentRecord::Declarative(_) | EnvironmentRecord::Function(_) => e.outer.clone(),
                    _ => None,
                }
            };
            match next {
                Some(outer) => current = outer,
                None => break,
            }
        }
        let reference = self.resolve_binding(&current, name, strict)?;
        self.get_value(&reference)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Record operations
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn get_binding_value(
        &mut self,
        env: &EnvRef,
        name: &JsString,
        strict: bool,
    ) -> Result<JsValue, JsError> {
        let slot = {
            let e = env.borrow();
            match &e.record {
                EnvironmentRecord::Declarative(decl) => Slot::Value(decl.get_binding_value(name)?),
                EnvironmentRecord::Function(f) => Slot::Value(f.decl.get_binding_value(name)?),
                EnvironmentRecord::Module(m) => match m.imports.get(name) {
                    Some(import) if !m.decl.has_binding(name) => Slot::Import(import.clone()),
                    _ => Slot::Value(m.decl.get_binding_value(name)?),
                },
                EnvironmentRecord::Global(g) if g.decl.has_binding(name) => {
                    Slot::Value(g.decl.get_binding_value(name)?)
                }
                EnvironmentRecord::Global(g) => Slot::Object(g.object.cheap_clone()),
                EnvironmentRecord::Object(o) => Slot::Object(o.object.cheap_clone()),
            }
        };
        match slot {
            Slot::Value(value) => Ok(value),
            Slot::Import(import) => read_import(&import),
            Slot::Object(object) => {
                let key = PropertyKey::from(name.cheap_clone());
                if !has_property(&object, &key) {
                    if strict {
                        return Err(JsError::reference_error(name));
                    }
                    return Ok(JsValue::Undefined);
                }
                self.get(&object, &key)
            }
        }
    }

    pub(crate) fn set_mutable_binding(
        &mut self,
        env: &EnvRef,
        name: &JsString,
        value: JsValue,
        strict: bool,
    ) -> Result<(), JsError> {
        let (object, check_exists) = {
            let mut e = env.borrow_mut();
            match &mut e.record {
                EnvironmentRecord::Declarative(decl) => return decl.set_mutable_binding(name, value, strict),
                EnvironmentRecord::Function(f) => return f.decl.set_mutable_binding(name, value, strict),
                EnvironmentRecord::Module(m) => {
                    if !m.decl.has_binding(name) && m.imports.contains_key(name) {
                        return Err(JsError::type_error("Assignment to constant variable."));
                    }
                    return m.decl.set_mutable_binding(name, value, strict);
                }
                EnvironmentRecord::Global(g) if g.decl.has_binding(name) => {
                    return g.decl.set_mutable_binding(name, value, strict);
                }
                EnvironmentRecord::Global(g) => (g.object.cheap_clone(), false),
                EnvironmentRecord::Object(o) => (o.object.cheap_clone(), true),
            }
        };
        let key = PropertyKey::from(name.cheap_clone());
        if check_exists && strict && !has_property(&object, &key) {
            return Err(JsError::reference_error(name));
        }
        let receiver = JsValue::Object(object.cheap_clone());
        let done = self.set_property(&object, key, value, &receiver)?;
        if !done && strict {
            return Err(JsError::type_error(format!(
                "Cannot assign to read only property '{}' of object",
                name
            )));
        }
        Ok(())
    }

    /// InitializeBinding on a record that holds its own bindings
    pub(crate) fn initialize_binding(&mut self, env: &EnvRef, name: &JsString, value: JsValue) -> Result<(), JsError> {
        let object = {
            let mut e = env.borrow_mut();
            match e.declarative_mut() {
                Some(decl) => {
                    decl.initialize_binding(name, value);
                    return Ok(());
                }
                None => match &e.record {
                    EnvironmentRecord::Object(o) => o.object.cheap_clone(),
                    _ => return Err(JsError::internal_error("binding record without storage")),
                },
            }
        };
        let receiver = JsValue::Object(object.cheap_clone());
        self.set_property(&object, PropertyKey::from(name.cheap_clone()), value, &receiver)?;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // GetValue / PutValue / delete
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn get_value(&mut self, reference: &Reference) -> Result<JsValue, JsError> {
        match reference {
            Reference::Unresolvable { name, .. } => Err(JsError::reference_error(name)),
            Reference::Environment { env, name, strict } => self.get_binding_value(env, name, *strict),
            Reference::Property { base, key, .. } => self.get_v(base, key),
        }
    }

    pub(crate) fn put_value(&mut self, reference: &Reference, value: JsValue) -> Result<(), JsError> {
        match reference {
            Reference::Unresolvable { name, strict } => {
                if *strict {
                    return Err(JsError::reference_error(name));
                }
                let global = self.realm.global_object.cheap_clone();
                let receiver = JsValue::Object(global.cheap_clone());
                self.set_property(&global, PropertyKey::from(name.cheap_clone()), value, &receiver)?;
                Ok(())
            }
            Reference::Environment { env, name, strict } => {
                self.set_mutable_binding(env, name, value, *strict)
            }
            Reference::Property { base, key, strict } => {
                let target = match base {
                    JsValue::Object(obj) => obj.cheap_clone(),
                    JsValue::Undefined | JsValue::Null => {
                        return Err(JsError::type_error(format!(
                            "Cannot set properties of {:?} (setting '{}')",
                            base, key
                        )));
                    }
                    primitive => self.to_object(primitive)?,
                };
                let done = self.set_property(&target, key.cheap_clone(), value, base)?;
                if !done && *strict {
                    return Err(JsError::type_error(format!(
                        "Cannot assign to read only property '{}' of {}",
                        key,
                        base.type_of()
                    )));
                }
                Ok(())
            }
        }
    }

    /// The `delete` operator on a reference
    pub(crate) fn delete_reference(&mut self, reference: &Reference) -> Result<bool, JsError> {
        match reference {
            Reference::Unresolvable { .. } => Ok(true),
            Reference::Property { base, key, strict } => {
                let target = self.to_object(base)?;
                let deleted = target.borrow_mut().delete(key);
                if !deleted && *strict {
                    return Err(JsError::type_error(format!(
                        "Cannot delete property '{}' of {}",
                        key,
                        self.display_value(base)
                    )));
                }
                Ok(deleted)
            }
            Reference::Environment { env, name, .. } => {
                let mut e = env.borrow_mut();
                match &mut e.record {
                    EnvironmentRecord::Declarative(decl) => Ok(decl.delete_binding(name)),
                    EnvironmentRecord::Function(f) => Ok(f.decl.delete_binding(name)),
                    EnvironmentRecord::Module(_) => Ok(false),
                    EnvironmentRecord::Object(o) => {
                        let key = PropertyKey::from(name.cheap_clone());
                        Ok(o.object.borrow_mut().delete(&key))
                    }
                    EnvironmentRecord::Global(g) => {
                        if g.decl.has_binding(name) {
                            return Ok(g.decl.delete_binding(name));
                        }
                        let key = PropertyKey::from(name.cheap_clone());
                        let deleted = g.object.borrow_mut().delete(&key);
                        if deleted {
                            g.var_names.remove(name);
                        }
                        Ok(deleted)
                    }
                }
            }
        }
    }

    /// ResolveThisBinding
    pub(crate) fn resolve_this_binding(&self, env: &EnvRef) -> Result<JsValue, JsError> {
        let this_env = crate::environment::get_this_environment(env);
        let value = this_env.borrow().get_this_binding();
        value
    }

    /// `new.target` of the innermost non-arrow function
    pub(crate) fn resolve_new_target(&self, env: &EnvRef) -> JsValue {
        let this_env = crate::environment::get_this_environment(env);
        let e = this_env.borrow();
        match &e.record {
            EnvironmentRecord::Function(f) => f.new_target.cheap_clone(),
            _ => JsValue::Undefined,
        }
    }
}

fn read_import(import: &IndirectBinding) -> Result<JsValue, JsError> {
    let e = import.env.borrow();
    match e.declarative() {
        Some(decl) => decl.get_binding_value(&import.name),
        None => Err(JsError::internal_error("import bound to a record without storage")),
    }
}

/// Do two handles name the same environment?
pub(crate) fn same_env(a: &EnvRef, b: &EnvRef) -> bool {
    Rc::ptr_eq(a, b)
}
