//! ES modules: loading, linking and evaluation
//!
//! `prepare_module` loads the whole import graph through the host's
//! [`ModuleResolver`], links every new module (environments, hoisted
//! declarations, live import bindings) and queues one task that evaluates the
//! graph in post-order. Imports are indirect bindings into the exporting
//! module's environment, so later assignments there are observed.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::ast::{ExportDeclaration, ImportSpecifier, Program, SourceType, Statement};
use crate::environment::{EnvRef, EnvironmentRecord, IndirectBinding, new_module_environment};
use crate::error::JsError;
use crate::hoist::function_binding_name;
use crate::object::{JsObject, JsObjectRef, NamespaceState, ObjectKind, Property, PropertyKey};
use crate::parser::Parser;
use crate::realm::Task;
use crate::value::{CheapClone, JsString, JsValue};

use super::Interpreter;
use super::frame::{ContextKind, ExecutionContext, Frame};

pub type ModuleRef = Rc<RefCell<ModuleRecord>>;

/// Binding name holding the namespace object of a module re-exported with
/// `export * as name`
const NAMESPACE_BINDING: &str = "*namespace*";
const DEFAULT_BINDING: &str = "*default*";

/// Supplies module source to the interpreter
pub trait ModuleResolver {
    /// Produce the module named by `specifier`, imported from `referrer`
    fn resolve(&mut self, interp: &mut Interpreter, referrer: &str, specifier: &str) -> Result<ModuleSource, JsError>;
}

/// What a resolver hands back
pub enum ModuleSource {
    /// Module source text
    Source(String),
    /// A host module with fixed exports
    Exports(Vec<(String, JsValue)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    Unlinked,
    Linked,
    Evaluating,
    Evaluated,
}

/// Where an imported name comes from
#[derive(Clone)]
enum ImportName {
    Named(JsString),
    Namespace,
}

struct ImportEntry {
    local: JsString,
    request: JsString,
    import: ImportName,
}

pub struct ModuleRecord {
    pub specifier: JsString,
    pub env: EnvRef,
    pub status: ModuleStatus,
    program: Option<Program>,
    /// Requested specifiers in source order
    requests: Vec<JsString>,
    dependencies: Vec<(JsString, ModuleRef)>,
    imports: Vec<ImportEntry>,
    /// exported name -> local binding
    local_exports: Vec<(JsString, JsString)>,
    /// exported name -> (request, imported name)
    indirect_exports: Vec<(JsString, JsString, JsString)>,
    /// `export * as name from request`
    namespace_exports: Vec<(JsString, JsString)>,
    /// `export * from request`
    star_exports: Vec<JsString>,
    namespace: Option<JsObjectRef>,
}

impl ModuleRecord {
    fn new(specifier: JsString, env: EnvRef) -> Self {
        Self {
            specifier,
            env,
            status: ModuleStatus::Unlinked,
            program: None,
            requests: Vec::new(),
            dependencies: Vec::new(),
            imports: Vec::new(),
            local_exports: Vec::new(),
            indirect_exports: Vec::new(),
            namespace_exports: Vec::new(),
            star_exports: Vec::new(),
            namespace: None,
        }
    }

    fn request(&mut self, specifier: &JsString) {
        if !self.requests.contains(specifier) {
            self.requests.push(specifier.cheap_clone());
        }
    }

    fn dependency(&self, request: &JsString) -> Option<ModuleRef> {
        self.dependencies
            .iter()
            .find(|(name, _)| name == request)
            .map(|(_, module)| module.cheap_clone())
    }

    /// Collect import and export entries from the module body
    fn scan(&mut self, program: &Program) {
        for stmt in program.body.iter() {
            match stmt {
                Statement::Import(decl) => {
                    self.request(&decl.source);
                    for specifier in &decl.specifiers {
                        let (local, import) = match specifier {
                            ImportSpecifier::Named { imported, local } => {
                                (local.cheap_clone(), ImportName::Named(imported.cheap_clone()))
                            }
                            ImportSpecifier::Default { local } => {
                                (local.cheap_clone(), ImportName::Named(JsString::from("default")))
                            }
                            ImportSpecifier::Namespace { local } => (local.cheap_clone(), ImportName::Namespace),
                        };
                        self.imports.push(ImportEntry {
                            local,
                            request: decl.source.cheap_clone(),
                            import,
                        });
                    }
                }
                Statement::Export(export) => self.scan_export(export),
                _ => {}
            }
        }
    }

    fn scan_export(&mut self, export: &ExportDeclaration) {
        match export {
            ExportDeclaration::Named { specifiers, source } => match source {
                Some(source) => {
                    self.request(source);
                    for spec in specifiers {
                        self.indirect_exports.push((
                            spec.exported.cheap_clone(),
                            source.cheap_clone(),
                            spec.local.cheap_clone(),
                        ));
                    }
                }
                None => {
                    for spec in specifiers {
                        self.local_exports
                            .push((spec.exported.cheap_clone(), spec.local.cheap_clone()));
                    }
                }
            },
            ExportDeclaration::Declaration(stmt) => {
                let mut names = Vec::new();
                match stmt {
                    Statement::VariableDeclaration(decl) => {
                        for declarator in &decl.declarations {
                            declarator.id.collect_bound_names(&mut names);
                        }
                    }
                    Statement::FunctionDeclaration(func) => names.push(function_binding_name(func)),
                    _ => {}
                }
                for name in names {
                    self.local_exports.push((name.cheap_clone(), name));
                }
            }
            ExportDeclaration::DefaultExpression(_) => {
                self.local_exports
                    .push((JsString::from("default"), JsString::from(DEFAULT_BINDING)));
            }
            ExportDeclaration::DefaultFunction(func) => {
                self.local_exports
                    .push((JsString::from("default"), function_binding_name(func)));
            }
            ExportDeclaration::All { source, alias } => {
                self.request(source);
                match alias {
                    Some(alias) => self.namespace_exports.push((alias.cheap_clone(), source.cheap_clone())),
                    None => self.star_exports.push(source.cheap_clone()),
                }
            }
        }
    }
}

/// Every module loaded by an interpreter, by specifier
#[derive(Default)]
pub(crate) struct ModuleRegistry {
    modules: FxHashMap<JsString, ModuleRef>,
    anonymous: usize,
}

impl ModuleRegistry {
    pub(crate) fn get(&self, specifier: &str) -> Option<ModuleRef> {
        self.modules.get(specifier).cloned()
    }

    fn insert(&mut self, module: ModuleRef) {
        let specifier = module.borrow().specifier.cheap_clone();
        self.modules.insert(specifier, module);
    }

    /// A fresh specifier for a module prepared from host source
    fn main_specifier(&mut self) -> JsString {
        self.anonymous += 1;
        if self.anonymous == 1 {
            JsString::from("<main>")
        } else {
            JsString::from(format!("<main#{}>", self.anonymous))
        }
    }
}

impl Interpreter {
    /// Parse a module, load and link its import graph, and queue its
    /// evaluation. Returns the specifier the module was registered under.
    pub fn prepare_module(&mut self, source: &str) -> Result<JsString, JsError> {
        let specifier = self.modules.main_specifier();
        self.prepare_module_named(&specifier, source)?;
        Ok(specifier)
    }

    /// Like [`Interpreter::prepare_module`] with an explicit specifier
    pub fn prepare_module_named(&mut self, specifier: &str, source: &str) -> Result<(), JsError> {
        if self.modules.get(specifier).is_some() {
            return Err(JsError::module_error(format!("Module '{}' is already loaded", specifier)));
        }
        let program = Parser::new(source, &mut self.string_dict).parse_program(SourceType::Module)?;
        let root = self.source_module(JsString::from(specifier), program);
        let graph = self.load_graph(&root)?;
        for module in &graph {
            if module.borrow().status == ModuleStatus::Unlinked {
                self.link_module(module)?;
            }
        }
        debug!("linked module graph of '{}' ({} modules)", specifier, graph.len());

        let mut order = Vec::new();
        evaluation_order(&root, &mut order);
        self.budget.start_session();
        let env = self.realm.global_env.cheap_clone();
        let mut ctx = Box::new(ExecutionContext::new(ContextKind::Module, env, true));
        for module in order.into_iter().rev() {
            ctx.push(Frame::ModuleBody(module));
        }
        self.realm.macrotasks.push_back(Task::Evaluate(ctx));
        Ok(())
    }

    /// The namespace object of a loaded module
    pub fn module_namespace(&mut self, specifier: &str) -> Result<Option<JsObjectRef>, JsError> {
        match self.modules.get(specifier) {
            Some(module) => Ok(Some(self.namespace_object(&module)?)),
            None => Ok(None),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Loading
    // ═══════════════════════════════════════════════════════════════════════

    fn source_module(&mut self, specifier: JsString, program: Program) -> ModuleRef {
        let env = new_module_environment(&self.realm.global_env);
        let mut record = ModuleRecord::new(specifier, env);
        record.scan(&program);
        record.program = Some(program);
        let module = Rc::new(RefCell::new(record));
        self.modules.insert(module.cheap_clone());
        module
    }

    fn host_module(&mut self, specifier: JsString, exports: Vec<(String, JsValue)>) -> ModuleRef {
        let env = new_module_environment(&self.realm.global_env);
        let mut record = ModuleRecord::new(specifier, env.cheap_clone());
        if let Some(decl) = env.borrow_mut().declarative_mut() {
            for (name, value) in exports {
                let name = JsString::from(name);
                decl.declare(name.cheap_clone(), value);
                record.local_exports.push((name.cheap_clone(), name));
            }
        }
        record.status = ModuleStatus::Evaluated;
        let module = Rc::new(RefCell::new(record));
        self.modules.insert(module.cheap_clone());
        module
    }

    /// Load a requested module through the resolver (or the registry)
    fn fetch_module(&mut self, referrer: &JsString, specifier: &JsString) -> Result<ModuleRef, JsError> {
        if let Some(module) = self.modules.get(specifier) {
            return Ok(module);
        }
        let Some(mut resolver) = self.resolver.take() else {
            return Err(JsError::module_error(format!(
                "Cannot resolve module '{}' imported from '{}': no module resolver",
                specifier, referrer
            )));
        };
        let result = resolver.resolve(self, referrer, specifier);
        self.resolver = Some(resolver);
        debug!("resolved module '{}' from '{}'", specifier, referrer);
        match result? {
            ModuleSource::Source(text) => {
                let program = Parser::new(&text, &mut self.string_dict).parse_program(SourceType::Module)?;
                Ok(self.source_module(specifier.cheap_clone(), program))
            }
            ModuleSource::Exports(exports) => Ok(self.host_module(specifier.cheap_clone(), exports)),
        }
    }

    /// Every module reachable from `root`
    fn load_graph(&mut self, root: &ModuleRef) -> Result<Vec<ModuleRef>, JsError> {
        let mut graph: Vec<ModuleRef> = Vec::new();
        let mut worklist = vec![root.cheap_clone()];
        while let Some(module) = worklist.pop() {
            if graph.iter().any(|m| Rc::ptr_eq(m, &module)) {
                continue;
            }
            graph.push(module.cheap_clone());
            let (referrer, requests, loaded) = {
                let m = module.borrow();
                (m.specifier.cheap_clone(), m.requests.clone(), m.dependencies.len())
            };
            if loaded == requests.len() {
                worklist.extend(module.borrow().dependencies.iter().map(|(_, dep)| dep.cheap_clone()));
                continue;
            }
            for request in requests {
                let dependency = self.fetch_module(&referrer, &request)?;
                module
                    .borrow_mut()
                    .dependencies
                    .push((request, dependency.cheap_clone()));
                worklist.push(dependency);
            }
        }
        Ok(graph)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Linking
    // ═══════════════════════════════════════════════════════════════════════

    /// Create the bindings of a module environment: imports, hoisted `var`s,
    /// functions and uninitialized lexical declarations
    fn link_module(&mut self, module: &ModuleRef) -> Result<(), JsError> {
        let (specifier, env, imports, program) = {
            let m = module.borrow();
            let imports: Vec<(JsString, Option<ModuleRef>, ImportName)> = m
                .imports
                .iter()
                .map(|entry| (entry.local.cheap_clone(), m.dependency(&entry.request), entry.import.clone()))
                .collect();
            (m.specifier.cheap_clone(), m.env.cheap_clone(), imports, m.program.clone())
        };

        for (local, dependency, import) in imports {
            let Some(dependency) = dependency else {
                return Err(JsError::internal_error(format!("unloaded dependency of '{}'", specifier)));
            };
            let target = match import {
                ImportName::Namespace => self.namespace_binding(&dependency)?,
                ImportName::Named(name) => {
                    let mut visited = Vec::new();
                    match self.resolve_export(&dependency, &name, &mut visited)? {
                        Some(target) => target,
                        None => {
                            let from = dependency.borrow().specifier.cheap_clone();
                            return Err(JsError::syntax_error_simple(format!(
                                "The requested module '{}' does not provide an export named '{}'",
                                from, name
                            )));
                        }
                    }
                }
            };
            let mut e = env.borrow_mut();
            if let EnvironmentRecord::Module(record) = &mut e.record {
                record.imports.insert(local, target);
            }
        }

        if let Some(program) = program {
            let scope = program.scope.cheap_clone();
            let functions: Vec<(JsString, JsValue)> = scope
                .functions
                .iter()
                .map(|func| {
                    let binding = function_binding_name(func);
                    let name = (binding.as_str() == DEFAULT_BINDING).then(|| JsString::from("default"));
                    let object = self.instantiate_function_object(func, &env, name);
                    (binding, JsValue::Object(object))
                })
                .collect();
            let has_default_expression = program.body.iter().any(|stmt| {
                matches!(stmt, Statement::Export(export)
                    if matches!(export.as_ref(), ExportDeclaration::DefaultExpression(_)))
            });

            let mut e = env.borrow_mut();
            if let Some(decl) = e.declarative_mut() {
                for name in &scope.var_names {
                    if !decl.has_binding(name) {
                        decl.declare(name.cheap_clone(), JsValue::Undefined);
                    }
                }
                for lexical in &scope.lexical {
                    if lexical.constant {
                        decl.create_immutable_binding(lexical.name.cheap_clone(), true);
                    } else {
                        decl.create_mutable_binding(lexical.name.cheap_clone(), false);
                    }
                }
                if has_default_expression {
                    decl.create_immutable_binding(JsString::from(DEFAULT_BINDING), true);
                }
                for (name, function) in functions {
                    decl.declare(name, function);
                }
            }
        }
        module.borrow_mut().status = ModuleStatus::Linked;
        debug!("linked module '{}'", specifier);
        Ok(())
    }

    /// ResolveExport: the environment and binding name an export refers to.
    /// `Ok(None)` when the name is not exported (or only reachable through a cycle).
    fn resolve_export(
        &mut self,
        module: &ModuleRef,
        name: &JsString,
        visited: &mut Vec<(ModuleRef, JsString)>,
    ) -> Result<Option<IndirectBinding>, JsError> {
        if visited.iter().any(|(m, n)| Rc::ptr_eq(m, module) && n == name) {
            return Ok(None);
        }
        visited.push((module.cheap_clone(), name.cheap_clone()));

        let m = module.borrow();
        if let Some((_, local)) = m.local_exports.iter().find(|(exported, _)| exported == name) {
            // A local export may re-export an import
            if let Some(entry) = m.imports.iter().find(|entry| &entry.local == local) {
                let dependency = m.dependency(&entry.request);
                let import = entry.import.clone();
                drop(m);
                let Some(dependency) = dependency else {
                    return Ok(None);
                };
                return match import {
                    ImportName::Named(imported) => self.resolve_export(&dependency, &imported, visited),
                    ImportName::Namespace => self.namespace_binding(&dependency).map(Some),
                };
            }
            return Ok(Some(IndirectBinding {
                env: m.env.cheap_clone(),
                name: local.cheap_clone(),
            }));
        }
        if let Some((_, request, imported)) = m.indirect_exports.iter().find(|(exported, _, _)| exported == name) {
            let dependency = m.dependency(request);
            let imported = imported.cheap_clone();
            drop(m);
            return match dependency {
                Some(dependency) => self.resolve_export(&dependency, &imported, visited),
                None => Ok(None),
            };
        }
        if let Some((_, request)) = m.namespace_exports.iter().find(|(exported, _)| exported == name) {
            let dependency = m.dependency(request);
            drop(m);
            return match dependency {
                Some(dependency) => self.namespace_binding(&dependency).map(Some),
                None => Ok(None),
            };
        }
        if name.as_str() == "default" {
            return Ok(None);
        }

        let stars: Vec<ModuleRef> = m.star_exports.iter().filter_map(|request| m.dependency(request)).collect();
        drop(m);
        let mut found: Option<IndirectBinding> = None;
        for dependency in stars {
            let Some(resolution) = self.resolve_export(&dependency, name, visited)? else {
                continue;
            };
            match &found {
                None => found = Some(resolution),
                Some(existing) => {
                    if !Rc::ptr_eq(&existing.env, &resolution.env) || existing.name != resolution.name {
                        return Err(JsError::syntax_error_simple(format!(
                            "The requested module contains conflicting star exports for name '{}'",
                            name
                        )));
                    }
                }
            }
        }
        Ok(found)
    }

    /// Every name a module exports, star exports included ("default" excepted)
    fn exported_names(&self, module: &ModuleRef, visited: &mut Vec<ModuleRef>) -> Vec<JsString> {
        if visited.iter().any(|m| Rc::ptr_eq(m, module)) {
            return Vec::new();
        }
        visited.push(module.cheap_clone());
        let m = module.borrow();
        let mut names: Vec<JsString> = m
            .local_exports
            .iter()
            .map(|(exported, _)| exported.cheap_clone())
            .chain(m.indirect_exports.iter().map(|(exported, _, _)| exported.cheap_clone()))
            .chain(m.namespace_exports.iter().map(|(exported, _)| exported.cheap_clone()))
            .collect();
        for request in &m.star_exports {
            let Some(dependency) = m.dependency(request) else {
                continue;
            };
            for name in self.exported_names(&dependency, visited) {
                if name.as_str() != "default" && !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// The namespace object of a module, created on first use
    pub(crate) fn namespace_object(&mut self, module: &ModuleRef) -> Result<JsObjectRef, JsError> {
        if let Some(namespace) = &module.borrow().namespace {
            return Ok(namespace.cheap_clone());
        }
        let mut object = JsObject::new(
            ObjectKind::ModuleNamespace(NamespaceState {
                exports: IndexMap::with_hasher(FxBuildHasher),
            }),
            None,
        );
        object.extensible = false;
        let tag = self.realm.symbols.to_string_tag.cheap_clone();
        object.insert_property(PropertyKey::Symbol(tag), Property::frozen(JsValue::from("Module")));
        let namespace = object.into_ref();
        module.borrow_mut().namespace = Some(namespace.cheap_clone());

        let mut names = self.exported_names(module, &mut Vec::new());
        names.sort_by(|a, b| a.as_str().encode_utf16().cmp(b.as_str().encode_utf16()));
        let mut exports = IndexMap::with_hasher(FxBuildHasher);
        for name in names {
            let mut visited = Vec::new();
            // Ambiguous or circular names are left out
            if let Ok(Some(binding)) = self.resolve_export(module, &name, &mut visited) {
                exports.insert(name, (binding.env, binding.name));
            }
        }
        if let ObjectKind::ModuleNamespace(state) = &mut namespace.borrow_mut().kind {
            state.exports = exports;
        }
        Ok(namespace)
    }

    /// A binding that holds the namespace object of `module`
    fn namespace_binding(&mut self, module: &ModuleRef) -> Result<IndirectBinding, JsError> {
        let namespace = self.namespace_object(module)?;
        let env = module.borrow().env.cheap_clone();
        if let Some(decl) = env.borrow_mut().declarative_mut()
            && !decl.has_binding(NAMESPACE_BINDING)
        {
            decl.create_immutable_binding(JsString::from(NAMESPACE_BINDING), true);
            decl.initialize_binding(NAMESPACE_BINDING, JsValue::Object(namespace));
        }
        Ok(IndirectBinding {
            env,
            name: JsString::from(NAMESPACE_BINDING),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Evaluation frames
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn module_body(&mut self, ctx: &mut ExecutionContext, module: &ModuleRef) -> Result<(), JsError> {
        let (env, body) = {
            let mut m = module.borrow_mut();
            if m.status != ModuleStatus::Linked {
                // Evaluated already, or part of a cycle in progress
                return Ok(());
            }
            let Some(program) = &m.program else {
                m.status = ModuleStatus::Evaluated;
                return Ok(());
            };
            let body = program.body.cheap_clone();
            m.status = ModuleStatus::Evaluating;
            (m.env.cheap_clone(), body)
        };
        debug!("evaluating module '{}'", module.borrow().specifier);
        ctx.env = env.cheap_clone();
        ctx.var_env = env;
        ctx.strict = true;
        ctx.push(Frame::ModuleDone(module.cheap_clone()));
        ctx.push(Frame::StatementList { body, index: 0, last: None });
        Ok(())
    }

    pub(crate) fn module_done(&mut self, ctx: &mut ExecutionContext, module: &ModuleRef) {
        let mut m = module.borrow_mut();
        m.status = ModuleStatus::Evaluated;
        // The module body's value is not the graph's result
        if !ctx.completion.is_abrupt() {
            ctx.complete(None);
        }
    }
}

/// Post-order over the import graph: dependencies before dependents
fn evaluation_order(root: &ModuleRef, order: &mut Vec<ModuleRef>) {
    let mut stack: Vec<(ModuleRef, usize)> = vec![(root.cheap_clone(), 0)];
    let mut seen: Vec<ModuleRef> = vec![root.cheap_clone()];
    while let Some((module, index)) = stack.pop() {
        let next = module.borrow().dependencies.get(index).map(|(_, dep)| dep.cheap_clone());
        match next {
            Some(dependency) => {
                stack.push((module, index + 1));
                if !seen.iter().any(|m| Rc::ptr_eq(m, &dependency)) {
                    seen.push(dependency.cheap_clone());
                    stack.push((dependency, 0));
                }
            }
            None => order.push(module),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::StepResult;

    struct MapResolver(Vec<(&'static str, &'static str)>);

    impl ModuleResolver for MapResolver {
        fn resolve(&mut self, _interp: &mut Interpreter, _referrer: &str, specifier: &str) -> Result<ModuleSource, JsError> {
            self.0
                .iter()
                .find(|(name, _)| *name == specifier)
                .map(|(_, source)| ModuleSource::Source(source.to_string()))
                .ok_or_else(|| JsError::module_error(format!("Cannot find module '{}'", specifier)))
        }
    }

    fn run_module(modules: Vec<(&'static str, &'static str)>, main: &str) -> Result<StepResult, JsError> {
        let mut interp = Interpreter::new();
        interp.set_module_resolver(Box::new(MapResolver(modules)));
        interp.prepare_module(main)?;
        interp.run_to_completion()
    }

    #[test]
    fn test_evaluation_order_is_post_order() {
        let mut interp = Interpreter::new();
        interp.set_module_resolver(Box::new(MapResolver(vec![
            ("a", "import './b'; globalThis.log.push('a');"),
            ("./b", "globalThis.log.push('b');"),
        ])));
        interp.prepare("globalThis.log = []").unwrap();
        interp.run_to_completion().unwrap();
        interp.prepare_module("import 'a'; globalThis.log.push('main');").unwrap();
        interp.run_to_completion().unwrap();
        interp.prepare("log.join(',')").unwrap();
        match interp.run_to_completion().unwrap() {
            StepResult::Complete(value) => assert_eq!(value, JsValue::from("b,a,main")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_export_is_syntax_error() {
        let err = run_module(vec![("m", "export const a = 1;")], "import { b } from 'm';").unwrap_err();
        assert!(matches!(err, JsError::SyntaxError { .. }));
    }

    #[test]
    fn test_missing_resolver_is_module_error() {
        let mut interp = Interpreter::new();
        let err = interp.prepare_module("import 'x';").unwrap_err();
        assert!(matches!(err, JsError::ModuleError { .. }));
    }

    #[test]
    fn test_namespace_keys_are_sorted() {
        let mut interp = Interpreter::new();
        interp.set_module_resolver(Box::new(MapResolver(vec![(
            "m",
            "export const b = 1; export const a = 2; export * as self from 'm';",
        )])));
        let specifier = interp.prepare_module("import 'm';").unwrap();
        interp.run_to_completion().unwrap();
        assert!(interp.module_namespace(&specifier).unwrap().is_some());
        let namespace = interp.module_namespace("m").unwrap().unwrap();
        let ns = namespace.borrow();
        let ObjectKind::ModuleNamespace(state) = &ns.kind else {
            panic!("not a namespace");
        };
        let keys: Vec<&str> = state.exports.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "self"]);
    }
}
