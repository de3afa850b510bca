//! ES module loading, linking and evaluation

use std::collections::HashMap;

use super::{run_to_completion, s};
use stepjs::{Interpreter, JsError, JsValue, ModuleResolver, ModuleSource, StepResult};

/// Serves modules from an in-memory table. `math:host` is a host module.
struct TableResolver {
    sources: HashMap<String, String>,
}

impl TableResolver {
    fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            sources: entries
                .iter()
                .map(|(name, source)| (name.to_string(), source.to_string()))
                .collect(),
        }
    }
}

impl ModuleResolver for TableResolver {
    fn resolve(&mut self, interp: &mut Interpreter, _referrer: &str, specifier: &str) -> Result<ModuleSource, JsError> {
        if specifier == "math:host" {
            let add = interp.create_host_function("add", |interp, _this, args| {
                let a = args.first().cloned().unwrap_or_default();
                let b = args.get(1).cloned().unwrap_or_default();
                Ok(JsValue::Number(interp.to_number(&a)? + interp.to_number(&b)?))
            });
            return Ok(ModuleSource::Exports(vec![
                ("add".to_string(), JsValue::Object(add)),
                ("version".to_string(), JsValue::from("1.0")),
            ]));
        }
        match self.sources.get(specifier) {
            Some(source) => Ok(ModuleSource::Source(source.clone())),
            None => Err(JsError::module_error(format!("Module not found: {}", specifier))),
        }
    }
}

fn run_module(modules: &[(&str, &str)], main: &str) -> Result<Interpreter, JsError> {
    let mut interp = Interpreter::new();
    interp.set_module_resolver(Box::new(TableResolver::new(modules)));
    interp.prepare_module(main)?;
    match run_to_completion(&mut interp)? {
        StepResult::Suspended { .. } => Err(JsError::type_error("module suspended")),
        _ => Ok(interp),
    }
}

#[test]
fn test_host_module_import() {
    let mut interp = run_module(&[], "import { add, version } from 'math:host'; globalThis.out = add(2, 3) + ' v' + version;").unwrap();
    assert_eq!(interp.get_global("out").unwrap(), s("5 v1.0"));
}

#[test]
fn test_named_and_default_exports() {
    let modules = [(
        "./lib.js",
        "export const pi = 3; export function double(x) { return x * 2; } export default 'fallback';",
    )];
    let mut interp = run_module(
        &modules,
        "import label, { pi, double as twice } from './lib.js'; globalThis.out = label + ':' + twice(pi);",
    )
    .unwrap();
    assert_eq!(interp.get_global("out").unwrap(), s("fallback:6"));
}

#[test]
fn test_live_bindings() {
    let modules = [(
        "./counter.js",
        "export let count = 0; export function increment() { count++; }",
    )];
    let mut interp = run_module(
        &modules,
        "import { count, increment } from './counter.js'; const before = count; increment(); increment(); globalThis.out = before + '->' + count;",
    )
    .unwrap();
    assert_eq!(interp.get_global("out").unwrap(), s("0->2"));
}

#[test]
fn test_import_binding_is_immutable() {
    let modules = [("./value.js", "export let v = 1;")];
    let result = run_module(&modules, "import { v } from './value.js'; v = 2;");
    let err = result.err().map(|e| e.to_string()).unwrap_or_default();
    assert!(err.contains("TypeError"), "{}", err);
}

#[test]
fn test_namespace_import_and_reexports() {
    let modules = [
        ("./a.js", "export const a = 1; export const shared = 'a';"),
        ("./b.js", "export * from './a.js'; export { a as renamed } from './a.js'; export * as nested from './a.js';"),
    ];
    let mut interp = run_module(
        &modules,
        r#"
        import * as ns from './b.js';
        globalThis.out = [ns.a, ns.renamed, ns.nested.shared, Object.keys(ns).join('|')].join();
        "#,
    )
    .unwrap();
    assert_eq!(interp.get_global("out").unwrap(), s("1,1,a,a|nested|renamed|shared"));
}

#[test]
fn test_namespace_object_is_frozen_shape() {
    let modules = [("./a.js", "export const a = 1;")];
    let mut interp = run_module(
        &modules,
        r#"
        import * as ns from './a.js';
        let threw = false;
        try { ns.a = 2; } catch (e) { threw = e instanceof TypeError; }
        globalThis.out = [threw, Object.prototype.toString.call(ns), ns.a].join();
        "#,
    )
    .unwrap();
    assert_eq!(interp.get_global("out").unwrap(), s("true,[object Module],1"));
}

#[test]
fn test_dependencies_evaluate_first_and_once() {
    let modules = [
        ("./log.js", "export const log = [];"),
        ("./x.js", "import { log } from './log.js'; log.push('x');"),
        ("./y.js", "import { log } from './log.js'; import './x.js'; log.push('y');"),
    ];
    let mut interp = run_module(
        &modules,
        "import './x.js'; import './y.js'; import { log } from './log.js'; log.push('main'); globalThis.out = log.join();",
    )
    .unwrap();
    assert_eq!(interp.get_global("out").unwrap(), s("x,y,main"));
}

#[test]
fn test_cyclic_imports_link() {
    let modules = [
        ("./even.js", "import { odd } from './odd.js'; export function even(n) { return n === 0 ? true : odd(n - 1); }"),
        ("./odd.js", "import { even } from './even.js'; export function odd(n) { return n === 0 ? false : even(n - 1); }"),
    ];
    let mut interp = run_module(&modules, "import { even } from './even.js'; globalThis.out = even(10);").unwrap();
    assert_eq!(interp.get_global("out").unwrap(), JsValue::Boolean(true));
}

#[test]
fn test_missing_export_is_syntax_error() {
    let modules = [("./a.js", "export const a = 1;")];
    let err = run_module(&modules, "import { nope } from './a.js';").err().unwrap();
    assert!(err.to_string().contains("nope"), "{}", err);
}

#[test]
fn test_unresolvable_module_fails_to_prepare() {
    let err = run_module(&[], "import './missing.js';").err().unwrap();
    assert!(err.to_string().contains("missing.js"), "{}", err);
}

#[test]
fn test_module_code_is_strict() {
    let mut interp = run_module(&[], "globalThis.out = (function () { return this; })() === undefined;").unwrap();
    assert_eq!(interp.get_global("out").unwrap(), JsValue::Boolean(true));
}

#[test]
fn test_module_namespace_from_host() {
    let mut interp = Interpreter::new();
    interp.prepare_module_named("entry", "export const answer = 42;").unwrap();
    run_to_completion(&mut interp).unwrap();
    let ns = interp.module_namespace("entry").unwrap().unwrap();
    let value = ns.borrow().get_own_data(&stepjs::PropertyKey::from("answer"));
    assert_eq!(value, Some(JsValue::Number(42.0)));
}
