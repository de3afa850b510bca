//! The step-driven host API: budgets, interrupts and queue draining

use super::{run_to_completion, s};
use stepjs::{Interpreter, JsError, JsValue, Runtime, RuntimeConfig, RuntimeResult, StepResult};
use stepjs::error::AbortReason;

fn aborted_with(result: Result<StepResult, JsError>) -> Option<AbortReason> {
    match result {
        Err(JsError::TaskAborted { reason, .. }) => Some(reason),
        _ => None,
    }
}

#[test]
fn test_step_returns_continue_until_done() {
    let mut interp = Interpreter::new();
    interp.prepare("let x = 1; x + 1").unwrap();
    let mut steps = 0;
    let result = loop {
        match interp.step().unwrap() {
            StepResult::Continue => steps += 1,
            other => break other,
        }
    };
    assert!(steps > 1);
    match result {
        StepResult::Complete(value) => assert_eq!(value, JsValue::Number(2.0)),
        other => panic!("expected Complete, got {:?}", other),
    }
}

#[test]
fn test_step_without_work_is_done() {
    let mut interp = Interpreter::new();
    assert!(matches!(interp.step().unwrap(), StepResult::Done));
}

#[test]
fn test_completion_value_is_reported_once() {
    let mut interp = Interpreter::new();
    interp.prepare("'first'").unwrap();
    assert!(matches!(run_to_completion(&mut interp).unwrap(), StepResult::Complete(_)));
    assert!(matches!(interp.step().unwrap(), StepResult::Done));
}

#[test]
fn test_state_persists_across_prepares() {
    let mut interp = Interpreter::new();
    interp.prepare("var counter = 1; let lexical = 10;").unwrap();
    run_to_completion(&mut interp).unwrap();
    interp.prepare("counter += lexical; counter").unwrap();
    match run_to_completion(&mut interp).unwrap() {
        StepResult::Complete(value) => assert_eq!(value, JsValue::Number(11.0)),
        other => panic!("expected Complete, got {:?}", other),
    }
}

#[test]
fn test_redeclaring_lexical_global_is_syntax_error() {
    let mut interp = Interpreter::new();
    interp.prepare("let taken = 1;").unwrap();
    run_to_completion(&mut interp).unwrap();
    interp.prepare("let taken = 2;").unwrap();
    let err = run_to_completion(&mut interp).unwrap_err();
    assert!(err.to_string().contains("SyntaxError"), "{}", err);
}

#[test]
fn test_step_limit_aborts_infinite_loop() {
    let mut interp = Interpreter::with_config(RuntimeConfig::default().with_max_steps(1_000));
    interp.prepare("while (true) {}").unwrap();
    assert_eq!(aborted_with(run_to_completion(&mut interp)), Some(AbortReason::StepLimit));
}

#[test]
fn test_abort_runs_finally_but_not_catch() {
    let mut interp = Interpreter::with_config(RuntimeConfig::default().with_max_steps(500));
    interp
        .prepare("var log = []; try { while (true) {} } catch (e) { log.push('catch'); } finally { log.push('finally'); }")
        .unwrap();
    assert_eq!(aborted_with(run_to_completion(&mut interp)), Some(AbortReason::StepLimit));
    let log = interp.get_global("log").unwrap();
    let JsValue::Object(log) = log else {
        panic!("log is not an array");
    };
    assert_eq!(log.borrow().get_own_data(&0u32.into()), Some(s("finally")));
    assert_eq!(log.borrow().get_own_data(&1u32.into()), None);
}

#[test]
fn test_native_loops_respect_budgets() {
    let mut interp = Interpreter::with_config(RuntimeConfig::default().with_max_steps(5_000));
    interp.prepare("Array.prototype.join.call({ length: 2 ** 32 - 1 })").unwrap();
    assert_eq!(aborted_with(run_to_completion(&mut interp)), Some(AbortReason::StepLimit));

    let mut interp = Interpreter::with_config(RuntimeConfig::default().with_task_timeout_ms(50));
    interp
        .prepare("var a = []; a.length = 2 ** 32 - 1; a.indexOf(1)")
        .unwrap();
    assert_eq!(aborted_with(run_to_completion(&mut interp)), Some(AbortReason::TaskTimeout));
}

#[test]
fn test_task_timeout() {
    let mut interp = Interpreter::with_config(RuntimeConfig::default().with_task_timeout_ms(20));
    interp.prepare("for (;;) {}").unwrap();
    assert_eq!(aborted_with(run_to_completion(&mut interp)), Some(AbortReason::TaskTimeout));
}

#[test]
fn test_interrupt_handle_aborts_next_step() {
    let mut interp = Interpreter::new();
    interp.prepare("for (;;) {}").unwrap();
    for _ in 0..50 {
        assert!(matches!(interp.step().unwrap(), StepResult::Continue));
    }
    let handle = interp.interrupt_handle();
    std::thread::spawn(move || handle.interrupt()).join().unwrap();
    assert_eq!(aborted_with(run_to_completion(&mut interp)), Some(AbortReason::Interrupted));
}

#[test]
fn test_budget_is_per_task() {
    let mut interp = Interpreter::with_config(RuntimeConfig::default().with_max_steps(2_000));
    interp
        .prepare("var done = 0; for (let i = 0; i < 5; i++) { Promise.resolve().then(() => { let n = 0; while (n < 20) n++; done++; }); }")
        .unwrap();
    run_to_completion(&mut interp).unwrap();
    assert_eq!(interp.get_global("done").unwrap(), JsValue::Number(5.0));
}

#[test]
fn test_queue_survives_aborted_task() {
    let mut interp = Interpreter::with_config(RuntimeConfig::default().with_max_steps(300));
    interp.prepare("for (;;) {}").unwrap();
    interp.prepare("var after = 'ran';").unwrap();
    assert!(aborted_with(run_to_completion(&mut interp)).is_some());
    run_to_completion(&mut interp).unwrap();
    assert_eq!(interp.get_global("after").unwrap(), s("ran"));
}

#[test]
fn test_enqueue_call_runs_as_macrotask() {
    let mut interp = Interpreter::new();
    interp.prepare("var seen = []; function record(x) { seen.push(x); }").unwrap();
    run_to_completion(&mut interp).unwrap();
    let record = interp.get_global("record").unwrap();
    interp.enqueue_call(record.clone(), vec![JsValue::from("a")]);
    interp.enqueue_call(record, vec![JsValue::from("b")]);
    run_to_completion(&mut interp).unwrap();
    let JsValue::Object(seen) = interp.get_global("seen").unwrap() else {
        panic!("seen is not an array");
    };
    assert_eq!(seen.borrow().get_own_data(&1u32.into()), Some(s("b")));
}

#[test]
fn test_runtime_eval_and_config() {
    let config = RuntimeConfig::from_json(r#"{ "max_steps_per_task": 200 }"#).unwrap();
    let mut runtime = Runtime::with_config(config);
    assert_eq!(runtime.config().max_steps_per_task, 200);
    assert!(matches!(runtime.eval("while (true) {}"), Err(JsError::TaskAborted { .. })));

    runtime.config_mut().max_steps_per_task = 0;
    match runtime.eval("[1, 2, 3].length").unwrap() {
        RuntimeResult::Complete(value) => assert_eq!(value, JsValue::Number(3.0)),
        RuntimeResult::Suspended { .. } => panic!("unexpected suspension"),
    }
}

#[test]
fn test_strict_config_applies_to_scripts() {
    let mut runtime = Runtime::with_config(RuntimeConfig {
        strict: true,
        ..RuntimeConfig::default()
    });
    let err = runtime.eval_simple("undeclared = 1;").unwrap_err();
    assert!(err.to_string().contains("undeclared is not defined"), "{}", err);
}
