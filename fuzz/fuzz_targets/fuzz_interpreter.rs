#![no_main]

use libfuzzer_sys::fuzz_target;
use stepjs::{Interpreter, JsError, RuntimeConfig, StepResult};

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    if source.len() > 10_000 {
        return;
    }

    let config = RuntimeConfig::default().with_max_steps(100_000).with_task_timeout_ms(1_000);
    let mut interp = Interpreter::with_config(config);
    if interp.prepare(source).is_err() {
        return;
    }

    loop {
        match interp.step() {
            Ok(StepResult::Continue) => {}
            Ok(StepResult::Complete(_) | StepResult::Done | StepResult::Suspended { .. }) => break,
            Err(JsError::Internal(message)) => panic!("internal error: {}", message),
            // Thrown and aborted tasks leave later tasks queued
            Err(_) => {}
        }
    }
});
