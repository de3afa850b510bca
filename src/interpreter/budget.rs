//! Task budgets: wall-clock timeouts, step limits and host interrupts

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::config::RuntimeConfig;
use crate::error::{AbortReason, JsError};

/// Wall-clock deadlines are only sampled every this many steps
const CLOCK_SAMPLE_INTERVAL: u64 = 64;

/// Thread-safe handle a host can use to stop a running task.
///
/// The abort is observed at the next step boundary.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}

/// Step and time accounting for the running task
#[derive(Debug, Default)]
pub struct Budget {
    interrupt: InterruptHandle,
    session_started: Option<Instant>,
    task_started: Option<Instant>,
    steps: u64,
    /// Set once an abort has been signalled for the current task
    abort: Option<AbortReason>,
    grace_used: u64,
}

impl Budget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// The session clock starts at the first prepare and never resets
    pub fn start_session(&mut self) {
        if self.session_started.is_none() {
            self.session_started = Some(Instant::now());
        }
    }

    pub fn start_task(&mut self) {
        self.task_started = Some(Instant::now());
        self.steps = 0;
        self.abort = None;
        self.grace_used = 0;
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// The abort signalled for the current task, if any
    pub fn aborted(&self) -> Option<AbortReason> {
        self.abort
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.task_started
            .map(|start| start.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    /// Count one step. Returns a reason the first time a budget runs out.
    pub fn tick(&mut self, config: &RuntimeConfig) -> Option<AbortReason> {
        self.steps += 1;
        if self.abort.is_some() {
            return None;
        }
        let reason = self.exhausted(config)?;
        self.abort = Some(reason);
        Some(reason)
    }

    fn exhausted(&self, config: &RuntimeConfig) -> Option<AbortReason> {
        if self.interrupt.take() {
            return Some(AbortReason::Interrupted);
        }
        if config.max_steps_per_task > 0 && self.steps > config.max_steps_per_task {
            return Some(AbortReason::StepLimit);
        }
        if self.steps % CLOCK_SAMPLE_INTERVAL != 1 {
            return None;
        }
        if config.task_timeout_ms > 0
            && let Some(start) = self.task_started
            && start.elapsed().as_millis() as u64 > config.task_timeout_ms
        {
            return Some(AbortReason::TaskTimeout);
        }
        if config.session_timeout_ms > 0
            && let Some(start) = self.session_started
            && start.elapsed().as_millis() as u64 > config.session_timeout_ms
        {
            return Some(AbortReason::SessionTimeout);
        }
        None
    }

    /// The abort error for the current task
    pub fn abort_error(&self, reason: AbortReason) -> JsError {
        JsError::TaskAborted {
            reason,
            elapsed_ms: self.elapsed_ms(),
        }
    }

    /// Spend one step of the abort grace period. False once it is used up.
    pub fn consume_grace(&mut self, config: &RuntimeConfig) -> bool {
        self.grace_used += 1;
        self.grace_used <= config.abort_grace_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_limit_fires_once() {
        let config = RuntimeConfig::default().with_max_steps(3);
        let mut budget = Budget::new();
        budget.start_task();
        assert_eq!(budget.tick(&config), None);
        assert_eq!(budget.tick(&config), None);
        assert_eq!(budget.tick(&config), None);
        assert_eq!(budget.tick(&config), Some(AbortReason::StepLimit));
        assert_eq!(budget.tick(&config), None);
        budget.start_task();
        assert_eq!(budget.tick(&config), None);
    }

    #[test]
    fn test_interrupt_is_observed_and_cleared() {
        let config = RuntimeConfig::default();
        let mut budget = Budget::new();
        budget.start_task();
        let handle = budget.interrupt_handle();
        handle.interrupt();
        assert!(handle.is_interrupted());
        assert_eq!(budget.tick(&config), Some(AbortReason::Interrupted));
        assert!(!handle.is_interrupted());
    }

    #[test]
    fn test_grace_period() {
        let config = RuntimeConfig {
            abort_grace_steps: 2,
            ..RuntimeConfig::default()
        };
        let mut budget = Budget::new();
        assert!(budget.consume_grace(&config));
        assert!(budget.consume_grace(&config));
        assert!(!budget.consume_grace(&config));
    }
}
