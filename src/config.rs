//! Runtime configuration

use serde::{Deserialize, Serialize};

use crate::error::JsError;

/// Budgets and evaluation defaults for an [`Interpreter`](crate::Interpreter).
///
/// Zero disables a limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Wall-clock limit for a single task, in milliseconds
    pub task_timeout_ms: u64,
    /// Wall-clock limit since the first `prepare`, in milliseconds
    pub session_timeout_ms: u64,
    /// Maximum number of frame dispatches per task
    pub max_steps_per_task: u64,
    /// Steps an aborted task may spend running `finally` blocks
    pub abort_grace_steps: u64,
    /// Evaluate scripts as strict mode code
    pub strict: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            task_timeout_ms: 3000,
            session_timeout_ms: 0,
            max_steps_per_task: 0,
            abort_grace_steps: 10_000,
            strict: false,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(text: &str) -> Result<Self, JsError> {
        serde_json::from_str(text)
            .map_err(|e| JsError::type_error(format!("Invalid runtime configuration: {}", e)))
    }

    pub fn with_task_timeout_ms(mut self, ms: u64) -> Self {
        self.task_timeout_ms = ms;
        self
    }

    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps_per_task = steps;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.task_timeout_ms, 3000);
        assert_eq!(config.max_steps_per_task, 0);
        assert!(!config.strict);
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config = RuntimeConfig::from_json(r#"{ "max_steps_per_task": 500, "strict": true }"#).unwrap();
        assert_eq!(config.max_steps_per_task, 500);
        assert!(config.strict);
        assert_eq!(config.abort_grace_steps, 10_000);
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        assert!(RuntimeConfig::from_json("{ \"task_timeout_ms\": \"soon\" }").is_err());
    }
}
