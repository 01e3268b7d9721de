//! Interpreter configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits and name-handling options for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Maximum procedure nesting depth.
    pub max_call_depth: usize,
    /// Optional bound on executed statements.
    pub max_steps: Option<u64>,
    /// Granularity of the cooperative `pause` sleep, in milliseconds.
    pub pause_slice_ms: u64,
    /// Treat `Size` and `size` as different names.
    pub case_sensitive_names: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 512,
            max_steps: None,
            pause_slice_ms: 10,
            case_sensitive_names: false,
        }
    }
}

impl InterpreterConfig {
    /// Load from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn pause_slice(&self) -> Duration {
        Duration::from_millis(self.pause_slice_ms)
    }

    /// Canonical form of an identifier: Logo sigils (`:x`, `"x`) are
    /// stripped and, unless names are case-sensitive, the rest lower-cased.
    pub fn canonical_name(&self, raw: &str) -> String {
        let bare = raw.strip_prefix([':', '"']).unwrap_or(raw);
        if self.case_sensitive_names {
            bare.to_string()
        } else {
            bare.to_lowercase()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InterpreterConfig::default();
        assert_eq!(config.max_call_depth, 512);
        assert_eq!(config.max_steps, None);
        assert_eq!(config.pause_slice(), Duration::from_millis(10));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = InterpreterConfig::from_json(r#"{"max_steps": 1000}"#).unwrap();
        assert_eq!(config.max_steps, Some(1000));
        assert_eq!(config.max_call_depth, 512);
        assert!(!config.case_sensitive_names);
    }

    #[test]
    fn test_canonical_name() {
        let config = InterpreterConfig::default();
        assert_eq!(config.canonical_name(":Size"), "size");
        assert_eq!(config.canonical_name("\"Count"), "count");
        assert_eq!(config.canonical_name("X"), "x");

        let strict = InterpreterConfig {
            case_sensitive_names: true,
            ..InterpreterConfig::default()
        };
        assert_eq!(strict.canonical_name(":Size"), "Size");
    }
}
