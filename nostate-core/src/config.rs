//! Runtime configuration.

use serde::{Deserialize, Serialize};

/// Settings for one [`Runtime`](crate::Runtime).
///
/// Deserializable so an embedding layer can keep it next to its own
/// settings:
///
/// ```
/// use nostate_core::RuntimeConfig;
///
/// let config: RuntimeConfig = serde_json::from_str(r#"{ "name": "todos" }"#).unwrap();
/// assert_eq!(config.name, "todos");
/// assert!(!config.start_unlocked);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Label attached to every log event of the runtime.
    pub name: String,

    /// Open the mutation lock at construction. Meant for test harnesses
    /// that mutate shared state without going through a reducer.
    pub start_unlocked: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            name: "nostate".to_string(),
            start_unlocked: false,
        }
    }
}

impl RuntimeConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_the_lock_closed() {
        let config = RuntimeConfig::default();
        assert_eq!(config.name, "nostate");
        assert!(!config.start_unlocked);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{ "start_unlocked": true }"#).unwrap();
        assert_eq!(config.name, "nostate");
        assert!(config.start_unlocked);

        let round = serde_json::to_string(&RuntimeConfig::named("x")).unwrap();
        assert_eq!(round, r#"{"name":"x","start_unlocked":false}"#);
    }
}
