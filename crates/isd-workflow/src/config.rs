//! Engine configuration
use serde::{Deserialize, Serialize};

use isd_core::IsdError;

/// Tunables for one engine instance. Retry, timeout and provider
/// settings are configuration, never hard-coded in the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Agent identity stamped on artifacts (e.g. "addie", "rpisd").
    pub agent_id: String,
    /// Model behind the tool backend, recorded in run metadata.
    pub model_name: String,
    /// Provider label for concurrency gating.
    pub provider: String,
    /// Backend attempts per tool call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff between attempts; doubles per retry.
    #[serde(default = "default_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Deadline per backend attempt.
    #[serde(default = "default_tool_timeout_ms")]
    pub tool_timeout_ms: u64,
    /// Soft deadline per stage, checked between tool calls.
    #[serde(default = "default_stage_timeout_ms")]
    pub stage_timeout_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_tool_timeout_ms() -> u64 {
    30_000
}

fn default_stage_timeout_ms() -> u64 {
    180_000
}

impl EngineConfig {
    pub fn for_agent(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            model_name: "unspecified".to_string(),
            provider: "default".to_string(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_backoff_ms(),
            tool_timeout_ms: default_tool_timeout_ms(),
            stage_timeout_ms: default_stage_timeout_ms(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>, provider: impl Into<String>) -> Self {
        self.model_name = model.into();
        self.provider = provider.into();
        self
    }

    /// Load configuration from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, IsdError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| IsdError::InputValidation(format!("engine config parse: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::for_agent("addie");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_backoff_ms, 500);
    }

    #[test]
    fn test_from_yaml_with_defaults() {
        let yaml = r#"
agent_id: rpisd
model_name: solar-pro2
provider: upstage
max_attempts: 2
"#;
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.agent_id, "rpisd");
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.tool_timeout_ms, 30_000);
    }

    #[test]
    fn test_from_yaml_rejects_garbage() {
        let err = EngineConfig::from_yaml(": not yaml :").unwrap_err();
        assert_eq!(err.category(), "input_validation_error");
    }
}
