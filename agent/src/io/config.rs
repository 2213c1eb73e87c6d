//! Agent configuration stored in a TOML file (default `agent.toml`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::limits::LimitPolicy;

/// Largest decomposition a decide reply may carry (`maxItems` in the decision schema).
pub const MAX_SUBTASKS_CEILING: u32 = 16;

/// Agent configuration (TOML).
///
/// Every field is optional in the file; missing fields take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Upper bound on subtasks accepted from a single decomposition.
    pub max_subtasks: u32,

    /// Trace messages longer than this are truncated.
    pub message_limit_bytes: usize,

    pub limits: LimitPolicy,

    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelConfig {
    /// Command that reads a prompt on stdin and prints a JSON reply on stdout.
    pub command: Vec<String>,

    /// Environment variable whose presence enables the model-assisted backend.
    /// Its value is forwarded to `command` under the same name.
    pub credential_env: String,

    /// Wall-clock limit for one model call, in seconds.
    pub call_timeout_secs: u64,

    /// Discard model stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Upper bound on rendered prompt size.
    pub prompt_budget_bytes: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "codex".to_string(),
                "exec".to_string(),
                "--skip-git-repo-check".to_string(),
                "-".to_string(),
            ],
            credential_env: "OPENAI_API_KEY".to_string(),
            call_timeout_secs: 120,
            output_limit_bytes: 100_000,
            prompt_budget_bytes: 20_000,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_subtasks: 4,
            message_limit_bytes: 2_000,
            limits: LimitPolicy::default(),
            model: ModelConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_subtasks == 0 || self.max_subtasks > MAX_SUBTASKS_CEILING {
            return Err(anyhow!(
                "max_subtasks must be between 1 and {MAX_SUBTASKS_CEILING}"
            ));
        }
        if self.message_limit_bytes < 64 {
            return Err(anyhow!("message_limit_bytes must be >= 64"));
        }
        let limit_errors = self.limits.violations();
        if !limit_errors.is_empty() {
            return Err(anyhow!("limits: {}", limit_errors.join("; ")));
        }
        self.model.validate()
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.command.is_empty() || self.command[0].trim().is_empty() {
            return Err(anyhow!("model.command must be a non-empty array"));
        }
        if self.credential_env.trim().is_empty() {
            return Err(anyhow!("model.credential_env must not be empty"));
        }
        if self.call_timeout_secs == 0 {
            return Err(anyhow!("model.call_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("model.output_limit_bytes must be > 0"));
        }
        if self.prompt_budget_bytes == 0 {
            return Err(anyhow!("model.prompt_budget_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("agent.toml");
        let cfg = AgentConfig {
            max_subtasks: 2,
            ..AgentConfig::default()
        };
        let raw = toml::to_string_pretty(&cfg).expect("serialize");
        fs::write(&path, raw).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("agent.toml");
        fs::write(&path, "[limits]\ndefault_max_depth = 2\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.limits.default_max_depth, 2);
        assert_eq!(cfg.limits.default_max_iterations, 12);
        assert_eq!(cfg.model.credential_env, "OPENAI_API_KEY");
    }

    #[test]
    fn invalid_file_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("agent.toml");
        fs::write(&path, "max_subtasks = 0\n").expect("write");
        let err = load_config(&path).expect_err("should fail");
        assert!(format!("{err:#}").contains("max_subtasks"));
    }

    #[test]
    fn max_subtasks_is_capped_at_schema_limit() {
        let at_cap = AgentConfig {
            max_subtasks: MAX_SUBTASKS_CEILING,
            ..AgentConfig::default()
        };
        assert!(at_cap.validate().is_ok());
        let over = AgentConfig {
            max_subtasks: MAX_SUBTASKS_CEILING + 1,
            ..AgentConfig::default()
        };
        let err = over.validate().expect_err("should fail");
        assert!(err.to_string().contains("max_subtasks"));
    }

    #[test]
    fn empty_model_command_is_invalid() {
        let cfg = ModelConfig {
            command: Vec::new(),
            ..ModelConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
