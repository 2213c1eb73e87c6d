//! External reasoning model abstraction.
//!
//! The [`ReasoningModel`] trait decouples the model-assisted backend from the
//! actual model transport. [`CommandModel`] spawns a configured command (by
//! default `codex exec`) that reads the prompt on stdin and prints its reply on
//! stdout. Tests use scripted models that return canned replies.

use std::fmt;
use std::process::Command;
use std::time::Duration;

use anyhow::anyhow;
use tracing::{debug, info, instrument, warn};

use crate::error::BackendError;
use crate::io::config::ModelConfig;
use crate::io::process::run_with_timeout;

/// Parameters for one model call.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub prompt: String,
    pub timeout: Duration,
}

/// Abstraction over model transports. Returns the raw reply text.
pub trait ReasoningModel {
    fn complete(&self, request: &ModelRequest) -> Result<String, BackendError>;
}

/// Whether the model-assisted backend may be used for a run.
///
/// Resolved once, outside the planner, and passed in explicitly.
#[derive(Clone, PartialEq, Eq)]
pub enum ModelCapability {
    Available { credential: String },
    Unavailable,
}

impl ModelCapability {
    /// Read the configured credential variable from the process environment.
    pub fn detect(config: &ModelConfig) -> Self {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Resolve the capability through an arbitrary lookup (used by tests).
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(config: &ModelConfig, lookup: F) -> Self {
        match lookup(&config.credential_env) {
            Some(value) if !value.trim().is_empty() => Self::Available { credential: value },
            _ => Self::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

impl fmt::Debug for ModelCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available { .. } => f.write_str("Available { credential: <redacted> }"),
            Self::Unavailable => f.write_str("Unavailable"),
        }
    }
}

/// Model transport that spawns a child process per call.
pub struct CommandModel {
    command: Vec<String>,
    credential_env: String,
    credential: String,
    output_limit_bytes: usize,
}

impl CommandModel {
    pub fn new(config: &ModelConfig, credential: impl Into<String>) -> Self {
        Self {
            command: config.command.clone(),
            credential_env: config.credential_env.clone(),
            credential: credential.into(),
            output_limit_bytes: config.output_limit_bytes,
        }
    }
}

impl ReasoningModel for CommandModel {
    #[instrument(skip_all, fields(timeout_secs = request.timeout.as_secs(), prompt_bytes = request.prompt.len()))]
    fn complete(&self, request: &ModelRequest) -> Result<String, BackendError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| BackendError::Call(anyhow!("model command is empty")))?;
        info!(program = %program, "calling model command");

        let mut cmd = Command::new(program);
        cmd.args(args).env(&self.credential_env, &self.credential);

        let output = run_with_timeout(
            cmd,
            request.prompt.as_bytes(),
            request.timeout,
            self.output_limit_bytes,
        )
        .map_err(BackendError::Call)?;

        if output.timed_out {
            return Err(BackendError::Timeout(request.timeout));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "model command failed");
            let detail = output.stderr_tail().unwrap_or_default();
            return Err(BackendError::Call(anyhow!(
                "model command exited with status {:?}: {}",
                output.status.code(),
                detail
            )));
        }

        debug!(stdout_bytes = output.stdout.len(), "model command completed");
        Ok(output.stdout_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_requires_non_empty_credential() {
        let config = ModelConfig::default();
        let present = ModelCapability::from_lookup(&config, |name| {
            (name == "OPENAI_API_KEY").then(|| "sk-test".to_string())
        });
        assert!(present.is_available());

        let blank = ModelCapability::from_lookup(&config, |_| Some("  ".to_string()));
        assert_eq!(blank, ModelCapability::Unavailable);

        let missing = ModelCapability::from_lookup(&config, |_| None);
        assert!(!missing.is_available());
    }

    #[test]
    fn debug_output_redacts_credential() {
        let capability = ModelCapability::Available {
            credential: "sk-secret".to_string(),
        };
        assert!(!format!("{capability:?}").contains("sk-secret"));
    }

    #[cfg(unix)]
    #[test]
    fn command_model_passes_credential_and_prompt() {
        let config = ModelConfig {
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "printf '%s:' \"$AGENT_TEST_KEY\"; cat".to_string(),
            ],
            credential_env: "AGENT_TEST_KEY".to_string(),
            ..ModelConfig::default()
        };
        let model = CommandModel::new(&config, "k1");
        let reply = model
            .complete(&ModelRequest {
                prompt: "ping".to_string(),
                timeout: Duration::from_secs(5),
            })
            .expect("complete");
        assert_eq!(reply, "k1:ping");
    }

    #[cfg(unix)]
    #[test]
    fn command_model_reports_failure_status() {
        let config = ModelConfig {
            command: vec!["sh".to_string(), "-c".to_string(), "echo boom >&2; exit 4".to_string()],
            ..ModelConfig::default()
        };
        let model = CommandModel::new(&config, "k");
        let err = model
            .complete(&ModelRequest {
                prompt: String::new(),
                timeout: Duration::from_secs(5),
            })
            .expect_err("should fail");
        assert!(err.to_string().contains("boom"));
    }
}
