//! Model-assisted backend: prompts an external reasoning model and validates
//! its JSON replies against bundled schemas.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use jsonschema::{Draft, Validator};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::backend::{BackendKind, DecideRequest, ReasoningBackend, SynthesizeRequest};
use crate::core::budget::call_timeout;
use crate::core::types::Decision;
use crate::error::BackendError;
use crate::io::config::ModelConfig;
use crate::io::model::{ModelRequest, ReasoningModel};
use crate::io::prompt::{DecidePrompt, PromptEngine, SynthesizePrompt};

const DECISION_SCHEMA: &str = include_str!("../../schemas/decision.schema.json");
const SYNTHESIS_SCHEMA: &str = include_str!("../../schemas/synthesis.schema.json");

#[derive(Debug, Deserialize)]
struct SynthesisReply {
    summary: String,
}

pub struct ModelBackend<'a> {
    model: &'a dyn ReasoningModel,
    prompts: PromptEngine,
    decision_schema: Validator,
    synthesis_schema: Validator,
    call_timeout: Duration,
    deadline: Option<Instant>,
}

impl<'a> ModelBackend<'a> {
    /// Build a backend around `model`. Calls never outlive `deadline`.
    pub fn new(
        model: &'a dyn ReasoningModel,
        config: &ModelConfig,
        deadline: Option<Instant>,
    ) -> Result<Self> {
        Ok(Self {
            model,
            prompts: PromptEngine::new(config.prompt_budget_bytes),
            decision_schema: compile_schema(DECISION_SCHEMA).context("decision schema")?,
            synthesis_schema: compile_schema(SYNTHESIS_SCHEMA).context("synthesis schema")?,
            call_timeout: Duration::from_secs(config.call_timeout_secs),
            deadline,
        })
    }

    fn call(&self, prompt: String) -> Result<String, BackendError> {
        let timeout = call_timeout(self.call_timeout, self.deadline)
            .map_err(|_| BackendError::Timeout(Duration::ZERO))?;
        self.model.complete(&ModelRequest { prompt, timeout })
    }
}

impl ReasoningBackend for ModelBackend<'_> {
    fn kind(&self) -> BackendKind {
        BackendKind::Model
    }

    #[instrument(skip_all, fields(depth = request.task.depth, allow_decompose = request.allow_decompose))]
    fn decide(&self, request: &DecideRequest<'_>) -> Result<Decision, BackendError> {
        let prompt = self
            .prompts
            .render_decide(&DecidePrompt {
                goal: request.goal,
                task: &request.task.description,
                depth: request.task.depth,
                deepest_depth: request.max_depth.saturating_sub(1),
                remaining: request.remaining,
                allow_decompose: request.allow_decompose,
                max_subtasks: request.max_subtasks,
            })
            .map_err(BackendError::Call)?;

        let raw = self.call(prompt)?;
        let decision: Decision = parse_reply(&raw, &self.decision_schema)?;
        debug!(?decision, "model decision");

        match decision {
            Decision::Decompose { subtasks } => {
                if !request.allow_decompose {
                    warn!("model requested decomposition where only a direct answer is allowed");
                    return Err(BackendError::InvalidReply(
                        "decomposition requested where only a direct answer is allowed"
                            .to_string(),
                    ));
                }
                let subtasks: Vec<String> = subtasks
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if subtasks.is_empty() {
                    return Err(BackendError::InvalidReply(
                        "decomposition produced no subtasks".to_string(),
                    ));
                }
                Ok(Decision::Decompose { subtasks })
            }
            Decision::Solve { answer } => {
                let answer = answer.trim().to_string();
                if answer.is_empty() {
                    return Err(BackendError::InvalidReply("empty answer".to_string()));
                }
                Ok(Decision::Solve { answer })
            }
        }
    }

    #[instrument(skip_all, fields(depth = request.task.depth, children = request.child_results.len()))]
    fn synthesize(&self, request: &SynthesizeRequest<'_>) -> Result<String, BackendError> {
        let prompt = self
            .prompts
            .render_synthesize(&SynthesizePrompt {
                goal: request.goal,
                task: &request.task.description,
                results: request.child_results,
            })
            .map_err(BackendError::Call)?;

        let raw = self.call(prompt)?;
        let reply: SynthesisReply = parse_reply(&raw, &self.synthesis_schema)?;
        let summary = reply.summary.trim().to_string();
        if summary.is_empty() {
            return Err(BackendError::InvalidReply("empty summary".to_string()));
        }
        Ok(summary)
    }
}

fn compile_schema(raw: &str) -> Result<Validator> {
    let schema: Value = serde_json::from_str(raw).context("parse schema json")?;
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile json schema")
}

/// Extract, validate, and deserialize the JSON object in a model reply.
fn parse_reply<T: DeserializeOwned>(raw: &str, schema: &Validator) -> Result<T, BackendError> {
    let value = extract_json_object(raw)
        .ok_or_else(|| BackendError::InvalidReply("no JSON object in reply".to_string()))?;
    let messages: Vec<String> = schema
        .iter_errors(&value)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(BackendError::InvalidReply(format!(
            "schema validation failed: {}",
            messages.join("; ")
        )));
    }
    serde_json::from_value(value).map_err(|err| BackendError::InvalidReply(err.to_string()))
}

/// Models sometimes wrap JSON in prose or code fences. Accept, in order: the
/// whole reply, the last line holding an object, or the outermost braces.
fn extract_json_object(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    for line in trimmed.lines().rev() {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(line.trim()) {
            return Some(value);
        }
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end])
        .ok()
        .filter(Value::is_object)
}
