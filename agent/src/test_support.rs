//! Test-only model fakes for driving the model-assisted backend.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::anyhow;

use crate::error::BackendError;
use crate::io::model::{ModelRequest, ReasoningModel};

/// Model that replays scripted replies in order and records every prompt.
pub struct ScriptedModel {
    replies: RefCell<VecDeque<Result<String, BackendError>>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, BackendError>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl ReasoningModel for ScriptedModel {
    fn complete(&self, request: &ModelRequest) -> Result<String, BackendError> {
        self.prompts.borrow_mut().push(request.prompt.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Call(anyhow!("scripted model exhausted"))))
    }
}

/// Model whose every call fails.
pub struct FailingModel;

impl ReasoningModel for FailingModel {
    fn complete(&self, _request: &ModelRequest) -> Result<String, BackendError> {
        Err(BackendError::Call(anyhow!("model unreachable")))
    }
}

/// Scripted `solve` reply.
pub fn solve_reply(answer: &str) -> Result<String, BackendError> {
    Ok(serde_json::json!({ "decision": "solve", "answer": answer }).to_string())
}

/// Scripted `decompose` reply.
pub fn decompose_reply(subtasks: &[&str]) -> Result<String, BackendError> {
    Ok(serde_json::json!({ "decision": "decompose", "subtasks": subtasks }).to_string())
}

/// Scripted synthesis reply.
pub fn summary_reply(summary: &str) -> Result<String, BackendError> {
    Ok(serde_json::json!({ "summary": summary }).to_string())
}
