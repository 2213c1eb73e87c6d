//! JSON request envelope: `{goal, maxDepth, maxIterations}` in,
//! `{status: "ok", run}` or `{message}` out.

use anyhow::anyhow;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::core::limits::LimitsInput;
use crate::error::AgentError;
use crate::exit_codes;
use crate::io::config::AgentConfig;
use crate::io::model::ModelCapability;
use crate::run::{AgentRun, Orchestrator};

/// A decoded request. Limit fields keep their numeric coercion only when finite.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRequest {
    pub goal: String,
    pub limits: LimitsInput,
}

impl AgentRequest {
    /// Decode a request payload. Non-string goals decode as empty; a `null`
    /// body has no fields to read and is a fault.
    pub fn from_value(payload: &Value) -> Result<Self, AgentError> {
        let Value::Object(fields) = payload else {
            return match payload {
                Value::Null => Err(AgentError::InternalFault(anyhow!(
                    "cannot read 'goal' from a null request body"
                ))),
                _ => Ok(Self {
                    goal: String::new(),
                    limits: LimitsInput::default(),
                }),
            };
        };
        let goal = fields
            .get("goal")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        let limits = LimitsInput::new(
            fields.get("maxDepth").and_then(coerce_number),
            fields.get("maxIterations").and_then(coerce_number),
        );
        Ok(Self { goal, limits })
    }
}

/// Response envelope written by `agent request`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AgentResponse {
    Ok { status: &'static str, run: Box<AgentRun> },
    Failed { message: String },
}

impl AgentResponse {
    fn ok(run: AgentRun) -> Self {
        Self::Ok {
            status: "ok",
            run: Box::new(run),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Handle one raw JSON request. Returns the exit code and the response body.
pub fn handle_request(
    raw: &str,
    config: &AgentConfig,
    capability: ModelCapability,
) -> (i32, AgentResponse) {
    let payload: Value = match serde_json::from_str(raw) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "unparseable request body");
            return (
                exit_codes::FAULT,
                AgentResponse::failed(format!("invalid request body: {err}")),
            );
        }
    };

    let result = AgentRequest::from_value(&payload).and_then(|request| {
        Orchestrator::new(config.clone(), capability).run(&request.goal, &request.limits)
    });
    match result {
        Ok(run) => (exit_codes::OK, AgentResponse::ok(run)),
        Err(err) => (exit_code_for(&err), AgentResponse::failed(err.to_string())),
    }
}

/// Map an agent error to its CLI exit code.
pub fn exit_code_for(err: &AgentError) -> i32 {
    match err {
        AgentError::InvalidInput(_) => exit_codes::INVALID,
        AgentError::InternalFault(_) => exit_codes::FAULT,
    }
}

/// Loose numeric coercion for limit fields: numbers pass through, numeric
/// strings parse (blank counts as 0), booleans are 0/1, null is 0. Arrays go
/// through their string form: `[]` is 0, `[x]` coerces `x`, longer arrays are
/// not numbers. Objects, or a non-finite result, are treated as absent.
fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_numeric(s)?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [item] => coerce_array_item(item)?,
            _ => return None,
        },
        Value::Object(_) => return None,
    };
    number.is_finite().then_some(number)
}

/// A lone array element stringifies before it is parsed, so `null` reads as
/// blank and booleans are not numbers.
fn coerce_array_item(item: &Value) -> Option<f64> {
    match item {
        Value::Null => Some(0.0),
        Value::Number(_) | Value::Array(_) => coerce_number(item),
        Value::String(s) => parse_numeric(s),
        Value::Bool(_) | Value::Object(_) => None,
    }
}

fn parse_numeric(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0.0);
    }
    raw.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_loose_numbers() {
        assert_eq!(coerce_number(&json!(3)), Some(3.0));
        assert_eq!(coerce_number(&json!(" 4.5 ")), Some(4.5));
        assert_eq!(coerce_number(&json!("")), Some(0.0));
        assert_eq!(coerce_number(&json!(true)), Some(1.0));
        assert_eq!(coerce_number(&Value::Null), Some(0.0));
        assert_eq!(coerce_number(&json!("deep")), None);
        assert_eq!(coerce_number(&json!("inf")), None);
        assert_eq!(coerce_number(&json!({ "n": 2 })), None);
    }

    #[test]
    fn coerces_arrays_through_their_string_form() {
        assert_eq!(coerce_number(&json!([])), Some(0.0));
        assert_eq!(coerce_number(&json!([2])), Some(2.0));
        assert_eq!(coerce_number(&json!(["5"])), Some(5.0));
        assert_eq!(coerce_number(&json!([[3]])), Some(3.0));
        assert_eq!(coerce_number(&json!([null])), Some(0.0));
        assert_eq!(coerce_number(&json!([true])), None);
        assert_eq!(coerce_number(&json!([1, 2])), None);

        let request = AgentRequest::from_value(&json!({
            "goal": "Plan a 2-day offsite",
            "maxDepth": [2],
            "maxIterations": [1, 2],
        }))
        .expect("decode");
        assert_eq!(request.limits, LimitsInput::new(Some(2.0), None));
    }

    #[test]
    fn decodes_request_fields() {
        let request = AgentRequest::from_value(&json!({
            "goal": "  Plan a 2-day offsite  ",
            "maxDepth": "2",
            "maxIterations": 8,
        }))
        .expect("decode");
        assert_eq!(request.goal, "Plan a 2-day offsite");
        assert_eq!(request.limits, LimitsInput::new(Some(2.0), Some(8.0)));

        let request = AgentRequest::from_value(&json!({ "goal": 7 })).expect("decode");
        assert_eq!(request.goal, "");
        assert_eq!(request.limits, LimitsInput::default());
    }

    #[test]
    fn missing_goal_is_rejected_with_invalid_code() {
        let (code, response) = handle_request(
            r#"{"maxDepth": 2}"#,
            &AgentConfig::default(),
            ModelCapability::Unavailable,
        );
        assert_eq!(code, exit_codes::INVALID);
        let body = serde_json::to_value(&response).expect("serialize");
        assert_eq!(body, json!({ "message": "Goal is required" }));
    }

    #[test]
    fn unparseable_body_is_a_fault() {
        let (code, response) = handle_request(
            "{not json",
            &AgentConfig::default(),
            ModelCapability::Unavailable,
        );
        assert_eq!(code, exit_codes::FAULT);
        assert!(matches!(response, AgentResponse::Failed { .. }));
    }

    #[test]
    fn null_body_is_a_fault() {
        let (code, response) =
            handle_request("null", &AgentConfig::default(), ModelCapability::Unavailable);
        assert_eq!(code, exit_codes::FAULT);
        let body = serde_json::to_value(&response).expect("serialize");
        assert!(
            body["message"]
                .as_str()
                .is_some_and(|m| m.contains("null request body"))
        );
    }

    #[test]
    fn non_object_body_is_missing_its_goal() {
        for raw in ["[1, 2]", "\"Plan a 2-day offsite\"", "42"] {
            let (code, response) =
                handle_request(raw, &AgentConfig::default(), ModelCapability::Unavailable);
            assert_eq!(code, exit_codes::INVALID, "{raw}");
            let body = serde_json::to_value(&response).expect("serialize");
            assert_eq!(body, json!({ "message": "Goal is required" }));
        }
    }

    #[test]
    fn successful_request_wraps_run() {
        let (code, response) = handle_request(
            r#"{"goal": "Plan a 2-day offsite", "maxDepth": 2, "maxIterations": 8}"#,
            &AgentConfig::default(),
            ModelCapability::Unavailable,
        );
        assert_eq!(code, exit_codes::OK);
        let body = serde_json::to_value(&response).expect("serialize");
        assert_eq!(body["status"], "ok");
        assert_eq!(body["run"]["goal"], "Plan a 2-day offsite");
        assert_eq!(body["run"]["usedModel"], false);
    }
}
