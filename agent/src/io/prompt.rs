//! Prompt rendering for model-assisted reasoning calls.

use anyhow::Result;
use minijinja::{Environment, context};
use tracing::debug;

const DECIDE_TEMPLATE: &str = include_str!("prompts/decide.md");
const SYNTHESIZE_TEMPLATE: &str = include_str!("prompts/synthesize.md");
const CLIP_MARKER: &str = " [truncated]";

/// Inputs for a decompose-or-solve prompt.
#[derive(Debug, Clone)]
pub struct DecidePrompt<'a> {
    pub goal: &'a str,
    pub task: &'a str,
    pub depth: u32,
    pub deepest_depth: u32,
    pub remaining: u32,
    pub allow_decompose: bool,
    pub max_subtasks: u32,
}

/// Inputs for a synthesis prompt.
#[derive(Debug, Clone)]
pub struct SynthesizePrompt<'a> {
    pub goal: &'a str,
    pub task: &'a str,
    pub results: &'a [String],
}

/// Template engine wrapper around minijinja with a byte budget.
#[derive(Debug)]
pub struct PromptEngine {
    env: Environment<'static>,
    budget_bytes: usize,
}

impl PromptEngine {
    pub fn new(budget_bytes: usize) -> Self {
        let mut env = Environment::new();
        env.add_template("decide", DECIDE_TEMPLATE)
            .expect("decide template should be valid");
        env.add_template("synthesize", SYNTHESIZE_TEMPLATE)
            .expect("synthesize template should be valid");
        Self { env, budget_bytes }
    }

    pub fn render_decide(&self, input: &DecidePrompt<'_>) -> Result<String> {
        let template = self.env.get_template("decide")?;
        let goal_budget = self.budget_bytes / 2;
        let rendered = template.render(context! {
            goal => clip(input.goal.trim(), goal_budget),
            task => clip(input.task.trim(), goal_budget),
            depth => input.depth,
            deepest_depth => input.deepest_depth,
            remaining => input.remaining,
            allow_decompose => input.allow_decompose,
            max_subtasks => input.max_subtasks,
        })?;
        Ok(rendered)
    }

    /// Render the synthesis prompt, clipping child results evenly when over budget.
    pub fn render_synthesize(&self, input: &SynthesizePrompt<'_>) -> Result<String> {
        let rendered = self.render_synthesize_with(input, input.results)?;
        if rendered.len() <= self.budget_bytes || input.results.is_empty() {
            return Ok(rendered);
        }

        let results_len: usize = input.results.iter().map(|r| r.trim().len()).sum();
        let frame_len = rendered.len().saturating_sub(results_len);
        let per_result = self.budget_bytes.saturating_sub(frame_len) / input.results.len();
        debug!(
            before = rendered.len(),
            budget = self.budget_bytes,
            per_result,
            "clipping subtask results for prompt budget"
        );
        let clipped: Vec<String> = input
            .results
            .iter()
            .map(|r| clip(r.trim(), per_result))
            .collect();
        self.render_synthesize_with(input, &clipped)
    }

    fn render_synthesize_with(
        &self,
        input: &SynthesizePrompt<'_>,
        results: &[String],
    ) -> Result<String> {
        let template = self.env.get_template("synthesize")?;
        let results: Vec<&str> = results.iter().map(|r| r.trim()).collect();
        let rendered = template.render(context! {
            goal => input.goal.trim(),
            task => input.task.trim(),
            results => results,
        })?;
        Ok(rendered)
    }
}

/// Cut `text` to at most `max` bytes on a char boundary, marking the cut.
fn clip(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut cut = max.saturating_sub(CLIP_MARKER.len());
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &text[..cut], CLIP_MARKER)
}
