//! Deterministic decomposition rules used when no reasoning model is configured.
//!
//! Rule, applied in order:
//! 1. Split the task into clauses on `;`, line breaks, sentence ends, `then`,
//!    `and`, and commas. Clauses shorter than [`MIN_CLAUSE_WORDS`] are folded
//!    into a neighbour. Two or more clauses decompose into those clauses.
//! 2. A single-clause root task of at least [`LONG_TASK_WORDS`] words
//!    decomposes into three phases (background, plan, checkpoints).
//! 3. Anything else is solved directly from an intent template.
//!
//! Every function here is a pure function of its arguments.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::Decision;

/// Minimum words a clause needs to stand on its own as a subtask.
pub const MIN_CLAUSE_WORDS: usize = 2;
/// Word count at which a single-clause root task is split into phases.
pub const LONG_TASK_WORDS: usize = 12;

static CLAUSE_DELIMITER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(?:;|\n+|[.!?](?:\s+|$)|,?\s*\bthen\s+|,?\s+and\s+|,)\s*")
        .expect("clause delimiter regex")
});

/// Decide whether to decompose `task` or answer it directly.
///
/// `allow_decompose` carries the planner's depth and budget verdict; when it is
/// false the result is always [`Decision::Solve`].
pub fn decide(task: &str, depth: u32, allow_decompose: bool) -> Decision {
    if allow_decompose {
        let clauses = split_clauses(task);
        if clauses.len() >= 2 {
            return Decision::Decompose { subtasks: clauses };
        }
        if depth == 0 && word_count(task) >= LONG_TASK_WORDS {
            return Decision::Decompose {
                subtasks: phase_subtasks(task),
            };
        }
    }
    Decision::Solve {
        answer: solve(task),
    }
}

/// Split text into clauses, folding fragments shorter than [`MIN_CLAUSE_WORDS`].
pub fn split_clauses(text: &str) -> Vec<String> {
    let text = text.trim();
    let mut segments: Vec<(usize, usize)> = Vec::new();
    let mut start = 0;
    for delimiter in CLAUSE_DELIMITER.find_iter(text) {
        if delimiter.start() > start {
            segments.push((start, delimiter.start()));
        }
        start = delimiter.end();
    }
    if start < text.len() {
        segments.push((start, text.len()));
    }

    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut pending: Option<(usize, usize)> = None;
    for (seg_start, seg_end) in segments {
        let span = match pending.take() {
            Some((open_start, _)) => (open_start, seg_end),
            None => (seg_start, seg_end),
        };
        if word_count(&text[span.0..span.1]) >= MIN_CLAUSE_WORDS {
            spans.push(span);
        } else {
            pending = Some(span);
        }
    }
    if let Some((_, tail_end)) = pending {
        match spans.last_mut() {
            Some(last) => last.1 = tail_end,
            None => spans.push((0, tail_end)),
        }
    }

    spans
        .into_iter()
        .map(|(start, end)| clean_clause(&text[start..end]))
        .filter(|clause| !clause.is_empty())
        .collect()
}

/// Fixed three-phase split for long single-clause goals.
pub fn phase_subtasks(task: &str) -> Vec<String> {
    let subject = clean_clause(task);
    vec![
        format!("Gather background on {subject}"),
        format!("Draft a step-by-step plan for {subject}"),
        format!("Define checkpoints that confirm progress on {subject}"),
    ]
}

/// Templated direct answer keyed on the task's leading verb.
pub fn solve(task: &str) -> String {
    let subject = clean_clause(task);
    match Intent::of(&subject) {
        Intent::Research => format!(
            "For \"{subject}\": pick two or three reliable sources, note the core concepts each one \
             covers, then write a short summary in your own words."
        ),
        Intent::Plan => format!(
            "For \"{subject}\": state the objective, block out the time it needs, list the \
             resources required, and assign an owner with a review date."
        ),
        Intent::Build => format!(
            "For \"{subject}\": produce a first version, check it against the intended outcome, \
             and refine the weakest part before calling it finished."
        ),
        Intent::General => format!(
            "For \"{subject}\": define what done looks like, take the smallest concrete action \
             toward it, and confirm the result before moving on."
        ),
    }
}

/// Numbered merge of child results under a heading naming the task.
pub fn synthesize(task: &str, child_results: &[String]) -> String {
    let mut out = format!("Combined result for \"{}\":", clean_clause(task));
    if child_results.is_empty() {
        out.push_str("\n(no subtask results)");
        return out;
    }
    for (idx, result) in child_results.iter().enumerate() {
        let mut lines = result.trim().lines();
        let first = lines.next().unwrap_or_default();
        out.push_str(&format!("\n{}. {}", idx + 1, first));
        for line in lines {
            out.push_str(&format!("\n   {line}"));
        }
    }
    out
}

/// Placeholder answer used when a backend call fails.
pub fn degraded_answer(task: &str) -> String {
    format!(
        "No reliable answer was produced for \"{}\"; treat it as an open item to revisit.",
        clean_clause(task)
    )
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn clean_clause(text: &str) -> String {
    text.trim()
        .trim_end_matches(['.', '!', '?', ',', ';', ':'])
        .trim()
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Research,
    Plan,
    Build,
    General,
}

impl Intent {
    fn of(task: &str) -> Self {
        let first = task
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        match first.as_str() {
            "research" | "learn" | "study" | "investigate" | "explore" | "understand"
            | "find" | "compare" => Intent::Research,
            "plan" | "organize" | "organise" | "schedule" | "prepare" | "outline" | "design" => {
                Intent::Plan
            }
            "build" | "write" | "create" | "implement" | "draft" | "make" | "produce" => {
                Intent::Build
            }
            _ => Intent::General,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_goal_is_solved_directly() {
        let decision = decide("Plan a 2-day offsite", 0, true);
        let Decision::Solve { answer } = decision else {
            panic!("expected solve");
        };
        assert!(answer.contains("Plan a 2-day offsite"));
        assert!(answer.contains("assign an owner"));
    }

    #[test]
    fn coordinated_goal_splits_into_clauses() {
        let clauses = split_clauses("Book a venue, arrange catering and send the invitations.");
        assert_eq!(
            clauses,
            vec!["Book a venue", "arrange catering", "send the invitations"]
        );
    }

    #[test]
    fn single_word_fragments_fold_into_neighbours() {
        let clauses = split_clauses(
            "Research and outline a practical weekend plan for learning Rust, including resources and checkpoints.",
        );
        assert_eq!(
            clauses,
            vec![
                "Research and outline a practical weekend plan for learning Rust",
                "including resources and checkpoints",
            ]
        );
    }

    #[test]
    fn sentences_and_then_are_delimiters() {
        let clauses = split_clauses("Collect the logs. Then find the failing request; fix the handler");
        assert_eq!(
            clauses,
            vec!["Collect the logs", "find the failing request", "fix the handler"]
        );
    }

    #[test]
    fn long_single_clause_root_uses_phases() {
        let task = "Understand how the quarterly revenue numbers were computed for the northern region last year";
        let Decision::Decompose { subtasks } = decide(task, 0, true) else {
            panic!("expected decompose");
        };
        assert_eq!(subtasks.len(), 3);
        assert!(subtasks[0].starts_with("Gather background on Understand"));
    }

    #[test]
    fn long_single_clause_below_root_is_solved() {
        let task = "Understand how the quarterly revenue numbers were computed for the northern region last year";
        assert!(matches!(decide(task, 1, true), Decision::Solve { .. }));
    }

    #[test]
    fn disallowed_decomposition_always_solves() {
        let decision = decide("Book a venue, arrange catering and send invitations", 0, false);
        assert!(matches!(decision, Decision::Solve { .. }));
    }

    #[test]
    fn decide_is_deterministic() {
        let task = "Write the report and review it with the team";
        assert_eq!(decide(task, 0, true), decide(task, 0, true));
    }

    #[test]
    fn synthesize_numbers_and_indents_children() {
        let merged = synthesize(
            "Ship it.",
            &["first".to_string(), "second\nmore".to_string()],
        );
        assert_eq!(
            merged,
            "Combined result for \"Ship it\":\n1. first\n2. second\n   more"
        );
    }

    #[test]
    fn synthesize_without_children_notes_absence() {
        assert!(synthesize("x y", &[]).contains("no subtask results"));
    }

    #[test]
    fn intent_templates_follow_leading_verb() {
        assert!(solve("Research rust crates").contains("reliable sources"));
        assert!(solve("Write a blog post").contains("first version"));
        assert!(solve("Call the vendor").contains("define what done looks like"));
    }
}
