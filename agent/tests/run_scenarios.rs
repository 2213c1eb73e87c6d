use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use agent::core::types::EntryKind;
use agent::test_support::{
    FailingModel, ScriptedModel, decompose_reply, solve_reply, summary_reply,
};
use agent::{
    AgentConfig, AgentError, AgentRun, CancelFlag, LimitsInput, ModelCapability, Orchestrator,
    run_self_calling_agent,
};

fn heuristic_run(goal: &str, max_depth: f64, max_iterations: f64) -> AgentRun {
    run_self_calling_agent(
        goal,
        &LimitsInput::new(Some(max_depth), Some(max_iterations)),
        &AgentConfig::default(),
        ModelCapability::Unavailable,
    )
    .expect("heuristic run")
}

fn model_orchestrator(model: impl agent::io::model::ReasoningModel + 'static) -> Orchestrator {
    Orchestrator::new(
        AgentConfig::default(),
        ModelCapability::Available {
            credential: "test-key".to_string(),
        },
    )
    .with_model(Box::new(model))
}

fn count(run: &AgentRun, kind: EntryKind) -> usize {
    run.steps.iter().filter(|s| s.kind == kind).count()
}

#[test]
fn offsite_goal_without_model_stays_within_limits() {
    let run = heuristic_run("Plan a 2-day offsite", 2.0, 8.0);

    assert!(!run.used_model);
    assert!(run.completed);
    assert_eq!(run.steps[0].kind, EntryKind::Goal);
    assert_eq!(run.steps[0].depth, 0);
    assert!(run.depth_reached <= 2);
    assert!(run.iterations <= 8);
    assert!(!run.conclusion.trim().is_empty());
}

#[test]
fn empty_goal_is_rejected() {
    let err = run_self_calling_agent(
        " \n\t ",
        &LimitsInput::default(),
        &AgentConfig::default(),
        ModelCapability::Unavailable,
    )
    .expect_err("empty goal");
    assert!(matches!(err, AgentError::InvalidInput(_)));
}

#[test]
fn multi_clause_goal_decomposes_one_level() {
    let run = heuristic_run(
        "Research venues, book a lodge and plan the agenda",
        2.0,
        8.0,
    );

    // Root decide, three leaf solves, one synthesis.
    assert_eq!(run.iterations, 5);
    assert_eq!(run.depth_reached, 1);
    assert_eq!(count(&run, EntryKind::Observation), 3);
    let decomposing = run
        .steps
        .iter()
        .find(|s| s.kind == EntryKind::Action && s.message.starts_with("Decomposing"))
        .expect("decomposition action");
    assert_eq!(decomposing.depth, 0);
    assert!(run.conclusion.contains("1. "));
    assert!(run.conclusion.contains("3. "));
}

#[test]
fn depth_one_never_decomposes() {
    let run = heuristic_run(
        "Research venues, book a lodge and plan the agenda",
        1.0,
        12.0,
    );

    assert_eq!(run.depth_reached, 0);
    assert_eq!(run.iterations, 1);
    assert!(
        run.steps
            .iter()
            .all(|s| !s.message.starts_with("Decomposing"))
    );
}

#[test]
fn single_iteration_yields_one_thought_action_result() {
    let run = heuristic_run(
        "Research venues, book a lodge and plan the agenda",
        4.0,
        1.0,
    );

    assert_eq!(run.iterations, 1);
    assert_eq!(count(&run, EntryKind::Thought), 1);
    assert_eq!(count(&run, EntryKind::Action), 1);
    assert_eq!(count(&run, EntryKind::Result), 1);
    assert!(!run.conclusion.is_empty());
}

#[test]
fn out_of_range_limits_are_clamped() {
    let run = heuristic_run(
        "Gather requirements; draft a schedule; confirm the budget with finance",
        0.0,
        -5.0,
    );
    assert_eq!(run.iterations, 1);
    assert_eq!(run.depth_reached, 0);

    let run = run_self_calling_agent(
        "Gather requirements; draft a schedule; confirm the budget with finance",
        &LimitsInput::new(Some(f64::NAN), Some(f64::INFINITY)),
        &AgentConfig::default(),
        ModelCapability::Unavailable,
    )
    .expect("run");
    assert!(run.depth_reached < 3);
    assert!(run.iterations <= 12);
}

#[test]
fn heuristic_runs_are_deterministic() {
    let goal = "Collect survey answers, then summarize the themes and share them with the team";
    let first = heuristic_run(goal, 3.0, 12.0);
    let second = heuristic_run(goal, 3.0, 12.0);

    let shape = |run: &AgentRun| {
        run.steps
            .iter()
            .map(|s| (s.kind, s.depth, s.message.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(shape(&first), shape(&second));
    assert_eq!(first.conclusion, second.conclusion);
    assert_eq!(first.iterations, second.iterations);
    assert_ne!(first.steps[0].id, second.steps[0].id);
}

#[test]
fn concurrent_runs_are_isolated() {
    let a = thread::spawn(|| heuristic_run("Plan a 2-day offsite", 2.0, 8.0));
    let b = thread::spawn(|| {
        heuristic_run("Research venues, book a lodge and plan the agenda", 3.0, 10.0)
    });
    let a = a.join().expect("thread a");
    let b = b.join().expect("thread b");

    let ids_a: HashSet<_> = a.steps.iter().map(|s| s.id.as_str()).collect();
    let ids_b: HashSet<_> = b.steps.iter().map(|s| s.id.as_str()).collect();
    assert!(ids_a.is_disjoint(&ids_b));
    assert_eq!(ids_a.len(), a.steps.len());
    assert_eq!(ids_b.len(), b.steps.len());

    assert_eq!(a.iterations, 1);
    assert_eq!(b.iterations, 5);
}

#[test]
fn model_assisted_run_decomposes_and_synthesizes() {
    let orchestrator = model_orchestrator(ScriptedModel::new(vec![
        decompose_reply(&["Pick a venue", "Draft the agenda"]),
        solve_reply("Venue: the lakeside lodge."),
        solve_reply("Agenda: strategy on day one, workshops on day two."),
        summary_reply("Book the lakeside lodge and run strategy then workshops."),
    ]));

    let run = orchestrator
        .run("Plan a 2-day offsite", &LimitsInput::new(Some(2.0), Some(8.0)))
        .expect("run");

    assert!(run.used_model);
    assert!(run.completed);
    assert_eq!(run.iterations, 4);
    assert_eq!(run.depth_reached, 1);
    assert_eq!(
        run.conclusion,
        "Book the lakeside lodge and run strategy then workshops."
    );
    assert_eq!(count(&run, EntryKind::Error), 0);
}

#[test]
fn failing_model_degrades_instead_of_aborting() {
    let run = model_orchestrator(FailingModel)
        .run("Plan a 2-day offsite", &LimitsInput::new(Some(2.0), Some(4.0)))
        .expect("run still succeeds");

    assert!(run.used_model);
    assert!(run.completed);
    assert_eq!(count(&run, EntryKind::Error), 1);
    assert!(run.conclusion.contains("open item"));
}

#[test]
fn cancelled_run_returns_partial_result() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    let run = Orchestrator::new(AgentConfig::default(), ModelCapability::Unavailable)
        .with_cancel_flag(cancel)
        .run("Plan a 2-day offsite", &LimitsInput::default())
        .expect("run");

    assert!(!run.completed);
    assert_eq!(run.iterations, 0);
    assert_eq!(count(&run, EntryKind::Error), 1);
    assert!(run.conclusion.contains("was not completed"));
}

#[test]
fn expired_timeout_stops_the_run() {
    let run = Orchestrator::new(AgentConfig::default(), ModelCapability::Unavailable)
        .with_timeout(Duration::ZERO)
        .run("Plan a 2-day offsite", &LimitsInput::default())
        .expect("run");

    assert!(!run.completed);
    assert!(
        run.steps
            .iter()
            .any(|s| s.message.contains("run deadline exceeded"))
    );
}

#[test]
fn trace_invariants_hold_for_long_goals() {
    let goal = "Prepare a quarterly planning workshop for the engineering department including \
                remote participants across three time zones";
    for depth in 1..=6 {
        for iterations in [1.0, 2.0, 5.0, 12.0, 32.0] {
            let run = heuristic_run(goal, f64::from(depth), iterations);
            assert!(run.depth_reached < depth);
            assert!(f64::from(run.iterations) <= iterations);
            assert!(run.steps.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
            assert!(run.steps.iter().all(|s| s.depth <= run.depth_reached));
        }
    }
}
