//! End-to-end tests for the TFD plan solver.
//!
//! Each test builds a `FakeToolchain` (shell-script stand-ins for the three
//! TFD programs) and an isolated output directory, then drives the solver
//! through real child processes.

#![cfg(unix)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use tfd_core::pipeline::Stage;
use tfd_core::{
    DEFAULT_SOLVER_TIMEOUT, PlanItem, PlanSolver, SolverError, StandaloneHost, TfdPlanSolver,
};
use tfd_test_utils::FakeToolchain;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

const DOMAIN: &str = "\
(define (domain blocksworld)
  (:requirements :strips :durative-actions)
  (:predicates (clear ?x) (holding ?x)))";

const PROBLEM: &str = "\
(define (problem bw-1) (:domain blocksworld)
  (:objects a b)
  (:init (clear a) (clear b))
  (:goal (holding a)))";

const PLAN: &str = "\
0.000: (pick-up a) [1.500]
1.501: (stack a b) [1.000]
2.502: (pick-up c) [1.500]
";

fn solver_for(toolchain: &FakeToolchain, output_dir: &Path) -> TfdPlanSolver {
    let host = Arc::new(
        StandaloneHost::new("solver-test")
            .with_parameter("tfd.output_dir", output_dir.to_string_lossy()),
    );
    let mut solver = TfdPlanSolver::new();
    solver
        .configure_with_toolchain(host, "tfd", toolchain.config())
        .expect("configure should succeed");
    solver
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[tokio::test]
async fn solves_and_parses_plan_in_file_order() {
    let toolchain = FakeToolchain::with_plan(PLAN);
    let out = TempDir::new().unwrap();
    let solver = solver_for(&toolchain, out.path());

    let plan = solver
        .get_plan(DOMAIN, PROBLEM, "", DEFAULT_SOLVER_TIMEOUT)
        .await
        .expect("a plan should be found");

    assert_eq!(
        plan.items,
        vec![
            PlanItem::new(0.0, "pick-up a", 1.5),
            PlanItem::new(1.501, "stack a b", 1.0),
            PlanItem::new(2.502, "pick-up c", 1.5),
        ]
    );
}

#[tokio::test]
async fn stages_receive_explicit_paths_and_fixed_search_flags() {
    let toolchain = FakeToolchain::with_plan(PLAN);
    let out = TempDir::new().unwrap();
    let solver = solver_for(&toolchain, out.path());

    solver
        .solve(DOMAIN, PROBLEM, "robot1", DEFAULT_SOLVER_TIMEOUT)
        .await
        .unwrap();

    let work = out.path().join("robot1");
    assert_eq!(
        toolchain.translate_args().unwrap(),
        vec![
            work.join("domain.pddl").display().to_string(),
            work.join("problem.pddl").display().to_string(),
        ]
    );

    let mut expected: Vec<String> = "y Y a T 10 t 5 e r O 1 C 1 p"
        .split(' ')
        .map(str::to_owned)
        .collect();
    expected.push(work.join("pddlplan").display().to_string());
    assert_eq!(toolchain.search_args().unwrap(), expected);
}

#[tokio::test]
async fn staged_inputs_and_outputs_are_archived() {
    let toolchain = FakeToolchain::with_plan(PLAN);
    let out = TempDir::new().unwrap();
    let solver = solver_for(&toolchain, out.path());

    solver
        .solve(DOMAIN, PROBLEM, "/robots/r2", DEFAULT_SOLVER_TIMEOUT)
        .await
        .unwrap();

    let work = out.path().join("robots").join("r2");
    assert_eq!(
        std::fs::read_to_string(work.join("domain.pddl.last")).unwrap(),
        DOMAIN
    );
    assert_eq!(
        std::fs::read_to_string(work.join("problem.pddl.last")).unwrap(),
        PROBLEM
    );
    // The fake preprocess copies its stdin, so `output` carries the SAS text.
    let preprocessed = std::fs::read_to_string(work.join("output.last")).unwrap();
    assert!(preprocessed.starts_with("begin_version"));
    assert!(work.join("output.sas.last").exists());
    assert_eq!(
        std::fs::read_to_string(work.join("pddlplan.1.last")).unwrap(),
        PLAN
    );
    assert!(!work.join("pddlplan.1").exists());
}

#[tokio::test]
async fn reinvocation_overwrites_working_files_and_keeps_last_run() {
    let first = FakeToolchain::with_plan("0.000: (first-action) [1.000]\n");
    let second = FakeToolchain::with_plan("0.000: (second-action) [2.000]\n");
    let out = TempDir::new().unwrap();

    let plan = solver_for(&first, out.path())
        .get_plan(DOMAIN, PROBLEM, "ns", DEFAULT_SOLVER_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(plan.items[0].action, "first-action");

    let plan = solver_for(&second, out.path())
        .get_plan(DOMAIN, PROBLEM, "ns", DEFAULT_SOLVER_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(plan.items[0].action, "second-action");

    let archived = std::fs::read_to_string(out.path().join("ns/pddlplan.1.last")).unwrap();
    assert!(archived.contains("second-action"));
}

#[tokio::test]
async fn unsolvable_problem_yields_no_plan() {
    let toolchain = FakeToolchain::builder().search_exit(1).build();
    let out = TempDir::new().unwrap();
    let solver = solver_for(&toolchain, out.path());

    let plan = solver
        .solve(DOMAIN, PROBLEM, "", DEFAULT_SOLVER_TIMEOUT)
        .await
        .expect("a missing plan file is not an error");
    assert!(plan.is_none());

    // Intermediate artifacts are still archived.
    assert!(out.path().join("output.sas.last").exists());
    assert!(out.path().join("output.last").exists());
}

#[tokio::test]
async fn stale_plan_file_from_interrupted_run_is_not_returned() {
    let toolchain = FakeToolchain::builder().search_exit(1).build();
    let out = TempDir::new().unwrap();
    std::fs::write(out.path().join("pddlplan.1"), "0.000: (stale-action) [9.000]\n").unwrap();
    let solver = solver_for(&toolchain, out.path());

    let plan = solver
        .solve(DOMAIN, PROBLEM, "", DEFAULT_SOLVER_TIMEOUT)
        .await
        .unwrap();

    assert!(plan.is_none(), "leftover plan was returned: {plan:?}");
    assert!(!out.path().join("pddlplan.1").exists());
}

#[tokio::test]
async fn cancelled_run_still_archives_artifacts() {
    let toolchain = FakeToolchain::builder().plan(PLAN).search_sleep(5).build();
    let out = TempDir::new().unwrap();
    let solver = solver_for(&toolchain, out.path());

    let result = tokio::time::timeout(
        Duration::from_millis(800),
        solver.solve(DOMAIN, PROBLEM, "", DEFAULT_SOLVER_TIMEOUT),
    )
    .await;
    assert!(result.is_err(), "solve should still be running when cancelled");

    for name in ["domain.pddl", "problem.pddl", "output.sas", "output"] {
        assert!(out.path().join(format!("{name}.last")).exists(), "{name}.last missing");
        assert!(!out.path().join(name).exists(), "{name} left unarchived");
    }
    assert!(!out.path().join("pddlplan.1").exists());
}

#[tokio::test]
async fn empty_plan_file_yields_no_plan() {
    let toolchain = FakeToolchain::with_plan("");
    let out = TempDir::new().unwrap();
    let solver = solver_for(&toolchain, out.path());

    assert!(
        solver
            .get_plan(DOMAIN, PROBLEM, "", DEFAULT_SOLVER_TIMEOUT)
            .await
            .is_none()
    );
    assert!(out.path().join("pddlplan.1.last").exists());
}

#[tokio::test]
async fn malformed_plan_line_is_an_explicit_error() {
    let toolchain = FakeToolchain::with_plan("0.000: (pick-up a) [1.500]\n0.5 (stack a b)\n");
    let out = TempDir::new().unwrap();
    let solver = solver_for(&toolchain, out.path());

    let err = solver
        .solve(DOMAIN, PROBLEM, "", DEFAULT_SOLVER_TIMEOUT)
        .await
        .unwrap_err();

    assert!(matches!(err, SolverError::PlanParse(_)), "got: {err}");
    assert!(err.to_string().contains("line 2"), "got: {err}");
}

#[tokio::test]
async fn translate_failure_aborts_before_preprocess() {
    let toolchain = FakeToolchain::builder().translate_exit(1).plan(PLAN).build();
    let out = TempDir::new().unwrap();
    let solver = solver_for(&toolchain, out.path());

    let err = solver
        .solve(DOMAIN, PROBLEM, "", DEFAULT_SOLVER_TIMEOUT)
        .await
        .unwrap_err();

    match err {
        SolverError::StageFailed {
            stage: Stage::Translate,
            exit_code,
            ref stderr,
        } => {
            assert_eq!(exit_code, Some(1));
            assert!(stderr.contains("translate failed"), "stderr: {stderr}");
        }
        other => panic!("expected translate failure, got: {other}"),
    }
    assert!(toolchain.search_args().is_none(), "search must not run");
}

#[tokio::test]
async fn preprocess_failure_aborts_before_search() {
    let toolchain = FakeToolchain::builder().preprocess_exit(3).plan(PLAN).build();
    let out = TempDir::new().unwrap();
    let solver = solver_for(&toolchain, out.path());

    assert!(
        solver
            .get_plan(DOMAIN, PROBLEM, "", DEFAULT_SOLVER_TIMEOUT)
            .await
            .is_none()
    );
    assert!(toolchain.search_args().is_none(), "search must not run");
}

#[tokio::test]
async fn missing_program_is_a_launch_failure() {
    let toolchain = FakeToolchain::builder().plan(PLAN).without(Stage::Search).build();
    let out = TempDir::new().unwrap();
    let solver = solver_for(&toolchain, out.path());

    let err = solver
        .solve(DOMAIN, PROBLEM, "", DEFAULT_SOLVER_TIMEOUT)
        .await
        .unwrap_err();
    assert!(
        matches!(err, SolverError::Launch { stage: Stage::Search, .. }),
        "got: {err}"
    );
}

#[tokio::test]
async fn enforced_timeout_kills_slow_search() {
    let toolchain = FakeToolchain::builder().plan(PLAN).search_sleep(30).build();
    let out = TempDir::new().unwrap();
    let solver = solver_for(&toolchain, out.path()).with_timeout_enforcement(true);

    let err = solver
        .solve(DOMAIN, PROBLEM, "", Duration::from_secs(2))
        .await
        .unwrap_err();
    assert!(
        matches!(err, SolverError::StageTimedOut { stage: Stage::Search }),
        "got: {err}"
    );
}

#[tokio::test]
async fn namespace_cannot_escape_output_dir() {
    let toolchain = FakeToolchain::with_plan(PLAN);
    let out = TempDir::new().unwrap();
    let solver = solver_for(&toolchain, out.path());

    let err = solver
        .solve(DOMAIN, PROBLEM, "../elsewhere", DEFAULT_SOLVER_TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, SolverError::InvalidNamespace(_)), "got: {err}");
    assert!(toolchain.translate_args().is_none());
}

// ---------------------------------------------------------------------------
// Domain validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn valid_domain_translates_placeholder_problem() {
    let toolchain = FakeToolchain::builder().build();
    let out = TempDir::new().unwrap();
    let solver = solver_for(&toolchain, out.path());

    assert!(solver.is_domain_valid(DOMAIN, "check").await);

    let work = out.path().join("check");
    assert_eq!(
        std::fs::read_to_string(work.join("problem.pddl")).unwrap(),
        "(define (problem void) (:domain blocksworld) (:objects) (:init) (:goal none))"
    );
    let sas = std::fs::read_to_string(work.join("output.sas.validation")).unwrap();
    assert!(sas.contains("(:domain blocksworld)"));
    assert!(!work.join("output.sas").exists());
    assert!(toolchain.search_args().is_none(), "validation only translates");
}

#[tokio::test]
async fn domain_without_name_fails_before_translation() {
    let toolchain = FakeToolchain::builder().build();
    let out = TempDir::new().unwrap();
    let solver = solver_for(&toolchain, out.path());

    let err = solver
        .validate_domain("(define (:requirements :strips))", "")
        .await
        .unwrap_err();

    assert!(matches!(err, SolverError::DomainNameNotFound), "got: {err}");
    assert!(toolchain.translate_args().is_none());
}

#[tokio::test]
async fn translator_rejection_is_reported_as_stage_failure() {
    let toolchain = FakeToolchain::builder()
        .reject_domains_containing(":bogus-requirement")
        .build();
    let out = TempDir::new().unwrap();
    let solver = solver_for(&toolchain, out.path());

    let bad = "(define (domain broken) (:requirements :bogus-requirement))";
    let err = solver.validate_domain(bad, "").await.unwrap_err();

    assert!(
        matches!(err, SolverError::StageFailed { stage: Stage::Translate, .. }),
        "got: {err}"
    );
    assert!(!solver.is_domain_valid(bad, "").await);
    assert!(solver.is_domain_valid(DOMAIN, "").await);
}
