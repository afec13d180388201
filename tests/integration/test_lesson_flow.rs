//! End-to-end tests for the lesson engine.
//!
//! These drive a full session through the public handle: submitting
//! source, watching the published read model, and checking the settled
//! reports against the per-step statuses a renderer would display.

use statelab_engine::{
    Case, EngineConfig, Lesson, LessonPhase, LessonSession, SessionHandle, StepCursor, StepStatus,
};

/// Initializes tracing for test debugging (call at start of tests).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("statelab_engine=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// A traffic-light machine: red -> green -> yellow -> red on TIMER,
/// with yellow falling back to red after 300ms on its own.
const TRAFFIC_SOURCE: &str = r#"{
    "initial": "red",
    "states": {
        "red":    { "on": { "TIMER": "green" } },
        "green":  { "on": { "TIMER": "yellow" } },
        "yellow": { "on": { "TIMER": "red" }, "after": { "300": "red" } }
    }
}"#;

/// Like the traffic light, but green never advances.
const STUCK_SOURCE: &str = r#"{
    "initial": "red",
    "states": {
        "red":   { "on": { "TIMER": "green" } },
        "green": {}
    }
}"#;

fn traffic_lesson() -> Lesson {
    Lesson::new("Traffic light", TRAFFIC_SOURCE)
        .with_case(
            Case::new("Cycles through the colours")
                .assert("starts red", |s| s.state == "red")
                .send("TIMER")
                .assert("turns green", |s| s.state == "green")
                .send("TIMER")
                .assert("turns yellow", |s| s.state == "yellow"),
        )
        .with_case(
            Case::new("Yellow times out on its own")
                .send("TIMER")
                .send("TIMER")
                .wait(300)
                .assert("back to red after the timeout", |s| s.state == "red"),
        )
}

fn spawn(lesson: Lesson) -> SessionHandle {
    init_tracing();
    LessonSession::spawn(lesson, EngineConfig::default()).expect("failed to spawn session")
}

#[tokio::test(start_paused = true)]
async fn test_correct_submission_passes_every_step() {
    let handle = spawn(traffic_lesson());

    handle.edit(TRAFFIC_SOURCE).await.expect("edit failed");
    let report = handle.settled_after(0).await.expect("session closed");

    assert_eq!(report.phase, LessonPhase::Passed);
    assert!(report.all_passed);
    assert!(report.last_errored_step.is_none());
    assert!(report.compile_error.is_none());
    for case in &report.cases {
        for step in &case.steps {
            assert_eq!(step.status, StepStatus::Complete);
        }
    }

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_failing_submission_pins_cursor_at_first_failure() {
    let handle = spawn(traffic_lesson());

    handle.edit(STUCK_SOURCE).await.expect("edit failed");
    let report = handle.settled_after(0).await.expect("session closed");

    assert_eq!(report.phase, LessonPhase::Errored);
    assert!(!report.all_passed);

    // The stuck machine passes "starts red", TIMER, and "turns green",
    // then the second TIMER is a no-op and "turns yellow" fails.
    let errored = report.last_errored_step.as_ref().expect("no errored step");
    assert_eq!(errored.position, StepCursor::new(0, 4));
    assert_eq!(report.cursor, StepCursor::new(0, 4));

    assert_eq!(report.step_status(0, 0), Some(StepStatus::Complete));
    assert_eq!(report.step_status(0, 3), Some(StepStatus::Complete));
    assert_eq!(report.step_status(0, 4), Some(StepStatus::Errored));
    // Every step in the second case stays untouched, even ones the
    // machine could have satisfied.
    for step in &report.cases[1].steps {
        assert_eq!(step.status, StepStatus::NotComplete);
    }

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_unparseable_submission_reports_compile_error() {
    let handle = spawn(traffic_lesson());

    handle.edit("{ \"initial\": ").await.expect("edit failed");
    let report = handle.settled_after(0).await.expect("session closed");

    assert_eq!(report.phase, LessonPhase::Errored);
    assert!(report.compile_error.is_some());
    assert!(report.last_errored_step.is_none());
    for case in &report.cases {
        for step in &case.steps {
            assert_eq!(step.status, StepStatus::NotComplete);
        }
    }

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_unknown_initial_state_is_a_compile_error() {
    let handle = spawn(traffic_lesson());

    handle
        .edit(r#"{ "initial": "missing", "states": { "red": {} } }"#)
        .await
        .expect("edit failed");
    let report = handle.settled_after(0).await.expect("session closed");

    assert_eq!(report.phase, LessonPhase::Errored);
    let error = report.compile_error.as_deref().expect("no compile error");
    assert!(error.contains("missing"), "unexpected error: {error}");

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_rapid_edit_supersedes_in_flight_run() {
    let handle = spawn(traffic_lesson());
    let mut reports = handle.subscribe();

    // The first submission would pass after its 300ms wait; the second
    // arrives before the wait elapses and must win.
    handle.edit(TRAFFIC_SOURCE).await.expect("edit failed");
    handle.edit("{ \"broken\": ").await.expect("edit failed");

    let settled = loop {
        reports.changed().await.expect("session closed");
        let report = reports.borrow_and_update().clone();
        assert_ne!(report.phase, LessonPhase::Passed);
        assert!(!report.all_passed);
        if report.phase.is_settled() {
            break report;
        }
    };
    assert_eq!(settled.phase, LessonPhase::Errored);
    assert!(settled.compile_error.is_some());

    // Let the discarded run's wait deadline pass; its outcome must not
    // surface as a later publish.
    tokio::time::sleep(std::time::Duration::from_millis(1000)).await;
    assert!(!reports.has_changed().expect("session closed"));
    assert_eq!(handle.report(), settled);

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_resubmitting_identical_source_is_idempotent() {
    let handle = spawn(traffic_lesson());

    handle.edit(TRAFFIC_SOURCE).await.expect("edit failed");
    let first = handle.settled_after(0).await.expect("session closed");
    assert_eq!(first.phase, LessonPhase::Passed);
    assert!(first.all_passed);

    handle.edit(TRAFFIC_SOURCE).await.expect("edit failed");
    let second = handle
        .settled_after(first.revision)
        .await
        .expect("session closed");

    // Identical text grades identically: same verdict, same cursor, and
    // an identical per-step status map.
    assert_eq!(second.phase, LessonPhase::Passed);
    assert!(second.all_passed);
    assert_eq!(second.cursor, first.cursor);
    assert_eq!(second.cases, first.cases);
    assert!(second.last_errored_step.is_none());

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_edit_after_failure_runs_fresh() {
    let handle = spawn(traffic_lesson());

    handle.edit(STUCK_SOURCE).await.expect("edit failed");
    let first = handle.settled_after(0).await.expect("session closed");
    assert_eq!(first.phase, LessonPhase::Errored);

    handle.edit(TRAFFIC_SOURCE).await.expect("edit failed");
    let second = handle
        .settled_after(first.revision)
        .await
        .expect("session closed");

    assert_eq!(second.phase, LessonPhase::Passed);
    assert!(second.all_passed);
    assert!(second.last_errored_step.is_none());
    assert!(second.revision > first.revision);

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_settled_report_is_stable_between_edits() {
    let handle = spawn(traffic_lesson());

    handle.edit(TRAFFIC_SOURCE).await.expect("edit failed");
    let settled = handle.settled_after(0).await.expect("session closed");

    // With no further edits, repeated reads observe the same snapshot.
    let again = handle.report();
    assert_eq!(again, settled);
    let waited = handle
        .settled_after(settled.revision - 1)
        .await
        .expect("session closed");
    assert_eq!(waited, settled);

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_published_cursor_never_moves_backwards_within_a_run() {
    let handle = spawn(traffic_lesson());
    let mut reports = handle.subscribe();

    handle.edit(STUCK_SOURCE).await.expect("edit failed");

    let mut previous = StepCursor::default();
    loop {
        reports.changed().await.expect("session closed");
        let report = reports.borrow_and_update().clone();
        if report.phase == LessonPhase::Running || report.phase.is_settled() {
            assert!(
                report.cursor >= previous,
                "cursor went backwards: {previous:?} -> {:?}",
                report.cursor
            );
            previous = report.cursor;
        }
        if report.phase.is_settled() {
            break;
        }
    }

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_cursor_survives_double_digit_step_indices() {
    // A single case with more than ten steps: positions like (0, 10)
    // must order after (0, 2), not between (0, 1) and (0, 2).
    let mut case = Case::new("long march").assert("starts red", |s| s.state == "red");
    for _ in 0..5 {
        case = case
            .send("TIMER")
            .send("TIMER")
            .send("TIMER")
            .assert("cycled back to red", |s| s.state == "red");
    }
    let lesson = Lesson::new("Long lesson", TRAFFIC_SOURCE).with_case(case);
    let handle = spawn(lesson);

    handle.edit(TRAFFIC_SOURCE).await.expect("edit failed");
    let report = handle.settled_after(0).await.expect("session closed");

    assert_eq!(report.phase, LessonPhase::Passed);
    assert_eq!(report.cursor, StepCursor::new(0, 21));
    assert_eq!(report.step_status(0, 20), Some(StepStatus::Complete));

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_first_failure_wins_across_cases() {
    // Both cases fail against the stuck machine; the earlier case's
    // failure is the one reported even though the later case fails at a
    // lower step index.
    let lesson = Lesson::new("Two failures", TRAFFIC_SOURCE)
        .with_case(
            Case::new("fails late")
                .send("TIMER")
                .send("TIMER")
                .assert("yellow", |s| s.state == "yellow"),
        )
        .with_case(Case::new("fails early").assert("green", |s| s.state == "green"));
    let handle = spawn(lesson);

    handle.edit(STUCK_SOURCE).await.expect("edit failed");
    let report = handle.settled_after(0).await.expect("session closed");

    let errored = report.last_errored_step.as_ref().expect("no errored step");
    assert_eq!(errored.position, StepCursor::new(0, 2));
    assert_eq!(report.step_status(1, 0), Some(StepStatus::NotComplete));

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_oversized_submission_is_rejected() {
    let config = EngineConfig {
        max_source_bytes: 64,
        ..EngineConfig::default()
    };
    init_tracing();
    let handle =
        LessonSession::spawn(traffic_lesson(), config).expect("failed to spawn session");

    handle.edit(TRAFFIC_SOURCE).await.expect("edit failed");
    let report = handle.settled_after(0).await.expect("session closed");

    assert_eq!(report.phase, LessonPhase::Errored);
    let error = report.compile_error.as_deref().expect("no compile error");
    assert!(error.contains("64"), "unexpected error: {error}");

    handle.close().await;
}
