//! Tracking the furthest point reached and the first failure.
//!
//! Aggregation is pure: given every case result in case order, it computes
//! the cursor, the earliest failing step, and the all-passed flag. Nothing
//! here suspends or mutates engine state.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::lesson::Lesson;
use crate::runner::CaseResult;

/// A position within a lesson: case index, then step index.
///
/// Ordering is lexicographic on `(case, step)`. This is deliberate: a
/// numeric `case.step` encoding collides once step indices reach two
/// digits (`1.10` vs `1.1`), so positions compare field by field.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct StepCursor {
    /// Index of the case within the lesson.
    pub case: usize,
    /// Index of the step within the case.
    pub step: usize,
}

impl StepCursor {
    /// Creates a cursor at the given position.
    #[must_use]
    pub const fn new(case: usize, step: usize) -> Self {
        Self { case, step }
    }
}

/// The earliest failing step of a run, with its learner-facing detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErroredStep {
    /// Where the failure occurred.
    pub position: StepCursor,
    /// Failure detail surfaced to the learner.
    pub detail: String,
}

/// Aggregated outcome of one complete run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Furthest position successfully reached: the first failing position
    /// when any case failed, otherwise just past the final step of the
    /// final case.
    pub cursor: StepCursor,

    /// The earliest failing step across all cases, by case-then-step
    /// order. `None` when every case passed.
    pub last_errored: Option<ErroredStep>,

    /// `true` iff every case completed every step with no error.
    pub all_passed: bool,
}

impl RunSummary {
    /// A summary for a run still in progress: the cursor has advanced to
    /// `cursor`, nothing has failed yet.
    #[must_use]
    pub const fn in_progress(cursor: StepCursor) -> Self {
        Self {
            cursor,
            last_errored: None,
            all_passed: false,
        }
    }
}

/// Aggregates per-case results into a run summary.
///
/// Results must be in case order; the first error by case-then-step order
/// wins regardless of how cases were scheduled. A `completed_through`
/// beyond the case's step count is an engine defect: it fails loudly in
/// debug builds and is clamped in release so the read model degrades to
/// "not complete" rather than corrupting the context.
#[must_use]
pub fn aggregate(lesson: &Lesson, results: &[CaseResult]) -> RunSummary {
    debug_assert_eq!(
        lesson.cases.len(),
        results.len(),
        "one result per case, in case order"
    );

    let mut all_passed = true;
    let mut last_errored: Option<ErroredStep> = None;

    for (index, (case, result)) in lesson.cases.iter().zip(results).enumerate() {
        let step_count = case.steps.len();
        if result.completed_through > step_count {
            error!(
                case = index,
                completed = result.completed_through,
                step_count,
                "case result points past available steps"
            );
            debug_assert!(false, "completed_through exceeds step count");
        }

        match &result.error {
            Some(err) => {
                all_passed = false;
                if last_errored.is_none() {
                    last_errored = Some(ErroredStep {
                        position: StepCursor::new(index, err.step.min(step_count)),
                        detail: err.detail.clone(),
                    });
                }
            }
            None if result.completed_through < step_count => all_passed = false,
            None => {}
        }
    }

    if results.len() < lesson.cases.len() {
        all_passed = false;
    }

    let cursor = last_errored.as_ref().map_or_else(
        || end_cursor(lesson),
        |errored| errored.position,
    );

    RunSummary {
        cursor,
        last_errored,
        all_passed,
    }
}

/// The position just past the last step of the last case.
fn end_cursor(lesson: &Lesson) -> StepCursor {
    lesson.cases.last().map_or_else(StepCursor::default, |last| {
        StepCursor::new(lesson.cases.len() - 1, last.steps.len())
    })
}
