//! The read model exposed to the rendering collaborator.
//!
//! A [`LessonReport`] is an immutable snapshot of everything the UI needs:
//! the orchestrator phase, per-step statuses for every case, the first
//! failure, and the all-passed tag. Reports are published whole, so the
//! collaborator never observes a half-updated context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cursor::{ErroredStep, RunSummary, StepCursor};
use crate::lesson::Lesson;
use crate::orchestrator::LessonPhase;

/// Rendering status of a single step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepStatus {
    /// Not yet evaluated, or skipped after an earlier failure.
    #[default]
    NotComplete,
    /// Successfully completed.
    Complete,
    /// The first failing step of the run.
    Errored,
}

/// Read model for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Primary display text for the step.
    pub label: String,

    /// Secondary display text (predicate source, serialized event).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// The step's rendering status.
    pub status: StepStatus,
}

/// Read model for one acceptance case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseReport {
    /// The case description.
    pub description: String,

    /// Per-step reports, in step order.
    pub steps: Vec<StepReport>,
}

/// Complete read model for a lesson session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonReport {
    /// The lesson title.
    pub title: String,

    /// Current orchestrator phase.
    pub phase: LessonPhase,

    /// `true` iff the last completed run passed every step of every case.
    pub all_passed: bool,

    /// Furthest position successfully reached in the current run.
    pub cursor: StepCursor,

    /// The earliest failing step of the current run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_errored_step: Option<ErroredStep>,

    /// Compile diagnostic when the submission failed to compile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_error: Option<String>,

    /// Per-case reports, in case order.
    pub cases: Vec<CaseReport>,

    /// Monotonically increasing snapshot counter for this session.
    pub revision: u64,

    /// When this snapshot was published.
    pub updated_at: DateTime<Utc>,
}

impl LessonReport {
    /// Looks up the status of the step at `(case, step)`.
    ///
    /// Returns `None` when the position does not exist.
    #[must_use]
    pub fn step_status(&self, case: usize, step: usize) -> Option<StepStatus> {
        self.cases
            .get(case)
            .and_then(|c| c.steps.get(step))
            .map(|s| s.status)
    }
}

/// Builds a report from the lesson, the current phase, and the run
/// summary (absent while idle, compiling, or after a compile failure).
///
/// Derivation per step: `errored` iff its position equals the first
/// failing position; `complete` iff the run passed entirely or the step's
/// ordinal is strictly below the cursor; otherwise `notComplete`.
#[must_use]
pub fn build_report(
    lesson: &Lesson,
    phase: LessonPhase,
    summary: Option<&RunSummary>,
    compile_error: Option<String>,
    revision: u64,
) -> LessonReport {
    let cases = lesson
        .cases
        .iter()
        .enumerate()
        .map(|(case_index, case)| CaseReport {
            description: case.description.clone(),
            steps: case
                .steps
                .iter()
                .enumerate()
                .map(|(step_index, step)| StepReport {
                    label: step.label(),
                    detail: step.detail(),
                    status: derive_status(summary, StepCursor::new(case_index, step_index)),
                })
                .collect(),
        })
        .collect();

    LessonReport {
        title: lesson.title.clone(),
        phase,
        all_passed: summary.is_some_and(|s| s.all_passed),
        cursor: summary.map_or_else(StepCursor::default, |s| s.cursor),
        last_errored_step: summary.and_then(|s| s.last_errored.clone()),
        compile_error,
        cases,
        revision,
        updated_at: Utc::now(),
    }
}

fn derive_status(summary: Option<&RunSummary>, position: StepCursor) -> StepStatus {
    let Some(summary) = summary else {
        return StepStatus::NotComplete;
    };
    if summary
        .last_errored
        .as_ref()
        .is_some_and(|e| e.position == position)
    {
        StepStatus::Errored
    } else if summary.all_passed || position < summary.cursor {
        StepStatus::Complete
    } else {
        StepStatus::NotComplete
    }
}
