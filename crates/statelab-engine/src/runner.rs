//! Driving one acceptance case through its ordered steps.

use tracing::debug;

use crate::evaluator::{evaluate, StepOutcome};
use crate::lesson::Case;
use crate::machine::MachineInstance;

/// The first failure inside a case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepError {
    /// Index of the failing step within the case.
    pub step: usize,
    /// Failure detail surfaced to the learner.
    pub detail: String,
}

/// Outcome of running one acceptance case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseResult {
    /// Number of steps that completed before the case stopped.
    ///
    /// Equals the case's step count when every step passed.
    pub completed_through: usize,

    /// The first failing step, if any. Steps after it were never
    /// evaluated.
    pub error: Option<StepError>,
}

impl CaseResult {
    /// A result for a case whose every step passed.
    #[must_use]
    pub const fn passed(step_count: usize) -> Self {
        Self {
            completed_through: step_count,
            error: None,
        }
    }

    /// A result for a case that failed at `step`.
    #[must_use]
    pub fn failed(step: usize, detail: impl Into<String>) -> Self {
        Self {
            completed_through: step,
            error: Some(StepError {
                step,
                detail: detail.into(),
            }),
        }
    }

    /// Returns `true` if the case completed without error.
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs the steps of a case strictly in order against the instance.
///
/// Stops at the first failure; remaining steps are never evaluated and are
/// reported by the read model as not complete, never errored.
pub async fn run_case(instance: &mut MachineInstance, case: &Case) -> CaseResult {
    run_case_with_progress(instance, case, |_| {}).await
}

/// Like [`run_case`], invoking `on_step` with the completed step count
/// after each passing step so callers can surface live progress.
pub async fn run_case_with_progress(
    instance: &mut MachineInstance,
    case: &Case,
    mut on_step: impl FnMut(usize),
) -> CaseResult {
    for (index, step) in case.steps.iter().enumerate() {
        debug!(case = %case.description, step = index, "evaluating step");
        match evaluate(instance, step).await {
            StepOutcome::Passed => on_step(index + 1),
            StepOutcome::Failed { detail } => {
                debug!(case = %case.description, step = index, detail = %detail, "step failed");
                return CaseResult::failed(index, detail);
            }
        }
    }
    CaseResult::passed(case.steps.len())
}
