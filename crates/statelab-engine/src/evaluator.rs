//! Evaluating a single step against a live machine instance.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use tracing::debug;

use crate::lesson::Step;
use crate::machine::MachineInstance;

/// The result of evaluating one step.
///
/// A `Wait` step that has not yet elapsed is not a materialized outcome;
/// it is the still-pending future returned by [`evaluate`], and dropping
/// that future aborts the wait with no further side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step completed successfully.
    Passed,
    /// The step failed; the detail is surfaced to the learner.
    Failed {
        /// Human-readable failure description.
        detail: String,
    },
}

impl StepOutcome {
    /// Creates a failed outcome with the given detail.
    #[must_use]
    pub fn failed(detail: impl Into<String>) -> Self {
        Self::Failed {
            detail: detail.into(),
        }
    }

    /// Returns `true` if the step passed.
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Evaluates one step against the instance.
///
/// Assertions run the learner-facing predicate against a snapshot; a
/// predicate that returns `false` or panics fails the step. Event
/// dispatches pass unless dispatch itself errors. Waits suspend for
/// exactly the declared duration, then advance machine time so delayed
/// transitions fire.
///
/// Steps never touch the run context; outcomes flow back to the case
/// runner.
pub async fn evaluate(instance: &mut MachineInstance, step: &Step) -> StepOutcome {
    match step {
        Step::Assertion {
            description,
            predicate,
            predicate_source,
            failure_detail,
        } => {
            let snapshot = instance.snapshot();
            let verdict = catch_unwind(AssertUnwindSafe(|| predicate(&snapshot)));
            match verdict {
                Ok(true) => StepOutcome::Passed,
                Ok(false) => StepOutcome::failed(assertion_detail(
                    description,
                    predicate_source.as_deref(),
                    failure_detail.as_deref(),
                )),
                Err(_) => {
                    debug!(description = %description, "assertion predicate panicked");
                    StepOutcome::failed(format!("{description} (assertion raised)"))
                }
            }
        }
        Step::SendEvent { event } => match instance.send(event) {
            Ok(()) => StepOutcome::Passed,
            Err(err) => StepOutcome::failed(format!(
                "sending a {} event failed: {err}",
                event.event_type
            )),
        },
        Step::Wait { duration_ms } => {
            tokio::time::sleep(Duration::from_millis(*duration_ms)).await;
            instance.advance_time(*duration_ms);
            StepOutcome::Passed
        }
    }
}

/// Builds the failure detail for an assertion step.
///
/// An explicit `failure_detail` wins; otherwise the description is
/// combined with the predicate source where one was captured.
fn assertion_detail(
    description: &str,
    predicate_source: Option<&str>,
    failure_detail: Option<&str>,
) -> String {
    if let Some(detail) = failure_detail {
        return detail.to_string();
    }
    match predicate_source {
        Some(source) => format!("{description}: {source}"),
        None => description.to_string(),
    }
}
