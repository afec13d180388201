//! Lesson definitions: acceptance cases and their ordered steps.
//!
//! A [`Lesson`] is pure data. It pairs the initial source text shown to the
//! learner with an ordered list of acceptance [`Case`]s, each an ordered
//! list of [`Step`]s. Step order is authoritative; the engine never reorders
//! or retries steps.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::machine::MachineSnapshot;

/// A predicate evaluated against a live machine snapshot.
///
/// The engine assumes nothing about the implementation beyond this
/// signature. Predicates that panic are treated as failed assertions,
/// never as engine faults.
pub type Predicate = Arc<dyn Fn(&MachineSnapshot) -> bool + Send + Sync>;

/// An event dispatched to a machine instance by a `SendEvent` step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineEvent {
    /// The event type, matched against `on` transition keys.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Arbitrary payload carried alongside the event.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl MachineEvent {
    /// Creates a payload-free event of the given type.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: serde_json::Value::Null,
        }
    }

    /// Creates an event carrying a payload.
    #[must_use]
    pub fn with_payload(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }
}

/// One atomic check or action within an acceptance case.
#[derive(Clone)]
pub enum Step {
    /// Checks a predicate against the current machine snapshot.
    Assertion {
        /// Human-readable description shown next to the step.
        description: String,
        /// The predicate to evaluate.
        predicate: Predicate,
        /// Display text of the predicate, where available.
        predicate_source: Option<String>,
        /// Overrides the generated failure detail when present.
        failure_detail: Option<String>,
    },
    /// Dispatches an event to the machine instance.
    SendEvent {
        /// The event to dispatch.
        event: MachineEvent,
    },
    /// Suspends for the given duration, then advances machine time.
    Wait {
        /// How long to wait, in milliseconds.
        duration_ms: u64,
    },
}

impl Step {
    /// Returns the label the rendering collaborator shows for this step.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Assertion { description, .. } => description.clone(),
            Self::SendEvent { event } => format!("Send a {} event", event.event_type),
            Self::Wait { duration_ms } => format!("Wait for {duration_ms}ms"),
        }
    }

    /// Returns the secondary display text for this step, if any.
    ///
    /// Assertions expose their predicate source; event steps expose the
    /// serialized event. Waits have no detail.
    #[must_use]
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Assertion {
                predicate_source, ..
            } => predicate_source.clone(),
            Self::SendEvent { event } => serde_json::to_string(event).ok(),
            Self::Wait { .. } => None,
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assertion {
                description,
                predicate_source,
                failure_detail,
                ..
            } => f
                .debug_struct("Assertion")
                .field("description", description)
                .field("predicate_source", predicate_source)
                .field("failure_detail", failure_detail)
                .finish_non_exhaustive(),
            Self::SendEvent { event } => {
                f.debug_struct("SendEvent").field("event", event).finish()
            }
            Self::Wait { duration_ms } => f
                .debug_struct("Wait")
                .field("duration_ms", duration_ms)
                .finish(),
        }
    }
}

/// One independent scenario the submitted machine must satisfy.
///
/// Each case runs against its own fresh machine instance, so side effects
/// cannot leak between cases.
///
/// # Example
///
/// ```
/// use statelab_engine::Case;
///
/// let case = Case::new("Starts and stops")
///     .assert("Machine starts idle", |snap| snap.state == "idle")
///     .send("START")
///     .assert("START moves the machine to running", |snap| snap.state == "running")
///     .wait(500);
/// assert_eq!(case.steps.len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct Case {
    /// Human-readable description of the scenario.
    pub description: String,

    /// The ordered steps of this case. Order is significant and fixed.
    pub steps: Vec<Step>,
}

impl Case {
    /// Creates an empty case with the given description.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            steps: Vec::new(),
        }
    }

    /// Appends an assertion step.
    #[must_use]
    pub fn assert(
        mut self,
        description: impl Into<String>,
        predicate: impl Fn(&MachineSnapshot) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.steps.push(Step::Assertion {
            description: description.into(),
            predicate: Arc::new(predicate),
            predicate_source: None,
            failure_detail: None,
        });
        self
    }

    /// Appends an assertion step that carries the predicate's display text.
    #[must_use]
    pub fn assert_with_source(
        mut self,
        description: impl Into<String>,
        predicate_source: impl Into<String>,
        predicate: impl Fn(&MachineSnapshot) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.steps.push(Step::Assertion {
            description: description.into(),
            predicate: Arc::new(predicate),
            predicate_source: Some(predicate_source.into()),
            failure_detail: None,
        });
        self
    }

    /// Appends a payload-free send-event step.
    #[must_use]
    pub fn send(mut self, event_type: impl Into<String>) -> Self {
        self.steps.push(Step::SendEvent {
            event: MachineEvent::new(event_type),
        });
        self
    }

    /// Appends a send-event step carrying a payload.
    #[must_use]
    pub fn send_with_payload(
        mut self,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        self.steps.push(Step::SendEvent {
            event: MachineEvent::with_payload(event_type, payload),
        });
        self
    }

    /// Appends a timed wait step.
    #[must_use]
    pub fn wait(mut self, duration_ms: u64) -> Self {
        self.steps.push(Step::Wait { duration_ms });
        self
    }
}

/// A complete lesson: initial source text plus ordered acceptance cases.
///
/// Immutable once loaded; the orchestrator only ever reads it.
#[derive(Debug, Clone)]
pub struct Lesson {
    /// Title shown by the rendering collaborator.
    pub title: String,

    /// The source text the editing surface starts from.
    pub initial_text: String,

    /// The ordered acceptance cases.
    pub cases: Vec<Case>,
}

impl Lesson {
    /// Creates a lesson with no cases.
    #[must_use]
    pub fn new(title: impl Into<String>, initial_text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            initial_text: initial_text.into(),
            cases: Vec::new(),
        }
    }

    /// Appends an acceptance case.
    #[must_use]
    pub fn with_case(mut self, case: Case) -> Self {
        self.cases.push(case);
        self
    }

    /// Total number of steps across all cases.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.cases.iter().map(|c| c.steps.len()).sum()
    }
}
