//! Compiling submitted source into runnable machine instances.
//!
//! Submissions are JSON machine definitions in the familiar
//! `initial`/`states`/`on`/`after` shape:
//!
//! ```json
//! {
//!   "initial": "idle",
//!   "states": {
//!     "idle":    { "on": { "START": "running" } },
//!     "running": { "on": { "STOP": "idle" }, "after": { "500": "done" } },
//!     "done":    {}
//!   }
//! }
//! ```
//!
//! [`CompiledMachine::compile`] validates the whole definition up front so
//! no partially-valid machine ever reaches a case. Each acceptance case
//! gets its own [`MachineInstance`] via [`CompiledMachine::instantiate`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::lesson::MachineEvent;

/// Upper bound on chained delayed transitions per time advance.
///
/// Breaks zero-delay `after` cycles in learner submissions instead of
/// spinning forever.
const MAX_TIMED_HOPS: usize = 128;

/// Raw machine definition as deserialized from submitted source.
///
/// Unknown fields (e.g. an XState-style `id` or `context`) are ignored.
#[derive(Debug, Clone, Deserialize)]
struct MachineDefinition {
    initial: String,
    states: BTreeMap<String, StateNode>,
}

/// One state in the raw definition.
#[derive(Debug, Clone, Default, Deserialize)]
struct StateNode {
    /// Event-triggered transitions: event type to target state.
    #[serde(default)]
    on: BTreeMap<String, String>,

    /// Delayed transitions: millisecond delay (as a JSON key) to target state.
    #[serde(default)]
    after: BTreeMap<String, String>,
}

/// A validated state with parsed delays.
#[derive(Debug, Clone)]
struct CompiledState {
    on: BTreeMap<String, String>,
    after: BTreeMap<u64, String>,
}

/// A validated, immutable machine ready to instantiate.
///
/// Cloning is cheap; the state table is shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CompiledMachine {
    initial: String,
    states: Arc<BTreeMap<String, CompiledState>>,
}

impl CompiledMachine {
    /// Compiles submitted source with the default size limit.
    ///
    /// # Errors
    ///
    /// Returns a compile-classed [`EngineError`] if the source is empty,
    /// oversized, unparsable, or references undefined states.
    pub fn compile(source: &str) -> Result<Self> {
        Self::compile_with_limit(source, EngineConfig::default().max_source_bytes)
    }

    /// Compiles submitted source, rejecting anything over `max_bytes`.
    ///
    /// # Errors
    ///
    /// Returns a compile-classed [`EngineError`]; see [`Self::compile`].
    pub fn compile_with_limit(source: &str, max_bytes: usize) -> Result<Self> {
        if source.trim().is_empty() {
            return Err(EngineError::EmptySource);
        }
        if source.len() > max_bytes {
            return Err(EngineError::source_too_large(source.len(), max_bytes));
        }

        let definition: MachineDefinition =
            serde_json::from_str(source).map_err(|e| EngineError::source_parse(e.to_string()))?;

        if !definition.states.contains_key(&definition.initial) {
            return Err(EngineError::unknown_initial(&definition.initial));
        }

        let mut states = BTreeMap::new();
        for (name, node) in &definition.states {
            for (event, target) in &node.on {
                if !definition.states.contains_key(target) {
                    return Err(EngineError::unknown_target(name, event, target));
                }
            }

            let mut after = BTreeMap::new();
            for (delay, target) in &node.after {
                let delay_ms: u64 = delay
                    .parse()
                    .map_err(|_| EngineError::invalid_delay(name, delay))?;
                if !definition.states.contains_key(target) {
                    return Err(EngineError::unknown_target(name, delay, target));
                }
                after.insert(delay_ms, target.clone());
            }

            states.insert(
                name.clone(),
                CompiledState {
                    on: node.on.clone(),
                    after,
                },
            );
        }

        debug!(
            initial = %definition.initial,
            state_count = states.len(),
            "compiled machine definition"
        );

        Ok(Self {
            initial: definition.initial,
            states: Arc::new(states),
        })
    }

    /// Creates a fresh, independent instance starting in the initial state.
    #[must_use]
    pub fn instantiate(&self) -> MachineInstance {
        MachineInstance {
            states: Arc::clone(&self.states),
            state: self.initial.clone(),
            elapsed_in_state_ms: 0,
            events_seen: Vec::new(),
            last_event: None,
        }
    }
}

/// A live machine being driven through one acceptance case.
///
/// Instances are exclusively owned by their case; nothing is shared between
/// cases except the immutable state table.
#[derive(Debug)]
pub struct MachineInstance {
    states: Arc<BTreeMap<String, CompiledState>>,
    state: String,
    elapsed_in_state_ms: u64,
    events_seen: Vec<String>,
    last_event: Option<MachineEvent>,
}

impl MachineInstance {
    /// The current state value.
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Dispatches an event to the instance.
    ///
    /// An event with no matching `on` transition in the current state is
    /// recorded but otherwise ignored, as in the original runtime. A
    /// matching transition enters its target and resets time-in-state.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Fault` if the transition targets a state
    /// missing from the table, which compilation rules out.
    pub fn send(&mut self, event: &MachineEvent) -> Result<()> {
        self.events_seen.push(event.event_type.clone());
        self.last_event = Some(event.clone());

        let target = self
            .states
            .get(&self.state)
            .and_then(|s| s.on.get(&event.event_type))
            .cloned();

        if let Some(target) = target {
            if !self.states.contains_key(&target) {
                return Err(EngineError::fault(format!(
                    "transition from '{}' on '{}' targets missing state '{target}'",
                    self.state, event.event_type
                )));
            }
            debug!(from = %self.state, to = %target, event = %event.event_type, "transition");
            self.enter(target);
        }
        Ok(())
    }

    /// Advances machine time, firing any delayed transitions that come due.
    ///
    /// Delayed transitions chain: if the advanced window covers several
    /// `after` delays across successive states, each fires in order with
    /// the remaining window carried forward.
    pub fn advance_time(&mut self, duration_ms: u64) {
        let mut remaining = duration_ms;
        let mut hops = 0;
        loop {
            let Some((delay, target)) = self.next_timed_transition() else {
                self.elapsed_in_state_ms = self.elapsed_in_state_ms.saturating_add(remaining);
                return;
            };

            let due_in = delay.saturating_sub(self.elapsed_in_state_ms);
            if due_in > remaining {
                self.elapsed_in_state_ms += remaining;
                return;
            }

            hops += 1;
            if hops > MAX_TIMED_HOPS {
                warn!(state = %self.state, "delayed transition chain exceeded hop limit");
                return;
            }

            remaining -= due_in;
            debug!(from = %self.state, to = %target, delay_ms = delay, "timed transition");
            self.enter(target);
        }
    }

    /// Produces a read-only snapshot for assertion predicates.
    #[must_use]
    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            state: self.state.clone(),
            elapsed_in_state_ms: self.elapsed_in_state_ms,
            events_seen: self.events_seen.clone(),
            last_event: self.last_event.clone(),
        }
    }

    /// The earliest pending delayed transition of the current state.
    fn next_timed_transition(&self) -> Option<(u64, String)> {
        self.states
            .get(&self.state)
            .and_then(|s| s.after.iter().next())
            .map(|(delay, target)| (*delay, target.clone()))
    }

    fn enter(&mut self, state: String) {
        self.state = state;
        self.elapsed_in_state_ms = 0;
    }
}

/// What assertion predicates see: the observable surface of an instance.
#[derive(Debug, Clone, Serialize)]
pub struct MachineSnapshot {
    /// The current state value.
    pub state: String,

    /// Milliseconds spent in the current state.
    pub elapsed_in_state_ms: u64,

    /// Types of every event dispatched so far, in order.
    pub events_seen: Vec<String>,

    /// The most recently dispatched event, if any.
    pub last_event: Option<MachineEvent>,
}
