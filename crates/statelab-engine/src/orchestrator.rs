//! The top-level lesson orchestrator.
//!
//! One [`LessonSession`] owns the whole run lifecycle for one lesson: it
//! receives edit events, cancels any in-flight evaluation, compiles the
//! new text, drives every acceptance case, and publishes read-model
//! snapshots. The session is a single cooperative task; the only
//! suspending operation inside a run is a `Wait` step, and dropping the
//! run future is the cancellation path, so a superseded run can never
//! write a stale result (last edit wins, not last finish).
//!
//! # Example
//!
//! ```no_run
//! use statelab_engine::{Case, EngineConfig, Lesson, LessonSession};
//!
//! # async fn example() -> statelab_engine::Result<()> {
//! let lesson = Lesson::new("Traffic light", "{}").with_case(
//!     Case::new("Starts red").assert("red at rest", |snap| snap.state == "red"),
//! );
//!
//! let handle = LessonSession::spawn(lesson, EngineConfig::default())?;
//! handle.edit(r#"{ "initial": "red", "states": { "red": {} } }"#).await?;
//!
//! let report = handle.settled_after(0).await?;
//! assert!(report.all_passed);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::cursor::{aggregate, ErroredStep, RunSummary, StepCursor};
use crate::error::{EngineError, Result};
use crate::lesson::Lesson;
use crate::machine::CompiledMachine;
use crate::runner::{run_case, run_case_with_progress, CaseResult};
use crate::status::{build_report, LessonReport};

// ============================================================================
// LessonPhase
// ============================================================================

/// Phase of the lesson orchestrator.
///
/// The phase moves through `Idle -> Compiling -> Running -> Passed |
/// Errored`, and every phase transitions back to `Compiling` on a new
/// edit. `Passed` and `Errored` are terminal only with respect to a
/// single run; no phase is terminal for the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonPhase {
    /// No submission yet; the session holds the lesson's initial text.
    #[default]
    Idle,
    /// A submission is being compiled.
    Compiling,
    /// Acceptance cases are being evaluated.
    Running,
    /// The last run passed every step of every case.
    Passed,
    /// The last run failed: a compile error or a failing step.
    Errored,
}

impl LessonPhase {
    /// Returns `true` once a run has reached its per-run terminal phase.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Passed | Self::Errored)
    }

    /// Returns `true` while a run is compiling or evaluating.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Compiling | Self::Running)
    }
}

impl fmt::Display for LessonPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Compiling => write!(f, "compiling"),
            Self::Running => write!(f, "running"),
            Self::Passed => write!(f, "passed"),
            Self::Errored => write!(f, "errored"),
        }
    }
}

// ============================================================================
// LessonEvent
// ============================================================================

/// Events accepted by a lesson session.
///
/// `TextEdited` is the sole input from the editing surface and the only
/// event that mutates the session's source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LessonEvent {
    /// The learner changed the submitted text.
    TextEdited {
        /// The full new source text.
        text: String,
    },
}

// ============================================================================
// RunContext
// ============================================================================

/// Mutable run state, owned exclusively by the session task.
///
/// Other components only ever see read-only snapshots of this via the
/// published [`LessonReport`].
struct RunContext {
    /// Latest submitted source text.
    source_text: String,
    /// Furthest position successfully reached in the current run.
    cursor: StepCursor,
    /// First failing step of the current run.
    last_errored: Option<ErroredStep>,
    /// Whether the current run passed everything.
    all_passed: bool,
}

impl RunContext {
    /// Resets the per-run fields for a fresh compile.
    fn reset(&mut self, source_text: String) {
        self.source_text = source_text;
        self.cursor = StepCursor::default();
        self.last_errored = None;
        self.all_passed = false;
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            cursor: self.cursor,
            last_errored: self.last_errored.clone(),
            all_passed: self.all_passed,
        }
    }
}

// ============================================================================
// SessionHandle
// ============================================================================

/// Caller-facing handle to a spawned lesson session.
///
/// Dropping the handle tears the session down: the event queue closes,
/// any in-flight run is discarded, and the task exits.
pub struct SessionHandle {
    events: mpsc::Sender<LessonEvent>,
    reports: watch::Receiver<LessonReport>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Submits new source text, superseding any run in progress.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::SessionClosed` if the session task has gone
    /// away.
    pub async fn edit(&self, text: impl Into<String>) -> Result<()> {
        self.events
            .send(LessonEvent::TextEdited { text: text.into() })
            .await
            .map_err(|_| EngineError::SessionClosed)
    }

    /// The most recently published report.
    #[must_use]
    pub fn report(&self) -> LessonReport {
        self.reports.borrow().clone()
    }

    /// Subscribes to the report stream.
    ///
    /// Each subscriber observes whole snapshots only; intermediate
    /// snapshots may be coalesced under load.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LessonReport> {
        self.reports.clone()
    }

    /// Waits for the first settled report newer than `last_seen`.
    ///
    /// Pass the revision of the last report already observed (or `0` for
    /// a fresh session) so a previous run's settled snapshot is not
    /// mistaken for the new one.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::SessionClosed` if the session task exits
    /// before settling.
    pub async fn settled_after(&self, last_seen: u64) -> Result<LessonReport> {
        let mut reports = self.reports.clone();
        loop {
            {
                let report = reports.borrow_and_update();
                if report.revision > last_seen && report.phase.is_settled() {
                    return Ok(report.clone());
                }
            }
            reports
                .changed()
                .await
                .map_err(|_| EngineError::SessionClosed)?;
        }
    }

    /// Tears the session down and waits for the task to exit.
    pub async fn close(self) {
        drop(self.events);
        drop(self.reports);
        let _ = self.task.await;
    }
}

// ============================================================================
// LessonSession
// ============================================================================

/// The orchestration state machine for one lesson session.
///
/// Created once per lesson session via [`LessonSession::spawn`]; torn
/// down when the returned handle is dropped or closed.
pub struct LessonSession {
    lesson: Arc<Lesson>,
    config: EngineConfig,
    context: RunContext,
    reports: watch::Sender<LessonReport>,
    revision: u64,
}

impl LessonSession {
    /// Spawns a session task for the lesson and returns its handle.
    ///
    /// Must be called within a tokio runtime. The session starts in the
    /// `Idle` phase with the lesson's initial text as its source.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ConfigValidation` if the configuration is
    /// invalid.
    pub fn spawn(lesson: Lesson, config: EngineConfig) -> Result<SessionHandle> {
        config.validate()?;

        let lesson = Arc::new(lesson);
        let initial = build_report(&lesson, LessonPhase::Idle, None, None, 0);
        let (reports_tx, reports_rx) = watch::channel(initial);
        let (events_tx, events_rx) = mpsc::channel(config.event_capacity);

        let session = Self {
            context: RunContext {
                source_text: lesson.initial_text.clone(),
                cursor: StepCursor::default(),
                last_errored: None,
                all_passed: false,
            },
            lesson,
            config,
            reports: reports_tx,
            revision: 0,
        };
        let task = tokio::spawn(session.run(events_rx));

        Ok(SessionHandle {
            events: events_tx,
            reports: reports_rx,
            task,
        })
    }

    /// The session loop: one `select!` over the edit queue, the in-flight
    /// run, and its progress stream.
    ///
    /// Cancellation is a drop: replacing `active` discards the run future
    /// mid-await, which aborts any pending wait and releases every machine
    /// instance before the next compile starts.
    async fn run(mut self, mut events: mpsc::Receiver<LessonEvent>) {
        info!(title = %self.lesson.title, cases = self.lesson.cases.len(), "lesson session started");

        let mut active: Option<BoxFuture<'static, Vec<CaseResult>>> = None;
        let mut progress: Option<mpsc::UnboundedReceiver<StepCursor>> = None;

        loop {
            let running = active.is_some();
            tokio::select! {
                maybe_event = events.recv() => {
                    let Some(LessonEvent::TextEdited { text }) = maybe_event else {
                        break;
                    };
                    if running {
                        debug!("edit supersedes in-flight run");
                    }
                    active = None;
                    progress = None;
                    if let Some(compiled) = self.recompile(text) {
                        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
                        active = Some(
                            run_all_cases(compiled, Arc::clone(&self.lesson), progress_tx)
                                .boxed(),
                        );
                        progress = Some(progress_rx);
                    }
                }
                results = await_run(&mut active), if running => {
                    active = None;
                    progress = None;
                    self.finish_run(&results);
                }
                step = await_progress(&mut progress), if running => {
                    match step {
                        Some(cursor) => self.note_progress(cursor),
                        None => progress = None,
                    }
                }
            }
        }

        debug!(title = %self.lesson.title, "lesson session closed");
    }

    /// Resets the context, compiles the new text, and enters `Running`
    /// or `Errored`.
    fn recompile(&mut self, text: String) -> Option<CompiledMachine> {
        self.context.reset(text);
        self.publish(LessonPhase::Compiling, None, None);

        let compiled = CompiledMachine::compile_with_limit(
            &self.context.source_text,
            self.config.max_source_bytes,
        );
        match compiled {
            Ok(compiled) => {
                debug!(
                    source_bytes = self.context.source_text.len(),
                    "compile succeeded, starting run"
                );
                self.publish(LessonPhase::Running, Some(&self.context.summary()), None);
                Some(compiled)
            }
            Err(err) => {
                warn!(error = %err, "submission failed to compile");
                self.publish(LessonPhase::Errored, None, Some(err.to_string()));
                None
            }
        }
    }

    /// Folds a completed run into the context and settles the phase.
    fn finish_run(&mut self, results: &[CaseResult]) {
        let summary = aggregate(&self.lesson, results);
        self.context.cursor = summary.cursor;
        self.context.last_errored = summary.last_errored;
        self.context.all_passed = summary.all_passed;

        let phase = if self.context.all_passed {
            LessonPhase::Passed
        } else {
            LessonPhase::Errored
        };
        info!(
            phase = %phase,
            cursor_case = self.context.cursor.case,
            cursor_step = self.context.cursor.step,
            "run finished"
        );
        self.publish(phase, Some(&self.context.summary()), None);
    }

    /// Advances the live cursor as steps complete mid-run.
    fn note_progress(&mut self, cursor: StepCursor) {
        if cursor > self.context.cursor {
            self.context.cursor = cursor;
        }
        let summary = RunSummary::in_progress(self.context.cursor);
        self.publish(LessonPhase::Running, Some(&summary), None);
    }

    /// Publishes one whole read-model snapshot.
    fn publish(
        &mut self,
        phase: LessonPhase,
        summary: Option<&RunSummary>,
        compile_error: Option<String>,
    ) {
        self.revision += 1;
        let report = build_report(&self.lesson, phase, summary, compile_error, self.revision);
        let _previous = self.reports.send_replace(report);
    }
}

/// Evaluates every case in order, each against its own fresh instance.
///
/// Progress stops being reported once any case has failed, so the live
/// cursor never moves past the first failing position.
async fn run_all_cases(
    compiled: CompiledMachine,
    lesson: Arc<Lesson>,
    progress: mpsc::UnboundedSender<StepCursor>,
) -> Vec<CaseResult> {
    let mut results = Vec::with_capacity(lesson.cases.len());
    let mut clean = true;
    for (index, case) in lesson.cases.iter().enumerate() {
        let mut instance = compiled.instantiate();
        let result = if clean {
            run_case_with_progress(&mut instance, case, |completed| {
                let _ = progress.send(StepCursor::new(index, completed));
            })
            .await
        } else {
            run_case(&mut instance, case).await
        };
        clean = clean && result.is_passed();
        results.push(result);
    }
    results
}

/// Awaits the in-flight run, or parks forever when there is none.
async fn await_run(active: &mut Option<BoxFuture<'static, Vec<CaseResult>>>) -> Vec<CaseResult> {
    match active.as_mut() {
        Some(run) => run.await,
        None => std::future::pending::<Vec<CaseResult>>().await,
    }
}

/// Awaits the next progress message, or parks forever when there is none.
async fn await_progress(
    progress: &mut Option<mpsc::UnboundedReceiver<StepCursor>>,
) -> Option<StepCursor> {
    match progress.as_mut() {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending::<Option<StepCursor>>().await,
    }
}
