//! Statelab Lesson Engine
//!
//! Compiles learner-submitted state-machine definitions and grades them
//! against ordered acceptance cases, publishing a live read model as the
//! run progresses.

pub mod config;
pub mod cursor;
pub mod error;
pub mod evaluator;
pub mod lesson;
pub mod machine;
pub mod orchestrator;
pub mod runner;
pub mod status;

pub use config::EngineConfig;
pub use cursor::{aggregate, ErroredStep, RunSummary, StepCursor};
pub use error::{EngineError, Result};
pub use evaluator::{evaluate, StepOutcome};
pub use lesson::{Case, Lesson, MachineEvent, Predicate, Step};
pub use machine::{CompiledMachine, MachineInstance, MachineSnapshot};
pub use orchestrator::{LessonEvent, LessonPhase, LessonSession, SessionHandle};
pub use runner::{run_case, run_case_with_progress, CaseResult, StepError};
pub use status::{build_report, CaseReport, LessonReport, StepReport, StepStatus};
