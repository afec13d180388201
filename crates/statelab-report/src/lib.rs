//! Statelab Report Rendering
//!
//! This crate renders [`LessonReport`] snapshots from the lesson engine
//! into formats for consumption outside the live session: JSON for
//! programmatic access and a plain-text checklist for terminals and logs.
//!
//! # Generators
//!
//! - [`json::JsonGenerator`] - JSON output, compact or pretty-printed
//! - [`TextGenerator`] - Human-readable checklist output
//!
//! # Example
//!
//! ```rust
//! use statelab_engine::{build_report, Case, Lesson, LessonPhase};
//! use statelab_report::json::JsonGenerator;
//!
//! let lesson = Lesson::new("Traffic light", "{}").with_case(
//!     Case::new("Starts red").assert("red at rest", |snap| snap.state == "red"),
//! );
//! let report = build_report(&lesson, LessonPhase::Idle, None, None, 0);
//!
//! let json = JsonGenerator::new(&report).generate_pretty().unwrap();
//! assert!(json.contains("Traffic light"));
//! ```

pub mod json;
mod text;

pub use text::TextGenerator;

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during report rendering.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to serialize the report to JSON.
    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to read or write report files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;
