//! JSON rendering of lesson reports.
//!
//! Provides [`JsonGenerator`] for serializing a [`LessonReport`] snapshot
//! to JSON, either compact for data transfer or pretty-printed for humans.
//!
//! # Example
//!
//! ```rust
//! use statelab_engine::{build_report, Lesson, LessonPhase};
//! use statelab_report::json::JsonGenerator;
//!
//! let lesson = Lesson::new("Demo", "{}");
//! let report = build_report(&lesson, LessonPhase::Idle, None, None, 0);
//!
//! let generator = JsonGenerator::new(&report);
//! let compact = generator.generate().unwrap();
//! assert!(!compact.contains('\n'));
//! ```

use std::fs::File;
use std::io::Write;
use std::path::Path;

use statelab_engine::LessonReport;

use crate::{ReportError, Result};

/// JSON report generator.
///
/// Wraps a [`LessonReport`] reference and serializes it on demand.
pub struct JsonGenerator<'a> {
    report: &'a LessonReport,
}

impl<'a> JsonGenerator<'a> {
    /// Creates a new JSON generator for the given report.
    #[must_use]
    pub const fn new(report: &'a LessonReport) -> Self {
        Self { report }
    }

    /// Generates compact JSON output (single line, no extra whitespace).
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if JSON serialization fails.
    pub fn generate(&self) -> Result<String> {
        serde_json::to_string(self.report).map_err(ReportError::from)
    }

    /// Generates pretty-printed JSON output with indentation.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if JSON serialization fails.
    pub fn generate_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self.report).map_err(ReportError::from)
    }

    /// Writes the JSON report to a file, creating or overwriting it.
    ///
    /// Parent directories must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if serialization fails, or
    /// [`ReportError::Io`] if file creation or writing fails.
    pub fn write_to_file(&self, path: &Path, pretty: bool) -> Result<()> {
        let json = if pretty {
            self.generate_pretty()?
        } else {
            self.generate()?
        };

        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;

        Ok(())
    }
}
