//! Plain-text rendering of lesson reports.
//!
//! Converts a [`LessonReport`] into a checklist suitable for terminals
//! and log output: one line per step, `[x]` for complete, `[!]` for the
//! errored step, `[ ]` for everything not yet reached.

use std::fmt::Write;

use statelab_engine::{LessonReport, StepStatus};

/// Generates plain-text checklists from lesson reports.
pub struct TextGenerator<'a> {
    report: &'a LessonReport,
}

impl<'a> TextGenerator<'a> {
    /// Creates a new text generator for the given report.
    #[must_use]
    pub const fn new(report: &'a LessonReport) -> Self {
        Self { report }
    }

    /// Generates the complete checklist.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        self.write_header(&mut output);
        self.write_cases(&mut output);
        self.write_footer(&mut output);

        output
    }

    fn write_header(&self, output: &mut String) {
        let _ = writeln!(output, "{}", self.report.title);
        let _ = writeln!(output, "Phase: {}", self.report.phase);
        if let Some(error) = &self.report.compile_error {
            let _ = writeln!(output, "Compile error: {error}");
        }
        let _ = writeln!(output);
    }

    fn write_cases(&self, output: &mut String) {
        for case in &self.report.cases {
            let _ = writeln!(output, "{}", case.description);
            for step in &case.steps {
                let marker = status_marker(step.status);
                match &step.detail {
                    Some(detail) => {
                        let _ = writeln!(output, "  [{marker}] {} ({detail})", step.label);
                    }
                    None => {
                        let _ = writeln!(output, "  [{marker}] {}", step.label);
                    }
                }
            }
        }
    }

    fn write_footer(&self, output: &mut String) {
        if let Some(errored) = &self.report.last_errored_step {
            let _ = writeln!(output, "\nFirst failure: {}", errored.detail);
        } else if self.report.all_passed {
            let _ = writeln!(output, "\nAll cases passed.");
        }
        let _ = writeln!(
            output,
            "\nGenerated at {} (revision {})",
            self.report.updated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.report.revision
        );
    }
}

const fn status_marker(status: StepStatus) -> char {
    match status {
        StepStatus::Complete => 'x',
        StepStatus::Errored => '!',
        StepStatus::NotComplete => ' ',
    }
}
