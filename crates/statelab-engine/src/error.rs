//! Error types for the lesson execution engine.
//!
//! This module defines the error hierarchy for all engine operations,
//! including machine compilation, configuration loading, and session
//! lifecycle management.

/// A specialized `Result` type for lesson engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while grading a lesson.
///
/// Error variants are organized by subsystem and include actionable
/// suggestions where possible. Compile errors are expected, recoverable
/// conditions: the learner fixes them by editing the submission. Faults
/// signal a defect in the engine itself.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    // ========================================================================
    // Compile Errors
    // ========================================================================
    /// The submitted source is empty or whitespace only.
    #[error("Submitted machine source is empty\n\nSuggestion: Define a machine with an 'initial' state and a 'states' map")]
    EmptySource,

    /// The submitted source exceeds the configured size limit.
    #[error("Submitted source exceeds size limit: {size_bytes} bytes (limit {limit_bytes})\n\nSuggestion: Remove unrelated content; lessons only need the machine definition")]
    SourceTooLarge {
        /// Actual size of the submission in bytes.
        size_bytes: usize,
        /// The configured limit in bytes.
        limit_bytes: usize,
    },

    /// The submitted source is not a valid machine definition.
    #[error("Machine definition does not parse: {message}\n\nSuggestion: Check the JSON syntax; the expected shape is {{\"initial\": ..., \"states\": {{...}}}}")]
    SourceParse {
        /// Description of the parse failure.
        message: String,
    },

    /// The `initial` field names a state that is not defined.
    #[error("Initial state '{initial}' is not defined in the 'states' map\n\nSuggestion: Add a '{initial}' entry to 'states' or change 'initial'")]
    UnknownInitialState {
        /// The undefined initial state name.
        initial: String,
    },

    /// A transition targets a state that is not defined.
    #[error("State '{state}' transitions to undefined state '{target}' on '{trigger}'\n\nSuggestion: Add a '{target}' entry to 'states' or fix the transition target")]
    UnknownTransitionTarget {
        /// The state declaring the transition.
        state: String,
        /// The event name or delay that triggers the transition.
        trigger: String,
        /// The undefined target state name.
        target: String,
    },

    /// A delayed transition key does not parse as a millisecond count.
    #[error("State '{state}' has invalid delay '{delay}'\n\nSuggestion: 'after' keys must be non-negative integer millisecond values, e.g. \"500\"")]
    InvalidDelay {
        /// The state declaring the delayed transition.
        state: String,
        /// The key that failed to parse.
        delay: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in an engine configuration document.
    #[error("Invalid JSON in engine config: {message}\n\nSuggestion: Validate the config with a JSON linter")]
    ConfigParse {
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the caller.
        suggestion: String,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// The lesson session has been torn down and no longer accepts events.
    #[error("Lesson session is closed\n\nSuggestion: Spawn a new session; handles cannot outlive the session task")]
    SessionClosed,

    // ========================================================================
    // Engine Faults
    // ========================================================================
    /// An internal inconsistency that indicates a defect in the engine.
    ///
    /// Faults are never surfaced to the learner as step feedback; callers
    /// should log them and degrade.
    #[error("Engine fault: {message}")]
    Fault {
        /// Description of the inconsistency.
        message: String,
    },
}

impl EngineError {
    /// Creates a new `SourceParse` error from a parser diagnostic.
    #[must_use]
    pub fn source_parse(message: impl Into<String>) -> Self {
        Self::SourceParse {
            message: message.into(),
        }
    }

    /// Creates a new `SourceTooLarge` error.
    #[must_use]
    pub const fn source_too_large(size_bytes: usize, limit_bytes: usize) -> Self {
        Self::SourceTooLarge {
            size_bytes,
            limit_bytes,
        }
    }

    /// Creates a new `UnknownInitialState` error.
    #[must_use]
    pub fn unknown_initial(initial: impl Into<String>) -> Self {
        Self::UnknownInitialState {
            initial: initial.into(),
        }
    }

    /// Creates a new `UnknownTransitionTarget` error.
    #[must_use]
    pub fn unknown_target(
        state: impl Into<String>,
        trigger: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::UnknownTransitionTarget {
            state: state.into(),
            trigger: trigger.into(),
            target: target.into(),
        }
    }

    /// Creates a new `InvalidDelay` error.
    #[must_use]
    pub fn invalid_delay(state: impl Into<String>, delay: impl Into<String>) -> Self {
        Self::InvalidDelay {
            state: state.into(),
            delay: delay.into(),
        }
    }

    /// Creates a new `ConfigParse` error.
    #[must_use]
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidation` error with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `Fault` error.
    #[must_use]
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
        }
    }

    /// Returns `true` if this error came from compiling a submission.
    ///
    /// Compile errors are recoverable: the lesson surfaces them as a
    /// lesson-level failure and waits for the next edit.
    #[must_use]
    pub const fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Self::EmptySource
                | Self::SourceTooLarge { .. }
                | Self::SourceParse { .. }
                | Self::UnknownInitialState { .. }
                | Self::UnknownTransitionTarget { .. }
                | Self::InvalidDelay { .. }
        )
    }

    /// Returns `true` if this error signals an engine defect.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Fault { .. })
    }
}
