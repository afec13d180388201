//! Configuration for the lesson execution engine.
//!
//! The engine carries very little configuration: a size cap on submitted
//! source and the depth of the edit-event queue. Both have sensible
//! defaults and are validated before a session starts.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Default maximum submission size in bytes (100KB).
const fn default_max_source_bytes() -> usize {
    100 * 1024
}

/// Default capacity of the inbound edit-event queue.
const fn default_event_capacity() -> usize {
    32
}

/// Configuration for a lesson session.
///
/// # Example
///
/// ```
/// use statelab_engine::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Maximum size in bytes of a submitted machine source.
    ///
    /// Larger submissions are rejected at compile time.
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: usize,

    /// Capacity of the edit-event queue feeding the orchestrator.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_source_bytes: default_max_source_bytes(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from a JSON document.
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ConfigParse` if the document is not valid JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::config_parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ConfigValidation` describing the first
    /// offending field.
    pub fn validate(&self) -> Result<()> {
        if self.max_source_bytes == 0 {
            return Err(EngineError::config_validation(
                "maxSourceBytes must be at least 1",
                "Use the default of 102400 bytes unless submissions need a tighter cap",
            ));
        }
        if self.event_capacity == 0 {
            return Err(EngineError::config_validation(
                "eventCapacity must be at least 1",
                "Use the default of 32; a zero-capacity queue can never accept an edit",
            ));
        }
        Ok(())
    }
}
