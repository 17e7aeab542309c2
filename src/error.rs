//! Error types for Looper
//!
//! Centralized error handling using thiserror. Every configuration or lookup
//! failure is returned to the caller; nothing in the scheduler retries.

use thiserror::Error;

/// All error types that can occur in Looper
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LooperError {
    /// A callback with this name is already registered in the list
    #[error("Callback already registered: {0}")]
    DuplicateName(String),

    /// No callback with this name exists in the list
    #[error("Callback not found: {0}")]
    NameNotFound(String),

    /// An event with this name is already registered on the loop
    #[error("Event already registered: {0}")]
    DuplicateEvent(String),

    /// The level was already added to the stack
    #[error("Level {level} already configured for mode {mode}")]
    DuplicateLevel { mode: String, level: String },

    /// The level was never added to the stack
    #[error("Level {level} not configured for mode {mode}")]
    LevelNotFound { mode: String, level: String },

    /// A stack already exists for this mode
    #[error("Stack already configured for mode: {0}")]
    DuplicateMode(String),

    /// No stack exists for this mode
    #[error("Mode not found: {0}")]
    ModeNotFound(String),

    /// Continue or stop was requested before any mode was selected
    #[error("No active mode selected")]
    NoActiveMode,

    /// The stack has no levels to run
    #[error("Stack for mode {0} has no levels")]
    EmptyStack(String),
}

/// Result type alias for Looper operations
pub type Result<T> = std::result::Result<T, LooperError>;
