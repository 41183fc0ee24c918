//! Error definitions for the control module.

use thiserror::Error;

/// Errors from the event router and duty-cycle scheduler.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Invalid settings (zero tick rate, empty duty-cycle window, ...)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A control task panicked or could not be joined
    #[error("Task error: {0}")]
    TaskError(String),
}
