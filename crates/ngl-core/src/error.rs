//! Error types for ngl-resum

use thiserror::Error;

/// ngl-resum error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error (bad configuration or violated precondition)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// The event record lacks the particles needed to build its dipoles.
    ///
    /// Non-fatal: batch drivers skip the event and count it separately.
    #[error("Incomplete event: {0}")]
    IncompleteEvent(String),
}

impl Error {
    /// `true` for errors that only disqualify a single event.
    pub fn is_incomplete_event(&self) -> bool {
        matches!(self, Error::IncompleteEvent(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_event_is_recoverable() {
        assert!(Error::IncompleteEvent("no tops".into()).is_incomplete_event());
        assert!(!Error::Validation("n_bins must be > 0".into()).is_incomplete_event());
    }

    #[test]
    fn test_display() {
        let e = Error::Computation("no valid events".into());
        assert_eq!(e.to_string(), "Computation error: no valid events");
    }
}
