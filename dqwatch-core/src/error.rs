//! Error types for issue detection and report distribution.
//!
//! Errors raised on the classification and assembly path propagate to the
//! caller. Errors raised by a single destination or metric emission are
//! contained by the reporter, logged, and converted into a failed outcome.

use thiserror::Error;

/// Main error type for dqwatch operations.
#[derive(Debug, Error)]
pub enum DqWatchError {
    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A severity string that is not one of critical/high/medium/low
    #[error("Invalid severity '{value}': expected one of critical, high, medium, low")]
    InvalidSeverity { value: String },

    /// A serialized issue record violates the issue invariants
    #[error("Invalid issue record: {reason}")]
    InvalidIssueRecord { reason: String },

    /// A report destination failed to deliver
    #[error("Destination '{destination}' failed: {message}")]
    Destination {
        destination: String,
        message: String,
    },

    /// A report destination did not answer within its time budget
    #[error("Destination '{destination}' timed out after {seconds}s")]
    Timeout { destination: String, seconds: u64 },

    /// Report rendering failed
    #[error("Report rendering failed: {context}")]
    Rendering {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results with DqWatchError
pub type Result<T> = std::result::Result<T, DqWatchError>;

impl DqWatchError {
    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an invalid severity error
    pub fn invalid_severity(value: impl Into<String>) -> Self {
        Self::InvalidSeverity {
            value: value.into(),
        }
    }

    /// Creates an invalid issue record error
    pub fn invalid_issue_record(reason: impl Into<String>) -> Self {
        Self::InvalidIssueRecord {
            reason: reason.into(),
        }
    }

    /// Creates a destination delivery error
    pub fn destination(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Destination {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Creates a rendering error with context
    pub fn rendering<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Rendering {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a serialization error with context
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }
}
