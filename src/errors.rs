//! Error handling for the transaction guard.
//!
//! Every fallible operation in the crate returns a [`GuardResult`]. The
//! variants mirror the three failure families the engine distinguishes:
//! bad configuration (rejected eagerly), risk gateway failures (recoverable
//! through `fallback_on_error`) and malformed instruction data (recorded as a
//! warning by the detector rather than surfaced to callers).

use thiserror::Error;
use std::fmt;

/// Main error type for the transaction guard.
#[derive(Error, Debug)]
pub enum GuardError {
    /// Malformed configuration, such as a risk threshold outside `0..=1`
    /// or a zero cache TTL.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The risk gateway could not produce metrics for an asset.
    #[error("Risk gateway error: {0}")]
    Gateway(String),

    /// Instruction or transaction bytes could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Errors related to file I/O, such as a missing config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failures.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for the transaction guard.
pub type GuardResult<T> = Result<T, GuardError>;

impl GuardError {
    /// Whether the error came from the risk gateway.
    pub fn is_gateway(&self) -> bool {
        matches!(self, GuardError::Gateway(_))
    }
}

/// Context information for errors.
///
/// Records which component was doing what when an error occurred, so a
/// gateway failure for one asset inside a batch can be traced back to it.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Asset or program address involved, if applicable.
    pub address: Option<String>,

    /// Component where the error occurred (e.g., "risk_gateway").
    pub component: String,

    /// Operation being performed when the error occurred (e.g., "assess").
    pub operation: String,
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "In {} while {}", self.component, self.operation)?;
        if let Some(address) = &self.address {
            write!(f, " for {}", address)?;
        }
        Ok(())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorExt<T> {
    /// Prefix the error message with `context`, keeping the error kind.
    fn with_context(self, context: ErrorContext) -> GuardResult<T>;

    /// Shorthand for [`ErrorExt::with_context`] without an address.
    fn with_simple_context(self, component: &str, operation: &str) -> GuardResult<T>;
}

impl<T> ErrorExt<T> for GuardResult<T> {
    fn with_context(self, context: ErrorContext) -> GuardResult<T> {
        self.map_err(|e| match e {
            GuardError::Config(msg) => GuardError::Config(format!("{}: {}", context, msg)),
            GuardError::Gateway(msg) => GuardError::Gateway(format!("{}: {}", context, msg)),
            GuardError::Decode(msg) => GuardError::Decode(format!("{}: {}", context, msg)),
            GuardError::Io(err) => GuardError::Io(std::io::Error::new(
                err.kind(),
                format!("{}: {}", context, err),
            )),
            other => other,
        })
    }

    fn with_simple_context(self, component: &str, operation: &str) -> GuardResult<T> {
        self.with_context(ErrorContext {
            address: None,
            component: component.to_string(),
            operation: operation.to_string(),
        })
    }
}
