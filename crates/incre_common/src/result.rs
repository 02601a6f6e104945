//! Common result and error types.

/// The result type for operations whose only failure mode is a bug.
///
/// `Err` indicates a broken internal invariant (for example, two items with the
/// same key inside one snapshot), never a user-facing problem such as a missing
/// directory or unreadable state file. Those have their own error types.
pub type IncreResult<T> = Result<T, InternalError>;

/// An internal error indicating a programming error, not a user input problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the broken invariant.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
