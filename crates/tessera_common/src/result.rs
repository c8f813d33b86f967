//! Common result and error types for the Tessera toolchain.

/// The standard result type for operations that can only fail through a defect.
///
/// `Err` indicates an unrecoverable internal error (a bug in Tessera, such as
/// a constraint model that admitted a malformed route), not a user-facing
/// error. Configuration problems have their own error types and are also
/// reported through a `DiagnosticSink`.
pub type TesseraResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in Tessera, not a user input problem.
///
/// If one of these surfaces, a model invariant was violated and the offending
/// constraint encoding should be fixed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
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
