//! Compilation error types

use thiserror::Error;

/// Errors surfaced by the compilation core.
///
/// Every syntax, naming, and typing fault is an `InvalidSyntax` carrying
/// the offending token's index in the reduced stream; the driver lifts the
/// index to a source line and column. `Format` wraps failures writing into
/// the emit buffer so emission can propagate with `?`.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{message}")]
    InvalidSyntax { index: usize, message: String },

    #[error(transparent)]
    Format(#[from] std::fmt::Error),
}

impl CompileError {
    pub fn invalid_syntax(index: usize, message: impl Into<String>) -> Self {
        CompileError::InvalidSyntax {
            index,
            message: message.into(),
        }
    }

    /// Index of the offending token, when the error carries one.
    pub fn token_index(&self) -> Option<usize> {
        match self {
            CompileError::InvalidSyntax { index, .. } => Some(*index),
            CompileError::Format(_) => None,
        }
    }
}
