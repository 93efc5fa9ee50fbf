//! Error types for token materialization.

use thiserror::Error;

/// Error produced when a token slice cannot be materialized into a value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexError {
    /// The slice does not re-scan as a numeric literal.
    #[error("malformed numeric literal")]
    MalformedNumber,
}
