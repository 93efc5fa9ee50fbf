//! The host-facing error categories.

use thiserror::Error;

/// Error returned by filter creation and update.
///
/// Mirrors the host's return-code convention: bad input, unsupported
/// construct, or an expression failure (parse failures carry the byte
/// offset for diagnostics).
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    /// Null-ish input, out-of-range parameter index, unknown field name.
    #[error("bad parameter")]
    BadParameter,

    /// A construct the filter cannot express: unsigned 64-bit keys, wide
    /// string/char keys, reserved operators, oversized blobs.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// The expression text does not parse; `pos` is the stable byte offset
    /// of the failure.
    #[error("expression error at byte offset {pos}")]
    Expression { pos: usize },

    /// Generic expression failure while binding, building or evaluating.
    #[error("expression evaluation failed")]
    Eval,
}

impl From<sift_expr::ExprError> for FilterError {
    fn from(err: sift_expr::ExprError) -> Self {
        use sift_expr::ExprError;
        match err {
            ExprError::Parse { pos } => FilterError::Expression { pos },
            ExprError::Unsupported(what) => FilterError::Unsupported(what),
            ExprError::UnknownParameter(_) => FilterError::BadParameter,
            ExprError::Coerce | ExprError::Unbound(_) | ExprError::DivisionByZero => {
                FilterError::Eval
            }
        }
    }
}
