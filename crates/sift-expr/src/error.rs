//! Error types for parsing, building and evaluating expressions.

use thiserror::Error;

/// Error produced by the expression engine.
#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    /// Malformed expression text. `pos` is a stable byte offset: one past the
    /// offending token, or the position where parsing stopped when trailing
    /// input remains.
    #[error("parse error at byte offset {pos}")]
    Parse { pos: usize },

    /// A reserved operator that the language does not implement.
    #[error("unsupported operator `{0}`")]
    Unsupported(&'static str),

    /// A positional parameter index that never appeared in the expression.
    #[error("unknown parameter ?{0}")]
    UnknownParameter(u32),

    /// Affinity coercion failure (demotion across the REAL -> INTEGER
    /// barrier).
    #[error("operand cannot be coerced to the requested affinity")]
    Coerce,

    /// A variable slot was evaluated before the caller bound it.
    #[error("unbound variable `{0}`")]
    Unbound(Box<str>),

    /// Integer or real division/remainder with a zero divisor.
    #[error("division by zero")]
    DivisionByZero,
}
