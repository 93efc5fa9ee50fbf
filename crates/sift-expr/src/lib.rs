//! sift-expr - The filter expression engine
//!
//! ============================================================================
//! OVERVIEW
//! ============================================================================
//!
//! This crate owns everything between raw expression text and a boolean
//! verdict about one data sample:
//!
//! ```text
//!   text --parse--> Expr (parameter-keyed)
//!                     |  bind ?N values
//!                     v
//!                   build --> Expr (variable-keyed, optimized)
//!                               |  bind field values per sample
//!                               v
//!                             eval --> Value (numeric; non-zero = accept)
//! ```
//!
//! THE TWO EXPRESSION FORMS:
//! -------------------------
//! Parsing produces a *parameter-keyed* expression: free identifiers stay in
//! the tree as dotted names, and every `?N` owns a shared slot keyed by its
//! 1-based position. The host binds parameter values against this form.
//!
//! Building produces the *variable-keyed* runtime form: parameters are
//! inlined as constants (unbound ones default to integer 0), everything
//! decidable is folded away, and the surviving identifiers become shared
//! slots keyed by field name. The host binds each referenced sample field
//! before every evaluation; slots are shared across all their use sites, so
//! a bind is one table write with no tree traversal.
//!
//! SHORT-CIRCUITING:
//! -----------------
//! Both the optimizer and the evaluator visit the shorter subtree of
//! `AND`/`OR`/`*` first (subtree heights are cached) and skip the other side
//! entirely when the first one decides: `0 AND x`, `1 OR x` and `0 * x`
//! never look at `x`. An unbound variable inside a skipped subtree is
//! therefore not an error.
//!
//! See [`value`] for the affinity lattice that governs operand coercion.

mod ast;
mod build;
mod error;
mod eval;
mod parse;
#[cfg(test)]
mod render;
mod slots;
mod value;

pub use error::ExprError;
pub use slots::{SlotMode, SlotRef};
pub use value::{Affinity, Value};

use ast::{Arena, NodeId};
use slots::SlotTable;

/// A parsed or built filter expression.
///
/// Wraps the expression tree together with its parameter/variable slot
/// table. Whether the slots are keyed by `?N` position or by field name
/// depends on how the value was produced ([`Expr::parse`] vs
/// [`Expr::build`]); see [`SlotMode`].
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub(crate) arena: Arena,
    pub(crate) root: NodeId,
    pub(crate) slots: SlotTable,
}

impl Expr {
    /// Parses expression text into a parameter-keyed expression.
    ///
    /// On failure the error carries a stable byte offset for diagnostics.
    pub fn parse(source: &str) -> Result<Expr, ExprError> {
        parse::parse(source)
    }

    /// Whether slots are keyed by parameter position or by variable name.
    pub fn mode(&self) -> SlotMode {
        self.slots.mode()
    }

    /// Number of distinct parameter or variable slots.
    pub fn nparams(&self) -> usize {
        self.slots.len()
    }

    /// Binds a signed 64-bit integer to a slot.
    pub fn bind_integer<'a>(
        &mut self,
        slot: impl Into<SlotRef<'a>>,
        value: i64,
    ) -> Result<(), ExprError> {
        self.slots.bind(slot.into(), Value::Int(value))
    }

    /// Binds an IEEE 754 binary64 to a slot.
    pub fn bind_real<'a>(
        &mut self,
        slot: impl Into<SlotRef<'a>>,
        value: f64,
    ) -> Result<(), ExprError> {
        self.slots.bind(slot.into(), Value::Real(value))
    }

    /// Binds string bytes to a slot (copied).
    pub fn bind_string<'a>(
        &mut self,
        slot: impl Into<SlotRef<'a>>,
        value: &str,
    ) -> Result<(), ExprError> {
        self.slots
            .bind(slot.into(), Value::Text(value.as_bytes().to_vec()))
    }

    /// Binds blob bytes to a slot (copied).
    pub fn bind_blob<'a>(
        &mut self,
        slot: impl Into<SlotRef<'a>>,
        value: &[u8],
    ) -> Result<(), ExprError> {
        self.slots.bind(slot.into(), Value::Blob(value.to_vec()))
    }

    /// Builds the optimized, variable-keyed form: parameters inlined
    /// (unbound ones as integer 0), constants folded, short-circuits taken,
    /// surviving identifiers interned as named variable slots.
    pub fn build(&self) -> Result<Expr, ExprError> {
        build::build(self)
    }

    /// Evaluates the expression against the currently bound slot values.
    ///
    /// Every variable a visited subtree references must be bound; the final
    /// result is coerced to NUMERIC. Non-zero means "accept".
    pub fn eval(&self) -> Result<Value, ExprError> {
        eval::eval(self)
    }

    /// Convenience: [`Expr::eval`] reduced to the accept/reject boolean.
    pub fn eval_bool(&self) -> Result<bool, ExprError> {
        Ok(match self.eval()? {
            Value::Int(i) => i != 0,
            Value::Real(r) => r != 0.0,
            // eval() coerces its result to NUMERIC
            _ => false,
        })
    }

    /// Names of the surviving variables, in first-appearance order. Empty
    /// for parameter-keyed expressions.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.slots.var_names()
    }
}
