//! The host-facing content-filter description.
//!
//! A description is a value object: the host builds one, creates a filter
//! from it, and may drop or reuse it afterwards — the filter copies what it
//! keeps.

use crate::sample::{SampleInfo, SampleView};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque argument handed back to function-filter callbacks.
pub type FilterArg = Arc<dyn Any + Send + Sync>;

/// A content filter, in one of its two variants.
#[derive(Clone, Debug)]
pub enum ContentFilter {
    Expression(ExpressionFilter),
    Function(FunctionFilter),
}

/// Expression variant: SQL-like expression text plus the ordered positional
/// parameter values (`?1` is the first element).
#[derive(Clone, Debug, PartialEq)]
pub struct ExpressionFilter {
    pub expression: String,
    pub params: Vec<FilterParam>,
}

impl ExpressionFilter {
    pub fn new(expression: impl Into<String>) -> Self {
        ExpressionFilter {
            expression: expression.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(expression: impl Into<String>, params: Vec<FilterParam>) -> Self {
        ExpressionFilter {
            expression: expression.into(),
            params,
        }
    }
}

impl From<ExpressionFilter> for ContentFilter {
    fn from(filter: ExpressionFilter) -> Self {
        ContentFilter::Expression(filter)
    }
}

impl From<FunctionFilter> for ContentFilter {
    fn from(filter: FunctionFilter) -> Self {
        ContentFilter::Function(filter)
    }
}

/// One typed positional parameter value.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterParam {
    /// Signed 64-bit integer
    Integer(i64),
    /// IEEE 754 binary64
    Real(f64),
    /// String bytes, copied into the filter on bind
    String(String),
    /// Raw bytes, copied into the filter on bind
    Blob(Vec<u8>),
}

/// Function variant: a callback tagged by which inputs it wants, plus an
/// opaque argument.
#[derive(Clone)]
pub struct FunctionFilter {
    pub function: FilterFn,
    pub arg: Option<FilterArg>,
}

impl FunctionFilter {
    pub fn new(function: FilterFn) -> Self {
        FunctionFilter {
            function,
            arg: None,
        }
    }

    pub fn with_arg(function: FilterFn, arg: FilterArg) -> Self {
        FunctionFilter {
            function,
            arg: Some(arg),
        }
    }
}

impl fmt::Debug for FunctionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionFilter")
            .field("function", &self.function)
            .field("has_arg", &self.arg.is_some())
            .finish()
    }
}

/// The four callback shapes a function filter may use. The variant is the
/// filter's mode tag.
#[derive(Clone, Copy)]
pub enum FilterFn {
    /// Sees the sample only.
    Sample(fn(&dyn SampleView) -> bool),
    /// Sees the sample and the opaque argument.
    SampleArg(fn(&dyn SampleView, Option<&FilterArg>) -> bool),
    /// Sees the sample info and the opaque argument; the sample itself is
    /// never deserialized for this mode.
    SampleInfoArg(fn(&SampleInfo, Option<&FilterArg>) -> bool),
    /// Sees all three.
    SampleSampleInfoArg(fn(&dyn SampleView, &SampleInfo, Option<&FilterArg>) -> bool),
}

impl FilterFn {
    /// Mode and function-pointer equality; the opaque argument does not
    /// participate.
    pub(crate) fn same_function(&self, other: &FilterFn) -> bool {
        match (self, other) {
            (FilterFn::Sample(a), FilterFn::Sample(b)) => a == b,
            (FilterFn::SampleArg(a), FilterFn::SampleArg(b)) => a == b,
            (FilterFn::SampleInfoArg(a), FilterFn::SampleInfoArg(b)) => a == b,
            (FilterFn::SampleSampleInfoArg(a), FilterFn::SampleSampleInfoArg(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for FilterFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self {
            FilterFn::Sample(_) => "Sample",
            FilterFn::SampleArg(_) => "SampleArg",
            FilterFn::SampleInfoArg(_) => "SampleInfoArg",
            FilterFn::SampleSampleInfoArg(_) => "SampleSampleInfoArg",
        };
        f.write_str(mode)
    }
}
