//! Typed constants and the affinity lattice.
//!
//! ============================================================================
//! AFFINITY
//! ============================================================================
//!
//! Every operand carries an *affinity*: its position in a total order of value
//! domains, from most generic to most specific:
//!
//! ```text
//!   NONE < BLOB < TEXT < NUMERIC < INTEGER < REAL
//! ```
//!
//! `NONE` is the affinity of free identifiers and unbound parameter slots;
//! `NUMERIC` is the "any numeric" join of `INTEGER` and `REAL`. Concrete
//! constants always sit at `BLOB`, `TEXT`, `INTEGER` or `REAL`.
//!
//! Before an operator is applied, each operand is coerced to (at least) the
//! operator's affinity, then both operands are lifted to the larger of their
//! two affinities so they share a representation. The coercion rules follow
//! SQLite with one deliberate deviation: constants are strictly typed, so
//! `'0.1' < 1` compares a TEXT against an INTEGER by lifting both to the join
//! affinity (INTEGER), never by SQLite's relaxed numeric-constant rule.
//!
//! Rules worth calling out:
//! - promotion within numeric is free; demotion REAL -> INTEGER is forbidden
//!   even when lossless;
//! - BLOB routes through TEXT before any further conversion;
//! - TEXT -> NUMERIC parses the text twice, as integer and as real, and picks
//!   INTEGER exactly when the real value equals the integer value; text that
//!   parses as neither becomes numeric zero with REAL affinity.

use crate::error::ExprError;
use sift_lex::{parse_int_prefix, parse_real_prefix};

/// Value domain category, ordered from most generic to most specific.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Affinity {
    None,
    Blob,
    Text,
    Numeric,
    Integer,
    Real,
}

/// A concrete typed constant.
///
/// Text payloads are byte strings, not `String`: the language is defined over
/// bytes, and a BLOB -> TEXT cast is a byte copy that need not be UTF-8.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Real(f64),
    Text(Vec<u8>),
    Blob(Vec<u8>),
}

impl Value {
    /// The affinity of this constant. Always one of `Blob`, `Text`,
    /// `Integer`, `Real`.
    #[inline]
    pub fn affinity(&self) -> Affinity {
        match self {
            Value::Int(_) => Affinity::Integer,
            Value::Real(_) => Affinity::Real,
            Value::Text(_) => Affinity::Text,
            Value::Blob(_) => Affinity::Blob,
        }
    }

    /// Coerces this value to (at least) the `requested` affinity and returns
    /// the resulting affinity.
    ///
    /// `None` always succeeds without touching the value, as does requesting
    /// `Numeric` of a value that is already INTEGER or REAL. Demotion across
    /// the REAL -> INTEGER barrier fails with [`ExprError::Coerce`] and
    /// leaves the value unchanged.
    pub fn apply_affinity(&mut self, requested: Affinity) -> Result<Affinity, ExprError> {
        let current = self.affinity();
        if requested == Affinity::None || current == requested {
            return Ok(current);
        }
        if current > requested {
            if requested > Affinity::Numeric {
                return Err(ExprError::Coerce);
            }
            if requested == Affinity::Numeric {
                return Ok(current);
            }
        }
        // Every remaining conversion is infallible.
        let owned = std::mem::replace(self, Value::Int(0));
        let (converted, affinity) = convert(owned, requested);
        *self = converted;
        Ok(affinity)
    }
}

/// The one conversion routine between the four concrete representations.
///
/// Callers have already filtered out the identity and forbidden cases, so
/// every arm here succeeds.
fn convert(value: Value, requested: Affinity) -> (Value, Affinity) {
    match requested {
        Affinity::Blob => (Value::Blob(into_text_bytes(value)), Affinity::Blob),
        Affinity::Text => (Value::Text(into_text_bytes(value)), Affinity::Text),
        Affinity::Numeric => {
            // Only TEXT/BLOB reach here; numerics returned early.
            let bytes = into_text_bytes(value);
            let v = text_to_numeric(&bytes);
            let affinity = v.affinity();
            (v, affinity)
        }
        Affinity::Integer => {
            let bytes = into_text_bytes(value);
            (
                Value::Int(parse_int_prefix(&bytes).unwrap_or(0)),
                Affinity::Integer,
            )
        }
        Affinity::Real => match value {
            Value::Int(i) => (Value::Real(i as f64), Affinity::Real),
            other => {
                let bytes = into_text_bytes(other);
                (
                    Value::Real(parse_real_prefix(&bytes).unwrap_or(0.0)),
                    Affinity::Real,
                )
            }
        },
        Affinity::None => unreachable!("identity handled by the caller"),
    }
}

/// The TEXT image of a value: integers in plain decimal, reals in C `%e`
/// form (`1.100000e+00`) so text images of reals are stable and comparable,
/// text and blob as their raw bytes.
fn into_text_bytes(value: Value) -> Vec<u8> {
    match value {
        Value::Int(i) => i.to_string().into_bytes(),
        Value::Real(r) => format_real(r).into_bytes(),
        Value::Text(b) | Value::Blob(b) => b,
    }
}

/// TEXT -> NUMERIC: parse as integer and as real, pick INTEGER when the two
/// agree, REAL otherwise; text that parses as neither is numeric zero with
/// REAL affinity. A hex prefix resolves to INTEGER (the real parse cannot
/// see past the `0x`).
fn text_to_numeric(bytes: &[u8]) -> Value {
    let int = parse_int_prefix(bytes);
    let real = parse_real_prefix(bytes);
    match (int, real) {
        (None, None) => Value::Real(0.0),
        (Some(i), None) => Value::Int(i),
        (None, Some(r)) => Value::Real(r),
        (Some(i), Some(r)) => {
            if has_hex_prefix(bytes) || r == i as f64 {
                Value::Int(i)
            } else {
                Value::Real(r)
            }
        }
    }
}

fn has_hex_prefix(bytes: &[u8]) -> bool {
    let mut i = 0;
    while bytes.get(i).is_some_and(|b| b.is_ascii_whitespace()) {
        i += 1;
    }
    if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
        i += 1;
    }
    bytes.get(i) == Some(&b'0')
        && matches!(bytes.get(i + 1), Some(b'x') | Some(b'X'))
        && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit)
}

/// C `printf("%e")` rendering: six fraction digits, signed two-digit-minimum
/// exponent.
pub(crate) fn format_real(value: f64) -> String {
    let s = format!("{:.6e}", value);
    let Some((mantissa, exp)) = s.split_once('e') else {
        // inf / NaN carry no exponent
        return s;
    };
    let (sign, digits) = match exp.strip_prefix('-') {
        Some(d) => ('-', d),
        None => ('+', exp),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}
