//! Numeric materialization.
//!
//! Turns an `Integer`/`Float`/`QNumber` token slice into an `i64` or `f64`.
//! A `QNumber` is handled by stripping the `_` separators and re-scanning the
//! cleaned copy, which is what promotes `1_000` from `QNumber` to `Integer`
//! before parsing.
//!
//! The module also provides the longest-valid-prefix parsers used by the
//! affinity coercions: text values are parsed the way C's `strtoll`/`strtod`
//! parse, taking the longest numeric prefix and ignoring whatever follows.

use crate::error::LexError;
use crate::scan::scan;
use crate::token::TokenKind;

/// A materialized numeric constant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Numeric {
    Int(i64),
    Real(f64),
}

/// Materializes a numeric token slice.
///
/// `kind` is the scanned kind of `slice`. Returns the value together with
/// the resolved kind (`QNumber` resolves to `Integer` or `Float`).
pub fn materialize_numeric(slice: &[u8], kind: TokenKind) -> Result<(Numeric, TokenKind), LexError> {
    match kind {
        TokenKind::QNumber => {
            let cleaned: Vec<u8> = slice.iter().copied().filter(|&b| b != b'_').collect();
            let rescanned = scan(&cleaned).ok_or(LexError::MalformedNumber)?;
            if rescanned.len != cleaned.len()
                || !matches!(rescanned.kind, TokenKind::Integer | TokenKind::Float)
            {
                return Err(LexError::MalformedNumber);
            }
            let (value, _) = materialize_numeric(&cleaned, rescanned.kind)?;
            Ok((value, rescanned.kind))
        }
        TokenKind::Integer => {
            let value = parse_int_prefix(slice).ok_or(LexError::MalformedNumber)?;
            Ok((Numeric::Int(value), TokenKind::Integer))
        }
        TokenKind::Float => {
            let value = parse_real_prefix(slice).ok_or(LexError::MalformedNumber)?;
            Ok((Numeric::Real(value), TokenKind::Float))
        }
        _ => Err(LexError::MalformedNumber),
    }
}

/// Parses the longest integer prefix of `bytes`: optional whitespace and
/// sign, then decimal digits or a `0x`/`0X` hex run. Returns `None` when no
/// digit is found. Overflow saturates at the i64 limits.
pub fn parse_int_prefix(bytes: &[u8]) -> Option<i64> {
    let mut i = skip_space_and_sign(bytes);
    let negative = bytes.get(..i).is_some_and(|head| head.ends_with(b"-"));

    let hex = bytes.get(i) == Some(&b'0')
        && matches!(bytes.get(i + 1), Some(b'x') | Some(b'X'))
        && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
    let radix: u32 = if hex { 16 } else { 10 };
    if hex {
        i += 2;
    }

    let mut seen = false;
    let mut acc: i64 = 0;
    while let Some(&c) = bytes.get(i) {
        let digit = match (c as char).to_digit(radix) {
            Some(d) => d as i64,
            None => break,
        };
        seen = true;
        acc = acc
            .saturating_mul(radix as i64)
            .saturating_add(if negative { -digit } else { digit });
        i += 1;
    }
    seen.then_some(acc)
}

/// Parses the longest floating-point prefix of `bytes`: optional whitespace
/// and sign, digits with optional fraction and exponent. Returns `None` when
/// no digit is found.
pub fn parse_real_prefix(bytes: &[u8]) -> Option<f64> {
    let start = skip_space_and_sign(bytes);
    let sign_start = bytes[..start]
        .iter()
        .position(|&b| b == b'+' || b == b'-')
        .unwrap_or(start);

    let mut i = start;
    let mut seen = false;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
        seen = true;
    }
    if bytes.get(i) == Some(&b'.') {
        let mut j = i + 1;
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
            seen = true;
        }
        if j > i + 1 || seen {
            i = j;
        }
    }
    if !seen {
        return None;
    }
    if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+') | Some(b'-')) {
            j += 1;
        }
        let exp_digits = j;
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > exp_digits {
            i = j;
        }
    }

    let text = core::str::from_utf8(&bytes[sign_start..i]).ok()?;
    text.parse::<f64>().ok()
}

/// Skips leading whitespace and at most one sign character.
fn skip_space_and_sign(bytes: &[u8]) -> usize {
    let mut i = 0;
    while bytes.get(i).is_some_and(|b| b.is_ascii_whitespace()) {
        i += 1;
    }
    if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
        i += 1;
    }
    i
}
