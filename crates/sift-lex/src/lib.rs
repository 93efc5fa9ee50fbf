//! sift-lex - Lexical Analyzer for the filter expression language
//!
//! ============================================================================
//! OVERVIEW
//! ============================================================================
//!
//! The filter expression language is a small SQL-92-flavored boolean language
//! evaluated against data samples. This crate is its first phase: it turns a
//! byte string into a stream of classified tokens.
//!
//! The scanner is a function, not a struct:
//!
//! ```text
//!   scan: &[u8] -> Option<Token { kind, len }>
//! ```
//!
//! One call classifies exactly one token starting at the head of the slice and
//! reports how many bytes it spans. The caller owns the cursor. This shape
//! matches how the parser consumes tokens (it frequently needs to rewind by
//! exactly one token) and keeps the scanner allocation-free.
//!
//! TOTALITY:
//! ---------
//! For every non-empty input, `scan` returns a token with `len >= 1`. There
//! is no way to get stuck: bytes that fit no rule become an `Illegal` token
//! spanning the smallest reasonable range, so the parser can report a precise
//! byte offset.
//!
//! TOKEN CATEGORIES:
//! -----------------
//! 1. LITERALS
//!    - Integer: `42`, `0xFF` (hex)
//!    - Float: `3.14`, `.5`, `1e10`, `2.5E-3`
//!    - QNumber: any numeric containing `_` digit separators (`1_000`);
//!      materialization strips the separators and re-scans to find the real
//!      kind
//!    - String: `'abc'` (single quotes only)
//!    - Blob: `x'414243'` / `X'…'`, even number of hex digits required
//!
//! 2. IDENTIFIERS
//!    - bare: `[A-Za-z_]+` (digits are NOT identifier characters)
//!    - quoted: `` `name` `` or `"name"` (may then contain anything)
//!
//! 3. KEYWORDS
//!    Exactly three, recognized case-sensitively and only when the whole
//!    identifier matches: `AND`, `OR`, `NOT`. Every other word (`LIKE`,
//!    `BETWEEN`, …) is a plain identifier.
//!
//! 4. OPERATORS & PUNCTUATION
//!    All common comparison spellings (`=`/`==`, `<>`/`!=`, `<`, `<=`, `>`,
//!    `>=`), shifts (`<<`, `>>`), bitwise (`&`, `|`, `~`), arithmetic
//!    (`+`, `-`, `*`, `/`, `%`), parentheses, `,`, `.` and `||` (reserved
//!    concatenation, rejected later by the parser).
//!
//! 5. PARAMETERS
//!    `?N` with a mandatory digit run. A bare `?` (or `?a`) is `Illegal`.
//!
//! 6. TRIVIA
//!    Whitespace runs, `--` line comments and `/* … */` block comments are
//!    returned as `Space`/`Comment` tokens; the parser skips them.
//!
//! IMPLEMENTATION:
//! ---------------
//! Classification is table-driven: a 256-entry byte-class table collapses the
//! input alphabet into ~25 classes, and `scan` dispatches on the class of the
//! first byte. See `class.rs`.

mod class;
mod error;
mod numeric;
mod scan;
mod string;
mod token;

pub use error::LexError;
pub use numeric::{materialize_numeric, parse_int_prefix, parse_real_prefix, Numeric};
pub use scan::{scan, Token};
pub use string::materialize_string;
pub use token::TokenKind;
