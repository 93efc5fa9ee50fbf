//! The scanner: one token per call.

use crate::class::{classify, is_ident_char, is_space, CharClass};
use crate::token::TokenKind;

/// A scanned token: its kind and the number of bytes it spans.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub len: usize,
}

impl Token {
    #[inline]
    fn new(kind: TokenKind, len: usize) -> Self {
        Token { kind, len }
    }
}

#[inline]
fn at(input: &[u8], i: usize) -> u8 {
    input.get(i).copied().unwrap_or(0)
}

/// Scans one token from the head of `input`.
///
/// Returns `None` on empty input; otherwise the token always spans at least
/// one byte, so repeated calls make progress on any input. Malformed
/// constructs yield [`TokenKind::Illegal`] covering the smallest reasonable
/// range so the caller can report a precise error offset.
pub fn scan(input: &[u8]) -> Option<Token> {
    let first = *input.first()?;

    let token = match classify(first) {
        CharClass::Space => {
            let mut i = 1;
            while is_space(at(input, i)) {
                i += 1;
            }
            Token::new(TokenKind::Space, i)
        }
        CharClass::Minus => {
            if at(input, 1) == b'-' {
                let mut i = 2;
                while at(input, i) != 0 && at(input, i) != b'\n' {
                    i += 1;
                }
                Token::new(TokenKind::Comment, i)
            } else {
                Token::new(TokenKind::Minus, 1)
            }
        }
        CharClass::Slash => scan_slash(input),
        CharClass::LParen => Token::new(TokenKind::LParen, 1),
        CharClass::RParen => Token::new(TokenKind::RParen, 1),
        CharClass::Plus => Token::new(TokenKind::Plus, 1),
        CharClass::Star => Token::new(TokenKind::Star, 1),
        CharClass::Percent => Token::new(TokenKind::Rem, 1),
        CharClass::Comma => Token::new(TokenKind::Comma, 1),
        CharClass::Amp => Token::new(TokenKind::BitAnd, 1),
        CharClass::Tilde => Token::new(TokenKind::BitNot, 1),
        CharClass::Eq => Token::new(TokenKind::Eq, if at(input, 1) == b'=' { 2 } else { 1 }),
        CharClass::Lt => match at(input, 1) {
            b'=' => Token::new(TokenKind::Le, 2),
            b'>' => Token::new(TokenKind::Ne, 2),
            b'<' => Token::new(TokenKind::Shl, 2),
            _ => Token::new(TokenKind::Lt, 1),
        },
        CharClass::Gt => match at(input, 1) {
            b'=' => Token::new(TokenKind::Ge, 2),
            b'>' => Token::new(TokenKind::Shr, 2),
            _ => Token::new(TokenKind::Gt, 1),
        },
        CharClass::Bang => {
            if at(input, 1) == b'=' {
                Token::new(TokenKind::Ne, 2)
            } else {
                Token::new(TokenKind::Illegal, 1)
            }
        }
        CharClass::Pipe => {
            if at(input, 1) == b'|' {
                Token::new(TokenKind::Concat, 2)
            } else {
                Token::new(TokenKind::BitOr, 1)
            }
        }
        CharClass::Quote => scan_quoted(input, first),
        CharClass::Dot => {
            if at(input, 1).is_ascii_digit() {
                scan_number(input)
            } else {
                Token::new(TokenKind::Dot, 1)
            }
        }
        CharClass::Digit => scan_number(input),
        CharClass::VarNum => {
            // The digit run is mandatory: a bare `?` does not auto-number.
            let mut i = 1;
            while at(input, i).is_ascii_digit() {
                i += 1;
            }
            if i > 1 {
                Token::new(TokenKind::Variable, i)
            } else {
                Token::new(TokenKind::Illegal, 1)
            }
        }
        CharClass::X => {
            if at(input, 1) == b'\'' {
                scan_blob(input)
            } else {
                scan_ident(input, 1)
            }
        }
        CharClass::KeywordStart => scan_keyword_or_ident(input),
        CharClass::Keyword | CharClass::Ident => scan_ident(input, 1),
        CharClass::Illegal => Token::new(TokenKind::Illegal, 1),
    };

    debug_assert!(token.len >= 1);
    Some(token)
}

/// `/` alone, or a `/* … */` block comment.
fn scan_slash(input: &[u8]) -> Token {
    if at(input, 1) != b'*' || at(input, 2) == 0 {
        return Token::new(TokenKind::Slash, 1);
    }
    let mut i = 2;
    loop {
        match at(input, i) {
            0 => return Token::new(TokenKind::Comment, i),
            b'*' if at(input, i + 1) == b'/' => return Token::new(TokenKind::Comment, i + 2),
            _ => i += 1,
        }
    }
}

/// `'…'` string, `` `…` ``/`"…"` quoted identifier; unterminated is illegal.
fn scan_quoted(input: &[u8], delim: u8) -> Token {
    let mut i = 1;
    loop {
        let c = at(input, i);
        if c == 0 {
            // Unterminated: span up to the end, excluding nothing to resume on.
            return Token::new(TokenKind::Illegal, i);
        }
        if c == delim {
            let kind = if delim == b'\'' {
                TokenKind::String
            } else {
                TokenKind::Id
            };
            return Token::new(kind, i + 1);
        }
        i += 1;
    }
}

/// `x'HH…'` blob literal; odd digit counts and missing quotes are illegal.
fn scan_blob(input: &[u8]) -> Token {
    let mut i = 2;
    while at(input, i).is_ascii_hexdigit() {
        i += 1;
    }
    let ndigits = i - 2;
    if at(input, i) != b'\'' || ndigits % 2 != 0 {
        while at(input, i) != 0 && at(input, i) != b'\'' {
            i += 1;
        }
        if at(input, i) != 0 {
            i += 1;
        }
        return Token::new(TokenKind::Illegal, i);
    }
    Token::new(TokenKind::Blob, i + 1)
}

/// Numeric literal: decimal or `0x` hex integer, float with optional
/// exponent, any of them with `_` separators (`QNumber`). Identifier
/// characters glued to the end poison the whole run.
fn scan_number(input: &[u8]) -> Token {
    let mut kind = TokenKind::Integer;
    let mut i;

    if at(input, 0) == b'0'
        && (at(input, 1) == b'x' || at(input, 1) == b'X')
        && at(input, 2).is_ascii_hexdigit()
    {
        i = 3;
        loop {
            let c = at(input, i);
            if !c.is_ascii_hexdigit() {
                if c == b'_' {
                    kind = TokenKind::QNumber;
                } else {
                    break;
                }
            }
            i += 1;
        }
    } else {
        i = 0;
        i = digit_run(input, i, &mut kind);
        if at(input, i) == b'.' {
            if kind == TokenKind::Integer {
                kind = TokenKind::Float;
            }
            i = digit_run(input, i + 1, &mut kind);
        }
        let c = at(input, i);
        if (c == b'e' || c == b'E')
            && (at(input, i + 1).is_ascii_digit()
                || ((at(input, i + 1) == b'+' || at(input, i + 1) == b'-')
                    && at(input, i + 2).is_ascii_digit()))
        {
            if kind == TokenKind::Integer {
                kind = TokenKind::Float;
            }
            i = digit_run(input, i + 2, &mut kind);
        }
    }

    while is_ident_char(at(input, i)) {
        kind = TokenKind::Illegal;
        i += 1;
    }
    Token::new(kind, i)
}

/// Consumes digits and `_` separators; a separator demotes `kind` to QNumber.
fn digit_run(input: &[u8], mut i: usize, kind: &mut TokenKind) -> usize {
    loop {
        let c = at(input, i);
        if !c.is_ascii_digit() {
            if c == b'_' {
                *kind = TokenKind::QNumber;
            } else {
                return i;
            }
        }
        i += 1;
    }
}

/// Bare identifier starting at byte `start` (the head bytes are already
/// accepted).
fn scan_ident(input: &[u8], start: usize) -> Token {
    let mut i = start;
    while is_ident_char(at(input, i)) {
        i += 1;
    }
    Token::new(TokenKind::Id, i)
}

/// Identifier that may turn out to be one of the three keywords.
fn scan_keyword_or_ident(input: &[u8]) -> Token {
    let t = scan_ident(input, 1);
    let kind = match &input[..t.len] {
        b"OR" => TokenKind::Or,
        b"AND" => TokenKind::And,
        b"NOT" => TokenKind::Not,
        _ => TokenKind::Id,
    };
    Token::new(kind, t.len)
}
