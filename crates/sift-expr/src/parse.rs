//! Expression parsing by precedence climbing.
//!
//! # Operator precedence (higher binds tighter)
//!
//! | Level | Operators | Associativity |
//! |-------|-----------|---------------|
//! | 12 | `.` (member access) | Left |
//! | 11 | unary `~` | Right |
//! | 10 | *COLLATE* (reserved) | Right |
//! | 9 | `*`, `/`, `%` | Left |
//! | 8 | unary `+`, unary `-` | Right |
//! | 7 | `+`, `-` | Left |
//! | 6 | `&`, `\|`, `<<`, `>>` | Left |
//! | 5 | *ESCAPE* (reserved) | Right |
//! | 4 | `<`, `<=`, `>`, `>=` | Left |
//! | 3 | `=`/`==`, `<>`/`!=`, *LIKE*, *BETWEEN* (reserved) | Left |
//! | 2 | `NOT` | Right |
//! | 1 | `AND` | Left |
//! | 0 | `OR` | Left |
//!
//! # Parse-time behavior
//!
//! The parser folds every subexpression it can already decide: both operands
//! literal constants and a deterministic operator means the subtree is
//! evaluated on the spot through the same kernel the evaluator uses, so a
//! literal-only expression parses straight to one constant.
//!
//! A binary `-` whose left side is not a literal is rewritten into `+` with
//! the minus pushed back into the input, where the operand parse re-reads it
//! as unary minus. This keeps literal tails of additive chains foldable:
//! `height-1*2-3` parses as `+(height, -5)`.
//!
//! Dotted names collapse inside the parser: `a.b.c` becomes the single
//! identifier `a.b.c`, because dotted identifiers denote nested sample
//! fields and must survive into the optimized tree as one atomic name. No
//! tree ever contains a member-access operator.
//!
//! Every distinct `?N` interns exactly one shared slot; repeated uses of the
//! same index reuse it, so binding once reaches every use site.
//!
//! # Errors
//!
//! The reported byte offset is stable: one past the offending token (end of
//! input counts as an empty offending token at the input length), or the
//! position where parsing stopped when trailing input remains.

use crate::ast::{Arena, Assoc, NodeId, NodeKind, Op};
use crate::error::ExprError;
use crate::eval::eval_op;
use crate::slots::{SlotMode, SlotTable};
use crate::value::Value;
use crate::Expr;
use sift_lex::{materialize_numeric, materialize_string, scan, Numeric, TokenKind};

/// Parses `source` into a parameter-keyed expression.
pub(crate) fn parse(source: &str) -> Result<Expr, ExprError> {
    let mut parser = Parser {
        src: source.as_bytes(),
        pos: 0,
        arena: Arena::new(),
        slots: SlotTable::new(SlotMode::Parameter),
    };
    let operand = parser.parse_expr(0)?;
    parser.skip_trivia();
    if parser.pos < parser.src.len() {
        return Err(ExprError::Parse { pos: parser.pos });
    }
    let root = parser.to_node(operand);
    let Parser { arena, slots, .. } = parser;
    Ok(Expr { arena, root, slots })
}

/// Intermediate parse result: a folded literal, a (possibly dotted)
/// identifier not yet committed to the tree, or a built subtree.
enum Operand {
    Lit(Value),
    Ident(Box<str>),
    Node(NodeId),
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    arena: Arena,
    slots: SlotTable,
}

impl Parser<'_> {
    fn skip_trivia(&mut self) {
        while let Some(token) = scan(&self.src[self.pos..]) {
            if token.kind.is_trivia() {
                self.pos += token.len;
            } else {
                break;
            }
        }
    }

    /// Precedence climbing: parse a primary, then consume infix operators
    /// binding at least as tightly as `min_prec`.
    fn parse_expr(&mut self, min_prec: u8) -> Result<Operand, ExprError> {
        let mut lhs = self.parse_primary()?;
        loop {
            self.skip_trivia();
            let start = self.pos;
            let Some(token) = scan(&self.src[self.pos..]) else {
                break;
            };

            if token.kind == TokenKind::Concat {
                return Err(ExprError::Unsupported("||"));
            }

            if token.kind == TokenKind::Dot {
                self.pos += token.len;
                let dot_end = self.pos;
                let rhs = self.parse_expr(13)?;
                let merged = match (&lhs, &rhs) {
                    (Operand::Ident(l), Operand::Ident(r)) => format!("{l}.{r}"),
                    _ => return Err(ExprError::Parse { pos: dot_end }),
                };
                lhs = Operand::Ident(merged.into_boxed_str());
                continue;
            }

            let Some(mut op) = infix_op(token.kind) else {
                // Not an operator: leave it for the caller; the top level
                // reports it as trailing input.
                break;
            };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.pos += token.len;

            let mut next_min = prec + (op.assoc() == Assoc::Left) as u8;
            if op == Op::Sub && !matches!(lhs, Operand::Lit(_)) {
                // x - y over a non-literal x becomes x + (signed y): push the
                // minus back so the operand parse re-reads it as unary and
                // literal tails keep folding. The operand parse stays at the
                // additive level so looser operators are not swallowed.
                op = Op::Add;
                self.pos = start;
                next_min = prec;
            }

            let rhs = self.parse_expr(next_min)?;
            lhs = self.combine(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    /// One primary: literal, identifier, parameter, parenthesized expression
    /// or prefix operator.
    fn parse_primary(&mut self) -> Result<Operand, ExprError> {
        self.skip_trivia();
        let start = self.pos;
        let Some(token) = scan(&self.src[self.pos..]) else {
            return Err(ExprError::Parse { pos: self.pos });
        };
        let end = start + token.len;
        let slice = &self.src[start..end];

        match token.kind {
            TokenKind::LParen => {
                self.pos = end;
                let inner = self.parse_expr(0)?;
                self.skip_trivia();
                let Some(close) = scan(&self.src[self.pos..]) else {
                    return Err(ExprError::Parse { pos: self.pos });
                };
                if close.kind != TokenKind::RParen {
                    return Err(ExprError::Parse {
                        pos: self.pos + close.len,
                    });
                }
                self.pos += close.len;
                Ok(inner)
            }
            TokenKind::Integer | TokenKind::Float | TokenKind::QNumber => {
                self.pos = end;
                let (value, _) = materialize_numeric(slice, token.kind)
                    .map_err(|_| ExprError::Parse { pos: end })?;
                Ok(Operand::Lit(match value {
                    Numeric::Int(i) => Value::Int(i),
                    Numeric::Real(r) => Value::Real(r),
                }))
            }
            TokenKind::String => {
                self.pos = end;
                Ok(Operand::Lit(Value::Text(materialize_string(
                    slice, token.kind,
                ))))
            }
            TokenKind::Blob => {
                self.pos = end;
                Ok(Operand::Lit(Value::Blob(materialize_string(
                    slice, token.kind,
                ))))
            }
            TokenKind::Id => {
                self.pos = end;
                let name = materialize_string(slice, token.kind);
                let name = String::from_utf8_lossy(&name).into_owned();
                Ok(Operand::Ident(name.into_boxed_str()))
            }
            TokenKind::Variable => {
                self.pos = end;
                let digits = &slice[1..];
                let index = materialize_numeric(digits, TokenKind::Integer)
                    .ok()
                    .and_then(|(value, _)| match value {
                        Numeric::Int(i) => u32::try_from(i).ok(),
                        Numeric::Real(_) => None,
                    })
                    .ok_or(ExprError::Parse { pos: end })?;
                let slot = self.slots.intern_param(index);
                Ok(Operand::Node(self.arena.leaf(NodeKind::Slot(slot))))
            }
            TokenKind::Minus => {
                self.pos = end;
                self.parse_unary(Op::Neg)
            }
            TokenKind::Plus => {
                self.pos = end;
                self.parse_unary(Op::Pos)
            }
            TokenKind::BitNot => {
                self.pos = end;
                self.parse_unary(Op::BitNot)
            }
            TokenKind::Not => {
                self.pos = end;
                self.parse_unary(Op::Not)
            }
            _ => {
                // Operator or junk where an operand belongs.
                self.pos = end;
                Err(ExprError::Parse { pos: end })
            }
        }
    }

    fn parse_unary(&mut self, op: Op) -> Result<Operand, ExprError> {
        let operand = self.parse_expr(op.precedence())?;
        match operand {
            Operand::Lit(value) => {
                let folded =
                    eval_op(op, None, value).map_err(|_| ExprError::Parse { pos: self.pos })?;
                Ok(Operand::Lit(folded))
            }
            other => {
                let child = self.to_node(other);
                Ok(Operand::Node(self.arena.op(op, None, child)))
            }
        }
    }

    /// Folds literal-literal applications immediately; everything else
    /// becomes a tree node.
    fn combine(&mut self, op: Op, lhs: Operand, rhs: Operand) -> Result<Operand, ExprError> {
        match (lhs, rhs) {
            (Operand::Lit(l), Operand::Lit(r)) => {
                let folded =
                    eval_op(op, Some(l), r).map_err(|_| ExprError::Parse { pos: self.pos })?;
                Ok(Operand::Lit(folded))
            }
            (lhs, rhs) => {
                let l = self.to_node(lhs);
                let r = self.to_node(rhs);
                Ok(Operand::Node(self.arena.op(op, Some(l), r)))
            }
        }
    }

    fn to_node(&mut self, operand: Operand) -> NodeId {
        match operand {
            Operand::Lit(value) => self.arena.leaf(NodeKind::Const(value)),
            Operand::Ident(name) => self.arena.leaf(NodeKind::Ident(name)),
            Operand::Node(id) => id,
        }
    }
}

fn infix_op(kind: TokenKind) -> Option<Op> {
    Some(match kind {
        TokenKind::Or => Op::Or,
        TokenKind::And => Op::And,
        TokenKind::Eq => Op::Eq,
        TokenKind::Ne => Op::Ne,
        TokenKind::Lt => Op::Lt,
        TokenKind::Le => Op::Le,
        TokenKind::Gt => Op::Gt,
        TokenKind::Ge => Op::Ge,
        TokenKind::BitAnd => Op::BitAnd,
        TokenKind::BitOr => Op::BitOr,
        TokenKind::Shl => Op::Shl,
        TokenKind::Shr => Op::Shr,
        TokenKind::Plus => Op::Add,
        TokenKind::Minus => Op::Sub,
        TokenKind::Star => Op::Mul,
        TokenKind::Slash => Op::Div,
        TokenKind::Rem => Op::Rem,
        _ => return None,
    })
}
