//! The evaluator: operator kernel and short-circuiting tree walk.
//!
//! The kernel [`eval_op`] is shared by three callers: the parser (folding
//! literal subexpressions at parse time), the optimizer (folding after
//! parameters are bound) and the evaluator proper. It applies the operator's
//! operand affinity to each side, lifts both sides to the join of their
//! affinities so they share a representation, and dispatches through a match.
//!
//! Operands passed in are owned copies; shared parameter/variable slots are
//! never mutated by evaluation.

use crate::ast::{NodeId, NodeKind, Op};
use crate::error::ExprError;
use crate::slots::SlotKey;
use crate::value::{Affinity, Value};
use crate::Expr;

/// Applies `op` to its operands. `lhs` is `None` for unary operators.
pub(crate) fn eval_op(op: Op, lhs: Option<Value>, rhs: Value) -> Result<Value, ExprError> {
    let mut lhs = lhs;
    let mut rhs = rhs;

    let operand_affinity = op.operand_affinity();
    let mut left_affinity = Affinity::None;
    if let Some(l) = lhs.as_mut() {
        left_affinity = l.apply_affinity(operand_affinity)?;
    }
    let right_affinity = rhs.apply_affinity(operand_affinity)?;

    let join = left_affinity.max(right_affinity);
    if let Some(l) = lhs.as_mut() {
        l.apply_affinity(join)?;
    }
    rhs.apply_affinity(join)?;

    match lhs {
        None => eval_unary(op, rhs),
        Some(lhs) => eval_binary(op, lhs, rhs),
    }
}

/// Numeric truth test. Only called after NUMERIC coercion.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Int(i) => *i != 0,
        Value::Real(r) => *r != 0.0,
        Value::Text(_) | Value::Blob(_) => false,
    }
}

/// Whether a constant counts as zero under NUMERIC coercion. Text that
/// parses as nothing numeric is zero.
pub(crate) fn is_zero(value: &Value) -> bool {
    match value {
        Value::Int(i) => *i == 0,
        Value::Real(r) => *r == 0.0,
        Value::Text(_) | Value::Blob(_) => {
            let mut v = value.clone();
            match v.apply_affinity(Affinity::Numeric) {
                Ok(_) => is_zero(&v),
                Err(_) => true,
            }
        }
    }
}

/// Short-circuit rules shared by the optimizer and the evaluator:
/// `0 AND x -> 0`, `1 OR x -> 1`, `0 * x -> 0`, result normalized to the
/// integer 0/1.
pub(crate) fn short_circuit(op: Op, first: &Value) -> Option<Value> {
    match op {
        Op::And | Op::Mul if is_zero(first) => Some(Value::Int(0)),
        Op::Or if !is_zero(first) => Some(Value::Int(1)),
        _ => None,
    }
}

fn eval_unary(op: Op, rhs: Value) -> Result<Value, ExprError> {
    // The affinity prologue guarantees numeric (or integer) operands here.
    let value = match (op, rhs) {
        (Op::Not, v) => Value::Int(!truthy(&v) as i64),
        (Op::Neg, Value::Int(i)) => Value::Int(i.wrapping_neg()),
        (Op::Neg, Value::Real(r)) => Value::Real(-r),
        (Op::Pos, v) => v,
        (Op::BitNot, Value::Int(i)) => Value::Int(!i),
        _ => unreachable!("unary operator on a non-numeric operand"),
    };
    Ok(value)
}

fn eval_binary(op: Op, lhs: Value, rhs: Value) -> Result<Value, ExprError> {
    use Value::{Int, Real};

    let value = match op {
        Op::And => Value::Int((truthy(&lhs) && truthy(&rhs)) as i64),
        Op::Or => Value::Int((truthy(&lhs) || truthy(&rhs)) as i64),

        Op::Eq | Op::Ne | Op::Lt | Op::Le | Op::Gt | Op::Ge => compare(op, &lhs, &rhs),

        Op::BitAnd | Op::BitOr | Op::Shl | Op::Shr => {
            let (Int(a), Int(b)) = (&lhs, &rhs) else {
                unreachable!("bitwise operator on non-integer operands");
            };
            Int(match op {
                Op::BitAnd => a & b,
                Op::BitOr => a | b,
                Op::Shl => a.wrapping_shl(*b as u32),
                _ => a.wrapping_shr(*b as u32),
            })
        }

        Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Rem => match (lhs, rhs) {
            (Int(a), Int(b)) => Int(match op {
                Op::Add => a.wrapping_add(b),
                Op::Sub => a.wrapping_sub(b),
                Op::Mul => a.wrapping_mul(b),
                Op::Div | Op::Rem if b == 0 => return Err(ExprError::DivisionByZero),
                Op::Div => a.wrapping_div(b),
                _ => a.wrapping_rem(b),
            }),
            (Real(a), Real(b)) => Real(match op {
                Op::Add => a + b,
                Op::Sub => a - b,
                Op::Mul => a * b,
                Op::Div | Op::Rem if b == 0.0 => return Err(ExprError::DivisionByZero),
                Op::Div => a / b,
                _ => a % b,
            }),
            _ => unreachable!("arithmetic on mismatched operands after join"),
        },

        Op::Not | Op::Neg | Op::Pos | Op::BitNot => {
            unreachable!("unary operator dispatched as binary")
        }
    };
    Ok(value)
}

/// Comparison dispatch. The affinity join guarantees both operands share a
/// representation: signed 64-bit comparison for INTEGER, strict-inequality
/// tests for REAL (equality is `!(a<b) && !(a>b)`), and length-then-bytewise
/// comparison for TEXT/BLOB with the shorter length as the prefix bound.
fn compare(op: Op, lhs: &Value, rhs: &Value) -> Value {
    let eq = value_eq(lhs, rhs);
    let result = match op {
        Op::Eq => eq,
        Op::Ne => !eq,
        Op::Lt => value_lt(lhs, rhs),
        Op::Gt => value_gt(lhs, rhs),
        Op::Le => eq || value_lt(lhs, rhs),
        Op::Ge => eq || value_gt(lhs, rhs),
        _ => unreachable!(),
    };
    Value::Int(result as i64)
}

fn value_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Real(a), Value::Real(b)) => !(a < b || a > b),
        (Value::Text(a) | Value::Blob(a), Value::Text(b) | Value::Blob(b)) => {
            a.len() == b.len() && a == b
        }
        _ => unreachable!("comparison on mismatched operands after join"),
    }
}

fn value_lt(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a < b,
        (Value::Real(a), Value::Real(b)) => a < b,
        (Value::Text(a) | Value::Blob(a), Value::Text(b) | Value::Blob(b)) => {
            let n = a.len().min(b.len());
            a[..n] < b[..n]
        }
        _ => unreachable!("comparison on mismatched operands after join"),
    }
}

fn value_gt(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a > b,
        (Value::Real(a), Value::Real(b)) => a > b,
        (Value::Text(a) | Value::Blob(a), Value::Text(b) | Value::Blob(b)) => {
            let n = a.len().min(b.len());
            a[..n] > b[..n]
        }
        _ => unreachable!("comparison on mismatched operands after join"),
    }
}

/// Evaluates one subtree to a constant.
pub(crate) fn eval_node(expr: &Expr, id: NodeId) -> Result<Value, ExprError> {
    let node = expr.arena.node(id);
    match &node.kind {
        NodeKind::Const(v) => Ok(v.clone()),
        NodeKind::Slot(slot) => match expr.slots.value(*slot) {
            Some(v) => Ok(v.clone()),
            None => Err(ExprError::Unbound(key_name(expr.slots.key(*slot)))),
        },
        NodeKind::Ident(name) => Err(ExprError::Unbound(name.clone())),
        NodeKind::Op(op) => {
            let op = *op;
            if op.is_unary() {
                let Some(right) = node.right else {
                    unreachable!("unary node missing its operand");
                };
                let rv = eval_node(expr, right)?;
                return eval_op(op, None, rv);
            }
            let (left, right) = match (node.left, node.right) {
                (Some(l), Some(r)) => (l, r),
                _ => unreachable!("binary node missing a child"),
            };
            if matches!(op, Op::And | Op::Or | Op::Mul) {
                // Shorter subtree first; its value alone may decide.
                let first_is_left =
                    expr.arena.node(left).height <= expr.arena.node(right).height;
                let (first, second) = if first_is_left {
                    (left, right)
                } else {
                    (right, left)
                };
                let fv = eval_node(expr, first)?;
                if let Some(result) = short_circuit(op, &fv) {
                    return Ok(result);
                }
                let sv = eval_node(expr, second)?;
                let (lv, rv) = if first_is_left { (fv, sv) } else { (sv, fv) };
                return eval_op(op, Some(lv), rv);
            }
            let lv = eval_node(expr, left)?;
            let rv = eval_node(expr, right)?;
            eval_op(op, Some(lv), rv)
        }
    }
}

/// Full evaluation: walk the tree, then require a numeric result.
pub(crate) fn eval(expr: &Expr) -> Result<Value, ExprError> {
    let mut result = eval_node(expr, expr.root)?;
    result.apply_affinity(Affinity::Numeric)?;
    Ok(result)
}

pub(crate) fn key_name(key: &SlotKey) -> Box<str> {
    match key {
        SlotKey::Param(index) => format!("?{index}").into_boxed_str(),
        SlotKey::Var(name) => name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_comparisons() {
        let r = eval_op(Op::Lt, Some(Value::Int(1)), Value::Int(2)).unwrap();
        assert_eq!(r, Value::Int(1));
        let r = eval_op(Op::Ge, Some(Value::Int(2)), Value::Int(2)).unwrap();
        assert_eq!(r, Value::Int(1));
    }

    #[test]
    fn test_int_real_join() {
        // INTEGER lifts to REAL at the join
        let r = eval_op(Op::Add, Some(Value::Int(1)), Value::Real(0.5)).unwrap();
        assert_eq!(r, Value::Real(1.5));
    }

    #[test]
    fn test_strict_text_comparison() {
        // '0.1' < 1 joins at INTEGER: the text parses to 0, so the result is
        // true (the SQLite shell would say false).
        let r = eval_op(
            Op::Lt,
            Some(Value::Text(b"0.1".to_vec())),
            Value::Int(1),
        )
        .unwrap();
        assert_eq!(r, Value::Int(1));
    }

    #[test]
    fn test_text_prefix_comparison() {
        // equal prefix, different length: neither equal nor ordered
        let a = Value::Text(b"abc".to_vec());
        let b = Value::Text(b"abcd".to_vec());
        assert_eq!(eval_op(Op::Eq, Some(a.clone()), b.clone()), Ok(Value::Int(0)));
        assert_eq!(eval_op(Op::Lt, Some(a.clone()), b.clone()), Ok(Value::Int(0)));
        assert_eq!(eval_op(Op::Gt, Some(a), b), Ok(Value::Int(0)));
    }

    #[test]
    fn test_blob_joins_text() {
        let r = eval_op(
            Op::Eq,
            Some(Value::Blob(b"abc".to_vec())),
            Value::Text(b"abc".to_vec()),
        )
        .unwrap();
        assert_eq!(r, Value::Int(1));
    }

    #[test]
    fn test_bitwise_requires_integer() {
        assert_eq!(
            eval_op(Op::BitAnd, Some(Value::Real(1.5)), Value::Int(1)),
            Err(ExprError::Coerce)
        );
        assert_eq!(
            eval_op(Op::Shl, Some(Value::Int(1)), Value::Int(0)),
            Ok(Value::Int(1))
        );
        assert_eq!(
            eval_op(Op::BitNot, None, Value::Int(0)),
            Ok(Value::Int(-1))
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            eval_op(Op::Div, Some(Value::Int(1)), Value::Int(0)),
            Err(ExprError::DivisionByZero)
        );
        assert_eq!(
            eval_op(Op::Rem, Some(Value::Real(1.0)), Value::Real(0.0)),
            Err(ExprError::DivisionByZero)
        );
    }

    #[test]
    fn test_unary_numeric_coercion() {
        // unary + coerces its operand to numeric
        assert_eq!(
            eval_op(Op::Pos, None, Value::Text(b"abc".to_vec())),
            Ok(Value::Real(0.0))
        );
        assert_eq!(eval_op(Op::Neg, None, Value::Int(5)), Ok(Value::Int(-5)));
        assert_eq!(
            eval_op(Op::Not, None, Value::Real(0.0)),
            Ok(Value::Int(1))
        );
    }

    #[test]
    fn test_short_circuit_rules() {
        assert_eq!(short_circuit(Op::And, &Value::Int(0)), Some(Value::Int(0)));
        assert_eq!(short_circuit(Op::Mul, &Value::Real(0.0)), Some(Value::Int(0)));
        assert_eq!(short_circuit(Op::Or, &Value::Int(7)), Some(Value::Int(1)));
        assert_eq!(short_circuit(Op::Or, &Value::Int(0)), None);
        assert_eq!(short_circuit(Op::And, &Value::Int(1)), None);
        assert_eq!(short_circuit(Op::Eq, &Value::Int(0)), None);
        // text decides through its numeric image
        assert_eq!(
            short_circuit(Op::And, &Value::Text(b"abc".to_vec())),
            Some(Value::Int(0))
        );
    }
}
