//! Prefix-form tree rendering, used by tests to pin down tree shapes.

use crate::ast::{NodeId, NodeKind, Op};
use crate::slots::SlotKey;
use crate::value::Value;
use crate::Expr;
use std::fmt::Write;

/// Renders the whole tree in `op(left,right)` prefix form. Parameter and
/// variable slots render as `?<key>`, identifiers as `?<name>`.
pub(crate) fn render(expr: &Expr) -> String {
    let mut out = String::new();
    render_node(expr, expr.root, &mut out);
    out
}

pub(crate) fn render_value(value: &Value, out: &mut String) {
    match value {
        Value::Int(i) => {
            let _ = write!(out, "{i}");
        }
        Value::Real(r) => {
            let _ = write!(out, "{r:.6}");
        }
        Value::Text(bytes) | Value::Blob(bytes) => {
            out.push_str(&String::from_utf8_lossy(bytes));
        }
    }
}

fn render_node(expr: &Expr, id: NodeId, out: &mut String) {
    let node = expr.arena.node(id);
    match &node.kind {
        NodeKind::Const(value) => render_value(value, out),
        NodeKind::Ident(name) => {
            let _ = write!(out, "?{name}");
        }
        NodeKind::Slot(slot) => match expr.slots.key(*slot) {
            SlotKey::Param(index) => {
                let _ = write!(out, "?{index}");
            }
            SlotKey::Var(name) => {
                let _ = write!(out, "?{name}");
            }
        },
        NodeKind::Op(op) => {
            out.push_str(symbol(*op));
            out.push('(');
            if let Some(left) = node.left {
                render_node(expr, left, out);
                out.push(',');
            }
            if let Some(right) = node.right {
                render_node(expr, right, out);
            }
            out.push(')');
        }
    }
}

fn symbol(op: Op) -> &'static str {
    match op {
        Op::Or => "OR",
        Op::And => "AND",
        Op::Not => "NOT",
        Op::Eq => "=",
        Op::Ne => "!=",
        Op::Lt => "<",
        Op::Le => "<=",
        Op::Gt => ">",
        Op::Ge => ">=",
        Op::BitAnd => "&",
        Op::BitOr => "|",
        Op::BitNot => "~",
        Op::Shl => "<<",
        Op::Shr => ">>",
        Op::Add | Op::Pos => "+",
        Op::Sub | Op::Neg => "-",
        Op::Mul => "*",
        Op::Div => "/",
        Op::Rem => "%",
    }
}
