//! Binding & building: turning a parsed, parameter-keyed expression into an
//! optimized, variable-keyed one ready for repeated evaluation.
//!
//! The walk is post-order and visits the shorter subtree first (heights are
//! cached on the nodes). Three things happen on the way up:
//!
//! 1. every parameter slot is inlined as a literal (unbound parameters
//!    default to integer 0 — variables are never defaulted, binding them is
//!    the caller's per-sample job);
//! 2. a reduced subtree that already decides `AND`/`OR`/`*` short-circuits
//!    the whole operator (`0 AND x -> 0`, `1 OR x -> 1`, `0 * x -> 0`), and
//!    two literal children fold through the evaluation kernel;
//! 3. every surviving free identifier is interned into the variable-keyed
//!    slot table and its leaf rewritten to the shared slot.
//!
//! Afterwards, slots that no reachable node references are dropped, so
//! `nparams` of the result equals the number of distinct sample fields the
//! evaluator will actually need.

use crate::ast::{Arena, NodeId, NodeKind, Op};
use crate::error::ExprError;
use crate::eval::{eval_op, short_circuit};
use crate::slots::{SlotId, SlotKey, SlotMode, SlotTable};
use crate::value::Value;
use crate::Expr;
use rustc_hash::FxHashSet;

/// Builds the optimized, variable-keyed form of a parsed expression.
pub(crate) fn build(src: &Expr) -> Result<Expr, ExprError> {
    debug_assert_eq!(src.slots.mode(), SlotMode::Parameter);

    let mut arena = Arena::new();
    let mut vars = SlotTable::new(SlotMode::Variable);
    let root = optimize(src, src.root, &mut arena, &mut vars)?;

    // Short-circuiting may have discarded subtrees whose identifiers were
    // already interned; drop those ghosts so the slot table matches the
    // fields the tree references.
    let mut used = FxHashSet::default();
    collect_slots(&arena, root, &mut used);
    if used.len() != vars.len() {
        let mut kept = SlotTable::new(SlotMode::Variable);
        let mut remap: Vec<Option<SlotId>> = Vec::with_capacity(vars.len());
        for (index, (key, _)) in vars.iter().enumerate() {
            if used.contains(&SlotId::new(index)) {
                let SlotKey::Var(name) = key else {
                    unreachable!("variable table holds only names");
                };
                remap.push(Some(kept.intern_var(name)));
            } else {
                remap.push(None);
            }
        }
        remap_slots(&mut arena, root, &remap);
        vars = kept;
    }

    Ok(Expr {
        arena,
        root,
        slots: vars,
    })
}

fn optimize(
    src: &Expr,
    id: NodeId,
    arena: &mut Arena,
    vars: &mut SlotTable,
) -> Result<NodeId, ExprError> {
    let node = src.arena.node(id);
    match &node.kind {
        NodeKind::Const(value) => Ok(arena.leaf(NodeKind::Const(value.clone()))),
        NodeKind::Slot(slot) => {
            // Bound parameter value, or the integer-0 default.
            let value = src.slots.value(*slot).cloned().unwrap_or(Value::Int(0));
            Ok(arena.leaf(NodeKind::Const(value)))
        }
        NodeKind::Ident(name) => {
            let slot = vars.intern_var(name);
            Ok(arena.leaf(NodeKind::Slot(slot)))
        }
        NodeKind::Op(op) => {
            let op = *op;
            if op.is_unary() {
                let Some(right) = node.right else {
                    unreachable!("unary node missing its operand");
                };
                let reduced = optimize(src, right, arena, vars)?;
                if let NodeKind::Const(value) = &arena.node(reduced).kind {
                    let folded = eval_op(op, None, value.clone())?;
                    return Ok(arena.leaf(NodeKind::Const(folded)));
                }
                return Ok(arena.op(op, None, reduced));
            }

            let (left, right) = match (node.left, node.right) {
                (Some(l), Some(r)) => (l, r),
                _ => unreachable!("binary node missing a child"),
            };
            let first_is_left = src.arena.node(left).height <= src.arena.node(right).height;
            let (first, second) = if first_is_left {
                (left, right)
            } else {
                (right, left)
            };
            let decisive = matches!(op, Op::And | Op::Or | Op::Mul);

            let f = optimize(src, first, arena, vars)?;
            if decisive {
                if let NodeKind::Const(value) = &arena.node(f).kind {
                    if let Some(result) = short_circuit(op, value) {
                        return Ok(arena.leaf(NodeKind::Const(result)));
                    }
                }
            }

            let s = optimize(src, second, arena, vars)?;
            if decisive {
                if let NodeKind::Const(value) = &arena.node(s).kind {
                    if let Some(result) = short_circuit(op, value) {
                        return Ok(arena.leaf(NodeKind::Const(result)));
                    }
                }
            }

            let (l, r) = if first_is_left { (f, s) } else { (s, f) };
            if let (NodeKind::Const(lv), NodeKind::Const(rv)) =
                (&arena.node(l).kind, &arena.node(r).kind)
            {
                let folded = eval_op(op, Some(lv.clone()), rv.clone())?;
                return Ok(arena.leaf(NodeKind::Const(folded)));
            }
            Ok(arena.op(op, Some(l), r))
        }
    }
}

fn collect_slots(arena: &Arena, id: NodeId, used: &mut FxHashSet<SlotId>) {
    let node = arena.node(id);
    if let NodeKind::Slot(slot) = node.kind {
        used.insert(slot);
    }
    if let Some(left) = node.left {
        collect_slots(arena, left, used);
    }
    if let Some(right) = node.right {
        collect_slots(arena, right, used);
    }
}

fn remap_slots(arena: &mut Arena, id: NodeId, map: &[Option<SlotId>]) {
    let (left, right) = {
        let node = arena.node(id);
        (node.left, node.right)
    };
    if let NodeKind::Slot(slot) = &mut arena.node_mut(id).kind {
        match map[slot.index()] {
            Some(new) => *slot = new,
            None => unreachable!("reachable slot was dropped"),
        }
    }
    if let Some(left) = left {
        remap_slots(arena, left, map);
    }
    if let Some(right) = right {
        remap_slots(arena, right, map);
    }
}
