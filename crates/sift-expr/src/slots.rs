//! Shared parameter/variable slots.
//!
//! `?N` parameters and free identifiers are not stored in the tree: every
//! occurrence points at one shared slot in this table, so binding a value
//! once is visible at every use site and never requires a tree traversal.
//! The table has two modes, fixed at creation: parameter mode keys slots by
//! 1-based position (used while parsing), variable mode keys them by dotted
//! field name (used after the optimizer rewrites the tree).
//!
//! Insertion order is preserved; the reduced key-set derivation and the
//! tests depend on deterministic iteration.

use crate::error::ExprError;
use crate::value::Value;
use indexmap::IndexMap;

/// Index of a slot inside a [`SlotTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotId(u32);

impl SlotId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn new(index: usize) -> SlotId {
        SlotId(u32::try_from(index).expect("slot table overflow"))
    }
}

/// Key of one slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlotKey {
    /// 1-based positional parameter index
    Param(u32),
    /// Dotted field name
    Var(Box<str>),
}

/// Which keys a table accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotMode {
    Parameter,
    Variable,
}

/// How a caller addresses a slot when binding.
#[derive(Clone, Copy, Debug)]
pub enum SlotRef<'a> {
    Param(u32),
    Var(&'a str),
}

impl From<u32> for SlotRef<'_> {
    fn from(index: u32) -> Self {
        SlotRef::Param(index)
    }
}

impl<'a> From<&'a str> for SlotRef<'a> {
    fn from(name: &'a str) -> Self {
        SlotRef::Var(name)
    }
}

/// The slot table: insertion-ordered, `None` = unbound (affinity NONE).
#[derive(Clone, Debug, PartialEq)]
pub struct SlotTable {
    mode: SlotMode,
    entries: IndexMap<SlotKey, Option<Value>>,
}

impl SlotTable {
    pub fn new(mode: SlotMode) -> Self {
        SlotTable {
            mode,
            entries: IndexMap::new(),
        }
    }

    #[inline]
    pub fn mode(&self) -> SlotMode {
        self.mode
    }

    /// Number of distinct slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Interns a positional parameter; repeated indices share one slot.
    pub fn intern_param(&mut self, index: u32) -> SlotId {
        debug_assert_eq!(self.mode, SlotMode::Parameter);
        let entry = self.entries.entry(SlotKey::Param(index));
        let id = SlotId::new(entry.index());
        entry.or_insert(None);
        id
    }

    /// Interns a variable by dotted name; repeated names share one slot.
    pub fn intern_var(&mut self, name: &str) -> SlotId {
        debug_assert_eq!(self.mode, SlotMode::Variable);
        let entry = self.entries.entry(SlotKey::Var(name.into()));
        let id = SlotId::new(entry.index());
        entry.or_insert(None);
        id
    }

    /// Binds a value to a slot.
    ///
    /// In parameter mode, addressing an index that never appeared in the
    /// expression is an error. In variable mode an unknown name is accepted
    /// silently: the optimizer may legitimately have folded the variable
    /// away.
    pub fn bind(&mut self, slot: SlotRef<'_>, value: Value) -> Result<(), ExprError> {
        match (self.mode, slot) {
            (SlotMode::Parameter, SlotRef::Param(index)) => {
                match self.entries.get_mut(&SlotKey::Param(index)) {
                    Some(entry) => {
                        *entry = Some(value);
                        Ok(())
                    }
                    None => Err(ExprError::UnknownParameter(index)),
                }
            }
            (SlotMode::Variable, SlotRef::Var(name)) => {
                if let Some(entry) = self.entries.get_mut(&SlotKey::Var(name.into())) {
                    *entry = Some(value);
                }
                Ok(())
            }
            (SlotMode::Parameter, SlotRef::Var(_)) => Err(ExprError::UnknownParameter(0)),
            (SlotMode::Variable, SlotRef::Param(index)) => {
                Err(ExprError::UnknownParameter(index))
            }
        }
    }

    /// The bound value of a slot, `None` while unbound.
    #[inline]
    pub fn value(&self, id: SlotId) -> Option<&Value> {
        self.entries
            .get_index(id.index())
            .and_then(|(_, v)| v.as_ref())
    }

    /// The key of a slot.
    #[inline]
    pub fn key(&self, id: SlotId) -> &SlotKey {
        self.entries
            .get_index(id.index())
            .map(|(k, _)| k)
            .expect("slot id out of range")
    }

    /// Iterates `(key, bound value)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&SlotKey, Option<&Value>)> {
        self.entries.iter().map(|(k, v)| (k, v.as_ref()))
    }

    /// Variable names in insertion order (variable mode).
    pub fn var_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().filter_map(|k| match k {
            SlotKey::Var(name) => Some(name.as_ref()),
            SlotKey::Param(_) => None,
        })
    }
}
