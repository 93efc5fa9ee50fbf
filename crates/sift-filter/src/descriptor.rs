//! Topic key descriptors.
//!
//! The filter sees a topic type only through its keyed fields: an ordered
//! list of `(name, primitive kind)` pairs. Two operations matter here:
//! enumerating the keys, and duplicating the descriptor with a reduced
//! key-set so the sample codec can skip everything the expression never
//! references.

use crate::error::FilterError;

/// Primitive kind of a keyed field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    /// Present in descriptors, but not expressible by the filter: there is
    /// no 64-bit unsigned arithmetic.
    UInt64,
    Float32,
    Float64,
    /// Unbounded string
    Str,
    /// Bounded string with its maximum byte length
    BoundedStr(u32),
    /// Wide string; rejected at create
    WStr,
    /// Wide char; rejected at create
    WChar,
}

impl FieldKind {
    /// Whether a value of this kind can be bound into an expression
    /// variable.
    pub(crate) fn bindable(self) -> Result<(), FilterError> {
        match self {
            FieldKind::UInt64 => Err(FilterError::Unsupported("unsigned 64-bit key field")),
            FieldKind::WStr => Err(FilterError::Unsupported("wide string key field")),
            FieldKind::WChar => Err(FilterError::Unsupported("wide char key field")),
            _ => Ok(()),
        }
    }

    /// Whether the codec can walk over a value of this kind. Wide types
    /// have no known wire layout here.
    pub(crate) fn skippable(self) -> bool {
        !matches!(self, FieldKind::WStr | FieldKind::WChar)
    }
}

/// One keyed field of a topic type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyField {
    pub name: String,
    pub kind: FieldKind,
}

impl KeyField {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        KeyField {
            name: name.into(),
            kind,
        }
    }
}

/// A topic type as the filter sees it: a name and its keyed fields in
/// declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicDescriptor {
    type_name: String,
    keys: Vec<KeyField>,
}

impl TopicDescriptor {
    pub fn new(type_name: impl Into<String>, keys: Vec<KeyField>) -> Self {
        TopicDescriptor {
            type_name: type_name.into(),
            keys,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The keyed fields, in declaration order.
    pub fn keyed_fields(&self) -> &[KeyField] {
        &self.keys
    }

    pub fn field(&self, name: &str) -> Option<&KeyField> {
        self.keys.iter().find(|k| k.name == name)
    }

    /// Duplicates the descriptor retaining only the named fields, keeping
    /// declaration order. A name that is not a keyed field is an error.
    pub fn project(&self, names: &[&str]) -> Result<TopicDescriptor, FilterError> {
        for name in names {
            if self.field(name).is_none() {
                return Err(FilterError::BadParameter);
            }
        }
        let keys = self
            .keys
            .iter()
            .filter(|k| names.contains(&k.name.as_str()))
            .cloned()
            .collect();
        Ok(TopicDescriptor {
            type_name: self.type_name.clone(),
            keys,
        })
    }
}
