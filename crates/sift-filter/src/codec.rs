//! The key codec: serialization of a sample's keyed fields.
//!
//! Key fields travel in the declaration order of the topic's full
//! descriptor, scalars little-endian, strings length-prefixed with a `u32`.
//! A codec built over a *reduced* descriptor walks that same layout but
//! materializes only the retained fields, skipping the bytes of everything
//! else — which is the whole point of reducing the key-set: samples are
//! mostly not deserialized at all.

use crate::descriptor::{FieldKind, TopicDescriptor};
use crate::error::FilterError;
use crate::sample::{FieldValue, SampleView};
use rustc_hash::FxHashSet;

/// Decoder over the reduced key-set of a topic.
#[derive(Clone, Debug)]
pub struct KeyCodec {
    /// Full key layout, in wire order: `(name, kind, wanted)`.
    layout: Vec<(String, FieldKind, bool)>,
}

impl KeyCodec {
    /// Builds a codec that walks `full`'s layout and keeps the fields named
    /// by `reduced`.
    pub fn new(full: &TopicDescriptor, reduced: &TopicDescriptor) -> KeyCodec {
        let wanted: FxHashSet<&str> = reduced
            .keyed_fields()
            .iter()
            .map(|k| k.name.as_str())
            .collect();
        KeyCodec {
            layout: full
                .keyed_fields()
                .iter()
                .map(|k| (k.name.clone(), k.kind, wanted.contains(k.name.as_str())))
                .collect(),
        }
    }

    /// Decodes the retained key fields out of `data`, skipping the rest.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<(&str, FieldValue)>, FilterError> {
        let mut cursor = Cursor { data, pos: 0 };
        let mut fields = Vec::new();
        for (name, kind, wanted) in &self.layout {
            if *wanted {
                fields.push((name.as_str(), cursor.read_value(*kind)?));
            } else {
                cursor.skip(*kind)?;
            }
        }
        Ok(fields)
    }
}

/// Encodes every keyed field of `descriptor` out of a native sample, in
/// declaration order. The inverse of [`KeyCodec::decode`]; hosts serialize
/// with this, tests round-trip through it.
pub fn encode_key_fields(
    descriptor: &TopicDescriptor,
    sample: &dyn SampleView,
) -> Result<Vec<u8>, FilterError> {
    let mut out = Vec::new();
    for key in descriptor.keyed_fields() {
        let value = sample
            .key_field(&key.name)
            .ok_or(FilterError::BadParameter)?;
        write_value(&mut out, key.kind, &value)?;
    }
    Ok(out)
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8], FilterError> {
        let end = self.pos.checked_add(n).ok_or(FilterError::BadParameter)?;
        let bytes = self.data.get(self.pos..end).ok_or(FilterError::BadParameter)?;
        self.pos = end;
        Ok(bytes)
    }

    fn read_u32(&mut self) -> Result<u32, FilterError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_value(&mut self, kind: FieldKind) -> Result<FieldValue, FilterError> {
        let value = match kind {
            FieldKind::Bool => FieldValue::Integer((self.take(1)?[0] != 0) as i64),
            FieldKind::Int8 => FieldValue::Integer(self.take(1)?[0] as i8 as i64),
            FieldKind::UInt8 => FieldValue::Integer(self.take(1)?[0] as i64),
            FieldKind::Int16 => {
                let b = self.take(2)?;
                FieldValue::Integer(i16::from_le_bytes([b[0], b[1]]) as i64)
            }
            FieldKind::UInt16 => {
                let b = self.take(2)?;
                FieldValue::Integer(u16::from_le_bytes([b[0], b[1]]) as i64)
            }
            FieldKind::Int32 => {
                let b = self.take(4)?;
                FieldValue::Integer(i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64)
            }
            FieldKind::UInt32 => {
                let b = self.take(4)?;
                FieldValue::Integer(u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64)
            }
            FieldKind::Int64 => {
                let b = self.take(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(b);
                FieldValue::Integer(i64::from_le_bytes(raw))
            }
            FieldKind::Float32 => {
                let b = self.take(4)?;
                FieldValue::Real(f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            }
            FieldKind::Float64 => {
                let b = self.take(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(b);
                FieldValue::Real(f64::from_le_bytes(raw))
            }
            FieldKind::Str | FieldKind::BoundedStr(_) => {
                let len = self.read_u32()? as usize;
                let bytes = self.take(len)?;
                let text =
                    String::from_utf8(bytes.to_vec()).map_err(|_| FilterError::BadParameter)?;
                FieldValue::Text(text)
            }
            // UInt64 keys can be skipped but never materialized.
            FieldKind::UInt64 | FieldKind::WStr | FieldKind::WChar => {
                return Err(FilterError::Unsupported("key field kind"));
            }
        };
        Ok(value)
    }

    fn skip(&mut self, kind: FieldKind) -> Result<(), FilterError> {
        match kind {
            FieldKind::Bool | FieldKind::Int8 | FieldKind::UInt8 => {
                self.take(1)?;
            }
            FieldKind::Int16 | FieldKind::UInt16 => {
                self.take(2)?;
            }
            FieldKind::Int32 | FieldKind::UInt32 | FieldKind::Float32 => {
                self.take(4)?;
            }
            FieldKind::Int64 | FieldKind::UInt64 | FieldKind::Float64 => {
                self.take(8)?;
            }
            FieldKind::Str | FieldKind::BoundedStr(_) => {
                let len = self.read_u32()? as usize;
                self.take(len)?;
            }
            FieldKind::WStr | FieldKind::WChar => {
                return Err(FilterError::Unsupported("key field kind"));
            }
        }
        Ok(())
    }
}

fn write_value(out: &mut Vec<u8>, kind: FieldKind, value: &FieldValue) -> Result<(), FilterError> {
    let integer = |v: &FieldValue| match v {
        FieldValue::Integer(i) => Ok(*i),
        _ => Err(FilterError::BadParameter),
    };
    match kind {
        FieldKind::Bool => out.push((integer(value)? != 0) as u8),
        FieldKind::Int8 | FieldKind::UInt8 => out.push(integer(value)? as u8),
        FieldKind::Int16 | FieldKind::UInt16 => {
            out.extend_from_slice(&(integer(value)? as u16).to_le_bytes())
        }
        FieldKind::Int32 | FieldKind::UInt32 => {
            out.extend_from_slice(&(integer(value)? as u32).to_le_bytes())
        }
        FieldKind::Int64 | FieldKind::UInt64 => {
            out.extend_from_slice(&integer(value)?.to_le_bytes())
        }
        FieldKind::Float32 => match value {
            FieldValue::Real(r) => out.extend_from_slice(&(*r as f32).to_le_bytes()),
            _ => return Err(FilterError::BadParameter),
        },
        FieldKind::Float64 => match value {
            FieldValue::Real(r) => out.extend_from_slice(&r.to_le_bytes()),
            _ => return Err(FilterError::BadParameter),
        },
        FieldKind::Str | FieldKind::BoundedStr(_) => match value {
            FieldValue::Text(text) => {
                if let FieldKind::BoundedStr(bound) = kind {
                    if text.len() > bound as usize {
                        return Err(FilterError::BadParameter);
                    }
                }
                let len =
                    u32::try_from(text.len()).map_err(|_| FilterError::BadParameter)?;
                out.extend_from_slice(&len.to_le_bytes());
                out.extend_from_slice(text.as_bytes());
            }
            _ => return Err(FilterError::BadParameter),
        },
        FieldKind::WStr | FieldKind::WChar => {
            return Err(FilterError::Unsupported("key field kind"));
        }
    }
    Ok(())
}
