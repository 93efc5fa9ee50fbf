//! Samples as the filter sees them.

use indexmap::IndexMap;

/// One keyed field value extracted from a sample. Unsigned fields up to 32
/// bits widen losslessly into `Integer`.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

/// A native (writer-side) sample: anything that can hand out its keyed
/// fields by name.
pub trait SampleView {
    /// The value of the keyed field `name`, or `None` if the sample does
    /// not carry it.
    fn key_field(&self, name: &str) -> Option<FieldValue>;
}

/// Per-sample metadata handed to function filters on the reader side.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleInfo {
    pub valid_data: bool,
    pub source_timestamp: i64,
    pub publication_handle: u64,
}

/// A sample deserialized from its key fields, used on the reader path when
/// a function filter wants the sample itself.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedSample {
    fields: IndexMap<String, FieldValue>,
}

impl DecodedSample {
    pub(crate) fn insert(&mut self, name: &str, value: FieldValue) {
        self.fields.insert(name.to_owned(), value);
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl SampleView for DecodedSample {
    fn key_field(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).cloned()
    }
}

/// Name/value pair lists are samples too; convenient for hosts keeping
/// key fields in a flat list.
impl<S: AsRef<str>> SampleView for [(S, FieldValue)] {
    fn key_field(&self, name: &str) -> Option<FieldValue> {
        self.iter()
            .find(|(field, _)| field.as_ref() == name)
            .map(|(_, value)| value.clone())
    }
}

impl<T: SampleView + ?Sized> SampleView for &T {
    fn key_field(&self, name: &str) -> Option<FieldValue> {
        (**self).key_field(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_list_sample() {
        let sample = [
            ("a", FieldValue::Integer(1)),
            ("z.b", FieldValue::Integer(0)),
        ];
        assert_eq!(sample.key_field("a"), Some(FieldValue::Integer(1)));
        assert_eq!(sample.key_field("z.b"), Some(FieldValue::Integer(0)));
        assert_eq!(sample.key_field("missing"), None);
    }

    #[test]
    fn test_decoded_sample_roundtrip() {
        let mut sample = DecodedSample::default();
        sample.insert("b", FieldValue::Text("abc".to_owned()));
        assert_eq!(
            sample.key_field("b"),
            Some(FieldValue::Text("abc".to_owned()))
        );
        assert_eq!(sample.fields().count(), 1);
    }
}
