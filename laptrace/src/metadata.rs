// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Ordered metadata attached to a lap.
//!
//! [`Metadata`] is an insertion-ordered mapping from string keys to
//! string-renderable [`MetadataValue`]s. It is treated as an opaque bag:
//! keys and values are not validated, only carried and rendered.

use std::fmt;

/// A single string-renderable metadata value.
///
/// Values render with their natural display form (`2`, `2.5`, `true`,
/// `word.doc`); in the rendered lap they always appear quoted, as strings.
#[derive(Clone, Debug, PartialEq)]
pub enum MetadataValue {
    /// An arbitrary string
    String(String),
    /// A boolean, rendered `true`/`false`
    Bool(bool),
    /// A signed integer
    Signed(i64),
    /// An unsigned integer
    Unsigned(u64),
    /// A floating point number
    Floating(f64),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => f.write_str(value),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Signed(value) => write!(f, "{value}"),
            Self::Unsigned(value) => write!(f, "{value}"),
            Self::Floating(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        Self::Signed(value.into())
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Signed(value)
    }
}

impl From<u32> for MetadataValue {
    fn from(value: u32) -> Self {
        Self::Unsigned(value.into())
    }
}

impl From<u64> for MetadataValue {
    fn from(value: u64) -> Self {
        Self::Unsigned(value)
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        Self::Unsigned(value as u64)
    }
}

impl From<f32> for MetadataValue {
    fn from(value: f32) -> Self {
        Self::Floating(value.into())
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Floating(value)
    }
}

/// Insertion-ordered key/value pairs attached to a lap.
///
/// Entries render in the order they were inserted, so a lap's rendered form
/// is stable from one render to the next. Inserting a key that is already
/// present replaces its value in place without changing its position.
///
/// Anything shaped like a sequence of `(key, value)` pairs converts into a
/// `Metadata`:
///
/// ```
/// use laptrace::Metadata;
///
/// let metadata = Metadata::from([("row_count", 2), ("retries", 0)]);
/// assert_eq!(metadata.len(), 2);
///
/// let collected: Metadata = vec![("filename", "word.doc")].into_iter().collect();
/// assert_eq!(collected.get("filename").unwrap().to_string(), "word.doc");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    entries: Vec<(String, MetadataValue)>,
}

impl Metadata {
    /// Create an empty metadata bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key/value pair, replacing the value in place if the key is
    /// already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style [`Self::insert`].
    ///
    /// ```
    /// use laptrace::Metadata;
    ///
    /// let metadata = Metadata::new()
    ///     .with("filename", "word.doc")
    ///     .with("row_count", 2);
    /// ```
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries; an empty bag adds nothing to the
    /// rendered lap.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<MetadataValue>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (key, value) in iter {
            metadata.insert(key, value);
        }
        metadata
    }
}

impl<K: Into<String>, V: Into<MetadataValue>, const N: usize> From<[(K, V); N]> for Metadata {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{Metadata, MetadataValue};

    #[rstest]
    #[case(MetadataValue::from("word.doc"), "word.doc")]
    #[case(MetadataValue::from(2), "2")]
    #[case(MetadataValue::from(-3), "-3")]
    #[case(MetadataValue::from(7_u64), "7")]
    #[case(MetadataValue::from(2.5), "2.5")]
    #[case(MetadataValue::from(2.0), "2")]
    #[case(MetadataValue::from(true), "true")]
    fn value_renders_with_natural_display_form(
        #[case] value: MetadataValue,
        #[case] expected: &str,
    ) {
        assert_eq!(value.to_string(), expected);
    }

    #[test]
    fn entries_keep_insertion_order() {
        let metadata = Metadata::new()
            .with("b", 1)
            .with("a", 2)
            .with("c", 3);
        let keys: Vec<_> = metadata.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn reinserting_a_key_replaces_in_place() {
        let metadata = Metadata::new()
            .with("a", 1)
            .with("b", 2)
            .with("a", 9);
        let entries: Vec<_> = metadata
            .iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect();
        assert_eq!(entries, [("a", "9".to_owned()), ("b", "2".to_owned())]);
    }
}
