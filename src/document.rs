//! Documents accepted by segment builders.
//!
//! A [`Document`] maps field names to a single string value. It carries no
//! identity of its own; an `id` field, when present, is ordinary data.
//!
//! # Examples
//!
//! ```
//! use segdex::document::Document;
//!
//! let doc = Document::new()
//!     .with_field("id", "0")
//!     .with_field("body", "red fox");
//!
//! assert_eq!(doc.len(), 2);
//! assert_eq!(doc.get("body"), Some("red fox"));
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegdexError};
use crate::schema::Schema;
use crate::util::varint::encoded_len;

/// A document: field name to string value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: BTreeMap<String, String>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field value, consuming and returning the document.
    pub fn with_field<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.set_field(name, value);
        self
    }

    /// Set a field value, replacing any previous one.
    pub fn set_field<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        self.fields.insert(name.into(), value.into());
    }

    /// Get a field value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Check if the document has a value for the field.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse a JSON object of string values.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check the document against a schema.
    ///
    /// Fields the schema does not declare are rejected. Declared fields that
    /// are missing are accepted and treated as absent.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        for name in self.fields.keys() {
            if !schema.has_field(name) {
                return Err(SegdexError::schema_mismatch(format!(
                    "Field '{name}' is not declared in the schema"
                )));
            }
        }
        Ok(())
    }

    /// Size in bytes of the document's binary encoding: a varint field
    /// count, then per field a varint ordinal and a length-prefixed value.
    ///
    /// Undeclared fields are skipped; call [`Document::validate`] first.
    pub fn encoded_size(&self, schema: &Schema) -> usize {
        let mut size = encoded_len(self.fields.len() as u64);
        for (name, value) in &self.fields {
            if let Some(ordinal) = schema.ordinal(name) {
                size += encoded_len(ordinal as u64);
                size += encoded_len(value.len() as u64) + value.len();
            }
        }
        size
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Document {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, String>> for Document {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<BTreeMap<String, String>> for Document {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Document { fields }
    }
}
