//! Schema definition for segment documents.
//!
//! A [`Schema`] names a fixed set of fields and the capabilities of each
//! (see [`FieldOptions`]). It is validated once at construction and is
//! immutable afterwards; builders, segments and indexes share it through an
//! `Arc`.
//!
//! Fields are kept sorted by name. The position of a field in that order is
//! its *ordinal*, which the segment format uses instead of repeating names.
//!
//! # Examples
//!
//! ```
//! use segdex::schema::{FieldOptions, Schema};
//!
//! let schema = Schema::builder()
//!     .add_field("id", FieldOptions::exact_stored())
//!     .add_field("body", FieldOptions::new().text(true))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(schema.field_names(), vec!["body", "id"]);
//! assert_eq!(schema.stored_fields(), vec!["id"]);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegdexError};

pub mod field;

pub use field::FieldOptions;

/// A single named field of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    name: String,
    options: FieldOptions,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> FieldOptions {
        self.options
    }
}

/// A validated, immutable set of fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, FieldOptions>", into = "BTreeMap<String, FieldOptions>")]
pub struct Schema {
    /// Sorted by name; index is the field ordinal.
    fields: Vec<Field>,
}

impl Schema {
    /// Build a schema from `(name, options)` pairs.
    ///
    /// Fails with a schema error if the set is empty, a name is empty or
    /// repeated, or a field has no capability at all.
    pub fn new<I, S>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, FieldOptions)>,
        S: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (name, options) in fields {
            let name = name.into();
            if map.insert(name.clone(), options).is_some() {
                return Err(SegdexError::schema(format!("Field '{name}' already exists")));
            }
        }
        Self::from_map(map)
    }

    /// Parse the external mapping form, e.g.
    /// `{"id": {"exact": true, "stored": true}, "body": {"text": true}}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let map: BTreeMap<String, FieldOptions> = serde_json::from_str(json)?;
        Self::from_map(map)
    }

    /// Create a builder for constructing schemas.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    fn from_map(map: BTreeMap<String, FieldOptions>) -> Result<Self> {
        if map.is_empty() {
            return Err(SegdexError::schema("Schema must have at least one field"));
        }

        for (name, options) in &map {
            if name.is_empty() {
                return Err(SegdexError::schema("Field name cannot be empty"));
            }
            if !options.has_any() {
                return Err(SegdexError::schema(format!(
                    "Field '{name}' must enable at least one of exact, text or stored"
                )));
            }
        }

        let fields = map
            .into_iter()
            .map(|(name, options)| Field { name, options })
            .collect();
        Ok(Schema { fields })
    }

    /// Get the options of a field by name.
    pub fn field(&self, name: &str) -> Option<FieldOptions> {
        self.ordinal(name).map(|ord| self.fields[ord].options)
    }

    /// Get the ordinal of a field by name.
    pub fn ordinal(&self, name: &str) -> Option<usize> {
        self.fields
            .binary_search_by(|field| field.name.as_str().cmp(name))
            .ok()
    }

    /// Get a field by ordinal.
    pub fn field_at(&self, ordinal: usize) -> Option<&Field> {
        self.fields.get(ordinal)
    }

    /// Check if a field exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.ordinal(name).is_some()
    }

    /// All fields in ordinal order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// All field names in ordinal order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Names of the fields returned in search hits.
    pub fn stored_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.options.is_stored())
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Names of the fields a query can match.
    pub fn queryable_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.options.is_queryable())
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false for a validated schema; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl TryFrom<BTreeMap<String, FieldOptions>> for Schema {
    type Error = SegdexError;

    fn try_from(map: BTreeMap<String, FieldOptions>) -> Result<Self> {
        Self::from_map(map)
    }
}

impl From<Schema> for BTreeMap<String, FieldOptions> {
    fn from(schema: Schema) -> Self {
        schema
            .fields
            .into_iter()
            .map(|field| (field.name, field.options))
            .collect()
    }
}

/// A builder for constructing schemas in a fluent manner.
///
/// Errors (duplicates included) are reported by [`SchemaBuilder::build`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<(String, FieldOptions)>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field to the schema being built.
    pub fn add_field<S: Into<String>>(mut self, name: S, options: FieldOptions) -> Self {
        self.fields.push((name.into(), options));
        self
    }

    /// Build the final schema.
    pub fn build(self) -> Result<Schema> {
        Schema::new(self.fields)
    }
}
