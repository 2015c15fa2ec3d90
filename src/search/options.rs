//! Search options and hits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Number of hits returned when no limit is given.
pub const DEFAULT_LIMIT: usize = 10;

/// Options for [`crate::search::SearchIndex::search`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchOptions {
    /// Maximum number of hits; defaults to [`DEFAULT_LIMIT`]. Zero yields no hits.
    pub limit: Option<usize>,

    /// Stored fields to include in each hit; defaults to all stored fields.
    pub fields: Option<Vec<String>>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON, e.g. `{"limit": 5, "fields": ["id"]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

/// A search result: the requested stored fields of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub score: f32,
    pub fields: BTreeMap<String, String>,
}

impl SearchHit {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}
