//! Field capabilities for schema definition.

use serde::{Deserialize, Serialize};

/// Capability bit for exact (whole-value) matching.
pub const EXACT: u8 = 0b001;
/// Capability bit for analyzed full-text matching.
pub const TEXT: u8 = 0b010;
/// Capability bit for retrieval in search hits.
pub const STORED: u8 = 0b100;

/// The capability set of a single schema field.
///
/// All flags default to `false`, so the external mapping form
/// `{"exact": true, "stored": true}` may omit any of them. `string` is
/// accepted as an alias of `exact`.
///
/// # Examples
///
/// ```
/// use segdex::schema::FieldOptions;
///
/// let id = FieldOptions::new().exact(true).stored(true);
/// assert!(id.is_queryable());
/// assert!(id.is_stored());
///
/// let payload = FieldOptions::new().stored(true);
/// assert!(!payload.is_queryable());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldOptions {
    /// Indexed as a single untokenized term.
    #[serde(alias = "string")]
    pub exact: bool,
    /// Indexed through the engine's analyzer.
    pub text: bool,
    /// Returned in search hits.
    pub stored: bool,
}

impl FieldOptions {
    /// Create an options record with every capability disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for an exact-match, stored field (typical ids).
    pub fn exact_stored() -> Self {
        Self::new().exact(true).stored(true)
    }

    /// Shorthand for a full-text field that is also stored.
    pub fn text_stored() -> Self {
        Self::new().text(true).stored(true)
    }

    /// Set whether the field is exact-searchable.
    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    /// Set whether the field is text-searchable.
    pub fn text(mut self, text: bool) -> Self {
        self.text = text;
        self
    }

    /// Set whether the field is stored.
    pub fn stored(mut self, stored: bool) -> Self {
        self.stored = stored;
        self
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    pub fn is_text(&self) -> bool {
        self.text
    }

    pub fn is_stored(&self) -> bool {
        self.stored
    }

    /// Whether a query can ever match this field.
    pub fn is_queryable(&self) -> bool {
        self.exact || self.text
    }

    /// Whether at least one capability is set.
    pub fn has_any(&self) -> bool {
        self.exact || self.text || self.stored
    }

    /// Pack the capabilities into the bit layout used by the segment format.
    pub fn to_bits(&self) -> u8 {
        let mut bits = 0;
        if self.exact {
            bits |= EXACT;
        }
        if self.text {
            bits |= TEXT;
        }
        if self.stored {
            bits |= STORED;
        }
        bits
    }

    /// Unpack capabilities; `None` if unknown bits are set.
    pub fn from_bits(bits: u8) -> Option<Self> {
        if bits & !(EXACT | TEXT | STORED) != 0 {
            return None;
        }
        Some(FieldOptions {
            exact: bits & EXACT != 0,
            text: bits & TEXT != 0,
            stored: bits & STORED != 0,
        })
    }
}
