//! Tokenizer implementations for text analysis.
//!
//! - [`regex::RegexTokenizer`] - Extracts `\w+` runs (the default)
//! - [`unicode_word::UnicodeWordTokenizer`] - Uses Unicode word boundaries

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::token::TokenStream;
use crate::error::Result;

pub mod regex;
pub mod unicode_word;

pub use self::regex::RegexTokenizer;
pub use self::unicode_word::UnicodeWordTokenizer;

/// Trait for tokenizers that convert text into tokens.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

/// Serializable selector for the built-in tokenizers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// `\w+` regex tokenizer.
    #[default]
    Regex,
    /// Regex tokenizer with a custom pattern.
    Pattern(String),
    /// Unicode (UAX #29) word boundaries.
    UnicodeWord,
}

impl TokenizerKind {
    /// Instantiate the selected tokenizer.
    pub fn build(&self) -> Result<Arc<dyn Tokenizer>> {
        Ok(match self {
            TokenizerKind::Regex => Arc::new(RegexTokenizer::new()?),
            TokenizerKind::Pattern(pattern) => Arc::new(RegexTokenizer::with_pattern(pattern)?),
            TokenizerKind::UnicodeWord => Arc::new(UnicodeWordTokenizer::new()),
        })
    }
}
