//! Filters applied to a token stream after tokenization.

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Transforms a token stream.
pub trait Filter: Send + Sync {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    fn name(&self) -> &'static str;
}

/// Lowercases terms so text matching is case-insensitive.
#[derive(Clone, Copy, Debug, Default)]
pub struct LowercaseFilter;

impl LowercaseFilter {
    pub fn new() -> Self {
        LowercaseFilter
    }
}

impl Filter for LowercaseFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(Box::new(tokens.map(|mut token| {
            if token.term.chars().any(char::is_uppercase) {
                token.term = token.term.to_lowercase();
            }
            token
        })))
    }

    fn name(&self) -> &'static str {
        "lowercase"
    }
}
