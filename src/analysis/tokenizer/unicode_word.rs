//! Tokenizer splitting on Unicode (UAX #29) word boundaries.

use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::token::{TokenStream, stream_from_words};
use crate::analysis::tokenizer::Tokenizer;
use crate::error::Result;

/// Emits words; punctuation and whitespace segments are dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnicodeWordTokenizer;

impl UnicodeWordTokenizer {
    pub fn new() -> Self {
        UnicodeWordTokenizer
    }
}

impl Tokenizer for UnicodeWordTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        Ok(stream_from_words(text.unicode_word_indices()))
    }

    fn name(&self) -> &'static str {
        "unicode_word"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_and_spans() {
        let tokens: Vec<_> = UnicodeWordTokenizer::new()
            .tokenize("Crème brûlée, vous plaît!")
            .unwrap()
            .collect();
        let terms: Vec<&str> = tokens.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(terms, vec!["Crème", "brûlée", "vous", "plaît"]);
        assert_eq!(tokens[1].span, 7..15);
        assert_eq!(tokens[3].position, 3);
    }
}
