//! Tokenizer emitting the matches of a regular expression.

use regex::Regex;

use crate::analysis::token::{TokenStream, stream_from_words};
use crate::analysis::tokenizer::Tokenizer;
use crate::error::{Result, SegdexError};

/// Word pattern used when none is configured.
pub const DEFAULT_PATTERN: &str = r"\w+";

/// Emits one token per non-overlapping match.
#[derive(Clone, Debug)]
pub struct RegexTokenizer {
    regex: Regex,
}

impl RegexTokenizer {
    pub fn new() -> Result<Self> {
        Self::with_pattern(DEFAULT_PATTERN)
    }

    /// Fails with a configuration error if `pattern` does not compile.
    pub fn with_pattern(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| SegdexError::config(format!("invalid tokenizer pattern {pattern:?}: {e}")))?;
        Ok(RegexTokenizer { regex })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

impl Tokenizer for RegexTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        Ok(stream_from_words(
            self.regex.find_iter(text).map(|m| (m.start(), m.as_str())),
        ))
    }

    fn name(&self) -> &'static str {
        "regex"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;

    #[test]
    fn test_default_pattern_splits_words() {
        let tokens: Vec<Token> = RegexTokenizer::new()
            .unwrap()
            .tokenize("red fox, 42")
            .unwrap()
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::new("red", 0, 0..3),
                Token::new("fox", 1, 4..7),
                Token::new("42", 2, 9..11),
            ]
        );
    }

    #[test]
    fn test_custom_pattern() {
        let tokenizer = RegexTokenizer::with_pattern("[a-z]+").unwrap();
        let terms: Vec<String> = tokenizer
            .tokenize("red-fox 42 dog")
            .unwrap()
            .map(|t| t.term)
            .collect();
        assert_eq!(terms, vec!["red", "fox", "dog"]);
        assert_eq!(tokenizer.pattern(), "[a-z]+");
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = RegexTokenizer::with_pattern("(").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }
}
