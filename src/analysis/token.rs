//! Tokens produced by analysis.

use std::ops::Range;

/// A term occurrence in analyzed text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub term: String,
    /// Index of the token in its stream.
    pub position: u32,
    /// Byte range of the token in the source text.
    pub span: Range<usize>,
}

impl Token {
    pub fn new(term: impl Into<String>, position: u32, span: Range<usize>) -> Self {
        Token {
            term: term.into(),
            position,
            span,
        }
    }
}

/// Tokens flowing from a tokenizer through filters.
pub type TokenStream = Box<dyn Iterator<Item = Token> + Send>;

/// Turn `(byte offset, word)` pairs over a source text into a stream,
/// numbering positions in order.
pub(crate) fn stream_from_words<'a, I>(words: I) -> TokenStream
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let tokens: Vec<Token> = words
        .zip(0u32..)
        .map(|((start, word), position)| Token::new(word, position, start..start + word.len()))
        .collect();
    Box::new(tokens.into_iter())
}
