//! Analyzers: a tokenizer followed by a chain of filters.

use std::fmt;
use std::sync::Arc;

use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::{Filter, LowercaseFilter};
use crate::analysis::tokenizer::{Tokenizer, TokenizerKind};
use crate::error::Result;

/// Turns field values and query text into terms.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    fn name(&self) -> &'static str;

    /// The terms of `text`, in order, duplicates included.
    fn terms(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.analyze(text)?.map(|token| token.term).collect())
    }
}

/// Tokenizer plus filters, applied in insertion order.
#[derive(Clone)]
pub struct PipelineAnalyzer {
    tokenizer: Arc<dyn Tokenizer>,
    filters: Vec<Arc<dyn Filter>>,
}

impl PipelineAnalyzer {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        PipelineAnalyzer {
            tokenizer,
            filters: Vec::new(),
        }
    }

    /// Build the analyzer an engine configuration describes.
    pub fn from_kind(kind: &TokenizerKind, lowercase: bool) -> Result<Self> {
        let analyzer = Self::new(kind.build()?);
        Ok(if lowercase {
            analyzer.add_filter(Arc::new(LowercaseFilter::new()))
        } else {
            analyzer
        })
    }

    /// `\w+` words, lowercased.
    pub fn standard() -> Result<Self> {
        Self::from_kind(&TokenizerKind::Regex, true)
    }

    pub fn add_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }
}

impl fmt::Debug for PipelineAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineAnalyzer")
            .field("tokenizer", &self.tokenizer.name())
            .field("filters", &self.filter_names())
            .finish()
    }
}

impl Analyzer for PipelineAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.filters
            .iter()
            .try_fold(self.tokenizer.tokenize(text)?, |tokens, filter| filter.filter(tokens))
    }

    fn name(&self) -> &'static str {
        "pipeline"
    }
}
