//! Text analysis for the bundled engine.
//!
//! Text fields are run through an [`analyzer::Analyzer`], which tokenizes the
//! value and passes the tokens through a chain of filters. Exact fields skip
//! analysis and are indexed as a single term.

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::{Analyzer, PipelineAnalyzer};
pub use token::{Token, TokenStream};
