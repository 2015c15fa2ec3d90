//! Query string parsing and resolution against a schema.
//!
//! Supported syntax, clauses separated by whitespace:
//! - Terms: `fox`
//! - Field-scoped terms: `body:fox`, `id:"order 42"`
//! - Quoted values: `"red fox"`
//! - Modifiers: `+required -excluded optional`
//!
//! A clause matches a document when any of the terms it resolves to
//! matches. Unscoped clauses are expanded over every queryable field.
//!
//! Quoted values are not phrase queries. Positions are not indexed, so
//! `body:"red fox"` matches any document whose body holds `red` or `fox`,
//! in any order. On exact fields the quoted value is one whole term.

use std::iter::Peekable;
use std::str::Chars;

use crate::analysis::Analyzer;
use crate::engine::data::TermKind;
use crate::error::{Result, SegdexError};
use crate::schema::Schema;

/// Most clauses a single query may hold.
pub const MAX_CLAUSES: usize = 64;

/// How a clause takes part in matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// Optional; contributes to the score.
    Should,
    /// Required (`+`).
    Must,
    /// Excluded (`-`); never contributes to the score.
    MustNot,
}

/// A clause as written in the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawClause {
    pub occur: Occur,
    pub field: Option<String>,
    pub value: String,
}

/// A single dictionary lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermLookup {
    /// Field ordinal.
    pub field: usize,
    pub kind: TermKind,
    pub term: String,
}

/// A resolved clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryClause {
    pub occur: Occur,
    pub terms: Vec<TermLookup>,
}

/// A query resolved against a schema, ready for execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub clauses: Vec<QueryClause>,
}

impl Query {
    /// Parse `query` and resolve it against `schema`, analyzing text values
    /// with `analyzer`.
    pub fn parse(query: &str, schema: &Schema, analyzer: &dyn Analyzer) -> Result<Self> {
        let raw = parse_clauses(query)?;
        if raw.len() > MAX_CLAUSES {
            return Err(SegdexError::query(format!(
                "query has {} clauses, at most {MAX_CLAUSES} are supported",
                raw.len()
            )));
        }

        let mut clauses = Vec::with_capacity(raw.len());
        for clause in raw {
            let terms = match &clause.field {
                Some(name) => {
                    let ordinal = schema
                        .ordinal(name)
                        .ok_or_else(|| SegdexError::query(format!("unknown field '{name}'")))?;
                    let options = schema.field(name).unwrap_or_default();
                    if !options.is_queryable() {
                        return Err(SegdexError::query(format!(
                            "field '{name}' is not searchable"
                        )));
                    }
                    resolve_field(ordinal, schema, &clause.value, analyzer)?
                }
                None => {
                    let mut terms = Vec::new();
                    for ordinal in 0..schema.len() {
                        terms.extend(resolve_field(ordinal, schema, &clause.value, analyzer)?);
                    }
                    terms
                }
            };
            clauses.push(QueryClause {
                occur: clause.occur,
                terms,
            });
        }

        Ok(Query { clauses })
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Every distinct lookup of the query, in first-seen order.
    pub fn lookups(&self) -> Vec<&TermLookup> {
        let mut seen = Vec::new();
        for clause in &self.clauses {
            for term in &clause.terms {
                if !seen.contains(&term) {
                    seen.push(term);
                }
            }
        }
        seen
    }
}

fn resolve_field(
    ordinal: usize,
    schema: &Schema,
    value: &str,
    analyzer: &dyn Analyzer,
) -> Result<Vec<TermLookup>> {
    let Some(field) = schema.field_at(ordinal) else {
        return Ok(Vec::new());
    };
    let options = field.options();
    let mut terms = Vec::new();

    if options.is_exact() && !value.is_empty() {
        terms.push(TermLookup {
            field: ordinal,
            kind: TermKind::Exact,
            term: value.to_string(),
        });
    }
    if options.is_text() {
        for term in analyzer.terms(value)? {
            let lookup = TermLookup {
                field: ordinal,
                kind: TermKind::Text,
                term,
            };
            if !terms.contains(&lookup) {
                terms.push(lookup);
            }
        }
    }
    Ok(terms)
}

/// Split a query string into clauses.
pub fn parse_clauses(query: &str) -> Result<Vec<RawClause>> {
    let mut parser = ClauseParser {
        chars: query.chars().peekable(),
    };
    let mut clauses = Vec::new();
    while let Some(clause) = parser.next_clause()? {
        clauses.push(clause);
    }
    Ok(clauses)
}

struct ClauseParser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl ClauseParser<'_> {
    fn skip_whitespace(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn next_clause(&mut self) -> Result<Option<RawClause>> {
        self.skip_whitespace();
        let Some(&first) = self.chars.peek() else {
            return Ok(None);
        };

        let occur = match first {
            '+' => Occur::Must,
            '-' => Occur::MustNot,
            _ => Occur::Should,
        };
        if occur != Occur::Should {
            self.chars.next();
        }

        if self.chars.peek() == Some(&'"') {
            let value = self.read_quoted()?;
            return Ok(Some(RawClause {
                occur,
                field: None,
                value,
            }));
        }

        let word = self.read_bare();
        if word.is_empty() {
            return Err(SegdexError::query("dangling modifier"));
        }

        if let Some((field, rest)) = word.split_once(':').filter(|(field, _)| !field.is_empty()) {
            let value = if rest.is_empty() && self.chars.peek() == Some(&'"') {
                self.read_quoted()?
            } else {
                rest.to_string()
            };
            return Ok(Some(RawClause {
                occur,
                field: Some(field.to_string()),
                value,
            }));
        }

        Ok(Some(RawClause {
            occur,
            field: None,
            value: word,
        }))
    }

    /// Read up to whitespace or an opening quote.
    fn read_bare(&mut self) -> String {
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() || c == '"' {
                break;
            }
            word.push(c);
            self.chars.next();
        }
        word
    }

    fn read_quoted(&mut self) -> Result<String> {
        self.chars.next(); // opening quote
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some('"') => return Ok(value),
                Some('\\') => match self.chars.next() {
                    Some(c) => value.push(c),
                    None => break,
                },
                Some(c) => value.push(c),
                None => break,
            }
        }
        Err(SegdexError::query("unterminated quoted value"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PipelineAnalyzer;
    use crate::error::ErrorKind;
    use crate::schema::FieldOptions;

    fn schema() -> Schema {
        Schema::builder()
            .add_field("id", FieldOptions::exact_stored())
            .add_field("body", FieldOptions::new().text(true))
            .add_field("raw", FieldOptions::new().stored(true))
            .build()
            .unwrap()
    }

    #[test]
    fn test_parse_clauses() {
        let clauses = parse_clauses(r#"fox +body:red -id:"order 7" "blue sky""#).unwrap();
        assert_eq!(
            clauses,
            vec![
                RawClause {
                    occur: Occur::Should,
                    field: None,
                    value: "fox".to_string()
                },
                RawClause {
                    occur: Occur::Must,
                    field: Some("body".to_string()),
                    value: "red".to_string()
                },
                RawClause {
                    occur: Occur::MustNot,
                    field: Some("id".to_string()),
                    value: "order 7".to_string()
                },
                RawClause {
                    occur: Occur::Should,
                    field: None,
                    value: "blue sky".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_clauses(r#""open"#).unwrap_err().kind(),
            ErrorKind::Query
        );
        assert_eq!(parse_clauses("+ fox").unwrap_err().kind(), ErrorKind::Query);
        assert!(parse_clauses("   ").unwrap().is_empty());
    }

    #[test]
    fn test_resolve_unscoped_expands_over_queryable_fields() {
        let analyzer = PipelineAnalyzer::standard().unwrap();
        let query = Query::parse("Fox", &schema(), &analyzer).unwrap();
        let terms = &query.clauses[0].terms;

        // body (ordinal 0) analyzed, id (ordinal 1) exact, raw skipped.
        assert_eq!(
            terms,
            &vec![
                TermLookup {
                    field: 0,
                    kind: TermKind::Text,
                    term: "fox".to_string()
                },
                TermLookup {
                    field: 1,
                    kind: TermKind::Exact,
                    term: "Fox".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_resolve_rejects_unknown_and_stored_only_fields() {
        let analyzer = PipelineAnalyzer::standard().unwrap();
        let err = Query::parse("color:red", &schema(), &analyzer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Query);

        let err = Query::parse("raw:red", &schema(), &analyzer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Query);
    }

    #[test]
    fn test_too_many_clauses() {
        let analyzer = PipelineAnalyzer::standard().unwrap();
        let query = vec!["fox"; MAX_CLAUSES + 1].join(" ");
        let err = Query::parse(&query, &schema(), &analyzer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Query);
    }
}
