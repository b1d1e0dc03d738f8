//! Query resolution against a built index.
//!
//! Queries are tokenized exactly like body text. Each term is resolved by exact
//! lookup first and falls back to prefix scans, which keeps search-as-you-type
//! working on partial words. A partial word may run past the end of its stem
//! ("inversi" for the term `invers`), so the unstemmed query word is also matched
//! against the unstemmed words recorded at build time. Documents matching any term
//! are returned (OR semantics) ranked by summed per-term field weights.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::index::{DocId, FieldPostings, Index, ObjectId};
use super::scoring::{FieldWeights, MatchKind, TermScores, rank};
use super::tokenize::{FieldKind, Token, Tokenizer};
use super::version::EnvToken;
use crate::config::IndexConfig;
use crate::error::QueryError;

/// Options for a single search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Maximum number of ranked documents returned.
    pub max_results: usize,
    /// Multiplier for contributions reached through prefix expansion only.
    /// `1.0` scores partial words like whole ones.
    pub partial_match_factor: f32,
    pub field_weights: FieldWeights,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 50,
            partial_match_factor: 1.0,
            field_weights: FieldWeights::default(),
        }
    }
}

/// A ranked document.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredResult {
    pub doc_id: DocId,
    pub score: f32,
    /// Objects of this document whose name matches a query term exactly or by prefix.
    pub matched_objects: Vec<ObjectId>,
}

/// An indexed term reached by a query term.
#[derive(Debug, Clone, Copy)]
pub struct Expansion<'i> {
    pub term: &'i str,
    pub postings: &'i FieldPostings,
    pub kind: MatchKind,
}

/// Resolves free-text queries against indexes built with a compatible configuration.
///
/// The engine never mutates the index; any number of threads may search the
/// same index at once.
#[derive(Debug)]
pub struct QueryEngine {
    tokenizer: Tokenizer,
    expected: EnvToken,
    /// Additional tokens known to produce identical terms
    accepted: Vec<EnvToken>,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new(&IndexConfig::default())
    }
}

impl QueryEngine {
    pub fn new(config: &IndexConfig) -> Self {
        Self {
            tokenizer: Tokenizer::new(&config.tokenizer),
            expected: config.env_token(),
            accepted: vec![],
        }
    }

    /// The token of indexes built with this engine's own configuration.
    pub const fn expected_token(&self) -> EnvToken {
        self.expected
    }

    /// Also accept indexes stamped with `token`.
    pub fn accept_token(&mut self, token: EnvToken) {
        if !self.recognizes(token) {
            self.accepted.push(token);
        }
    }

    pub fn recognizes(&self, token: EnvToken) -> bool {
        token == self.expected || self.accepted.contains(&token)
    }

    /// Fails with [`QueryError::IncompatibleIndex`] unless the index token is recognised.
    pub fn check(&self, index: &Index) -> Result<(), QueryError> {
        let found = index.env_token();
        if self.recognizes(found) {
            Ok(())
        } else {
            tracing::warn!(
                "Refusing index with env token {} (expected {})",
                found,
                self.expected
            );
            Err(QueryError::IncompatibleIndex {
                expected: self.expected,
                found,
            })
        }
    }

    /// Splits a raw query into distinct terms, keeping first-occurrence order.
    pub fn parse_query(&self, query: &str) -> Vec<String> {
        self.parse_tokens(query)
            .into_iter()
            .map(|token| token.term)
            .collect()
    }

    /// Like [`QueryEngine::parse_query`], keeping each term's unstemmed word.
    pub fn parse_tokens(&self, query: &str) -> Vec<Token> {
        let mut seen = AHashSet::new();
        self.tokenizer
            .tokens(query, FieldKind::Body)
            .into_iter()
            .filter(|token| seen.insert(token.term.clone()))
            .collect()
    }

    /// Indexed terms reached by one stemmed query term: the exact term if present,
    /// otherwise every term starting with it.
    pub fn expand_term<'i>(&self, index: &'i Index, term: &str) -> Vec<Expansion<'i>> {
        let token = Token {
            term: term.to_string(),
            surface: term.to_string(),
        };
        self.expand(index, &token)
    }

    /// Indexed terms reached by one query token.
    ///
    /// An exact hit on the stemmed term wins. Otherwise every term starting with the
    /// stemmed term or the unstemmed word is reached, as is every term whose recorded
    /// unstemmed word starts with the unstemmed query word.
    pub fn expand<'i>(&self, index: &'i Index, token: &Token) -> Vec<Expansion<'i>> {
        if let Some((term, postings)) = index.lookup_term(&token.term) {
            return vec![Expansion {
                term,
                postings,
                kind: MatchKind::Exact,
            }];
        }

        let mut stem_prefixes = vec![token.term.as_str()];
        if token.is_stemmed() {
            stem_prefixes.push(token.surface.as_str());
        }

        let mut seen: AHashSet<&str> = AHashSet::new();
        stem_prefixes
            .into_iter()
            .flat_map(|prefix| index.terms_with_prefix(prefix))
            .chain(index.terms_with_surface_prefix(&token.surface))
            .filter(|&(term, _)| seen.insert(term))
            .map(|(term, postings)| Expansion {
                term,
                postings,
                kind: MatchKind::Prefix,
            })
            .collect()
    }

    /// Resolve `query` into ranked documents.
    ///
    /// A query that normalizes to no terms, or whose terms match nothing, yields an
    /// empty ranking. The only error is an index this engine does not recognise.
    pub fn search(
        &self,
        index: &Index,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<ScoredResult>, QueryError> {
        self.check(index)?;

        let start = Instant::now();
        let tokens = self.parse_tokens(query);
        if tokens.is_empty() || options.max_results == 0 {
            return Ok(vec![]);
        }

        let mut totals: AHashMap<DocId, f32> = AHashMap::new();
        for token in &tokens {
            let expansions = self.expand(index, token);
            tracing::trace!(
                "Term '{}' ({}) expanded to {} indexed terms",
                token.term,
                token.surface,
                expansions.len()
            );

            let mut scores = TermScores::default();
            for expansion in &expansions {
                scores.record(
                    expansion.postings,
                    expansion.kind,
                    &options.field_weights,
                    options.partial_match_factor,
                );
            }
            scores.add_to(&mut totals);
        }

        let matched = totals.len();
        let results: Vec<ScoredResult> = rank(totals, options.max_results)
            .into_iter()
            .map(|(doc_id, score)| ScoredResult {
                doc_id,
                score,
                matched_objects: self.matching_objects(index, doc_id, &tokens),
            })
            .collect();

        tracing::debug!(
            "Search for '{}' ({} terms) matched {} documents, returning {} in {:?}",
            query,
            tokens.len(),
            matched,
            results.len(),
            start.elapsed()
        );

        Ok(results)
    }

    /// Objects of `doc_id` with a name term, or its unstemmed word, starting with
    /// the corresponding form of any query token.
    fn matching_objects(&self, index: &Index, doc_id: DocId, tokens: &[Token]) -> Vec<ObjectId> {
        index
            .objects_of(doc_id)
            .iter()
            .enumerate()
            .filter(|(_, object)| {
                self.tokenizer
                    .tokens(&object.name, FieldKind::ObjectName)
                    .iter()
                    .any(|name| {
                        tokens.iter().any(|q| {
                            name.term.starts_with(q.term.as_str())
                                || name.surface.starts_with(q.surface.as_str())
                        })
                    })
            })
            .map(|(slot, _)| ObjectId {
                doc_id,
                slot: slot as u32,
            })
            .collect()
    }
}

/// Search with the default configuration.
///
/// Builds a fresh [`QueryEngine`] per call; keep an engine around for repeated queries.
pub fn search(
    index: &Index,
    query: &str,
    options: &SearchOptions,
) -> Result<Vec<ScoredResult>, QueryError> {
    QueryEngine::default().search(index, query, options)
}
