//! Full-text search infrastructure for documentation sites.
//!
//! This module provides tokenization, index construction, the immutable index
//! model, field-aware scoring and query resolution.

// Module declarations
pub(crate) mod builder;
pub(crate) mod index;
pub(crate) mod query;
pub(crate) mod scoring;
pub(crate) mod tokenize;
pub(crate) mod version;

// Public re-exports (used via lib.rs)
pub use builder::{DocumentRecord, IndexBuilder, ObjectRecord, build};
pub use index::{DocId, Document, FieldPostings, Index, Object, ObjectId};
pub use query::{Expansion, QueryEngine, ScoredResult, SearchOptions, search};
pub use scoring::{FieldWeights, MatchKind};
pub use tokenize::{
    DEFAULT_MIN_TOKEN_LENGTH, DEFAULT_STOP_WORDS, DEFAULT_WORD_CONNECTORS, FieldKind,
    StemmerLanguage, Token, Tokenizer, TokenizerConfig,
};
pub use version::{EnvToken, ParseTokenError, SCHEMA_VERSION};
