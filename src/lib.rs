//! Build and query compact inverted indexes for documentation sites.
//!
//! Documents are tokenized into per-field posting lists by an [`IndexBuilder`],
//! producing an immutable [`Index`]. A [`QueryEngine`] resolves free-text queries
//! against it with prefix expansion and field-weighted ranking, and
//! [`format::format_results`] maps the ranking back to filenames and anchors.

pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod persist;
pub mod search;
pub mod searchindex;

pub use config::{IndexConfig, Settings};
pub use error::{BuildError, QueryError, Result};
pub use format::{FormattedObject, FormattedResult, format_results, render_text};
pub use search::{
    DocId, Document, DocumentRecord, EnvToken, FieldKind, FieldPostings, FieldWeights, Index,
    IndexBuilder, Object, ObjectId, ObjectRecord, QueryEngine, ScoredResult, SearchOptions,
    StemmerLanguage, Token, Tokenizer, TokenizerConfig, build, search,
};
