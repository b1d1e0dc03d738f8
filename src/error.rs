//! Error handling types and utilities.

use crate::search::{DocId, EnvToken};

/// A specialized Result type for I/O-facing docindex operations.
///
/// This is an alias for `anyhow::Result` with context added via `.context()` and
/// `.with_context()` methods wherever files or foreign encodings are involved.
pub type Result<T> = anyhow::Result<T>;

/// Error returned when building an index fails.
///
/// A failed build never yields a partial index.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// Two input documents share the same filename.
    #[error("duplicate filename '{filename}' (documents {first} and {second})")]
    DuplicateFilename {
        filename: String,
        first: DocId,
        second: DocId,
    },
}

/// Error returned when a query cannot run against the given index.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The index was stamped by a build configuration this engine does not recognise.
    #[error("incompatible index: built with env token {found}, engine expects {expected}")]
    IncompatibleIndex { expected: EnvToken, found: EnvToken },
}
