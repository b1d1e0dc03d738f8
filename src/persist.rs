//! Binary persistence for built indexes.
//!
//! Indexes are encoded with postcard. Loading is synchronous and lives outside the
//! query path: callers load once, then share the resident [`Index`] between readers.

use crate::error::Result;
use crate::search::{Index, QueryEngine};
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Encode an index into a byte buffer.
pub fn to_bytes(index: &Index) -> Result<Vec<u8>> {
    postcard::to_stdvec(index).context("Failed to encode search index")
}

/// Decode an index previously produced by [`to_bytes`].
pub fn from_bytes(bytes: &[u8]) -> Result<Index> {
    postcard::from_bytes(bytes).context("Failed to decode search index")
}

/// Write an index to disk.
///
/// The file is written next to its destination first and renamed into place, so
/// readers never observe a partially written index.
pub fn save(index: &Index, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = to_bytes(index)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create index directory {}", parent.display()))?;
    }

    let partial = partial_path(path);
    std::fs::write(&partial, &bytes)
        .with_context(|| format!("Failed to write search index to {}", partial.display()))?;
    if let Err(e) = std::fs::rename(&partial, path) {
        let _ = std::fs::remove_file(&partial);
        return Err(e).with_context(|| format!("Failed to move search index into {}", path.display()));
    }

    tracing::debug!(
        "Saved search index to {} ({} bytes, env token {})",
        path.display(),
        bytes.len(),
        index.env_token()
    );
    Ok(())
}

/// Read an index from disk.
pub fn load(path: impl AsRef<Path>) -> Result<Index> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read search index from {}", path.display()))?;
    let index = from_bytes(&bytes).with_context(|| format!("Invalid search index {}", path.display()))?;

    tracing::debug!(
        "Loaded search index from {} ({} terms, {} docs)",
        path.display(),
        index.term_count(),
        index.document_count()
    );
    Ok(index)
}

/// Read an index from disk and verify that `engine` can query it.
pub fn load_compatible(path: impl AsRef<Path>, engine: &QueryEngine) -> Result<Index> {
    let path = path.as_ref();
    let index = load(path)?;
    engine
        .check(&index)
        .with_context(|| format!("Search index {} was built with another configuration", path.display()))?;
    Ok(index)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}
