//! Configuration for building and querying indexes.
//!
//! Every field has a default, so a settings file only needs the values it changes:
//!
//! ```toml
//! [tokenizer]
//! stemmer = "german"
//! min_token_length = 2
//!
//! [search]
//! max_results = 20
//!
//! [search.field_weights]
//! title = 12.0
//! ```

use crate::error::Result;
use crate::search::{EnvToken, SearchOptions, TokenizerConfig};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The part of the configuration that decides what an index contains.
///
/// Indexes built and queried under different `IndexConfig`s are incompatible;
/// the difference shows up as differing [`EnvToken`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub tokenizer: TokenizerConfig,
}

impl IndexConfig {
    /// The token stamped on indexes built with this configuration.
    pub fn env_token(&self) -> EnvToken {
        EnvToken::compute(&self.tokenizer)
    }
}

/// Complete settings as read from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tokenizer: TokenizerConfig,
    pub search: SearchOptions,
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse settings")
    }

    /// Load settings from a TOML file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Write settings as TOML, creating parent directories as needed.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        Ok(())
    }

    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            tokenizer: self.tokenizer.clone(),
        }
    }
}
