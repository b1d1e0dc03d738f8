//! Build compatibility stamping.
//!
//! Every index carries an [`EnvToken`] derived from the schema version and the
//! tokenizer configuration it was built with. A query engine compares tokens by
//! value and refuses indexes it does not recognise, so a stale or foreign build
//! fails loudly instead of silently returning wrong matches.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use xxhash_rust::xxh3::xxh3_64;

use super::tokenize::TokenizerConfig;

/// Version of the on-disk and in-memory index layout.
/// Bump whenever `Index` or the meaning of its tables changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Opaque build-compatibility token stamped on every index.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct EnvToken(u64);

/// Canonical view of everything that influences which terms get indexed.
/// Stop words are sorted and deduplicated so list order never changes the token.
#[derive(Serialize)]
struct Fingerprint<'a> {
    schema_version: u32,
    stop_words: Vec<String>,
    min_token_length: usize,
    stemmer: &'a str,
    word_connectors: Vec<char>,
    split_camel_case: bool,
}

impl EnvToken {
    /// Derive the token for a tokenizer configuration under the current schema.
    pub fn compute(config: &TokenizerConfig) -> Self {
        let mut stop_words: Vec<String> =
            config.stop_words.iter().map(|w| w.to_lowercase()).collect();
        stop_words.sort_unstable();
        stop_words.dedup();

        let mut word_connectors = config.word_connectors.clone();
        word_connectors.sort_unstable();
        word_connectors.dedup();

        let fingerprint = Fingerprint {
            schema_version: SCHEMA_VERSION,
            stop_words,
            min_token_length: config.min_token_length,
            stemmer: config.stemmer.as_str(),
            word_connectors,
            split_camel_case: config.split_camel_case,
        };

        // Serializing plain strings, integers and chars into a Vec cannot fail.
        let bytes = postcard::to_stdvec(&fingerprint).unwrap_or_default();
        Self(xxh3_64(&bytes))
    }

    /// Wrap a raw token value, e.g. one read back from a foreign encoding.
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// The raw token value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the token as 16 lowercase hexadecimal digits.
    pub fn as_hex(self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for EnvToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hex())
    }
}

impl FromStr for EnvToken {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 16 {
            return Err(ParseTokenError::InvalidLength(s.len()));
        }
        u64::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| ParseTokenError::InvalidHex)
    }
}

impl Serialize for EnvToken {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.as_hex())
    }
}

impl<'de> Deserialize<'de> for EnvToken {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for token parsing failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseTokenError {
    /// Invalid hexadecimal characters in the input
    #[error("invalid hexadecimal characters in env token")]
    InvalidHex,
    /// Invalid length (expected 16 hex characters)
    #[error("invalid env token length: expected 16 hex characters, got {0}")]
    InvalidLength(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tokenize::StemmerLanguage;
    use assert2::check;

    #[test]
    fn test_token_is_deterministic() {
        let config = TokenizerConfig::default();
        check!(EnvToken::compute(&config) == EnvToken::compute(&config));
    }

    #[test]
    fn test_stop_word_order_does_not_matter() {
        let a = TokenizerConfig {
            stop_words: vec!["the".into(), "and".into()],
            ..TokenizerConfig::default()
        };
        let b = TokenizerConfig {
            stop_words: vec!["AND".into(), "the".into(), "the".into()],
            ..TokenizerConfig::default()
        };
        check!(EnvToken::compute(&a) == EnvToken::compute(&b));
    }

    #[test]
    fn test_tokenizer_changes_change_token() {
        let base = TokenizerConfig::default();
        let no_stem = TokenizerConfig {
            stemmer: StemmerLanguage::None,
            ..TokenizerConfig::default()
        };
        let german = TokenizerConfig {
            stemmer: StemmerLanguage::German,
            ..TokenizerConfig::default()
        };
        let longer = TokenizerConfig {
            min_token_length: 3,
            ..TokenizerConfig::default()
        };
        check!(EnvToken::compute(&base) != EnvToken::compute(&no_stem));
        check!(EnvToken::compute(&base) != EnvToken::compute(&german));
        check!(EnvToken::compute(&base) != EnvToken::compute(&longer));
    }

    #[test]
    fn test_hex_round_trip() {
        let token = EnvToken::from_u64(0x00ab_cdef_0123_4567);
        check!(token.to_string() == "00abcdef01234567");
        check!(token.to_string().parse::<EnvToken>() == Ok(token));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        check!("abc".parse::<EnvToken>() == Err(ParseTokenError::InvalidLength(3)));
        check!("zzzzzzzzzzzzzzzz".parse::<EnvToken>() == Err(ParseTokenError::InvalidHex));
    }
}
