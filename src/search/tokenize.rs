//! Text tokenization and stemming for indexing and querying.
//!
//! The same [`Tokenizer`] must be used at build time and at query time; the
//! [`EnvToken`](super::EnvToken) stamped on every index encodes its configuration
//! so mismatches are caught before any lookup happens.

use ahash::AHashSet;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// English stop words dropped from body text.
/// Matches the list used by the Sphinx English search language.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "a", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "near", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with",
];

/// Minimum body token length. Set to 1 so short symbols like `x`, `u8` or `io` stay searchable.
pub const DEFAULT_MIN_TOKEN_LENGTH: usize = 1;

/// In-word symbols that keep a compound together, e.g. `snake_case` or `multi-line`.
pub const DEFAULT_WORD_CONNECTORS: &[char] = &['_', '-'];

/// The source of a piece of text within a document. Each field carries its own scoring weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Title,
    Body,
    ObjectName,
}

impl FieldKind {
    pub const ALL: [Self; 3] = [Self::ObjectName, Self::Title, Self::Body];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Body => "body",
            Self::ObjectName => "object-name",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snowball stemming languages supported by the tokenizer.
/// `None` disables stemming so surface forms are indexed as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StemmerLanguage {
    None,
    Danish,
    Dutch,
    English,
    French,
    German,
    Italian,
    Norwegian,
    Portuguese,
    Russian,
    Spanish,
    Swedish,
}

impl StemmerLanguage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Danish => "danish",
            Self::Dutch => "dutch",
            Self::English => "english",
            Self::French => "french",
            Self::German => "german",
            Self::Italian => "italian",
            Self::Norwegian => "norwegian",
            Self::Portuguese => "portuguese",
            Self::Russian => "russian",
            Self::Spanish => "spanish",
            Self::Swedish => "swedish",
        }
    }

    const fn algorithm(self) -> Option<Algorithm> {
        Some(match self {
            Self::None => return None,
            Self::Danish => Algorithm::Danish,
            Self::Dutch => Algorithm::Dutch,
            Self::English => Algorithm::English,
            Self::French => Algorithm::French,
            Self::German => Algorithm::German,
            Self::Italian => Algorithm::Italian,
            Self::Norwegian => Algorithm::Norwegian,
            Self::Portuguese => Algorithm::Portuguese,
            Self::Russian => Algorithm::Russian,
            Self::Spanish => Algorithm::Spanish,
            Self::Swedish => Algorithm::Swedish,
        })
    }
}

/// Settings that decide which terms a piece of text produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Dropped from body text only; titles and object names keep them.
    pub stop_words: Vec<String>,
    /// Body parts shorter than this (in characters) are dropped.
    pub min_token_length: usize,
    /// Snowball stemmer applied to every term.
    pub stemmer: StemmerLanguage,
    /// Symbols allowed inside a word. A compound is indexed whole and by its parts.
    pub word_connectors: Vec<char>,
    /// Split `camelCase` words into parts in addition to the whole word.
    pub split_camel_case: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| (*w).to_string()).collect(),
            min_token_length: DEFAULT_MIN_TOKEN_LENGTH,
            stemmer: StemmerLanguage::English,
            word_connectors: DEFAULT_WORD_CONNECTORS.to_vec(),
            split_camel_case: true,
        }
    }
}

/// A normalized term together with the lowercase word it was stemmed from.
///
/// Without stemming, or when the stemmer leaves the word unchanged, `surface == term`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub term: String,
    pub surface: String,
}

impl Token {
    pub fn is_stemmed(&self) -> bool {
        self.term != self.surface
    }
}

/// Splits raw text into normalized terms.
///
/// Words are maximal runs of Unicode letters and digits, optionally joined by a
/// configured connector. Every word is lowercased and stemmed; compound words
/// additionally yield their parts:
/// - **camelCase**: "invertMatrix" → ["invert", "matrix", "invertmatrix"]
/// - **snake_case**: "parse_json" → ["parse", "json", "parse_json"]
/// - **hyphen-case**: "multi-line" → ["multi", "line", "multi-line"]
pub struct Tokenizer {
    stop_words: AHashSet<String>,
    min_token_length: usize,
    stemmer: Option<Stemmer>,
    word_connectors: Vec<char>,
    split_camel_case: bool,
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokenizer")
            .field("stop_words", &self.stop_words.len())
            .field("min_token_length", &self.min_token_length)
            .field("stemming", &self.stemmer.is_some())
            .field("word_connectors", &self.word_connectors)
            .field("split_camel_case", &self.split_camel_case)
            .finish()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(&TokenizerConfig::default())
    }
}

impl Tokenizer {
    pub fn new(config: &TokenizerConfig) -> Self {
        Self {
            stop_words: config.stop_words.iter().map(|w| w.to_lowercase()).collect(),
            min_token_length: config.min_token_length,
            stemmer: config.stemmer.algorithm().map(Stemmer::create),
            word_connectors: config.word_connectors.clone(),
            split_camel_case: config.split_camel_case,
        }
    }

    /// Tokenize `text` as it appears in `field`.
    ///
    /// Stop words and the minimum length only apply to [`FieldKind::Body`]; short or
    /// common symbol names remain meaningful search targets in titles and objects.
    pub fn tokenize(&self, text: &str, field: FieldKind) -> Vec<String> {
        self.tokens(text, field)
            .into_iter()
            .map(|token| token.term)
            .collect()
    }

    /// Like [`Tokenizer::tokenize`], keeping the unstemmed form of every term.
    pub fn tokens(&self, text: &str, field: FieldKind) -> Vec<Token> {
        let mut tokens = vec![];
        for word in self.words(text) {
            self.split_word(word, field, &mut tokens);
        }
        tokens
    }

    /// Finds word boundaries. A connector only glues when it sits between two
    /// alphanumeric characters; leading, trailing and doubled connectors separate words.
    fn words<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let mut words = vec![];
        let mut word_start: Option<usize> = None;
        let mut chars = text.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            if c.is_alphanumeric() {
                word_start.get_or_insert(i);
                continue;
            }

            let glues = word_start.is_some()
                && self.word_connectors.contains(&c)
                && chars.peek().is_some_and(|&(_, next)| next.is_alphanumeric());

            if !glues && let Some(start) = word_start.take() {
                words.push(&text[start..i]);
            }
        }

        if let Some(start) = word_start {
            words.push(&text[start..]);
        }
        words
    }

    /// Emits the parts of a single word followed by the whole word.
    fn split_word(&self, word: &str, field: FieldKind, tokens: &mut Vec<Token>) {
        let mut part_start = 0;
        let mut split = false;
        // Digits extend a lowercase run so "utf8Decoder" splits before "Decoder"
        let mut last_lower = false;

        for (i, c) in word.char_indices() {
            if self.word_connectors.contains(&c) {
                self.push_token(&word[part_start..i], field, tokens);
                part_start = i + c.len_utf8();
                split = true;
            } else if self.split_camel_case && last_lower && c.is_uppercase() {
                self.push_token(&word[part_start..i], field, tokens);
                part_start = i;
                split = true;
            }
            last_lower = c.is_lowercase() || (c.is_numeric() && last_lower);
        }

        if split {
            self.push_token(&word[part_start..], field, tokens);
        }
        self.push_token(word, field, tokens);
    }

    /// Normalizes one token and appends it unless the field's filters reject it.
    fn push_token(&self, token: &str, field: FieldKind, tokens: &mut Vec<Token>) {
        let lowercase = token.to_lowercase();

        if field == FieldKind::Body
            && (lowercase.chars().count() < self.min_token_length
                || self.stop_words.contains(&lowercase))
        {
            return;
        }

        let term = match &self.stemmer {
            Some(stemmer) => stemmer.stem(&lowercase).into_owned(),
            None => lowercase.clone(),
        };

        if !term.is_empty() {
            tokens.push(Token {
                term,
                surface: lowercase,
            });
        }
    }
}
