//! The immutable, queryable index produced by the builder.
//!
//! An [`Index`] has no mutators: it is constructed once and then shared by any
//! number of concurrent readers without synchronization.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;

use super::tokenize::FieldKind;
use super::version::EnvToken;

/// Dense document identifier, assigned in corpus order.
pub type DocId = u32;

/// A document known to the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub filename: String,
    pub title: String,
}

impl Document {
    /// The filename without its final extension, e.g. `Theory/Index` for `Theory/Index.md`.
    pub fn docname(&self) -> &str {
        let name_start = self.filename.rfind('/').map_or(0, |i| i + 1);
        match self.filename[name_start..].rfind('.') {
            Some(dot) if dot > 0 => &self.filename[..name_start + dot],
            _ => &self.filename,
        }
    }
}

/// A named, anchor-addressable symbol owned by a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub name: String,
    /// Category tag such as `function`, `class` or `py:method`.
    pub domain: String,
    /// In-page fragment identifier.
    pub anchor: String,
}

/// Address of an object: its owning document and its position within that document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    pub doc_id: DocId,
    pub slot: u32,
}

/// Per-field document sets for a single term.
///
/// Each list is sorted and duplicate-free: the index records term presence per
/// field, not occurrence counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPostings {
    pub title: Vec<DocId>,
    pub body: Vec<DocId>,
    pub object_name: Vec<DocId>,
}

impl FieldPostings {
    pub fn get(&self, field: FieldKind) -> &[DocId] {
        match field {
            FieldKind::Title => &self.title,
            FieldKind::Body => &self.body,
            FieldKind::ObjectName => &self.object_name,
        }
    }

    pub(crate) fn get_mut(&mut self, field: FieldKind) -> &mut Vec<DocId> {
        match field {
            FieldKind::Title => &mut self.title,
            FieldKind::Body => &mut self.body,
            FieldKind::ObjectName => &mut self.object_name,
        }
    }

    pub fn contains(&self, field: FieldKind, doc_id: DocId) -> bool {
        self.get(field).binary_search(&doc_id).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.body.is_empty() && self.object_name.is_empty()
    }
}

/// A searchable inverted index over a documentation corpus.
///
/// Deserialization goes through [`IndexParts`] so derived tables are always rebuilt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "IndexParts")]
pub struct Index {
    /// Documents ordered by `DocId`
    documents: Vec<Document>,
    /// Map from normalized term to its per-field postings, ordered for prefix scans
    postings: BTreeMap<String, FieldPostings>,
    /// Map from unstemmed lowercase word to its indexed term, for words the stemmer shortened
    surfaces: BTreeMap<String, String>,
    /// Objects owned by each document, indexed by `DocId`
    objects: Vec<Vec<Object>>,
    /// Map from lowercased full object name to every object carrying it
    #[serde(skip)]
    object_names: BTreeMap<String, Vec<ObjectId>>,
    env_token: EnvToken,
}

/// The stored tables of an [`Index`], in serialization order.
#[derive(Deserialize)]
pub(crate) struct IndexParts {
    pub(crate) documents: Vec<Document>,
    pub(crate) postings: BTreeMap<String, FieldPostings>,
    pub(crate) surfaces: BTreeMap<String, String>,
    pub(crate) objects: Vec<Vec<Object>>,
    pub(crate) env_token: EnvToken,
}

impl From<IndexParts> for Index {
    fn from(parts: IndexParts) -> Self {
        Self::from_parts(parts)
    }
}

impl Index {
    /// Assemble an index from finished tables. The reverse object table is derived here.
    pub(crate) fn from_parts(parts: IndexParts) -> Self {
        let IndexParts {
            documents,
            postings,
            surfaces,
            objects,
            env_token,
        } = parts;

        let mut object_names: BTreeMap<String, Vec<ObjectId>> = BTreeMap::new();
        for (doc_id, owned) in objects.iter().enumerate() {
            for (slot, object) in owned.iter().enumerate() {
                object_names
                    .entry(object.name.to_lowercase())
                    .or_default()
                    .push(ObjectId {
                        doc_id: doc_id as DocId,
                        slot: slot as u32,
                    });
            }
        }

        Self {
            documents,
            postings,
            surfaces,
            objects,
            object_names,
            env_token,
        }
    }

    pub fn env_token(&self) -> EnvToken {
        self.env_token
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> {
        self.documents.get(doc_id as usize)
    }

    /// Per-field postings for an exact term.
    pub fn postings(&self, term: &str) -> Option<&FieldPostings> {
        self.postings.get(term)
    }

    /// All terms in lexicographic order with their postings.
    pub fn terms(&self) -> impl Iterator<Item = (&str, &FieldPostings)> {
        self.postings.iter().map(|(term, p)| (term.as_str(), p))
    }

    /// An exact term together with its postings, borrowed from the index.
    pub fn lookup_term(&self, term: &str) -> Option<(&str, &FieldPostings)> {
        self.postings
            .get_key_value(term)
            .map(|(term, p)| (term.as_str(), p))
    }

    /// Terms starting with `prefix`, found by a range scan over the ordered term table.
    pub fn terms_with_prefix<'p>(
        &self,
        prefix: &'p str,
    ) -> impl Iterator<Item = (&str, &FieldPostings)> {
        self.postings
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(term, _)| term.starts_with(prefix))
            .map(|(term, p)| (term.as_str(), p))
    }

    /// Unstemmed words that stemmed to a different term, with that term.
    pub fn surfaces(&self) -> impl Iterator<Item = (&str, &str)> {
        self.surfaces.iter().map(|(s, t)| (s.as_str(), t.as_str()))
    }

    /// Indexed terms whose unstemmed word starts with `prefix`.
    ///
    /// Reaches terms like `invers` from a partially typed `inversi`. Several words may
    /// share a term, so results can repeat.
    pub fn terms_with_surface_prefix<'p>(
        &self,
        prefix: &'p str,
    ) -> impl Iterator<Item = (&str, &FieldPostings)> {
        self.surfaces
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(surface, _)| surface.starts_with(prefix))
            .filter_map(|(_, term)| self.lookup_term(term))
    }

    /// Objects owned by a document, in the order they were supplied.
    pub fn objects_of(&self, doc_id: DocId) -> &[Object] {
        self.objects
            .get(doc_id as usize)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects_of(id.doc_id).get(id.slot as usize)
    }

    /// Objects whose full name equals `name`, ignoring case.
    pub fn lookup_objects(&self, name: &str) -> &[ObjectId] {
        self.object_names
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Objects whose full name starts with `prefix`, ignoring case, ordered by name.
    pub fn objects_with_prefix(&self, prefix: &str) -> Vec<ObjectId> {
        let prefix = prefix.to_lowercase();
        self.object_names
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .take_while(|(name, _)| name.starts_with(&prefix))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    /// Distinct object domains, sorted.
    pub fn domains(&self) -> Vec<&str> {
        let mut domains: Vec<&str> = self
            .objects
            .iter()
            .flatten()
            .map(|object| object.domain.as_str())
            .collect();
        domains.sort_unstable();
        domains.dedup();
        domains
    }

    /// Get the number of unique terms in the index
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    /// Get the number of documents in the index
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn object_count(&self) -> usize {
        self.objects.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
