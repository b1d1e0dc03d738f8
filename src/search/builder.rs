//! Inverted index construction from a documentation corpus.

use ahash::{AHashMap, AHashSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use super::index::{DocId, Document, FieldPostings, Index, IndexParts, Object};
use super::tokenize::{FieldKind, Token, Tokenizer};
use crate::config::IndexConfig;
use crate::error::BuildError;

/// A named symbol as supplied by the document parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub anchor: String,
}

/// One input document: already-extracted plain text plus its named objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub filename: String,
    pub title: String,
    #[serde(default, alias = "body_text")]
    pub body: String,
    #[serde(default)]
    pub objects: Vec<ObjectRecord>,
}

/// Accumulates (term, field, doc) triples before finalization.
///
/// Each document contributes a term at most once per field, so posting lists only
/// need sorting when partial builders from different workers are merged.
#[derive(Default)]
struct TermBuilder {
    postings: AHashMap<String, FieldPostings>,
    /// Unstemmed words mapped to the shorter term they were indexed under
    surfaces: AHashMap<String, String>,
    /// Total number of (term, field, doc) triples recorded
    triples: usize,
}

impl TermBuilder {
    /// Tokenize every field of a document and record term presence.
    fn add_document(&mut self, tokenizer: &Tokenizer, doc_id: DocId, record: &DocumentRecord) {
        self.add_terms(tokenizer.tokens(&record.title, FieldKind::Title), FieldKind::Title, doc_id);
        self.add_terms(tokenizer.tokens(&record.body, FieldKind::Body), FieldKind::Body, doc_id);

        let object_terms = record
            .objects
            .iter()
            .flat_map(|object| tokenizer.tokens(&object.name, FieldKind::ObjectName))
            .collect();
        self.add_terms(object_terms, FieldKind::ObjectName, doc_id);
    }

    /// Repeated occurrences within one field collapse to a single membership.
    fn add_terms(&mut self, tokens: Vec<Token>, field: FieldKind, doc_id: DocId) {
        let mut unique: AHashSet<String> = AHashSet::with_capacity(tokens.len());
        for token in tokens {
            if token.is_stemmed() && !self.surfaces.contains_key(&token.surface) {
                self.surfaces.insert(token.surface, token.term.clone());
            }
            unique.insert(token.term);
        }
        for term in unique {
            self.postings
                .entry(term)
                .or_default()
                .get_mut(field)
                .push(doc_id);
            self.triples += 1;
        }
    }

    /// Combine two partial builders covering disjoint documents.
    fn merge(self, other: Self) -> Self {
        let (mut large, small) = if self.postings.len() >= other.postings.len() {
            (self, other)
        } else {
            (other, self)
        };

        for (term, postings) in small.postings {
            let target = large.postings.entry(term).or_default();
            for field in FieldKind::ALL {
                target.get_mut(field).extend_from_slice(postings.get(field));
            }
        }
        large.surfaces.extend(small.surfaces);
        large.triples += small.triples;
        large
    }

    /// Sorts every posting list and produces the ordered term and surface tables.
    fn finalize(self) -> (BTreeMap<String, FieldPostings>, BTreeMap<String, String>) {
        let postings = self
            .postings
            .into_iter()
            .map(|(term, mut postings)| {
                for field in FieldKind::ALL {
                    let docs = postings.get_mut(field);
                    docs.sort_unstable();
                    docs.dedup();
                }
                (term, postings)
            })
            .collect();
        (postings, self.surfaces.into_iter().collect())
    }
}

/// Builds immutable [`Index`] values from a corpus.
///
/// Holds no state between calls beyond its configuration.
#[derive(Debug)]
pub struct IndexBuilder {
    config: IndexConfig,
    tokenizer: Tokenizer,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new(IndexConfig::default())
    }
}

impl IndexBuilder {
    pub fn new(config: IndexConfig) -> Self {
        let tokenizer = Tokenizer::new(&config.tokenizer);
        Self { config, tokenizer }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Build an index in one pass over the corpus.
    ///
    /// Document ids follow input order. Fails without producing an index when two
    /// records share a filename; an empty corpus yields an empty, valid index.
    pub fn build<I>(&self, records: I) -> Result<Index, BuildError>
    where
        I: IntoIterator<Item = DocumentRecord>,
    {
        let start = Instant::now();
        let records: Vec<DocumentRecord> = records.into_iter().collect();
        let (documents, objects) = assign_ids(&records)?;

        let mut terms = TermBuilder::default();
        for (doc_id, record) in records.iter().enumerate() {
            terms.add_document(&self.tokenizer, doc_id as DocId, record);
        }

        Ok(self.finish(documents, objects, terms, start))
    }

    /// Build an index, tokenizing documents in parallel.
    ///
    /// Each rayon worker fills its own partial term table; the partial tables are
    /// combined by a final reduce, so no lock guards the shared postings. The
    /// result is identical to [`IndexBuilder::build`].
    pub fn build_parallel(&self, records: Vec<DocumentRecord>) -> Result<Index, BuildError> {
        let start = Instant::now();
        let (documents, objects) = assign_ids(&records)?;

        let terms = records
            .par_iter()
            .enumerate()
            .fold(TermBuilder::default, |mut partial, (doc_id, record)| {
                partial.add_document(&self.tokenizer, doc_id as DocId, record);
                partial
            })
            .reduce(TermBuilder::default, TermBuilder::merge);

        Ok(self.finish(documents, objects, terms, start))
    }

    fn finish(
        &self,
        documents: Vec<Document>,
        objects: Vec<Vec<Object>>,
        terms: TermBuilder,
        start: Instant,
    ) -> Index {
        let triples = terms.triples;
        let (postings, surfaces) = terms.finalize();
        let index = Index::from_parts(IndexParts {
            documents,
            postings,
            surfaces,
            objects,
            env_token: self.config.env_token(),
        });

        tracing::info!(
            "Built search index: {} unique terms, {} documents, {} objects, {} term-field-document triples in {:?}",
            index.term_count(),
            index.document_count(),
            index.object_count(),
            triples,
            start.elapsed()
        );

        index
    }
}

/// Build an index with the given configuration.
pub fn build<I>(records: I, config: &IndexConfig) -> Result<Index, BuildError>
where
    I: IntoIterator<Item = DocumentRecord>,
{
    IndexBuilder::new(config.clone()).build(records)
}

/// Assigns dense ids in input order and rejects duplicate filenames.
fn assign_ids(records: &[DocumentRecord]) -> Result<(Vec<Document>, Vec<Vec<Object>>), BuildError> {
    let mut seen: AHashMap<&str, DocId> = AHashMap::with_capacity(records.len());
    let mut documents = Vec::with_capacity(records.len());
    let mut objects = Vec::with_capacity(records.len());

    for (doc_id, record) in records.iter().enumerate() {
        let doc_id = doc_id as DocId;
        if let Some(&first) = seen.get(record.filename.as_str()) {
            return Err(BuildError::DuplicateFilename {
                filename: record.filename.clone(),
                first,
                second: doc_id,
            });
        }
        seen.insert(&record.filename, doc_id);

        documents.push(Document {
            filename: record.filename.clone(),
            title: record.title.clone(),
        });
        objects.push(
            record
                .objects
                .iter()
                .map(|object| Object {
                    name: object.name.clone(),
                    domain: object.domain.clone(),
                    anchor: object.anchor.clone(),
                })
                .collect(),
        );
    }

    Ok((documents, objects))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tokenize::{StemmerLanguage, TokenizerConfig};
    use assert2::{check, let_assert};

    fn doc(filename: &str, title: &str, body: &str) -> DocumentRecord {
        DocumentRecord {
            filename: filename.into(),
            title: title.into(),
            body: body.into(),
            objects: vec![],
        }
    }

    fn plain_builder() -> IndexBuilder {
        IndexBuilder::new(IndexConfig {
            tokenizer: TokenizerConfig {
                stemmer: StemmerLanguage::None,
                ..TokenizerConfig::default()
            },
        })
    }

    #[test]
    fn test_doc_ids_follow_input_order() {
        let index = plain_builder()
            .build(vec![doc("z.md", "Z", ""), doc("a.md", "A", "")])
            .unwrap();
        check!(index.document(0).map(|d| d.filename.as_str()) == Some("z.md"));
        check!(index.document(1).map(|d| d.filename.as_str()) == Some("a.md"));
    }

    #[test]
    fn test_fields_are_partitioned() {
        let index = plain_builder()
            .build(vec![
                doc("a.md", "Solver", "solver options"),
                doc("b.md", "Mesh", "the solver"),
            ])
            .unwrap();

        let_assert!(Some(solver) = index.postings("solver"));
        check!(solver.title == [0]);
        check!(solver.body == [0, 1]);
        check!(solver.object_name.is_empty());

        // Stop words are dropped from bodies
        check!(index.postings("the").is_none());
    }

    #[test]
    fn test_repeated_terms_collapse_to_presence() {
        let index = plain_builder()
            .build(vec![doc("a.md", "mesh mesh", "mesh mesh mesh")])
            .unwrap();
        let_assert!(Some(mesh) = index.postings("mesh"));
        check!(mesh.title == [0]);
        check!(mesh.body == [0]);
    }

    #[test]
    fn test_objects_are_indexed_by_name() {
        let mut record = doc("b.md", "Notes", "matrix inversion example");
        record.objects.push(ObjectRecord {
            name: "invertMatrix".into(),
            domain: "function".into(),
            anchor: "#fn1".into(),
        });
        let index = plain_builder().build(vec![doc("a.md", "", ""), record]).unwrap();

        for term in ["invert", "matrix", "invertmatrix"] {
            let_assert!(Some(postings) = index.postings(term));
            check!(postings.object_name == [1]);
        }
        check!(index.objects_of(1).len() == 1);
        check!(index.objects_of(1)[0].anchor == "#fn1");
        check!(index.lookup_objects("invertmatrix").len() == 1);
    }

    #[test]
    fn test_stemmed_words_keep_their_surface() {
        let index = IndexBuilder::default()
            .build(vec![doc("a.md", "Inversion", "solving the mesh")])
            .unwrap();
        let surfaces: Vec<(&str, &str)> = index.surfaces().collect();
        check!(surfaces == [("inversion", "invers"), ("solving", "solv")]);
    }

    #[test]
    fn test_duplicate_filename_is_rejected() {
        let result = plain_builder().build(vec![
            doc("a.md", "One", ""),
            doc("b.md", "Two", ""),
            doc("a.md", "Three", ""),
        ]);
        check!(
            result
                == Err(BuildError::DuplicateFilename {
                    filename: "a.md".into(),
                    first: 0,
                    second: 2,
                })
        );
    }

    #[test]
    fn test_empty_corpus() {
        let index = plain_builder().build(Vec::new()).unwrap();
        check!(index.is_empty());
        check!(index.term_count() == 0);
        check!(index.env_token() == plain_builder().config().env_token());
    }

    #[test]
    fn test_parallel_build_matches_sequential() {
        let records: Vec<DocumentRecord> = (0..64)
            .map(|i| {
                let mut record = doc(
                    &format!("doc{i}.md"),
                    &format!("Title {}", i % 5),
                    &format!("body words shared{} unique{}", i % 3, i),
                );
                record.objects.push(ObjectRecord {
                    name: format!("object_{}", i % 7),
                    domain: "function".into(),
                    anchor: String::new(),
                });
                record
            })
            .collect();

        let builder = IndexBuilder::default();
        let sequential = builder.build(records.clone()).unwrap();
        let parallel = builder.build_parallel(records).unwrap();
        check!(sequential == parallel);
    }

    #[test]
    fn test_parallel_build_rejects_duplicates() {
        let result = IndexBuilder::default()
            .build_parallel(vec![doc("a.md", "", ""), doc("a.md", "", "")]);
        check!(result.is_err());
    }
}
