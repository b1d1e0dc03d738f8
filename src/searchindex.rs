//! The `searchindex.js` encoding used by static documentation sites.
//!
//! The file is a single object literal passed to `Search.setIndex(...)` with flat
//! tables: `docnames`, `filenames` and `titles` indexed by document id, one term
//! table per field (`terms` for bodies, `titleterms`, `objterms`), the `objects`
//! list with its `objtypes`/`objnames` lookup tables, and the `envversion` stamp.
//! `surfaces` maps unstemmed words to the terms they were indexed under so partial
//! words keep matching after a round trip.
//! Posting lists holding a single document are written as a bare integer.

use crate::error::{BuildError, Result};
use crate::search::index::IndexParts;
use crate::search::{
    DocId, Document, EnvToken, FieldKind, FieldPostings, Index, Object, SCHEMA_VERSION,
};
use ahash::AHashMap;
use anyhow::{Context, bail, ensure};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key under which the schema version is recorded in `envversion`.
pub const ENVVERSION_KEY: &str = "docindex";

const JS_PREFIX: &str = "Search.setIndex(";

/// Documents containing a term: a bare id when there is exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocRefs {
    One(DocId),
    Many(Vec<DocId>),
}

impl DocRefs {
    fn from_slice(docs: &[DocId]) -> Self {
        match docs {
            [doc] => Self::One(*doc),
            _ => Self::Many(docs.to_vec()),
        }
    }

    fn into_vec(self) -> Vec<DocId> {
        match self {
            Self::One(doc) => vec![doc],
            Self::Many(docs) => docs,
        }
    }
}

/// One object: `[doc_id, objtype, priority, anchor, name]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry(pub DocId, pub u32, pub i32, pub String, pub String);

/// Default object priority in the historical format.
const DEFAULT_PRIORITY: i32 = 1;

/// The on-disk table layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIndexFile {
    pub docnames: Vec<String>,
    pub envversion: BTreeMap<String, u64>,
    pub envtoken: EnvToken,
    pub filenames: Vec<String>,
    #[serde(default)]
    pub objects: Vec<ObjectEntry>,
    #[serde(default)]
    pub objnames: BTreeMap<u32, (String, String, String)>,
    #[serde(default)]
    pub objterms: BTreeMap<String, DocRefs>,
    #[serde(default)]
    pub objtypes: BTreeMap<u32, String>,
    #[serde(default)]
    pub surfaces: BTreeMap<String, String>,
    pub terms: BTreeMap<String, DocRefs>,
    #[serde(default)]
    pub titles: Vec<String>,
    #[serde(default)]
    pub titleterms: BTreeMap<String, DocRefs>,
}

/// Flatten an index into the historical table layout.
pub fn encode(index: &Index) -> SearchIndexFile {
    let documents = index.documents();

    let mut terms = BTreeMap::new();
    let mut titleterms = BTreeMap::new();
    let mut objterms = BTreeMap::new();
    for (term, postings) in index.terms() {
        for (field, table) in [
            (FieldKind::Body, &mut terms),
            (FieldKind::Title, &mut titleterms),
            (FieldKind::ObjectName, &mut objterms),
        ] {
            let docs = postings.get(field);
            if !docs.is_empty() {
                table.insert(term.to_string(), DocRefs::from_slice(docs));
            }
        }
    }

    // Intern domains in order of first appearance
    let mut type_ids: BTreeMap<&str, u32> = BTreeMap::new();
    let mut objtypes = BTreeMap::new();
    let mut objnames = BTreeMap::new();
    let mut objects = Vec::with_capacity(index.object_count());
    for doc_id in 0..documents.len() as DocId {
        for object in index.objects_of(doc_id) {
            let next_id = type_ids.len() as u32;
            let type_id = *type_ids.entry(object.domain.as_str()).or_insert_with(|| {
                let (prefix, kind) = split_domain(&object.domain);
                objtypes.insert(next_id, object.domain.clone());
                objnames.insert(next_id, (prefix.to_string(), kind.to_string(), kind.to_string()));
                next_id
            });
            objects.push(ObjectEntry(
                doc_id,
                type_id,
                DEFAULT_PRIORITY,
                object.anchor.clone(),
                object.name.clone(),
            ));
        }
    }

    SearchIndexFile {
        docnames: documents.iter().map(|d| d.docname().to_string()).collect(),
        envversion: BTreeMap::from([(ENVVERSION_KEY.to_string(), u64::from(SCHEMA_VERSION))]),
        envtoken: index.env_token(),
        filenames: documents.iter().map(|d| d.filename.clone()).collect(),
        objects,
        objnames,
        objterms,
        objtypes,
        surfaces: index
            .surfaces()
            .map(|(surface, term)| (surface.to_string(), term.to_string()))
            .collect(),
        terms,
        titles: documents.iter().map(|d| d.title.clone()).collect(),
        titleterms,
    }
}

/// Rebuild an index from the historical table layout, validating every reference.
pub fn decode(file: SearchIndexFile) -> Result<Index> {
    let version = file.envversion.get(ENVVERSION_KEY).copied();
    ensure!(
        version == Some(u64::from(SCHEMA_VERSION)),
        "Unsupported search index schema version {:?} (expected {})",
        version,
        SCHEMA_VERSION
    );

    let num_docs = file.filenames.len();
    ensure!(
        file.titles.len() == num_docs,
        "Search index has {} filenames but {} titles",
        num_docs,
        file.titles.len()
    );
    ensure!(
        file.docnames.len() == num_docs,
        "Search index has {} filenames but {} docnames",
        num_docs,
        file.docnames.len()
    );

    let mut seen: AHashMap<&str, DocId> = AHashMap::with_capacity(num_docs);
    for (doc_id, filename) in file.filenames.iter().enumerate() {
        if let Some(first) = seen.insert(filename, doc_id as DocId) {
            return Err(BuildError::DuplicateFilename {
                filename: filename.clone(),
                first,
                second: doc_id as DocId,
            })
            .context("Search index lists a filename twice");
        }
    }

    let documents: Vec<Document> = file
        .filenames
        .into_iter()
        .zip(file.titles)
        .map(|(filename, title)| Document { filename, title })
        .collect();

    let mut postings: BTreeMap<String, FieldPostings> = BTreeMap::new();
    for (field, table) in [
        (FieldKind::Body, file.terms),
        (FieldKind::Title, file.titleterms),
        (FieldKind::ObjectName, file.objterms),
    ] {
        for (term, refs) in table {
            let mut docs = refs.into_vec();
            if let Some(&bad) = docs.iter().find(|&&doc| doc as usize >= num_docs) {
                bail!("Term '{}' ({}) refers to unknown document {}", term, field, bad);
            }
            docs.sort_unstable();
            docs.dedup();
            postings.entry(term).or_default().get_mut(field).extend(docs);
        }
    }

    let mut objects: Vec<Vec<Object>> = vec![Vec::new(); num_docs];
    for ObjectEntry(doc_id, type_id, _priority, anchor, name) in file.objects {
        let owned = objects
            .get_mut(doc_id as usize)
            .with_context(|| format!("Object '{}' refers to unknown document {}", name, doc_id))?;
        let domain = file
            .objtypes
            .get(&type_id)
            .with_context(|| format!("Object '{}' has unknown object type {}", name, type_id))?;
        owned.push(Object {
            name,
            domain: domain.clone(),
            anchor,
        });
    }

    if let Some((surface, term)) = file
        .surfaces
        .iter()
        .find(|(_, term)| !postings.contains_key(term.as_str()))
    {
        bail!("Surface '{}' refers to unknown term '{}'", surface, term);
    }

    Ok(Index::from_parts(IndexParts {
        documents,
        postings,
        surfaces: file.surfaces,
        objects,
        env_token: file.envtoken,
    }))
}

pub fn to_json(index: &Index) -> Result<String> {
    serde_json::to_string(&encode(index)).context("Failed to serialize search index")
}

pub fn from_json(json: &str) -> Result<Index> {
    let file: SearchIndexFile =
        serde_json::from_str(json).context("Failed to parse search index JSON")?;
    decode(file)
}

/// Render the index as a `searchindex.js` script.
pub fn to_js(index: &Index) -> Result<String> {
    Ok(format!("{}{})", JS_PREFIX, to_json(index)?))
}

/// Parse a `searchindex.js` script whose argument is strict JSON.
pub fn from_js(script: &str) -> Result<Index> {
    let body = script
        .trim()
        .trim_end_matches(';')
        .strip_prefix(JS_PREFIX)
        .and_then(|rest| rest.strip_suffix(')'))
        .context("Not a searchindex script: expected Search.setIndex(...)")?;
    from_json(body)
}

/// Splits `py:function` into (`py`, `function`); undomained types get an empty prefix.
fn split_domain(domain: &str) -> (&str, &str) {
    domain.split_once(':').unwrap_or(("", domain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{DocumentRecord, IndexBuilder, ObjectRecord};
    use assert2::{check, let_assert};
    use serde_json::Value;

    fn sample() -> Index {
        IndexBuilder::default()
            .build(vec![
                DocumentRecord {
                    filename: "Theory/LinearAlgebra.md".into(),
                    title: "Linear Algebra".into(),
                    body: "vectors and matrices".into(),
                    objects: vec![],
                },
                DocumentRecord {
                    filename: "Notebooks/Ex_Stokes.ipynb".into(),
                    title: "Stokes".into(),
                    body: "stokes solver on a mesh".into(),
                    objects: vec![
                        ObjectRecord {
                            name: "SNES_Stokes".into(),
                            domain: "py:class".into(),
                            anchor: String::new(),
                        },
                        ObjectRecord {
                            name: "solve".into(),
                            domain: "py:method".into(),
                            anchor: "SNES_Stokes.solve".into(),
                        },
                        ObjectRecord {
                            name: "SNES_Stokes_SaddlePt".into(),
                            domain: "py:class".into(),
                            anchor: "-".into(),
                        },
                    ],
                },
            ])
            .unwrap()
    }

    #[test]
    fn test_json_round_trip() {
        let index = sample();
        let decoded = from_json(&to_json(&index).unwrap()).unwrap();
        check!(decoded == index);
    }

    #[test]
    fn test_js_round_trip() {
        let index = sample();
        let script = to_js(&index).unwrap();
        check!(script.starts_with("Search.setIndex({"));
        check!(from_js(&script).unwrap() == index);
        check!(from_js(&format!("{};\n", script)).unwrap() == index);
    }

    #[test]
    fn test_layout_matches_historical_shape() {
        let value: Value = serde_json::from_str(&to_json(&sample()).unwrap()).unwrap();

        check!(value["docnames"] == serde_json::json!(["Theory/LinearAlgebra", "Notebooks/Ex_Stokes"]));
        check!(value["filenames"][1] == "Notebooks/Ex_Stokes.ipynb");
        check!(value["titles"][0] == "Linear Algebra");
        check!(value["envversion"][ENVVERSION_KEY] == u64::from(SCHEMA_VERSION));
        // Single-document postings are bare integers
        check!(value["terms"]["mesh"] == 1);
        check!(value["titleterms"]["stoke"] == 1);
        check!(value["objtypes"]["0"] == "py:class");
        check!(value["objtypes"]["1"] == "py:method");
        check!(value["objnames"]["1"] == serde_json::json!(["py", "method", "method"]));
        check!(value["objects"][1] == serde_json::json!([1, 1, 1, "SNES_Stokes.solve", "solve"]));
    }

    #[test]
    fn test_decodes_mixed_posting_shapes() {
        let token = EnvToken::from_u64(42);
        let json = format!(
            r#"{{
                "docnames": ["a", "b"],
                "envversion": {{"docindex": {SCHEMA_VERSION}, "sphinx": 56}},
                "envtoken": "{token}",
                "filenames": ["a.md", "b.md"],
                "titles": ["A", "B"],
                "terms": {{"0": [1, 0, 1], "mesh": 1}},
                "titleterms": {{"mesh": [0]}}
            }}"#
        );
        let index = from_json(&json).unwrap();

        check!(index.env_token() == token);
        let_assert!(Some(zero) = index.postings("0"));
        check!(zero.body == [0, 1]);
        let_assert!(Some(mesh) = index.postings("mesh"));
        check!(mesh.body == [1]);
        check!(mesh.title == [0]);
        check!(index.object_count() == 0);
    }

    #[test]
    fn test_rejects_unknown_documents() {
        let mut file = encode(&sample());
        file.terms.insert("ghost".into(), DocRefs::One(9));
        let_assert!(Err(e) = decode(file));
        check!(e.to_string().contains("unknown document 9"));

        let mut file = encode(&sample());
        file.objects.push(ObjectEntry(5, 0, 1, String::new(), "Ghost".into()));
        check!(decode(file).is_err());

        let mut file = encode(&sample());
        file.objects.push(ObjectEntry(0, 99, 1, String::new(), "Ghost".into()));
        check!(decode(file).is_err());

        let mut file = encode(&sample());
        file.surfaces.insert("ghosts".into(), "ghost".into());
        check!(decode(file).is_err());
    }

    #[test]
    fn test_rejects_duplicate_filenames() {
        let mut file = encode(&sample());
        file.filenames[1] = file.filenames[0].clone();
        let_assert!(Err(e) = decode(file));
        let_assert!(
            Some(BuildError::DuplicateFilename { first, second, .. }) =
                e.downcast_ref::<BuildError>()
        );
        check!((*first, *second) == (0, 1));
    }

    #[test]
    fn test_rejects_mismatched_docnames() {
        let mut file = encode(&sample());
        file.docnames.pop();
        let_assert!(Err(e) = decode(file));
        check!(e.to_string().contains("docnames"));
    }

    #[test]
    fn test_surfaces_survive_round_trip() {
        let index = sample();
        let file = encode(&index);
        check!(file.surfaces.get("stokes").map(String::as_str) == Some("stoke"));
        let decoded = decode(file).unwrap();
        check!(decoded.terms_with_surface_prefix("stok").next().is_some());
    }

    #[test]
    fn test_rejects_other_schema_versions() {
        let mut file = encode(&sample());
        file.envversion.insert(ENVVERSION_KEY.into(), 999);
        let_assert!(Err(e) = decode(file));
        check!(e.to_string().contains("schema version"));
    }

    #[test]
    fn test_rejects_non_scripts() {
        check!(from_js("var x = 1;").is_err());
    }
}
