//! Projection of ranked results onto documents and object anchors for display.

use crate::search::{DocId, Index, ScoredResult};
use serde::Serialize;
use std::fmt::Write as _;

/// Anchor value marking an object without an in-page target.
pub const NO_ANCHOR: &str = "-";

/// A matched object ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedObject {
    pub name: String,
    pub domain: String,
    /// Fragment identifier without the leading `#`, if the object has one.
    pub anchor: Option<String>,
}

impl FormattedObject {
    /// Link to the object within `filename`.
    pub fn href(&self, filename: &str) -> String {
        match &self.anchor {
            Some(anchor) => format!("{}#{}", filename, anchor),
            None => filename.to_string(),
        }
    }
}

/// A ranked document ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedResult {
    pub doc_id: DocId,
    pub filename: String,
    pub docname: String,
    pub title: String,
    pub score: f32,
    pub objects: Vec<FormattedObject>,
}

impl FormattedResult {
    pub fn href(&self) -> String {
        self.filename.clone()
    }

    /// Links to every matched object of this document.
    pub fn object_hrefs(&self) -> Vec<String> {
        self.objects.iter().map(|o| o.href(&self.filename)).collect()
    }
}

/// Resolves the stored anchor of an object.
///
/// An empty anchor stands for the object name itself and `-` for no anchor.
pub fn resolve_anchor(name: &str, anchor: &str) -> Option<String> {
    match anchor.strip_prefix('#').unwrap_or(anchor) {
        "" => Some(name.to_string()),
        NO_ANCHOR => None,
        anchor => Some(anchor.to_string()),
    }
}

/// Map ranked results back to filenames, titles and object anchors.
///
/// Results whose document or objects are not part of `index` are skipped.
pub fn format_results(index: &Index, results: &[ScoredResult]) -> Vec<FormattedResult> {
    results
        .iter()
        .filter_map(|result| {
            let document = index.document(result.doc_id)?;
            let objects = result
                .matched_objects
                .iter()
                .filter_map(|&id| index.object(id))
                .map(|object| FormattedObject {
                    name: object.name.clone(),
                    domain: object.domain.clone(),
                    anchor: resolve_anchor(&object.name, &object.anchor),
                })
                .collect();

            Some(FormattedResult {
                doc_id: result.doc_id,
                filename: document.filename.clone(),
                docname: document.docname().to_string(),
                title: document.title.clone(),
                score: result.score,
                objects,
            })
        })
        .collect()
}

/// Plain-text listing with relevance relative to the best hit.
pub fn render_text(results: &[FormattedResult]) -> String {
    if results.is_empty() {
        return "No matching documents.\n".to_string();
    }

    let max_score = results
        .first()
        .map(|r| r.score)
        .filter(|s| *s > 0.0)
        .unwrap_or(1.0);

    let mut output = String::new();
    for (idx, result) in results.iter().enumerate() {
        let relevance = ((result.score / max_score) * 100.0).round() as u8;
        let _ = writeln!(
            output,
            "{}. {} ({}) - relevance: {}%",
            idx + 1,
            result.title,
            result.filename,
            relevance
        );
        for object in &result.objects {
            let _ = writeln!(
                output,
                "   {} [{}] -> {}",
                object.name,
                object.domain,
                object.href(&result.filename)
            );
        }
    }
    output
}
