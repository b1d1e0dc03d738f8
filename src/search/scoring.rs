//! Field weighting and result ranking.
//!
//! Scoring follows a presence model: for every query term a document earns the
//! weight of the highest-weighted field in which that term (or one of its prefix
//! expansions) occurs. Per-term contributions are summed; ties are broken by
//! ascending document id so rankings are reproducible.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::index::{DocId, FieldPostings};
use super::tokenize::FieldKind;

/// Per-field relevance weights. Defaults rank object names above titles above bodies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldWeights {
    pub object_name: f32,
    pub title: f32,
    pub body: f32,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            object_name: 20.0,
            title: 15.0,
            body: 5.0,
        }
    }
}

impl FieldWeights {
    pub const fn get(&self, field: FieldKind) -> f32 {
        match field {
            FieldKind::ObjectName => self.object_name,
            FieldKind::Title => self.title,
            FieldKind::Body => self.body,
        }
    }

    pub const fn set(&mut self, field: FieldKind, weight: f32) {
        match field {
            FieldKind::ObjectName => self.object_name = weight,
            FieldKind::Title => self.title = weight,
            FieldKind::Body => self.body = weight,
        }
    }

    /// Builder-style override of a single field weight.
    #[must_use]
    pub const fn with(mut self, field: FieldKind, weight: f32) -> Self {
        self.set(field, weight);
        self
    }
}

/// How a query term reached an indexed term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The indexed term equals the query term.
    Exact,
    /// The indexed term starts with the query term.
    Prefix,
}

/// Best contribution of a single query term to each document it reaches.
#[derive(Debug, Default)]
pub(crate) struct TermScores {
    best: AHashMap<DocId, f32>,
}

impl TermScores {
    /// Fold one expansion of the query term into the per-document maxima.
    /// Matching several fields, or several expansions, never stacks within one term.
    pub(crate) fn record(
        &mut self,
        postings: &FieldPostings,
        kind: MatchKind,
        weights: &FieldWeights,
        partial_match_factor: f32,
    ) {
        let factor = match kind {
            MatchKind::Exact => 1.0,
            MatchKind::Prefix => partial_match_factor,
        };
        for field in FieldKind::ALL {
            let weight = weights.get(field) * factor;
            for &doc_id in postings.get(field) {
                let best = self.best.entry(doc_id).or_insert(weight);
                *best = best.max(weight);
            }
        }
    }

    /// Add this term's contributions to the running per-document totals.
    pub(crate) fn add_to(self, totals: &mut AHashMap<DocId, f32>) {
        for (doc_id, score) in self.best {
            *totals.entry(doc_id).or_insert(0.0) += score;
        }
    }
}

/// Orders by descending score, then ascending document id.
pub(crate) fn compare_ranked(a: &(DocId, f32), b: &(DocId, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

/// Sorts accumulated scores into a ranking and keeps the best `limit` entries.
pub(crate) fn rank(totals: AHashMap<DocId, f32>, limit: usize) -> Vec<(DocId, f32)> {
    let mut ranked: Vec<(DocId, f32)> = totals.into_iter().collect();
    ranked.sort_unstable_by(compare_ranked);
    ranked.truncate(limit);
    ranked
}
