use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Face embedding vector produced by the external recognition model.
///
/// Serializes as a bare JSON array, which is also the on-disk encoding
/// used by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Compute cosine similarity between two embeddings.
    ///
    /// Returns a value in [-1, 1]. Higher = more similar. Vectors of
    /// different lengths are compared over their common prefix; a
    /// zero-norm input yields 0.0.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { dot / denom } else { 0.0 }
    }
}

/// A registered person: assigned id, display name, and the embedding
/// captured at registration. Never mutated; removed only by a bulk clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub name: String,
    pub embedding: Embedding,
}

/// IN/OUT times recorded for one identity on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayTimes {
    pub in_time: Option<NaiveTime>,
    pub out_time: Option<NaiveTime>,
}

/// One attendance row: at most one exists per (identity_id, date).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub identity_id: i64,
    pub name: String,
    pub date: NaiveDate,
    pub in_time: Option<NaiveTime>,
    pub out_time: Option<NaiveTime>,
}

/// Result of resolving a probe embedding against the gallery.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub matched: bool,
    /// Cosine similarity of the matched entry, or the best similarity
    /// seen when nothing cleared the threshold [-1, 1].
    pub similarity: f32,
    pub identity_id: Option<i64>,
    pub name: Option<String>,
}

impl MatchResult {
    fn unknown(best_similarity: f32) -> Self {
        Self {
            matched: false,
            similarity: best_similarity,
            identity_id: None,
            name: None,
        }
    }
}

/// Strategy for resolving a probe embedding against the registered gallery.
pub trait Matcher {
    fn resolve(&self, probe: &Embedding, gallery: &[Identity], threshold: f32) -> MatchResult;
}

/// Cosine matcher that accepts the FIRST gallery entry whose similarity
/// strictly exceeds the threshold, in storage order.
///
/// A later entry with higher similarity is never considered once an
/// earlier one clears the threshold (see DESIGN.md on first-match vs
/// best-match).
pub struct FirstMatchMatcher;

impl Matcher for FirstMatchMatcher {
    fn resolve(&self, probe: &Embedding, gallery: &[Identity], threshold: f32) -> MatchResult {
        let mut best_sim = 0.0f32;

        for identity in gallery {
            let sim = probe.similarity(&identity.embedding);
            if sim > threshold {
                tracing::debug!(
                    id = identity.id,
                    similarity = sim,
                    "gallery entry cleared threshold"
                );
                return MatchResult {
                    matched: true,
                    similarity: sim,
                    identity_id: Some(identity.id),
                    name: Some(identity.name.clone()),
                };
            }
            if sim > best_sim {
                best_sim = sim;
            }
        }

        MatchResult::unknown(best_sim)
    }
}
