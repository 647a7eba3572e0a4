//! Distance metrics and the shared ranking routine.
//!
//! Every store ranks through [`rank`], so the ordering contract is the same
//! regardless of backend: ascending distance, then earlier `created_at`,
//! then insertion order.

use crate::model::{Document, MetadataFilter, ScoredDocument};
use serde::{Deserialize, Serialize};

/// Distance metric used to compare vectors.
///
/// Smaller is more similar for both metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Straight-line (L2) distance.
    #[default]
    Euclidean,
    /// `1 - cosine_similarity`, in `[0, 2]`.
    Cosine,
}

impl DistanceMetric {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Cosine => "cosine",
        }
    }

    /// Distance between two vectors of equal length.
    ///
    /// Callers check lengths first; extra trailing components are ignored.
    #[must_use]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Euclidean => euclidean_distance(a, b),
            Self::Cosine => cosine_distance(a, b),
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "euclidean" | "l2" => Ok(Self::Euclidean),
            "cosine" => Ok(Self::Cosine),
            _ => Err(format!("Unknown metric: {s}. Valid options: euclidean, cosine")),
        }
    }
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut dot_product = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (x, y) in a.iter().zip(b.iter()) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let magnitude = (norm_a * norm_b).sqrt();
    // A zero vector is orthogonal to everything.
    let similarity = if magnitude == 0.0 {
        0.0
    } else {
        dot_product / magnitude
    };

    (1.0 - similarity).clamp(0.0, 2.0)
}

/// Rank candidates against a query vector.
///
/// `candidates` must be yielded in insertion order; the sort is stable, so
/// that order breaks ties left after distance and `created_at`. Candidates
/// failing `filter` are dropped before any distance is computed.
pub fn rank<I>(
    query: &[f32],
    candidates: I,
    metric: DistanceMetric,
    k: usize,
    filter: Option<&MetadataFilter>,
) -> Vec<ScoredDocument>
where
    I: IntoIterator<Item = Document>,
{
    let mut scored: Vec<ScoredDocument> = candidates
        .into_iter()
        .filter(|doc| filter.is_none_or(|f| f.matches(&doc.metadata)))
        .map(|document| {
            let distance = metric.distance(query, &document.vector);
            ScoredDocument { document, distance }
        })
        .collect();

    scored.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.document.created_at.cmp(&b.document.created_at))
    });
    scored.truncate(k);
    scored
}
