//! CLIMATE SIMILARITY
//!
//! Cosine similarity between a query's scaled climate features and a crop's
//! scaled climate features. Both rows come out of the same fitted
//! `ScalingTransform`, so every component is in [0, 1] and the similarity is
//! in [0, 1] as well.

use crate::utils::FeatureRow;

/// Cosine similarity of two feature rows
///
/// A zero-length row has no direction; its similarity to anything is 0.
pub fn cosine_similarity(a: &FeatureRow, b: &FeatureRow) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}
