//! Cosine similarity scoring and the ranking rule shared by all backends.

use std::cmp::Ordering;

use crate::error::{Result, VectorError};

/// Compute cosine similarity between two vectors.
///
/// Accumulates in `f64` and clamps the result into `[-1, 1]`.
/// Returns 0.0 if either vector has zero magnitude.
///
/// # Errors
///
/// Returns [`VectorError::DimensionMismatch`] if the vectors differ in length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(VectorError::DimensionMismatch { expected: a.len(), actual: b.len() });
    }

    let (dot, norm_a, norm_b) =
        a.iter().zip(b.iter()).fold((0.0f64, 0.0f64, 0.0f64), |(dot, na, nb), (x, y)| {
            let (x, y) = (f64::from(*x), f64::from(*y));
            (dot + x * y, na + x * x, nb + y * y)
        });

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32)
}

/// Sort `items` by descending score.
///
/// The sort is stable: items with equal scores keep their relative order,
/// which for search results is the store's scan order.
pub fn rank_by_score<T>(items: &mut [T], score: impl Fn(&T) -> f32) {
    items.sort_by(|a, b| score(b).partial_cmp(&score(a)).unwrap_or(Ordering::Equal));
}
