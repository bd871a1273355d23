use std::cmp::Ordering;

use crate::core::errors::ApiError;

/// Vectors here always come from the embedding backend, so malformed ones are
/// reported as `ApiError::Upstream`.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, ApiError> {
    if query.is_empty() || candidate.is_empty() {
        return Err(ApiError::Upstream("Vectors must not be empty".to_string()));
    }
    if query.len() != candidate.len() {
        return Err(ApiError::Upstream(format!(
            "Vector length mismatch: {} != {}",
            query.len(),
            candidate.len()
        )));
    }

    let dot: f64 = query
        .iter()
        .zip(candidate.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    let denom = l2_norm(query) * l2_norm(candidate);
    if denom <= f64::EPSILON {
        return Ok(0.0);
    }

    Ok((dot / denom).clamp(-1.0, 1.0) as f32)
}

pub fn rank_descending_by_cosine(
    query: &[f32],
    candidates: &[&[f32]],
) -> Result<Vec<(usize, f32)>, ApiError> {
    let mut scores = Vec::with_capacity(candidates.len());
    for (idx, candidate) in candidates.iter().enumerate() {
        let score = cosine_similarity(query, candidate)?;
        scores.push((idx, score));
    }

    // stable sort: equal scores keep insertion order
    scores.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
    Ok(scores)
}

fn l2_norm(vector: &[f32]) -> f64 {
    vector
        .iter()
        .map(|x| (*x as f64).powi(2))
        .sum::<f64>()
        .sqrt()
}
