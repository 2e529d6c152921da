//! Deterministic overall-score computation.
//!
//! The assessment capability reports its own aggregate, but that number is
//! never trusted: the pipeline overwrites it with this function's output so
//! the 0-100 scale is computed the same way for every candidate.

use crate::screening::models::DimensionScore;

/// Computes a candidate's overall score from dimension-level scores.
///
/// Averages only the dimensions that were actually scored, so an evidence
/// gap (`None`) never drags the aggregate down as a silent zero. Returns
/// `None` when no dimension was scorable — an honest "Unknown" beats a
/// misleading number. Maps the 1-5 dimension scale to 0-100, rounded to one
/// decimal place.
pub fn overall_score(dimension_scores: &[DimensionScore]) -> Option<f64> {
    let scored: Vec<f64> = dimension_scores
        .iter()
        .filter_map(|d| d.score.map(f64::from))
        .collect();

    if scored.is_empty() {
        return None;
    }

    let mean = scored.iter().sum::<f64>() / scored.len() as f64;
    Some((mean * 20.0 * 10.0).round() / 10.0)
}
