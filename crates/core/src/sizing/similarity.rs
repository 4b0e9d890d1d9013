//! Pairwise shopper similarity over body measurements and shape attributes

use super::types::CandidateMatch;
use crate::config::SimilarityWeights;
use crate::domain::MeasurementProfile;

/// Similarity calculator for candidate shoppers
#[derive(Debug, Clone)]
pub struct SimilarityCalculator {
    weights: SimilarityWeights,
}

impl SimilarityCalculator {
    /// Create a calculator with default weights
    pub fn new() -> Self {
        Self { weights: SimilarityWeights::default() }
    }

    /// Create with custom weights
    pub fn with_weights(weights: SimilarityWeights) -> Self {
        Self { weights }
    }

    /// Weighted Euclidean distance over chest, waist, hips, height and weight
    pub fn distance(&self, target: &MeasurementProfile, candidate: &MeasurementProfile) -> f64 {
        let a = target.vector();
        let b = candidate.vector();
        let w = &self.weights;

        let terms = [
            (a.chest - b.chest) * w.chest,
            (a.waist - b.waist) * w.waist,
            (a.hips - b.hips) * w.hips,
            (a.height - b.height) * w.height,
            (a.weight - b.weight) * w.weight,
        ];

        terms.iter().map(|term| term * term).sum::<f64>().sqrt()
    }

    /// Additive bonus from shared categorical attributes; missing attributes add nothing
    pub fn categorical_bonus(
        &self,
        target: &MeasurementProfile,
        candidate: &MeasurementProfile,
    ) -> f64 {
        let w = &self.weights;
        let mut bonus = 0.0;

        if let (Some(a), Some(b)) = (target.fit_preference(), candidate.fit_preference()) {
            if a == b {
                bonus += w.fit_exact_bonus;
            } else if a.is_adjacent_to(b) {
                bonus += w.fit_adjacent_bonus;
            }
        }

        if matches!((target.belly_shape(), candidate.belly_shape()), (Some(a), Some(b)) if a == b)
        {
            bonus += w.belly_shape_bonus;
        }
        if matches!((target.hip_shape(), candidate.hip_shape()), (Some(a), Some(b)) if a == b) {
            bonus += w.hip_shape_bonus;
        }
        if matches!((target.chest_shape(), candidate.chest_shape()), (Some(a), Some(b)) if a == b)
        {
            bonus += w.chest_shape_bonus;
        }

        bonus
    }

    /// `1 / (1 + distance)`, in (0, 1]
    pub fn base_similarity(distance: f64) -> f64 {
        1.0 / (1.0 + distance)
    }

    /// Final similarity: base uplifted by the bonus and capped at 1.0
    pub fn similarity(&self, target: &MeasurementProfile, candidate: &MeasurementProfile) -> f64 {
        self.score(target, candidate).0
    }

    /// Score a candidate against the target
    pub fn match_candidate(
        &self,
        target: &MeasurementProfile,
        candidate: MeasurementProfile,
    ) -> CandidateMatch {
        let (similarity, distance) = self.score(target, &candidate);
        CandidateMatch { profile: candidate, similarity, distance }
    }

    fn score(&self, target: &MeasurementProfile, candidate: &MeasurementProfile) -> (f64, f64) {
        let distance = self.distance(target, candidate);
        let bonus = self.categorical_bonus(target, candidate);
        let similarity = (Self::base_similarity(distance) * (1.0 + bonus)).min(1.0);
        (similarity, distance)
    }
}

impl Default for SimilarityCalculator {
    fn default() -> Self {
        Self::new()
    }
}
