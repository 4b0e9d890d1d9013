//! Final ranking of per-size statistics into a recommendation

use std::cmp::Ordering;

use super::statistics::{EvidenceSummary, SizeStatistics};
use super::types::*;
use crate::config::RankingPolicy;

/// Absorbs rounding in the share subtraction so a gap of exactly the margin
/// still counts as close.
const MARGIN_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct RecommendationRanker {
    policy: RankingPolicy,
}

impl RecommendationRanker {
    pub fn new() -> Self {
        Self { policy: RankingPolicy::default() }
    }

    pub fn with_policy(policy: RankingPolicy) -> Self {
        Self { policy }
    }

    /// Highest weighted score first; ties go to more raw events, then the
    /// lexicographically smaller size code.
    pub fn compare(a: &SizeStatistics, b: &SizeStatistics) -> Ordering {
        b.weighted_score
            .total_cmp(&a.weighted_score)
            .then_with(|| b.total_orders.cmp(&a.total_orders))
            .then_with(|| a.size.cmp(&b.size))
    }

    pub fn rank(
        &self,
        statistics: &[SizeStatistics],
        summary: &EvidenceSummary,
    ) -> RecommendationResult {
        let total_score: f64 = statistics.iter().map(|stats| stats.weighted_score).sum();
        let confidence_of = |stats: &SizeStatistics| {
            if total_score > 0.0 {
                stats.weighted_score / total_score
            } else {
                0.0
            }
        };

        let mut positive: Vec<&SizeStatistics> =
            statistics.iter().filter(|stats| stats.weighted_score > 0.0).collect();
        positive.sort_by(|a, b| Self::compare(a, b));

        let mut ranked = positive.into_iter();
        let top = ranked.next();
        let alternatives: Vec<AlternativeSize> = ranked
            .map(|stats| AlternativeSize {
                size: stats.size.clone(),
                confidence: confidence_of(stats),
            })
            .collect();

        let confidence = top.map(confidence_of).unwrap_or(0.0);
        let margin = self.policy.close_alternative_margin + MARGIN_TOLERANCE;
        let has_close_alternative =
            alternatives.first().is_some_and(|second| confidence - second.confidence <= margin);

        let metadata = RecommendationMetadata {
            total_similar_users: summary.total_similar_users,
            total_purchases: summary.total_purchases,
            average_rating: summary.average_rating,
            high_rating_ratio: summary.high_rating_ratio,
            confidence_level: ConfidenceLevel::from_confidence(confidence, &self.policy),
            data_quality: self.data_quality(summary),
            has_close_alternative,
        };

        RecommendationResult {
            recommended_size: top.map(|stats| stats.size.clone()),
            confidence,
            alternatives,
            metadata,
            has_measurements: true,
        }
    }

    pub fn data_quality(&self, summary: &EvidenceSummary) -> DataQuality {
        let policy = &self.policy;
        let rating = summary.average_rating;

        if summary.contributors >= policy.excellent_contributors
            && summary.has_ratings
            && rating >= policy.excellent_min_rating
        {
            DataQuality::Excellent
        } else if summary.contributors >= policy.good_contributors
            && (!summary.has_ratings || rating >= policy.good_min_rating)
        {
            DataQuality::Good
        } else if summary.contributors >= policy.fair_contributors {
            DataQuality::Fair
        } else {
            DataQuality::Limited
        }
    }

    /// Human-readable reasoning behind a result
    pub fn explain(&self, result: &RecommendationResult) -> Vec<String> {
        let mut reasons = Vec::new();

        if !result.has_measurements {
            reasons.push(
                "No body measurements on file, so no size can be suggested yet".to_string(),
            );
            return reasons;
        }

        let metadata = &result.metadata;
        match &result.recommended_size {
            Some(size) => reasons.push(format!(
                "Size {size} carries {} among {} similar shoppers",
                metadata.confidence_level.display_percentage(result.confidence),
                metadata.total_similar_users
            )),
            None if metadata.total_similar_users == 0 => {
                reasons.push("No shoppers with a similar build were found".to_string())
            }
            None => reasons.push(
                "Similar shoppers have not kept any size of this product often enough \
                 to recommend one"
                    .to_string(),
            ),
        }

        if metadata.has_close_alternative {
            if let Some(second) = result.alternatives.first() {
                reasons.push(format!(
                    "Size {} is a close second ({:.0}%)",
                    second.size,
                    second.confidence * 100.0
                ));
            }
        }

        if metadata.average_rating > 0.0 {
            reasons.push(format!(
                "Similar shoppers rated their purchases {:.1}/5 on average \
                 ({:.0}% rated 4 or higher)",
                metadata.average_rating,
                metadata.high_rating_ratio * 100.0
            ));
        }

        reasons.push(format!(
            "{} ({} purchases considered)",
            metadata.data_quality.description(),
            metadata.total_purchases
        ));

        reasons
    }
}

impl Default for RecommendationRanker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SizeCode;

    fn stats(size: &str, weighted_score: f64, total_orders: u32) -> SizeStatistics {
        SizeStatistics {
            size: SizeCode::new(size),
            successful_count: total_orders,
            returned_count: 0,
            cancelled_count: 0,
            total_orders,
            contributors: total_orders as usize,
            success_rate: if total_orders > 0 { 1.0 } else { 0.0 },
            return_rate: 0.0,
            cancel_rate: 0.0,
            average_rating: 0.0,
            raw_score: weighted_score,
            quality_multiplier: 1.0,
            weighted_score,
        }
    }

    fn summary(contributors: usize, average_rating: f64) -> EvidenceSummary {
        EvidenceSummary {
            total_similar_users: contributors,
            total_purchases: contributors,
            contributors,
            average_rating,
            high_rating_ratio: 0.0,
            has_ratings: average_rating > 0.0,
        }
    }

    #[test]
    fn top_size_confidence_is_its_share_of_total_score() {
        let ranker = RecommendationRanker::new();
        let result = ranker
            .rank(&[stats("M", 6.0, 6), stats("L", 2.0, 2), stats("S", 0.0, 3)], &summary(8, 4.2));

        assert_eq!(result.recommended_size, Some(SizeCode::new("M")));
        assert!((result.confidence - 0.75).abs() < 1e-12);
        assert_eq!(result.metadata.confidence_level, ConfidenceLevel::High);
        assert_eq!(result.alternatives.len(), 1, "zero-score sizes are not alternatives");
        assert_eq!(result.alternatives[0].size, SizeCode::new("L"));
        assert!(!result.metadata.has_close_alternative);

        let total: f64 =
            result.confidence + result.alternatives.iter().map(|alt| alt.confidence).sum::<f64>();
        assert!(total <= 1.0 + 1e-9);
    }

    #[test]
    fn exact_tie_resolves_to_smaller_size_code() {
        let ranker = RecommendationRanker::new();
        for _ in 0..5 {
            let result = ranker.rank(&[stats("M", 2.4, 3), stats("L", 2.4, 3)], &summary(6, 0.0));
            assert_eq!(result.recommended_size, Some(SizeCode::new("L")));
            assert!(result.metadata.has_close_alternative);
            assert_eq!(result.metadata.confidence_level, ConfidenceLevel::Medium);
        }
    }

    #[test]
    fn second_size_exactly_at_the_margin_is_close() {
        let ranker = RecommendationRanker::new();
        let result = ranker
            .rank(&[stats("M", 4.5, 5), stats("L", 3.0, 3), stats("S", 2.5, 3)], &summary(11, 4.0));

        assert!((result.confidence - 0.45).abs() < 1e-12);
        assert!((result.alternatives[0].confidence - 0.30).abs() < 1e-12);
        assert!(result.metadata.has_close_alternative);

        let wider = ranker
            .rank(&[stats("M", 4.6, 5), stats("L", 2.9, 3), stats("S", 2.5, 3)], &summary(11, 4.0));
        assert!(!wider.metadata.has_close_alternative);
    }

    #[test]
    fn tie_on_score_prefers_more_raw_events() {
        let ranker = RecommendationRanker::new();
        let result = ranker.rank(&[stats("L", 2.4, 2), stats("M", 2.4, 5)], &summary(6, 0.0));
        assert_eq!(result.recommended_size, Some(SizeCode::new("M")));
    }

    #[test]
    fn no_signal_yields_null_size_and_zero_confidence() {
        let ranker = RecommendationRanker::new();

        let empty = ranker.rank(&[], &EvidenceSummary::default());
        assert_eq!(empty.recommended_size, None);
        assert_eq!(empty.confidence, 0.0);
        assert_eq!(empty.metadata.data_quality, DataQuality::Limited);
        assert!(empty.has_measurements);

        let all_zero = ranker.rank(&[stats("L", 0.0, 4)], &summary(4, 0.0));
        assert_eq!(all_zero.recommended_size, None);
        assert!(all_zero.alternatives.is_empty());
    }

    #[test]
    fn confidence_tiers() {
        let policy = RankingPolicy::default();
        assert_eq!(ConfidenceLevel::from_confidence(0.70, &policy), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_confidence(0.69, &policy), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_confidence(0.50, &policy), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_confidence(0.49, &policy), ConfidenceLevel::Low);
    }

    #[test]
    fn data_quality_tiers() {
        let ranker = RecommendationRanker::new();
        assert_eq!(ranker.data_quality(&summary(25, 4.3)), DataQuality::Excellent);
        assert_eq!(ranker.data_quality(&summary(25, 3.8)), DataQuality::Good);
        assert_eq!(ranker.data_quality(&summary(12, 0.0)), DataQuality::Good);
        assert_eq!(ranker.data_quality(&summary(12, 2.5)), DataQuality::Fair);
        assert_eq!(ranker.data_quality(&summary(7, 4.9)), DataQuality::Fair);
        assert_eq!(ranker.data_quality(&summary(4, 5.0)), DataQuality::Limited);
    }

    #[test]
    fn explanation_mentions_size_and_close_second() {
        let ranker = RecommendationRanker::new();
        let result = ranker.rank(&[stats("M", 2.4, 3), stats("L", 2.0, 3)], &summary(6, 4.4));
        let reasons = ranker.explain(&result);

        assert!(reasons[0].starts_with("Size M"));
        assert!(reasons.iter().any(|reason| reason.contains("close second")));

        let missing = ranker.explain(&RecommendationResult::without_measurements());
        assert_eq!(missing.len(), 1);
    }
}
