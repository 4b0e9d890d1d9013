//! Synchronous, I/O-free evaluation of one recommendation

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use super::cluster::{ClusterBounds, ClusterSelector};
use super::outcome::OutcomeClassifier;
use super::ranker::RecommendationRanker;
use super::similarity::SimilarityCalculator;
use super::statistics::SizeTally;
use super::types::*;
use super::SizingResult;
use crate::config::{ConfigError, SizingConfig};
use crate::domain::{MeasurementProfile, OrderLine, OrderOutcomeEvent, ProductId, ShopperId};

#[derive(Debug, Clone)]
pub struct SizingPipeline {
    config: SizingConfig,
    cluster: ClusterSelector,
    similarity: SimilarityCalculator,
    classifier: OutcomeClassifier,
    ranker: RecommendationRanker,
}

impl SizingPipeline {
    /// Validates `config` first; clustering and ranking assume well-ordered bounds.
    pub fn new(config: SizingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::assemble(config))
    }

    fn assemble(config: SizingConfig) -> Self {
        Self {
            cluster: ClusterSelector::new(config.clustering.clone()),
            similarity: SimilarityCalculator::with_weights(config.similarity),
            classifier: OutcomeClassifier::new(),
            ranker: RecommendationRanker::with_policy(config.ranking),
            config,
        }
    }

    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    pub fn ranker(&self) -> &RecommendationRanker {
        &self.ranker
    }

    pub fn cluster_bounds(&self, target: &MeasurementProfile) -> ClusterBounds {
        self.cluster.bounds_for(target)
    }

    /// Cluster, score and cap the pool. Most similar first; ties by shopper id.
    pub fn candidate_pool(
        &self,
        target: &MeasurementProfile,
        bounds: &ClusterBounds,
        population: Vec<MeasurementProfile>,
        limit: usize,
    ) -> Vec<CandidateMatch> {
        let clustered = self.cluster.select(bounds, population);

        let mut pool: Vec<CandidateMatch> = clustered
            .into_par_iter()
            .map(|candidate| self.similarity.match_candidate(target, candidate))
            .collect();

        pool.sort_by(|a, b| {
            b.similarity.total_cmp(&a.similarity).then_with(|| a.shopper_id().cmp(b.shopper_id()))
        });
        // A collaborator may hand back the same shopper twice.
        let mut seen = HashSet::new();
        pool.retain(|candidate| seen.insert(candidate.shopper_id().clone()));
        pool.truncate(limit.max(1));
        pool
    }

    /// Classify, fold and rank order history for an already-built pool.
    pub fn analyze_pool(
        &self,
        product_id: &ProductId,
        pool: Vec<CandidateMatch>,
        order_lines: &[OrderLine],
        as_of: DateTime<Utc>,
    ) -> SizingResult<SizeAnalysis> {
        let members: HashSet<&ShopperId> = pool.iter().map(CandidateMatch::shopper_id).collect();
        let relevant = order_lines
            .iter()
            .filter(|line| &line.product_id == product_id && members.contains(&line.shopper_id));
        let events = self.classifier.classify_all(relevant)?;

        let mut by_shopper: HashMap<&ShopperId, Vec<&OrderOutcomeEvent>> = HashMap::new();
        for event in &events {
            by_shopper.entry(&event.shopper_id).or_default().push(event);
        }

        let policy = &self.config.aggregation;
        // Parallel per-candidate fold, then an in-order merge so float sums are reproducible.
        let partials: Vec<SizeTally> = pool
            .par_iter()
            .map(|candidate| {
                let mut tally = SizeTally::new();
                if let Some(history) = by_shopper.get(candidate.shopper_id()) {
                    for event in history {
                        tally.absorb(event, candidate.similarity, as_of, policy);
                    }
                }
                tally
            })
            .collect();
        let tally = partials.into_iter().fold(SizeTally::new(), SizeTally::merge);

        let size_statistics = tally.finalize(policy);
        let summary = tally.summary(pool.len());
        let result = self.ranker.rank(&size_statistics, &summary);

        tracing::debug!(
            event_name = "sizing.pipeline.ranked",
            product_id = %product_id,
            pool = pool.len(),
            events = events.len(),
            sizes = size_statistics.len(),
            recommended_size =
                result.recommended_size.as_ref().map(|size| size.as_str()).unwrap_or("none"),
            confidence = result.confidence,
            "size statistics ranked"
        );

        Ok(SizeAnalysis { result, candidates: pool, size_statistics })
    }

    /// Whole pipeline over in-memory inputs. `target = None` is the
    /// "no measurements" case and yields a degraded result, not an error.
    pub fn evaluate(
        &self,
        target: Option<&MeasurementProfile>,
        product_id: &ProductId,
        population: Vec<MeasurementProfile>,
        order_lines: &[OrderLine],
        similar_user_limit: usize,
        as_of: DateTime<Utc>,
    ) -> SizingResult<SizeAnalysis> {
        let Some(target) = target else {
            return Ok(SizeAnalysis::without_measurements());
        };

        let bounds = self.cluster_bounds(target);
        let pool = self.candidate_pool(target, &bounds, population, similar_user_limit);
        self.analyze_pool(product_id, pool, order_lines, as_of)
    }
}

impl Default for SizingPipeline {
    fn default() -> Self {
        Self::assemble(SizingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use crate::config::Bounds;
    use crate::domain::{BodyMeasurements, Gender, SizeCode};
    use crate::errors::DomainError;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
    }

    fn shopper(id: &str, chest: i64, waist: i64) -> MeasurementProfile {
        MeasurementProfile::new(
            ShopperId::new(id),
            Gender::Female,
            BodyMeasurements::new(
                Decimal::from(165),
                Decimal::from(60),
                Decimal::from(chest),
                Decimal::from(waist),
                Decimal::from(96),
            ),
        )
        .unwrap()
        .with_age(31)
    }

    fn order(
        shopper: &str,
        size: &str,
        status: &str,
        rating: Option<u8>,
        days_ago: i64,
    ) -> OrderLine {
        OrderLine {
            shopper_id: ShopperId::new(shopper),
            product_id: ProductId::new("tee-01"),
            size: SizeCode::new(size),
            status: status.to_string(),
            rating,
            purchased_at: as_of() - Duration::days(days_ago),
        }
    }

    #[test]
    fn pool_is_sorted_by_similarity_and_capped() {
        let pipeline = SizingPipeline::default();
        let target = shopper("target", 88, 70);
        let bounds = pipeline.cluster_bounds(&target);

        let population = vec![
            shopper("far", 100, 84),
            shopper("near", 88, 71),
            shopper("mid", 91, 73),
            shopper("near", 88, 71),
        ];
        let pool = pipeline.candidate_pool(&target, &bounds, population, 2);

        let ids: Vec<&str> = pool.iter().map(|c| c.shopper_id().as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert!(pool[0].similarity > pool[1].similarity);
    }

    #[test]
    fn lines_for_other_products_or_outside_the_pool_are_ignored() {
        let pipeline = SizingPipeline::default();
        let target = shopper("target", 88, 70);

        let mut foreign_product = order("a", "S", "DELIVERED", Some(5), 3);
        foreign_product.product_id = ProductId::new("other");
        let lines = vec![
            order("a", "M", "DELIVERED", Some(5), 3),
            foreign_product,
            // Not a pool member, so its unknown status is never classified.
            order("stranger", "XL", "WHATEVER", None, 3),
        ];

        let analysis = pipeline
            .evaluate(
                Some(&target),
                &ProductId::new("tee-01"),
                vec![shopper("a", 89, 70)],
                &lines,
                30,
                as_of(),
            )
            .unwrap();

        assert_eq!(analysis.result.recommended_size, Some(SizeCode::new("M")));
        assert_eq!(analysis.result.metadata.total_purchases, 1);
        assert_eq!(analysis.size_statistics.len(), 1);
    }

    #[test]
    fn unclassifiable_status_in_the_pool_aborts() {
        let pipeline = SizingPipeline::default();
        let target = shopper("target", 88, 70);
        let lines =
            vec![order("a", "M", "DELIVERED", None, 3), order("a", "M", "MISPLACED", None, 3)];

        let error = pipeline
            .evaluate(
                Some(&target),
                &ProductId::new("tee-01"),
                vec![shopper("a", 89, 70)],
                &lines,
                30,
                as_of(),
            )
            .expect_err("unmapped status must abort");

        assert_eq!(error, DomainError::UnclassifiableOutcome { status: "MISPLACED".to_string() });
    }

    #[test]
    fn inverted_plausibility_bounds_are_rejected_at_construction() {
        let mut config = SizingConfig::default();
        config.clustering.plausible_bmi = Bounds::new(40.0, 15.0);

        let error = SizingPipeline::new(config).expect_err("inverted bounds must not build");
        assert!(matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("plausible_bmi")
        ));
        assert!(SizingPipeline::new(SizingConfig::default()).is_ok());
    }

    #[test]
    fn missing_target_is_a_degraded_result() {
        let pipeline = SizingPipeline::default();
        let analysis = pipeline
            .evaluate(None, &ProductId::new("tee-01"), vec![shopper("a", 89, 70)], &[], 30, as_of())
            .unwrap();

        assert!(!analysis.result.has_measurements);
        assert_eq!(analysis.result.recommended_size, None);
        assert!(analysis.candidates.is_empty());
    }
}
