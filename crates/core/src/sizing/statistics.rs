//! Per-size evidence accumulation
//!
//! Each candidate's purchases are folded into a [`SizeTally`]; tallies merge
//! associatively and commutatively, so candidates can be folded independently
//! and combined afterwards.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::AggregationPolicy;
use crate::domain::{OrderOutcomeEvent, OutcomeClass, ShopperId, SizeCode};

/// Whole days from purchase to the reference time; future purchases count as 0.
pub fn days_since(purchased_at: DateTime<Utc>, as_of: DateTime<Utc>) -> i64 {
    (as_of - purchased_at).num_days().max(0)
}

/// Step-function decay; never below the configured floor.
pub fn recency_weight(days: i64, policy: &AggregationPolicy) -> f64 {
    policy
        .recency_steps
        .iter()
        .find(|step| days <= step.max_days)
        .map(|step| step.weight)
        .unwrap_or(policy.recency_floor)
}

pub fn outcome_sign(outcome: OutcomeClass, policy: &AggregationPolicy) -> f64 {
    match outcome {
        OutcomeClass::Successful => policy.successful_sign,
        OutcomeClass::Returned => policy.returned_sign,
        OutcomeClass::Cancelled => policy.cancelled_sign,
    }
}

/// Rating-derived scale factor. No rating data is neutral, not a penalty.
pub fn quality_multiplier(average_rating: Option<f64>, policy: &AggregationPolicy) -> f64 {
    match average_rating {
        Some(rating) if rating > 0.0 => policy
            .quality_steps
            .iter()
            .find(|step| rating >= step.min_rating)
            .map(|step| step.multiplier)
            .unwrap_or(policy.low_rating_multiplier),
        _ => 1.0,
    }
}

/// Running evidence for one size code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SizeAccumulator {
    pub successful: u32,
    pub returned: u32,
    pub cancelled: u32,
    /// Σ similarity × recency × outcome sign; may be negative while folding
    pub contribution_sum: f64,
    /// Σ similarity over rated events
    pub rating_weight: f64,
    /// Σ similarity × rating over rated events
    pub weighted_rating: f64,
    pub rated_events: u32,
    pub high_rated_events: u32,
    pub contributors: BTreeSet<ShopperId>,
}

impl SizeAccumulator {
    pub fn record(
        &mut self,
        event: &OrderOutcomeEvent,
        similarity: f64,
        recency: f64,
        policy: &AggregationPolicy,
    ) {
        match event.outcome {
            OutcomeClass::Successful => self.successful += 1,
            OutcomeClass::Returned => self.returned += 1,
            OutcomeClass::Cancelled => self.cancelled += 1,
        }

        self.contribution_sum += similarity * recency * outcome_sign(event.outcome, policy);

        if event.outcome != OutcomeClass::Cancelled {
            if let Some(rating) = event.rating {
                self.rating_weight += similarity;
                self.weighted_rating += similarity * rating;
                self.rated_events += 1;
                if rating >= policy.high_rating_threshold {
                    self.high_rated_events += 1;
                }
            }
        }

        self.contributors.insert(event.shopper_id.clone());
    }

    pub fn merge(mut self, other: SizeAccumulator) -> SizeAccumulator {
        self.successful += other.successful;
        self.returned += other.returned;
        self.cancelled += other.cancelled;
        self.contribution_sum += other.contribution_sum;
        self.rating_weight += other.rating_weight;
        self.weighted_rating += other.weighted_rating;
        self.rated_events += other.rated_events;
        self.high_rated_events += other.high_rated_events;
        self.contributors.extend(other.contributors);
        self
    }

    pub fn total_orders(&self) -> u32 {
        self.successful + self.returned + self.cancelled
    }

    /// Similarity-weighted mean rating, `None` without rated events.
    pub fn average_rating(&self) -> Option<f64> {
        (self.rating_weight > 0.0).then(|| self.weighted_rating / self.rating_weight)
    }
}

/// Finalized, read-only view of one size's evidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeStatistics {
    pub size: SizeCode,
    pub successful_count: u32,
    pub returned_count: u32,
    pub cancelled_count: u32,
    pub total_orders: u32,
    pub contributors: usize,
    pub success_rate: f64,
    pub return_rate: f64,
    pub cancel_rate: f64,
    pub average_rating: f64,
    pub raw_score: f64,
    pub quality_multiplier: f64,
    /// `max(0, raw_score) × quality_multiplier`; never negative
    pub weighted_score: f64,
}

impl SizeStatistics {
    pub fn from_accumulator(
        size: SizeCode,
        accumulator: &SizeAccumulator,
        policy: &AggregationPolicy,
    ) -> Self {
        let total_orders = accumulator.total_orders();
        let (success_rate, return_rate, cancel_rate) = if total_orders == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let total = f64::from(total_orders);
            (
                f64::from(accumulator.successful) / total,
                f64::from(accumulator.returned) / total,
                f64::from(accumulator.cancelled) / total,
            )
        };

        let average_rating = accumulator.average_rating();
        let multiplier = quality_multiplier(average_rating, policy);
        let weighted_score = accumulator.contribution_sum.max(0.0) * multiplier;

        Self {
            size,
            successful_count: accumulator.successful,
            returned_count: accumulator.returned,
            cancelled_count: accumulator.cancelled,
            total_orders,
            contributors: accumulator.contributors.len(),
            success_rate,
            return_rate,
            cancel_rate,
            average_rating: average_rating.unwrap_or(0.0),
            raw_score: accumulator.contribution_sum,
            quality_multiplier: multiplier,
            weighted_score,
        }
    }
}

/// Pool-wide figures reported in the recommendation metadata.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EvidenceSummary {
    pub total_similar_users: usize,
    pub total_purchases: usize,
    /// Distinct pool members with at least one event
    pub contributors: usize,
    pub average_rating: f64,
    pub high_rating_ratio: f64,
    pub has_ratings: bool,
}

/// Map from size code to accumulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SizeTally {
    sizes: BTreeMap<SizeCode, SizeAccumulator>,
}

impl SizeTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(
        &mut self,
        event: &OrderOutcomeEvent,
        similarity: f64,
        as_of: DateTime<Utc>,
        policy: &AggregationPolicy,
    ) {
        let recency = recency_weight(days_since(event.purchased_at, as_of), policy);
        self.sizes
            .entry(event.size.clone())
            .or_default()
            .record(event, similarity, recency, policy);
    }

    pub fn merge(mut self, other: SizeTally) -> SizeTally {
        for (size, accumulator) in other.sizes {
            let merged = match self.sizes.remove(&size) {
                Some(existing) => existing.merge(accumulator),
                None => accumulator,
            };
            self.sizes.insert(size, merged);
        }
        self
    }

    pub fn get(&self, size: &SizeCode) -> Option<&SizeAccumulator> {
        self.sizes.get(size)
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Statistics per size, in size-code order.
    pub fn finalize(&self, policy: &AggregationPolicy) -> Vec<SizeStatistics> {
        self.sizes
            .iter()
            .map(|(size, accumulator)| {
                SizeStatistics::from_accumulator(size.clone(), accumulator, policy)
            })
            .collect()
    }

    pub fn summary(&self, total_similar_users: usize) -> EvidenceSummary {
        let mut contributors: BTreeSet<&ShopperId> = BTreeSet::new();
        let mut total_purchases = 0usize;
        let mut rating_weight = 0.0;
        let mut weighted_rating = 0.0;
        let mut rated_events = 0u32;
        let mut high_rated_events = 0u32;

        for accumulator in self.sizes.values() {
            contributors.extend(accumulator.contributors.iter());
            total_purchases += accumulator.total_orders() as usize;
            rating_weight += accumulator.rating_weight;
            weighted_rating += accumulator.weighted_rating;
            rated_events += accumulator.rated_events;
            high_rated_events += accumulator.high_rated_events;
        }

        let has_ratings = rated_events > 0 && rating_weight > 0.0;
        EvidenceSummary {
            total_similar_users,
            total_purchases,
            contributors: contributors.len(),
            average_rating: if has_ratings { weighted_rating / rating_weight } else { 0.0 },
            high_rating_ratio: if rated_events > 0 {
                f64::from(high_rated_events) / f64::from(rated_events)
            } else {
                0.0
            },
            has_ratings,
        }
    }
}
