//! Size Recommendation Engine
//!
//! Recommends a garment size for a shopper by finding shoppers with a similar
//! build, weighting what they bought and kept of the same product, and ranking
//! sizes by that evidence.

mod cluster;
mod engine;
mod outcome;
mod pipeline;
mod ranker;
mod similarity;
mod sources;
mod statistics;
mod types;

pub use cluster::{ClusterBounds, ClusterSelector};
pub use engine::SizeRecommendationEngine;
pub use outcome::OutcomeClassifier;
pub use pipeline::SizingPipeline;
pub use ranker::RecommendationRanker;
pub use similarity::SimilarityCalculator;
pub use sources::{ClusterSource, MeasurementSource, OrderHistorySource};
pub use statistics::{
    days_since, quality_multiplier, recency_weight, EvidenceSummary, SizeAccumulator,
    SizeStatistics, SizeTally,
};
pub use types::*;

use crate::errors::DomainError;

/// Result type for pure sizing operations
pub type SizingResult<T> = Result<T, DomainError>;

/// Candidate pool cap when neither the request nor config sets one
pub const DEFAULT_SIMILAR_USER_LIMIT: usize = 30;
