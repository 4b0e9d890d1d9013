//! Types for the size recommendation pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::statistics::SizeStatistics;
use crate::config::RankingPolicy;
use crate::domain::{MeasurementProfile, ProductId, ShopperId, SizeCode};

/// Request for a size recommendation
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRequest {
    /// Shopper the recommendation is for
    pub shopper_id: ShopperId,
    /// Product whose size is being chosen
    pub product_id: ProductId,
    /// Cap on the candidate pool after clustering; `None` uses the configured default
    pub similar_user_limit: Option<usize>,
    /// Reference time for recency weighting; `None` means now
    pub as_of: Option<DateTime<Utc>>,
}

impl RecommendationRequest {
    /// Create a new recommendation request
    pub fn new(shopper_id: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            shopper_id: ShopperId::new(shopper_id),
            product_id: ProductId::new(product_id),
            similar_user_limit: None,
            as_of: None,
        }
    }

    /// Set the candidate pool cap
    pub fn with_similar_user_limit(mut self, limit: usize) -> Self {
        self.similar_user_limit = Some(limit);
        self
    }

    /// Pin the reference time used for recency weighting
    pub fn with_as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub(crate) fn effective_limit(&self, policy: &RankingPolicy) -> usize {
        self.similar_user_limit.unwrap_or(policy.default_similar_user_limit).max(1)
    }
}

/// A scored member of the candidate pool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateMatch {
    pub profile: MeasurementProfile,
    /// Capped similarity in [0, 1]
    pub similarity: f64,
    /// Raw weighted Euclidean distance
    pub distance: f64,
}

impl CandidateMatch {
    pub fn shopper_id(&self) -> &ShopperId {
        self.profile.shopper_id()
    }
}

/// Confidence tier of the top recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    /// confidence >= 0.70
    High,
    /// confidence in [0.50, 0.70)
    Medium,
    /// anything lower
    Low,
}

impl ConfidenceLevel {
    pub fn from_confidence(confidence: f64, policy: &RankingPolicy) -> Self {
        if confidence >= policy.high_confidence {
            ConfidenceLevel::High
        } else if confidence >= policy.medium_confidence {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    /// Get display percentage
    pub fn display_percentage(&self, confidence: f64) -> String {
        format!("{:.0}% of matching evidence", confidence * 100.0)
    }
}

/// How much and how reliable the evidence behind a recommendation is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataQuality {
    Limited,
    Fair,
    Good,
    Excellent,
}

impl DataQuality {
    pub fn description(&self) -> &'static str {
        match self {
            DataQuality::Excellent => "Many similar shoppers with strong reviews",
            DataQuality::Good => "A solid group of similar shoppers",
            DataQuality::Fair => "A handful of similar shoppers",
            DataQuality::Limited => "Very little purchase history from similar shoppers",
        }
    }
}

/// A non-top size that still has positive evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeSize {
    pub size: SizeCode,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationMetadata {
    pub total_similar_users: usize,
    pub total_purchases: usize,
    pub average_rating: f64,
    pub high_rating_ratio: f64,
    pub confidence_level: ConfidenceLevel,
    pub data_quality: DataQuality,
    pub has_close_alternative: bool,
}

impl Default for RecommendationMetadata {
    fn default() -> Self {
        Self {
            total_similar_users: 0,
            total_purchases: 0,
            average_rating: 0.0,
            high_rating_ratio: 0.0,
            confidence_level: ConfidenceLevel::Low,
            data_quality: DataQuality::Limited,
            has_close_alternative: false,
        }
    }
}

/// The engine's published answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResult {
    pub recommended_size: Option<SizeCode>,
    pub confidence: f64,
    pub alternatives: Vec<AlternativeSize>,
    pub metadata: RecommendationMetadata,
    pub has_measurements: bool,
}

impl RecommendationResult {
    /// Result for a shopper with no measurement profile. Not an error.
    pub fn without_measurements() -> Self {
        Self {
            recommended_size: None,
            confidence: 0.0,
            alternatives: Vec::new(),
            metadata: RecommendationMetadata::default(),
            has_measurements: false,
        }
    }
}

/// Full pipeline output: the result plus the evidence it was built from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeAnalysis {
    pub result: RecommendationResult,
    pub candidates: Vec<CandidateMatch>,
    pub size_statistics: Vec<SizeStatistics>,
}

impl SizeAnalysis {
    pub(crate) fn without_measurements() -> Self {
        Self {
            result: RecommendationResult::without_measurements(),
            candidates: Vec::new(),
            size_statistics: Vec::new(),
        }
    }
}
