//! Contracts consumed from the external profile, cluster and order collaborators

use async_trait::async_trait;

use super::cluster::ClusterBounds;
use crate::domain::{MeasurementProfile, OrderLine, ProductId, ShopperId};
use crate::errors::SourceError;

#[async_trait]
pub trait MeasurementSource: Send + Sync {
    /// `Ok(None)` when the shopper has never recorded measurements.
    async fn fetch_profile(
        &self,
        shopper_id: &ShopperId,
    ) -> Result<Option<MeasurementProfile>, SourceError>;
}

#[async_trait]
pub trait ClusterSource: Send + Sync {
    async fn fetch_candidates(
        &self,
        bounds: &ClusterBounds,
    ) -> Result<Vec<MeasurementProfile>, SourceError>;
}

#[async_trait]
pub trait OrderHistorySource: Send + Sync {
    async fn fetch_order_lines(
        &self,
        product_id: &ProductId,
        shopper_ids: &[ShopperId],
    ) -> Result<Vec<OrderLine>, SourceError>;
}
