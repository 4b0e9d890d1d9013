//! Size recommendation engine
//!
//! Fetches the target profile, the cluster population and the pool's order
//! history from the collaborators, then hands everything to the pure
//! [`SizingPipeline`]. No state survives between calls.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::pipeline::SizingPipeline;
use super::sources::{ClusterSource, MeasurementSource, OrderHistorySource};
use super::types::*;
use crate::config::SizingConfig;
use crate::domain::ShopperId;
use crate::errors::ApplicationError;

pub struct SizeRecommendationEngine {
    profiles: Arc<dyn MeasurementSource>,
    clusters: Arc<dyn ClusterSource>,
    orders: Arc<dyn OrderHistorySource>,
    pipeline: Arc<SizingPipeline>,
}

impl SizeRecommendationEngine {
    pub fn new(
        config: SizingConfig,
        profiles: Arc<dyn MeasurementSource>,
        clusters: Arc<dyn ClusterSource>,
        orders: Arc<dyn OrderHistorySource>,
    ) -> Result<Self, ApplicationError> {
        let pipeline = SizingPipeline::new(config)
            .map_err(|error| ApplicationError::Configuration(error.to_string()))?;
        Ok(Self { profiles, clusters, orders, pipeline: Arc::new(pipeline) })
    }

    pub fn pipeline(&self) -> &SizingPipeline {
        &self.pipeline
    }

    /// Recommend a size for `request.shopper_id` buying `request.product_id`.
    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResult, ApplicationError> {
        self.analyze(request).await.map(|analysis| analysis.result)
    }

    /// Like [`recommend`](Self::recommend) but keeps the pool and per-size statistics.
    pub async fn analyze(
        &self,
        request: &RecommendationRequest,
    ) -> Result<SizeAnalysis, ApplicationError> {
        let correlation_id = Uuid::new_v4().to_string();
        let as_of = request.as_of.unwrap_or_else(Utc::now);
        let limit = request.effective_limit(&self.pipeline.config().ranking);

        tracing::info!(
            event_name = "sizing.recommend.started",
            correlation_id = %correlation_id,
            shopper_id = %request.shopper_id,
            product_id = %request.product_id,
            similar_user_limit = limit,
            config_version = %self.pipeline.config().version,
            "size recommendation started"
        );

        let outcome = self.run(request, limit, as_of, &correlation_id).await;
        match &outcome {
            Ok(analysis) => tracing::info!(
                event_name = "sizing.recommend.completed",
                correlation_id = %correlation_id,
                has_measurements = analysis.result.has_measurements,
                recommended_size = analysis
                    .result
                    .recommended_size
                    .as_ref()
                    .map(|size| size.as_str())
                    .unwrap_or("none"),
                confidence = analysis.result.confidence,
                similar_users = analysis.result.metadata.total_similar_users,
                "size recommendation completed"
            ),
            Err(error) => tracing::warn!(
                event_name = "sizing.recommend.failed",
                correlation_id = %correlation_id,
                error_class = error.error_class(),
                error = %error,
                "size recommendation failed"
            ),
        }
        outcome
    }

    async fn run(
        &self,
        request: &RecommendationRequest,
        limit: usize,
        as_of: chrono::DateTime<Utc>,
        correlation_id: &str,
    ) -> Result<SizeAnalysis, ApplicationError> {
        let Some(target) = self.profiles.fetch_profile(&request.shopper_id).await? else {
            tracing::info!(
                event_name = "sizing.recommend.no_measurements",
                correlation_id = %correlation_id,
                shopper_id = %request.shopper_id,
                "shopper has no measurement profile"
            );
            return Ok(SizeAnalysis::without_measurements());
        };

        let bounds = self.pipeline.cluster_bounds(&target);
        let population = self.clusters.fetch_candidates(&bounds).await?;
        let pool = self
            .offload(move |pipeline| pipeline.candidate_pool(&target, &bounds, population, limit))
            .await?;

        let order_lines = if pool.is_empty() {
            Vec::new()
        } else {
            let members: Vec<ShopperId> =
                pool.iter().map(|candidate| candidate.shopper_id().clone()).collect();
            self.orders.fetch_order_lines(&request.product_id, &members).await?
        };

        let product_id = request.product_id.clone();
        let analysis = self
            .offload(move |pipeline| pipeline.analyze_pool(&product_id, pool, &order_lines, as_of))
            .await??;
        Ok(analysis)
    }

    /// CPU-bound pipeline stages (rayon) run on tokio's blocking pool.
    async fn offload<T, F>(&self, work: F) -> Result<T, ApplicationError>
    where
        T: Send + 'static,
        F: FnOnce(&SizingPipeline) -> T + Send + 'static,
    {
        let pipeline = Arc::clone(&self.pipeline);
        tokio::task::spawn_blocking(move || work(&pipeline))
            .await
            .map_err(|error| ApplicationError::Worker(error.to_string()))
    }

    /// Reasons behind a result, for operator and shopper-facing display.
    pub fn explain(&self, result: &RecommendationResult) -> Vec<String> {
        self.pipeline.ranker().explain(result)
    }
}
