use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use fitsize_core::domain::{MeasurementProfile, OrderLine, ProductId, ShopperId};
use fitsize_core::errors::SourceError;
use fitsize_core::sizing::{ClusterBounds, ClusterSource, MeasurementSource, OrderHistorySource};

use super::{OrderRepository, ProfileRepository, RepositoryError};

const PROFILE_SOURCE: &str = "profile_store";
const ORDER_SOURCE: &str = "order_history";

/// Profiles keyed by shopper; iteration order is shopper id order.
#[derive(Default)]
pub struct InMemoryProfileRepository {
    profiles: RwLock<BTreeMap<ShopperId, MeasurementProfile>>,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: impl IntoIterator<Item = MeasurementProfile>) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|profile| (profile.shopper_id().clone(), profile))
            .collect();
        Self { profiles: RwLock::new(profiles) }
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find_by_shopper(
        &self,
        shopper_id: &ShopperId,
    ) -> Result<Option<MeasurementProfile>, RepositoryError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(shopper_id).cloned())
    }

    async fn save(&self, profile: MeasurementProfile) -> Result<(), RepositoryError> {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.shopper_id().clone(), profile);
        Ok(())
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.profiles.read().await.len())
    }
}

#[async_trait]
impl MeasurementSource for InMemoryProfileRepository {
    async fn fetch_profile(
        &self,
        shopper_id: &ShopperId,
    ) -> Result<Option<MeasurementProfile>, SourceError> {
        self.find_by_shopper(shopper_id)
            .await
            .map_err(|error| error.into_source_error(PROFILE_SOURCE))
    }
}

#[async_trait]
impl ClusterSource for InMemoryProfileRepository {
    async fn fetch_candidates(
        &self,
        bounds: &ClusterBounds,
    ) -> Result<Vec<MeasurementProfile>, SourceError> {
        let profiles = self.profiles.read().await;
        let candidates: Vec<MeasurementProfile> =
            profiles.values().filter(|profile| bounds.admits(profile)).cloned().collect();

        tracing::debug!(
            event_name = "db.profiles.cluster_query",
            scanned = profiles.len(),
            matched = candidates.len(),
            "cluster query served from memory"
        );
        Ok(candidates)
    }
}

/// Append-only order history.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    lines: RwLock<Vec<OrderLine>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lines(lines: impl IntoIterator<Item = OrderLine>) -> Self {
        Self { lines: RwLock::new(lines.into_iter().collect()) }
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn append(&self, line: OrderLine) -> Result<(), RepositoryError> {
        self.lines.write().await.push(line);
        Ok(())
    }

    async fn list_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<OrderLine>, RepositoryError> {
        let lines = self.lines.read().await;
        Ok(lines.iter().filter(|line| &line.product_id == product_id).cloned().collect())
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.lines.read().await.len())
    }
}

#[async_trait]
impl OrderHistorySource for InMemoryOrderRepository {
    async fn fetch_order_lines(
        &self,
        product_id: &ProductId,
        shopper_ids: &[ShopperId],
    ) -> Result<Vec<OrderLine>, SourceError> {
        let lines = self
            .list_for_product(product_id)
            .await
            .map_err(|error| error.into_source_error(ORDER_SOURCE))?;
        Ok(lines.into_iter().filter(|line| shopper_ids.contains(&line.shopper_id)).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use fitsize_core::config::ClusteringPolicy;
    use fitsize_core::domain::{BodyMeasurements, Gender, MeasurementProfile, SizeCode};
    use fitsize_core::sizing::ClusterSelector;

    use super::*;

    fn profile(id: &str, gender: Gender, weight: i64) -> MeasurementProfile {
        MeasurementProfile::new(
            ShopperId::new(id),
            gender,
            BodyMeasurements::new(
                Decimal::from(170),
                Decimal::from(weight),
                Decimal::from(92),
                Decimal::from(76),
                Decimal::from(98),
            ),
        )
        .expect("valid profile")
    }

    fn line(shopper: &str, product: &str) -> OrderLine {
        OrderLine {
            shopper_id: ShopperId::new(shopper),
            product_id: ProductId::new(product),
            size: SizeCode::new("M"),
            status: "DELIVERED".to_string(),
            rating: Some(4),
            purchased_at: Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn profile_save_replaces_existing_record() {
        let repo = InMemoryProfileRepository::new();
        repo.save(profile("s-1", Gender::Female, 60)).await.expect("save");
        repo.save(profile("s-1", Gender::Female, 64)).await.expect("save again");

        let found = repo.find_by_shopper(&ShopperId::new("s-1")).await.expect("find");
        assert_eq!(found.map(|p| p.measurements().weight_kg), Some(Decimal::from(64)));
        assert_eq!(ProfileRepository::count(&repo).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn cluster_query_applies_bounds_and_excludes_target() {
        let target = profile("target", Gender::Female, 62);
        let repo = InMemoryProfileRepository::with_profiles([
            target.clone(),
            profile("near", Gender::Female, 63),
            profile("heavier", Gender::Female, 95),
            profile("other-gender", Gender::Male, 62),
        ]);
        let bounds = ClusterSelector::new(ClusteringPolicy::default()).bounds_for(&target);

        let candidates = repo.fetch_candidates(&bounds).await.expect("query");
        let ids: Vec<&str> = candidates.iter().map(|p| p.shopper_id().as_str()).collect();
        assert_eq!(ids, vec!["near"]);
    }

    #[tokio::test]
    async fn order_history_is_scoped_to_product_and_pool() {
        let repo = InMemoryOrderRepository::with_lines([
            line("a", "tee"),
            line("b", "tee"),
            line("a", "jeans"),
        ]);

        let lines = repo
            .fetch_order_lines(&ProductId::new("tee"), &[ShopperId::new("a")])
            .await
            .expect("fetch");
        assert_eq!(lines, vec![line("a", "tee")]);
        assert_eq!(OrderRepository::count(&repo).await.expect("count"), 3);
    }
    #[tokio::test]
    async fn appended_lines_are_visible_to_order_history_queries() {
        let repo = InMemoryOrderRepository::new();
        repo.append(line("a", "tee")).await.expect("append");
        repo.append(line("b", "jeans")).await.expect("append");

        let tees = repo.list_for_product(&ProductId::new("tee")).await.expect("list");
        assert_eq!(tees, vec![line("a", "tee")]);

        let pool = [ShopperId::new("a"), ShopperId::new("b")];
        let history =
            repo.fetch_order_lines(&ProductId::new("jeans"), &pool).await.expect("fetch");
        assert_eq!(history, vec![line("b", "jeans")]);
        assert_eq!(OrderRepository::count(&repo).await.expect("count"), 2);
    }
}
