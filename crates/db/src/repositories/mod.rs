use async_trait::async_trait;
use thiserror::Error;

use fitsize_core::domain::{MeasurementProfile, OrderLine, ProductId, ShopperId};
use fitsize_core::errors::SourceError;

pub mod memory;

pub use memory::{InMemoryOrderRepository, InMemoryProfileRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("duplicate record: {0}")]
    Duplicate(String),
}

impl RepositoryError {
    /// Collaborator-facing form, tagged with the store that failed.
    pub fn into_source_error(self, source_name: &str) -> SourceError {
        match self {
            Self::Decode(message) => {
                SourceError::Decode { source_name: source_name.to_owned(), message }
            }
            other => SourceError::Unavailable {
                source_name: source_name.to_owned(),
                message: other.to_string(),
            },
        }
    }
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_shopper(
        &self,
        shopper_id: &ShopperId,
    ) -> Result<Option<MeasurementProfile>, RepositoryError>;
    async fn save(&self, profile: MeasurementProfile) -> Result<(), RepositoryError>;
    async fn count(&self) -> Result<usize, RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn append(&self, line: OrderLine) -> Result<(), RepositoryError>;
    async fn list_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<OrderLine>, RepositoryError>;
    async fn count(&self) -> Result<usize, RepositoryError>;
}
