pub mod config;
pub mod domain;
pub mod errors;
pub mod sizing;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, SizingConfig};
pub use domain::{
    MeasurementProfile, OrderLine, OrderOutcomeEvent, OrderStatus, OutcomeClass, ProductId,
    ShopperId, SizeCode,
};
pub use errors::{ApplicationError, DomainError, InterfaceError, SourceError};
pub use sizing::{
    RecommendationRequest, RecommendationResult, SizeAnalysis, SizeRecommendationEngine,
    SizingPipeline,
};
