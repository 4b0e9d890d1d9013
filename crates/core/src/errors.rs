use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("order status `{status}` has no outcome class")]
    UnclassifiableOutcome { status: String },
    #[error("measurement `{field}` must be strictly positive, got `{value}`")]
    InvalidMeasurement { field: &'static str, value: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failure reported by an external collaborator (profile store, cluster query,
/// order history). Carried through the engine untouched.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("{source_name} unavailable: {message}")]
    Unavailable { source_name: String, message: String },
    #[error("{source_name} returned undecodable data: {message}")]
    Decode { source_name: String, message: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Upstream(#[from] SourceError),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("sizing worker did not complete: {0}")]
    Worker(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The measurement profile could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "Size recommendations are temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }

    /// Stable machine-readable class used in operator output.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::UnclassifiableOutcome { .. }) => "unclassifiable_outcome",
            Self::Domain(DomainError::InvalidMeasurement { .. }) => "invalid_measurement",
            Self::Domain(DomainError::InvariantViolation(_)) => "invariant_violation",
            Self::Upstream(_) => "upstream_fetch",
            Self::Configuration(_) => "config_validation",
            Self::Worker(_) => "worker_failed",
        }
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::InvalidMeasurement { .. }) => Self::BadRequest {
                message: "measurement validation failed".to_owned(),
                correlation_id,
            },
            // An unmapped status means the engine and the order vocabulary drifted apart.
            ApplicationError::Domain(error @ DomainError::UnclassifiableOutcome { .. })
            | ApplicationError::Domain(error @ DomainError::InvariantViolation(_)) => {
                Self::Internal { message: error.to_string(), correlation_id }
            }
            ApplicationError::Upstream(error) => {
                Self::ServiceUnavailable { message: error.to_string(), correlation_id }
            }
            ApplicationError::Configuration(message) | ApplicationError::Worker(message) => {
                Self::Internal { message, correlation_id }
            }
        }
    }
}
