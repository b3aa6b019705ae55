//! Error types for template generation.

use thiserror::Error;

use vpcgen_plan::PlanError;

/// Result type alias for generation operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur while resolving options or assembling a template.
///
/// Every variant aborts the whole run; no partial graph is ever returned.
#[derive(Error, Debug)]
pub enum IacError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration error: {0}")]
    Plan(#[from] PlanError),

    #[error("Missing resource: {0}")]
    MissingResource(String),

    #[error("Unable to find endpoint services in {region}: {}", .services.join(", "))]
    UnavailableService {
        region: String,
        services: Vec<String>,
    },

    #[error("Invalid route target: {0}")]
    InvalidRouteTarget(String),

    #[error("Data provider error: {0}")]
    Provider(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IacError {
    /// Whether the error stems from malformed or contradictory input.
    pub fn is_configuration(&self) -> bool {
        matches!(self, IacError::Configuration(_) | IacError::Plan(_))
    }
}
