//! Error type definitions

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors (SeaORM)
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Repository layer errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Transcoding control-plane errors
    #[error("Control plane error: {0}")]
    ControlPlane(#[from] ControlPlaneError),

    /// Web layer errors
    #[error("Web error: {0}")]
    Web(#[from] WebError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Repository layer specific errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database errors from SeaORM
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A persisted value could not be mapped onto its domain type
    #[error("Invalid stored value: {table}.{field} = {value}")]
    InvalidValue {
        table: String,
        field: String,
        value: String,
    },

    /// Record not found
    #[error("Record not found: {table} with {field} = {value}")]
    RecordNotFound {
        table: String,
        field: String,
        value: String,
    },
}

/// Errors talking to the out-of-process transcoding control plane
///
/// The split matters to the supervisor: a transient error never clears the
/// desired broadcast state, a permanent one does.
#[derive(Error, Debug)]
pub enum ControlPlaneError {
    /// Connection refused, DNS failure or timeout
    #[error("Control plane unreachable: {message}")]
    Unreachable { message: String },

    /// A well-formed error response from the control plane
    #[error("Control plane rejected request: HTTP {status} - {message}")]
    Rejected { status: u16, message: String },

    /// A success status with a body we could not interpret
    #[error("Invalid control plane response: {message}")]
    InvalidResponse { message: String },
}

/// Web layer specific errors
#[derive(Error, Debug)]
pub enum WebError {
    /// Invalid request format
    #[error("Invalid request: {field} - {message}")]
    InvalidRequest { field: String, message: String },

    /// JSON parsing errors
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not-found error for a resource
    pub fn not_found<R: Into<String>, I: ToString>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl RepositoryError {
    pub fn invalid_value<T: Into<String>, F: Into<String>, V: Into<String>>(
        table: T,
        field: F,
        value: V,
    ) -> Self {
        Self::InvalidValue {
            table: table.into(),
            field: field.into(),
            value: value.into(),
        }
    }
}

impl ControlPlaneError {
    /// Transient errors are retried on the next tick
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }

    /// The control plane answered 404, e.g. a manifest that is not warmed up yet
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Rejected { status: 404, .. })
    }
}

impl From<reqwest::Error> for ControlPlaneError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse {
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::Rejected {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::Unreachable {
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_plane_error_classification() {
        let unreachable = ControlPlaneError::Unreachable {
            message: "connection refused".into(),
        };
        let invalid = ControlPlaneError::InvalidResponse {
            message: "missing pid".into(),
        };
        let rejected = ControlPlaneError::Rejected {
            status: 422,
            message: "source not playable".into(),
        };
        let missing = ControlPlaneError::Rejected {
            status: 404,
            message: "not found".into(),
        };

        assert!(unreachable.is_transient());
        assert!(invalid.is_transient());
        assert!(!rejected.is_transient());
        assert!(!rejected.is_not_found());
        assert!(missing.is_not_found());
    }

    #[test]
    fn test_app_error_wraps_control_plane_error() {
        let err: AppError = ControlPlaneError::Rejected {
            status: 500,
            message: "boom".into(),
        }
        .into();
        assert!(err.to_string().contains("HTTP 500"));
    }
}
