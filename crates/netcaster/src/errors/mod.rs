//! Error handling for netcaster
//!
//! Errors are layered: repositories raise [`RepositoryError`], the control-plane
//! client raises [`ControlPlaneError`], and services surface [`AppError`].
//! The broadcast supervisor never lets a [`ControlPlaneError`] escape; it maps
//! them to outcome values instead (see `services::broadcast`).

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Repository Results
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Convenience type alias for control-plane Results
pub type ControlPlaneResult<T> = Result<T, ControlPlaneError>;

/// Convenience type alias for Web Results
pub type WebResult<T> = Result<T, WebError>;
