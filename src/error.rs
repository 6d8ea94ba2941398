//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::error::Error as StdError;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Boxed error returned by caller-supplied loaders.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// `Clone` so that one loader outcome can be handed to every caller that
/// joined the same in-flight load.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Key absent or expired, and nothing could load it
    #[error("item has not been found in the cache")]
    NotFound,

    /// The loader returned an error
    #[error("loader failed: {0}")]
    Loader(#[source] Arc<dyn StdError + Send + Sync + 'static>),

    /// The loader panicked
    #[error("loader panicked: {0}")]
    LoaderPanicked(String),

    /// The in-flight load was torn down before it produced a result
    #[error("load abandoned before completion")]
    LoadAbandoned,

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CacheError {
    /// Wraps a loader error, keeping the original reachable.
    pub fn loader(err: BoxError) -> Self {
        CacheError::Loader(Arc::from(err))
    }

    /// Returns true for the not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound)
    }

    /// The original loader error, if this is a loader failure.
    pub fn loader_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            CacheError::Loader(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Loader(_) | CacheError::LoaderPanicked(_) | CacheError::LoadAbandoned => {
                StatusCode::BAD_GATEWAY
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
