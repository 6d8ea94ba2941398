//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::Cache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, DeleteResponse, GetResponse, HealthResponse, KeysQuery, KeysResponse,
    PurgeResponse, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// The cache handle is itself cheap to clone and safe to share.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache
    pub cache: Cache<String, String>,
}

impl AppState {
    /// Creates a new AppState around the given cache.
    pub fn new(cache: Cache<String, String>) -> Self {
        Self { cache }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Cache::new(config.default_ttl()))
    }
}

fn checked_key(key: String) -> Result<String> {
    match validate_key(&key) {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(key),
    }
}

/// Handler for PUT /cache/:key
///
/// Stores a value in the cache with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    let key = checked_key(key)?;
    let ttl = req.ttl();
    state.cache.set_with_expire(key.clone(), req.value, ttl);

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /cache/:key
///
/// Retrieves a value from the cache by key. Never runs a loader, so the
/// async worker is never parked on an in-flight load.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let key = checked_key(key)?;
    let value = state.cache.get_if_present(&key)?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /cache/:key
///
/// Deletes a key from the cache. Deleting a missing key is not an error.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let key = checked_key(key)?;
    let removed = state.cache.remove(&key);

    Ok(Json(DeleteResponse::new(key, removed)))
}

/// Handler for GET /cache
///
/// Lists the cached keys.
pub async fn keys_handler(
    State(state): State<AppState>,
    Query(query): Query<KeysQuery>,
) -> Json<KeysResponse> {
    Json(KeysResponse::new(state.cache.keys(query.include_expired)))
}

/// Handler for POST /purge
///
/// Drops every entry.
pub async fn purge_handler(State(state): State<AppState>) -> Json<PurgeResponse> {
    state.cache.purge();
    Json(PurgeResponse::new())
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_state() -> AppState {
        AppState::new(Cache::new(Duration::from_secs(300)))
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = test_state();

        let req = SetRequest {
            value: "test_value".to_string(),
            ttl_ms: None,
        };
        let result = set_handler(State(state.clone()), Path("test_key".to_string()), Json(req)).await;
        assert!(result.is_ok());

        let result = get_handler(State(state.clone()), Path("test_key".to_string())).await;
        let response = result.unwrap();
        assert_eq!(response.value, "test_value");
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state();

        let result = get_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound)));
    }

    #[tokio::test]
    async fn test_get_handler_never_runs_loader() {
        let cache = Cache::new(Duration::from_secs(300)).with_loader(
            |_: &String| -> std::result::Result<String, crate::error::BoxError> {
                panic!("the handler must not load")
            },
        );
        let state = AppState::new(cache);

        let result = get_handler(State(state.clone()), Path("absent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound)));
        assert_eq!(state.cache.stats().loads, 0);
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = test_state();
        state.cache.set("to_delete".to_string(), "value".to_string());

        let response = delete_handler(State(state.clone()), Path("to_delete".to_string()))
            .await
            .unwrap();
        assert!(response.removed);

        let response = delete_handler(State(state.clone()), Path("to_delete".to_string()))
            .await
            .unwrap();
        assert!(!response.removed);
    }

    #[tokio::test]
    async fn test_keys_and_purge_handlers() {
        let state = test_state();
        state.cache.set("a".to_string(), "1".to_string());
        state.cache.set("b".to_string(), "2".to_string());

        let listed = keys_handler(State(state.clone()), Query(KeysQuery::default())).await;
        assert_eq!(listed.count, 2);

        purge_handler(State(state.clone())).await;
        let listed = keys_handler(State(state), Query(KeysQuery::default())).await;
        assert_eq!(listed.count, 0);
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.stats.hits, 0);
        assert_eq!(response.stats.misses, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_set_invalid_key() {
        let state = test_state();

        let req = SetRequest {
            value: "value".to_string(),
            ttl_ms: None,
        };
        let result = set_handler(State(state), Path("x".repeat(300)), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }
}
