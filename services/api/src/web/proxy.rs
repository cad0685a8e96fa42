//! services/api/src/web/proxy.rs
//!
//! The fulfillment gateway: a cached pass-through proxy in front of the
//! platform's REST API. GET responses are cached under `"METHOD:path"`;
//! catalog paths keep their entries longer than dynamic ones.

use crate::web::{port_error_response, state::AppState};
use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use teeforge_core::ports::{PortError, UpstreamResponse};
use tracing::warn;

/// TTL for catalog paths (blueprints, providers, variants).
pub const CATALOG_TTL: Duration = Duration::from_secs(1800);
/// TTL for everything else behind the gateway.
pub const DYNAMIC_TTL: Duration = Duration::from_secs(600);

fn ttl_for(path: &str) -> Duration {
    if path.contains("catalog") {
        CATALOG_TTL
    } else {
        DYNAMIC_TTL
    }
}

fn upstream_into_response(upstream: UpstreamResponse) -> Response {
    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(upstream.body)).into_response()
}

/// `GET/POST/PUT/DELETE /api/printify/{*path}` — forwards to the platform
/// with the configured token attached. Only GETs are cached; writes are
/// forwarded untouched. No retries here.
pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    Path(path): Path<String>,
    body: Option<Json<serde_json::Value>>,
) -> Response {
    let key = format!("{method}:{path}");
    let is_get = method == Method::GET;

    if is_get {
        if let Some(cached) = state.caches.proxy.lock().unwrap().get(&key) {
            return upstream_into_response(cached);
        }
    }

    let result = state
        .fulfillment
        .forward(method.as_str(), &path, body.map(|Json(v)| v))
        .await;

    match result {
        Ok(upstream) => {
            if is_get && (200..300).contains(&upstream.status) {
                state
                    .caches
                    .proxy
                    .lock()
                    .unwrap()
                    .insert(key, upstream.clone(), ttl_for(&path));
            }
            upstream_into_response(upstream)
        }
        Err(PortError::RateLimited { retry_after }) => {
            // Degrade to a stale entry when we still hold one.
            if is_get {
                if let Some(stale) = state.caches.proxy.lock().unwrap().get_stale(&key) {
                    warn!("Upstream rate limit on {key}, serving stale cache entry");
                    return upstream_into_response(stale);
                }
            }
            port_error_response(PortError::RateLimited { retry_after }).into_response()
        }
        Err(err) => port_error_response(err).into_response(),
    }
}

/// `GET /api/cache-stats` — hit/miss/entry counts for every named cache.
pub async fn cache_stats_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let stats: serde_json::Map<String, serde_json::Value> = state
        .caches
        .stats()
        .into_iter()
        .map(|(name, stats)| {
            (
                name.to_string(),
                serde_json::to_value(stats).unwrap_or(json!({})),
            )
        })
        .collect();
    Json(serde_json::Value::Object(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::state::test_support::state_with;
    use axum::extract::State;
    use teeforge_core::testing::{MockAdminConfig, MockFulfillment};

    #[test]
    fn catalog_paths_get_the_long_ttl() {
        assert_eq!(ttl_for("catalog/blueprints.json"), CATALOG_TTL);
        assert_eq!(ttl_for("shops/1/products.json"), DYNAMIC_TTL);
    }

    fn forwards(fulfillment: &MockFulfillment) -> usize {
        fulfillment
            .calls()
            .iter()
            .filter(|c| c.starts_with("forward:"))
            .count()
    }

    #[tokio::test]
    async fn a_second_get_is_served_from_cache() {
        let fulfillment = Arc::new(MockFulfillment::default());
        let state = state_with(fulfillment.clone(), Arc::new(MockAdminConfig::default()));

        for _ in 0..2 {
            let response = proxy_handler(
                State(state.clone()),
                Method::GET,
                Path("shops/1/products.json".to_string()),
                None,
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(forwards(&fulfillment), 1);
    }

    #[tokio::test]
    async fn writes_are_forwarded_every_time() {
        let fulfillment = Arc::new(MockFulfillment::default());
        let state = state_with(fulfillment.clone(), Arc::new(MockAdminConfig::default()));

        for _ in 0..2 {
            proxy_handler(
                State(state.clone()),
                Method::POST,
                Path("shops/1/products.json".to_string()),
                Some(Json(serde_json::json!({ "title": "Tee" }))),
            )
            .await;
        }
        assert_eq!(forwards(&fulfillment), 2);
    }
}
