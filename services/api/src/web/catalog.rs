//! services/api/src/web/catalog.rs
//!
//! Fuzzy, relevance-ranked search over the cached fulfillment catalog
//! (blueprints and print providers), plus the normalized variant list for
//! a blueprint/provider pair.

use crate::web::{port_error_response, state::AppState};
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use teeforge_core::domain::{Blueprint, PrintProvider, Variant};
use teeforge_core::ports::{PortError, PortResult};
use teeforge_core::search;
use tracing::warn;

/// Catalog cache entries expire after an hour.
pub const CATALOG_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

/// Fetch-through helper: serve the cached list, fall back to a stale entry
/// on an upstream rate limit, otherwise surface the error.
pub(crate) async fn cached_list<T, F>(
    cache: &std::sync::Mutex<teeforge_core::cache::TtlCache<T>>,
    key: &str,
    ttl: Duration,
    fetch: F,
) -> PortResult<T>
where
    T: Clone,
    F: std::future::Future<Output = PortResult<T>>,
{
    if let Some(list) = cache.lock().unwrap().get(key) {
        return Ok(list);
    }
    match fetch.await {
        Ok(list) => {
            cache.lock().unwrap().insert(key, list.clone(), ttl);
            Ok(list)
        }
        Err(PortError::RateLimited { retry_after }) => {
            match cache.lock().unwrap().get_stale(key) {
                Some(list) => {
                    warn!("Rate limited fetching {key}, serving stale entry");
                    Ok(list)
                }
                None => Err(PortError::RateLimited { retry_after }),
            }
        }
        Err(err) => Err(err),
    }
}

async fn blueprints(state: &AppState) -> PortResult<Vec<Blueprint>> {
    cached_list(
        &state.caches.blueprints,
        "all",
        CATALOG_CACHE_TTL,
        state.fulfillment.list_blueprints(),
    )
    .await
}

async fn providers(state: &AppState, blueprint_id: u32) -> PortResult<Vec<PrintProvider>> {
    cached_list(
        &state.caches.providers,
        &format!("bp:{blueprint_id}"),
        CATALOG_CACHE_TTL,
        state.fulfillment.list_print_providers(blueprint_id),
    )
    .await
}

async fn variants(
    state: &AppState,
    blueprint_id: u32,
    provider_id: u32,
) -> PortResult<Vec<Variant>> {
    cached_list(
        &state.caches.variants,
        &format!("{blueprint_id}:{provider_id}"),
        CATALOG_CACHE_TTL,
        state.fulfillment.list_variants(blueprint_id, provider_id),
    )
    .await
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Search blueprints by title, brand, or model.
#[utoipa::path(
    get,
    path = "/api/catalog/blueprints/search",
    params(("query" = String, Query, description = "Free-text search query")),
    responses(
        (status = 200, description = "Ranked blueprint matches, capped to 20"),
        (status = 429, description = "Upstream rate limit with no cached catalog"),
    )
)]
pub async fn search_blueprints_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    match blueprints(&state).await {
        Ok(list) => {
            let results: Vec<Blueprint> = search::search(&list, &params.query, |b| {
                vec![b.title.as_str(), b.brand.as_str(), b.model.as_str()]
            })
            .into_iter()
            .cloned()
            .collect();
            Json(results).into_response()
        }
        Err(err) => port_error_response(err).into_response(),
    }
}

/// Search a blueprint's print providers by title or location.
pub async fn search_providers_handler(
    State(state): State<Arc<AppState>>,
    Path(blueprint_id): Path<u32>,
    Query(params): Query<SearchParams>,
) -> Response {
    match providers(&state, blueprint_id).await {
        Ok(list) => {
            let results: Vec<PrintProvider> =
                search::search(&list, &params.query, |p| {
                    vec![p.title.as_str(), p.location.as_str()]
                })
                .into_iter()
                .cloned()
                .collect();
            Json(results).into_response()
        }
        Err(err) => port_error_response(err).into_response(),
    }
}

/// The normalized variant list for a blueprint/provider pair, priced at
/// the configured retail price.
pub async fn list_variants_handler(
    State(state): State<Arc<AppState>>,
    Path((blueprint_id, provider_id)): Path<(u32, u32)>,
) -> Response {
    match variants(&state, blueprint_id, provider_id).await {
        Ok(list) => {
            let shirt_price = state.admin.get().await.shirt_price;
            let priced: Vec<Variant> = list
                .into_iter()
                .map(|mut v| {
                    v.price = shirt_price;
                    v
                })
                .collect();
            Json(priced).into_response()
        }
        Err(err) => port_error_response(err).into_response(),
    }
}

/// Drops all catalog caches.
pub async fn clear_catalog_cache_handler(
    State(state): State<Arc<AppState>>,
) -> Json<serde_json::Value> {
    state.caches.clear_catalog();
    Json(serde_json::json!({ "cleared": true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use teeforge_core::cache::TtlCache;

    #[tokio::test]
    async fn cached_list_fetches_once_then_serves_the_cache() {
        let cache = Mutex::new(TtlCache::new());
        let first = cached_list(&cache, "k", CATALOG_CACHE_TTL, async { Ok(vec![1, 2, 3]) })
            .await
            .unwrap();
        assert_eq!(first, vec![1, 2, 3]);

        // A second call never polls its fetch future.
        let second = cached_list(&cache, "k", CATALOG_CACHE_TTL, async {
            panic!("fetched despite a live cache entry")
        })
        .await
        .unwrap();
        assert_eq!(second, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn rate_limited_fetch_degrades_to_the_stale_entry() {
        let cache = Mutex::new(TtlCache::new());
        // An entry that is already expired, but not yet purged.
        cache
            .lock()
            .unwrap()
            .insert("k", vec![9], Duration::ZERO);

        let served = cached_list(&cache, "k", CATALOG_CACHE_TTL, async {
            Err(PortError::RateLimited { retry_after: Some(30) })
        })
        .await
        .unwrap();
        assert_eq!(served, vec![9]);
    }

    #[tokio::test]
    async fn rate_limit_with_no_cache_surfaces_the_hint() {
        let cache: Mutex<TtlCache<Vec<u8>>> = Mutex::new(TtlCache::new());
        let err = cached_list(&cache, "k", CATALOG_CACHE_TTL, async {
            Err(PortError::RateLimited { retry_after: Some(30) })
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            PortError::RateLimited { retry_after: Some(30) }
        ));
    }
}
