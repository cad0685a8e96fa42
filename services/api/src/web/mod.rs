//! services/api/src/web/mod.rs
//!
//! Route handlers, shared state, and the OpenAPI master definition.

pub mod admin;
pub mod catalog;
pub mod payments;
pub mod products;
pub mod proxy;
pub mod state;

pub use state::{AppState, Caches};

use axum::http::StatusCode;
use axum::response::Json;
use serde_json::json;
use teeforge_core::ports::PortError;
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        admin::get_config_handler,
        admin::update_config_handler,
        catalog::search_blueprints_handler,
        payments::create_payment_intent_handler,
        products::create_custom_order_handler,
    ),
    components(
        schemas(payments::CreateIntentRequest, products::CustomOrderRequest)
    ),
    tags(
        (name = "teeforge API", description = "Storefront API for AI-designed t-shirts.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error translation
//=========================================================================================

/// Translates a port error into the JSON error response contract: upstream
/// errors pass through with their status, rate limits carry a retry hint,
/// everything else maps onto the taxonomy in the service design.
pub fn port_error_response(err: PortError) -> (StatusCode, Json<serde_json::Value>) {
    match err {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))),
        PortError::Upstream { status, body } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            // Upstream JSON bodies pass through unchanged.
            let body = serde_json::from_str(&body).unwrap_or_else(|_| json!({ "error": body }));
            (status, Json(body))
        }
        PortError::RateLimited { retry_after } => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "rate limited by upstream",
                "retryAfter": retry_after,
            })),
        ),
        PortError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))),
        PortError::Unexpected(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": msg })),
        ),
    }
}
