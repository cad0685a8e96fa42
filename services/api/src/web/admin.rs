//! services/api/src/web/admin.rs
//!
//! The operator configuration surface. Reads return the public config;
//! writes require the configured plaintext password and merge a partial
//! update through the config service's load/save contract.

use crate::web::{port_error_response, state::AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use teeforge_core::domain::AdminConfigPatch;
use tracing::{info, warn};
use utoipa::ToSchema;

/// Read the current admin configuration.
///
/// The password never lives in this record; there is nothing to redact.
#[utoipa::path(
    get,
    path = "/api/admin/config",
    responses((status = 200, description = "The public admin configuration"))
)]
pub async fn get_config_handler(State(state): State<Arc<AppState>>) -> Response {
    Json(state.admin.get().await).into_response()
}

#[derive(Deserialize, ToSchema)]
pub struct AdminUpdateRequest {
    pub password: String,
    #[serde(flatten)]
    pub patch: AdminConfigPatch,
}

/// Apply a partial admin-config update (password-gated).
#[utoipa::path(
    post,
    path = "/api/admin/config",
    responses(
        (status = 200, description = "Updated configuration"),
        (status = 401, description = "Password mismatch; configuration untouched"),
    )
)]
pub async fn update_config_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminUpdateRequest>,
) -> Response {
    if req.password != state.config.admin_password {
        warn!("Admin config update rejected: password mismatch");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "invalid admin password" })),
        )
            .into_response();
    }

    match state.admin.update(req.patch).await {
        Ok(updated) => {
            info!("Admin config updated");
            Json(updated).into_response()
        }
        Err(err) => port_error_response(err).into_response(),
    }
}
