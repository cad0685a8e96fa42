//! services/api/src/web/products.rs
//!
//! Product endpoints: curated/all published products for the shop, custom
//! product + order creation, admin test products, deletion, the batched
//! multi-shirt order, and upload metadata lookup.

use crate::web::catalog::cached_list;
use crate::web::{port_error_response, state::AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use teeforge_core::creation::CreationSettings;
use teeforge_core::domain::{
    Address, CreatedProduct, Design, ImageShape, LineItem, OrderConfirmation, OrderRequest,
    Product,
};
use teeforge_core::ports::PortResult;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

/// Published shop products are dynamic data; short TTL.
const PRODUCTS_TTL: Duration = Duration::from_secs(600);

async fn shop_products(state: &AppState) -> PortResult<Vec<Product>> {
    cached_list(
        &state.caches.products,
        "all",
        PRODUCTS_TTL,
        state.fulfillment.list_shop_products(),
    )
    .await
}

/// A storefront-facing product summary.
#[derive(Serialize)]
pub struct ProductSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub images: Vec<String>,
    pub price: i64,
    pub default_variant_id: Option<u32>,
}

fn summarize(product: &Product) -> ProductSummary {
    // Prefer the default enabled variant, then any enabled one.
    let variant = product
        .variants
        .iter()
        .find(|v| v.is_default && v.is_enabled)
        .or_else(|| product.variants.iter().find(|v| v.is_enabled));
    ProductSummary {
        id: product.id.clone(),
        title: product.title.clone(),
        description: product.description.clone(),
        images: product.images.clone(),
        price: variant.map(|v| v.price).unwrap_or(0),
        default_variant_id: variant.map(|v| v.id),
    }
}


//=========================================================================================
// Read endpoints
//=========================================================================================

/// `GET /api/products/top-products` — the admin-curated featured products,
/// resolved against the shop's published products in curation order.
pub async fn top_products_handler(State(state): State<Arc<AppState>>) -> Response {
    let featured = state.admin.get().await.featured_products;
    match shop_products(&state).await {
        Ok(products) => {
            let top: Vec<ProductSummary> = featured
                .iter()
                .filter_map(|id| products.iter().find(|p| &p.id == id))
                .map(summarize)
                .collect();
            Json(top).into_response()
        }
        Err(err) => port_error_response(err).into_response(),
    }
}

/// `GET /api/products/all-products` — all published products for the shop.
pub async fn all_products_handler(State(state): State<Arc<AppState>>) -> Response {
    match shop_products(&state).await {
        Ok(products) => {
            let all: Vec<ProductSummary> = products.iter().map(summarize).collect();
            Json(all).into_response()
        }
        Err(err) => port_error_response(err).into_response(),
    }
}

/// `GET /api/printify/uploads/{image_id}` — metadata/preview URL for an
/// uploaded image.
pub async fn get_upload_handler(
    State(state): State<Arc<AppState>>,
    Path(image_id): Path<String>,
) -> Response {
    match state.fulfillment.get_upload(&image_id).await {
        Ok(upload) => Json(upload).into_response(),
        Err(err) => port_error_response(err).into_response(),
    }
}

//=========================================================================================
// Write endpoints
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CustomOrderRequest {
    pub image_url: String,
    pub title: String,
    #[serde(default)]
    pub prompt: Option<String>,
    /// "square", "portrait", or "landscape"; defaults to square.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub shape: Option<ImageShape>,
    pub variant_id: u32,
    #[schema(value_type = Object)]
    pub address: Address,
}

#[derive(Serialize)]
pub struct CustomOrderResponse {
    pub product: CreatedProduct,
    pub order: OrderConfirmation,
}

fn design_from(image_url: &str, title: &str, prompt: Option<&str>, shape: Option<ImageShape>) -> Design {
    Design::new(
        image_url,
        title,
        prompt.unwrap_or(title),
        shape.unwrap_or_default(),
    )
}

/// Create a product from a finished design and immediately order it.
#[utoipa::path(
    post,
    path = "/api/products/create-custom-order",
    request_body = CustomOrderRequest,
    responses(
        (status = 201, description = "Product created and order submitted"),
        (status = 400, description = "Invalid artwork or order payload"),
    )
)]
pub async fn create_custom_order_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CustomOrderRequest>,
) -> Response {
    let settings = CreationSettings::from_admin(&state.admin.get().await, false);
    let design = design_from(&req.image_url, &req.title, req.prompt.as_deref(), req.shape);

    let product = match state
        .creator()
        .create_product_from_design(&design, req.variant_id, settings)
        .await
    {
        Ok(product) => product,
        Err(err) => {
            error!("Custom order: product creation failed: {err}");
            return port_error_response(err).into_response();
        }
    };

    let order = OrderRequest {
        external_id: Uuid::new_v4().to_string(),
        line_items: vec![LineItem {
            product_id: product.id.clone(),
            variant_id: product.variant_id,
            quantity: 1,
        }],
        shipping_method: 1,
        address_to: req.address,
    };
    match state.fulfillment.submit_order(order).await {
        Ok(order) => {
            info!("Custom order {} placed for product {}", order.id, product.id);
            (StatusCode::CREATED, Json(CustomOrderResponse { product, order })).into_response()
        }
        Err(err) => {
            error!("Custom order: submission failed: {err}");
            port_error_response(err).into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct AdminProductRequest {
    pub image_url: String,
    pub title: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub shape: Option<ImageShape>,
    pub variant_id: u32,
}

/// `POST /api/products/create-admin-product` — templated product only (no
/// order), published so the operator can inspect it in the shop.
pub async fn create_admin_product_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminProductRequest>,
) -> Response {
    let settings = CreationSettings::from_admin(&state.admin.get().await, true);
    let design = design_from(&req.image_url, &req.title, req.prompt.as_deref(), req.shape);

    match state
        .creator()
        .create_product_from_design(&design, req.variant_id, settings)
        .await
    {
        Ok(product) => {
            // A new published product changes the shop listing.
            state.caches.products.lock().unwrap().clear();
            (StatusCode::CREATED, Json(product)).into_response()
        }
        Err(err) => {
            error!("Admin product creation failed: {err}");
            port_error_response(err).into_response()
        }
    }
}

/// `DELETE /api/products/{id}` — delete a product and invalidate the
/// product caches.
pub async fn delete_product_handler(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
) -> Response {
    match state.fulfillment.delete_product(&product_id).await {
        Ok(()) => {
            state.caches.products.lock().unwrap().clear();
            // Gateway entries for this product (and the shop listing) are
            // stale now too.
            let shop = &state.config.printify_shop_id;
            let mut proxy = state.caches.proxy.lock().unwrap();
            proxy.remove(&format!("GET:shops/{shop}/products/{product_id}.json"));
            proxy.remove(&format!("GET:shops/{shop}/products.json"));
            drop(proxy);
            Json(serde_json::json!({ "deleted": product_id })).into_response()
        }
        Err(err) => port_error_response(err).into_response(),
    }
}

#[derive(Deserialize)]
pub struct MultiOrderItem {
    pub image_url: String,
    pub title: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub shape: Option<ImageShape>,
    pub variant_id: u32,
}

#[derive(Deserialize)]
pub struct MultiOrderRequest {
    pub items: Vec<MultiOrderItem>,
    pub address: Address,
}

#[derive(Serialize)]
pub struct MultiOrderResponse {
    pub products: Vec<CreatedProduct>,
    pub order: OrderConfirmation,
}

/// `POST /api/printify/multi-order/multi-order` — batch product creation
/// (sequential, paced) followed by a single order submission.
pub async fn multi_order_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MultiOrderRequest>,
) -> Response {
    let settings = CreationSettings::from_admin(&state.admin.get().await, false);
    let items: Vec<(Design, u32)> = req
        .items
        .iter()
        .map(|item| {
            (
                design_from(&item.image_url, &item.title, item.prompt.as_deref(), item.shape),
                item.variant_id,
            )
        })
        .collect();

    let products = match state.creator().create_many(&items, settings).await {
        Ok(products) => products,
        Err(err) => {
            error!("Multi-order: batch creation failed: {err}");
            return port_error_response(err).into_response();
        }
    };

    let order = OrderRequest {
        external_id: Uuid::new_v4().to_string(),
        line_items: products
            .iter()
            .map(|p| LineItem {
                product_id: p.id.clone(),
                variant_id: p.variant_id,
                quantity: 1,
            })
            .collect(),
        shipping_method: 1,
        address_to: req.address,
    };
    match state.fulfillment.submit_order(order).await {
        Ok(order) => {
            info!(
                "Multi-order {} placed for {} products",
                order.id,
                products.len()
            );
            (StatusCode::CREATED, Json(MultiOrderResponse { products, order })).into_response()
        }
        Err(err) => {
            error!("Multi-order: submission failed: {err}");
            port_error_response(err).into_response()
        }
    }
}
