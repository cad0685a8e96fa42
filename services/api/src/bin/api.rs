//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        FileAdminStore, HttpImageFetcher, OpenAiImageAdapter, PrintifyAdapter, StripeAdapter,
        TokioSleeper,
    },
    config::Config,
    error::ApiError,
    web::{admin, catalog, payments, products, proxy, ApiDoc, AppState, Caches},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{any, get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    let http_client = reqwest::Client::new();

    let printify_token = config
        .printify_api_token
        .as_ref()
        .ok_or_else(|| ApiError::Internal("PRINTIFY_API_TOKEN is required".to_string()))?;
    let fulfillment = Arc::new(PrintifyAdapter::new(
        http_client.clone(),
        config.printify_api_base.clone(),
        printify_token.clone(),
        config.printify_shop_id.clone(),
    ));

    let stripe_key = config
        .stripe_secret_key
        .as_ref()
        .ok_or_else(|| ApiError::Internal("STRIPE_SECRET_KEY is required".to_string()))?;
    let payments_adapter = Arc::new(StripeAdapter::new(
        http_client.clone(),
        config.stripe_api_base.clone(),
        stripe_key.clone(),
        config.stripe_webhook_secret.clone(),
    ));

    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let images = Arc::new(OpenAiImageAdapter::new(Client::with_config(openai_config)));

    info!("Loading admin config from {}", config.admin_config_path.display());
    let admin_store = Arc::new(FileAdminStore::load(config.admin_config_path.clone()).await?);

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        fulfillment,
        payments: payments_adapter,
        images,
        fetcher: Arc::new(HttpImageFetcher::new(http_client)),
        admin: admin_store,
        sleeper: Arc::new(TokioSleeper),
        caches: Caches::default(),
    });

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:5173".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    let api_router = Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({ "status": "healthy", "service": "teeforge" })) }),
        )
        // Fulfillment gateway. The specific printify routes are registered
        // alongside the catch-all proxy; static segments win the match.
        .route("/api/printify/multi-order/multi-order", post(products::multi_order_handler))
        .route("/api/printify/uploads/{image_id}", get(products::get_upload_handler))
        .route("/api/printify/{*path}", any(proxy::proxy_handler))
        .route("/api/cache-stats", get(proxy::cache_stats_handler))
        // Catalog search
        .route("/api/catalog/blueprints/search", get(catalog::search_blueprints_handler))
        .route(
            "/api/catalog/blueprints/{id}/providers/search",
            get(catalog::search_providers_handler),
        )
        .route(
            "/api/catalog/blueprints/{id}/providers/{pid}/variants",
            get(catalog::list_variants_handler),
        )
        .route("/api/catalog/cache/clear", post(catalog::clear_catalog_cache_handler))
        // Admin configuration
        .route(
            "/api/admin/config",
            get(admin::get_config_handler).post(admin::update_config_handler),
        )
        // Products
        .route("/api/products/top-products", get(products::top_products_handler))
        .route("/api/products/all-products", get(products::all_products_handler))
        .route("/api/products/create-custom-order", post(products::create_custom_order_handler))
        .route("/api/products/create-admin-product", post(products::create_admin_product_handler))
        .route("/api/products/{id}", axum::routing::delete(products::delete_product_handler))
        // Payments
        .route("/api/stripe/create-payment-intent", post(payments::create_payment_intent_handler))
        .route("/api/stripe/confirm-payment", post(payments::confirm_payment_handler))
        .route("/api/stripe/webhook", post(payments::webhook_handler))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
