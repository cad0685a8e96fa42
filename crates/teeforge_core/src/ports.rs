//! crates/teeforge_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete fulfillment platform, payment
//! processor, and image-generation backend.

use crate::domain::{
    AdminConfig, AdminConfigPatch, Blueprint, GeneratedImage, ImageBlob, ImageShape, ImageSource,
    NewProduct, OrderConfirmation, OrderRequest, PaymentIntent, PrintProvider, Product,
    UploadedImage, Variant,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (HTTP
/// clients, vendor SDKs, the filesystem).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The upstream platform answered with a non-2xx status; the body is
    /// passed through to the caller unchanged.
    #[error("Upstream error {status}: {body}")]
    Upstream { status: u16, body: String },
    /// The upstream platform is rate-limiting us (HTTP 429).
    #[error("Rate limited, retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A pass-through response from the fulfillment gateway: the upstream
/// status code plus its JSON body, surfaced to the caller unchanged.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait FulfillmentService: Send + Sync {
    // --- Media library ---
    /// Uploads an image to the platform by public URL.
    async fn upload_image_url(&self, file_name: &str, url: &str) -> PortResult<UploadedImage>;

    /// Uploads an image to the platform by base64-encoded file contents.
    async fn upload_image_contents(
        &self,
        file_name: &str,
        contents_b64: &str,
    ) -> PortResult<UploadedImage>;

    /// Fetches metadata (including a preview URL) for a prior upload.
    async fn get_upload(&self, image_id: &str) -> PortResult<UploadedImage>;

    // --- Products ---
    async fn create_product(&self, product: NewProduct) -> PortResult<Product>;

    async fn get_product(&self, product_id: &str) -> PortResult<Product>;

    /// Lists the shop's published products.
    async fn list_shop_products(&self) -> PortResult<Vec<Product>>;

    async fn publish_product(&self, product_id: &str) -> PortResult<()>;

    async fn delete_product(&self, product_id: &str) -> PortResult<()>;

    // --- Orders ---
    async fn submit_order(&self, order: OrderRequest) -> PortResult<OrderConfirmation>;

    // --- Catalog ---
    async fn list_blueprints(&self) -> PortResult<Vec<Blueprint>>;

    async fn list_print_providers(&self, blueprint_id: u32) -> PortResult<Vec<PrintProvider>>;

    async fn list_variants(&self, blueprint_id: u32, provider_id: u32)
        -> PortResult<Vec<Variant>>;

    // --- Gateway ---
    /// Forwards an arbitrary request to the platform, returning the
    /// upstream status and JSON body unchanged. Used by the proxy routes.
    async fn forward(
        &self,
        method: &str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> PortResult<UpstreamResponse>;
}

#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Creates a payment intent for the given amount in minor units.
    async fn create_payment_intent(
        &self,
        amount: i64,
        currency: &str,
        metadata: BTreeMap<String, String>,
    ) -> PortResult<PaymentIntent>;

    /// Retrieves the current state of a payment intent.
    async fn get_payment_intent(&self, intent_id: &str) -> PortResult<PaymentIntent>;

    /// Retrieval wrapper used by the confirm endpoint; status transitions
    /// are owned entirely by the processor.
    async fn confirm_payment(&self, intent_id: &str) -> PortResult<PaymentIntent>;

    /// Verifies a webhook payload against its signature header. The
    /// default implementation trusts the raw body, for processors (or
    /// deployments) without a configured webhook secret.
    fn verify_webhook(&self, _payload: &[u8], _signature: Option<&str>) -> PortResult<()> {
        Ok(())
    }
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Generates `count` candidate images for a prompt.
    async fn generate(
        &self,
        prompt: &str,
        count: u8,
        shape: ImageShape,
        source: ImageSource,
    ) -> PortResult<Vec<GeneratedImage>>;
}

/// Fetches raw image bytes, used for the base64 upload fallback.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> PortResult<ImageBlob>;
}

/// The admin configuration service: one global record with an explicit
/// load/save contract, replacing an implicit module-level singleton.
#[async_trait]
pub trait AdminConfigService: Send + Sync {
    /// Returns a copy of the current configuration.
    async fn get(&self) -> AdminConfig;

    /// Merges a partial update into the configuration and persists it.
    async fn update(&self, patch: AdminConfigPatch) -> PortResult<AdminConfig>;
}

/// An injectable clock pause, so pacing and backoff are testable without
/// wall-clock time.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}
