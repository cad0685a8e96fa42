//! services/api/src/adapters/printify.rs
//!
//! This module contains the adapter for the Printify fulfillment platform.
//! It implements the `FulfillmentService` port from the `core` crate,
//! translating between Printify's REST payloads and the pure domain types.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use teeforge_core::domain::{
    Blueprint, NewProduct, OrderConfirmation, OrderRequest, PrintProvider, Product,
    ProductVariant, UploadedImage, Variant, VariantOptions,
};
use teeforge_core::ports::{FulfillmentService, PortError, PortResult, UpstreamResponse};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `FulfillmentService` port against the
/// Printify REST API, attaching the configured bearer token to every call.
#[derive(Clone)]
pub struct PrintifyAdapter {
    client: reqwest::Client,
    base_url: String,
    token: String,
    shop_id: String,
}

impl PrintifyAdapter {
    /// Creates a new `PrintifyAdapter`.
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
        shop_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            shop_id: shop_id.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json")
    }

    /// Maps a non-2xx upstream response into the port error taxonomy,
    /// detecting rate limits explicitly.
    async fn check(response: reqwest::Response) -> PortResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return Err(PortError::RateLimited { retry_after });
        }
        let body = response.text().await.unwrap_or_default();
        Err(PortError::Upstream {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> PortResult<T> {
        let response = self
            .request(Method::GET, path)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Self::check(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> PortResult<T> {
        let response = self
            .request(Method::POST, path)
            .json(body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Self::check(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

//=========================================================================================
// "Impure" Printify Record Structs
//=========================================================================================

#[derive(Deserialize)]
struct UploadRecord {
    id: String,
    file_name: String,
    #[serde(default)]
    preview_url: String,
}
impl UploadRecord {
    fn to_domain(self) -> UploadedImage {
        UploadedImage {
            id: self.id,
            file_name: self.file_name,
            preview_url: self.preview_url,
        }
    }
}

#[derive(Deserialize)]
struct CatalogVariantOptionsRecord {
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    size: Option<String>,
}

#[derive(Deserialize)]
struct CatalogVariantRecord {
    id: u32,
    title: String,
    options: CatalogVariantOptionsRecord,
    #[serde(default)]
    cost: Option<i64>,
    #[serde(default)]
    price: Option<i64>,
    #[serde(default)]
    is_enabled: Option<bool>,
    #[serde(default)]
    is_default: Option<bool>,
    #[serde(default)]
    is_available: Option<bool>,
}
impl CatalogVariantRecord {
    fn to_domain(self) -> Variant {
        let cost = self.cost.unwrap_or(0);
        Variant {
            id: self.id,
            title: self.title,
            options: VariantOptions {
                color: self.options.color.unwrap_or_default(),
                size: self.options.size.unwrap_or_default(),
            },
            cost,
            price: self.price.unwrap_or(cost),
            is_enabled: self.is_enabled.unwrap_or(true),
            is_default: self.is_default.unwrap_or(false),
            is_available: self.is_available.unwrap_or(true),
        }
    }
}

#[derive(Deserialize)]
struct CatalogVariantsRecord {
    variants: Vec<CatalogVariantRecord>,
}

#[derive(Deserialize)]
struct BlueprintRecord {
    id: u32,
    title: String,
    #[serde(default)]
    brand: String,
    #[serde(default)]
    model: String,
}
impl BlueprintRecord {
    fn to_domain(self) -> Blueprint {
        Blueprint {
            id: self.id,
            title: self.title,
            brand: self.brand,
            model: self.model,
        }
    }
}

#[derive(Deserialize)]
struct ProviderLocationRecord {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Deserialize)]
struct ProviderRecord {
    id: u32,
    title: String,
    #[serde(default)]
    location: Option<ProviderLocationRecord>,
}
impl ProviderRecord {
    fn to_domain(self) -> PrintProvider {
        let location = self
            .location
            .map(|l| {
                [l.city, l.country]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        PrintProvider {
            id: self.id,
            title: self.title,
            location,
        }
    }
}

#[derive(Deserialize)]
struct ProductImageRecord {
    src: String,
}

#[derive(Deserialize)]
struct ProductVariantRecord {
    id: u32,
    #[serde(default)]
    title: String,
    #[serde(default)]
    price: i64,
    #[serde(default)]
    is_enabled: bool,
    #[serde(default)]
    is_default: bool,
    #[serde(default = "default_true")]
    is_available: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct ProductRecord {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    images: Vec<ProductImageRecord>,
    #[serde(default)]
    variants: Vec<ProductVariantRecord>,
    #[serde(default)]
    print_areas: serde_json::Value,
}
impl ProductRecord {
    fn to_domain(self) -> Product {
        Product {
            id: self.id,
            title: self.title,
            description: self.description,
            images: self.images.into_iter().map(|i| i.src).collect(),
            variants: self
                .variants
                .into_iter()
                .map(|v| ProductVariant {
                    id: v.id,
                    title: v.title,
                    price: v.price,
                    is_enabled: v.is_enabled,
                    is_default: v.is_default,
                    is_available: v.is_available,
                })
                .collect(),
            print_areas: serde_json::from_value(self.print_areas).unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct ProductPageRecord {
    data: Vec<ProductRecord>,
}

#[derive(Deserialize)]
struct OrderRecord {
    id: String,
    #[serde(default = "chrono::Utc::now")]
    created_at: chrono::DateTime<chrono::Utc>,
}
impl OrderRecord {
    fn to_domain(self) -> OrderConfirmation {
        OrderConfirmation {
            id: self.id,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `FulfillmentService` Trait Implementation
//=========================================================================================

#[async_trait]
impl FulfillmentService for PrintifyAdapter {
    async fn upload_image_url(&self, file_name: &str, url: &str) -> PortResult<UploadedImage> {
        let record: UploadRecord = self
            .post_json(
                "uploads/images.json",
                &json!({ "file_name": file_name, "url": url }),
            )
            .await?;
        Ok(record.to_domain())
    }

    async fn upload_image_contents(
        &self,
        file_name: &str,
        contents_b64: &str,
    ) -> PortResult<UploadedImage> {
        let record: UploadRecord = self
            .post_json(
                "uploads/images.json",
                &json!({ "file_name": file_name, "contents": contents_b64 }),
            )
            .await?;
        Ok(record.to_domain())
    }

    async fn get_upload(&self, image_id: &str) -> PortResult<UploadedImage> {
        let record: UploadRecord = self.get_json(&format!("uploads/{image_id}.json")).await?;
        Ok(record.to_domain())
    }

    async fn create_product(&self, product: NewProduct) -> PortResult<Product> {
        let body = serde_json::to_value(&product)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let record: ProductRecord = self
            .post_json(&format!("shops/{}/products.json", self.shop_id), &body)
            .await?;
        Ok(record.to_domain())
    }

    async fn get_product(&self, product_id: &str) -> PortResult<Product> {
        let record: ProductRecord = self
            .get_json(&format!("shops/{}/products/{product_id}.json", self.shop_id))
            .await?;
        Ok(record.to_domain())
    }

    async fn list_shop_products(&self) -> PortResult<Vec<Product>> {
        let page: ProductPageRecord = self
            .get_json(&format!("shops/{}/products.json", self.shop_id))
            .await?;
        Ok(page.data.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn publish_product(&self, product_id: &str) -> PortResult<()> {
        let response = self
            .request(
                Method::POST,
                &format!("shops/{}/products/{product_id}/publish.json", self.shop_id),
            )
            .json(&json!({
                "title": true,
                "description": true,
                "images": true,
                "variants": true,
                "tags": true,
            }))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_product(&self, product_id: &str) -> PortResult<()> {
        let response = self
            .request(
                Method::DELETE,
                &format!("shops/{}/products/{product_id}.json", self.shop_id),
            )
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn submit_order(&self, order: OrderRequest) -> PortResult<OrderConfirmation> {
        let body =
            serde_json::to_value(&order).map_err(|e| PortError::Unexpected(e.to_string()))?;
        let record: OrderRecord = self
            .post_json(&format!("shops/{}/orders.json", self.shop_id), &body)
            .await?;
        Ok(record.to_domain())
    }

    async fn list_blueprints(&self) -> PortResult<Vec<Blueprint>> {
        let records: Vec<BlueprintRecord> = self.get_json("catalog/blueprints.json").await?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_print_providers(&self, blueprint_id: u32) -> PortResult<Vec<PrintProvider>> {
        let records: Vec<ProviderRecord> = self
            .get_json(&format!(
                "catalog/blueprints/{blueprint_id}/print_providers.json"
            ))
            .await?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_variants(
        &self,
        blueprint_id: u32,
        provider_id: u32,
    ) -> PortResult<Vec<Variant>> {
        let record: CatalogVariantsRecord = self
            .get_json(&format!(
                "catalog/blueprints/{blueprint_id}/print_providers/{provider_id}/variants.json"
            ))
            .await?;
        Ok(record.variants.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn forward(
        &self,
        method: &str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> PortResult<UpstreamResponse> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| PortError::InvalidInput(format!("invalid method {method}")))?;
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status().as_u16();
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return Err(PortError::RateLimited { retry_after });
        }
        let text = response
            .text()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        // Non-JSON upstream bodies are passed through as a raw string so
        // the caller still sees the upstream status code.
        let body = serde_json::from_str(&text)
            .unwrap_or_else(|_| serde_json::Value::String(text));
        Ok(UpstreamResponse { status, body })
    }
}
