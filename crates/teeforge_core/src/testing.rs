//! crates/teeforge_core/src/testing.rs
//!
//! Test doubles for the service ports, shared by the creation and workflow
//! tests and (behind the `testing` feature) by downstream test suites.

use crate::domain::{
    AdminConfig, AdminConfigPatch, Blueprint, GeneratedImage, ImageBlob, ImageShape, ImageSource,
    NewProduct, OrderConfirmation, OrderRequest, PaymentIntent, PaymentStatus, PrintProvider,
    Product, ProductVariant, UploadedImage, Variant, VariantOptions,
};
use crate::ports::{
    AdminConfigService, FulfillmentService, ImageFetcher, ImageGenerationService, PaymentService,
    PortError, PortResult, Sleeper, UpstreamResponse,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn variant(id: u32, color: &str, size: &str) -> Variant {
    Variant {
        id,
        title: format!("{color} / {size}"),
        options: VariantOptions {
            color: color.to_string(),
            size: size.to_string(),
        },
        cost: 1200,
        price: 2499,
        is_enabled: true,
        is_default: false,
        is_available: true,
    }
}

/// A scriptable fulfillment platform that records every call it receives.
#[derive(Default)]
pub struct MockFulfillment {
    pub log: Mutex<Vec<String>>,
    pub fail_upload_url: bool,
    /// 1-based create_product call number that should fail, if any.
    pub fail_create_on_call: Option<u32>,
    pub fail_publish: bool,
    pub fail_delete_ids: HashSet<String>,
    pub fail_submit_order: bool,
    pub variants: Vec<Variant>,
    /// Fail this many list_variants calls before succeeding.
    pub fail_variants_first: AtomicU32,
    pub create_calls: AtomicU32,
    pub product_seq: AtomicU32,
}

impl MockFulfillment {
    pub fn with_variants(variants: Vec<Variant>) -> Self {
        Self {
            variants,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, entry: impl Into<String>) {
        self.log.lock().unwrap().push(entry.into());
    }

    fn product_variants(&self) -> Vec<ProductVariant> {
        self.variants
            .iter()
            .map(|v| ProductVariant {
                id: v.id,
                title: v.title.clone(),
                price: v.price,
                is_enabled: v.is_enabled,
                is_default: v.is_default,
                is_available: v.is_available,
            })
            .collect()
    }
}

#[async_trait]
impl FulfillmentService for MockFulfillment {
    async fn upload_image_url(&self, file_name: &str, _url: &str) -> PortResult<UploadedImage> {
        self.record(format!("upload_url:{file_name}"));
        if self.fail_upload_url {
            return Err(PortError::Upstream {
                status: 400,
                body: "url upload rejected".into(),
            });
        }
        Ok(UploadedImage {
            id: format!("img-{file_name}"),
            file_name: file_name.to_string(),
            preview_url: format!("https://cdn.example/{file_name}"),
        })
    }

    async fn upload_image_contents(
        &self,
        file_name: &str,
        _contents_b64: &str,
    ) -> PortResult<UploadedImage> {
        self.record(format!("upload_contents:{file_name}"));
        Ok(UploadedImage {
            id: format!("img-{file_name}"),
            file_name: file_name.to_string(),
            preview_url: format!("https://cdn.example/{file_name}"),
        })
    }

    async fn get_upload(&self, image_id: &str) -> PortResult<UploadedImage> {
        self.record(format!("get_upload:{image_id}"));
        Ok(UploadedImage {
            id: image_id.to_string(),
            file_name: "artwork.png".into(),
            preview_url: format!("https://cdn.example/{image_id}"),
        })
    }

    async fn create_product(&self, product: NewProduct) -> PortResult<Product> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.record(format!("create:{}", product.title));
        if self.fail_create_on_call == Some(call) {
            return Err(PortError::Upstream {
                status: 500,
                body: "product creation failed".into(),
            });
        }
        let seq = self.product_seq.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Product {
            id: format!("prod-{seq}"),
            title: product.title,
            description: product.description,
            images: vec![format!("https://cdn.example/prod-{seq}.png")],
            variants: self.product_variants(),
            print_areas: product.print_areas,
        })
    }

    async fn get_product(&self, product_id: &str) -> PortResult<Product> {
        self.record(format!("get_product:{product_id}"));
        Ok(Product {
            id: product_id.to_string(),
            title: "Featured Tee".into(),
            description: "A featured design".into(),
            images: vec!["https://cdn.example/featured.png".into()],
            variants: self.product_variants(),
            print_areas: Vec::new(),
        })
    }

    async fn list_shop_products(&self) -> PortResult<Vec<Product>> {
        self.record("list_shop_products");
        Ok(Vec::new())
    }

    async fn publish_product(&self, product_id: &str) -> PortResult<()> {
        self.record(format!("publish:{product_id}"));
        if self.fail_publish {
            return Err(PortError::Upstream {
                status: 500,
                body: "publish failed".into(),
            });
        }
        Ok(())
    }

    async fn delete_product(&self, product_id: &str) -> PortResult<()> {
        self.record(format!("delete:{product_id}"));
        if self.fail_delete_ids.contains(product_id) {
            return Err(PortError::Upstream {
                status: 500,
                body: "delete failed".into(),
            });
        }
        Ok(())
    }

    async fn submit_order(&self, order: OrderRequest) -> PortResult<OrderConfirmation> {
        self.record(format!("order:{}", order.external_id));
        if self.fail_submit_order {
            return Err(PortError::Upstream {
                status: 500,
                body: "order rejected".into(),
            });
        }
        Ok(OrderConfirmation {
            id: format!("order-{}", order.external_id),
            created_at: chrono::Utc::now(),
        })
    }

    async fn list_blueprints(&self) -> PortResult<Vec<Blueprint>> {
        self.record("list_blueprints");
        Ok(Vec::new())
    }

    async fn list_print_providers(&self, blueprint_id: u32) -> PortResult<Vec<PrintProvider>> {
        self.record(format!("list_providers:{blueprint_id}"));
        Ok(Vec::new())
    }

    async fn list_variants(
        &self,
        blueprint_id: u32,
        provider_id: u32,
    ) -> PortResult<Vec<Variant>> {
        self.record(format!("list_variants:{blueprint_id}:{provider_id}"));
        let remaining = self.fail_variants_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_variants_first.store(remaining - 1, Ordering::SeqCst);
            return Err(PortError::Upstream {
                status: 500,
                body: "catalog unavailable".into(),
            });
        }
        Ok(self.variants.clone())
    }

    async fn forward(
        &self,
        method: &str,
        path: &str,
        _body: Option<serde_json::Value>,
    ) -> PortResult<UpstreamResponse> {
        self.record(format!("forward:{method}:{path}"));
        Ok(UpstreamResponse {
            status: 200,
            body: serde_json::json!({}),
        })
    }
}

/// A payment processor double with a scriptable intent status.
pub struct MockPayments {
    pub log: Mutex<Vec<String>>,
    pub status: Mutex<PaymentStatus>,
    pub fail_create: bool,
}

impl Default for MockPayments {
    fn default() -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            status: Mutex::new(PaymentStatus::RequiresPaymentMethod),
            fail_create: false,
        }
    }
}

impl MockPayments {
    pub fn set_status(&self, status: PaymentStatus) {
        *self.status.lock().unwrap() = status;
    }

    fn intent(&self, id: &str, amount: i64) -> PaymentIntent {
        PaymentIntent {
            id: id.to_string(),
            client_secret: format!("{id}_secret"),
            amount,
            currency: "usd".into(),
            status: *self.status.lock().unwrap(),
        }
    }
}

#[async_trait]
impl PaymentService for MockPayments {
    async fn create_payment_intent(
        &self,
        amount: i64,
        _currency: &str,
        _metadata: std::collections::BTreeMap<String, String>,
    ) -> PortResult<PaymentIntent> {
        self.log.lock().unwrap().push(format!("create_intent:{amount}"));
        if self.fail_create {
            return Err(PortError::Upstream {
                status: 402,
                body: "card declined".into(),
            });
        }
        Ok(self.intent("pi_test", amount))
    }

    async fn get_payment_intent(&self, intent_id: &str) -> PortResult<PaymentIntent> {
        self.log.lock().unwrap().push(format!("get_intent:{intent_id}"));
        Ok(self.intent(intent_id, 2499))
    }

    async fn confirm_payment(&self, intent_id: &str) -> PortResult<PaymentIntent> {
        self.log.lock().unwrap().push(format!("confirm:{intent_id}"));
        Ok(self.intent(intent_id, 2499))
    }
}

/// An image backend double producing deterministic placeholder URLs.
#[derive(Default)]
pub struct MockImages {
    pub fail: bool,
}

#[async_trait]
impl ImageGenerationService for MockImages {
    async fn generate(
        &self,
        prompt: &str,
        count: u8,
        _shape: ImageShape,
        _source: ImageSource,
    ) -> PortResult<Vec<GeneratedImage>> {
        if self.fail {
            return Err(PortError::Upstream {
                status: 500,
                body: "generation failed".into(),
            });
        }
        Ok((0..count)
            .map(|i| GeneratedImage {
                url: format!("https://gen.example/{i}.png"),
                revised_prompt: Some(format!("{prompt} (refined)")),
            })
            .collect())
    }
}

/// Serves a fixed blob for any URL.
pub struct MockFetcher {
    pub blob: ImageBlob,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self {
            blob: ImageBlob {
                content_type: "image/png".into(),
                bytes: vec![0x89, 0x50, 0x4e, 0x47],
            },
        }
    }
}

#[async_trait]
impl ImageFetcher for MockFetcher {
    async fn fetch(&self, _url: &str) -> PortResult<ImageBlob> {
        Ok(self.blob.clone())
    }
}

/// Records requested pauses instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    pub slept: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

/// An in-memory admin config service.
pub struct MockAdminConfig {
    config: Mutex<AdminConfig>,
}

impl Default for MockAdminConfig {
    fn default() -> Self {
        Self {
            config: Mutex::new(AdminConfig::default()),
        }
    }
}

#[async_trait]
impl AdminConfigService for MockAdminConfig {
    async fn get(&self) -> AdminConfig {
        self.config.lock().unwrap().clone()
    }

    async fn update(&self, patch: AdminConfigPatch) -> PortResult<AdminConfig> {
        let mut config = self.config.lock().unwrap();
        config.apply(patch);
        Ok(config.clone())
    }
}
