//! crates/teeforge_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any HTTP framework or vendor SDK;
//! serde derives are present because JSON is the native data format of
//! every collaborator (fulfillment catalog, payment processor, admin file).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// The overall shape of a generated artwork, used for print placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageShape {
    #[default]
    Square,
    Portrait,
    Landscape,
}

impl ImageShape {
    /// The aspect ratio string the image backends expect for this shape.
    pub fn aspect_ratio(&self) -> &'static str {
        match self {
            ImageShape::Square => "1:1",
            ImageShape::Portrait => "2:3",
            ImageShape::Landscape => "3:2",
        }
    }
}

/// A candidate artwork produced by one image-generation call.
///
/// Immutable once created; superseded wholesale when the user regenerates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Design {
    pub id: Uuid,
    pub image_url: String,
    pub title: String,
    pub prompt: String,
    /// The user's raw prompt before any enhancement was applied.
    pub original_prompt: Option<String>,
    pub shape: ImageShape,
    pub aspect_ratio: String,
}

impl Design {
    pub fn new(
        image_url: impl Into<String>,
        title: impl Into<String>,
        prompt: impl Into<String>,
        shape: ImageShape,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            image_url: image_url.into(),
            title: title.into(),
            prompt: prompt.into(),
            original_prompt: None,
            shape,
            aspect_ratio: shape.aspect_ratio().to_string(),
        }
    }
}

/// The color/size pair that distinguishes one catalog variant from another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOptions {
    pub color: String,
    pub size: String,
}

/// A sellable variant of the configured blueprint/provider pair.
///
/// Sourced from the fulfillment platform's catalog; read-only from the
/// app's perspective. Prices are minor units (cents).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub id: u32,
    pub title: String,
    pub options: VariantOptions,
    pub cost: i64,
    pub price: i64,
    pub is_enabled: bool,
    pub is_default: bool,
    pub is_available: bool,
}

/// The user's chosen color/size/variant for a single design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignConfig {
    pub color: String,
    pub size: String,
    pub variant: Variant,
}

/// One image placed inside a print-area placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedImage {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub angle: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placeholder {
    pub position: String,
    pub images: Vec<PlacedImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintArea {
    pub variant_ids: Vec<u32>,
    pub placeholders: Vec<Placeholder>,
}

/// A variant as embedded in a platform product record. The product payload
/// carries numeric option ids only; the structured color/size schema lives
/// on the catalog [`Variant`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: u32,
    pub title: String,
    pub price: i64,
    pub is_enabled: bool,
    pub is_default: bool,
    pub is_available: bool,
}

/// A product record on the fulfillment platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub description: String,
    pub images: Vec<String>,
    pub variants: Vec<ProductVariant>,
    pub print_areas: Vec<PrintArea>,
}

/// A request to create a product on the fulfillment platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub blueprint_id: u32,
    pub print_provider_id: u32,
    pub variants: Vec<NewProductVariant>,
    pub print_areas: Vec<PrintArea>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProductVariant {
    pub id: u32,
    pub price: i64,
    pub is_enabled: bool,
}

/// Raw image bytes fetched from a generation backend or blob source.
#[derive(Debug, Clone)]
pub struct ImageBlob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The slice of a created product the checkout flow carries forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedProduct {
    pub id: String,
    pub title: String,
    pub image_url: Option<String>,
    pub variant_id: u32,
    pub price: i64,
}

/// An image uploaded to the fulfillment platform's media library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedImage {
    pub id: String,
    pub file_name: String,
    pub preview_url: String,
}

/// A shipping destination, in the shape the fulfillment order API expects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub country: String,
    pub region: Option<String>,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub zip: String,
}

/// One order line referencing an existing product + variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub variant_id: u32,
    pub quantity: u32,
}

/// A fulfillment order request. Created exactly once per checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub external_id: String,
    pub line_items: Vec<LineItem>,
    pub shipping_method: u32,
    pub address_to: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// A catalog blueprint (garment type) as listed by the fulfillment platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: u32,
    pub title: String,
    pub brand: String,
    pub model: String,
}

/// A print provider able to produce a given blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintProvider {
    pub id: u32,
    pub title: String,
    pub location: String,
}

/// Which image-generation backend produces candidate artwork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    #[default]
    DallE3,
    GptImage1,
}

/// The single global operator-editable configuration record.
///
/// Held by the admin config service (JSON file + in-memory copy); mutated
/// only via the password-checked endpoint. Partial files deserialize
/// against the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub image_source: ImageSource,
    pub debug_mode: bool,
    pub max_designs_per_generation: u8,
    pub enable_multi_shirt_selection: bool,
    pub custom_prompt_suggestions: Vec<String>,
    pub maintenance_mode: bool,
    /// Retail price per shirt, minor units.
    pub shirt_price: i64,
    pub blueprint_id: u32,
    pub print_provider_id: u32,
    pub featured_products: Vec<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            image_source: ImageSource::default(),
            debug_mode: false,
            max_designs_per_generation: 3,
            enable_multi_shirt_selection: true,
            custom_prompt_suggestions: Vec::new(),
            maintenance_mode: false,
            shirt_price: 2499,
            blueprint_id: 6,
            print_provider_id: 103,
            featured_products: Vec::new(),
        }
    }
}

/// A partial admin-config update; only present fields are merged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AdminConfigPatch {
    pub image_source: Option<ImageSource>,
    pub debug_mode: Option<bool>,
    pub max_designs_per_generation: Option<u8>,
    pub enable_multi_shirt_selection: Option<bool>,
    pub custom_prompt_suggestions: Option<Vec<String>>,
    pub maintenance_mode: Option<bool>,
    pub shirt_price: Option<i64>,
    pub blueprint_id: Option<u32>,
    pub print_provider_id: Option<u32>,
    pub featured_products: Option<Vec<String>>,
}

impl AdminConfig {
    /// Merges a partial update into this config, field by field.
    pub fn apply(&mut self, patch: AdminConfigPatch) {
        if let Some(v) = patch.image_source {
            self.image_source = v;
        }
        if let Some(v) = patch.debug_mode {
            self.debug_mode = v;
        }
        if let Some(v) = patch.max_designs_per_generation {
            self.max_designs_per_generation = v;
        }
        if let Some(v) = patch.enable_multi_shirt_selection {
            self.enable_multi_shirt_selection = v;
        }
        if let Some(v) = patch.custom_prompt_suggestions {
            self.custom_prompt_suggestions = v;
        }
        if let Some(v) = patch.maintenance_mode {
            self.maintenance_mode = v;
        }
        if let Some(v) = patch.shirt_price {
            self.shirt_price = v;
        }
        if let Some(v) = patch.blueprint_id {
            self.blueprint_id = v;
        }
        if let Some(v) = patch.print_provider_id {
            self.print_provider_id = v;
        }
        if let Some(v) = patch.featured_products {
            self.featured_products = v;
        }
    }
}

/// Lifecycle status of a payment intent, owned entirely by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    Succeeded,
    Canceled,
}

impl PaymentStatus {
    pub fn has_succeeded(&self) -> bool {
        matches!(self, PaymentStatus::Succeeded)
    }
}

/// A payment intent as returned by the payment processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    /// Minor units (cents).
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
}

/// A raw image produced by an image-generation backend, before it becomes
/// a [`Design`].
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub url: String,
    pub revised_prompt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_aspect_ratios() {
        assert_eq!(ImageShape::Square.aspect_ratio(), "1:1");
        assert_eq!(ImageShape::Portrait.aspect_ratio(), "2:3");
        assert_eq!(ImageShape::Landscape.aspect_ratio(), "3:2");
    }

    #[test]
    fn admin_config_patch_merges_only_present_fields() {
        let mut config = AdminConfig::default();
        config.apply(AdminConfigPatch {
            shirt_price: Some(2999),
            maintenance_mode: Some(true),
            ..Default::default()
        });
        assert_eq!(config.shirt_price, 2999);
        assert!(config.maintenance_mode);
        // Untouched fields keep their defaults.
        assert_eq!(config.max_designs_per_generation, 3);
        assert_eq!(config.blueprint_id, 6);
    }

    #[test]
    fn design_derives_aspect_ratio_from_shape() {
        let design = Design::new(
            "https://img.example/a.png",
            "Sunset Wolf",
            "a wolf at sunset",
            ImageShape::Portrait,
        );
        assert_eq!(design.aspect_ratio, "2:3");
        assert_eq!(design.original_prompt, None);
    }
}
