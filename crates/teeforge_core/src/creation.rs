//! crates/teeforge_core/src/creation.rs
//!
//! Product-creation orchestration: upload artwork, create the platform
//! product, optionally publish, and loop sequentially for multi-shirt
//! orders. All side effects go through the service ports, so the loop is
//! testable with fakes and no wall-clock time.

use crate::domain::{
    AdminConfig, CreatedProduct, Design, ImageShape, NewProduct, NewProductVariant, PlacedImage,
    Placeholder, PrintArea, UploadedImage,
};
use crate::pacing::FixedInterval;
use crate::ports::{FulfillmentService, ImageFetcher, PortError, PortResult, Sleeper};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;
use tracing::{info, warn};

/// Uploads larger than this are rejected before hitting the platform.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// At most this many designs may be turned into products in one checkout.
pub const MAX_DESIGNS_PER_ORDER: usize = 3;

/// The fulfillment-side knobs for one creation run, snapshotted from the
/// admin config so a mid-flight config change cannot split a batch.
#[derive(Debug, Clone, Copy)]
pub struct CreationSettings {
    pub blueprint_id: u32,
    pub print_provider_id: u32,
    /// Retail price per shirt, minor units.
    pub shirt_price: i64,
    pub publish: bool,
}

impl CreationSettings {
    pub fn from_admin(config: &AdminConfig, publish: bool) -> Self {
        Self {
            blueprint_id: config.blueprint_id,
            print_provider_id: config.print_provider_id,
            shirt_price: config.shirt_price,
            publish,
        }
    }
}

/// Print placement for a given artwork shape. Square art sits centered at
/// full scale; portrait art is scaled down to fit the printable height;
/// landscape art rides slightly high on the chest.
fn placement_for(shape: ImageShape) -> (f64, f64, f64) {
    match shape {
        ImageShape::Square => (0.5, 0.5, 1.0),
        ImageShape::Portrait => (0.5, 0.5, 0.8),
        ImageShape::Landscape => (0.5, 0.42, 1.0),
    }
}

fn artwork_file_name(title: &str) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("{}.png", slug.trim_matches('-'))
}

pub struct ProductCreator {
    fulfillment: Arc<dyn FulfillmentService>,
    fetcher: Arc<dyn ImageFetcher>,
    sleeper: Arc<dyn Sleeper>,
    pacing: FixedInterval,
}

impl ProductCreator {
    pub fn new(
        fulfillment: Arc<dyn FulfillmentService>,
        fetcher: Arc<dyn ImageFetcher>,
        sleeper: Arc<dyn Sleeper>,
        pacing: FixedInterval,
    ) -> Self {
        Self {
            fulfillment,
            fetcher,
            sleeper,
            pacing,
        }
    }

    /// Uploads artwork to the platform media library. URL upload is tried
    /// first; `blob:`/`data:` sources and URL-upload failures fall back to
    /// base64 file contents.
    pub async fn upload_artwork(&self, title: &str, image_url: &str) -> PortResult<UploadedImage> {
        let file_name = artwork_file_name(title);

        let needs_contents = image_url.starts_with("blob:") || image_url.starts_with("data:");
        if !needs_contents {
            match self.fulfillment.upload_image_url(&file_name, image_url).await {
                Ok(upload) => return Ok(upload),
                Err(err) => {
                    warn!("URL upload of {file_name} failed ({err}), retrying with file contents");
                }
            }
        }

        let blob = self.fetcher.fetch(image_url).await?;
        if blob.bytes.is_empty() {
            return Err(PortError::InvalidInput(format!(
                "artwork {file_name} is empty"
            )));
        }
        if !blob.content_type.starts_with("image/") {
            return Err(PortError::InvalidInput(format!(
                "artwork {file_name} is not an image ({})",
                blob.content_type
            )));
        }
        if blob.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(PortError::InvalidInput(format!(
                "artwork {file_name} exceeds {MAX_UPLOAD_BYTES} bytes"
            )));
        }

        let contents = general_purpose::STANDARD.encode(&blob.bytes);
        self.fulfillment
            .upload_image_contents(&file_name, &contents)
            .await
    }

    /// Creates one platform product from a design + chosen variant id.
    /// Publish is best-effort and never aborts the flow.
    pub async fn create_product_from_design(
        &self,
        design: &Design,
        variant_id: u32,
        settings: CreationSettings,
    ) -> PortResult<CreatedProduct> {
        let upload = self.upload_artwork(&design.title, &design.image_url).await?;

        let (x, y, scale) = placement_for(design.shape);
        let new_product = NewProduct {
            title: design.title.clone(),
            description: format!("Custom AI-generated t-shirt: {}", design.prompt),
            blueprint_id: settings.blueprint_id,
            print_provider_id: settings.print_provider_id,
            variants: vec![NewProductVariant {
                id: variant_id,
                price: settings.shirt_price,
                is_enabled: true,
            }],
            print_areas: vec![PrintArea {
                variant_ids: vec![variant_id],
                placeholders: vec![Placeholder {
                    position: "front".to_string(),
                    images: vec![PlacedImage {
                        id: upload.id,
                        x,
                        y,
                        scale,
                        angle: 0.0,
                    }],
                }],
            }],
        };

        let product = self.fulfillment.create_product(new_product).await?;
        info!("Created product {} ({})", product.id, product.title);

        if settings.publish {
            if let Err(err) = self.fulfillment.publish_product(&product.id).await {
                warn!("Publishing product {} failed: {err}", product.id);
            }
        }

        Ok(CreatedProduct {
            image_url: product.images.first().cloned(),
            id: product.id,
            title: product.title,
            variant_id,
            price: settings.shirt_price,
        })
    }

    /// Creates products for up to [`MAX_DESIGNS_PER_ORDER`] configured
    /// designs, strictly sequentially, pausing between iterations to stay
    /// under the platform's rate limits.
    pub async fn create_many(
        &self,
        configured: &[(Design, u32)],
        settings: CreationSettings,
    ) -> PortResult<Vec<CreatedProduct>> {
        if configured.is_empty() {
            return Err(PortError::InvalidInput("no designs configured".into()));
        }
        if configured.len() > MAX_DESIGNS_PER_ORDER {
            return Err(PortError::InvalidInput(format!(
                "at most {MAX_DESIGNS_PER_ORDER} designs per order, got {}",
                configured.len()
            )));
        }

        let mut created = Vec::with_capacity(configured.len());
        for (i, (design, variant_id)) in configured.iter().enumerate() {
            if i > 0 {
                self.pacing.pause(self.sleeper.as_ref()).await;
            }
            match self
                .create_product_from_design(design, *variant_id, settings)
                .await
            {
                Ok(product) => created.push(product),
                Err(err) => {
                    warn!(
                        "Product creation {}/{} failed: {err}; {} already created",
                        i + 1,
                        configured.len(),
                        created.len()
                    );
                    return Err(err);
                }
            }
        }
        Ok(created)
    }

    /// Best-effort compensating deletes. A failed delete is logged and
    /// swallowed so the remaining products still get their attempt.
    /// Returns how many deletes succeeded.
    pub async fn delete_products(&self, product_ids: &[String]) -> usize {
        let mut deleted = 0;
        for id in product_ids {
            match self.fulfillment.delete_product(id).await {
                Ok(()) => deleted += 1,
                Err(err) => warn!("Failed to delete product {id}: {err}"),
            }
        }
        deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImageBlob;
    use crate::testing::{variant, MockFetcher, MockFulfillment, RecordingSleeper};
    use std::sync::Arc;
    use std::time::Duration;

    fn settings() -> CreationSettings {
        CreationSettings {
            blueprint_id: 6,
            print_provider_id: 103,
            shirt_price: 2499,
            publish: false,
        }
    }

    fn creator(
        fulfillment: Arc<MockFulfillment>,
        fetcher: MockFetcher,
        sleeper: Arc<RecordingSleeper>,
    ) -> ProductCreator {
        ProductCreator::new(
            fulfillment,
            Arc::new(fetcher),
            sleeper,
            FixedInterval::new(Duration::from_millis(1500)),
        )
    }

    fn configured(title: &str) -> (Design, u32) {
        let design = Design::new(
            format!("https://gen.example/{title}.png"),
            title,
            "a test prompt",
            ImageShape::Square,
        );
        (design, variant(401, "Black", "L").id)
    }

    #[tokio::test]
    async fn two_designs_create_two_products_sequentially_with_one_pause() {
        let fulfillment = Arc::new(MockFulfillment::default());
        let sleeper = Arc::new(RecordingSleeper::default());
        let creator = creator(fulfillment.clone(), MockFetcher::default(), sleeper.clone());

        let items = vec![configured("Sunset Wolf"), configured("City Lights")];
        let created = creator.create_many(&items, settings()).await.unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(
            fulfillment.calls(),
            vec![
                "upload_url:sunset-wolf.png",
                "create:Sunset Wolf",
                "upload_url:city-lights.png",
                "create:City Lights",
            ]
        );
        // Exactly one inter-iteration pause, after the first product.
        assert_eq!(
            *sleeper.slept.lock().unwrap(),
            vec![Duration::from_millis(1500)]
        );
    }

    #[tokio::test]
    async fn a_fourth_design_is_rejected_before_any_upstream_call() {
        let fulfillment = Arc::new(MockFulfillment::default());
        let sleeper = Arc::new(RecordingSleeper::default());
        let creator = creator(fulfillment.clone(), MockFetcher::default(), sleeper);

        let items = vec![
            configured("A"),
            configured("B"),
            configured("C"),
            configured("D"),
        ];
        let err = creator.create_many(&items, settings()).await.unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
        assert!(fulfillment.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_url_upload_falls_back_to_base64_contents() {
        let fulfillment = Arc::new(MockFulfillment {
            fail_upload_url: true,
            ..Default::default()
        });
        let sleeper = Arc::new(RecordingSleeper::default());
        let creator = creator(fulfillment.clone(), MockFetcher::default(), sleeper);

        let upload = creator
            .upload_artwork("Sunset Wolf", "https://gen.example/a.png")
            .await
            .unwrap();
        assert_eq!(upload.file_name, "sunset-wolf.png");
        assert_eq!(
            fulfillment.calls(),
            vec!["upload_url:sunset-wolf.png", "upload_contents:sunset-wolf.png"]
        );
    }

    #[tokio::test]
    async fn blob_sources_skip_the_url_attempt() {
        let fulfillment = Arc::new(MockFulfillment::default());
        let sleeper = Arc::new(RecordingSleeper::default());
        let creator = creator(fulfillment.clone(), MockFetcher::default(), sleeper);

        creator
            .upload_artwork("Sunset Wolf", "blob:https://app.example/abc123")
            .await
            .unwrap();
        assert_eq!(fulfillment.calls(), vec!["upload_contents:sunset-wolf.png"]);
    }

    #[tokio::test]
    async fn empty_nonimage_and_oversized_blobs_are_rejected() {
        let cases = [
            ImageBlob {
                content_type: "image/png".into(),
                bytes: Vec::new(),
            },
            ImageBlob {
                content_type: "text/html".into(),
                bytes: vec![1, 2, 3],
            },
            ImageBlob {
                content_type: "image/png".into(),
                bytes: vec![0; MAX_UPLOAD_BYTES + 1],
            },
        ];
        for blob in cases {
            let fulfillment = Arc::new(MockFulfillment::default());
            let sleeper = Arc::new(RecordingSleeper::default());
            let creator = creator(fulfillment.clone(), MockFetcher { blob }, sleeper);

            let err = creator
                .upload_artwork("Bad Art", "blob:https://app.example/bad")
                .await
                .unwrap_err();
            assert!(matches!(err, PortError::InvalidInput(_)));
            // The platform never saw an upload attempt.
            assert!(fulfillment.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn publish_failure_is_logged_but_does_not_abort() {
        let fulfillment = Arc::new(MockFulfillment {
            fail_publish: true,
            ..Default::default()
        });
        let sleeper = Arc::new(RecordingSleeper::default());
        let creator = creator(fulfillment.clone(), MockFetcher::default(), sleeper);

        let items = vec![configured("Sunset Wolf")];
        let mut with_publish = settings();
        with_publish.publish = true;
        let created = creator.create_many(&items, with_publish).await.unwrap();

        assert_eq!(created.len(), 1);
        assert!(fulfillment
            .calls()
            .iter()
            .any(|c| c.starts_with("publish:")));
    }

    #[tokio::test]
    async fn a_failed_delete_does_not_stop_the_remaining_deletes() {
        let fulfillment = Arc::new(MockFulfillment {
            fail_delete_ids: ["prod-1".to_string()].into_iter().collect(),
            ..Default::default()
        });
        let sleeper = Arc::new(RecordingSleeper::default());
        let creator = creator(fulfillment.clone(), MockFetcher::default(), sleeper);

        let deleted = creator
            .delete_products(&["prod-1".to_string(), "prod-2".to_string()])
            .await;

        assert_eq!(deleted, 1);
        assert_eq!(fulfillment.calls(), vec!["delete:prod-1", "delete:prod-2"]);
    }

    #[tokio::test]
    async fn mid_batch_failure_surfaces_after_partial_creation() {
        let fulfillment = Arc::new(MockFulfillment {
            fail_create_on_call: Some(2),
            ..Default::default()
        });
        let sleeper = Arc::new(RecordingSleeper::default());
        let creator = creator(fulfillment.clone(), MockFetcher::default(), sleeper);

        let items = vec![configured("Sunset Wolf"), configured("City Lights")];
        let err = creator.create_many(&items, settings()).await.unwrap_err();
        assert!(matches!(err, PortError::Upstream { status: 500, .. }));
    }
}
