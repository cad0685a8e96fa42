//! crates/teeforge_core/src/workflow.rs
//!
//! The checkout workflow as an explicit state machine. Each state carries
//! exactly the payload later steps need, so illegal states (a payment step
//! without created products, an order without payment evidence) are
//! unrepresentable. [`CheckoutFlow`] owns the port handles and drives the
//! transitions; on any step failure the machine reverts to the nearest
//! safe prior state instead of getting stuck.

use crate::creation::{CreationSettings, ProductCreator, MAX_DESIGNS_PER_ORDER};
use crate::domain::{
    Address, CreatedProduct, Design, DesignConfig, ImageShape, LineItem, OrderConfirmation,
    OrderRequest, PaymentIntent, PaymentStatus,
};
use crate::pacing::{retry_with_backoff, ExponentialBackoff};
use crate::ports::{
    AdminConfigService, FulfillmentService, ImageGenerationService, PaymentService, PortError,
    Sleeper,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("At most {max} designs may be selected")]
    TooManyDesigns { max: usize },
    #[error("Unknown design {0}")]
    UnknownDesign(Uuid),
    #[error("No variant matches color '{color}' size '{size}'")]
    NoMatchingVariant { color: String, size: String },
    #[error("Action '{action}' is not valid in step '{step}'")]
    InvalidTransition {
        step: &'static str,
        action: &'static str,
    },
    #[error("The store is in maintenance mode")]
    Maintenance,
    #[error("Payment bypass is only available in debug mode")]
    BypassDisabled,
    #[error("Payment has not succeeded (status: {0:?})")]
    PaymentNotSucceeded(PaymentStatus),
    #[error(transparent)]
    Port(#[from] PortError),
}

/// The payload of the variant-selection step, also retained by later steps
/// so cancel can restore it.
#[derive(Debug, Clone)]
pub struct VariantsStep {
    pub designs: Vec<Design>,
    pub available_variants: Vec<crate::domain::Variant>,
    pub configs: BTreeMap<Uuid, DesignConfig>,
    /// Selection cap for this session (1 when multi-shirt is disabled).
    pub max_selectable: usize,
    pub error: Option<String>,
}

/// Where the products being paid for came from.
#[derive(Debug, Clone)]
pub enum CheckoutSource {
    /// Custom designs created this session; the variant step is kept so
    /// cancel can return to it.
    Custom { step: VariantsStep },
    /// A pre-existing featured product; nothing to delete on cancel.
    Featured,
}

/// Proof that the shipping step was reached legitimately.
#[derive(Debug, Clone)]
pub enum PaymentEvidence {
    Intent(PaymentIntent),
    /// Development bypass; only constructible in debug mode.
    DevBypass,
}

#[derive(Debug, Clone)]
pub enum CheckoutState {
    /// Waiting for the user's prompt. Carries the last error toast, if any.
    Prompt { error: Option<String> },
    /// Image generation and variant loading are in flight.
    Designs { prompt: String },
    /// Designs ready; the user is configuring up to three of them.
    Variants(VariantsStep),
    /// Products are being created sequentially.
    Creating { step: VariantsStep },
    /// Products exist; waiting for the user to start (or bypass) payment.
    Payment {
        products: Vec<CreatedProduct>,
        source: CheckoutSource,
    },
    /// A payment intent exists and the processor owns its status.
    Stripe {
        products: Vec<CreatedProduct>,
        source: CheckoutSource,
        intent: PaymentIntent,
    },
    /// Payment settled (or bypassed); collecting the shipping address.
    Shipping {
        products: Vec<CreatedProduct>,
        source: CheckoutSource,
        payment: PaymentEvidence,
    },
    Success { order_id: String },
}

impl CheckoutState {
    pub fn step_name(&self) -> &'static str {
        match self {
            CheckoutState::Prompt { .. } => "prompt",
            CheckoutState::Designs { .. } => "designs",
            CheckoutState::Variants(_) => "variants",
            CheckoutState::Creating { .. } => "creating",
            CheckoutState::Payment { .. } => "payment",
            CheckoutState::Stripe { .. } => "stripe",
            CheckoutState::Shipping { .. } => "shipping",
            CheckoutState::Success { .. } => "success",
        }
    }
}

/// Drives one user's checkout from prompt to order. Single-session state;
/// nothing here is shared across sessions.
pub struct CheckoutFlow {
    state: CheckoutState,
    fulfillment: Arc<dyn FulfillmentService>,
    payments: Arc<dyn PaymentService>,
    images: Arc<dyn ImageGenerationService>,
    admin: Arc<dyn AdminConfigService>,
    sleeper: Arc<dyn Sleeper>,
    creator: ProductCreator,
    variant_backoff: ExponentialBackoff,
}

impl CheckoutFlow {
    pub fn new(
        fulfillment: Arc<dyn FulfillmentService>,
        payments: Arc<dyn PaymentService>,
        images: Arc<dyn ImageGenerationService>,
        admin: Arc<dyn AdminConfigService>,
        sleeper: Arc<dyn Sleeper>,
        creator: ProductCreator,
    ) -> Self {
        Self {
            state: CheckoutState::Prompt { error: None },
            fulfillment,
            payments,
            images,
            admin,
            sleeper,
            creator,
            variant_backoff: ExponentialBackoff::default(),
        }
    }

    /// The featured-product shortcut: the product already exists on the
    /// platform, so the flow starts directly in the payment step.
    pub fn from_featured(
        fulfillment: Arc<dyn FulfillmentService>,
        payments: Arc<dyn PaymentService>,
        images: Arc<dyn ImageGenerationService>,
        admin: Arc<dyn AdminConfigService>,
        sleeper: Arc<dyn Sleeper>,
        creator: ProductCreator,
        product: CreatedProduct,
    ) -> Self {
        let mut flow = Self::new(fulfillment, payments, images, admin, sleeper, creator);
        flow.state = CheckoutState::Payment {
            products: vec![product],
            source: CheckoutSource::Featured,
        };
        flow
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    fn invalid(&self, action: &'static str) -> WorkflowError {
        WorkflowError::InvalidTransition {
            step: self.state.step_name(),
            action,
        }
    }

    /// `prompt → designs → variants`: runs image generation and variant
    /// loading concurrently; both must complete before advancing. On any
    /// failure the machine reverts to `prompt` with the error recorded —
    /// it never stays stuck in `designs`.
    pub async fn generate(
        &mut self,
        prompt: &str,
        shape: ImageShape,
    ) -> Result<(), WorkflowError> {
        if !matches!(self.state, CheckoutState::Prompt { .. }) {
            return Err(self.invalid("generate"));
        }

        let config = self.admin.get().await;
        if config.maintenance_mode {
            return Err(WorkflowError::Maintenance);
        }

        self.state = CheckoutState::Designs {
            prompt: prompt.to_string(),
        };

        let images = self.images.generate(
            prompt,
            config.max_designs_per_generation,
            shape,
            config.image_source,
        );
        let variants = retry_with_backoff(
            self.variant_backoff,
            self.sleeper.as_ref(),
            "variant fetch",
            || {
                self.fulfillment
                    .list_variants(config.blueprint_id, config.print_provider_id)
            },
        );

        let (images, variants) = futures::join!(images, variants);
        let (generated, available_variants) = match (images, variants) {
            (Ok(g), Ok(v)) if !g.is_empty() && !v.is_empty() => (g, v),
            (images, variants) => {
                let reason = match (&images, &variants) {
                    (Err(e), _) => format!("image generation failed: {e}"),
                    (_, Err(e)) => format!("variant loading failed: {e}"),
                    _ => "no designs or variants available".to_string(),
                };
                warn!("Generation aborted, returning to prompt: {reason}");
                self.state = CheckoutState::Prompt {
                    error: Some(reason.clone()),
                };
                return Err(WorkflowError::Port(PortError::Unexpected(reason)));
            }
        };

        let designs = generated
            .into_iter()
            .enumerate()
            .map(|(i, image)| {
                let mut design =
                    Design::new(image.url, derive_title(prompt, i), prompt, shape);
                design.original_prompt = image.revised_prompt.is_some().then(|| prompt.to_string());
                if let Some(revised) = image.revised_prompt {
                    design.prompt = revised;
                }
                design
            })
            .collect::<Vec<_>>();

        info!(
            "Generated {} designs, {} variants available",
            designs.len(),
            available_variants.len()
        );
        self.state = CheckoutState::Variants(VariantsStep {
            designs,
            available_variants,
            configs: BTreeMap::new(),
            max_selectable: if config.enable_multi_shirt_selection {
                MAX_DESIGNS_PER_ORDER
            } else {
                1
            },
            error: None,
        });
        Ok(())
    }

    /// Configures one design with a color/size choice. Selecting beyond
    /// the cap is rejected with no state mutation; reconfiguring an
    /// already-selected design is always allowed.
    pub fn configure_design(
        &mut self,
        design_id: Uuid,
        color: &str,
        size: &str,
    ) -> Result<(), WorkflowError> {
        let step_name = self.state.step_name();
        let step = match &mut self.state {
            CheckoutState::Variants(step) => step,
            _ => {
                return Err(WorkflowError::InvalidTransition {
                    step: step_name,
                    action: "configure_design",
                })
            }
        };

        if !step.designs.iter().any(|d| d.id == design_id) {
            return Err(WorkflowError::UnknownDesign(design_id));
        }
        if step.configs.len() >= step.max_selectable && !step.configs.contains_key(&design_id) {
            return Err(WorkflowError::TooManyDesigns {
                max: step.max_selectable,
            });
        }

        let variant = step
            .available_variants
            .iter()
            .find(|v| {
                v.is_available
                    && v.options.color.eq_ignore_ascii_case(color)
                    && v.options.size.eq_ignore_ascii_case(size)
            })
            .cloned()
            .ok_or_else(|| WorkflowError::NoMatchingVariant {
                color: color.to_string(),
                size: size.to_string(),
            })?;

        step.configs.insert(
            design_id,
            DesignConfig {
                color: variant.options.color.clone(),
                size: variant.options.size.clone(),
                variant,
            },
        );
        Ok(())
    }

    /// Removes a design's configuration (deselection).
    pub fn deselect_design(&mut self, design_id: Uuid) -> Result<(), WorkflowError> {
        let step_name = self.state.step_name();
        match &mut self.state {
            CheckoutState::Variants(step) => {
                step.configs.remove(&design_id);
                Ok(())
            }
            _ => Err(WorkflowError::InvalidTransition {
                step: step_name,
                action: "deselect_design",
            }),
        }
    }

    /// `variants → creating → payment`: creates one product per configured
    /// design, strictly sequentially. Any failure reverts to `variants`
    /// with the error recorded.
    pub async fn create_products(&mut self) -> Result<(), WorkflowError> {
        let step = match &self.state {
            CheckoutState::Variants(step) if !step.configs.is_empty() => step.clone(),
            CheckoutState::Variants(_) => return Err(self.invalid("create_products")),
            _ => return Err(self.invalid("create_products")),
        };

        self.state = CheckoutState::Creating { step: step.clone() };

        // Pair configured designs in display order.
        let items: Vec<(Design, u32)> = step
            .designs
            .iter()
            .filter_map(|d| step.configs.get(&d.id).map(|c| (d.clone(), c.variant.id)))
            .collect();

        let config = self.admin.get().await;
        let settings = CreationSettings::from_admin(&config, false);

        match self.creator.create_many(&items, settings).await {
            Ok(products) => {
                info!("Created {} products, advancing to payment", products.len());
                self.state = CheckoutState::Payment {
                    products,
                    source: CheckoutSource::Custom { step },
                };
                Ok(())
            }
            Err(err) => {
                let mut step = step;
                step.error = Some(err.to_string());
                self.state = CheckoutState::Variants(step);
                Err(err.into())
            }
        }
    }

    /// `payment → stripe`: creates the payment intent for the order total.
    pub async fn begin_payment(&mut self) -> Result<PaymentIntent, WorkflowError> {
        let (products, source) = match &self.state {
            CheckoutState::Payment { products, source } => (products.clone(), source.clone()),
            _ => return Err(self.invalid("begin_payment")),
        };

        let amount: i64 = products.iter().map(|p| p.price).sum();
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "product_ids".to_string(),
            products
                .iter()
                .map(|p| p.id.as_str())
                .collect::<Vec<_>>()
                .join(","),
        );

        let intent = self
            .payments
            .create_payment_intent(amount, "usd", metadata)
            .await?;
        self.state = CheckoutState::Stripe {
            products,
            source,
            intent: intent.clone(),
        };
        Ok(intent)
    }

    /// Development bypass: skips the payment step entirely. Only available
    /// when the admin config has debug mode on.
    pub async fn bypass_payment(&mut self) -> Result<(), WorkflowError> {
        let (products, source) = match &self.state {
            CheckoutState::Payment { products, source } => (products.clone(), source.clone()),
            _ => return Err(self.invalid("bypass_payment")),
        };
        if !self.admin.get().await.debug_mode {
            return Err(WorkflowError::BypassDisabled);
        }
        warn!("Payment bypassed (debug mode)");
        self.state = CheckoutState::Shipping {
            products,
            source,
            payment: PaymentEvidence::DevBypass,
        };
        Ok(())
    }

    /// `stripe → shipping`: advances only once the processor reports the
    /// intent as succeeded.
    pub async fn payment_succeeded(&mut self) -> Result<(), WorkflowError> {
        let (products, source, intent) = match &self.state {
            CheckoutState::Stripe {
                products,
                source,
                intent,
            } => (products.clone(), source.clone(), intent.clone()),
            _ => return Err(self.invalid("payment_succeeded")),
        };

        let current = self.payments.get_payment_intent(&intent.id).await?;
        if !current.status.has_succeeded() {
            return Err(WorkflowError::PaymentNotSucceeded(current.status));
        }
        self.state = CheckoutState::Shipping {
            products,
            source,
            payment: PaymentEvidence::Intent(current),
        };
        Ok(())
    }

    /// `shipping → success`: builds the order from the products carried by
    /// the state and submits it. On failure the machine reverts to
    /// `stripe` (when an intent exists) so the user can retry.
    pub async fn submit_order(
        &mut self,
        address: Address,
    ) -> Result<OrderConfirmation, WorkflowError> {
        let (products, source, payment) = match &self.state {
            CheckoutState::Shipping {
                products,
                source,
                payment,
            } => (products.clone(), source.clone(), payment.clone()),
            _ => return Err(self.invalid("submit_order")),
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
            address_to: address,
        };

        match self.fulfillment.submit_order(order).await {
            Ok(confirmation) => {
                info!("Order {} submitted", confirmation.id);
                self.state = CheckoutState::Success {
                    order_id: confirmation.id.clone(),
                };
                Ok(confirmation)
            }
            Err(err) => {
                warn!("Order submission failed: {err}");
                self.state = match payment {
                    PaymentEvidence::Intent(intent) => CheckoutState::Stripe {
                        products,
                        source,
                        intent,
                    },
                    PaymentEvidence::DevBypass => CheckoutState::Shipping {
                        products,
                        source,
                        payment: PaymentEvidence::DevBypass,
                    },
                };
                Err(err.into())
            }
        }
    }

    /// Cancel from the payment step: deletes this session's created
    /// products (best-effort) and returns to the variant step; the
    /// featured-product flow resets to `prompt` since its product
    /// pre-exists on the platform.
    pub async fn cancel(&mut self) -> Result<(), WorkflowError> {
        let (products, source) = match &self.state {
            CheckoutState::Payment { products, source } => (products.clone(), source.clone()),
            _ => return Err(self.invalid("cancel")),
        };

        match source {
            CheckoutSource::Custom { step } => {
                let ids: Vec<String> = products.iter().map(|p| p.id.clone()).collect();
                let deleted = self.creator.delete_products(&ids).await;
                info!("Cancelled checkout, deleted {deleted}/{} products", ids.len());
                self.state = CheckoutState::Variants(step);
            }
            CheckoutSource::Featured => {
                self.state = CheckoutState::Prompt { error: None };
            }
        }
        Ok(())
    }
}

/// A display title for the nth design of a prompt: the prompt's leading
/// words, title-cased, numbered per candidate.
fn derive_title(prompt: &str, index: usize) -> String {
    let mut base = String::new();
    for word in prompt.split_whitespace() {
        if base.len() + word.len() + 1 > 40 {
            break;
        }
        if !base.is_empty() {
            base.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            base.extend(first.to_uppercase());
            base.push_str(chars.as_str());
        }
    }
    if base.is_empty() {
        base = "Custom Design".to_string();
    }
    format!("{} #{}", base, index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::FixedInterval;
    use crate::testing::{
        variant, MockAdminConfig, MockFetcher, MockFulfillment, MockImages, MockPayments,
        RecordingSleeper,
    };
    use crate::domain::AdminConfigPatch;
    use crate::ports::AdminConfigService as _;
    use std::time::Duration;

    struct Harness {
        fulfillment: Arc<MockFulfillment>,
        payments: Arc<MockPayments>,
        admin: Arc<MockAdminConfig>,
        sleeper: Arc<RecordingSleeper>,
    }

    fn flow_with(images_fail: bool, fulfillment: MockFulfillment) -> (CheckoutFlow, Harness) {
        let fulfillment = Arc::new(fulfillment);
        let payments = Arc::new(MockPayments::default());
        let images = Arc::new(MockImages { fail: images_fail });
        let admin = Arc::new(MockAdminConfig::default());
        let sleeper = Arc::new(RecordingSleeper::default());
        let creator = ProductCreator::new(
            fulfillment.clone(),
            Arc::new(MockFetcher::default()),
            sleeper.clone(),
            FixedInterval::new(Duration::from_millis(1500)),
        );
        let flow = CheckoutFlow::new(
            fulfillment.clone(),
            payments.clone(),
            images,
            admin.clone(),
            sleeper.clone(),
            creator,
        );
        (
            flow,
            Harness {
                fulfillment,
                payments,
                admin,
                sleeper,
            },
        )
    }

    fn catalog() -> Vec<crate::domain::Variant> {
        vec![
            variant(401, "Black", "M"),
            variant(402, "Black", "L"),
            variant(403, "White", "L"),
        ]
    }

    async fn flow_in_variants() -> (CheckoutFlow, Harness) {
        let (mut flow, harness) =
            flow_with(false, MockFulfillment::with_variants(catalog()));
        flow.generate("a wolf howling at the moon", ImageShape::Square)
            .await
            .unwrap();
        (flow, harness)
    }

    fn design_ids(flow: &CheckoutFlow) -> Vec<Uuid> {
        match flow.state() {
            CheckoutState::Variants(step) => step.designs.iter().map(|d| d.id).collect(),
            other => panic!("expected variants step, got {}", other.step_name()),
        }
    }

    fn address() -> Address {
        Address {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: None,
            country: "US".into(),
            region: Some("CA".into()),
            address1: "1 Infinite Loop".into(),
            address2: None,
            city: "Cupertino".into(),
            zip: "95014".into(),
        }
    }

    #[tokio::test]
    async fn generate_advances_to_variants_with_designs_and_variants() {
        let (flow, _) = flow_in_variants().await;
        match flow.state() {
            CheckoutState::Variants(step) => {
                assert!(!step.designs.is_empty());
                assert!(!step.available_variants.is_empty());
                assert!(step.configs.is_empty());
            }
            other => panic!("expected variants, got {}", other.step_name()),
        }
    }

    #[tokio::test]
    async fn generate_failure_reverts_to_prompt_never_stuck_in_designs() {
        let (mut flow, _) = flow_with(true, MockFulfillment::with_variants(catalog()));
        let result = flow.generate("a wolf", ImageShape::Square).await;
        assert!(result.is_err());
        match flow.state() {
            CheckoutState::Prompt { error } => assert!(error.is_some()),
            other => panic!("expected prompt, got {}", other.step_name()),
        }
    }

    #[tokio::test]
    async fn variant_fetch_retries_with_backoff_then_succeeds() {
        let fulfillment = MockFulfillment::with_variants(catalog());
        fulfillment
            .fail_variants_first
            .store(2, std::sync::atomic::Ordering::SeqCst);
        let (mut flow, harness) = flow_with(false, fulfillment);

        flow.generate("a wolf", ImageShape::Square).await.unwrap();
        assert_eq!(flow.state().step_name(), "variants");
        // Two failed attempts -> two backoff pauses.
        assert_eq!(harness.sleeper.slept.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_design_is_rejected_without_mutation() {
        let (mut flow, _) = flow_in_variants().await;
        let ids = design_ids(&flow);
        assert_eq!(ids.len(), 3, "default config generates three candidates");

        for id in &ids {
            flow.configure_design(*id, "Black", "M").unwrap();
        }
        // Re-configuring an already-selected design stays allowed.
        flow.configure_design(ids[0], "White", "L").unwrap();

        let err = flow.configure_design(Uuid::new_v4(), "Black", "M").unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownDesign(_)));
        match flow.state() {
            CheckoutState::Variants(step) => assert_eq!(step.configs.len(), 3),
            other => panic!("unexpected step {}", other.step_name()),
        }
    }

    #[tokio::test]
    async fn selection_cap_rejects_a_fourth_configured_design() {
        let (mut flow, harness) = flow_with(false, MockFulfillment::with_variants(catalog()));
        harness
            .admin
            .update(AdminConfigPatch {
                max_designs_per_generation: Some(4),
                ..Default::default()
            })
            .await
            .unwrap();
        flow.generate("a busy generation", ImageShape::Square)
            .await
            .unwrap();
        let ids = design_ids(&flow);
        assert_eq!(ids.len(), 4);

        for id in &ids[..3] {
            flow.configure_design(*id, "Black", "M").unwrap();
        }
        let err = flow.configure_design(ids[3], "Black", "M").unwrap_err();
        assert!(matches!(err, WorkflowError::TooManyDesigns { max: 3 }));
        match flow.state() {
            CheckoutState::Variants(step) => {
                assert_eq!(step.configs.len(), 3);
                assert!(!step.configs.contains_key(&ids[3]));
            }
            other => panic!("unexpected step {}", other.step_name()),
        }
    }

    #[tokio::test]
    async fn two_configured_designs_create_exactly_two_products_sequentially() {
        let (mut flow, harness) = flow_in_variants().await;
        let ids = design_ids(&flow);
        flow.configure_design(ids[0], "Black", "M").unwrap();
        flow.configure_design(ids[1], "White", "L").unwrap();

        flow.create_products().await.unwrap();

        match flow.state() {
            CheckoutState::Payment { products, .. } => assert_eq!(products.len(), 2),
            other => panic!("expected payment, got {}", other.step_name()),
        }
        let creates: Vec<String> = harness
            .fulfillment
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("create:"))
            .collect();
        assert_eq!(creates.len(), 2);
        // Sequential pacing: exactly one pause between the two creations.
        assert_eq!(harness.sleeper.slept.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn creation_failure_reverts_to_variants_with_error() {
        let fulfillment = MockFulfillment {
            fail_create_on_call: Some(2),
            variants: catalog(),
            ..Default::default()
        };
        let (mut flow, _) = flow_with(false, fulfillment);
        flow.generate("a wolf", ImageShape::Square).await.unwrap();
        let ids = design_ids(&flow);
        flow.configure_design(ids[0], "Black", "M").unwrap();
        flow.configure_design(ids[1], "Black", "L").unwrap();

        assert!(flow.create_products().await.is_err());
        match flow.state() {
            CheckoutState::Variants(step) => {
                assert!(step.error.is_some());
                assert_eq!(step.configs.len(), 2, "selections survive the revert");
            }
            other => panic!("expected variants, got {}", other.step_name()),
        }
    }

    #[tokio::test]
    async fn full_happy_path_reaches_success() {
        let (mut flow, harness) = flow_in_variants().await;
        let ids = design_ids(&flow);
        flow.configure_design(ids[0], "Black", "M").unwrap();
        flow.create_products().await.unwrap();

        let intent = flow.begin_payment().await.unwrap();
        assert_eq!(intent.amount, 2499);
        assert_eq!(flow.state().step_name(), "stripe");

        harness.payments.set_status(PaymentStatus::Succeeded);
        flow.payment_succeeded().await.unwrap();
        assert_eq!(flow.state().step_name(), "shipping");

        let confirmation = flow.submit_order(address()).await.unwrap();
        assert!(confirmation.id.starts_with("order-"));
        assert_eq!(flow.state().step_name(), "success");
    }

    #[tokio::test]
    async fn unsettled_intent_blocks_the_shipping_step() {
        let (mut flow, harness) = flow_in_variants().await;
        let ids = design_ids(&flow);
        flow.configure_design(ids[0], "Black", "M").unwrap();
        flow.create_products().await.unwrap();
        flow.begin_payment().await.unwrap();

        harness.payments.set_status(PaymentStatus::Processing);
        let err = flow.payment_succeeded().await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::PaymentNotSucceeded(PaymentStatus::Processing)
        ));
        assert_eq!(flow.state().step_name(), "stripe");
    }

    #[tokio::test]
    async fn order_failure_reverts_to_stripe_for_retry() {
        let fulfillment = MockFulfillment {
            fail_submit_order: true,
            variants: catalog(),
            ..Default::default()
        };
        let (mut flow, harness) = flow_with(false, fulfillment);
        flow.generate("a wolf", ImageShape::Square).await.unwrap();
        let ids = design_ids(&flow);
        flow.configure_design(ids[0], "Black", "M").unwrap();
        flow.create_products().await.unwrap();
        flow.begin_payment().await.unwrap();
        harness.payments.set_status(PaymentStatus::Succeeded);
        flow.payment_succeeded().await.unwrap();

        assert!(flow.submit_order(address()).await.is_err());
        assert_eq!(flow.state().step_name(), "stripe");
    }

    #[tokio::test]
    async fn cancel_deletes_every_product_even_when_one_delete_fails() {
        let fulfillment = MockFulfillment {
            fail_delete_ids: ["prod-1".to_string()].into_iter().collect(),
            variants: catalog(),
            ..Default::default()
        };
        let (mut flow, harness) = flow_with(false, fulfillment);
        flow.generate("a wolf", ImageShape::Square).await.unwrap();
        let ids = design_ids(&flow);
        flow.configure_design(ids[0], "Black", "M").unwrap();
        flow.configure_design(ids[1], "Black", "L").unwrap();
        flow.create_products().await.unwrap();

        flow.cancel().await.unwrap();

        let deletes: Vec<String> = harness
            .fulfillment
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("delete:"))
            .collect();
        assert_eq!(deletes, vec!["delete:prod-1", "delete:prod-2"]);
        assert_eq!(flow.state().step_name(), "variants");
    }

    #[tokio::test]
    async fn featured_flow_starts_in_payment_and_cancel_resets_to_prompt() {
        let fulfillment = Arc::new(MockFulfillment::with_variants(catalog()));
        let payments = Arc::new(MockPayments::default());
        let admin = Arc::new(MockAdminConfig::default());
        let sleeper = Arc::new(RecordingSleeper::default());
        let creator = ProductCreator::new(
            fulfillment.clone(),
            Arc::new(MockFetcher::default()),
            sleeper.clone(),
            FixedInterval::new(Duration::from_millis(1500)),
        );
        let featured = CreatedProduct {
            id: "prod-featured".into(),
            title: "Featured Tee".into(),
            image_url: Some("https://cdn.example/featured.png".into()),
            variant_id: 401,
            price: 2499,
        };
        let mut flow = CheckoutFlow::from_featured(
            fulfillment.clone(),
            payments,
            Arc::new(MockImages::default()),
            admin,
            sleeper,
            creator,
            featured,
        );
        assert_eq!(flow.state().step_name(), "payment");

        flow.cancel().await.unwrap();
        assert_eq!(flow.state().step_name(), "prompt");
        // The pre-existing product is never deleted.
        assert!(fulfillment.calls().iter().all(|c| !c.starts_with("delete:")));
    }

    #[tokio::test]
    async fn bypass_requires_debug_mode() {
        let (mut flow, harness) = flow_in_variants().await;
        let ids = design_ids(&flow);
        flow.configure_design(ids[0], "Black", "M").unwrap();
        flow.create_products().await.unwrap();

        assert!(matches!(
            flow.bypass_payment().await.unwrap_err(),
            WorkflowError::BypassDisabled
        ));
        assert_eq!(flow.state().step_name(), "payment");

        harness
            .admin
            .update(AdminConfigPatch {
                debug_mode: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        flow.bypass_payment().await.unwrap();
        assert_eq!(flow.state().step_name(), "shipping");
    }

    #[tokio::test]
    async fn maintenance_mode_blocks_generation() {
        let (mut flow, harness) = flow_with(false, MockFulfillment::with_variants(catalog()));
        harness
            .admin
            .update(AdminConfigPatch {
                maintenance_mode: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(matches!(
            flow.generate("a wolf", ImageShape::Square).await.unwrap_err(),
            WorkflowError::Maintenance
        ));
        assert_eq!(flow.state().step_name(), "prompt");
    }

    #[test]
    fn derive_title_caps_length_and_numbers_candidates() {
        let title = derive_title("a wolf howling at the moon in a neon synthwave style", 1);
        assert!(title.ends_with("#2"));
        assert!(title.len() <= 44);
        assert_eq!(derive_title("", 0), "Custom Design #1");
    }
}
