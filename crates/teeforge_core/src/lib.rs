pub mod cache;
pub mod creation;
pub mod domain;
pub mod pacing;
pub mod ports;
pub mod search;
pub mod workflow;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cache::{CacheStats, TtlCache};
pub use creation::{CreationSettings, ProductCreator, MAX_DESIGNS_PER_ORDER, MAX_UPLOAD_BYTES};
pub use domain::{
    AdminConfig, AdminConfigPatch, Address, Blueprint, CreatedProduct, Design, DesignConfig,
    GeneratedImage, ImageBlob, ImageShape, ImageSource, LineItem, NewProduct, NewProductVariant,
    OrderConfirmation, OrderRequest, PaymentIntent, PaymentStatus, PrintProvider, Product,
    ProductVariant, UploadedImage, Variant, VariantOptions,
};
pub use ports::{
    AdminConfigService, FulfillmentService, ImageFetcher, ImageGenerationService, PaymentService,
    PortError, PortResult, Sleeper, UpstreamResponse,
};
pub use workflow::{
    CheckoutFlow, CheckoutSource, CheckoutState, PaymentEvidence, VariantsStep, WorkflowError,
};
