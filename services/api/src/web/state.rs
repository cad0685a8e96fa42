//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::{Arc, Mutex};
use teeforge_core::cache::{CacheStats, TtlCache};
use teeforge_core::creation::ProductCreator;
use teeforge_core::domain::{Blueprint, PrintProvider, Product, Variant};
use teeforge_core::pacing::FixedInterval;
use teeforge_core::ports::{
    AdminConfigService, FulfillmentService, ImageFetcher, ImageGenerationService, PaymentService,
    Sleeper, UpstreamResponse,
};

//=========================================================================================
// Named caches
//=========================================================================================

/// The server's in-memory caches. Process-global, `Mutex`-guarded,
/// last-write-wins; acceptable because the values are read-mostly catalog
/// data. Restart clears everything.
#[derive(Default)]
pub struct Caches {
    /// Gateway GET responses, keyed `"METHOD:path"`.
    pub proxy: Mutex<TtlCache<UpstreamResponse>>,
    pub blueprints: Mutex<TtlCache<Vec<Blueprint>>>,
    pub providers: Mutex<TtlCache<Vec<PrintProvider>>>,
    pub variants: Mutex<TtlCache<Vec<Variant>>>,
    /// The shop's published products.
    pub products: Mutex<TtlCache<Vec<Product>>>,
}

impl Caches {
    /// Stats for every named cache, for the introspection endpoint.
    pub fn stats(&self) -> Vec<(&'static str, CacheStats)> {
        vec![
            ("proxy", self.proxy.lock().unwrap().stats()),
            ("blueprints", self.blueprints.lock().unwrap().stats()),
            ("providers", self.providers.lock().unwrap().stats()),
            ("variants", self.variants.lock().unwrap().stats()),
            ("products", self.products.lock().unwrap().stats()),
        ]
    }

    /// Drops every catalog cache (the manual clear endpoint).
    pub fn clear_catalog(&self) {
        self.blueprints.lock().unwrap().clear();
        self.providers.lock().unwrap().clear();
        self.variants.lock().unwrap().clear();
    }
}

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all
/// handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub fulfillment: Arc<dyn FulfillmentService>,
    pub payments: Arc<dyn PaymentService>,
    pub images: Arc<dyn ImageGenerationService>,
    pub fetcher: Arc<dyn ImageFetcher>,
    pub admin: Arc<dyn AdminConfigService>,
    pub sleeper: Arc<dyn Sleeper>,
    pub caches: Caches,
}

impl AppState {
    /// A product creator over this state's port handles, with the standard
    /// inter-creation pacing.
    pub fn creator(&self) -> ProductCreator {
        ProductCreator::new(
            self.fulfillment.clone(),
            self.fetcher.clone(),
            self.sleeper.clone(),
            FixedInterval::default(),
        )
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use teeforge_core::testing::{
        MockAdminConfig, MockFetcher, MockFulfillment, MockImages, MockPayments, RecordingSleeper,
    };

    /// An `AppState` over port doubles, for handler-level tests.
    pub fn state_with(
        fulfillment: Arc<MockFulfillment>,
        admin: Arc<MockAdminConfig>,
    ) -> Arc<AppState> {
        let config = Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            log_level: tracing::Level::INFO,
            printify_api_base: "http://localhost:9/v1".to_string(),
            printify_api_token: Some("test-token".to_string()),
            printify_shop_id: "1".to_string(),
            stripe_api_base: "http://localhost:9/v1".to_string(),
            stripe_secret_key: Some("sk_test".to_string()),
            stripe_webhook_secret: None,
            openai_api_key: Some("sk-test".to_string()),
            admin_password: "correct horse".to_string(),
            admin_config_path: std::env::temp_dir().join("teeforge-test-admin.json"),
        };
        Arc::new(AppState {
            config: Arc::new(config),
            fulfillment,
            payments: Arc::new(MockPayments::default()),
            images: Arc::new(MockImages::default()),
            fetcher: Arc::new(MockFetcher::default()),
            admin,
            sleeper: Arc::new(RecordingSleeper::default()),
            caches: Caches::default(),
        })
    }
}
