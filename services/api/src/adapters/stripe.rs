//! services/api/src/adapters/stripe.rs
//!
//! This module contains the adapter for the Stripe payment processor.
//! It implements the `PaymentService` port from the `core` crate. Stripe's
//! REST API takes form-encoded requests and answers JSON.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use serde::Deserialize;
use sha2::Sha256;
use std::collections::BTreeMap;
use teeforge_core::domain::{PaymentIntent, PaymentStatus};
use teeforge_core::ports::{PaymentService, PortError, PortResult};

type HmacSha256 = Hmac<Sha256>;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `PaymentService` port against the Stripe
/// REST API.
#[derive(Clone)]
pub struct StripeAdapter {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
    webhook_secret: Option<String>,
}

impl StripeAdapter {
    /// Creates a new `StripeAdapter`.
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
            webhook_secret,
        }
    }

    async fn check(response: reqwest::Response) -> PortResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PortError::RateLimited { retry_after: None });
        }
        let body = response.text().await.unwrap_or_default();
        Err(PortError::Upstream {
            status: status.as_u16(),
            body,
        })
    }

    async fn retrieve_intent(&self, intent_id: &str) -> PortResult<PaymentIntent> {
        let response = self
            .client
            .get(format!("{}/payment_intents/{intent_id}", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let record: IntentRecord = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.to_domain())
    }
}

//=========================================================================================
// "Impure" Stripe Record Structs
//=========================================================================================

#[derive(Deserialize)]
struct IntentRecord {
    id: String,
    client_secret: String,
    amount: i64,
    currency: String,
    status: PaymentStatus,
}
impl IntentRecord {
    fn to_domain(self) -> PaymentIntent {
        PaymentIntent {
            id: self.id,
            client_secret: self.client_secret,
            amount: self.amount,
            currency: self.currency,
            status: self.status,
        }
    }
}

//=========================================================================================
// `PaymentService` Trait Implementation
//=========================================================================================

#[async_trait]
impl PaymentService for StripeAdapter {
    async fn create_payment_intent(
        &self,
        amount: i64,
        currency: &str,
        metadata: BTreeMap<String, String>,
    ) -> PortResult<PaymentIntent> {
        let mut form: Vec<(String, String)> = vec![
            ("amount".to_string(), amount.to_string()),
            ("currency".to_string(), currency.to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        for (key, value) in metadata {
            form.push((format!("metadata[{key}]"), value));
        }

        let response = self
            .client
            .post(format!("{}/payment_intents", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let record: IntentRecord = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.to_domain())
    }

    async fn get_payment_intent(&self, intent_id: &str) -> PortResult<PaymentIntent> {
        self.retrieve_intent(intent_id).await
    }

    async fn confirm_payment(&self, intent_id: &str) -> PortResult<PaymentIntent> {
        self.retrieve_intent(intent_id).await
    }

    /// Verifies the `Stripe-Signature` header: HMAC-SHA256 of
    /// `"{timestamp}.{raw_body}"` under the webhook secret, compared
    /// against every `v1=` candidate. With no secret configured the raw
    /// body is trusted as-is.
    fn verify_webhook(&self, payload: &[u8], signature: Option<&str>) -> PortResult<()> {
        let Some(secret) = &self.webhook_secret else {
            return Ok(());
        };
        let header = signature.ok_or_else(|| {
            PortError::InvalidInput("missing Stripe-Signature header".to_string())
        })?;

        let mut timestamp = None;
        let mut candidates = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => candidates.push(value),
                _ => {}
            }
        }
        let timestamp = timestamp.ok_or_else(|| {
            PortError::InvalidInput("malformed Stripe-Signature header".to_string())
        })?;
        if candidates.is_empty() {
            return Err(PortError::InvalidInput(
                "no v1 signature in Stripe-Signature header".to_string(),
            ));
        }

        for candidate in candidates {
            let Ok(expected) = hex::decode(candidate) else {
                continue;
            };
            let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            mac.update(timestamp.as_bytes());
            mac.update(b".");
            mac.update(payload);
            if mac.verify_slice(&expected).is_ok() {
                return Ok(());
            }
        }
        Err(PortError::InvalidInput(
            "webhook signature mismatch".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(webhook_secret: Option<&str>) -> StripeAdapter {
        StripeAdapter::new(
            reqwest::Client::new(),
            "https://api.stripe.com/v1",
            "sk_test_123",
            webhook_secret.map(String::from),
        )
    }

    fn sign(secret: &str, timestamp: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_passes() {
        let adapter = adapter(Some("whsec_test"));
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let header = format!("t=1712345678,v1={}", sign("whsec_test", "1712345678", payload));
        assert!(adapter.verify_webhook(payload, Some(&header)).is_ok());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let adapter = adapter(Some("whsec_test"));
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let header = format!("t=1712345678,v1={}", sign("whsec_test", "1712345678", payload));
        let tampered = br#"{"type":"payment_intent.payment_failed"}"#;
        assert!(adapter.verify_webhook(tampered, Some(&header)).is_err());
    }

    #[test]
    fn missing_header_is_rejected_when_secret_is_configured() {
        let adapter = adapter(Some("whsec_test"));
        assert!(adapter.verify_webhook(b"{}", None).is_err());
    }

    #[test]
    fn raw_body_is_trusted_without_a_configured_secret() {
        let adapter = adapter(None);
        assert!(adapter.verify_webhook(b"{}", None).is_ok());
    }

    #[test]
    fn second_v1_candidate_is_accepted() {
        let adapter = adapter(Some("whsec_test"));
        let payload = br#"{"id":"evt_1"}"#;
        let good = sign("whsec_test", "42", payload);
        let header = format!("t=42,v1={},v1={}", "0".repeat(64), good);
        assert!(adapter.verify_webhook(payload, Some(&header)).is_ok());
    }

    #[test]
    fn intent_status_strings_parse_into_the_domain_enum() {
        let record: IntentRecord = serde_json::from_str(
            r#"{
                "id": "pi_123",
                "client_secret": "pi_123_secret",
                "amount": 2499,
                "currency": "usd",
                "status": "requires_payment_method"
            }"#,
        )
        .unwrap();
        let intent = record.to_domain();
        assert_eq!(intent.status, PaymentStatus::RequiresPaymentMethod);
        assert!(!intent.status.has_succeeded());
    }
}
