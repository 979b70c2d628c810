//! Payment gateway adapter.
//!
//! Wraps the processor's Orders API for intent creation and verifies the
//! checkout confirmation signature. The signature scheme is
//! `HMAC-SHA256(gateway_order_id + "|" + payment_id, key_secret)`, hex
//! encoded, compared in constant time.

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use utoipa::ToSchema;

use crate::config::GatewayConfig;
use crate::errors::ServiceError;

type HmacSha256 = Hmac<Sha256>;

/// Gateway receipt identifiers are limited to 40 characters.
const MAX_RECEIPT_LEN: usize = 40;

/// A created gateway intent. Transient: handed to the storefront so it can
/// open the gateway UI; never persisted by itself.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentIntent {
    /// Gateway-side order id the payment UI collects against
    pub gateway_order_id: String,
    /// Amount in minor currency units (e.g. paise)
    pub amount_minor: i64,
    pub currency: String,
    /// Merchant receipt correlating the intent with a cart or frame batch
    pub receipt: String,
}

#[derive(Debug, Serialize)]
struct CreateGatewayOrder<'a> {
    /// Amount in smallest currency unit
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GatewayOrder {
    id: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    receipt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    error: GatewayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorDetail {
    code: String,
    description: String,
}

#[derive(Clone)]
pub struct PaymentGatewayClient {
    client: Client,
    config: GatewayConfig,
}

impl PaymentGatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Check whether gateway credentials are configured.
    pub fn is_configured(&self) -> bool {
        !self.config.key_id.is_empty() && !self.config.key_secret.expose_secret().is_empty()
    }

    /// Create a gateway intent for `amount` major units.
    ///
    /// The receipt is derived from `receipt_seed` plus a timestamp and fits
    /// the gateway's length limit.
    pub async fn create_intent(
        &self,
        amount: Decimal,
        receipt_seed: &str,
    ) -> Result<PaymentIntent, ServiceError> {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "amount must be greater than zero".to_string(),
            ));
        }
        if !self.is_configured() {
            return Err(ServiceError::GatewayError(
                "payment gateway credentials not configured".to_string(),
            ));
        }

        let amount_minor = to_minor_units(amount)?;
        let receipt = build_receipt(receipt_seed);

        let request = CreateGatewayOrder {
            amount: amount_minor,
            currency: &self.config.currency,
            receipt: &receipt,
        };

        let url = format!("{}/orders", self.config.api_base_url);
        metrics::counter!("framepress_gateway.intent_requests", 1);

        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.config.key_id,
                Some(self.config.key_secret.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("intent creation failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("intent creation failed: {}", e)))?;

        tracing::debug!(status = %status, "gateway create order response");

        if status.is_success() {
            let order: GatewayOrder = serde_json::from_str(&body).map_err(|e| {
                ServiceError::GatewayError(format!("malformed gateway response: {}", e))
            })?;
            tracing::info!(
                gateway_order_id = %order.id,
                amount = order.amount,
                currency = %order.currency,
                "gateway intent created"
            );
            Ok(PaymentIntent {
                gateway_order_id: order.id,
                amount_minor: order.amount,
                currency: order.currency,
                receipt: order.receipt.unwrap_or(receipt),
            })
        } else {
            let detail = serde_json::from_str::<GatewayErrorBody>(&body)
                .map(|e| format!("{}: {}", e.error.code, e.error.description))
                .unwrap_or(body);
            tracing::error!(status = %status, "gateway intent creation failed: {}", detail);
            Err(ServiceError::GatewayError(detail))
        }
    }

    /// Verify a checkout confirmation signature.
    ///
    /// Pure: no I/O. Returns `Ok(false)` on mismatch; errors only when a
    /// required field is absent.
    pub fn verify_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<bool, ServiceError> {
        if gateway_order_id.is_empty() || payment_id.is_empty() || signature.is_empty() {
            return Err(ServiceError::ValidationError(
                "gateway_order_id, payment_id and signature are required".to_string(),
            ));
        }

        let payload = format!("{}|{}", gateway_order_id, payment_id);
        let expected = compute_signature(&payload, self.config.key_secret.expose_secret())?;
        Ok(constant_time_eq(&expected, signature))
    }
}

/// Convert a major-unit amount to minor units: `round(amount * 100)`.
pub fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| ServiceError::ValidationError("amount out of range".to_string()))
}

fn build_receipt(seed: &str) -> String {
    let sanitized: String = seed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(24)
        .collect();
    let mut receipt = format!("{}-{}", sanitized, Utc::now().timestamp());
    receipt.truncate(MAX_RECEIPT_LEN);
    receipt
}

fn compute_signature(payload: &str, secret: &str) -> Result<String, ServiceError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ServiceError::InternalError("invalid signing key".to_string()))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use secrecy::Secret;

    fn test_config() -> GatewayConfig {
        GatewayConfig {
            key_id: "gw_test_123".to_string(),
            key_secret: Secret::new("my_secret_key".to_string()),
            api_base_url: "https://gateway.invalid/v1".to_string(),
            currency: "INR".to_string(),
            timeout_secs: 5,
        }
    }

    fn client() -> PaymentGatewayClient {
        PaymentGatewayClient::new(test_config()).unwrap()
    }

    #[test]
    fn amounts_convert_to_minor_units() {
        assert_eq!(to_minor_units(dec!(599)).unwrap(), 59900);
        assert_eq!(to_minor_units(dec!(499.50)).unwrap(), 49950);
        assert_eq!(to_minor_units(dec!(0.01)).unwrap(), 1);
        // round, not truncate
        assert_eq!(to_minor_units(dec!(1.005)).unwrap(), 101);
    }

    #[test]
    fn receipts_fit_the_gateway_limit() {
        let long_seed = "a".repeat(100);
        let receipt = build_receipt(&long_seed);
        assert!(receipt.len() <= MAX_RECEIPT_LEN);
        assert!(receipt.starts_with(&"a".repeat(24)));

        let receipt = build_receipt("cart id with spaces!*");
        assert!(receipt.len() <= MAX_RECEIPT_LEN);
        assert!(!receipt.contains(' '));
    }

    #[test]
    fn valid_signature_verifies() {
        let c = client();
        let expected = compute_signature("order_123|pay_456", "my_secret_key").unwrap();
        assert!(c.verify_signature("order_123", "pay_456", &expected).unwrap());
    }

    #[test]
    fn tampered_signature_is_rejected_without_error() {
        let c = client();
        let mut sig = compute_signature("order_123|pay_456", "my_secret_key").unwrap();
        // flip one hex digit
        let last = sig.pop().unwrap();
        sig.push(if last == '0' { '1' } else { '0' });
        assert!(!c.verify_signature("order_123", "pay_456", &sig).unwrap());
    }

    #[test]
    fn signature_binds_both_identifiers() {
        let c = client();
        let sig = compute_signature("order_123|pay_456", "my_secret_key").unwrap();
        assert!(!c.verify_signature("order_124", "pay_456", &sig).unwrap());
        assert!(!c.verify_signature("order_123", "pay_457", &sig).unwrap());
    }

    #[test]
    fn missing_fields_are_malformed_input() {
        let c = client();
        let err = c.verify_signature("", "pay_456", "sig").unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected_before_any_network_call() {
        let c = client();
        let err = c.create_intent(dec!(0), "seed").await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
        let err = c.create_intent(dec!(-10), "seed").await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}
