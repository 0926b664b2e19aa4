//! Razorpay payment-link client and webhook signature verification.

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::RazorpayConfig;
use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

const API_BASE: &str = "https://api.razorpay.com/v1";

/// Payment-link status Razorpay reports for a completed payment.
pub const LINK_STATUS_PAID: &str = "paid";

/// Convert a decimal amount to the integer minor-unit representation
/// (e.g. rupees to paise), rounding half-up.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[derive(Debug, Serialize)]
struct LinkCustomer<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contact: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct LinkNotify {
    sms: bool,
    email: bool,
}

#[derive(Debug, Serialize)]
struct LinkNotes<'a> {
    invoice_id: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateLinkRequest<'a> {
    amount: i64,
    currency: String,
    accept_partial: bool,
    description: String,
    customer: LinkCustomer<'a>,
    notify: LinkNotify,
    reminder_enable: bool,
    callback_url: String,
    callback_method: &'static str,
    notes: LinkNotes<'a>,
}

#[derive(Debug, Deserialize)]
struct PaymentLinkResponse {
    id: String,
    short_url: String,
    status: String,
    #[serde(default)]
    notes: serde_json::Value,
}

/// A freshly created hosted payment link.
#[derive(Debug, Clone)]
pub struct CreatedLink {
    pub id: String,
    pub short_url: String,
}

/// Result of fetching a payment link for manual verification.
#[derive(Debug, Clone)]
pub struct VerifiedLink {
    /// Raw provider status ("created", "paid", ...).
    pub status: String,
    /// Correlation id recovered from the link's notes, present only when
    /// the link reached the paid terminal state.
    pub invoice_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RazorpayClient {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(config: &RazorpayConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: API_BASE.to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        }
    }

    /// Point the client at a different API origin (local mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Create a hosted payment link for an invoice total.
    ///
    /// The invoice id is embedded as opaque metadata in `notes.invoice_id`
    /// so webhook reconciliation can recover it without a mapping table.
    pub async fn create_payment_link(
        &self,
        amount: f64,
        currency: &str,
        invoice_id: &str,
        customer_email: Option<&str>,
        customer_phone: Option<&str>,
        callback_url: &str,
    ) -> Result<CreatedLink> {
        let body = CreateLinkRequest {
            amount: to_minor_units(amount),
            currency: currency.to_uppercase(),
            accept_partial: false,
            description: format!("Invoice #{}", crate::util::short_id(invoice_id)),
            customer: LinkCustomer {
                email: customer_email,
                contact: customer_phone,
            },
            notify: LinkNotify {
                sms: true,
                email: true,
            },
            reminder_enable: true,
            callback_url: callback_url.to_string(),
            callback_method: "get",
            notes: LinkNotes { invoice_id },
        };

        let response = self
            .client
            .post(format!("{}/payment_links", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Razorpay API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Razorpay API error: {}",
                error_text
            )));
        }

        let link: PaymentLinkResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Failed to parse Razorpay response: {}", e)))?;

        Ok(CreatedLink {
            id: link.id,
            short_url: link.short_url,
        })
    }

    /// Fetch a payment link and report its status. Used for manual
    /// reconciliation when a webhook was missed.
    pub async fn fetch_payment_link(&self, link_id: &str) -> Result<VerifiedLink> {
        let response = self
            .client
            .get(format!("{}/payment_links/{}", self.base_url, link_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Razorpay API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Razorpay API error: {}",
                error_text
            )));
        }

        let link: PaymentLinkResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Failed to parse Razorpay response: {}", e)))?;

        tracing::info!(
            "Fetched payment link {}: status={}, notes={}",
            link.id,
            link.status,
            link.notes
        );

        let invoice_id = if link.status == LINK_STATUS_PAID {
            extract_invoice_id(&link.notes)
        } else {
            None
        };

        Ok(VerifiedLink {
            status: link.status,
            invoice_id,
        })
    }
}

/// Pull the correlation id out of an opaque notes bag. Notes are free-form
/// on the provider side (and serialize as `[]` when empty), so this stays
/// tolerant of any shape.
pub fn extract_invoice_id(notes: &serde_json::Value) -> Option<String> {
    notes
        .get("invoice_id")
        .and_then(|v| v.as_str())
        .map(String::from)
}

/// Verify an `x-razorpay-signature` header: hex HMAC-SHA256 of the raw
/// request body under the shared webhook secret, compared in constant time.
pub fn verify_webhook_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    let expected_bytes = expected.as_bytes();
    let provided_bytes = signature.as_bytes();

    // Length check is not constant-time, but the signature length is not
    // secret (always 64 hex chars for SHA-256).
    if expected_bytes.len() != provided_bytes.len() {
        return false;
    }

    expected_bytes.ct_eq(provided_bytes).into()
}
