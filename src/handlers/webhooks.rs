use axum::{body::Bytes, extract::State, http::HeaderMap, routing::post, Router};
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::payments::{extract_invoice_id, verify_webhook_signature};

const SIGNATURE_HEADER: &str = "x-razorpay-signature";

const EVENT_LINK_PAID: &str = "payment_link.paid";
const EVENT_PAYMENT_CAPTURED: &str = "payment.captured";

pub fn router() -> Router<AppState> {
    Router::new().route("/payment/webhook", post(handle_payment_webhook))
}

/// Razorpay webhook envelope. Only the entities carrying our correlation
/// notes are modeled; everything else in the payload is ignored.
#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    event: String,
    #[serde(default)]
    payload: WebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPayload {
    payment_link: Option<EntityWrapper>,
    payment: Option<EntityWrapper>,
}

#[derive(Debug, Deserialize)]
struct EntityWrapper {
    entity: WebhookEntity,
}

#[derive(Debug, Deserialize)]
struct WebhookEntity {
    #[serde(default)]
    notes: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct WebhookAck {
    status: &'static str,
}

/// Recover the invoice id from a paid-event envelope.
///
/// Returns None for events we don't act on and for captures missing the
/// correlation note. The payment_link entity is checked before the payment
/// entity: for `payment_link.paid` both are present and the link's notes
/// are the authoritative copy.
fn correlate(envelope: &WebhookEnvelope) -> Option<String> {
    if envelope.event != EVENT_LINK_PAID && envelope.event != EVENT_PAYMENT_CAPTURED {
        return None;
    }
    let payload = &envelope.payload;
    payload
        .payment_link
        .as_ref()
        .and_then(|w| extract_invoice_id(&w.entity.notes))
        .or_else(|| {
            payload
                .payment
                .as_ref()
                .and_then(|w| extract_invoice_id(&w.entity.notes))
        })
}

/// Razorpay payment webhook.
///
/// The raw body is verified against `x-razorpay-signature` before parsing.
/// Events arriving while no webhook secret is configured are rejected, not
/// trusted. Verified events are always acked with `{"status":"ok"}` so the
/// provider stops retrying, whether or not they correlate to an invoice.
pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let Some(secret) = state.webhook_secret.as_deref() else {
        tracing::warn!("Webhook received but no webhook secret is configured; rejecting");
        return Err(AppError::Unauthorized);
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    if !verify_webhook_signature(secret, &body, signature) {
        tracing::warn!("Webhook signature verification failed");
        return Err(AppError::Unauthorized);
    }

    let envelope: WebhookEnvelope = serde_json::from_slice(&body)?;

    match correlate(&envelope) {
        Some(invoice_id) => {
            let conn = state.db.get()?;
            if queries::mark_invoice_paid(&conn, &invoice_id)? {
                tracing::info!(
                    "Invoice {} reconciled as paid via webhook ({})",
                    invoice_id,
                    envelope.event
                );
            } else {
                tracing::warn!(
                    "Webhook {} references unknown invoice {}",
                    envelope.event,
                    invoice_id
                );
            }
        }
        None => {
            tracing::debug!("Ignoring webhook event {}", envelope.event);
        }
    }

    Ok(Json(WebhookAck { status: "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> WebhookEnvelope {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_correlate_payment_link_paid() {
        let envelope = parse(
            r#"{"event":"payment_link.paid","payload":{
                "payment_link":{"entity":{"notes":{"invoice_id":"inv-1"}}},
                "payment":{"entity":{"notes":{"invoice_id":"inv-wrong"}}}
            }}"#,
        );
        assert_eq!(correlate(&envelope), Some("inv-1".to_string()));
    }

    #[test]
    fn test_correlate_payment_captured_falls_back_to_payment_entity() {
        let envelope = parse(
            r#"{"event":"payment.captured","payload":{
                "payment":{"entity":{"notes":{"invoice_id":"inv-2"}}}
            }}"#,
        );
        assert_eq!(correlate(&envelope), Some("inv-2".to_string()));
    }

    #[test]
    fn test_correlate_ignores_unrelated_event() {
        let envelope = parse(
            r#"{"event":"refund.processed","payload":{
                "payment":{"entity":{"notes":{"invoice_id":"inv-3"}}}
            }}"#,
        );
        assert_eq!(correlate(&envelope), None);
    }

    #[test]
    fn test_correlate_missing_notes() {
        // Razorpay serializes empty notes as an empty array.
        let envelope = parse(
            r#"{"event":"payment.captured","payload":{
                "payment":{"entity":{"notes":[]}}
            }}"#,
        );
        assert_eq!(correlate(&envelope), None);
    }

    #[test]
    fn test_envelope_tolerates_missing_payload() {
        let envelope = parse(r#"{"event":"payment_link.expired"}"#);
        assert_eq!(correlate(&envelope), None);
    }
}
