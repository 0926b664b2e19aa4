//! WhatsApp delivery via the Twilio Messages API.

use reqwest::Client;
use serde::Deserialize;

use crate::config::TwilioConfig;
use crate::error::{AppError, Result};

const API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Normalize a destination phone number for the WhatsApp channel: numbers
/// without a leading `+` get `default_country_code` prepended, then the
/// `whatsapp:` transport prefix is ensured.
///
/// The country-code default is a locale-specific heuristic carried over from
/// the original deployment; it is configurable, not hardcoded.
pub fn normalize_destination(phone: &str, default_country_code: &str) -> String {
    let trimmed = phone.trim();
    if let Some(rest) = trimmed.strip_prefix("whatsapp:") {
        return format!("whatsapp:{}", e164_or_default(rest, default_country_code));
    }
    format!("whatsapp:{}", e164_or_default(trimmed, default_country_code))
}

fn e164_or_default(phone: &str, default_country_code: &str) -> String {
    if phone.starts_with('+') {
        phone.to_string()
    } else {
        format!("{}{}", default_country_code, phone)
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

#[derive(Debug, Clone)]
pub struct WhatsappClient {
    client: Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    /// Sender, already `whatsapp:`-prefixed.
    from: String,
    default_country_code: String,
}

impl WhatsappClient {
    pub fn new(config: &TwilioConfig, default_country_code: &str) -> Self {
        let from = if config.whatsapp_number.starts_with("whatsapp:") {
            config.whatsapp_number.clone()
        } else {
            format!("whatsapp:{}", config.whatsapp_number)
        };
        Self {
            client: Client::new(),
            base_url: API_BASE.to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from,
            default_country_code: default_country_code.to_string(),
        }
    }

    /// Point the client at a different API origin (local mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Send a message and return the transport message SID.
    /// Transport errors propagate to the caller.
    pub async fn send(&self, to: &str, body: &str, media_url: Option<&str>) -> Result<String> {
        let to = normalize_destination(to, &self.default_country_code);

        tracing::info!("Sending WhatsApp message from {} to {}", self.from, to);

        let mut form = vec![
            ("From", self.from.clone()),
            ("To", to),
            ("Body", body.to_string()),
        ];
        if let Some(url) = media_url {
            form.push(("MediaUrl", url.to_string()));
        }

        let response = self
            .client
            .post(format!(
                "{}/Accounts/{}/Messages.json",
                self.base_url, self.account_sid
            ))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Twilio API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Twilio API error: {}",
                error_text
            )));
        }

        let message: MessageResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Failed to parse Twilio response: {}", e)))?;

        tracing::info!("WhatsApp message sent: {}", message.sid);
        Ok(message.sid)
    }
}
