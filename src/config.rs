use std::env;

/// Razorpay API credentials. Present only when both keys are configured;
/// payment-link endpoints degrade to a null sentinel otherwise.
#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
}

/// Twilio credentials for the WhatsApp transport.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number, with or without the `whatsapp:` channel prefix.
    pub whatsapp_number: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Public frontend origin, used for invoice deep links and payment callbacks.
    pub frontend_url: String,
    /// HS256 secret for bearer tokens.
    pub token_secret: String,
    /// Currency code passed to the payment gateway for every link.
    pub currency: String,
    /// Country code prepended to destination numbers that lack a `+` prefix.
    pub default_country_code: String,
    pub razorpay: Option<RazorpayConfig>,
    /// Shared secret for webhook signature verification. Events are rejected
    /// when this is unset.
    pub webhook_secret: Option<String>,
    pub twilio: Option<TwilioConfig>,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("BILLABLE_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let token_secret = env::var("TOKEN_SECRET").unwrap_or_else(|_| {
            tracing::warn!(
                "TOKEN_SECRET not set; using a random per-process secret (tokens will not survive restarts)"
            );
            uuid::Uuid::new_v4().to_string()
        });

        let razorpay = match (
            env::var("RAZORPAY_KEY_ID").ok(),
            env::var("RAZORPAY_KEY_SECRET").ok(),
        ) {
            (Some(key_id), Some(key_secret)) => Some(RazorpayConfig { key_id, key_secret }),
            _ => {
                tracing::warn!("Razorpay credentials not found; payment links are disabled");
                None
            }
        };

        let twilio = match (
            env::var("TWILIO_ACCOUNT_SID").ok(),
            env::var("TWILIO_AUTH_TOKEN").ok(),
            env::var("TWILIO_WHATSAPP_NUMBER").ok(),
        ) {
            (Some(account_sid), Some(auth_token), Some(whatsapp_number)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                whatsapp_number,
            }),
            _ => {
                tracing::warn!("Twilio credentials not found; WhatsApp delivery is disabled");
                None
            }
        };

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "billable.db".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            token_secret,
            currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
            default_country_code: env::var("WHATSAPP_DEFAULT_COUNTRY_CODE")
                .unwrap_or_else(|_| "+91".to_string()),
            razorpay,
            webhook_secret: env::var("RAZORPAY_WEBHOOK_SECRET").ok(),
            twilio,
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
