//! Bearer token issuing and validation (HS256).

use std::sync::Arc;

use jwt_simple::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const ISSUER: &str = "billable";
const TOKEN_VALID_DAYS: u64 = 7;

/// Custom claims carried in a session token. The user id travels in the
/// standard `sub` claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    pub email: String,
}

/// Signs and verifies session tokens with a shared HS256 secret.
/// Cheaply cloneable; lives on `AppState`.
#[derive(Clone)]
pub struct TokenSigner {
    key: Arc<HS256Key>,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            key: Arc::new(HS256Key::from_bytes(secret.as_bytes())),
        }
    }

    pub fn sign(&self, user_id: &str, email: &str) -> Result<String> {
        let claims = Claims::with_custom_claims(
            AuthClaims {
                email: email.to_string(),
            },
            Duration::from_days(TOKEN_VALID_DAYS),
        )
        .with_issuer(ISSUER)
        .with_subject(user_id);

        self.key
            .authenticate(claims)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify a token and return (user_id, claims).
    pub fn verify(&self, token: &str) -> Result<(String, AuthClaims)> {
        let mut allowed_issuers = std::collections::HashSet::new();
        allowed_issuers.insert(ISSUER.to_string());

        let options = VerificationOptions {
            allowed_issuers: Some(allowed_issuers),
            ..Default::default()
        };

        let verified = self
            .key
            .verify_token::<AuthClaims>(token, Some(options))
            .map_err(|e| {
                tracing::debug!("Token verification failed: {}", e);
                AppError::Unauthorized
            })?;

        let user_id = verified.subject.ok_or(AppError::Unauthorized)?;
        Ok((user_id, verified.custom))
    }
}
