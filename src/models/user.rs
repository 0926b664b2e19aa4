use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Basic email format validation.
///
/// Intentionally permissive - a sanity check, not RFC 5322 compliance.
pub(crate) fn validate_email_format(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(AppError::BadRequest("Email cannot be empty".into()));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(AppError::BadRequest("Invalid email format".into()));
    }

    let (local, domain) = (parts[0], parts[1]);

    if local.is_empty() || local.contains(' ') {
        return Err(AppError::BadRequest("Invalid email format".into()));
    }

    if domain.is_empty()
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(AppError::BadRequest("Invalid email format".into()));
    }

    Ok(())
}

/// User identity plus business profile. Owns customers and invoices.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    /// bcrypt hash; None for external-identity users. Never serialized.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_phone: Option<String>,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    pub plan: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<()> {
        validate_email_format(&self.email)?;
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name cannot be empty".into()));
        }
        if self.password.len() < 8 {
            return Err(AppError::BadRequest(
                "Password must be at least 8 characters".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Business profile patch for PATCH /users/me.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub business_name: Option<String>,
    pub business_address: Option<String>,
    pub business_phone: Option<String>,
    pub currency: Option<String>,
    pub logo_url: Option<String>,
}

impl UpdateProfile {
    pub fn validate(&self) -> Result<()> {
        if let Some(ref name) = self.name {
            if name.trim().is_empty() {
                return Err(AppError::BadRequest("Name cannot be empty".into()));
            }
        }
        if let Some(ref currency) = self.currency {
            if currency.trim().is_empty() {
                return Err(AppError::BadRequest("Currency cannot be empty".into()));
            }
        }
        Ok(())
    }
}

/// Public user fields returned from auth endpoints alongside the token.
#[derive(Debug, Serialize)]
pub struct AuthUserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub plan: String,
}

impl From<&User> for AuthUserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            plan: user.plan.clone(),
        }
    }
}
