use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::user::validate_email_format;

/// Customer of a user. Invoices hold a reference to it, not a copy.
#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CreateCustomer {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name cannot be empty".into()));
        }
        if let Some(ref email) = self.email {
            validate_email_format(email)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCustomer {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl UpdateCustomer {
    pub fn validate(&self) -> Result<()> {
        if let Some(ref name) = self.name {
            if name.trim().is_empty() {
                return Err(AppError::BadRequest("Name cannot be empty".into()));
            }
        }
        if let Some(ref email) = self.email {
            validate_email_format(email)?;
        }
        Ok(())
    }
}
