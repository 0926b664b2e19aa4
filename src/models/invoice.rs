use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{AppError, Result};

use super::Customer;

/// Primary invoice lifecycle. One-directional: `pending -> paid`, set only
/// by payment reconciliation, never by a direct PATCH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

/// Gateway-side payment state. Only ever set to `paid`, together with the
/// primary status, by webhook or manual verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
}

/// WhatsApp delivery outcome. Each send attempt overwrites the prior value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// Invoice with snapshot amounts.
///
/// `subtotal`, `tax`, and `total` are computed once at creation time and
/// never re-derived from items afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    pub id: String,
    pub customer_id: String,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub status: InvoiceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_status: Option<DeliveryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_link_id: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub name: String,
    pub qty: i64,
    pub price: f64,
}

/// Invoice with its customer and items expanded, as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub customer: Customer,
    pub items: Vec<InvoiceItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvoiceItem {
    pub name: String,
    pub qty: i64,
    pub price: f64,
}

fn validate_items(items: &[CreateInvoiceItem]) -> Result<()> {
    if items.is_empty() {
        return Err(AppError::BadRequest(
            "Invoice must have at least one item".into(),
        ));
    }
    for item in items {
        if item.name.trim().is_empty() {
            return Err(AppError::BadRequest("Item name cannot be empty".into()));
        }
        if item.qty < 1 {
            return Err(AppError::BadRequest(
                "Item quantity must be a positive integer".into(),
            ));
        }
        if item.price < 0.0 || !item.price.is_finite() {
            return Err(AppError::BadRequest(
                "Item price must be a non-negative number".into(),
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoice {
    pub customer_id: String,
    pub items: Vec<CreateInvoiceItem>,
    #[serde(default)]
    pub tax_rate: f64,
}

impl CreateInvoice {
    pub fn validate(&self) -> Result<()> {
        validate_items(&self.items)?;
        if self.tax_rate < 0.0 || !self.tax_rate.is_finite() {
            return Err(AppError::BadRequest(
                "Tax rate must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

/// Invoice patch for PATCH /invoices/{id}.
///
/// Totals are NOT recomputed server-side: a caller replacing `items` must
/// resend matching `subtotal`/`tax`/`total`, otherwise the stored snapshot
/// goes stale. Status fields are deliberately absent - `pending -> paid`
/// happens only through payment reconciliation.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateInvoice {
    pub customer_id: Option<String>,
    pub subtotal: Option<f64>,
    pub tax: Option<f64>,
    pub total: Option<f64>,
    /// Full replacement of the line items when present.
    pub items: Option<Vec<CreateInvoiceItem>>,
}

impl UpdateInvoice {
    pub fn validate(&self) -> Result<()> {
        if let Some(ref items) = self.items {
            validate_items(items)?;
        }
        for amount in [self.subtotal, self.tax, self.total].into_iter().flatten() {
            if amount < 0.0 || !amount.is_finite() {
                return Err(AppError::BadRequest(
                    "Amounts must be non-negative numbers".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Compute the creation-time amount snapshot from line items and a
/// percentage tax rate. Returns (subtotal, tax, total).
pub fn invoice_totals(items: &[CreateInvoiceItem], tax_rate: f64) -> (f64, f64, f64) {
    let subtotal: f64 = items.iter().map(|i| i.qty as f64 * i.price).sum();
    let tax = subtotal * tax_rate / 100.0;
    (subtotal, tax, subtotal + tax)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(qty: i64, price: f64) -> CreateInvoiceItem {
        CreateInvoiceItem {
            name: "item".to_string(),
            qty,
            price,
        }
    }

    #[test]
    fn test_totals_example() {
        let items = vec![item(2, 50.0), item(1, 25.0)];
        let (subtotal, tax, total) = invoice_totals(&items, 10.0);
        assert_eq!(subtotal, 125.0);
        assert_eq!(tax, 12.5);
        assert_eq!(total, 137.5);
    }

    #[test]
    fn test_totals_zero_tax() {
        let items = vec![item(3, 10.0)];
        let (subtotal, tax, total) = invoice_totals(&items, 0.0);
        assert_eq!(subtotal, 30.0);
        assert_eq!(tax, 0.0);
        assert_eq!(total, 30.0);
    }

    #[test]
    fn test_create_invoice_rejects_zero_qty() {
        let input = CreateInvoice {
            customer_id: "c1".to_string(),
            items: vec![item(0, 10.0)],
            tax_rate: 0.0,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_create_invoice_rejects_empty_items() {
        let input = CreateInvoice {
            customer_id: "c1".to_string(),
            items: vec![],
            tax_rate: 0.0,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!("paid".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Paid);
        assert_eq!(InvoiceStatus::Pending.to_string(), "pending");
        assert_eq!("sent".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::Sent);
    }
}
