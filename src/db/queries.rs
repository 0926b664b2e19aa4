use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params, types::Value};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

use super::from_row::{
    CUSTOMER_COLS, FromRow, INVOICE_COLS, INVOICE_ITEM_COLS, USER_COLS, query_all, query_one,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builder for dynamic UPDATE statements with optional fields.
/// Combines multiple field updates into a single query.
struct UpdateBuilder {
    table: &'static str,
    id: String,
    fields: Vec<(&'static str, Value)>,
    track_updated_at: bool,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: &str) -> Self {
        Self {
            table,
            id: id.to_string(),
            fields: Vec::new(),
            track_updated_at: false,
        }
    }

    fn with_updated_at(mut self) -> Self {
        self.track_updated_at = true;
        self
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    fn set_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Execute the update and return the updated entity using RETURNING.
    /// Returns None if no rows matched or there was nothing to update.
    fn execute_returning<T: FromRow>(
        mut self,
        conn: &Connection,
        returning_cols: &str,
    ) -> Result<Option<T>> {
        if self.fields.is_empty() {
            return self.fetch_unchanged(conn, returning_cols);
        }
        if self.track_updated_at {
            self.fields.push(("updated_at", now().into()));
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id.into());
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ? RETURNING {}",
            self.table,
            sets.join(", "),
            returning_cols
        );
        conn.query_row(&sql, rusqlite::params_from_iter(values), T::from_row)
            .optional()
            .map_err(Into::into)
    }

    /// Empty patch: return the current row so PATCH with no fields is a no-op
    /// read rather than an error.
    fn fetch_unchanged<T: FromRow>(
        self,
        conn: &Connection,
        returning_cols: &str,
    ) -> Result<Option<T>> {
        query_one(
            conn,
            &format!(
                "SELECT {} FROM {} WHERE id = ?1",
                returning_cols, self.table
            ),
            &[&self.id],
        )
    }
}

// ============ Users ============

pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: Option<&'a str>,
    pub google_id: Option<&'a str>,
}

pub fn create_user(conn: &Connection, input: &NewUser) -> Result<User> {
    let id = gen_id();
    let now = now();
    let email = input.email.trim().to_lowercase();

    conn.execute(
        "INSERT INTO users (id, email, name, password_hash, google_id, currency, plan, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'INR', 'free', ?6, ?7)",
        params![&id, &email, input.name, input.password_hash, input.google_id, now, now],
    )?;

    Ok(User {
        id,
        email,
        name: input.name.to_string(),
        password_hash: input.password_hash.map(String::from),
        google_id: input.google_id.map(String::from),
        business_name: None,
        business_address: None,
        business_phone: None,
        currency: "INR".to_string(),
        logo_url: None,
        plan: "free".to_string(),
        created_at: now,
        updated_at: now,
    })
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        &[&id],
    )
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let email = email.trim().to_lowercase();
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLS),
        &[&email],
    )
}

/// Update a user's business profile. Returns the updated user, or None if
/// not found.
pub fn update_user_profile(
    conn: &Connection,
    id: &str,
    input: &UpdateProfile,
) -> Result<Option<User>> {
    UpdateBuilder::new("users", id)
        .with_updated_at()
        .set_opt("name", input.name.clone())
        .set_opt("business_name", input.business_name.clone())
        .set_opt("business_address", input.business_address.clone())
        .set_opt("business_phone", input.business_phone.clone())
        .set_opt("currency", input.currency.clone())
        .set_opt("logo_url", input.logo_url.clone())
        .execute_returning(conn, USER_COLS)
}

// ============ Customers ============

pub fn create_customer(conn: &Connection, user_id: &str, input: &CreateCustomer) -> Result<Customer> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO customers (id, user_id, name, email, phone, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![&id, user_id, &input.name, &input.email, &input.phone, now, now],
    )?;

    Ok(Customer {
        id,
        user_id: user_id.to_string(),
        name: input.name.clone(),
        email: input.email.clone(),
        phone: input.phone.clone(),
        created_at: now,
        updated_at: now,
    })
}

/// Get a customer owned by the given user.
pub fn get_customer_for_user(
    conn: &Connection,
    id: &str,
    user_id: &str,
) -> Result<Option<Customer>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM customers WHERE id = ?1 AND user_id = ?2",
            CUSTOMER_COLS
        ),
        &[&id, &user_id],
    )
}

pub fn list_customers(conn: &Connection, user_id: &str) -> Result<Vec<Customer>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM customers WHERE user_id = ?1 ORDER BY created_at DESC",
            CUSTOMER_COLS
        ),
        &[&user_id],
    )
}

pub fn update_customer(
    conn: &Connection,
    id: &str,
    user_id: &str,
    input: &UpdateCustomer,
) -> Result<Option<Customer>> {
    // Ownership check before the blind UPDATE
    if get_customer_for_user(conn, id, user_id)?.is_none() {
        return Ok(None);
    }
    UpdateBuilder::new("customers", id)
        .with_updated_at()
        .set_opt("name", input.name.clone())
        .set_opt("email", input.email.clone())
        .set_opt("phone", input.phone.clone())
        .execute_returning(conn, CUSTOMER_COLS)
}

/// Delete a customer owned by the given user. Cascades to invoices and items.
pub fn delete_customer(conn: &Connection, id: &str, user_id: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM customers WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(deleted > 0)
}

// ============ Invoices ============

/// Creation-time invoice record with the amount snapshot already computed.
pub struct NewInvoice<'a> {
    pub customer_id: &'a str,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub items: &'a [CreateInvoiceItem],
}

pub fn create_invoice(conn: &Connection, input: &NewInvoice) -> Result<Invoice> {
    let id = gen_id();
    let now = now();

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO invoices (id, customer_id, subtotal, tax, total, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
        params![&id, input.customer_id, input.subtotal, input.tax, input.total, now],
    )?;
    insert_items(&tx, &id, input.items)?;
    tx.commit()?;

    Ok(Invoice {
        id,
        customer_id: input.customer_id.to_string(),
        subtotal: input.subtotal,
        tax: input.tax,
        total: input.total,
        status: InvoiceStatus::Pending,
        payment_status: None,
        whatsapp_status: None,
        payment_link: None,
        payment_link_id: None,
        created_at: now,
    })
}

fn insert_items(conn: &Connection, invoice_id: &str, items: &[CreateInvoiceItem]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO invoice_items (id, invoice_id, name, qty, price)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for item in items {
        stmt.execute(params![gen_id(), invoice_id, &item.name, item.qty, item.price])?;
    }
    Ok(())
}

pub fn get_invoice(conn: &Connection, id: &str) -> Result<Option<Invoice>> {
    query_one(
        conn,
        &format!("SELECT {} FROM invoices WHERE id = ?1", INVOICE_COLS),
        &[&id],
    )
}

pub fn list_invoice_items(conn: &Connection, invoice_id: &str) -> Result<Vec<InvoiceItem>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM invoice_items WHERE invoice_id = ?1 ORDER BY rowid",
            INVOICE_ITEM_COLS
        ),
        &[&invoice_id],
    )
}

fn expand(conn: &Connection, invoice: Invoice) -> Result<Option<InvoiceDetail>> {
    let customer = match query_one::<Customer>(
        conn,
        &format!("SELECT {} FROM customers WHERE id = ?1", CUSTOMER_COLS),
        &[&invoice.customer_id],
    )? {
        Some(c) => c,
        None => return Ok(None),
    };
    let items = list_invoice_items(conn, &invoice.id)?;
    Ok(Some(InvoiceDetail {
        invoice,
        customer,
        items,
    }))
}

/// Get an invoice with customer and items expanded, scoped to the owning
/// user via the customer reference.
pub fn get_invoice_detail_for_user(
    conn: &Connection,
    id: &str,
    user_id: &str,
) -> Result<Option<InvoiceDetail>> {
    let invoice: Option<Invoice> = query_one(
        conn,
        &format!(
            "SELECT {} FROM invoices i WHERE i.id = ?1
             AND EXISTS (SELECT 1 FROM customers c WHERE c.id = i.customer_id AND c.user_id = ?2)",
            invoice_cols_qualified()
        ),
        &[&id, &user_id],
    )?;
    match invoice {
        Some(inv) => expand(conn, inv),
        None => Ok(None),
    }
}

fn invoice_cols_qualified() -> String {
    INVOICE_COLS
        .split(", ")
        .map(|c| format!("i.{}", c))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn list_invoice_details_for_user(conn: &Connection, user_id: &str) -> Result<Vec<InvoiceDetail>> {
    let invoices: Vec<Invoice> = query_all(
        conn,
        &format!(
            "SELECT {} FROM invoices i
             JOIN customers c ON c.id = i.customer_id
             WHERE c.user_id = ?1
             ORDER BY i.created_at DESC",
            invoice_cols_qualified()
        ),
        &[&user_id],
    )?;
    let mut details = Vec::with_capacity(invoices.len());
    for invoice in invoices {
        if let Some(detail) = expand(conn, invoice)? {
            details.push(detail);
        }
    }
    Ok(details)
}

/// Patch an invoice. Passthrough by contract: totals are NOT recomputed from
/// items here - callers resend correct amounts. Replacing `items` swaps the
/// full line-item set in the same transaction.
pub fn update_invoice(conn: &Connection, id: &str, input: &UpdateInvoice) -> Result<Option<Invoice>> {
    let tx = conn.unchecked_transaction()?;

    let updated: Option<Invoice> = UpdateBuilder::new("invoices", id)
        .set_opt("customer_id", input.customer_id.clone())
        .set_opt("subtotal", input.subtotal)
        .set_opt("tax", input.tax)
        .set_opt("total", input.total)
        .execute_returning(&tx, INVOICE_COLS)?;

    let Some(invoice) = updated else {
        return Ok(None);
    };

    if let Some(ref items) = input.items {
        tx.execute(
            "DELETE FROM invoice_items WHERE invoice_id = ?1",
            params![id],
        )?;
        insert_items(&tx, id, items)?;
    }

    tx.commit()?;
    Ok(Some(invoice))
}

pub fn delete_invoice(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM invoices WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Record the outcome of a WhatsApp send attempt. Overwrites any prior value.
pub fn set_whatsapp_status(conn: &Connection, id: &str, status: DeliveryStatus) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE invoices SET whatsapp_status = ?1 WHERE id = ?2",
        params![status.to_string(), id],
    )?;
    Ok(updated > 0)
}

pub fn set_payment_link(conn: &Connection, id: &str, link: &str, link_id: &str) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE invoices SET payment_link = ?1, payment_link_id = ?2 WHERE id = ?3",
        params![link, link_id, id],
    )?;
    Ok(updated > 0)
}

/// Reconcile a completed payment: set both the primary status and the
/// gateway payment status to `paid`. A flat assignment, so replaying the
/// same event is harmless.
pub fn mark_invoice_paid(conn: &Connection, id: &str) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE invoices SET status = 'paid', payment_status = 'paid' WHERE id = ?1",
        params![id],
    )?;
    Ok(updated > 0)
}
