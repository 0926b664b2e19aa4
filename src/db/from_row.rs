//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors instead of panicking on corrupt data.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Parse a nullable string column into an optional enum.
fn parse_enum_opt<T: std::str::FromStr>(
    row: &Row,
    col: usize,
    col_name: &str,
) -> rusqlite::Result<Option<T>> {
    match row.get::<_, Option<String>>(col)? {
        Some(s) => s.parse::<T>().map(Some).map_err(|_| {
            rusqlite::Error::InvalidColumnType(
                col,
                col_name.to_string(),
                rusqlite::types::Type::Text,
            )
        }),
        None => Ok(None),
    }
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const USER_COLS: &str = "id, email, name, password_hash, google_id, business_name, business_address, business_phone, currency, logo_url, plan, created_at, updated_at";

pub const CUSTOMER_COLS: &str = "id, user_id, name, email, phone, created_at, updated_at";

pub const INVOICE_COLS: &str = "id, customer_id, subtotal, tax, total, status, payment_status, whatsapp_status, payment_link, payment_link_id, created_at";

pub const INVOICE_ITEM_COLS: &str = "id, invoice_id, name, qty, price";

// ============ FromRow Implementations ============

impl FromRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            password_hash: row.get(3)?,
            google_id: row.get(4)?,
            business_name: row.get(5)?,
            business_address: row.get(6)?,
            business_phone: row.get(7)?,
            currency: row.get(8)?,
            logo_url: row.get(9)?,
            plan: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }
}

impl FromRow for Customer {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Customer {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl FromRow for Invoice {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Invoice {
            id: row.get(0)?,
            customer_id: row.get(1)?,
            subtotal: row.get(2)?,
            tax: row.get(3)?,
            total: row.get(4)?,
            status: parse_enum(row, 5, "status")?,
            payment_status: parse_enum_opt(row, 6, "payment_status")?,
            whatsapp_status: parse_enum_opt(row, 7, "whatsapp_status")?,
            payment_link: row.get(8)?,
            payment_link_id: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

impl FromRow for InvoiceItem {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(InvoiceItem {
            id: row.get(0)?,
            invoice_id: row.get(1)?,
            name: row.get(2)?,
            qty: row.get(3)?,
            price: row.get(4)?,
        })
    }
}
