use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Users (identity + business profile)
        -- password_hash is NULL for external-identity users (google_id set)
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            password_hash TEXT,
            google_id TEXT UNIQUE,
            business_name TEXT,
            business_address TEXT,
            business_phone TEXT,
            currency TEXT NOT NULL DEFAULT 'INR',
            logo_url TEXT,
            plan TEXT NOT NULL DEFAULT 'free',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

        -- Customers (owned by a user)
        CREATE TABLE IF NOT EXISTS customers (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_customers_user ON customers(user_id);

        -- Invoices (amounts are a point-in-time snapshot, never re-derived)
        -- status: primary lifecycle, pending -> paid via reconciliation only
        -- payment_status / whatsapp_status: independent secondary fields
        CREATE TABLE IF NOT EXISTS invoices (
            id TEXT PRIMARY KEY,
            customer_id TEXT NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
            subtotal REAL NOT NULL,
            tax REAL NOT NULL,
            total REAL NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'paid')),
            payment_status TEXT CHECK (payment_status IS NULL OR payment_status = 'paid'),
            whatsapp_status TEXT CHECK (whatsapp_status IS NULL OR whatsapp_status IN ('sent', 'failed')),
            payment_link TEXT,
            payment_link_id TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_invoices_customer ON invoices(customer_id);

        -- Invoice line items (composition: deleted with the invoice)
        CREATE TABLE IF NOT EXISTS invoice_items (
            id TEXT PRIMARY KEY,
            invoice_id TEXT NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            qty INTEGER NOT NULL CHECK (qty > 0),
            price REAL NOT NULL CHECK (price >= 0)
        );
        CREATE INDEX IF NOT EXISTS idx_invoice_items_invoice ON invoice_items(invoice_id);
        "#,
    )?;
    Ok(())
}
