//! Fixed-layout PDF rendering for invoices.
//!
//! Deterministic for a given invoice snapshot. Every call renders from
//! scratch; nothing is cached or persisted.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

use crate::error::{AppError, Result};
use crate::models::{Customer, InvoiceDetail, User};
use crate::util::short_id;

const PAGE_WIDTH: f64 = 210.0;
const PAGE_HEIGHT: f64 = 297.0;
const MARGIN: f64 = 20.0;
const ROW_HEIGHT: f64 = 8.0;
// Keep room for the totals block at the bottom of a page
const MIN_Y: f64 = 40.0;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn money(currency: &str, amount: f64) -> String {
    format!("{} {:.2}", currency, amount)
}

fn item_header(layer: &PdfLayerReference, fonts: &Fonts, y: f64) {
    layer.use_text("Item", 11.0, Mm(MARGIN), Mm(y), &fonts.bold);
    layer.use_text("Qty", 11.0, Mm(110.0), Mm(y), &fonts.bold);
    layer.use_text("Price", 11.0, Mm(130.0), Mm(y), &fonts.bold);
    layer.use_text("Total", 11.0, Mm(160.0), Mm(y), &fonts.bold);
}

/// Render an invoice to PDF bytes: business header, customer block,
/// itemized table (paginated when it overflows), and the amount snapshot.
pub fn render_invoice(business: &User, detail: &InvoiceDetail) -> Result<Vec<u8>> {
    let title = format!("Invoice #{}", short_id(&detail.invoice.id));
    let (doc, page, layer) =
        PdfDocument::new(title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AppError::Internal(format!("PDF font error: {}", e)))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| AppError::Internal(format!("PDF font error: {}", e)))?,
    };

    let mut layer = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT - 25.0;

    // Header: document title left, business block right
    layer.use_text("INVOICE", 24.0, Mm(MARGIN), Mm(y), &fonts.bold);
    let business_name = business
        .business_name
        .as_deref()
        .unwrap_or(business.name.as_str());
    layer.use_text(business_name, 12.0, Mm(120.0), Mm(y), &fonts.bold);
    y -= ROW_HEIGHT;
    layer.use_text(
        format!("#{}", short_id(&detail.invoice.id)),
        11.0,
        Mm(MARGIN),
        Mm(y),
        &fonts.regular,
    );
    if let Some(ref address) = business.business_address {
        layer.use_text(address.as_str(), 10.0, Mm(120.0), Mm(y), &fonts.regular);
    }
    y -= ROW_HEIGHT;
    if let Some(ref phone) = business.business_phone {
        layer.use_text(phone.as_str(), 10.0, Mm(120.0), Mm(y), &fonts.regular);
    }
    y -= ROW_HEIGHT * 2.0;

    // Customer block
    y = customer_block(&layer, &fonts, &detail.customer, y);
    y -= ROW_HEIGHT;

    item_header(&layer, &fonts, y);
    y -= ROW_HEIGHT;

    let currency = business.currency.as_str();

    for item in &detail.items {
        if y < MIN_Y {
            let (next_page, next_layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            layer = doc.get_page(next_page).get_layer(next_layer);
            y = PAGE_HEIGHT - 25.0;
            item_header(&layer, &fonts, y);
            y -= ROW_HEIGHT;
        }
        layer.use_text(item.name.as_str(), 10.0, Mm(MARGIN), Mm(y), &fonts.regular);
        layer.use_text(item.qty.to_string(), 10.0, Mm(110.0), Mm(y), &fonts.regular);
        layer.use_text(money(currency, item.price), 10.0, Mm(130.0), Mm(y), &fonts.regular);
        layer.use_text(
            money(currency, item.qty as f64 * item.price),
            10.0,
            Mm(160.0),
            Mm(y),
            &fonts.regular,
        );
        y -= ROW_HEIGHT;
    }

    // Totals: the stored snapshot, not recomputed from items
    y -= ROW_HEIGHT;
    layer.use_text("Subtotal:", 11.0, Mm(130.0), Mm(y), &fonts.regular);
    layer.use_text(
        money(currency, detail.invoice.subtotal),
        11.0,
        Mm(160.0),
        Mm(y),
        &fonts.regular,
    );
    y -= ROW_HEIGHT;
    layer.use_text("Tax:", 11.0, Mm(130.0), Mm(y), &fonts.regular);
    layer.use_text(
        money(currency, detail.invoice.tax),
        11.0,
        Mm(160.0),
        Mm(y),
        &fonts.regular,
    );
    y -= ROW_HEIGHT;
    layer.use_text("Total:", 12.0, Mm(130.0), Mm(y), &fonts.bold);
    layer.use_text(
        money(currency, detail.invoice.total),
        12.0,
        Mm(160.0),
        Mm(y),
        &fonts.bold,
    );

    layer.use_text(
        "Thank you for your business!",
        9.0,
        Mm(MARGIN),
        Mm(12.0),
        &fonts.regular,
    );

    doc.save_to_bytes()
        .map_err(|e| AppError::Internal(format!("PDF render error: {}", e)))
}

fn customer_block(layer: &PdfLayerReference, fonts: &Fonts, customer: &Customer, mut y: f64) -> f64 {
    layer.use_text("Bill To:", 12.0, Mm(MARGIN), Mm(y), &fonts.bold);
    y -= ROW_HEIGHT;
    layer.use_text(customer.name.as_str(), 11.0, Mm(MARGIN), Mm(y), &fonts.regular);
    y -= ROW_HEIGHT;
    if let Some(ref email) = customer.email {
        layer.use_text(email.as_str(), 10.0, Mm(MARGIN), Mm(y), &fonts.regular);
        y -= ROW_HEIGHT;
    }
    if let Some(ref phone) = customer.phone {
        layer.use_text(phone.as_str(), 10.0, Mm(MARGIN), Mm(y), &fonts.regular);
        y -= ROW_HEIGHT;
    }
    y
}
