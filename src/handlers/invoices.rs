use axum::{
    extract::{Extension, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Router,
};
use serde::Serialize;

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::middleware::AuthUser;
use crate::models::{invoice_totals, CreateInvoice, InvoiceDetail, UpdateInvoice};
use crate::payments::LINK_STATUS_PAID;
use crate::pdf;
use crate::util::short_id;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/invoices", post(create_invoice))
        .route("/invoices", get(list_invoices))
        .route("/invoices/{id}", get(get_invoice))
        .route("/invoices/{id}", patch(update_invoice))
        .route("/invoices/{id}", delete(delete_invoice))
        .route("/invoices/{id}/export/pdf", post(export_pdf))
        .route("/invoices/{id}/send-whatsapp", post(send_whatsapp))
        .route("/invoices/{id}/pay-link", post(create_pay_link))
        .route("/invoices/{id}/verify-payment", post(verify_payment))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<CreateInvoice>,
) -> Result<Json<InvoiceDetail>> {
    input.validate()?;

    let conn = state.db.get()?;

    // The customer reference is part of the request payload, so a bad or
    // foreign id is a validation failure rather than a 404.
    let customer = queries::get_customer_for_user(&conn, &input.customer_id, &auth.id)?
        .ok_or(AppError::BadRequest("Customer not found".into()))?;

    let (subtotal, tax, total) = invoice_totals(&input.items, input.tax_rate);
    let invoice = queries::create_invoice(
        &conn,
        &queries::NewInvoice {
            customer_id: &customer.id,
            subtotal,
            tax,
            total,
            items: &input.items,
        },
    )?;

    let items = queries::list_invoice_items(&conn, &invoice.id)?;
    Ok(Json(InvoiceDetail {
        invoice,
        customer,
        items,
    }))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<InvoiceDetail>>> {
    let conn = state.db.get()?;
    let invoices = queries::list_invoice_details_for_user(&conn, &auth.id)?;
    Ok(Json(invoices))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<InvoiceDetail>> {
    let conn = state.db.get()?;
    let detail = queries::get_invoice_detail_for_user(&conn, &id, &auth.id)?
        .ok_or(AppError::NotFound("Invoice".into()))?;
    Ok(Json(detail))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(input): Json<UpdateInvoice>,
) -> Result<Json<InvoiceDetail>> {
    input.validate()?;

    let conn = state.db.get()?;

    if queries::get_invoice_detail_for_user(&conn, &id, &auth.id)?.is_none() {
        return Err(AppError::NotFound("Invoice".into()));
    }

    // Re-pointing the invoice at another customer must stay within the
    // caller's own customers.
    if let Some(ref customer_id) = input.customer_id {
        if queries::get_customer_for_user(&conn, customer_id, &auth.id)?.is_none() {
            return Err(AppError::BadRequest("Customer not found".into()));
        }
    }

    queries::update_invoice(&conn, &id, &input)?;

    let detail = queries::get_invoice_detail_for_user(&conn, &id, &auth.id)?
        .ok_or(AppError::NotFound("Invoice".into()))?;
    Ok(Json(detail))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let conn = state.db.get()?;

    if queries::get_invoice_detail_for_user(&conn, &id, &auth.id)?.is_none() {
        return Err(AppError::NotFound("Invoice".into()));
    }

    queries::delete_invoice(&conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Render the invoice as a PDF. The document is produced fresh on every
/// call and never stored.
pub async fn export_pdf(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let conn = state.db.get()?;

    let detail = queries::get_invoice_detail_for_user(&conn, &id, &auth.id)?
        .ok_or(AppError::NotFound("Invoice".into()))?;
    let business =
        queries::get_user_by_id(&conn, &auth.id)?.ok_or(AppError::NotFound("User".into()))?;
    drop(conn);

    let bytes = pdf::render_invoice(&business, &detail)?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"invoice-{}.pdf\"", short_id(&id)),
        ),
    ];
    Ok((headers, bytes))
}

#[derive(Debug, Serialize)]
pub struct SendResult {
    pub success: bool,
    pub message: String,
}

/// Send the invoice to the customer over WhatsApp and record the outcome.
///
/// Fire-and-record: a transport failure is persisted as `failed` on the
/// invoice and then propagated, so the caller sees the error and the record
/// keeps the last delivery outcome.
pub async fn send_whatsapp(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<SendResult>> {
    let conn = state.db.get()?;
    let detail = queries::get_invoice_detail_for_user(&conn, &id, &auth.id)?
        .ok_or(AppError::NotFound("Invoice".into()))?;
    drop(conn);

    let phone = detail
        .customer
        .phone
        .as_deref()
        .ok_or(AppError::BadRequest("Customer has no phone number".into()))?;

    let Some(whatsapp) = state.whatsapp.as_ref() else {
        tracing::warn!("WhatsApp send requested for invoice {} but Twilio is not configured", id);
        return Ok(Json(SendResult {
            success: false,
            message: "WhatsApp is not configured".to_string(),
        }));
    };

    let body = format!(
        "Hello {}, here is your invoice #{} for {:.2} {}. View and pay here: {}/invoices/{}",
        detail.customer.name,
        short_id(&id),
        detail.invoice.total,
        state.currency,
        state.frontend_url,
        id,
    );

    // The pooled connection is not held across the outbound call.
    match whatsapp.send(phone, &body, None).await {
        Ok(sid) => {
            let conn = state.db.get()?;
            queries::set_whatsapp_status(&conn, &id, crate::models::DeliveryStatus::Sent)?;
            tracing::info!("Invoice {} delivered via WhatsApp ({})", id, sid);
            Ok(Json(SendResult {
                success: true,
                message: "WhatsApp message sent".to_string(),
            }))
        }
        Err(e) => {
            let conn = state.db.get()?;
            queries::set_whatsapp_status(&conn, &id, crate::models::DeliveryStatus::Failed)?;
            Err(e)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PayLinkResult {
    pub link: Option<String>,
}

/// Create a hosted payment link for the invoice total.
///
/// An unconfigured gateway is not an error: the caller gets `{link: null}`
/// and nothing is written.
pub async fn create_pay_link(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<PayLinkResult>> {
    let conn = state.db.get()?;
    let detail = queries::get_invoice_detail_for_user(&conn, &id, &auth.id)?
        .ok_or(AppError::NotFound("Invoice".into()))?;
    drop(conn);

    let Some(razorpay) = state.razorpay.as_ref() else {
        tracing::warn!("Payment link requested for invoice {} but Razorpay is not configured", id);
        return Ok(Json(PayLinkResult { link: None }));
    };

    // Gateway failures propagate here with no link written.
    let callback_url = format!("{}/invoices/{}?payment=success", state.frontend_url, id);
    let link = razorpay
        .create_payment_link(
            detail.invoice.total,
            &state.currency,
            &id,
            detail.customer.email.as_deref(),
            detail.customer.phone.as_deref(),
            &callback_url,
        )
        .await?;

    let conn = state.db.get()?;
    queries::set_payment_link(&conn, &id, &link.short_url, &link.id)?;

    Ok(Json(PayLinkResult {
        link: Some(link.short_url),
    }))
}

#[derive(Debug, Serialize)]
pub struct VerifyResult {
    pub paid: bool,
    /// Provider-reported payment link status.
    pub status: String,
}

/// Manual reconciliation for when a webhook was missed: ask the provider
/// for the stored payment link and mark the invoice paid if it is.
pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<VerifyResult>> {
    let conn = state.db.get()?;
    let detail = queries::get_invoice_detail_for_user(&conn, &id, &auth.id)?
        .ok_or(AppError::NotFound("Invoice".into()))?;
    drop(conn);

    let razorpay = state
        .razorpay
        .as_ref()
        .ok_or(AppError::Gateway("Razorpay is not configured".into()))?;

    let link_id = detail
        .invoice
        .payment_link_id
        .as_deref()
        .ok_or(AppError::BadRequest("Invoice has no payment link".into()))?;

    let verified = razorpay.fetch_payment_link(link_id).await?;

    // The provider's own correlation notes must point back at this invoice;
    // a stale or reassigned link id must not mark a different record paid.
    let paid = verified.status == LINK_STATUS_PAID
        && verified.invoice_id.as_deref() == Some(id.as_str());
    if paid {
        let conn = state.db.get()?;
        queries::mark_invoice_paid(&conn, &id)?;
        tracing::info!("Invoice {} reconciled as paid via manual verification", id);
    } else if verified.status == LINK_STATUS_PAID {
        tracing::warn!(
            "Payment link {} is paid but correlates to a different invoice than {}",
            link_id,
            id
        );
    }

    Ok(Json(VerifyResult {
        paid,
        status: verified.status,
    }))
}
