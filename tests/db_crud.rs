//! Database CRUD operation tests for users, customers, and invoices

mod common;

use common::*;

// ============ User Tests ============

#[test]
fn test_create_user() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "owner@example.com");

    assert!(!user.id.is_empty());
    assert_eq!(user.email, "owner@example.com");
    assert_eq!(user.currency, "INR");
    assert_eq!(user.plan, "free");
}

#[test]
fn test_create_user_normalizes_email() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "  Owner@Example.COM ");

    assert_eq!(user.email, "owner@example.com");

    let fetched = queries::get_user_by_email(&conn, "OWNER@example.com")
        .expect("Query failed")
        .expect("User not found");
    assert_eq!(fetched.id, user.id);
}

#[test]
fn test_duplicate_email_rejected() {
    let conn = setup_test_db();
    let _ = create_test_user(&conn, "owner@example.com");

    let result = queries::create_user(
        &conn,
        &queries::NewUser {
            name: "Second",
            email: "owner@example.com",
            password_hash: None,
            google_id: Some("g-123"),
        },
    );
    assert!(result.is_err());
}

#[test]
fn test_update_user_profile_partial() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "owner@example.com");

    let updated = queries::update_user_profile(
        &conn,
        &user.id,
        &UpdateProfile {
            business_name: Some("Acme Billing".to_string()),
            business_phone: Some("+911234567890".to_string()),
            ..Default::default()
        },
    )
    .expect("Query failed")
    .expect("User not found");

    assert_eq!(updated.business_name.as_deref(), Some("Acme Billing"));
    assert_eq!(updated.business_phone.as_deref(), Some("+911234567890"));
    // Untouched fields survive the patch
    assert_eq!(updated.name, user.name);
    assert_eq!(updated.currency, "INR");
}

#[test]
fn test_update_user_profile_not_found() {
    let conn = setup_test_db();
    let result = queries::update_user_profile(&conn, "missing", &UpdateProfile::default())
        .expect("Query failed");
    assert!(result.is_none());
}

// ============ Customer Tests ============

#[test]
fn test_customer_crud() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "owner@example.com");
    let customer = create_test_customer(&conn, &user.id, "Acme");

    let fetched = queries::get_customer_for_user(&conn, &customer.id, &user.id)
        .expect("Query failed")
        .expect("Customer not found");
    assert_eq!(fetched.name, "Acme");

    let updated = queries::update_customer(
        &conn,
        &customer.id,
        &user.id,
        &UpdateCustomer {
            phone: Some("+919999999999".to_string()),
            ..Default::default()
        },
    )
    .expect("Query failed")
    .expect("Customer not found");
    assert_eq!(updated.phone.as_deref(), Some("+919999999999"));
    assert_eq!(updated.name, "Acme");

    assert!(queries::delete_customer(&conn, &customer.id, &user.id).expect("Delete failed"));
    assert!(queries::get_customer_for_user(&conn, &customer.id, &user.id)
        .expect("Query failed")
        .is_none());
}

#[test]
fn test_customer_scoped_to_owner() {
    let conn = setup_test_db();
    let owner = create_test_user(&conn, "owner@example.com");
    let other = create_test_user(&conn, "other@example.com");
    let customer = create_test_customer(&conn, &owner.id, "Acme");

    assert!(queries::get_customer_for_user(&conn, &customer.id, &other.id)
        .expect("Query failed")
        .is_none());
    assert!(queries::update_customer(
        &conn,
        &customer.id,
        &other.id,
        &UpdateCustomer {
            name: Some("Hijacked".to_string()),
            ..Default::default()
        },
    )
    .expect("Query failed")
    .is_none());
    assert!(!queries::delete_customer(&conn, &customer.id, &other.id).expect("Delete failed"));
}

#[test]
fn test_delete_customer_cascades_to_invoices() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "owner@example.com");
    let customer = create_test_customer(&conn, &user.id, "Acme");
    let invoice = create_test_invoice(&conn, &customer.id);

    assert!(queries::delete_customer(&conn, &customer.id, &user.id).expect("Delete failed"));

    assert!(queries::get_invoice(&conn, &invoice.id)
        .expect("Query failed")
        .is_none());
    assert!(queries::list_invoice_items(&conn, &invoice.id)
        .expect("Query failed")
        .is_empty());
}

// ============ Invoice Tests ============

#[test]
fn test_create_invoice_snapshot() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "owner@example.com");
    let customer = create_test_customer(&conn, &user.id, "Acme");
    let invoice = create_test_invoice(&conn, &customer.id);

    assert_eq!(invoice.subtotal, 125.0);
    assert_eq!(invoice.tax, 12.5);
    assert_eq!(invoice.total, 137.5);
    assert_eq!(invoice.status, InvoiceStatus::Pending);
    assert!(invoice.payment_status.is_none());
    assert!(invoice.whatsapp_status.is_none());

    let items = queries::list_invoice_items(&conn, &invoice.id).expect("Query failed");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].name, "Widget");
    assert_eq!(items[1].name, "Gadget");
}

#[test]
fn test_get_invoice_detail_scoped_to_owner() {
    let conn = setup_test_db();
    let owner = create_test_user(&conn, "owner@example.com");
    let other = create_test_user(&conn, "other@example.com");
    let customer = create_test_customer(&conn, &owner.id, "Acme");
    let invoice = create_test_invoice(&conn, &customer.id);

    let detail = queries::get_invoice_detail_for_user(&conn, &invoice.id, &owner.id)
        .expect("Query failed")
        .expect("Invoice not found");
    assert_eq!(detail.customer.id, customer.id);
    assert_eq!(detail.items.len(), 2);

    assert!(queries::get_invoice_detail_for_user(&conn, &invoice.id, &other.id)
        .expect("Query failed")
        .is_none());
}

#[test]
fn test_list_invoice_details() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "owner@example.com");
    let customer = create_test_customer(&conn, &user.id, "Acme");
    let _ = create_test_invoice(&conn, &customer.id);
    let _ = create_test_invoice(&conn, &customer.id);

    let list = queries::list_invoice_details_for_user(&conn, &user.id).expect("Query failed");
    assert_eq!(list.len(), 2);

    let other = create_test_user(&conn, "other@example.com");
    assert!(queries::list_invoice_details_for_user(&conn, &other.id)
        .expect("Query failed")
        .is_empty());
}

#[test]
fn test_update_invoice_does_not_recompute_totals() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "owner@example.com");
    let customer = create_test_customer(&conn, &user.id, "Acme");
    let invoice = create_test_invoice(&conn, &customer.id);

    // Replace the items without resending amounts: the stored snapshot
    // must stay exactly as created.
    let updated = queries::update_invoice(
        &conn,
        &invoice.id,
        &UpdateInvoice {
            items: Some(vec![CreateInvoiceItem {
                name: "Single".to_string(),
                qty: 1,
                price: 1.0,
            }]),
            ..Default::default()
        },
    )
    .expect("Query failed")
    .expect("Invoice not found");

    assert_eq!(updated.subtotal, 125.0);
    assert_eq!(updated.tax, 12.5);
    assert_eq!(updated.total, 137.5);

    let items = queries::list_invoice_items(&conn, &invoice.id).expect("Query failed");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Single");
}

#[test]
fn test_update_invoice_amounts() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "owner@example.com");
    let customer = create_test_customer(&conn, &user.id, "Acme");
    let invoice = create_test_invoice(&conn, &customer.id);

    let updated = queries::update_invoice(
        &conn,
        &invoice.id,
        &UpdateInvoice {
            subtotal: Some(200.0),
            tax: Some(20.0),
            total: Some(220.0),
            ..Default::default()
        },
    )
    .expect("Query failed")
    .expect("Invoice not found");

    assert_eq!(updated.total, 220.0);
    // Status is not patchable through updates
    assert_eq!(updated.status, InvoiceStatus::Pending);
}

#[test]
fn test_update_invoice_empty_patch_returns_current_row() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "owner@example.com");
    let customer = create_test_customer(&conn, &user.id, "Acme");
    let invoice = create_test_invoice(&conn, &customer.id);

    let unchanged = queries::update_invoice(&conn, &invoice.id, &UpdateInvoice::default())
        .expect("Query failed")
        .expect("Invoice not found");
    assert_eq!(unchanged.total, invoice.total);
}

#[test]
fn test_delete_invoice_cascades_to_items() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "owner@example.com");
    let customer = create_test_customer(&conn, &user.id, "Acme");
    let invoice = create_test_invoice(&conn, &customer.id);

    assert!(queries::delete_invoice(&conn, &invoice.id).expect("Delete failed"));
    assert!(queries::list_invoice_items(&conn, &invoice.id)
        .expect("Query failed")
        .is_empty());
}

// ============ Status Transition Tests ============

#[test]
fn test_whatsapp_status_overwrites() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "owner@example.com");
    let customer = create_test_customer(&conn, &user.id, "Acme");
    let invoice = create_test_invoice(&conn, &customer.id);

    assert!(queries::set_whatsapp_status(&conn, &invoice.id, DeliveryStatus::Failed)
        .expect("Update failed"));
    let fetched = queries::get_invoice(&conn, &invoice.id)
        .expect("Query failed")
        .expect("Invoice not found");
    assert_eq!(fetched.whatsapp_status, Some(DeliveryStatus::Failed));

    // A later successful send replaces the failure record
    assert!(queries::set_whatsapp_status(&conn, &invoice.id, DeliveryStatus::Sent)
        .expect("Update failed"));
    let fetched = queries::get_invoice(&conn, &invoice.id)
        .expect("Query failed")
        .expect("Invoice not found");
    assert_eq!(fetched.whatsapp_status, Some(DeliveryStatus::Sent));
}

#[test]
fn test_set_payment_link() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "owner@example.com");
    let customer = create_test_customer(&conn, &user.id, "Acme");
    let invoice = create_test_invoice(&conn, &customer.id);

    assert!(queries::set_payment_link(
        &conn,
        &invoice.id,
        "https://rzp.io/l/abc123",
        "plink_test123"
    )
    .expect("Update failed"));

    let fetched = queries::get_invoice(&conn, &invoice.id)
        .expect("Query failed")
        .expect("Invoice not found");
    assert_eq!(fetched.payment_link.as_deref(), Some("https://rzp.io/l/abc123"));
    assert_eq!(fetched.payment_link_id.as_deref(), Some("plink_test123"));
}

#[test]
fn test_mark_invoice_paid() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "owner@example.com");
    let customer = create_test_customer(&conn, &user.id, "Acme");
    let invoice = create_test_invoice(&conn, &customer.id);

    assert!(queries::mark_invoice_paid(&conn, &invoice.id).expect("Update failed"));

    let fetched = queries::get_invoice(&conn, &invoice.id)
        .expect("Query failed")
        .expect("Invoice not found");
    assert_eq!(fetched.status, InvoiceStatus::Paid);
    assert_eq!(fetched.payment_status, Some(PaymentStatus::Paid));
    // Amounts are untouched by reconciliation
    assert_eq!(fetched.total, 137.5);
}

#[test]
fn test_mark_invoice_paid_is_replay_safe() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "owner@example.com");
    let customer = create_test_customer(&conn, &user.id, "Acme");
    let invoice = create_test_invoice(&conn, &customer.id);

    assert!(queries::mark_invoice_paid(&conn, &invoice.id).expect("Update failed"));
    // Replaying the same reconciliation is a no-op, not an error
    assert!(queries::mark_invoice_paid(&conn, &invoice.id).expect("Update failed"));

    let fetched = queries::get_invoice(&conn, &invoice.id)
        .expect("Query failed")
        .expect("Invoice not found");
    assert_eq!(fetched.status, InvoiceStatus::Paid);
}

#[test]
fn test_mark_unknown_invoice_paid_returns_false() {
    let conn = setup_test_db();
    assert!(!queries::mark_invoice_paid(&conn, "missing").expect("Update failed"));
}
