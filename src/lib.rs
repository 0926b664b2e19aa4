//! Billable - multi-tenant invoicing backend
//!
//! This library provides the core functionality for the Billable invoicing
//! service: database operations, bearer-token auth, Razorpay payment links
//! with webhook reconciliation, WhatsApp delivery via Twilio, and PDF export.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod pdf;
pub mod util;
pub mod whatsapp;
