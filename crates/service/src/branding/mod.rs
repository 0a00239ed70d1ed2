//! Branding module: submission lifecycle and the vote ledgers.
//!
//! `domain` holds the persisted record shapes and their rules, `service`
//! gates them by role and runs them against the JSON documents.

pub mod domain;
pub mod service;

pub use service::BrandingService;
