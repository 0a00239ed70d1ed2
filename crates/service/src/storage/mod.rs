//! Storage abstractions for service layer
//!
//! File-backed stores for small documents persisted as JSON, rewritten whole
//! on every mutation.

pub mod json_document_store;

pub use json_document_store::JsonDocumentStore;
