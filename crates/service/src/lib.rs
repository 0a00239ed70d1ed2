//! Service layer for the branding board.
//! - Record types and the submission/vote rules live in `branding`.
//! - Whole-document JSON persistence lives in `storage`.
//! - Identity to role mapping lives in `access`.
//! - Logo image persistence lives in `uploads`.

pub mod errors;
pub mod access;
pub mod branding;
pub mod metrics;
pub mod runtime;
pub mod storage;
pub mod uploads;
