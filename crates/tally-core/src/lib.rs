//! tally-core - Core library for Tally
//!
//! This crate contains the shared models, the local record store, and the
//! offline-first sync engine used by all Tally interfaces (mobile, CLI).

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{AuditFinding, AuditReport, AuditStatus, InventoryItem, Location};
