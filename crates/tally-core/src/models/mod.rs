//! Data models for Tally
//!
//! Every synchronized entity carries the same sync envelope on top of its
//! domain fields: a stable local id, an optional server id, a
//! locally-created marker, and a dirty flag (`needs_sync`). Timestamps are
//! Unix milliseconds owned by the local record store.

mod finding;
mod item;
mod location;
mod report;

pub use finding::{AuditFinding, FindingId, PulledFinding};
pub use item::{InventoryItem, ItemId, PulledItem};
pub use location::{Location, LocationId, PulledLocation};
pub use report::{AuditReport, AuditStatus, PulledReport, ReportId};
