//! Durable audit trail: every live operation and session, queryable for
//! history and undo. Append-only by construction.

mod models;
mod queries;
mod store;

pub use models::{AuditRecord, OpKind, SessionRecord};
pub use store::AuditLog;
