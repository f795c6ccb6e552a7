//! Core library for `reloc`.
//!
//! Moves files between locations while guaranteeing no data loss: collision
//! handling is strategy-driven, every live operation is recorded in a durable
//! audit store, and any recorded session can be undone later.
//!
//! Layering, leaf-first: checksum/allocate are pure helpers, resolve turns a
//! strategy into a decision, executor carries one decision out and verifies
//! it, audit persists outcomes, and batch drives the whole list sequentially.

pub mod audit;
pub mod batch;
pub mod config;
pub mod errors;
pub mod fs_ops;
pub mod model;
pub mod output;
pub mod shutdown;

pub use audit::{AuditLog, AuditRecord, OpKind, SessionRecord};
pub use batch::BatchCoordinator;
pub use config::{Config, LogLevel};
pub use errors::RelocError;
pub use model::{InteractionMode, MoveOperation, MoveSession, Outcome, Strategy};
