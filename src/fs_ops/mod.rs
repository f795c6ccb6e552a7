//! Filesystem operations: modularized.

pub mod allocate;
mod atomic;
pub mod backup;
pub mod checksum;
mod copy;
mod helpers;
pub mod lock;
pub mod resolve;
mod util;

pub mod executor;

pub use allocate::allocate;
pub use backup::BackupStore;
pub use executor::execute;
pub use lock::{AreaLock, try_acquire_area_lock};
pub use resolve::{Decision, Resolution, resolve_collision};
