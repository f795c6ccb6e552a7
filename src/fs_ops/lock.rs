//! Advisory process lock for the audit/backup area.
//!
//! Uses a sidecar lock file held exclusively (fs2) for the lifetime of a
//! batch. Sequential execution makes moves race-free within one process;
//! this lock extends that guarantee across processes, closing the window
//! between the allocator's existence probe and the move itself.
//!
//! The lock is released when the guard is dropped. The lock file is left on
//! disk; holding and releasing the flock is what matters, and unlink races
//! on shared filesystems are not worth the cleanup.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

/// RAII guard held while the area lock is active.
pub struct AreaLock {
    file: File,
    path: PathBuf,
}

impl AreaLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AreaLock {
    fn drop(&mut self) {
        // flock releases on close; do it explicitly so drop order is obvious.
        let _ = self.file.unlock();
    }
}

fn lock_file_path(dir: &Path) -> PathBuf {
    dir.join(".reloc.lock")
}

/// Try to take the exclusive lock for `dir` without blocking.
/// Returns Ok(None) when another process holds it.
pub fn try_acquire_area_lock(dir: &Path) -> io::Result<Option<AreaLock>> {
    std::fs::create_dir_all(dir)?;
    let path = lock_file_path(dir);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)?;

    match file.try_lock_exclusive() {
        Ok(()) => {
            trace!(path = %path.display(), "area lock acquired");
            Ok(Some(AreaLock { file, path }))
        }
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
        Err(e) => Err(e),
    }
}
