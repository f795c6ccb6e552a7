//! Content digests for identity comparison.
//!
//! Uses XXH3-128: fast, stable across runs, and wide enough that a collision
//! between two files that also share a byte length is not a practical
//! concern. This is an equality check, not an integrity/crypto primitive.
//!
//! `identical` fails soft: if either file cannot be read, the answer is
//! "not identical" — callers treat inability to prove equality as difference.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;
use twox_hash::xxh3::HasherExt;

const CHUNK_SIZE: usize = 64 * 1024;

/// Compute the 128-bit content digest of a file, reading in bounded chunks
/// so arbitrarily large files never occupy memory all at once.
pub fn digest(path: &Path) -> io::Result<u128> {
    let mut f = File::open(path)?;
    let mut hasher = twox_hash::xxh3::Hash128::with_seed(0);
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        std::hash::Hasher::write(&mut hasher, &buf[..n]);
    }
    Ok(hasher.finish_ext())
}

/// True iff both files exist, are readable, and have identical content.
/// Sizes are compared first: cheap, and a mismatch short-circuits the read.
pub fn identical(a: &Path, b: &Path) -> bool {
    let (meta_a, meta_b) = match (fs::metadata(a), fs::metadata(b)) {
        (Ok(x), Ok(y)) => (x, y),
        _ => return false,
    };
    if meta_a.len() != meta_b.len() {
        return false;
    }

    match (digest(a), digest(b)) {
        (Ok(da), Ok(db)) => da == db,
        (ra, rb) => {
            debug!(
                a = %a.display(),
                b = %b.display(),
                a_err = ra.is_err(),
                b_err = rb.is_err(),
                "digest unreadable; treating files as different"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn identical_same_content() {
        let td = tempdir().unwrap();
        let a = td.path().join("a.txt");
        let b = td.path().join("b.txt");
        fs::write(&a, b"same bytes").unwrap();
        fs::write(&b, b"same bytes").unwrap();
        assert!(identical(&a, &b));
    }

    #[test]
    fn different_content_same_length() {
        let td = tempdir().unwrap();
        let a = td.path().join("a");
        let b = td.path().join("b");
        fs::write(&a, b"aaaa").unwrap();
        fs::write(&b, b"bbbb").unwrap();
        assert!(!identical(&a, &b));
    }

    #[test]
    fn size_mismatch_short_circuits() {
        let td = tempdir().unwrap();
        let a = td.path().join("a");
        let b = td.path().join("b");
        fs::write(&a, b"short").unwrap();
        fs::write(&b, b"much longer content").unwrap();
        assert!(!identical(&a, &b));
    }

    #[test]
    fn missing_file_is_not_identical() {
        let td = tempdir().unwrap();
        let a = td.path().join("exists");
        let b = td.path().join("missing");
        fs::write(&a, b"x").unwrap();
        assert!(!identical(&a, &b));
        assert!(!identical(&b, &a));
    }

    #[test]
    fn digest_stable_across_calls() {
        let td = tempdir().unwrap();
        let a = td.path().join("a");
        fs::write(&a, b"deterministic").unwrap();
        assert_eq!(digest(&a).unwrap(), digest(&a).unwrap());
    }

    #[test]
    fn digest_crosses_chunk_boundary() {
        let td = tempdir().unwrap();
        let big = td.path().join("big");
        let data = vec![7u8; CHUNK_SIZE * 2 + 17];
        fs::write(&big, &data).unwrap();

        let copy = td.path().join("copy");
        fs::write(&copy, &data).unwrap();
        assert!(identical(&big, &copy));
    }
}
