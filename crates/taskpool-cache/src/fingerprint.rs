//! Fingerprint helper: SHA-256 over request inputs, lowercase hex.

use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Hashes the given parts into a 64-character lowercase hex fingerprint.
///
/// Parts are length-delimited before hashing so `["ab", "c"]` and
/// `["a", "bc"]` produce different fingerprints.
pub fn fingerprint<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        let bytes = part.as_ref().as_bytes();
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
