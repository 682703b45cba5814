//! Body digests for stored entries.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 digest of a response body as lowercase hex.
///
/// Stored next to every entry and re-checked on read, so a torn or corrupted
/// row is reported as a miss instead of served.
pub fn compute_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_stability() {
        assert_eq!(compute_digest(b"<html></html>"), compute_digest(b"<html></html>"));
    }

    #[test]
    fn test_digest_differs() {
        assert_ne!(compute_digest(b"a"), compute_digest(b"b"));
    }

    #[test]
    fn test_digest_format() {
        let digest = compute_digest(b"");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    }
}
