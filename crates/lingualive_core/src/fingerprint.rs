//! crates/lingualive_core/src/fingerprint.rs
//!
//! Content fingerprinting for submitted images. The fingerprint is the
//! dedup/cache key for a submission; cache keys are additionally scoped per
//! user so two users submitting identical bytes never share an entry.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Returns the SHA-256 hex digest of the raw image bytes.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Builds the per-user cache key for a content fingerprint.
pub fn cache_key(user_id: Uuid, fingerprint: &str) -> String {
    format!("translation:{}:{}", user_id, fingerprint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(fingerprint(b"scene"), fingerprint(b"scene"));
    }

    #[test]
    fn fingerprint_differs_for_different_bytes() {
        assert_ne!(fingerprint(b"scene"), fingerprint(b"scene2"));
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        let fp = fingerprint(b"");
        assert_eq!(fp.len(), 64);
        assert_eq!(
            fp,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn cache_keys_are_scoped_per_user() {
        let fp = fingerprint(b"same image");
        let a = cache_key(Uuid::new_v4(), &fp);
        let b = cache_key(Uuid::new_v4(), &fp);
        assert_ne!(a, b);
        assert!(a.starts_with("translation:"));
    }
}
