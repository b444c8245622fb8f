//! Bearer-token verification
//!
//! The transport's interceptor extracts the token from call metadata and
//! calls [`verify_token`] before a request reaches the service; the
//! controller itself never sees credentials. Only the SHA-512 digest of
//! the token is ever configured or stored.

use sha2::{Digest, Sha512};

/// SHA-512 hex digest of a token, the form in which the controller's
/// access token is configured
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a presented token against the configured digest. An empty
/// configured digest disables authentication entirely.
pub fn verify_token(presented: &str, configured_hash: &str) -> bool {
    if configured_hash.is_empty() {
        return true;
    }
    hash_token(presented) == configured_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_token_roundtrip() {
        let digest = hash_token("letmein");
        assert!(verify_token("letmein", &digest));
        assert!(!verify_token("wrong", &digest));
    }

    #[test]
    fn test_empty_digest_disables_auth() {
        assert!(verify_token("anything", ""));
        assert!(verify_token("", ""));
    }

    #[test]
    fn test_digest_is_hex_sha512() {
        // 64 bytes of SHA-512, hex encoded
        assert_eq!(hash_token("x").len(), 128);
    }
}
