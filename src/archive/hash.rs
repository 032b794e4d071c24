//! Content Hash Value Object
//!
//! SHA-256 digest of a serialized archive, kept as 64 lowercase hex digits
//! because that is the form the downstream `sha256` attribute expects.

use std::fmt;

use sha2::{Digest, Sha256};

/// Content hash value object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// Prefix accepted (and stripped) when comparing against raw strings
    pub const PREFIX: &'static str = "sha256:";

    /// Compute the SHA-256 of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(bytes)))
    }

    /// Get the hex digest
    pub fn hex(&self) -> &str {
        &self.0
    }

    /// Shortened form for log lines
    pub fn short(&self) -> &str {
        &self.0[..12]
    }

    /// Check if this hash matches a raw string (with or without prefix,
    /// case-insensitive)
    pub fn matches_str(&self, s: &str) -> bool {
        let raw = s.strip_prefix(Self::PREFIX).unwrap_or(s);
        self.0.eq_ignore_ascii_case(raw)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_computes_sha256() {
        let hash = ContentHash::from_bytes(b"hello world\n");
        assert_eq!(
            hash.hex(),
            "a948904f2f0f479b8f8197694b30184b0d2ed1c1cd2a1ec0fb85d299a192a447"
        );
    }

    #[test]
    fn same_content_same_hash() {
        assert_eq!(ContentHash::from_bytes(b"x"), ContentHash::from_bytes(b"x"));
        assert_ne!(ContentHash::from_bytes(b"x"), ContentHash::from_bytes(b"y"));
    }

    #[test]
    fn matches_str_accepts_prefix_and_case() {
        let hash = ContentHash::from_bytes(b"abc");
        let upper = hash.hex().to_uppercase();
        assert!(hash.matches_str(hash.hex()));
        assert!(hash.matches_str(&format!("sha256:{}", hash.hex())));
        assert!(hash.matches_str(&upper));
        assert!(!hash.matches_str("deadbeef"));
    }

    #[test]
    fn short_is_a_prefix() {
        let hash = ContentHash::from_bytes(b"abc");
        assert_eq!(hash.short().len(), 12);
        assert!(hash.hex().starts_with(hash.short()));
    }
}
