use std::fmt;

use serde::{Deserialize, Serialize};

/// BLAKE3 digest of a byte sequence.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    /// First `len` hex characters (capped at 64)
    pub fn short(&self, len: usize) -> String {
        let mut hex = self.to_hex();
        hex.truncate(len.min(64));
        hex
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short(16))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_hash_identically() {
        assert_eq!(ContentHash::of(b"body{}"), ContentHash::of(b"body{}"));
    }

    #[test]
    fn single_byte_change_changes_hash() {
        assert_ne!(ContentHash::of(b"body{}"), ContentHash::of(b"body{ }"));
    }

    #[test]
    fn short_prefix() {
        let hash = ContentHash::of(b"x");
        assert_eq!(hash.short(10).len(), 10);
        assert!(hash.to_hex().starts_with(&hash.short(10)));
        assert_eq!(hash.short(100).len(), 64);
    }
}
