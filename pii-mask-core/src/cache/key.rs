//! Content-addressed cache keys.

use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Prefix used for keys stored in a [`CacheBackend`](super::CacheBackend).
pub const KEY_PREFIX: &str = "mask:";

const DIGEST_LEN: usize = 32;

/// SHA-256 digest of normalized input text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; DIGEST_LEN]);

impl CacheKey {
    pub fn for_text(normalized_text: &str) -> Self {
        let digest = Sha256::digest(normalized_text.as_bytes());
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// 64 lowercase hex chars.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// `mask:` followed by the hex digest.
    pub fn backend_key(&self) -> String {
        format!("{}{}", KEY_PREFIX, self.to_hex())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self.to_hex())
    }
}

impl FromStr for CacheKey {
    type Err = String;

    /// Accepts the bare hex digest or the prefixed backend form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digest = s.strip_prefix(KEY_PREFIX).unwrap_or(s);
        if digest.len() != DIGEST_LEN * 2 || digest.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(format!("'{}' is not a lowercase SHA-256 hex digest", s));
        }
        let decoded = hex::decode(digest).map_err(|e| e.to_string())?;
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }
}

pub fn is_valid_cache_key(s: &str) -> bool {
    s.parse::<CacheKey>().is_ok()
}
