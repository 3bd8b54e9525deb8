//! Stable hashing helpers for compiled scripts and manifests.

use blake3::Hasher;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    Hash256(blake3::hash(bytes).into())
}

/// Hash an ordered list of statements. Each statement is length-prefixed so
/// that moving text across a statement boundary changes the digest.
pub fn hash_statements<S: AsRef<str>>(statements: &[S]) -> Hash256 {
    let mut h = Hasher::new();
    for s in statements {
        let s = s.as_ref();
        h.update(&(s.len() as u64).to_le_bytes());
        h.update(s.as_bytes());
    }
    Hash256(h.finalize().into())
}

/// Hash any serde-serializable value deterministically (via JSON).
pub fn hash_serde<T: Serialize>(v: &T) -> Result<Hash256, crate::error::Error> {
    let bytes = serde_json::to_vec(v)?;
    Ok(hash_bytes(&bytes))
}
