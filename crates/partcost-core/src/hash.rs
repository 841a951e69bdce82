//! Stable hashing helpers for catalog and workload fingerprints.

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
        f.write_str(&self.to_hex())
    }
}

/// Digest of a value's JSON encoding. Used for report digests; estimate-path
/// fingerprints go through `Fingerprint` instead.
pub fn hash_serde<T: Serialize>(v: &T) -> Result<Hash256, crate::error::Error> {
    let bytes = serde_json::to_vec(v)?;
    Ok(Hash256(blake3::hash(&bytes).into()))
}

/// Incremental fingerprint builder for the estimate hot path.
#[derive(Default)]
pub struct Fingerprint {
    inner: Hasher,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_u64(&mut self, v: u64) -> &mut Self {
        self.inner.update(&v.to_le_bytes());
        self
    }

    /// Length-prefixed so that ("ab","c") and ("a","bc") differ.
    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.update_u64(s.len() as u64);
        self.inner.update(s.as_bytes());
        self
    }

    pub fn finish(&self) -> Hash256 {
        Hash256(self.inner.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_64_chars() {
        let h = Fingerprint::new().update_str("neworder").finish();
        assert_eq!(h.to_hex().len(), 64);
        assert_eq!(h.to_string(), h.to_hex());
    }

    #[test]
    fn serde_digest_is_stable() {
        let a = hash_serde(&("neworder", 3u32)).unwrap();
        assert_eq!(a, hash_serde(&("neworder", 3u32)).unwrap());
        assert_ne!(a, hash_serde(&("neworder", 4u32)).unwrap());
    }

    #[test]
    fn fingerprint_is_length_prefixed() {
        let a = Fingerprint::new().update_str("ab").update_str("c").finish();
        let b = Fingerprint::new().update_str("a").update_str("bc").finish();
        assert_ne!(a, b);
    }
}
