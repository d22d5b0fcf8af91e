use anyhow::Result;

/// Collision-negligible content hashing for write fingerprints and
/// restore guards.
pub trait ContentHashPort: Send + Sync {
    fn hash_bytes(&self, bytes: &[u8]) -> Result<String>;

    fn hash_text(&self, text: &str) -> Result<String> {
        self.hash_bytes(text.as_bytes())
    }
}
