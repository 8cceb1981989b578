use sha2::{Digest, Sha256};

/// A freshly generated password reset secret.
///
/// `raw` goes into the recovery link and is never stored; `digest` is what the account row keeps.
pub struct ResetSecret {
    pub raw: String,
    pub digest: String,
}

impl std::fmt::Debug for ResetSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetSecret")
            .field("raw", &"<redacted>")
            .field("digest", &self.digest)
            .finish()
    }
}

/// Generates 256 random bits, hex encoded, along with their SHA-256 digest
#[must_use]
pub fn generate_reset_secret() -> ResetSecret {
    let bytes: [u8; 32] = rand::random();
    let raw = hex::encode(bytes);
    let digest = digest_reset_secret(&raw);
    ResetSecret { raw, digest }
}

/// Hex encoded SHA-256 of the raw secret as presented by the caller
#[must_use]
pub fn digest_reset_secret(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}
