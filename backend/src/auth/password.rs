use std::sync::LazyLock;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{Error, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

/// Hash a password using Argon2id with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(OsRng);
    let password_hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(password_hash.to_string())
}

/// Verify a password against a stored PHC hash string.
///
/// A mismatch is `Ok(false)`; a malformed hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

// hash of a random password nobody knows, verified when no account matched
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password(&hex::encode(rand::random::<[u8; 16]>())).ok());

/// Spends the same Argon2 work as [`verify_password`] when there is no stored hash to check,
/// so an unknown email costs as much as a wrong password.
pub fn verify_dummy_password(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}
