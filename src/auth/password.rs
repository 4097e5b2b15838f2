/// Password Hashing and Verification
///
/// Argon2id with a fresh 16-byte salt per call. The encoded form is
/// `base64(salt)$base64(key)` (standard alphabet, no padding); the cost
/// parameters are fixed process-wide and must not change without
/// re-hashing stored credentials.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{AppError, ValidationError};

const ARGON2_MEMORY_KIB: u32 = 64 * 1024;
const ARGON2_ITERATIONS: u32 = 1;
const ARGON2_PARALLELISM: u32 = 1;
const ARGON2_KEY_LENGTH: usize = 32;
const SALT_LENGTH: usize = 16;
const HASH_DELIMITER: char = '$';

// Bounds accepted when decoding a stored hash
const MIN_STORED_SALT_LENGTH: usize = 8;
const MAX_STORED_SALT_LENGTH: usize = 64;
const MIN_STORED_KEY_LENGTH: usize = 16;
const MAX_STORED_KEY_LENGTH: usize = 64;

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Hash a password with Argon2id and a random salt
///
/// # Errors
/// Returns `AppError::Internal` if key derivation fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let mut salt = [0u8; SALT_LENGTH];
    OsRng.fill_bytes(&mut salt);

    let key = derive_key(password, &salt, ARGON2_KEY_LENGTH)?;

    Ok(format!(
        "{}{}{}",
        STANDARD_NO_PAD.encode(salt),
        HASH_DELIMITER,
        STANDARD_NO_PAD.encode(key)
    ))
}

/// Verify a password against an encoded hash
///
/// The key is recomputed with the stored salt and the stored key length and
/// compared without early exit.
///
/// # Errors
/// Returns `AppError::InvalidHashFormat` if the stored hash is malformed
pub fn verify_password(password: &str, encoded_hash: &str) -> Result<bool, AppError> {
    let (salt, expected) = decode_hash(encoded_hash)?;
    let candidate = derive_key(password, &salt, expected.len())?;

    Ok(constant_time_eq(&candidate, &expected))
}

/// Hash on the blocking thread pool so Argon2 never stalls the async workers
pub async fn spawn_hash_password(password: String) -> Result<String, AppError> {
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(|| hash_password(&password))).await?
}

/// Verify on the blocking thread pool
pub async fn spawn_verify_password(password: String, encoded_hash: String) -> Result<bool, AppError> {
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || {
        span.in_scope(|| verify_password(&password, &encoded_hash))
    })
    .await?
}

/// Validate password length requirements
///
/// Requirements:
/// - Not empty
/// - Minimum 8 characters
/// - Maximum 128 characters (bounds Argon2 input)
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }

    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        ));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        ));
    }

    Ok(())
}

fn derive_key(password: &str, salt: &[u8], key_length: usize) -> Result<Vec<u8>, AppError> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_ITERATIONS,
        ARGON2_PARALLELISM,
        Some(key_length),
    )
    .map_err(|e| AppError::Internal(format!("Invalid Argon2 parameters: {}", e)))?;

    let mut key = vec![0u8; key_length];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    Ok(key)
}

fn decode_hash(encoded_hash: &str) -> Result<(Vec<u8>, Vec<u8>), AppError> {
    let mut parts = encoded_hash.split(HASH_DELIMITER);
    let (salt, key) = match (parts.next(), parts.next(), parts.next()) {
        (Some(salt), Some(key), None) => (salt, key),
        _ => return Err(AppError::InvalidHashFormat),
    };

    let salt = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|_| AppError::InvalidHashFormat)?;
    let key = STANDARD_NO_PAD
        .decode(key)
        .map_err(|_| AppError::InvalidHashFormat)?;

    if !(MIN_STORED_SALT_LENGTH..=MAX_STORED_SALT_LENGTH).contains(&salt.len())
        || !(MIN_STORED_KEY_LENGTH..=MAX_STORED_KEY_LENGTH).contains(&key.len())
    {
        return Err(AppError::InvalidHashFormat);
    }

    Ok((salt, key))
}

/// Compares every byte regardless of where the first mismatch is
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
