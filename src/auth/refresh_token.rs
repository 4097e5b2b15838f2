/// Refresh Token Generation
///
/// Refresh tokens are:
/// - 64 random bytes (512 bits) from the OS RNG, URL-safe base64 without padding
/// - Opaque: validity lives only in the session store
/// - Hashed with SHA-256 before storage (never store plaintext)

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::ValidationError;

const REFRESH_TOKEN_BYTES: usize = 64;

/// Shortest token accepted by shape validation. A generated token is 86
/// characters long.
pub const MIN_REFRESH_TOKEN_LENGTH: usize = 80;
const MAX_REFRESH_TOKEN_LENGTH: usize = 512;

/// Generate a new cryptographically secure refresh token
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Reject empty, too-short or oversized tokens
pub fn validate_refresh_token_shape(token: &str) -> Result<(), ValidationError> {
    if token.is_empty() {
        return Err(ValidationError::EmptyField("refresh_token".to_string()));
    }

    if token.len() < MIN_REFRESH_TOKEN_LENGTH {
        return Err(ValidationError::TooShort(
            "refresh_token".to_string(),
            MIN_REFRESH_TOKEN_LENGTH,
        ));
    }

    if token.len() > MAX_REFRESH_TOKEN_LENGTH {
        return Err(ValidationError::TooLong(
            "refresh_token".to_string(),
            MAX_REFRESH_TOKEN_LENGTH,
        ));
    }

    Ok(())
}

/// SHA-256 hex digest used as the session lookup key
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
