/// Authentication module
///
/// Password hashing, token issuing and the authentication service built on them.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use claims::Claims;
pub use jwt::TokenIssuer;
pub use password::{
    hash_password, spawn_hash_password, spawn_verify_password, validate_password_strength,
    verify_password,
};
pub use refresh_token::{
    generate_refresh_token, hash_refresh_token, validate_refresh_token_shape,
    MIN_REFRESH_TOKEN_LENGTH,
};
pub use service::AuthService;
