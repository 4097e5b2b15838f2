/// Access Token Issuer
///
/// Signs and validates HS256 access tokens. Keys are derived once from
/// `JwtSettings` at startup; rotating the secret invalidates every
/// outstanding access token.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::auth::refresh_token;
use crate::configuration::{JwtSettings, MIN_JWT_SECRET_LENGTH};
use crate::domain::TenantId;
use crate::error::{AppError, AuthError, ConfigError};

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    access_token_ttl: i64,
    refresh_token_ttl: i64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Build an issuer from configuration
    ///
    /// # Errors
    /// Returns `AppError::Config` if the secret is shorter than 32 bytes or
    /// a lifetime is not positive
    pub fn new(config: &JwtSettings) -> Result<Self, AppError> {
        if config.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "jwt.secret must be at least {} bytes",
                MIN_JWT_SECRET_LENGTH
            ))
            .into());
        }

        if config.access_token_expiry <= 0 || config.refresh_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt token lifetimes must be positive".to_string(),
            )
            .into());
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            access_token_ttl: config.access_token_expiry,
            refresh_token_ttl: config.refresh_token_expiry,
        })
    }

    /// Configured access-token lifetime in seconds
    pub fn access_token_ttl(&self) -> i64 {
        self.access_token_ttl
    }

    /// Configured refresh-token (session) lifetime in seconds
    pub fn refresh_token_ttl(&self) -> i64 {
        self.refresh_token_ttl
    }

    /// Sign an access token for `user_id` / `tenant_id` valid for `ttl_seconds`
    ///
    /// # Errors
    /// Returns `AppError::Internal` if signing fails
    pub fn issue_access_token(
        &self,
        user_id: Uuid,
        tenant_id: TenantId,
        ttl_seconds: i64,
    ) -> Result<String, AppError> {
        let claims = Claims::new(user_id, tenant_id, ttl_seconds, self.issuer.clone());

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Validate signature, structure, issuer and expiry
    ///
    /// # Errors
    /// Every failure is reported as `AuthError::InvalidToken`
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AppError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(reason = ?e.kind(), "Access token rejected");
                AppError::Auth(AuthError::InvalidToken)
            })?;

        // sub and tid must be well-formed ids
        claims.user_id()?;
        claims.tenant_id()?;

        Ok(claims)
    }

    /// Fresh opaque refresh token
    pub fn generate_refresh_token(&self) -> String {
        refresh_token::generate_refresh_token()
    }

    /// Reject obviously malformed refresh tokens before any store lookup
    pub fn validate_refresh_token_shape(&self, token: &str) -> Result<(), AppError> {
        refresh_token::validate_refresh_token_shape(token).map_err(AppError::from)
    }
}
