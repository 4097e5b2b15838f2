/// JWT Claims structure
///
/// Payload of an access token: standard `sub`/`iat`/`exp`/`iss` claims plus
/// the tenant id under `tid`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::TenantId;
use crate::error::{AppError, AuthError};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Tenant ID; absent for system-level users
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    /// Create new claims expiring `ttl_seconds` from now
    pub fn new(user_id: Uuid, tenant_id: TenantId, ttl_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            tid: tenant_id.map(|t| t.to_string()),
            iat: now,
            exp: now + ttl_seconds,
            iss: issuer,
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// Returns `InvalidToken` if the subject is not a UUID
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Auth(AuthError::InvalidToken))
    }

    /// Extract tenant ID from claims
    pub fn tenant_id(&self) -> Result<TenantId, AppError> {
        self.tid
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|_| AppError::Auth(AuthError::InvalidToken))
    }
}
