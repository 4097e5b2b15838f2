/// Storage contracts
///
/// One capability set per storage need. Services hold them as
/// `Arc<dyn ...>` and the concrete implementation is chosen in `main`:
/// `PgStore` in production, `InMemoryStore` in tests and single-node
/// development.

mod memory;
mod postgres;

use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{NewUser, Permission, Role, Session, TenantId, User};
use crate::error::AppError;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with a unique-constraint error if the email is taken
    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError>;
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    /// Returns `false` if no such user exists
    async fn update_status(&self, id: Uuid, is_active: bool) -> Result<bool, AppError>;
    /// Removes the user together with its credential, sessions and role assignments
    async fn delete_user(&self, id: Uuid) -> Result<(), AppError>;
    async fn count_users(&self) -> Result<i64, AppError>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn create(&self, user_id: Uuid, password_hash: &str) -> Result<(), AppError>;
    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Option<String>, AppError>;
    /// Replaces the stored hash. Returns `false` if the user has no credential row.
    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fails with a unique-constraint error on a duplicate token hash
    async fn create(&self, session: &Session) -> Result<(), AppError>;
    async fn get_by_refresh_token(
        &self,
        refresh_token_hash: &str,
    ) -> Result<Option<Session>, AppError>;
    /// Returns `true` only for the caller that actually removed the row
    async fn delete(&self, session_id: Uuid) -> Result<bool, AppError>;
    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64, AppError>;
    async fn delete_expired(&self) -> Result<u64, AppError>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn create_role(&self, role: &Role) -> Result<(), AppError>;
    async fn get_role_by_id(&self, id: Uuid) -> Result<Option<Role>, AppError>;
    async fn get_role_by_name(&self, name: &str, tenant_id: TenantId)
        -> Result<Option<Role>, AppError>;

    async fn create_permission(&self, permission: &Permission) -> Result<(), AppError>;
    async fn get_permission_by_id(&self, id: Uuid) -> Result<Option<Permission>, AppError>;
    async fn get_permission_by_code(&self, code: &str) -> Result<Option<Permission>, AppError>;
    async fn list_permissions(&self) -> Result<Vec<Permission>, AppError>;

    /// Idempotent: already-linked permissions are skipped
    async fn assign_permissions_to_role(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), AppError>;
    async fn get_permissions_for_role(&self, role_id: Uuid) -> Result<Vec<Permission>, AppError>;

    /// Idempotent
    async fn assign_role_to_user(&self, user_id: Uuid, role_id: Uuid) -> Result<(), AppError>;
    /// Union of permission codes over every role assigned to the user
    async fn get_permission_codes_for_user(&self, user_id: Uuid)
        -> Result<HashSet<String>, AppError>;
}
