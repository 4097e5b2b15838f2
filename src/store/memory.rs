//! In-memory store using a Tokio mutex for single-node deployments and tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{NewUser, Permission, Role, Session, TenantId, User};
use crate::error::{AppError, DatabaseError};

use super::{CredentialStore, RoleStore, SessionStore, UserStore};

#[derive(Debug, Default)]
struct InnerState {
    users: HashMap<Uuid, User>,
    credentials: HashMap<Uuid, String>,
    sessions: HashMap<Uuid, Session>,
    roles: HashMap<Uuid, Role>,
    permissions: HashMap<Uuid, Permission>,
    /// (role_id, permission_id)
    role_permissions: HashSet<(Uuid, Uuid)>,
    /// (user_id, role_id)
    user_roles: HashSet<(Uuid, Uuid)>,
}

/// Implements every storage contract over one mutex-protected state, with
/// the same uniqueness and reference rules as the Postgres schema.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<InnerState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live session rows, expired or not
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// Sessions belonging to `user_id`
    pub async fn sessions_for_user(&self, user_id: Uuid) -> Vec<Session> {
        self.state
            .lock()
            .await
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Number of role assignments held by `user_id`
    pub async fn role_count_for_user(&self, user_id: Uuid) -> usize {
        self.state
            .lock()
            .await
            .user_roles
            .iter()
            .filter(|(u, _)| *u == user_id)
            .count()
    }

    /// Overwrites a session's expiry. Lets tests age a session.
    pub async fn set_session_expiry(&self, session_id: Uuid, expires_at: chrono::DateTime<Utc>) {
        if let Some(session) = self.state.lock().await.sessions.get_mut(&session_id) {
            session.expires_at = expires_at;
        }
    }
}

fn duplicate(what: &str) -> AppError {
    AppError::Database(DatabaseError::UniqueConstraintViolation(format!(
        "{} already exists",
        what
    )))
}

fn missing_reference(what: &str) -> AppError {
    AppError::not_found(what)
}

fn sorted_by_code(mut permissions: Vec<Permission>) -> Vec<Permission> {
    permissions.sort_by(|a, b| a.code.cmp(&b.code));
    permissions
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut state = self.state.lock().await;

        if state.users.values().any(|u| u.email == new_user.email) {
            return Err(duplicate("email"));
        }

        let user = User {
            id: Uuid::new_v4(),
            tenant_id: new_user.tenant_id,
            display_name: new_user.display_name,
            email: new_user.email,
            is_active: true,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_status(&self, id: Uuid, is_active: bool) -> Result<bool, AppError> {
        match self.state.lock().await.users.get_mut(&id) {
            Some(user) => {
                user.is_active = is_active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.lock().await;

        state.users.remove(&id);
        state.credentials.remove(&id);
        state.sessions.retain(|_, s| s.user_id != id);
        state.user_roles.retain(|(user_id, _)| *user_id != id);

        Ok(())
    }

    async fn count_users(&self) -> Result<i64, AppError> {
        Ok(self.state.lock().await.users.len() as i64)
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn create(&self, user_id: Uuid, password_hash: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().await;

        if !state.users.contains_key(&user_id) {
            return Err(missing_reference("user"));
        }
        if state.credentials.contains_key(&user_id) {
            return Err(duplicate("credential"));
        }

        state.credentials.insert(user_id, password_hash.to_string());
        Ok(())
    }

    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
        Ok(self.state.lock().await.credentials.get(&user_id).cloned())
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<bool, AppError> {
        match self.state.lock().await.credentials.get_mut(&user_id) {
            Some(hash) => {
                *hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create(&self, session: &Session) -> Result<(), AppError> {
        let mut state = self.state.lock().await;

        if !state.users.contains_key(&session.user_id) {
            return Err(missing_reference("user"));
        }
        if state.sessions.contains_key(&session.id)
            || state
                .sessions
                .values()
                .any(|s| s.refresh_token_hash == session.refresh_token_hash)
        {
            return Err(duplicate("session"));
        }

        state.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_by_refresh_token(
        &self,
        refresh_token_hash: &str,
    ) -> Result<Option<Session>, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .sessions
            .values()
            .find(|s| s.refresh_token_hash == refresh_token_hash)
            .cloned())
    }

    async fn delete(&self, session_id: Uuid) -> Result<bool, AppError> {
        Ok(self.state.lock().await.sessions.remove(&session_id).is_some())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - state.sessions.len()) as u64)
    }

    async fn delete_expired(&self) -> Result<u64, AppError> {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| !s.is_expired_at(now));
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl RoleStore for InMemoryStore {
    async fn create_role(&self, role: &Role) -> Result<(), AppError> {
        let mut state = self.state.lock().await;

        if state
            .roles
            .values()
            .any(|r| r.name == role.name && r.tenant_id == role.tenant_id)
        {
            return Err(duplicate("role"));
        }

        state.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn get_role_by_id(&self, id: Uuid) -> Result<Option<Role>, AppError> {
        Ok(self.state.lock().await.roles.get(&id).cloned())
    }

    async fn get_role_by_name(
        &self,
        name: &str,
        tenant_id: TenantId,
    ) -> Result<Option<Role>, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .roles
            .values()
            .find(|r| r.name == name && r.tenant_id == tenant_id)
            .cloned())
    }

    async fn create_permission(&self, permission: &Permission) -> Result<(), AppError> {
        let mut state = self.state.lock().await;

        if state.permissions.values().any(|p| p.code == permission.code) {
            return Err(duplicate("permission"));
        }

        state.permissions.insert(permission.id, permission.clone());
        Ok(())
    }

    async fn get_permission_by_id(&self, id: Uuid) -> Result<Option<Permission>, AppError> {
        Ok(self.state.lock().await.permissions.get(&id).cloned())
    }

    async fn get_permission_by_code(&self, code: &str) -> Result<Option<Permission>, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .permissions
            .values()
            .find(|p| p.code == code)
            .cloned())
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>, AppError> {
        let state = self.state.lock().await;
        Ok(sorted_by_code(state.permissions.values().cloned().collect()))
    }

    async fn assign_permissions_to_role(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), AppError> {
        let mut state = self.state.lock().await;

        if !state.roles.contains_key(&role_id) {
            return Err(missing_reference("role"));
        }
        if permission_ids
            .iter()
            .any(|id| !state.permissions.contains_key(id))
        {
            return Err(missing_reference("permission"));
        }

        for permission_id in permission_ids {
            state.role_permissions.insert((role_id, *permission_id));
        }
        Ok(())
    }

    async fn get_permissions_for_role(&self, role_id: Uuid) -> Result<Vec<Permission>, AppError> {
        let state = self.state.lock().await;
        let permissions = state
            .role_permissions
            .iter()
            .filter(|(r, _)| *r == role_id)
            .filter_map(|(_, p)| state.permissions.get(p).cloned())
            .collect();
        Ok(sorted_by_code(permissions))
    }

    async fn assign_role_to_user(&self, user_id: Uuid, role_id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.lock().await;

        if !state.users.contains_key(&user_id) {
            return Err(missing_reference("user"));
        }
        if !state.roles.contains_key(&role_id) {
            return Err(missing_reference("role"));
        }

        state.user_roles.insert((user_id, role_id));
        Ok(())
    }

    async fn get_permission_codes_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<HashSet<String>, AppError> {
        let state = self.state.lock().await;
        let role_ids: HashSet<Uuid> = state
            .user_roles
            .iter()
            .filter(|(u, _)| *u == user_id)
            .map(|(_, r)| *r)
            .collect();

        Ok(state
            .role_permissions
            .iter()
            .filter(|(r, _)| role_ids.contains(r))
            .filter_map(|(_, p)| state.permissions.get(p).map(|p| p.code.clone()))
            .collect())
    }
}
