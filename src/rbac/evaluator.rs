/// Permission Evaluator
///
/// Resolves a user's effective permissions as the union over every assigned
/// role. Users without roles hold no permissions; that is a `false`, not an
/// error.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{Permission, Role, RoleWithPermissions, TenantId};
use crate::error::{AppError, DatabaseError};
use crate::store::{RoleStore, UserStore};
use crate::validators::{is_valid_description, is_valid_permission_code, is_valid_role_name};

pub struct PermissionEvaluator {
    roles: Arc<dyn RoleStore>,
    users: Arc<dyn UserStore>,
}

impl PermissionEvaluator {
    pub fn new(roles: Arc<dyn RoleStore>, users: Arc<dyn UserStore>) -> Self {
        Self { roles, users }
    }

    /// Create a role, global when `tenant_id` is `None`
    ///
    /// # Errors
    /// - `Validation` if the name is empty or malformed
    /// - `Database(UniqueConstraintViolation)` if the name is taken in that scope
    pub async fn create_role(
        &self,
        name: &str,
        description: &str,
        tenant_id: TenantId,
    ) -> Result<Role, AppError> {
        let role = Role {
            id: Uuid::new_v4(),
            name: is_valid_role_name(name)?,
            description: is_valid_description(description)?,
            tenant_id,
            created_at: Utc::now(),
        };

        self.roles.create_role(&role).await?;
        tracing::info!(role_id = %role.id, role_name = %role.name, "Role created");

        Ok(role)
    }

    /// Link permissions to a role; links that already exist are kept
    ///
    /// # Errors
    /// `NotFound` if the role or any of the permissions does not exist
    pub async fn assign_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), AppError> {
        if self.roles.get_role_by_id(role_id).await?.is_none() {
            return Err(AppError::not_found("role"));
        }
        for permission_id in permission_ids {
            if self
                .roles
                .get_permission_by_id(*permission_id)
                .await?
                .is_none()
            {
                return Err(AppError::not_found("permission"));
            }
        }

        self.roles
            .assign_permissions_to_role(role_id, permission_ids)
            .await?;
        tracing::info!(
            role_id = %role_id,
            permission_count = permission_ids.len(),
            "Permissions assigned to role"
        );

        Ok(())
    }

    /// # Errors
    /// `NotFound` if the user or the role does not exist
    pub async fn assign_role_to_user(&self, user_id: Uuid, role_id: Uuid) -> Result<(), AppError> {
        if self.users.get_user_by_id(user_id).await?.is_none() {
            return Err(AppError::not_found("user"));
        }
        if self.roles.get_role_by_id(role_id).await?.is_none() {
            return Err(AppError::not_found("role"));
        }

        self.roles.assign_role_to_user(user_id, role_id).await?;
        tracing::info!(user_id = %user_id, role_id = %role_id, "Role assigned to user");

        Ok(())
    }

    pub async fn has_permission(&self, user_id: Uuid, code: &str) -> Result<bool, AppError> {
        let codes = self.roles.get_permission_codes_for_user(user_id).await?;
        Ok(codes.contains(code))
    }

    pub async fn get_user_permissions(&self, user_id: Uuid) -> Result<HashSet<String>, AppError> {
        self.roles.get_permission_codes_for_user(user_id).await
    }

    /// Register a permission code of the form `resource:action`
    pub async fn create_permission(
        &self,
        code: &str,
        description: &str,
    ) -> Result<Permission, AppError> {
        let permission = Permission {
            id: Uuid::new_v4(),
            code: is_valid_permission_code(code)?,
            description: is_valid_description(description)?,
            created_at: Utc::now(),
        };

        self.roles.create_permission(&permission).await?;
        tracing::info!(permission_code = %permission.code, "Permission created");

        Ok(permission)
    }

    /// Look a permission up by code, creating it if absent
    pub async fn ensure_permission(
        &self,
        code: &str,
        description: &str,
    ) -> Result<Permission, AppError> {
        if let Some(existing) = self.roles.get_permission_by_code(code).await? {
            return Ok(existing);
        }

        match self.create_permission(code, description).await {
            // lost a concurrent insert
            Err(AppError::Database(DatabaseError::UniqueConstraintViolation(_))) => self
                .roles
                .get_permission_by_code(code)
                .await?
                .ok_or_else(|| AppError::not_found("permission")),
            other => other,
        }
    }

    /// Look a role up by name within its scope, creating it if absent
    pub async fn ensure_role(
        &self,
        name: &str,
        description: &str,
        tenant_id: TenantId,
    ) -> Result<Role, AppError> {
        if let Some(existing) = self.roles.get_role_by_name(name, tenant_id).await? {
            return Ok(existing);
        }

        match self.create_role(name, description, tenant_id).await {
            Err(AppError::Database(DatabaseError::UniqueConstraintViolation(_))) => self
                .roles
                .get_role_by_name(name, tenant_id)
                .await?
                .ok_or_else(|| AppError::not_found("role")),
            other => other,
        }
    }

    pub async fn list_permissions(&self) -> Result<Vec<Permission>, AppError> {
        self.roles.list_permissions().await
    }

    /// A role together with the permissions it holds
    pub async fn get_role(&self, role_id: Uuid) -> Result<RoleWithPermissions, AppError> {
        let role = self
            .roles
            .get_role_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::not_found("role"))?;
        let permissions = self.roles.get_permissions_for_role(role_id).await?;

        Ok(RoleWithPermissions { role, permissions })
    }
}
