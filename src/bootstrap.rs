/// First-run seeding
///
/// Ensures the default permission catalogue and a global `super_admin` role
/// holding all of it. When no user exists yet and admin credentials are
/// configured, creates the initial administrator and grants it that role.
/// Safe to run on every start.

use crate::auth::AuthService;
use crate::configuration::BootstrapSettings;
use crate::error::AppError;
use crate::rbac::PermissionEvaluator;

pub const SUPER_ADMIN_ROLE: &str = "super_admin";

pub const DEFAULT_PERMISSIONS: &[(&str, &str)] = &[
    ("users:create", "Create users"),
    ("users:list", "List users"),
    ("users:manage_status", "Activate or deactivate users"),
    ("users:reset_password", "Reset user passwords"),
    ("tenants:create", "Create tenants"),
    ("tenants:list", "List tenants"),
    ("tenants:manage_status", "Activate or deactivate tenants"),
    ("tenants:manage_config", "Manage tenant configuration"),
    ("roles:create", "Create roles"),
    ("roles:assign", "Assign roles to users"),
    ("permissions:create", "Create permissions"),
    ("permissions:list", "List permissions"),
    ("apikeys:create", "Create API keys"),
    ("apikeys:list", "List API keys"),
    ("apikeys:delete", "Delete API keys"),
];

/// What a bootstrap run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOutcome {
    pub super_admin_role_id: uuid::Uuid,
    /// Set when this run created the initial administrator
    pub created_admin_id: Option<uuid::Uuid>,
}

pub async fn run_bootstrap(
    auth: &AuthService,
    rbac: &PermissionEvaluator,
    settings: &BootstrapSettings,
) -> Result<BootstrapOutcome, AppError> {
    let mut permission_ids = Vec::with_capacity(DEFAULT_PERMISSIONS.len());
    for (code, description) in DEFAULT_PERMISSIONS {
        permission_ids.push(rbac.ensure_permission(code, description).await?.id);
    }

    let role = rbac
        .ensure_role(SUPER_ADMIN_ROLE, "Full access to every resource", None)
        .await?;
    rbac.assign_permissions(role.id, &permission_ids).await?;
    tracing::info!(
        role_id = %role.id,
        permission_count = permission_ids.len(),
        "Permission catalogue ensured"
    );

    let created_admin_id = match (&settings.admin_email, &settings.admin_password) {
        (Some(email), Some(password)) => {
            if auth.has_users().await? {
                None
            } else {
                let name = settings.admin_name.as_deref().unwrap_or("Administrator");
                let admin = auth.create_account(None, name, email, password).await?;
                rbac.assign_role_to_user(admin.id, role.id).await?;
                tracing::info!(user_id = %admin.id, "Initial administrator created");
                Some(admin.id)
            }
        }
        _ => {
            tracing::debug!("No initial administrator configured");
            None
        }
    };

    Ok(BootstrapOutcome {
        super_admin_role_id: role.id,
        created_admin_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenIssuer;
    use crate::configuration::JwtSettings;
    use crate::store::{InMemoryStore, UserStore};
    use std::sync::Arc;

    fn services(store: &InMemoryStore) -> (AuthService, PermissionEvaluator) {
        let store = Arc::new(store.clone());
        let issuer = TokenIssuer::new(&JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            issuer: "test".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 2_592_000,
        })
        .unwrap();
        (
            AuthService::new(store.clone(), store.clone(), store.clone(), Arc::new(issuer)),
            PermissionEvaluator::new(store.clone(), store),
        )
    }

    fn admin_settings() -> BootstrapSettings {
        BootstrapSettings {
            admin_email: Some("admin@example.com".to_string()),
            admin_password: Some("admin-password".to_string()),
            admin_name: None,
        }
    }

    #[tokio::test]
    async fn creates_admin_holding_every_default_permission() {
        let store = InMemoryStore::new();
        let (auth, rbac) = services(&store);

        let outcome = run_bootstrap(&auth, &rbac, &admin_settings()).await.unwrap();

        let admin_id = outcome.created_admin_id.expect("admin should be created");
        let codes = rbac.get_user_permissions(admin_id).await.unwrap();
        assert_eq!(codes.len(), DEFAULT_PERMISSIONS.len());
        for (code, _) in DEFAULT_PERMISSIONS {
            assert!(codes.contains(*code), "missing {}", code);
        }
        assert!(auth.login("admin@example.com", "admin-password").await.is_ok());
    }

    #[tokio::test]
    async fn second_run_changes_nothing() {
        let store = InMemoryStore::new();
        let (auth, rbac) = services(&store);

        let first = run_bootstrap(&auth, &rbac, &admin_settings()).await.unwrap();
        let second = run_bootstrap(&auth, &rbac, &admin_settings()).await.unwrap();

        assert_eq!(first.super_admin_role_id, second.super_admin_role_id);
        assert_eq!(second.created_admin_id, None);
        assert_eq!(store.count_users().await.unwrap(), 1);
        assert_eq!(
            rbac.list_permissions().await.unwrap().len(),
            DEFAULT_PERMISSIONS.len()
        );
    }

    #[tokio::test]
    async fn without_admin_settings_only_the_catalogue_is_seeded() {
        let store = InMemoryStore::new();
        let (auth, rbac) = services(&store);

        let outcome = run_bootstrap(&auth, &rbac, &BootstrapSettings::default())
            .await
            .unwrap();

        assert_eq!(outcome.created_admin_id, None);
        assert_eq!(store.count_users().await.unwrap(), 0);
        let role = rbac.get_role(outcome.super_admin_role_id).await.unwrap();
        assert_eq!(role.permissions.len(), DEFAULT_PERMISSIONS.len());
    }
}
