/// User administration routes
///
/// All mounted under `/api` behind `JwtMiddleware`; everything except
/// `/users/me/permissions` also requires a permission code.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AuthService, Claims};
use crate::domain::{TenantId, User};
use crate::error::{AppError, ErrorContext};
use crate::logger::request_id;
use crate::rbac::PermissionEvaluator;

#[derive(Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub tenant_id: TenantId,
    pub display_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub is_active: bool,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct AssignRoleRequest {
    pub role_id: Uuid,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub display_name: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            tenant_id: user.tenant_id,
            display_name: user.display_name,
            email: user.email,
            is_active: user.is_active,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct PermissionsResponse {
    pub user_id: Uuid,
    pub permissions: Vec<String>,
}

/// GET /api/users/me/permissions
pub async fn get_my_permissions(
    claims: web::ReqData<Claims>,
    rbac: web::Data<PermissionEvaluator>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut permissions: Vec<String> = rbac
        .get_user_permissions(user_id)
        .await?
        .into_iter()
        .collect();
    permissions.sort();

    Ok(HttpResponse::Ok().json(PermissionsResponse {
        user_id,
        permissions,
    }))
}

/// POST /api/users (`users:create`)
///
/// Creates an account, optionally inside a tenant, without opening a session.
pub async fn create_user(
    req: HttpRequest,
    claims: web::ReqData<Claims>,
    form: web::Json<CreateUserRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_creation")
        .with_request_id(request_id(&req))
        .with_user_id(claims.sub.clone());

    let user = auth
        .create_account(form.tenant_id, &form.display_name, &form.email, &form.password)
        .await
        .map_err(|e| {
            context.log_error(&e);
            e
        })?;

    tracing::info!(
        request_id = %context.request_id,
        created_by = %claims.sub,
        user_id = %user.id,
        "User created"
    );

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// PUT /api/users/{id}/status (`users:manage_status`)
pub async fn update_user_status(
    path: web::Path<Uuid>,
    form: web::Json<UpdateStatusRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    auth.set_user_status(user_id, form.is_active).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user_id": user_id,
        "is_active": form.is_active,
    })))
}

/// POST /api/users/{id}/password (`users:reset_password`)
///
/// Replaces the credential and signs the user out everywhere.
pub async fn reset_user_password(
    path: web::Path<Uuid>,
    form: web::Json<ResetPasswordRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    auth.update_password(path.into_inner(), &form.new_password).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Password updated" })))
}

/// POST /api/users/{id}/roles (`roles:assign`)
pub async fn assign_role(
    path: web::Path<Uuid>,
    form: web::Json<AssignRoleRequest>,
    rbac: web::Data<PermissionEvaluator>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    rbac.assign_role_to_user(user_id, form.role_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user_id": user_id,
        "role_id": form.role_id,
    })))
}
