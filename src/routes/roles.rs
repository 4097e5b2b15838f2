/// Role and permission catalogue routes

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::TenantId;
use crate::error::AppError;
use crate::rbac::PermissionEvaluator;

#[derive(Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tenant_id: TenantId,
    #[serde(default)]
    pub permission_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
pub struct CreatePermissionRequest {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

/// POST /api/roles (`roles:create`)
///
/// Returns the role with its permissions. When `permission_ids` names an
/// unknown permission the role still exists and the call fails with 404.
pub async fn create_role(
    form: web::Json<CreateRoleRequest>,
    rbac: web::Data<PermissionEvaluator>,
) -> Result<HttpResponse, AppError> {
    let role = rbac
        .create_role(&form.name, &form.description, form.tenant_id)
        .await?;

    if !form.permission_ids.is_empty() {
        rbac.assign_permissions(role.id, &form.permission_ids).await?;
    }

    let role = rbac.get_role(role.id).await?;
    Ok(HttpResponse::Created().json(role))
}

/// GET /api/roles/{id}
pub async fn get_role(
    path: web::Path<Uuid>,
    rbac: web::Data<PermissionEvaluator>,
) -> Result<HttpResponse, AppError> {
    let role = rbac.get_role(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(role))
}

/// POST /api/permissions (`permissions:create`)
pub async fn create_permission(
    form: web::Json<CreatePermissionRequest>,
    rbac: web::Data<PermissionEvaluator>,
) -> Result<HttpResponse, AppError> {
    let permission = rbac.create_permission(&form.code, &form.description).await?;
    Ok(HttpResponse::Created().json(permission))
}

/// GET /api/permissions (`permissions:list`)
pub async fn list_permissions(
    rbac: web::Data<PermissionEvaluator>,
) -> Result<HttpResponse, AppError> {
    let permissions = rbac.list_permissions().await?;
    Ok(HttpResponse::Ok().json(permissions))
}
