/// Authentication Routes
///
/// Public endpoints for registration, login, token refresh and logout.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::auth::AuthService;
use crate::error::{AppError, ErrorContext};
use crate::logger::request_id;

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(alias = "name")]
    pub display_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of both refresh and logout
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /auth/register
///
/// Creates a system-level user and returns its first token pair.
///
/// # Errors
/// - 400: empty or malformed field, weak password
/// - 409: email already registered
pub async fn register(
    req: HttpRequest,
    form: web::Json<RegisterRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration").with_request_id(request_id(&req));

    let tokens = auth
        .register(&form.display_name, &form.email, &form.password)
        .await
        .map_err(|e| {
            context.log_error(&e);
            e
        })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %tokens.user_id,
        "Registration completed"
    );

    Ok(HttpResponse::Created().json(tokens))
}

/// POST /auth/login
///
/// # Errors
/// - 401: unknown email or wrong password (indistinguishable)
/// - 403: account is inactive
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let tokens = auth.login(&form.email, &form.password).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /auth/refresh
///
/// Rotates the refresh token; the presented one stops working.
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let tokens = auth.refresh(&form.refresh_token).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /auth/logout
///
/// Answers the same whether or not the token was known.
pub async fn logout(
    form: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    auth.logout(&form.refresh_token).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Logged out" })))
}
