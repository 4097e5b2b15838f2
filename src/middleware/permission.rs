/// Permission guard
///
/// Must sit inside `JwtMiddleware`: it reads the caller's `Claims` from
/// request extensions and asks the `PermissionEvaluator` (registered as
/// `web::Data`) whether the caller holds one permission code.
///
/// - no claims: 401
/// - permission not held: 403
/// - evaluator failure: 500

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::Claims;
use crate::error::{AppError, AuthError};
use crate::rbac::PermissionEvaluator;

pub struct RequirePermission {
    code: Rc<str>,
}

impl RequirePermission {
    pub fn new(code: &str) -> Self {
        Self { code: code.into() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequirePermission
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequirePermissionService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequirePermissionService {
            service: Rc::new(service),
            code: self.code.clone(),
        }))
    }
}

pub struct RequirePermissionService<S> {
    service: Rc<S>,
    code: Rc<str>,
}

impl<S, B> Service<ServiceRequest> for RequirePermissionService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let claims = req.extensions().get::<Claims>().cloned();
        let evaluator = req.app_data::<web::Data<PermissionEvaluator>>().cloned();
        let service = self.service.clone();
        let code = self.code.clone();

        Box::pin(async move {
            let claims = claims.ok_or(AppError::Auth(AuthError::MissingToken))?;
            let user_id = claims.user_id()?;
            let evaluator = evaluator.ok_or_else(|| {
                AppError::Internal("permission evaluator is not registered".to_string())
            })?;

            let allowed = evaluator
                .has_permission(user_id, &code)
                .await
                .map_err(|e| {
                    tracing::error!(user_id = %user_id, permission = %code, error = %e, "Permission check failed");
                    AppError::Internal("permission check failed".to_string())
                })?;

            if !allowed {
                tracing::warn!(user_id = %user_id, permission = %code, "Permission denied");
                return Err(AppError::Auth(AuthError::Forbidden).into());
            }

            service.call(req).await
        })
    }
}
