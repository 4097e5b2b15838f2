use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{AuthService, TokenIssuer};
use crate::logger::LoggerMiddleware;
use crate::middleware::{JwtMiddleware, RequirePermission};
use crate::rbac::PermissionEvaluator;
use crate::routes::{
    assign_role, create_permission, create_role, create_user, get_my_permissions, get_role,
    health_check, list_permissions, login, logout, refresh, register, reset_user_password,
    update_user_status,
};
use crate::store::{CredentialStore, RoleStore, SessionStore, UserStore};

/// Services shared by every worker
#[derive(Clone)]
pub struct AppState {
    pub auth: web::Data<AuthService>,
    pub rbac: web::Data<PermissionEvaluator>,
    pub issuer: Arc<TokenIssuer>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        roles: Arc<dyn RoleStore>,
        issuer: Arc<TokenIssuer>,
    ) -> Self {
        let auth = AuthService::new(users.clone(), credentials, sessions, issuer.clone());
        let rbac = PermissionEvaluator::new(roles, users);

        Self {
            auth: web::Data::new(auth),
            rbac: web::Data::new(rbac),
            issuer,
        }
    }

    /// Build every service over one store implementing all contracts
    pub fn from_store<S>(store: Arc<S>, issuer: Arc<TokenIssuer>) -> Self
    where
        S: UserStore + CredentialStore + SessionStore + RoleStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store.clone(), store, issuer)
    }
}

/// Register shared state and every route on `cfg`
pub fn configure(state: &AppState, cfg: &mut web::ServiceConfig) {
    cfg.app_data(state.auth.clone())
        .app_data(state.rbac.clone())
        // Public routes
        .route("/health_check", web::get().to(health_check))
        .route("/auth/register", web::post().to(register))
        .route("/auth/login", web::post().to(login))
        .route("/auth/refresh", web::post().to(refresh))
        .route("/auth/logout", web::post().to(logout))
        // Protected routes
        .service(
            web::scope("/api")
                .wrap(JwtMiddleware::new(state.issuer.clone()))
                .route("/users/me/permissions", web::get().to(get_my_permissions))
                .route(
                    "/users",
                    web::post()
                        .to(create_user)
                        .wrap(RequirePermission::new("users:create")),
                )
                .route(
                    "/users/{id}/status",
                    web::put()
                        .to(update_user_status)
                        .wrap(RequirePermission::new("users:manage_status")),
                )
                .route(
                    "/users/{id}/password",
                    web::post()
                        .to(reset_user_password)
                        .wrap(RequirePermission::new("users:reset_password")),
                )
                .route(
                    "/users/{id}/roles",
                    web::post()
                        .to(assign_role)
                        .wrap(RequirePermission::new("roles:assign")),
                )
                .route(
                    "/roles",
                    web::post()
                        .to(create_role)
                        .wrap(RequirePermission::new("roles:create")),
                )
                .route("/roles/{id}", web::get().to(get_role))
                .route(
                    "/permissions",
                    web::post()
                        .to(create_permission)
                        .wrap(RequirePermission::new("permissions:create")),
                )
                .route(
                    "/permissions",
                    web::get()
                        .to(list_permissions)
                        .wrap(RequirePermission::new("permissions:list")),
                ),
        );
}

pub fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    let server = HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)
            .wrap(Logger::default())
            .configure(|cfg| configure(&state, cfg))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
