/// Middleware module
///
/// Bearer-token authentication and per-route permission guards.

mod jwt_middleware;
mod permission;

pub use jwt_middleware::JwtMiddleware;
pub use permission::RequirePermission;
