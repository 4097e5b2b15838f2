mod auth;
mod health_check;
mod roles;
mod users;

pub use auth::{login, logout, refresh, register};
pub use health_check::health_check;
pub use roles::{create_permission, create_role, get_role, list_permissions};
pub use users::{assign_role, create_user, get_my_permissions, reset_user_password, update_user_status};
