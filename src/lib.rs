pub mod auth;
pub mod bootstrap;
pub mod configuration;
pub mod domain;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod rbac;
pub mod routes;
pub mod startup;
pub mod store;
pub mod sweeper;
pub mod telemetry;
pub mod validators;
