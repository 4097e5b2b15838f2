use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use iam_server::auth::TokenIssuer;
use iam_server::bootstrap::run_bootstrap;
use iam_server::configuration::get_configuration;
use iam_server::startup::{run, AppState};
use iam_server::store::PgStore;
use iam_server::sweeper::spawn_session_sweeper;
use iam_server::telemetry::init_telemetry;

fn startup_error(kind: std::io::ErrorKind, message: &str) -> std::io::Error {
    std::io::Error::new(kind, message.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = get_configuration().map_err(|e| {
        tracing::error!("Failed to read configuration: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let issuer = TokenIssuer::new(&configuration.jwt).map_err(|e| {
        tracing::error!("Invalid token settings: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let sweep_interval = configuration.sessions.sweep_interval().map_err(|e| {
        tracing::error!("Invalid session settings: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    tracing::info!(
        host = %configuration.database.host,
        database = %configuration.database.database_name,
        "Connecting to database"
    );
    let pool = PgPoolOptions::new()
        .max_connections(configuration.database.max_connections)
        .acquire_timeout(configuration.database.acquire_timeout())
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            startup_error(std::io::ErrorKind::ConnectionRefused, "Database connection error")
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        startup_error(std::io::ErrorKind::Other, "Migration error")
    })?;

    let store = Arc::new(PgStore::new(pool));
    let state = AppState::from_store(store.clone(), Arc::new(issuer));

    run_bootstrap(&state.auth, &state.rbac, &configuration.bootstrap)
        .await
        .map_err(|e| {
            tracing::error!("Bootstrap failed: {}", e);
            startup_error(std::io::ErrorKind::Other, "Bootstrap error")
        })?;

    spawn_session_sweeper(store, sweep_interval);

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, state)?.await
}
