use pastebox::{
    app_state::AppState,
    auth::{bootstrap_user, AuthError},
    cleanup::spawn_cleanup_job,
    config::{self, AppConfig},
    database::{self, initialize_database},
    logging::init_logging,
    server::build_router,
    sessions::session_layer,
};
use thiserror::Error;
use tower_sessions_sqlx_store::SqliteStore;
use tracing::info;

#[derive(Debug, Error)]
enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Database initialization error: {0}")]
    DatabaseInit(#[from] database::DatabaseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Logging error: {0}")]
    Logging(String),
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Logging format is part of the configuration, so load that first
    let config = AppConfig::load()?;

    init_logging(config.logging.format).map_err(|e| AppError::Logging(e.to_string()))?;
    info!("Starting pastebox");

    let db_pool = initialize_database(&config).await?;

    // Provision the first account when bootstrap credentials are supplied
    bootstrap_user(&db_pool).await?;

    let session_store = SqliteStore::new(db_pool.clone());
    let sessions = session_layer(session_store.clone(), &config.session);
    spawn_cleanup_job(session_store);

    let addr = config.bind_addr()?;
    let app_state = AppState::new(db_pool, config);

    // Middleware order: Trace -> Sessions -> Routes
    let app = build_router(app_state, sessions);

    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
