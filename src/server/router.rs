use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::SqliteStore;

use crate::app_state::AppState;
use crate::server::constants::MULTIPART_OVERHEAD_BYTES;
use crate::server::handlers;

/// Construct the application's HTTP router with all routes and middleware configured.
pub fn build_router(
    state: AppState,
    session_layer: SessionManagerLayer<SqliteStore>,
) -> Router {
    let upload_body_limit = state
        .config()
        .uploads
        .max_file_size_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let upload_body_limit = usize::try_from(upload_body_limit).unwrap_or(usize::MAX);

    let upload_routes = Router::new()
        .route(
            "/files",
            get(handlers::uploads::file_form_handler)
                .post(handlers::uploads::file_submit_handler),
        )
        .layer(DefaultBodyLimit::max(upload_body_limit));

    Router::new()
        .route("/", get(handlers::home::home_handler))
        .route(
            "/login",
            get(handlers::auth::login_form_handler).post(handlers::auth::login_submit_handler),
        )
        .route("/logout", post(handlers::auth::logout_handler))
        .route(
            "/text",
            get(handlers::paste::text_form_handler).post(handlers::paste::text_submit_handler),
        )
        .route("/t/{id}", get(handlers::files::text_page_handler))
        .route("/u/{id}", get(handlers::files::file_page_handler))
        .route("/dl/{id}", get(handlers::downloads::download_handler))
        .merge(upload_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(session_layer),
        )
        .with_state(state)
}
