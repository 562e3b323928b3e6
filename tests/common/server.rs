//! Server test utilities.

use axum::{body::Body, http::Request, response::Response, Router};
use pastebox::{
    app_state::AppState, auth::provision_credential, config::AppConfig,
    database::initialize_database, server::build_router, sessions::session_layer,
};
use std::path::PathBuf;
use tempfile::TempDir;
use tower::ServiceExt;
use tower_sessions_sqlx_store::SqliteStore;

use super::requests::{form_request, session_cookie};

pub const TEST_USER: &str = "alice";
pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: Router,
    pub state: AppState,
    pub uploads_dir: PathBuf,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary storage and default settings.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server after letting the caller adjust the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let mut config = AppConfig::for_testing(temp_dir.path());
        adjust(&mut config);
        config.validate().expect("Test configuration should be valid");

        let pool = initialize_database(&config)
            .await
            .expect("Failed to initialize database");

        let sessions = session_layer(SqliteStore::new(pool.clone()), &config.session);
        let uploads_dir = config.storage.uploads_dir.clone();
        let state = AppState::new(pool, config);
        let router = build_router(state.clone(), sessions);

        Self {
            router,
            state,
            uploads_dir,
            _temp_dir: temp_dir,
        }
    }

    /// Send a request through the full router.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router should be infallible")
    }

    pub async fn provision(&self, username: &str, password: &str) {
        provision_credential(self.state.db(), username, password)
            .await
            .expect("Failed to provision credential");
    }

    /// Provision the default user, log in and return the session cookie.
    pub async fn login(&self) -> String {
        self.provision(TEST_USER, TEST_PASSWORD).await;

        let body = format!("username={TEST_USER}&password=correct+horse+battery+staple");
        let response = self.send(form_request("/login", &body, None)).await;
        assert_eq!(response.status(), axum::http::StatusCode::SEE_OTHER);

        session_cookie(&response).expect("Login should set a session cookie")
    }

    /// Names of the files currently in the uploads directory.
    pub fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.uploads_dir)
            .expect("Uploads directory should exist")
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
