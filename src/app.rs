//! Application state management.
//!
//! The `App` struct owns the session, the API client and the scan
//! pipeline state, and is the single place where navigation decisions
//! and authorization failures are applied.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::{CredentialStore, Session};
use crate::config::Config;
use crate::models::{SubmitResponse, User};
use crate::router::{guard, Route, RouteDecision};
use crate::scan::ScanState;

pub struct App {
    pub config: Config,
    pub session: Session,
    pub api: ApiClient,
    pub scan: ScanState,
    pub route: Route,
    forbidden_notice: bool,
}

impl App {
    /// Create a new application instance, restoring any persisted session
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let data_dir = Config::data_dir().unwrap_or_else(|_| PathBuf::from("./gasketscan"));
        let base_url = config.base_url();
        Self::with_data_dir(config, data_dir, base_url)
    }

    fn with_data_dir(config: Config, data_dir: PathBuf, base_url: String) -> Result<Self> {
        let mut session = Session::new(data_dir);
        if let Err(e) = session.load() {
            warn!(error = %e, "Failed to restore session, starting signed out");
        }

        let mut api = ApiClient::new(base_url)?;
        if let Some(token) = session.token() {
            api.set_token(token.to_string());
        }

        let mut app = Self {
            config,
            session,
            api,
            scan: ScanState::new(),
            route: Route::Login,
            forbidden_notice: false,
        };
        // A restored session skips the login page immediately
        app.navigate(Route::Login);
        Ok(app)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Request a page transition. The guard decides where the app
    /// actually lands; the forbidden notice is recorded for the landing
    /// page to display.
    pub fn navigate(&mut self, to: Route) -> Route {
        match guard(to, &self.session) {
            RouteDecision::Allow => {
                self.route = to;
            }
            RouteDecision::Redirect { to, forbidden } => {
                if forbidden {
                    self.forbidden_notice = true;
                }
                self.route = to;
            }
        }
        self.route
    }

    /// Read and dismiss the access-refused notice
    pub fn take_forbidden_notice(&mut self) -> bool {
        std::mem::take(&mut self.forbidden_notice)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Attempt a login and, on success, persist the session and move to
    /// the account's landing page.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        if username.is_empty() || password.is_empty() {
            anyhow::bail!("Username and password required");
        }

        let session_data = match self.api.login(username, password).await {
            Ok(data) => data,
            Err(e) => {
                // A 401 from the token endpoint means rejected credentials
                // (or a deactivated account), not an expired session
                if matches!(e.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized)) {
                    anyhow::bail!("Invalid username or password");
                }
                return Err(e);
            }
        };

        if let Err(e) = CredentialStore::store(username, password) {
            warn!(error = %e, "Failed to store credentials");
        }

        self.config.last_username = Some(username.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        self.api.set_token(session_data.token.clone());
        self.session.update(session_data);
        if let Err(e) = self.session.save() {
            warn!(error = %e, "Failed to save session");
        }

        info!(username, "Login successful");
        self.navigate(Route::Camera);
        Ok(())
    }

    /// Clear the session and return to the login page
    pub fn logout(&mut self) {
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }
        self.api.clear_token();
        self.scan.clear();
        self.route = Route::Login;
        info!("Signed out");
    }

    /// Change the account password; the backend grants a replacement
    /// token without the forced-change flag.
    pub async fn change_password(&mut self, current: &str, new: &str) -> Result<()> {
        let result = self.api.change_password(current, new).await;
        let session_data = self.after_api(result)?;

        self.api.set_token(session_data.token.clone());
        self.session.update(session_data);
        if let Err(e) = self.session.save() {
            warn!(error = %e, "Failed to save session");
        }

        info!("Password changed");
        self.navigate(Route::Camera);
        Ok(())
    }

    // =========================================================================
    // Scan pipeline
    // =========================================================================

    /// Run the analysis pipeline on the captured photo
    pub async fn process_photo(&mut self) -> Result<()> {
        let photo = match self.scan.photo() {
            Some(bytes) => bytes.to_vec(),
            None => anyhow::bail!("No photo captured"),
        };

        let result = self.api.process_image(photo).await;
        let analysis = self.after_api(result)?;
        self.scan.set_result(analysis);
        Ok(())
    }

    /// Submit the validated scan dossier
    pub async fn submit_scan(&mut self) -> Result<SubmitResponse> {
        let photo = match self.scan.photo() {
            Some(bytes) => bytes.to_vec(),
            None => anyhow::bail!("No photo captured"),
        };
        let analysis = match self.scan.result() {
            Some(result) => result.clone(),
            None => anyhow::bail!("Photo has not been analysed yet"),
        };

        let thickness = self.scan.thickness_mm();
        let result = self.api.submit_scan(photo, &analysis, thickness).await;
        self.after_api(result)
    }

    /// Discard the current dossier and return to the camera page
    pub fn new_scan(&mut self) {
        self.scan.clear();
        self.navigate(Route::Camera);
    }

    // =========================================================================
    // Account administration
    // =========================================================================

    pub async fn list_users(&mut self) -> Result<Vec<User>> {
        let result = self.api.list_users().await;
        self.after_api(result)
    }

    pub async fn create_user(&mut self, username: &str, password: &str) -> Result<User> {
        let result = self.api.create_user(username, password).await;
        self.after_api(result)
    }

    pub async fn deactivate_user(&mut self, username: &str) -> Result<User> {
        let result = self.api.deactivate_user(username).await;
        self.after_api(result)
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    /// Apply the session-expiry contract to an API outcome: a 401 on any
    /// authenticated call clears the session and lands on the login
    /// page; the error still reaches the caller.
    fn after_api<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(ref e) = result {
            if matches!(e.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized)) {
                warn!("Authorization expired, clearing session");
                self.logout();
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionData;
    use crate::models::{Role, ScanDimensions};
    use chrono::Utc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_app(base_url: String) -> (App, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let app = App::with_data_dir(Config::default(), dir.path().to_path_buf(), base_url)
            .unwrap();
        (app, dir)
    }

    fn sign_in(app: &mut App, role: Role, force_password_change: bool) {
        app.session.update(SessionData {
            token: "tok".to_string(),
            username: "jdupont".to_string(),
            role,
            force_password_change,
            created_at: Utc::now(),
        });
        app.api.set_token("tok".to_string());
    }

    #[tokio::test]
    async fn test_unauthenticated_camera_request_lands_on_login() {
        let (mut app, _dir) = test_app("http://127.0.0.1:9".to_string());
        assert_eq!(app.navigate(Route::Camera), Route::Login);
    }

    #[tokio::test]
    async fn test_operator_admin_request_sets_dismissible_notice() {
        let (mut app, _dir) = test_app("http://127.0.0.1:9".to_string());
        sign_in(&mut app, Role::Operator, false);

        assert_eq!(app.navigate(Route::AdminUsers), Route::Camera);
        assert!(app.take_forbidden_notice());
        // The notice is dismissed after one read
        assert!(!app.take_forbidden_notice());
    }

    #[tokio::test]
    async fn test_forced_change_overrides_camera_request() {
        let (mut app, _dir) = test_app("http://127.0.0.1:9".to_string());
        sign_in(&mut app, Role::Operator, true);
        assert_eq!(app.navigate(Route::Camera), Route::ChangePassword);
    }

    #[tokio::test]
    async fn test_login_stores_session_and_lands_on_camera() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-abc",
                "token_type": "bearer",
                "user": {
                    "username": "jdupont",
                    "role": "operator",
                    "force_password_change": false
                }
            })))
            .mount(&server)
            .await;

        let (mut app, _dir) = test_app(server.uri());
        app.login("jdupont", "secret").await.unwrap();

        assert!(app.session.is_authenticated());
        assert_eq!(app.route, Route::Camera);
    }

    #[tokio::test]
    async fn test_login_with_forced_change_lands_on_change_password() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-abc",
                "token_type": "bearer",
                "user": {
                    "username": "jdupont",
                    "role": "operator",
                    "force_password_change": true
                }
            })))
            .mount(&server)
            .await;

        let (mut app, _dir) = test_app(server.uri());
        app.login("jdupont", "provisional").await.unwrap();

        assert_eq!(app.route, Route::ChangePassword);
    }

    #[tokio::test]
    async fn test_login_rejection_reports_bad_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "detail": "Identifiant ou mot de passe incorrect."
            })))
            .mount(&server)
            .await;

        let (mut app, _dir) = test_app(server.uri());
        let err = app.login("jdupont", "wrong").await.unwrap_err();

        assert_eq!(err.to_string(), "Invalid username or password");
        assert!(!app.session.is_authenticated());
        assert_eq!(app.route, Route::Login);
    }

    #[tokio::test]
    async fn test_expired_token_forces_logout_and_login_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/admin/users"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "detail": "Token invalide."
            })))
            .mount(&server)
            .await;

        let (mut app, _dir) = test_app(server.uri());
        sign_in(&mut app, Role::Admin, false);
        app.navigate(Route::AdminUsers);

        let err = app.list_users().await.unwrap_err();
        assert_eq!(err.to_string(), "Session expired. Please sign in again.");
        assert!(!app.session.is_authenticated());
        assert_eq!(app.route, Route::Login);
    }

    #[tokio::test]
    async fn test_process_and_submit_flow() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/scan/process"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "contour_points": [[0.1, 0.2], [0.9, 0.8]],
                "dimensions": {"width_mm": 30.5, "height_mm": 20.0},
                "calibration_warning": false,
                "holes": []
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/scan/submit"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "accepted"})),
            )
            .mount(&server)
            .await;

        let (mut app, _dir) = test_app(server.uri());
        sign_in(&mut app, Role::Operator, false);

        app.scan.set_photo(b"fake-jpeg-photo".to_vec());
        app.process_photo().await.unwrap();
        assert!(app.scan.has_result());

        app.scan.set_thickness(Some(2.5));
        let response = app.submit_scan().await.unwrap();
        assert!(response.is_accepted());
    }

    #[tokio::test]
    async fn test_submit_requires_photo_and_result() {
        let (mut app, _dir) = test_app("http://127.0.0.1:9".to_string());
        sign_in(&mut app, Role::Operator, false);

        let err = app.submit_scan().await.unwrap_err();
        assert!(err.to_string().contains("No photo"));

        app.scan.set_photo(vec![1]);
        let err = app.submit_scan().await.unwrap_err();
        assert!(err.to_string().contains("not been analysed"));
    }

    #[tokio::test]
    async fn test_new_scan_resets_dossier() {
        let (mut app, _dir) = test_app("http://127.0.0.1:9".to_string());
        sign_in(&mut app, Role::Operator, false);

        app.scan.set_photo(vec![1]);
        app.scan.set_result(crate::models::ProcessResult {
            contour_points: vec![],
            dimensions: ScanDimensions {
                width_mm: 1.0,
                height_mm: 1.0,
            },
            calibration_warning: false,
            holes: vec![],
        });
        app.scan.set_thickness(Some(3.0));

        app.new_scan();
        assert!(!app.scan.has_photo());
        assert!(!app.scan.has_result());
        assert_eq!(app.route, Route::Camera);
    }
}
