//! API client for communicating with the measurement backend.
//!
//! This module provides the `ApiClient` struct for authentication,
//! account administration and the scan pipeline endpoints.

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::{header, multipart, Client};
use serde::Deserialize;
use tracing::debug;

use crate::auth::SessionData;
use crate::models::{DetectResponse, ProcessResult, Role, SubmitResponse, User};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow analysis responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// File name attached to sampled detection frames
const FRAME_FILE_NAME: &str = "frame.jpg";

/// File name attached to full-resolution captured photos
const PHOTO_FILE_NAME: &str = "photo.jpg";

/// Token grant returned by the auth endpoints
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    username: String,
    role: Role,
    force_password_change: bool,
}

impl TokenResponse {
    fn into_session_data(self) -> SessionData {
        SessionData {
            token: self.access_token,
            username: self.user.username,
            role: self.user.role,
            force_password_change: self.user.force_password_change,
            created_at: Utc::now(),
        }
    }
}

/// API client for the measurement backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client for the given backend base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Drop the bearer token after a logout or expired session
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with the parsed
    /// detail message if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    // ===== Authentication =====

    /// Sign in with username/password and return the granted session.
    /// The backend answers 401 with the same message for an unknown
    /// account, a wrong password and a deactivated account.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionData> {
        let url = self.url("/api/v1/auth/token");

        let response = self
            .client
            .post(&url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .context("Failed to send login request")?;

        let response = Self::check_response(response).await?;

        let grant: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        debug!(username = %grant.user.username, "Login succeeded");
        Ok(grant.into_session_data())
    }

    /// Change the signed-in account's password.
    /// Returns the replacement session whose token no longer carries the
    /// forced-change flag.
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<SessionData> {
        let url = self.url("/api/v1/auth/change-password");
        let body = serde_json::json!({
            "current_password": current_password,
            "new_password": new_password,
        });

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .json(&body)
            .send()
            .await
            .context("Failed to send change-password request")?;

        let response = Self::check_response(response).await?;

        let grant: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        Ok(grant.into_session_data())
    }

    // ===== Account administration =====

    /// Fetch all accounts, sorted by creation date by the backend
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let url = self.url("/api/v1/admin/users");

        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .context("Failed to fetch user list")?;

        let response = Self::check_response(response).await?;

        response
            .json()
            .await
            .context("Failed to parse user list response")
    }

    /// Create an operator account with a provisional password.
    /// The backend answers 409 when the username is already taken.
    pub async fn create_user(&self, username: &str, password: &str) -> Result<User> {
        let url = self.url("/api/v1/admin/users");
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .json(&body)
            .send()
            .await
            .context("Failed to send create-user request")?;

        let response = Self::check_response(response).await?;

        response
            .json()
            .await
            .context("Failed to parse created user response")
    }

    /// Deactivate an account. The backend refuses the admin's own account
    /// (400) and unknown usernames (404).
    pub async fn deactivate_user(&self, username: &str) -> Result<User> {
        let url = self.url(&format!("/api/v1/admin/users/{}/deactivate", username));

        let response = self
            .client
            .patch(&url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .context("Failed to send deactivate request")?;

        let response = Self::check_response(response).await?;

        response
            .json()
            .await
            .context("Failed to parse deactivated user response")
    }

    // ===== Scan pipeline =====

    /// Submit a sampled frame to the live card-detection endpoint
    pub async fn detect_card(&self, frame: Vec<u8>) -> Result<DetectResponse> {
        let url = self.url("/api/v1/scan/detect-card");

        let part = multipart::Part::bytes(frame)
            .file_name(FRAME_FILE_NAME)
            .mime_str("image/jpeg")?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .multipart(form)
            .send()
            .await
            .context("Failed to send detection frame")?;

        let response = Self::check_response(response).await?;

        response
            .json()
            .await
            .context("Failed to parse detection response")
    }

    /// Run the full analysis pipeline on a captured photo.
    /// The backend answers 422 when the bytes cannot be decoded as an image.
    pub async fn process_image(&self, photo: Vec<u8>) -> Result<ProcessResult> {
        let url = self.url("/api/v1/scan/process");

        let part = multipart::Part::bytes(photo)
            .file_name(PHOTO_FILE_NAME)
            .mime_str("image/jpeg")?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .multipart(form)
            .send()
            .await
            .context("Failed to send photo for analysis")?;

        let response = Self::check_response(response).await?;

        response
            .json()
            .await
            .context("Failed to parse analysis response")
    }

    /// Submit the complete scan dossier: photo, validated analysis result
    /// and the optional manually measured thickness.
    pub async fn submit_scan(
        &self,
        photo: Vec<u8>,
        result: &ProcessResult,
        thickness_mm: Option<f64>,
    ) -> Result<SubmitResponse> {
        let url = self.url("/api/v1/scan/submit");

        let part = multipart::Part::bytes(photo)
            .file_name(PHOTO_FILE_NAME)
            .mime_str("image/jpeg")?;

        let mut form = multipart::Form::new()
            .part("file", part)
            .text(
                "contour_points",
                serde_json::to_string(&result.contour_points)
                    .context("Failed to serialize contour points")?,
            )
            .text("width_mm", result.dimensions.width_mm.to_string())
            .text("height_mm", result.dimensions.height_mm.to_string())
            .text(
                "calibration_warning",
                result.calibration_warning.to_string(),
            );

        if let Some(thickness) = thickness_mm {
            form = form.text("thickness", thickness.to_string());
        }

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .multipart(form)
            .send()
            .await
            .context("Failed to send scan dossier")?;

        let response = Self::check_response(response).await?;

        response
            .json()
            .await
            .context("Failed to parse submission response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScanDimensions;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_result() -> ProcessResult {
        ProcessResult {
            contour_points: vec![[0.1, 0.2], [0.9, 0.2], [0.9, 0.8], [0.1, 0.8]],
            dimensions: ScanDimensions {
                width_mm: 30.5,
                height_mm: 20.0,
            },
            calibration_warning: false,
            holes: vec![],
        }
    }

    #[tokio::test]
    async fn test_login_returns_session_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/token"))
            .and(body_string_contains("username=jdupont"))
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

        let api = ApiClient::new(server.uri()).unwrap();
        let session = api.login("jdupont", "secret").await.unwrap();

        assert_eq!(session.token, "tok-abc");
        assert_eq!(session.username, "jdupont");
        assert_eq!(session.role, Role::Operator);
        assert!(session.force_password_change);
    }

    #[tokio::test]
    async fn test_login_rejected_maps_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "detail": "Identifiant ou mot de passe incorrect."
            })))
            .mount(&server)
            .await;

        let api = ApiClient::new(server.uri()).unwrap();
        let err = api.login("jdupont", "wrong").await.unwrap_err();

        // 401 is normalized to the fixed session-expired taxonomy entry
        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_detect_card_sends_bearer_and_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/scan/detect-card"))
            .and(header("authorization", "Bearer tok-abc"))
            .and(body_string_contains("name=\"file\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "card_detected": true,
                "confidence": 0.87
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut api = ApiClient::new(server.uri()).unwrap();
        api.set_token("tok-abc".to_string());

        let response = api.detect_card(b"fake-jpeg-frame".to_vec()).await.unwrap();
        assert!(response.card_detected);
    }

    #[tokio::test]
    async fn test_submit_scan_sends_all_form_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/scan/submit"))
            .and(body_string_contains("name=\"contour_points\""))
            .and(body_string_contains("name=\"width_mm\""))
            .and(body_string_contains("30.5"))
            .and(body_string_contains("name=\"height_mm\""))
            .and(body_string_contains("name=\"calibration_warning\""))
            .and(body_string_contains("name=\"thickness\""))
            .and(body_string_contains("2.5"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "accepted"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut api = ApiClient::new(server.uri()).unwrap();
        api.set_token("tok".to_string());

        let response = api
            .submit_scan(b"fake-jpeg-photo".to_vec(), &sample_result(), Some(2.5))
            .await
            .unwrap();
        assert!(response.is_accepted());
    }

    #[tokio::test]
    async fn test_submit_scan_omits_thickness_when_absent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/scan/submit"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "accepted"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = {
            let mut api = ApiClient::new(server.uri()).unwrap();
            api.set_token("tok".to_string());
            api
        };

        api.submit_scan(b"fake-jpeg-photo".to_vec(), &sample_result(), None)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body).to_string();
        assert!(!body.contains("name=\"thickness\""));
    }

    #[tokio::test]
    async fn test_create_user_conflict_surfaces_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/admin/users"))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "detail": "Ce nom d'utilisateur existe déjà."
            })))
            .mount(&server)
            .await;

        let mut api = ApiClient::new(server.uri()).unwrap();
        api.set_token("tok".to_string());

        let err = api.create_user("jdupont", "provisional").await.unwrap_err();
        assert!(err.to_string().contains("existe déjà"));
    }

    #[tokio::test]
    async fn test_list_users_parses_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/admin/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "username": "admin",
                    "role": "admin",
                    "is_active": true,
                    "created_at": "2025-10-01T08:00:00+00:00",
                    "force_password_change": false
                },
                {
                    "username": "jdupont",
                    "role": "operator",
                    "is_active": false,
                    "created_at": null,
                    "force_password_change": true
                }
            ])))
            .mount(&server)
            .await;

        let mut api = ApiClient::new(server.uri()).unwrap();
        api.set_token("tok".to_string());

        let users = api.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert!(users[0].role.is_admin());
        assert_eq!(users[1].status_display(), "disabled");
    }
}
