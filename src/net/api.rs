//! REST API client for the auth and task endpoints.
//!
//! DESIGN
//! ======
//! `AuthApi` and `TaskApi` are the seams the session and polling layers
//! depend on; `HttpApi` is the production implementation over `reqwest`.
//! Response handling is split into pure helpers (`endpoint`, `check_status`,
//! `parse_json`) so status mapping and decoding are testable without a
//! server.
//!
//! ERROR HANDLING
//! ==============
//! Every failure is an `ApiError`. Credential rejections (401/403) get their
//! own variant so the login form can show a specific message.

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;

use std::time::Duration;

use serde::de::DeserializeOwned;

use super::types::{Task, User};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by REST API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server rejected the credentials or session.
    #[error("authentication rejected")]
    Unauthorized,

    /// The HTTP request could not be sent or its body could not be read.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The server returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

/// Remote authentication endpoints. Enables mocking in tests.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange email + password for a user record.
    async fn login(&self, email: &str, password: &str) -> Result<User, ApiError>;

    /// Exchange a Google OAuth access token for a user record.
    async fn google_sign_in(&self, access_token: &str) -> Result<User, ApiError>;

    /// End the server-side session.
    async fn logout(&self) -> Result<(), ApiError>;
}

/// Remote task-status endpoint. Enables mocking in tests.
#[async_trait::async_trait]
pub trait TaskApi: Send + Sync {
    async fn task_status(&self, task_id: &str) -> Result<Task, ApiError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

/// `reqwest`-backed implementation of [`AuthApi`] and [`TaskApi`].
///
/// The cookie store carries the server session cookie from login to the
/// later logout and task calls.
#[derive(Clone)]
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    /// Build a client rooted at `base_url` (e.g. `https://quiz.example.com/api`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, request_timeout: Duration, connect_timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T, ApiError> {
        let response = self
            .http
            .post(endpoint(&self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::ApiRequest(e.to_string()))?;
        read_json(response).await
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpApi {
    async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.post_json("/auth/login", &body).await
    }

    async fn google_sign_in(&self, access_token: &str) -> Result<User, ApiError> {
        let body = serde_json::json!({ "access_token": access_token });
        self.post_json("/auth/google", &body).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let response = self
            .http
            .post(endpoint(&self.base_url, "/auth/logout"))
            .send()
            .await
            .map_err(|e| ApiError::ApiRequest(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        check_status(status, body).map(|_| ())
    }
}

#[async_trait::async_trait]
impl TaskApi for HttpApi {
    async fn task_status(&self, task_id: &str) -> Result<Task, ApiError> {
        let response = self
            .http
            .get(task_status_endpoint(&self.base_url, task_id))
            .send()
            .await
            .map_err(|e| ApiError::ApiRequest(e.to_string()))?;
        read_json(response).await
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::ApiRequest(e.to_string()))?;
    let text = check_status(status, text)?;
    parse_json(&text)
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{path}", base_url.trim_end_matches('/'))
}

fn task_status_endpoint(base_url: &str, task_id: &str) -> String {
    endpoint(base_url, &format!("/tasks/{task_id}"))
}

fn status_is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Pass the body through on 2xx, otherwise map the status to an error.
fn check_status(status: u16, body: String) -> Result<String, ApiError> {
    match status {
        s if status_is_success(s) => Ok(body),
        401 | 403 => Err(ApiError::Unauthorized),
        _ => Err(ApiError::ApiResponse { status, body }),
    }
}

fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::ApiParse(e.to_string()))
}
