//! Shared HTTP plumbing for Google Cloud REST APIs.
//!
//! Every client in this crate talks JSON over HTTPS with an OAuth bearer
//! token. `GoogleApi` owns the `reqwest::Client` and the token so the
//! Earth Engine, BigQuery and Cloud Storage clients (and the task handles
//! they hand out) can share one connection pool.
//!
//! The bearer token is held as a [`SecretString`] and only exposed when the
//! `Authorization` header is built.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

/// Failure talking to a Google API, before it is classified by the caller.
#[derive(Debug)]
pub enum ApiFailure {
    /// The request never produced a response.
    Transport(String),
    /// Non-success HTTP status with the response body.
    Status { status: StatusCode, body: String },
    /// Success status but a body that did not match the expected shape.
    Decode(String),
}

impl ApiFailure {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiFailure::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiFailure::Transport(message) => write!(f, "HTTP request failed: {message}"),
            ApiFailure::Status { status, body } => write!(f, "HTTP {status}: {body}"),
            ApiFailure::Decode(message) => write!(f, "failed to parse response: {message}"),
        }
    }
}

impl std::error::Error for ApiFailure {}

/// Per-request timeout; table exports and DDL are polled, never awaited inline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Authenticated JSON client shared by the Google API adapters.
#[derive(Clone)]
pub struct GoogleApi {
    http: reqwest::Client,
    token: Option<Arc<SecretString>>,
}

// GoogleApi does not derive Debug so the token cannot end up in logs.

impl GoogleApi {
    /// The token is copied so the client can outlive the configuration.
    ///
    /// # Errors
    ///
    /// `Transport` if the HTTP client (TLS backend) cannot be initialized.
    pub fn new(token: Option<&SecretString>) -> Result<Self, ApiFailure> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("simsearch/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiFailure::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            token: token.map(|t| Arc::new(SecretString::from(t.expose_secret().to_string()))),
        })
    }

    /// Whether requests will carry a bearer token.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send `request` and decode a JSON body.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiFailure> {
        let response = Self::send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiFailure::Decode(e.to_string()))
    }

    /// Send `request`, keeping the body as raw bytes.
    pub async fn send_bytes(&self, request: RequestBuilder) -> Result<Vec<u8>, ApiFailure> {
        let response = Self::send(request).await?;
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| ApiFailure::Transport(e.to_string()))
    }

    /// Send `request` and discard the body.
    pub async fn send_empty(&self, request: RequestBuilder) -> Result<(), ApiFailure> {
        Self::send(request).await.map(|_| ())
    }

    async fn send(request: RequestBuilder) -> Result<reqwest::Response, ApiFailure> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(%status, body = %body, "google api request failed");
            return Err(ApiFailure::Status { status, body });
        }
        Ok(response)
    }
}

/// Join a base URL and a path without doubling the slash.
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
