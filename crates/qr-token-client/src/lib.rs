#![warn(missing_docs)]
//! # qr-token-client
//!
//! ## Purpose
//! Talks to the remote token service: `getToken` for issuing tokens and
//! `validateToken` for checking a scanned one.
//!
//! ## Responsibilities
//! - Validate base URL policy (absolute `http`/`https` with a host).
//! - Execute token requests through an injectable [`TokenTransport`].
//! - Translate every transport outcome into a display-ready [`TokenError`].
//!
//! ## Data flow
//! Input surface builds a [`TokenRequest`] -> [`TokenClient::request_token`]
//! builds the query URL -> [`TokenTransport::fetch_token`] performs the call ->
//! success passes through unmodified, failures go through
//! [`classify_failure`].
//!
//! ## Error model
//! Construction problems are [`ClientError`]. Request outcomes are either a
//! [`TokenResponse`] or a [`TokenError`]; no other error escapes
//! `request_token`.
//!
//! ## Security and privacy notes
//! Identifiers and API keys are never logged by this crate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
pub use qr_token_core::{TokenError, TokenRequest, TokenResponse};
use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Path segment of the token-issuing endpoint.
pub const GET_TOKEN_PATH: &str = "getToken";
/// Header carrying the optional API key.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Default stage prefix for the validation endpoint.
pub const DEFAULT_VALIDATE_STAGE: &str = "prod";
/// Default resource path for the validation endpoint.
pub const DEFAULT_VALIDATE_RESOURCE: &str = "/validateToken";

/// Raw transport outcome before message mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFailure {
    /// Service answered with a non-success status.
    #[error("http status {0}")]
    Status(u16),
    /// No response was received (connect failure, timeout, dropped stream).
    #[error("no response: {0}")]
    NoResponse(String),
    /// Anything else, such as an undecodable body.
    #[error("transport failure: {0}")]
    Other(String),
}

/// Maps a transport outcome onto the fixed token error buckets.
pub fn classify_failure(failure: &TransportFailure) -> TokenError {
    match failure {
        TransportFailure::Status(status) => TokenError::from_status(*status),
        TransportFailure::NoResponse(_) => TokenError::no_response(),
        TransportFailure::Other(_) => TokenError::unknown(),
    }
}

/// Abstract transport used by [`TokenClient`].
#[async_trait]
pub trait TokenTransport: Send + Sync {
    /// Performs `GET url` and decodes the token body.
    async fn fetch_token(
        &self,
        url: &Url,
        api_key: Option<&str>,
    ) -> Result<TokenResponse, TransportFailure>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTokenTransport {
    client: reqwest::Client,
}

impl HttpTokenTransport {
    /// Creates a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    /// Returns [`ClientError::Http`] when the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TokenTransport for HttpTokenTransport {
    async fn fetch_token(
        &self,
        url: &Url,
        api_key: Option<&str>,
    ) -> Result<TokenResponse, TransportFailure> {
        let mut request = self.client.get(url.clone());
        if let Some(key) = api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(transport_failure)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportFailure::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(transport_failure)?;
        TokenResponse::from_json_bytes(&body)
            .map_err(|error| TransportFailure::Other(format!("invalid token body: {error}")))
    }
}

fn transport_failure(error: reqwest::Error) -> TransportFailure {
    // The request URL carries the identifier in its query.
    let error = error.without_url();
    if error.is_timeout() || error.is_connect() || error.is_request() || error.is_body() {
        TransportFailure::NoResponse(error.to_string())
    } else {
        TransportFailure::Other(error.to_string())
    }
}

/// Token client bound to one validated `getToken` endpoint.
#[derive(Clone)]
pub struct TokenClient {
    endpoint: Url,
    api_key: Option<String>,
    transport: Arc<dyn TokenTransport>,
}

impl TokenClient {
    /// Creates a client for `{base_url}/getToken`.
    ///
    /// Blank API keys are treated as absent.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidEndpoint`] when the base URL violates
    /// policy.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        transport: Arc<dyn TokenTransport>,
    ) -> Result<Self, ClientError> {
        let endpoint = endpoint_url(base_url, &[GET_TOKEN_PATH])?;
        Ok(Self {
            endpoint,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            transport,
        })
    }

    /// Returns the `getToken` endpoint without query parameters.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns the full request URL for `request`.
    pub fn token_url(&self, request: &TokenRequest) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().extend_pairs(request.query_pairs());
        url
    }

    /// Requests one token.
    ///
    /// Successful bodies are returned unmodified. A body with a blank token
    /// is treated as an unknown failure.
    ///
    /// # Errors
    /// Returns a [`TokenError`] carrying one of the fixed user-facing messages.
    pub async fn request_token(&self, request: &TokenRequest) -> Result<TokenResponse, TokenError> {
        let url = self.token_url(request);
        tracing::debug!(
            endpoint = %self.endpoint,
            has_coordinates = request.coordinates().is_some(),
            has_api_key = self.api_key.is_some(),
            "requesting token"
        );

        let response = self
            .transport
            .fetch_token(&url, self.api_key.as_deref())
            .await
            .map_err(|failure| {
                let error = classify_failure(&failure);
                tracing::warn!(status = error.status_code, %failure, "token request failed");
                error
            })?;

        if !response.has_token() {
            tracing::warn!("token service returned an empty token");
            return Err(TokenError::unknown());
        }

        tracing::info!(expires_at = response.expires_at, "token received");
        Ok(response)
    }
}

#[derive(Debug, Serialize)]
struct ValidateRequest<'a> {
    token: &'a str,
}

/// Client for the `validateToken` endpoint used by scanning devices.
#[derive(Clone)]
pub struct ValidationClient {
    endpoint: Url,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ValidationClient {
    /// Creates a client for `{base_url}/{stage}{resource}`.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidEndpoint`] for a bad base URL, or
    /// [`ClientError::Http`] when the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        stage: &str,
        resource: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let mut segments: Vec<&str> = vec![stage.trim_matches('/')];
        segments.extend(resource.split('/'));
        let endpoint = endpoint_url(base_url, &segments)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            client,
        })
    }

    /// Returns the validation endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Posts `token` for validation and returns the service's JSON verdict.
    ///
    /// # Errors
    /// Returns [`ClientError::EmptyToken`] for a blank token,
    /// [`ClientError::Status`] for non-success responses, and
    /// [`ClientError::Http`] for transport or decode failures.
    pub async fn validate(&self, token: &str) -> Result<serde_json::Value, ClientError> {
        if token.trim().is_empty() {
            return Err(ClientError::EmptyToken);
        }

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&ValidateRequest { token });
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(status = status.as_u16(), "validation response received");
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        Ok(response.json().await?)
    }
}

/// Validates `base_url` and appends non-empty `segments` to its path.
///
/// # Errors
/// Returns [`ClientError::InvalidEndpoint`] for unparsable URLs, non-HTTP
/// schemes, missing hosts, or URLs carrying a query or fragment.
pub fn endpoint_url(base_url: &str, segments: &[&str]) -> Result<Url, ClientError> {
    let mut url = Url::parse(base_url.trim())
        .map_err(|error| ClientError::InvalidEndpoint(format!("invalid base url: {error}")))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ClientError::InvalidEndpoint(
            "base url must use http or https".to_string(),
        ));
    }
    if url.host_str().is_none() {
        return Err(ClientError::InvalidEndpoint(
            "base url must include a host".to_string(),
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ClientError::InvalidEndpoint(
            "base url must not include a query or fragment".to_string(),
        ));
    }

    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidEndpoint("base url cannot be a base".to_string()))?
        .pop_if_empty()
        .extend(segments.iter().filter(|segment| !segment.is_empty()));

    Ok(url)
}

/// Errors produced while configuring clients or validating tokens.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Base URL violates endpoint policy.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Token to validate is blank.
    #[error("token must be non-empty")]
    EmptyToken,
    /// Service answered with a non-success status.
    #[error("service responded with status {0}")]
    Status(u16),
    /// HTTP client construction, transport, or decode failure.
    #[error("http failure: {0}")]
    Http(#[from] reqwest::Error),
}
