//! Authenticated HTTP client for the DigitalOcean API v2
//!
//! All providers in this crate share one [`DigitalOceanClient`]. It owns the
//! credential, the base URL and the per-request timeout, and it is the only
//! place where HTTP statuses are turned into errors.

use reqwest::Url;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use tellurian_core::config::{Credential, ProviderConfig};
use thiserror::Error;

use crate::PROVIDER_NAME;
use crate::wire::ApiError;

/// Failure of a single API request
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never got a response (DNS, TLS, timeout, ...)
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The response body was not what the endpoint documents
    #[error("Failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The base URL cannot carry path segments
    #[error("Invalid API base URL: {0}")]
    InvalidUrl(String),
}

impl From<ClientError> for tellurian_core::Error {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Status { status, message } => {
                tellurian_core::Error::provider_request(PROVIDER_NAME, status, message)
            }
            other => tellurian_core::Error::http(other.to_string()),
        }
    }
}

/// Map a non-success status to a request error
///
/// `body` is the raw response body; DigitalOcean error bodies carry an
/// `id` and a human-readable `message`.
pub fn status_error(status: u16, body: &str) -> ClientError {
    let detail = serde_json::from_str::<ApiError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string());

    let message = match status {
        401 | 403 => format!(
            "Authentication failed: invalid API token or insufficient permissions ({})",
            detail
        ),
        404 => format!("Not found: {}", detail),
        409 => format!("Conflict: {}", detail),
        422 => format!("Rejected properties: {}", detail),
        429 => "Rate limit exceeded. Please retry later".to_string(),
        500..=599 => format!("DigitalOcean server error (transient): {}", detail),
        _ => format!("Unexpected status: {}", detail),
    };

    ClientError::Status { status, message }
}

/// DigitalOcean API client
///
/// Cheap to clone; clones share the connection pool. Endpoints are given as
/// path segments below the base URL and are percent-encoded here.
#[derive(Clone)]
pub struct DigitalOceanClient {
    http: reqwest::Client,
    base_url: Url,
    token: Credential,
}

// Custom Debug implementation that hides the API token
impl fmt::Debug for DigitalOceanClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigitalOceanClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<REDACTED>")
            .finish()
    }
}

impl DigitalOceanClient {
    /// Build a client from provider configuration
    pub fn new(config: &ProviderConfig) -> tellurian_core::Result<Self> {
        let base_url = Url::parse(&config.api_base_url).map_err(|e| {
            tellurian_core::Error::config(format!(
                "Invalid API base URL {}: {}",
                config.api_base_url, e
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(tellurian_core::Error::config(format!(
                "Invalid API base URL {}",
                config.api_base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(concat!("tellurian/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| tellurian_core::Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            token: config.api_token.clone(),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Endpoint URL for the given path segments
    pub fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a JSON document
    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        self.get_query(segments, &[]).await
    }

    /// GET a JSON document with query parameters
    pub async fn get_query<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let mut request = self.http.get(self.url(segments)?);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = self.send(request).await?;
        decode(response).await
    }

    /// GET a JSON document that may not exist
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> Result<Option<T>, ClientError> {
        match self.get(segments).await {
            Ok(value) => Ok(Some(value)),
            Err(ClientError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// POST a JSON body and decode the JSON answer
    pub async fn post<B, T>(&self, segments: &[&str], body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(self.http.post(self.url(segments)?).json(body))
            .await?;
        decode(response).await
    }

    /// PUT a JSON body and decode the JSON answer
    pub async fn put<B, T>(&self, segments: &[&str], body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(self.http.put(self.url(segments)?).json(body))
            .await?;
        decode(response).await
    }

    /// DELETE a resource; success is `204 No Content`
    pub async fn delete(&self, segments: &[&str]) -> Result<(), ClientError> {
        self.send(self.http.delete(self.url(segments)?)).await?;
        Ok(())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = request
            .bearer_auth(self.token.expose())
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        tracing::debug!("DigitalOcean answered {}: {}", status, body);
        Err(status_error(status.as_u16(), &body))
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
