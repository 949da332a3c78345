//! Onboarding HTTP Client
//!
//! A native Rust client for the onboarding record service: token
//! verification, master-data lookups, per-section record fetch, create and
//! update, and the final submission.
//!
//! # Quick Start
//!
//! ```no_run
//! use onboard_client::OnboardClient;
//! use onboard_core::Section;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), onboard_client::Error> {
//!     let client = OnboardClient::new("http://localhost:8080");
//!
//!     let user = client.verify_token(&"abc123".into()).await?;
//!     let records = client.fetch_records(Section::Address, &user).await?;
//!     println!("{} address records on file", records.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! ```no_run
//! use onboard_client::{OnboardClientBuilder, SectionRoutes};
//! use onboard_core::Section;
//! use std::time::Duration;
//!
//! let client = OnboardClientBuilder::new("http://localhost:8080")
//!     .timeout(Duration::from_secs(10))
//!     .api_key("your-api-key")
//!     .routes(SectionRoutes::new().with(Section::Identity, "/v2/identity"))
//!     .build()
//!     .unwrap();
//! ```

mod error;
mod lookups;
mod records;
mod routes;
mod session;

pub use error::Error;
pub use records::{RemoteAck, RemoteRecord};
pub use routes::SectionRoutes;

use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Characters escaped inside a path segment. Unreserved characters stay.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error response body from the API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    #[serde(default)]
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Whether the request can be retried.
    #[serde(default)]
    pub retryable: bool,
}

/// HTTP client for the onboarding record service.
#[derive(Debug, Clone)]
pub struct OnboardClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    routes: SectionRoutes,
}

/// Builder for configuring an [`OnboardClient`].
#[derive(Debug)]
pub struct OnboardClientBuilder {
    base_url: String,
    timeout: Duration,
    api_key: Option<String>,
    routes: SectionRoutes,
    client: Option<Client>,
}

impl OnboardClientBuilder {
    /// Create a new builder with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            api_key: None,
            routes: SectionRoutes::default(),
            client: None,
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the API key for authentication.
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override per-section record routes.
    #[must_use]
    pub fn routes(mut self, routes: SectionRoutes) -> Self {
        self.routes = routes;
        self
    }

    /// Use a custom reqwest Client.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<OnboardClient, Error> {
        if self.base_url.is_empty() {
            return Err(Error::Configuration("base URL must not be empty".into()));
        }
        let client = match self.client {
            Some(c) => c,
            None => Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| Error::Configuration(e.to_string()))?,
        };

        Ok(OnboardClient {
            client,
            base_url: self.base_url,
            api_key: self.api_key,
            routes: self.routes,
        })
    }
}

impl OnboardClient {
    /// Create a new client with default configuration.
    ///
    /// # Panics
    ///
    /// Panics if `base_url` is empty or the TLS backend cannot initialize.
    /// Use [`OnboardClientBuilder`] to handle those cases.
    pub fn new(base_url: impl Into<String>) -> Self {
        OnboardClientBuilder::new(base_url)
            .build()
            .expect("default client configuration should not fail")
    }

    /// Create a builder for advanced configuration.
    pub fn builder(base_url: impl Into<String>) -> OnboardClientBuilder {
        OnboardClientBuilder::new(base_url)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the configured section routes.
    pub fn routes(&self) -> &SectionRoutes {
        &self.routes
    }

    /// Add authorization header if API key is set.
    fn add_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("Authorization", format!("Bearer {key}")),
            None => req,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Encode a value for use as a single path segment.
fn segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Turn a non-success response into an [`Error`].
///
/// 409 becomes [`Error::Conflict`] with the server's message. Structured
/// error bodies become [`Error::Api`]; anything else [`Error::Http`].
async fn error_from_response(response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<ErrorResponse>(&body).ok();

    if status == StatusCode::CONFLICT {
        let message = parsed.map_or(body, |e| e.message);
        return Error::Conflict(message);
    }

    match parsed {
        Some(error) if !error.code.is_empty() => Error::Api {
            status: status.as_u16(),
            code: error.code,
            message: error.message,
            retryable: error.retryable || status.is_server_error(),
        },
        Some(error) => Error::Http {
            status: status.as_u16(),
            message: error.message,
        },
        None => Error::Http {
            status: status.as_u16(),
            message: if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_trims_trailing_slash() {
        let client = OnboardClientBuilder::new("http://localhost:8080/")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url("/masters/country"), "http://localhost:8080/masters/country");
    }

    #[test]
    fn builder_rejects_empty_base_url() {
        let err = OnboardClientBuilder::new("/").build().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn segments_are_escaped() {
        assert_eq!(segment("abc-123"), "abc-123");
        assert_eq!(segment("a/b c"), "a%2Fb%20c");
        assert_eq!(segment("plain"), "plain");
    }

    #[test]
    fn error_response_defaults() {
        let parsed: ErrorResponse = serde_json::from_str(r#"{"message":"nope"}"#).unwrap();
        assert!(parsed.code.is_empty());
        assert!(!parsed.retryable);
    }
}
