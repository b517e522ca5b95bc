//! Worksync HTTP Client
//!
//! A type-safe client for the worksheet server REST API, plus the
//! [`Platform`] trait through which the reconciliation engine reaches it.
//!
//! # Example
//!
//! ```no_run
//! use worksync_client::{Platform, PlatformClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PlatformClient::new("https://worksheets.codalab.org");
//!
//!     let worksheet = client.resolve_worksheet("helm-dev").await?;
//!     let info = client.fetch_worksheet(&worksheet).await?;
//!
//!     println!("{} has {} item(s)", worksheet.name, info.items.len());
//!     Ok(())
//! }
//! ```

mod commands;
pub mod error;
mod platform;
mod worksheets;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use platform::Platform;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

/// HTTP client for the worksheet server API
///
/// Worksheet reads use the REST resources directly. Every mutation (bundle
/// creation, rename, permission change) is sent as a CLI command that the
/// server executes in the context of the worksheet.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    /// Base URL of the server (e.g., "https://worksheets.codalab.org")
    base_url: String,
    /// Bearer token, if the server requires authentication
    token: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl PlatformClient {
    /// Create a new client for the server at `base_url`
    ///
    /// # Example
    /// ```
    /// use worksync_client::PlatformClient;
    ///
    /// let client = PlatformClient::new("https://worksheets.codalab.org/");
    /// assert_eq!(client.base_url(), "https://worksheets.codalab.org");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        }
    }

    /// Authenticate every request with a bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
