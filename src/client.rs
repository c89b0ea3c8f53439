//! Core HTTP client for the chart backend.
//!
//! The [`ChartApiClient`] struct wraps [`reqwest::Client`] with JSON
//! headers and provides typed `get` helpers. Endpoint methods are added to
//! `ChartApiClient` via `impl` blocks in the [`crate::api`] module.

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use url::Url;

use crate::constants::API_BASE_URL;
use crate::error::{ApiErrorBody, ChartError, Result};

/// HTTP client for the candle, price and indicator endpoints.
///
/// # Example
///
/// ```no_run
/// use livechart_rs::client::ChartApiClient;
/// use livechart_rs::types::Interval;
///
/// # #[tokio::main]
/// # async fn main() -> livechart_rs::error::Result<()> {
/// let client = ChartApiClient::with_base_url("http://localhost:8080/api");
/// let candles = client.get_candles("BTCUSDT", Interval::H1, 500, None).await?;
/// println!("{} candles", candles.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChartApiClient {
    http: reqwest::Client,
    /// Base URL for REST requests (defaults to [`API_BASE_URL`]).
    base_url: String,
}

impl Default for ChartApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartApiClient {
    /// Create a client for the default base URL.
    pub fn new() -> Self {
        Self::with_base_url(API_BASE_URL)
    }

    /// Create a client pointing at a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        // Building with only static default headers cannot fail on a
        // supported TLS backend; fall back to a plain client if it does.
        let http = reqwest::Client::builder()
            .default_headers(Self::default_headers())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Returns a reference to the underlying `reqwest::Client`.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Generic HTTP helpers
    // -----------------------------------------------------------------------

    /// Perform a GET request and deserialize the JSON response.
    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.get_with_query(path, &[]).await
    }

    /// Perform a GET request with query parameters and deserialize the JSON
    /// response.
    pub async fn get_with_query<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<R> {
        let url = self.url(path, query)?;
        self.get_url(url).await
    }

    /// Perform a GET request on a fully built URL.
    pub async fn get_url<R: DeserializeOwned>(&self, url: Url) -> Result<R> {
        tracing::debug!(%url, "GET");

        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await
    }

    /// Build a URL by appending `segments` to the base URL's path. Each
    /// segment is percent-encoded, so a `/` or `?` inside one stays part
    /// of that segment.
    pub fn segment_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    /// Build the full URL from a path segment and query pairs.
    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let raw = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        if query.is_empty() {
            Ok(Url::parse(&raw)?)
        } else {
            Ok(Url::parse_with_params(
                &raw,
                query.iter().map(|(k, v)| (*k, v.as_str())),
            )?)
        }
    }

    /// Default headers applied to every request.
    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Read a response, returning either the deserialized body or a `ChartError`.
    async fn handle_response<R: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<R> {
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if status.is_success() {
            serde_json::from_slice(&bytes).map_err(ChartError::Json)
        } else {
            let body = String::from_utf8_lossy(&bytes);
            Err(self.parse_error_body(status, &body))
        }
    }

    /// Try to parse the backend's JSON error structure; fall back to a raw
    /// HTTP status error.
    pub(crate) fn parse_error_body(&self, status: reqwest::StatusCode, body: &str) -> ChartError {
        if let Ok(api_err) = serde_json::from_str::<ApiErrorBody>(body) {
            if api_err.error.is_some() || api_err.message.is_some() {
                return ChartError::Api(api_err);
            }
        }
        ChartError::HttpStatus {
            status,
            body: body.to_owned(),
        }
    }
}
