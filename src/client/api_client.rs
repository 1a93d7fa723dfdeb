// src/client/api_client.rs
//! Thin HTTP wrapper around the certificate API.
//!
//! Builds requests against the configured origin and maps non-success
//! responses onto [`ClientError`]. It holds no credential: authorization is
//! added per request by [`crate::session::Session::authorize`].

use crate::config::ClientSettings;
use crate::error::{ClientError, Result};
use crate::utils::serialization::deserialize;
use log::debug;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Single-attempt HTTP client bound to one API origin.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    /// Creates a client for `base_url` with a per-request timeout.
    ///
    /// # Errors
    /// - `Validation` if `base_url` is not an absolute http(s) URL
    /// - `Transport` if the underlying HTTP client cannot be built
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| ClientError::invalid_field("api_base_url", e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::invalid_field(
                "api_base_url",
                format!("{} cannot be used as an API origin", base_url),
            ));
        }

        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        Self::new(&settings.api_base_url, settings.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves path segments against the origin. Each segment is
    /// percent-encoded, so identifiers cannot alter the route.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::invalid_field("api_base_url", "origin cannot take a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn get(&self, segments: &[&str]) -> Result<RequestBuilder> {
        Ok(self.http.get(self.endpoint(segments)?))
    }

    pub fn post(&self, segments: &[&str]) -> Result<RequestBuilder> {
        Ok(self.http.post(self.endpoint(segments)?))
    }

    /// Sends the request once and returns the response if its status is a
    /// success.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        debug!("{} {}", status.as_u16(), response.url().path());

        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::from_response(status, &body))
    }

    /// Sends the request and decodes a JSON body.
    pub async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let body = self.execute(request).await?.text().await?;
        Ok(deserialize(&body)?)
    }
}
