// SPDX-License-Identifier: Apache-2.0

//! HTTP transport abstraction for fetching tiles.
//!
//! The poller talks to the catalog only through [`TileTransport`], so the
//! polling logic can be exercised against [`MockTransport`] without a
//! network. [`ReqwestTransport`] is the production implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Serialize;

use crate::error::{FetchError, TilewatchError};
use crate::tile::PollRequest;

mod http;
pub mod mock;

pub use http::{AUTH_COOKIE_NAME, ReqwestTransport};
pub use mock::MockTransport;

/// Path of the container listing on the API Catalog.
pub const CONTAINERS_PATH: &str = "/apicatalog/api/v1/containers";

/// Characters escaped when a tile id is placed in a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Whether cookies (the gateway session) are sent with a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Credentials {
    /// Send stored cookies and the configured authentication token.
    #[default]
    Include,
    /// Send no credentials.
    Omit,
}

/// A single request handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Absolute URL.
    pub url: String,
    /// HTTP method.
    pub method: reqwest::Method,
    /// Credential mode.
    pub credentials: Credentials,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
}

impl FetchRequest {
    /// GET request for JSON, credentials included.
    pub fn get(url: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        Self {
            url: url.into(),
            method: reqwest::Method::GET,
            credentials: Credentials::Include,
            headers,
        }
    }

    /// Add or replace a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Decoded JSON body; `Null` for an empty body.
    pub payload: serde_json::Value,
}

impl FetchResponse {
    /// A 200 response carrying `payload`.
    #[must_use]
    pub fn ok(payload: serde_json::Value) -> Self {
        Self {
            status: 200,
            payload,
        }
    }
}

/// Executes tile fetches.
///
/// Implementations turn every failure into a [`FetchError`]: non-2xx
/// statuses keep their code and any message codes from the body, network
/// failures carry no status.
#[async_trait]
pub trait TileTransport: Send + Sync {
    /// Execute one request.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// Builds API Catalog URLs from a base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEndpoints {
    base_url: String,
}

impl CatalogEndpoints {
    /// Create endpoints for the catalog behind `base_url` (e.g. the gateway).
    ///
    /// # Errors
    ///
    /// Returns `TilewatchError::InvalidUrl` unless `base_url` is an absolute
    /// http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, TilewatchError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = reqwest::Url::parse(trimmed).map_err(|e| TilewatchError::InvalidUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TilewatchError::InvalidUrl {
                url: base_url.to_string(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(Self {
            base_url: trimmed.to_string(),
        })
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of all containers, or of one container when the request names it.
    #[must_use]
    pub fn containers_url(&self, request: &PollRequest) -> String {
        match request.resource_id.as_deref() {
            Some(id) => format!(
                "{}{CONTAINERS_PATH}/{}",
                self.base_url,
                utf8_percent_encode(id, PATH_SEGMENT)
            ),
            None => format!("{}{CONTAINERS_PATH}", self.base_url),
        }
    }
}
