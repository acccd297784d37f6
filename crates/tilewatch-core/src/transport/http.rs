// SPDX-License-Identifier: Apache-2.0

//! `reqwest`-backed transport.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::COOKIE;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{Credentials, FetchRequest, FetchResponse, TileTransport};
use crate::config::CatalogConfig;
use crate::error::{FetchError, TilewatchError};

/// Cookie carrying the API ML session token.
pub const AUTH_COOKIE_NAME: &str = "apimlAuthenticationToken";

/// Transport that talks to the API Catalog over HTTP.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    auth_token: Option<SecretString>,
}

impl ReqwestTransport {
    /// Build a transport from catalog settings.
    ///
    /// The client keeps a cookie store so a gateway session survives
    /// between polls.
    pub fn new(config: &CatalogConfig) -> Result<Self, TilewatchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .cookie_store(true)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .user_agent(concat!("tilewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            auth_token: config.auth_token.clone(),
        })
    }
}

#[async_trait]
impl TileTransport for ReqwestTransport {
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if request.credentials == Credentials::Include
            && let Some(token) = &self.auth_token
        {
            builder = builder.header(
                COOKIE,
                format!("{AUTH_COOKIE_NAME}={}", token.expose_secret()),
            );
        }

        let response = builder.send().await.map_err(|e| {
            debug!(error = %e, "Request failed before a response arrived");
            FetchError::network(describe_send_error(&e))
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::status(status.as_u16(), e.to_string()))?;
        debug!(status = status.as_u16(), bytes = body.len(), "Received response");

        if !status.is_success() {
            return Err(error_from_body(
                status.as_u16(),
                status.canonical_reason(),
                &body,
            ));
        }

        let payload = if body.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&body).map_err(|e| {
                FetchError::status(
                    status.as_u16(),
                    format!("Invalid JSON response from API Catalog: {e}"),
                )
            })?
        };

        Ok(FetchResponse {
            status: status.as_u16(),
            payload,
        })
    }
}

fn describe_send_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("Request timed out: {err}")
    } else if err.is_connect() {
        format!("Could not connect to API Catalog: {err}")
    } else {
        err.to_string()
    }
}

/// API ML error body: a `messages` list or a single message object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Messages { messages: Vec<ApiMessage> },
    Single(ApiMessage),
}

impl ErrorBody {
    fn into_messages(self) -> Vec<ApiMessage> {
        match self {
            ErrorBody::Messages { messages } => messages,
            ErrorBody::Single(message) => vec![message],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMessage {
    message_number: Option<String>,
    message_content: Option<String>,
}

/// Turn a non-2xx response into a `FetchError`.
///
/// Message codes come from every `messageNumber` in an API ML message body.
/// When the body carries none (plain text, or JSON in another shape), it is
/// scanned for code-shaped words instead.
fn error_from_body(status: u16, reason: Option<&str>, body: &str) -> FetchError {
    let messages = serde_json::from_str::<ErrorBody>(body)
        .map(ErrorBody::into_messages)
        .unwrap_or_default();

    let message = messages
        .iter()
        .find_map(|m| m.message_content.clone())
        .unwrap_or_else(|| match reason {
            Some(reason) => format!("HTTP {status} {reason}"),
            None => format!("HTTP {status}"),
        });
    let mut server_codes = messages
        .into_iter()
        .filter_map(|m| m.message_number)
        .collect::<BTreeSet<_>>();
    if server_codes.is_empty() {
        server_codes = scan_message_codes(body);
    }

    FetchError {
        http_status: Some(status),
        message,
        server_codes,
    }
}

fn scan_message_codes(body: &str) -> BTreeSet<String> {
    body.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| looks_like_message_code(word))
        .map(ToString::to_string)
        .collect()
}

/// API ML codes look like `ZWEAM104E`: `ZWE`, two letters, three digits,
/// an optional severity letter.
fn looks_like_message_code(word: &str) -> bool {
    let bytes = word.as_bytes();
    if !(8..=9).contains(&bytes.len()) || !word.starts_with("ZWE") {
        return false;
    }
    bytes[3..5].iter().all(u8::is_ascii_uppercase)
        && bytes[5..8].iter().all(u8::is_ascii_digit)
        && bytes[8..].iter().all(u8::is_ascii_uppercase)
}
