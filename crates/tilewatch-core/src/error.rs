// SPDX-License-Identifier: Apache-2.0

//! Error types for tilewatch.
//!
//! Uses `thiserror` for deriving `std::error::Error` implementations.
//! Application code should use `anyhow::Result` for top-level error handling.
//!
//! Three layers are kept apart:
//! - [`TilewatchError`] covers setup problems (configuration, client construction).
//! - [`FetchError`] is what a transport reports for one failed request.
//! - [`PollError`] is the terminal outcome of a polling session.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while setting up tilewatch.
#[derive(Error, Debug)]
pub enum TilewatchError {
    /// Configuration file or environment error.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// Network/HTTP error from reqwest.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("Invalid JSON response from API Catalog")]
    InvalidResponse(#[source] serde_json::Error),

    /// Catalog base URL could not be turned into an endpoint.
    #[error("Invalid catalog URL '{url}': {message}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },
}

impl From<config::ConfigError> for TilewatchError {
    fn from(err: config::ConfigError) -> Self {
        TilewatchError::Config {
            message: err.to_string(),
        }
    }
}

/// A failed fetch as reported by a [`crate::transport::TileTransport`].
///
/// `http_status` is `None` when the request never produced a response
/// (connection refused, timeout). `server_codes` holds every API ML
/// message number found in the error body.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{message}")]
pub struct FetchError {
    /// HTTP status of the response, if one arrived.
    pub http_status: Option<u16>,
    /// Human-readable description.
    pub message: String,
    /// Application-level message codes from the error body (e.g. `ZWEAM104E`).
    pub server_codes: BTreeSet<String>,
}

impl FetchError {
    /// Error for a response with the given HTTP status.
    pub fn status(http_status: u16, message: impl Into<String>) -> Self {
        Self {
            http_status: Some(http_status),
            message: message.into(),
            server_codes: BTreeSet::new(),
        }
    }

    /// Error for a request that never got a response.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            http_status: None,
            message: message.into(),
            server_codes: BTreeSet::new(),
        }
    }

    /// Attach an application-level message code.
    #[must_use]
    pub fn with_server_code(mut self, code: impl Into<String>) -> Self {
        self.server_codes.insert(code.into());
        self
    }

    /// True for 401 and 403 responses.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self.http_status, Some(401 | 403))
    }
}

/// Terminal outcome of a polling session.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PollError {
    /// A single fetch failed outside a polling session.
    #[error("{0}")]
    Transport(FetchError),

    /// Transport error classified as terminating (500, 401, 403 by default).
    #[error("{0}")]
    Terminated(FetchError),

    /// The gateway rejected the session's credentials (401 or 403).
    #[error("{0}")]
    Unauthenticated(FetchError),

    /// The catalog answered successfully but returned nothing.
    #[error("{}", not_found_message(.resource_id.as_deref()))]
    NotFound {
        /// Tile that was requested, `None` for the full list.
        resource_id: Option<String>,
    },

    /// Every allowed retry failed.
    #[error("Request to display tiles failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of fetches issued in the cycle.
        attempts: u32,
        /// Error from the final attempt.
        last: FetchError,
    },
}

impl PollError {
    /// Transport error behind this outcome, if there is one.
    #[must_use]
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            PollError::Transport(err)
            | PollError::Terminated(err)
            | PollError::Unauthenticated(err)
            | PollError::RetriesExhausted { last: err, .. } => Some(err),
            PollError::NotFound { .. } => None,
        }
    }
}

fn not_found_message(resource_id: Option<&str>) -> String {
    match resource_id {
        Some(id) => format!("Could not retrieve details for Tile with ID {id}"),
        None => "Could not retrieve any Tiles".to_string(),
    }
}
