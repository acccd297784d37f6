// SPDX-License-Identifier: Apache-2.0

//! Result types returned by command handlers and rendered by `output`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tilewatch_core::{AppConfig, PollEvent, Tile};

/// Tiles returned by one fetch.
#[derive(Debug, Serialize)]
pub struct TilesResult {
    /// Tile that was asked for, `None` for all tiles.
    pub resource_id: Option<String>,
    /// When the response arrived.
    pub fetched_at: DateTime<Utc>,
    /// Tiles as sent by the catalog.
    pub tiles: Vec<Tile>,
}

/// A poller event stamped with the time it was received.
#[derive(Debug, Serialize)]
pub struct WatchEvent<'a> {
    /// Time of receipt.
    pub at: DateTime<Utc>,
    /// The event itself.
    #[serde(flatten)]
    pub event: &'a PollEvent,
}

/// Effective configuration for `config show`.
#[derive(Serialize)]
pub struct ConfigResult<'a> {
    /// Config file location.
    pub path: String,
    /// Whether the config file exists.
    pub file_exists: bool,
    /// Whether an auth token is configured (the token itself is never shown).
    pub auth_token_set: bool,
    /// Loaded configuration.
    #[serde(flatten)]
    pub config: &'a AppConfig,
}
