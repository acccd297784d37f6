// SPDX-License-Identifier: Apache-2.0

//! High-level entry points for the CLI.
//!
//! These wire configuration, transport and endpoints together so callers
//! only deal with [`AppConfig`] and tiles.

use std::sync::Arc;

use tracing::instrument;

use crate::config::AppConfig;
use crate::error::PollError;
use crate::poller::{PollEvents, TilePoller};
use crate::tile::{PollRequest, Tile, decode_tiles};
use crate::transport::{CatalogEndpoints, FetchRequest, ReqwestTransport, TileTransport};

/// Fetch tiles once, without polling or retries.
///
/// An empty answer is reported as [`PollError::NotFound`], the same as a
/// polling session would.
///
/// # Errors
///
/// Returns `PollError::Unauthenticated` on a 401 or 403, and
/// `PollError::Transport` if the request otherwise fails or the payload is
/// not a tile list.
#[instrument(skip(transport, endpoints), fields(resource_id = ?resource_id))]
pub async fn fetch_tiles(
    transport: &dyn TileTransport,
    endpoints: &CatalogEndpoints,
    resource_id: Option<&str>,
) -> Result<Vec<Tile>, PollError> {
    let request = PollRequest::new(resource_id);
    let fetch = FetchRequest::get(endpoints.containers_url(&request));

    let response = transport.fetch(&fetch).await.map_err(|e| {
        if e.is_authentication() {
            PollError::Unauthenticated(e)
        } else {
            PollError::Transport(e)
        }
    })?;
    let tiles = decode_tiles(response.payload).map_err(|e| {
        PollError::Transport(crate::error::FetchError::status(
            response.status,
            format!("Unexpected API Catalog payload: {e}"),
        ))
    })?;

    if tiles.is_empty() {
        return Err(PollError::NotFound {
            resource_id: request.resource_id,
        });
    }
    Ok(tiles)
}

/// Build a poller talking to the configured catalog over HTTP.
///
/// # Errors
///
/// Returns an error if the base URL or polling settings are invalid, or
/// the HTTP client cannot be built.
pub fn http_poller(config: &AppConfig) -> crate::Result<(TilePoller, PollEvents)> {
    let endpoints = config.endpoints()?;
    let settings = config.polling.to_settings()?;
    let transport = ReqwestTransport::new(&config.catalog)?;
    Ok(TilePoller::new(Arc::new(transport), endpoints, settings))
}
