// SPDX-License-Identifier: Apache-2.0

//! One-shot tile fetch.

use anyhow::Result;
use chrono::Utc;
use tilewatch_core::{AppConfig, ReqwestTransport, fetch_tiles};

use super::types::TilesResult;

/// Fetch tiles once from the configured catalog.
pub async fn run(service_id: Option<&str>, config: &AppConfig) -> Result<TilesResult> {
    let endpoints = config.endpoints()?;
    let transport = ReqwestTransport::new(&config.catalog)?;

    let tiles = fetch_tiles(&transport, &endpoints, service_id).await?;

    Ok(TilesResult {
        resource_id: service_id.map(ToString::to_string),
        fetched_at: Utc::now(),
        tiles,
    })
}
