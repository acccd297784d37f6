// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! # Tilewatch Core
//!
//! Core library for tilewatch - keeps API Catalog tiles fresh.
//!
//! This crate provides reusable components for:
//! - Polling catalog tiles with debounce, retry and termination rules
//! - Fetching tiles over HTTP from an API Mediation Layer gateway
//! - Configuration management
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tilewatch_core::{load_config, http_poller, PollEvent};
//! use anyhow::Result;
//!
//! # async fn example() -> Result<()> {
//! let config = load_config()?;
//! let (poller, mut events) = http_poller(&config)?;
//!
//! poller.start(Some("apicatalog"));
//! while let Some(event) = events.recv().await {
//!     match event {
//!         PollEvent::Success { tiles } => println!("{} tiles", tiles.len()),
//!         other if other.ends_session() => break,
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`poller`] - Polling session state machine
//! - [`transport`] - HTTP transport and test double
//! - [`retry`] - Retry classification and backoff
//! - [`tile`] - Tile model
//! - [`config`] - Configuration loading and paths
//! - [`error`] - Error types

// ============================================================================
// Error Handling
// ============================================================================

pub use error::{FetchError, PollError, TilewatchError};

/// Convenience Result type for tilewatch operations.
///
/// This is equivalent to `std::result::Result<T, TilewatchError>`.
pub type Result<T> = std::result::Result<T, TilewatchError>;

// ============================================================================
// Configuration
// ============================================================================

pub use config::{
    AppConfig, CatalogConfig, PollingConfig, config_dir, config_file_path, load_config,
    load_config_from,
};

// ============================================================================
// Tiles
// ============================================================================

pub use tile::{PollRequest, Tile, decode_tiles};

// ============================================================================
// Polling
// ============================================================================

pub use poller::{PollEvent, PollEvents, PollerSettings, PollerState, TilePoller};

// ============================================================================
// Transport
// ============================================================================

pub use transport::{
    CatalogEndpoints, Credentials, FetchRequest, FetchResponse, MockTransport, ReqwestTransport,
    TileTransport,
};

// ============================================================================
// Retry Logic
// ============================================================================

pub use retry::{LinearBackoff, RetryPolicy};

// ============================================================================
// Facade
// ============================================================================

pub use facade::{fetch_tiles, http_poller};

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod error;
pub mod facade;
pub mod poller;
pub mod retry;
pub mod tile;
pub mod transport;
