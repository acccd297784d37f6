// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for the tilewatch CLI.
//!
//! Uses `tracing` with `tracing-subscriber` for structured logging.
//! Log level can be controlled via the `RUST_LOG` environment variable.
//!
//! # Examples
//!
//! ```bash
//! # Show each retry as it happens
//! RUST_LOG=tilewatch=warn tilewatch watch
//!
//! # Debug output for troubleshooting, including every fetch
//! RUST_LOG=tilewatch=debug tilewatch watch
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Default directives: retries are already shown on the status line.
const DEFAULT_FILTER: &str = "tilewatch=error,reqwest=error";

/// Directives used with `-v`.
const VERBOSE_FILTER: &str = "tilewatch=debug,reqwest=warn";

/// Initialize the logging subsystem.
///
/// `RUST_LOG` wins over both defaults. Logs go to stderr so JSON and YAML
/// on stdout stay parseable.
pub fn init_logging(verbose: bool) {
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let default_filter = if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    };
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
