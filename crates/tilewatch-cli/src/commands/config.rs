// SPDX-License-Identifier: Apache-2.0

//! Configuration inspection.

use tilewatch_core::AppConfig;
use tilewatch_core::config::config_file_path;

use super::types::ConfigResult;

/// Effective configuration, with the token redacted.
pub fn show(config: &AppConfig) -> ConfigResult<'_> {
    let path = config_file_path();
    ConfigResult {
        file_exists: path.exists(),
        path: path.display().to_string(),
        auth_token_set: config.catalog.auth_token.is_some(),
        config,
    }
}

/// Print the config file path.
pub fn path() {
    println!("{}", config_file_path().display());
}
