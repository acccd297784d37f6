// SPDX-License-Identifier: Apache-2.0

//! CLI-specific error formatting with user-friendly hints.
//!
//! Downcasts `anyhow::Error` to the library's error types and appends a
//! hint about what to try next. The library keeps structured data; the
//! wording lives here.

use std::fmt::Write;

use std::process::ExitCode;

use anyhow::Error;
use tilewatch_core::config::config_file_path;
use tilewatch_core::{FetchError, PollError, TilewatchError};

/// Formats an error for CLI display with helpful hints.
///
/// If the error is not one of ours, returns the error chain as-is.
pub fn format_error(error: &Error) -> String {
    if let Some(err) = error.downcast_ref::<TilewatchError>() {
        return format_setup_error(err);
    }
    if let Some(err) = error.downcast_ref::<PollError>() {
        return format_poll_error(err);
    }
    format!("{error:#}")
}

/// Exit status for a rejected session, distinct from other failures.
pub const AUTH_FAILURE_EXIT_CODE: u8 = 3;

/// Process exit code for a failed command.
///
/// Authentication failures get their own code so scripts can tell "log in
/// again" apart from an unreachable or failing catalog.
pub fn exit_code(error: &Error) -> ExitCode {
    ExitCode::from(exit_status(error))
}

fn exit_status(error: &Error) -> u8 {
    match error.downcast_ref::<PollError>() {
        Some(PollError::Unauthenticated(_)) => AUTH_FAILURE_EXIT_CODE,
        _ => 1,
    }
}

fn format_setup_error(err: &TilewatchError) -> String {
    match err {
        TilewatchError::Config { .. } => format!(
            "{err}\n\nTip: Check your config file at {}",
            config_file_path().display()
        ),
        TilewatchError::InvalidUrl { .. } => format!(
            "{err}\n\nTip: Set catalog.base_url or pass --base-url, e.g. https://localhost:10010"
        ),
        TilewatchError::Network(_) => {
            format!("{err}\n\nTip: Check your network connection and try again.")
        }
        TilewatchError::InvalidResponse(_) => format!(
            "{err}\n\nTip: Make sure the base URL points at an API Mediation Layer gateway."
        ),
    }
}

fn format_poll_error(err: &PollError) -> String {
    let mut msg = err.to_string();
    match err {
        PollError::NotFound {
            resource_id: Some(_),
        } => {
            msg.push_str("\n\nTip: Check the tile id. `tilewatch fetch` lists every tile.");
        }
        PollError::NotFound { resource_id: None } => {
            msg.push_str("\n\nTip: No services are registered with the API Catalog yet.");
        }
        PollError::Transport(fetch)
        | PollError::Terminated(fetch)
        | PollError::Unauthenticated(fetch) => {
            append_fetch_hint(&mut msg, fetch);
        }
        PollError::RetriesExhausted { last, .. } => {
            append_status(&mut msg, last);
            msg.push_str(
                "\n\nTip: The gateway kept failing. Check that it is running and reachable.",
            );
        }
    }
    msg
}

fn append_fetch_hint(msg: &mut String, fetch: &FetchError) {
    append_status(msg, fetch);
    if fetch.is_authentication() {
        msg.push_str(
            "\n\nTip: Your API ML session may have expired. Log in again and set \
             TILEWATCH_CATALOG__AUTH_TOKEN or catalog.auth_token.",
        );
    } else if fetch.http_status == Some(500) {
        msg.push_str("\n\nTip: The API Catalog reported an internal error. Check its logs.");
    } else if fetch.http_status.is_none() {
        msg.push_str("\n\nTip: Check that the gateway is running and the base URL is correct.");
    }
}

fn append_status(msg: &mut String, fetch: &FetchError) {
    if let Some(status) = fetch.http_status
        && !msg.contains(&status.to_string())
    {
        let _ = write!(msg, " (HTTP {status})");
    }
    if !fetch.server_codes.is_empty() {
        let codes: Vec<&str> = fetch.server_codes.iter().map(String::as_str).collect();
        let _ = write!(msg, " [{}]", codes.join(", "));
    }
}
