// SPDX-License-Identifier: Apache-2.0

//! Retry classification and linear backoff for tile fetches.
//!
//! A failed fetch is either terminating (the session ends at once) or
//! retryable. Retryable failures are retried with a delay that grows
//! linearly with the attempt number, up to `max_retries` times.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::FetchError;

/// Status codes that end a polling session instead of being retried.
pub const DEFAULT_TERMINATING_STATUS_CODES: [u16; 3] = [500, 401, 403];

/// Message codes that turn a terminating status back into a retry.
///
/// `ZWEAM104` is reported by the gateway while the catalog instance is not
/// yet registered, which clears up on its own.
pub const DEFAULT_EXCLUDED_SERVER_CODES: [&str; 1] = ["ZWEAM104"];

/// Decides which fetch failures are retried and how long to wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Base delay; retry `n` waits `scaling_unit * n`.
    pub scaling_unit: Duration,
    /// HTTP statuses that terminate the session.
    pub terminating_status_codes: BTreeSet<u16>,
    /// Message code prefixes that force a retry regardless of status.
    pub excluded_server_codes: BTreeSet<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            scaling_unit: Duration::from_secs(1),
            terminating_status_codes: DEFAULT_TERMINATING_STATUS_CODES.into_iter().collect(),
            excluded_server_codes: DEFAULT_EXCLUDED_SERVER_CODES
                .into_iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl RetryPolicy {
    /// Returns true if `error` should end the session without retrying.
    ///
    /// A status in `terminating_status_codes` terminates unless one of the
    /// body's message codes starts with an excluded code, so `ZWEAM104E`
    /// is covered by `ZWEAM104`.
    #[must_use]
    pub fn should_terminate(&self, error: &FetchError) -> bool {
        error
            .http_status
            .is_some_and(|status| self.terminating_status_codes.contains(&status))
            && !self.has_excluded_code(error)
    }

    /// Returns true if the error carries one of the excluded message codes.
    #[must_use]
    pub fn has_excluded_code(&self, error: &FetchError) -> bool {
        error.server_codes.iter().any(|code| {
            self.excluded_server_codes
                .iter()
                .any(|excluded| code.starts_with(excluded.as_str()))
        })
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.scaling_unit.saturating_mul(attempt)
    }

    /// Fresh backoff sequence for one retry cycle.
    #[must_use]
    pub fn backoff(&self) -> LinearBackoff {
        LinearBackoff::new(self.scaling_unit, self.max_retries)
    }
}

/// Backoff yielding `unit, 2*unit, 3*unit, ...` for at most `max_times` retries.
///
/// Usable anywhere `backon` expects a backoff builder.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    scaling_unit: Duration,
    max_times: u32,
    attempt: u32,
}

impl LinearBackoff {
    /// Create a linear backoff.
    #[must_use]
    pub fn new(scaling_unit: Duration, max_times: u32) -> Self {
        Self {
            scaling_unit,
            max_times,
            attempt: 0,
        }
    }
}

impl Iterator for LinearBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.attempt >= self.max_times {
            return None;
        }
        self.attempt += 1;
        Some(self.scaling_unit.saturating_mul(self.attempt))
    }
}
