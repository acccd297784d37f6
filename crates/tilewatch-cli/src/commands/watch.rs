// SPDX-License-Identifier: Apache-2.0

//! Continuous tile polling until interrupted.

use anyhow::Result;
use tilewatch_core::{AppConfig, PollError, PollEvent, http_poller};
use tracing::{debug, info};

use crate::cli::OutputContext;
use crate::output::events::WatchView;

/// Watch tiles, rendering every poller event.
///
/// Returns once the poller stops (Ctrl+C or `count` refreshes) and fails
/// with the session's error when polling ends on its own.
pub async fn run(
    service_id: Option<&str>,
    count: Option<u32>,
    ctx: &OutputContext,
    config: &AppConfig,
) -> Result<()> {
    let (poller, mut events) = http_poller(config)?;
    let mut view = WatchView::new(ctx);

    info!(
        base_url = %config.catalog.base_url,
        service_id = service_id.unwrap_or("*"),
        "Starting tile watch"
    );
    poller.start(service_id);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;
    let mut refreshes = 0u32;

    let outcome = loop {
        tokio::select! {
            _ = &mut ctrl_c, if !interrupted => {
                debug!("Interrupted, stopping poller");
                interrupted = true;
                poller.stop();
            }
            event = events.recv() => {
                let Some(event) = event else {
                    break Ok(());
                };
                view.show(&event)?;

                match event {
                    PollEvent::Success { .. } => {
                        refreshes += 1;
                        if count.is_some_and(|limit| refreshes >= limit) {
                            debug!(refreshes, "Refresh count reached, stopping poller");
                            poller.stop();
                        }
                    }
                    PollEvent::Retrying { .. } => {}
                    PollEvent::Stopped => break Ok(()),
                    PollEvent::Failure { error } => break Err(error.into()),
                    PollEvent::AuthenticationFailure { error } => {
                        break Err(PollError::Unauthenticated(error).into());
                    }
                }
            }
        }
    };

    view.finish();
    outcome
}
