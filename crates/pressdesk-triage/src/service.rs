// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-running loops: the periodic poll tick and the review action consumer.
//!
//! Both stop when the shared [`CancellationToken`] is cancelled.

use std::sync::Arc;
use std::time::Duration;

use pressdesk_core::PressdeskError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::context::TriageContext;
use crate::coordinator::ReviewCoordinator;
use crate::poller;

/// Run a poll tick every `interval` until cancelled.
///
/// A failed tick (mailbox auth, network, storage) is logged and the loop
/// carries on with the next tick.
pub async fn run_poll_loop(ctx: Arc<TriageContext>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval_secs = interval.as_secs(), "poll loop started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        match poller::tick(&ctx).await {
            Ok(_) => {}
            Err(e @ PressdeskError::Auth { .. }) => {
                error!(error = %e, "mailbox authorization failed; poll tick aborted");
            }
            Err(e) => warn!(error = %e, "poll tick failed"),
        }
    }
    info!("poll loop stopped");
}

/// Consume reviewer actions one at a time until cancelled.
///
/// Returns an error only when the review channel can no longer deliver
/// actions.
pub async fn run_review_loop(
    ctx: Arc<TriageContext>,
    coordinator: ReviewCoordinator,
    cancel: CancellationToken,
) -> Result<(), PressdeskError> {
    info!("review loop started");
    loop {
        let action = tokio::select! {
            _ = cancel.cancelled() => break,
            action = ctx.review.receive() => action?,
        };
        if let Err(e) = coordinator.handle(action).await {
            error!(error = %e, "reviewer action failed");
        }
    }
    info!("review loop stopped");
    Ok(())
}
