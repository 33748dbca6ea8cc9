// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pressdesk serve` command implementation.
//!
//! Opens the store, builds the Gmail, Gemini and Telegram collaborators,
//! recovers deliveries interrupted by the previous run, then runs the poll
//! loop and the review loop until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use pressdesk_config::PressdeskConfig;
use pressdesk_core::{
    HealthStatus, MailboxAdapter, PluginAdapter, PressdeskError, RecordStore, ReviewChannel,
};
use pressdesk_gemini::{GeminiGenerator, GeminiRelevanceJudge};
use pressdesk_gmail::GmailMailbox;
use pressdesk_storage::SqliteStorage;
use pressdesk_telegram::TelegramReviewChannel;
use pressdesk_triage::service::{run_poll_loop, run_review_loop};
use pressdesk_triage::{DeliveryExecutor, ReviewCoordinator, TriageContext, TriageSettings};
use tracing::{error, info, warn};

use crate::shutdown;

/// How long running deliveries get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn run_serve(config: PressdeskConfig) -> Result<(), PressdeskError> {
    init_tracing(&config.service.log_level);
    info!(name = %config.service.name, "starting pressdesk serve");

    let store = open_storage(&config).await?;

    let mut review =
        TelegramReviewChannel::new(&config.telegram, config.service.action_queue_capacity)?;
    review.connect().await?;
    let review: Arc<dyn ReviewChannel> = Arc::new(review);

    let ctx = Arc::new(build_context(&config, store, review).await?);
    log_health(ctx.store.as_ref()).await;
    log_health(ctx.mailbox.as_ref()).await;
    log_health(ctx.review.as_ref()).await;

    let delivery = DeliveryExecutor::new(ctx.clone());
    let recovered = delivery.recover().await?;
    if !recovered.quarantined.is_empty() {
        warn!(
            drafts = ?recovered.quarantined,
            "interrupted sends need reconciliation; see `pressdesk status`"
        );
    }

    let coordinator = ReviewCoordinator::new(ctx.clone(), delivery.clone());
    let cancel = shutdown::install_signal_handler();
    log_memory("started");

    let poll = tokio::spawn(run_poll_loop(
        ctx.clone(),
        Duration::from_secs(config.service.poll_interval_secs),
        cancel.clone(),
    ));
    let review_loop = tokio::spawn(run_review_loop(ctx.clone(), coordinator, cancel.clone()));

    // The review loop only returns early when the channel is gone.
    let review_result = review_loop.await;
    cancel.cancel();
    if let Err(e) = poll.await {
        error!(error = %e, "poll loop task failed");
    }

    delivery.drain(DRAIN_TIMEOUT).await;
    if let Err(e) = ctx.review.shutdown().await {
        warn!(error = %e, "review channel shutdown failed");
    }
    ctx.store.close().await?;
    log_memory("stopped");
    info!("pressdesk stopped");

    match review_result {
        Ok(result) => result,
        Err(e) => Err(PressdeskError::Internal(format!("review loop task failed: {e}"))),
    }
}

pub async fn open_storage(config: &PressdeskConfig) -> Result<Arc<dyn RecordStore>, PressdeskError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    Ok(Arc::new(storage))
}

/// Build the triage context over the production collaborators.
pub async fn build_context(
    config: &PressdeskConfig,
    store: Arc<dyn RecordStore>,
    review: Arc<dyn ReviewChannel>,
) -> Result<TriageContext, PressdeskError> {
    let mailbox: Arc<dyn MailboxAdapter> = Arc::new(GmailMailbox::new(
        &config.gmail,
        &config.filter,
        &config.delivery,
    )?);
    let generator = Arc::new(GeminiGenerator::new(config).await?);

    let ctx = TriageContext::new(
        store,
        mailbox,
        generator,
        review,
        TriageSettings::from_config(config),
    );
    if config.filter.relevance_enabled {
        info!(
            relevance_threshold = config.filter.relevance_threshold,
            confidence_threshold = config.filter.confidence_threshold,
            "relevance judging enabled for digest items"
        );
        let judge = GeminiRelevanceJudge::new(&config.gemini, &config.filter)?;
        return Ok(ctx.with_relevance(Arc::new(judge)));
    }
    Ok(ctx)
}

async fn log_health<A: PluginAdapter + ?Sized>(adapter: &A) {
    match adapter.health_check().await {
        Ok(HealthStatus::Healthy) => info!(adapter = adapter.name(), "adapter healthy"),
        Ok(HealthStatus::Degraded(reason)) => {
            warn!(adapter = adapter.name(), reason = %reason, "adapter degraded")
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            warn!(adapter = adapter.name(), reason = %reason, "adapter unhealthy")
        }
        Err(e) => warn!(adapter = adapter.name(), error = %e, "adapter health check failed"),
    }
}

/// Heap bytes allocated and resident according to jemalloc.
#[cfg(not(target_env = "msvc"))]
fn memory_usage() -> Option<(usize, usize)> {
    // Stats are cached until the epoch advances.
    tikv_jemalloc_ctl::epoch::advance().ok()?;
    let allocated = tikv_jemalloc_ctl::stats::allocated::read().ok()?;
    let resident = tikv_jemalloc_ctl::stats::resident::read().ok()?;
    Some((allocated, resident))
}

#[cfg(target_env = "msvc")]
fn memory_usage() -> Option<(usize, usize)> {
    None
}

fn log_memory(stage: &str) {
    if let Some((allocated, resident)) = memory_usage() {
        info!(
            stage,
            allocated_kb = allocated / 1024,
            resident_kb = resident / 1024,
            "memory usage"
        );
    }
}

/// Initializes the tracing subscriber with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pressdesk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn memory_usage_reads_jemalloc_stats() {
        let _buf = vec![0u8; 1 << 20];
        let (allocated, resident) = memory_usage().expect("jemalloc stats");
        assert!(allocated > 0);
        assert!(resident > 0);
    }
}
