//! Background eviction of settled runners.
//!
//! Runners stay queryable after they finish so that clients can read the
//! final counts. The sweeper removes those that have been terminal for
//! longer than the configured retention.

use std::time::Duration;

use bf_core::events::EventPayload;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;

/// Run the sweeper until `cancel` fires.
///
/// Returns immediately when retention is disabled or the interval is zero.
pub async fn run_sweeper(ctx: AppContext, cancel: CancellationToken) {
    let Some(retention) = ctx.config.runner.retention() else {
        tracing::debug!("Runner retention disabled; sweeper not started");
        return;
    };
    let interval_secs = ctx.config.runner.sweep_interval_secs;
    if interval_secs == 0 {
        return;
    }

    tracing::info!(
        retention_secs = retention.as_secs(),
        interval_secs,
        "Runner sweeper started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                sweep_once(&ctx, retention);
            }
        }
    }

    tracing::info!("Runner sweeper stopped");
}

/// Evict every runner terminal for at least `retention`.
pub fn sweep_once(ctx: &AppContext, retention: Duration) -> usize {
    let evicted = ctx.registry.evict_expired(retention);
    for runner_id in &evicted {
        ctx.event_bus
            .broadcast(EventPayload::RunnerEvicted { runner_id: *runner_id });
    }
    if !evicted.is_empty() {
        tracing::info!("Evicted {} settled runner(s)", evicted.len());
    }
    evicted.len()
}
