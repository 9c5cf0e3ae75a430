//! Background scheduler for the periodic reset jobs.
//!
//! One spawned task per job, each with an initial startup delay and a fixed
//! interval. A failed run is logged and the loop keeps ticking.

use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

use crate::config::Config;
use crate::main_lib::AppState;

/// Starts every reset loop: daily assignment reset, the creation-anchored
/// weekly and monthly resets, and the goal expiry sweep.
pub fn start_reset_scheduler(state: Arc<AppState>, config: &Config) {
    spawn_job(
        "daily reset",
        config.scheduler_initial_delay,
        config.daily_reset_interval,
        state.clone(),
        |state| async move { state.reset_service.run_daily_reset().await.map(|_| ()) },
    );

    spawn_job(
        "weekly reset",
        // Offset from the daily job so the write actor is not hit by every
        // job at once.
        config.scheduler_initial_delay + Duration::from_secs(30),
        config.recurring_reset_interval,
        state.clone(),
        |state| async move {
            state
                .reset_service
                .run_weekly_reset(chrono::Utc::now())
                .await
                .map(|_| ())
        },
    );

    spawn_job(
        "monthly reset",
        config.scheduler_initial_delay + Duration::from_secs(60),
        config.recurring_reset_interval,
        state.clone(),
        |state| async move {
            state
                .reset_service
                .run_monthly_reset(chrono::Utc::now())
                .await
                .map(|_| ())
        },
    );

    spawn_job(
        "expiry sweep",
        config.scheduler_initial_delay,
        config.expiry_sweep_interval,
        state,
        |state| async move {
            state
                .reset_service
                .run_expiry_sweep(chrono::Utc::now())
                .await
                .map(|_| ())
        },
    );
}

fn spawn_job<F, Fut>(
    name: &'static str,
    initial_delay: Duration,
    period: Duration,
    state: Arc<AppState>,
    run: F,
) where
    F: Fn(Arc<AppState>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = famquest_core::Result<()>> + Send,
{
    tokio::spawn(async move {
        info!("Scheduler job '{}' started (every {:?})", name, period);
        tokio::time::sleep(initial_delay).await;

        // First tick fires immediately after the initial delay.
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = run(state.clone()).await {
                warn!("Scheduled {} failed: {}", name, e);
            }
        }
    });
}
