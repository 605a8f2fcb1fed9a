/// Periodic reminder sweep
///
/// The scheduler wakes on a fixed interval and sweeps every organization for
/// due reminders. The first sweep runs immediately on start. Time comes from
/// an injected [`Clock`], so tests can drive [`SweepScheduler::tick`] at any
/// instant without waiting.
///
/// # Shutdown
///
/// Cancelling the token returned by [`SweepScheduler::shutdown_token`] stops
/// further ticks and keeps a running sweep from starting new dispatches. A
/// dispatch already in its transaction is allowed to finish.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use nudgepay_shared::clock::SystemClock;
/// use nudgepay_worker::scheduler::{SchedulerConfig, SweepScheduler};
/// # use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) {
/// let scheduler = SweepScheduler::new(pool, Arc::new(SystemClock), SchedulerConfig::default());
/// let shutdown = scheduler.shutdown_token();
///
/// tokio::spawn(async move { scheduler.run().await });
///
/// // Later, on SIGINT
/// shutdown.cancel();
/// # }
/// ```

use nudgepay_shared::clock::Clock;
use nudgepay_shared::reminders::{AllTenantsReport, ReminderService};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Sweep scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Seconds between sweeps
    pub interval_secs: u64,

    /// Organizations swept in parallel
    pub tenant_concurrency: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            interval_secs: 60,
            tenant_concurrency: 4,
        }
    }
}

/// Fixed-interval driver for the all-organization sweep
pub struct SweepScheduler {
    /// Reminder pipeline, sharing this scheduler's shutdown token
    service: ReminderService,

    /// Time source
    clock: Arc<dyn Clock>,

    /// Configuration
    config: SchedulerConfig,

    /// Shutdown token
    shutdown_token: CancellationToken,
}

impl SweepScheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `db` - Database connection pool
    /// * `clock` - Time source for "now" on every tick
    /// * `config` - Scheduler configuration
    pub fn new(db: SqlitePool, clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        let shutdown_token = CancellationToken::new();
        let service = ReminderService::new(db)
            .with_shutdown(shutdown_token.clone())
            .with_tenant_concurrency(config.tenant_concurrency);

        SweepScheduler {
            service,
            clock,
            config,
            shutdown_token,
        }
    }

    /// Gets shutdown token
    ///
    /// Used to signal graceful shutdown from external handlers.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Runs one sweep at the clock's current time
    pub async fn tick(&self) -> AllTenantsReport {
        let now = self.clock.now();
        let report = self.service.sweep_all_tenants(now).await;

        if report.totals.dispatched > 0 || report.totals.failed > 0 || report.failed_organizations > 0 {
            tracing::info!(
                organizations = report.organizations,
                failed_organizations = report.failed_organizations,
                dispatched = report.totals.dispatched,
                not_dispatched = report.totals.not_dispatched,
                failed = report.totals.failed,
                "Reminder sweep finished"
            );
        } else {
            tracing::debug!(organizations = report.organizations, "Reminder sweep found nothing due");
        }

        report
    }

    /// Runs the sweep loop until the shutdown token is cancelled
    pub async fn run(&self) {
        tracing::info!(
            interval_secs = self.config.interval_secs,
            tenant_concurrency = self.config.tenant_concurrency,
            "Reminder scheduler starting"
        );

        let mut ticker = interval(Duration::from_secs(self.config.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        tracing::info!("Reminder scheduler shut down");
    }
}
