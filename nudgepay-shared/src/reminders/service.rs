//! Entry points used by the request layer and the worker

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::dispatcher::{dispatch, DispatchOutcome};
use super::error::DispatchError;
use super::sweep::{send_due_for_all_orgs, send_due_for_org, AllTenantsReport, SweepReport};
use crate::tenant::TenantScope;

/// Organizations swept in parallel by default
pub const DEFAULT_TENANT_CONCURRENCY: usize = 4;

/// Reminder pipeline façade
///
/// Cheap to clone; clones share the pool and the shutdown token.
///
/// # Example
///
/// ```no_run
/// use nudgepay_shared::reminders::service::ReminderService;
/// use nudgepay_shared::tenant::TenantScope;
/// # use sqlx::SqlitePool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: SqlitePool, org_id: Uuid, reminder_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let service = ReminderService::new(pool);
/// let scope = TenantScope::new(org_id);
/// let now = chrono::Utc::now();
///
/// // Manual "send now"
/// let outcome = service.dispatch_one(scope, reminder_id, now).await?;
/// println!("dispatched: {}", outcome.dispatched());
///
/// // Manual "send all due"
/// let report = service.dispatch_all_due(scope, now).await?;
/// println!("count: {}", report.dispatched);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ReminderService {
    pool: SqlitePool,
    shutdown: CancellationToken,
    tenant_concurrency: usize,
}

impl ReminderService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            shutdown: CancellationToken::new(),
            tenant_concurrency: DEFAULT_TENANT_CONCURRENCY,
        }
    }

    /// Uses `token` to stop sweeps from starting new dispatches
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Sets how many organizations an all-tenant sweep handles at once
    pub fn with_tenant_concurrency(mut self, concurrency: usize) -> Self {
        self.tenant_concurrency = concurrency.max(1);
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Dispatches a single reminder now, regardless of its scheduled time
    ///
    /// # Errors
    ///
    /// See [`dispatch`]
    pub async fn dispatch_one(
        &self,
        scope: TenantScope,
        reminder_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, DispatchError> {
        dispatch(&self.pool, scope, reminder_id, now).await
    }

    /// Dispatches every due reminder of one organization
    ///
    /// # Errors
    ///
    /// Returns an error if the due set cannot be read
    pub async fn dispatch_all_due(
        &self,
        scope: TenantScope,
        now: DateTime<Utc>,
    ) -> Result<SweepReport, DispatchError> {
        send_due_for_org(&self.pool, scope, now, &self.shutdown).await
    }

    /// Dispatches due reminders across all organizations
    pub async fn sweep_all_tenants(&self, now: DateTime<Utc>) -> AllTenantsReport {
        send_due_for_all_orgs(&self.pool, now, self.tenant_concurrency, &self.shutdown).await
    }
}
