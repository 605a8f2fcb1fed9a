//! Batch dispatch of due reminders
//!
//! A sweep never stops at the first failure. Per-reminder errors are logged
//! and counted, and in the all-organization sweep a failing organization does
//! not hold back the others. The shutdown token stops new dispatches from
//! starting; a dispatch already running completes.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::dispatcher::{dispatch, DispatchOutcome};
use super::error::DispatchError;
use super::selector::select_due;
use crate::models::organization::Organization;
use crate::tenant::TenantScope;

/// Counts from sweeping one organization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Reminders this sweep claimed and wrote to the outbox
    pub dispatched: usize,

    /// Due reminders someone else claimed first
    pub not_dispatched: usize,

    /// Reminders whose dispatch failed and was rolled back
    pub failed: usize,
}

impl SweepReport {
    pub fn absorb(&mut self, other: SweepReport) {
        self.dispatched += other.dispatched;
        self.not_dispatched += other.not_dispatched;
        self.failed += other.failed;
    }
}

/// Counts from sweeping every organization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllTenantsReport {
    /// Organizations whose sweep completed
    pub organizations: usize,

    /// Organizations whose due set could not be read
    pub failed_organizations: usize,

    /// Per-reminder totals across all organizations
    pub totals: SweepReport,
}

/// Dispatches every due reminder of one organization
///
/// # Errors
///
/// Returns an error only if the due set cannot be read; individual dispatch
/// failures are counted in [`SweepReport::failed`]
pub async fn send_due_for_org(
    pool: &SqlitePool,
    scope: TenantScope,
    now: DateTime<Utc>,
    shutdown: &CancellationToken,
) -> Result<SweepReport, DispatchError> {
    let mut report = SweepReport::default();

    if shutdown.is_cancelled() {
        return Ok(report);
    }

    let due = select_due(pool, scope, now).await?;

    for reminder in due {
        if shutdown.is_cancelled() {
            debug!(org_id = %scope, "Shutdown requested, stopping sweep");
            break;
        }

        match dispatch(pool, scope, reminder.id, now).await {
            Ok(DispatchOutcome::Dispatched { .. }) => report.dispatched += 1,
            Ok(DispatchOutcome::NotDispatched) => report.not_dispatched += 1,
            Err(e) => {
                report.failed += 1;
                warn!(
                    org_id = %scope,
                    reminder_id = %reminder.id,
                    invoice_id = %reminder.invoice_id,
                    kind = ?e.kind(),
                    error = %e,
                    "Reminder dispatch failed"
                );
            }
        }
    }

    if report != SweepReport::default() {
        info!(
            org_id = %scope,
            dispatched = report.dispatched,
            not_dispatched = report.not_dispatched,
            failed = report.failed,
            "Organization sweep finished"
        );
    }

    Ok(report)
}

/// Dispatches due reminders for every organization
///
/// Up to `concurrency` organizations are swept at once. Never fails; errors
/// are logged and reflected in the report.
pub async fn send_due_for_all_orgs(
    pool: &SqlitePool,
    now: DateTime<Utc>,
    concurrency: usize,
    shutdown: &CancellationToken,
) -> AllTenantsReport {
    let mut report = AllTenantsReport::default();

    let org_ids = match Organization::list_ids(pool).await {
        Ok(ids) => ids,
        Err(e) => {
            error!(error = %e, "Failed to list organizations for sweep");
            return report;
        }
    };

    let results: Vec<_> = stream::iter(org_ids)
        .map(|org_id| async move {
            let scope = TenantScope::new(org_id);
            (scope, send_due_for_org(pool, scope, now, shutdown).await)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    for (scope, result) in results {
        match result {
            Ok(org_report) => {
                report.organizations += 1;
                report.totals.absorb(org_report);
            }
            Err(e) => {
                report.failed_organizations += 1;
                error!(org_id = %scope, error = %e, "Organization sweep failed");
            }
        }
    }

    report
}
