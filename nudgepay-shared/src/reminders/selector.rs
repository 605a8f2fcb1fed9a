//! Due-reminder selection

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::models::reminder::{DueReminder, Reminder};
use crate::tenant::TenantScope;

/// Scheduled reminders of one organization whose time is at or before `now`
///
/// Read-only. A reminder listed here may still be claimed by someone else
/// before the caller dispatches it; the dispatcher handles that.
///
/// # Errors
///
/// Returns an error if the query fails
pub async fn select_due(
    pool: &SqlitePool,
    scope: TenantScope,
    now: DateTime<Utc>,
) -> Result<Vec<DueReminder>, sqlx::Error> {
    let due = Reminder::select_due(pool, scope, now).await?;
    debug!(org_id = %scope, due = due.len(), "Selected due reminders");
    Ok(due)
}
