/// Per-organization dashboard figures
///
/// All five numbers come from one statement, so they describe the same
/// snapshot of the database.
///
/// # Example
///
/// ```no_run
/// use nudgepay_shared::models::metrics::OrgMetrics;
/// use nudgepay_shared::tenant::TenantScope;
/// # use sqlx::SqlitePool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: SqlitePool, org_id: Uuid) -> Result<(), sqlx::Error> {
/// let metrics = OrgMetrics::for_org(&pool, TenantScope::new(org_id), chrono::Utc::now()).await?;
/// println!("{} cents outstanding", metrics.outstanding_cents);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::models::invoice::PAID_INVOICE_STATUS;
use crate::tenant::TenantScope;

/// How far ahead `upcoming_reminders` looks
pub const UPCOMING_WINDOW_DAYS: i64 = 7;

/// Counts and totals for one organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrgMetrics {
    pub clients: i64,
    pub invoices: i64,

    /// Unpaid invoices whose due date is before today (UTC)
    pub overdue: i64,

    /// Scheduled reminders falling due within the next week
    pub upcoming_reminders: i64,

    /// Sum of unpaid invoice amounts, in minor units
    pub outstanding_cents: i64,
}

impl OrgMetrics {
    /// Computes the scoped organization's metrics as of `now`
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn for_org(
        pool: &SqlitePool,
        scope: TenantScope,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let window_end = now + Duration::days(UPCOMING_WINDOW_DAYS);

        let metrics = sqlx::query_as::<_, OrgMetrics>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM clients WHERE org_id = ?1) AS clients,
                (SELECT COUNT(*) FROM invoices WHERE org_id = ?1) AS invoices,
                (SELECT COUNT(*) FROM invoices
                 WHERE org_id = ?1 AND status != ?2 AND due_date < ?3) AS overdue,
                (SELECT COUNT(*) FROM reminders
                 WHERE org_id = ?1 AND status = 'scheduled'
                   AND scheduled_for >= ?4 AND scheduled_for <= ?5) AS upcoming_reminders,
                (SELECT COALESCE(SUM(amount_cents), 0) FROM invoices
                 WHERE org_id = ?1 AND status != ?2) AS outstanding_cents
            "#,
        )
        .bind(scope.org_id())
        .bind(PAID_INVOICE_STATUS)
        .bind(today)
        .bind(now)
        .bind(window_end)
        .fetch_one(pool)
        .await?;

        Ok(metrics)
    }
}
