/// Reminder model and database operations
///
/// A reminder is one scheduled nudge about one invoice. Its only legal state
/// change is `scheduled` -> `sent`, performed by [`Reminder::try_claim`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE reminders (
///     id BLOB PRIMARY KEY NOT NULL,
///     org_id BLOB NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     invoice_id BLOB NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
///     template_id BLOB REFERENCES templates(id) ON DELETE SET NULL,
///     scheduled_for TEXT NOT NULL,
///     sent_at TEXT,
///     status TEXT NOT NULL DEFAULT 'scheduled',
///     created_at TEXT NOT NULL,
///     CONSTRAINT reminders_status_check CHECK (status IN ('scheduled', 'sent')),
///     CONSTRAINT reminders_sent_at_check CHECK ((status = 'sent') = (sent_at IS NOT NULL))
/// );
/// ```
///
/// # Claiming
///
/// ```no_run
/// use nudgepay_shared::models::reminder::Reminder;
/// use nudgepay_shared::tenant::TenantScope;
/// # use sqlx::SqlitePool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: SqlitePool, org_id: Uuid, reminder_id: Uuid) -> Result<(), sqlx::Error> {
/// let scope = TenantScope::new(org_id);
/// match Reminder::try_claim(&pool, scope, reminder_id, chrono::Utc::now()).await? {
///     Some(reminder) => println!("Claimed {}", reminder.id),
///     None => println!("Already sent, missing, or another tenant's"),
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::tenant::TenantScope;

/// Reminder lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    /// Waiting for its time (or for a manual send)
    Scheduled,

    /// Dispatched; an outbox row exists
    Sent,
}

impl ReminderStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Scheduled => "scheduled",
            ReminderStatus::Sent => "sent",
        }
    }

    /// Parses status from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(ReminderStatus::Scheduled),
            "sent" => Some(ReminderStatus::Sent),
            _ => None,
        }
    }
}

/// Reminder record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reminder {
    /// Unique reminder ID (UUID v4)
    pub id: Uuid,

    /// Owning organization
    pub org_id: Uuid,

    /// Invoice this reminder is about
    pub invoice_id: Uuid,

    /// Template to render with; None (or a deleted template) means the
    /// organization's default
    pub template_id: Option<Uuid>,

    /// When the reminder becomes due
    pub scheduled_for: DateTime<Utc>,

    /// When the reminder was dispatched
    pub sent_at: Option<DateTime<Utc>>,

    /// Current status (see [`ReminderStatus`])
    pub status: String,

    /// When the reminder was created
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    /// Gets the parsed status enum
    pub fn get_status(&self) -> Option<ReminderStatus> {
        ReminderStatus::from_str(&self.status)
    }

    pub fn is_sent(&self) -> bool {
        self.get_status() == Some(ReminderStatus::Sent)
    }
}

/// The columns of a due reminder the sweep needs to dispatch it
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DueReminder {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub template_id: Option<Uuid>,
}

/// Input for creating a reminder
#[derive(Debug, Clone)]
pub struct CreateReminder {
    pub invoice_id: Uuid,
    pub template_id: Option<Uuid>,
    pub scheduled_for: DateTime<Utc>,
}

impl Reminder {
    /// Creates a scheduled reminder
    ///
    /// Generic over the executor so invoice creation can insert its batch in
    /// one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (for example an unknown invoice)
    pub async fn create<'e, E>(
        executor: E,
        scope: TenantScope,
        data: CreateReminder,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let reminder = sqlx::query_as::<_, Reminder>(
            r#"
            INSERT INTO reminders (id, org_id, invoice_id, template_id, scheduled_for, sent_at, status, created_at)
            VALUES (?, ?, ?, ?, ?, NULL, 'scheduled', ?)
            RETURNING id, org_id, invoice_id, template_id, scheduled_for, sent_at, status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(scope.org_id())
        .bind(data.invoice_id)
        .bind(data.template_id)
        .bind(data.scheduled_for)
        .bind(now)
        .fetch_one(executor)
        .await?;

        Ok(reminder)
    }

    /// Atomically moves a reminder from `scheduled` to `sent`
    ///
    /// The status predicate makes this a compare-and-set: among any number of
    /// concurrent callers for the same reminder, exactly one gets the row
    /// back. Run it inside a transaction to make the claim conditional on the
    /// work that follows.
    ///
    /// # Returns
    ///
    /// The claimed reminder, or None if it doesn't exist in this organization
    /// or was already sent
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn try_claim<'e, E>(
        executor: E,
        scope: TenantScope,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let reminder = sqlx::query_as::<_, Reminder>(
            r#"
            UPDATE reminders
            SET status = 'sent', sent_at = ?
            WHERE id = ? AND org_id = ? AND status = 'scheduled'
            RETURNING id, org_id, invoice_id, template_id, scheduled_for, sent_at, status, created_at
            "#,
        )
        .bind(now)
        .bind(id)
        .bind(scope.org_id())
        .fetch_optional(executor)
        .await?;

        Ok(reminder)
    }

    /// Lists scheduled reminders whose time has come, earliest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn select_due<'e, E>(
        executor: E,
        scope: TenantScope,
        now: DateTime<Utc>,
    ) -> Result<Vec<DueReminder>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let due = sqlx::query_as::<_, DueReminder>(
            r#"
            SELECT id, invoice_id, template_id
            FROM reminders
            WHERE org_id = ? AND status = 'scheduled' AND scheduled_for <= ?
            ORDER BY scheduled_for ASC, rowid ASC
            "#,
        )
        .bind(scope.org_id())
        .bind(now)
        .fetch_all(executor)
        .await?;

        Ok(due)
    }

    /// Finds a reminder by ID within the scoped organization
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn find_by_id_and_org(
        pool: &SqlitePool,
        scope: TenantScope,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let reminder = sqlx::query_as::<_, Reminder>(
            r#"
            SELECT id, org_id, invoice_id, template_id, scheduled_for, sent_at, status, created_at
            FROM reminders
            WHERE id = ? AND org_id = ?
            "#,
        )
        .bind(id)
        .bind(scope.org_id())
        .fetch_optional(pool)
        .await?;

        Ok(reminder)
    }

    /// Lists the organization's reminders, optionally filtered by status
    ///
    /// Ordered by scheduled time, earliest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_by_org(
        pool: &SqlitePool,
        scope: TenantScope,
        status: Option<ReminderStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let status = status.map(|s| s.as_str());

        let reminders = sqlx::query_as::<_, Reminder>(
            r#"
            SELECT id, org_id, invoice_id, template_id, scheduled_for, sent_at, status, created_at
            FROM reminders
            WHERE org_id = ? AND (? IS NULL OR status = ?)
            ORDER BY scheduled_for ASC, rowid ASC
            "#,
        )
        .bind(scope.org_id())
        .bind(status)
        .bind(status)
        .fetch_all(pool)
        .await?;

        Ok(reminders)
    }

    /// Lists one invoice's reminders, earliest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_by_invoice(
        pool: &SqlitePool,
        scope: TenantScope,
        invoice_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let reminders = sqlx::query_as::<_, Reminder>(
            r#"
            SELECT id, org_id, invoice_id, template_id, scheduled_for, sent_at, status, created_at
            FROM reminders
            WHERE invoice_id = ? AND org_id = ?
            ORDER BY scheduled_for ASC, rowid ASC
            "#,
        )
        .bind(invoice_id)
        .bind(scope.org_id())
        .fetch_all(pool)
        .await?;

        Ok(reminders)
    }
}
