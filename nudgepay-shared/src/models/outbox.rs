/// Outbox model and database operations
///
/// The outbox is the append-only hand-off to email delivery. One row is
/// written per dispatched reminder, in the same transaction that marks the
/// reminder `sent`; a unique index on `reminder_id` backs that at the storage
/// level. The serialized form of [`OutboxEmail`] is the contract consumed by
/// the delivery process.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE outbox (
///     id BLOB PRIMARY KEY NOT NULL,
///     org_id BLOB NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     reminder_id BLOB NOT NULL REFERENCES reminders(id) ON DELETE CASCADE,
///     to_email TEXT NOT NULL,
///     subject TEXT NOT NULL,
///     body TEXT NOT NULL,
///     created_at TEXT NOT NULL
/// );
/// CREATE UNIQUE INDEX idx_outbox_reminder ON outbox(reminder_id);
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::tenant::TenantScope;

/// A rendered reminder email waiting for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutboxEmail {
    pub id: Uuid,
    pub org_id: Uuid,
    pub reminder_id: Uuid,
    pub to_email: String,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Input for appending to the outbox
#[derive(Debug, Clone)]
pub struct CreateOutboxEmail {
    pub reminder_id: Uuid,
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

impl OutboxEmail {
    /// Appends a rendered email
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including a second row for the
    /// same reminder
    pub async fn insert<'e, E>(
        executor: E,
        scope: TenantScope,
        data: CreateOutboxEmail,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let email = sqlx::query_as::<_, OutboxEmail>(
            r#"
            INSERT INTO outbox (id, org_id, reminder_id, to_email, subject, body, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, org_id, reminder_id, to_email, subject, body, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(scope.org_id())
        .bind(data.reminder_id)
        .bind(data.to_email)
        .bind(data.subject)
        .bind(data.body)
        .bind(now)
        .fetch_one(executor)
        .await?;

        Ok(email)
    }

    /// Lists the organization's outbox, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_by_org(
        pool: &SqlitePool,
        scope: TenantScope,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let emails = sqlx::query_as::<_, OutboxEmail>(
            r#"
            SELECT id, org_id, reminder_id, to_email, subject, body, created_at
            FROM outbox
            WHERE org_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(scope.org_id())
        .fetch_all(pool)
        .await?;

        Ok(emails)
    }

    /// Finds the email produced for a reminder
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn find_by_reminder(
        pool: &SqlitePool,
        scope: TenantScope,
        reminder_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let email = sqlx::query_as::<_, OutboxEmail>(
            r#"
            SELECT id, org_id, reminder_id, to_email, subject, body, created_at
            FROM outbox
            WHERE reminder_id = ? AND org_id = ?
            "#,
        )
        .bind(reminder_id)
        .bind(scope.org_id())
        .fetch_optional(pool)
        .await?;

        Ok(email)
    }
}
