/// Client model and database operations
///
/// Clients are the invoice recipients of an organization. The reminder
/// dispatcher reads a client's name, company and email when rendering.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE clients (
///     id BLOB PRIMARY KEY NOT NULL,
///     org_id BLOB NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     name TEXT NOT NULL,
///     email TEXT NOT NULL,
///     company TEXT NOT NULL DEFAULT '',
///     phone TEXT NOT NULL DEFAULT '',
///     notes TEXT NOT NULL DEFAULT '',
///     created_at TEXT NOT NULL
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::tenant::TenantScope;

/// Client record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Client {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    /// Recipient address for reminders
    pub email: String,
    pub company: String,
    pub phone: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateClient {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub notes: String,
}

impl Client {
    /// Creates a client owned by the scoped organization
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (including an unknown organization)
    pub async fn create(
        pool: &SqlitePool,
        scope: TenantScope,
        data: CreateClient,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (id, org_id, name, email, company, phone, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, org_id, name, email, company, phone, notes, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(scope.org_id())
        .bind(data.name)
        .bind(data.email)
        .bind(data.company)
        .bind(data.phone)
        .bind(data.notes)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(client)
    }

    /// Finds a client by ID within the scoped organization
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn find_by_id_and_org<'e, E>(
        executor: E,
        scope: TenantScope,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, org_id, name, email, company, phone, notes, created_at
            FROM clients
            WHERE id = ? AND org_id = ?
            "#,
        )
        .bind(id)
        .bind(scope.org_id())
        .fetch_optional(executor)
        .await?;

        Ok(client)
    }

    /// Deletes a client and, by cascade, its invoices and reminders
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn delete(pool: &SqlitePool, scope: TenantScope, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM clients WHERE id = ? AND org_id = ?")
            .bind(id)
            .bind(scope.org_id())
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
