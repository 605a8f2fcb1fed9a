/// Organization model and database operations
///
/// Organizations are the tenant boundary. Every other row in the schema
/// carries an `org_id` and is deleted with its organization.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE organizations (
///     id BLOB PRIMARY KEY NOT NULL,
///     name TEXT NOT NULL,
///     created_at TEXT NOT NULL
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use nudgepay_shared::models::organization::Organization;
/// use nudgepay_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::in_memory()).await?;
///
/// let org = Organization::create(&pool, "Studio One", chrono::Utc::now()).await?;
/// println!("Created organization: {}", org.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

/// Organization (tenant) record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    /// Unique organization ID (UUID v4)
    pub id: Uuid,

    /// Display name, used as `{{org_name}}` in reminder templates
    pub name: String,

    /// When the organization was created
    pub created_at: DateTime<Utc>,
}

impl Organization {
    /// Creates a new organization
    ///
    /// The row is committed before it is returned, so any pooled connection
    /// can read it straight away.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create(
        pool: &SqlitePool,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let org = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (id, name, created_at)
            VALUES (?, ?, ?)
            RETURNING id, name, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(org)
    }

    /// Finds an organization by ID
    ///
    /// Generic over the executor so the dispatcher can read the name inside
    /// its transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let org = sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, name, created_at
            FROM organizations
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(org)
    }

    /// Lists every organization ID, oldest first
    ///
    /// Used by the all-tenant sweep.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_ids(pool: &SqlitePool) -> Result<Vec<Uuid>, sqlx::Error> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM organizations
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }

    /// Deletes an organization and, by cascade, everything it owns
    ///
    /// # Returns
    ///
    /// True if an organization was deleted, false if it didn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
