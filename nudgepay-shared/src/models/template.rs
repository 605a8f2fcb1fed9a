/// Reminder template model and database operations
///
/// A template holds a subject and body pattern with `{{placeholder}}` tokens
/// (see [`crate::reminders::render`]). Each organization's oldest template is
/// its default.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE templates (
///     id BLOB PRIMARY KEY NOT NULL,
///     org_id BLOB NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     name TEXT NOT NULL,
///     subject TEXT NOT NULL,
///     body TEXT NOT NULL,
///     created_at TEXT NOT NULL,
///     updated_at TEXT NOT NULL
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use nudgepay_shared::models::template::{Template, CreateTemplate, UpdateTemplate};
/// use nudgepay_shared::tenant::TenantScope;
/// # use sqlx::SqlitePool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: SqlitePool, org_id: Uuid) -> Result<(), sqlx::Error> {
/// let scope = TenantScope::new(org_id);
/// let now = chrono::Utc::now();
///
/// let template = Template::create(&pool, scope, CreateTemplate {
///     name: "Final notice".to_string(),
///     subject: "Invoice {{invoice_number}} is overdue".to_string(),
///     body: "Hi {{client_name}}, {{amount}} was due on {{due_date}}.".to_string(),
/// }, now).await?;
///
/// let update = UpdateTemplate {
///     subject: Some("Last call: {{invoice_number}}".to_string()),
///     ..Default::default()
/// };
/// Template::update(&pool, scope, template.id, update, now).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::tenant::TenantScope;

/// Reminder template
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Template {
    /// Unique template ID (UUID v4)
    pub id: Uuid,

    /// Owning organization
    pub org_id: Uuid,

    /// Human-readable name
    pub name: String,

    /// Subject pattern
    pub subject: String,

    /// Body pattern
    pub body: String,

    /// Creation time; the oldest template is the organization's default
    pub created_at: DateTime<Utc>,

    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplate {
    pub name: String,
    pub subject: String,
    pub body: String,
}

/// Input for updating a template
///
/// Only non-None fields are changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTemplate {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

impl Template {
    /// Creates a template in the scoped organization
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create(
        pool: &SqlitePool,
        scope: TenantScope,
        data: CreateTemplate,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let template = sqlx::query_as::<_, Template>(
            r#"
            INSERT INTO templates (id, org_id, name, subject, body, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, org_id, name, subject, body, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(scope.org_id())
        .bind(data.name)
        .bind(data.subject)
        .bind(data.body)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(template)
    }

    /// Finds a template by ID within the scoped organization
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
        let template = sqlx::query_as::<_, Template>(
            r#"
            SELECT id, org_id, name, subject, body, created_at, updated_at
            FROM templates
            WHERE id = ? AND org_id = ?
            "#,
        )
        .bind(id)
        .bind(scope.org_id())
        .fetch_optional(executor)
        .await?;

        Ok(template)
    }

    /// Finds the organization's default template (the oldest one)
    ///
    /// Templates created in the same instant are ordered by insertion.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn find_default<'e, E>(
        executor: E,
        scope: TenantScope,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let template = sqlx::query_as::<_, Template>(
            r#"
            SELECT id, org_id, name, subject, body, created_at, updated_at
            FROM templates
            WHERE org_id = ?
            ORDER BY created_at ASC, rowid ASC
            LIMIT 1
            "#,
        )
        .bind(scope.org_id())
        .fetch_optional(executor)
        .await?;

        Ok(template)
    }

    /// Lists the organization's templates, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_by_org(
        pool: &SqlitePool,
        scope: TenantScope,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let templates = sqlx::query_as::<_, Template>(
            r#"
            SELECT id, org_id, name, subject, body, created_at, updated_at
            FROM templates
            WHERE org_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(scope.org_id())
        .fetch_all(pool)
        .await?;

        Ok(templates)
    }

    /// Updates a template within the scoped organization
    ///
    /// # Returns
    ///
    /// The updated template, or None if it doesn't exist in this organization
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn update(
        pool: &SqlitePool,
        scope: TenantScope,
        id: Uuid,
        data: UpdateTemplate,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let template = sqlx::query_as::<_, Template>(
            r#"
            UPDATE templates
            SET name = COALESCE(?, name),
                subject = COALESCE(?, subject),
                body = COALESCE(?, body),
                updated_at = ?
            WHERE id = ? AND org_id = ?
            RETURNING id, org_id, name, subject, body, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.subject)
        .bind(data.body)
        .bind(now)
        .bind(id)
        .bind(scope.org_id())
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(template)
    }

    /// Deletes a template within the scoped organization
    ///
    /// Invoices and reminders that referenced it keep existing with a null
    /// template and fall back to the default when dispatched.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn delete(pool: &SqlitePool, scope: TenantScope, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM templates WHERE id = ? AND org_id = ?")
            .bind(id)
            .bind(scope.org_id())
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
