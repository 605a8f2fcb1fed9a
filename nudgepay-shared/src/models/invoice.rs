/// Invoice model and database operations
///
/// Invoices are created together with their reminder batch: one reminder per
/// offset (in days) from the due date, each at 09:00 UTC. The reminder rows
/// are never recomputed afterwards.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE invoices (
///     id BLOB PRIMARY KEY NOT NULL,
///     org_id BLOB NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     client_id BLOB NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
///     template_id BLOB REFERENCES templates(id) ON DELETE SET NULL,
///     number TEXT NOT NULL,
///     amount_cents INTEGER NOT NULL,
///     currency TEXT NOT NULL,
///     due_date TEXT NOT NULL,
///     status TEXT NOT NULL DEFAULT 'sent',
///     notes TEXT NOT NULL DEFAULT '',
///     created_at TEXT NOT NULL,
///     updated_at TEXT NOT NULL
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use chrono::NaiveDate;
/// use nudgepay_shared::models::invoice::{CreateInvoice, Invoice};
/// use nudgepay_shared::tenant::TenantScope;
/// # use sqlx::SqlitePool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: SqlitePool, org_id: Uuid, client_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let data = CreateInvoice {
///     client_id,
///     number: "INV-100".to_string(),
///     amount_cents: 125_000,
///     currency: "usd".to_string(),
///     due_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
///     ..Default::default()
/// };
///
/// let created = Invoice::create_with_reminders(&pool, TenantScope::new(org_id), data, chrono::Utc::now()).await?;
/// println!("Invoice {} with {} reminders", created.invoice.id, created.reminders.len());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::client::Client;
use crate::models::reminder::{CreateReminder, Reminder};
use crate::models::template::Template;
use crate::reminders::defaults::ensure_default_template;
use crate::tenant::TenantScope;

/// Offsets (days relative to the due date) used when none are given
pub const DEFAULT_REMINDER_OFFSETS: [i64; 3] = [-3, 0, 7];

/// Hour of day (UTC) at which reminders fall due
pub const REMINDER_HOUR_UTC: i64 = 9;

/// Largest accepted distance between a reminder and its due date
pub const MAX_REMINDER_OFFSET_DAYS: i64 = 3650;

/// Status given to invoices created without one
pub const DEFAULT_INVOICE_STATUS: &str = "sent";

/// Status of a settled invoice; every other status counts as outstanding
pub const PAID_INVOICE_STATUS: &str = "paid";

/// Invoice creation errors
#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("Invoice number is required")]
    MissingNumber,

    #[error("Invoice amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("Currency is required")]
    MissingCurrency,

    #[error("Invoice status is required")]
    MissingStatus,

    #[error("Reminder offset {0} days is out of range")]
    InvalidOffset(i64),

    #[error("Client not found: {0}")]
    ClientNotFound(Uuid),

    #[error("Template not found: {0}")]
    TemplateNotFound(Uuid),

    #[error("No template available for organization {0}")]
    TemplateUnavailable(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl InvoiceError {
    /// Whether the caller supplied bad input (as opposed to a storage failure)
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            InvoiceError::Database(_) | InvoiceError::TemplateUnavailable(_)
        )
    }
}

/// Invoice record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub org_id: Uuid,
    pub client_id: Uuid,

    /// Template used for this invoice's reminders
    pub template_id: Option<Uuid>,

    pub number: String,

    /// Amount in minor currency units
    pub amount_cents: i64,

    /// Upper-cased currency code
    pub currency: String,

    /// Due date at midnight UTC
    pub due_date: DateTime<Utc>,

    /// Free-text lifecycle status
    pub status: String,

    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an invoice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateInvoice {
    pub client_id: Uuid,

    /// Template for reminders; None selects the organization's default
    pub template_id: Option<Uuid>,

    pub number: String,
    pub amount_cents: i64,
    pub currency: String,
    pub due_date: NaiveDate,

    /// Defaults to `sent`
    pub status: Option<String>,

    #[serde(default)]
    pub notes: String,

    /// Days relative to the due date; empty means [`DEFAULT_REMINDER_OFFSETS`]
    #[serde(default)]
    pub reminder_offsets: Vec<i64>,
}

/// An invoice together with the reminders created for it
#[derive(Debug, Clone)]
pub struct CreatedInvoice {
    pub invoice: Invoice,
    pub reminders: Vec<Reminder>,
}

/// Invoice and client columns needed to render a reminder
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvoiceContext {
    pub invoice_id: Uuid,
    pub number: String,
    pub amount_cents: i64,
    pub currency: String,
    pub due_date: DateTime<Utc>,
    pub client_name: String,
    pub client_email: String,
    pub client_company: String,
}

/// Computes when each reminder for an invoice falls due
///
/// Every reminder lands at [`REMINDER_HOUR_UTC`] on `due_date + offset`.
///
/// # Errors
///
/// Returns `InvoiceError::InvalidOffset` for offsets beyond
/// [`MAX_REMINDER_OFFSET_DAYS`]
pub fn reminder_schedule(
    due_date: NaiveDate,
    offsets: &[i64],
) -> Result<Vec<DateTime<Utc>>, InvoiceError> {
    let offsets: &[i64] = if offsets.is_empty() {
        &DEFAULT_REMINDER_OFFSETS
    } else {
        offsets
    };

    let anchor = due_date.and_time(NaiveTime::MIN).and_utc() + Duration::hours(REMINDER_HOUR_UTC);

    offsets
        .iter()
        .map(|&offset| {
            if offset.abs() > MAX_REMINDER_OFFSET_DAYS {
                return Err(InvoiceError::InvalidOffset(offset));
            }
            anchor
                .checked_add_signed(Duration::days(offset))
                .ok_or(InvoiceError::InvalidOffset(offset))
        })
        .collect()
}

impl Invoice {
    /// Creates an invoice and its reminder batch in one transaction
    ///
    /// The number is trimmed and the currency upper-cased. When no template is
    /// named, the organization's default is provisioned if needed and recorded
    /// on the invoice and every reminder.
    ///
    /// # Errors
    ///
    /// Returns a validation variant of [`InvoiceError`] for bad input, or
    /// `InvoiceError::Database` if any write fails (nothing is kept)
    pub async fn create_with_reminders(
        pool: &SqlitePool,
        scope: TenantScope,
        data: CreateInvoice,
        now: DateTime<Utc>,
    ) -> Result<CreatedInvoice, InvoiceError> {
        let number = data.number.trim().to_string();
        let currency = data.currency.trim().to_uppercase();

        if number.is_empty() {
            return Err(InvoiceError::MissingNumber);
        }
        if data.amount_cents <= 0 {
            return Err(InvoiceError::NonPositiveAmount(data.amount_cents));
        }
        if currency.is_empty() {
            return Err(InvoiceError::MissingCurrency);
        }

        let schedule = reminder_schedule(data.due_date, &data.reminder_offsets)?;
        let due_date = data.due_date.and_time(NaiveTime::MIN).and_utc();
        let status = data
            .status
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_INVOICE_STATUS.to_string());

        let mut tx = pool.begin().await?;

        if Client::find_by_id_and_org(&mut *tx, scope, data.client_id)
            .await?
            .is_none()
        {
            return Err(InvoiceError::ClientNotFound(data.client_id));
        }

        let template_id = match data.template_id {
            Some(id) => Template::find_by_id_and_org(&mut *tx, scope, id)
                .await?
                .map(|t| t.id)
                .ok_or(InvoiceError::TemplateNotFound(id))?,
            None => ensure_default_template(&mut tx, scope, now)
                .await?
                .ok_or(InvoiceError::TemplateUnavailable(scope.org_id()))?,
        };

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (id, org_id, client_id, template_id, number, amount_cents,
                                  currency, due_date, status, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, org_id, client_id, template_id, number, amount_cents,
                      currency, due_date, status, notes, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(scope.org_id())
        .bind(data.client_id)
        .bind(template_id)
        .bind(&number)
        .bind(data.amount_cents)
        .bind(&currency)
        .bind(due_date)
        .bind(&status)
        .bind(&data.notes)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let mut reminders = Vec::with_capacity(schedule.len());
        for scheduled_for in schedule {
            let reminder = Reminder::create(
                &mut *tx,
                scope,
                CreateReminder {
                    invoice_id: invoice.id,
                    template_id: Some(template_id),
                    scheduled_for,
                },
                now,
            )
            .await?;
            reminders.push(reminder);
        }

        tx.commit().await?;

        debug!(
            org_id = %scope,
            invoice_id = %invoice.id,
            reminders = reminders.len(),
            "Invoice created"
        );

        Ok(CreatedInvoice { invoice, reminders })
    }

    /// Finds an invoice by ID within the scoped organization
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn find_by_id_and_org(
        pool: &SqlitePool,
        scope: TenantScope,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, org_id, client_id, template_id, number, amount_cents,
                   currency, due_date, status, notes, created_at, updated_at
            FROM invoices
            WHERE id = ? AND org_id = ?
            "#,
        )
        .bind(id)
        .bind(scope.org_id())
        .fetch_optional(pool)
        .await?;

        Ok(invoice)
    }

    /// Loads the invoice and client fields a reminder is rendered from
    ///
    /// Both the invoice and its client must belong to the scoped organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn find_context<'e, E>(
        executor: E,
        scope: TenantScope,
        id: Uuid,
    ) -> Result<Option<InvoiceContext>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let context = sqlx::query_as::<_, InvoiceContext>(
            r#"
            SELECT i.id AS invoice_id, i.number, i.amount_cents, i.currency, i.due_date,
                   c.name AS client_name, c.email AS client_email, c.company AS client_company
            FROM invoices i
            JOIN clients c ON c.id = i.client_id AND c.org_id = i.org_id
            WHERE i.id = ? AND i.org_id = ?
            "#,
        )
        .bind(id)
        .bind(scope.org_id())
        .fetch_optional(executor)
        .await?;

        Ok(context)
    }

    /// Lists the organization's invoices, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_by_org(
        pool: &SqlitePool,
        scope: TenantScope,
        status: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, org_id, client_id, template_id, number, amount_cents,
                   currency, due_date, status, notes, created_at, updated_at
            FROM invoices
            WHERE org_id = ? AND (? IS NULL OR status = ?)
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(scope.org_id())
        .bind(status)
        .bind(status)
        .fetch_all(pool)
        .await?;

        Ok(invoices)
    }

    /// Changes an invoice's status, for example to [`PAID_INVOICE_STATUS`]
    ///
    /// Only the status moves. Reminders already scheduled stay scheduled.
    ///
    /// # Returns
    ///
    /// The updated invoice, or None if it doesn't exist in this organization
    ///
    /// # Errors
    ///
    /// Returns `InvoiceError::MissingStatus` for a blank status, or
    /// `InvoiceError::Database` if the update fails
    pub async fn update_status(
        pool: &SqlitePool,
        scope: TenantScope,
        id: Uuid,
        status: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, InvoiceError> {
        let status = status.trim();
        if status.is_empty() {
            return Err(InvoiceError::MissingStatus);
        }

        let mut tx = pool.begin().await?;

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET status = ?, updated_at = ?
            WHERE id = ? AND org_id = ?
            RETURNING id, org_id, client_id, template_id, number, amount_cents,
                      currency, due_date, status, notes, created_at, updated_at
            "#,
        )
        .bind(status)
        .bind(now)
        .bind(id)
        .bind(scope.org_id())
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        if let Some(invoice) = &invoice {
            debug!(org_id = %scope, invoice_id = %invoice.id, status, "Invoice status updated");
        }

        Ok(invoice)
    }

    /// Deletes an invoice; its reminders and their outbox rows go with it
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn delete(pool: &SqlitePool, scope: TenantScope, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = ? AND org_id = ?")
            .bind(id)
            .bind(scope.org_id())
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
