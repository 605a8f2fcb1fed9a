//! Reminder dispatch
//!
//! [`dispatch`] is the only code path that changes a reminder's state. It
//! runs, in one transaction:
//!
//! 1. Claim: `scheduled` -> `sent`, conditional on the current status
//! 2. Load the invoice, client and organization
//! 3. Resolve the template (designated, else the organization default)
//! 4. Render subject and body
//! 5. Append the outbox row
//!
//! A failure in steps 2-5 drops the transaction, which undoes the claim.
//! Losing the claim race is reported as [`DispatchOutcome::NotDispatched`].

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::defaults::ensure_default_template;
use super::error::DispatchError;
use super::render::{format_amount, render, RenderContext};
use crate::models::invoice::Invoice;
use crate::models::organization::Organization;
use crate::models::outbox::{CreateOutboxEmail, OutboxEmail};
use crate::models::reminder::Reminder;
use crate::models::template::Template;
use crate::tenant::TenantScope;

/// Which template a dispatched reminder was rendered with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSource {
    /// The template recorded on the reminder
    Designated,

    /// The organization default, because the reminder had no template or its
    /// template was deleted
    Fallback,
}

/// Result of a dispatch attempt that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// This call claimed the reminder and wrote its outbox row
    Dispatched {
        outbox_id: Uuid,
        template_id: Uuid,
        template: TemplateSource,
    },

    /// The reminder doesn't exist in this organization or was already sent
    NotDispatched,
}

impl DispatchOutcome {
    pub fn dispatched(&self) -> bool {
        matches!(self, DispatchOutcome::Dispatched { .. })
    }
}

/// Claims and dispatches one reminder
///
/// Safe to call concurrently for the same reminder from any number of tasks
/// or processes: exactly one caller observes `Dispatched`.
///
/// # Errors
///
/// Returns [`DispatchError`] if the claim succeeded but the reminder could
/// not be completed; the claim is rolled back in that case
pub async fn dispatch(
    pool: &SqlitePool,
    scope: TenantScope,
    reminder_id: Uuid,
    now: DateTime<Utc>,
) -> Result<DispatchOutcome, DispatchError> {
    let mut tx = pool.begin().await?;

    let Some(reminder) = Reminder::try_claim(&mut *tx, scope, reminder_id, now).await? else {
        debug!(org_id = %scope, reminder_id = %reminder_id, "Reminder not claimable");
        return Ok(DispatchOutcome::NotDispatched);
    };

    let invoice = Invoice::find_context(&mut *tx, scope, reminder.invoice_id)
        .await?
        .ok_or(DispatchError::InvoiceNotFound {
            reminder_id,
            invoice_id: reminder.invoice_id,
        })?;

    let org = Organization::find_by_id(&mut *tx, scope.org_id())
        .await?
        .ok_or(DispatchError::OrganizationNotFound(scope.org_id()))?;

    let (template, source) = resolve_template(&mut tx, scope, reminder.template_id, now).await?;

    let context = RenderContext {
        client_name: invoice.client_name,
        client_company: invoice.client_company,
        invoice_number: invoice.number,
        amount: format_amount(invoice.amount_cents, &invoice.currency),
        due_date: invoice.due_date.to_rfc3339_opts(SecondsFormat::Secs, true),
        org_name: org.name,
    };

    let email = OutboxEmail::insert(
        &mut *tx,
        scope,
        CreateOutboxEmail {
            reminder_id,
            to_email: invoice.client_email,
            subject: render(&template.subject, &context),
            body: render(&template.body, &context),
        },
        now,
    )
    .await?;

    tx.commit().await?;

    info!(
        org_id = %scope,
        reminder_id = %reminder_id,
        outbox_id = %email.id,
        fallback_template = source == TemplateSource::Fallback,
        "Reminder dispatched"
    );

    Ok(DispatchOutcome::Dispatched {
        outbox_id: email.id,
        template_id: template.id,
        template: source,
    })
}

async fn resolve_template(
    conn: &mut SqliteConnection,
    scope: TenantScope,
    designated: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<(Template, TemplateSource), DispatchError> {
    if let Some(id) = designated {
        if let Some(template) = Template::find_by_id_and_org(&mut *conn, scope, id).await? {
            return Ok((template, TemplateSource::Designated));
        }
        debug!(org_id = %scope, template_id = %id, "Designated template missing, using default");
    }

    let template = match ensure_default_template(&mut *conn, scope, now).await? {
        Some(id) => Template::find_by_id_and_org(&mut *conn, scope, id).await?,
        None => None,
    };
    let template = template.ok_or(DispatchError::TemplateUnavailable(scope.org_id()))?;

    Ok((template, TemplateSource::Fallback))
}
