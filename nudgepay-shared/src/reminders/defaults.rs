//! Default template provisioning
//!
//! Every organization needs at least one template so a reminder can always be
//! rendered. [`ensure_default_template`] creates the stock one on first use.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use crate::models::template::Template;
use crate::tenant::TenantScope;

pub const DEFAULT_TEMPLATE_NAME: &str = "Default Reminder";

pub const DEFAULT_TEMPLATE_SUBJECT: &str = "Friendly reminder: invoice {{invoice_number}}";

pub const DEFAULT_TEMPLATE_BODY: &str = "Hi {{client_name}},\n\
\n\
Just a quick reminder that invoice {{invoice_number}} for {{amount}} is due on {{due_date}}.\n\
If you've already sent payment, please disregard this note.\n\
\n\
Thanks,\n\
{{org_name}}";

/// Returns the organization's default template, creating the stock one if the
/// organization has none
///
/// The insert is a single `INSERT ... SELECT ... WHERE NOT EXISTS`, so two
/// callers racing on an organization with no templates create at most one.
/// Runs on the caller's connection and therefore inside the caller's
/// transaction, if any.
///
/// # Returns
///
/// The default template's ID. None only if the organization's templates
/// vanished between the insert and the read.
///
/// # Errors
///
/// Returns an error if either statement fails (for example an unknown
/// organization)
pub async fn ensure_default_template(
    conn: &mut SqliteConnection,
    scope: TenantScope,
    now: DateTime<Utc>,
) -> Result<Option<Uuid>, sqlx::Error> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO templates (id, org_id, name, subject, body, created_at, updated_at)
        SELECT ?, ?, ?, ?, ?, ?, ?
        WHERE NOT EXISTS (SELECT 1 FROM templates WHERE org_id = ?)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(scope.org_id())
    .bind(DEFAULT_TEMPLATE_NAME)
    .bind(DEFAULT_TEMPLATE_SUBJECT)
    .bind(DEFAULT_TEMPLATE_BODY)
    .bind(now)
    .bind(now)
    .bind(scope.org_id())
    .execute(&mut *conn)
    .await?;

    if inserted.rows_affected() > 0 {
        info!(org_id = %scope, "Provisioned default reminder template");
    }

    let default = Template::find_default(&mut *conn, scope).await?;
    Ok(default.map(|t| t.id))
}
