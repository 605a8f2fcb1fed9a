/// Database models for NudgePay
///
/// Each model owns its queries. Tenant-owned models take a
/// [`TenantScope`](crate::tenant::TenantScope) and filter every statement by
/// it.
///
/// # Models
///
/// - `organization`: Tenants
/// - `client`: Invoice recipients
/// - `template`: Reminder subject/body patterns
/// - `invoice`: Invoices and their reminder batch
/// - `reminder`: Scheduled nudges and the `scheduled` -> `sent` claim
/// - `outbox`: Rendered emails waiting for delivery
/// - `metrics`: Dashboard counts and outstanding totals
///
/// # Example
///
/// ```no_run
/// use nudgepay_shared::models::organization::Organization;
/// use nudgepay_shared::models::client::{Client, CreateClient};
/// use nudgepay_shared::db::pool::{create_pool, DatabaseConfig};
/// use nudgepay_shared::tenant::TenantScope;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::in_memory()).await?;
/// let now = chrono::Utc::now();
///
/// let org = Organization::create(&pool, "Studio One", now).await?;
/// let client = Client::create(&pool, TenantScope::new(org.id), CreateClient {
///     name: "Jamie Client".to_string(),
///     email: "jamie@example.com".to_string(),
///     ..Default::default()
/// }, now).await?;
/// # Ok(())
/// # }
/// ```

pub mod client;
pub mod invoice;
pub mod metrics;
pub mod organization;
pub mod outbox;
pub mod reminder;
pub mod template;
