//! Common test utilities for integration tests
//!
//! Every `TestContext` owns a private SQLite database with the migrations
//! applied and one organization ("Studio One") with one client ("Jamie
//! Client"). `new` uses a one-connection in-memory database; `file_backed`
//! uses a throwaway file and several pooled connections, so writers contend
//! and each statement may land on a different connection.

#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use nudgepay_shared::db::migrations::run_migrations;
use nudgepay_shared::db::pool::{create_pool, DatabaseConfig};
use nudgepay_shared::models::client::{Client, CreateClient};
use nudgepay_shared::models::invoice::{CreateInvoice, CreatedInvoice, Invoice};
use nudgepay_shared::models::organization::Organization;
use nudgepay_shared::models::reminder::{CreateReminder, Reminder};
use nudgepay_shared::tenant::TenantScope;
use sqlx::SqlitePool;
use std::path::PathBuf;
use uuid::Uuid;

/// Connections in the file-backed pool
pub const FILE_POOL_CONNECTIONS: u32 = 4;

/// Fixed "today" used across tests (noon, so "due yesterday at 09:00" is due)
pub fn today() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Test context containing a migrated database and a seeded tenant
pub struct TestContext {
    pub db: SqlitePool,
    pub org: Organization,
    pub client: Client,
    path: Option<PathBuf>,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_config(DatabaseConfig::in_memory(), None).await
    }

    /// Context backed by a temp file and a multi-connection pool
    pub async fn file_backed() -> anyhow::Result<Self> {
        let path = std::env::temp_dir().join(format!("nudgepay-test-{}.db", Uuid::new_v4()));
        let config = DatabaseConfig {
            url: format!("sqlite://{}", path.display()),
            max_connections: FILE_POOL_CONNECTIONS,
            ..Default::default()
        };
        Self::with_config(config, Some(path)).await
    }

    async fn with_config(config: DatabaseConfig, path: Option<PathBuf>) -> anyhow::Result<Self> {
        let db = create_pool(config).await?;
        run_migrations(&db).await?;

        let now = today() - Duration::days(30);
        let org = Organization::create(&db, "Studio One", now).await?;
        let client = Client::create(
            &db,
            TenantScope::new(org.id),
            CreateClient {
                name: "Jamie Client".to_string(),
                email: "jamie@example.com".to_string(),
                company: "Jamie Co".to_string(),
                ..Default::default()
            },
            now,
        )
        .await?;

        Ok(Self {
            db,
            org,
            client,
            path,
        })
    }

    pub fn scope(&self) -> TenantScope {
        TenantScope::new(self.org.id)
    }

    /// Adds another organization with its own client
    pub async fn add_tenant(&self, name: &str) -> anyhow::Result<(Organization, Client)> {
        let now = today() - Duration::days(30);
        let org = Organization::create(&self.db, name, now).await?;
        let client = Client::create(
            &self.db,
            TenantScope::new(org.id),
            CreateClient {
                name: format!("{name} Client"),
                email: format!("billing+{}@example.com", org.id.simple()),
                ..Default::default()
            },
            now,
        )
        .await?;
        Ok((org, client))
    }

    /// Creates INV-100 for 1250.00 USD, due on `due`, with the given offsets
    pub async fn create_invoice(
        &self,
        scope: TenantScope,
        client_id: Uuid,
        due: NaiveDate,
        offsets: Vec<i64>,
    ) -> anyhow::Result<CreatedInvoice> {
        let created = Invoice::create_with_reminders(
            &self.db,
            scope,
            CreateInvoice {
                client_id,
                number: "INV-100".to_string(),
                amount_cents: 125_000,
                currency: "usd".to_string(),
                due_date: due,
                reminder_offsets: offsets,
                ..Default::default()
            },
            today() - Duration::days(20),
        )
        .await?;
        Ok(created)
    }

    /// Creates an invoice in the default tenant with a single reminder due
    /// yesterday at 09:00 UTC, and returns that reminder
    pub async fn due_reminder(&self) -> anyhow::Result<Reminder> {
        let yesterday = (today() - Duration::days(1)).date_naive();
        let mut created = self
            .create_invoice(self.scope(), self.client.id, yesterday, vec![0])
            .await?;
        Ok(created.reminders.remove(0))
    }

    /// Inserts a scheduled reminder directly, bypassing invoice creation
    pub async fn insert_reminder(
        &self,
        scope: TenantScope,
        invoice_id: Uuid,
        template_id: Option<Uuid>,
        scheduled_for: DateTime<Utc>,
    ) -> anyhow::Result<Reminder> {
        let reminder = Reminder::create(
            &self.db,
            scope,
            CreateReminder {
                invoice_id,
                template_id,
                scheduled_for,
            },
            today() - Duration::days(20),
        )
        .await?;
        Ok(reminder)
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.db)
            .await
            .unwrap()
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(path) = &self.path {
            let _ = std::fs::remove_file(path);
            for suffix in ["-wal", "-shm", "-journal"] {
                let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
            }
        }
    }
}
