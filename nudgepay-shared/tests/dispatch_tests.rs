/// Integration tests for single-reminder dispatch

mod common;

use chrono::Duration;
use common::{today, TestContext};
use nudgepay_shared::models::invoice::{CreateInvoice, Invoice};
use nudgepay_shared::models::outbox::OutboxEmail;
use nudgepay_shared::models::reminder::{Reminder, ReminderStatus};
use nudgepay_shared::models::template::{CreateTemplate, Template};
use nudgepay_shared::reminders::defaults::{ensure_default_template, DEFAULT_TEMPLATE_NAME};
use nudgepay_shared::reminders::{
    DispatchError, DispatchErrorKind, DispatchOutcome, ReminderService, TemplateSource,
};
use nudgepay_shared::tenant::TenantScope;

#[tokio::test]
async fn test_dispatch_one_writes_outbox_and_marks_sent() {
    let ctx = TestContext::new().await.unwrap();
    let reminder = ctx.due_reminder().await.unwrap();
    let service = ReminderService::new(ctx.db.clone());

    let outcome = service
        .dispatch_one(ctx.scope(), reminder.id, today())
        .await
        .expect("Dispatch should succeed");
    assert!(outcome.dispatched());
    assert!(matches!(
        outcome,
        DispatchOutcome::Dispatched {
            template: TemplateSource::Designated,
            ..
        }
    ));

    let stored = Reminder::find_by_id_and_org(&ctx.db, ctx.scope(), reminder.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get_status(), Some(ReminderStatus::Sent));
    assert_eq!(stored.sent_at, Some(today()));

    let email = OutboxEmail::find_by_reminder(&ctx.db, ctx.scope(), reminder.id)
        .await
        .unwrap()
        .expect("Outbox row should exist");
    assert_eq!(email.to_email, "jamie@example.com");
    assert_eq!(email.subject, "Friendly reminder: invoice INV-100");
    assert_eq!(email.created_at, today());
    assert!(email.body.starts_with("Hi Jamie Client,\n\n"));
    assert!(email
        .body
        .contains("invoice INV-100 for USD 1250.00 is due on 2025-03-09T00:00:00Z."));
    assert!(email.body.ends_with("Thanks,\nStudio One"));
}

#[tokio::test]
async fn test_second_dispatch_is_not_dispatched() {
    let ctx = TestContext::new().await.unwrap();
    let reminder = ctx.due_reminder().await.unwrap();
    let service = ReminderService::new(ctx.db.clone());

    let first = service.dispatch_one(ctx.scope(), reminder.id, today()).await.unwrap();
    let second = service
        .dispatch_one(ctx.scope(), reminder.id, today() + Duration::minutes(5))
        .await
        .unwrap();

    assert!(first.dispatched());
    assert_eq!(second, DispatchOutcome::NotDispatched);
    assert_eq!(ctx.count("outbox").await, 1);

    // sent_at keeps the winning attempt's time
    let stored = Reminder::find_by_id_and_org(&ctx.db, ctx.scope(), reminder.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.sent_at, Some(today()));
}

#[tokio::test]
async fn test_concurrent_dispatch_sends_exactly_once() {
    let ctx = TestContext::new().await.unwrap();
    let reminder = ctx.due_reminder().await.unwrap();
    let service = ReminderService::new(ctx.db.clone());

    let mut handles = vec![];
    for _ in 0..8 {
        let service = service.clone();
        let scope = ctx.scope();
        let id = reminder.id;
        handles.push(tokio::spawn(async move {
            service.dispatch_one(scope, id, today()).await
        }));
    }

    let mut dispatched = 0;
    let mut not_dispatched = 0;
    for handle in handles {
        match handle.await.unwrap().expect("No attempt should error") {
            DispatchOutcome::Dispatched { .. } => dispatched += 1,
            DispatchOutcome::NotDispatched => not_dispatched += 1,
        }
    }

    assert_eq!(dispatched, 1);
    assert_eq!(not_dispatched, 7);
    assert_eq!(ctx.count("outbox").await, 1);
}

#[tokio::test]
async fn test_concurrent_dispatch_on_file_pool_sends_exactly_once() {
    let ctx = TestContext::file_backed().await.unwrap();
    let service = ReminderService::new(ctx.db.clone());

    for _ in 0..5 {
        let reminder = ctx.due_reminder().await.unwrap();

        let mut handles = vec![];
        for _ in 0..8 {
            let service = service.clone();
            let scope = ctx.scope();
            let id = reminder.id;
            handles.push(tokio::spawn(async move {
                service.dispatch_one(scope, id, today()).await
            }));
        }

        let mut dispatched = 0;
        for handle in handles {
            if handle.await.unwrap().expect("No attempt should error").dispatched() {
                dispatched += 1;
            }
        }
        assert_eq!(dispatched, 1);

        let email = OutboxEmail::find_by_reminder(&ctx.db, ctx.scope(), reminder.id)
            .await
            .unwrap();
        assert!(email.is_some());
    }

    assert_eq!(ctx.count("outbox").await, 5);
}

#[tokio::test]
async fn test_unknown_reminder_is_not_dispatched() {
    let ctx = TestContext::new().await.unwrap();
    let service = ReminderService::new(ctx.db.clone());

    let outcome = service
        .dispatch_one(ctx.scope(), uuid::Uuid::new_v4(), today())
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::NotDispatched);
}

#[tokio::test]
async fn test_other_tenants_reminder_is_not_dispatched() {
    let ctx = TestContext::new().await.unwrap();
    let reminder = ctx.due_reminder().await.unwrap();
    let (other_org, _) = ctx.add_tenant("Other Studio").await.unwrap();
    let service = ReminderService::new(ctx.db.clone());

    let outcome = service
        .dispatch_one(TenantScope::new(other_org.id), reminder.id, today())
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::NotDispatched);

    let stored = Reminder::find_by_id_and_org(&ctx.db, ctx.scope(), reminder.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get_status(), Some(ReminderStatus::Scheduled));
    assert!(stored.sent_at.is_none());
    assert_eq!(ctx.count("outbox").await, 0);
}

#[tokio::test]
async fn test_failure_after_claim_rolls_back() {
    let ctx = TestContext::new().await.unwrap();
    let (other_org, other_client) = ctx.add_tenant("Other Studio").await.unwrap();
    let other_scope = TenantScope::new(other_org.id);
    let foreign = ctx
        .create_invoice(other_scope, other_client.id, common::date(2025, 3, 1), vec![0])
        .await
        .unwrap();

    // Claimable in our tenant, but its invoice belongs to someone else, so
    // the tenant-scoped context lookup fails after the claim.
    let reminder = ctx
        .insert_reminder(
            ctx.scope(),
            foreign.invoice.id,
            None,
            today() - Duration::hours(1),
        )
        .await
        .unwrap();
    let service = ReminderService::new(ctx.db.clone());

    let err = service
        .dispatch_one(ctx.scope(), reminder.id, today())
        .await
        .expect_err("Dispatch should fail");
    assert!(matches!(
        &err,
        DispatchError::InvoiceNotFound { reminder_id, invoice_id }
            if *reminder_id == reminder.id && *invoice_id == foreign.invoice.id
    ));
    assert_eq!(err.kind(), DispatchErrorKind::ReferentialIntegrity);
    assert_eq!(err.public_message(), "send failed");

    let stored = Reminder::find_by_id_and_org(&ctx.db, ctx.scope(), reminder.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get_status(), Some(ReminderStatus::Scheduled));
    assert!(stored.sent_at.is_none());
    assert_eq!(ctx.count("outbox").await, 0);
}

#[tokio::test]
async fn test_deleted_template_falls_back_to_new_default() {
    let ctx = TestContext::new().await.unwrap();
    let custom = Template::create(
        &ctx.db,
        ctx.scope(),
        CreateTemplate {
            name: "Custom".to_string(),
            subject: "Pay {{invoice_number}}".to_string(),
            body: "{{amount}}".to_string(),
        },
        today() - Duration::days(25),
    )
    .await
    .unwrap();

    let yesterday = (today() - Duration::days(1)).date_naive();
    let mut created = Invoice::create_with_reminders(
        &ctx.db,
        ctx.scope(),
        CreateInvoice {
            client_id: ctx.client.id,
            template_id: Some(custom.id),
            number: "INV-7".to_string(),
            amount_cents: 900,
            currency: "eur".to_string(),
            due_date: yesterday,
            reminder_offsets: vec![0],
            ..Default::default()
        },
        today() - Duration::days(2),
    )
    .await
    .unwrap();
    let reminder = created.reminders.remove(0);
    assert_eq!(reminder.template_id, Some(custom.id));

    // Leaves the organization with no templates at all
    assert!(Template::delete(&ctx.db, ctx.scope(), custom.id).await.unwrap());
    assert_eq!(ctx.count("templates").await, 0);

    let outcome = ReminderService::new(ctx.db.clone())
        .dispatch_one(ctx.scope(), reminder.id, today())
        .await
        .unwrap();

    let templates = Template::list_by_org(&ctx.db, ctx.scope()).await.unwrap();
    assert_eq!(templates.len(), 1, "Exactly one default should be provisioned");
    assert_eq!(templates[0].name, DEFAULT_TEMPLATE_NAME);

    match outcome {
        DispatchOutcome::Dispatched {
            template,
            template_id,
            ..
        } => {
            assert_eq!(template, TemplateSource::Fallback);
            assert_eq!(template_id, templates[0].id);
        }
        DispatchOutcome::NotDispatched => panic!("Expected dispatch"),
    }

    let email = OutboxEmail::find_by_reminder(&ctx.db, ctx.scope(), reminder.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(email.subject, "Friendly reminder: invoice INV-7");
    assert!(email.body.contains("EUR 9.00"));
}

#[tokio::test]
async fn test_foreign_template_reference_falls_back() {
    let ctx = TestContext::new().await.unwrap();
    let (other_org, _) = ctx.add_tenant("Other Studio").await.unwrap();
    let foreign_template = Template::create(
        &ctx.db,
        TenantScope::new(other_org.id),
        CreateTemplate {
            name: "Theirs".to_string(),
            subject: "Secret {{org_name}}".to_string(),
            body: "not for you".to_string(),
        },
        today() - Duration::days(25),
    )
    .await
    .unwrap();

    let base = ctx.due_reminder().await.unwrap();
    let reminder = ctx
        .insert_reminder(
            ctx.scope(),
            base.invoice_id,
            Some(foreign_template.id),
            today() - Duration::hours(2),
        )
        .await
        .unwrap();

    let outcome = ReminderService::new(ctx.db.clone())
        .dispatch_one(ctx.scope(), reminder.id, today())
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        DispatchOutcome::Dispatched {
            template: TemplateSource::Fallback,
            ..
        }
    ));

    let email = OutboxEmail::find_by_reminder(&ctx.db, ctx.scope(), reminder.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(email.subject, "Friendly reminder: invoice INV-100");
}

#[tokio::test]
async fn test_custom_template_keeps_unknown_placeholders() {
    let ctx = TestContext::new().await.unwrap();
    let base = ctx.due_reminder().await.unwrap();
    let custom = Template::create(
        &ctx.db,
        ctx.scope(),
        CreateTemplate {
            name: "Terse".to_string(),
            subject: "{{org_name}}: {{invoice_number}} ({{po_number}})".to_string(),
            body: "{{client_company}} owes {{amount}}".to_string(),
        },
        today(),
    )
    .await
    .unwrap();
    let reminder = ctx
        .insert_reminder(ctx.scope(), base.invoice_id, Some(custom.id), today())
        .await
        .unwrap();

    ReminderService::new(ctx.db.clone())
        .dispatch_one(ctx.scope(), reminder.id, today())
        .await
        .unwrap();

    let email = OutboxEmail::find_by_reminder(&ctx.db, ctx.scope(), reminder.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(email.subject, "Studio One: INV-100 ({{po_number}})");
    assert_eq!(email.body, "Jamie Co owes USD 1250.00");
}

#[tokio::test]
async fn test_ensure_default_template_is_idempotent() {
    let ctx = TestContext::new().await.unwrap();
    let mut conn = ctx.db.acquire().await.unwrap();

    let first = ensure_default_template(&mut conn, ctx.scope(), today())
        .await
        .unwrap()
        .expect("Default should be created");
    let second = ensure_default_template(&mut conn, ctx.scope(), today() + Duration::hours(1))
        .await
        .unwrap()
        .expect("Default should be found");
    drop(conn);

    assert_eq!(first, second);
    assert_eq!(ctx.count("templates").await, 1);
}

#[tokio::test]
async fn test_concurrent_ensure_default_template_creates_one() {
    let ctx = TestContext::file_backed().await.unwrap();
    assert_eq!(ctx.count("templates").await, 0);

    let mut handles = vec![];
    for i in 0..8 {
        let pool = ctx.db.clone();
        let scope = ctx.scope();
        handles.push(tokio::spawn(async move {
            let mut conn = pool.acquire().await.unwrap();
            ensure_default_template(&mut conn, scope, today() + Duration::seconds(i))
                .await
                .unwrap()
        }));
    }

    let mut ids = vec![];
    for handle in handles {
        ids.push(handle.await.unwrap().expect("Default should exist"));
    }
    ids.dedup();

    assert_eq!(ids.len(), 1);
    assert_eq!(ctx.count("templates").await, 1);
}

#[tokio::test]
async fn test_ensure_default_template_keeps_oldest_existing() {
    let ctx = TestContext::new().await.unwrap();
    let older = Template::create(
        &ctx.db,
        ctx.scope(),
        CreateTemplate {
            name: "First".to_string(),
            subject: "a".to_string(),
            body: "b".to_string(),
        },
        today() - Duration::days(3),
    )
    .await
    .unwrap();
    Template::create(
        &ctx.db,
        ctx.scope(),
        CreateTemplate {
            name: "Second".to_string(),
            subject: "c".to_string(),
            body: "d".to_string(),
        },
        today() - Duration::days(1),
    )
    .await
    .unwrap();

    let mut conn = ctx.db.acquire().await.unwrap();
    let id = ensure_default_template(&mut conn, ctx.scope(), today())
        .await
        .unwrap();
    drop(conn);

    assert_eq!(id, Some(older.id));
    assert_eq!(ctx.count("templates").await, 2);
}

#[tokio::test]
async fn test_outbox_serializes_delivery_contract() {
    let ctx = TestContext::new().await.unwrap();
    let reminder = ctx.due_reminder().await.unwrap();
    ReminderService::new(ctx.db.clone())
        .dispatch_one(ctx.scope(), reminder.id, today())
        .await
        .unwrap();

    let email = OutboxEmail::find_by_reminder(&ctx.db, ctx.scope(), reminder.id)
        .await
        .unwrap()
        .unwrap();
    let json = serde_json::to_value(&email).unwrap();

    assert_eq!(json["reminder_id"], reminder.id.to_string());
    assert_eq!(json["org_id"], ctx.org.id.to_string());
    assert_eq!(json["to_email"], "jamie@example.com");
    assert_eq!(json["subject"], "Friendly reminder: invoice INV-100");
    assert!(json["body"].as_str().unwrap().contains("USD 1250.00"));
    assert!(json["created_at"].is_string());
    assert!(json["id"].is_string());

    let back: OutboxEmail = serde_json::from_value(json).unwrap();
    assert_eq!(back, email);
}
