mod support;

use serde_json::{Value, json};
use std::sync::Arc;
use support::{
    CancellingAuditWriter, CountingAuditWriter, ProductBuilder, TestDb, audit_logs,
    audited_factory, default_factory, fixed_clock, open, product,
};
use tenant_audit::domain::audit::AuditAction;
use tenant_audit::domain::errors::DomainError;
use tenant_audit::domain::product::Product;
use tenant_audit::infrastructure::audit::AuditWriter;
use tokio_util::sync::CancellationToken;

fn object(map: &serde_json::Map<String, Value>) -> Value {
    Value::Object(map.clone())
}

#[tokio::test]
async fn insert_update_delete_are_audited_with_field_level_state() {
    let db = TestDb::new();
    let (factory, _) = default_factory();
    let cancel = CancellationToken::new();

    let mut ctx = open(&factory, &db.tenant("T1"), Some("alice")).await;
    ctx.set::<Product>().add(product(1)).unwrap();
    assert_eq!(ctx.save(&cancel).await.unwrap(), 1);

    ctx.set::<Product>()
        .update(ProductBuilder::new(1).name("Gadget").build())
        .await
        .unwrap();
    assert_eq!(ctx.save(&cancel).await.unwrap(), 1);

    assert!(ctx.set::<Product>().remove(1).await.unwrap());
    assert_eq!(ctx.save(&cancel).await.unwrap(), 1);

    // Newest first.
    let logs = audit_logs(&factory, &db, "T1").await;
    assert_eq!(logs.len(), 3);
    let (deleted, modified, added) = (&logs[0], &logs[1], &logs[2]);

    assert_eq!(added.action, AuditAction::Added);
    assert_eq!(added.table_name, "products");
    assert_eq!(added.tenant_id, "T1");
    assert_eq!(added.user_id.as_deref(), Some("alice"));
    assert_eq!(added.created_at, fixed_clock().0);
    assert_eq!(object(&added.key_values), json!({ "id": 1 }));
    assert!(added.old_values.is_empty());
    assert_eq!(
        object(&added.new_values),
        json!({
            "id": 1, "name": "Widget", "rate": 5, "price": 9.5,
            "stock": 3.0, "description": "blue", "tenant_id": "T1"
        })
    );

    assert_eq!(modified.action, AuditAction::Modified);
    assert_eq!(object(&modified.old_values), json!({ "name": "Widget" }));
    assert_eq!(object(&modified.new_values), json!({ "name": "Gadget" }));

    assert_eq!(deleted.action, AuditAction::Deleted);
    assert!(deleted.new_values.is_empty());
    assert_eq!(deleted.old_values.get("name"), Some(&json!("Gadget")));
    assert_eq!(deleted.old_values.get("tenant_id"), Some(&json!("T1")));
    assert_eq!(deleted.old_values.len(), 7);
}

#[tokio::test]
async fn unchanged_update_writes_nothing() {
    let db = TestDb::new();
    let writer = Arc::new(CountingAuditWriter::default());
    let (factory, _) = audited_factory(writer.clone());
    let cancel = CancellationToken::new();

    let mut ctx = open(&factory, &db.tenant("T1"), None).await;
    ctx.set::<Product>().add(product(1)).unwrap();
    ctx.save(&cancel).await.unwrap();
    assert_eq!(writer.batches(), 1);

    ctx.set::<Product>().update(product(1)).await.unwrap();
    assert!(!ctx.has_changes());
    assert_eq!(ctx.save(&cancel).await.unwrap(), 0);
    assert_eq!(writer.batches(), 1);
    assert_eq!(audit_logs(&factory, &db, "T1").await.len(), 1);
}

#[tokio::test]
async fn buffer_is_consumed_and_a_second_flush_is_a_no_op() {
    let db = TestDb::new();
    let writer = Arc::new(CountingAuditWriter::default());
    let (factory, interceptor) = audited_factory(writer.clone());
    let cancel = CancellationToken::new();

    let mut ctx = open(&factory, &db.tenant("T1"), None).await;
    ctx.set::<Product>().add(product(1)).unwrap();
    ctx.save(&cancel).await.unwrap();

    assert!(!interceptor.buffer().contains(ctx.id()));
    assert!(interceptor.buffer().is_empty());

    // Nothing pending: no error, no duplicate insert.
    assert_eq!(ctx.save(&cancel).await.unwrap(), 0);
    assert_eq!(writer.batches(), 1);
    assert_eq!(audit_logs(&factory, &db, "T1").await.len(), 1);
}

#[tokio::test]
async fn audit_failure_does_not_fail_the_business_save() {
    let db = TestDb::new();
    let (factory, interceptor) = default_factory();
    let cancel = CancellationToken::new();

    let pool = factory.registry().pool_for(&db.connection).await.unwrap();
    sqlx::query("DROP TABLE audit_logs").execute(&pool).await.unwrap();

    let mut ctx = open(&factory, &db.tenant("T1"), None).await;
    ctx.set::<Product>().add(product(1)).unwrap();
    assert_eq!(ctx.save(&cancel).await.unwrap(), 1);
    assert!(interceptor.buffer().is_empty());

    let mut reader = open(&factory, &db.tenant("T1"), None).await;
    assert!(reader.set::<Product>().find(1).await.unwrap().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_save_runs_the_same_cycle() {
    let db = TestDb::new();
    let (factory, interceptor) = default_factory();

    let mut ctx = open(&factory, &db.tenant("T1"), Some("bob")).await;
    ctx.set::<Product>().add(product(1)).unwrap();
    let id = ctx.id();

    let (ctx, affected) = tokio::task::spawn_blocking(move || {
        let affected = ctx.save_blocking();
        (ctx, affected)
    })
    .await
    .unwrap();
    assert_eq!(affected.unwrap(), 1);
    assert!(!ctx.has_changes());
    assert!(!interceptor.buffer().contains(id));

    let logs = audit_logs(&factory, &db, "T1").await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, AuditAction::Added);
    assert_eq!(logs[0].user_id.as_deref(), Some("bob"));
}

#[test]
fn blocking_save_outside_a_runtime_is_a_configuration_error() {
    let db = TestDb::new();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (factory, _) = default_factory();
    let mut ctx = runtime.block_on(open(&factory, &db.tenant("T1"), None));
    ctx.set::<Product>().add(product(1)).unwrap();

    assert!(matches!(ctx.save_blocking(), Err(DomainError::Configuration(_))));
    assert!(ctx.has_changes());

    // Pools are torn down inside the runtime that created them.
    runtime.block_on(async move {
        drop(ctx);
        drop(factory);
    });
}

#[tokio::test]
async fn concurrent_contexts_do_not_share_captures() {
    let (factory, interceptor) = default_factory();
    let factory = Arc::new(factory);
    // One database per tenant keeps SQLite write locks out of the picture;
    // the pending buffer is still shared by every context.
    let dbs: Vec<Arc<TestDb>> = (0..4).map(|_| Arc::new(TestDb::new())).collect();

    let mut handles = Vec::new();
    for (idx, db) in dbs.iter().enumerate() {
        let factory = Arc::clone(&factory);
        let db = Arc::clone(db);
        handles.push(tokio::spawn(async move {
            let tenant = format!("tenant-{idx}");
            let mut ctx = open(&factory, &db.tenant(&tenant), None).await;
            for id in 1..=3 {
                ctx.set::<Product>().add(product(id)).unwrap();
            }
            ctx.save(&CancellationToken::new()).await.unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 3);
    }
    assert!(interceptor.buffer().is_empty());

    for (idx, db) in dbs.iter().enumerate() {
        let tenant = format!("tenant-{idx}");
        let logs = audit_logs(&factory, db, &tenant).await;
        assert_eq!(logs.len(), 3);
        assert!(logs.iter().all(|log| log.tenant_id == tenant));
        assert!(
            logs.iter()
                .all(|log| log.new_values.get("tenant_id") == Some(&json!(tenant)))
        );
    }
}

#[tokio::test]
async fn failed_commit_capture_is_discarded_by_a_later_empty_save() {
    let db = TestDb::new();
    let (factory, interceptor) = default_factory();
    let cancel = CancellationToken::new();

    let mut ctx = open(&factory, &db.tenant("T1"), None).await;
    ctx.set::<Product>().add(product(1)).unwrap();
    ctx.save(&cancel).await.unwrap();

    let mut ctx = open(&factory, &db.tenant("T1"), None).await;
    ctx.set::<Product>().add(product(1)).unwrap();
    assert!(matches!(ctx.save(&cancel).await, Err(DomainError::Conflict(_))));
    assert!(interceptor.buffer().contains(ctx.id()));

    ctx.reject_changes();
    assert_eq!(ctx.save(&cancel).await.unwrap(), 0);
    assert!(!interceptor.buffer().contains(ctx.id()));
    assert_eq!(audit_logs(&factory, &db, "T1").await.len(), 1);
}

#[tokio::test]
async fn dropping_a_context_after_a_failed_commit_releases_its_capture() {
    let db = TestDb::new();
    let (factory, interceptor) = default_factory();
    let cancel = CancellationToken::new();

    let mut ctx = open(&factory, &db.tenant("T1"), None).await;
    ctx.set::<Product>().add(product(1)).unwrap();
    ctx.save(&cancel).await.unwrap();
    drop(ctx);

    for _ in 0..5 {
        let mut ctx = open(&factory, &db.tenant("T1"), None).await;
        ctx.set::<Product>().add(product(1)).unwrap();
        assert!(matches!(ctx.save(&cancel).await, Err(DomainError::Conflict(_))));
        assert!(interceptor.buffer().contains(ctx.id()));
        drop(ctx);
    }
    assert!(interceptor.buffer().is_empty());
    assert_eq!(audit_logs(&factory, &db, "T1").await.len(), 1);
}

#[tokio::test]
async fn failed_commit_capture_is_replaced_by_the_next_cycle() {
    let db = TestDb::new();
    let (factory, interceptor) = default_factory();
    let cancel = CancellationToken::new();

    let mut ctx = open(&factory, &db.tenant("T1"), None).await;
    ctx.set::<Product>().add(product(1)).unwrap();
    ctx.save(&cancel).await.unwrap();

    let mut ctx = open(&factory, &db.tenant("T1"), None).await;
    ctx.set::<Product>().add(product(1)).unwrap();
    assert!(ctx.save(&cancel).await.is_err());

    ctx.reject_changes();
    ctx.set::<Product>().add(product(2)).unwrap();
    ctx.save(&cancel).await.unwrap();
    assert!(interceptor.buffer().is_empty());

    let logs = audit_logs(&factory, &db, "T1").await;
    assert_eq!(logs.len(), 2);
    assert_eq!(object(&logs[0].key_values), json!({ "id": 2 }));
    assert_eq!(object(&logs[1].key_values), json!({ "id": 1 }));
}

#[tokio::test]
async fn cancellation_before_commit_aborts_the_cycle() {
    let db = TestDb::new();
    let (factory, interceptor) = default_factory();

    let mut ctx = open(&factory, &db.tenant("T1"), None).await;
    ctx.set::<Product>().add(product(1)).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    assert!(matches!(ctx.save(&cancel).await, Err(DomainError::Cancelled)));
    assert!(ctx.has_changes());
    assert!(interceptor.buffer().is_empty());

    let mut reader = open(&factory, &db.tenant("T1"), None).await;
    assert!(reader.set::<Product>().list().await.unwrap().is_empty());
    assert!(audit_logs(&factory, &db, "T1").await.is_empty());
}

#[tokio::test]
async fn cancellation_after_commit_drops_only_the_audit_batch() {
    let db = TestDb::new();
    let cancel = CancellationToken::new();
    let writer: Arc<dyn AuditWriter> = Arc::new(CancellingAuditWriter {
        token: cancel.clone(),
    });
    let (factory, interceptor) = audited_factory(writer);

    let mut ctx = open(&factory, &db.tenant("T1"), None).await;
    ctx.set::<Product>().add(product(1)).unwrap();
    assert_eq!(ctx.save(&cancel).await.unwrap(), 1);
    assert!(cancel.is_cancelled());
    assert!(interceptor.buffer().is_empty());

    let mut reader = open(&factory, &db.tenant("T1"), None).await;
    assert!(reader.set::<Product>().find(1).await.unwrap().is_some());
    assert!(audit_logs(&factory, &db, "T1").await.is_empty());
}
