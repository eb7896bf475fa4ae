//! Integration tests for the operation queue and status store.
//!
//! These tests require the `sqlite` and `migrate` features to be enabled
//! and use an in-memory SQLite database.

#![cfg(all(feature = "sqlite", feature = "migrate"))]

use std::sync::Arc;
use std::time::Duration;

use backstroke::connect_and_migrate;
use backstroke::entity::link_operation::{Column as LinkOperationColumn, Entity as LinkOperation};
use backstroke::entity::operation_state::OperationState;
use backstroke::link::LinkId;
use backstroke::queue::{OperationQueue, SqlQueue};
use backstroke::status::{OperationCounters, OperationStatus, SqlStatusStore, StatusStore};
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Create an in-memory SQLite database with migrations applied.
async fn setup_test_db() -> Arc<DatabaseConnection> {
    let db = connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to create test database");
    Arc::new(db)
}

async fn link_rows(db: &DatabaseConnection, link_id: &str) -> u64 {
    LinkOperation::find()
        .filter(LinkOperationColumn::LinkId.eq(link_id))
        .count(db)
        .await
        .unwrap()
}

// ─── Queue ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn queue_pops_in_push_order() {
    let queue = SqlQueue::new(setup_test_db().await);

    let first = queue.push(json!({"n": 1})).await.unwrap();
    let second = queue.push(json!({"n": 2})).await.unwrap();
    let third = queue.push(json!({"n": 3})).await.unwrap();
    assert_eq!(queue.len().await.unwrap(), 3);

    let popped: Vec<_> = [
        queue.pop().await.unwrap().unwrap(),
        queue.pop().await.unwrap().unwrap(),
        queue.pop().await.unwrap().unwrap(),
    ]
    .into_iter()
    .map(|item| (item.id, item.payload["n"].as_i64().unwrap()))
    .collect();

    assert_eq!(popped, vec![(first, 1), (second, 2), (third, 3)]);
}

#[tokio::test]
async fn empty_queue_pops_none_immediately() {
    let queue = SqlQueue::new(setup_test_db().await);
    assert!(queue.pop().await.unwrap().is_none());
    assert_eq!(queue.len().await.unwrap(), 0);
}

#[tokio::test]
async fn popped_operation_is_gone() {
    let queue = SqlQueue::new(setup_test_db().await);
    queue.push(json!({"n": 1})).await.unwrap();

    assert!(queue.pop().await.unwrap().is_some());
    assert!(queue.pop().await.unwrap().is_none());
}

// ─── Status records ────────────────────────────────────────────────────────────

#[tokio::test]
async fn status_round_trips() {
    let store = SqlStatusStore::new(setup_test_db().await);
    let id = Uuid::new_v4();
    let record = OperationStatus {
        from_request: Some("req-42".into()),
        ..OperationStatus::running(Utc::now())
    };

    store.set(id, &record, DAY).await.unwrap();

    assert_eq!(store.get(id).await.unwrap(), Some(record));
}

#[tokio::test]
async fn set_overwrites_previous_record() {
    let store = SqlStatusStore::new(setup_test_db().await);
    let id = Uuid::new_v4();
    let running = OperationStatus::running(Utc::now());
    store.set(id, &running, DAY).await.unwrap();

    let finished = running.finish(
        OperationState::Ok,
        json!({"many": false, "response": "done"}),
        Utc::now(),
    );
    store.set(id, &finished, DAY).await.unwrap();

    assert_eq!(store.get(id).await.unwrap(), Some(finished));
}

#[tokio::test]
async fn unknown_id_has_no_status() {
    let store = SqlStatusStore::new(setup_test_db().await);
    assert_eq!(store.get(Uuid::new_v4()).await.unwrap(), None);
}

#[tokio::test]
async fn expired_records_are_hidden_and_purged() {
    let store = SqlStatusStore::new(setup_test_db().await);
    let expired = Uuid::new_v4();
    let live = Uuid::new_v4();
    let record = OperationStatus::running(Utc::now());

    store.set(expired, &record, Duration::ZERO).await.unwrap();
    store.set(live, &record, DAY).await.unwrap();

    assert_eq!(store.get(expired).await.unwrap(), None);
    let stats = store.purge_expired().await.unwrap();
    assert_eq!(stats.statuses, 1);
    assert!(store.get(live).await.unwrap().is_some());
}

#[tokio::test]
async fn finished_records_bump_counters() {
    let store = SqlStatusStore::new(setup_test_db().await);
    let now = Utc::now();

    for state in [OperationState::Ok, OperationState::Ok, OperationState::Error] {
        let id = Uuid::new_v4();
        let running = OperationStatus::running(now);
        store.set(id, &running, DAY).await.unwrap();
        store
            .set(id, &running.finish(state, json!({}), now), DAY)
            .await
            .unwrap();
    }

    assert_eq!(
        store.counters().await.unwrap(),
        OperationCounters {
            successes: 2,
            errors: 1
        }
    );
}

// ─── Link index ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn attach_is_idempotent() {
    let db = setup_test_db().await;
    let store = SqlStatusStore::new(db.clone());
    let link = LinkId::from(8);
    let id = Uuid::new_v4();

    store.attach_to_link(&link, id).await.unwrap();
    store.attach_to_link(&link, id).await.unwrap();

    assert_eq!(link_rows(&db, "8").await, 1);
    let history = store.list_for_link(&link).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].operation_id, id);
}

#[tokio::test]
async fn attach_prunes_entries_older_than_retention() {
    let db = setup_test_db().await;
    let store = SqlStatusStore::new(db.clone());
    let link = LinkId::from("abc");
    let now = Utc::now();
    let old = Uuid::new_v4();
    let recent = Uuid::new_v4();

    store
        .attach_to_link_at(&link, old, now - chrono::Duration::hours(25))
        .await
        .unwrap();
    store
        .attach_to_link_at(&link, recent, now - chrono::Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(link_rows(&db, "abc").await, 1);

    let newest = Uuid::new_v4();
    store.attach_to_link_at(&link, newest, now).await.unwrap();

    let ids: Vec<_> = store
        .list_for_link(&link)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.operation_id)
        .collect();
    assert_eq!(ids, vec![recent, newest]);
}

#[tokio::test]
async fn pruning_is_scoped_to_the_link() {
    let db = setup_test_db().await;
    let store = SqlStatusStore::new(db.clone());
    let stale = Utc::now() - chrono::Duration::hours(30);

    store
        .attach_to_link_at(&LinkId::from(1), Uuid::new_v4(), stale)
        .await
        .unwrap();
    store
        .attach_to_link(&LinkId::from(2), Uuid::new_v4())
        .await
        .unwrap();

    assert_eq!(link_rows(&db, "1").await, 1);
    let stats = store.purge_expired().await.unwrap();
    assert_eq!(stats.link_entries, 1);
    assert_eq!(link_rows(&db, "1").await, 0);
    assert_eq!(link_rows(&db, "2").await, 1);
}

#[tokio::test]
async fn history_carries_current_status() {
    let store = SqlStatusStore::new(setup_test_db().await);
    let link = LinkId::from(8);
    let id = Uuid::new_v4();
    let record = OperationStatus::running(Utc::now());

    store.set(id, &record, DAY).await.unwrap();
    store.attach_to_link(&link, id).await.unwrap();

    let history = store.list_for_link(&link).await.unwrap();
    assert_eq!(history[0].status, Some(record));
}
