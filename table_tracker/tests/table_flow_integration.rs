//! Integration tests for the table engine behind its manager facade.
//!
//! Everything runs against the in-memory store, so these are deterministic
//! and need no database. Timing-sensitive checks drive the engine with
//! synthetic ticks instead of waiting on the wall clock.

use std::sync::Arc;
use table_tracker::db::MemoryStore;
use table_tracker::tables::{
    GameType, TableAction, TableError, TableManager, TableStatus, TablesConfig,
};

fn manager_with_store() -> (TableManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let manager = TableManager::new(TablesConfig::default(), store.clone());
    (manager, store)
}

#[tokio::test]
async fn idle_tables_reject_pause_and_end() {
    let (manager, _store) = manager_with_store();

    let err = manager
        .handle_table_action(GameType::Snooker, 1, TableAction::Pause, "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, TableError::InvalidTransition { .. }));

    let err = manager
        .handle_table_action(GameType::Snooker, 1, TableAction::End, "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, TableError::InvalidTransition { .. }));

    // Nothing was persisted by the rejected actions.
    assert_eq!(_store.session_count(), 0);
}

#[tokio::test]
async fn unknown_table_and_double_start_are_rejected() {
    let (manager, _store) = manager_with_store();

    let err = manager
        .handle_table_action(GameType::Pool, 17, TableAction::Start, "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, TableError::UnknownTable { table_id: 17, .. }));

    manager
        .handle_table_action(GameType::Pool, 1, TableAction::Start, "admin")
        .await
        .unwrap();
    let err = manager
        .handle_table_action(GameType::Pool, 1, TableAction::Start, "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, TableError::InvalidTransition { .. }));
}

#[tokio::test]
async fn immediate_end_yields_zero_session_and_persists_it() {
    let (manager, store) = manager_with_store();

    manager
        .handle_table_action(GameType::Snooker, 1, TableAction::Start, "staff1")
        .await
        .unwrap();
    let result = manager
        .handle_table_action(GameType::Snooker, 1, TableAction::End, "staff1")
        .await
        .unwrap();

    assert!(result.prompt_assignment);
    assert!(result.persisted);
    let session = result.session.expect("end returns the session");
    assert_eq!(session.duration_minutes, 0.0);
    assert_eq!(session.amount, 0.0);
    assert_eq!(session.staff, "staff1");

    // The durable record landed and the table is idle again.
    assert_eq!(store.session_count(), 1);
    let tables = manager.get_tables(GameType::Snooker).await.unwrap();
    let view = &tables[&1];
    assert_eq!(view.status, TableStatus::Idle);
    assert_eq!(view.time, "00:00");
    assert_eq!(view.recent_sessions.len(), 1);
}

#[tokio::test]
async fn failed_persistence_is_reported_not_swallowed() {
    let (manager, store) = manager_with_store();
    store.fail_session_saves(true);

    manager
        .handle_table_action(GameType::Pool, 2, TableAction::Start, "admin")
        .await
        .unwrap();
    let result = manager
        .handle_table_action(GameType::Pool, 2, TableAction::End, "admin")
        .await
        .unwrap();

    // The in-memory transition committed, but the caller is told the record
    // never reached storage.
    assert!(!result.persisted);
    assert!(result.session.is_some());
    assert_eq!(store.session_count(), 0);

    let tables = manager.get_tables(GameType::Pool).await.unwrap();
    assert_eq!(tables[&2].status, TableStatus::Idle);
    assert_eq!(tables[&2].recent_sessions.len(), 1);
}

#[tokio::test]
async fn synthetic_ticks_accrue_time_and_amount() {
    let (manager, _store) = manager_with_store();

    manager
        .handle_table_action(GameType::Snooker, 1, TableAction::Start, "admin")
        .await
        .unwrap();

    let start = chrono::Utc::now();
    for s in 1..=150 {
        manager
            .tick_at(start + chrono::Duration::seconds(s))
            .await
            .unwrap();
    }

    let tables = manager.get_tables(GameType::Snooker).await.unwrap();
    let view = &tables[&1];
    assert_eq!(view.status, TableStatus::Running);
    assert_eq!(view.time, "02:30");
    // 2.5 minutes at the default 4.0/min.
    assert_eq!(view.amount, 10.0);
}

#[tokio::test]
async fn rate_updates_only_apply_to_idle_tables_from_the_allowed_list() {
    let (manager, _store) = manager_with_store();

    assert!(manager.available_rates().contains(&6.5));

    let err = manager
        .update_table_rate(GameType::Snooker, 1, 6.25)
        .await
        .unwrap_err();
    assert!(matches!(err, TableError::RateNotAllowed(_)));

    manager
        .handle_table_action(GameType::Snooker, 1, TableAction::Start, "admin")
        .await
        .unwrap();
    let err = manager
        .update_table_rate(GameType::Snooker, 1, 6.5)
        .await
        .unwrap_err();
    assert!(matches!(err, TableError::RateLocked(_)));

    manager
        .handle_table_action(GameType::Snooker, 1, TableAction::End, "admin")
        .await
        .unwrap();
    manager
        .update_table_rate(GameType::Snooker, 1, 6.5)
        .await
        .unwrap();

    let tables = manager.get_tables(GameType::Snooker).await.unwrap();
    assert_eq!(tables[&1].rate, 6.5);
}

#[tokio::test]
async fn clearing_recent_sessions_is_view_only() {
    let (manager, store) = manager_with_store();

    for _ in 0..2 {
        manager
            .handle_table_action(GameType::Pool, 1, TableAction::Start, "admin")
            .await
            .unwrap();
        manager
            .handle_table_action(GameType::Pool, 1, TableAction::End, "admin")
            .await
            .unwrap();
    }

    let tables = manager.get_tables(GameType::Pool).await.unwrap();
    assert_eq!(tables[&1].recent_sessions.len(), 2);

    manager
        .clear_recent_sessions(GameType::Pool, 1)
        .await
        .unwrap();

    let tables = manager.get_tables(GameType::Pool).await.unwrap();
    assert!(tables[&1].recent_sessions.is_empty());
    // Durable storage still holds both records.
    assert_eq!(store.session_count(), 2);
}

#[tokio::test]
async fn startup_seeding_warms_the_recent_windows() {
    let store = Arc::new(MemoryStore::new());

    // A previous process finalized four sessions on snooker table 1.
    {
        let manager = TableManager::new(TablesConfig::default(), store.clone());
        for _ in 0..4 {
            manager
                .handle_table_action(GameType::Snooker, 1, TableAction::Start, "admin")
                .await
                .unwrap();
            manager
                .handle_table_action(GameType::Snooker, 1, TableAction::End, "admin")
                .await
                .unwrap();
        }
        assert_eq!(store.session_count(), 4);
    }

    // A fresh manager starts with empty windows and loads the last three.
    let manager = TableManager::new(TablesConfig::default(), store.clone());
    let seeded = manager.seed_recent_sessions().await;
    assert_eq!(seeded, 3);

    let tables = manager.get_tables(GameType::Snooker).await.unwrap();
    assert_eq!(tables[&1].recent_sessions.len(), 3);
    assert!(tables[&2].recent_sessions.is_empty());
}

#[tokio::test]
async fn status_reports_running_counts_per_game() {
    let (manager, _store) = manager_with_store();

    manager
        .handle_table_action(GameType::Snooker, 1, TableAction::Start, "admin")
        .await
        .unwrap();
    manager
        .handle_table_action(GameType::Pool, 1, TableAction::Start, "admin")
        .await
        .unwrap();
    manager
        .handle_table_action(GameType::Pool, 1, TableAction::Pause, "admin")
        .await
        .unwrap();

    let status = manager.status().await.unwrap();
    assert_eq!(status.snooker.running, 1);
    assert_eq!(status.snooker.idle, 2);
    assert_eq!(status.pool.paused, 1);
    assert_eq!(status.pool.total, 3);
}
