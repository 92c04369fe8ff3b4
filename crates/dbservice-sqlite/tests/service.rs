//! End-to-end tests of the database service against SQLite files.
//!
//! Every test gets its own temporary directory, so the suite needs no
//! external database:
//!
//! ```bash
//! cargo test -p dbservice-sqlite --test service
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::{Duration, Instant};

use dbservice::{Config, Database, Error, ErrorKind, KeyCase, LifecycleState, Query};
use dbservice_sqlite::SqliteDriver;
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

fn config(dir: &TempDir) -> Config {
    Config::new()
        .database(dir.path().join("service.db").to_string_lossy())
        .pool_size(1, 4)
        .acquire_timeout(Duration::from_secs(5))
        .close_grace(Duration::from_millis(200))
}

fn database(dir: &TempDir) -> Database {
    Database::new(SqliteDriver::new(), config(dir))
}

fn in_use(db: &Database) -> u32 {
    db.status().pool.map_or(0, |p| p.in_use)
}

async fn seed_users(db: &Database, count: i64) {
    db.execute_query(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, user_name TEXT NOT NULL, active INTEGER NOT NULL)",
        &[],
    )
    .await
    .unwrap();

    let inserts = (1..=count)
        .map(|id| {
            Query::new("INSERT INTO users (id, user_name, active) VALUES (?, ?, ?)")
                .bind(id)
                .bind(format!("user{id}"))
                .bind(id % 2 == 0)
        })
        .collect();
    db.execute_transaction(inserts).await.unwrap();
}

// =============================================================================
// Initialization
// =============================================================================

#[tokio::test]
async fn test_first_query_initializes_lazily() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);
    assert_eq!(db.state(), LifecycleState::Uninitialized);

    let result = db.execute_query("SELECT 1 AS one", &[]).await.unwrap();
    assert_eq!(result.scalar::<i64>().unwrap(), 1);

    assert_eq!(db.state(), LifecycleState::Ready);
    assert_eq!(db.pools_created(), 1);
    assert!(db.is_pool_active());
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);

    db.initialize(config(&dir)).await.unwrap();
    db.initialize(config(&dir).pool_size(2, 8)).await.unwrap();
    db.ensure_initialized().await.unwrap();

    assert_eq!(db.pools_created(), 1);
    assert_eq!(db.status().pool.unwrap().max, 4);
}

#[tokio::test]
async fn test_test_connection_reports_reachability() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);
    db.ensure_initialized().await.unwrap();
    assert!(db.test_connection().await);

    let report = db.probe().await;
    assert!(report.reachable);
    assert!(report.latency.is_some());
}

#[tokio::test]
async fn test_unreachable_database_fails_with_connectivity() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("no-such-dir").join("db.sqlite");
    let db = Database::new(
        SqliteDriver::new(),
        Config::new().database(missing.to_string_lossy()),
    );

    let err = db.ensure_initialized().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert_eq!(db.state(), LifecycleState::Failed);
    assert!(!db.test_connection().await);
}

#[tokio::test]
async fn test_missing_file_without_create_is_connectivity() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(SqliteDriver::new().create_if_missing(false), config(&dir));

    let err = db.ensure_initialized().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connectivity);
}

#[tokio::test]
async fn test_session_statements_run_on_every_connection() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(
        SqliteDriver::new(),
        config(&dir)
            .session_statement("PRAGMA foreign_keys = ON")
            .session_statement("THIS IS NOT SQL"),
    );

    // The failing statement is logged and ignored.
    let result = db.execute_query("PRAGMA foreign_keys", &[]).await.unwrap();
    assert_eq!(result.scalar::<i64>().unwrap(), 1);
}

// =============================================================================
// Query execution
// =============================================================================

#[tokio::test]
async fn test_dml_reports_rows_affected() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);
    seed_users(&db, 5).await;

    let result = db
        .execute_query("UPDATE users SET active = ? WHERE id > ?", &[&true, &2])
        .await
        .unwrap();
    assert_eq!(result.rows_affected(), 3);
    assert!(result.is_empty());

    let result = db
        .execute_query("SELECT user_name FROM users WHERE active = ? ORDER BY id", &[&true])
        .await
        .unwrap();
    let names: Vec<String> = result
        .rows()
        .iter()
        .map(|row| row.get_by_name("USER_NAME").unwrap())
        .collect();
    assert_eq!(names, ["user2", "user3", "user4", "user5"]);
}

#[tokio::test]
async fn test_named_parameters() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);
    seed_users(&db, 3).await;

    let result = db
        .execute_named(
            "SELECT user_name FROM users WHERE id = :id",
            &[("id", &2)],
        )
        .await
        .unwrap();
    assert_eq!(result.scalar::<String>().unwrap(), "user2");
}

#[tokio::test]
async fn test_null_and_optional_values() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);

    let none: Option<i64> = None;
    let result = db.execute_query("SELECT ? AS maybe", &[&none]).await.unwrap();
    let row = result.first().unwrap();
    assert_eq!(row.get::<Option<i64>>(0).unwrap(), None);
    assert_eq!(row.get::<i64>(0).unwrap_err().kind(), ErrorKind::Column);
}

#[tokio::test]
async fn test_rows_convert_to_json() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);
    seed_users(&db, 1).await;

    let result = db
        .execute_query("SELECT id, user_name FROM users", &[])
        .await
        .unwrap();
    let json = result.to_json(KeyCase::Camel);
    assert_eq!(json, serde_json::json!([{ "id": 1, "userName": "user1" }]));
}

#[tokio::test]
async fn test_query_error_is_classified() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);

    let err = db
        .execute_query("SELECT * FROM missing_table", &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);
    assert!(err.code().is_some());
    assert!(!err.is_transient());
    assert!(err.to_string().contains("missing_table"));
}

#[tokio::test]
async fn test_max_rows_truncates_result() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(SqliteDriver::new(), config(&dir).max_rows(3));
    seed_users(&db, 10).await;

    let result = db.execute_query("SELECT id FROM users", &[]).await.unwrap();
    assert_eq!(result.len(), 3);
    assert!(result.is_truncated());
}

#[tokio::test]
async fn test_paginated_query() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);
    seed_users(&db, 25).await;

    let sql = "SELECT id FROM users WHERE id > ? ORDER BY id";
    let page = db.execute_paginated(sql, &[&0], 2, 10).await.unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.pages, 3);
    assert_eq!(page.rows.len(), 10);
    assert_eq!(page.rows[0].get::<i64>(0).unwrap(), 11);

    let last = db.execute_paginated(sql, &[&0], 3, 10).await.unwrap();
    assert_eq!(last.rows.len(), 5);

    let beyond = db.execute_paginated(sql, &[&0], 4, 10).await.unwrap();
    assert!(beyond.rows.is_empty());
}

// =============================================================================
// Lease accounting
// =============================================================================

#[tokio::test]
async fn test_every_lease_returned_across_many_queries() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);

    for i in 0..1000_i64 {
        if i % 10 == 0 {
            let err = db
                .execute_query("SELECT * FROM missing_table", &[])
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Query);
        } else {
            let result = db.execute_query("SELECT ?", &[&i]).await.unwrap();
            assert_eq!(result.scalar::<i64>().unwrap(), i);
        }
        assert_eq!(in_use(&db), 0, "lease leaked at iteration {i}");
    }

    let metrics = db.pool_metrics().unwrap();
    assert!(metrics.connections_created <= 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_queries_share_bounded_pool() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);
    db.ensure_initialized().await.unwrap();

    let tasks: Vec<_> = (0..50_i64)
        .map(|i| {
            let db = db.clone();
            tokio::spawn(async move { db.execute_query("SELECT ? * 2", &[&i]).await })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        let result = task.await.unwrap().unwrap();
        assert_eq!(result.scalar::<i64>().unwrap(), i as i64 * 2);
    }

    let status = db.status().pool.unwrap();
    assert_eq!(status.in_use, 0);
    assert!(status.total <= 4);
}

#[tokio::test]
async fn test_exhausted_pool_times_out() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(
        SqliteDriver::new(),
        config(&dir)
            .pool_size(1, 1)
            .acquire_timeout(Duration::from_millis(200)),
    );

    let held = db.get_connection().await.unwrap();
    let started = Instant::now();
    let err = db.execute_query("SELECT 1", &[]).await.unwrap_err();

    assert!(matches!(
        err,
        Error::PoolExhausted {
            max_connections: 1,
            ..
        }
    ));
    assert!(err.is_transient());
    assert!(started.elapsed() >= Duration::from_millis(150));

    drop(held);
    db.execute_query("SELECT 1", &[]).await.unwrap();
}

#[tokio::test]
async fn test_explicit_release() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);
    let other = Database::new(SqliteDriver::new(), config(&dir));

    let conn = db.get_connection().await.unwrap();
    assert_eq!(in_use(&db), 1);
    db.release(conn).unwrap();
    assert_eq!(in_use(&db), 0);

    let foreign = other.get_connection().await.unwrap();
    let err = db.release(foreign).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Pool);
    assert_eq!(in_use(&other), 0);
}

#[tokio::test]
async fn test_statement_timeout_discards_connection() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(
        SqliteDriver::new(),
        config(&dir).statement_timeout(Some(Duration::from_millis(100))),
    );
    db.ensure_initialized().await.unwrap();

    let err = db
        .execute_query(
            "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 1000000000) \
             SELECT COUNT(*) FROM c",
            &[],
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(in_use(&db), 0);

    let result = db.execute_query("SELECT 7", &[]).await.unwrap();
    assert_eq!(result.scalar::<i64>().unwrap(), 7);
}

// =============================================================================
// Transactions
// =============================================================================

#[tokio::test]
async fn test_transaction_commits_all_statements() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);
    db.execute_query("CREATE TABLE ledger (amount INTEGER)", &[])
        .await
        .unwrap();

    let results = db
        .execute_transaction(vec![
            Query::new("INSERT INTO ledger VALUES (?)").bind(100),
            Query::new("INSERT INTO ledger VALUES (?)").bind(-40),
        ])
        .await
        .unwrap();
    assert_eq!(results.len(), 2);

    let total = db
        .execute_query("SELECT SUM(amount) FROM ledger", &[])
        .await
        .unwrap();
    assert_eq!(total.scalar::<i64>().unwrap(), 60);
}

#[tokio::test]
async fn test_transaction_rolls_back_on_failure() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);
    db.execute_query("CREATE TABLE ledger (amount INTEGER NOT NULL)", &[])
        .await
        .unwrap();

    let err = db
        .execute_transaction(vec![
            Query::new("INSERT INTO ledger VALUES (?)").bind(100),
            Query::new("INSERT INTO ledger VALUES (NULL)"),
        ])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);

    let count = db
        .execute_query("SELECT COUNT(*) FROM ledger", &[])
        .await
        .unwrap();
    assert_eq!(count.scalar::<i64>().unwrap(), 0);
    assert_eq!(in_use(&db), 0);
}

#[tokio::test]
async fn test_dropped_transaction_guard_rolls_back() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);
    db.execute_query("CREATE TABLE ledger (amount INTEGER)", &[])
        .await
        .unwrap();

    let mut conn = db.get_connection().await.unwrap();
    {
        let mut tx = conn.begin().await.unwrap();
        tx.execute("INSERT INTO ledger VALUES (?)", &[&1]).await.unwrap();
    }

    let count = conn.execute("SELECT COUNT(*) FROM ledger", &[]).await.unwrap();
    assert_eq!(count.scalar::<i64>().unwrap(), 0);
}

#[tokio::test]
async fn test_manual_commit_on_leased_connection() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);
    db.execute_query("CREATE TABLE ledger (amount INTEGER)", &[])
        .await
        .unwrap();

    let mut conn = db.get_connection().await.unwrap();
    conn.execute_query(&Query::new("INSERT INTO ledger VALUES (5)").auto_commit(false))
        .await
        .unwrap();
    conn.commit().await.unwrap();
    drop(conn);

    let count = db.execute_query("SELECT COUNT(*) FROM ledger", &[]).await.unwrap();
    assert_eq!(count.scalar::<i64>().unwrap(), 1);
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn test_close_then_query_is_lifecycle_error() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);
    db.execute_query("SELECT 1", &[]).await.unwrap();

    db.close().await;
    assert_eq!(db.state(), LifecycleState::Closed);
    assert!(!db.is_pool_active());

    let err = db.execute_query("SELECT 1", &[]).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Lifecycle {
            state: LifecycleState::Closed,
            ..
        }
    ));

    // Closing again is a no-op.
    db.close().await;

    db.initialize(config(&dir)).await.unwrap();
    db.execute_query("SELECT 1", &[]).await.unwrap();
    assert_eq!(db.pools_created(), 2);
}

#[tokio::test]
async fn test_close_terminates_held_connection_after_grace() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);

    let mut conn = db.get_connection().await.unwrap();
    let report = db.close().await;
    assert_eq!(report.force_closed, 1);

    assert!(conn.is_terminated());
    let err = conn.execute("SELECT 1", &[]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lifecycle);
}

#[tokio::test]
async fn test_reconnect_builds_fresh_pool() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);
    db.ensure_initialized().await.unwrap();

    db.reconnect().await.unwrap();
    assert_eq!(db.state(), LifecycleState::Ready);
    assert_eq!(db.pools_created(), 2);
    db.execute_query("SELECT 1", &[]).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_close_interrupts_statement_running_past_grace() {
    let dir = TempDir::new().unwrap();
    let db = database(&dir);
    db.ensure_initialized().await.unwrap();

    let running = {
        let db = db.clone();
        tokio::spawn(async move {
            db.execute_query(
                "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 1000000000) \
                 SELECT COUNT(*) FROM c",
                &[],
            )
            .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    let report = db.close().await;
    assert_eq!(report.force_closed, 1);
    assert_eq!(db.state(), LifecycleState::Closed);

    let err = running.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert!(started.elapsed() < Duration::from_secs(5));
}
