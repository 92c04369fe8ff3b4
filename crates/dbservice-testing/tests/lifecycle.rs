//! Lifecycle and concurrency tests of the database service.
//!
//! These run against [`MockDriver`], so connection latency, failures and
//! slow statements can be scripted precisely.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use dbservice::{Config, Database, Error, ErrorKind, LifecycleState, Query};
use dbservice_testing::MockDriver;

fn config() -> Config {
    Config::new()
        .database("mock")
        .pool_size(1, 4)
        .acquire_timeout(Duration::from_secs(2))
        .close_grace(Duration::from_millis(100))
}

fn in_use(db: &Database) -> u32 {
    db.status().pool.map_or(0, |p| p.in_use)
}

// =============================================================================
// Single-flight initialization
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_initialization_builds_one_pool() {
    let driver = MockDriver::new().connect_delay(Duration::from_millis(50));
    let db = Database::new(driver.clone(), config());

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move { db.ensure_initialized().await })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(db.state(), LifecycleState::Ready);
    assert_eq!(db.init_attempts(), 1);
    assert_eq!(db.pools_created(), 1);
    assert_eq!(driver.connects(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_initialization_shares_failure() {
    let driver = MockDriver::new()
        .connect_delay(Duration::from_millis(50))
        .fail_connect(Error::connectivity("listener refused the connection"));
    let db = Database::new(driver.clone(), config());

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move { db.ensure_initialized().await })
        })
        .collect();

    for task in tasks {
        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connectivity);
    }

    assert_eq!(db.state(), LifecycleState::Failed);
    assert_eq!(db.init_attempts(), 1);
    assert_eq!(db.pools_created(), 0);
    assert_eq!(driver.failed_connects(), 1);
    assert!(db.status().last_error.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_queries_initialize_once() {
    let driver = MockDriver::new().connect_delay(Duration::from_millis(20));
    let db = Database::new(driver.clone(), config());

    let tasks: Vec<_> = (0..20_i64)
        .map(|i| {
            let db = db.clone();
            tokio::spawn(async move { db.execute_query("SELECT ?", &[&i]).await })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(db.pools_created(), 1);
    assert!(driver.connects() <= 4);
    assert_eq!(in_use(&db), 0);
}

#[tokio::test]
async fn test_failed_service_can_initialize_again() {
    let driver = MockDriver::new().fail_connect(Error::connectivity("down"));
    let db = Database::new(driver.clone(), config());

    assert!(db.ensure_initialized().await.is_err());
    assert_eq!(db.state(), LifecycleState::Failed);

    // No lazy retry out of Failed.
    let err = db.execute_query("SELECT 1", &[]).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Lifecycle {
            state: LifecycleState::Failed,
            ..
        }
    ));

    driver.set_connect_error(None);
    db.ensure_initialized().await.unwrap();
    assert_eq!(db.state(), LifecycleState::Ready);
    assert_eq!(db.init_attempts(), 2);
}

#[tokio::test]
async fn test_cancelled_initialization_resets_state() {
    let driver = MockDriver::new().connect_delay(Duration::from_millis(300));
    let db = Database::new(driver.clone(), config());

    let attempt = tokio::time::timeout(Duration::from_millis(30), db.ensure_initialized()).await;
    assert!(attempt.is_err());
    assert_eq!(db.state(), LifecycleState::Uninitialized);

    db.ensure_initialized().await.unwrap();
    assert_eq!(db.state(), LifecycleState::Ready);
    assert_eq!(db.init_attempts(), 2);
}

#[tokio::test]
async fn test_waiter_takes_over_cancelled_initialization() {
    let driver = MockDriver::new().connect_delay(Duration::from_millis(200));
    let db = Database::new(driver.clone(), config());

    let (cancelled, joined) = tokio::join!(
        tokio::time::timeout(Duration::from_millis(30), db.ensure_initialized()),
        async {
            // Join after the first caller has started building.
            tokio::time::sleep(Duration::from_millis(5)).await;
            db.ensure_initialized().await
        }
    );

    assert!(cancelled.is_err());
    joined.unwrap();
    assert_eq!(db.state(), LifecycleState::Ready);
    assert_eq!(db.init_attempts(), 2);
    assert_eq!(db.pools_created(), 1);
}

#[tokio::test]
async fn test_invalid_config_never_connects() {
    let driver = MockDriver::new();
    let db = Database::new(driver.clone(), config().pool_size(5, 2));

    let err = db.ensure_initialized().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(driver.connects(), 0);
}

#[tokio::test]
async fn test_failed_probe_closes_new_pool() {
    let driver = MockDriver::new();
    driver.set_fail_ping(true);
    let db = Database::new(driver.clone(), config());

    let err = db.ensure_initialized().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert_eq!(db.state(), LifecycleState::Failed);
    assert_eq!(driver.open_sessions(), 0);
}

// =============================================================================
// Probing
// =============================================================================

#[tokio::test]
async fn test_probe_failure_leaves_service_ready() {
    let driver = MockDriver::new();
    let db = Database::new(driver.clone(), config());
    db.ensure_initialized().await.unwrap();

    driver.set_fail_ping(true);
    let report = db.probe().await;
    assert!(!report.reachable);
    assert_eq!(report.error.unwrap().kind(), ErrorKind::Connectivity);
    assert_eq!(db.state(), LifecycleState::Ready);
    assert_eq!(in_use(&db), 0);

    driver.set_fail_ping(false);
    assert!(db.test_connection().await);
}

// =============================================================================
// Lease accounting
// =============================================================================

#[tokio::test]
async fn test_failed_statements_return_leases() {
    let driver = MockDriver::new();
    let db = Database::new(driver.clone(), config());

    for i in 0..200 {
        let sql = if i % 3 == 0 { "FAIL" } else { "SELECT 1" };
        let _ = db.execute_query(sql, &[]).await;
        assert_eq!(in_use(&db), 0);
    }
    assert!(driver.connects() <= 4);
}

#[tokio::test]
async fn test_cancelled_statement_discards_connection() {
    let driver = MockDriver::new().statement_delay(Duration::from_millis(300));
    let db = Database::new(driver.clone(), config());
    db.ensure_initialized().await.unwrap();
    let before = driver.connects();

    let attempt =
        tokio::time::timeout(Duration::from_millis(30), db.execute_query("SELECT 1", &[])).await;
    assert!(attempt.is_err());
    assert_eq!(in_use(&db), 0);

    driver.set_statement_delay(Duration::ZERO);
    db.execute_query("SELECT 1", &[]).await.unwrap();
    assert_eq!(driver.connects(), before + 1);
}

#[tokio::test]
async fn test_statement_timeout_is_classified() {
    let driver = MockDriver::new().statement_delay(Duration::from_millis(300));
    let db = Database::new(
        driver.clone(),
        config().statement_timeout(Some(Duration::from_millis(30))),
    );

    let err = db.execute_query("SELECT 1", &[]).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));
    assert!(err.is_transient());
    assert_eq!(in_use(&db), 0);
    assert_eq!(db.pool_metrics().unwrap().connections_closed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_waiters_are_served_as_leases_return() {
    let driver = MockDriver::new().statement_delay(Duration::from_millis(20));
    let db = Database::new(driver.clone(), config().pool_size(1, 2));
    db.ensure_initialized().await.unwrap();

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move { db.execute_query("SELECT 1", &[]).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert!(driver.connects() <= 2);
    assert_eq!(in_use(&db), 0);
}

#[tokio::test]
async fn test_release_rules() {
    let db = Database::new(MockDriver::new(), config());
    let other = Database::new(MockDriver::new(), config());

    let conn = db.get_connection().await.unwrap();
    db.release(conn).unwrap();

    let foreign = other.get_connection().await.unwrap();
    assert_eq!(db.release(foreign).unwrap_err().kind(), ErrorKind::Pool);

    let held = db.get_connection().await.unwrap();
    db.close().await;
    assert_eq!(db.release(held).unwrap_err().kind(), ErrorKind::Pool);
}

// =============================================================================
// Transactions
// =============================================================================

#[tokio::test]
async fn test_transaction_failure_rolls_back() {
    let driver = MockDriver::new();
    let db = Database::new(driver.clone(), config());

    let err = db
        .execute_transaction(vec![
            Query::new("INSERT INTO t VALUES (?)").bind(1),
            Query::new("FAIL INSERT"),
            Query::new("INSERT INTO t VALUES (?)").bind(3),
        ])
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some("MOCK-0001"));
    assert_eq!(driver.rollbacks(), 1);
    assert_eq!(driver.commits(), 0);
    assert_eq!(driver.executed().len(), 1);
}

#[tokio::test]
async fn test_invalid_query_in_batch_runs_nothing() {
    let driver = MockDriver::new();
    let db = Database::new(driver.clone(), config());

    let err = db
        .execute_transaction(vec![
            Query::new("INSERT INTO t VALUES (?)").bind(1),
            Query::new("INSERT INTO t VALUES (?)").bind(u64::MAX),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Parameter(_)));
    assert!(driver.executed().is_empty());
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn test_close_drains_returning_lease() {
    let driver = MockDriver::new();
    let db = Database::new(driver.clone(), config().close_grace(Duration::from_secs(2)));

    let conn = db.get_connection().await.unwrap();
    let closer = {
        let db = db.clone();
        tokio::spawn(async move { db.close().await })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(db.state(), LifecycleState::Closing);
    drop(conn);

    let report = closer.await.unwrap();
    assert_eq!(report.drained, 1);
    assert_eq!(report.force_closed, 0);
    assert_eq!(db.state(), LifecycleState::Closed);
    assert_eq!(driver.open_sessions(), 0);
}

#[tokio::test]
async fn test_closing_rejects_new_work() {
    let db = Database::new(MockDriver::new(), config().close_grace(Duration::from_secs(2)));

    let conn = db.get_connection().await.unwrap();
    let closer = {
        let db = db.clone();
        tokio::spawn(async move { db.close().await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;

    let err = db.execute_query("SELECT 1", &[]).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Lifecycle {
            state: LifecycleState::Closing,
            ..
        }
    ));
    assert!(!db.test_connection().await);

    drop(conn);
    closer.await.unwrap();
}

#[tokio::test]
async fn test_close_terminates_after_grace() {
    let driver = MockDriver::new();
    let db = Database::new(driver.clone(), config());

    let mut conn = db.get_connection().await.unwrap();
    let report = db.close().await;
    assert_eq!(report.force_closed, 1);
    assert!(conn.is_terminated());
    // The held session is closed without waiting for its holder.
    assert_eq!(driver.open_sessions(), 0);

    let err = conn.execute("SELECT 1", &[]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lifecycle);

    drop(conn);
    assert_eq!(driver.open_sessions(), 0);
}

#[tokio::test]
async fn test_close_aborts_statement_running_past_grace() {
    let driver = MockDriver::new();
    let db = Database::new(driver.clone(), config());
    db.ensure_initialized().await.unwrap();
    driver.set_statement_delay(Duration::from_millis(500));

    let running = {
        let db = db.clone();
        tokio::spawn(async move { db.execute_query("UPDATE t SET x = 1", &[]).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let report = db.close().await;
    assert_eq!(report.force_closed, 1);
    assert_eq!(db.state(), LifecycleState::Closed);
    assert_eq!(driver.open_sessions(), 0);

    let err = running.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert!(driver.executed().is_empty());
    assert_eq!(driver.open_sessions(), 0);
}

#[tokio::test]
async fn test_concurrent_close_calls_agree() {
    let db = Database::new(MockDriver::new(), config());
    db.ensure_initialized().await.unwrap();

    let (a, b) = tokio::join!(db.close(), db.close());
    assert_eq!(a.force_closed + b.force_closed, 0);
    assert_eq!(db.state(), LifecycleState::Closed);
}

#[tokio::test]
async fn test_initialize_waits_for_close() {
    let driver = MockDriver::new();
    let db = Database::new(driver.clone(), config().close_grace(Duration::from_secs(2)));

    let conn = db.get_connection().await.unwrap();
    let closer = {
        let db = db.clone();
        tokio::spawn(async move { db.close().await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;

    let init = {
        let db = db.clone();
        tokio::spawn(async move { db.initialize(config()).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(db.state(), LifecycleState::Closing);

    drop(conn);
    closer.await.unwrap();
    init.await.unwrap().unwrap();

    assert_eq!(db.state(), LifecycleState::Ready);
    assert_eq!(db.pools_created(), 2);
}

#[tokio::test]
async fn test_reconnect_replaces_pool() {
    let driver = MockDriver::new();
    let db = Database::new(driver.clone(), config());
    db.ensure_initialized().await.unwrap();

    db.reconnect().await.unwrap();
    assert_eq!(db.pools_created(), 2);
    assert_eq!(driver.open_sessions(), 1);
    db.execute_query("SELECT 1", &[]).await.unwrap();
}

#[tokio::test]
async fn test_closed_service_needs_explicit_initialize() {
    let db = Database::new(MockDriver::new(), config());
    db.ensure_initialized().await.unwrap();
    db.close().await;

    let err = db.get_connection().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lifecycle);
    assert!(db.pool_metrics().is_none());

    db.initialize(config()).await.unwrap();
    assert!(db.get_connection().await.is_ok());
}
