//! SQLite driver and session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dbservice::{
    Column, Config, Driver, DriverConnection, Error, ErrorKind, ExecOptions, KillHandle, Params,
    QueryResult, Result,
};
use dbservice_types::SqlValue;
use parking_lot::Mutex;
use rusqlite::{InterruptHandle, OpenFlags};

use crate::convert::{from_sqlite, map_error, to_sqlite};

/// Opens SQLite databases.
///
/// [`Config::database`] is the database file path (or `:memory:`); host,
/// port and credentials are ignored.
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    create_if_missing: bool,
    busy_timeout: Duration,
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl SqliteDriver {
    /// Create a driver with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the database file when it does not exist (default: true).
    ///
    /// With this off, a missing file is a connectivity error.
    #[must_use]
    pub fn create_if_missing(mut self, enabled: bool) -> Self {
        self.create_if_missing = enabled;
        self
    }

    /// How long a statement waits on a locked database (default: 5s).
    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    fn open_flags(&self) -> OpenFlags {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        flags
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn connect(&self, config: &Config) -> Result<Box<dyn DriverConnection>> {
        let path = config.database.clone();
        let flags = self.open_flags();
        let busy_timeout = self.busy_timeout;

        let conn = tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open_with_flags(&path, flags).map_err(|e| {
                Error::connectivity(format!("cannot open database {path}: {e}"))
            })?;
            conn.busy_timeout(busy_timeout).map_err(map_error)?;
            Ok::<_, Error>(conn)
        })
        .await
        .map_err(|e| Error::connectivity(format!("sqlite open task failed: {e}")))??;

        tracing::debug!(database = %config.database, "sqlite session opened");
        Ok(Box::new(SqliteConnection::new(conn)))
    }
}

/// One SQLite session.
///
/// Statements run on the blocking thread pool. When the awaiting future is
/// dropped mid-statement the statement is interrupted and the session
/// reports itself broken, so the pool closes it instead of reusing it.
pub struct SqliteConnection {
    session: Arc<Session>,
    in_flight: Arc<AtomicBool>,
    broken: bool,
}

/// The database handle, shared with the blocking workers and the kill handle.
struct Session {
    /// `None` once the handle has been closed.
    conn: Mutex<Option<rusqlite::Connection>>,
    interrupt: Arc<InterruptHandle>,
    killed: AtomicBool,
}

impl Session {
    /// Abort the running statement and close the handle.
    fn kill(&self) {
        if self.killed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.interrupt.interrupt();
        // A running statement holds the lock; its worker closes the handle.
        if let Some(mut conn) = self.conn.try_lock() {
            conn.take();
        }
        tracing::debug!("sqlite session killed");
    }

    fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }
}

fn terminated() -> Error {
    Error::connectivity("sqlite session was terminated")
}

/// Interrupts the running statement unless disarmed.
struct InterruptOnDrop {
    handle: Arc<InterruptHandle>,
    armed: bool,
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.handle.interrupt();
            tracing::debug!("interrupted abandoned sqlite statement");
        }
    }
}

impl SqliteConnection {
    fn new(conn: rusqlite::Connection) -> Self {
        let interrupt = Arc::new(conn.get_interrupt_handle());
        Self {
            session: Arc::new(Session {
                conn: Mutex::new(Some(conn)),
                interrupt,
                killed: AtomicBool::new(false),
            }),
            in_flight: Arc::new(AtomicBool::new(false)),
            broken: false,
        }
    }

    /// Run `work` against the session on the blocking pool.
    async fn blocking<T, F>(&mut self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    {
        if self.session.is_killed() {
            self.broken = true;
            return Err(terminated());
        }

        let session = Arc::clone(&self.session);
        self.in_flight.store(true, Ordering::SeqCst);
        let mut guard = InterruptOnDrop {
            handle: Arc::clone(&self.session.interrupt),
            armed: true,
        };

        let joined = tokio::task::spawn_blocking(move || {
            let mut slot = session.conn.lock();
            let result = match slot.as_ref() {
                Some(conn) if !session.is_killed() => work(conn),
                _ => Err(terminated()),
            };
            if session.is_killed() {
                // Killed while running: the statement was interrupted.
                slot.take();
                return Err(terminated());
            }
            result
        })
        .await;

        guard.armed = false;
        self.in_flight.store(false, Ordering::SeqCst);

        match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                if e.kind() == ErrorKind::Connectivity {
                    self.broken = true;
                }
                Err(e)
            }
            Err(e) => {
                self.broken = true;
                Err(Error::connectivity(format!("sqlite worker failed: {e}")))
            }
        }
    }
}

#[async_trait]
impl DriverConnection for SqliteConnection {
    async fn execute(
        &mut self,
        sql: &str,
        params: &Params,
        options: &ExecOptions,
    ) -> Result<QueryResult> {
        let bound = bind_values(params)?;
        let sql = sql.to_owned();
        let options = *options;

        self.blocking(move |conn| run_statement(conn, &sql, &bound, options))
            .await
    }

    async fn ping(&mut self) -> Result<()> {
        self.blocking(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
                .map_err(map_error)
        })
        .await
    }

    async fn begin(&mut self) -> Result<()> {
        self.blocking(|conn| conn.execute_batch("BEGIN").map_err(map_error))
            .await
    }

    async fn commit(&mut self) -> Result<()> {
        self.blocking(|conn| {
            if conn.is_autocommit() {
                Ok(())
            } else {
                conn.execute_batch("COMMIT").map_err(map_error)
            }
        })
        .await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.blocking(|conn| {
            if conn.is_autocommit() {
                Ok(())
            } else {
                conn.execute_batch("ROLLBACK").map_err(map_error)
            }
        })
        .await
    }

    fn is_broken(&self) -> bool {
        self.broken || self.in_flight.load(Ordering::SeqCst) || self.session.is_killed()
    }

    fn kill_handle(&self) -> Option<KillHandle> {
        let session = Arc::clone(&self.session);
        Some(KillHandle::new(move || session.kill()))
    }

    async fn close(self: Box<Self>) {
        // A statement interrupted mid-flight still holds the handle; its
        // worker drops it when the last reference goes away.
        if let Some(mut conn) = self.session.conn.try_lock() {
            conn.take();
        }
        tracing::trace!("sqlite session closed");
    }
}

/// Bind values in statement order, plus names for named binds.
enum Bound {
    None,
    Positional(Vec<rusqlite::types::Value>),
    Named(Vec<(String, rusqlite::types::Value)>),
}

fn bind_values(params: &Params) -> Result<Bound> {
    let convert = |values: &[SqlValue]| -> Result<Vec<_>> { values.iter().map(to_sqlite).collect() };

    Ok(match params {
        Params::None => Bound::None,
        Params::Positional(values) => Bound::Positional(convert(values)?),
        Params::Named(pairs) => Bound::Named(
            pairs
                .iter()
                .map(|(name, value)| Ok((format!(":{name}"), to_sqlite(value)?)))
                .collect::<Result<_>>()?,
        ),
    })
}

fn run_statement(
    conn: &rusqlite::Connection,
    sql: &str,
    bound: &Bound,
    options: ExecOptions,
) -> Result<QueryResult> {
    let mut stmt = conn.prepare(sql).map_err(map_error)?;

    let expected = stmt.parameter_count();
    let given = match bound {
        Bound::None => 0,
        Bound::Positional(values) => values.len(),
        Bound::Named(pairs) => pairs.len(),
    };
    if given != expected {
        return Err(Error::Parameter(format!(
            "statement expects {expected} parameters, {given} given"
        )));
    }

    match bound {
        Bound::None => {}
        Bound::Positional(values) => {
            for (i, value) in values.iter().enumerate() {
                stmt.raw_bind_parameter(i + 1, value).map_err(map_error)?;
            }
        }
        Bound::Named(pairs) => {
            for (name, value) in pairs {
                let index = stmt
                    .parameter_index(name)
                    .map_err(map_error)?
                    .ok_or_else(|| {
                        Error::Parameter(format!("statement has no parameter named {name}"))
                    })?;
                stmt.raw_bind_parameter(index, value).map_err(map_error)?;
            }
        }
    }

    if !options.auto_commit && conn.is_autocommit() {
        conn.execute_batch("BEGIN").map_err(map_error)?;
    }

    if stmt.column_count() == 0 {
        let affected = stmt.raw_execute().map_err(map_error)?;
        Ok(QueryResult::affected(u64::try_from(affected).unwrap_or(u64::MAX)))
    } else {
        fetch_rows(conn, &mut stmt, options.max_rows).map_err(map_error)
    }
}

fn fetch_rows(
    conn: &rusqlite::Connection,
    stmt: &mut rusqlite::Statement<'_>,
    max_rows: usize,
) -> std::result::Result<QueryResult, rusqlite::Error> {
    let readonly = stmt.readonly();
    let width = stmt.column_count();
    let columns = (0..width)
        .map(|i| {
            stmt.column_name(i)
                .map(|name| Column::new(name, i, None))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut rows = Vec::new();
    let mut truncated = false;
    let mut cursor = stmt.raw_query();
    while let Some(row) = cursor.next()? {
        if max_rows > 0 && rows.len() == max_rows {
            truncated = true;
            break;
        }
        let values = (0..width)
            .map(|i| row.get_ref(i).map(from_sqlite))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.push(values);
    }
    drop(cursor);

    // RETURNING clauses both yield rows and change data.
    let affected = if readonly { 0 } else { conn.changes() };

    Ok(QueryResult::new(columns, rows, u64::try_from(affected).unwrap_or(u64::MAX)).truncated(truncated))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn open() -> SqliteConnection {
        SqliteConnection::new(rusqlite::Connection::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_select_rows_and_columns() {
        let mut conn = open();
        let result = conn
            .execute(
                "SELECT 1 AS id, 'alice' AS name",
                &Params::None,
                &ExecOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        let names: Vec<_> = result.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "name"]);
        assert_eq!(result.rows_affected(), 0);
    }

    #[tokio::test]
    async fn test_max_rows_truncates() {
        let mut conn = open();
        let options = ExecOptions {
            auto_commit: true,
            max_rows: 2,
        };
        let result = conn
            .execute(
                "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 5) SELECT x FROM n",
                &Params::None,
                &options,
            )
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.is_truncated());
    }

    #[tokio::test]
    async fn test_parameter_count_mismatch() {
        let mut conn = open();
        let err = conn
            .execute(
                "SELECT ? + ?",
                &Params::Positional(vec![SqlValue::Int(1)]),
                &ExecOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parameter(_)));
        assert!(!conn.is_broken());
    }

    #[tokio::test]
    async fn test_syntax_error_keeps_session_usable() {
        let mut conn = open();
        let err = conn
            .execute("SELEC 1", &Params::None, &ExecOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), dbservice::ErrorKind::Query);
        assert!(!conn.is_broken());
        conn.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_manual_commit_leaves_work_pending() {
        let mut conn = open();
        let options = ExecOptions::default();
        conn.execute("CREATE TABLE t (x INTEGER)", &Params::None, &options)
            .await
            .unwrap();

        let manual = ExecOptions {
            auto_commit: false,
            max_rows: 0,
        };
        conn.execute("INSERT INTO t VALUES (1)", &Params::None, &manual)
            .await
            .unwrap();
        conn.rollback().await.unwrap();

        let result = conn
            .execute("SELECT COUNT(*) FROM t", &Params::None, &options)
            .await
            .unwrap();
        assert_eq!(result.scalar::<i64>().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_kill_aborts_running_statement() {
        let mut conn = open();
        let kill = conn.kill_handle().unwrap();

        let killer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            kill.kill();
        });
        let err = conn
            .execute(
                "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 1000000000) \
                 SELECT COUNT(*) FROM c",
                &Params::None,
                &ExecOptions::default(),
            )
            .await
            .unwrap_err();
        killer.await.unwrap();

        assert_eq!(err.kind(), ErrorKind::Connectivity);
        assert!(conn.is_broken());
        assert!(conn.session.conn.lock().is_none());
    }

    #[tokio::test]
    async fn test_killed_idle_session_rejects_statements() {
        let mut conn = open();
        conn.kill_handle().unwrap().kill();

        assert!(conn.session.conn.lock().is_none());
        let err = conn.ping().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connectivity);
        assert!(conn.is_broken());
    }

    #[tokio::test]
    async fn test_named_binds() {
        let mut conn = open();
        let params = Params::Named(vec![
            ("b".into(), SqlValue::Int(2)),
            ("a".into(), SqlValue::Int(40)),
        ]);
        let result = conn
            .execute("SELECT :a + :b", &params, &ExecOptions::default())
            .await
            .unwrap();
        assert_eq!(result.scalar::<i64>().unwrap(), 42);
    }
}
