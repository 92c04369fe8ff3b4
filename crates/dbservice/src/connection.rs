//! Leased connections.

use std::sync::Arc;

use dbservice_pool::PooledConnection;
use dbservice_types::ToSql;

use crate::config::Config;
use crate::driver::{DriverLifecycle, ExecOptions};
use crate::error::{Error, Result};
use crate::instrumentation::{OperationTimer, extract_operation};
use crate::query::{Params, Query};
use crate::row::QueryResult;
use crate::state::LifecycleState;
use crate::transaction::Transaction;

/// A connection leased from a [`Database`](crate::Database).
///
/// The lease ends when the value is dropped, on every exit path including
/// errors, panics and cancelled futures. Statements issued through one
/// `Connection` run in order.
///
/// # Example
///
/// ```rust,ignore
/// let mut conn = db.get_connection().await?;
/// conn.execute("INSERT INTO audit (msg) VALUES (?)", &[&"started"]).await?;
/// let rows = conn.execute("SELECT COUNT(*) FROM audit", &[]).await?;
/// drop(conn); // returned to the pool
/// ```
pub struct Connection {
    inner: PooledConnection<DriverLifecycle>,
    config: Arc<Config>,
    /// A transaction guard was dropped without commit or rollback.
    pending_rollback: bool,
}

impl Connection {
    pub(crate) fn new(inner: PooledConnection<DriverLifecycle>, config: Arc<Config>) -> Self {
        Self {
            inner,
            config,
            pending_rollback: false,
        }
    }

    /// Pool-assigned connection identifier.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id()
    }

    /// How many times this physical connection has been leased.
    #[must_use]
    pub fn checkout_count(&self) -> u64 {
        self.inner.metadata().checkout_count
    }

    /// Whether the service terminated this lease while closing.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }

    /// Close the physical connection instead of returning it to the pool.
    pub fn discard(&mut self) {
        self.inner.discard();
    }

    /// Run a statement with positional parameters.
    pub async fn execute(
        &mut self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<QueryResult> {
        let params = Params::positional(params)?;
        self.run(sql, &params, true).await
    }

    /// Run a statement with named parameters.
    pub async fn execute_named(
        &mut self,
        sql: &str,
        params: &[(&str, &(dyn ToSql + Sync))],
    ) -> Result<QueryResult> {
        let params = Params::named(params)?;
        self.run(sql, &params, true).await
    }

    /// Run a prepared [`Query`].
    pub async fn execute_query(&mut self, query: &Query) -> Result<QueryResult> {
        query.check()?;
        self.run(query.sql(), query.params(), query.is_auto_commit())
            .await
    }

    /// Trivial round trip.
    pub async fn ping(&mut self) -> Result<()> {
        self.ensure_live("ping")?;
        self.inner.ping().await
    }

    /// Open a transaction on this connection.
    ///
    /// Dropping the returned guard without [`commit`](Transaction::commit)
    /// rolls the work back before the next statement on this connection (or
    /// before the connection is reused).
    pub async fn begin(&mut self) -> Result<Transaction<'_>> {
        self.ensure_live("begin")?;
        self.settle().await?;
        self.inner.begin().await?;
        tracing::debug!(connection_id = self.id(), "transaction started");
        Ok(Transaction::new(self))
    }

    /// Commit work left pending by statements run without auto-commit.
    pub async fn commit(&mut self) -> Result<()> {
        self.ensure_live("commit")?;
        self.inner.commit().await
    }

    /// Discard work left pending by statements run without auto-commit.
    pub async fn rollback(&mut self) -> Result<()> {
        self.ensure_live("rollback")?;
        self.pending_rollback = false;
        self.inner.rollback().await
    }

    pub(crate) fn mark_pending_rollback(&mut self) {
        self.pending_rollback = true;
    }

    pub(crate) fn into_pooled(self) -> PooledConnection<DriverLifecycle> {
        self.inner
    }

    pub(crate) async fn run(
        &mut self,
        sql: &str,
        params: &Params,
        auto_commit: bool,
    ) -> Result<QueryResult> {
        self.ensure_live("execute")?;
        self.settle().await?;

        let options = ExecOptions {
            auto_commit,
            max_rows: self.config.max_rows,
        };
        let timer = OperationTimer::start(extract_operation(sql));

        let outcome = match self.config.statement_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.inner.execute(sql, params, &options)).await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        // Session state is unknown after an abandoned statement.
                        self.inner.discard();
                        tracing::warn!(
                            connection_id = self.inner.id(),
                            db.operation = timer.operation(),
                            db.statement = %self.config.sanitization.sanitize(sql),
                            timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                            "statement timed out; discarding connection"
                        );
                        return Err(Error::Timeout {
                            operation: "statement",
                            elapsed: limit,
                        });
                    }
                }
            }
            None => self.inner.execute(sql, params, &options).await,
        };

        match outcome {
            Ok(result) => {
                tracing::debug!(
                    connection_id = self.inner.id(),
                    db.operation = timer.operation(),
                    db.statement = %self.config.sanitization.sanitize(sql),
                    params = params.len(),
                    rows = result.len(),
                    rows_affected = result.rows_affected(),
                    elapsed_ms = timer.elapsed_ms(),
                    "statement executed"
                );
                Ok(result)
            }
            Err(e) => {
                let e = e.with_sql(|| self.config.sanitization.sanitize(sql));
                tracing::debug!(
                    connection_id = self.inner.id(),
                    db.operation = timer.operation(),
                    elapsed_ms = timer.elapsed_ms(),
                    error = %e,
                    "statement failed"
                );
                Err(e)
            }
        }
    }

    fn ensure_live(&self, operation: &'static str) -> Result<()> {
        if self.inner.is_terminated() {
            return Err(Error::Lifecycle {
                state: LifecycleState::Closed,
                operation,
            });
        }
        Ok(())
    }

    /// Roll back work abandoned by a dropped transaction guard.
    async fn settle(&mut self) -> Result<()> {
        if self.pending_rollback {
            self.pending_rollback = false;
            if let Err(e) = self.inner.rollback().await {
                self.inner.discard();
                return Err(e);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id())
            .field("endpoint", &self.config.endpoint())
            .field("pending_rollback", &self.pending_rollback)
            .finish()
    }
}
