//! Transaction support.

use dbservice_types::ToSql;

use crate::connection::Connection;
use crate::error::Result;
use crate::query::{Params, Query};
use crate::row::QueryResult;

/// An open transaction on a leased [`Connection`].
///
/// Statements run without auto-commit. The guard borrows the connection
/// mutably, so nothing else can run on it until the transaction ends.
/// Dropping the guard without [`commit`](Self::commit) rolls the work back.
///
/// # Example
///
/// ```rust,ignore
/// let mut conn = db.get_connection().await?;
/// let mut tx = conn.begin().await?;
/// tx.execute("UPDATE accounts SET balance = balance - ? WHERE id = ?", &[&10, &1]).await?;
/// tx.execute("UPDATE accounts SET balance = balance + ? WHERE id = ?", &[&10, &2]).await?;
/// tx.commit().await?;
/// ```
pub struct Transaction<'a> {
    conn: &'a mut Connection,
    finished: bool,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(conn: &'a mut Connection) -> Self {
        Self {
            conn,
            finished: false,
        }
    }

    /// Run a statement with positional parameters inside the transaction.
    pub async fn execute(
        &mut self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<QueryResult> {
        let params = Params::positional(params)?;
        self.conn.run(sql, &params, false).await
    }

    /// Run a prepared [`Query`] inside the transaction.
    ///
    /// The query's auto-commit flag is ignored.
    pub async fn execute_query(&mut self, query: &Query) -> Result<QueryResult> {
        query.check()?;
        self.conn.run(query.sql(), query.params(), false).await
    }

    /// Commit the transaction.
    pub async fn commit(mut self) -> Result<()> {
        let id = self.conn.id();
        self.conn.commit().await?;
        self.finished = true;
        tracing::debug!(connection_id = id, "transaction committed");
        Ok(())
    }

    /// Roll back the transaction.
    pub async fn rollback(mut self) -> Result<()> {
        let id = self.conn.id();
        self.conn.rollback().await?;
        self.finished = true;
        tracing::debug!(connection_id = id, "transaction rolled back");
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(
                connection_id = self.conn.id(),
                "transaction dropped without commit; rolling back"
            );
            self.conn.mark_pending_rollback();
        }
    }
}
