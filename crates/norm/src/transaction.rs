use crate::connection::Connection;
use crate::database::Database;
use crate::error::{NormError, NormResult};
use crate::generator::Statement;
use crate::monitor::QueryResult;
use crate::query::Query;

/// A transaction on one dedicated connection.
///
/// The connection is begun on creation and closed when the transaction ends.
/// [`commit`](Self::commit) and [`rollback`](Self::rollback) consume the
/// transaction; dropping it unfinished rolls back.
///
/// ```rust,ignore
/// let mut tx = db.begin()?;
/// tx.query().insert(&mut alice)?;
/// tx.query().insert(&mut bob)?;
/// tx.commit()?;
/// ```
pub struct Transaction<'db> {
    db: &'db Database,
    conn: Option<Box<dyn Connection>>,
}

impl<'db> Transaction<'db> {
    pub(crate) fn begin(db: &'db Database) -> NormResult<Self> {
        let mut conn = db.connect()?;
        if let Err(e) = conn.begin() {
            if let Err(close_err) = conn.close() {
                tracing::warn!(error = %close_err, "failed to close connection after begin failed");
            }
            return Err(NormError::transaction_with("begin failed", e));
        }
        tracing::debug!(target: "norm.sql", "transaction started");
        Ok(Self {
            db,
            conn: Some(conn),
        })
    }

    /// A query bound to this transaction.
    pub fn query(&mut self) -> Query<'_> {
        let db = self.db;
        db.query().transaction(self)
    }

    pub(crate) fn connection_mut(&mut self) -> Option<&mut Box<dyn Connection>> {
        self.conn.as_mut()
    }

    pub fn commit(mut self) -> NormResult<()> {
        self.finish("commit", |conn| conn.commit())
    }

    pub fn rollback(mut self) -> NormResult<()> {
        self.finish("rollback", |conn| conn.rollback())
    }

    fn finish(
        &mut self,
        action: &'static str,
        end: impl FnOnce(&mut dyn Connection) -> NormResult<()>,
    ) -> NormResult<()> {
        let Some(mut conn) = self.conn.take() else {
            return Err(NormError::transaction(format!(
                "cannot {action}: transaction already finished"
            )));
        };
        let stmt = Statement::new(action, Vec::new());
        let result = self
            .db
            .observe(&stmt, None, None, || end(conn.as_mut()), |_| QueryResult::Affected(0));
        if let Err(e) = conn.close() {
            tracing::warn!(error = %e, "failed to close connection after {action}");
        }
        result.map_err(|e| NormError::transaction_with(format!("{action} failed"), e))
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        tracing::warn!("transaction dropped without commit or rollback; rolling back");
        if let Err(e) = conn.rollback() {
            tracing::warn!(error = %e, "rollback of dropped transaction failed");
        }
        if let Err(e) = conn.close() {
            tracing::warn!(error = %e, "failed to close connection of dropped transaction");
        }
    }
}
