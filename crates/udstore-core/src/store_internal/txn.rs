//! Connection-scoped transaction wrapper.

use crate::errors::{StoreError, StoreResult};
use crate::metrics::StoreMetrics;
use rusqlite::Connection;

/// Runs `work` inside `BEGIN IMMEDIATE` .. `COMMIT`.
///
/// Any error from `work` or from `COMMIT` rolls the transaction back and is
/// returned unchanged, also when SQLite already ended the transaction
/// itself. If an issued ROLLBACK fails the result is
/// [`StoreError::RollbackFailed`].
pub(crate) fn in_transaction_impl<T>(
    conn: &Connection,
    metrics: &StoreMetrics,
    work: impl FnOnce(&Connection) -> StoreResult<T>,
) -> StoreResult<T> {
    // BEGIN IMMEDIATE takes the write lock up front
    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(|e| StoreError::database("begin transaction", e))?;

    match work(conn) {
        Ok(value) => match conn.execute_batch("COMMIT") {
            Ok(()) => {
                metrics.record_commit();
                Ok(value)
            }
            Err(e) => Err(rollback_impl(
                conn,
                metrics,
                StoreError::database("commit transaction", e),
            )),
        },
        Err(cause) => Err(rollback_impl(conn, metrics, cause)),
    }
}

fn rollback_impl(conn: &Connection, metrics: &StoreMetrics, cause: StoreError) -> StoreError {
    if conn.is_autocommit() {
        // SQLite already rolled back (RAISE(ROLLBACK), SQLITE_FULL, IOERR)
        tracing::warn!(error = %cause, "transaction rolled back by the database");
        metrics.record_rollback();
        return cause;
    }
    tracing::warn!(error = %cause, "transaction failed, rolling back");
    finish_rollback(conn, metrics, cause, "ROLLBACK")
}

/// Issues `statement` on an open transaction. Only a failure here leaves
/// the backing store in an unknown state.
fn finish_rollback(
    conn: &Connection,
    metrics: &StoreMetrics,
    cause: StoreError,
    statement: &str,
) -> StoreError {
    match conn.execute_batch(statement) {
        Ok(()) => {
            metrics.record_rollback();
            cause
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                cause = %cause,
                "rollback failed; backing store state is unknown"
            );
            StoreError::RollbackFailed {
                cause: Box::new(cause),
                message: e.to_string(),
            }
        }
    }
}
