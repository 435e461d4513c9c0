//! Batched statement execution with per-row affected counts.

use crate::catalog::NamedParams;
use crate::errors::{StoreError, StoreResult};
use crate::record::MembershipRecord;
use rusqlite::types::ToSql;
use rusqlite::Connection;

pub(crate) fn bind(params: &NamedParams) -> Vec<(&str, &dyn ToSql)> {
    params
        .iter()
        .map(|(name, value)| (*name, value as &dyn ToSql))
        .collect()
}

/// Runs `sql` once per parameter row on one prepared statement.
///
/// Returns the affected-row count of every row, aligned by position with
/// `rows`. Not transactional by itself: rows before a failing one stay
/// applied unless the caller wraps the batch in a transaction.
pub(crate) fn execute_batch_impl(
    conn: &Connection,
    sql: &str,
    rows: &[NamedParams],
    label: &str,
) -> StoreResult<Vec<usize>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| StoreError::database(format!("prepare {label}"), e))?;

    let mut status = Vec::with_capacity(rows.len());
    for (i, params) in rows.iter().enumerate() {
        let named = bind(params);
        let affected = stmt
            .execute(named.as_slice())
            .map_err(|e| StoreError::database(format!("{label} row {i}"), e))?;
        status.push(affected);
    }
    Ok(status)
}

/// Records individually confirmed by `status`.
///
/// Nothing is confirmed when the status does not line up with the records:
/// caching an unconfirmed insert would make every later retry skip it.
pub(crate) fn confirmed_rows(
    status: &[usize],
    records: Vec<MembershipRecord>,
) -> Vec<MembershipRecord> {
    if status.len() != records.len() {
        tracing::warn!(
            status = status.len(),
            records = records.len(),
            "batch status does not match record count; nothing cached"
        );
        return Vec::new();
    }
    records
        .into_iter()
        .zip(status)
        .filter(|(_, affected)| **affected > 0)
        .map(|(record, _)| record)
        .collect()
}
