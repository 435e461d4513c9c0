//! Connection setup and entity bootstrap.

use super::batch::bind;
use crate::catalog::{self, Query, QueryCatalog};
use crate::errors::{StoreError, StoreResult};
use rusqlite::{Connection, OptionalExtension};
use std::time::Duration;

pub(crate) fn init_connection_impl(conn: &Connection, busy_timeout: Duration) -> StoreResult<()> {
    conn.busy_timeout(busy_timeout)
        .map_err(|e| StoreError::database("set busy timeout", e))?;
    // WAL for file-backed DBs; in-memory databases stay on "memory"
    match conn.query_row("PRAGMA journal_mode = WAL", [], |row| {
        row.get::<_, String>(0)
    }) {
        Ok(mode) => tracing::debug!(journal_mode = %mode, "connection initialised"),
        Err(e) => tracing::debug!(error = %e, "journal mode unchanged"),
    }
    Ok(())
}

/// Ensures the membership table and its index exist.
///
/// Never fails: detection is unreliable on some backends, so problems are
/// logged and a broken store surfaces on its first real operation.
pub(crate) fn confirm_entities_impl(conn: &Connection, catalog: &QueryCatalog) {
    match find_table_impl(conn, catalog) {
        Ok(Some(found)) => {
            tracing::info!(table = %found, "user data store table found");
        }
        Ok(None) => match create_entities_impl(conn, catalog) {
            Ok(()) => tracing::info!(
                table = catalog.table_name(),
                "created user data store table and index"
            ),
            Err(e) => tracing::warn!(
                table = catalog.table_name(),
                error = %e,
                "failed to create user data store table"
            ),
        },
        Err(e) => tracing::warn!(
            table = catalog.table_name(),
            error = %e,
            "could not determine whether the user data store table exists"
        ),
    }
}

/// Name of the membership table as stored in the catalog, matched
/// case-insensitively.
pub(crate) fn find_table_impl(
    conn: &Connection,
    catalog: &QueryCatalog,
) -> StoreResult<Option<String>> {
    let params = catalog::table_params(catalog.table_name());
    let named = bind(&params);
    conn.query_row(&catalog.sql(Query::TableExists), named.as_slice(), |row| {
        row.get(0)
    })
    .optional()
    .map_err(|e| StoreError::database("table lookup", e))
}

fn create_entities_impl(conn: &Connection, catalog: &QueryCatalog) -> StoreResult<()> {
    conn.execute_batch(&catalog.sql(Query::CreateTable))
        .map_err(|e| StoreError::database("create table", e))?;
    conn.execute_batch(&catalog.sql(Query::CreateIndex))
        .map_err(|e| StoreError::database("create index", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_missing_table_once() {
        let conn = Connection::open_in_memory().unwrap();
        let catalog = QueryCatalog::sqlite();
        assert_eq!(find_table_impl(&conn, &catalog).unwrap(), None);

        confirm_entities_impl(&conn, &catalog);
        assert_eq!(
            find_table_impl(&conn, &catalog).unwrap().as_deref(),
            Some(catalog.table_name())
        );
        // second run only finds it
        confirm_entities_impl(&conn, &catalog);

        let indexes: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = ?1",
                [catalog.table_name()],
                |r| r.get(0),
            )
            .unwrap();
        // user_name index plus the autoindex behind UNIQUE
        assert_eq!(indexes, 2);
    }

    #[test]
    fn test_table_lookup_ignores_case() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE UDS_Memberships (x INTEGER)")
            .unwrap();
        let catalog = QueryCatalog::for_database("sqlite", "uds_memberships").unwrap();
        assert_eq!(
            find_table_impl(&conn, &catalog).unwrap().as_deref(),
            Some("UDS_Memberships")
        );
    }

    #[test]
    fn test_bootstrap_failure_is_not_fatal() {
        let conn = Connection::open_in_memory().unwrap();
        // a view shadows the table name and cannot be indexed
        conn.execute_batch("CREATE VIEW user_group_memberships AS SELECT 1 AS x")
            .unwrap();
        confirm_entities_impl(&conn, &QueryCatalog::sqlite());
    }
}
