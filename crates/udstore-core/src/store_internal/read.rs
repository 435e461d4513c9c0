//! Read-through lookups. The cache is never consulted here.

use super::batch::bind;
use crate::catalog::{self, Query, QueryCatalog};
use crate::errors::{StoreError, StoreResult};
use crate::mapper::RowMapper;
use crate::record::MembershipRecord;
use rusqlite::Connection;

/// All rows whose `user_name` is one of `user_names`, in lookup order.
/// Any row that fails to map fails the whole call.
pub(crate) fn select_for_user_names_impl(
    conn: &Connection,
    catalog: &QueryCatalog,
    mapper: &dyn RowMapper,
    user_names: &[&str],
) -> StoreResult<Vec<MembershipRecord>> {
    let context = "select memberships for user";
    let mut stmt = conn
        .prepare(&catalog.sql(Query::SelectForUserName))
        .map_err(|e| StoreError::database(context, e))?;

    let mut out = Vec::new();
    for user_name in user_names {
        let params = catalog::user_name_params(user_name);
        let named = bind(&params);
        let rows = stmt
            .query_map(named.as_slice(), |row| mapper.map_row(row))
            .map_err(|e| StoreError::database(context, e))?;
        for row in rows {
            out.push(row.map_err(|e| StoreError::database(context, e))?);
        }
    }
    Ok(out)
}
