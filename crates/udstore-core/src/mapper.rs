//! Result mapping from store rows to [`MembershipRecord`].

use crate::record::MembershipRecord;
use rusqlite::Row;

/// Maps one result row to a record. Required to build a store.
pub trait RowMapper: Send + Sync {
    fn map_row(&self, row: &Row<'_>) -> rusqlite::Result<MembershipRecord>;
}

impl<F> RowMapper for F
where
    F: Fn(&Row<'_>) -> rusqlite::Result<MembershipRecord> + Send + Sync,
{
    fn map_row(&self, row: &Row<'_>) -> rusqlite::Result<MembershipRecord> {
        self(row)
    }
}

/// Column-name based mapper for the catalog's select statements.
#[derive(Debug, Default, Clone, Copy)]
pub struct MembershipRowMapper;

impl RowMapper for MembershipRowMapper {
    fn map_row(&self, row: &Row<'_>) -> rusqlite::Result<MembershipRecord> {
        Ok(MembershipRecord::new(
            row.get::<_, i64>("user_id")?,
            row.get::<_, String>("user_name")?,
            row.get::<_, i64>("group_id")?,
            row.get::<_, String>("group_name")?,
            row.get::<_, String>("namespace")?,
        ))
    }
}
