//! SQLite DDL for the user data store.
//!
//! One relation holds every membership:
//! - `user_id`, `group_id`, `namespace`: row identity (unique together)
//! - `user_name`, `group_name`: denormalised labels
//!
//! `{table}` is substituted with the configured table name.

/// Table DDL. Schema version: 1
pub const MEMBERSHIP_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS {table} (
    user_id          INTEGER NOT NULL,
    user_name        TEXT NOT NULL,
    group_id         INTEGER NOT NULL,
    group_name       TEXT NOT NULL,
    namespace        TEXT NOT NULL CHECK (length(namespace) > 0),
    UNIQUE (user_id, group_id, namespace)
)
"#;

/// Lookups go by user name.
pub const MEMBERSHIP_INDEX_DDL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_{table}_user_name
    ON {table}(user_name)
"#;

pub(crate) fn render(template: &str, table: &str) -> String {
    template.replace("{table}", table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn apply(conn: &Connection) {
        conn.execute_batch(&render(MEMBERSHIP_TABLE_DDL, "memberships"))
            .unwrap();
        conn.execute_batch(&render(MEMBERSHIP_INDEX_DDL, "memberships"))
            .unwrap();
    }

    #[test]
    fn test_schema_is_valid_sql() {
        let conn = Connection::open_in_memory().unwrap();
        apply(&conn);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply(&conn);
        apply(&conn);
    }

    #[test]
    fn test_empty_namespace_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        apply(&conn);
        let err = conn.execute(
            "INSERT INTO memberships VALUES (1, 'alice', 10, 'eng', '')",
            [],
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_identity_triple_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        apply(&conn);
        conn.execute(
            "INSERT INTO memberships VALUES (1, 'alice', 10, 'eng', 'ns1')",
            [],
        )
        .unwrap();
        // same triple, different labels
        let dup = conn.execute(
            "INSERT INTO memberships VALUES (1, 'alice2', 10, 'eng2', 'ns1')",
            [],
        );
        assert!(dup.is_err());
    }
}
