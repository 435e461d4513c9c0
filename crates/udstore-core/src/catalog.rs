//! Query catalog: the SQL for each statement the store issues, and the
//! named-parameter rows bound to it.
//!
//! The database identifier only selects a catalog variant; SQLite is the
//! one variant shipped.

use crate::errors::{StoreError, StoreResult};
use crate::record::{MembershipKey, MembershipRecord};
use crate::schema::{self, MEMBERSHIP_INDEX_DDL, MEMBERSHIP_TABLE_DDL};
use rusqlite::types::Value;

/// Identifier of the SQLite catalog variant.
pub const SQLITE: &str = "sqlite";

pub const DEFAULT_TABLE_NAME: &str = "user_group_memberships";

const MAX_TABLE_NAME_LEN: usize = 64;

/// Statement kinds known to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    TableExists,
    CreateTable,
    CreateIndex,
    SelectForUserName,
    Insert,
    DeleteForUserIdNamespace,
    DeleteForGroupIdNamespace,
    DeleteForNamespace,
}

impl Query {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TableExists => "table_exists",
            Self::CreateTable => "create_table",
            Self::CreateIndex => "create_index",
            Self::SelectForUserName => "select_for_user_name",
            Self::Insert => "insert",
            Self::DeleteForUserIdNamespace => "delete_for_user_id_namespace",
            Self::DeleteForGroupIdNamespace => "delete_for_group_id_namespace",
            Self::DeleteForNamespace => "delete_for_namespace",
        }
    }
}

/// Named parameters for one execution of a statement.
pub(crate) type NamedParams = Vec<(&'static str, Value)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCatalog {
    database: String,
    table: String,
}

impl QueryCatalog {
    /// Catalog for `database` operating on `table`.
    pub fn for_database(database: &str, table: &str) -> StoreResult<Self> {
        if !database.trim().eq_ignore_ascii_case(SQLITE) {
            return Err(StoreError::UnsupportedDatabase(database.to_string()));
        }
        validate_table_name(table)?;
        Ok(Self {
            database: SQLITE.to_string(),
            table: table.to_string(),
        })
    }

    /// SQLite catalog on the default table.
    pub fn sqlite() -> Self {
        Self {
            database: SQLITE.to_string(),
            table: DEFAULT_TABLE_NAME.to_string(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn sql(&self, query: Query) -> String {
        let t = &self.table;
        match query {
            Query::TableExists => "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND lower(name) = lower(:table)"
                .to_string(),
            Query::CreateTable => schema::render(MEMBERSHIP_TABLE_DDL, t),
            Query::CreateIndex => schema::render(MEMBERSHIP_INDEX_DDL, t),
            Query::SelectForUserName => format!(
                "SELECT user_id, user_name, group_id, group_name, namespace \
                 FROM {t} WHERE user_name = :user_name"
            ),
            Query::Insert => format!(
                "INSERT INTO {t} (user_id, user_name, group_id, group_name, namespace) \
                 VALUES (:user_id, :user_name, :group_id, :group_name, :namespace) \
                 ON CONFLICT (user_id, group_id, namespace) DO NOTHING"
            ),
            Query::DeleteForUserIdNamespace => {
                format!("DELETE FROM {t} WHERE user_id = :user_id AND namespace = :namespace")
            }
            Query::DeleteForGroupIdNamespace => {
                format!("DELETE FROM {t} WHERE group_id = :group_id AND namespace = :namespace")
            }
            Query::DeleteForNamespace => format!("DELETE FROM {t} WHERE namespace = :namespace"),
        }
    }
}

impl Default for QueryCatalog {
    fn default() -> Self {
        Self::sqlite()
    }
}

fn validate_table_name(table: &str) -> StoreResult<()> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_start || !valid_rest || table.len() > MAX_TABLE_NAME_LEN {
        return Err(StoreError::Config(format!(
            "invalid table name {table:?}: expected an ASCII identifier \
             of at most {MAX_TABLE_NAME_LEN} chars"
        )));
    }
    Ok(())
}

pub(crate) fn table_params(table: &str) -> NamedParams {
    vec![(":table", Value::Text(table.to_string()))]
}

pub(crate) fn user_name_params(user_name: &str) -> NamedParams {
    vec![(":user_name", Value::Text(user_name.to_string()))]
}

pub(crate) fn insert_params(record: &MembershipRecord) -> NamedParams {
    vec![
        (":user_id", Value::Integer(record.user_id())),
        (":user_name", Value::Text(record.user_name().to_string())),
        (":group_id", Value::Integer(record.group_id())),
        (":group_name", Value::Text(record.group_name().to_string())),
        (":namespace", Value::Text(record.namespace().to_string())),
    ]
}

/// Delete statement matching the columns a key binds.
pub(crate) fn delete_query(key: &MembershipKey) -> Query {
    match key {
        MembershipKey::UserNamespace { .. } => Query::DeleteForUserIdNamespace,
        MembershipKey::GroupNamespace { .. } => Query::DeleteForGroupIdNamespace,
        MembershipKey::Namespace(_) => Query::DeleteForNamespace,
    }
}

pub(crate) fn key_params(key: &MembershipKey) -> NamedParams {
    let namespace = (":namespace", Value::Text(key.namespace().to_string()));
    match key {
        MembershipKey::UserNamespace { user_id, .. } => {
            vec![(":user_id", Value::Integer(*user_id)), namespace]
        }
        MembershipKey::GroupNamespace { group_id, .. } => {
            vec![(":group_id", Value::Integer(*group_id)), namespace]
        }
        MembershipKey::Namespace(_) => vec![namespace],
    }
}
