//! Membership record value type and the delete keys derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One (user, group, namespace) relation.
///
/// Persisted rows are identified by `(user_id, group_id, namespace)`; the two
/// names are display labels. Equality, hashing and ordering still cover all
/// five fields, so two records that differ only in a label are distinct
/// cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MembershipRecord {
    user_id: i64,
    user_name: String,
    group_id: i64,
    group_name: String,
    namespace: String,
}

impl MembershipRecord {
    pub fn new(
        user_id: i64,
        user_name: impl Into<String>,
        group_id: i64,
        group_name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            user_name: user_name.into(),
            group_id,
            group_name: group_name.into(),
            namespace: namespace.into(),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn group_id(&self) -> i64 {
        self.group_id
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl fmt::Display for MembershipRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) in {}({}) @ {}",
            self.user_name, self.user_id, self.group_name, self.group_id, self.namespace
        )
    }
}

/// Partial record used as a delete template. Each variant binds exactly the
/// columns its delete statement filters on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum MembershipKey {
    UserNamespace { user_id: i64, namespace: String },
    GroupNamespace { group_id: i64, namespace: String },
    Namespace(String),
}

impl MembershipKey {
    pub(crate) fn namespace(&self) -> &str {
        match self {
            Self::UserNamespace { namespace, .. }
            | Self::GroupNamespace { namespace, .. }
            | Self::Namespace(namespace) => namespace,
        }
    }
}

/// A search-platform group principal derived from a membership.
///
/// `name` is the group name qualified by the membership namespace:
/// `[<namespace>]<group name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupPrincipal {
    pub namespace: String,
    pub name: String,
}

impl GroupPrincipal {
    pub fn from_membership(principal_namespace: &str, record: &MembershipRecord) -> Self {
        Self {
            namespace: principal_namespace.to_string(),
            name: format!("[{}]{}", record.namespace(), record.group_name()),
        }
    }
}
