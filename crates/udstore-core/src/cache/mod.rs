//! Write-side cache of memberships known to be persisted.
//!
//! The cache is never consulted for reads. It lets the store skip inserts
//! for records it has already confirmed and supports two eviction views:
//!
//! - namespace view: every record of one namespace
//! - group-namespace view: every record of one group within a namespace
//!
//! Two interchangeable implementations exist: [`IndexedMembershipCache`] and
//! [`NoopMembershipCache`], which the store swaps in when caching is disabled.

mod index;
mod noop;

pub use index::IndexedMembershipCache;
pub use noop::NoopMembershipCache;

use crate::record::MembershipRecord;

/// Cache capability used by the store.
pub trait MembershipCache: Send + Sync {
    /// Exact match over all five record fields.
    fn contains(&self, record: &MembershipRecord) -> bool;

    /// Idempotent insert into every view.
    fn add(&self, record: MembershipRecord);

    /// Removes all records of `namespace`. Returns the number evicted.
    fn evict_by_namespace(&self, namespace: &str) -> usize;

    /// Removes all records of `group_id` within `namespace`. Returns the
    /// number evicted.
    fn evict_by_group_namespace(&self, group_id: i64, namespace: &str) -> usize;

    fn clear(&self);

    fn size(&self) -> usize;

    /// False only for the no-op implementation.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Drops every record already cached, keeping input order.
    fn retain_uncached(&self, records: Vec<MembershipRecord>) -> Vec<MembershipRecord> {
        records.into_iter().filter(|r| !self.contains(r)).collect()
    }

    /// Adds a batch of records.
    fn add_all(&self, records: Vec<MembershipRecord>) {
        for record in records {
            self.add(record);
        }
    }
}
