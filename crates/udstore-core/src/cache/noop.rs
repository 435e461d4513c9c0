use super::MembershipCache;
use crate::record::MembershipRecord;

/// Cache used while caching is disabled: remembers nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMembershipCache;

impl MembershipCache for NoopMembershipCache {
    fn contains(&self, _record: &MembershipRecord) -> bool {
        false
    }

    fn add(&self, _record: MembershipRecord) {}

    fn evict_by_namespace(&self, _namespace: &str) -> usize {
        0
    }

    fn evict_by_group_namespace(&self, _group_id: i64, _namespace: &str) -> usize {
        0
    }

    fn clear(&self) {}

    fn size(&self) -> usize {
        0
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn retain_uncached(&self, records: Vec<MembershipRecord>) -> Vec<MembershipRecord> {
        records
    }

    fn add_all(&self, _records: Vec<MembershipRecord>) {}
}
