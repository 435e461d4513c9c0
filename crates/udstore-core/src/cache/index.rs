use super::MembershipCache;
use crate::record::MembershipRecord;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

type Entry = Arc<MembershipRecord>;
type GroupKey = (i64, String);

/// All three views live in one structure so a single lock covers every
/// multi-view update.
#[derive(Debug, Default)]
struct CacheIndex {
    entries: HashSet<Entry>,
    by_namespace: HashMap<String, HashSet<Entry>>,
    by_group_namespace: HashMap<GroupKey, HashSet<Entry>>,
}

impl CacheIndex {
    fn insert(&mut self, record: MembershipRecord) {
        if self.entries.contains(&record) {
            return;
        }
        let entry = Arc::new(record);
        self.by_namespace
            .entry(entry.namespace().to_string())
            .or_default()
            .insert(Arc::clone(&entry));
        self.by_group_namespace
            .entry((entry.group_id(), entry.namespace().to_string()))
            .or_default()
            .insert(Arc::clone(&entry));
        self.entries.insert(entry);
    }

    fn remove_namespace(&mut self, namespace: &str) -> usize {
        let Some(members) = self.by_namespace.remove(namespace) else {
            return 0;
        };
        for entry in &members {
            self.entries.remove(entry);
            let key = (entry.group_id(), namespace.to_string());
            if let Some(group) = self.by_group_namespace.get_mut(&key) {
                group.remove(entry);
                if group.is_empty() {
                    self.by_group_namespace.remove(&key);
                }
            }
        }
        members.len()
    }

    fn remove_group_namespace(&mut self, group_id: i64, namespace: &str) -> usize {
        let key = (group_id, namespace.to_string());
        let Some(members) = self.by_group_namespace.remove(&key) else {
            return 0;
        };
        if let Some(in_namespace) = self.by_namespace.get_mut(namespace) {
            for entry in &members {
                in_namespace.remove(entry);
            }
            if in_namespace.is_empty() {
                self.by_namespace.remove(namespace);
            }
        }
        for entry in &members {
            self.entries.remove(entry);
        }
        members.len()
    }

    #[cfg(test)]
    fn assert_views_agree(&self) {
        let ns_total: usize = self.by_namespace.values().map(HashSet::len).sum();
        let group_total: usize = self.by_group_namespace.values().map(HashSet::len).sum();
        assert_eq!(ns_total, self.entries.len(), "namespace view diverged");
        assert_eq!(group_total, self.entries.len(), "group view diverged");
        for entry in &self.entries {
            assert!(self.by_namespace[entry.namespace()].contains(entry));
            let key = (entry.group_id(), entry.namespace().to_string());
            assert!(self.by_group_namespace[&key].contains(entry));
        }
    }
}

/// In-memory multi-view membership cache.
#[derive(Debug, Default)]
pub struct IndexedMembershipCache {
    inner: Mutex<CacheIndex>,
}

impl IndexedMembershipCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&self) -> MutexGuard<'_, CacheIndex> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // A panic mid-update may have left the views out of step.
                let mut guard = poisoned.into_inner();
                *guard = CacheIndex::default();
                self.inner.clear_poison();
                tracing::warn!("membership cache lock was poisoned; cache reset");
                guard
            }
        }
    }
}

impl MembershipCache for IndexedMembershipCache {
    fn contains(&self, record: &MembershipRecord) -> bool {
        self.index().entries.contains(record)
    }

    fn add(&self, record: MembershipRecord) {
        self.index().insert(record);
    }

    fn evict_by_namespace(&self, namespace: &str) -> usize {
        self.index().remove_namespace(namespace)
    }

    fn evict_by_group_namespace(&self, group_id: i64, namespace: &str) -> usize {
        self.index().remove_group_namespace(group_id, namespace)
    }

    fn clear(&self) {
        *self.index() = CacheIndex::default();
    }

    fn size(&self) -> usize {
        self.index().entries.len()
    }

    fn retain_uncached(&self, records: Vec<MembershipRecord>) -> Vec<MembershipRecord> {
        let index = self.index();
        records
            .into_iter()
            .filter(|r| !index.entries.contains(r))
            .collect()
    }

    fn add_all(&self, records: Vec<MembershipRecord>) {
        let mut index = self.index();
        for record in records {
            index.insert(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn rec(user_id: i64, group_id: i64, namespace: &str) -> MembershipRecord {
        MembershipRecord::new(
            user_id,
            format!("user{user_id}"),
            group_id,
            format!("group{group_id}"),
            namespace,
        )
    }

    #[test]
    fn test_add_is_idempotent() {
        let cache = IndexedMembershipCache::new();
        cache.add(rec(1, 10, "ns1"));
        cache.add(rec(1, 10, "ns1"));
        assert_eq!(cache.size(), 1);
        assert!(cache.contains(&rec(1, 10, "ns1")));
        assert!(!cache.contains(&rec(1, 10, "ns2")));
        cache.index().assert_views_agree();
    }

    #[test]
    fn test_evict_by_namespace_clears_group_view() {
        let cache = IndexedMembershipCache::new();
        cache.add_all(vec![
            rec(1, 10, "ns1"),
            rec(2, 10, "ns1"),
            rec(3, 11, "ns1"),
            rec(1, 10, "ns2"),
        ]);

        assert_eq!(cache.evict_by_namespace("ns1"), 3);
        assert_eq!(cache.size(), 1);
        assert!(cache.contains(&rec(1, 10, "ns2")));
        // group 10 in ns1 must be gone from the narrower view too
        assert_eq!(cache.evict_by_group_namespace(10, "ns1"), 0);
        assert_eq!(cache.evict_by_namespace("missing"), 0);
        cache.index().assert_views_agree();
    }

    #[test]
    fn test_evict_by_group_namespace_is_narrow() {
        let cache = IndexedMembershipCache::new();
        cache.add_all(vec![
            rec(1, 10, "ns1"),
            rec(2, 10, "ns1"),
            rec(1, 11, "ns1"),
            rec(1, 10, "ns2"),
        ]);

        assert_eq!(cache.evict_by_group_namespace(10, "ns1"), 2);
        assert!(cache.contains(&rec(1, 11, "ns1")));
        assert!(cache.contains(&rec(1, 10, "ns2")));
        assert!(!cache.contains(&rec(2, 10, "ns1")));
        assert_eq!(cache.evict_by_namespace("ns1"), 1);
        cache.index().assert_views_agree();
    }

    #[test]
    fn test_retain_uncached_and_clear() {
        let cache = IndexedMembershipCache::new();
        cache.add(rec(1, 10, "ns1"));
        let left = cache.retain_uncached(vec![rec(2, 10, "ns1"), rec(1, 10, "ns1")]);
        assert_eq!(left, vec![rec(2, 10, "ns1")]);

        cache.clear();
        assert_eq!(cache.size(), 0);
        cache.index().assert_views_agree();
    }

    #[test]
    fn test_concurrent_add_and_evict_keep_views_consistent() {
        let cache = Arc::new(IndexedMembershipCache::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..200 {
                        cache.add(rec(i, i % 5, "ns1"));
                        if t % 2 == 0 {
                            cache.evict_by_group_namespace(i % 5, "ns1");
                        } else if i % 50 == 0 {
                            cache.evict_by_namespace("ns1");
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        cache.index().assert_views_agree();
    }

    #[test]
    fn test_poisoned_lock_resets_cache() {
        let cache = Arc::new(IndexedMembershipCache::new());
        cache.add(rec(1, 10, "ns1"));
        let poisoner = Arc::clone(&cache);
        let _ = thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("poison the cache lock");
        })
        .join();

        assert_eq!(cache.size(), 0);
        cache.add(rec(2, 10, "ns1"));
        assert_eq!(cache.size(), 1);
    }
}
