//! End-to-end behaviour of MembershipStore against an in-memory SQLite DB.

use std::collections::BTreeMap;
use udstore_core::{GroupPrincipal, MembershipRecord, MembershipStore, StoreConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn store() -> MembershipStore {
    init_tracing();
    MembershipStore::memory().unwrap()
}

fn rec(user_id: i64, user: &str, group_id: i64, group: &str, ns: &str) -> MembershipRecord {
    MembershipRecord::new(user_id, user, group_id, group, ns)
}

#[test]
fn test_add_then_remove_group() {
    let store = store();
    let alice = rec(1, "alice", 10, "eng", "ns1");

    let report = store.add_memberships([alice.clone()]).unwrap();
    assert_eq!(report.confirmed, 1);
    assert_eq!(store.get_all_memberships_for_user("alice").unwrap(), vec![alice]);

    let removed = store
        .remove_group_memberships_from_namespace([10], "ns1")
        .unwrap();
    assert_eq!(removed, 1);
    assert!(store.get_all_memberships_for_user("alice").unwrap().is_empty());
    assert_eq!(store.cache_size(), 0);
}

#[test]
fn test_sync_replaces_group_members() {
    let store = store();
    let stale = rec(3, "carol", 10, "eng", "ns1");
    let other_ns = rec(3, "carol", 10, "eng", "ns2");
    store
        .add_memberships([stale.clone(), other_ns.clone()])
        .unwrap();

    let m1 = rec(1, "alice", 10, "eng", "ns1");
    let m2 = rec(2, "bob", 10, "eng", "ns1");
    let mut groups = BTreeMap::new();
    groups.insert(10, vec![m1.clone(), m2.clone()]);

    let report = store.sync_group_memberships(groups, "ns1").unwrap();
    assert_eq!(report.groups, 1);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.confirmed, 2);

    assert_eq!(store.get_all_memberships_for_user("alice").unwrap(), vec![m1]);
    assert_eq!(store.get_all_memberships_for_user("bob").unwrap(), vec![m2]);
    // only the ns2 row survives for carol
    assert_eq!(store.get_all_memberships_for_user("carol").unwrap(), vec![other_ns]);
    assert_eq!(store.metrics().commits, 1);

    // m1, m2 and the ns2 row; the replaced ns1 row is gone from the cache
    assert_eq!(store.cache_size(), 3);
    let report = store.add_memberships([stale.clone()]).unwrap();
    assert_eq!((report.skipped, report.attempted, report.confirmed), (0, 1, 1));
    assert_eq!(store.get_all_memberships_for_user("carol").unwrap().len(), 2);
}

#[test]
fn test_sync_with_empty_group_clears_it() {
    let store = store();
    store
        .add_memberships([rec(1, "alice", 10, "eng", "ns1"), rec(1, "alice", 11, "ops", "ns1")])
        .unwrap();

    let report = store
        .sync_group_memberships([(10, Vec::<MembershipRecord>::new())], "ns1")
        .unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(report.attempted, 0);

    let left = store.get_all_memberships_for_user("alice").unwrap();
    assert_eq!(left, vec![rec(1, "alice", 11, "ops", "ns1")]);
    assert_eq!(store.cache_size(), 1);
}

#[test]
fn test_added_records_are_readable() {
    let store = store();
    let records = vec![
        rec(1, "alice", 10, "eng", "ns1"),
        rec(1, "alice", 11, "ops", "ns1"),
        rec(1, "alice", 10, "eng", "ns2"),
    ];
    store.add_memberships(records.clone()).unwrap();

    let mut found = store.get_all_memberships_for_user("alice").unwrap();
    found.sort();
    let mut expected = records;
    expected.sort();
    assert_eq!(found, expected);
    assert!(store.get_all_memberships_for_user("nobody").unwrap().is_empty());
}

#[test]
fn test_remove_user_is_namespace_scoped() {
    let store = store();
    store
        .add_memberships([
            rec(1, "alice", 10, "eng", "ns1"),
            rec(1, "alice", 11, "ops", "ns1"),
            rec(1, "alice", 10, "eng", "ns2"),
            rec(2, "bob", 10, "eng", "ns1"),
        ])
        .unwrap();

    let removed = store
        .remove_user_memberships_from_namespace([1], "ns1")
        .unwrap();
    assert_eq!(removed, 2);

    let alice = store.get_all_memberships_for_user("alice").unwrap();
    assert_eq!(alice, vec![rec(1, "alice", 10, "eng", "ns2")]);
    assert_eq!(store.get_all_memberships_for_user("bob").unwrap().len(), 1);
}

#[test]
fn test_remove_all_from_namespaces() {
    let store = store();
    store
        .add_memberships([
            rec(1, "alice", 10, "eng", "ns1"),
            rec(1, "alice", 10, "eng", "ns2"),
            rec(1, "alice", 10, "eng", "ns3"),
        ])
        .unwrap();

    let removed = store
        .remove_all_memberships_from_namespace(["ns1", "ns2", "ns1"])
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(
        store.get_all_memberships_for_user("alice").unwrap(),
        vec![rec(1, "alice", 10, "eng", "ns3")]
    );
    assert_eq!(store.cache_size(), 1);
}

#[test]
fn test_cached_records_are_not_inserted_again() {
    let store = store();
    let batch = vec![
        rec(1, "alice", 10, "eng", "ns1"),
        rec(2, "bob", 10, "eng", "ns1"),
    ];

    let first = store.add_memberships(batch.clone()).unwrap();
    assert_eq!((first.skipped, first.attempted, first.confirmed), (0, 2, 2));
    let attempted_before = store.metrics().rows_attempted;

    let second = store.add_memberships(batch).unwrap();
    assert_eq!((second.skipped, second.attempted, second.confirmed), (2, 0, 0));
    assert_eq!(store.metrics().rows_attempted, attempted_before);
    assert_eq!(store.metrics().cache_skips, 2);
}

#[test]
fn test_disabled_cache_attempts_every_insert() {
    let store = store();
    store.set_cache_enabled(false);
    let batch = vec![
        rec(1, "alice", 10, "eng", "ns1"),
        rec(2, "bob", 10, "eng", "ns1"),
    ];

    let first = store.add_memberships(batch.clone()).unwrap();
    let second = store.add_memberships(batch).unwrap();
    assert_eq!(first.attempted, 2);
    assert_eq!(second.attempted, 2);
    // unique identity: the repeat is a no-op in the store
    assert_eq!(second.confirmed, 0);
    assert_eq!(store.get_all_memberships_for_user("alice").unwrap().len(), 1);
    assert_eq!(store.cache_size(), 0);
}

#[test]
fn test_duplicate_input_is_collapsed() {
    let store = store();
    let alice = rec(1, "alice", 10, "eng", "ns1");
    let report = store
        .add_memberships([alice.clone(), alice.clone(), alice])
        .unwrap();
    assert_eq!(report.attempted, 1);
    assert_eq!(report.confirmed, 1);
}

#[test]
fn test_search_user_and_directory_groups() {
    let store = store();
    store
        .add_memberships([
            rec(7, "user1", 1, "group1", "ns1"),
            rec(8, "CN=Admins", 2, "group2", "ns1"),
            rec(9, "CN=Staff", 1, "group1", "ns1"),
            rec(10, "user2", 3, "group3", "ns1"),
        ])
        .unwrap();

    let found = store
        .get_all_memberships_for_search_user_and_groups(
            "user1",
            ["CN=Admins", "CN=Staff", "CN=Admins"],
        )
        .unwrap();
    let users: Vec<_> = found.iter().map(|m| m.user_name()).collect();
    assert_eq!(users.len(), 3);
    assert!(!users.contains(&"user2"));

    let mut sorted = found.clone();
    sorted.sort();
    assert_eq!(found, sorted);

    let principals = store
        .group_principals_for_search_user_and_groups("ns", ["CN=Admins", "CN=Staff"], "user1")
        .unwrap();
    let names: Vec<_> = principals.iter().map(|p| p.name.as_str()).collect();
    // group1 reached both directly and through CN=Staff
    assert_eq!(names, vec!["[ns1]group1", "[ns1]group2"]);
    assert!(principals.iter().all(|p| p.namespace == "ns"));
}

#[test]
fn test_principal_for_search_user_only() {
    let store = store();
    store
        .add_memberships([rec(1, "user1", 1, "group1", "http://sp.example.com")])
        .unwrap();

    let principals = store
        .group_principals_for_search_user_and_groups("ns", Vec::<String>::new(), "user1")
        .unwrap();
    assert_eq!(
        principals.into_iter().collect::<Vec<_>>(),
        vec![GroupPrincipal {
            namespace: "ns".into(),
            name: "[http://sp.example.com]group1".into(),
        }]
    );
}

#[test]
fn test_store_error_on_missing_table() {
    let store = store();
    store
        .with_connection(|c| c.execute_batch("DROP TABLE user_group_memberships"))
        .unwrap();

    let err = store.get_all_memberships_for_user("alice").unwrap_err();
    assert!(err.to_string().contains("select memberships for user"), "{err}");
    assert!(!err.is_fatal());
}

#[test]
fn test_custom_table_from_config() {
    init_tracing();
    let config =
        StoreConfig::from_yaml_str("table_name: uds_custom\ncache_enabled: false\n").unwrap();
    let store = MembershipStore::open(&config).unwrap();
    assert!(!store.is_cache_enabled());
    assert_eq!(store.catalog().table_name(), "uds_custom");

    store
        .add_memberships([rec(1, "alice", 10, "eng", "ns1")])
        .unwrap();
    let n: i64 = store
        .with_connection(|c| c.query_row("SELECT COUNT(*) FROM uds_custom", [], |r| r.get(0)))
        .unwrap();
    assert_eq!(n, 1);
}
