use super::print_json;
use serde::Serialize;
use udstore_core::{MembershipStore, StoreMetricsSnapshot};

#[derive(Serialize)]
struct StatsOutput<'a> {
    table: &'a str,
    rows: i64,
    namespaces: i64,
    cache_enabled: bool,
    cache_size: usize,
    metrics: StoreMetricsSnapshot,
}

pub fn run(store: &MembershipStore) -> anyhow::Result<i32> {
    let table = store.catalog().table_name();
    let (rows, namespaces): (i64, i64) = store.with_connection(|c| {
        c.query_row(
            &format!("SELECT COUNT(*), COUNT(DISTINCT namespace) FROM {table}"),
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
    })?;
    print_json(&StatsOutput {
        table,
        rows,
        namespaces,
        cache_enabled: store.is_cache_enabled(),
        cache_size: store.cache_size(),
        metrics: store.metrics(),
    })
}
