use super::print_json;
use serde::Serialize;
use udstore_core::MembershipStore;

#[derive(Serialize)]
struct InitOutput<'a> {
    database: &'a str,
    table: &'a str,
}

/// Opening the store already bootstrapped the table; report what it uses.
pub fn run(store: &MembershipStore) -> anyhow::Result<i32> {
    let catalog = store.catalog();
    print_json(&InitOutput {
        database: catalog.database(),
        table: catalog.table_name(),
    })
}
