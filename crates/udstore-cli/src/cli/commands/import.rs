//! YAML-fed writes: `import` adds a membership list, `sync` replaces groups.

use super::{namespace, print_json};
use crate::cli::args::{ImportArgs, SyncArgs};
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use udstore_core::{MembershipRecord, MembershipStore, StoreConfig};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ImportFile {
    memberships: Vec<MembershipRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SyncFile {
    /// Overrides the configured namespace for this sync.
    #[serde(default)]
    namespace: Option<String>,
    groups: BTreeMap<i64, Vec<MembershipRecord>>,
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("invalid YAML in {}", path.display()))
}

pub fn cmd_import(store: &MembershipStore, args: ImportArgs) -> anyhow::Result<i32> {
    let input: ImportFile = read_yaml(&args.file)?;
    let report = store
        .add_memberships(input.memberships)
        .context("import failed")?;
    print_json(&report)
}

pub fn cmd_sync(
    store: &MembershipStore,
    config: &StoreConfig,
    args: SyncArgs,
) -> anyhow::Result<i32> {
    let input: SyncFile = read_yaml(&args.file)?;
    let ns = match input.namespace.as_deref() {
        Some(ns) => ns,
        None => namespace(config)?,
    };
    if let Some((group, stray)) = input.groups.iter().find_map(|(group, records)| {
        records
            .iter()
            .find(|r| r.group_id() != *group || r.namespace() != ns)
            .map(|r| (group, r))
    }) {
        anyhow::bail!("record {stray} does not belong to group {group} in namespace {ns}");
    }

    let report = store
        .sync_group_memberships(input.groups, ns)
        .context("sync failed")?;
    print_json(&report)
}
