use super::{namespace, print_json};
use crate::cli::args::{RemoveIdsArgs, RemoveNamespaceArgs};
use serde::Serialize;
use udstore_core::{MembershipStore, StoreConfig};

#[derive(Serialize)]
struct RemoveOutput<'a> {
    namespaces: Vec<&'a str>,
    removed: usize,
}

pub fn cmd_remove_users(
    store: &MembershipStore,
    config: &StoreConfig,
    args: RemoveIdsArgs,
) -> anyhow::Result<i32> {
    let ns = namespace(config)?;
    let removed = store.remove_user_memberships_from_namespace(args.ids, ns)?;
    print_json(&RemoveOutput {
        namespaces: vec![ns],
        removed,
    })
}

pub fn cmd_remove_groups(
    store: &MembershipStore,
    config: &StoreConfig,
    args: RemoveIdsArgs,
) -> anyhow::Result<i32> {
    let ns = namespace(config)?;
    let removed = store.remove_group_memberships_from_namespace(args.ids, ns)?;
    print_json(&RemoveOutput {
        namespaces: vec![ns],
        removed,
    })
}

pub fn cmd_remove_namespace(
    store: &MembershipStore,
    config: &StoreConfig,
    args: RemoveNamespaceArgs,
) -> anyhow::Result<i32> {
    let namespaces: Vec<&str> = if args.namespaces.is_empty() {
        vec![namespace(config)?]
    } else {
        args.namespaces.iter().map(String::as_str).collect()
    };
    let removed = store.remove_all_memberships_from_namespace(&namespaces)?;
    print_json(&RemoveOutput {
        namespaces,
        removed,
    })
}
