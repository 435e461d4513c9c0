use super::args::*;
use anyhow::Context;
use serde::Serialize;
use udstore_core::{MembershipStore, StoreConfig};

pub mod import;
pub mod init;
pub mod lookup;
pub mod remove;
pub mod stats;

use crate::exit_codes;

pub fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let config = resolve_config(&cli.global)?;
    let store = MembershipStore::open(&config)?;

    let code = match cli.cmd {
        Command::Init => init::run(&store)?,
        Command::Lookup(args) => lookup::run(&store, args)?,
        Command::Import(args) => import::cmd_import(&store, args)?,
        Command::Sync(args) => import::cmd_sync(&store, &config, args)?,
        Command::RemoveUsers(args) => remove::cmd_remove_users(&store, &config, args)?,
        Command::RemoveGroups(args) => remove::cmd_remove_groups(&store, &config, args)?,
        Command::RemoveNamespace(args) => remove::cmd_remove_namespace(&store, &config, args)?,
        Command::Stats => stats::run(&store)?,
    };

    if cli.global.metrics {
        eprintln!("{}", serde_json::to_string_pretty(&store.metrics())?);
    }
    Ok(code)
}

/// Config file (if any) with command-line overrides applied.
pub(crate) fn resolve_config(global: &GlobalArgs) -> anyhow::Result<StoreConfig> {
    let mut config = match &global.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    if let Some(db) = &global.db {
        config.path = Some(db.clone());
    }
    if let Some(ns) = &global.namespace {
        config.namespace = Some(ns.clone());
    }
    if global.no_cache {
        config.cache_enabled = false;
    }
    if config.path.is_none() {
        tracing::warn!("no database path configured; using a throwaway in-memory store");
    }
    Ok(config)
}

pub(crate) fn namespace(config: &StoreConfig) -> anyhow::Result<&str> {
    config
        .namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .context("no namespace given: pass --namespace or set `namespace` in the config")
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<i32> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(exit_codes::OK)
}
