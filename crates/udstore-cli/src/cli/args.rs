use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "udstore",
    version,
    about = "User data store: persisted user-group memberships for search authorization"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Args, Clone, Debug, Default)]
pub struct GlobalArgs {
    /// Store configuration (YAML)
    #[arg(long, global = true, env = "UDSTORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides `path` from the config)
    #[arg(long, global = true, env = "UDSTORE_DB")]
    pub db: Option<PathBuf>,

    /// Namespace for operations that do not name one (overrides the config)
    #[arg(long, global = true, env = "UDSTORE_NAMESPACE")]
    pub namespace: Option<String>,

    /// Disable the write-side cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Print store metrics as JSON on stderr after the command
    #[arg(long, global = true)]
    pub metrics: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the membership table and index if missing
    Init,
    /// List the memberships of a user
    Lookup(LookupArgs),
    /// Add memberships from a YAML file
    Import(ImportArgs),
    /// Replace group memberships from a YAML group map
    Sync(SyncArgs),
    /// Remove all memberships of users within the namespace
    RemoveUsers(RemoveIdsArgs),
    /// Remove all memberships of groups within the namespace
    RemoveGroups(RemoveIdsArgs),
    /// Remove every membership of the given namespaces
    RemoveNamespace(RemoveNamespaceArgs),
    /// Show table, row count and cache state
    Stats,
}

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Login name of the user
    pub user: String,

    /// Directory group names whose memberships count as the user's
    #[arg(long = "group", value_name = "NAME")]
    pub groups: Vec<String>,

    /// Print group principals in this namespace instead of records
    #[arg(long, value_name = "NAMESPACE")]
    pub principals: Option<String>,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// YAML file with a `memberships:` list
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// YAML file with a `groups:` map of group id to member records
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct RemoveIdsArgs {
    /// User or group ids
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<i64>,
}

#[derive(Args, Debug)]
pub struct RemoveNamespaceArgs {
    /// Namespaces to clear; defaults to the configured namespace
    pub namespaces: Vec<String>,
}
