//! User data store: persisted user-group memberships for search
//! authorization.
//!
//! Memberships live in one SQLite table and are read straight from it. A
//! write-side cache of already-persisted records lets repeated membership
//! feeds skip redundant inserts. Group memberships can be replaced
//! atomically.
//!
//! # Quick Start
//!
//! ```no_run
//! use udstore_core::{MembershipRecord, MembershipStore, StoreConfig};
//!
//! # fn example() -> udstore_core::StoreResult<()> {
//! let config = StoreConfig::load(std::path::Path::new("udstore.yaml"))?;
//! let store = MembershipStore::open(&config)?;
//!
//! store.add_memberships([MembershipRecord::new(1, "alice", 10, "eng", "ns1")])?;
//! for m in store.get_all_memberships_for_user("alice")? {
//!     println!("{m}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Key | Description |
//! |-----|-------------|
//! | `database` | Catalog variant (default: `sqlite`) |
//! | `path` | Database file; in-memory when absent |
//! | `table_name` | Membership table (default: `user_group_memberships`) |
//! | `namespace` | Default namespace for CLI operations |
//! | `cache_enabled` | Write-side cache on/off (default: `true`) |
//! | `busy_timeout_ms` | SQLite busy timeout (default: 5000) |

pub mod cache;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod mapper;
pub mod metrics;
pub mod record;
mod schema;
pub mod store;

// Re-export main types
pub use cache::{IndexedMembershipCache, MembershipCache, NoopMembershipCache};
pub use catalog::{Query, QueryCatalog, DEFAULT_TABLE_NAME, SQLITE};
pub use config::StoreConfig;
pub use errors::{StoreError, StoreResult};
pub use mapper::{MembershipRowMapper, RowMapper};
pub use metrics::{StoreMetrics, StoreMetricsSnapshot};
pub use record::{GroupPrincipal, MembershipRecord};
pub use store::{MembershipStore, MembershipStoreBuilder, SyncReport, WriteReport};
