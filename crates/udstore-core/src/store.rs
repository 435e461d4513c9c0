//! MembershipStore: SQLite-backed user data store with a write-side cache.
//!
//! Provides:
//! - read-through membership lookups for authorization
//! - batched inserts deduplicated against the cache
//! - scoped batched removals (user, group, namespace)
//! - transactional replace-all sync of group memberships
//!
//! Cache rules: eviction is lenient (always runs, even when the delete batch
//! failed), insertion is strict (only rows the store confirmed one by one).
//! The connection lock is held across each store round trip and the cache
//! update that follows it, so overlapping operations resolve in one order
//! for both.

use crate::cache::{IndexedMembershipCache, MembershipCache, NoopMembershipCache};
use crate::catalog::{self, NamedParams, Query, QueryCatalog};
use crate::config::{StoreConfig, DEFAULT_BUSY_TIMEOUT_MS};
use crate::errors::{StoreError, StoreResult};
use crate::mapper::{MembershipRowMapper, RowMapper};
use crate::metrics::{StoreMetrics, StoreMetricsSnapshot};
use crate::record::{GroupPrincipal, MembershipKey, MembershipRecord};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeSet;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

#[path = "store_internal/mod.rs"]
mod store_internal;

use store_internal::{batch, bootstrap, read, txn};

/// Outcome of [`MembershipStore::add_memberships`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    /// Records dropped because the cache already holds them.
    pub skipped: usize,
    /// Rows sent to the store.
    pub attempted: usize,
    /// Rows the store reported as inserted.
    pub confirmed: usize,
}

/// Outcome of [`MembershipStore::sync_group_memberships`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub groups: usize,
    /// Rows deleted across all synced groups.
    pub deleted: usize,
    pub attempted: usize,
    pub confirmed: usize,
}

/// Connection guard that accounts time under lock.
struct ConnGuard<'a> {
    conn: MutexGuard<'a, Connection>,
    acquired: Instant,
    metrics: &'a StoreMetrics,
}

impl Deref for ConnGuard<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for ConnGuard<'_> {
    fn drop(&mut self) {
        self.metrics.add_lock_held(self.acquired.elapsed());
    }
}

fn cache_for(enabled: bool) -> Arc<dyn MembershipCache> {
    if enabled {
        Arc::new(IndexedMembershipCache::new())
    } else {
        Arc::new(NoopMembershipCache)
    }
}

/// Persisted user-group membership store.
///
/// Safe to share between threads (`Arc<MembershipStore>`); every operation
/// is a blocking call.
pub struct MembershipStore {
    conn: Arc<Mutex<Connection>>,
    catalog: QueryCatalog,
    mapper: Arc<dyn RowMapper>,
    cache: RwLock<Arc<dyn MembershipCache>>,
    metrics: StoreMetrics,
}

impl MembershipStore {
    pub fn builder() -> MembershipStoreBuilder {
        MembershipStoreBuilder::default()
    }

    /// Open a store as described by `config`, with the default row mapper.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let catalog = QueryCatalog::for_database(&config.database, &config.table_name)?;
        let conn = match &config.path {
            Some(path) => Connection::open(path),
            None => Connection::open_in_memory(),
        }
        .map_err(|e| StoreError::database("open connection", e))?;

        Self::builder()
            .connection(conn)
            .catalog(catalog)
            .row_mapper(MembershipRowMapper)
            .cache_enabled(config.cache_enabled)
            .busy_timeout(config.busy_timeout())
            .build()
    }

    /// Create an in-memory store (for testing).
    pub fn memory() -> StoreResult<Self> {
        Self::open(&StoreConfig::default())
    }

    pub fn catalog(&self) -> &QueryCatalog {
        &self.catalog
    }

    fn lock_conn(&self) -> StoreResult<ConnGuard<'_>> {
        let started = Instant::now();
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        self.metrics.add_lock_wait(started.elapsed());
        Ok(ConnGuard {
            conn,
            acquired: Instant::now(),
            metrics: &self.metrics,
        })
    }

    /// Writers take this snapshot while holding the connection lock, so a
    /// cache swapped in by `set_cache_enabled` is seen by every later writer.
    fn active_cache(&self) -> Arc<dyn MembershipCache> {
        Arc::clone(&self.cache.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Run `f` against the underlying connection (maintenance and tests).
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> StoreResult<T> {
        let conn = self.lock_conn()?;
        f(&*conn).map_err(|e| StoreError::database("maintenance", e))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Every membership persisted for `username` (the login name, not the
    /// id). Always reads the backing store.
    pub fn get_all_memberships_for_user(
        &self,
        username: &str,
    ) -> StoreResult<Vec<MembershipRecord>> {
        let conn = self.lock_conn()?;
        let memberships = read::select_for_user_names_impl(
            &conn,
            &self.catalog,
            self.mapper.as_ref(),
            &[username],
        )?;
        tracing::debug!(
            user = username,
            count = memberships.len(),
            "memberships identified for user"
        );
        Ok(memberships)
    }

    /// Memberships of the search user plus those held by any of
    /// `directory_groups` (group names already resolved by the caller).
    /// Sorted and free of duplicates.
    pub fn get_all_memberships_for_search_user_and_groups<I, S>(
        &self,
        username: &str,
        directory_groups: I,
    ) -> StoreResult<Vec<MembershipRecord>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: BTreeSet<String> = directory_groups
            .into_iter()
            .map(|g| g.as_ref().to_string())
            .collect();
        names.insert(username.to_string());
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        let rows = {
            let conn = self.lock_conn()?;
            read::select_for_user_names_impl(
                &conn,
                &self.catalog,
                self.mapper.as_ref(),
                &names,
            )?
        };
        let memberships: Vec<_> = rows
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        tracing::debug!(
            user = username,
            names = names.len(),
            count = memberships.len(),
            "memberships identified for search user and directory groups"
        );
        Ok(memberships)
    }

    /// Group principals for the search user, named `[<namespace>]<group>`
    /// and placed in `principal_namespace`.
    pub fn group_principals_for_search_user_and_groups<I, S>(
        &self,
        principal_namespace: &str,
        directory_groups: I,
        username: &str,
    ) -> StoreResult<BTreeSet<GroupPrincipal>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self
            .get_all_memberships_for_search_user_and_groups(username, directory_groups)?
            .iter()
            .map(|m| GroupPrincipal::from_membership(principal_namespace, m))
            .collect())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert memberships not already known to the cache.
    ///
    /// Rows that already exist in the store are left alone (status 0) and
    /// are not cached. Only individually confirmed rows enter the cache.
    pub fn add_memberships<I>(&self, records: I) -> StoreResult<WriteReport>
    where
        I: IntoIterator<Item = MembershipRecord>,
    {
        let records: Vec<MembershipRecord> = records
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if records.is_empty() {
            return Ok(WriteReport::default());
        }

        let conn = self.lock_conn()?;
        let cache = self.active_cache();

        let offered = records.len();
        let pending = cache.retain_uncached(records);
        let skipped = offered - pending.len();
        self.metrics.record_cache_skips(skipped);
        if pending.is_empty() {
            tracing::debug!(skipped, "all memberships already cached; nothing to insert");
            return Ok(WriteReport {
                skipped,
                ..WriteReport::default()
            });
        }

        let rows: Vec<NamedParams> = pending.iter().map(catalog::insert_params).collect();
        let status =
            batch::execute_batch_impl(&conn, &self.catalog.sql(Query::Insert), &rows, "insert")?;
        let confirmed = batch::confirmed_rows(&status, pending);
        self.metrics.record_batch(status.len(), confirmed.len());

        let report = WriteReport {
            skipped,
            attempted: status.len(),
            confirmed: confirmed.len(),
        };
        cache.add_all(confirmed);
        drop(conn);

        tracing::debug!(
            skipped = report.skipped,
            attempted = report.attempted,
            confirmed = report.confirmed,
            "memberships added"
        );
        Ok(report)
    }

    /// Remove all memberships of `user_ids` within `namespace`.
    ///
    /// Returns the number of rows deleted.
    pub fn remove_user_memberships_from_namespace<I>(
        &self,
        user_ids: I,
        namespace: &str,
    ) -> StoreResult<usize>
    where
        I: IntoIterator<Item = i64>,
    {
        let keys = user_ids
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|user_id| MembershipKey::UserNamespace {
                user_id,
                namespace: namespace.to_string(),
            })
            .collect();
        self.remove_by_keys(keys)
    }

    /// Remove all memberships of `group_ids` within `namespace`.
    pub fn remove_group_memberships_from_namespace<I>(
        &self,
        group_ids: I,
        namespace: &str,
    ) -> StoreResult<usize>
    where
        I: IntoIterator<Item = i64>,
    {
        let keys = group_ids
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|group_id| MembershipKey::GroupNamespace {
                group_id,
                namespace: namespace.to_string(),
            })
            .collect();
        self.remove_by_keys(keys)
    }

    /// Remove every membership belonging to any of `namespaces`.
    pub fn remove_all_memberships_from_namespace<I, S>(&self, namespaces: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = namespaces
            .into_iter()
            .map(|ns| ns.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(MembershipKey::Namespace)
            .collect();
        self.remove_by_keys(keys)
    }

    /// `keys` must all be of one kind.
    fn remove_by_keys(&self, keys: Vec<MembershipKey>) -> StoreResult<usize> {
        let Some(first) = keys.first() else {
            return Ok(0);
        };
        let query = catalog::delete_query(first);
        let rows: Vec<NamedParams> = keys.iter().map(catalog::key_params).collect();

        let conn = self.lock_conn()?;
        let cache = self.active_cache();
        let result =
            batch::execute_batch_impl(&conn, &self.catalog.sql(query), &rows, query.as_str());

        // Evict whatever the batch reported, errors included.
        let evicted: usize = keys.iter().map(|key| evict(cache.as_ref(), key)).sum();
        drop(conn);

        let status = result?;
        let removed: usize = status.iter().sum();
        self.metrics
            .record_batch(status.len(), status.iter().filter(|s| **s > 0).count());
        tracing::debug!(
            query = query.as_str(),
            keys = keys.len(),
            removed,
            evicted,
            "memberships removed"
        );
        Ok(removed)
    }

    /// Replace the persisted memberships of every group in
    /// `group_to_records` with the given records, atomically.
    ///
    /// Within one transaction all `(group, namespace)` rows are deleted and
    /// the union of the replacement records is inserted. On failure the
    /// transaction is rolled back and neither store nor cache change.
    pub fn sync_group_memberships<G, R>(
        &self,
        group_to_records: G,
        namespace: &str,
    ) -> StoreResult<SyncReport>
    where
        G: IntoIterator<Item = (i64, R)>,
        R: IntoIterator<Item = MembershipRecord>,
    {
        let mut groups = BTreeSet::new();
        let mut to_insert = BTreeSet::new();
        for (group_id, records) in group_to_records {
            groups.insert(group_id);
            to_insert.extend(records);
        }
        if groups.is_empty() {
            return Ok(SyncReport::default());
        }

        let keys: Vec<MembershipKey> = groups
            .into_iter()
            .map(|group_id| MembershipKey::GroupNamespace {
                group_id,
                namespace: namespace.to_string(),
            })
            .collect();
        let to_insert: Vec<MembershipRecord> = to_insert.into_iter().collect();
        let delete_rows: Vec<NamedParams> = keys.iter().map(catalog::key_params).collect();
        let insert_rows: Vec<NamedParams> = to_insert.iter().map(catalog::insert_params).collect();
        let delete_sql = self.catalog.sql(Query::DeleteForGroupIdNamespace);
        let insert_sql = self.catalog.sql(Query::Insert);

        let conn = self.lock_conn()?;
        let cache = self.active_cache();
        let (delete_status, insert_status) =
            txn::in_transaction_impl(&conn, &self.metrics, |conn| {
                let deleted =
                    batch::execute_batch_impl(conn, &delete_sql, &delete_rows, "sync delete")?;
                let inserted =
                    batch::execute_batch_impl(conn, &insert_sql, &insert_rows, "sync insert")?;
                Ok((deleted, inserted))
            })?;

        for key in &keys {
            evict(cache.as_ref(), key);
        }
        let confirmed = batch::confirmed_rows(&insert_status, to_insert);
        self.metrics.record_batch(
            delete_status.len(),
            delete_status.iter().filter(|s| **s > 0).count(),
        );
        self.metrics.record_batch(insert_status.len(), confirmed.len());

        let report = SyncReport {
            groups: keys.len(),
            deleted: delete_status.iter().sum(),
            attempted: insert_status.len(),
            confirmed: confirmed.len(),
        };
        cache.add_all(confirmed);
        drop(conn);

        tracing::debug!(
            namespace,
            groups = report.groups,
            deleted = report.deleted,
            inserted = report.confirmed,
            "group memberships synchronised"
        );
        Ok(report)
    }

    // =========================================================================
    // Cache control
    // =========================================================================

    /// Empty the cache. Returns its size afterwards.
    pub fn cleanup_cache(&self) -> usize {
        let cache = self.active_cache();
        cache.clear();
        let size = cache.size();
        tracing::info!(size, "membership cache cleaned up");
        size
    }

    /// Enable or disable the cache. Disabling swaps in a no-op cache;
    /// re-enabling starts from an empty cache.
    pub fn set_cache_enabled(&self, enabled: bool) {
        let mut slot = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_enabled() != enabled {
            *slot = cache_for(enabled);
            tracing::info!(enabled, "membership cache toggled");
        }
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.active_cache().is_enabled()
    }

    pub fn cache_size(&self) -> usize {
        self.active_cache().size()
    }

    pub fn metrics(&self) -> StoreMetricsSnapshot {
        self.metrics.snapshot(false)
    }
}

/// User keys evict the whole namespace view: the cache has no user view,
/// and over-eviction only costs cache misses.
fn evict(cache: &dyn MembershipCache, key: &MembershipKey) -> usize {
    match key {
        MembershipKey::UserNamespace { namespace, .. } | MembershipKey::Namespace(namespace) => {
            cache.evict_by_namespace(namespace)
        }
        MembershipKey::GroupNamespace {
            group_id,
            namespace,
        } => cache.evict_by_group_namespace(*group_id, namespace),
    }
}

/// Wires a [`MembershipStore`] from its collaborators.
///
/// A connection and a row mapper are required; the catalog defaults to
/// SQLite on the default table and the cache to enabled.
pub struct MembershipStoreBuilder {
    connection: Option<Connection>,
    catalog: Option<QueryCatalog>,
    row_mapper: Option<Arc<dyn RowMapper>>,
    cache_enabled: bool,
    busy_timeout: Duration,
}

impl Default for MembershipStoreBuilder {
    fn default() -> Self {
        Self {
            connection: None,
            catalog: None,
            row_mapper: None,
            cache_enabled: true,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }
}

impl MembershipStoreBuilder {
    pub fn connection(mut self, conn: Connection) -> Self {
        self.connection = Some(conn);
        self
    }

    pub fn catalog(mut self, catalog: QueryCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn row_mapper(mut self, mapper: impl RowMapper + 'static) -> Self {
        let mapper: Arc<dyn RowMapper> = Arc::new(mapper);
        self.row_mapper = Some(mapper);
        self
    }

    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Validates collaborators, initialises the connection and makes sure
    /// the membership table exists.
    pub fn build(self) -> StoreResult<MembershipStore> {
        let mapper = self
            .row_mapper
            .ok_or(StoreError::MissingDependency("row mapper"))?;
        let conn = self
            .connection
            .ok_or(StoreError::MissingDependency("connection"))?;
        let catalog = self.catalog.unwrap_or_default();

        bootstrap::init_connection_impl(&conn, self.busy_timeout)?;
        bootstrap::confirm_entities_impl(&conn, &catalog);

        Ok(MembershipStore {
            conn: Arc::new(Mutex::new(conn)),
            catalog,
            mapper,
            cache: RwLock::new(cache_for(self.cache_enabled)),
            metrics: StoreMetrics::default(),
        })
    }
}
