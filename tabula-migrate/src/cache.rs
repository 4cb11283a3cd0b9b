//! Table name caching.
//!
//! The cache holds the table names of one connection and is owned by the
//! engine driving that connection. It is loaded lazily on first lookup and
//! must be invalidated after every structural change.
//!
//! The cache assumes a single schema writer per database. Changes made by
//! another process are only observed after [`SchemaCache::invalidate`] or
//! [`SchemaCache::refresh`].

use parking_lot::RwLock;

use crate::connection::SchemaConnection;
use crate::error::MigrateResult;

/// Statistics for the table name cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from memory.
    pub hits: u64,
    /// Lookups that loaded names from the connection.
    pub misses: u64,
    /// Number of explicit invalidations.
    pub invalidations: u64,
    /// Number of names currently cached.
    pub cached_count: usize,
}

impl CacheStats {
    /// Get the cache hit rate.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cached table names for one connection.
#[derive(Debug, Default)]
pub struct SchemaCache {
    names: RwLock<Option<Vec<String>>>,
    stats: RwLock<CacheStats>,
}

impl SchemaCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether names are currently loaded.
    pub fn is_loaded(&self) -> bool {
        self.names.read().is_some()
    }

    /// Table names, loading them on first use.
    pub async fn table_names<C>(&self, conn: &C) -> MigrateResult<Vec<String>>
    where
        C: SchemaConnection + ?Sized,
    {
        let cached = self.names.read().clone();
        if let Some(names) = cached {
            self.stats.write().hits += 1;
            return Ok(names);
        }

        let names = conn.table_names().await?;
        tracing::debug!(count = names.len(), "loaded table names");
        *self.names.write() = Some(names.clone());

        let mut stats = self.stats.write();
        stats.misses += 1;
        stats.cached_count = names.len();
        Ok(names)
    }

    /// Stored name of a table, matched case-insensitively.
    pub async fn resolve<C>(&self, conn: &C, table: &str) -> MigrateResult<Option<String>>
    where
        C: SchemaConnection + ?Sized,
    {
        Ok(self
            .table_names(conn)
            .await?
            .into_iter()
            .find(|n| n.eq_ignore_ascii_case(table)))
    }

    /// Whether a table exists, ignoring case.
    pub async fn exists<C>(&self, conn: &C, table: &str) -> MigrateResult<bool>
    where
        C: SchemaConnection + ?Sized,
    {
        Ok(self.resolve(conn, table).await?.is_some())
    }

    /// Drop the cached names; the next lookup reloads them.
    pub fn invalidate(&self) {
        *self.names.write() = None;
        let mut stats = self.stats.write();
        stats.invalidations += 1;
        stats.cached_count = 0;
    }

    /// Invalidate and reload immediately.
    pub async fn refresh<C>(&self, conn: &C) -> MigrateResult<Vec<String>>
    where
        C: SchemaConnection + ?Sized,
    {
        self.invalidate();
        self.table_names(conn).await
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }
}
