//! # Connection Pool
//!
//! Purpose: Share long-lived store connections between unrelated handles that
//! target the same endpoint and timeout.
//!
//! ## Design Principles
//! 1. **Canonical Keys**: A pooled connection is identified by the exact
//!    (host, port, timeout) triple, rendered with fixed precision so equal
//!    triples always collide in the map.
//! 2. **Insert-If-Absent**: Two callers racing to publish the same endpoint
//!    never leak a connection; the loser adopts the winner's entry and its
//!    own fresh socket is closed.
//! 3. **Minimal Locking**: The mutex guards only the map operation itself,
//!    never a network open.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use crate::conn::StoreConn;

/// Canonical identity of a pooled connection.
///
/// The timeout is rendered with six fixed decimals so representational noise
/// in the floating-point value cannot split one endpoint across two entries.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolKey {
    host: String,
    port: u16,
    timeout: f64,
}

impl PoolKey {
    /// Derives the key for `host:port` at the given timeout (seconds).
    pub fn new(host: &str, port: u16, timeout: f64) -> Self {
        PoolKey {
            host: host.to_string(),
            port,
            timeout,
        }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:.6}", self.host, self.port, self.timeout)
    }
}

/// Registry of shared, already-open store connections.
///
/// Cloning the pool clones a handle to the same registry, so callers that
/// should share persistent connections share a pool instance. Entries live
/// until the last pool handle is dropped; the pool does not evict.
#[derive(Clone, Default)]
pub struct ConnectionPool {
    inner: Arc<Mutex<HashMap<String, Arc<StoreConn>>>>,
}

impl ConnectionPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        ConnectionPool::default()
    }

    /// Looks up the shared connection for `key`, if one is registered.
    pub fn get(&self, key: &PoolKey) -> Option<Arc<StoreConn>> {
        let map = self.inner.lock().expect("pool mutex poisoned");
        let found = map.get(&key.to_string()).cloned();
        trace!(%key, hit = found.is_some(), "pool lookup");
        found
    }

    /// Publishes a freshly opened connection under `key`.
    ///
    /// Insert-if-absent: if another caller registered the same key first,
    /// the existing entry is returned and `conn` is dropped, closing its
    /// socket. The returned `Arc` is what the caller's handle should hold.
    pub fn put(&self, key: &PoolKey, conn: StoreConn) -> Arc<StoreConn> {
        let mut map = self.inner.lock().expect("pool mutex poisoned");
        match map.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                debug!(%key, "lost publish race, adopting pooled connection");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                debug!(%key, "registered persistent connection");
                entry.insert(Arc::new(conn)).clone()
            }
        }
    }

    /// Whether an entry exists for `key`.
    pub fn contains(&self, key: &PoolKey) -> bool {
        let map = self.inner.lock().expect("pool mutex poisoned");
        map.contains_key(&key.to_string())
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("pool mutex poisoned").len()
    }

    /// Whether the pool holds no connections.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
