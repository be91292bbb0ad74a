//! Per-cluster bounded pools of backend connections.
//!
//! Each registered cluster owns a pool that grows lazily up to its configured
//! connection limit and recycles released connections. A single mutex guards the
//! cluster map, the connection counters and the idle list together, so the invariant
//! `available <= num <= max` always holds. Acquisition never blocks: it either
//! succeeds immediately or fails with pool-exhausted, leaving backpressure to the
//! caller.

use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};

use hashbrown::HashMap;

use crate::backend::BackendConnection;
use crate::error::GeosliceError;
use crate::models::ClusterConfig;

/// Pool state for one cluster.
#[derive(Debug)]
struct ClusterPool {
    /// Cluster registration record
    config: ClusterConfig,
    /// Connections ever opened
    num_connections: usize,
    /// Idle connections, most recently released last
    idle: Vec<BackendConnection>,
}

/// Bounded, thread-safe pools of backend connections, one per registered cluster.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    clusters: Mutex<HashMap<String, ClusterPool>>,
}

impl ConnectionPool {
    /// Return a new ConnectionPool with no registered clusters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the cluster map, recovering from a poisoned mutex.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, ClusterPool>> {
        self.clusters.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register the pool for one cluster.
    ///
    /// Fails if a pool is already registered under the cluster id.
    ///
    /// # Arguments
    ///
    /// * `config`: The cluster registration record
    pub fn register(&self, config: ClusterConfig) -> Result<(), GeosliceError> {
        let mut clusters = self.lock();
        if clusters.contains_key(&config.id) {
            return Err(GeosliceError::DuplicatePool {
                cluster_id: config.id,
            });
        }
        tracing::info!(
            "registering connection pool for cluster {} ({}:{}, max {} connections)",
            config.id,
            config.coordinator_address,
            config.coordinator_port,
            config.max_connections
        );
        clusters.insert_unique_unchecked(
            config.id.clone(),
            ClusterPool {
                config,
                num_connections: 0,
                idle: Vec::new(),
            },
        );
        Ok(())
    }

    /// Check out a connection for a cluster.
    ///
    /// Hands out an idle connection if one exists, otherwise opens a new one while the
    /// pool is below its limit. Fails immediately with unknown-pool or pool-exhausted;
    /// there is no wait-for-available semantics.
    ///
    /// The returned guard owns the connection exclusively and returns it to the pool
    /// when dropped, on every exit path.
    ///
    /// # Arguments
    ///
    /// * `cluster_id`: The cluster to connect to
    pub fn acquire(self: &Arc<Self>, cluster_id: &str) -> Result<PooledConnection, GeosliceError> {
        let mut clusters = self.lock();
        let pool = clusters
            .get_mut(cluster_id)
            .ok_or_else(|| GeosliceError::PoolUnknown {
                cluster_id: cluster_id.to_string(),
            })?;
        let connection = match pool.idle.pop() {
            Some(connection) => connection,
            None => {
                if pool.num_connections >= pool.config.max_connections {
                    return Err(GeosliceError::PoolExhausted {
                        cluster_id: cluster_id.to_string(),
                        max_connections: pool.config.max_connections,
                    });
                }
                let connection = BackendConnection::open(
                    &pool.config.coordinator_address,
                    pool.config.coordinator_port,
                )?;
                pool.num_connections += 1;
                tracing::debug!(
                    "opened backend connection {} for cluster {} ({}/{})",
                    connection,
                    cluster_id,
                    pool.num_connections,
                    pool.config.max_connections
                );
                connection
            }
        };
        Ok(PooledConnection {
            pool: Arc::clone(self),
            cluster_id: cluster_id.to_string(),
            connection: Some(connection),
        })
    }

    /// Return a connection to its cluster's idle set.
    ///
    /// Fails with unknown-pool if the cluster is not registered, which indicates a
    /// lifecycle bug in the caller.
    ///
    /// # Arguments
    ///
    /// * `cluster_id`: The cluster the connection belongs to
    /// * `connection`: The connection being returned
    pub fn release(
        &self,
        cluster_id: &str,
        connection: BackendConnection,
    ) -> Result<(), GeosliceError> {
        let mut clusters = self.lock();
        let pool = clusters
            .get_mut(cluster_id)
            .ok_or_else(|| GeosliceError::PoolUnknown {
                cluster_id: cluster_id.to_string(),
            })?;
        pool.idle.push(connection);
        Ok(())
    }

    /// Snapshot of a cluster's `(available, num, max)` counters.
    #[cfg(test)]
    fn counters(&self, cluster_id: &str) -> (usize, usize, usize) {
        let clusters = self.lock();
        let pool = &clusters[cluster_id];
        (
            pool.idle.len(),
            pool.num_connections,
            pool.config.max_connections,
        )
    }
}

/// A checked-out backend connection.
///
/// Move-only guard: the connection is exclusively owned by the borrower and returned
/// to its pool exactly once when the guard drops, including on error paths.
#[derive(Debug)]
pub struct PooledConnection {
    pool: Arc<ConnectionPool>,
    cluster_id: String,
    connection: Option<BackendConnection>,
}

impl Deref for PooledConnection {
    type Target = BackendConnection;

    fn deref(&self) -> &Self::Target {
        // Present from acquire until drop.
        self.connection
            .as_ref()
            .unwrap_or_else(|| unreachable!("connection taken before drop"))
    }
}

impl Drop for PooledConnection {
    /// Return the connection to the pool.
    ///
    /// A release against an unregistered cluster is a lifecycle bug; it cannot be
    /// propagated from here, so it is logged loudly and the connection is closed.
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(err) = self.pool.release(&self.cluster_id, connection) {
                tracing::error!(
                    "dropping connection for unregistered cluster {}: {}",
                    self.cluster_id,
                    err
                );
            }
        }
    }
}
