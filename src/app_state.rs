use crate::catalog::Catalog;
use crate::cli::CommandLineArgs;
use crate::pool::ConnectionPool;

use std::sync::Arc;

/// Shared application state passed to each request handler.
pub struct AppState {
    /// Command line arguments.
    pub args: CommandLineArgs,

    /// Geo-array catalog, immutable after startup.
    pub catalog: Catalog,

    /// Per-cluster backend connection pools.
    pub pool: Arc<ConnectionPool>,
}

impl AppState {
    /// Create and return an [AppState].
    pub fn new(args: &CommandLineArgs, catalog: Catalog, pool: Arc<ConnectionPool>) -> Self {
        Self {
            args: args.clone(),
            catalog,
            pool,
        }
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;
