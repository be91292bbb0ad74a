//! This file defines the geoslice binary entry point.

use std::sync::Arc;

use geoslice::app;
use geoslice::app_state::AppState;
use geoslice::catalog::Catalog;
use geoslice::cli;
use geoslice::metrics;
use geoslice::models::ConfigDocument;
use geoslice::pool::ConnectionPool;
use geoslice::server;
use geoslice::tracing;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    println!("{:?}", args);
    tracing::init_tracing();
    metrics::register_metrics();

    let document = ConfigDocument::from_file(&args.config_file)
        .expect("failed to load the configuration document");
    let catalog = Catalog::load(&document).expect("failed to load the geo-array catalog");
    let pool = Arc::new(ConnectionPool::new());
    for cluster in &document.clusters {
        pool.register(cluster.clone())
            .expect("failed to register a cluster connection pool");
    }

    let state = Arc::new(AppState::new(&args, catalog, pool));
    let service = app::service(state);
    server::serve(&args, service).await;
}
