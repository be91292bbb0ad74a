//! Coverage service HTTP API.

use crate::app_state::SharedAppState;
use crate::error::GeosliceError;
use crate::metrics;
use crate::models::GeoArray;
use crate::planner;
use crate::query::SubsetParams;
use crate::srs::SrsCache;
use crate::subset;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tower::{Layer, ServiceBuilder};
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

/// The list of registered coverages.
#[derive(Debug, Serialize)]
struct CoverageList {
    /// Registered `cluster_id:name` keys, sorted
    coverages: Vec<String>,
}

/// The result of one coverage subset request.
#[derive(Debug, Serialize)]
pub struct SubsetResponse {
    /// The `cluster_id:name` key of the coverage
    pub coverage: String,
    /// Selected attribute names, in response order
    pub attributes: Vec<String>,
    /// Column index range, inclusive
    pub x: (i64, i64),
    /// Row index range, inclusive
    pub y: (i64, i64),
    /// Temporal index range, inclusive
    pub t: (i64, i64),
    /// Cell rows in backend scan order, one value per attribute
    pub cells: Vec<Vec<serde_json::Value>>,
}

impl IntoResponse for SubsetResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Router-level service type.
pub type Service = NormalizePath<Router>;

/// Returns a [Service] for the coverage API.
///
/// # Arguments
///
/// * `state`: Shared application state
pub fn service(state: SharedAppState) -> Service {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

/// Returns a [Router] for the coverage API.
///
/// # Arguments
///
/// * `state`: Shared application state
pub fn router(state: SharedAppState) -> Router {
    fn v1(state: SharedAppState) -> Router {
        Router::new()
            .route("/coverages", get(list_coverages))
            .route("/coverages/:cluster_id/:name", get(describe_coverage))
            .route("/coverages/:cluster_id/:name/subset", get(subset_coverage))
            .with_state(state)
            .layer(
                ServiceBuilder::new().layer(
                    TraceLayer::new_for_http()
                        .on_request(metrics::request_counter)
                        .on_response(metrics::record_response_metrics),
                ),
            )
    }

    Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/v1", v1(state))
}

/// List the registered coverages.
async fn list_coverages(State(state): State<SharedAppState>) -> Json<CoverageList> {
    Json(CoverageList {
        coverages: state.catalog.list(),
    })
}

/// Describe one coverage from its catalog metadata.
async fn describe_coverage(
    State(state): State<SharedAppState>,
    Path((cluster_id, name)): Path<(String, String)>,
) -> Result<Json<GeoArray>, GeosliceError> {
    let array = state.catalog.get(&cluster_id, &name)?;
    Ok(Json((*array).clone()))
}

/// Execute one coverage subset request.
///
/// Parses the subset clauses, plans the backend query, executes it over a pooled
/// connection and returns the cell table. The pooled connection is released when the
/// guard drops, on every exit path.
async fn subset_coverage(
    State(state): State<SharedAppState>,
    Path((cluster_id, name)): Path<(String, String)>,
    params: SubsetParams,
) -> Result<SubsetResponse, GeosliceError> {
    let array = state.catalog.get(&cluster_id, &name)?;
    let clips = subset::parse_request(&params.subsets)?;
    let mut srs = SrsCache::new();
    let plan = planner::plan(&array, &clips, params.range_subset.as_deref(), &mut srs)?;
    tracing::debug!("planned backend query: {}", plan.query);

    let connection = state.pool.acquire(&cluster_id)?;
    metrics::backend_query_counter(&cluster_id);
    let table = connection.execute(&plan.query).await?;

    Ok(SubsetResponse {
        coverage: array.key(),
        attributes: plan.attributes.into_iter().map(|a| a.name).collect(),
        x: plan.x_range,
        y: plan.y_range,
        t: plan.t_range,
        cells: table.cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::AppState;
    use crate::catalog::Catalog;
    use crate::cli::CommandLineArgs;
    use crate::pool::ConnectionPool;
    use crate::test_utils;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use clap::Parser;
    use regex::Regex;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn make_state(register_pool: bool) -> SharedAppState {
        let args = CommandLineArgs::parse_from(["geoslice"]);
        let document = test_utils::make_config_document();
        let catalog = Catalog::load(&document).unwrap();
        let pool = Arc::new(ConnectionPool::new());
        if register_pool {
            pool.register(document.clusters[0].clone()).unwrap();
        }
        Arc::new(AppState::new(&args, catalog, pool))
    }

    async fn request(state: SharedAppState, uri: &str) -> (StatusCode, String) {
        let response = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn list_coverages_sorted() {
        let (status, body) = request(make_state(true), "/v1/coverages").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(r#"{"coverages":["scidb:mod13q1"]}"#, body);
    }

    #[tokio::test]
    async fn describe_coverage_metadata() {
        let (status, body) = request(make_state(true), "/v1/coverages/scidb/mod13q1").await;
        assert_eq!(StatusCode::OK, status);
        let described: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!("mod13q1", described["name"]);
        assert_eq!("ndvi", described["attributes"][0]["name"]);
        assert_eq!(
            serde_json::json!(["2023-01-01", "2023-01-17", "2023-02-02"]),
            described["timeline"]
        );
    }

    #[tokio::test]
    async fn describe_unknown_coverage() {
        let (status, body) = request(make_state(true), "/v1/coverages/scidb/nosuch").await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        assert!(body.contains("no geo-array registered under scidb:nosuch"));
    }

    #[tokio::test]
    async fn subset_malformed_clause() {
        let (status, body) = request(
            make_state(true),
            "/v1/coverages/scidb/mod13q1/subset?subset=x(1,",
        )
        .await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        let pattern = Regex::new(r#"malformed subset clause .* at character \d+"#).unwrap();
        assert!(pattern.is_match(&body));
    }

    #[tokio::test]
    async fn subset_unknown_attribute() {
        let (status, body) = request(
            make_state(true),
            "/v1/coverages/scidb/mod13q1/subset?rangesubset=ndvi2",
        )
        .await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert!(body.contains("no attribute named ndvi2"));
    }

    #[tokio::test]
    async fn subset_unregistered_cluster_pool() {
        // Parsing and planning succeed; acquisition fails before any network activity.
        let (status, body) = request(
            make_state(false),
            "/v1/coverages/scidb/mod13q1/subset?subset=x(-53.9,-53.1)",
        )
        .await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        assert!(body.contains("no connection pool registered for cluster scidb"));
    }

    #[tokio::test]
    async fn metrics_endpoint() {
        let (status, _) = request(make_state(true), "/metrics").await;
        assert_eq!(StatusCode::OK, status);
    }
}
