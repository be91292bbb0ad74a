//! Error handling.

use axum::{
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tracing::{event, Level};

/// Geoslice server error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum GeosliceError {
    /// Unknown geo-array requested
    #[error("no geo-array registered under {key}")]
    ArrayNotFound { key: String },

    /// Attempt to register a geo-array under a key already in use
    #[error("a geo-array is already registered under {key}")]
    DuplicateArray { key: String },

    /// Unknown time point label
    #[error("time point {label} is not present in the timeline")]
    TimeNotFound { label: String },

    /// Timeline position out of range
    #[error("timeline position {position} is out of range (length {length})")]
    TimePositionOutOfRange { position: usize, length: usize },

    /// Empty time interval after endpoint resolution
    #[error("time interval [{begin}, {end}] selects no time points")]
    TimeIntervalEmpty { begin: String, end: String },

    /// Dimension constructed with inverted bounds
    #[error("dimension {name} has min_index {min_index} greater than max_index {max_index}")]
    DimensionBounds {
        name: String,
        min_index: i64,
        max_index: i64,
    },

    /// Timeline length does not match the temporal dimension
    #[error("timeline has {labels} labels but the temporal dimension has size {size}")]
    TimelineLengthMismatch { labels: usize, size: i64 },

    /// Malformed subset clause
    #[error("malformed subset clause {clause:?} at character {position}: {reason}")]
    SubsetSyntax {
        clause: String,
        position: usize,
        reason: &'static str,
    },

    /// The same axis appears in more than one subset clause
    #[error("axis {axis} appears in more than one subset clause")]
    DuplicateAxis { axis: String },

    /// A subset clause is inconsistent with the geo-array's dimensions
    #[error("invalid subset for axis {axis}: {reason}")]
    InvalidAxis { axis: String, reason: String },

    /// An attribute named in the range subset does not exist
    #[error("no attribute named {attribute}")]
    NoSuchField { attribute: String },

    /// Unresolvable spatial reference system
    #[error("spatial reference system {srid} is not supported")]
    UnknownSrid { srid: u32 },

    /// Coordinate transform failure
    #[error("cannot transform coordinates from srid {source_srid} to srid {target_srid}")]
    Transform { source_srid: u32, target_srid: u32 },

    /// No connection pool registered for a cluster
    #[error("no connection pool registered for cluster {cluster_id}")]
    PoolUnknown { cluster_id: String },

    /// Attempt to register a second pool for the same cluster
    #[error("a connection pool is already registered for cluster {cluster_id}")]
    DuplicatePool { cluster_id: String },

    /// All connections for a cluster are in use
    #[error("connection pool for cluster {cluster_id} is exhausted ({max_connections} in use)")]
    PoolExhausted {
        cluster_id: String,
        max_connections: usize,
    },

    /// Error reading the configuration document
    #[error("failed to read configuration document")]
    ConfigIo(#[from] std::io::Error),

    /// Structural error in the configuration document
    #[error("configuration document is not valid")]
    ConfigParse(#[from] serde_json::Error),

    /// Error validating the configuration document
    #[error("configuration document is not valid")]
    ConfigValidation(#[from] validator::ValidationErrors),

    /// Invalid backend coordinator endpoint
    #[error("invalid backend coordinator endpoint {address}:{port}")]
    BackendEndpoint { address: String, port: u16 },

    /// Error building a backend request
    #[error("failed to build backend request")]
    BackendBuild(#[from] hyper::http::Error),

    /// Error sending a query to the backend array engine
    #[error("error communicating with the backend array engine")]
    BackendRequest(#[from] hyper::Error),

    /// Backend array engine rejected or failed the query
    #[error("backend array engine returned status {status}")]
    BackendStatus { status: u16 },

    /// Backend result set could not be decoded
    #[error("backend result set is not valid: {detail}")]
    BackendDecode { detail: String },

    /// Backend cell value incompatible with the attribute's declared data type
    #[error("cell value {value} is not a valid {type_name}")]
    CellType {
        value: serde_json::Value,
        type_name: &'static str,
    },
}

impl IntoResponse for GeosliceError {
    /// Convert from a `GeosliceError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut caused_by = None;
        let mut current = error.source();
        while let Some(source) = current {
            let mut causes: Vec<String> = caused_by.unwrap_or_default();
            causes.push(source.to_string());
            caused_by = Some(causes);
            current = source.source();
        }
        // Remove duplicate entries.
        if let Some(caused_by) = caused_by.as_mut() {
            caused_by.dedup()
        }
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 404 not found ErrorResponse
    fn not_found<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::NOT_FOUND, error)
    }

    /// Return a 502 bad gateway ErrorResponse
    fn bad_gateway<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_GATEWAY, error)
    }

    /// Return a 503 service unavailable ErrorResponse
    fn service_unavailable<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, error)
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<GeosliceError> for ErrorResponse {
    /// Convert from a `GeosliceError` into an `ErrorResponse`.
    fn from(error: GeosliceError) -> Self {
        let response = match &error {
            // Not found
            GeosliceError::ArrayNotFound { .. }
            | GeosliceError::TimeNotFound { .. }
            | GeosliceError::PoolUnknown { .. } => Self::not_found(&error),

            // Bad request
            GeosliceError::TimePositionOutOfRange { .. }
            | GeosliceError::TimeIntervalEmpty { .. }
            | GeosliceError::SubsetSyntax { .. }
            | GeosliceError::DuplicateAxis { .. }
            | GeosliceError::InvalidAxis { .. }
            | GeosliceError::NoSuchField { .. }
            | GeosliceError::UnknownSrid { .. }
            | GeosliceError::Transform { .. } => Self::bad_request(&error),

            // Service busy
            GeosliceError::PoolExhausted { .. } => Self::service_unavailable(&error),

            // Upstream failure
            GeosliceError::BackendBuild(_)
            | GeosliceError::BackendRequest(_)
            | GeosliceError::BackendStatus { .. }
            | GeosliceError::BackendDecode { .. }
            | GeosliceError::CellType { .. } => Self::bad_gateway(&error),

            // Internal server error. The remaining variants can only occur at startup or
            // through a lifecycle bug, so treat them as server faults.
            GeosliceError::DuplicateArray { .. }
            | GeosliceError::BackendEndpoint { .. }
            | GeosliceError::DimensionBounds { .. }
            | GeosliceError::TimelineLengthMismatch { .. }
            | GeosliceError::DuplicatePool { .. }
            | GeosliceError::ConfigIo(_)
            | GeosliceError::ConfigParse(_)
            | GeosliceError::ConfigValidation(_) => Self::internal_server_error(&error),
        };

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use hyper::HeaderMap;

    // Jump through the hoops to get the body as a string.
    async fn body_string(response: Response) -> String {
        String::from_utf8(
            hyper::body::to_bytes(response.into_body())
                .await
                .unwrap()
                .to_vec(),
        )
        .unwrap()
    }

    async fn test_geoslice_error(
        error: GeosliceError,
        status: StatusCode,
        message: &str,
        caused_by: Option<Vec<&'static str>>,
    ) {
        let response = error.into_response();
        assert_eq!(status, response.status());
        let mut headers = HeaderMap::new();
        headers.insert(&header::CONTENT_TYPE, "application/json".parse().unwrap());
        assert_eq!(headers, *response.headers());
        let error_response: ErrorResponse =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(message.to_string(), error_response.error.message);
        // Map Vec items from str to String
        let caused_by = caused_by.map(|cb| cb.iter().map(|s| s.to_string()).collect());
        assert_eq!(caused_by, error_response.error.caused_by);
    }

    #[tokio::test]
    async fn array_not_found() {
        let error = GeosliceError::ArrayNotFound {
            key: "scidb:mod13q1".to_string(),
        };
        let message = "no geo-array registered under scidb:mod13q1";
        test_geoslice_error(error, StatusCode::NOT_FOUND, message, None).await;
    }

    #[tokio::test]
    async fn time_not_found() {
        let error = GeosliceError::TimeNotFound {
            label: "2001-02-03".to_string(),
        };
        let message = "time point 2001-02-03 is not present in the timeline";
        test_geoslice_error(error, StatusCode::NOT_FOUND, message, None).await;
    }

    #[tokio::test]
    async fn subset_syntax() {
        let error = GeosliceError::SubsetSyntax {
            clause: "x(1,".to_string(),
            position: 4,
            reason: "unexpected end of input",
        };
        let message = "malformed subset clause \"x(1,\" at character 4: unexpected end of input";
        test_geoslice_error(error, StatusCode::BAD_REQUEST, message, None).await;
    }

    #[tokio::test]
    async fn duplicate_axis() {
        let error = GeosliceError::DuplicateAxis {
            axis: "col_id".to_string(),
        };
        let message = "axis col_id appears in more than one subset clause";
        test_geoslice_error(error, StatusCode::BAD_REQUEST, message, None).await;
    }

    #[tokio::test]
    async fn no_such_field() {
        let error = GeosliceError::NoSuchField {
            attribute: "ndvi2".to_string(),
        };
        let message = "no attribute named ndvi2";
        test_geoslice_error(error, StatusCode::BAD_REQUEST, message, None).await;
    }

    #[tokio::test]
    async fn transform() {
        let error = GeosliceError::Transform {
            source_srid: 4326,
            target_srid: 100001,
        };
        let message = "cannot transform coordinates from srid 4326 to srid 100001";
        test_geoslice_error(error, StatusCode::BAD_REQUEST, message, None).await;
    }

    #[tokio::test]
    async fn pool_exhausted() {
        let error = GeosliceError::PoolExhausted {
            cluster_id: "scidb".to_string(),
            max_connections: 4,
        };
        let message = "connection pool for cluster scidb is exhausted (4 in use)";
        test_geoslice_error(error, StatusCode::SERVICE_UNAVAILABLE, message, None).await;
    }

    #[tokio::test]
    async fn backend_status() {
        let error = GeosliceError::BackendStatus { status: 500 };
        let message = "backend array engine returned status 500";
        test_geoslice_error(error, StatusCode::BAD_GATEWAY, message, None).await;
    }

    #[tokio::test]
    async fn config_parse() {
        let parse_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = GeosliceError::ConfigParse(parse_error);
        let message = "configuration document is not valid";
        let caused_by = Some(vec!["EOF while parsing an object at line 1 column 1"]);
        test_geoslice_error(error, StatusCode::INTERNAL_SERVER_ERROR, message, caused_by).await;
    }

    #[tokio::test]
    async fn config_validation() {
        let mut validation_errors = validator::ValidationErrors::new();
        let validation_error = validator::ValidationError::new("foo");
        validation_errors.add("bar", validation_error);
        let error = GeosliceError::ConfigValidation(validation_errors);
        let message = "configuration document is not valid";
        let caused_by = Some(vec!["bar: Validation error: foo [{}]"]);
        test_geoslice_error(error, StatusCode::INTERNAL_SERVER_ERROR, message, caused_by).await;
    }
}
