//! Client for the backend array engine and its tabular result sets.
//!
//! The coordinator of each cluster accepts a textual query over HTTP and answers with
//! a JSON cell table. This module only composes requests and decodes results; query
//! execution itself is opaque to this service.

use std::fmt::Display;

use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Method, Request, StatusCode, Uri};
use serde::Deserialize;
use tracing::Instrument;

use crate::error::GeosliceError;
use crate::models::DType;

/// A value of any attribute data type.
///
/// This is an alias of the Number type from serde_json, an enum over i64, u64 and f64
/// with the additional constraint that floating point numbers must be finite.
pub type DValue = serde_json::Number;

/// One physical connection to a cluster coordinator.
///
/// Connections are opened lazily by the pool and handed out exclusively; the embedded
/// HTTP client keeps its own keep-alive state for the coordinator endpoint.
#[derive(Debug)]
pub struct BackendConnection {
    /// Underlying HTTP client
    client: Client<HttpConnector>,
    /// Coordinator query endpoint
    endpoint: Uri,
    /// A unique identifier for the connection
    id: String,
}

// Connections are compared by identifier in logs and tests.
impl Display for BackendConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl BackendConnection {
    /// Open a connection to a cluster coordinator.
    ///
    /// # Arguments
    ///
    /// * `address`: Coordinator host name or IP address
    /// * `port`: Coordinator port
    pub fn open(address: &str, port: u16) -> Result<Self, GeosliceError> {
        let endpoint = format!("http://{}:{}/query", address, port)
            .parse::<Uri>()
            .map_err(|_| GeosliceError::BackendEndpoint {
                address: address.to_string(),
                port,
            })?;
        Ok(Self {
            client: Client::new(),
            endpoint,
            id: uuid::Uuid::new_v4().to_string(),
        })
    }

    /// The unique identifier of this connection.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Execute a query string and decode the resulting cell table.
    ///
    /// # Arguments
    ///
    /// * `query`: Backend query string
    pub async fn execute(&self, query: &str) -> Result<CellTable, GeosliceError> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(&CONTENT_TYPE, mime::TEXT_PLAIN.to_string())
            .body(Body::from(query.to_string()))?;
        let response = self
            .client
            .request(request)
            .instrument(tracing::Span::current())
            .await?;
        if response.status() != StatusCode::OK {
            return Err(GeosliceError::BackendStatus {
                status: response.status().as_u16(),
            });
        }
        let body = hyper::body::to_bytes(response.into_body())
            .instrument(tracing::Span::current())
            .await?;
        let table: CellTable =
            serde_json::from_slice(&body).map_err(|err| GeosliceError::BackendDecode {
                detail: err.to_string(),
            })?;
        table.check()?;
        Ok(table)
    }
}

/// The tabular result set of one backend query.
///
/// Rows arrive in the backend's scan order; each row holds one value per attribute, in
/// the order of the `attributes` header.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CellTable {
    /// Attribute names, in column order
    pub attributes: Vec<String>,
    /// Cell rows in scan order
    pub cells: Vec<Vec<serde_json::Value>>,
}

impl CellTable {
    /// Verify that every row has one value per attribute.
    fn check(&self) -> Result<(), GeosliceError> {
        for (row, cell) in self.cells.iter().enumerate() {
            if cell.len() != self.attributes.len() {
                return Err(GeosliceError::BackendDecode {
                    detail: format!(
                        "row {} has {} values for {} attributes",
                        row,
                        cell.len(),
                        self.attributes.len()
                    ),
                });
            }
        }
        Ok(())
    }

    /// Number of cells in the result set.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the result set has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate the cells in scan order.
    pub fn reader(&self) -> CellReader<'_> {
        CellReader {
            table: self,
            row: 0,
        }
    }

    /// Column position of an attribute, if present.
    fn column_of(&self, attribute: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a == attribute)
    }
}

/// Iterator over the cells of a [CellTable], in scan order.
#[derive(Clone, Debug)]
pub struct CellReader<'a> {
    table: &'a CellTable,
    row: usize,
}

impl<'a> Iterator for CellReader<'a> {
    type Item = Cell<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let values = self.table.cells.get(self.row)?;
        self.row += 1;
        Some(Cell {
            table: self.table,
            values,
        })
    }
}

/// One cell of a result set, exposing typed per-attribute values.
#[derive(Clone, Copy, Debug)]
pub struct Cell<'a> {
    table: &'a CellTable,
    values: &'a [serde_json::Value],
}

impl<'a> Cell<'a> {
    /// The raw value of an attribute, if the attribute exists.
    pub fn value(&self, attribute: &str) -> Option<&'a serde_json::Value> {
        self.table.column_of(attribute).map(|col| &self.values[col])
    }

    /// The value of an attribute checked against its declared data type.
    ///
    /// Integer attributes must decode as integers; floating point attributes accept
    /// any finite number.
    ///
    /// # Arguments
    ///
    /// * `attribute`: Attribute name
    /// * `dtype`: The attribute's declared data type
    pub fn typed(&self, attribute: &str, dtype: DType) -> Result<DValue, GeosliceError> {
        let value = self
            .value(attribute)
            .ok_or_else(|| GeosliceError::NoSuchField {
                attribute: attribute.to_string(),
            })?;
        let number = value
            .as_number()
            .ok_or_else(|| GeosliceError::CellType {
                value: value.clone(),
                type_name: type_name(dtype),
            })?;
        let compatible = if dtype.is_float() {
            number.as_f64().is_some()
        } else {
            number.as_i64().is_some() || number.as_u64().is_some()
        };
        if !compatible {
            return Err(GeosliceError::CellType {
                value: value.clone(),
                type_name: type_name(dtype),
            });
        }
        Ok(number.clone())
    }
}

/// Static type name for error messages.
fn type_name(dtype: DType) -> &'static str {
    match dtype {
        DType::Int8 => "int8",
        DType::Int16 => "int16",
        DType::Int32 => "int32",
        DType::Int64 => "int64",
        DType::Uint8 => "uint8",
        DType::Uint16 => "uint16",
        DType::Uint32 => "uint32",
        DType::Uint64 => "uint64",
        DType::Float32 => "float32",
        DType::Float64 => "float64",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table() -> CellTable {
        serde_json::from_str(
            r#"{
                "attributes": ["ndvi", "evi"],
                "cells": [[1234, 2345], [-3000, 0], [42, 7]]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn open_connection() {
        let connection = BackendConnection::open("coordinator.example.com", 8080).unwrap();
        assert!(!connection.id().is_empty());
    }

    #[test]
    fn open_connection_ids_are_unique() {
        let a = BackendConnection::open("coordinator.example.com", 8080).unwrap();
        let b = BackendConnection::open("coordinator.example.com", 8080).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn open_connection_invalid_address() {
        let err = BackendConnection::open("not a host", 8080).unwrap_err();
        assert_eq!(
            "invalid backend coordinator endpoint not a host:8080",
            err.to_string()
        );
    }

    #[test]
    fn reader_scan_order() {
        let table = make_table();
        assert_eq!(3, table.len());
        assert!(!table.is_empty());
        let ndvi: Vec<i64> = table
            .reader()
            .map(|cell| cell.value("ndvi").unwrap().as_i64().unwrap())
            .collect();
        assert_eq!(vec![1234, -3000, 42], ndvi);
    }

    #[test]
    fn typed_integer() {
        let table = make_table();
        let cell = table.reader().next().unwrap();
        let value = cell.typed("evi", DType::Int16).unwrap();
        assert_eq!(2345, value.as_i64().unwrap());
    }

    #[test]
    fn typed_float_accepts_integers() {
        let table = make_table();
        let cell = table.reader().next().unwrap();
        let value = cell.typed("ndvi", DType::Float32).unwrap();
        assert_eq!(1234.0, value.as_f64().unwrap());
    }

    #[test]
    fn typed_integer_rejects_float() {
        let table: CellTable = serde_json::from_str(
            r#"{"attributes": ["ndvi"], "cells": [[0.5]]}"#,
        )
        .unwrap();
        let cell = table.reader().next().unwrap();
        let err = cell.typed("ndvi", DType::Int16).unwrap_err();
        assert_eq!("cell value 0.5 is not a valid int16", err.to_string());
    }

    #[test]
    fn typed_rejects_non_numbers() {
        let table: CellTable = serde_json::from_str(
            r#"{"attributes": ["ndvi"], "cells": [["missing"]]}"#,
        )
        .unwrap();
        let cell = table.reader().next().unwrap();
        let err = cell.typed("ndvi", DType::Int16).unwrap_err();
        assert_eq!("cell value \"missing\" is not a valid int16", err.to_string());
    }

    #[test]
    fn typed_unknown_attribute() {
        let table = make_table();
        let cell = table.reader().next().unwrap();
        let err = cell.typed("ndvi2", DType::Int16).unwrap_err();
        assert_eq!("no attribute named ndvi2", err.to_string());
    }

    #[test]
    fn ragged_rows_rejected() {
        let table: CellTable = serde_json::from_str(
            r#"{"attributes": ["ndvi", "evi"], "cells": [[1, 2], [3]]}"#,
        )
        .unwrap();
        let err = table.check().unwrap_err();
        assert_eq!(
            "backend result set is not valid: row 1 has 1 values for 2 attributes",
            err.to_string()
        );
    }
}
