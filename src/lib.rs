//! This crate provides a web service exposing multi-dimensional, time-indexed raster
//! geo-arrays for subsetted retrieval. Clients restrict a coverage along its spatial
//! and temporal axes and select a subset of its attributes; the service plans a
//! bounded-range query, executes it on the backend array engine cluster that stores
//! the coverage, and returns the resulting cell table. Subsetting close to the data
//! keeps the volume transferred to the client proportional to the requested window
//! rather than the whole array.
//!
//! The service is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team on top of various popular
//!   components, including the [hyper] HTTP library, which is also used for the
//!   backend cluster connections.
//! * [Serde](serde) performs (de)serialisation of JSON configuration, request and
//!   response data.
//! * [Prometheus](prometheus) exposes request and backend query metrics.

pub mod app;
pub mod app_state;
pub mod backend;
pub mod catalog;
pub mod cli;
pub mod error;
pub mod grid;
pub mod metrics;
pub mod models;
pub mod planner;
pub mod pool;
pub mod query;
pub mod server;
pub mod srs;
pub mod subset;
#[cfg(test)]
pub mod test_utils;
pub mod timeline;
pub mod tracing;
