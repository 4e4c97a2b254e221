//! Domainsync - reconciles a search domain's index, index pattern, dashboard,
//! alert destination, and monitor against a declarative request.

pub mod alerting;
pub mod api;
pub mod callback;
pub mod config;
pub mod dashboard;
pub mod domain;
pub mod error;
pub mod es_http;
pub mod es_index;
pub mod es_query;
pub mod es_url;
pub mod execution;
pub mod handler;
pub mod probe;
pub mod reconcile;
pub mod remap;
pub mod request;
pub mod types;
