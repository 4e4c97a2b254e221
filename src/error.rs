//! Error types at the step, request, and credential boundaries.

use thiserror::Error;

/// Why a single reconciliation step did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// A create, update, or delete call against the domain failed.
    #[error("remote call failed: {0}")]
    Remote(String),

    /// A read needed to decide the step failed.
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// The copied index never reached the source document count.
    #[error(
        "remap {source_index} -> {dest_index} did not converge after {attempts} attempts \
         (expected {expected} documents, last observed {observed:?})"
    )]
    NotConverged {
        source_index: String,
        dest_index: String,
        attempts: u32,
        expected: u64,
        observed: Option<u64>,
    },

    /// A resource the step depends on is missing.
    #[error("precondition not met: {0}")]
    Precondition(String),

    #[error("invalid remap: {0}")]
    InvalidRemap(String),
}

impl From<anyhow::Error> for StepError {
    fn from(err: anyhow::Error) -> Self {
        StepError::Remote(format!("{err:#}"))
    }
}

/// The triggering event could not be turned into a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("property {key} is not valid JSON: {reason}")]
    InvalidJson { key: &'static str, reason: String },

    #[error("property {key} must be a JSON object")]
    NotAnObject { key: &'static str },

    #[error("property {key} has invalid boolean value {value:?}")]
    InvalidBool { key: &'static str, value: String },

    #[error("property {key} has invalid integer value {value:?}")]
    InvalidInteger { key: &'static str, value: String },

    #[error("invalid index name: {0}")]
    InvalidIndex(String),
}

/// Signing credentials could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no domain user configured")]
    MissingUser,

    #[error("no domain password configured")]
    MissingPassword,

    #[error("http client setup failed: {0}")]
    Client(String),
}
