//! Feed wire record and error taxonomy

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport failure or non-success HTTP status
    #[error("feed unreachable: {0}")]
    Unreachable(String),

    /// Body could not be decoded or failed validation
    #[error("malformed feed response: {0}")]
    Malformed(String),
}

impl FetchError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, FetchError::Unreachable(_))
    }
}

/// The feed sends numbers, but string-encoded numbers are accepted too
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum NumberOrString {
    Number(f64),
    Text(String),
}

/// Raw JSON record returned by the position endpoint.
///
/// Every field is optional here so that a missing field surfaces as a
/// precise `Malformed` message instead of a generic serde error.
#[derive(Debug, Deserialize)]
pub(crate) struct RawPosition {
    #[serde(default)]
    pub latitude: Option<NumberOrString>,
    #[serde(default)]
    pub longitude: Option<NumberOrString>,
    /// Kilometres
    #[serde(default)]
    pub altitude: Option<NumberOrString>,
    /// km/h
    #[serde(default)]
    pub velocity: Option<NumberOrString>,
    /// Informative only; any non-string value decodes as unknown
    #[serde(default)]
    pub visibility: Option<serde_json::Value>,
    /// Unix seconds
    #[serde(default)]
    pub timestamp: Option<NumberOrString>,
}
