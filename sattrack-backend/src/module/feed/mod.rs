//! Satellite position feed
//!
//! One GET against the configured endpoint per call, decoded into a
//! [`Position`](sattrack_common::Position). Retries belong to the poller.

pub mod client;
pub mod parser;
pub mod types;

#[cfg(test)]
pub(crate) mod scripted;

pub use client::{FeedClient, PositionFeed};
pub use parser::parse_position_json;
pub use types::FetchError;
