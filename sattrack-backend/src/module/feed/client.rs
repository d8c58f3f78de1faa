use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use sattrack_common::Position;

use super::parser::parse_position_json;
use super::types::FetchError;
use crate::config::FeedConfig;

/// Source of satellite positions, one request/response per call.
#[async_trait]
pub trait PositionFeed: Send + Sync {
    async fn fetch_position(&self) -> Result<Position, FetchError>;
}

/// HTTP client for the position endpoint.
pub struct FeedClient {
    client: Client,
    url: Url,
}

impl FeedClient {
    pub fn new(config: &FeedConfig) -> anyhow::Result<Self> {
        let url = config.parsed_url()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl PositionFeed for FeedClient {
    async fn fetch_position(&self) -> Result<Position, FetchError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Unreachable(format!("HTTP error {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Unreachable(format!("failed to read body: {}", e)))?;

        parse_position_json(&body, Utc::now())
    }
}
