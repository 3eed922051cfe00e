// Feed generator search: pass-through to an external search service that
// answers `GET <url>?q=<query>` with `{ "feeds": [generatorView, …] }`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bluesky::types::ProfileViewBasic;

/// `app.bsky.feed.defs#generatorView` (fields used for listing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorView {
    pub uri: String,
    #[serde(default)]
    pub cid: String,
    pub display_name: String,
    pub creator: ProfileViewBasic,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSearchResults {
    pub feeds: Vec<GeneratorView>,
}

pub struct FeedSearchClient {
    client: reqwest::Client,
    url: String,
}

impl FeedSearchClient {
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("skyline/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Search feed generators. An empty query returns no feeds without
    /// making a request.
    pub async fn search(&self, query: &str) -> Result<FeedSearchResults> {
        if query.trim().is_empty() {
            return Ok(FeedSearchResults::default());
        }

        debug!(query = query, "Feed search request");

        let response = self
            .client
            .get(&self.url)
            .query(&[("q", query)])
            .send()
            .await
            .context("Feed search request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Feed search returned {status}");
        }

        response
            .json::<FeedSearchResults>()
            .await
            .context("Failed to parse feed search response")
    }
}
