// Tenor GIF API pass-through.
//
// Thin wrapper: injects the API key and client key, drops unset
// parameters, and deserializes the documented response shapes.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const TENOR_API: &str = "https://tenor.googleapis.com/v2";

const CLIENT_KEY: &str = "skyline";

/// Formats requested for search and featured results.
const MEDIA_FILTER: &str = "nanomp4,tinymp4,mp4,gifpreview";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenorMedia {
    pub url: String,
    #[serde(default)]
    pub dims: Vec<u32>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenorGif {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content_description: String,
    #[serde(default)]
    pub created: f64,
    #[serde(default)]
    pub hasaudio: bool,
    /// Keyed by format name ("gifpreview", "tinymp4", …)
    #[serde(default)]
    pub media_formats: HashMap<String, TenorMedia>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub itemurl: String,
    #[serde(default)]
    pub url: String,
}

impl TenorGif {
    pub fn preview_url(&self) -> Option<&str> {
        self.media_formats.get("gifpreview").map(|m| m.url.as_str())
    }
}

/// Search and featured results: a page of GIFs plus the `next` position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenorResults {
    pub results: Vec<TenorGif>,
    #[serde(default)]
    pub next: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenorCategory {
    pub searchterm: String,
    pub path: String,
    pub image: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenorCategories {
    pub tags: Vec<TenorCategory>,
}

/// Suggestions, autocomplete and trending terms all return bare strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenorTerms {
    pub results: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryType {
    Featured,
    Trending,
}

impl CategoryType {
    fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Featured => "featured",
            CategoryType::Trending => "trending",
        }
    }
}

/// Client for the Tenor v2 API.
pub struct TenorClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TenorClient {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(TENOR_API, api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("skyline/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let query = query_params(params, &self.api_key);

        debug!(path = path, "Tenor request");

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .with_context(|| format!("Tenor request failed: {path}"))?;

        if !response.status().is_success() {
            anyhow::bail!("Tenor API error: {}", response.status());
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to deserialize Tenor {path} response"))
    }

    pub async fn search(
        &self,
        query: &str,
        locale: Option<&str>,
        limit: Option<u32>,
        cursor: Option<&str>,
    ) -> Result<TenorResults> {
        self.fetch(
            "/search",
            &[
                ("q", Some(query.to_string())),
                ("locale", locale.map(String::from)),
                ("limit", limit.map(|l| l.to_string())),
                ("pos", cursor.map(String::from)),
                ("mediafilter", Some(MEDIA_FILTER.to_string())),
            ],
        )
        .await
    }

    pub async fn featured(
        &self,
        locale: Option<&str>,
        limit: Option<u32>,
        cursor: Option<&str>,
    ) -> Result<TenorResults> {
        self.fetch(
            "/featured",
            &[
                ("locale", locale.map(String::from)),
                ("limit", limit.map(|l| l.to_string())),
                ("pos", cursor.map(String::from)),
                ("mediafilter", Some(MEDIA_FILTER.to_string())),
            ],
        )
        .await
    }

    pub async fn categories(
        &self,
        kind: Option<CategoryType>,
        locale: Option<&str>,
    ) -> Result<TenorCategories> {
        self.fetch(
            "/categories",
            &[
                ("type", kind.map(|k| k.as_str().to_string())),
                ("locale", locale.map(String::from)),
            ],
        )
        .await
    }

    pub async fn search_suggestions(&self, query: &str, locale: Option<&str>) -> Result<TenorTerms> {
        self.fetch(
            "/search_suggestions",
            &[("q", Some(query.to_string())), ("locale", locale.map(String::from))],
        )
        .await
    }

    pub async fn autocomplete(&self, query: &str, locale: Option<&str>) -> Result<TenorTerms> {
        self.fetch(
            "/autocomplete",
            &[("q", Some(query.to_string())), ("locale", locale.map(String::from))],
        )
        .await
    }

    pub async fn trending_terms(&self, locale: Option<&str>) -> Result<TenorTerms> {
        self.fetch("/trending_terms", &[("locale", locale.map(String::from))])
            .await
    }

    /// Look up GIFs by id.
    pub async fn posts(&self, ids: &[String]) -> Result<TenorResults> {
        self.fetch("/posts", &[("ids", Some(ids.join(",")))]).await
    }

    /// Tell Tenor a GIF was shared. Failures are logged, never returned.
    pub async fn register_share(&self, id: &str, query: Option<&str>) {
        let result: Result<serde_json::Value> = self
            .fetch(
                "/registershare",
                &[("id", Some(id.to_string())), ("q", query.map(String::from))],
            )
            .await;
        if let Err(e) = result {
            warn!(id = id, error = %e, "Failed to register Tenor share");
        }
    }
}

/// Build the query string: set parameters in order, then the credentials.
fn query_params(params: &[(&str, Option<String>)], api_key: &str) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| (k.to_string(), v.clone())))
        .chain([
            ("key".to_string(), api_key.to_string()),
            ("client_key".to_string(), CLIENT_KEY.to_string()),
        ])
        .collect()
}
