// Google Cloud Translation (v2) pass-through.
//
// Posts are translated one at a time on request. The key goes in the
// X-goog-api-key header; the source language is left for Google to detect.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::language::language_name;

pub const TRANSLATE_API: &str = "https://translation.googleapis.com/language/translate/v2";

/// A translated post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Translation {
    pub text: String,
    /// Source language as detected by Google (ISO 639-1)
    pub language_code: String,
    /// English name of the source language, when known
    pub language: String,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    #[serde(default)]
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslatedText {
    translated_text: String,
    detected_source_language: String,
}

impl TranslateResponse {
    fn into_translation(self) -> Result<Translation> {
        let first = self
            .data
            .translations
            .into_iter()
            .next()
            .context("Translate API returned no translations")?;
        let language = language_name(&first.detected_source_language)
            .unwrap_or("Unknown")
            .to_string();
        Ok(Translation {
            text: first.translated_text,
            language_code: first.detected_source_language,
            language,
        })
    }
}

/// Client for the Translation v2 API.
pub struct TranslateClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl TranslateClient {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_url(TRANSLATE_API, api_key)
    }

    pub fn with_url(url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("skyline/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Translate `text` into `target` (an ISO 639-1 code such as "en").
    pub async fn translate(&self, text: &str, target: &str) -> Result<Translation> {
        let request = TranslateRequest {
            q: text,
            target,
            format: "text",
        };

        debug!(target = target, chars = text.chars().count(), "Translate request");

        let response = self
            .client
            .post(&self.url)
            .header("X-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to call Translate API")?;

        if !response.status().is_success() {
            anyhow::bail!("Translate API error: {}", response.status());
        }

        let body: TranslateResponse = response
            .json()
            .await
            .context("Failed to parse Translate API response")?;
        body.into_translation()
    }
}
