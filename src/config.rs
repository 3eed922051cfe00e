use std::env;

use anyhow::Result;

use crate::bluesky::client::DEFAULT_SERVICE_URL;
use crate::hydrate::HydrationPolicy;

/// Which client build the moderation defaults should follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// iOS builds default adult content to off
    Ios,
    Android,
    Other,
}

impl Platform {
    fn from_env_value(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            "other" | "" => Ok(Platform::Other),
            other => anyhow::bail!("SKYLINE_PLATFORM must be ios, android or other (got '{other}')"),
        }
    }
}

/// Read an on/off env value. Anything but an explicit "off" spelling
/// (any case) counts as on.
fn flag_enabled(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

/// Central configuration loaded from environment variables.
///
/// Secrets come from env vars only. The .env file is loaded at startup via
/// dotenvy, before `Config::load` runs.
#[derive(Debug, Clone)]
pub struct Config {
    /// XRPC service to talk to (defaults to https://public.api.bsky.app).
    /// Use your PDS when an access token is set.
    pub service_url: String,
    /// An already-issued session access token (SKYLINE_ACCESS_JWT)
    pub access_jwt: String,
    /// DID of the account the token belongs to (SKYLINE_DID)
    pub did: String,
    pub platform: Platform,
    /// Fold notifications sharing reason + subject into one group
    pub group_notifications: bool,
    pub hydration: HydrationPolicy,
    pub tenor_api_key: String,
    pub feed_search_url: String,
    pub translate_api_key: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default; commands check what they need with the
    /// `require_*` helpers.
    pub fn load() -> Result<Self> {
        let platform = Platform::from_env_value(&env::var("SKYLINE_PLATFORM").unwrap_or_default())?;

        // Unset groups
        let group_notifications = env::var("SKYLINE_GROUP_NOTIFICATIONS")
            .map(|v| flag_enabled(&v))
            .unwrap_or(true);

        let hydration = match env::var("SKYLINE_HYDRATION") {
            Ok(value) => value.parse()?,
            Err(_) => HydrationPolicy::default(),
        };

        Ok(Self {
            service_url: env::var("SKYLINE_SERVICE_URL")
                .unwrap_or_else(|_| DEFAULT_SERVICE_URL.to_string()),
            access_jwt: env::var("SKYLINE_ACCESS_JWT").unwrap_or_default(),
            did: env::var("SKYLINE_DID").unwrap_or_default(),
            platform,
            group_notifications,
            hydration,
            tenor_api_key: env::var("TENOR_API_KEY").unwrap_or_default(),
            feed_search_url: env::var("FEED_SEARCH_URL").unwrap_or_default(),
            translate_api_key: env::var("GOOGLE_TRANSLATE_API_KEY").unwrap_or_default(),
        })
    }

    pub fn has_session(&self) -> bool {
        !self.access_jwt.is_empty() && !self.did.is_empty()
    }

    /// Check that a session is configured.
    /// Call this before the timeline, notifications, preferences or any write.
    pub fn require_auth(&self) -> Result<()> {
        if !self.has_session() {
            anyhow::bail!(
                "SKYLINE_ACCESS_JWT and SKYLINE_DID must both be set for this command.\n\
                 Add them to your .env file, and point SKYLINE_SERVICE_URL at your PDS."
            );
        }
        Ok(())
    }

    /// Check that the Tenor API key is configured.
    pub fn require_tenor(&self) -> Result<()> {
        if self.tenor_api_key.is_empty() {
            anyhow::bail!("TENOR_API_KEY not set. Add it to your .env file.");
        }
        Ok(())
    }

    /// Check that the feed search backend is configured.
    pub fn require_feed_search(&self) -> Result<()> {
        if self.feed_search_url.is_empty() {
            anyhow::bail!("FEED_SEARCH_URL not set. Add it to your .env file.");
        }
        Ok(())
    }

    /// Check that the Google Translate API key is configured.
    pub fn require_translate(&self) -> Result<()> {
        if self.translate_api_key.is_empty() {
            anyhow::bail!("GOOGLE_TRANSLATE_API_KEY not set. Add it to your .env file.");
        }
        Ok(())
    }
}
