// XRPC client: the live `BskyApi` implementation over HTTP.
//
// Reads work unauthenticated against the public AppView. When an access
// token is configured, requests carry it as a bearer token, which is what
// the timeline, notifications, preferences and record writes need (point
// the base URL at your PDS in that case; it proxies app.bsky reads).

use anyhow::{Context, Result};
use async_trait::async_trait;
use atrium_api::{app, com};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::api::{AuthorFeedFilter, BskyApi, RecordKind, MAX_BATCH_SIZE};
use super::types::{
    FeedEntry, LikeRecord, Notification, Page, PostView, Preference, ProfileViewDetailed,
    ThreadNode,
};

/// Default public API endpoint for AT Protocol read operations.
pub const DEFAULT_SERVICE_URL: &str = "https://public.api.bsky.app";

/// Page size requested from list endpoints (API max is 100).
const PAGE_LIMIT: &str = "50";

/// HTTP client for XRPC endpoints, optionally authenticated.
pub struct XrpcClient {
    client: reqwest::Client,
    base_url: String,
    access_jwt: Option<String>,
    /// DID of the authenticated account (the repo that writes go to)
    did: Option<String>,
}

impl XrpcClient {
    /// Create an unauthenticated client pointing at the given base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("skyline/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_jwt: None,
            did: None,
        })
    }

    /// Attach an already-issued session: access token plus account DID.
    pub fn with_session(mut self, access_jwt: &str, did: &str) -> Self {
        self.access_jwt = Some(access_jwt.to_string());
        self.did = Some(did.to_string());
        self
    }

    /// Make a GET request to an XRPC endpoint and deserialize the response.
    ///
    /// `params` are query string key-value pairs. Use repeated keys for
    /// array parameters (e.g. `[("uris", "at://a"), ("uris", "at://b")]`).
    pub async fn xrpc_get<T: DeserializeOwned>(
        &self,
        nsid: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        self.xrpc_get_from(&self.base_url, nsid, params).await
    }

    async fn xrpc_get_from<T: DeserializeOwned>(
        &self,
        base_url: &str,
        nsid: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{base_url}/xrpc/{nsid}");

        debug!(nsid = nsid, "XRPC GET request");

        let mut request = self.client.get(&url).query(params);
        if let Some(ref token) = self.access_jwt {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("XRPC request failed: {nsid}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("XRPC {nsid} returned {status}: {body}");
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to deserialize {nsid} response"))
    }

    /// POST a JSON body to an XRPC procedure. Requires a session.
    async fn xrpc_post<B: Serialize, T: DeserializeOwned>(&self, nsid: &str, body: &B) -> Result<T> {
        let token = self
            .access_jwt
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("{nsid} requires an authenticated session"))?;
        let url = format!("{}/xrpc/{nsid}", self.base_url);

        debug!(nsid = nsid, "XRPC POST request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("XRPC request failed: {nsid}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("XRPC {nsid} returned {status}: {body}");
        }

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read {nsid} response"))?;
        // Procedures like deleteRecord may answer with an empty body.
        let bytes: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
        serde_json::from_slice(bytes).with_context(|| format!("Failed to deserialize {nsid} response"))
    }

    fn session_did(&self) -> Result<&str> {
        self.did
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No account DID configured for record writes"))
    }

    /// Look up the PDS service endpoint for a DID.
    ///
    /// `did:plc` documents come from plc.directory; `did:web` documents from
    /// the domain's `/.well-known/did.json`. Repo listings
    /// (`com.atproto.repo.*`) have to go to the hosting PDS.
    pub async fn resolve_pds_url(&self, did: &str) -> Result<String> {
        let url = if let Some(host) = did.strip_prefix("did:web:") {
            format!("https://{host}/.well-known/did.json")
        } else {
            format!("https://plc.directory/{did}")
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch DID document for {did}"))?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("DID document lookup returned {status} for {did}");
        }

        let doc: DidDocument = response
            .json()
            .await
            .context("Failed to parse DID document")?;

        doc.service
            .iter()
            .find(|s| s.id == "#atproto_pds" || s.id.ends_with("#atproto_pds"))
            .map(|s| s.service_endpoint.trim_end_matches('/').to_string())
            .ok_or_else(|| anyhow::anyhow!("No PDS service found in DID document for {did}"))
    }
}

#[async_trait]
impl BskyApi for XrpcClient {
    async fn get_timeline(&self, cursor: Option<&str>) -> Result<Page<FeedEntry>> {
        let mut params = vec![("limit", PAGE_LIMIT)];
        if let Some(c) = cursor {
            params.push(("cursor", c));
        }
        let output: FeedOutput = self
            .xrpc_get(app::bsky::feed::get_timeline::NSID, &params)
            .await
            .context("Failed to fetch feed")?;
        Ok(Page::new(output.feed, output.cursor))
    }

    async fn get_feed(&self, feed: &str, cursor: Option<&str>) -> Result<Page<FeedEntry>> {
        let mut params = vec![("feed", feed), ("limit", PAGE_LIMIT)];
        if let Some(c) = cursor {
            params.push(("cursor", c));
        }
        let output: FeedOutput = self
            .xrpc_get(app::bsky::feed::get_feed::NSID, &params)
            .await
            .context("Failed to fetch feed")?;
        Ok(Page::new(output.feed, output.cursor))
    }

    async fn get_author_feed(
        &self,
        actor: &str,
        filter: AuthorFeedFilter,
        cursor: Option<&str>,
    ) -> Result<Page<FeedEntry>> {
        let mut params = vec![
            ("actor", actor),
            ("filter", filter.as_str()),
            ("limit", PAGE_LIMIT),
        ];
        if let Some(c) = cursor {
            params.push(("cursor", c));
        }
        let output: FeedOutput = self
            .xrpc_get(app::bsky::feed::get_author_feed::NSID, &params)
            .await
            .with_context(|| format!("Failed to fetch feed for @{actor}"))?;
        Ok(Page::new(output.feed, output.cursor))
    }

    async fn list_notifications(&self, cursor: Option<&str>) -> Result<Page<Notification>> {
        let mut params = vec![("limit", PAGE_LIMIT)];
        if let Some(c) = cursor {
            params.push(("cursor", c));
        }
        let output: NotificationsOutput = self
            .xrpc_get(app::bsky::notification::list_notifications::NSID, &params)
            .await
            .context("Failed to fetch notifications")?;
        Ok(Page::new(output.notifications, output.cursor))
    }

    async fn get_posts(&self, uris: &[String]) -> Result<Vec<PostView>> {
        if uris.len() > MAX_BATCH_SIZE {
            anyhow::bail!(
                "getPosts accepts at most {MAX_BATCH_SIZE} URIs, got {}",
                uris.len()
            );
        }
        let params: Vec<(&str, &str)> = uris.iter().map(|u| ("uris", u.as_str())).collect();
        let output: PostsOutput = self
            .xrpc_get(app::bsky::feed::get_posts::NSID, &params)
            .await
            .context("Failed to fetch posts")?;
        Ok(output.posts)
    }

    async fn get_profiles(&self, actors: &[String]) -> Result<Vec<ProfileViewDetailed>> {
        if actors.len() > MAX_BATCH_SIZE {
            anyhow::bail!(
                "getProfiles accepts at most {MAX_BATCH_SIZE} actors, got {}",
                actors.len()
            );
        }
        let params: Vec<(&str, &str)> = actors.iter().map(|a| ("actors", a.as_str())).collect();
        let output: ProfilesOutput = self
            .xrpc_get(app::bsky::actor::get_profiles::NSID, &params)
            .await
            .context("Failed to fetch profiles")?;
        Ok(output.profiles)
    }

    async fn get_post_thread(&self, uri: &str, depth: Option<u16>) -> Result<ThreadNode> {
        let depth = depth.map(|d| d.to_string());
        let mut params = vec![("uri", uri)];
        if let Some(ref d) = depth {
            params.push(("depth", d.as_str()));
        }
        let output: ThreadOutput = self
            .xrpc_get(app::bsky::feed::get_post_thread::NSID, &params)
            .await
            .context("Failed to fetch post thread")?;
        Ok(output.thread)
    }

    async fn get_preferences(&self) -> Result<Vec<Preference>> {
        let output: PreferencesOutput = self
            .xrpc_get(app::bsky::actor::get_preferences::NSID, &[])
            .await
            .context("Could not get preferences")?;
        Ok(output.preferences)
    }

    async fn list_like_records(
        &self,
        repo: &str,
        cursor: Option<&str>,
    ) -> Result<Page<LikeRecord>> {
        let did = if repo.starts_with("did:") {
            repo.to_string()
        } else {
            self.resolve_handle(repo).await?
        };
        let pds_url = self.resolve_pds_url(&did).await?;

        let mut params = vec![
            ("repo", did.as_str()),
            ("collection", RecordKind::Like.collection()),
            ("limit", PAGE_LIMIT),
        ];
        if let Some(c) = cursor {
            params.push(("cursor", c));
        }
        let output: ListRecordsOutput<LikeRecord> = self
            .xrpc_get_from(&pds_url, com::atproto::repo::list_records::NSID, &params)
            .await
            .with_context(|| format!("Failed to list likes for {repo}"))?;
        Ok(Page::new(output.records, output.cursor))
    }

    async fn create_record(
        &self,
        kind: RecordKind,
        subject_uri: &str,
        subject_cid: &str,
    ) -> Result<String> {
        let repo = self.session_did()?;
        let collection = kind.collection();
        let body = serde_json::json!({
            "repo": repo,
            "collection": collection,
            "record": {
                "$type": collection,
                "subject": { "uri": subject_uri, "cid": subject_cid },
                "createdAt": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            },
        });
        let output: CreateRecordOutput = self
            .xrpc_post(com::atproto::repo::create_record::NSID, &body)
            .await
            .with_context(|| format!("Failed to create {kind}"))?;
        Ok(output.uri)
    }

    async fn delete_record(&self, record_uri: &str) -> Result<()> {
        let (repo, collection, rkey) = split_at_uri(record_uri)
            .ok_or_else(|| anyhow::anyhow!("Not a record AT-URI: {record_uri}"))?;
        let body = serde_json::json!({
            "repo": repo,
            "collection": collection,
            "rkey": rkey,
        });
        let _: serde_json::Value = self
            .xrpc_post(com::atproto::repo::delete_record::NSID, &body)
            .await
            .with_context(|| format!("Failed to delete record {record_uri}"))?;
        Ok(())
    }

    async fn resolve_handle(&self, handle: &str) -> Result<String> {
        let resp: ResolveHandleResponse = self
            .xrpc_get(
                com::atproto::identity::resolve_handle::NSID,
                &[("handle", handle)],
            )
            .await
            .with_context(|| format!("Failed to resolve handle @{handle}"))?;
        Ok(resp.did)
    }
}

/// Split `at://<authority>/<collection>/<rkey>` into its three parts.
pub fn split_at_uri(uri: &str) -> Option<(&str, &str, &str)> {
    let rest = uri.strip_prefix("at://")?;
    let mut parts = rest.splitn(3, '/');
    let authority = parts.next().filter(|s| !s.is_empty())?;
    let collection = parts.next().filter(|s| !s.is_empty())?;
    let rkey = parts.next().filter(|s| !s.is_empty() && !s.contains('/'))?;
    Some((authority, collection, rkey))
}

/// Build the AT-URI of a post from its author DID and record key.
pub fn post_uri(did: &str, rkey: &str) -> String {
    format!("at://{did}/app.bsky.feed.post/{rkey}")
}

// -- Serde types for XRPC outputs --

#[derive(Deserialize)]
struct FeedOutput {
    feed: Vec<FeedEntry>,
    cursor: Option<String>,
}

#[derive(Deserialize)]
struct NotificationsOutput {
    notifications: Vec<Notification>,
    cursor: Option<String>,
}

#[derive(Deserialize)]
struct PostsOutput {
    posts: Vec<PostView>,
}

#[derive(Deserialize)]
struct ProfilesOutput {
    profiles: Vec<ProfileViewDetailed>,
}

#[derive(Deserialize)]
struct ThreadOutput {
    thread: ThreadNode,
}

#[derive(Deserialize)]
struct PreferencesOutput {
    preferences: Vec<Preference>,
}

#[derive(Deserialize)]
struct ListRecordsOutput<T> {
    records: Vec<T>,
    cursor: Option<String>,
}

#[derive(Deserialize)]
struct CreateRecordOutput {
    uri: String,
}

#[derive(Deserialize)]
struct ResolveHandleResponse {
    did: String,
}

#[derive(Deserialize)]
struct DidDocument {
    service: Vec<DidService>,
}

#[derive(Deserialize)]
struct DidService {
    id: String,
    #[serde(rename = "serviceEndpoint")]
    service_endpoint: String,
}
