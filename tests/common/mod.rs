// In-memory BskyApi fake and lexicon fixtures shared by the integration tests.
//
// Fixtures are built from JSON so they go through the same serde path as
// real AppView responses.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use skyline::bluesky::api::{AuthorFeedFilter, BskyApi, RecordKind};
use skyline::bluesky::types::{
    FeedEntry, LikeRecord, Notification, Page, PostView, Preference, ProfileViewBasic,
    ProfileViewDetailed, ReplyTarget, ThreadNode,
};

/// One recorded call against the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Timeline(Option<String>),
    Feed(String),
    AuthorFeed(String, AuthorFeedFilter),
    Notifications(Option<String>),
    GetPosts(Vec<String>),
    GetProfiles(Vec<String>),
    Thread(String),
    LikeRecords(String),
    CreateRecord(RecordKind, String),
    DeleteRecord(String),
}

#[derive(Default)]
pub struct FakeApi {
    /// Posts `get_posts` can resolve, by URI
    pub posts: HashMap<String, PostView>,
    pub profiles: Vec<ProfileViewDetailed>,
    /// Feed pages keyed by the cursor that requests them (`None` = first page)
    pub feed_pages: HashMap<Option<String>, Page<FeedEntry>>,
    pub notification_pages: HashMap<Option<String>, Page<Notification>>,
    pub likes: Vec<LikeRecord>,
    pub likes_cursor: Option<String>,
    pub thread: Option<ThreadNode>,
    pub preferences: Vec<Preference>,
    /// Any `get_posts` chunk containing this URI fails
    pub failing_uri: Option<String>,
    pub fail_writes: bool,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts(mut self, posts: impl IntoIterator<Item = PostView>) -> Self {
        for p in posts {
            self.posts.insert(p.uri.clone(), p);
        }
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn get_posts_calls(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::GetPosts(uris) => Some(uris),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn feed_page(&self, cursor: Option<&str>) -> Page<FeedEntry> {
        self.feed_pages
            .get(&cursor.map(String::from))
            .cloned()
            .unwrap_or_else(|| Page::new(Vec::new(), None))
    }
}

#[async_trait]
impl BskyApi for FakeApi {
    async fn get_timeline(&self, cursor: Option<&str>) -> Result<Page<FeedEntry>> {
        self.record(Call::Timeline(cursor.map(String::from)));
        Ok(self.feed_page(cursor))
    }

    async fn get_feed(&self, feed: &str, cursor: Option<&str>) -> Result<Page<FeedEntry>> {
        self.record(Call::Feed(feed.to_string()));
        Ok(self.feed_page(cursor))
    }

    async fn get_author_feed(
        &self,
        actor: &str,
        filter: AuthorFeedFilter,
        cursor: Option<&str>,
    ) -> Result<Page<FeedEntry>> {
        self.record(Call::AuthorFeed(actor.to_string(), filter));
        Ok(self.feed_page(cursor))
    }

    async fn list_notifications(&self, cursor: Option<&str>) -> Result<Page<Notification>> {
        self.record(Call::Notifications(cursor.map(String::from)));
        Ok(self
            .notification_pages
            .get(&cursor.map(String::from))
            .cloned()
            .unwrap_or_else(|| Page::new(Vec::new(), None)))
    }

    async fn get_posts(&self, uris: &[String]) -> Result<Vec<PostView>> {
        self.record(Call::GetPosts(uris.to_vec()));
        if uris.len() > 25 {
            anyhow::bail!("getPosts called with {} uris", uris.len());
        }
        if let Some(ref failing) = self.failing_uri {
            if uris.contains(failing) {
                anyhow::bail!("Internal Server Error");
            }
        }
        Ok(uris.iter().filter_map(|u| self.posts.get(u).cloned()).collect())
    }

    async fn get_profiles(&self, actors: &[String]) -> Result<Vec<ProfileViewDetailed>> {
        self.record(Call::GetProfiles(actors.to_vec()));
        Ok(self
            .profiles
            .iter()
            .filter(|p| actors.contains(&p.did) || actors.contains(&p.handle))
            .cloned()
            .collect())
    }

    async fn get_post_thread(&self, uri: &str, _depth: Option<u16>) -> Result<ThreadNode> {
        self.record(Call::Thread(uri.to_string()));
        self.thread
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Post not found: {uri}"))
    }

    async fn get_preferences(&self) -> Result<Vec<Preference>> {
        Ok(self.preferences.clone())
    }

    async fn list_like_records(
        &self,
        repo: &str,
        _cursor: Option<&str>,
    ) -> Result<Page<LikeRecord>> {
        self.record(Call::LikeRecords(repo.to_string()));
        Ok(Page::new(self.likes.clone(), self.likes_cursor.clone()))
    }

    async fn create_record(
        &self,
        kind: RecordKind,
        subject_uri: &str,
        _subject_cid: &str,
    ) -> Result<String> {
        self.record(Call::CreateRecord(kind, subject_uri.to_string()));
        if self.fail_writes {
            anyhow::bail!("createRecord failed");
        }
        Ok(format!("at://did:plc:me/{}/3kfake", kind.collection()))
    }

    async fn delete_record(&self, record_uri: &str) -> Result<()> {
        self.record(Call::DeleteRecord(record_uri.to_string()));
        if self.fail_writes {
            anyhow::bail!("deleteRecord failed");
        }
        Ok(())
    }

    async fn resolve_handle(&self, handle: &str) -> Result<String> {
        Ok(format!("did:plc:{}", handle.replace('.', "")))
    }
}

// ============================================================
// Fixtures
// ============================================================

pub fn did_of(uri: &str) -> &str {
    uri.trim_start_matches("at://").split('/').next().unwrap_or_default()
}

pub fn post_uri(did: &str, rkey: &str) -> String {
    format!("at://{did}/app.bsky.feed.post/{rkey}")
}

pub fn author(did: &str) -> ProfileViewBasic {
    serde_json::from_value(json!({
        "did": did,
        "handle": format!("{}.bsky.social", did.trim_start_matches("did:plc:")),
    }))
    .unwrap()
}

pub fn blocked_author(did: &str) -> ProfileViewBasic {
    serde_json::from_value(json!({
        "did": did,
        "handle": format!("{}.bsky.social", did.trim_start_matches("did:plc:")),
        "viewer": {"blocking": format!("at://did:plc:me/app.bsky.graph.block/{did}")},
    }))
    .unwrap()
}

pub fn post(uri: &str) -> PostView {
    serde_json::from_value(json!({
        "uri": uri,
        "cid": format!("bafy-{}", uri.rsplit('/').next().unwrap_or_default()),
        "author": author(did_of(uri)),
        "record": {
            "$type": "app.bsky.feed.post",
            "text": format!("post {uri}"),
            "createdAt": "2024-05-01T12:00:00Z",
        },
        "replyCount": 0,
        "repostCount": 0,
        "likeCount": 0,
        "indexedAt": "2024-05-01T12:00:00Z",
    }))
    .unwrap()
}

pub fn labelled(mut post: PostView, val: &str) -> PostView {
    post.labels.push(
        serde_json::from_value(json!({"src": "did:plc:labeler", "uri": post.uri, "val": val}))
            .unwrap(),
    );
    post
}

pub fn with_images(mut post: PostView) -> PostView {
    post.embed = Some(json!({
        "$type": "app.bsky.embed.images#view",
        "images": [{"thumb": "https://cdn/t.jpg", "fullsize": "https://cdn/f.jpg", "alt": ""}],
    }));
    post
}

pub fn entry(post: PostView) -> FeedEntry {
    FeedEntry::from_post(post)
}

pub fn reply_entry(post: PostView, parent: ReplyTarget) -> FeedEntry {
    serde_json::from_value(json!({
        "post": post,
        "reply": {"root": parent, "parent": parent},
    }))
    .unwrap()
}

pub fn reposted(mut entry: FeedEntry, by_did: &str) -> FeedEntry {
    entry.reason = Some(
        serde_json::from_value(json!({
            "$type": "app.bsky.feed.defs#reasonRepost",
            "by": author(by_did),
            "indexedAt": "2024-05-01T13:00:00Z",
        }))
        .unwrap(),
    );
    entry
}

pub fn not_found(uri: &str) -> ReplyTarget {
    serde_json::from_value(json!({
        "$type": "app.bsky.feed.defs#notFoundPost",
        "uri": uri,
        "notFound": true,
    }))
    .unwrap()
}

pub fn blocked(uri: &str) -> ReplyTarget {
    serde_json::from_value(json!({
        "$type": "app.bsky.feed.defs#blockedPost",
        "uri": uri,
        "blocked": true,
        "author": {"did": did_of(uri)},
    }))
    .unwrap()
}

pub fn notification(uri: &str, reason: &str, subject: Option<&str>) -> Notification {
    serde_json::from_value(json!({
        "uri": uri,
        "cid": "bafy-notif",
        "author": author(did_of(uri)),
        "reason": reason,
        "reasonSubject": subject,
        "record": {},
        "isRead": false,
        "indexedAt": "2024-05-01T12:00:00Z",
    }))
    .unwrap()
}

pub fn like_record(subject_uri: &str, rkey: &str) -> LikeRecord {
    serde_json::from_value(json!({
        "uri": format!("at://did:plc:alice/app.bsky.feed.like/{rkey}"),
        "cid": "bafy-like",
        "value": {
            "$type": "app.bsky.feed.like",
            "subject": {"uri": subject_uri, "cid": "bafy-subject"},
            "createdAt": "2024-05-01T12:00:00Z",
        },
    }))
    .unwrap()
}
