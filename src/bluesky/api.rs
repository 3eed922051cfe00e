// The agent capability: every AppView/PDS call the pipeline makes.
//
// Pipeline functions take `&dyn BskyApi` as an explicit parameter instead of
// reaching for a shared session. `XrpcClient` is the live implementation;
// tests substitute in-memory fakes.

use anyhow::Result;
use async_trait::async_trait;

use super::types::{
    FeedEntry, LikeRecord, Notification, Page, PostView, Preference, ProfileViewDetailed,
    ThreadNode,
};

/// Server-imposed ceiling on `getPosts` / `getProfiles` batch size.
pub const MAX_BATCH_SIZE: usize = 25;

/// Record collections the client writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Like,
    Repost,
}

impl RecordKind {
    pub fn collection(&self) -> &'static str {
        match self {
            RecordKind::Like => "app.bsky.feed.like",
            RecordKind::Repost => "app.bsky.feed.repost",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Like => write!(f, "like"),
            RecordKind::Repost => write!(f, "repost"),
        }
    }
}

/// Author feed server-side filters (`app.bsky.feed.getAuthorFeed#filter`).
///
/// The posts tab reads `posts_with_replies` too and drops organic replies
/// client-side, so reposted replies still show up there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorFeedFilter {
    PostsWithReplies,
    PostsWithMedia,
}

impl AuthorFeedFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorFeedFilter::PostsWithReplies => "posts_with_replies",
            AuthorFeedFilter::PostsWithMedia => "posts_with_media",
        }
    }
}

/// The protocol operations consumed by the aggregation pipeline.
///
/// Every method returns `Err` when the server reports a failure; callers
/// propagate with context rather than inspecting a success flag.
#[async_trait]
pub trait BskyApi: Send + Sync {
    /// The authenticated user's home timeline.
    async fn get_timeline(&self, cursor: Option<&str>) -> Result<Page<FeedEntry>>;

    /// A custom feed generator's feed, by generator AT-URI.
    async fn get_feed(&self, feed: &str, cursor: Option<&str>) -> Result<Page<FeedEntry>>;

    async fn get_author_feed(
        &self,
        actor: &str,
        filter: AuthorFeedFilter,
        cursor: Option<&str>,
    ) -> Result<Page<FeedEntry>>;

    async fn list_notifications(&self, cursor: Option<&str>) -> Result<Page<Notification>>;

    /// Hydrate up to `MAX_BATCH_SIZE` posts. Missing or deleted posts are
    /// simply absent from the result.
    async fn get_posts(&self, uris: &[String]) -> Result<Vec<PostView>>;

    /// Hydrate up to `MAX_BATCH_SIZE` profiles by DID or handle.
    async fn get_profiles(&self, actors: &[String]) -> Result<Vec<ProfileViewDetailed>>;

    async fn get_post_thread(&self, uri: &str, depth: Option<u16>) -> Result<ThreadNode>;

    async fn get_preferences(&self) -> Result<Vec<Preference>>;

    /// List like records in `repo` (`com.atproto.repo.listRecords`).
    async fn list_like_records(&self, repo: &str, cursor: Option<&str>)
        -> Result<Page<LikeRecord>>;

    /// Create a like/repost record pointing at a post; returns the record URI.
    async fn create_record(&self, kind: RecordKind, subject_uri: &str, subject_cid: &str)
        -> Result<String>;

    /// Delete a like/repost record by its AT-URI.
    async fn delete_record(&self, record_uri: &str) -> Result<()>;

    async fn resolve_handle(&self, handle: &str) -> Result<String>;
}
