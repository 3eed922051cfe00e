// Lexicon view types: the subset of `app.bsky.*` response shapes the
// aggregation pipeline reads.
//
// Union-typed fields (reply parents, feed reasons, thread nodes,
// preferences) are modelled as internally tagged enums keyed on `$type`,
// with an `Unknown` catch-all so new lexicon variants don't break decoding.

use serde::{Deserialize, Serialize};

/// `app.bsky.actor.defs#viewerState`: the viewer's relationship to an actor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorViewerState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<bool>,
    /// URI of the viewer's block record, if the viewer blocks this actor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking: Option<String>,
}

/// `app.bsky.actor.defs#profileViewBasic`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileViewBasic {
    pub did: String,
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer: Option<ActorViewerState>,
}

impl ProfileViewBasic {
    /// True when either side of the relationship has blocked the other.
    pub fn is_blocked(&self) -> bool {
        self.viewer
            .as_ref()
            .is_some_and(|v| v.blocked_by == Some(true) || v.blocking.is_some())
    }
}

/// `app.bsky.actor.defs#profileViewDetailed` (fields used by the CLI).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileViewDetailed {
    pub did: String,
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follows_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posts_count: Option<i64>,
}

/// `com.atproto.label.defs#label`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub val: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cts: Option<String>,
}

/// `app.bsky.feed.defs#viewerState`: the viewer's like/repost records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostViewerState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repost: Option<String>,
}

/// `app.bsky.feed.defs#postView`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub uri: String,
    pub cid: String,
    pub author: ProfileViewBasic,
    /// The raw `app.bsky.feed.post` record.
    pub record: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repost_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_count: Option<i64>,
    pub indexed_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer: Option<PostViewerState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    /// ISO 639-1 code detected locally from the text. Never sent by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl PostView {
    /// The post text, or an empty string if the record isn't a post.
    pub fn text(&self) -> &str {
        self.record
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
    }

    /// Whether the post carries an image embed (directly or alongside a quote).
    pub fn has_images(&self) -> bool {
        let Some(embed) = &self.embed else {
            return false;
        };
        match embed.get("$type").and_then(|t| t.as_str()) {
            Some("app.bsky.embed.images#view") => true,
            Some("app.bsky.embed.recordWithMedia#view") => embed
                .get("media")
                .and_then(|m| m.get("$type"))
                .and_then(|t| t.as_str())
                == Some("app.bsky.embed.images#view"),
            _ => false,
        }
    }
}

/// `app.bsky.feed.defs#notFoundPost`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotFoundPost {
    pub uri: String,
}

/// `app.bsky.feed.defs#blockedPost`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedPost {
    pub uri: String,
}

/// The parent or root of a reply, as returned inside a feed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum ReplyTarget {
    #[serde(rename = "app.bsky.feed.defs#postView")]
    Post(PostView),
    #[serde(rename = "app.bsky.feed.defs#notFoundPost")]
    NotFound(NotFoundPost),
    #[serde(rename = "app.bsky.feed.defs#blockedPost")]
    Blocked(BlockedPost),
    #[serde(other)]
    Unknown,
}

impl ReplyTarget {
    /// The post, if this target is a post the viewer is allowed to see.
    pub fn visible_post(&self) -> Option<&PostView> {
        match self {
            ReplyTarget::Post(post) if !post.author.is_blocked() => Some(post),
            _ => None,
        }
    }
}

/// `app.bsky.feed.defs#replyRef`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyRef {
    pub root: ReplyTarget,
    pub parent: ReplyTarget,
}

/// Why an item appears in a feed other than being authored by a followed account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum FeedReason {
    #[serde(rename = "app.bsky.feed.defs#reasonRepost")]
    Repost {
        by: ProfileViewBasic,
        #[serde(rename = "indexedAt")]
        indexed_at: String,
    },
    #[serde(rename = "app.bsky.feed.defs#reasonPin")]
    Pin,
    #[serde(other)]
    Unknown,
}

/// `app.bsky.feed.defs#feedViewPost`: one entry of a feed page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    pub post: PostView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FeedReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_context: Option<String>,
}

impl FeedEntry {
    /// A bare entry wrapping a post with no reply or reason metadata.
    pub fn from_post(post: PostView) -> Self {
        Self {
            post,
            reply: None,
            reason: None,
            feed_context: None,
        }
    }

    /// A reply that the author posted themselves (not surfaced by a repost or pin).
    pub fn is_organic_reply(&self) -> bool {
        self.reply.is_some() && self.reason.is_none()
    }
}

/// `app.bsky.feed.defs#threadViewPost` and its sibling node types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum ThreadNode {
    #[serde(rename = "app.bsky.feed.defs#threadViewPost")]
    Post(ThreadViewPost),
    #[serde(rename = "app.bsky.feed.defs#notFoundPost")]
    NotFound(NotFoundPost),
    #[serde(rename = "app.bsky.feed.defs#blockedPost")]
    Blocked(BlockedPost),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadViewPost {
    pub post: PostView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<ThreadNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<ThreadNode>>,
}

impl ThreadNode {
    pub fn as_post(&self) -> Option<&ThreadViewPost> {
        match self {
            ThreadNode::Post(post) => Some(post),
            _ => None,
        }
    }
}

impl ThreadViewPost {
    /// The first reply, if it is itself a thread view post.
    pub fn first_reply(&self) -> Option<&ThreadViewPost> {
        self.replies
            .as_ref()
            .and_then(|replies| replies.first())
            .and_then(ThreadNode::as_post)
    }
}

/// Notification reasons. Unknown reasons are kept verbatim so they still
/// group with each other by exact string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationReason {
    Like,
    Repost,
    Follow,
    Mention,
    Reply,
    Quote,
    StarterpackJoined,
    Other(String),
}

impl NotificationReason {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationReason::Like => "like",
            NotificationReason::Repost => "repost",
            NotificationReason::Follow => "follow",
            NotificationReason::Mention => "mention",
            NotificationReason::Reply => "reply",
            NotificationReason::Quote => "quote",
            NotificationReason::StarterpackJoined => "starterpack-joined",
            NotificationReason::Other(other) => other,
        }
    }

    /// Reasons whose subject is the notifying post itself rather than the
    /// user's post it refers to.
    pub fn subject_is_own_uri(&self) -> bool {
        matches!(
            self,
            NotificationReason::Reply | NotificationReason::Quote | NotificationReason::Mention
        )
    }
}

impl From<String> for NotificationReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "like" => NotificationReason::Like,
            "repost" => NotificationReason::Repost,
            "follow" => NotificationReason::Follow,
            "mention" => NotificationReason::Mention,
            "reply" => NotificationReason::Reply,
            "quote" => NotificationReason::Quote,
            "starterpack-joined" => NotificationReason::StarterpackJoined,
            _ => NotificationReason::Other(value),
        }
    }
}

impl From<NotificationReason> for String {
    fn from(value: NotificationReason) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for NotificationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `app.bsky.notification.listNotifications#notification`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub uri: String,
    pub cid: String,
    pub author: ProfileViewBasic,
    pub reason: NotificationReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_subject: Option<String>,
    #[serde(default)]
    pub record: serde_json::Value,
    pub is_read: bool,
    pub indexed_at: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
}

/// One entry of `app.bsky.actor.getPreferences`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum Preference {
    #[serde(rename = "app.bsky.actor.defs#adultContentPref")]
    AdultContent { enabled: bool },
    #[serde(rename = "app.bsky.actor.defs#contentLabelPref")]
    ContentLabel { label: String, visibility: String },
    #[serde(other)]
    Unknown,
}

/// A like record from `com.atproto.repo.listRecords` over `app.bsky.feed.like`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeRecord {
    pub uri: String,
    pub value: LikeRecordValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRecordValue {
    pub subject: StrongRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// `com.atproto.repo.strongRef`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrongRef {
    pub uri: String,
    pub cid: String,
}

/// A page of items plus the cursor for the next one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, cursor: Option<String>) -> Self {
        Self { items, cursor }
    }

    /// Whether another page should be requested after this one.
    ///
    /// Only the cursor decides. A page can come back empty after local
    /// filtering (likes of non-posts, deleted subjects) while the server
    /// still has more.
    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }
}
