// Feed fetching: one cursor-paginated contract over every feed the client
// shows: the following timeline, custom feed generators, and the four
// profile tabs.
//
// Every page gets a local language guess per post before it is returned.
//
// The likes tab has no feed endpoint. It lists the actor's like records,
// keeps the ones pointing at posts, and hydrates those in batches.

pub mod flatten;
pub mod rows;

use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::bluesky::api::{AuthorFeedFilter, BskyApi};
use crate::bluesky::types::{FeedEntry, Page};
use crate::hydrate::{hydrate_posts, HydrationPolicy};
use crate::language::detect_languages;

use self::rows::RowLayout;

/// Tabs on a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileMode {
    Posts,
    Replies,
    Likes,
    Media,
}

impl FromStr for ProfileMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "posts" => Ok(ProfileMode::Posts),
            "replies" => Ok(ProfileMode::Replies),
            "likes" => Ok(ProfileMode::Likes),
            "media" => Ok(ProfileMode::Media),
            other => anyhow::bail!("Unknown profile tab '{other}' (posts, replies, likes, media)"),
        }
    }
}

/// Where a feed's pages come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    /// The authenticated user's following timeline
    Following,
    /// A custom feed generator, by AT-URI
    Generator(String),
    Profile { actor: String, mode: ProfileMode },
}

impl FeedSource {
    /// The row layout this source renders with.
    pub fn layout(&self) -> RowLayout {
        match self {
            FeedSource::Following | FeedSource::Generator(_) => RowLayout::Threaded,
            FeedSource::Profile { mode, .. } => match mode {
                ProfileMode::Posts => RowLayout::TopLevel,
                ProfileMode::Replies => RowLayout::Threaded,
                ProfileMode::Likes => RowLayout::Flat,
                ProfileMode::Media => RowLayout::MediaOnly,
            },
        }
    }
}

/// Fetch one page of `source`, starting at `cursor` (`None` for the first page).
pub async fn fetch_page(
    api: &dyn BskyApi,
    source: &FeedSource,
    cursor: Option<&str>,
    policy: HydrationPolicy,
) -> Result<Page<FeedEntry>> {
    let mut page = match source {
        FeedSource::Following => api.get_timeline(cursor).await?,
        FeedSource::Generator(feed) => api.get_feed(feed, cursor).await?,
        FeedSource::Profile { actor, mode } => match mode {
            ProfileMode::Posts | ProfileMode::Replies => {
                api.get_author_feed(actor, AuthorFeedFilter::PostsWithReplies, cursor)
                    .await?
            }
            ProfileMode::Media => {
                api.get_author_feed(actor, AuthorFeedFilter::PostsWithMedia, cursor)
                    .await?
            }
            ProfileMode::Likes => fetch_likes_page(api, actor, cursor, policy).await?,
        },
    };

    detect_languages(&mut page.items);

    debug!(
        entries = page.items.len(),
        has_more = page.cursor.is_some(),
        "Fetched feed page"
    );

    Ok(page)
}

/// One page of an actor's liked posts, in like-record order.
///
/// Likes of non-post records (feed generators, lists) are skipped, as are
/// liked posts that no longer hydrate. Two like records for the same post
/// both produce an entry.
pub async fn fetch_likes_page(
    api: &dyn BskyApi,
    actor: &str,
    cursor: Option<&str>,
    policy: HydrationPolicy,
) -> Result<Page<FeedEntry>> {
    let records = api.list_like_records(actor, cursor).await?;

    let subjects: Vec<String> = records
        .items
        .iter()
        .map(|r| r.value.subject.uri.clone())
        .filter(|uri| uri.contains("app.bsky.feed.post"))
        .collect();

    let posts = hydrate_posts(api, &subjects, policy)
        .await
        .with_context(|| format!("Failed to fetch liked posts for @{actor}"))?;

    let entries: Vec<FeedEntry> = subjects
        .iter()
        .filter_map(|uri| posts.get(uri).cloned())
        .map(FeedEntry::from_post)
        .collect();

    debug!(
        records = records.items.len(),
        posts = entries.len(),
        "Hydrated page of likes for @{}",
        actor
    );

    Ok(Page::new(entries, records.cursor))
}

/// Fetch up to `max_pages` consecutive pages of `source`, following cursors.
///
/// Returns every entry in server order plus the cursor for the page after
/// the last one fetched.
pub async fn collect_pages(
    api: &dyn BskyApi,
    source: &FeedSource,
    max_pages: usize,
    policy: HydrationPolicy,
) -> Result<Page<FeedEntry>> {
    let mut entries = Vec::new();
    let mut cursor: Option<String> = None;

    for _ in 0..max_pages {
        let page = fetch_page(api, source, cursor.as_deref(), policy).await?;
        let more = page.has_more();
        entries.extend(page.items);
        cursor = page.cursor;
        if !more {
            break;
        }
    }

    info!(count = entries.len(), "Collected feed entries");

    Ok(Page::new(entries, cursor))
}
