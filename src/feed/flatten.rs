// Thread expansion: give organic replies their parent as inline context.
//
// A reply whose parent is a visible post becomes two adjacent rows: a
// synthetic parent row flagged `has_reply`, then the reply itself. Reposted
// replies stay single rows, since the parent isn't the context the reposter
// is showing.

use serde::Serialize;

use crate::bluesky::types::{FeedEntry, PostView};

/// One row of a render-ready feed list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlattenedRow {
    pub item: FeedEntry,
    /// True for a synthetic parent row; the next row is its reply
    pub has_reply: bool,
}

impl FlattenedRow {
    pub fn entry(item: FeedEntry) -> Self {
        Self {
            item,
            has_reply: false,
        }
    }

    pub fn parent(post: PostView) -> Self {
        Self {
            item: FeedEntry::from_post(post),
            has_reply: true,
        }
    }
}

/// The parent to show above `entry`, if it qualifies for expansion.
pub fn expansion_parent(entry: &FeedEntry) -> Option<&PostView> {
    if !entry.is_organic_reply() {
        return None;
    }
    entry.reply.as_ref()?.parent.visible_post()
}

/// Flatten a page of feed entries into rows, in order.
pub fn flatten(page: &[FeedEntry]) -> Vec<FlattenedRow> {
    let mut rows = Vec::with_capacity(page.len());
    for entry in page {
        if let Some(parent) = expansion_parent(entry) {
            rows.push(FlattenedRow::parent(parent.clone()));
        }
        rows.push(FlattenedRow::entry(entry.clone()));
    }
    rows
}
