// Row building: flattening plus content-filter annotation, shaped by the
// layout of the list being rendered.
//
// Hidden items never reach the output. When a reply's parent is hidden the
// reply is still shown, just without its context row.

use serde::Serialize;

use super::flatten::{expansion_parent, FlattenedRow};
use crate::bluesky::types::FeedEntry;
use crate::moderation::{is_hidden, ContentFilter, FilterResult};

/// How a feed's entries are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLayout {
    /// Organic replies get their parent inserted above them
    Threaded,
    /// Organic replies are dropped (a profile's "posts" tab)
    TopLevel,
    /// Every entry as-is, no expansion
    Flat,
    /// Only posts with an image embed
    MediaOnly,
}

/// A flattened row with its filter decision attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedRow {
    #[serde(flatten)]
    pub row: FlattenedRow,
    pub filter: FilterResult,
}

/// Build render-ready rows from a run of feed entries.
pub fn build_rows(entries: &[FeedEntry], layout: RowLayout, filter: &ContentFilter) -> Vec<FeedRow> {
    let mut rows = Vec::with_capacity(entries.len());

    for entry in entries {
        let decision = filter.filter(&entry.post.labels);
        if is_hidden(&decision) {
            continue;
        }

        match layout {
            RowLayout::Threaded => {
                if let Some(parent) = expansion_parent(entry) {
                    let parent_decision = filter.filter(&parent.labels);
                    if !is_hidden(&parent_decision) {
                        rows.push(FeedRow {
                            row: FlattenedRow::parent(parent.clone()),
                            filter: parent_decision,
                        });
                    }
                }
            }
            RowLayout::TopLevel => {
                if entry.is_organic_reply() {
                    continue;
                }
            }
            RowLayout::Flat => {}
            RowLayout::MediaOnly => {
                if !entry.post.has_images() {
                    continue;
                }
            }
        }

        rows.push(FeedRow {
            row: FlattenedRow::entry(entry.clone()),
            filter: decision,
        });
    }

    rows
}
