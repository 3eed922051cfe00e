// Post thread flattening: turn a getPostThread tree into a linear list:
// ancestors oldest-first, the primary post, then each top-level reply
// followed by its chain of first replies.
//
// Hidden posts are left out but the walk continues through them, so a
// hidden ancestor doesn't cut the thread above it. Blocked and deleted
// posts can't be shown, but they still take a row so the reader can see
// that something is there.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::bluesky::api::BskyApi;
use crate::bluesky::types::{PostView, ThreadNode, ThreadViewPost};
use crate::moderation::{is_hidden, ContentFilter, FilterResult};

/// What a thread row shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThreadItem {
    Post { post: PostView, filter: FilterResult },
    /// The viewer and the author block each other
    Blocked { uri: String },
    /// Deleted, or never existed
    NotFound { uri: String },
}

impl ThreadItem {
    /// A placeholder for a node that isn't a viewable post.
    ///
    /// Unknown node types get no row at all.
    fn placeholder(node: &ThreadNode) -> Option<Self> {
        match node {
            ThreadNode::Blocked(b) => Some(ThreadItem::Blocked { uri: b.uri.clone() }),
            ThreadNode::NotFound(n) => Some(ThreadItem::NotFound { uri: n.uri.clone() }),
            ThreadNode::Post(_) | ThreadNode::Unknown => None,
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            ThreadItem::Post { post, .. } => &post.uri,
            ThreadItem::Blocked { uri } | ThreadItem::NotFound { uri } => uri,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadRow {
    #[serde(flatten)]
    pub item: ThreadItem,
    /// The post the thread was opened on
    pub primary: bool,
    /// Only set on the primary post: whether it replies to something
    pub has_parent: bool,
    /// The next row continues this post's reply chain
    pub has_reply: bool,
}

impl ThreadRow {
    pub fn post(&self) -> Option<&PostView> {
        match &self.item {
            ThreadItem::Post { post, .. } => Some(post),
            _ => None,
        }
    }

    fn placeholder(item: ThreadItem, primary: bool, has_reply: bool) -> Self {
        Self {
            item,
            primary,
            has_parent: false,
            has_reply,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadRows {
    pub rows: Vec<ThreadRow>,
    /// Index of the primary post (the number of ancestor rows, placeholders
    /// included)
    pub main_index: usize,
}

fn push_row(
    rows: &mut Vec<ThreadRow>,
    filter: &ContentFilter,
    post: &PostView,
    primary: bool,
    has_parent: bool,
    has_reply: bool,
) {
    let decision = filter.filter(&post.labels);
    if is_hidden(&decision) {
        return;
    }
    rows.push(ThreadRow {
        item: ThreadItem::Post {
            post: post.clone(),
            filter: decision,
        },
        primary,
        has_parent,
        has_reply,
    });
}

/// Flatten a thread tree rooted at the primary post.
///
/// A blocked or missing root yields a single placeholder row. Only a root
/// of an unknown type is an error.
pub fn flatten_thread(thread: &ThreadNode, filter: &ContentFilter) -> Result<ThreadRows> {
    let root = match thread {
        ThreadNode::Post(root) => root,
        ThreadNode::Unknown => anyhow::bail!("Post not found"),
        other => {
            let rows = ThreadItem::placeholder(other)
                .map(|item| ThreadRow::placeholder(item, true, false))
                .into_iter()
                .collect();
            return Ok(ThreadRows { rows, main_index: 0 });
        }
    };

    let mut ancestors = Vec::new();
    let mut cursor = root;
    while let Some(parent) = cursor.parent.as_deref() {
        let ThreadNode::Post(parent) = parent else {
            // The walk ends at the first ancestor that can't be shown.
            if let Some(item) = ThreadItem::placeholder(parent) {
                ancestors.push(ThreadRow::placeholder(item, false, true));
            }
            break;
        };
        push_row(&mut ancestors, filter, &parent.post, false, false, true);
        cursor = parent;
    }
    ancestors.reverse();

    let main_index = ancestors.len();
    let mut rows = ancestors;

    push_row(&mut rows, filter, &root.post, true, root.parent.is_some(), false);

    for reply in root.replies.iter().flatten() {
        match reply {
            ThreadNode::Post(reply) => push_reply_chain(&mut rows, filter, reply),
            other => {
                if let Some(item) = ThreadItem::placeholder(other) {
                    rows.push(ThreadRow::placeholder(item, false, false));
                }
            }
        }
    }

    Ok(ThreadRows { rows, main_index })
}

fn push_reply_chain(rows: &mut Vec<ThreadRow>, filter: &ContentFilter, reply: &ThreadViewPost) {
    let mut next = Some(reply);
    while let Some(node) = next {
        let child = node.first_reply();
        push_row(rows, filter, &node.post, false, false, child.is_some());
        next = child;
    }
}

/// Fetch and flatten the thread around `uri`.
pub async fn fetch_thread(
    api: &dyn BskyApi,
    uri: &str,
    depth: Option<u16>,
    filter: &ContentFilter,
) -> Result<ThreadRows> {
    let node = api
        .get_post_thread(uri, depth)
        .await
        .context("Failed to fetch post thread")?;
    flatten_thread(&node, filter)
}
