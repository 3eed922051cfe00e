// Notification grouping: fold a page of notifications into groups keyed by
// (reason, subject), then hydrate each group's subject post.
//
// For replies, quotes and mentions the interesting post is the notifying
// post itself, so the subject is the notification's own URI. For likes,
// reposts and the rest it is the user's post that was acted on
// (`reasonSubject`). Matching scans every earlier group, not just the
// previous one, so non-adjacent notifications about the same post merge.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::bluesky::api::BskyApi;
use crate::bluesky::types::{
    Notification, NotificationReason, Page, PostView, ProfileViewBasic,
};
use crate::hydrate::{hydrate_posts, HydrationPolicy};

/// Whether notifications sharing a subject are folded together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    Grouped,
    Ungrouped,
}

impl Grouping {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Grouping::Grouped
        } else {
            Grouping::Ungrouped
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationGroup {
    pub reason: NotificationReason,
    pub subject: Option<String>,
    /// Authors in first-seen order
    pub actors: Vec<ProfileViewBasic>,
    pub is_read: bool,
    pub indexed_at: String,
    /// The subject post, once hydrated
    pub item: Option<PostView>,
}

/// Groups for one page plus the distinct subjects that need hydrating,
/// in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedNotifications {
    pub groups: Vec<NotificationGroup>,
    pub subjects: Vec<String>,
}

/// The URI a notification is "about".
pub fn effective_subject(notification: &Notification) -> Option<&str> {
    if notification.reason.subject_is_own_uri() {
        Some(notification.uri.as_str())
    } else {
        notification
            .reason_subject
            .as_deref()
            .filter(|s| !s.is_empty())
    }
}

fn new_group(notification: &Notification, subject: Option<&str>) -> NotificationGroup {
    NotificationGroup {
        reason: notification.reason.clone(),
        subject: subject.map(String::from),
        actors: vec![notification.author.clone()],
        is_read: notification.is_read,
        indexed_at: notification.indexed_at.clone(),
        item: None,
    }
}

/// Group notifications, preserving server order.
pub fn group(notifications: &[Notification], grouping: Grouping) -> GroupedNotifications {
    let mut groups: Vec<NotificationGroup> = Vec::new();
    let mut subjects = Vec::new();
    let mut seen = HashSet::new();

    for notification in notifications {
        let subject = effective_subject(notification);

        if let Some(s) = subject {
            if seen.insert(s) {
                subjects.push(s.to_string());
            }
        }

        if grouping == Grouping::Grouped {
            let prior = groups.iter_mut().find(|g| {
                g.reason == notification.reason && g.subject.as_deref() == subject
            });
            if let Some(prior) = prior {
                prior.actors.push(notification.author.clone());
                continue;
            }
        }

        groups.push(new_group(notification, subject));
    }

    GroupedNotifications { groups, subjects }
}

/// Attach hydrated subject posts to their groups. Groups whose subject
/// didn't resolve keep `item: None`.
pub fn attach_items(groups: &mut [NotificationGroup], posts: &HashMap<String, PostView>) {
    for g in groups.iter_mut() {
        if let Some(post) = g.subject.as_ref().and_then(|s| posts.get(s)) {
            g.item = Some(post.clone());
        }
    }
}

/// Fetch, group and hydrate one page of notifications.
pub async fn fetch_page(
    api: &dyn BskyApi,
    cursor: Option<&str>,
    grouping: Grouping,
    policy: HydrationPolicy,
) -> Result<Page<NotificationGroup>> {
    let page = api
        .list_notifications(cursor)
        .await
        .context("Failed to fetch notifications")?;

    let GroupedNotifications {
        mut groups,
        subjects,
    } = group(&page.items, grouping);

    debug!(
        notifications = page.items.len(),
        groups = groups.len(),
        subjects = subjects.len(),
        "Grouped page of notifications"
    );

    let posts = hydrate_posts(api, &subjects, policy).await?;
    attach_items(&mut groups, &posts);

    info!(
        groups = groups.len(),
        hydrated = groups.iter().filter(|g| g.item.is_some()).count(),
        unread = groups.iter().filter(|g| !g.is_read).count(),
        "Prepared notifications"
    );

    Ok(Page::new(groups, page.cursor))
}
