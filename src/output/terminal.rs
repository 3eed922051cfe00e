// Colored terminal output for feed rows, notification groups and threads.
//
// The main.rs command handlers delegate here for everything except JSON output.

use chrono::Utc;
use colored::Colorize;

use super::{time_since_str, truncate_chars};
use crate::backend::feed_search::GeneratorView;
use crate::backend::tenor::TenorGif;
use crate::backend::translate::Translation;
use crate::bluesky::types::{FeedReason, PostView, ProfileViewBasic, ProfileViewDetailed};
use crate::feed::rows::FeedRow;
use crate::moderation::{
    ContentFilter, FilterResult, FilterVisibility, ModerationPrefs, LABEL_GROUPS,
};
use crate::notifications::NotificationGroup;
use crate::thread::{ThreadItem, ThreadRows};

const PREVIEW_CHARS: usize = 200;

fn author_line(author: &ProfileViewBasic) -> String {
    match author.display_name.as_deref().filter(|n| !n.is_empty()) {
        Some(name) => format!("{} {}", name.bold(), format!("@{}", author.handle).dimmed()),
        None => format!("@{}", author.handle).bold().to_string(),
    }
}

fn filter_badge(filter: &FilterResult) -> Option<String> {
    filter.as_ref().map(|f| match f.visibility {
        FilterVisibility::Warn => format!("[warning: {}]", f.message).yellow().to_string(),
        FilterVisibility::Hide => format!("[hidden: {}]", f.message).red().to_string(),
    })
}

fn print_post(post: &PostView, indent: &str, filter: &FilterResult) {
    let age = time_since_str(&post.indexed_at, Utc::now());
    let lang = post
        .language
        .as_deref()
        .map(|l| format!(" [{l}]"))
        .unwrap_or_default();
    println!(
        "{indent}{} {}{}",
        author_line(&post.author),
        age.dimmed(),
        lang.dimmed()
    );

    if let Some(badge) = filter_badge(filter) {
        // Warned posts are collapsed behind their message.
        println!("{indent}  {badge}");
    } else {
        let text = post.text();
        if !text.is_empty() {
            println!("{indent}  {}", truncate_chars(text, PREVIEW_CHARS));
        }
        if post.has_images() {
            println!("{indent}  {}", "[images]".dimmed());
        }
    }

    println!(
        "{indent}  {}",
        format!(
            "{} replies  {} reposts  {} likes",
            post.reply_count.unwrap_or(0),
            post.repost_count.unwrap_or(0),
            post.like_count.unwrap_or(0),
        )
        .dimmed()
    );
}

/// Display render-ready feed rows. A parent row is drawn with a connector
/// into the reply that follows it.
pub fn display_feed(rows: &[FeedRow]) {
    if rows.is_empty() {
        println!("Looks like there's nothing here yet!");
        return;
    }

    let mut previous_has_reply = false;
    for row in rows {
        let entry = &row.row.item;

        if !previous_has_reply {
            println!("{}", "-".repeat(60).dimmed());
        }
        if let Some(FeedReason::Repost { by, .. }) = &entry.reason {
            println!("  {}", format!("Reposted by @{}", by.handle).green());
        }

        let indent = if previous_has_reply { "  | " } else { "  " };
        print_post(&entry.post, indent, &row.filter);
        if row.row.has_reply {
            println!("  {}", "|".dimmed());
        }

        previous_has_reply = row.row.has_reply;
    }
    println!("{}", "-".repeat(60).dimmed());
}

fn reason_text(group: &NotificationGroup) -> String {
    let who = match group.actors.as_slice() {
        [] => String::new(),
        [one] => format!("@{}", one.handle),
        [first, rest @ ..] => format!(
            "@{} and {} other{}",
            first.handle,
            rest.len(),
            if rest.len() == 1 { "" } else { "s" }
        ),
    };
    let what = match group.reason.as_str() {
        "like" => "liked your post",
        "repost" => "reposted your post",
        "follow" => "followed you",
        "reply" => "replied to you",
        "quote" => "quoted your post",
        "mention" => "mentioned you",
        "starterpack-joined" => "joined via your starter pack",
        other => other,
    };
    format!("{who} {what}")
}

/// Display grouped notifications with their hydrated subject posts.
pub fn display_notifications(groups: &[NotificationGroup], filter: &ContentFilter) {
    if groups.is_empty() {
        println!("No notifications yet.");
        return;
    }

    for group in groups {
        let marker = if group.is_read { " " } else { "*" };
        let age = time_since_str(&group.indexed_at, Utc::now());
        println!(
            "{} {} {}",
            marker.blue().bold(),
            reason_text(group),
            age.dimmed()
        );
        if let Some(ref post) = group.item {
            print_post(post, "    ", &filter.filter(&post.labels));
        }
    }
}

/// Display a flattened thread, marking the primary post.
pub fn display_thread(thread: &ThreadRows) {
    for row in &thread.rows {
        let indent = if row.primary { "> " } else { "  " };
        match &row.item {
            ThreadItem::Post { post, filter } => print_post(post, indent, filter),
            ThreadItem::Blocked { .. } => println!("{indent}{}", "[blocked post]".red()),
            ThreadItem::NotFound { .. } => println!("{indent}{}", "[deleted post]".dimmed()),
        }
        if row.has_reply {
            println!("  {}", "|".dimmed());
        } else {
            println!();
        }
    }
}

pub fn display_profiles(profiles: &[ProfileViewDetailed]) {
    for p in profiles {
        let name = p.display_name.as_deref().unwrap_or(&p.handle);
        println!("{} {}", name.bold(), format!("@{} ({})", p.handle, p.did).dimmed());
        println!(
            "  {} followers  {} following  {} posts",
            p.followers_count.unwrap_or(0),
            p.follows_count.unwrap_or(0),
            p.posts_count.unwrap_or(0),
        );
        if let Some(ref description) = p.description {
            println!("  {}", truncate_chars(description, PREVIEW_CHARS));
        }
    }
}

/// Show every label group with the effective visibility for this user.
pub fn display_moderation(filter: &ContentFilter, prefs: &ModerationPrefs) {
    println!(
        "Adult content: {}",
        if filter.adult_content_enabled() {
            "enabled".green()
        } else {
            "disabled".red()
        }
    );
    for def in LABEL_GROUPS.iter() {
        let setting = match prefs.label_visibility.get(&def.group) {
            Some(v) => format!("{v:?}").to_lowercase(),
            None => format!("unset (suggested {:?})", def.default_visibility).to_lowercase(),
        };
        let gated = if def.adult && !filter.adult_content_enabled() {
            " [hidden: adult]".red().to_string()
        } else {
            String::new()
        };
        println!("  {:<14} {:<28} {}{}", def.group.key(), def.title, setting, gated);
    }
}

pub fn display_gifs(gifs: &[TenorGif]) {
    for gif in gifs {
        let title = if gif.content_description.is_empty() {
            &gif.title
        } else {
            &gif.content_description
        };
        println!("{} {}", gif.id.dimmed(), title);
        if let Some(url) = gif.preview_url() {
            println!("  {}", url.blue());
        }
    }
}

pub fn display_terms(terms: &[String]) {
    for term in terms {
        println!("  {term}");
    }
}

pub fn display_generators(feeds: &[GeneratorView]) {
    if feeds.is_empty() {
        println!("No feeds found.");
        return;
    }
    for feed in feeds {
        println!(
            "{} {}",
            feed.display_name.bold(),
            format!("by @{}", feed.creator.handle).dimmed()
        );
        if let Some(ref description) = feed.description {
            println!("  {}", truncate_chars(description, PREVIEW_CHARS));
        }
        println!("  {}", feed.uri.dimmed());
    }
}

/// Show a post next to its translation.
pub fn display_translation(post: &PostView, translation: &Translation) {
    println!("{}", author_line(&post.author));
    println!("  {}", post.text().dimmed());
    println!();
    println!(
        "  {}",
        format!("Translated from {} ({})", translation.language, translation.language_code).cyan()
    );
    println!("  {}", translation.text);
}
