// Feed sources: which endpoint each one reads, cursor following, and the
// likes tab's record-then-hydrate path.

mod common;

use common::*;
use skyline::bluesky::api::AuthorFeedFilter;
use serde_json::json;
use skyline::bluesky::types::{Page, ReplyTarget};
use skyline::feed::rows::RowLayout;
use skyline::feed::{collect_pages, fetch_page, FeedSource, ProfileMode};
use skyline::hydrate::HydrationPolicy;

fn profile(mode: ProfileMode) -> FeedSource {
    FeedSource::Profile {
        actor: "alice.bsky.social".to_string(),
        mode,
    }
}

#[test]
fn each_source_has_a_layout() {
    assert_eq!(FeedSource::Following.layout(), RowLayout::Threaded);
    assert_eq!(
        FeedSource::Generator("at://did:plc:x/app.bsky.feed.generator/cats".to_string()).layout(),
        RowLayout::Threaded
    );
    assert_eq!(profile(ProfileMode::Posts).layout(), RowLayout::TopLevel);
    assert_eq!(profile(ProfileMode::Replies).layout(), RowLayout::Threaded);
    assert_eq!(profile(ProfileMode::Likes).layout(), RowLayout::Flat);
    assert_eq!(profile(ProfileMode::Media).layout(), RowLayout::MediaOnly);
}

#[test]
fn profile_mode_parses() {
    assert_eq!("likes".parse::<ProfileMode>().unwrap(), ProfileMode::Likes);
    assert!("feeds".parse::<ProfileMode>().is_err());
}

#[tokio::test]
async fn profile_tabs_use_author_feed_filters() {
    let api = FakeApi::new();

    for mode in [ProfileMode::Posts, ProfileMode::Replies, ProfileMode::Media] {
        fetch_page(&api, &profile(mode), None, HydrationPolicy::Strict)
            .await
            .unwrap();
    }

    let actor = "alice.bsky.social".to_string();
    // The posts tab drops replies client-side, so it shares the replies filter.
    assert_eq!(
        api.calls(),
        vec![
            Call::AuthorFeed(actor.clone(), AuthorFeedFilter::PostsWithReplies),
            Call::AuthorFeed(actor.clone(), AuthorFeedFilter::PostsWithReplies),
            Call::AuthorFeed(actor, AuthorFeedFilter::PostsWithMedia),
        ]
    );
    assert_eq!(AuthorFeedFilter::PostsWithReplies.as_str(), "posts_with_replies");
    assert_eq!(AuthorFeedFilter::PostsWithMedia.as_str(), "posts_with_media");
}

#[tokio::test]
async fn likes_tab_hydrates_in_record_order_and_skips_non_posts() {
    let p1 = post_uri("did:plc:bob", "1");
    let p2 = post_uri("did:plc:carol", "2");
    let gone = post_uri("did:plc:dan", "deleted");
    let mut api = FakeApi::new().with_posts([post(&p1), post(&p2)]);
    api.likes = vec![
        like_record(&p2, "a"),
        like_record("at://did:plc:x/app.bsky.feed.generator/cats", "b"),
        like_record(&gone, "c"),
        like_record(&p1, "d"),
    ];
    api.likes_cursor = Some("more".to_string());

    let page = fetch_page(&api, &profile(ProfileMode::Likes), None, HydrationPolicy::Strict)
        .await
        .unwrap();

    let got: Vec<&str> = page.items.iter().map(|e| e.post.uri.as_str()).collect();
    assert_eq!(got, vec![p2.as_str(), p1.as_str()]);
    assert!(page.items.iter().all(|e| e.reply.is_none() && e.reason.is_none()));
    assert_eq!(page.cursor.as_deref(), Some("more"));

    // The generator like never reaches getPosts.
    let calls = api.get_posts_calls();
    assert_eq!(calls, vec![vec![p2.clone(), gone, p1.clone()]]);
}

#[tokio::test]
async fn repeated_likes_of_one_post_each_get_an_entry() {
    let p1 = post_uri("did:plc:bob", "1");
    let p2 = post_uri("did:plc:carol", "2");
    let mut api = FakeApi::new().with_posts([post(&p1), post(&p2)]);
    api.likes = vec![
        like_record(&p1, "a"),
        like_record(&p2, "b"),
        like_record(&p1, "c"),
    ];

    let page = fetch_page(&api, &profile(ProfileMode::Likes), None, HydrationPolicy::Strict)
        .await
        .unwrap();

    let got: Vec<&str> = page.items.iter().map(|e| e.post.uri.as_str()).collect();
    assert_eq!(got, vec![p1.as_str(), p2.as_str(), p1.as_str()]);
}

#[tokio::test]
async fn likes_page_of_only_non_posts_keeps_paging() {
    let mut api = FakeApi::new();
    api.likes = vec![like_record(
        "at://did:plc:x/app.bsky.feed.generator/cats",
        "a",
    )];
    api.likes_cursor = Some("more".to_string());

    let page = collect_pages(&api, &profile(ProfileMode::Likes), 3, HydrationPolicy::Strict)
        .await
        .unwrap();

    // Every page filters down to nothing, but the cursor says there is more.
    assert!(page.items.is_empty());
    assert!(page.has_more());
    let actor = "alice.bsky.social".to_string();
    assert_eq!(
        api.calls(),
        vec![
            Call::LikeRecords(actor.clone()),
            Call::LikeRecords(actor.clone()),
            Call::LikeRecords(actor),
        ]
    );
}

#[tokio::test]
async fn pages_are_annotated_with_detected_languages() {
    let with_text = |uri: &str, text: &str| {
        let mut view = post(uri);
        view.record["text"] = json!(text);
        view
    };
    let parent = with_text(
        &post_uri("did:plc:bob", "p"),
        "Hoy hace muy buen tiempo y vamos a pasear por el parque con los perros, después comeremos juntos en la casa de mis abuelos",
    );
    let mut child = with_text(
        &post_uri("did:plc:alice", "c"),
        "That sounds like a wonderful plan, I would love to come along with you all https://ejemplo.es/muy-buen-tiempo",
    );
    // The link is cut out before detection.
    child.record["facets"] = json!([{
        "index": {"byteStart": 75, "byteEnd": 109},
        "features": [{"$type": "app.bsky.richtext.facet#link", "uri": "https://ejemplo.es/muy-buen-tiempo"}]
    }]);
    let short = with_text(&post_uri("did:plc:carol", "s"), "🎉!");

    let mut api = FakeApi::new();
    api.feed_pages.insert(
        None,
        Page::new(
            vec![
                reply_entry(child, ReplyTarget::Post(parent)),
                entry(short),
            ],
            None,
        ),
    );

    let page = fetch_page(&api, &FeedSource::Following, None, HydrationPolicy::Strict)
        .await
        .unwrap();

    assert_eq!(page.items[0].post.language.as_deref(), Some("en"));
    let parent = page.items[0].reply.as_ref().unwrap().parent.visible_post().unwrap();
    assert_eq!(parent.language.as_deref(), Some("es"));
    // Nothing left to detect once emoji and punctuation are gone.
    assert_eq!(page.items[1].post.language, None);
}

#[tokio::test]
async fn collect_pages_follows_cursors_until_exhausted() {
    let mut api = FakeApi::new();
    api.feed_pages.insert(
        None,
        Page::new(
            vec![entry(post(&post_uri("did:plc:a", "1")))],
            Some("c1".to_string()),
        ),
    );
    api.feed_pages.insert(
        Some("c1".to_string()),
        Page::new(
            vec![entry(post(&post_uri("did:plc:a", "2")))],
            Some("c2".to_string()),
        ),
    );
    // Nothing is registered for c2: an empty page with no cursor ends the feed.

    let page = collect_pages(&api, &FeedSource::Following, 10, HydrationPolicy::Strict)
        .await
        .unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(
        api.calls(),
        vec![
            Call::Timeline(None),
            Call::Timeline(Some("c1".to_string())),
            Call::Timeline(Some("c2".to_string())),
        ]
    );
    assert!(!page.has_more());
}

#[tokio::test]
async fn collect_pages_stops_at_max_pages() {
    let mut api = FakeApi::new();
    api.feed_pages.insert(
        None,
        Page::new(
            vec![entry(post(&post_uri("did:plc:a", "1")))],
            Some("c1".to_string()),
        ),
    );
    let feed = "at://did:plc:x/app.bsky.feed.generator/cats".to_string();

    let page = collect_pages(
        &api,
        &FeedSource::Generator(feed.clone()),
        1,
        HydrationPolicy::Strict,
    )
    .await
    .unwrap();

    assert_eq!(api.calls(), vec![Call::Feed(feed)]);
    assert_eq!(page.cursor.as_deref(), Some("c1"));
    assert!(page.has_more());
}
