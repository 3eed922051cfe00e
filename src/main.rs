use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use skyline::backend::feed_search::FeedSearchClient;
use skyline::backend::tenor::{CategoryType, TenorClient};
use skyline::backend::translate::TranslateClient;
use skyline::bluesky::api::{BskyApi, RecordKind};
use skyline::bluesky::client::{post_uri, XrpcClient};
use skyline::config::Config;
use skyline::feed::rows::build_rows;
use skyline::feed::{self, FeedSource, ProfileMode};
use skyline::hydrate::hydrate_profiles;
use skyline::interaction::{self, OptimisticToggle};
use skyline::language;
use skyline::moderation::{ContentFilter, ModerationPrefs};
use skyline::notifications::{self, Grouping};
use skyline::output::terminal;
use skyline::thread;

/// Skyline: feed, thread and notification aggregation for Bluesky.
///
/// Fetches timelines, profile tabs, notifications and threads, and prints
/// them flattened, grouped and content-filtered.
#[derive(Parser)]
#[command(name = "skyline", version, about)]
struct Cli {
    /// Print JSON instead of formatted terminal output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the following timeline, or a custom feed
    Timeline {
        /// Feed generator AT-URI (default: following)
        #[arg(long)]
        feed: Option<String>,

        /// Number of pages to fetch (default: 1)
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,
    },

    /// Show one tab of a profile
    Author {
        /// Handle or DID
        actor: String,

        /// posts, replies, likes or media (default: posts)
        #[arg(long, default_value = "posts")]
        mode: ProfileMode,

        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,
    },

    /// Show notifications, grouped by reason and subject
    Notifications {
        /// One entry per notification, even when they share a subject
        #[arg(long)]
        ungrouped: bool,

        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,
    },

    /// Show a post thread
    Thread {
        /// Post AT-URI, or handle/rkey
        post: String,

        /// Reply depth to request
        #[arg(long)]
        depth: Option<u16>,
    },

    /// Look up profiles in batches
    Profiles {
        /// Handles or DIDs
        actors: Vec<String>,
    },

    /// Show your content filter settings
    Moderation,

    /// Like or unlike a post
    Like {
        /// Post AT-URI
        uri: String,
    },

    /// Repost or unrepost a post
    Repost {
        /// Post AT-URI
        uri: String,
    },

    /// Search Tenor GIFs
    Gifs {
        #[command(subcommand)]
        command: GifCommands,
    },

    /// Search feed generators
    FeedSearch { query: String },

    /// Translate a post with Google Translate
    Translate {
        /// Post AT-URI, or handle/rkey
        post: String,

        /// Target language (ISO 639-1)
        #[arg(long, default_value = "en")]
        to: String,
    },
}

#[derive(Subcommand)]
enum GifCommands {
    Search {
        query: String,
        #[arg(long)]
        limit: Option<u32>,
    },
    Featured {
        #[arg(long)]
        limit: Option<u32>,
    },
    Categories {
        /// List trending categories instead of featured ones
        #[arg(long)]
        trending: bool,
    },
    Trending,
    Autocomplete { query: String },
    Suggestions { query: String },
    /// Look up GIFs by id
    Get { ids: Vec<String> },
    /// Register that a GIF was shared
    Share {
        id: String,
        /// Search term that led to the GIF
        #[arg(long)]
        query: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("skyline=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Timeline { feed, pages } => {
            config.require_auth()?;
            let client = xrpc_client(&config)?;
            let filter = load_filter(&client, &config).await?;

            let source = match feed {
                Some(uri) => FeedSource::Generator(uri),
                None => FeedSource::Following,
            };
            let pb = spinner("Fetching feed")?;
            let page =
                feed::collect_pages(&client, &source, pages as usize, config.hydration).await?;
            pb.finish_and_clear();
            let rows = build_rows(&page.items, source.layout(), &filter);

            if cli.json {
                print_json(&rows)?;
            } else {
                terminal::display_feed(&rows);
            }
        }

        Commands::Author { actor, mode, pages } => {
            let actor = actor.strip_prefix('@').unwrap_or(&actor).to_string();
            let client = xrpc_client(&config)?;
            let filter = load_filter(&client, &config).await?;

            let source = FeedSource::Profile { actor, mode };
            let pb = spinner("Fetching profile feed")?;
            let page =
                feed::collect_pages(&client, &source, pages as usize, config.hydration).await?;
            pb.finish_and_clear();
            let rows = build_rows(&page.items, source.layout(), &filter);

            if cli.json {
                print_json(&rows)?;
            } else {
                terminal::display_feed(&rows);
            }
        }

        Commands::Notifications { ungrouped, pages } => {
            config.require_auth()?;
            let client = xrpc_client(&config)?;
            let filter = load_filter(&client, &config).await?;

            let grouping = if ungrouped {
                Grouping::Ungrouped
            } else {
                Grouping::from_enabled(config.group_notifications)
            };

            let pb = ProgressBar::new(pages as u64);
            pb.set_style(
                ProgressStyle::default_bar().template("  Notifications [{bar:30}] {pos}/{len}")?,
            );

            let mut groups = Vec::new();
            let mut cursor: Option<String> = None;
            for _ in 0..pages {
                let page = notifications::fetch_page(
                    &client,
                    cursor.as_deref(),
                    grouping,
                    config.hydration,
                )
                .await?;
                pb.inc(1);
                let more = page.has_more();
                groups.extend(page.items);
                cursor = page.cursor;
                if !more {
                    break;
                }
            }
            pb.finish_and_clear();

            if cli.json {
                print_json(&groups)?;
            } else {
                terminal::display_notifications(&groups, &filter);
            }
        }

        Commands::Thread { post, depth } => {
            let client = xrpc_client(&config)?;
            let filter = load_filter(&client, &config).await?;
            let uri = resolve_post_uri(&client, &post).await?;

            let pb = spinner("Fetching thread")?;
            let rows = thread::fetch_thread(&client, &uri, depth, &filter).await?;
            pb.finish_and_clear();

            if cli.json {
                print_json(&rows)?;
            } else {
                terminal::display_thread(&rows);
            }
        }

        Commands::Profiles { actors } => {
            let client = xrpc_client(&config)?;
            let actors: Vec<String> = actors
                .iter()
                .map(|a| a.strip_prefix('@').unwrap_or(a).to_string())
                .collect();

            let pb = spinner("Fetching profiles")?;
            let resolved = hydrate_profiles(&client, &actors, config.hydration).await?;
            pb.finish_and_clear();

            // Keep the order the actors were given in.
            let profiles: Vec<_> = actors
                .iter()
                .filter_map(|a| {
                    resolved
                        .get(a)
                        .or_else(|| resolved.values().find(|p| &p.handle == a))
                })
                .cloned()
                .collect();

            if profiles.len() < actors.len() {
                warn!(
                    requested = actors.len(),
                    resolved = profiles.len(),
                    "Some profiles could not be resolved"
                );
            }

            if cli.json {
                print_json(&profiles)?;
            } else {
                terminal::display_profiles(&profiles);
            }
        }

        Commands::Moderation => {
            config.require_auth()?;
            let client = xrpc_client(&config)?;
            let prefs = ModerationPrefs::from_preferences(&client.get_preferences().await?);
            let filter = ContentFilter::new(prefs.clone(), config.platform);
            terminal::display_moderation(&filter, &prefs);
        }

        Commands::Like { uri } => {
            toggle_interaction(&config, RecordKind::Like, &uri).await?;
        }

        Commands::Repost { uri } => {
            toggle_interaction(&config, RecordKind::Repost, &uri).await?;
        }

        Commands::Gifs { command } => {
            config.require_tenor()?;
            let tenor = TenorClient::new(&config.tenor_api_key)?;

            match command {
                GifCommands::Search { query, limit } => {
                    let results = tenor.search(&query, None, limit, None).await?;
                    if cli.json {
                        print_json(&results)?;
                    } else {
                        terminal::display_gifs(&results.results);
                    }
                }
                GifCommands::Featured { limit } => {
                    let results = tenor.featured(None, limit, None).await?;
                    if cli.json {
                        print_json(&results)?;
                    } else {
                        terminal::display_gifs(&results.results);
                    }
                }
                GifCommands::Categories { trending } => {
                    let kind = if trending {
                        CategoryType::Trending
                    } else {
                        CategoryType::Featured
                    };
                    let categories = tenor.categories(Some(kind), None).await?;
                    if cli.json {
                        print_json(&categories)?;
                    } else {
                        let names: Vec<String> =
                            categories.tags.iter().map(|t| t.name.clone()).collect();
                        terminal::display_terms(&names);
                    }
                }
                GifCommands::Trending => {
                    let terms = tenor.trending_terms(None).await?;
                    if cli.json {
                        print_json(&terms)?;
                    } else {
                        terminal::display_terms(&terms.results);
                    }
                }
                GifCommands::Autocomplete { query } => {
                    let terms = tenor.autocomplete(&query, None).await?;
                    if cli.json {
                        print_json(&terms)?;
                    } else {
                        terminal::display_terms(&terms.results);
                    }
                }
                GifCommands::Suggestions { query } => {
                    let terms = tenor.search_suggestions(&query, None).await?;
                    if cli.json {
                        print_json(&terms)?;
                    } else {
                        terminal::display_terms(&terms.results);
                    }
                }
                GifCommands::Get { ids } => {
                    let results = tenor.posts(&ids).await?;
                    if cli.json {
                        print_json(&results)?;
                    } else {
                        terminal::display_gifs(&results.results);
                    }
                }
                GifCommands::Share { id, query } => {
                    tenor.register_share(&id, query.as_deref()).await;
                }
            }
        }

        Commands::FeedSearch { query } => {
            config.require_feed_search()?;
            let search = FeedSearchClient::new(&config.feed_search_url)?;
            let results = search.search(&query).await?;

            if cli.json {
                print_json(&results)?;
            } else {
                terminal::display_generators(&results.feeds);
            }
        }

        Commands::Translate { post, to } => {
            config.require_translate()?;
            let client = xrpc_client(&config)?;
            let uri = resolve_post_uri(&client, &post).await?;

            let post = client
                .get_posts(&[uri.clone()])
                .await?
                .into_iter()
                .next()
                .with_context(|| format!("Post not found: {uri}"))?;
            if post.text().trim().is_empty() {
                anyhow::bail!("Post has no text to translate");
            }

            let detected = language::detect_post(&post);
            if detected == Some(to.as_str()) {
                info!(language = %to, "Post already appears to be in the target language");
            }

            let translator = TranslateClient::new(&config.translate_api_key)?;
            let translation = translator.translate(post.text(), &to).await?;

            if cli.json {
                print_json(&translation)?;
            } else {
                terminal::display_translation(&post, &translation);
            }
        }
    }

    Ok(())
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("  {spinner} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Build the XRPC client, attaching the session when one is configured.
fn xrpc_client(config: &Config) -> Result<XrpcClient> {
    let client = XrpcClient::new(&config.service_url)?;
    Ok(if config.has_session() {
        client.with_session(&config.access_jwt, &config.did)
    } else {
        client
    })
}

/// Build the content filter. Without a session there are no stored
/// preferences, so only the platform default applies.
async fn load_filter(client: &XrpcClient, config: &Config) -> Result<ContentFilter> {
    let prefs = if config.has_session() {
        ModerationPrefs::from_preferences(&client.get_preferences().await?)
    } else {
        ModerationPrefs::default()
    };
    Ok(ContentFilter::new(prefs, config.platform))
}

/// Accept either an AT-URI or `handle/rkey` (as in a bsky.app post link).
async fn resolve_post_uri(client: &XrpcClient, post: &str) -> Result<String> {
    if post.starts_with("at://") {
        return Ok(post.to_string());
    }
    let (actor, rkey) = post
        .trim_start_matches('@')
        .split_once('/')
        .with_context(|| format!("Expected an AT-URI or handle/rkey, got '{post}'"))?;
    let did = if actor.starts_with("did:") {
        actor.to_string()
    } else {
        client.resolve_handle(actor).await?
    };
    Ok(post_uri(&did, rkey))
}

async fn toggle_interaction(config: &Config, kind: RecordKind, uri: &str) -> Result<()> {
    config.require_auth()?;
    let client = xrpc_client(config)?;

    let post = client
        .get_posts(&[uri.to_string()])
        .await?
        .into_iter()
        .next()
        .with_context(|| format!("Post not found: {uri}"))?;

    let mut state = OptimisticToggle::from_post(kind, &post, chrono::Utc::now());
    let server_count = match kind {
        RecordKind::Like => post.like_count.unwrap_or(0),
        RecordKind::Repost => post.repost_count.unwrap_or(0),
    };

    interaction::toggle(&client, &mut state, &post).await?;

    info!(uri = uri, kind = %kind, active = state.is_active(), "Toggled");
    let verb = match (kind, state.is_active()) {
        (RecordKind::Like, true) => "Liked",
        (RecordKind::Like, false) => "Unliked",
        (RecordKind::Repost, true) => "Reposted",
        (RecordKind::Repost, false) => "Unreposted",
    };
    println!(
        "{} {} ({} {}s)",
        verb.bold(),
        uri,
        state.display_count(server_count),
        kind
    );
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_default_to_one() {
        let cli = Cli::try_parse_from(["skyline", "timeline"]).unwrap();
        assert!(matches!(cli.command, Commands::Timeline { pages: 1, .. }));
    }

    #[test]
    fn zero_pages_is_rejected_everywhere() {
        for cmd in [
            vec!["skyline", "timeline", "--pages", "0"],
            vec!["skyline", "author", "alice.test", "--pages", "0"],
            vec!["skyline", "notifications", "--pages", "0"],
        ] {
            assert!(Cli::try_parse_from(cmd.clone()).is_err(), "{cmd:?} should fail");
        }
    }

    #[test]
    fn translate_targets_english_by_default() {
        let cli = Cli::try_parse_from(["skyline", "translate", "at://did:plc:a/app.bsky.feed.post/1"])
            .unwrap();
        match cli.command {
            Commands::Translate { to, .. } => assert_eq!(to, "en"),
            _ => panic!("expected translate"),
        }
    }
}
