// Batch hydration: resolve sets of post URIs / actor identifiers in
// chunks of at most 25 (the getPosts/getProfiles ceiling), all chunks in
// flight at once.
//
// Results are merged into a map keyed by URI or DID, so completion order of
// the chunk requests never affects the output. A key that is missing from
// the map means "context unavailable", not an error.

use std::collections::HashMap;

use anyhow::{Context, Result};
use atrium_api::types::string::AtIdentifier;
use futures::future::{join_all, try_join_all};
use tracing::{debug, warn};

use crate::bluesky::api::{BskyApi, MAX_BATCH_SIZE};
use crate::bluesky::types::{PostView, ProfileViewDetailed};

/// What to do when one chunk of a batch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HydrationPolicy {
    /// Any failed chunk fails the whole hydration; the caller retries as a unit.
    #[default]
    Strict,
    /// Failed chunks are logged and skipped; successful chunks are kept.
    Lenient,
}

impl std::str::FromStr for HydrationPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(HydrationPolicy::Strict),
            "lenient" => Ok(HydrationPolicy::Lenient),
            other => anyhow::bail!("Unknown hydration policy '{other}' (expected strict or lenient)"),
        }
    }
}

/// Split `items` into batches of at most `MAX_BATCH_SIZE`.
///
/// Produces `ceil(n / 25)` batches; an empty input produces no batches
/// (and therefore no requests).
pub fn batches<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    items.chunks(MAX_BATCH_SIZE).map(<[T]>::to_vec).collect()
}

/// Fetch every chunk with `fetch`, concurrently, and flatten the results
/// according to `policy`.
async fn fetch_batched<T, F, Fut>(
    keys: &[String],
    policy: HydrationPolicy,
    what: &str,
    fetch: F,
) -> Result<Vec<T>>
where
    F: Fn(Vec<String>) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<T>>>,
{
    let chunks = batches(keys);
    let chunk_count = chunks.len();
    let requests = chunks.into_iter().map(|chunk| {
        let size = chunk.len();
        let fut = fetch(chunk);
        async move { fut.await.map(|items| (size, items)) }
    });

    let results: Vec<(usize, Vec<T>)> = match policy {
        HydrationPolicy::Strict => try_join_all(requests)
            .await
            .with_context(|| format!("Failed to hydrate {what}"))?,
        HydrationPolicy::Lenient => join_all(requests)
            .await
            .into_iter()
            .filter_map(|result| match result {
                Ok(pair) => Some(pair),
                Err(e) => {
                    warn!(error = %e, what = what, "Failed to hydrate batch, skipping");
                    None
                }
            })
            .collect(),
    };

    let mut merged = Vec::new();
    for (requested, items) in results {
        debug!(
            resolved = items.len(),
            requested = requested,
            what = what,
            "Hydrated batch"
        );
        merged.extend(items);
    }

    debug!(
        chunks = chunk_count,
        keys = keys.len(),
        resolved = merged.len(),
        what = what,
        "Hydration complete"
    );

    Ok(merged)
}

/// Hydrate a set of post URIs into a lookup by URI.
pub async fn hydrate_posts(
    api: &dyn BskyApi,
    uris: &[String],
    policy: HydrationPolicy,
) -> Result<HashMap<String, PostView>> {
    let posts = fetch_batched(uris, policy, "posts", |chunk| async move {
        api.get_posts(&chunk).await
    })
    .await?;

    Ok(posts.into_iter().map(|p| (p.uri.clone(), p)).collect())
}

/// Hydrate actors (DIDs or handles) into a lookup by DID.
///
/// Identifiers that are neither a valid DID nor a valid handle are dropped
/// before any request is made.
pub async fn hydrate_profiles(
    api: &dyn BskyApi,
    actors: &[String],
    policy: HydrationPolicy,
) -> Result<HashMap<String, ProfileViewDetailed>> {
    let valid: Vec<String> = actors
        .iter()
        .filter(|actor| actor.parse::<AtIdentifier>().is_ok())
        .cloned()
        .collect();

    if valid.len() < actors.len() {
        debug!(
            skipped = actors.len() - valid.len(),
            "Skipping invalid actor identifiers"
        );
    }

    let profiles = fetch_batched(&valid, policy, "profiles", |chunk| async move {
        api.get_profiles(&chunk).await
    })
    .await?;

    Ok(profiles.into_iter().map(|p| (p.did.clone(), p)).collect())
}
