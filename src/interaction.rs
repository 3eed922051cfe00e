// Optimistic like/repost state.
//
// The UI flips a toggle immediately and fixes it up when the server answers.
// State is a committed record URI (what the server last confirmed) plus an
// optional pending local value. A pending value is dropped on failure, and
// all local state is dropped when the post's CID changes or a newer server
// snapshot arrives.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::bluesky::api::{BskyApi, RecordKind};
use crate::bluesky::types::PostView;

/// What the caller must ask the server to do for a toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleIntent {
    Create,
    Delete { record_uri: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    /// Optimistically on, waiting for the created record's URI
    Creating,
    /// Optimistically off, waiting for the delete to land
    Deleting,
}

/// One post's like or repost toggle.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticToggle {
    kind: RecordKind,
    cid: String,
    synced_at: DateTime<Utc>,
    /// Record URI as the server reported it in the post's viewer state
    server: Option<String>,
    /// Record URI after our own confirmed writes
    committed: Option<String>,
    pending: Option<Pending>,
}

impl OptimisticToggle {
    pub fn new(kind: RecordKind, cid: &str, server: Option<String>, synced_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            cid: cid.to_string(),
            synced_at,
            committed: server.clone(),
            server,
            pending: None,
        }
    }

    /// Build the toggle for `post` from its viewer state.
    pub fn from_post(kind: RecordKind, post: &PostView, synced_at: DateTime<Utc>) -> Self {
        let viewer = post.viewer.as_ref();
        let server = match kind {
            RecordKind::Like => viewer.and_then(|v| v.like.clone()),
            RecordKind::Repost => viewer.and_then(|v| v.repost.clone()),
        };
        Self::new(kind, &post.cid, server, synced_at)
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Whether the toggle reads as on, counting an in-flight change.
    pub fn is_active(&self) -> bool {
        match self.pending {
            Some(Pending::Creating) => true,
            Some(Pending::Deleting) => false,
            None => self.committed.is_some(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn record_uri(&self) -> Option<&str> {
        self.committed.as_deref()
    }

    /// Start a toggle. Returns `None` while another change is in flight.
    pub fn begin(&mut self) -> Option<ToggleIntent> {
        if self.pending.is_some() {
            return None;
        }
        match self.committed.clone() {
            None => {
                self.pending = Some(Pending::Creating);
                Some(ToggleIntent::Create)
            }
            Some(record_uri) => {
                self.pending = Some(Pending::Deleting);
                Some(ToggleIntent::Delete { record_uri })
            }
        }
    }

    /// The server accepted the change. `record_uri` is the created record for
    /// a create and ignored for a delete.
    pub fn confirm(&mut self, record_uri: Option<String>) {
        match self.pending.take() {
            Some(Pending::Creating) => self.committed = record_uri,
            Some(Pending::Deleting) => self.committed = None,
            None => {}
        }
    }

    /// The server rejected the change; fall back to the committed state.
    pub fn rollback(&mut self) {
        self.pending = None;
    }

    /// Take a fresh server snapshot of the post. Local state is discarded
    /// when the content changed (new CID) or the snapshot is newer than the
    /// one this toggle was built from; older snapshots are ignored.
    pub fn reconcile(&mut self, cid: &str, server: Option<String>, updated_at: DateTime<Utc>) {
        if cid == self.cid && updated_at <= self.synced_at {
            return;
        }
        debug!(
            kind = %self.kind,
            cid_changed = cid != self.cid,
            "Resetting optimistic state to server snapshot"
        );
        self.cid = cid.to_string();
        self.synced_at = updated_at;
        self.committed = server.clone();
        self.server = server;
        self.pending = None;
    }

    /// The count to display, given the server's count. The server count
    /// already includes the server's view of our record, so only a local
    /// difference from it moves the number.
    pub fn display_count(&self, server_count: i64) -> i64 {
        match (self.is_active(), self.server.is_some()) {
            (true, false) => server_count + 1,
            (false, true) => (server_count - 1).max(0),
            _ => server_count,
        }
    }
}

/// Run one optimistic toggle round-trip for `post`.
///
/// On failure the toggle is rolled back and the error returned.
pub async fn toggle(api: &dyn BskyApi, state: &mut OptimisticToggle, post: &PostView) -> Result<()> {
    let Some(intent) = state.begin() else {
        debug!(uri = post.uri, "Toggle already in flight, ignoring");
        return Ok(());
    };

    let result = match intent {
        ToggleIntent::Create => api
            .create_record(state.kind(), &post.uri, &post.cid)
            .await
            .map(Some),
        ToggleIntent::Delete { record_uri } => api.delete_record(&record_uri).await.map(|_| None),
    };

    match result {
        Ok(record_uri) => {
            state.confirm(record_uri);
            Ok(())
        }
        Err(e) => {
            warn!(uri = post.uri, kind = %state.kind(), error = %e, "Toggle failed, rolling back");
            state.rollback();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn create_then_confirm() {
        let mut t = OptimisticToggle::new(RecordKind::Like, "cid1", None, at(0));
        assert_eq!(t.begin(), Some(ToggleIntent::Create));
        assert!(t.is_active());
        assert_eq!(t.display_count(4), 5);
        t.confirm(Some("at://did:plc:me/app.bsky.feed.like/1".to_string()));
        assert!(t.is_active());
        assert!(!t.is_pending());
        assert_eq!(t.record_uri(), Some("at://did:plc:me/app.bsky.feed.like/1"));
        assert_eq!(t.display_count(4), 5);
    }

    #[test]
    fn create_rollback_restores_off() {
        let mut t = OptimisticToggle::new(RecordKind::Repost, "cid1", None, at(0));
        t.begin();
        t.rollback();
        assert!(!t.is_active());
        assert_eq!(t.display_count(2), 2);
    }

    #[test]
    fn delete_existing_record() {
        let uri = "at://did:plc:me/app.bsky.feed.like/1".to_string();
        let mut t = OptimisticToggle::new(RecordKind::Like, "cid1", Some(uri.clone()), at(0));
        assert_eq!(t.begin(), Some(ToggleIntent::Delete { record_uri: uri }));
        assert!(!t.is_active());
        assert_eq!(t.display_count(10), 9);
        t.confirm(None);
        assert!(!t.is_active());
        assert_eq!(t.record_uri(), None);
    }

    #[test]
    fn second_begin_while_pending_is_ignored() {
        let mut t = OptimisticToggle::new(RecordKind::Like, "cid1", None, at(0));
        assert!(t.begin().is_some());
        assert!(t.begin().is_none());
    }

    #[test]
    fn newer_snapshot_discards_local_state() {
        let mut t = OptimisticToggle::new(RecordKind::Like, "cid1", None, at(10));
        t.begin();
        t.reconcile("cid1", Some("at://x/app.bsky.feed.like/9".to_string()), at(20));
        assert!(!t.is_pending());
        assert!(t.is_active());
        assert_eq!(t.display_count(3), 3);
    }

    #[test]
    fn stale_snapshot_is_ignored() {
        let mut t = OptimisticToggle::new(RecordKind::Like, "cid1", None, at(10));
        t.begin();
        t.reconcile("cid1", None, at(5));
        assert!(t.is_pending());
        assert!(t.is_active());
    }

    #[test]
    fn cid_change_resets_even_with_same_timestamp() {
        let mut t = OptimisticToggle::new(RecordKind::Like, "cid1", None, at(10));
        t.begin();
        t.reconcile("cid2", None, at(10));
        assert!(!t.is_pending());
        assert!(!t.is_active());
    }

    #[test]
    fn count_never_negative() {
        let t = {
            let mut t = OptimisticToggle::new(
                RecordKind::Like,
                "cid1",
                Some("at://x/app.bsky.feed.like/1".to_string()),
                at(0),
            );
            t.begin();
            t
        };
        assert_eq!(t.display_count(0), 0);
    }
}
