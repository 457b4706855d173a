//! The fire-and-forget persistence worker.
//!
//! State-changing transitions enqueue full-table snapshots; this worker
//! drains the queue, collapsing any backlog down to the newest snapshot
//! (monotonic, last write wins) before touching the store. Failures are
//! logged and dropped — the in-memory table stays authoritative and the
//! next successful write reconciles.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use vt_core::WatchSession;
use vt_store::Store;

/// A unit of work for the persistence worker.
#[derive(Debug)]
pub enum PersistJob {
    /// Replace the stored session mapping with this snapshot.
    Snapshot {
        sessions: Vec<WatchSession>,
        saved_at: DateTime<Utc>,
    },
    /// Record the tracking flag.
    TrackingFlag(bool),
}

/// Pending work after coalescing a drained batch.
#[derive(Debug, Default)]
struct Pending {
    snapshot: Option<(Vec<WatchSession>, DateTime<Utc>)>,
    tracking: Option<bool>,
}

impl Pending {
    fn absorb(&mut self, job: PersistJob) {
        match job {
            // Later snapshots supersede earlier ones wholesale.
            PersistJob::Snapshot { sessions, saved_at } => {
                self.snapshot = Some((sessions, saved_at));
            }
            PersistJob::TrackingFlag(enabled) => self.tracking = Some(enabled),
        }
    }
}

/// Runs the worker until the job channel closes, then returns the store so
/// the caller can inspect or reuse it.
pub async fn run(mut store: Store, mut jobs: mpsc::Receiver<PersistJob>) -> Store {
    while let Some(job) = jobs.recv().await {
        let mut pending = Pending::default();
        pending.absorb(job);
        while let Ok(next) = jobs.try_recv() {
            pending.absorb(next);
        }
        apply(&mut store, pending);
    }
    store
}

fn apply(store: &mut Store, pending: Pending) {
    if let Some(enabled) = pending.tracking {
        if let Err(error) = store.set_tracking(enabled) {
            tracing::warn!(%error, "failed to persist tracking flag");
        }
    }
    if let Some((sessions, saved_at)) = pending.snapshot {
        if let Err(error) = store.save_sessions(&sessions, saved_at) {
            tracing::warn!(%error, "failed to persist session snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use vt_core::{MediaMetrics, Platform, TabId, VideoSignature};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn session(video_id: &str) -> WatchSession {
        let signature = VideoSignature {
            platform: Platform::Youtube,
            title: format!("Video {video_id}"),
            url: format!("https://www.youtube.com/watch?v={video_id}"),
            metrics: MediaMetrics::default(),
            captured_at: t0(),
        };
        WatchSession::begin(TabId::new("1").unwrap(), signature, t0())
    }

    #[test]
    fn coalescing_keeps_the_newest_snapshot() {
        let mut pending = Pending::default();
        pending.absorb(PersistJob::Snapshot {
            sessions: vec![session("old")],
            saved_at: t0(),
        });
        pending.absorb(PersistJob::TrackingFlag(false));
        pending.absorb(PersistJob::Snapshot {
            sessions: vec![session("new"), session("newer")],
            saved_at: t0() + chrono::Duration::seconds(5),
        });

        let (sessions, saved_at) = pending.snapshot.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(saved_at, t0() + chrono::Duration::seconds(5));
        assert_eq!(pending.tracking, Some(false));
    }

    #[tokio::test]
    async fn worker_drains_backlog_to_latest_state() {
        let store = Store::open_in_memory().unwrap();
        let (tx, rx) = mpsc::channel(8);

        tx.send(PersistJob::Snapshot {
            sessions: vec![session("a")],
            saved_at: t0(),
        })
        .await
        .unwrap();
        tx.send(PersistJob::TrackingFlag(false)).await.unwrap();
        tx.send(PersistJob::Snapshot {
            sessions: vec![session("b"), session("c")],
            saved_at: t0() + chrono::Duration::seconds(10),
        })
        .await
        .unwrap();
        drop(tx);

        let store = run(store, rx).await;
        let sessions = store.load_sessions().unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions[0].signature.url.contains("v=b"));
        assert!(!store.is_tracking().unwrap());
        assert_eq!(
            store.last_saved().unwrap(),
            Some(t0() + chrono::Duration::seconds(10))
        );
    }

    #[tokio::test]
    async fn worker_returns_store_on_channel_close() {
        let store = Store::open_in_memory().unwrap();
        let (tx, rx) = mpsc::channel::<PersistJob>(1);
        drop(tx);
        let store = run(store, rx).await;
        assert!(store.load_sessions().unwrap().is_empty());
    }
}
