//! The tracker service: feed reader, detector, tracker, and persistence
//! wired together with channels.
//!
//! Each piece runs in its own task and owns its state outright — the page
//! feed publishes snapshots, the detector turns them into edge-triggered
//! presence messages, the tracker task owns the session table, and the
//! persistence worker owns the store. Message passing is fire-and-forget
//! throughout: a receiver that has gone away costs a log line, never a
//! crash.

mod detector;
mod dispatch;
mod persist;

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use vt_core::proto::{Request, Response};
use vt_core::{PageSnapshot, TabId, Tracker};
use vt_store::Store;

pub use dispatch::{Badge, LogBadge, handle_request};
pub use persist::PersistJob;

use crate::Config;

/// Runs the tracker service until the feed ends or an interrupt arrives.
///
/// Reloads persisted history into the tracker first (the update hook), then
/// drives the detector and tracker loops. On shutdown the active session is
/// finalized (the page context is gone, so presence is lost) and one final
/// snapshot is flushed before the store is released.
pub async fn run<R>(
    feed: R,
    store: Store,
    config: &Config,
    tab: TabId,
    badge: Box<dyn Badge>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let loaded = match store.load_sessions() {
        Ok(sessions) => sessions,
        Err(error) => {
            tracing::warn!(%error, "could not load persisted sessions, starting empty");
            Vec::new()
        }
    };
    let tracking = store.is_tracking().unwrap_or(true);
    tracing::info!(
        sessions = loaded.len(),
        tracking,
        "tracker service starting"
    );
    let tracker = Tracker::with_sessions(loaded, tracking);

    let (snapshot_tx, snapshot_rx) = watch::channel(None::<PageSnapshot>);
    let (request_tx, request_rx) = mpsc::channel::<Request>(64);
    let (persist_tx, persist_rx) = mpsc::channel::<PersistJob>(64);
    let (status_tx, status_rx) = watch::channel(None);
    let (enabled_tx, enabled_rx) = watch::channel(tracking);

    let reader = tokio::spawn(read_feed(
        feed,
        snapshot_tx,
        request_tx.clone(),
        config.feed_interval(),
    ));
    let detector = tokio::spawn(detector::detector_loop(
        snapshot_rx,
        request_tx,
        status_tx,
        enabled_rx,
        config.poll_interval(),
        config.debounce(),
    ));
    let persister = tokio::spawn(persist::run(store, persist_rx));

    tracker_loop(
        tracker,
        request_rx,
        persist_tx,
        status_rx,
        &enabled_tx,
        badge,
        &tab,
        config.poll_interval(),
    )
    .await;

    let _ = reader.await;
    let _ = detector.await;
    // The persist channel is closed by now; the worker drains what is left
    // and hands the store back.
    let _ = persister.await;

    tracing::info!("tracker service stopped");
    Ok(())
}

/// Reads the page feed line by line, routing snapshots to the watch channel
/// and protocol messages to the tracker.
///
/// Pacing between lines simulates the page evolving in real time. EOF or
/// ctrl-c ends the feed; one extra pacing interval of grace lets the
/// detector sample the final state before the channels close.
async fn read_feed<R>(
    feed: R,
    snapshots: watch::Sender<Option<PageSnapshot>>,
    requests: mpsc::Sender<Request>,
    pace: Duration,
) where
    R: AsyncBufRead + Unpin,
{
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("could not listen for interrupt");
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(interrupt);

    let mut lines = feed.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    route_line(&line, &snapshots, &requests).await;
                    tokio::time::sleep(pace).await;
                }
                Ok(None) => break,
                Err(error) => {
                    tracing::warn!(%error, "feed read failed");
                    break;
                }
            },
            () = &mut interrupt => {
                tracing::info!("interrupt received, closing feed");
                break;
            }
        }
    }
    tokio::time::sleep(pace).await;
    tracing::debug!("feed ended");
}

/// Routes one feed line.
///
/// Lines carrying an `action` key are protocol messages; everything else is
/// a page snapshot. Malformed lines are logged and skipped, and an unknown
/// action answers with the protocol's error payload.
async fn route_line(
    line: &str,
    snapshots: &watch::Sender<Option<PageSnapshot>>,
    requests: &mpsc::Sender<Request>,
) {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return;
    }

    if line.contains("\"action\"") {
        match Request::parse(line) {
            Ok(request) => {
                if requests.send(request).await.is_err() {
                    tracing::warn!("tracker unavailable, dropping protocol message");
                }
            }
            Err(error) => {
                tracing::warn!(%error, "unrecognized protocol message");
                emit_response(&Response::unknown_action());
            }
        }
        return;
    }

    match serde_json::from_str::<PageSnapshot>(line) {
        Ok(snapshot) => {
            let _ = snapshots.send(Some(snapshot));
        }
        Err(error) => tracing::warn!(%error, "skipping malformed page snapshot"),
    }
}

/// Owns the tracker: applies protocol requests, runs the accumulation tick,
/// and enqueues persistence work.
#[expect(
    clippy::too_many_arguments,
    reason = "channel plumbing fans out here by design"
)]
async fn tracker_loop(
    mut tracker: Tracker,
    mut requests: mpsc::Receiver<Request>,
    persist_tx: mpsc::Sender<PersistJob>,
    status: watch::Receiver<Option<vt_core::VideoSignature>>,
    enabled_tx: &watch::Sender<bool>,
    mut badge: Box<dyn Badge>,
    tab: &TabId,
    tick_interval: Duration,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if tracker.on_tick(Utc::now()) {
                    enqueue_snapshot(&mut tracker, &persist_tx);
                }
            }
            request = requests.recv() => match request {
                Some(request) => {
                    let live = status.borrow().clone();
                    let reply = handle_request(&mut tracker, live, tab, request, Utc::now());

                    if let Some(text) = reply.badge {
                        badge.set_text(text);
                    }
                    if let Some(now_enabled) = reply.tracking_changed {
                        let _ = enabled_tx.send(now_enabled);
                        if persist_tx.try_send(PersistJob::TrackingFlag(now_enabled)).is_err() {
                            tracing::warn!("persist queue full, dropping tracking flag write");
                        }
                    }
                    if reply.persist {
                        enqueue_snapshot(&mut tracker, &persist_tx);
                    }
                    match reply.response {
                        Response::Success { .. } => {}
                        response => emit_response(&response),
                    }
                }
                // All senders gone: the feed and detector have shut down.
                None => break,
            }
        }
    }

    // The page context is gone, which is indistinguishable from presence
    // being lost: finalize and flush.
    if tracker.current_session().is_some() {
        tracker.on_presence(tab, None, Utc::now());
        badge.set_text("");
    }
    enqueue_snapshot(&mut tracker, &persist_tx);
}

/// Fire-and-forget snapshot enqueue; the worker coalesces a backlog down to
/// the newest snapshot.
fn enqueue_snapshot(tracker: &mut Tracker, persist_tx: &mpsc::Sender<PersistJob>) {
    let job = PersistJob::Snapshot {
        sessions: tracker.sessions().to_vec(),
        saved_at: Utc::now(),
    };
    if persist_tx.try_send(job).is_err() {
        tracing::warn!("persist queue full, dropping session snapshot");
    }
    tracker.mark_persisted();
}

/// Query answers go to stdout as single-line JSON, the service's reply
/// surface for feed-driven protocol messages.
fn emit_response(response: &Response) {
    match serde_json::to_string(response) {
        Ok(json) => println!("{json}"),
        Err(error) => tracing::warn!(%error, "could not serialize response"),
    }
}
