//! The detector loop: periodic polling plus debounced mutation rechecks.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

use vt_core::proto::Request;
use vt_core::{PageSnapshot, PresenceDetector, PresenceEvent, VideoSignature};

/// Tracks media-element counts across snapshots so late-loading players
/// (the mutation-observer analog) trigger an early recheck instead of
/// waiting out the poll period.
#[derive(Debug, Default)]
pub struct MutationWatch {
    last_media_count: usize,
}

impl MutationWatch {
    /// Feeds one snapshot; returns whether media elements were inserted
    /// since the previous one.
    pub fn media_added(&mut self, snapshot: &PageSnapshot) -> bool {
        let count = snapshot.media.len();
        let added = count > self.last_media_count;
        self.last_media_count = count;
        added
    }
}

/// Runs presence detection until the snapshot feed goes away.
///
/// Polls the latest snapshot once per `poll` period; a snapshot that grew
/// new media elements schedules one extra observation `debounce` later.
/// Edge transitions are forwarded to the tracker as protocol requests;
/// undeliverable sends are logged and dropped. While tracking is disabled
/// no observation happens at all and the live status reads `None`.
pub async fn detector_loop(
    mut snapshots: watch::Receiver<Option<PageSnapshot>>,
    requests: mpsc::Sender<Request>,
    status: watch::Sender<Option<VideoSignature>>,
    mut enabled: watch::Receiver<bool>,
    poll: Duration,
    debounce: Duration,
) {
    let mut detector = PresenceDetector::new();
    detector.set_enabled(*enabled.borrow());

    let mut mutations = MutationWatch::default();
    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut recheck_at: Option<Instant> = None;

    loop {
        let recheck_deadline = recheck_at;
        let recheck = async move {
            match recheck_deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        let observe = tokio::select! {
            // Both timer arms are gated off while tracking is disabled, so a
            // disabled detector costs nothing between feed updates.
            _ = ticker.tick(), if detector.is_enabled() => true,
            () = recheck, if detector.is_enabled() => {
                recheck_at = None;
                true
            }
            changed = snapshots.changed() => match changed {
                Ok(()) => {
                    let added = snapshots
                        .borrow()
                        .as_ref()
                        .is_some_and(|s| mutations.media_added(s));
                    if added && detector.is_enabled() {
                        recheck_at = Some(Instant::now() + debounce);
                    }
                    false
                }
                // Feed closed: the page context is gone.
                Err(_) => break,
            },
            changed = enabled.changed() => {
                match changed {
                    Ok(()) => {
                        let now_enabled = *enabled.borrow();
                        detector.set_enabled(now_enabled);
                        if !now_enabled {
                            recheck_at = None;
                            let _ = status.send(None);
                        }
                    }
                    Err(_) => tracing::debug!("tracker context gone, keeping last enable state"),
                }
                false
            }
        };

        if !observe || !detector.is_enabled() {
            continue;
        }

        let Some(snapshot) = snapshots.borrow().clone() else {
            continue;
        };

        if let Some(event) = detector.observe(&snapshot, Utc::now()) {
            let video_data = match event {
                PresenceEvent::Playing(signature) => Some(signature),
                PresenceEvent::Stopped => None,
            };
            if requests
                .try_send(Request::VideoStatusChanged { video_data })
                .is_err()
            {
                tracing::warn!("tracker unavailable, dropping presence transition");
            }
        }
        let _ = status.send(detector.current().cloned());
    }

    tracing::debug!("detector loop stopped");
}
