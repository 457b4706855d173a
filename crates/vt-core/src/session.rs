//! Watch sessions and time accumulation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::signature::VideoSignature;
use crate::types::{SessionId, TabId};

/// Inter-update gaps at or above this many seconds are treated as paused or
/// suspended time and excluded from accumulation.
pub const STALE_GAP_SECS: f64 = 10.0;

/// A contiguous watch interval with accumulated playback time.
///
/// Created on a presence transition, mutated only by accumulation ticks
/// while active, and immutable once finalized (it can still be dropped by
/// the clear-all operation, never edited).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchSession {
    /// Unique id composed from the tab and creation time; never reused.
    pub id: SessionId,
    /// Originating page context.
    pub tab_id: TabId,
    pub start_time: DateTime<Utc>,
    /// Set on finalization; `None` while the session is active.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// The signature captured at session start. Platform, title, and url
    /// are fixed for the session; the metrics go stale.
    pub signature: VideoSignature,
    /// Accumulated seconds of genuine playback. Monotonically
    /// non-decreasing while active.
    pub total_watch_time: f64,
    /// Timestamp of the last accumulation, used for the stale-gap check.
    pub last_update_time: DateTime<Utc>,
    pub is_active: bool,
}

impl WatchSession {
    /// Starts a new active session for a detected video.
    pub fn begin(tab_id: TabId, signature: VideoSignature, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::compose(&tab_id, now),
            tab_id,
            start_time: now,
            end_time: None,
            signature,
            total_watch_time: 0.0,
            last_update_time: now,
            is_active: true,
        }
    }

    /// Applies one accumulation step against `last_update_time`.
    ///
    /// Gaps under [`STALE_GAP_SECS`] are counted as watch time; larger gaps
    /// are discarded (the host context was paused or suspended) but
    /// `last_update_time` still advances. Returns the seconds added.
    pub fn accumulate(&mut self, now: DateTime<Utc>) -> f64 {
        if !self.is_active {
            return 0.0;
        }
        let elapsed = elapsed_secs(self.last_update_time, now);
        let added = if (0.0..STALE_GAP_SECS).contains(&elapsed) {
            self.total_watch_time += elapsed;
            elapsed
        } else {
            0.0
        };
        self.last_update_time = now;
        added
    }

    /// Ends the session: one final accumulation, then close.
    ///
    /// Finalizing an already-ended session is a no-op, which makes the
    /// disable path idempotent.
    pub fn finalize(&mut self, now: DateTime<Utc>) -> f64 {
        if !self.is_active {
            return 0.0;
        }
        let added = self.accumulate(now);
        self.end_time = Some(now);
        self.is_active = false;
        added
    }
}

fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from)
        .to_std()
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::platform::Platform;
    use crate::signature::MediaMetrics;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn session_at(start: DateTime<Utc>) -> WatchSession {
        let signature = VideoSignature {
            platform: Platform::Youtube,
            title: "Test Video".to_string(),
            url: "https://www.youtube.com/watch?v=abc".to_string(),
            metrics: MediaMetrics::default(),
            captured_at: start,
        };
        WatchSession::begin(TabId::new("1").unwrap(), signature, start)
    }

    #[test]
    fn begin_starts_active_with_zero_time() {
        let session = session_at(t0());
        assert!(session.is_active);
        assert!(session.end_time.is_none());
        assert!(session.total_watch_time.abs() < f64::EPSILON);
        assert_eq!(session.last_update_time, t0());
    }

    #[test]
    fn accumulate_adds_short_gaps() {
        let mut session = session_at(t0());
        let added = session.accumulate(t0() + Duration::seconds(5));
        assert!((added - 5.0).abs() < 1e-9);
        assert!((session.total_watch_time - 5.0).abs() < 1e-9);
    }

    #[test]
    fn accumulate_discards_stale_gap_but_advances_clock() {
        let mut session = session_at(t0());
        let tick = t0() + Duration::seconds(15);
        let added = session.accumulate(tick);
        assert!(added.abs() < f64::EPSILON);
        assert!(session.total_watch_time.abs() < f64::EPSILON);
        assert_eq!(session.last_update_time, tick);
    }

    #[test]
    fn accumulate_boundary_at_exactly_ten_seconds_is_stale() {
        let mut session = session_at(t0());
        session.accumulate(t0() + Duration::seconds(10));
        assert!(session.total_watch_time.abs() < f64::EPSILON);
    }

    #[test]
    fn accumulation_recovers_after_stale_gap() {
        let mut session = session_at(t0());
        session.accumulate(t0() + Duration::seconds(30));
        session.accumulate(t0() + Duration::seconds(33));
        assert!((session.total_watch_time - 3.0).abs() < 1e-9);
    }

    #[test]
    fn backwards_clock_adds_nothing() {
        let mut session = session_at(t0());
        let added = session.accumulate(t0() - Duration::seconds(5));
        assert!(added.abs() < f64::EPSILON);
        assert!(session.total_watch_time.abs() < f64::EPSILON);
    }

    #[test]
    fn finalize_adds_tail_and_closes() {
        let mut session = session_at(t0());
        for i in 1..=9 {
            session.accumulate(t0() + Duration::seconds(i));
        }
        assert!((session.total_watch_time - 9.0).abs() < 1e-9);

        let end = t0() + Duration::milliseconds(9_500);
        session.finalize(end);
        assert!(!session.is_active);
        assert_eq!(session.end_time, Some(end));
        assert!((session.total_watch_time - 9.5).abs() < 1e-9);
    }

    #[test]
    fn finalize_discards_stale_tail() {
        let mut session = session_at(t0());
        session.accumulate(t0() + Duration::seconds(5));
        session.finalize(t0() + Duration::seconds(60));
        assert!((session.total_watch_time - 5.0).abs() < 1e-9);
        assert!(!session.is_active);
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut session = session_at(t0());
        session.finalize(t0() + Duration::seconds(3));
        let total = session.total_watch_time;
        let end = session.end_time;

        session.finalize(t0() + Duration::seconds(8));
        assert!((session.total_watch_time - total).abs() < f64::EPSILON);
        assert_eq!(session.end_time, end);
    }

    #[test]
    fn session_serde_roundtrip() {
        let mut session = session_at(t0());
        session.accumulate(t0() + Duration::seconds(4));
        let json = serde_json::to_string(&session).unwrap();
        let parsed: WatchSession = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, session);
    }
}
