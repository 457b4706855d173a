//! The session tracker state machine.
//!
//! Two states: `Idle` (no active session) and `Active` (exactly one session
//! with `is_active = true`). The tracker is pure: every method takes the
//! current time as an argument and reports what happened; timers, badge
//! updates, and persistence are the caller's job.

use chrono::{DateTime, Utc};

use crate::session::WatchSession;
use crate::signature::VideoSignature;
use crate::types::{SessionId, TabId};

/// Accumulated watch seconds between periodic persists.
const PERSIST_EVERY_SECS: f64 = 10.0;

/// What a presence or tracking event did to the session table.
///
/// Any transition means the table changed and should be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Idle -> Active: a new session was created.
    SessionStarted,
    /// Active -> Idle: the current session was finalized.
    SessionEnded,
    /// Active -> Active: a different video finalized the old session and
    /// started a new one, with no overlap.
    RolledOver,
    /// The whole table was dropped.
    Cleared,
}

/// Owns the session table and the single current session.
///
/// Constructed once per process with its collaborators injected by the
/// caller; [`Tracker::with_sessions`] is the restart hook that reloads
/// persisted history.
#[derive(Debug)]
pub struct Tracker {
    sessions: Vec<WatchSession>,
    current: Option<SessionId>,
    tracking_enabled: bool,
    /// Watch seconds accumulated since the last persist.
    unsaved_watch_secs: f64,
}

impl Tracker {
    /// Creates an empty tracker.
    pub fn new(tracking_enabled: bool) -> Self {
        Self {
            sessions: Vec::new(),
            current: None,
            tracking_enabled,
            unsaved_watch_secs: 0.0,
        }
    }

    /// Creates a tracker from persisted history.
    ///
    /// A session left active by a previous process (crash, kill) is closed
    /// at its own `last_update_time` so the single-active invariant holds
    /// from the first event on.
    pub fn with_sessions(mut sessions: Vec<WatchSession>, tracking_enabled: bool) -> Self {
        for session in &mut sessions {
            if session.is_active {
                let stale_end = session.last_update_time;
                session.finalize(stale_end);
                tracing::warn!(id = %session.id, "closed session left active by a previous run");
            }
        }
        Self {
            sessions,
            current: None,
            tracking_enabled,
            unsaved_watch_secs: 0.0,
        }
    }

    /// Handles a presence report from the detector.
    ///
    /// `video` is the detected signature, or `None` when no genuine video
    /// is playing. Returns the transition taken, if any; `None` means the
    /// report matched the current state (level, not edge) or tracking is
    /// disabled.
    pub fn on_presence(
        &mut self,
        tab: &TabId,
        video: Option<VideoSignature>,
        now: DateTime<Utc>,
    ) -> Option<Transition> {
        if !self.tracking_enabled {
            return None;
        }

        match (self.current_index(), video) {
            (None, Some(signature)) => {
                self.start_session(tab.clone(), signature, now);
                Some(Transition::SessionStarted)
            }
            (Some(index), None) => {
                self.finalize_at(index, now);
                Some(Transition::SessionEnded)
            }
            (Some(index), Some(signature)) => {
                if self.sessions[index].signature.same_video(&signature) {
                    return None;
                }
                // End-then-start, atomically from the caller's view: the old
                // session carries an end_time at or before the new start.
                self.finalize_at(index, now);
                self.start_session(tab.clone(), signature, now);
                Some(Transition::RolledOver)
            }
            (None, None) => None,
        }
    }

    /// Periodic accumulation tick.
    ///
    /// Returns `true` when enough watch time has accumulated since the last
    /// persist that the table should be saved again.
    pub fn on_tick(&mut self, now: DateTime<Utc>) -> bool {
        let Some(index) = self.current_index() else {
            return false;
        };
        self.unsaved_watch_secs += self.sessions[index].accumulate(now);
        self.unsaved_watch_secs >= PERSIST_EVERY_SECS
    }

    /// Enables or disables session tracking.
    ///
    /// Disabling while a session is active finalizes it; calling disable
    /// again is a no-op, so the operation is idempotent.
    pub fn set_tracking(&mut self, enabled: bool, now: DateTime<Utc>) -> Option<Transition> {
        self.tracking_enabled = enabled;
        if enabled {
            return None;
        }
        let index = self.current_index()?;
        self.finalize_at(index, now);
        Some(Transition::SessionEnded)
    }

    /// Drops every session, active or not.
    pub fn clear(&mut self) -> Transition {
        self.sessions.clear();
        self.current = None;
        self.unsaved_watch_secs = 0.0;
        Transition::Cleared
    }

    /// Called by the owner after enqueueing a persist of the current table.
    pub fn mark_persisted(&mut self) {
        self.unsaved_watch_secs = 0.0;
    }

    /// Full history in insertion order, including the active session.
    pub fn sessions(&self) -> &[WatchSession] {
        &self.sessions
    }

    /// The active session, if any.
    pub fn current_session(&self) -> Option<&WatchSession> {
        self.current_index().map(|i| &self.sessions[i])
    }

    pub const fn is_tracking(&self) -> bool {
        self.tracking_enabled
    }

    fn current_index(&self) -> Option<usize> {
        let id = self.current.as_ref()?;
        self.sessions.iter().position(|s| &s.id == id)
    }

    fn start_session(&mut self, tab: TabId, signature: VideoSignature, now: DateTime<Utc>) {
        let session = WatchSession::begin(tab, signature, now);
        tracing::info!(id = %session.id, platform = %session.signature.platform, "session started");
        self.current = Some(session.id.clone());
        self.sessions.push(session);
    }

    fn finalize_at(&mut self, index: usize, now: DateTime<Utc>) {
        let session = &mut self.sessions[index];
        session.finalize(now);
        tracing::info!(
            id = %session.id,
            watch_secs = session.total_watch_time,
            "session ended"
        );
        self.current = None;
    }
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

    fn tab() -> TabId {
        TabId::new("1").unwrap()
    }

    fn youtube(id: &str, at: DateTime<Utc>) -> VideoSignature {
        VideoSignature {
            platform: Platform::Youtube,
            title: format!("Video {id}"),
            url: format!("https://www.youtube.com/watch?v={id}"),
            metrics: MediaMetrics::default(),
            captured_at: at,
        }
    }

    fn vimeo(path: &str, at: DateTime<Utc>) -> VideoSignature {
        VideoSignature {
            platform: Platform::Vimeo,
            title: "Vimeo Video".to_string(),
            url: format!("https://vimeo.com/{path}"),
            metrics: MediaMetrics::default(),
            captured_at: at,
        }
    }

    fn active_count(tracker: &Tracker) -> usize {
        tracker.sessions().iter().filter(|s| s.is_active).count()
    }

    #[test]
    fn presence_starts_a_session() {
        let mut tracker = Tracker::new(true);
        let transition = tracker.on_presence(&tab(), Some(youtube("abc", t0())), t0());
        assert_eq!(transition, Some(Transition::SessionStarted));
        assert_eq!(tracker.sessions().len(), 1);
        assert_eq!(active_count(&tracker), 1);
    }

    #[test]
    fn presence_lost_finalizes() {
        let mut tracker = Tracker::new(true);
        tracker.on_presence(&tab(), Some(youtube("abc", t0())), t0());
        let end = t0() + Duration::seconds(30);
        let transition = tracker.on_presence(&tab(), None, end);
        assert_eq!(transition, Some(Transition::SessionEnded));
        assert_eq!(active_count(&tracker), 0);
        assert_eq!(tracker.sessions()[0].end_time, Some(end));
    }

    #[test]
    fn same_video_report_is_no_change() {
        let mut tracker = Tracker::new(true);
        tracker.on_presence(&tab(), Some(youtube("abc", t0())), t0());
        let later = t0() + Duration::seconds(5);
        let transition = tracker.on_presence(&tab(), Some(youtube("abc", later)), later);
        assert_eq!(transition, None);
        assert_eq!(tracker.sessions().len(), 1);
    }

    #[test]
    fn different_video_rolls_over_without_overlap() {
        let mut tracker = Tracker::new(true);
        tracker.on_presence(&tab(), Some(youtube("abc", t0())), t0());
        let rollover = t0() + Duration::seconds(20);
        let transition = tracker.on_presence(&tab(), Some(youtube("xyz", rollover)), rollover);
        assert_eq!(transition, Some(Transition::RolledOver));
        assert_eq!(tracker.sessions().len(), 2);
        assert_eq!(active_count(&tracker), 1);

        let old = &tracker.sessions()[0];
        let new = &tracker.sessions()[1];
        assert!(!old.is_active);
        assert_eq!(old.end_time, Some(rollover));
        assert!(new.is_active);
        assert!(old.end_time.unwrap() <= new.start_time);
    }

    #[test]
    fn hostname_change_forces_rollover() {
        let mut tracker = Tracker::new(true);
        tracker.on_presence(&tab(), Some(youtube("abc", t0())), t0());
        let rollover = t0() + Duration::seconds(10);
        let transition = tracker.on_presence(&tab(), Some(vimeo("12345", rollover)), rollover);
        assert_eq!(transition, Some(Transition::RolledOver));
        assert_eq!(active_count(&tracker), 1);
    }

    #[test]
    fn at_most_one_active_over_arbitrary_sequences() {
        let mut tracker = Tracker::new(true);
        let mut now = t0();
        let reports: [Option<VideoSignature>; 8] = [
            Some(youtube("a", now)),
            Some(youtube("a", now)),
            Some(youtube("b", now)),
            None,
            None,
            Some(vimeo("1", now)),
            Some(youtube("a", now)),
            None,
        ];
        for report in reports {
            now += Duration::seconds(3);
            tracker.on_presence(&tab(), report, now);
            assert!(active_count(&tracker) <= 1);
        }
        assert_eq!(tracker.sessions().len(), 4);
        assert_eq!(active_count(&tracker), 0);
    }

    #[test]
    fn tick_accumulates_and_requests_persist_at_threshold() {
        let mut tracker = Tracker::new(true);
        tracker.on_presence(&tab(), Some(youtube("abc", t0())), t0());

        let mut persist_requests = 0;
        for i in 1..=20 {
            if tracker.on_tick(t0() + Duration::seconds(i)) {
                persist_requests += 1;
                tracker.mark_persisted();
            }
        }
        assert_eq!(persist_requests, 2);
        let session = tracker.current_session().unwrap();
        assert!((session.total_watch_time - 20.0).abs() < 1e-9);
    }

    #[test]
    fn tick_in_idle_does_nothing() {
        let mut tracker = Tracker::new(true);
        assert!(!tracker.on_tick(t0()));
    }

    #[test]
    fn disable_finalizes_and_is_idempotent() {
        let mut tracker = Tracker::new(true);
        tracker.on_presence(&tab(), Some(youtube("abc", t0())), t0());

        let first = tracker.set_tracking(false, t0() + Duration::seconds(5));
        assert_eq!(first, Some(Transition::SessionEnded));

        let second = tracker.set_tracking(false, t0() + Duration::seconds(6));
        assert_eq!(second, None);
        assert_eq!(active_count(&tracker), 0);
    }

    #[test]
    fn disabled_tracker_ignores_presence() {
        let mut tracker = Tracker::new(false);
        let transition = tracker.on_presence(&tab(), Some(youtube("abc", t0())), t0());
        assert_eq!(transition, None);
        assert!(tracker.sessions().is_empty());
    }

    #[test]
    fn reenabling_resumes_session_starts() {
        let mut tracker = Tracker::new(true);
        tracker.set_tracking(false, t0());
        tracker.set_tracking(true, t0() + Duration::seconds(1));
        let transition = tracker.on_presence(
            &tab(),
            Some(youtube("abc", t0() + Duration::seconds(2))),
            t0() + Duration::seconds(2),
        );
        assert_eq!(transition, Some(Transition::SessionStarted));
    }

    #[test]
    fn clear_drops_active_and_finalized_sessions() {
        let mut tracker = Tracker::new(true);
        tracker.on_presence(&tab(), Some(youtube("a", t0())), t0());
        tracker.on_presence(&tab(), None, t0() + Duration::seconds(5));
        tracker.on_presence(&tab(), Some(youtube("b", t0())), t0() + Duration::seconds(10));
        tracker.on_presence(&tab(), None, t0() + Duration::seconds(15));
        tracker.on_presence(&tab(), Some(youtube("c", t0())), t0() + Duration::seconds(20));
        assert_eq!(tracker.sessions().len(), 3);
        assert_eq!(active_count(&tracker), 1);

        tracker.clear();
        assert!(tracker.sessions().is_empty());
        assert!(tracker.current_session().is_none());
    }

    #[test]
    fn watch_scenario_accumulates_nine_and_a_half_seconds() {
        let mut tracker = Tracker::new(true);
        tracker.on_presence(&tab(), Some(youtube("abc", t0())), t0());

        for i in 1..=9 {
            tracker.on_tick(t0() + Duration::seconds(i));
        }
        let session = tracker.current_session().unwrap();
        assert!((session.total_watch_time - 9.0).abs() < 1e-9);

        let end = t0() + Duration::milliseconds(9_500);
        tracker.on_presence(&tab(), None, end);

        let session = &tracker.sessions()[0];
        assert!(!session.is_active);
        assert_eq!(session.end_time, Some(end));
        assert!((session.total_watch_time - 9.5).abs() < 1e-9);
    }

    #[test]
    fn reload_closes_stale_active_sessions() {
        let mut tracker = Tracker::new(true);
        tracker.on_presence(&tab(), Some(youtube("abc", t0())), t0());
        tracker.on_tick(t0() + Duration::seconds(3));
        let persisted = tracker.sessions().to_vec();
        assert!(persisted[0].is_active);

        let reloaded = Tracker::with_sessions(persisted, true);
        assert_eq!(active_count(&reloaded), 0);
        let session = &reloaded.sessions()[0];
        assert_eq!(session.end_time, Some(session.last_update_time));
    }
}
