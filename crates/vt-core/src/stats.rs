//! Derived statistics over the session table.

use chrono::{DateTime, Duration, Local, Utc};
use serde::Serialize;

use crate::session::WatchSession;

/// On-demand aggregates for UI surfaces.
///
/// Nothing here is persisted; stats are recomputed from the session table
/// on every query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_sessions: usize,
    /// Sum of accumulated watch time across all sessions, in seconds.
    pub total_watch_time_seconds: f64,
    /// Session counts per platform label, in first-seen order.
    pub platform_counts: Vec<(String, usize)>,
    /// Sessions whose start falls on today's calendar day, local time.
    pub sessions_today: usize,
    /// Sessions started within the trailing 7x24h window.
    pub sessions_this_week: usize,
}

impl SessionStats {
    /// Computes stats for the given table at the given instant.
    pub fn compute(sessions: &[WatchSession], now: DateTime<Utc>) -> Self {
        let today = now.with_timezone(&Local).date_naive();
        let week_ago = now - Duration::days(7);

        let mut platform_counts: Vec<(String, usize)> = Vec::new();
        let mut total_watch_time_seconds = 0.0;
        let mut sessions_today = 0;
        let mut sessions_this_week = 0;

        for session in sessions {
            total_watch_time_seconds += session.total_watch_time;

            let label = session.signature.platform.label();
            match platform_counts.iter_mut().find(|(l, _)| l == label) {
                Some((_, count)) => *count += 1,
                None => platform_counts.push((label.to_string(), 1)),
            }

            if session.start_time.with_timezone(&Local).date_naive() == today {
                sessions_today += 1;
            }
            if session.start_time > week_ago {
                sessions_this_week += 1;
            }
        }

        Self {
            total_sessions: sessions.len(),
            total_watch_time_seconds,
            platform_counts,
            sessions_today,
            sessions_this_week,
        }
    }
}
