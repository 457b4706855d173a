//! Sessions command for listing watch history.

use std::io::Write;

use anyhow::Result;

use vt_core::WatchSession;
use vt_store::Store;

use super::stats::format_watch_time;

/// Formats the session listing.
pub fn format_sessions(sessions: &[WatchSession]) -> String {
    use std::fmt::Write as _;

    let mut output = String::new();
    writeln!(output, "SESSIONS ({})", sessions.len()).unwrap();

    if sessions.is_empty() {
        writeln!(output, "No sessions recorded.").unwrap();
        return output;
    }

    for session in sessions {
        let started = session.start_time.format("%Y-%m-%d %H:%M");
        let platform = session.signature.platform.label();
        let watched = format_watch_time(session.total_watch_time);
        let marker = if session.is_active { "  (active)" } else { "" };
        writeln!(
            output,
            "{started}  {platform:<14}{watched:>8}  {}{marker}",
            session.signature.title
        )
        .unwrap();
    }

    output
}

/// Runs the sessions command.
pub fn run<W: Write>(writer: &mut W, store: &Store, json: bool) -> Result<()> {
    let sessions = store.load_sessions()?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&sessions)?)?;
    } else {
        write!(writer, "{}", format_sessions(&sessions))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use insta::assert_snapshot;

    use super::*;
    use vt_core::{MediaMetrics, Platform, TabId, VideoSignature};

    fn session(
        platform: Platform,
        title: &str,
        start: DateTime<Utc>,
        watch_secs: f64,
        active: bool,
    ) -> WatchSession {
        let signature = VideoSignature {
            platform,
            title: title.to_string(),
            url: "https://example.com/video".to_string(),
            metrics: MediaMetrics::default(),
            captured_at: start,
        };
        let mut s = WatchSession::begin(TabId::new("1").unwrap(), signature, start);
        s.total_watch_time = watch_secs;
        if !active {
            s.finalize(start);
            s.total_watch_time = watch_secs;
        }
        s
    }

    #[test]
    fn test_sessions_empty() {
        assert_snapshot!(format_sessions(&[]), @r"
        SESSIONS (0)
        No sessions recorded.
        ");
    }

    #[test]
    fn test_sessions_listing() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let sessions = vec![
            session(Platform::Youtube, "Building a Parser", t0, 570.0, false),
            session(
                Platform::Vimeo,
                "Concurrency Patterns",
                t0 + chrono::Duration::minutes(30),
                42.0,
                true,
            ),
        ];
        assert_snapshot!(format_sessions(&sessions), @r"
        SESSIONS (2)
        2025-06-01 12:00  YouTube         9m 30s  Building a Parser
        2025-06-01 12:30  Vimeo              42s  Concurrency Patterns  (active)
        ");
    }
}
