//! Stats command for derived watch statistics.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

use vt_core::SessionStats;
use vt_store::Store;

/// Formats accumulated watch seconds as a duration string.
///
/// Returns "Xh Ym" if >= 1 hour, "Xm Ys" if >= 1 minute, "Xs" otherwise.
/// Negative values are treated as 0s (defensive).
pub fn format_watch_time(secs: f64) -> String {
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "clamped non-negative and floored before the cast"
    )]
    let total = secs.max(0.0).floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else if minutes >= 1 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Formats the human-readable stats output.
pub fn format_stats(stats: &SessionStats, timezone: &str) -> String {
    let mut output = String::new();

    writeln!(output, "WATCH STATS ({timezone})").unwrap();
    writeln!(output).unwrap();

    if stats.total_sessions == 0 {
        writeln!(output, "No sessions recorded.").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "Hint: Run 'vt run' against a page feed to start tracking.").unwrap();
        return output;
    }

    writeln!(
        output,
        "Sessions:    {} total ({} today, {} this week)",
        stats.total_sessions, stats.sessions_today, stats.sessions_this_week
    )
    .unwrap();
    writeln!(
        output,
        "Watch time:  {}",
        format_watch_time(stats.total_watch_time_seconds)
    )
    .unwrap();

    writeln!(output).unwrap();
    writeln!(output, "BY PLATFORM").unwrap();
    writeln!(output, "───────────").unwrap();
    for (label, count) in &stats.platform_counts {
        writeln!(output, "{label:<14}{count}").unwrap();
    }

    output
}

/// JSON stats envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonStats<'a> {
    generated_at: String,
    timezone: String,
    #[serde(flatten)]
    stats: &'a SessionStats,
}

/// Runs the stats command.
pub fn run<W: Write>(writer: &mut W, store: &Store, json: bool) -> Result<()> {
    let now = Utc::now();
    let sessions = store.load_sessions()?;
    let stats = SessionStats::compute(&sessions, now);
    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());

    if json {
        let envelope = JsonStats {
            generated_at: now.to_rfc3339(),
            timezone,
            stats: &stats,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&envelope)?)?;
    } else {
        write!(writer, "{}", format_stats(&stats, &timezone))?;
    }

    Ok(())
}
