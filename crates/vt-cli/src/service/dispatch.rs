//! Protocol request dispatch against the tracker state machine.

use chrono::{DateTime, Utc};

use vt_core::proto::{Request, Response};
use vt_core::{TabId, Tracker, VideoSignature};

/// Badge surface updated on presence transitions.
///
/// Purely observational; implementations must never fail the caller.
pub trait Badge: Send {
    fn set_text(&mut self, text: &str);
}

/// Default badge that reports through the log feed.
pub struct LogBadge;

impl Badge for LogBadge {
    fn set_text(&mut self, text: &str) {
        if text.is_empty() {
            tracing::info!("badge cleared");
        } else {
            tracing::info!(badge = text, "badge set");
        }
    }
}

/// What handling one request asks of the service shell.
#[derive(Debug)]
pub struct Reply {
    pub response: Response,
    /// The session table changed and should be snapshotted.
    pub persist: bool,
    /// Badge text to show, when the request was a presence transition.
    pub badge: Option<&'static str>,
    /// The tracking flag changed to this value.
    pub tracking_changed: Option<bool>,
}

impl Reply {
    fn new(response: Response) -> Self {
        Self {
            response,
            persist: false,
            badge: None,
            tracking_changed: None,
        }
    }
}

/// Applies one protocol request to the tracker.
///
/// `live_video` is the detector's current signature, answered for status
/// queries independently of session bookkeeping. `tab` attributes sessions
/// started by presence reports.
pub fn handle_request(
    tracker: &mut Tracker,
    live_video: Option<VideoSignature>,
    tab: &TabId,
    request: Request,
    now: DateTime<Utc>,
) -> Reply {
    match request {
        Request::VideoStatusChanged { video_data } => {
            let badge = if video_data.is_some() { "LIVE" } else { "" };
            let transition = tracker.on_presence(tab, video_data, now);
            Reply {
                persist: transition.is_some(),
                badge: Some(badge),
                ..Reply::new(Response::Success { success: true })
            }
        }
        Request::GetVideoSessions => Reply::new(Response::Sessions {
            sessions: tracker.sessions().to_vec(),
        }),
        Request::ClearVideoHistory => {
            tracker.clear();
            Reply {
                persist: true,
                ..Reply::new(Response::Success { success: true })
            }
        }
        Request::GetVideoStatus => Reply::new(Response::VideoData {
            video_data: live_video,
        }),
        Request::ToggleTracking { is_tracking } => {
            let transition = tracker.set_tracking(is_tracking, now);
            Reply {
                persist: transition.is_some(),
                tracking_changed: Some(is_tracking),
                ..Reply::new(Response::Success { success: true })
            }
        }
    }
}
