//! Video presence detection over page snapshots.
//!
//! Detection runs in three stages: the genuine-playing scan, a
//! platform-specific strategy keyed by hostname, and a generic
//! any-video-with-a-source fallback. The [`PresenceDetector`] wraps the
//! stages with edge triggering so downstream consumers only hear about
//! presence and identity changes, never steady-state polls.

use chrono::{DateTime, Utc};

use crate::page::{MediaElement, PageSnapshot};
use crate::platform::Platform;
use crate::signature::{MediaMetrics, VideoSignature};

/// Minimum rendered size for the YouTube strategy, which has to pick the
/// main player out of several concurrent video elements (inline previews,
/// shorts shelf).
const YOUTUBE_MIN_WIDTH: u32 = 200;
const YOUTUBE_MIN_HEIGHT: u32 = 150;

/// An edge-triggered presence transition.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceEvent {
    /// A genuine video appeared, or the playing video changed identity.
    Playing(VideoSignature),
    /// The previously playing video stopped or went away.
    Stopped,
}

/// Finds the media element the user is actually watching, if any.
pub fn find_active_media(page: &PageSnapshot) -> Option<&MediaElement> {
    // Stage 1: any element passing the genuine-playing predicate.
    if let Some(media) = page.media.iter().find(|m| m.is_actively_playing()) {
        return Some(media);
    }

    // Stage 2: platform-specific hooks for players the predicate misses
    // (DRM players reporting no dimensions, paused-but-current content).
    let host = page.host()?;
    let platform = Platform::from_host(&host);
    if let Some(media) = detect_for_platform(&platform, page) {
        return Some(media);
    }

    // Stage 3: generic fallback, any video with a source.
    page.media.iter().find(|m| m.has_source)
}

/// Platform-specific candidate lookup.
///
/// One strategy per known platform; platforms without special structure
/// defer to the generic fallback by returning `None`.
fn detect_for_platform<'a>(platform: &Platform, page: &'a PageSnapshot) -> Option<&'a MediaElement> {
    match platform {
        Platform::Youtube => page.media.iter().find(|m| {
            m.video_width > YOUTUBE_MIN_WIDTH
                && m.video_height > YOUTUBE_MIN_HEIGHT
                && m.is_actively_playing()
        }),
        Platform::Vimeo => page
            .media
            .iter()
            .find(|m| m.attr("data-ready") == Some("true") || m.in_container("vp-video")),
        Platform::Twitch => page.media.iter().find(|m| {
            m.attr("data-a-target") == Some("video-player") || m.in_container("video-player")
        }),
        Platform::Netflix => page
            .media
            .iter()
            .find(|m| m.in_container("VideoContainer") || m.in_container("video-player")),
        _ => None,
    }
}

/// Resolves the best-effort title for the page.
///
/// Candidates are tried per platform from the most specific location down
/// to the page's generic metadata; whitespace-only candidates are skipped.
pub fn resolve_title(page: &PageSnapshot, platform: &Platform) -> String {
    let candidates: &[&Option<String>] = match platform {
        Platform::Youtube => &[&page.player_heading, &page.meta_title, &page.document_title],
        Platform::Vimeo | Platform::Netflix => {
            &[&page.player_heading, &page.og_title, &page.document_title]
        }
        _ => &[&page.og_title, &page.meta_title, &page.document_title],
    };

    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map_or_else(|| "Unknown Video".to_string(), str::to_string)
}

/// Builds the signature for whatever is playing on the page, if anything.
///
/// A candidate found through the platform or source fallbacks still has to
/// be unpaused with playback underway to count as presence.
pub fn build_signature(page: &PageSnapshot, now: DateTime<Utc>) -> Option<VideoSignature> {
    let media = find_active_media(page)?;
    if media.paused || media.current_time <= 0.0 {
        return None;
    }
    let platform = page
        .host()
        .map_or_else(|| Platform::Other("Unknown".to_string()), |h| Platform::from_host(&h));
    let title = resolve_title(page, &platform);

    Some(VideoSignature {
        platform,
        title,
        url: page.url.clone(),
        metrics: MediaMetrics::from(media),
        captured_at: now,
    })
}

/// Edge-triggered presence observer.
///
/// Holds the last observed signature and reports only transitions; the
/// stored signature is refreshed on every poll so status queries see live
/// metrics even between transitions.
#[derive(Debug)]
pub struct PresenceDetector {
    enabled: bool,
    current: Option<VideoSignature>,
}

impl Default for PresenceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceDetector {
    /// Creates an enabled detector with no current video.
    pub fn new() -> Self {
        Self {
            enabled: true,
            current: None,
        }
    }

    /// Observes one snapshot and reports a transition if one occurred.
    pub fn observe(&mut self, page: &PageSnapshot, now: DateTime<Utc>) -> Option<PresenceEvent> {
        if !self.enabled {
            return None;
        }

        let observed = build_signature(page, now);
        match (&self.current, observed) {
            (None, Some(signature)) => {
                self.current = Some(signature.clone());
                Some(PresenceEvent::Playing(signature))
            }
            (Some(_), None) => {
                self.current = None;
                Some(PresenceEvent::Stopped)
            }
            (Some(previous), Some(signature)) => {
                let changed = !previous.same_video(&signature);
                // Refresh metrics either way; identity only changes on edges.
                self.current = Some(signature.clone());
                changed.then_some(PresenceEvent::Playing(signature))
            }
            (None, None) => None,
        }
    }

    /// The live signature of the current video, or `None` when idle or
    /// disabled.
    pub fn current(&self) -> Option<&VideoSignature> {
        self.enabled.then_some(self.current.as_ref()).flatten()
    }

    /// Enables or disables observation. Disabling drops the current video
    /// so status queries answer `None` until re-enabled.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.current = None;
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}
