//! Video signatures and the same-video identity rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::page::MediaElement;
use crate::platform::Platform;

/// Playback metrics captured alongside a signature.
///
/// Metrics describe the element at detection time and go stale while a
/// session runs; only platform, title, and url participate in identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetrics {
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub video_width: u32,
    #[serde(default)]
    pub video_height: u32,
    #[serde(default)]
    pub volume: f64,
    #[serde(default = "default_playback_rate")]
    pub playback_rate: f64,
}

fn default_playback_rate() -> f64 {
    1.0
}

impl Default for MediaMetrics {
    fn default() -> Self {
        Self {
            duration: 0.0,
            current_time: 0.0,
            is_playing: false,
            video_width: 0,
            video_height: 0,
            volume: 0.0,
            playback_rate: 1.0,
        }
    }
}

impl From<&MediaElement> for MediaMetrics {
    fn from(media: &MediaElement) -> Self {
        Self {
            duration: media.duration,
            current_time: media.current_time,
            is_playing: !media.paused && !media.ended,
            video_width: media.video_width,
            video_height: media.video_height,
            volume: media.volume,
            playback_rate: media.playback_rate,
        }
    }
}

/// The identity of "what is playing" on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSignature {
    pub platform: Platform,
    pub title: String,
    pub url: String,
    #[serde(flatten)]
    pub metrics: MediaMetrics,
    /// When this signature was captured.
    pub captured_at: DateTime<Utc>,
}

impl VideoSignature {
    /// Whether two signatures identify the same video.
    ///
    /// Hostnames must match. YouTube pages are compared by the `v` query
    /// parameter (path changes like `/watch` vs `/watch?...` carry no
    /// identity there); every other platform compares the path. A URL that
    /// fails to parse makes the comparison answer "same video" so a
    /// malformed location never forces a spurious rollover.
    pub fn same_video(&self, other: &Self) -> bool {
        match (Url::parse(&self.url), Url::parse(&other.url)) {
            (Ok(a), Ok(b)) => {
                let (Some(host_a), Some(host_b)) = (a.host_str(), b.host_str()) else {
                    return true;
                };
                if host_a != host_b {
                    return false;
                }
                if host_a.contains("youtube.com") {
                    video_id_param(&a) == video_id_param(&b)
                } else {
                    a.path() == b.path()
                }
            }
            _ => {
                tracing::debug!(
                    left = %self.url,
                    right = %other.url,
                    "unparseable url in identity comparison, treating as same video"
                );
                true
            }
        }
    }
}

/// The YouTube `v` query parameter, if present.
fn video_id_param(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
}
