//! Page snapshot model.
//!
//! The detector never touches a live DOM; it runs against [`PageSnapshot`]
//! values produced by the page-context collaborator. A snapshot is a sparse
//! projection of what a content script can observe: the page location, the
//! title candidates the known platforms expose, and one entry per media
//! element with its playback state and selector hooks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A point-in-time view of a page and its media elements.
///
/// Every field except `url` is optional so partial snapshots (early page
/// load, platforms without metadata) still deserialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    /// The page location at capture time.
    pub url: String,
    /// The document title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_title: Option<String>,
    /// `<meta name="title">` content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,
    /// `<meta property="og:title">` content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_title: Option<String>,
    /// Text of the platform's player heading (e.g. the watch-page `h1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_heading: Option<String>,
    /// Media elements present on the page, in document order.
    #[serde(default)]
    pub media: Vec<MediaElement>,
}

impl PageSnapshot {
    /// Hostname portion of the page URL, if it parses.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
    }
}

/// One media element as observed in the page.
///
/// `attrs` carries element attributes (`data-ready`, `data-a-target`, ...)
/// and `containers` carries ancestor class / test-id markers (`vp-video`,
/// `VideoContainer`, ...) so the platform strategies can express their
/// selector hooks without a DOM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaElement {
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub ended: bool,
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub duration: f64,
    /// HTMLMediaElement readyState, 0 (nothing) through 4 (enough data).
    #[serde(default)]
    pub ready_state: u8,
    #[serde(default)]
    pub video_width: u32,
    #[serde(default)]
    pub video_height: u32,
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default = "default_playback_rate")]
    pub playback_rate: f64,
    /// Whether the element has a `src` or `<source>` child.
    #[serde(default)]
    pub has_source: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<String>,
}

fn default_volume() -> f64 {
    1.0
}

fn default_playback_rate() -> f64 {
    1.0
}

impl Default for MediaElement {
    fn default() -> Self {
        Self {
            paused: false,
            ended: false,
            current_time: 0.0,
            duration: 0.0,
            ready_state: 0,
            video_width: 0,
            video_height: 0,
            volume: default_volume(),
            playback_rate: default_playback_rate(),
            has_source: false,
            attrs: BTreeMap::new(),
            containers: Vec::new(),
        }
    }
}

impl MediaElement {
    /// Whether this element is genuinely playing user content.
    ///
    /// Filters out decorative, preload, and ad-slot elements that exist in
    /// the page but have never started, have no buffered data, or render at
    /// zero size.
    pub fn is_actively_playing(&self) -> bool {
        !self.paused
            && !self.ended
            && self.current_time > 0.0
            && self.ready_state > 2
            && self.video_width > 0
            && self.video_height > 0
    }

    /// Attribute lookup.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Whether any ancestor marker matches.
    pub fn in_container(&self, marker: &str) -> bool {
        self.containers.iter().any(|c| c == marker)
    }
}
