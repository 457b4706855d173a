//! Platform label resolution from page hostnames.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The streaming platform a video was detected on.
///
/// Known platforms are matched against a fixed, ordered hostname table;
/// anything else degrades to [`Platform::Other`] holding a label derived
/// from the first DNS label of the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    Youtube,
    Vimeo,
    Twitch,
    Netflix,
    PrimeVideo,
    Hulu,
    DisneyPlus,
    KhanAcademy,
    Coursera,
    Udemy,
    Edx,
    /// Unrecognized host, labelled by its capitalized first DNS label.
    Other(String),
}

/// Ordered hostname pattern table. First match wins, so more specific
/// patterns must come before looser ones.
const HOST_TABLE: &[(&[&str], Platform)] = &[
    (&["youtube.com", "youtu.be"], Platform::Youtube),
    (&["vimeo.com"], Platform::Vimeo),
    (&["twitch.tv"], Platform::Twitch),
    (&["netflix.com"], Platform::Netflix),
    (&["amazon.", "prime"], Platform::PrimeVideo),
    (&["hulu.com"], Platform::Hulu),
    (&["disney"], Platform::DisneyPlus),
    (&["khanacademy.org"], Platform::KhanAcademy),
    (&["coursera.org"], Platform::Coursera),
    (&["udemy.com"], Platform::Udemy),
    (&["edx.org"], Platform::Edx),
];

impl Platform {
    /// Resolves a platform from a page hostname.
    ///
    /// Matching is case-insensitive substring containment; a row with
    /// multiple patterns requires all of them (used for `amazon.` + `prime`).
    pub fn from_host(host: &str) -> Self {
        let host = host.to_lowercase();
        for (patterns, platform) in HOST_TABLE {
            if patterns.iter().all(|p| host.contains(p)) {
                return platform.clone();
            }
        }
        Self::Other(capitalize_first_label(&host))
    }

    /// Human-readable platform label.
    pub fn label(&self) -> &str {
        match self {
            Self::Youtube => "YouTube",
            Self::Vimeo => "Vimeo",
            Self::Twitch => "Twitch",
            Self::Netflix => "Netflix",
            Self::PrimeVideo => "Amazon Prime",
            Self::Hulu => "Hulu",
            Self::DisneyPlus => "Disney+",
            Self::KhanAcademy => "Khan Academy",
            Self::Coursera => "Coursera",
            Self::Udemy => "Udemy",
            Self::Edx => "edX",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        platform.label().to_string()
    }
}

impl From<String> for Platform {
    fn from(label: String) -> Self {
        match label.as_str() {
            "YouTube" => Self::Youtube,
            "Vimeo" => Self::Vimeo,
            "Twitch" => Self::Twitch,
            "Netflix" => Self::Netflix,
            "Amazon Prime" => Self::PrimeVideo,
            "Hulu" => Self::Hulu,
            "Disney+" => Self::DisneyPlus,
            "Khan Academy" => Self::KhanAcademy,
            "Coursera" => Self::Coursera,
            "Udemy" => Self::Udemy,
            "edX" => Self::Edx,
            _ => Self::Other(label),
        }
    }
}

/// Capitalizes the first DNS label of a host, stripping any `www.` prefix.
fn capitalize_first_label(host: &str) -> String {
    let host = host.strip_prefix("www.").unwrap_or(host);
    let label = host.split('.').next().unwrap_or(host);
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
