//! Core domain logic for the video watch tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Presence detection: finding the genuinely playing video in a page
//!   snapshot and resolving its signature
//! - The session tracker state machine: opening, rolling over, and
//!   finalizing watch sessions with stale-gap-aware time accumulation
//! - The action-tagged message protocol between detector, tracker, and UI
//!
//! Everything here is synchronous and I/O-free; timers, channels, and
//! persistence live in the service layer.

pub mod detect;
pub mod page;
pub mod platform;
pub mod proto;
pub mod session;
pub mod stats;
pub mod tracker;

mod signature;
mod types;

pub use detect::{PresenceDetector, PresenceEvent, build_signature, find_active_media, resolve_title};
pub use page::{MediaElement, PageSnapshot};
pub use platform::Platform;
pub use session::{STALE_GAP_SECS, WatchSession};
pub use signature::{MediaMetrics, VideoSignature};
pub use stats::SessionStats;
pub use tracker::{Tracker, Transition};
pub use types::{SessionId, TabId, ValidationError};
