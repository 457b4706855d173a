//! Action-tagged message protocol between the detector, tracker, and UI.
//!
//! Wire shapes match the storage-era protocol exactly: every request carries
//! an `action` tag, responses are bare payload objects, and an unknown or
//! malformed action yields an error payload instead of a dropped reply.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::WatchSession;
use crate::signature::VideoSignature;

/// Protocol-level errors.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// The payload was not a known action-tagged request.
    #[error("unknown or malformed action: {0}")]
    InvalidRequest(#[source] serde_json::Error),
}

/// A request to the session tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Presence or identity transition from the detector.
    #[serde(rename_all = "camelCase")]
    VideoStatusChanged {
        #[serde(default)]
        video_data: Option<VideoSignature>,
    },
    /// Full history query.
    GetVideoSessions,
    /// Drop all sessions.
    ClearVideoHistory,
    /// Live signature of the current video, independent of sessions.
    GetVideoStatus,
    /// Enable or disable tracking.
    #[serde(rename_all = "camelCase")]
    ToggleTracking { is_tracking: bool },
}

impl Request {
    /// Parses a request from its JSON wire form.
    pub fn parse(payload: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(payload).map_err(ProtoError::InvalidRequest)
    }
}

/// A response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Sessions {
        sessions: Vec<WatchSession>,
    },
    #[serde(rename_all = "camelCase")]
    VideoData {
        video_data: Option<VideoSignature>,
    },
    Success {
        success: bool,
    },
    Error {
        error: String,
    },
}

impl Response {
    /// The error payload for an unrecognized request.
    pub fn unknown_action() -> Self {
        Self::Error {
            error: "Unknown action".to_string(),
        }
    }
}
