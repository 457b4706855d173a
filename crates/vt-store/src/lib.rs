//! Persistence layer for the video watch tracker.
//!
//! The tracker's storage contract is a small key-value surface: the full
//! session mapping as one snapshot value, the tracking flag, and the user
//! settings object. This crate implements it over `rusqlite` with a single
//! `kv` table holding JSON values.
//!
//! # Thread Safety
//!
//! [`Store`] wraps a `rusqlite::Connection`, which is `Send` but not `Sync`:
//! a store can be moved between threads but not shared without external
//! synchronization. The service layer owns one store inside its persist
//! task, which is all the synchronization the snapshot model needs.
//!
//! # Snapshot semantics
//!
//! `videoSessions` is always written whole (the full insertion-ordered
//! mapping) together with `lastSaved` in one transaction. Writers never
//! merge; the last snapshot wins. Timestamps are stored in RFC 3339 so the
//! values stay human-readable in the database.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vt_core::{SessionId, WatchSession};

/// Storage keys, mirrored from the wire contract.
const KEY_SESSIONS: &str = "videoSessions";
const KEY_LAST_SAVED: &str = "lastSaved";
const KEY_IS_TRACKING: &str = "isTracking";
const KEY_SETTINGS: &str = "settings";
const KEY_FIRST_INSTALL: &str = "firstInstall";

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored value failed to serialize or deserialize.
    #[error("invalid stored value for key {key}")]
    Value {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Recognized user settings, seeded on first install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub auto_quiz: bool,
    pub notifications: bool,
    /// Minimum session length, in seconds, for UI surfaces that filter
    /// short sessions. Stored, not enforced here.
    pub min_watch_time: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_quiz: true,
            notifications: true,
            min_watch_time: 60,
        }
    }
}

/// Key-value store connection wrapper.
///
/// See the [module documentation](self) for thread safety and snapshot
/// semantics.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens a store at the given path, creating it if necessary.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Opens an in-memory store.
    ///
    /// The synchronous double for tests and for service construction in
    /// ephemeral runs; destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Initializes the schema. Idempotent.
    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Writes the full session mapping and `lastSaved` in one transaction.
    pub fn save_sessions(
        &mut self,
        sessions: &[WatchSession],
        saved_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let pairs: Vec<(&SessionId, &WatchSession)> =
            sessions.iter().map(|s| (&s.id, s)).collect();
        let sessions_json = serde_json::to_string(&pairs).map_err(|source| StoreError::Value {
            key: KEY_SESSIONS,
            source,
        })?;
        let saved_at_json =
            serde_json::to_string(&saved_at.to_rfc3339()).map_err(|source| StoreError::Value {
                key: KEY_LAST_SAVED,
                source,
            })?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)",
            params![KEY_SESSIONS, sessions_json],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)",
            params![KEY_LAST_SAVED, saved_at_json],
        )?;
        tx.commit()?;

        tracing::debug!(count = sessions.len(), "saved session snapshot");
        Ok(())
    }

    /// Loads the session mapping in stored order. Absent means empty.
    pub fn load_sessions(&self) -> Result<Vec<WatchSession>, StoreError> {
        let pairs: Option<Vec<(SessionId, WatchSession)>> = self.get_json(KEY_SESSIONS)?;
        Ok(pairs
            .unwrap_or_default()
            .into_iter()
            .map(|(_, session)| session)
            .collect())
    }

    /// Persists the empty mapping.
    pub fn clear_sessions(&mut self, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.save_sessions(&[], now)
    }

    /// When the mapping was last saved, if ever.
    pub fn last_saved(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let raw: Option<String> = self.get_json(KEY_LAST_SAVED)?;
        Ok(raw
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }

    /// The tracking flag. Absent reads as enabled.
    pub fn is_tracking(&self) -> Result<bool, StoreError> {
        Ok(self.get_json(KEY_IS_TRACKING)?.unwrap_or(true))
    }

    pub fn set_tracking(&self, enabled: bool) -> Result<(), StoreError> {
        self.set_json(KEY_IS_TRACKING, &enabled)
    }

    /// The settings object. Absent reads as defaults.
    pub fn settings(&self) -> Result<Settings, StoreError> {
        Ok(self.get_json(KEY_SETTINGS)?.unwrap_or_default())
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        self.set_json(KEY_SETTINGS, settings)
    }

    /// First-install hook: seeds settings, the tracking flag, and the
    /// install timestamp, only when absent. Returns whether anything was
    /// seeded, so the caller can show its one-time welcome exactly once.
    pub fn seed_defaults(&self, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let already_installed: Option<String> = self.get_json(KEY_FIRST_INSTALL)?;
        if already_installed.is_some() {
            return Ok(false);
        }

        self.set_json(KEY_FIRST_INSTALL, &now.to_rfc3339())?;
        self.set_json(KEY_IS_TRACKING, &true)?;
        self.save_settings(&Settings::default())?;
        tracing::info!("seeded first-install defaults");
        Ok(true)
    }

    /// The first-install timestamp, if seeded.
    pub fn first_install(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let raw: Option<String> = self.get_json(KEY_FIRST_INSTALL)?;
        Ok(raw
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }

    fn get_json<T: DeserializeOwned>(&self, key: &'static str) -> Result<Option<T>, StoreError> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        raw.map(|value| {
            serde_json::from_str(&value).map_err(|source| StoreError::Value { key, source })
        })
        .transpose()
    }

    fn set_json<T: Serialize>(&self, key: &'static str, value: &T) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(value).map_err(|source| StoreError::Value { key, source })?;
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)",
            params![key, json],
        )?;
        Ok(())
    }
}
