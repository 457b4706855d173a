//! Install identity management.
//!
//! Each install gets a persistent UUID stored in `install.json`, created by
//! `vt init`. The identity distinguishes a fresh install (seed defaults,
//! show the welcome notice) from an upgrade of an existing one.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Install identity stored in `install.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallIdentity {
    /// Persistent UUID for this install.
    pub install_id: String,
    /// Human-friendly label (e.g. "workbox").
    pub label: String,
    /// When the install was first initialized.
    pub installed_at: DateTime<Utc>,
}

/// Returns the path to install.json in the data directory.
pub fn install_json_path() -> Result<PathBuf> {
    let data_dir = crate::config::dirs_data_path().context("could not determine data directory")?;
    Ok(data_dir.join("install.json"))
}

/// Loads install identity from a specific path.
///
/// Returns `None` if the file doesn't exist.
fn load_from(path: &Path) -> Result<Option<InstallIdentity>> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let identity: InstallIdentity =
                serde_json::from_str(&content).context("failed to parse install.json")?;
            Ok(Some(identity))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).context("failed to read install.json"),
    }
}

/// Initializes the install identity.
///
/// If install.json already exists, returns the existing identity (updating
/// the label if a new one is provided). Otherwise generates a new UUID and
/// writes the file. The boolean reports whether this was a first install.
pub fn init_install(label: Option<&str>) -> Result<(InstallIdentity, bool)> {
    init_install_at(&install_json_path()?, label)
}

/// Initializes the install identity at a specific path.
pub(crate) fn init_install_at(
    path: &Path,
    label: Option<&str>,
) -> Result<(InstallIdentity, bool)> {
    let default_label = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    if let Some(mut existing) = load_from(path)? {
        if let Some(new_label) = label {
            existing.label = new_label.to_string();
            save_to(path, &existing)?;
        }
        return Ok((existing, false));
    }

    let identity = InstallIdentity {
        install_id: Uuid::new_v4().to_string(),
        label: label.unwrap_or(&default_label).to_string(),
        installed_at: Utc::now(),
    };
    save_to(path, &identity)?;
    Ok((identity, true))
}

/// Writes install identity to a specific path.
fn save_to(path: &Path, identity: &InstallIdentity) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("failed to create data directory")?;
    }
    let json = serde_json::to_string_pretty(identity).context("failed to serialize identity")?;
    std::fs::write(path, json).context("failed to write install.json")?;
    Ok(())
}
