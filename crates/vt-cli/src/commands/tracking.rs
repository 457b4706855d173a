//! Tracking command for toggling the persisted tracking flag.

use anyhow::Result;

use vt_store::Store;

/// Runs the tracking command.
///
/// The flag is read by the daemon at startup; a running daemon is toggled
/// through the protocol's `toggleTracking` message instead.
pub fn run(store: &Store, enabled: bool) -> Result<()> {
    store.set_tracking(enabled)?;
    println!(
        "Tracking {}.",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}
