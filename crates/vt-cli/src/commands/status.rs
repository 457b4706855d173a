//! Status command for tracking state and store health.

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use vt_store::Store;

pub fn run<W: Write>(writer: &mut W, store: &Store, database_path: &Path) -> Result<()> {
    let sessions = store.load_sessions()?;
    let active = sessions.iter().filter(|s| s.is_active).count();
    let tracking = store.is_tracking()?;
    let last_saved = store.last_saved()?;

    writeln!(writer, "Video tracker status")?;
    writeln!(writer, "Database: {}", database_path.display())?;
    writeln!(
        writer,
        "Tracking: {}",
        if tracking { "enabled" } else { "disabled" }
    )?;
    writeln!(writer, "Sessions: {} ({active} active)", sessions.len())?;
    match last_saved {
        Some(at) => writeln!(writer, "Last saved: {}", at.to_rfc3339())?,
        None => writeln!(writer, "Last saved: never")?,
    }

    Ok(())
}
