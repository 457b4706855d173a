//! Clear command for dropping the session history.

use anyhow::Result;
use chrono::Utc;

use vt_store::Store;

/// Runs the clear command.
pub fn run(store: &mut Store) -> Result<()> {
    let count = store.load_sessions()?.len();
    store.clear_sessions(Utc::now())?;
    println!("Cleared {count} session(s).");
    Ok(())
}
