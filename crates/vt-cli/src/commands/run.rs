//! Run command: the tracker daemon.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use fs2::FileExt;
use tokio::io::BufReader;

use vt_core::TabId;
use vt_store::Store;

use crate::Config;
use crate::service::{self, LogBadge};

/// Runs the tracker against a feed file, or stdin when none is given.
///
/// An exclusive lock next to the database keeps this the only tracker
/// instance writing the session table, which is what makes the
/// single-active-session invariant hold system-wide.
pub fn run(config: &Config, feed: Option<&Path>, tab: &str) -> Result<()> {
    let tab = TabId::new(tab).context("invalid tab id")?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let lock_path = config.database_path.with_extension("lock");
    let lock_file = File::create(&lock_path).context("failed to create lock file")?;
    lock_file
        .try_lock_exclusive()
        .context("another tracker instance is already running")?;

    let store = Store::open(&config.database_path).context("failed to open session store")?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    runtime.block_on(async {
        match feed {
            Some(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("failed to open feed {}", path.display()))?;
                service::run(BufReader::new(file), store, config, tab, Box::new(LogBadge)).await
            }
            None => {
                service::run(
                    BufReader::new(tokio::io::stdin()),
                    store,
                    config,
                    tab,
                    Box::new(LogBadge),
                )
                .await
            }
        }
    })?;

    drop(lock_file);
    Ok(())
}
