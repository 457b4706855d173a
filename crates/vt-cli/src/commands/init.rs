//! Init command: install identity and first-run seeding.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;

use vt_store::Store;

use crate::install;

/// Notification surface for the one-time welcome message.
///
/// Notification display belongs to an external collaborator; the default
/// implementation just prints.
pub trait Notifier {
    fn notify(&self, title: &str, message: &str);
}

/// Default notifier that writes to stdout.
pub struct PrintNotifier;

impl Notifier for PrintNotifier {
    fn notify(&self, title: &str, message: &str) {
        println!("{title}");
        println!("{message}");
    }
}

/// Runs the init command.
pub fn run(store: &Store, label: Option<&str>, notifier: &dyn Notifier) -> Result<()> {
    run_at(&install::install_json_path()?, store, label, notifier)
}

pub(crate) fn run_at(
    identity_path: &Path,
    store: &Store,
    label: Option<&str>,
    notifier: &dyn Notifier,
) -> Result<()> {
    let (identity, first_install) = install::init_install_at(identity_path, label)?;
    let seeded = store.seed_defaults(Utc::now())?;

    if first_install || seeded {
        notifier.notify(
            "Welcome to vidtrack!",
            "Start watching videos to begin tracking your sessions.",
        );
    }

    println!("Install ID: {}", identity.install_id);
    println!("Label:      {}", identity.label);
    println!("Saved to:   {}", identity_path.display());

    Ok(())
}
