//! Video watch tracker CLI library.
//!
//! This crate provides the CLI interface and the tokio service wiring for
//! the tracker.

mod cli;
pub mod commands;
mod config;
mod install;
mod service;

pub use cli::{Cli, Commands, TrackingState};
pub use config::Config;
