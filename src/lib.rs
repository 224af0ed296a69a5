//! Plugup - editor plugin set updater
//!
//! Resolves declared editor plugins to their newest upstream commits,
//! caches content hashes by commit, follows repository moves and
//! regenerates the nix expression packaging the set.

pub mod cache;
pub mod cli;
pub mod config;
pub mod current;
pub mod error;
pub mod input;
pub mod merge;
pub mod orchestrator;
mod persist;
pub mod plugin;
pub mod render;
pub mod repo;
pub mod retry;
pub mod ui;
pub mod updater;
pub mod upstream;
pub mod vcs;

pub use error::{PlugupError, PlugupResult};
