//! Configuration module for subrun
//!
//! Provides XDG-compliant layered configuration loading for the CLI.
//! The library API never reads configuration; defaults here only seed
//! command-line options.

pub mod loader;
pub mod model;

pub use loader::{config_paths, find_config_files, load_config};
pub use model::*;
