// src/config/mod.rs

//! Configuration loading and validation for repobatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a batch file through the [`FileSystem`](crate::fs::FileSystem)
//!   abstraction (`loader.rs`).
//! - Validate references and group dependencies (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_path_with};
pub use model::{BatchConfig, ConfigSection, GroupConfig, RawBatchConfig, RepoConfig, TaskConfig};
