// src/fs/mod.rs

//! Filesystem access used by the engine.
//!
//! Two things touch the disk outside of git itself: reading the batch file,
//! and watching for a repository directory to appear while another group
//! (typically a `git clone`) is still running. Both go through
//! [`FileSystem`] so the coordinator can be driven against
//! [`mock::MockFileSystem`] in tests.

use std::fmt::Debug;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

pub mod mock;

pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Whether a checkout directory is present at `path`. A plain file with
    /// that name does not count.
    fn has_checkout(&self, path: &Path) -> bool {
        self.exists(path) && self.is_dir(path)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading batch file {}", path.display()))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        fs::metadata(path).is_ok_and(|m| m.is_dir())
    }
}
