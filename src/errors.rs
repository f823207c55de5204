// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Task, group and dependency failures are *not* errors: they travel as data
//! (`TaskCompletion`, `GroupOutcome`, blocked groups). This enum only covers
//! configuration problems and programming errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepobatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Dependency cycle between task groups: {0}")]
    DependencyCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Task group not found: {0}")]
    GroupNotFound(String),

    #[error("Task already started: {0}")]
    TaskAlreadyStarted(String),

    #[error("Can not execute git with empty executable")]
    GitExecutableMissing,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RepobatchError>;
