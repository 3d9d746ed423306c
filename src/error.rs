//! Error types for the shell library.
//!
//! Nothing here ever reaches the end user from the dispatch path: dispatch
//! failures are logged and absorbed. These types exist for configuration,
//! catalog loading and the surface backend.

use std::path::PathBuf;

use thiserror::Error;

use crate::action::Action;

/// Loading or saving the persisted shell configuration failed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config at {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("no platform config directory available")]
    NoConfigDir,
}

/// A selector catalog violates one of its construction rules.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog entry for '{action}' has no candidates, fallback or builtin")]
    EmptyEntry { action: Action },

    #[error("'{action}' is a surface control and cannot have a catalog entry")]
    DirectControlEntry { action: Action },

    #[error(
        "catalog entry for '{action}': candidate #{index} '{locator}' is more specific than the one before it"
    )]
    SpecificityOrder {
        action: Action,
        index: usize,
        locator: String,
    },

    #[error("catalog entry for '{action}' has an empty locator at #{index}")]
    EmptyLocator { action: Action, index: usize },

    #[error("failed to read catalog at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("catalog at {path} is not valid: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// A direct call on the target surface failed.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("surface backend error during {operation}: {reason}")]
    Backend {
        operation: &'static str,
        reason: String,
    },

    #[error("surface has been closed")]
    Closed,
}

impl SurfaceError {
    pub fn backend(operation: &'static str, err: impl std::fmt::Display) -> Self {
        SurfaceError::Backend {
            operation,
            reason: err.to_string(),
        }
    }
}
