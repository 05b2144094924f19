//! Error taxonomy for the core.
//!
//! Persistence and authorization failures propagate unchanged to the caller,
//! which needs to show them ("commit failed"). Annotation problems never reach
//! this type: they are recovered locally by skipping and recomputing.

use thiserror::Error;

use crate::types::{FileId, ProjectId};

/// Errors surfaced by stores, staging, import, and suggestion sources.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The requesting identity does not own the project. Raised before any write.
    #[error("unauthorized")]
    Unauthorized,

    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),

    #[error("file {0} not found")]
    FileNotFound(FileId),

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A suggestion source failed. Callers log and discard these.
    #[error("suggestion request failed: {0}")]
    Suggestion(String),
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
