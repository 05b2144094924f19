//! Owned data types shared by the engine, the stores, and the front end.
//!
//! Identifiers are opaque strings issued by the persistence layer (UUID v4 text
//! for rows created by [`crate::db`]). Nothing here borrows, so every value can
//! cross a task boundary or be stored in UI state directly.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a project (the unit of ownership and of tab sessions).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

/// Identifier of a file or folder inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub String);

macro_rules! string_id {
    ($ty:ident) => {
        impl $ty {
            /// Generates a fresh UUID v4 identifier.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Borrows the identifier text.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $ty {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(ProjectId);
string_id!(FileId);

/// Whether a tree entry is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Folder,
}

impl FileKind {
    /// Column value used by the `files.kind` CHECK constraint.
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::File => "file",
            FileKind::Folder => "folder",
        }
    }

    /// Parses the column value; anything unknown is treated as a file.
    pub fn parse(s: &str) -> Self {
        match s {
            "folder" => FileKind::Folder,
            _ => FileKind::File,
        }
    }
}

/// The identity making a request. Compared against `projects.owner_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
}

impl Identity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self { subject: subject.into() }
    }
}

/// A project row.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: ProjectId,
    pub owner_id: String,
    pub name: String,
    pub created_at: i64, // Unix timestamp milliseconds
}

/// A file or folder in the document collection.
///
/// `storage_id` is present only for binary or otherwise opaque files whose
/// bytes live outside the text column; those are never diffed or edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: FileId,
    pub project_id: ProjectId,
    pub name: String,
    pub parent_id: Option<FileId>,
    pub kind: FileKind,
    pub content: Option<String>,
    pub storage_id: Option<String>,
}

impl FileRecord {
    /// True for files whose content is editable text.
    pub fn is_plain_text(&self) -> bool {
        self.kind == FileKind::File && self.storage_id.is_none()
    }

    /// Current content, with a missing column read as the empty string.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Last-committed content of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub file_id: FileId,
    pub content: String,
    pub updated_at: i64, // Unix timestamp milliseconds
}

/// One entry of a commit: the content that becomes the file's new baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineUpdate {
    pub file_id: FileId,
    pub content: String,
}

/// Baseline content keyed by file. A missing key means "no baseline yet",
/// which is distinct from an empty-string baseline.
pub type BaselineMap = HashMap<FileId, String>;

/// Builds a [`BaselineMap`] from the rows returned by a baseline store.
pub fn baseline_map(baselines: impl IntoIterator<Item = Baseline>) -> BaselineMap {
    baselines.into_iter().map(|b| (b.file_id, b.content)).collect()
}
