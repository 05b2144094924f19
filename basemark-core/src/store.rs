//! Persistence contracts the engine depends on.
//!
//! Both collections check ownership first: the requesting [`Identity`] must own
//! the project. Reads by a non-owner see nothing; writes by a non-owner fail
//! with [`CoreError::Unauthorized`](crate::error::CoreError::Unauthorized)
//! before anything is touched. [`crate::db::SqliteStore`] implements both.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Baseline, BaselineUpdate, FileId, FileKind, FileRecord, Identity, Project, ProjectId};

/// Last-committed content per (project, file).
#[async_trait]
pub trait BaselineStore: Send + Sync {
    /// All baselines of `project`, or an empty list for a non-owner.
    async fn get_all(&self, identity: &Identity, project: &ProjectId) -> Result<Vec<Baseline>>;

    /// Inserts or replaces one baseline per update, all-or-nothing, stamped
    /// with the time of the call.
    async fn upsert_batch(
        &self,
        identity: &Identity,
        project: &ProjectId,
        updates: Vec<BaselineUpdate>,
    ) -> Result<()>;
}

/// Fields of a file to be created.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub parent_id: Option<FileId>,
    pub kind: FileKind,
    pub content: Option<String>,
    pub storage_id: Option<String>,
}

impl NewFile {
    pub fn folder(name: impl Into<String>, parent_id: Option<FileId>) -> Self {
        Self { name: name.into(), parent_id, kind: FileKind::Folder, content: None, storage_id: None }
    }

    pub fn text(name: impl Into<String>, parent_id: Option<FileId>, content: impl Into<String>) -> Self {
        Self { name: name.into(), parent_id, kind: FileKind::File, content: Some(content.into()), storage_id: None }
    }

    /// A file whose bytes live outside the text column.
    pub fn stored(name: impl Into<String>, parent_id: Option<FileId>, storage_id: impl Into<String>) -> Self {
        Self { name: name.into(), parent_id, kind: FileKind::File, content: None, storage_id: Some(storage_id.into()) }
    }
}

/// The project document collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_project(&self, identity: &Identity, name: &str) -> Result<Project>;

    /// Looks up an owned project by name.
    async fn find_project(&self, identity: &Identity, name: &str) -> Result<Option<Project>>;

    async fn create_file(&self, identity: &Identity, project: &ProjectId, file: NewFile) -> Result<FileRecord>;

    /// Every file and folder of the project, in creation order.
    async fn list_by_project(&self, identity: &Identity, project: &ProjectId) -> Result<Vec<FileRecord>>;

    async fn get(&self, identity: &Identity, file: &FileId) -> Result<Option<FileRecord>>;

    /// Replaces the text content of a file.
    async fn patch_content(&self, identity: &Identity, file: &FileId, content: &str) -> Result<()>;
}
