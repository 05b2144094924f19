//! Seeds a project from a directory on disk.
//!
//! Every folder and file under the root becomes a row in the document
//! collection, parented the same way it is nested on disk. Files that are not
//! valid UTF-8 are recorded with a `storage_id` pointing at their path and no
//! content, so they never reach the diff engine. Hidden entries (leading `.`)
//! are skipped along with everything below them.
//!
//! Importing into a project that already has rows merges by (parent, name):
//! existing folders are reused and existing files are left untouched, so
//! importing the same tree twice creates nothing the second time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::error::{CoreError, Result};
use crate::store::{DocumentStore, NewFile};
use crate::types::{FileId, FileKind, Identity, ProjectId};

/// Counts of what an import created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub folders: usize,
    pub text_files: usize,
    pub binary_files: usize,
    /// Files already present under the same parent and name.
    pub skipped: usize,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

/// Imports the tree under `root` into `project`.
///
/// Entries are visited sorted by file name so repeated imports of the same
/// tree produce the same row order.
pub async fn import_directory(
    store: &dyn DocumentStore,
    identity: &Identity,
    project: &ProjectId,
    root: &Path,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let mut folders: HashMap<PathBuf, FileId> = HashMap::new();
    let mut existing: HashMap<(Option<FileId>, String), (FileId, FileKind)> = store
        .list_by_project(identity, project)
        .await?
        .into_iter()
        .map(|f| ((f.parent_id, f.name), (f.id, f.kind)))
        .collect();

    let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name().into_iter().filter_entry(|e| !is_hidden(e));
    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|e| CoreError::Io(e.into()))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let parent_id = path.parent().and_then(|p| folders.get(p)).cloned();
        let key = (parent_id.clone(), name.clone());

        if entry.file_type().is_dir() {
            match existing.get(&key) {
                Some((id, FileKind::Folder)) => {
                    folders.insert(path.to_path_buf(), id.clone());
                }
                Some(_) => {
                    debug!(path = %path.display(), "a file already has this folder's name, skipping its tree");
                    summary.skipped += 1;
                    walker.skip_current_dir();
                }
                None => {
                    let record = store
                        .create_file(identity, project, NewFile::folder(name, parent_id))
                        .await?;
                    existing.insert(key, (record.id.clone(), FileKind::Folder));
                    folders.insert(path.to_path_buf(), record.id);
                    summary.folders += 1;
                }
            }
            continue;
        }
        if !entry.file_type().is_file() {
            debug!(path = %path.display(), "skipping non-regular entry");
            continue;
        }
        if existing.contains_key(&key) {
            summary.skipped += 1;
            continue;
        }

        let bytes = tokio::fs::read(path).await?;
        let file = match String::from_utf8(bytes) {
            Ok(text) => {
                summary.text_files += 1;
                NewFile::text(name, parent_id, text)
            }
            Err(_) => {
                summary.binary_files += 1;
                let relative = path.strip_prefix(root).unwrap_or(path);
                NewFile::stored(name, parent_id, format!("local:{}", relative.display()))
            }
        };
        store.create_file(identity, project, file).await?;
    }

    info!(
        %project,
        root = %root.display(),
        folders = summary.folders,
        text_files = summary.text_files,
        binary_files = summary.binary_files,
        skipped = summary.skipped,
        "imported directory"
    );
    Ok(summary)
}
