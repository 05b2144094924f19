//! The staging index: files marked for the next baseline commit.
//!
//! The index only stores ids. Which of them actually count is decided against
//! a freshly computed [`ChangeSet`] each time, so an id that is staged but no
//! longer changed simply shows up nowhere and is ignored by `commit`.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::changeset::{ChangeEntry, ChangeSet};
use crate::error::Result;
use crate::store::BaselineStore;
use crate::types::{BaselineMap, BaselineUpdate, FileId, FileRecord, Identity, ProjectId};

/// A commit the user asked for. Only constructible with a non-blank message.
///
/// The message is shown in the log and status bar; baselines keep no history,
/// so it is not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    message: String,
}

impl CommitRequest {
    pub fn new(message: &str) -> Option<Self> {
        let message = message.trim();
        (!message.is_empty()).then(|| Self { message: message.to_owned() })
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, Default)]
pub struct StagingIndex {
    staged: BTreeSet<FileId>,
}

impl StagingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `file` if it is not staged, unstages it otherwise. Returns the
    /// new state.
    pub fn toggle(&mut self, file: &FileId) -> bool {
        if self.staged.remove(file) {
            false
        } else {
            self.staged.insert(file.clone());
            true
        }
    }

    /// Replaces the staged set with every id of the change set.
    pub fn stage_all<'a>(&mut self, changed: impl IntoIterator<Item = &'a FileId>) {
        self.staged = changed.into_iter().cloned().collect();
    }

    pub fn unstage_all(&mut self) {
        self.staged.clear();
    }

    pub fn is_staged(&self, file: &FileId) -> bool {
        self.staged.contains(file)
    }

    /// Raw staged ids, including ids that are no longer changed.
    pub fn staged_ids(&self) -> impl Iterator<Item = &FileId> {
        self.staged.iter()
    }

    /// Splits the change set into (staged, unstaged), preserving its order.
    pub fn partition<'a>(&self, changes: &'a ChangeSet) -> (Vec<&'a ChangeEntry>, Vec<&'a ChangeEntry>) {
        changes.entries().iter().partition(|e| self.staged.contains(&e.file_id))
    }

    /// Commits the staged files that are still changed.
    ///
    /// Content is read from `files` now, not remembered from staging time, so
    /// edits made after staging are included. The staged set is cleared only
    /// when the store accepted the batch; on error it is left untouched for a
    /// retry. Returns how many baselines were written; zero means the store
    /// was not called.
    pub async fn commit(
        &mut self,
        store: &dyn BaselineStore,
        identity: &Identity,
        project: &ProjectId,
        files: &[FileRecord],
        baselines: &BaselineMap,
    ) -> Result<usize> {
        let changes = ChangeSet::compute(files, baselines);
        let updates: Vec<BaselineUpdate> = files
            .iter()
            .filter(|f| self.staged.contains(&f.id) && changes.contains(&f.id))
            .map(|f| BaselineUpdate { file_id: f.id.clone(), content: f.text().to_owned() })
            .collect();

        if updates.is_empty() {
            debug!(%project, "commit skipped: nothing staged");
            return Ok(0);
        }

        let count = updates.len();
        store.upsert_batch(identity, project, updates).await?;
        self.staged.clear();
        info!(%project, files = count, "committed baselines");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::changeset::tests::text_file;
    use crate::error::CoreError;
    use crate::types::{baseline_map, Baseline};

    /// Baseline store kept in memory, owned by "owner".
    #[derive(Default)]
    struct MemoryBaselines {
        rows: Mutex<HashMap<FileId, String>>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl BaselineStore for MemoryBaselines {
        async fn get_all(&self, identity: &Identity, _project: &ProjectId) -> Result<Vec<Baseline>> {
            if identity.subject != "owner" {
                return Ok(Vec::new());
            }
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .map(|(id, c)| Baseline { file_id: id.clone(), content: c.clone(), updated_at: 0 })
                .collect())
        }

        async fn upsert_batch(&self, identity: &Identity, _project: &ProjectId, updates: Vec<BaselineUpdate>) -> Result<()> {
            *self.calls.lock().unwrap() += 1;
            if identity.subject != "owner" {
                return Err(CoreError::Unauthorized);
            }
            let mut rows = self.rows.lock().unwrap();
            for u in updates {
                rows.insert(u.file_id, u.content);
            }
            Ok(())
        }
    }

    fn owner() -> Identity {
        Identity::new("owner")
    }

    fn project() -> ProjectId {
        ProjectId::from("p")
    }

    #[test]
    fn toggle_and_bulk_operations() {
        let mut index = StagingIndex::new();
        let a = FileId::from("a");
        assert!(index.toggle(&a));
        assert!(index.is_staged(&a));
        assert!(!index.toggle(&a));
        assert!(!index.is_staged(&a));

        let ids = [FileId::from("a"), FileId::from("b")];
        index.stage_all(ids.iter());
        assert_eq!(index.staged_ids().count(), 2);
        index.unstage_all();
        assert_eq!(index.staged_ids().count(), 0);
    }

    #[test]
    fn commit_request_needs_a_message() {
        assert!(CommitRequest::new("  \n").is_none());
        assert_eq!(CommitRequest::new(" fix typo ").unwrap().message(), "fix typo");
    }

    #[test]
    fn partition_ignores_ids_outside_the_change_set() {
        let files = vec![text_file("a", "1"), text_file("b", "2")];
        let changes = ChangeSet::compute(&files, &BaselineMap::new());
        let mut index = StagingIndex::new();
        index.toggle(&FileId::from("a"));
        index.toggle(&FileId::from("ghost"));

        let (staged, unstaged) = index.partition(&changes);
        assert_eq!(staged.iter().map(|e| e.file_id.as_str()).collect::<Vec<_>>(), ["a"]);
        assert_eq!(unstaged.iter().map(|e| e.file_id.as_str()).collect::<Vec<_>>(), ["b"]);
    }

    #[tokio::test]
    async fn empty_commit_does_not_call_the_store() {
        let store = MemoryBaselines::default();
        let mut index = StagingIndex::new();
        index.toggle(&FileId::from("ghost"));
        let files = vec![text_file("a", "1")];

        let n = index.commit(&store, &owner(), &project(), &files, &BaselineMap::new()).await.unwrap();
        assert_eq!(n, 0);
        assert_eq!(*store.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn commit_reads_content_at_commit_time_and_clears() {
        let store = MemoryBaselines::default();
        let mut files = vec![text_file("a", "staged version"), text_file("b", "unstaged")];
        let mut index = StagingIndex::new();
        index.toggle(&FileId::from("a"));

        // Edit after staging.
        files[0].content = Some("edited after staging".into());

        let n = index.commit(&store, &owner(), &project(), &files, &BaselineMap::new()).await.unwrap();
        assert_eq!(n, 1);
        assert_eq!(index.staged_ids().count(), 0);

        let baselines = baseline_map(store.get_all(&owner(), &project()).await.unwrap());
        assert_eq!(baselines.get(&FileId::from("a")).map(String::as_str), Some("edited after staging"));
        assert!(!baselines.contains_key(&FileId::from("b")));

        let changes = ChangeSet::compute(&files, &baselines);
        assert!(!changes.contains(&FileId::from("a")));
        assert!(changes.contains(&FileId::from("b")));
    }

    #[tokio::test]
    async fn failed_commit_keeps_the_staged_set() {
        let store = MemoryBaselines::default();
        let files = vec![text_file("a", "1")];
        let mut index = StagingIndex::new();
        index.toggle(&FileId::from("a"));

        let err = index
            .commit(&store, &Identity::new("intruder"), &project(), &files, &BaselineMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized));
        assert!(index.is_staged(&FileId::from("a")));
    }
}
