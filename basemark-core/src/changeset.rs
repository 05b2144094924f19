//! Which files differ from their baselines.
//!
//! A [`ChangeSet`] is derived data: it is recomputed from the latest files and
//! baselines every time and never cached, so its status values cannot go stale.

use crate::types::{BaselineMap, FileId, FileRecord};

/// How a changed file differs from its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    /// No baseline yet and the file has content.
    Added,
    /// A baseline exists and differs byte-for-byte from the content.
    Modified,
}

impl ChangeStatus {
    /// Single-letter badge for the source-control panel.
    pub fn badge(self) -> char {
        match self {
            ChangeStatus::Added => 'A',
            ChangeStatus::Modified => 'M',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    pub file_id: FileId,
    pub status: ChangeStatus,
}

/// Snapshot of changed files, in the order of the input file list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: Vec<ChangeEntry>,
}

impl ChangeSet {
    /// Classifies every plain-text file against `baselines`. Folders and
    /// storage-backed files are skipped; unchanged files are omitted.
    pub fn compute<'a>(files: impl IntoIterator<Item = &'a FileRecord>, baselines: &BaselineMap) -> Self {
        let entries = files
            .into_iter()
            .filter(|file| file.is_plain_text())
            .filter_map(|file| {
                let status = status_for(file.text(), baselines.get(&file.id).map(String::as_str))?;
                Some(ChangeEntry { file_id: file.id.clone(), status })
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    pub fn file_ids(&self) -> impl Iterator<Item = &FileId> {
        self.entries.iter().map(|e| &e.file_id)
    }

    pub fn status_of(&self, file: &FileId) -> Option<ChangeStatus> {
        self.entries.iter().find(|e| &e.file_id == file).map(|e| e.status)
    }

    pub fn contains(&self, file: &FileId) -> bool {
        self.status_of(file).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Status of one file's content against its optional baseline.
pub fn status_for(current: &str, baseline: Option<&str>) -> Option<ChangeStatus> {
    match baseline {
        None if !current.is_empty() => Some(ChangeStatus::Added),
        None => None,
        Some(base) if base != current => Some(ChangeStatus::Modified),
        Some(_) => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{FileKind, ProjectId};

    pub(crate) fn text_file(id: &str, content: &str) -> FileRecord {
        FileRecord {
            id: FileId::from(id),
            project_id: ProjectId::from("p"),
            name: format!("{id}.txt"),
            parent_id: None,
            kind: FileKind::File,
            content: Some(content.to_owned()),
            storage_id: None,
        }
    }

    fn baselines(pairs: &[(&str, &str)]) -> BaselineMap {
        pairs.iter().map(|(id, c)| (FileId::from(*id), (*c).to_owned())).collect()
    }

    #[test]
    fn classifies_added_modified_and_unchanged() {
        let files = vec![
            text_file("new", "hello"),
            text_file("edited", "a\nx\n"),
            text_file("same", "a\n"),
            text_file("empty-new", ""),
        ];
        let set = ChangeSet::compute(&files, &baselines(&[("edited", "a\nb\n"), ("same", "a\n")]));
        assert_eq!(
            set.entries(),
            &[
                ChangeEntry { file_id: FileId::from("new"), status: ChangeStatus::Added },
                ChangeEntry { file_id: FileId::from("edited"), status: ChangeStatus::Modified },
            ]
        );
    }

    #[test]
    fn empty_baseline_is_not_missing_baseline() {
        let files = vec![text_file("f", "hello")];
        let set = ChangeSet::compute(&files, &baselines(&[("f", "")]));
        assert_eq!(set.status_of(&FileId::from("f")), Some(ChangeStatus::Modified));

        let files = vec![text_file("f", "")];
        assert!(ChangeSet::compute(&files, &baselines(&[("f", "")])).is_empty());
        let set = ChangeSet::compute(&files, &baselines(&[("f", "gone")]));
        assert_eq!(set.status_of(&FileId::from("f")), Some(ChangeStatus::Modified));
    }

    #[test]
    fn new_file_with_empty_baseline_text_is_added() {
        let files = vec![text_file("hello", "hello")];
        let set = ChangeSet::compute(&files, &BaselineMap::new());
        assert_eq!(set.status_of(&FileId::from("hello")), Some(ChangeStatus::Added));
    }

    #[test]
    fn binary_files_and_folders_never_appear() {
        let mut binary = text_file("img", "\u{0}\u{1}");
        binary.storage_id = Some("blob-1".into());
        let mut folder = text_file("dir", "");
        folder.kind = FileKind::Folder;
        folder.content = Some("stray".into());

        let files = vec![binary, folder];
        let set = ChangeSet::compute(&files, &baselines(&[("img", "different")]));
        assert!(set.is_empty());
    }

    #[test]
    fn recompute_reflects_latest_snapshot() {
        let mut files = vec![text_file("f", "v1")];
        let mut base = baselines(&[("f", "v1")]);
        assert!(ChangeSet::compute(&files, &base).is_empty());

        files[0].content = Some("v2".into());
        assert!(ChangeSet::compute(&files, &base).contains(&FileId::from("f")));

        base.insert(FileId::from("f"), "v2".into());
        assert!(ChangeSet::compute(&files, &base).is_empty());
    }
}
