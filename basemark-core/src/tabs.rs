//! Per-project tab sessions.
//!
//! Each project owns an independent [`TabSession`]: the ordered open tabs, the
//! active tab, an optional preview tab, and the files currently shown in the
//! two-pane diff view. Sessions are created lazily with empty defaults the
//! first time a project is touched. Every transition is synchronous.

use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::types::{FileId, ProjectId};

/// Options for [`TabSessionStore::open_file`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Open as a permanent tab rather than a reusable preview.
    pub pinned: bool,
    /// Show the file in the two-pane diff view.
    pub diff: bool,
}

impl OpenOptions {
    pub fn pinned() -> Self {
        Self { pinned: true, diff: false }
    }

    pub fn preview() -> Self {
        Self { pinned: false, diff: false }
    }

    pub fn with_diff(mut self, diff: bool) -> Self {
        self.diff = diff;
        self
    }
}

/// How a non-pinned open treats the preview slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewPolicy {
    /// Every newly opened tab is permanent and any existing preview tab is
    /// promoted. `pinned` has no effect on ordering.
    #[default]
    #[serde(alias = "pin")]
    AlwaysPin,
    /// Non-pinned opens replace the current preview tab in place and become
    /// the new preview (single-click preview).
    #[serde(alias = "reuse")]
    ReusePreview,
}

/// Tab state of one project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabSession {
    pub open_tabs: Vec<FileId>,
    pub active_tab: Option<FileId>,
    pub preview_tab: Option<FileId>,
    pub diff_mode: BTreeSet<FileId>,
}

impl TabSession {
    pub fn is_open(&self, file: &FileId) -> bool {
        self.open_tabs.contains(file)
    }

    pub fn is_diff_mode(&self, file: &FileId) -> bool {
        self.diff_mode.contains(file)
    }

    fn set_diff_mode(&mut self, file: &FileId, diff: bool) {
        if diff {
            self.diff_mode.insert(file.clone());
        } else {
            self.diff_mode.remove(file);
        }
    }
}

/// All tab sessions, keyed by project.
#[derive(Debug, Clone, Default)]
pub struct TabSessionStore {
    sessions: HashMap<ProjectId, TabSession>,
    policy: PreviewPolicy,
}

impl TabSessionStore {
    pub fn new(policy: PreviewPolicy) -> Self {
        Self { sessions: HashMap::new(), policy }
    }

    pub fn policy(&self) -> PreviewPolicy {
        self.policy
    }

    /// Read-only view of a project's session (empty if never touched).
    pub fn session(&self, project: &ProjectId) -> TabSession {
        self.sessions.get(project).cloned().unwrap_or_default()
    }

    /// Projects that have a session, in no particular order.
    pub fn projects(&self) -> impl Iterator<Item = &ProjectId> {
        self.sessions.keys()
    }

    pub fn active_tab(&self, project: &ProjectId) -> Option<&FileId> {
        self.sessions.get(project).and_then(|s| s.active_tab.as_ref())
    }

    pub fn is_diff_mode(&self, project: &ProjectId, file: &FileId) -> bool {
        self.sessions.get(project).is_some_and(|s| s.is_diff_mode(file))
    }

    fn session_mut(&mut self, project: &ProjectId) -> &mut TabSession {
        self.sessions.entry(project.clone()).or_default()
    }

    /// Opens `file` (or focuses it when already open) and sets its diff flag
    /// from `options.diff`.
    ///
    /// A file that is already open keeps its position. A new file is appended
    /// and activated; under [`PreviewPolicy::AlwaysPin`] the preview slot is
    /// cleared, under [`PreviewPolicy::ReusePreview`] a non-pinned open takes
    /// over the preview tab's position instead.
    pub fn open_file(&mut self, project: &ProjectId, file: &FileId, options: OpenOptions) {
        let policy = self.policy;
        let session = self.session_mut(project);
        session.set_diff_mode(file, options.diff);

        if session.is_open(file) {
            session.active_tab = Some(file.clone());
            if options.pinned && session.preview_tab.as_ref() == Some(file) {
                session.preview_tab = None;
            }
            debug!(%project, %file, "focused open tab");
            return;
        }

        match policy {
            PreviewPolicy::ReusePreview if !options.pinned => {
                let replaced = session.preview_tab.take();
                let slot = replaced
                    .as_ref()
                    .and_then(|prev| session.open_tabs.iter().position(|id| id == prev));
                match (slot, replaced) {
                    (Some(index), Some(prev)) => {
                        session.open_tabs[index] = file.clone();
                        session.diff_mode.remove(&prev);
                    }
                    _ => session.open_tabs.push(file.clone()),
                }
                session.preview_tab = Some(file.clone());
            }
            _ => {
                session.open_tabs.push(file.clone());
                session.preview_tab = None;
            }
        }
        session.active_tab = Some(file.clone());
        debug!(%project, %file, tabs = session.open_tabs.len(), "opened tab");
    }

    /// Closes `file`. Returns `false` (and changes nothing) if it was not open.
    ///
    /// When the active tab closes, focus moves to the tab that slid into its
    /// position, or to the new last tab when it was the last one.
    pub fn close_tab(&mut self, project: &ProjectId, file: &FileId) -> bool {
        let session = self.session_mut(project);
        let Some(index) = session.open_tabs.iter().position(|id| id == file) else {
            return false;
        };

        session.open_tabs.remove(index);
        session.diff_mode.remove(file);
        if session.preview_tab.as_ref() == Some(file) {
            session.preview_tab = None;
        }
        if session.active_tab.as_ref() == Some(file) {
            session.active_tab = if session.open_tabs.is_empty() {
                None
            } else if index >= session.open_tabs.len() {
                session.open_tabs.last().cloned()
            } else {
                Some(session.open_tabs[index].clone())
            };
        }
        debug!(%project, %file, "closed tab");
        true
    }

    /// Resets the project's session to its empty defaults.
    pub fn close_all_tabs(&mut self, project: &ProjectId) {
        self.sessions.insert(project.clone(), TabSession::default());
    }

    /// Activates an open tab. Ids that are not open are refused (returns
    /// `false`) so the active tab always names an open file.
    pub fn set_active_tab(&mut self, project: &ProjectId, file: &FileId) -> bool {
        let session = self.session_mut(project);
        if !session.is_open(file) {
            warn!(%project, %file, "refusing to activate a tab that is not open");
            return false;
        }
        session.active_tab = Some(file.clone());
        true
    }

    /// Activates the tab `offset` positions away from the active one, wrapping.
    pub fn cycle_active_tab(&mut self, project: &ProjectId, offset: isize) -> Option<FileId> {
        let session = self.session_mut(project);
        let len = session.open_tabs.len();
        if len == 0 {
            return None;
        }
        let current = session
            .active_tab
            .as_ref()
            .and_then(|a| session.open_tabs.iter().position(|id| id == a))
            .unwrap_or(0);
        let next = (current as isize + offset).rem_euclid(len as isize) as usize;
        let file = session.open_tabs[next].clone();
        session.active_tab = Some(file.clone());
        Some(file)
    }
}
