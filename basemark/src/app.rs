//! Central application state for basemark.
//!
//! This module owns everything the render path reads and the keybinding
//! dispatcher mutates: the current mode, which panel has focus, per-panel
//! scroll offsets and viewport heights, and the project's data (files,
//! baselines, staging index, change set, and the tab workspace). It performs
//! no I/O; saves and commits are carried out by the event loop in `main.rs`.

use std::collections::HashMap;

use basemark_core::changeset::{ChangeSet, ChangeStatus};
use basemark_core::staging::StagingIndex;
use basemark_core::tabs::{OpenOptions, PreviewPolicy};
use basemark_core::types::{BaselineMap, FileId, FileKind, FileRecord, Identity, Project};
use basemark_core::workspace::{SaveRequest, Workspace};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;

/// Editor mode controlling which keybinding set is active.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Navigation across panels and tabs (default).
    #[default]
    Normal,
    /// Typing into the active document.
    Insert,
    /// Typing the commit message.
    CommitMessage,
    /// Full-screen help overlay is shown above all panels.
    HelpOverlay,
}

/// Which panel currently has keyboard focus.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    /// Project file tree (top left).
    #[default]
    Files,
    /// Source-control panel (bottom left).
    Changes,
    /// Tab strip and the active document.
    Editor,
}

impl PanelFocus {
    /// Cycle order: `Files` → `Editor` → `Changes` → `Files` (reversed).
    pub fn prev(self) -> Self {
        match self {
            PanelFocus::Files => PanelFocus::Editor,
            PanelFocus::Changes => PanelFocus::Files,
            PanelFocus::Editor => PanelFocus::Changes,
        }
    }

    /// Cycle order: `Files` → `Changes` → `Editor` → `Files`.
    pub fn next(self) -> Self {
        match self {
            PanelFocus::Files => PanelFocus::Changes,
            PanelFocus::Changes => PanelFocus::Editor,
            PanelFocus::Editor => PanelFocus::Files,
        }
    }
}

/// One row of the file tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub id: FileId,
    pub name: String,
    pub depth: usize,
    pub kind: FileKind,
}

/// One entry of the source-control panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRow {
    pub file_id: FileId,
    pub status: ChangeStatus,
    pub staged: bool,
}

/// Transient message shown in the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub error: bool,
}

/// Flattens the project's files into display order: children directly below
/// their folder, folders before files, then by name.
pub fn flatten_tree(files: &[FileRecord]) -> Vec<TreeRow> {
    let mut children: HashMap<Option<&FileId>, Vec<&FileRecord>> = HashMap::new();
    for file in files {
        children.entry(file.parent_id.as_ref()).or_default().push(file);
    }
    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| {
            let folder_first = (b.kind == FileKind::Folder).cmp(&(a.kind == FileKind::Folder));
            folder_first.then_with(|| a.name.cmp(&b.name))
        });
    }

    let mut rows = Vec::with_capacity(files.len());
    // Stack of (record, depth), pushed in reverse so pops come out in order.
    let mut stack: Vec<(&FileRecord, usize)> =
        children.get(&None).map(|roots| roots.iter().rev().map(|f| (*f, 0)).collect()).unwrap_or_default();
    while let Some((file, depth)) = stack.pop() {
        rows.push(TreeRow { id: file.id.clone(), name: file.name.clone(), depth, kind: file.kind });
        // A malformed parent chain cannot nest deeper than the number of files.
        if depth >= files.len() {
            continue;
        }
        if let Some(kids) = children.get(&Some(&file.id)) {
            stack.extend(kids.iter().rev().map(|f| (*f, depth + 1)));
        }
    }
    rows
}

/// All mutable state passed through every render cycle.
pub struct AppState {
    pub mode: Mode,
    pub focus: PanelFocus,

    pub identity: Identity,
    pub project: Project,
    /// Files as last written to the store.
    pub files: Vec<FileRecord>,
    pub baselines: BaselineMap,
    pub staging: StagingIndex,
    /// Changes of the files as shown on screen, unsaved edits included.
    pub changes: ChangeSet,
    pub workspace: Workspace,
    /// Failed saves of files whose tab is closed, retried with the next write.
    pub unsaved: Vec<SaveRequest>,

    pub files_state: ListState,
    pub changes_state: ListState,
    pub commit_message: String,
    pub status: Option<StatusMessage>,

    /// First document line shown in the editor.
    pub editor_scroll: usize,
    pub help_scroll: u16,

    /// Inner heights after borders, cached after each render.
    pub files_viewport_height: u16,
    pub changes_viewport_height: u16,
    pub editor_viewport_height: u16,

    /// Width percentage of the left column (file tree and changes). Default: 25.
    pub left_pct: u16,
    /// `[files, changes, editor]` outer rects from the last render, for mouse focus.
    pub panel_rects: [Rect; 3],
}

impl AppState {
    pub fn new(
        identity: Identity,
        project: Project,
        files: Vec<FileRecord>,
        baselines: BaselineMap,
        policy: PreviewPolicy,
    ) -> Self {
        let workspace = Workspace::new(project.id.clone(), policy);
        let mut state = Self {
            mode: Mode::default(),
            focus: PanelFocus::default(),
            identity,
            project,
            files,
            baselines,
            staging: StagingIndex::new(),
            changes: ChangeSet::default(),
            workspace,
            unsaved: Vec::new(),
            files_state: ListState::default(),
            changes_state: ListState::default(),
            commit_message: String::new(),
            status: None,
            editor_scroll: 0,
            help_scroll: 0,
            files_viewport_height: 0,
            changes_viewport_height: 0,
            editor_viewport_height: 0,
            left_pct: 25,
            panel_rects: [Rect::default(); 3],
        };
        state.recompute_changes();
        if !state.files.is_empty() {
            state.files_state.select_first();
        }
        state
    }

    pub fn file(&self, id: &FileId) -> Option<&FileRecord> {
        self.files.iter().find(|f| &f.id == id)
    }

    pub fn file_name(&self, id: &FileId) -> &str {
        self.file(id).map(|f| f.name.as_str()).unwrap_or("?")
    }

    pub fn tree_rows(&self) -> Vec<TreeRow> {
        flatten_tree(&self.files)
    }

    /// Recomputes the change set from the saved files overlaid with unsaved
    /// editor text and failed saves.
    pub fn recompute_changes(&mut self) {
        let mut live = self.workspace.live_files(&self.files);
        for save in &self.unsaved {
            if let Some(file) = live.iter_mut().find(|f| f.id == save.file_id) {
                file.content = Some(save.content.clone());
            }
        }
        self.changes = ChangeSet::compute(&live, &self.baselines);
        clamp_selection(&mut self.changes_state, self.changes.len());
    }

    /// Staged entries first, then unstaged, each in change-set order.
    pub fn change_rows(&self) -> Vec<ChangeRow> {
        let (staged, unstaged) = self.staging.partition(&self.changes);
        let mut rows = Vec::with_capacity(self.changes.len());
        for (entries, staged) in [(staged, true), (unstaged, false)] {
            rows.extend(entries.into_iter().map(|e| ChangeRow { file_id: e.file_id.clone(), status: e.status, staged }));
        }
        rows
    }

    pub fn selected_change(&self) -> Option<ChangeRow> {
        let index = self.changes_state.selected()?;
        self.change_rows().into_iter().nth(index)
    }

    pub fn selected_tree_row(&self) -> Option<TreeRow> {
        let index = self.files_state.selected()?;
        self.tree_rows().into_iter().nth(index)
    }

    /// Opens a file in the workspace with its committed baseline.
    ///
    /// A file with a failed save opens with that text and is retried right
    /// away. Returns the content to write, including the unsaved content of
    /// any tab the open replaced.
    pub fn open_file(&mut self, id: &FileId, options: OpenOptions) -> Vec<SaveRequest> {
        let Some(mut record) = self.file(id).cloned() else {
            return Vec::new();
        };
        let position = self.unsaved.iter().position(|s| &s.file_id == id);
        let queued = position.map(|i| self.unsaved.remove(i));
        if let Some(save) = &queued {
            record.content = Some(save.content.clone());
        }
        let baseline = self.baselines.get(id).map(String::as_str);
        let (opened, mut saves) = self.workspace.open(&record, baseline, options);
        if opened {
            self.editor_scroll = 0;
            self.focus = PanelFocus::Editor;
        } else if record.kind == FileKind::File {
            self.set_error(format!("{} is not a text file", record.name));
        }
        if let Some(save) = queued {
            if opened {
                self.workspace.mark_unsaved(&save);
            }
            saves.push(save);
        }
        saves
    }

    /// Opens the selected source-control entry: staged files in the two-pane
    /// diff view, unstaged files as a preview.
    pub fn open_selected_change(&mut self) -> Vec<SaveRequest> {
        let Some(row) = self.selected_change() else {
            return Vec::new();
        };
        let options = OpenOptions::preview().with_diff(row.staged);
        self.open_file(&row.file_id, options)
    }

    /// Opens the selected file-tree row. Folders are ignored.
    pub fn open_selected_tree_row(&mut self, pinned: bool) -> Vec<SaveRequest> {
        match self.selected_tree_row() {
            Some(row) if row.kind == FileKind::File => {
                let options = if pinned { OpenOptions::pinned() } else { OpenOptions::preview() };
                self.open_file(&row.id, options)
            }
            _ => Vec::new(),
        }
    }

    /// Turns the active tab into a permanent one, keeping its view.
    pub fn pin_active(&mut self) -> Vec<SaveRequest> {
        let Some(id) = self.workspace.active_id().cloned() else {
            return Vec::new();
        };
        let diff = self.workspace.session().is_diff_mode(&id);
        self.open_file(&id, OpenOptions::pinned().with_diff(diff))
    }

    /// Switches the active tab between the editor and the two-pane diff view.
    pub fn toggle_diff_view(&mut self) -> bool {
        let Some(id) = self.workspace.active_id().cloned() else {
            return false;
        };
        let diff = !self.workspace.session().is_diff_mode(&id);
        self.workspace.set_diff_view(&id, diff)
    }

    pub fn toggle_selected_stage(&mut self) {
        if let Some(row) = self.selected_change() {
            self.staging.toggle(&row.file_id);
        }
    }

    pub fn stage_all(&mut self) {
        self.staging.stage_all(self.changes.file_ids());
    }

    /// Records content that was written to the store.
    pub fn apply_save(&mut self, save: &SaveRequest) {
        if let Some(file) = self.files.iter_mut().find(|f| f.id == save.file_id) {
            file.content = Some(save.content.clone());
        }
        self.workspace.mark_saved(save);
        self.unsaved.retain(|s| s.file_id != save.file_id);
    }

    /// Keeps content whose write failed so it is neither lost nor shown as
    /// stored. Open documents stay dirty; text of closed tabs is queued.
    pub fn keep_unsaved(&mut self, save: SaveRequest) {
        if self.workspace.mark_unsaved(&save) {
            return;
        }
        self.unsaved.retain(|s| s.file_id != save.file_id);
        self.unsaved.push(save);
    }

    /// Saves to attempt: `saves` plus queued failures for other files.
    pub fn with_unsaved(&mut self, mut saves: Vec<SaveRequest>) -> Vec<SaveRequest> {
        for queued in std::mem::take(&mut self.unsaved) {
            if !saves.iter().any(|s| s.file_id == queued.file_id) {
                saves.push(queued);
            }
        }
        saves
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage { text: text.into(), error: false });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage { text: text.into(), error: true });
    }

    /// Adjusts `editor_scroll` so the active cursor line is visible.
    pub fn follow_cursor(&mut self) {
        let Some(open) = self.workspace.active() else {
            return;
        };
        let (line, _) = open.document().cursor_position();
        let height = usize::from(self.editor_viewport_height.max(1));
        if line < self.editor_scroll {
            self.editor_scroll = line;
        } else if line >= self.editor_scroll + height {
            self.editor_scroll = line + 1 - height;
        }
    }

    fn active_line_count(&self) -> usize {
        self.workspace.active().map(|open| basemark_core::diff::count_lines(open.document().text())).unwrap_or(0)
    }

    /// Scrolls the focused panel down by `lines` rows.
    pub fn scroll_down(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::Files => self.files_state.scroll_down_by(lines),
            PanelFocus::Changes => self.changes_state.scroll_down_by(lines),
            PanelFocus::Editor => {
                let max = self.active_line_count().saturating_sub(1);
                self.editor_scroll = self.editor_scroll.saturating_add(usize::from(lines)).min(max);
            }
        }
    }

    /// Scrolls the focused panel up by `lines` rows.
    pub fn scroll_up(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::Files => self.files_state.scroll_up_by(lines),
            PanelFocus::Changes => self.changes_state.scroll_up_by(lines),
            PanelFocus::Editor => self.editor_scroll = self.editor_scroll.saturating_sub(usize::from(lines)),
        }
    }

    pub fn scroll_top(&mut self) {
        match self.focus {
            PanelFocus::Files => self.files_state.select_first(),
            PanelFocus::Changes => self.changes_state.select_first(),
            PanelFocus::Editor => self.editor_scroll = 0,
        }
    }

    pub fn scroll_bottom(&mut self) {
        match self.focus {
            PanelFocus::Files => self.files_state.select_last(),
            PanelFocus::Changes => self.changes_state.select_last(),
            PanelFocus::Editor => self.editor_scroll = self.active_line_count().saturating_sub(1),
        }
    }

    fn focused_viewport_height(&self) -> u16 {
        match self.focus {
            PanelFocus::Files => self.files_viewport_height,
            PanelFocus::Changes => self.changes_viewport_height,
            PanelFocus::Editor => self.editor_viewport_height,
        }
    }

    /// Uses the viewport height cached from the previous render. If the
    /// cached height is zero (first frame), scrolls by 1.
    pub fn half_page_down(&mut self) {
        self.scroll_down((self.focused_viewport_height() / 2).max(1));
    }

    pub fn half_page_up(&mut self) {
        self.scroll_up((self.focused_viewport_height() / 2).max(1));
    }

    /// Narrows the left column by 5%, down to 15%.
    pub fn shrink_left_panel(&mut self) {
        self.left_pct = self.left_pct.saturating_sub(5).max(15);
    }

    /// Widens the left column by 5%, up to 50%.
    pub fn grow_left_panel(&mut self) {
        self.left_pct = (self.left_pct + 5).min(50);
    }
}

fn clamp_selection(state: &mut ListState, len: usize) {
    match (state.selected(), len) {
        (_, 0) => state.select(None),
        (None, _) => state.select(Some(0)),
        (Some(i), n) if i >= n => state.select(Some(n - 1)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basemark_core::types::ProjectId;

    fn record(id: &str, name: &str, parent: Option<&str>, kind: FileKind, content: Option<&str>) -> FileRecord {
        FileRecord {
            id: FileId::from(id),
            project_id: ProjectId::from("p"),
            name: name.to_owned(),
            parent_id: parent.map(FileId::from),
            kind,
            content: content.map(str::to_owned),
            storage_id: None,
        }
    }

    fn state(files: Vec<FileRecord>, baselines: BaselineMap) -> AppState {
        let project = Project {
            id: ProjectId::from("p"),
            owner_id: "alice".to_owned(),
            name: "demo".to_owned(),
            created_at: 0,
        };
        AppState::new(Identity::new("alice"), project, files, baselines, PreviewPolicy::ReusePreview)
    }

    #[test]
    fn focus_cycles_both_ways() {
        let mut focus = PanelFocus::Files;
        for _ in 0..3 {
            focus = focus.next();
        }
        assert_eq!(focus, PanelFocus::Files);
        assert_eq!(PanelFocus::Files.prev(), PanelFocus::Editor);
        assert_eq!(PanelFocus::Editor.prev().next(), PanelFocus::Editor);
    }

    #[test]
    fn tree_puts_folders_first_and_nests_children() {
        let files = vec![
            record("1", "zeta.txt", None, FileKind::File, Some("")),
            record("2", "src", None, FileKind::Folder, None),
            record("3", "main.rs", Some("2"), FileKind::File, Some("")),
            record("4", "alpha.txt", None, FileKind::File, Some("")),
            record("5", "lib", Some("2"), FileKind::Folder, None),
        ];
        let rows = flatten_tree(&files);
        let shape: Vec<(&str, usize)> = rows.iter().map(|r| (r.name.as_str(), r.depth)).collect();
        assert_eq!(shape, [("src", 0), ("lib", 1), ("main.rs", 1), ("alpha.txt", 0), ("zeta.txt", 0)]);
    }

    #[test]
    fn change_rows_list_staged_entries_first() {
        let files = vec![
            record("a", "a.txt", None, FileKind::File, Some("new")),
            record("b", "b.txt", None, FileKind::File, Some("edited")),
            record("c", "c.txt", None, FileKind::File, Some("same")),
        ];
        let baselines: BaselineMap =
            [(FileId::from("b"), "old".to_owned()), (FileId::from("c"), "same".to_owned())].into_iter().collect();
        let mut app = state(files, baselines);

        assert_eq!(app.changes.len(), 2);
        app.staging.toggle(&FileId::from("b"));
        let rows = app.change_rows();
        assert_eq!(rows[0], ChangeRow { file_id: FileId::from("b"), status: ChangeStatus::Modified, staged: true });
        assert_eq!(rows[1], ChangeRow { file_id: FileId::from("a"), status: ChangeStatus::Added, staged: false });
    }

    #[test]
    fn reverted_files_leave_the_panel() {
        let files = vec![record("b", "b.txt", None, FileKind::File, Some("edited"))];
        let baselines: BaselineMap = [(FileId::from("b"), "old".to_owned())].into_iter().collect();
        let mut app = state(files, baselines);
        app.stage_all();
        assert_eq!(app.change_rows().len(), 1);
        assert_eq!(app.changes_state.selected(), Some(0));

        app.apply_save(&SaveRequest { file_id: FileId::from("b"), content: "old".to_owned() });
        app.recompute_changes();
        assert!(app.change_rows().is_empty());
        assert_eq!(app.changes_state.selected(), None);
    }

    #[test]
    fn failed_saves_of_closed_tabs_are_kept_and_retried() {
        let files = vec![record("a", "a.txt", None, FileKind::File, Some("saved"))];
        let baselines: BaselineMap = [(FileId::from("a"), "saved".to_owned())].into_iter().collect();
        let mut app = state(files, baselines);
        let a = FileId::from("a");
        app.open_file(&a, OpenOptions::pinned());
        app.workspace.edit_active(|d| d.insert_str(">"));
        let unsaved = app.workspace.close_tab(&a).unwrap().unsaved.unwrap();

        app.keep_unsaved(unsaved.clone());
        app.recompute_changes();
        assert_eq!(app.change_rows().len(), 1);
        assert_eq!(app.file(&a).unwrap().text(), "saved");

        let saves = app.open_file(&a, OpenOptions::pinned());
        assert_eq!(saves, vec![unsaved.clone()]);
        assert_eq!(app.workspace.active().unwrap().document().text(), ">saved");
        assert!(app.workspace.active().unwrap().is_dirty());

        app.apply_save(&unsaved);
        assert!(!app.workspace.active().unwrap().is_dirty());
        assert!(app.unsaved.is_empty());
        assert!(app.with_unsaved(Vec::new()).is_empty());
    }

    #[test]
    fn staged_changes_open_in_the_diff_view() {
        let files = vec![
            record("a", "a.txt", None, FileKind::File, Some("new")),
            record("b", "b.txt", None, FileKind::File, Some("edited")),
        ];
        let baselines: BaselineMap = [(FileId::from("b"), "old".to_owned())].into_iter().collect();
        let mut app = state(files, baselines);
        app.staging.toggle(&FileId::from("b"));

        app.changes_state.select(Some(0));
        app.open_selected_change();
        let open = app.workspace.active().unwrap();
        assert!(open.view().is_split());
        assert_eq!(open.baseline(), Some("old"));
        assert_eq!(app.focus, PanelFocus::Editor);

        app.changes_state.select(Some(1));
        app.open_selected_change();
        assert!(!app.workspace.active().unwrap().view().is_split());
        assert_eq!(app.workspace.session().preview_tab, Some(FileId::from("a")));
    }

    #[test]
    fn binary_files_do_not_open() {
        let mut binary = record("img", "logo.png", None, FileKind::File, None);
        binary.storage_id = Some("local:logo.png".to_owned());
        let mut app = state(vec![binary], BaselineMap::new());

        app.open_file(&FileId::from("img"), OpenOptions::pinned());
        assert!(app.workspace.active().is_none());
        assert!(app.status.as_ref().is_some_and(|s| s.error));
    }

    #[test]
    fn preview_tabs_pin_and_keep_their_view() {
        let files = vec![
            record("dir", "src", None, FileKind::Folder, None),
            record("a", "a.txt", Some("dir"), FileKind::File, Some("text")),
        ];
        let mut app = state(files, BaselineMap::new());

        app.files_state.select(Some(0));
        app.open_selected_tree_row(false);
        assert!(app.workspace.active().is_none());

        app.files_state.select(Some(1));
        app.open_selected_tree_row(false);
        assert_eq!(app.workspace.session().preview_tab, Some(FileId::from("a")));

        assert!(app.toggle_diff_view());
        app.pin_active();
        let session = app.workspace.session();
        assert_eq!(session.preview_tab, None);
        assert!(session.is_diff_mode(&FileId::from("a")));
        assert!(app.workspace.active().unwrap().view().is_split());

        assert!(app.toggle_diff_view());
        assert!(!app.workspace.active().unwrap().view().is_split());
    }

    #[test]
    fn left_panel_resize_is_clamped() {
        let mut app = state(Vec::new(), BaselineMap::new());
        for _ in 0..20 {
            app.grow_left_panel();
        }
        assert_eq!(app.left_pct, 50);
        for _ in 0..20 {
            app.shrink_left_panel();
        }
        assert_eq!(app.left_pct, 15);
    }
}
