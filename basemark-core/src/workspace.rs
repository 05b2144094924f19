//! The open-document workspace of one project.
//!
//! [`Workspace`] owns the project's tab session and one [`OpenDocument`] per
//! open tab. It keeps each document's annotator in step with the tab's diff
//! flag, forwards edits to the annotator, and arms the per-document debounce
//! slots for content saves and suggestion fetches. It never performs I/O
//! itself: armed slots come back to the caller as [`Ticket`]s to be scheduled,
//! and due saves come back as [`SaveRequest`]s to be written.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::annotate::{DecorationDelta, OverlayAnnotator, SplitAnnotator};
use crate::debounce::{DebounceSlot, Ticket};
use crate::document::Document;
use crate::suggest::{SuggestionContext, SuggestionController, SuggestionReady};
use crate::tabs::{OpenOptions, PreviewPolicy, TabSession, TabSessionStore};
use crate::types::{BaselineMap, FileId, FileRecord, ProjectId};

/// Which annotator currently renders a document.
#[derive(Debug, Clone)]
pub enum DocumentView {
    /// Live editor with change markers against the baseline.
    Overlay(OverlayAnnotator),
    /// Read-only baseline/current panes.
    Split(SplitAnnotator),
}

impl DocumentView {
    pub fn is_split(&self) -> bool {
        matches!(self, DocumentView::Split(_))
    }
}

/// Content that is due to be written back to the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub file_id: FileId,
    pub content: String,
}

/// A suggestion fetch to schedule for a document.
#[derive(Debug, Clone)]
pub struct SuggestionRequest {
    pub file_id: FileId,
    pub ticket: Ticket,
    pub context: Option<SuggestionContext>,
}

/// Follow-up work produced by a change to a document.
#[derive(Debug, Clone)]
pub struct EditEffects {
    pub file_id: FileId,
    /// Set when the text changed and a debounced save was armed.
    pub save: Option<Ticket>,
    pub suggestion: Option<SuggestionRequest>,
}

/// A tab that was closed, with any edits that had not been saved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closed {
    pub file_id: FileId,
    pub unsaved: Option<SaveRequest>,
}

/// One open file.
#[derive(Debug)]
pub struct OpenDocument {
    name: String,
    doc: Document,
    baseline: Option<String>,
    opened_with: String,
    view: DocumentView,
    suggestion: SuggestionController,
    save: DebounceSlot,
    dirty: bool,
}

impl OpenDocument {
    fn new(record: &FileRecord, baseline: Option<&str>, split: bool) -> Self {
        let text = record.text().to_owned();
        let mut open = Self {
            name: record.name.clone(),
            doc: Document::new(record.id.clone(), text.clone()),
            baseline: baseline.map(str::to_owned),
            opened_with: text,
            view: DocumentView::Overlay(OverlayAnnotator::new("", "")),
            suggestion: SuggestionController::new(),
            save: DebounceSlot::new(),
            dirty: false,
        };
        open.view = open.build_view(split);
        open
    }

    /// Overlay compares against the stored baseline, or against the content
    /// the file was opened with when it has none. The split view shows an
    /// empty left pane for files without a baseline.
    fn build_view(&self, split: bool) -> DocumentView {
        let current = self.doc.text();
        if split {
            DocumentView::Split(SplitAnnotator::new(self.baseline.as_deref().unwrap_or(""), current))
        } else {
            DocumentView::Overlay(OverlayAnnotator::new(self.overlay_baseline(), current))
        }
    }

    fn overlay_baseline(&self) -> &str {
        self.baseline.as_deref().unwrap_or(&self.opened_with)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn view(&self) -> &DocumentView {
        &self.view
    }

    pub fn baseline(&self) -> Option<&str> {
        self.baseline.as_deref()
    }

    /// Ghost text to draw at the cursor.
    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.visible()
    }

    /// True when the text has edits the store has not confirmed yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn set_view(&mut self, split: bool) {
        if self.view.is_split() != split {
            self.view = self.build_view(split);
            if split {
                self.suggestion.cancel();
            }
        }
    }

    fn set_baseline(&mut self, baseline: Option<&str>) {
        self.baseline = baseline.map(str::to_owned);
        let left = self.baseline.as_deref().unwrap_or("");
        match &mut self.view {
            DocumentView::Overlay(overlay) => {
                let reference = self.baseline.as_deref().unwrap_or(&self.opened_with);
                overlay.set_baseline(reference);
            }
            DocumentView::Split(split) => {
                split.set_baseline(left);
            }
        }
    }

    /// Stays dirty until [`Workspace::mark_saved`] confirms the write, so a
    /// failed save is handed out again by the next flush.
    fn pending_save(&mut self) -> Option<SaveRequest> {
        self.save.cancel();
        if !self.dirty {
            return None;
        }
        Some(SaveRequest { file_id: self.doc.id().clone(), content: self.doc.text().to_owned() })
    }

    fn request_suggestion(&mut self) -> Option<SuggestionRequest> {
        if self.view.is_split() {
            return None;
        }
        let ticket = self.suggestion.request();
        Some(SuggestionRequest {
            file_id: self.doc.id().clone(),
            ticket,
            context: SuggestionContext::from_document(&self.name, &self.doc),
        })
    }

    fn after_edit(&mut self, cursor_before: usize, changed: bool, suggestions: bool) -> EditEffects {
        let mut effects = EditEffects { file_id: self.doc.id().clone(), save: None, suggestion: None };
        if changed {
            if let DocumentView::Overlay(overlay) = &mut self.view {
                let delta = overlay.on_document_change(self.doc.text());
                trace!(
                    file = %self.doc.id(),
                    inserted = delta.inserted.len(),
                    removed = delta.removed.len(),
                    "decorations updated"
                );
            }
            self.dirty = true;
            effects.save = Some(self.save.arm());
        }
        if changed || self.doc.cursor() != cursor_before {
            if suggestions {
                effects.suggestion = self.request_suggestion();
            } else {
                self.suggestion.cancel();
            }
        }
        effects
    }

    fn shutdown(&mut self) -> Option<SaveRequest> {
        self.suggestion.cancel();
        self.pending_save()
    }
}

/// Tabs and open documents of one project.
#[derive(Debug)]
pub struct Workspace {
    project: ProjectId,
    tabs: TabSessionStore,
    documents: HashMap<FileId, OpenDocument>,
    suggestions: bool,
}

impl Workspace {
    pub fn new(project: ProjectId, policy: PreviewPolicy) -> Self {
        Self { project, tabs: TabSessionStore::new(policy), documents: HashMap::new(), suggestions: true }
    }

    /// Turns suggestion requests on or off. Turning them off hides any shown
    /// suggestion and cancels in-flight fetches.
    pub fn set_suggestions_enabled(&mut self, enabled: bool) {
        self.suggestions = enabled;
        if !enabled {
            for open in self.documents.values_mut() {
                open.suggestion.cancel();
            }
        }
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    pub fn session(&self) -> TabSession {
        self.tabs.session(&self.project)
    }

    pub fn active_id(&self) -> Option<&FileId> {
        self.tabs.active_tab(&self.project)
    }

    pub fn active(&self) -> Option<&OpenDocument> {
        self.active_id().and_then(|id| self.documents.get(id))
    }

    pub fn document(&self, file: &FileId) -> Option<&OpenDocument> {
        self.documents.get(file)
    }

    /// Opens `record` in a tab, or focuses it when already open, and switches
    /// its view to match `options.diff`.
    ///
    /// Only plain-text files can be opened; anything else returns `false`.
    /// Documents whose tab was replaced by the open (preview reuse) are shut
    /// down and any unsaved content is returned for saving.
    pub fn open(
        &mut self,
        record: &FileRecord,
        baseline: Option<&str>,
        options: OpenOptions,
    ) -> (bool, Vec<SaveRequest>) {
        if !record.is_plain_text() {
            debug!(file = %record.id, name = %record.name, "not opening non-text file");
            return (false, Vec::new());
        }

        self.tabs.open_file(&self.project, &record.id, options);
        let split = self.tabs.is_diff_mode(&self.project, &record.id);
        self.documents
            .entry(record.id.clone())
            .and_modify(|open| open.set_view(split))
            .or_insert_with(|| OpenDocument::new(record, baseline, split));

        (true, self.prune_closed())
    }

    /// Switches the view of an open file between overlay and split.
    pub fn set_diff_view(&mut self, file: &FileId, diff: bool) -> bool {
        let session = self.tabs.session(&self.project);
        if !session.is_open(file) {
            return false;
        }
        let pinned = session.preview_tab.as_ref() != Some(file);
        self.tabs.open_file(&self.project, file, OpenOptions { pinned, diff });
        if let Some(open) = self.documents.get_mut(file) {
            open.set_view(diff);
        }
        true
    }

    pub fn close_tab(&mut self, file: &FileId) -> Option<Closed> {
        if !self.tabs.close_tab(&self.project, file) {
            return None;
        }
        let unsaved = self.documents.remove(file).and_then(|mut open| open.shutdown());
        Some(Closed { file_id: file.clone(), unsaved })
    }

    /// Closes every tab and returns the unsaved content of all of them.
    pub fn close_all_tabs(&mut self) -> Vec<SaveRequest> {
        self.tabs.close_all_tabs(&self.project);
        self.prune_closed()
    }

    pub fn set_active(&mut self, file: &FileId) -> bool {
        self.tabs.set_active_tab(&self.project, file)
    }

    pub fn cycle_active(&mut self, offset: isize) -> Option<FileId> {
        self.tabs.cycle_active_tab(&self.project, offset)
    }

    /// Applies `edit` to the active document.
    ///
    /// `edit` returns whether the text changed. A text change updates the
    /// annotator and arms the save slot; any edit, including a pure cursor
    /// move, supersedes the pending suggestion. Split views are read-only and
    /// refuse edits.
    pub fn edit_active(&mut self, edit: impl FnOnce(&mut Document) -> bool) -> Option<EditEffects> {
        let suggestions = self.suggestions;
        let open = self.active_overlay_mut()?;
        let before = open.doc.cursor();
        let changed = edit(&mut open.doc);
        Some(open.after_edit(before, changed, suggestions))
    }

    /// Inserts the active document's visible suggestion at the cursor.
    pub fn accept_suggestion(&mut self) -> Option<EditEffects> {
        let suggestions = self.suggestions;
        let open = self.active_overlay_mut()?;
        let before = open.doc.cursor();
        if !open.suggestion.accept(&mut open.doc) {
            return None;
        }
        Some(open.after_edit(before, true, suggestions))
    }

    fn active_overlay_mut(&mut self) -> Option<&mut OpenDocument> {
        let id = self.tabs.active_tab(&self.project)?;
        self.documents.get_mut(id).filter(|open| !open.view.is_split())
    }

    pub fn dismiss_suggestion(&mut self) -> bool {
        let Some(open) = self.active_overlay_mut() else {
            return false;
        };
        let shown = open.suggestion.visible().is_some();
        open.suggestion.cancel();
        shown
    }

    /// Delivers a finished fetch. Results for closed documents or superseded
    /// generations are dropped.
    pub fn resolve_suggestion(&mut self, ready: SuggestionReady) -> bool {
        match self.documents.get_mut(&ready.file_id) {
            Some(open) => open.suggestion.resolve(ready.generation, ready.suggestion),
            None => false,
        }
    }

    /// Hands out the content for a save whose debounce elapsed, if that save
    /// is still the document's latest.
    pub fn take_due_save(&mut self, file: &FileId, generation: u64) -> Option<SaveRequest> {
        let open = self.documents.get_mut(file)?;
        if !open.save.complete(generation) {
            return None;
        }
        open.pending_save()
    }

    /// Records that `save` reached the store. The document turns clean only
    /// when it still holds exactly the saved text; returns whether it did.
    pub fn mark_saved(&mut self, save: &SaveRequest) -> bool {
        match self.documents.get_mut(&save.file_id) {
            Some(open) if open.doc.text() == save.content => {
                open.dirty = false;
                true
            }
            _ => false,
        }
    }

    /// Records that writing `save` failed. An open document holding that text
    /// turns dirty again so the next flush retries it. Returns `false` when
    /// the document is no longer open and the caller has to keep the text.
    pub fn mark_unsaved(&mut self, save: &SaveRequest) -> bool {
        let Some(open) = self.documents.get_mut(&save.file_id) else {
            return false;
        };
        if open.doc.text() == save.content {
            open.dirty = true;
        }
        true
    }

    /// Cancels every pending save and returns the content of all dirty
    /// documents, e.g. before a commit reads file contents.
    pub fn flush_saves(&mut self) -> Vec<SaveRequest> {
        self.documents.values_mut().filter_map(OpenDocument::pending_save).collect()
    }

    /// Points every open document at the latest baselines, e.g. after a
    /// commit. Returns how many documents got a different baseline.
    pub fn rebase(&mut self, baselines: &BaselineMap) -> usize {
        let mut changed = 0;
        for (id, open) in &mut self.documents {
            let next = baselines.get(id).map(String::as_str);
            if open.baseline.as_deref() != next {
                open.set_baseline(next);
                changed += 1;
            }
        }
        debug!(project = %self.project, changed, "rebased open documents");
        changed
    }

    /// Overlays unsaved document text onto `files`, so a change set computed
    /// from the result reflects what is on screen.
    pub fn live_files(&self, files: &[FileRecord]) -> Vec<FileRecord> {
        files
            .iter()
            .map(|f| match self.documents.get(&f.id) {
                Some(open) if open.dirty => FileRecord { content: Some(open.doc.text().to_owned()), ..f.clone() },
                _ => f.clone(),
            })
            .collect()
    }

    /// Latest decoration delta of the active overlay.
    pub fn active_delta(&self) -> Option<&DecorationDelta> {
        match &self.active()?.view {
            DocumentView::Overlay(overlay) => Some(overlay.pane().delta()),
            DocumentView::Split(_) => None,
        }
    }

    fn prune_closed(&mut self) -> Vec<SaveRequest> {
        let session = self.tabs.session(&self.project);
        let closed: Vec<FileId> = self.documents.keys().filter(|id| !session.is_open(id)).cloned().collect();
        closed
            .into_iter()
            .filter_map(|id| self.documents.remove(&id).and_then(|mut open| open.shutdown()))
            .collect()
    }
}
