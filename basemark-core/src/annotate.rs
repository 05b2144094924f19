//! Live change decorations for open documents.
//!
//! An annotator re-runs the line classifier whenever its document changes,
//! places each classified line at the offset where that line starts, and
//! keeps the difference against the previous render so a front end only has
//! to repaint what moved.
//!
//! Two variants exist. [`OverlayAnnotator`] decorates the single live editor
//! against a fixed baseline. [`SplitAnnotator`] drives the read-only two-pane
//! view: the left pane shows the baseline with removed lines marked, the right
//! pane shows the current text with added and modified lines marked.

use std::collections::BTreeSet;
use std::ops::Range;

use tracing::trace;

use crate::diff::{classify_for_baseline, classify_for_current, LineKind};

/// Line start offsets of a text as an editing surface sees it.
///
/// Lines are separated by `\n`; a text always has at least one line, so an
/// empty document and a document ending in a newline both have an empty last
/// line. This is deliberately not the same count as [`crate::diff::count_lines`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts, len: text.len() }
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Byte offset where `line` starts, or `None` past the end of the text.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.starts.get(line).copied()
    }

    /// Byte range of `line`, excluding its newline.
    pub fn line_range(&self, line: usize) -> Option<Range<usize>> {
        let start = self.line_start(line)?;
        let end = match self.starts.get(line + 1) {
            Some(next) => next - 1,
            None => self.len,
        };
        Some(start..end)
    }

    /// Zero-based line containing byte `offset` (clamped to the last line).
    pub fn line_of_offset(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        }
    }
}

/// One decorated line. Ordered by offset so sets render top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineDecoration {
    pub offset: usize,
    pub line: usize,
    pub kind: LineKind,
}

/// The complete decoration set of one pane, sorted by offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecorationSet {
    items: Vec<LineDecoration>,
}

impl DecorationSet {
    pub fn iter(&self) -> impl Iterator<Item = &LineDecoration> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Kind of the decoration on `line`, if any.
    pub fn kind_at(&self, line: usize) -> Option<LineKind> {
        self.items.iter().find(|d| d.line == line).map(|d| d.kind)
    }

    /// Places classified lines into `index`. Lines the document does not have
    /// (classification and text can disagree for a moment during batched
    /// updates) are skipped.
    fn place(index: &LineIndex, lines: impl IntoIterator<Item = (usize, LineKind)>) -> Self {
        let mut items = Vec::new();
        for (line, kind) in lines {
            match index.line_start(line) {
                Some(offset) => items.push(LineDecoration { offset, line, kind }),
                None => trace!(line, line_count = index.line_count(), "decoration outside document skipped"),
            }
        }
        items.sort_unstable();
        Self { items }
    }
}

/// What changed between two consecutive renders of a pane.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecorationDelta {
    pub inserted: Vec<LineDecoration>,
    pub removed: Vec<LineDecoration>,
}

impl DecorationDelta {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.removed.is_empty()
    }

    fn between(previous: &DecorationSet, next: &DecorationSet) -> Self {
        let before: BTreeSet<_> = previous.items.iter().copied().collect();
        let after: BTreeSet<_> = next.items.iter().copied().collect();
        Self {
            inserted: after.difference(&before).copied().collect(),
            removed: before.difference(&after).copied().collect(),
        }
    }
}

/// A displayed text plus its current decorations and the last delta.
#[derive(Debug, Clone)]
pub struct AnnotatedPane {
    text: String,
    index: LineIndex,
    decorations: DecorationSet,
    delta: DecorationDelta,
}

impl AnnotatedPane {
    fn new(text: String) -> Self {
        let index = LineIndex::new(&text);
        Self { text, index, decorations: DecorationSet::default(), delta: DecorationDelta::default() }
    }

    fn set_text(&mut self, text: &str) {
        if self.text != text {
            self.text.clear();
            self.text.push_str(text);
            self.index = LineIndex::new(text);
        }
    }

    fn render(&mut self, lines: impl IntoIterator<Item = (usize, LineKind)>) {
        let next = DecorationSet::place(&self.index, lines);
        self.delta = DecorationDelta::between(&self.decorations, &next);
        self.decorations = next;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    pub fn decorations(&self) -> &DecorationSet {
        &self.decorations
    }

    /// Difference produced by the most recent recomputation.
    pub fn delta(&self) -> &DecorationDelta {
        &self.delta
    }
}

/// Single-pane annotator over the live document.
#[derive(Debug, Clone)]
pub struct OverlayAnnotator {
    baseline: String,
    pane: AnnotatedPane,
}

impl OverlayAnnotator {
    pub fn new(baseline: impl Into<String>, current: impl Into<String>) -> Self {
        let mut annotator = Self { baseline: baseline.into(), pane: AnnotatedPane::new(current.into()) };
        annotator.recompute();
        annotator
    }

    /// Handles a document-change notification with the full new text.
    pub fn on_document_change(&mut self, current: &str) -> &DecorationDelta {
        self.pane.set_text(current);
        self.recompute();
        &self.pane.delta
    }

    /// Swaps the reference text, e.g. after the file was committed.
    pub fn set_baseline(&mut self, baseline: &str) -> &DecorationDelta {
        if self.baseline != baseline {
            self.baseline = baseline.to_owned();
            self.recompute();
        } else {
            self.pane.delta = DecorationDelta::default();
        }
        &self.pane.delta
    }

    fn recompute(&mut self) {
        let changes = classify_for_current(&self.baseline, &self.pane.text);
        self.pane.render(changes.iter());
    }

    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    pub fn pane(&self) -> &AnnotatedPane {
        &self.pane
    }

    pub fn decorations(&self) -> &DecorationSet {
        &self.pane.decorations
    }
}

/// Read-only two-pane annotator: baseline on the left, current on the right.
#[derive(Debug, Clone)]
pub struct SplitAnnotator {
    left: AnnotatedPane,
    right: AnnotatedPane,
}

impl SplitAnnotator {
    pub fn new(baseline: impl Into<String>, current: impl Into<String>) -> Self {
        let mut annotator = Self {
            left: AnnotatedPane::new(baseline.into()),
            right: AnnotatedPane::new(current.into()),
        };
        annotator.recompute_left();
        annotator.recompute_right();
        annotator
    }

    /// Reassigns the baseline side. Returns `false` when the text is unchanged
    /// and nothing was recomputed.
    pub fn set_baseline(&mut self, baseline: &str) -> bool {
        if self.left.text == baseline {
            return false;
        }
        self.left.set_text(baseline);
        self.recompute_left();
        self.recompute_right();
        true
    }

    /// Reassigns the current side. Returns `false` when nothing changed.
    pub fn set_current(&mut self, current: &str) -> bool {
        if self.right.text == current {
            return false;
        }
        self.right.set_text(current);
        self.recompute_left();
        self.recompute_right();
        true
    }

    fn recompute_left(&mut self) {
        let removed = classify_for_baseline(&self.left.text, &self.right.text);
        self.left.render(removed.into_iter().map(|l| (l, LineKind::Removed)));
    }

    fn recompute_right(&mut self) {
        let changes = classify_for_current(&self.left.text, &self.right.text);
        self.right.render(changes.iter());
    }

    /// Baseline pane.
    pub fn left(&self) -> &AnnotatedPane {
        &self.left
    }

    /// Current pane.
    pub fn right(&self) -> &AnnotatedPane {
        &self.right
    }
}
