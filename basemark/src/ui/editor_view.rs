//! Editor panel renderer.
//!
//! Draws the active document with syntax highlighting and a gutter whose
//! marker column shows the line's change against the baseline. Only the
//! visible window `[editor_scroll, editor_scroll + height)` is materialized.
//! A visible suggestion is drawn as ghost text at the cursor, its first line
//! inline and any further lines as virtual rows below.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use basemark_core::annotate::AnnotatedPane;
use basemark_core::diff::{count_lines, LineKind};
use basemark_core::workspace::DocumentView;

use crate::app::{AppState, Mode, PanelFocus};
use crate::theme::Theme;
use crate::ui::highlight::{highlight_lines, split_at_column};
use crate::ui::layout::{inner_rect, panel_block};

/// One visible row of a pane: its gutter and its highlighted content.
pub(crate) struct PaneRow {
    pub gutter: Vec<Span<'static>>,
    pub content: Vec<Span<'static>>,
}

impl PaneRow {
    pub(crate) fn into_line(self) -> Line<'static> {
        let mut spans = self.gutter;
        spans.extend(self.content);
        Line::from(spans)
    }
}

pub(crate) fn marker_style(kind: LineKind, theme: &Theme) -> Style {
    let color = match kind {
        LineKind::Added => theme.line_added,
        LineKind::Modified => theme.line_modified,
        LineKind::Removed => theme.line_removed,
    };
    Style::default().fg(color)
}

/// Builds the visible rows of `pane`. `min_lines` keeps rows available past
/// the text's last line, e.g. for a cursor after a trailing newline.
/// Returns the rows and the gutter width in cells.
pub(crate) fn pane_rows(
    pane: &AnnotatedPane,
    file_name: &str,
    scroll: usize,
    height: usize,
    min_lines: usize,
    theme: &Theme,
) -> (Vec<PaneRow>, u16) {
    let total = count_lines(pane.text()).max(min_lines);
    let digits = total.max(1).to_string().len();
    let gutter_width = u16::try_from(digits + 2).unwrap_or(u16::MAX);

    let start = scroll.min(total);
    let end = (start + height).min(total);
    let highlighted = highlight_lines(pane.text(), file_name, end);

    let rows = (start..end)
        .map(|line| {
            let kind = pane.decorations().kind_at(line);
            let marker = match kind {
                Some(kind) => Span::styled("▎", marker_style(kind, theme)),
                None => Span::raw(" "),
            };
            let number_style = match kind {
                Some(kind) => marker_style(kind, theme),
                None => Style::default().fg(theme.gutter),
            };
            let number = Span::styled(format!("{:>digits$} ", line + 1), number_style);
            let content = highlighted.get(line).map(|l| l.spans.clone()).unwrap_or_default();
            PaneRow { gutter: vec![marker, number], content }
        })
        .collect();
    (rows, gutter_width)
}

pub fn render_editor(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let focused = state.focus == PanelFocus::Editor;
    let Some(open) = state.workspace.active() else {
        let block = panel_block("Editor", focused, theme);
        frame.render_widget(
            Paragraph::new(Line::raw("No file open. Select a file and press Enter.")).block(block),
            area,
        );
        return;
    };
    let DocumentView::Overlay(overlay) = open.view() else {
        return;
    };

    let title = if open.is_dirty() { format!("{} [+]", open.name()) } else { open.name().to_owned() };
    let block = panel_block(title, focused, theme);
    let inner = inner_rect(area);
    frame.render_widget(block, area);

    let doc = open.document();
    let (cursor_line, cursor_col) = doc.cursor_position();
    let height = usize::from(inner.height);
    let (mut rows, gutter_width) =
        pane_rows(overlay.pane(), open.name(), state.editor_scroll, height, cursor_line + 1, theme);

    let visible_cursor = cursor_line.checked_sub(state.editor_scroll).filter(|row| *row < rows.len());
    if let (Some(row), Some(ghost)) = (visible_cursor, open.suggestion()) {
        let ghost_style = Style::default().fg(theme.ghost_text).add_modifier(Modifier::ITALIC);
        let mut ghost_lines = ghost.split('\n');
        let first = ghost_lines.next().unwrap_or_default();

        let content = std::mem::take(&mut rows[row].content);
        let (mut before, after) = split_at_column(content, cursor_col);
        before.push(Span::styled(first.to_owned(), ghost_style));
        let rest: Vec<&str> = ghost_lines.collect();
        if rest.is_empty() {
            before.extend(after);
            rows[row].content = before;
        } else {
            rows[row].content = before;
            let blank = " ".repeat(usize::from(gutter_width));
            let mut virtual_rows: Vec<PaneRow> = rest
                .iter()
                .map(|l| PaneRow { gutter: vec![Span::raw(blank.clone())], content: vec![Span::styled((*l).to_owned(), ghost_style)] })
                .collect();
            if let Some(last) = virtual_rows.last_mut() {
                last.content.extend(after);
            }
            let tail = rows.split_off(row + 1);
            rows.extend(virtual_rows);
            rows.extend(tail);
        }
    }

    let lines: Vec<Line> = rows.into_iter().take(height).map(PaneRow::into_line).collect();
    frame.render_widget(Paragraph::new(lines), inner);

    if state.mode == Mode::Insert {
        if let Some(row) = visible_cursor {
            let x = u16::try_from(cursor_col).ok().and_then(|c| inner.x.checked_add(gutter_width)?.checked_add(c));
            let y = inner.y + u16::try_from(row).unwrap_or_default();
            if let Some(x) = x.filter(|x| *x < inner.right()) {
                frame.set_cursor_position((x, y));
            }
        }
    }
}
