//! Two-pane diff renderer.
//!
//! The baseline is on the left with removed lines marked, the current text on
//! the right with added and modified lines marked. Both panes scroll together
//! from `editor_scroll` and are read-only.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect, Spacing},
    text::Line,
    widgets::Paragraph,
};

use basemark_core::workspace::DocumentView;

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::editor_view::{pane_rows, PaneRow};
use crate::ui::layout::{inner_rect, panel_block};

pub fn render_diff(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let Some(open) = state.workspace.active() else {
        return;
    };
    let DocumentView::Split(split) = open.view() else {
        return;
    };
    let focused = state.focus == PanelFocus::Editor;

    let [left, right] =
        area.layout(&Layout::horizontal([Constraint::Fill(1), Constraint::Fill(1)]).spacing(Spacing::Overlap(1)));
    let left_title = if open.baseline().is_some() {
        format!("{} (committed)", open.name())
    } else {
        format!("{} (no baseline)", open.name())
    };
    let panes = [
        (left, left_title, split.left()),
        (right, format!("{} (working)", open.name()), split.right()),
    ];

    for (rect, title, pane) in panes {
        let inner = inner_rect(rect);
        frame.render_widget(panel_block(title, focused, theme), rect);
        let (rows, _) = pane_rows(pane, open.name(), state.editor_scroll, usize::from(inner.height), 0, theme);
        let lines: Vec<Line> = rows.into_iter().map(PaneRow::into_line).collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }
}
