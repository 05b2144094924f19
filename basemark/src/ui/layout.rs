//! Layout arithmetic and shared chrome (panel blocks, status bar).
//!
//! Called inside `terminal.draw()` on every render so every frame gets a fresh
//! layout that reflects the current terminal size.
//!
//! # Panel geometry
//!
//! At `>= 100` columns the left column (file tree above the source-control
//! panel) takes `AppState.left_pct` of the width and the editor the rest.
//! Below 100 columns the left column collapses unless it has focus, in which
//! case it takes the full width.
//!
//! `Spacing::Overlap(1)` combined with `Block::merge_borders(MergeStrategy::Fuzzy)`
//! makes adjacent panel borders share a single column.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect, Spacing},
    style::{Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
};

use crate::app::{AppState, Mode, PanelFocus};
use crate::theme::Theme;

/// Outer rects of one frame.
pub struct FrameLayout {
    pub files: Rect,
    pub changes: Rect,
    pub tabs: Rect,
    pub editor: Rect,
    pub status_bar: Rect,
}

pub fn compute_layout(frame: &Frame, state: &AppState) -> FrameLayout {
    let term_width = frame.area().width;

    let [main_area, status_bar] =
        frame.area().layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]));

    let left_focused = matches!(state.focus, PanelFocus::Files | PanelFocus::Changes);
    let columns = if term_width >= 100 {
        [Constraint::Percentage(state.left_pct), Constraint::Fill(1)]
    } else if left_focused {
        [Constraint::Fill(1), Constraint::Length(0)]
    } else {
        [Constraint::Length(0), Constraint::Fill(1)]
    };
    let horizontal = Layout::horizontal(columns).spacing(Spacing::Overlap(1));
    let [left, right] = main_area.layout(&horizontal);

    let [files, changes] = left.layout(
        &Layout::vertical([Constraint::Percentage(55), Constraint::Percentage(45)]).spacing(Spacing::Overlap(1)),
    );
    let [tabs, editor] = right.layout(&Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]));

    FrameLayout { files, changes, tabs, editor, status_bar }
}

/// Inner `Rect` of a panel after removing the 1-cell border on each side.
pub fn inner_rect(area: Rect) -> Rect {
    area.inner(Margin { vertical: 1, horizontal: 1 })
}

/// Builds a bordered `Block` for a panel.
///
/// Focused panels get `BorderType::Thick`, others `BorderType::Plain`.
/// `MergeStrategy::Fuzzy` is required because `Exact` produces incorrect
/// junctions when mixing the two.
pub fn panel_block<'a>(title: impl Into<Line<'a>>, is_focused: bool, theme: &Theme) -> Block<'a> {
    let border_style = if is_focused {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.border_inactive)
    };
    let border_type = if is_focused { BorderType::Thick } else { BorderType::Plain };

    Block::bordered()
        .title(title)
        .border_type(border_type)
        .border_style(border_style)
        .merge_borders(MergeStrategy::Fuzzy)
}

/// Status bar content: mode, project, staged count, and either the commit
/// message being typed or the latest status message.
fn status_line(state: &AppState, theme: &Theme) -> Line<'static> {
    let (mode_text, mode_fg) = match state.mode {
        Mode::Insert => (" INSERT ", theme.status_mode_insert),
        Mode::CommitMessage => (" COMMIT ", theme.status_mode_commit),
        Mode::Normal | Mode::HelpOverlay => (" NORMAL ", theme.status_mode_normal),
    };

    let staged = state.staging.partition(&state.changes).0.len();
    let mut spans = vec![
        Span::styled(mode_text, Style::default().fg(mode_fg).add_modifier(Modifier::BOLD)),
        Span::raw(format!(" {} ", state.project.name)),
        Span::raw(format!("│ {} changed, {} staged ", state.changes.len(), staged)),
    ];

    if state.mode == Mode::CommitMessage {
        spans.push(Span::raw("│ message: "));
        spans.push(Span::styled(state.commit_message.clone(), Style::default().add_modifier(Modifier::BOLD)));
    } else if let Some(status) = &state.status {
        let style = if status.error { Style::default().fg(theme.status_error) } else { Style::default() };
        spans.push(Span::raw("│ "));
        spans.push(Span::styled(status.text.clone(), style));
    } else if state.workspace.active().is_some_and(|open| open.is_dirty()) {
        spans.push(Span::raw("│ unsaved"));
    }
    Line::from(spans)
}

/// Renders the 1-row status bar. While a commit message is being typed the
/// terminal cursor is placed after it.
pub fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let line = status_line(state, theme);
    if state.mode == Mode::CommitMessage {
        let x = area.x.saturating_add(u16::try_from(line.width()).unwrap_or(u16::MAX));
        if x < area.right() {
            frame.set_cursor_position((x, area.y));
        }
    }

    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg)),
        area,
    );
}
