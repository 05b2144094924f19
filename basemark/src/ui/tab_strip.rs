//! One-row tab strip above the editor.
//!
//! The preview tab is drawn in italics, tabs in the two-pane diff view get a
//! `±` marker, and tabs with unsaved edits a trailing `•`.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::app::AppState;
use crate::theme::Theme;

pub fn render_tab_strip(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let session = state.workspace.session();
    if session.open_tabs.is_empty() {
        frame.render_widget(Paragraph::new(Span::styled(" no open files", Style::default().fg(theme.tab_inactive))), area);
        return;
    }

    let mut spans = Vec::with_capacity(session.open_tabs.len() * 3);
    for id in &session.open_tabs {
        let open = state.workspace.document(id);
        let name = open.map(|o| o.name()).unwrap_or_else(|| state.file_name(id));
        let active = session.active_tab.as_ref() == Some(id);

        let mut style = Style::default().fg(if active { theme.tab_active } else { theme.tab_inactive });
        if active {
            style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }
        if session.preview_tab.as_ref() == Some(id) {
            style = style.add_modifier(Modifier::ITALIC);
        }

        spans.push(Span::raw(" "));
        if session.is_diff_mode(id) {
            spans.push(Span::styled("± ", Style::default().fg(theme.tab_diff)));
        }
        spans.push(Span::styled(name.to_owned(), style));
        if open.is_some_and(|o| o.is_dirty()) {
            spans.push(Span::styled(" •", Style::default().fg(theme.line_modified)));
        }
        spans.push(Span::styled(" │", Style::default().fg(theme.border_inactive)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
