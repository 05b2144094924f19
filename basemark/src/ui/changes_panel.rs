//! Source-control panel renderer.
//!
//! Two sections, "Staged Changes" above "Changes", built from
//! `AppState::change_rows()`. Section headers are drawn as non-selectable
//! lines above the list, so list indices match `change_rows()` one to one.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
};

use basemark_core::changeset::ChangeStatus;

use crate::app::{AppState, ChangeRow, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

pub fn render_changes(frame: &mut Frame, area: Rect, state: &mut AppState, theme: &Theme) {
    let rows = state.change_rows();
    let staged = rows.iter().filter(|r| r.staged).count();
    let block = panel_block(format!("Source Control ({})", rows.len()), state.focus == PanelFocus::Changes, theme);
    let inner = inner_rect(area);
    frame.render_widget(block, area);

    let [header, body] = inner.layout(&Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]));
    let header_style = Style::default().fg(theme.section_header).add_modifier(Modifier::BOLD);
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!("Staged Changes ({staged})"), header_style),
            Span::raw("  "),
            Span::styled(format!("Changes ({})", rows.len() - staged), header_style),
        ])),
        header,
    );

    if rows.is_empty() {
        frame.render_widget(Paragraph::new(Line::raw("No changes")), body);
        return;
    }

    let items: Vec<ListItem> = rows.iter().map(|row| change_item(row, state.file_name(&row.file_id), theme)).collect();
    let list = List::new(items)
        .highlight_style(Style::default().fg(theme.border_active).add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(list, body, &mut state.changes_state);
}

/// Format: `[x] A notes.txt` for staged rows, `[ ] M main.rs` otherwise.
fn change_item(row: &ChangeRow, name: &str, theme: &Theme) -> ListItem<'static> {
    let mark = if row.staged {
        Span::styled("[x] ", Style::default().fg(theme.badge_added))
    } else {
        Span::styled("[ ] ", Style::default().fg(theme.gutter))
    };
    let color = match row.status {
        ChangeStatus::Added => theme.badge_added,
        ChangeStatus::Modified => theme.badge_modified,
    };
    let badge = Span::styled(format!("{} ", row.status.badge()), Style::default().fg(color));
    ListItem::new(Line::from(vec![mark, badge, Span::raw(name.to_owned())]))
}
