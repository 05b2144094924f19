//! File tree panel renderer.
//!
//! Renders the project's files from `AppState::tree_rows()`, indented by
//! depth. Changed files carry their `A`/`M` badge; files open in a tab are
//! bold.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
};

use basemark_core::changeset::ChangeStatus;
use basemark_core::types::FileKind;

use crate::app::{AppState, PanelFocus, TreeRow};
use crate::theme::Theme;
use crate::ui::layout::panel_block;

/// Uses `render_stateful_widget` so the `ListState` selection highlight is
/// applied. The file count is shown in the title (e.g. "Files (12)").
pub fn render_file_tree(frame: &mut Frame, area: Rect, state: &mut AppState, theme: &Theme) {
    let rows = state.tree_rows();
    let title = if rows.is_empty() { "Files".to_owned() } else { format!("Files ({})", rows.len()) };
    let block = panel_block(title, state.focus == PanelFocus::Files, theme);

    let items: Vec<ListItem> = if rows.is_empty() {
        vec![ListItem::new(Line::raw("No files. Start with --import <DIR>."))]
    } else {
        let session = state.workspace.session();
        rows.iter()
            .map(|row| tree_item(row, state.changes.status_of(&row.id), session.is_open(&row.id), theme))
            .collect()
    };

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(theme.border_active).add_modifier(Modifier::REVERSED));

    frame.render_stateful_widget(list, area, &mut state.files_state);
}

/// Format: `  ▸ src/` for folders, `    main.rs  M` for files.
fn tree_item(row: &TreeRow, status: Option<ChangeStatus>, open: bool, theme: &Theme) -> ListItem<'static> {
    let indent = Span::raw("  ".repeat(row.depth));
    let name = match row.kind {
        FileKind::Folder => Span::styled(format!("▸ {}/", row.name), Style::default().fg(theme.section_header)),
        FileKind::File => {
            let style = if open { Style::default().add_modifier(Modifier::BOLD) } else { Style::default() };
            Span::styled(format!("  {}", row.name), style)
        }
    };
    let mut spans = vec![indent, name];
    if let Some(status) = status {
        let color = match status {
            ChangeStatus::Added => theme.badge_added,
            ChangeStatus::Modified => theme.badge_modified,
        };
        spans.push(Span::styled(format!("  {}", status.badge()), Style::default().fg(color)));
    }
    ListItem::new(Line::from(spans))
}
