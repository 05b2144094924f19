//! UI rendering for basemark.
//!
//! [`render`] is the single entry point called by the event loop's
//! `terminal.draw()` closure. Layout arithmetic lives in `layout.rs`; each
//! panel has its own module.

mod changes_panel;
mod diff_view;
mod editor_view;
mod file_tree;
mod help;
pub mod highlight;
pub mod keybindings;
mod layout;
mod tab_strip;

use ratatui::{style::Style, widgets::Block, Frame};

use crate::app::{AppState, Mode};
use crate::theme::Theme;
use layout::{compute_layout, inner_rect, render_status_bar};

/// Renders one complete frame.
///
/// Viewport heights and panel rects are written back into `state` before the
/// panels draw, so scroll and mouse handling for the next event use this
/// frame's geometry.
pub fn render(frame: &mut Frame, state: &mut AppState, theme: &Theme) {
    frame.render_widget(Block::new().style(Style::default().bg(theme.background)), frame.area());

    let layout = compute_layout(frame, state);
    state.files_viewport_height = inner_rect(layout.files).height;
    // Minus the section header row.
    state.changes_viewport_height = inner_rect(layout.changes).height.saturating_sub(1);
    state.editor_viewport_height = inner_rect(layout.editor).height;
    state.panel_rects = [layout.files, layout.changes, layout.editor];

    if layout.files.width > 0 {
        file_tree::render_file_tree(frame, layout.files, state, theme);
        changes_panel::render_changes(frame, layout.changes, state, theme);
    }

    if layout.editor.width > 0 {
        tab_strip::render_tab_strip(frame, layout.tabs, state, theme);
        let split = state.workspace.active().is_some_and(|open| open.view().is_split());
        if split {
            diff_view::render_diff(frame, layout.editor, state, theme);
        } else {
            editor_view::render_editor(frame, layout.editor, state, theme);
        }
    }

    render_status_bar(frame, layout.status_bar, state, theme);

    if state.mode == Mode::HelpOverlay {
        help::render_help_overlay(frame, theme, state.help_scroll);
    }
}
