//! Help overlay renderer.
//!
//! Draws a centred modal over the panel layout, using `Clear` to erase the
//! background first so no second draw call is needed.

use ratatui::{
    Frame,
    layout::Constraint,
    style::{Modifier, Style},
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::theme::Theme;

/// Skipped on terminals narrower than 60 columns.
pub fn render_help_overlay(frame: &mut Frame, theme: &Theme, help_scroll: u16) {
    if frame.area().width < 60 {
        return;
    }

    let overlay_area = frame.area().centered(Constraint::Percentage(80), Constraint::Percentage(80));
    frame.render_widget(Clear, overlay_area);

    let block = Block::bordered()
        .title(" Help: j/k scroll, ? or Esc to dismiss ")
        .border_style(Style::default().fg(theme.border_active));

    frame.render_widget(
        Paragraph::new(build_help_text(theme))
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((help_scroll, 0)),
        overlay_area,
    );
}

fn build_help_text(theme: &Theme) -> Text<'static> {
    let header = |s: &'static str| Line::styled(s, Style::default().fg(theme.section_header).add_modifier(Modifier::BOLD));
    Text::from(vec![
        header("Navigation"),
        Line::from("  H / L         Move panel focus left / right"),
        Line::from("  j / k         Select next / previous, or scroll the editor"),
        Line::from("  g / G         Jump to top / bottom"),
        Line::from("  Ctrl-d / u    Half page down / up"),
        Line::from("  < / >         Shrink / grow the left column"),
        Line::from(""),
        header("Files"),
        Line::from("  Enter / l     Open as preview"),
        Line::from("  o             Open as a pinned tab"),
        Line::from(""),
        header("Source Control"),
        Line::from("  Enter / l     Open (staged files open in the diff view)"),
        Line::from("  Space / s     Stage or unstage the selected file"),
        Line::from("  S / U         Stage all / unstage all"),
        Line::from("  c             Write a commit message and commit the staged files"),
        Line::from(""),
        header("Tabs"),
        Line::from("  [ / ]         Previous / next tab"),
        Line::from("  p             Pin the preview tab"),
        Line::from("  d             Toggle the two-pane diff view"),
        Line::from("  x / X         Close tab / close all tabs"),
        Line::from(""),
        header("Editing"),
        Line::from("  i             Insert mode in the active document"),
        Line::from("  Tab           Accept the suggestion (indents when there is none)"),
        Line::from("  Esc           Dismiss the suggestion, then leave insert mode"),
        Line::from("  Edits are saved automatically after a short pause."),
        Line::from(""),
        header("General"),
        Line::from("  ?             Open / close this help overlay"),
        Line::from("  q / Esc       Save pending edits and quit"),
    ])
}
