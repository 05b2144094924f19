//! Syntax highlighting for the editor and diff panes.
//!
//! Syntect's `SyntaxSet` and `ThemeSet` are expensive to build, so both live in
//! `LazyLock` statics and are loaded once per process. [`warm_up`] forces them
//! before the first frame.

use std::sync::LazyLock;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

static PS: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static TS: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const SYNTAX_THEME: &str = "base16-ocean.dark";

pub fn warm_up() {
    let _ = &*PS;
    let _ = &*TS;
}

fn syntax_for(file_name: &str) -> &'static SyntaxReference {
    let ext = file_name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    PS.find_syntax_by_extension(ext).unwrap_or_else(|| PS.find_syntax_plain_text())
}

/// Converts a syntect (Style, &str) pair to an owned ratatui Span. Background
/// colors are dropped so the pane background shows through.
fn syntect_to_span(style: syntect::highlighting::Style, content: &str) -> Span<'static> {
    let fg = style.foreground;
    let mut ratatui_style = Style::default();
    if fg.a > 0 {
        ratatui_style = ratatui_style.fg(Color::Rgb(fg.r, fg.g, fg.b));
    }
    if style.font_style.contains(FontStyle::BOLD) {
        ratatui_style = ratatui_style.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        ratatui_style = ratatui_style.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        ratatui_style = ratatui_style.add_modifier(Modifier::UNDERLINED);
    }
    Span::styled(content.trim_end_matches(['\n', '\r']).to_owned(), ratatui_style)
}

/// Highlights the first `upto` lines of `text` as the language implied by
/// `file_name`'s extension.
///
/// Highlighting state carries from line to line, so lines before the visible
/// window are still parsed; only the window's spans need to be kept by the
/// caller. Lines that fail to highlight come back unstyled.
pub fn highlight_lines(text: &str, file_name: &str, upto: usize) -> Vec<Line<'static>> {
    let theme = TS.themes.get(SYNTAX_THEME).or_else(|| TS.themes.values().next());
    let Some(theme) = theme else {
        return plain_lines(text, upto);
    };
    let mut h = HighlightLines::new(syntax_for(file_name), theme);

    LinesWithEndings::from(text)
        .take(upto)
        .map(|line| match h.highlight_line(line, &PS) {
            Ok(ranges) => Line::from(ranges.into_iter().map(|(style, s)| syntect_to_span(style, s)).collect::<Vec<_>>()),
            Err(_) => Line::raw(line.trim_end_matches(['\n', '\r']).to_owned()),
        })
        .collect()
}

fn plain_lines(text: &str, upto: usize) -> Vec<Line<'static>> {
    text.lines().take(upto).map(|l| Line::raw(l.to_owned())).collect()
}

/// Splits styled spans at a character column, e.g. to insert ghost text at
/// the cursor. Columns past the end put everything on the left.
pub fn split_at_column(spans: Vec<Span<'static>>, column: usize) -> (Vec<Span<'static>>, Vec<Span<'static>>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut seen = 0;
    for span in spans {
        let len = span.content.chars().count();
        if seen >= column {
            right.push(span);
        } else if seen + len <= column {
            left.push(span);
        } else {
            let at = span.content.char_indices().nth(column - seen).map(|(i, _)| i).unwrap_or(span.content.len());
            let (head, tail) = span.content.split_at(at);
            left.push(Span::styled(head.to_owned(), span.style));
            right.push(Span::styled(tail.to_owned(), span.style));
        }
        seen += len;
    }
    (left, right)
}
