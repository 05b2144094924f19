//! Color themes for basemark.
//!
//! Two built-in themes are provided:
//!
//! - `dark`: ANSI 16 colors, so it works on any terminal including 256-color
//!   SSH sessions without truecolor.
//! - `catppuccin-mocha`: the Catppuccin Mocha palette in RGB; needs truecolor.

use ratatui::style::Color;

/// All color values used across basemark's UI surfaces.
#[derive(Debug, Clone)]
pub struct Theme {
    // Panel borders
    pub border_active: Color,
    pub border_inactive: Color,

    // Change markers, shared by the editor gutter and both diff panes
    pub line_added: Color,
    pub line_modified: Color,
    pub line_removed: Color,
    /// Line-number gutter for unchanged lines.
    pub gutter: Color,
    /// Inline suggestion drawn after the cursor.
    pub ghost_text: Color,

    // Tab strip
    pub tab_active: Color,
    pub tab_inactive: Color,
    /// Marker for a tab shown in the two-pane diff view.
    pub tab_diff: Color,

    // Source-control panel
    pub badge_added: Color,
    pub badge_modified: Color,
    pub section_header: Color,

    // Status bar
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    pub status_mode_normal: Color,
    pub status_mode_insert: Color,
    pub status_mode_commit: Color,
    pub status_error: Color,

    pub background: Color,
}

impl Theme {
    /// Built-in dark theme using ANSI 16 colors. Default when the configured
    /// name is unknown.
    pub fn dark() -> Self {
        Self {
            border_active: Color::Cyan,
            border_inactive: Color::DarkGray,

            line_added: Color::Green,
            line_modified: Color::Yellow,
            line_removed: Color::Red,
            gutter: Color::DarkGray,
            ghost_text: Color::DarkGray,

            tab_active: Color::White,
            tab_inactive: Color::DarkGray,
            tab_diff: Color::Magenta,

            badge_added: Color::Green,
            badge_modified: Color::Yellow,
            section_header: Color::Cyan,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_mode_normal: Color::Cyan,
            status_mode_insert: Color::Green,
            status_mode_commit: Color::Magenta,
            status_error: Color::Red,

            background: Color::Reset,
        }
    }

    /// Catppuccin Mocha using RGB truecolor values.
    ///
    /// Palette source: <https://github.com/catppuccin/catppuccin> Mocha variant.
    pub fn catppuccin_mocha() -> Self {
        let green = Color::Rgb(166, 227, 161); // #a6e3a1
        let red = Color::Rgb(243, 139, 168); // #f38ba8
        let yellow = Color::Rgb(249, 226, 175); // #f9e2af
        let mauve = Color::Rgb(203, 166, 247); // #cba6f7
        let teal = Color::Rgb(148, 226, 213); // #94e2d5
        let lavender = Color::Rgb(180, 190, 254); // #b4befe
        let overlay0 = Color::Rgb(108, 112, 134); // #6c7086
        let overlay1 = Color::Rgb(127, 132, 156); // #7f849c
        let surface1 = Color::Rgb(69, 71, 90); // #45475a
        let base = Color::Rgb(30, 30, 46); // #1e1e2e
        let text = Color::Rgb(205, 214, 244); // #cdd6f4

        Self {
            border_active: lavender,
            border_inactive: overlay1,

            line_added: green,
            line_modified: yellow,
            line_removed: red,
            gutter: overlay0,
            ghost_text: overlay0,

            tab_active: text,
            tab_inactive: overlay1,
            tab_diff: mauve,

            badge_added: green,
            badge_modified: yellow,
            section_header: teal,

            status_bar_bg: surface1,
            status_bar_fg: text,
            status_mode_normal: lavender,
            status_mode_insert: green,
            status_mode_commit: mauve,
            status_error: red,

            background: base,
        }
    }

    /// Resolves a theme name from config. Unknown names fall back to `dark()`
    /// with a logged warning so a typo never prevents startup.
    pub fn from_name(name: &str) -> Self {
        match name {
            "catppuccin-mocha" | "catppuccin_mocha" => Self::catppuccin_mocha(),
            "dark" => Self::dark(),
            other => {
                tracing::warn!(theme = other, "unknown theme, falling back to 'dark'");
                Self::dark()
            }
        }
    }
}
