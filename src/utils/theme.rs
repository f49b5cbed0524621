use ratatui::style::Color;

/// Color palette for the TUI. One built-in dark palette; the platform's
/// branding is yellow-on-black, matching the accent below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuiTheme {
    pub background: Color,
    pub foreground: Color,
    pub border: Color,
    pub accent: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub muted: Color,
    pub watched: Color,
    pub error: Color,
}

impl Default for TuiTheme {
    fn default() -> Self {
        Self {
            background: Color::Black,
            foreground: Color::White,
            border: Color::DarkGray,
            accent: Color::Yellow,
            selection_bg: Color::Yellow,
            selection_fg: Color::Black,
            muted: Color::Gray,
            watched: Color::Green,
            error: Color::Red,
        }
    }
}
