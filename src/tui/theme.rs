use std::str::FromStr;

use ratatui::style::{Color, Modifier, Style};

use crate::core::types::Logic;

/// Color scheme of the filter editor
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,

    // General UI colors
    pub background: Color,
    pub foreground: Color,
    pub border: Color,
    pub border_focused: Color,
    pub muted: Color,

    // Tree colors
    pub selected_fg: Color,
    pub selected_bg: Color,
    pub and_fg: Color,
    pub or_fg: Color,
    /// Border color of nested groups, cycled by depth
    pub group_borders: Vec<Color>,

    // Status/feedback colors
    pub success: Color,
    pub error: Color,
    pub warning: Color,
    pub info: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: "Default Dark".to_string(),
            background: Color::Reset,
            foreground: Color::Gray,
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            muted: Color::DarkGray,
            selected_fg: Color::Black,
            selected_bg: Color::Cyan,
            and_fg: Color::Cyan,
            or_fg: Color::Magenta,
            group_borders: vec![Color::Blue, Color::Green, Color::Yellow],
            success: Color::Green,
            error: Color::Red,
            warning: Color::Yellow,
            info: Color::Blue,
        }
    }

    pub fn light() -> Self {
        Self {
            name: "Light".to_string(),
            background: Color::White,
            foreground: Color::Black,
            border: Color::Gray,
            border_focused: Color::Blue,
            muted: Color::Gray,
            selected_fg: Color::White,
            selected_bg: Color::Blue,
            and_fg: Color::Blue,
            or_fg: Color::Rgb(150, 0, 150),
            group_borders: vec![Color::Blue, Color::Rgb(0, 130, 0), Color::Rgb(200, 150, 0)],
            success: Color::Green,
            error: Color::Red,
            warning: Color::Rgb(200, 150, 0), // Darker yellow for light bg
            info: Color::Blue,
        }
    }

    /// Look a theme up by name (`dark`/`light`), falling back to dark
    pub fn named(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "light" => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn selected_style(&self) -> Style {
        Style::default()
            .fg(self.selected_fg)
            .bg(self.selected_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn normal_style(&self) -> Style {
        Style::default().fg(self.foreground).bg(self.background)
    }

    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn focused_border_style(&self) -> Style {
        Style::default().fg(self.border_focused)
    }

    pub fn logic_style(&self, logic: Logic) -> Style {
        let fg = match logic {
            Logic::And => self.and_fg,
            Logic::Or => self.or_fg,
        };
        Style::default().fg(fg).add_modifier(Modifier::BOLD)
    }

    /// Border of a group nested `depth` levels below the root (root is 0)
    pub fn group_border_style(&self, depth: usize) -> Style {
        if depth == 0 || self.group_borders.is_empty() {
            return self.border_style();
        }
        let color = self.group_borders[(depth - 1) % self.group_borders.len()];
        Style::default().fg(color)
    }

    /// Style for an option badge; unknown color names fall back to the foreground
    pub fn option_style(&self, color: Option<&str>) -> Style {
        let fg = color
            .and_then(|c| Color::from_str(c).ok())
            .unwrap_or(self.foreground);
        Style::default().fg(fg)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn warning_style(&self) -> Style {
        Style::default().fg(self.warning)
    }

    pub fn success_style(&self) -> Style {
        Style::default().fg(self.success)
    }

    pub fn info_style(&self) -> Style {
        Style::default().fg(self.info)
    }
}
