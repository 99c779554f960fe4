use ratatui::layout::Rect;

/// Main area plus an optional key-hint footer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogLayout {
    pub content_area: Rect,
    pub instructions_area: Option<Rect>,
}

/// Carve a footer tall enough for the wrapped `instructions` off the bottom of `area`
pub fn split_dialog_area(area: Rect, show_instructions: bool, instructions: &str) -> DialogLayout {
    if !show_instructions {
        return DialogLayout {
            content_area: area,
            instructions_area: None,
        };
    }
    let wrap_width = area.width.saturating_sub(4).max(10) as usize;
    let wrapped_lines = textwrap::wrap(instructions, wrap_width);
    let instructions_height = ((wrapped_lines.len() as u16).max(1) + 2).min(area.height);
    let content_area = Rect {
        height: area.height.saturating_sub(instructions_height),
        ..area
    };
    let instructions_area = Rect {
        y: area.y + area.height.saturating_sub(instructions_height),
        height: instructions_height,
        ..area
    };
    DialogLayout {
        content_area,
        instructions_area: Some(instructions_area),
    }
}

/// Centered rectangle taking a percentage of `area`, never smaller than `min_height` rows
pub fn centered_rect(percent_w: u16, percent_h: u16, min_height: u16, area: Rect) -> Rect {
    let width = (area.width * percent_w) / 100;
    let height = ((area.height * percent_h) / 100).max(min_height).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect {
        x,
        y,
        width,
        height,
    }
}
