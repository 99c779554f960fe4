use crate::tui::action::Action;
use color_eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

/// Base trait for the editor's panes
///
/// The tree view and the condition editor implement this so the app can route
/// bound actions and raw keys the same way to whichever pane is on top.
pub trait Component {
    /// Handle an action
    ///
    /// Returns Ok(true) if the action was handled and consumed.
    /// Returns Ok(false) if the action was not handled and should propagate.
    fn handle_action(&mut self, action: Action) -> Result<bool>;

    /// Raw key input offered before keybindings are consulted
    ///
    /// Text fields use this so typed characters are never swallowed by a
    /// single-letter binding. Returns Ok(true) when the key was consumed.
    fn handle_key_event(&mut self, _key: KeyEvent) -> Result<bool> {
        Ok(false)
    }

    /// Render the component within the given area
    fn render(&mut self, frame: &mut Frame, area: Rect);

    /// Actions this component reacts to, in footer order
    fn supported_actions(&self) -> &[Action];

    /// Get component name for debugging/logging
    fn name(&self) -> &str;

    /// Update component state (called on every tick)
    ///
    /// Suggestion results and the popup close delay are driven from here.
    fn update(&mut self) -> Result<()> {
        Ok(())
    }
}
