use crate::config::{Config, Mode};
use crate::core::group::FilterGroup;
use crate::tui::components::FilterBuilderDialog;
use crate::tui::{Action, Component};
use color_eyre::Result;
use crossterm::event::{KeyEvent, KeyEventKind};
use ratatui::Frame;
use tracing::debug;

/// How the editing session ended
#[derive(Debug, Clone, PartialEq)]
pub enum Exit {
    /// The user applied the filter
    Applied(FilterGroup),
    /// The user quit without applying
    Discarded,
}

/// Application state
///
/// Owns the filter tree pane and routes key events to it through the
/// configured keybindings.
pub struct App {
    dialog: FilterBuilderDialog,
    config: Config,
    should_quit: bool,
    exit: Option<Exit>,
}

impl App {
    pub fn new(mut dialog: FilterBuilderDialog, config: Config) -> Self {
        dialog.show_instructions = true;
        Self {
            dialog,
            config,
            should_quit: false,
            exit: None,
        }
    }

    pub fn dialog(&self) -> &FilterBuilderDialog {
        &self.dialog
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn exit(&self) -> Option<&Exit> {
        self.exit.as_ref()
    }

    pub fn into_exit(self) -> Exit {
        self.exit.unwrap_or(Exit::Discarded)
    }

    /// Handle a key event
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        // Only handle key press events, ignore release/repeat
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        // text fields see raw keys before any binding
        if self.dialog.handle_key_event(key)? {
            return Ok(());
        }

        let mode = self.dialog.mode();
        let action = self
            .config
            .action_for_key(mode, key)
            .or_else(|| self.config.action_for_key(Mode::Global, key));
        if let Some(action) = action {
            self.handle_action(action)?;
        }
        Ok(())
    }

    /// Handle an action
    pub fn handle_action(&mut self, action: Action) -> Result<()> {
        let was_open = self.dialog.builder().is_open();
        if self.dialog.handle_action(action)? {
            if was_open && !self.dialog.builder().is_open() {
                self.finish(Exit::Applied(self.dialog.builder().root().clone()));
            }
            return Ok(());
        }

        match action {
            Action::Quit => self.finish(Exit::Discarded),
            Action::Cancel if !self.dialog.is_editing() => self.finish(Exit::Discarded),
            Action::ToggleInstructions => {
                self.dialog.show_instructions = !self.dialog.show_instructions;
            }
            _ => debug!("Unhandled action {:?} in {:?}", action, self.dialog.mode()),
        }
        Ok(())
    }

    fn finish(&mut self, exit: Exit) {
        self.exit = Some(exit);
        self.should_quit = true;
    }

    /// Update state on every tick
    pub fn update(&mut self) -> Result<()> {
        self.dialog.update()
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        self.dialog.render(frame, area);
    }
}
