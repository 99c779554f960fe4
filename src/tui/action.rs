use serde::{Deserialize, Serialize};

/// All possible actions in the filter editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Action {
    // Navigation
    MoveUp,
    MoveDown,
    NextField,
    PrevField,

    // Tree editing
    AddCondition,
    AddGroup,
    DeleteNode,
    DuplicateCondition,
    MoveConditionUp,
    MoveConditionDown,
    ToggleLogic,
    NestCondition,
    EditCondition,
    ClearAll,

    // View
    ToggleInstructions,

    // Application
    Apply,
    Save,
    Quit,
    Confirm,
    Cancel,

    // Clipboard
    Copy,
}

impl Action {
    /// Short name for the instruction footer
    pub fn label(&self) -> &'static str {
        match self {
            Action::MoveUp => "Up",
            Action::MoveDown => "Down",
            Action::NextField => "Next",
            Action::PrevField => "Prev",
            Action::AddCondition => "Add condition",
            Action::AddGroup => "Add group",
            Action::DeleteNode => "Delete",
            Action::DuplicateCondition => "Duplicate",
            Action::MoveConditionUp => "Move up",
            Action::MoveConditionDown => "Move down",
            Action::ToggleLogic => "AND/OR",
            Action::NestCondition => "Nest",
            Action::EditCondition => "Edit",
            Action::ClearAll => "Clear all",
            Action::ToggleInstructions => "Hints",
            Action::Apply => "Apply",
            Action::Save => "Save",
            Action::Quit => "Quit",
            Action::Confirm => "OK",
            Action::Cancel => "Cancel",
            Action::Copy => "Copy",
        }
    }
}
