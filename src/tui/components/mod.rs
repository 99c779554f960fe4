pub mod condition_editor;
pub mod filter_builder_dialog;
pub mod layout;

pub use condition_editor::{ConditionEditor, EditorField, EditorOutcome};
pub use filter_builder_dialog::{flatten, FilterBuilderDialog, TreeRow};
