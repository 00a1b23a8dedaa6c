//! The recognized configuration options of the completion engine.
//!
//! The struct deserializes from the editor's configuration payload using
//! the camelCase key names the editor exposes to users. Unknown keys are
//! rejected so that typos surface instead of silently doing nothing.

use serde::{Deserialize, Serialize};

/// When the engine starts a session on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoTrigger {
    /// Trigger on trigger characters and on plain word typing.
    Always,
    /// Trigger only on source trigger characters.
    Trigger,
    /// Never trigger automatically.
    None,
}

/// Tie-break ordering applied after match scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMethod {
    Alphabetical,
    Length,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Config {
    pub auto_trigger: AutoTrigger,
    pub min_trigger_input_length: u32,
    pub accept_suggestion_on_commit_character: bool,
    pub noselect: bool,
    pub number_select: bool,
    pub keep_completeopt: bool,
    pub enable_preview: bool,
    pub enable_preselect: bool,
    pub label_max_length: usize,
    pub max_item_count: usize,
    pub disable_kind: bool,
    pub disable_menu: bool,
    pub disable_menu_shortcut: bool,
    pub remove_duplicate_items: bool,
    pub locality_bonus: bool,
    pub default_sort_method: SortMethod,
    pub trigger_after_insert_enter: bool,
    /// Per provider, per session, in milliseconds.
    pub timeout: u64,
    pub high_priority_source_limit: Option<usize>,
    pub low_priority_source_limit: Option<usize>,
    pub ascii_characters_only: bool,
    pub snippet_indicator: String,
    pub fix_inserted_word: bool,
    pub preview_is_keyword: String,
    /// How long the post-commit handler waits for the editor's trailing
    /// text-changed event to settle, in milliseconds.
    pub post_commit_wait: u64,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            auto_trigger: AutoTrigger::Always,
            min_trigger_input_length: 1,
            accept_suggestion_on_commit_character: false,
            noselect: true,
            number_select: false,
            keep_completeopt: false,
            enable_preview: false,
            enable_preselect: true,
            label_max_length: 200,
            max_item_count: 50,
            disable_kind: false,
            disable_menu: false,
            disable_menu_shortcut: false,
            remove_duplicate_items: false,
            locality_bonus: true,
            default_sort_method: SortMethod::Length,
            trigger_after_insert_enter: false,
            timeout: 500,
            high_priority_source_limit: None,
            low_priority_source_limit: None,
            ascii_characters_only: false,
            snippet_indicator: "~".to_string(),
            fix_inserted_word: true,
            preview_is_keyword: "@,48-57,_192-255".to_string(),
            post_commit_wait: 50,
        }
    }
}
