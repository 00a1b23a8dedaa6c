//! The wire-level records exchanged with the editor and the completion
//! items produced by sources.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// How long a recorded keystroke counts as the cause of a following
/// text-changed event.
pub const INSERT_FRESHNESS: Duration = Duration::from_millis(500);

/// A single rendered documentation block for the floating window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Documentation {
    pub filetype: String,
    pub content: String,
}

/// A completion candidate produced by a source.
///
/// `word` is the text inserted on accept, `abbr` the display label. The
/// remaining fields mirror what the editor's popup understands; `user_data`
/// is carried opaquely back to the owning source on resolve and commit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Item {
    pub word: String,
    pub abbr: String,
    pub menu: String,
    pub kind: String,
    pub info: String,
    pub dup: bool,
    pub empty: bool,
    pub icase: bool,
    pub preselect: bool,
    pub is_snippet: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<Vec<Documentation>>,
}

impl Item {
    /// A bare word candidate, label defaulting to the word itself.
    pub fn new(word: impl Into<String>) -> Item {
        let word = word.into();
        Item {
            abbr: word.clone(),
            word,
            ..Default::default()
        }
    }
}

/// The immutable description of where a completion session started.
///
/// Captured from the editor when the session begins; `col` is the byte
/// offset on `line` where the completed word starts and `colnr` the 1-based
/// cursor column at capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteOption {
    pub bufnr: u64,
    pub linenr: u32,
    pub col: u32,
    pub colnr: u32,
    pub line: String,
    pub filetype: String,
    pub input: String,
    #[serde(default)]
    pub trigger_character: Option<char>,
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// Explicitly requested source, bypassing `should_complete`.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

impl CompleteOption {
    /// Text of the line from start to the cursor at capture time.
    pub fn initial_pretext(&self) -> &str {
        let end = (self.colnr as usize).saturating_sub(1).min(self.line.len());
        self.line.get(..end).unwrap_or(&self.line)
    }

    /// Buffers whose uri carries the editor's command-line sentinel never
    /// get a popup.
    pub fn is_command_line(&self) -> bool {
        self.uri
            .as_deref()
            .is_some_and(|uri| uri.ends_with("%5BCommand%20Line%5D"))
    }
}

/// An insert-mode text change as reported by the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertChange {
    pub bufnr: u64,
    pub lnum: u32,
    pub col: u32,
    /// Text from line start to cursor.
    pub pre: String,
    pub changedtick: u64,
}

/// The highlighted-row-changed event of the popup menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupChangeEvent {
    pub completed_item: Option<Item>,
    pub col: u32,
    pub row: u32,
    pub height: u32,
    pub width: u32,
    #[serde(default)]
    pub scrollbar: bool,
}

/// The most recent keystroke, used to tell user typing apart from editor
/// induced text changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastInsert {
    pub character: char,
    pub at: Instant,
}

impl LastInsert {
    pub fn now(character: char) -> LastInsert {
        LastInsert {
            character,
            at: Instant::now(),
        }
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.at) <= INSERT_FRESHNESS
    }
}

/// The live user input of a session given the current pretext.
///
/// Reads `pretext` as a byte sequence and returns everything from byte
/// offset `option.col` on. Yields `None` when the pretext is shorter than
/// the session start column, when the offset does not fall on a character
/// boundary, or when the result is blacklisted for this option.
pub fn get_resume_input(pretext: &str, option: &CompleteOption) -> Option<String> {
    let col = option.col as usize;
    if pretext.len() < col {
        return None;
    }
    let search = pretext.get(col..)?;
    if option.blacklist.iter().any(|entry| entry == search) {
        return None;
    }
    Some(search.to_string())
}
