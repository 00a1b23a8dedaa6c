//! `pum-core` contains the data model shared by the completion engine and
//! its editor bridge: completion items and options, the insert-mode change
//! records the editor reports, character classification used by the trigger
//! rules, the recognized configuration options and the recency map that
//! feeds ranking. Everything in this crate is synchronous and allocation
//! only; the async machinery lives in `pum-event` and `pum-engine`.

pub mod chars;
pub mod config;
pub mod recency;
pub mod types;

pub use chars::WordSet;
pub use config::{AutoTrigger, Config, SortMethod};
pub use recency::RecencyMap;
pub use types::{
    get_resume_input, CompleteOption, Documentation, InsertChange, Item, LastInsert,
    PopupChangeEvent,
};
