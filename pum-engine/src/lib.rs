//! `pum-engine` is the completion coordinator of an editor integration:
//! it listens to insert-mode input events, decides when to start a
//! completion session, queries its sources in parallel, narrows and
//! re-ranks their results as the user keeps typing, drives the editor's
//! popup menu and tears everything down on cancel or commit.
//!
//! The engine is strictly single threaded at heart: one [`Coordinator`]
//! owns all mutable state and is driven either through
//! [`Coordinator::run`] or by feeding it events directly. Sources and the
//! editor live behind the [`Source`] and [`EditorBridge`] traits; spawned
//! work reports back onto the coordinator's loop and re-checks the state
//! it captured before touching the editor, so a stale continuation can
//! never paint stale data.

pub use pum_core::{
    AutoTrigger, CompleteOption, Config, Documentation, InsertChange, Item, PopupChangeEvent,
    RecencyMap, SortMethod, WordSet,
};

pub use crate::bridge::{
    EditorBridge, EditorCommand, EditorEvent, EditorKind, FloatBounds, FloatingWindow,
};
pub use crate::coordinator::Coordinator;
pub use crate::error::{Error, Result};
pub use crate::source::{Source, SourceReply};

mod bridge;
mod coordinator;
mod error;
mod filter;
mod job;
mod popup;
mod resolve;
mod session;
mod source;
mod trigger;

#[cfg(test)]
mod test;
