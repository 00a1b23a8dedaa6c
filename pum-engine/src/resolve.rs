//! Debounced resolution of the highlighted item and the documentation
//! float it feeds.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use pum_core::{Documentation, Item};
use pum_event::{AsyncHook, TaskController};
use regex::Regex;
use tokio::time::Instant;

use crate::bridge::{FloatBounds, FloatingWindow};
use crate::job::Dispatcher;
use crate::source::Source;

/// A selection that settled long enough to be worth resolving.
pub(crate) struct ResolveRequest {
    pub generation: u64,
    pub source: Arc<dyn Source>,
    pub item: Item,
    pub bounds: FloatBounds,
    pub filetype: String,
}

pub(crate) enum ResolveEvent {
    /// The highlighted row changed. `None` means nothing is highlighted
    /// and the docs should go away once the debounce settles.
    Selection(Option<ResolveRequest>),
    /// The session ended; abort whatever is in flight.
    Cancel,
}

/// Trailing-edge debouncer over selection changes. At most one resolve
/// runs at a time; every new selection cancels the previous one. The
/// resolve itself happens on a spawned task and reports back through the
/// coordinator's job queue, where the session liveness check happens.
pub(crate) struct ResolveHandler {
    next: Option<Option<ResolveRequest>>,
    controller: TaskController,
    floating: Arc<dyn FloatingWindow>,
    dispatcher: Dispatcher,
    debounce: Duration,
}

impl ResolveHandler {
    pub fn new(
        floating: Arc<dyn FloatingWindow>,
        dispatcher: Dispatcher,
        debounce: Duration,
    ) -> ResolveHandler {
        ResolveHandler {
            next: None,
            controller: TaskController::new(),
            floating,
            dispatcher,
            debounce,
        }
    }
}

impl AsyncHook for ResolveHandler {
    type Event = ResolveEvent;

    fn handle_event(&mut self, event: ResolveEvent, _timeout: Option<Instant>) -> Option<Instant> {
        match event {
            ResolveEvent::Selection(request) => {
                self.controller.cancel();
                self.next = Some(request);
                Some(Instant::now() + self.debounce)
            }
            ResolveEvent::Cancel => {
                self.next = None;
                self.controller.cancel();
                None
            }
        }
    }

    fn finish_debounce(&mut self) {
        match self.next.take() {
            None => {}
            Some(None) => {
                self.controller.cancel();
                self.floating.close();
            }
            Some(Some(request)) => {
                let handle = self.controller.restart();
                let dispatcher = self.dispatcher.clone();
                tokio::spawn(async move {
                    let resolve = request.source.resolve(&request.item, handle.clone());
                    let resolved = match handle.cancelable(resolve).await {
                        None => return,
                        Some(Ok(item)) => item,
                        Some(Err(err)) => {
                            log::debug!("resolve of {} failed: {err:#}", request.item.word);
                            request.item.clone()
                        }
                    };
                    dispatcher.dispatch(move |coord| coord.show_docs(request, resolved, handle));
                });
            }
        }
    }
}

/// What the float should render for an item: its resolved documentation
/// when present, else its `info` text, classified as plain text or code.
pub(crate) fn docs_for(item: &Item, filetype: &str) -> Vec<Documentation> {
    if let Some(docs) = &item.documentation {
        return docs.clone();
    }
    if item.info.is_empty() {
        return Vec::new();
    }
    static PLAIN_TEXT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[\w\-\s.,\t]+$").expect("static pattern"));
    let filetype = if PLAIN_TEXT.is_match(&item.info) {
        "txt"
    } else {
        filetype
    };
    vec![Documentation {
        filetype: filetype.to_string(),
        content: item.info.clone(),
    }]
}
