//! One in-flight completion attempt and its source fan-out.

use std::sync::Arc;

use futures_util::stream::FuturesUnordered;
use pum_core::{CompleteOption, Config, Item, RecencyMap};
use pum_event::{TaskController, TaskHandle};
use tokio::time::{timeout_at, Duration, Instant};
use tokio_stream::StreamExt;

use crate::error::Error;
use crate::job::Dispatcher;
use crate::source::{Source, SourceReply};

/// After the first source answers, further answers arriving within this
/// window join the first paint instead of repainting one by one.
const FIRST_PAINT_GRACE: Duration = Duration::from_millis(100);

/// What one source contributed to a session.
#[derive(Debug, Clone, Default)]
pub(crate) struct SourceResult {
    pub items: Vec<Item>,
    pub is_incomplete: bool,
    /// The source answered (or failed, or timed out) for the current
    /// query generation.
    pub done: bool,
    pub failed: bool,
}

/// A single completion attempt. Owns the option it started from, the
/// sources it queries and the cancellation controller every spawned piece
/// of work observes. Dropping the session cancels all of it.
pub(crate) struct Session {
    pub generation: u64,
    pub option: CompleteOption,
    pub sources: Vec<Arc<dyn Source>>,
    /// The live typed prefix, updated as the user extends it.
    pub input: String,
    pub results: Vec<SourceResult>,
    /// Sources that have not answered the current query yet.
    pub pending: usize,
    /// Change counter captured when the popup was last painted. Events
    /// bearing this tick are self induced.
    pub changed_tick: Option<u64>,
    /// Rows currently on screen, tagged with their source index.
    pub shown: Vec<(usize, Item)>,
    pub number_select_mapped: bool,
    pub pushed_completeopt: bool,
    pub controller: TaskController,
}

impl Session {
    pub fn new(generation: u64, option: CompleteOption, sources: Vec<Arc<dyn Source>>) -> Session {
        let pending = sources.len();
        Session {
            generation,
            input: option.input.clone(),
            option,
            results: vec![SourceResult::default(); pending],
            pending,
            sources,
            changed_tick: None,
            shown: Vec::new(),
            number_select_mapped: false,
            pushed_completeopt: false,
            controller: TaskController::new(),
        }
    }

    pub fn is_completing(&self) -> bool {
        self.pending > 0
    }

    /// Record one source answer. `None` marks a failure or timeout; the
    /// items the source delivered earlier are kept in that case.
    pub fn record(&mut self, idx: usize, reply: Option<SourceReply>) {
        let Some(result) = self.results.get_mut(idx) else {
            return;
        };
        if !result.done {
            result.done = true;
            self.pending = self.pending.saturating_sub(1);
        }
        match reply {
            Some(reply) => {
                result.items = reply.items;
                result.is_incomplete = reply.is_incomplete;
                result.failed = false;
            }
            None => result.failed = true,
        }
    }
}

/// The complete-option string pushed while a session runs.
pub(crate) fn completeopt(config: &Config) -> String {
    let mut opt = if config.noselect {
        "noselect,noinsert,menuone"
    } else {
        "noinsert,menuone"
    }
    .to_string();
    if config.enable_preview {
        opt.push_str(",preview");
    }
    opt
}

/// Query `runs` concurrently and report back to the coordinator loop.
///
/// Each source runs under its own timeout; a failure or timeout becomes
/// an [`Error::Source`] in the delivered batch and drops that source for
/// the session without disturbing the others. The first answer (plus
/// whatever lands inside [`FIRST_PAINT_GRACE`]) is delivered as one batch
/// so the popup can appear before slow sources finish; stragglers follow
/// one by one. `sync_tick` makes the whole delivery conditional on the
/// document still being on that change counter, which is how
/// incomplete-source re-queries discard themselves after further edits.
#[allow(clippy::too_many_arguments)]
pub(crate) fn spawn_fan_out(
    dispatcher: Dispatcher,
    recency: Arc<RecencyMap>,
    timeout_ms: u64,
    handle: TaskHandle,
    generation: u64,
    runs: Vec<(usize, Arc<dyn Source>)>,
    option: CompleteOption,
    sync_tick: Option<u64>,
) {
    let timeout = Duration::from_millis(timeout_ms);
    let mut futures: FuturesUnordered<_> = runs
        .into_iter()
        .map(|(idx, source)| {
            let name = source.name().to_string();
            // build the request before the async block so it is issued
            // right away, not when the future is first polled
            let request = source.do_complete(&option, &recency, handle.clone());
            async move {
                let reply = match tokio::time::timeout(timeout, request).await {
                    Ok(Ok(reply)) => Ok(reply),
                    Ok(Err(err)) => Err(Error::Source { name, source: err }),
                    Err(_) => Err(Error::Source {
                        name,
                        source: anyhow::anyhow!("no reply within {timeout:?}"),
                    }),
                };
                (idx, reply)
            }
        })
        .collect();

    let fan_out = {
        let dispatcher = dispatcher.clone();
        async move {
            let Some(first) = futures.next().await else {
                return;
            };
            let mut batch = vec![first];
            let deadline = Instant::now() + FIRST_PAINT_GRACE;
            while !futures.is_empty() {
                match timeout_at(deadline, futures.next()).await {
                    Ok(Some(result)) => batch.push(result),
                    Ok(None) | Err(_) => break,
                }
            }
            dispatcher.dispatch(move |coord| coord.record_results(generation, batch, sync_tick));
            while let Some(result) = futures.next().await {
                dispatcher
                    .dispatch(move |coord| coord.record_results(generation, vec![result], sync_tick));
            }
        }
    };
    tokio::spawn(async move {
        if handle.cancelable(fan_out).await.is_none() {
            log::debug!("completion fan-out canceled");
        }
    });
}
