//! The capability interface completion sources implement.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use pum_core::{CompleteOption, Item, RecencyMap};
use pum_event::TaskHandle;

/// One response of a source to a completion request.
#[derive(Debug, Clone, Default)]
pub struct SourceReply {
    pub items: Vec<Item>,
    /// The returned set is a filtered view of a larger space and must be
    /// re-queried when the prefix grows instead of filtered locally.
    pub is_incomplete: bool,
}

impl SourceReply {
    pub fn new(items: Vec<Item>) -> SourceReply {
        SourceReply {
            items,
            is_incomplete: false,
        }
    }
}

/// A completion source (LSP server, snippet engine, buffer words, …).
///
/// Sources are queried through owned futures so a request keeps running
/// while the coordinator state moves on; the passed [`TaskHandle`] is the
/// contract that lets a source stop early once its session is gone.
/// Implementations must not emit results after the handle is canceled.
pub trait Source: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Sources with higher priority are ordered first and draw from the
    /// high-priority item limit. Defaults to 0.
    fn priority(&self) -> i32 {
        0
    }

    /// Whether this source wants to participate in a session for `option`.
    fn should_complete(&self, _option: &CompleteOption) -> bool {
        true
    }

    /// Trigger strings for the given filetype. A session starts when the
    /// typed prefix ends with one of them.
    fn triggers(&self, _filetype: &str) -> Vec<String> {
        Vec::new()
    }

    /// Whether the typed prefix hits one of this source's triggers.
    /// Override for sources whose triggers are patterns rather than
    /// plain suffixes.
    fn matches_trigger(&self, pre: &str, filetype: &str) -> bool {
        self.triggers(filetype)
            .iter()
            .any(|trigger| pre.ends_with(trigger.as_str()))
    }

    fn do_complete(
        &self,
        option: &CompleteOption,
        recency: &Arc<RecencyMap>,
        handle: TaskHandle,
    ) -> BoxFuture<'static, anyhow::Result<SourceReply>>;

    /// Whether typing `ch` while `item` is highlighted should accept it.
    fn should_commit(&self, _item: &Item, _ch: char) -> bool {
        false
    }

    /// Fill in the expensive parts of an item (documentation mostly).
    fn resolve(
        &self,
        item: &Item,
        _handle: TaskHandle,
    ) -> BoxFuture<'static, anyhow::Result<Item>> {
        let item = item.clone();
        async move { Ok(item) }.boxed()
    }

    /// Runs after an item of this source was committed, before the
    /// session is torn down. Errors are logged, never surfaced.
    fn on_complete_done(
        &self,
        _item: &Item,
        _option: &CompleteOption,
    ) -> BoxFuture<'static, anyhow::Result<()>> {
        async { Ok(()) }.boxed()
    }
}
