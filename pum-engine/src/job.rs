//! Dispatch queue back onto the coordinator's main loop.
//!
//! Spawned tasks (the source fan-out, resolves, the post-commit settle)
//! never touch coordinator state directly. They push a callback here and
//! the main loop runs it between events, so every state mutation happens
//! on one thread and stale continuations can be detected by the witnesses
//! they captured.

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::coordinator::Coordinator;

pub(crate) type Job = Box<dyn FnOnce(&mut Coordinator) + Send>;

pub(crate) fn job_queue() -> (Dispatcher, UnboundedReceiver<Job>) {
    let (tx, rx) = unbounded_channel();
    (Dispatcher { tx }, rx)
}

#[derive(Debug, Clone)]
pub(crate) struct Dispatcher {
    tx: UnboundedSender<Job>,
}

impl Dispatcher {
    pub(crate) fn dispatch(&self, job: impl FnOnce(&mut Coordinator) + Send + 'static) {
        if self.tx.send(Box::new(job)).is_err() {
            log::debug!("coordinator is gone, dropping job");
        }
    }
}
