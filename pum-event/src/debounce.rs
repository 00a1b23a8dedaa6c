//! Utilities for declaring an async (usually debounced) hook.

use std::time::Duration;

use futures_executor::block_on;
use tokio::sync::mpsc::{self, error::TrySendError, Sender};
use tokio::time::{timeout_at, Instant};

/// Events queue up fast during bursts but are drained immediately, so
/// this only back-pressures when the whole process is overwhelmed.
const CHANNEL_CAPACITY: usize = 128;

/// How long a sender is willing to stall before an event is sacrificed.
const SEND_PATIENCE: Duration = Duration::from_millis(10);

/// A stateful consumer of a single event type, running on its own task.
///
/// Events are delivered to [`AsyncHook::handle_event`] as soon as they
/// arrive; the hook either consumes them on the spot or schedules a
/// deadline. Once the channel stays quiet past the deadline
/// [`AsyncHook::finish_debounce`] runs. Returning `None` from
/// `handle_event` clears any pending deadline.
pub trait AsyncHook: Sync + Send + 'static + Sized {
    type Event: Sync + Send + 'static;

    /// React to one event. `timeout` is the currently scheduled deadline,
    /// if any; the return value replaces it.
    fn handle_event(&mut self, event: Self::Event, timeout: Option<Instant>) -> Option<Instant>;

    /// Called when the debounce deadline elapses without further events.
    fn finish_debounce(&mut self);

    fn spawn(self) -> mpsc::Sender<Self::Event> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(run(self, rx));
        tx
    }
}

/// What woke the hook task up.
enum Stimulus<E> {
    Event(E),
    DeadlineHit,
    Closed,
}

async fn next_stimulus<E>(rx: &mut mpsc::Receiver<E>, wake_at: Option<Instant>) -> Stimulus<E> {
    let received = match wake_at {
        Some(at) => {
            let Ok(received) = timeout_at(at, rx.recv()).await else {
                return Stimulus::DeadlineHit;
            };
            received
        }
        None => rx.recv().await,
    };
    match received {
        Some(event) => Stimulus::Event(event),
        None => Stimulus::Closed,
    }
}

async fn run<H: AsyncHook>(mut hook: H, mut rx: mpsc::Receiver<H::Event>) {
    let mut wake_at = None;
    loop {
        match next_stimulus(&mut rx, wake_at).await {
            Stimulus::Event(event) => wake_at = hook.handle_event(event, wake_at),
            Stimulus::DeadlineHit => {
                wake_at = None;
                hook.finish_debounce();
            }
            Stimulus::Closed => break,
        }
    }
}

/// Feed a hook from synchronous code without risking a deadlock on the
/// async runtime. Tries a non-blocking send first; a full channel gets a
/// short blocking window and the event is dropped (with a log) rather
/// than freezing the caller.
pub fn send_blocking<T>(tx: &Sender<T>, data: T) {
    let Err(TrySendError::Full(data)) = tx.try_send(data) else {
        return;
    };
    if block_on(tx.send_timeout(data, SEND_PATIENCE)).is_err() {
        log::error!("async hook channel overwhelmed, event dropped");
    }
}
