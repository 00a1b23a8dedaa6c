//! Cancellation primitives.

use std::future::Future;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Shared {
    canceled: AtomicBool,
    notify: Notify,
}

/// Owner side of a multi-observer cancellation token.
///
/// A controller hands out [`TaskHandle`]s for one generation of work;
/// [`TaskController::restart`] cancels the current generation and begins a
/// fresh one. Dropping the controller cancels whatever is still running.
#[derive(Debug)]
pub struct TaskController {
    active: Arc<Shared>,
}

impl TaskController {
    pub fn new() -> TaskController {
        TaskController {
            active: Arc::new(Shared::default()),
        }
    }

    /// Cancel the running generation and return a handle for the next one.
    pub fn restart(&mut self) -> TaskHandle {
        self.cancel();
        self.active = Arc::new(Shared::default());
        TaskHandle {
            shared: self.active.clone(),
        }
    }

    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            shared: self.active.clone(),
        }
    }

    pub fn cancel(&self) {
        self.active.canceled.store(true, Ordering::Relaxed);
        self.active.notify.notify_waiters();
    }

    /// Whether any task still holds a live handle of the current generation.
    pub fn is_running(&self) -> bool {
        Arc::strong_count(&self.active) > 1 && !self.active.canceled.load(Ordering::Relaxed)
    }
}

impl Default for TaskController {
    fn default() -> TaskController {
        TaskController::new()
    }
}

impl Drop for TaskController {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Observer side of a [`TaskController`]. Handles are cheap to clone and
/// may be checked synchronously or awaited.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    shared: Arc<Shared>,
}

impl TaskHandle {
    pub fn is_canceled(&self) -> bool {
        self.shared.canceled.load(Ordering::Relaxed)
    }

    /// Resolves once the owning controller cancels this generation.
    pub async fn canceled(&self) {
        let mut notified = pin!(self.shared.notify.notified());
        notified.as_mut().enable();
        if self.is_canceled() {
            return;
        }
        notified.await;
    }

    /// Run `future` to completion unless this handle is canceled first.
    pub async fn cancelable<T>(&self, future: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.canceled() => None,
            res = future => Some(res),
        }
    }
}
