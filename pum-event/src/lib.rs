//! `pum-event` contains the async plumbing the completion engine is built
//! on. The engine itself is strictly single threaded: every piece of
//! session state is mutated on one main loop. What this crate provides is
//! the machinery around that loop:
//!
//! * generation-based cancellation: a [`TaskController`] owns one
//!   generation of work at a time and hands out cheaply clonable
//!   [`TaskHandle`]s that many spawned tasks can check or await at once;
//!   restarting the controller cancels the old generation wholesale;
//! * [`AsyncHook`], a debounced event consumer running on its own task,
//!   fed through a bounded channel with [`send_blocking`]. Debouncing is
//!   trailing edge: each incoming event may move the deadline, and
//!   [`AsyncHook::finish_debounce`] runs once the channel stays quiet past
//!   it.
//!
//! Due to limitations around tokio's `blocking_send` inside a runtime,
//! the [`send_blocking`] helper exported here must be used instead of the
//! built-in when feeding a hook from the main loop.

pub use cancel::{TaskController, TaskHandle};
pub use debounce::{send_blocking, AsyncHook};

mod cancel;
mod debounce;
