use thiserror::Error;

/// Failures the coordinator reports to its embedder.
///
/// Cancellation is deliberately absent: a canceled session or resolve is
/// the normal way work ends and never surfaces as an error.
#[derive(Debug, Error)]
pub enum Error {
    /// A source failed while completing. Sources that fail during the
    /// fan-out are dropped for the session without aborting it; this
    /// variant is for failures that leave the engine nothing to show.
    #[error("completion source {name} failed: {source}")]
    Source {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    /// The editor bridge rejected a notification or query.
    #[error("editor rpc failed: {0}")]
    EditorRpc(#[source] anyhow::Error),
    /// The embedder asked for something that cannot be done, for example
    /// triggering an explicitly named source that was never registered.
    #[error("{0}")]
    Misuse(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
