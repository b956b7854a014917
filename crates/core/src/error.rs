/// Result alias that carries the custom [`BeatDropError`] type.
pub type Result<T> = std::result::Result<T, BeatDropError>;

/// Common error type for the core crate.
///
/// Only the edges of the engine produce errors (config and chart files, track
/// construction, device transports). Nothing reachable from a frame tick does.
#[derive(Debug, thiserror::Error)]
pub enum BeatDropError {
    /// Free-form message, mostly surfaced by the application crate.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Config or chart JSON that failed to parse or serialise.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// Caller supplied data the engine cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// A beat chart file whose contents break the schedule invariants.
    #[error("invalid chart: {0}")]
    InvalidChart(String),
}

impl BeatDropError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}
