//! Error types for `fanmux` core library.

use thiserror::Error;

use crate::event::ProducerId;

/// Result type alias using `fanmux` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `fanmux` operations.
///
/// A running session never produces these: producer failures are reported
/// as [`MultiplexResult::ProducerExhausted`](crate::MultiplexResult) data.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid session or config values (zero timeout, duplicate producer id, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Producers can only join a session before its first step
    #[error("Session already started; producers cannot join after the first step")]
    SessionStarted,

    /// The session reading from this producer has been dropped
    #[error("Producer {0} is detached from its session")]
    Detached(ProducerId),
}
