//! `fanmux` Core Library
//!
//! Fan-in multiplexing over concurrently running producers:
//! - Session that merges N producer channels into one stream of results
//! - Cooperative cancellation through a shared token
//! - Per-wait timeouts and a non-blocking poll
//! - Configuration resolution

pub mod config;
pub mod error;
pub mod event;
pub mod multiplexer;
pub mod producer;

pub use config::{Config, MultiplexerConfig};
pub use error::{Error, Result};
pub use event::{Event, ProducerId};
pub use multiplexer::{MultiplexResult, PollResult, Session, SessionStats, Timeout, cancel};
pub use producer::{Emitter, Producer};
pub use tokio_util::sync::CancellationToken;
