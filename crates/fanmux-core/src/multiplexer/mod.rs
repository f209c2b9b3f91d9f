//! Fan-in multiplexing.
//!
//! A [`Session`] races every active producer against a shared
//! [`CancellationToken`] and an optional per-step deadline, yielding exactly
//! one [`MultiplexResult`] per step.

mod registry;
mod session;
mod types;

pub use session::Session;
pub use types::{MultiplexResult, PollResult, SessionStats, Timeout};

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Signal `token`. Idempotent, and safe from any task or thread.
///
/// Every session sharing the token returns [`MultiplexResult::Cancelled`]
/// from its next step or poll.
pub fn cancel(token: &CancellationToken) {
    if !token.is_cancelled() {
        info!("Cancellation requested");
    }
    token.cancel();
}
