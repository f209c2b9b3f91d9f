//! Multiplexer result and configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::event::{Event, ProducerId};

/// Outcome of one multiplexer step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MultiplexResult<T> {
    /// A producer's next event.
    Delivered(Event<T>),
    /// A producer closed with nothing pending and left the session.
    ProducerExhausted {
        id: ProducerId,
        /// Failure detail when the producer terminated through an error.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// The cancellation token fired. Terminal.
    Cancelled,
    /// The step's deadline elapsed first. The session stays usable.
    TimedOut,
    /// No active producers remain. Terminal.
    AllExhausted,
}

impl<T> MultiplexResult<T> {
    /// `true` for `Cancelled` and `AllExhausted`.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::AllExhausted)
    }
}

/// Outcome of a non-blocking poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult<T> {
    Ready(MultiplexResult<T>),
    /// Nothing was ready; no deadline was started.
    NotReady,
}

impl<T> PollResult<T> {
    pub fn ready(self) -> Option<MultiplexResult<T>> {
        match self {
            Self::Ready(result) => Some(result),
            Self::NotReady => None,
        }
    }
}

/// A validated, non-zero step deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timeout(Duration);

impl Timeout {
    pub fn new(duration: Duration) -> Result<Self> {
        if duration.is_zero() {
            return Err(Error::Configuration(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(Self(duration))
    }

    pub const fn get(self) -> Duration {
        self.0
    }
}

impl TryFrom<Duration> for Timeout {
    type Error = Error;

    fn try_from(duration: Duration) -> Result<Self> {
        Self::new(duration)
    }
}

/// Session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Producers still in the race.
    pub active_producers: usize,
    /// Events handed to the caller.
    pub delivered: u64,
    /// Producers reported exhausted so far.
    pub exhausted: u64,
    /// Steps that ended in `TimedOut`.
    pub timeouts: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_is_a_configuration_error() {
        assert!(matches!(
            Timeout::new(Duration::ZERO),
            Err(Error::Configuration(_))
        ));
        assert_eq!(
            Timeout::try_from(Duration::from_millis(5)).unwrap().get(),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn only_cancelled_and_all_exhausted_are_terminal() {
        assert!(MultiplexResult::<()>::Cancelled.is_terminal());
        assert!(MultiplexResult::<()>::AllExhausted.is_terminal());
        assert!(!MultiplexResult::<()>::TimedOut.is_terminal());
        assert!(
            !MultiplexResult::<()>::ProducerExhausted {
                id: ProducerId::from("a"),
                error: None,
            }
            .is_terminal()
        );
    }

    #[test]
    fn results_serialize_with_a_tag() {
        let exhausted = MultiplexResult::<String>::ProducerExhausted {
            id: ProducerId::from("b"),
            error: Some("boom".to_string()),
        };
        assert_eq!(
            serde_json::to_string(&exhausted).unwrap(),
            r#"{"result":"producer_exhausted","id":"b","error":"boom"}"#
        );
        assert_eq!(
            serde_json::to_string(&MultiplexResult::<String>::TimedOut).unwrap(),
            r#"{"result":"timed_out"}"#
        );
    }
}
