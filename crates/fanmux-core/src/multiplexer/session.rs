//! Multiplexer session.

use std::future::{pending, poll_fn};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::MultiplexerConfig;
use crate::error::{Error, Result};
use crate::event::ProducerId;
use crate::producer::Producer;

use super::registry::Registry;
use super::types::{MultiplexResult, PollResult, SessionStats, Timeout};

/// Fan-in session over a fixed set of producers.
///
/// Producers may join until the first [`step`](Self::step) or
/// [`poll`](Self::poll). The session ends when it returns `Cancelled` or
/// `AllExhausted`, or when it is dropped, which closes every remaining
/// producer. Whichever terminal result comes first is repeated by every
/// later call.
#[derive(Debug)]
pub struct Session<T> {
    registry: Registry<T>,
    cancel: CancellationToken,
    timeout: Option<Timeout>,
    started: bool,
    cancelled: bool,
    exhausted: bool,
    stats: SessionStats,
}

impl<T> Session<T> {
    /// Create a session.
    ///
    /// Fails with [`Error::Configuration`] when `timeout` is zero or two
    /// producers share an id.
    pub fn new(
        producers: impl IntoIterator<Item = Producer<T>>,
        cancel: CancellationToken,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let timeout = timeout.map(Timeout::new).transpose()?;
        let mut session = Self {
            registry: Registry::new(),
            cancel,
            timeout,
            started: false,
            cancelled: false,
            exhausted: false,
            stats: SessionStats::default(),
        };
        for producer in producers {
            session.register(producer)?;
        }

        info!(
            producers = session.registry.len(),
            timeout = ?session.timeout(),
            "Created multiplexer session"
        );
        Ok(session)
    }

    /// Create a session using the configured default timeout.
    pub fn from_config(
        producers: impl IntoIterator<Item = Producer<T>>,
        cancel: CancellationToken,
        config: &MultiplexerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Self::new(producers, cancel, config.timeout())
    }

    /// Add a producer before the first step.
    pub fn add_producer(&mut self, producer: Producer<T>) -> Result<()> {
        if self.started {
            return Err(Error::SessionStarted);
        }
        self.register(producer)?;
        debug!(producers = self.registry.len(), "Producer joined session");
        Ok(())
    }

    fn register(&mut self, producer: Producer<T>) -> Result<()> {
        if self.registry.contains(producer.id()) {
            return Err(Error::Configuration(format!(
                "duplicate producer id: {}",
                producer.id()
            )));
        }
        self.registry.insert(producer);
        Ok(())
    }

    /// Wait for the next result using the session's default timeout.
    pub async fn step(&mut self) -> MultiplexResult<T> {
        self.wait(self.timeout).await
    }

    /// Wait for the next result with a deadline for this call only.
    pub async fn step_with_timeout(&mut self, timeout: Timeout) -> MultiplexResult<T> {
        self.wait(Some(timeout)).await
    }

    /// Return whatever is ready right now without suspending.
    pub fn poll(&mut self) -> PollResult<T> {
        self.started = true;
        if self.exhausted {
            return PollResult::Ready(MultiplexResult::AllExhausted);
        }
        if self.observe_cancel() {
            return PollResult::Ready(MultiplexResult::Cancelled);
        }
        match self.registry.try_next() {
            Some(result) => PollResult::Ready(self.record(result)),
            None => PollResult::NotReady,
        }
    }

    async fn wait(&mut self, timeout: Option<Timeout>) -> MultiplexResult<T> {
        self.started = true;
        if self.exhausted {
            return MultiplexResult::AllExhausted;
        }
        if self.observe_cancel() {
            return MultiplexResult::Cancelled;
        }

        let Self {
            registry, cancel, ..
        } = &mut *self;
        // Fresh deadline per call; never carried across steps.
        let deadline = async move {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout.get()).await,
                None => pending::<()>().await,
            }
        };

        // Cancellation is polled first so it wins over ready producers.
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => MultiplexResult::Cancelled,
            result = poll_fn(|cx| registry.poll_next(cx)) => result,
            () = deadline => MultiplexResult::TimedOut,
        };

        if matches!(result, MultiplexResult::Cancelled) {
            self.observe_cancel();
            return result;
        }
        self.record(result)
    }

    /// Latch the token's state; once cancelled the session stays cancelled.
    fn observe_cancel(&mut self) -> bool {
        if !self.cancelled && self.cancel.is_cancelled() {
            self.cancelled = true;
            info!(
                delivered = self.stats.delivered,
                active = self.registry.len(),
                "Session cancelled"
            );
        }
        self.cancelled
    }

    fn record(&mut self, result: MultiplexResult<T>) -> MultiplexResult<T> {
        match &result {
            MultiplexResult::Delivered(event) => {
                self.stats.delivered += 1;
                trace!(producer = %event.producer, sequence = event.sequence, "Event delivered");
            }
            MultiplexResult::ProducerExhausted { id, error } => {
                self.stats.exhausted += 1;
                match error {
                    Some(error) => warn!(producer = %id, error = %error, "Producer failed"),
                    None => debug!(producer = %id, "Producer exhausted"),
                }
            }
            MultiplexResult::TimedOut => {
                self.stats.timeouts += 1;
                debug!("Step timed out");
            }
            MultiplexResult::AllExhausted => {
                if !self.exhausted {
                    self.exhausted = true;
                    debug!(delivered = self.stats.delivered, "All producers exhausted");
                }
            }
            MultiplexResult::Cancelled => {}
        }
        result
    }

    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Timeout::get)
    }

    /// Ids of producers still in the race.
    pub fn active_producers(&self) -> impl Iterator<Item = &ProducerId> {
        self.registry.ids()
    }

    /// `true` once the token has fired; every later step returns `Cancelled`.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled || self.cancel.is_cancelled()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            active_producers: self.registry.len(),
            ..self.stats
        }
    }
}
