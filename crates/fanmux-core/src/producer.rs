//! Producers and their emitting handles.
//!
//! A [`Producer`] is the receiving half the session reads from; its
//! [`Emitter`] is moved into whatever task generates the events. Dropping the
//! emitter marks the producer exhausted; [`Emitter::fail`] does the same with
//! an error detail attached.

use std::fmt::Display;
use std::pin::pin;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

use crate::error::{Error, Result};
use crate::event::{Event, ProducerId};

/// What travels over a producer's channel.
#[derive(Debug)]
pub(crate) enum Emission<T> {
    Event(Event<T>),
    Failed(String),
}

/// Outcome of a non-blocking read from one producer.
#[derive(Debug)]
pub(crate) enum TryNext<T> {
    Emission(Emission<T>),
    Empty,
    Closed,
}

/// Create a producer and the emitter that feeds it.
///
/// `capacity` is the number of events buffered before [`Emitter::emit`]
/// waits for the session to catch up; zero is treated as one.
pub fn channel<T>(id: impl Into<ProducerId>, capacity: usize) -> (Emitter<T>, Producer<T>) {
    let id = id.into();
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        Emitter {
            id: id.clone(),
            tx,
            sequence: 0,
        },
        Producer { id, rx },
    )
}

/// Receiving half of a producer, owned by a session.
#[derive(Debug)]
pub struct Producer<T> {
    id: ProducerId,
    rx: mpsc::Receiver<Emission<T>>,
}

impl<T: Send + 'static> Producer<T> {
    /// Run `body` as an independent task that emits through the given emitter.
    ///
    /// The producer is exhausted when `body` returns and drops its emitter.
    pub fn spawn<F, Fut>(id: impl Into<ProducerId>, capacity: usize, body: F) -> Self
    where
        F: FnOnce(Emitter<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (emitter, producer) = channel(id, capacity);
        tokio::spawn(body(emitter));
        producer
    }

    /// Forward a stream into a new producer.
    ///
    /// Items are emitted in stream order. The first `Err` terminates the
    /// producer with the error's text as its failure detail. Forwarding
    /// stops early once the session stops reading.
    pub fn from_stream<S, E>(id: impl Into<ProducerId>, capacity: usize, stream: S) -> Self
    where
        S: Stream<Item = std::result::Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        Self::spawn(id, capacity, move |mut emitter| async move {
            let mut stream = pin!(stream);
            loop {
                let item = tokio::select! {
                    biased;
                    () = emitter.closed() => break,
                    item = stream.next() => item,
                };
                match item {
                    Some(Ok(payload)) => {
                        if emitter.emit(payload).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        emitter.fail(e.to_string()).await;
                        break;
                    }
                    None => break,
                }
            }
        })
    }
}

impl<T> Producer<T> {
    pub fn id(&self) -> &ProducerId {
        &self.id
    }

    pub(crate) fn poll_recv(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Emission<T>>> {
        self.rx.poll_recv(cx)
    }

    pub(crate) fn try_next(&mut self) -> TryNext<T> {
        match self.rx.try_recv() {
            Ok(emission) => TryNext::Emission(emission),
            Err(TryRecvError::Empty) => TryNext::Empty,
            Err(TryRecvError::Disconnected) => TryNext::Closed,
        }
    }
}

/// Sending half of a producer.
///
/// Not `Clone`: a single emitter keeps the sequence numbers of one producer
/// in emission order.
#[derive(Debug)]
pub struct Emitter<T> {
    id: ProducerId,
    tx: mpsc::Sender<Emission<T>>,
    sequence: u64,
}

impl<T> Emitter<T> {
    pub fn id(&self) -> &ProducerId {
        &self.id
    }

    /// Emit the next event, waiting while the producer's buffer is full.
    ///
    /// Returns the event's sequence number, or [`Error::Detached`] once the
    /// session reading this producer is gone.
    pub async fn emit(&mut self, payload: T) -> Result<u64> {
        let sequence = self.sequence;
        let event = Event {
            producer: self.id.clone(),
            sequence,
            payload,
        };
        self.tx
            .send(Emission::Event(event))
            .await
            .map_err(|_| Error::Detached(self.id.clone()))?;
        self.sequence += 1;
        Ok(sequence)
    }

    /// Terminate the producer, attaching an error detail to its exhaustion.
    pub async fn fail(self, detail: impl Into<String>) {
        let detail = detail.into();
        if self.tx.send(Emission::Failed(detail)).await.is_err() {
            debug!(producer = %self.id, "Failure reported after session was dropped");
        }
    }

    /// Resolves once the session stops reading from this producer.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_stamps_increasing_sequence_numbers() {
        let (mut emitter, mut producer) = channel::<&str>("a", 4);
        assert_eq!(emitter.emit("a1").await.unwrap(), 0);
        assert_eq!(emitter.emit("a2").await.unwrap(), 1);

        for expected in 0..2 {
            match producer.try_next() {
                TryNext::Emission(Emission::Event(event)) => {
                    assert_eq!(event.sequence, expected);
                    assert_eq!(event.producer, ProducerId::from("a"));
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!(matches!(producer.try_next(), TryNext::Empty));
    }

    #[tokio::test]
    async fn dropping_emitter_closes_producer_after_buffered_events() {
        let (mut emitter, mut producer) = channel("b", 4);
        emitter.emit(1_u32).await.unwrap();
        drop(emitter);

        assert!(matches!(
            producer.try_next(),
            TryNext::Emission(Emission::Event(_))
        ));
        assert!(matches!(producer.try_next(), TryNext::Closed));
    }

    #[tokio::test]
    async fn emit_after_session_drop_is_detached() {
        let (mut emitter, producer) = channel("c", 1);
        drop(producer);

        assert!(emitter.is_closed());
        assert!(matches!(emitter.emit(()).await, Err(Error::Detached(id)) if id.as_str() == "c"));
    }

    #[tokio::test]
    async fn fail_sends_detail() {
        let (emitter, mut producer) = channel::<()>("d", 1);
        emitter.fail("disk on fire").await;

        match producer.try_next() {
            TryNext::Emission(Emission::Failed(detail)) => assert_eq!(detail, "disk on fire"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
