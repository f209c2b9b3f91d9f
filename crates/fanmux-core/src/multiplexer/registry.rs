//! Active-producer registry.
//!
//! Holds the producers still in the race. Scans rotate: after a delivery
//! from slot `i` the next scan starts at `i + 1`, so a persistently ready
//! producer can never starve another one.

use std::task::{Context, Poll};

use crate::event::ProducerId;
use crate::producer::{Emission, Producer, TryNext};

use super::types::MultiplexResult;

#[derive(Debug)]
pub(super) struct Registry<T> {
    producers: Vec<Producer<T>>,
    cursor: usize,
}

impl<T> Registry<T> {
    pub(super) const fn new() -> Self {
        Self {
            producers: Vec::new(),
            cursor: 0,
        }
    }

    pub(super) fn contains(&self, id: &ProducerId) -> bool {
        self.producers.iter().any(|p| p.id() == id)
    }

    pub(super) fn insert(&mut self, producer: Producer<T>) {
        self.producers.push(producer);
    }

    pub(super) fn len(&self) -> usize {
        self.producers.len()
    }

    pub(super) fn ids(&self) -> impl Iterator<Item = &ProducerId> {
        self.producers.iter().map(Producer::id)
    }

    /// Scan every producer once, registering wakers on all that are pending.
    pub(super) fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<MultiplexResult<T>> {
        let len = self.producers.len();
        if len == 0 {
            return Poll::Ready(MultiplexResult::AllExhausted);
        }
        for offset in 0..len {
            let slot = (self.cursor + offset) % len;
            match self.producers[slot].poll_recv(cx) {
                Poll::Ready(Some(emission)) => return Poll::Ready(self.accept(slot, emission)),
                Poll::Ready(None) => return Poll::Ready(self.retire(slot, None)),
                Poll::Pending => {}
            }
        }
        Poll::Pending
    }

    /// Same scan as [`poll_next`](Self::poll_next) without touching wakers or
    /// the runtime's cooperative budget. `None` when nothing is ready.
    pub(super) fn try_next(&mut self) -> Option<MultiplexResult<T>> {
        let len = self.producers.len();
        if len == 0 {
            return Some(MultiplexResult::AllExhausted);
        }
        for offset in 0..len {
            let slot = (self.cursor + offset) % len;
            match self.producers[slot].try_next() {
                TryNext::Emission(emission) => return Some(self.accept(slot, emission)),
                TryNext::Closed => return Some(self.retire(slot, None)),
                TryNext::Empty => {}
            }
        }
        None
    }

    fn accept(&mut self, slot: usize, emission: Emission<T>) -> MultiplexResult<T> {
        match emission {
            Emission::Event(event) => {
                self.cursor = (slot + 1) % self.producers.len();
                MultiplexResult::Delivered(event)
            }
            Emission::Failed(detail) => self.retire(slot, Some(detail)),
        }
    }

    /// Remove a producer permanently. Order of the rest is kept so the
    /// rotation stays fair.
    fn retire(&mut self, slot: usize, error: Option<String>) -> MultiplexResult<T> {
        let producer = self.producers.remove(slot);
        self.cursor = if self.producers.is_empty() {
            0
        } else {
            slot % self.producers.len()
        };
        MultiplexResult::ProducerExhausted {
            id: producer.id().clone(),
            error,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::producer::channel;

    #[tokio::test]
    async fn empty_registry_is_all_exhausted() {
        let mut registry = Registry::<()>::new();
        assert_eq!(registry.try_next(), Some(MultiplexResult::AllExhausted));
    }

    #[tokio::test]
    async fn rotation_alternates_between_ready_producers() {
        let mut registry = Registry::new();
        let mut emitters = Vec::new();
        for id in ["a", "b", "c"] {
            let (mut emitter, producer) = channel(id, 8);
            for n in 0..3 {
                emitter.emit(n).await.unwrap();
            }
            emitters.push(emitter);
            registry.insert(producer);
        }

        let order: Vec<String> = (0..6)
            .map(|_| match registry.try_next() {
                Some(MultiplexResult::Delivered(event)) => event.producer.to_string(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(order, ["a", "b", "c", "a", "b", "c"]);
    }

    #[tokio::test]
    async fn retiring_keeps_rotation_on_the_next_producer() {
        let mut registry = Registry::new();
        let (mut a, pa) = channel("a", 4);
        let (b, pb) = channel::<u32>("b", 4);
        let (mut c, pc) = channel("c", 4);
        registry.insert(pa);
        registry.insert(pb);
        registry.insert(pc);
        a.emit(1).await.unwrap();
        a.emit(2).await.unwrap();
        c.emit(1).await.unwrap();
        drop(b);

        let first = registry.try_next().unwrap();
        assert!(matches!(first, MultiplexResult::Delivered(ref e) if e.producer.as_str() == "a"));
        let second = registry.try_next().unwrap();
        assert!(matches!(
            second,
            MultiplexResult::ProducerExhausted { ref id, error: None } if id.as_str() == "b"
        ));
        let third = registry.try_next().unwrap();
        assert!(matches!(third, MultiplexResult::Delivered(ref e) if e.producer.as_str() == "c"));
        assert_eq!(registry.len(), 2);
        assert!(!registry.contains(&ProducerId::from("b")));
    }
}
