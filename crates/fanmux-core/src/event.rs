//! Producer identifiers and the events they emit.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque producer label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProducerId(String);

impl ProducerId {
    pub fn new(label: impl AsRef<str>) -> Self {
        Self(label.as_ref().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProducerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProducerId {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for ProducerId {
    fn from(label: String) -> Self {
        Self(label)
    }
}

impl From<usize> for ProducerId {
    fn from(index: usize) -> Self {
        Self::new(index.to_string())
    }
}

impl From<u64> for ProducerId {
    fn from(index: u64) -> Self {
        Self::new(index.to_string())
    }
}

/// A payload delivered by a producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event<T> {
    /// Producer that emitted this event.
    pub producer: ProducerId,
    /// Position in the producer's own emission order, starting at 0.
    pub sequence: u64,
    /// Opaque payload.
    pub payload: T,
}
