//! Message IDs - 64-bit, time-ordered, assigned by the message store
//!
//! Layout:
//! - Bits 63-22: milliseconds since `MessageId::EPOCH`
//! - Bits 21-12: worker ID (0-1023)
//! - Bits 11-0:  per-millisecond sequence (0-4095)

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

const WORKER_BITS: i64 = 10;
const SEQUENCE_BITS: i64 = 12;
const TIMESTAMP_SHIFT: i64 = WORKER_BITS + SEQUENCE_BITS;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;
const MAX_WORKER_ID: u16 = (1 << WORKER_BITS) - 1;

/// Identifier of a persisted chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MessageId(i64);

impl MessageId {
    /// Custom epoch: 2024-01-01 00:00:00 UTC (milliseconds)
    pub const EPOCH: i64 = 1_704_067_200_000;

    #[inline]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn into_inner(self) -> i64 {
        self.0
    }

    /// Milliseconds since the Unix epoch at which the ID was generated
    #[inline]
    pub fn timestamp_millis(&self) -> i64 {
        (self.0 >> TIMESTAMP_SHIFT) + Self::EPOCH
    }

    #[inline]
    pub fn worker_id(&self) -> u16 {
        ((self.0 >> SEQUENCE_BITS) & i64::from(MAX_WORKER_ID)) as u16
    }

    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| IdParseError::InvalidFormat(s.to_string()))
    }
}

/// Error when parsing a `MessageId` from a string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("invalid message id: {0:?}")]
    InvalidFormat(String),
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::str::FromStr for MessageId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// Serialized as a string so JavaScript clients don't lose precision
impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n)),
            Raw::Text(s) => Self::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// Lock-free generator of monotonically increasing `MessageId`s
///
/// The last issued ID is the only state. When the clock has not advanced
/// (or went backwards) the next ID is the previous one plus one, borrowing
/// the next millisecond once the sequence is exhausted.
#[derive(Debug)]
pub struct MessageIdGenerator {
    worker_id: u16,
    last: AtomicI64,
}

impl MessageIdGenerator {
    /// # Panics
    /// Panics if `worker_id` exceeds 1023.
    pub fn new(worker_id: u16) -> Self {
        assert!(
            worker_id <= MAX_WORKER_ID,
            "worker_id must be at most {MAX_WORKER_ID}"
        );
        Self {
            worker_id,
            last: AtomicI64::new(0),
        }
    }

    pub fn generate(&self) -> MessageId {
        let worker_bits = i64::from(self.worker_id) << SEQUENCE_BITS;

        loop {
            let last = self.last.load(Ordering::Acquire);
            let elapsed = (chrono::Utc::now().timestamp_millis() - MessageId::EPOCH).max(0);
            let fresh = (elapsed << TIMESTAMP_SHIFT) | worker_bits;

            let next = if fresh > last {
                fresh
            } else if last & SEQUENCE_MASK == SEQUENCE_MASK {
                (((last >> TIMESTAMP_SHIFT) + 1) << TIMESTAMP_SHIFT) | worker_bits
            } else {
                last + 1
            };

            if self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return MessageId(next);
            }
        }
    }

    pub fn worker_id(&self) -> u16 {
        self.worker_id
    }
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}
