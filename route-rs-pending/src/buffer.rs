use crate::error::QueueError;
use std::ops::Deref;
use std::time::{Duration, SystemTime};

/// A packet payload owned by the pending queue, and later by whoever
/// dequeued it.
///
/// The bytes are a private copy of what the producer handed in, so the
/// producer keeps its own slice. Nothing can mutate them once buffered; the
/// only way to get a mutable payload back is to consume the buffer with
/// `into_vec`.
#[derive(Debug, PartialEq, Eq)]
pub struct Buffer {
    data: Box<[u8]>,
    enqueued_at: SystemTime,
}

impl Buffer {
    /// Copies `payload` into a fresh allocation and stamps it with the current
    /// wall-clock time. Allocation failure is reported instead of aborting.
    pub(crate) fn copy_from(payload: &[u8]) -> Result<Self, QueueError> {
        let mut data = Vec::new();
        data.try_reserve_exact(payload.len())?;
        data.extend_from_slice(payload);

        Ok(Buffer {
            data: data.into_boxed_slice(),
            enqueued_at: SystemTime::now(),
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Wall-clock time the payload was buffered. Informational only.
    pub fn enqueued_at(&self) -> SystemTime {
        self.enqueued_at
    }

    /// How long the payload has been (or was) waiting. A clock that stepped
    /// backwards yields zero.
    pub fn age(&self) -> Duration {
        self.enqueued_at.elapsed().unwrap_or_default()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data.into_vec()
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}
