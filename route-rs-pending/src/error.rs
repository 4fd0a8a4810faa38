use failure::Fail;

/// Everything that can go wrong while operating on a `PendingQueue`.
///
/// None of these are fatal to the process. Each one aborts only the operation
/// that returned it, and the queue is left exactly as it was before the call.
#[derive(Debug, Fail, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue's mutex could not be acquired. With `std::sync::Mutex` this
    /// happens when a thread panicked while holding it.
    #[fail(display = "pending queue lock could not be acquired")]
    LockFailure,

    /// Allocating the payload buffer or the list node failed.
    #[fail(display = "out of memory while buffering packet")]
    OutOfMemory,

    /// The bucket already holds more than its byte budget. The caller drops
    /// the packet.
    #[fail(display = "pending queue bucket overflow")]
    Overflow,

    /// Nothing is queued. This is the normal idle state, not a fault.
    #[fail(display = "pending queue is empty")]
    Empty,

    /// A zero-length payload was offered to `enqueue`.
    #[fail(display = "refusing to buffer an empty payload")]
    EmptyPayload,
}

impl QueueError {
    /// Whether this error comes from a failing system primitive (allocation
    /// or locking) and should be handed to the error reporting sink.
    pub fn is_primitive_failure(self) -> bool {
        match self {
            QueueError::LockFailure | QueueError::OutOfMemory => true,
            QueueError::Overflow | QueueError::Empty | QueueError::EmptyPayload => false,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for QueueError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        QueueError::LockFailure
    }
}

impl From<std::collections::TryReserveError> for QueueError {
    fn from(_: std::collections::TryReserveError) -> Self {
        QueueError::OutOfMemory
    }
}
