use crate::destination::Destination;
use crate::error::QueueError;
use std::fmt;

mod log;
pub use self::log::*;

mod file_log;
pub use self::file_log::*;

mod trace;
pub use self::trace::*;

/// Something that happened to a pending queue, as reported to a `Diagnostics`
/// sink. Sizes are in bytes; `count`/`total_bytes` are the queue totals right
/// after the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Enqueued {
        dest: Destination,
        bytes: usize,
        count: usize,
        total_bytes: usize,
    },
    Dequeued {
        dest: Destination,
        bytes: usize,
    },
    /// The whole queue was discarded; `count`/`total_bytes` are what it held.
    Drained {
        dest: Destination,
        count: usize,
        total_bytes: usize,
    },
    /// An enqueue of `bytes` was refused because the bucket already held
    /// `total_bytes`.
    Overflow {
        dest: Destination,
        bytes: usize,
        total_bytes: usize,
    },
}

impl Event {
    pub fn destination(&self) -> Destination {
        match *self {
            Event::Enqueued { dest, .. }
            | Event::Dequeued { dest, .. }
            | Event::Drained { dest, .. }
            | Event::Overflow { dest, .. } => dest,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Event::Enqueued {
                dest,
                bytes,
                count,
                total_bytes,
            } => write!(
                f,
                "Enqueued: {}:{}bytes(Total={}:{}bytes)",
                dest, bytes, count, total_bytes
            ),
            Event::Dequeued { dest, bytes } => write!(f, "Dequeued: {}:{}bytes", dest, bytes),
            Event::Drained {
                dest,
                count,
                total_bytes,
            } => write!(
                f,
                "Drained: {}:{}packets:{}bytes",
                dest, count, total_bytes
            ),
            Event::Overflow {
                dest,
                bytes,
                total_bytes,
            } => write!(
                f,
                "Overflow: {}:{}bytes rejected(Total={}bytes)",
                dest, bytes, total_bytes
            ),
        }
    }
}

/// Observability and error-reporting sink for pending queues.
///
/// Both methods are advisory. They are called outside the queue lock and
/// their outcome never affects the queue operation that triggered them.
pub trait Diagnostics {
    fn record(&self, event: &Event);

    /// Called when a system primitive (allocation or locking) fails. `op` is
    /// the queue operation that was running.
    fn report_error(&self, dest: &Destination, op: &'static str, error: QueueError);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Diagnostics for Silent {
    fn record(&self, _event: &Event) {}

    fn report_error(&self, _dest: &Destination, _op: &'static str, _error: QueueError) {}
}
