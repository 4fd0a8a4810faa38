extern crate crossbeam;
extern crate failure;

/// The pending queue itself. A router that has to forward a packet to a next hop whose hardware address is
/// not known yet cannot put it on the wire, so it parks the packet in that neighbor entry's `PendingQueue`
/// and kicks off resolution. When resolution completes, the queued packets are dequeued in arrival order and
/// retransmitted; when it times out or the entry is evicted, the whole queue is discarded. Any number of
/// forwarding threads may enqueue concurrently, and the queue's byte budget keeps a dead neighbor from
/// swallowing unbounded memory.
pub mod queue;

/// Buffers are the owned payloads stored in a queue. A producer hands in a byte slice which gets copied, and
/// the consumer gets the buffer back by value on dequeue; nothing is ever shared between the two.
pub mod buffer;

/// Errors shared by every queue operation.
pub mod error;

/// The device/address pair a queue belongs to, shown in diagnostics.
pub mod destination;

/// Diagnostics are where queues report what they do: one event per enqueue, dequeue, drain and overflow, plus
/// any failing system primitive. The sink is a trait so routers can plug in their own; `tracing`, a line log
/// over any `Write`, and a file log are provided.
pub mod diagnostics;

mod list;

/// Utility module
mod utils;

pub use buffer::Buffer;
pub use destination::Destination;
pub use error::QueueError;
pub use queue::{PendingQueue, QueueStats, SharedDiagnostics, MAX_BUCKET_SIZE};
