use crate::buffer::Buffer;
use crate::destination::Destination;
use crate::diagnostics::{Diagnostics, Event, TracingDiagnostics};
use crate::error::QueueError;
use crate::list::NodeList;
use crossbeam::atomic::AtomicCell;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

/// Default byte budget of one queue's bucket: 1 MiB.
pub const MAX_BUCKET_SIZE: usize = 1024 * 1024;

/// A diagnostics sink that can be shared between queues and threads.
pub type SharedDiagnostics = Arc<dyn Diagnostics + Send + Sync>;

/// Exact totals of a queue at one point in time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub count: usize,
    pub total_bytes: usize,
}

/// Packets waiting for their next hop's hardware address to be resolved.
///
/// One `PendingQueue` belongs to one neighbor entry. Any number of forwarding
/// threads `enqueue` into it while the address is unknown; once resolution
/// completes the consumer `dequeue`s everything in arrival order and
/// retransmits it; if resolution times out or the entry is evicted, the reaper
/// calls `drain_and_discard`. The queue is usually shared as an
/// `Arc<PendingQueue>`; every operation takes `&self`.
///
/// The chain and its count/byte totals sit behind a single mutex and are only
/// ever changed together. After each change the totals are also published to
/// lock-free mirrors, which `len`, `bytes`, `is_empty` and the fast paths of
/// the operations read. A mirror can lag by one in-flight operation.
///
/// ### Overflow is advisory
///
/// `enqueue` compares the bytes already buffered against the bucket budget
/// before it copies the payload, without taking the lock. Two consequences:
///
/// - a payload is refused only if the bucket was *already* over budget, so a
///   single payload larger than the budget is accepted into a queue that has
///   room, and the enqueue that crosses the line succeeds;
/// - concurrent producers can each pass the check and push the total past the
///   budget together. The next check stops further growth.
///
/// The budget bounds sustained growth, not the exact peak.
///
/// Dropping the queue frees whatever is still buffered, but owners are
/// expected to call `drain_and_discard` first so the discard gets reported.
pub struct PendingQueue {
    list: Mutex<NodeList>,
    count: AtomicCell<usize>,
    total_bytes: AtomicCell<usize>,
    max_bucket_size: usize,
    dest: Destination,
    diagnostics: SharedDiagnostics,
}

impl PendingQueue {
    /// Creates an empty queue with a `MAX_BUCKET_SIZE` budget, an unspecified
    /// destination and `tracing` diagnostics.
    pub fn new() -> Self {
        PendingQueue {
            list: Mutex::new(NodeList::new()),
            count: AtomicCell::new(0),
            total_bytes: AtomicCell::new(0),
            max_bucket_size: MAX_BUCKET_SIZE,
            dest: Destination::default(),
            diagnostics: Arc::new(TracingDiagnostics::new()),
        }
    }

    pub fn for_destination(dest: Destination) -> Self {
        PendingQueue::new().destination(dest)
    }

    /// Changes the bucket's byte budget, default value is `MAX_BUCKET_SIZE`.
    pub fn max_bucket_size(self, max_bucket_size: usize) -> Self {
        assert!(
            max_bucket_size > 0,
            "PendingQueue max bucket size: {} must be > 0",
            max_bucket_size
        );

        PendingQueue {
            list: self.list,
            count: self.count,
            total_bytes: self.total_bytes,
            max_bucket_size,
            dest: self.dest,
            diagnostics: self.diagnostics,
        }
    }

    /// Sets the device and address shown in diagnostics.
    pub fn destination(self, dest: Destination) -> Self {
        PendingQueue {
            list: self.list,
            count: self.count,
            total_bytes: self.total_bytes,
            max_bucket_size: self.max_bucket_size,
            dest,
            diagnostics: self.diagnostics,
        }
    }

    pub fn diagnostics(self, diagnostics: SharedDiagnostics) -> Self {
        PendingQueue {
            list: self.list,
            count: self.count,
            total_bytes: self.total_bytes,
            max_bucket_size: self.max_bucket_size,
            dest: self.dest,
            diagnostics,
        }
    }

    pub fn dest(&self) -> Destination {
        self.dest
    }

    pub fn bucket_budget(&self) -> usize {
        self.max_bucket_size
    }

    /// Buffers a copy of `payload` at the tail of the queue.
    ///
    /// Returns `Overflow` if the bucket already holds more than its budget
    /// (see the type-level docs for why this is advisory), `EmptyPayload` for
    /// a zero-length payload, `OutOfMemory` if the copy or its node cannot be
    /// allocated and `LockFailure` if the queue lock is poisoned. On any error
    /// the queue is unchanged and the caller still owns `payload`.
    ///
    /// The copy is made before the lock is taken; the critical section only
    /// links the node and updates the totals.
    pub fn enqueue(&self, payload: &[u8]) -> Result<(), QueueError> {
        if payload.is_empty() {
            return Err(QueueError::EmptyPayload);
        }

        let buffered = self.total_bytes.load();
        if buffered > self.max_bucket_size {
            self.diagnostics.record(&Event::Overflow {
                dest: self.dest,
                bytes: payload.len(),
                total_bytes: buffered,
            });
            return Err(QueueError::Overflow);
        }

        let buffer = Buffer::copy_from(payload).map_err(|err| self.fail("enqueue", err))?;

        let mut list = self.lock("enqueue")?;
        let pushed = list.push_back(buffer).map(|()| self.publish(&list));
        drop(list);

        let stats = pushed.map_err(|err| self.fail("enqueue", err))?;
        self.diagnostics.record(&Event::Enqueued {
            dest: self.dest,
            bytes: payload.len(),
            count: stats.count,
            total_bytes: stats.total_bytes,
        });
        Ok(())
    }

    /// Detaches the oldest buffered packet and hands it to the caller.
    ///
    /// Returns `Empty` when there is nothing queued. The emptiness check is
    /// done once on the lock-free mirror, to skip the lock when idle, and then
    /// again under the lock, since another consumer may have taken the last
    /// packet in between.
    pub fn dequeue(&self) -> Result<Buffer, QueueError> {
        if self.count.load() == 0 {
            return Err(QueueError::Empty);
        }

        let mut list = self.lock("dequeue")?;
        let buffer = match list.pop_front() {
            Some(buffer) => buffer,
            None => return Err(QueueError::Empty),
        };
        self.publish(&list);
        drop(list);

        self.diagnostics.record(&Event::Dequeued {
            dest: self.dest,
            bytes: buffer.len(),
        });
        Ok(buffer)
    }

    /// Dequeues until the queue reports `Empty`, returning the packets oldest
    /// first. Packets enqueued while this runs are picked up too.
    ///
    /// If a `dequeue` fails after some packets were already taken, those
    /// packets are returned and the failure is left for the next call to
    /// report. The error is only returned when nothing was taken.
    pub fn dequeue_all(&self) -> Result<Vec<Buffer>, QueueError> {
        collect_until_empty(self.len(), || self.dequeue())
    }

    /// Releases every buffered packet in one critical section.
    ///
    /// Draining an empty queue is a no-op. Returns what was discarded, so the
    /// caller can account for the drops. If the lock cannot be taken nothing
    /// is freed and `LockFailure` is returned.
    pub fn drain_and_discard(&self) -> Result<QueueStats, QueueError> {
        if self.count.load() == 0 {
            return Ok(QueueStats::default());
        }

        let mut list = self.lock("drain_and_discard")?;
        if list.is_empty() {
            return Ok(QueueStats::default());
        }
        let (count, total_bytes) = list.clear();
        self.publish(&list);
        drop(list);

        self.diagnostics.record(&Event::Drained {
            dest: self.dest,
            count,
            total_bytes,
        });
        Ok(QueueStats { count, total_bytes })
    }

    /// Exact totals, read under the lock.
    pub fn stats(&self) -> Result<QueueStats, QueueError> {
        let list = self.lock("stats")?;
        Ok(QueueStats {
            count: list.len(),
            total_bytes: list.total_bytes(),
        })
    }

    /// When the oldest buffered packet was enqueued, if there is one.
    pub fn oldest_enqueued_at(&self) -> Result<Option<SystemTime>, QueueError> {
        let list = self.lock("oldest_enqueued_at")?;
        Ok(list.front().map(|buffer| buffer.enqueued_at()))
    }

    /// Number of buffered packets. Lock-free, may lag by one operation.
    pub fn len(&self) -> usize {
        self.count.load()
    }

    /// Buffered payload bytes. Lock-free, may lag by one operation.
    pub fn bytes(&self) -> usize {
        self.total_bytes.load()
    }

    /// Lock-free, may lag by one operation.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Walks the whole chain under the lock and verifies the links and
    /// totals, including the lock-free mirrors. O(n); meant for tests and
    /// debugging.
    pub fn check_invariants(&self) -> Result<(), String> {
        let list = self
            .list
            .lock()
            .map_err(|_| "pending queue lock is poisoned".to_string())?;
        list.check()?;
        if self.count.load() != list.len() || self.total_bytes.load() != list.total_bytes() {
            return Err(format!(
                "mirrors {}:{} disagree with list {}:{}",
                self.count.load(),
                self.total_bytes.load(),
                list.len(),
                list.total_bytes()
            ));
        }
        Ok(())
    }

    fn lock(&self, op: &'static str) -> Result<MutexGuard<'_, NodeList>, QueueError> {
        match self.list.lock() {
            Ok(list) => Ok(list),
            Err(poisoned) => {
                drop(poisoned);
                Err(self.fail(op, QueueError::LockFailure))
            }
        }
    }

    /// Copies the list's totals into the mirrors. Only call with the lock held.
    fn publish(&self, list: &NodeList) -> QueueStats {
        let stats = QueueStats {
            count: list.len(),
            total_bytes: list.total_bytes(),
        };
        self.count.store(stats.count);
        self.total_bytes.store(stats.total_bytes);
        stats
    }

    fn fail(&self, op: &'static str, err: QueueError) -> QueueError {
        if err.is_primitive_failure() {
            self.diagnostics.report_error(&self.dest, op, err);
        }
        err
    }
}

/// Pulls buffers from `next` until it reports `Empty`. Buffers already pulled
/// are never dropped on a later failure.
fn collect_until_empty<F>(capacity: usize, mut next: F) -> Result<Vec<Buffer>, QueueError>
where
    F: FnMut() -> Result<Buffer, QueueError>,
{
    let mut buffers = Vec::with_capacity(capacity);
    loop {
        match next() {
            Ok(buffer) => buffers.push(buffer),
            Err(QueueError::Empty) => return Ok(buffers),
            Err(_) if !buffers.is_empty() => return Ok(buffers),
            Err(err) => return Err(err),
        }
    }
}

impl Default for PendingQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PendingQueue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PendingQueue")
            .field("dest", &self.dest)
            .field("count", &self.count.load())
            .field("total_bytes", &self.total_bytes.load())
            .field("max_bucket_size", &self.max_bucket_size)
            .finish()
    }
}
