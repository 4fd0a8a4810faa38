use crate::destination::Destination;
use crate::diagnostics::{Diagnostics, Event};
use crate::error::QueueError;
use tracing::{debug, error, warn};

/// Sink that emits `tracing` events. Queue traffic goes out at debug level,
/// overflows at warn, primitive failures at error. This is what a queue uses
/// unless told otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl TracingDiagnostics {
    pub fn new() -> Self {
        TracingDiagnostics
    }
}

impl Diagnostics for TracingDiagnostics {
    fn record(&self, event: &Event) {
        match *event {
            Event::Enqueued {
                dest,
                bytes,
                count,
                total_bytes,
            } => debug!(
                device = dest.device,
                dest = %dest.addr,
                bytes,
                count,
                total = total_bytes,
                "packet buffered"
            ),
            Event::Dequeued { dest, bytes } => debug!(
                device = dest.device,
                dest = %dest.addr,
                bytes,
                "packet released"
            ),
            Event::Drained {
                dest,
                count,
                total_bytes,
            } => debug!(
                device = dest.device,
                dest = %dest.addr,
                count,
                total = total_bytes,
                "queue discarded"
            ),
            Event::Overflow {
                dest,
                bytes,
                total_bytes,
            } => warn!(
                device = dest.device,
                dest = %dest.addr,
                bytes,
                total = total_bytes,
                "bucket overflow"
            ),
        }
    }

    fn report_error(&self, dest: &Destination, op: &'static str, err: QueueError) {
        error!(
            device = dest.device,
            dest = %dest.addr,
            op,
            error = %err,
            "pending queue primitive failed"
        );
    }
}
