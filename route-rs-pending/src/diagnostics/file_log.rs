use crate::destination::Destination;
use crate::diagnostics::{Diagnostics, Event, Log};
use crate::error::QueueError;
use std::fs::File;

/// Wraps the Log sink with a simpler File-specific interface.
/// You must provide a unique log filename; an existing file is truncated.
pub struct FileLog {
    log_sink: Log<File>,
}

impl FileLog {
    pub fn new(name: &str) -> std::io::Result<FileLog> {
        Ok(FileLog {
            log_sink: Log::new(File::create(name)?),
        })
    }

    pub fn flush(&self) {
        self.log_sink.flush();
    }
}

impl Diagnostics for FileLog {
    fn record(&self, event: &Event) {
        self.log_sink.record(event)
    }

    fn report_error(&self, dest: &Destination, op: &'static str, error: QueueError) {
        self.log_sink.report_error(dest, op, error)
    }
}
