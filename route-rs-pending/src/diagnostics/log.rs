use crate::destination::Destination;
use crate::diagnostics::{Diagnostics, Event};
use crate::error::QueueError;
use std::io::{BufWriter, Write};
use std::sync::Mutex;

/// Sink that writes one line per event, delimited with newlines.
///
/// Several queues may share one `Log`, so the writer sits behind a mutex of
/// its own. That mutex is never taken while a queue lock is held. Write
/// errors are swallowed; diagnostics never fail a queue operation.
pub struct Log<W: Write> {
    log_writer: Mutex<BufWriter<W>>,
}

impl<W: Write> Log<W> {
    pub fn new(writer: W) -> Log<W> {
        Log {
            log_writer: Mutex::new(BufWriter::new(writer)),
        }
    }

    fn write_line(&self, line: std::fmt::Arguments) {
        if let Ok(mut writer) = self.log_writer.lock() {
            let _ = writer.write_fmt(line);
            let _ = writer.write_all(b"\n");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut writer) = self.log_writer.lock() {
            let _ = writer.flush();
        }
    }
}

/// Dropping a `BufWriter` flushes it but ignores any error doing so; flush
/// here so that whatever is buffered at least gets one explicit attempt.
impl<W: Write> Drop for Log<W> {
    fn drop(&mut self) {
        self.flush();
    }
}

impl<W: Write> Diagnostics for Log<W> {
    fn record(&self, event: &Event) {
        self.write_line(format_args!("{}", event));
    }

    fn report_error(&self, dest: &Destination, op: &'static str, error: QueueError) {
        self.write_line(format_args!("{}: {}: {}", op, dest, error));
    }
}
