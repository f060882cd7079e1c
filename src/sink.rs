//! Sink stream: an infinite stdout replacement
//!
//! Writes are buffered indefinitely and never block. A test inspects what
//! was produced with [`Writable::read_now`] (drain everything) or
//! [`Writable::read_until`] (drain through a delimiter, waiting up to a
//! timeout for it to show up).

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::MockIoError;
use crate::signal::Rendezvous;

/// Output stream that records everything written to it.
#[derive(Debug, Default)]
pub struct Writable {
    /// All non-consumed output, in lock acquisition order.
    buffer: Mutex<Vec<u8>>,
    /// Fired after every write.
    changed: Rendezvous,
    total_written: AtomicU64,
}

/// A [`Writable`] to stand in for a program's stdout.
pub fn stdout() -> Writable {
    Writable::new()
}

impl Writable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and wakes a reader waiting in [`Writable::read_until`].
    ///
    /// Never blocks on a reader and never fails.
    pub fn write_bytes(&self, bytes: &[u8]) -> usize {
        self.buffer.lock().extend_from_slice(bytes);
        self.total_written
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        trace!(bytes = bytes.len(), "sink write");
        self.changed.try_notify();
        bytes.len()
    }

    pub fn write_str(&self, text: &str) -> usize {
        self.write_bytes(text.as_bytes())
    }

    /// Clears the buffer and returns its previous contents.
    pub fn read_now_bytes(&self) -> Vec<u8> {
        std::mem::take(&mut *self.buffer.lock())
    }

    /// Clears the buffer and returns its previous contents as text.
    ///
    /// Invalid UTF-8 is replaced with U+FFFD.
    pub fn read_now(&self) -> String {
        String::from_utf8_lossy(&self.read_now_bytes()).into_owned()
    }

    /// Reads through the first `delimiter`, or until `timeout` expires.
    ///
    /// The delimiter is included in the returned text and anything after it
    /// stays buffered. On timeout the error carries every byte consumed
    /// while waiting; none of it remains in the stream. A timeout too large
    /// to express as a deadline waits without limit.
    pub fn read_until(&self, delimiter: u8, timeout: Duration) -> Result<String, MockIoError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut out = Vec::new();

        loop {
            // Scan the bulk of the buffer without holding the signal lock,
            // so writers notifying meanwhile are not held up by it.
            if self.take_through(delimiter, &mut out) {
                return Ok(into_text(out));
            }

            // Registered before the tail scan, so a write after it cannot
            // slip its wake-up past us.
            let listener = self.changed.listen();
            if self.take_through(delimiter, &mut out) {
                return Ok(into_text(out));
            }
            match deadline {
                Some(deadline) => {
                    if !listener.wait_until(deadline) {
                        break;
                    }
                }
                None => listener.wait(),
            }
        }

        // Bytes that landed as the deadline fired still count.
        if self.take_through(delimiter, &mut out) {
            return Ok(into_text(out));
        }
        debug!(
            delimiter = %char::from(delimiter).escape_default(),
            partial = out.len(),
            waited_ms = timeout.as_millis() as u64,
            "sink read_until timed out"
        );
        Err(MockIoError::DelimiterTimeout {
            delimiter: char::from(delimiter),
            timeout,
            partial: into_text(out),
        })
    }

    /// Reads one line, newline included.
    pub fn read_line(&self, timeout: Duration) -> Result<String, MockIoError> {
        self.read_until(b'\n', timeout)
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes ever written (statistics).
    pub fn total_written_bytes(&self) -> u64 {
        self.total_written.load(Ordering::Relaxed)
    }

    /// Moves buffered bytes into `out` through the first `delimiter`, or all
    /// of them if it is absent. Returns whether the delimiter was found.
    fn take_through(&self, delimiter: u8, out: &mut Vec<u8>) -> bool {
        let mut buffer = self.buffer.lock();
        match buffer.iter().position(|&b| b == delimiter) {
            Some(pos) => {
                out.extend(buffer.drain(..=pos));
                true
            }
            None => {
                out.append(&mut buffer);
                false
            }
        }
    }
}

fn into_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

impl io::Write for &Writable {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_bytes(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for Writable {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_bytes(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
