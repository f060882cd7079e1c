//! Handshake stream: an infinite stdin replacement
//!
//! Reads block until something is written. A write that finds a reader
//! already parked hands its data over and waits until that reader has
//! consumed it, so a test can sequence producer/consumer interleavings.
//! A write that finds nobody parked returns immediately.
//!
//! Per pending write: `idle -> awaiting-consumption -> idle`. Only a write
//! that woke a parked reader enters `awaiting-consumption`.
//!
//! Both check-then-park gaps are closed. The reader inspects the buffer while
//! holding its `available` listener, and the writer registers on `consumed`
//! before notifying `available`. A write landing in either gap therefore
//! always finds its counterpart parked.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::signal::Rendezvous;

/// Input stream whose reads block until data is written.
#[derive(Debug, Default)]
pub struct Readable {
    /// All non-consumed input.
    buffer: Mutex<Vec<u8>>,
    /// Fired by a write to wake a parked reader.
    available: Rendezvous,
    /// Fired by a read to release a writer waiting on its handoff.
    consumed: Rendezvous,
    total_written: AtomicU64,
    total_read: AtomicU64,
    handoffs: AtomicU64,
}

/// A [`Readable`] to stand in for a program's stdin.
pub fn stdin() -> Readable {
    Readable::new()
}

impl Readable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes`. Blocks until consumed only if a reader was parked.
    pub fn write_bytes(&self, bytes: &[u8]) -> usize {
        self.buffer.lock().extend_from_slice(bytes);
        self.total_written
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        trace!(bytes = bytes.len(), "handshake write");
        self.signal_write();
        bytes.len()
    }

    pub fn write_str(&self, text: &str) -> usize {
        self.write_bytes(text.as_bytes())
    }

    /// Moves up to `out.len()` buffered bytes into `out`.
    ///
    /// Parks with no timeout while the buffer is empty. Never reports end of
    /// stream: a read woken by an empty write returns 0.
    pub fn read_into(&self, out: &mut [u8]) -> usize {
        {
            let listener = self.available.listen();
            if self.buffer.lock().is_empty() {
                trace!("handshake read parked");
                listener.wait();
            }
        }

        let n = {
            let mut buffer = self.buffer.lock();
            let n = out.len().min(buffer.len());
            out[..n].copy_from_slice(&buffer[..n]);
            buffer.drain(..n);
            n
        };
        self.total_read.fetch_add(n as u64, Ordering::Relaxed);
        trace!(bytes = n, "handshake read");

        self.consumed.try_notify();
        n
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a reader is parked waiting for data.
    pub fn has_parked_reader(&self) -> bool {
        self.available.parked() > 0
    }

    /// Total bytes ever written (statistics).
    pub fn total_written_bytes(&self) -> u64 {
        self.total_written.load(Ordering::Relaxed)
    }

    /// Total bytes ever read (statistics).
    pub fn total_read_bytes(&self) -> u64 {
        self.total_read.load(Ordering::Relaxed)
    }

    /// Writes that woke a parked reader and waited for it (statistics).
    pub fn handoffs(&self) -> u64 {
        self.handoffs.load(Ordering::Relaxed)
    }

    fn signal_write(&self) {
        let consumed = self.consumed.listen();
        if self.available.try_notify() {
            self.handoffs.fetch_add(1, Ordering::Relaxed);
            debug!("handshake write handed off, awaiting consumption");
            consumed.wait();
        }
    }
}

impl io::Read for &Readable {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf))
    }
}

impl io::Read for Readable {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf))
    }
}

impl io::Write for &Readable {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_bytes(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for Readable {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_bytes(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn await_parked_reader(input: &Readable) {
        let start = Instant::now();
        while !input.has_parked_reader() {
            assert!(start.elapsed() < Duration::from_secs(5), "reader never parked");
            thread::yield_now();
        }
    }

    #[test]
    fn test_write_without_reader_returns_immediately() {
        let input = stdin();
        let big = vec![b'x'; 1 << 20];
        assert_eq!(input.write_bytes(&big), big.len());
        assert_eq!(input.len(), big.len());
        assert_eq!(input.handoffs(), 0);
    }

    #[test]
    fn test_partial_and_concatenated_reads() {
        let mut input = stdin();
        input.write_str("1234");
        input.write_str("5678");

        let mut buf = [0u8; 8];
        assert_eq!(input.read(&mut buf).unwrap(), 8);
        assert_eq!(&buf, b"12345678");

        input.write_str("test");
        let mut buf = [0u8; 2];
        assert_eq!(input.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"te");
        assert_eq!(input.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"st");
        assert!(input.is_empty());
    }

    #[test]
    fn test_short_buffer_reads_what_is_there() {
        let input = stdin();
        input.write_str("abcd");

        let mut buf = [0u8; 10];
        assert_eq!(input.read_into(&mut buf), 4);
        assert_eq!(&buf[..4], b"abcd");
    }

    #[test]
    fn test_write_to_parked_reader_waits_for_consumption() {
        let input = Arc::new(stdin());

        let reader = {
            let input = Arc::clone(&input);
            thread::spawn(move || {
                let mut buf = [0u8; 3];
                let n = input.read_into(&mut buf);
                buf[..n].to_vec()
            })
        };

        await_parked_reader(&input);
        input.write_str("xyz");

        // The reader has consumed by the time the write returns.
        assert_eq!(input.total_read_bytes(), 3);
        assert_eq!(input.handoffs(), 1);
        assert_eq!(reader.join().unwrap(), b"xyz");
    }

    #[test]
    fn test_empty_write_wakes_reader_with_zero_bytes() {
        let input = Arc::new(stdin());

        let reader = {
            let input = Arc::clone(&input);
            thread::spawn(move || {
                let mut buf = [0u8; 1];
                (&*input).read(&mut buf).unwrap()
            })
        };

        await_parked_reader(&input);
        input.write_str("");
        assert_eq!(reader.join().unwrap(), 0);
    }

    #[test]
    fn test_stats_track_bytes() {
        let input = stdin();
        input.write_str("hello");
        let mut buf = [0u8; 3];
        input.read_into(&mut buf);

        assert_eq!(input.total_written_bytes(), 5);
        assert_eq!(input.total_read_bytes(), 3);
        assert_eq!(input.len(), 2);
    }
}
