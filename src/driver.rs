//! Background reader for handshake tests
//!
//! A test cannot call a blocking `read` and also keep writing, so the reads
//! run on a dedicated thread. The test sends read requests (a buffer size)
//! and collects results with a bounded wait, which turns "the read is still
//! parked" into an observable `None`.

use std::io::{self, Read};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::trace;

use crate::error::MockIoError;
use crate::handshake::Readable;

/// Owns a thread that performs `read(n)` against a source on request.
pub struct ReadDriver {
    requests: mpsc::Sender<usize>,
    results: mpsc::Receiver<io::Result<String>>,
}

impl ReadDriver {
    /// Starts the reader thread.
    ///
    /// The thread exits once the driver is dropped and its current read (if
    /// any) completes.
    pub fn spawn<R>(mut source: R) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (requests, request_rx) = mpsc::channel::<usize>();
        let (result_tx, results) = mpsc::channel();

        thread::Builder::new()
            .name("mockio-read-driver".into())
            .spawn(move || {
                for size in request_rx {
                    let mut buf = vec![0u8; size];
                    let result = source.read(&mut buf).map(|n| {
                        trace!(requested = size, read = n, "driver read");
                        String::from_utf8_lossy(&buf[..n]).into_owned()
                    });
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self { requests, results })
    }

    /// Starts a reader thread on a shared handshake stream.
    pub fn for_stdin(input: Arc<Readable>) -> io::Result<Self> {
        Self::spawn(Shared(input))
    }

    /// Asks the thread to read up to `size` bytes.
    pub fn request(&self, size: usize) -> Result<(), MockIoError> {
        self.requests
            .send(size)
            .map_err(|_| MockIoError::Disconnected {
                what: "read driver".into(),
            })
    }

    /// Waits up to `timeout` for the next read result.
    ///
    /// `None` means the read is still parked.
    pub fn result_within(&self, timeout: Duration) -> Option<io::Result<String>> {
        self.results.recv_timeout(timeout).ok()
    }

    /// Waits for the next read result with no time limit.
    ///
    /// Read errors come back as [`MockIoError::Io`].
    pub fn result(&self) -> Result<String, MockIoError> {
        match self.results.recv() {
            Ok(result) => Ok(result?),
            Err(_) => Err(MockIoError::Disconnected {
                what: "read driver".into(),
            }),
        }
    }

    /// Requests a read of `size` bytes and waits up to `timeout` for it.
    pub fn read_within(&self, size: usize, timeout: Duration) -> Result<String, MockIoError> {
        self.request(size)?;
        match self.result_within(timeout) {
            Some(result) => Ok(result?),
            None => Err(MockIoError::ReadStalled { waited: timeout }),
        }
    }
}

struct Shared(Arc<Readable>);

impl Read for Shared {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.0.read_into(buf))
    }
}
