//! A stdin/stdout pair wired to a program under test
//!
//! The program runs on its own thread and sees the pair as plain
//! `Read`/`Write` handles. The test drives it from the other side.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::error::MockIoError;
use crate::handshake::{self, Readable};
use crate::sink::{self, Writable};

/// Test-side handle on a simulated terminal.
#[derive(Debug, Clone, Default)]
pub struct Console {
    stdin: Arc<Readable>,
    stdout: Arc<Writable>,
}

/// A program thread started by [`Console::spawn`].
pub struct Program<T> {
    handle: JoinHandle<T>,
}

impl<T> Program<T> {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the program to return.
    pub fn join(self) -> Result<T, MockIoError> {
        self.handle.join().map_err(|_| MockIoError::Disconnected {
            what: "console program".into(),
        })
    }
}

impl Console {
    pub fn new() -> Self {
        Self {
            stdin: Arc::new(handshake::stdin()),
            stdout: Arc::new(sink::stdout()),
        }
    }

    /// Runs `program` on a new thread with this console as its stdin/stdout.
    pub fn spawn<F, T>(&self, program: F) -> Result<Program<T>, MockIoError>
    where
        F: FnOnce(&Readable, &Writable) -> T + Send + 'static,
        T: Send + 'static,
    {
        let stdin = Arc::clone(&self.stdin);
        let stdout = Arc::clone(&self.stdout);
        let handle = thread::Builder::new()
            .name("mockio-console".into())
            .spawn(move || program(&stdin, &stdout))?;
        debug!("console program started");
        Ok(Program { handle })
    }

    /// Writes to the program's stdin.
    pub fn send(&self, text: &str) -> usize {
        self.stdin.write_str(text)
    }

    pub fn send_line(&self, text: &str) -> usize {
        self.send(text) + self.send("\n")
    }

    /// Reads the next line the program printed.
    pub fn expect_line(&self, timeout: Duration) -> Result<String, MockIoError> {
        self.stdout.read_line(timeout)
    }

    /// Takes everything the program printed so far.
    pub fn drain(&self) -> String {
        self.stdout.read_now()
    }

    pub fn stdin(&self) -> &Arc<Readable> {
        &self.stdin
    }

    pub fn stdout(&self) -> &Arc<Writable> {
        &self.stdout
    }
}
