//! mockio - infinite in-memory stdin/stdout streams for testing
//!
//! - [`Writable`]: sink stream standing in for stdout. Writes never block;
//!   tests drain it or read up to a delimiter with a timeout.
//! - [`Readable`]: handshake stream standing in for stdin. Reads block until
//!   data is written, and a write that wakes a parked reader waits until
//!   that reader has consumed it.

pub mod console;
pub mod driver;
pub mod error;
pub mod handshake;
pub mod probe;
pub mod signal;
pub mod sink;

pub use console::{Console, Program};
pub use driver::ReadDriver;
pub use error::{FixSuggestion, MockIoError};
pub use handshake::{stdin, Readable};
pub use probe::{run_probe, run_race, ProbeConfig, ProbeReport, RaceConfig, RaceReport};
pub use signal::{Listener, Rendezvous};
pub use sink::{stdout, Writable};
