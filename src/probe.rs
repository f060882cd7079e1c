//! Stress and race checks for both streams
//!
//! Two checks, both driven by the CLI:
//! - `probe`: concurrent sink writers must arrive lossless and in per-writer
//!   order, and a handshake echo round trip must return every line.
//! - `race`: single-byte writes against a looping reader must never leave
//!   the reader parked on data that is already buffered.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::console::Console;
use crate::driver::ReadDriver;
use crate::error::MockIoError;
use crate::handshake;
use crate::sink;

/// Settings for [`run_probe`].
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Concurrent sink writers
    pub writers: usize,
    /// Records per writer, and lines in the echo round trip
    pub rounds: usize,
    /// Timeout for each delimiter-bounded read
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            writers: 4,
            rounds: 100,
            timeout: Duration::from_secs(2),
        }
    }
}

impl ProbeConfig {
    /// Small and quick
    pub fn testing() -> Self {
        Self {
            writers: 2,
            rounds: 10,
            timeout: Duration::from_secs(2),
        }
    }

    /// Many writers, long runs
    pub fn thorough() -> Self {
        Self {
            writers: 16,
            rounds: 2_000,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Outcome of a successful [`run_probe`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub records: usize,
    pub sink_bytes: u64,
    pub echoed_lines: usize,
    pub handoffs: u64,
    pub elapsed: Duration,
}

/// Settings for [`run_race`].
#[derive(Debug, Clone)]
pub struct RaceConfig {
    pub iterations: usize,
    /// How long a read may stay parked after its byte was written
    pub stall: Duration,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            iterations: 500,
            stall: Duration::from_millis(500),
        }
    }
}

impl RaceConfig {
    pub fn testing() -> Self {
        Self {
            iterations: 100,
            stall: Duration::from_millis(500),
        }
    }

    pub fn thorough() -> Self {
        Self {
            iterations: 20_000,
            stall: Duration::from_secs(1),
        }
    }
}

/// Outcome of a successful [`run_race`].
#[derive(Debug, Clone, PartialEq)]
pub struct RaceReport {
    pub iterations: usize,
    pub handoffs: u64,
    pub elapsed: Duration,
}

/// Runs the sink and handshake checks.
pub fn run_probe(config: &ProbeConfig) -> Result<ProbeReport, MockIoError> {
    let start = Instant::now();
    let (records, sink_bytes) = probe_sink(config)?;
    let (echoed_lines, handoffs) = probe_echo(config)?;
    let report = ProbeReport {
        records,
        sink_bytes,
        echoed_lines,
        handoffs,
        elapsed: start.elapsed(),
    };
    info!(?report, "probe passed");
    Ok(report)
}

/// Each writer emits `w{id}:{seq};` records; every record must arrive once,
/// with each writer's sequence numbers in order.
fn probe_sink(config: &ProbeConfig) -> Result<(usize, u64), MockIoError> {
    let out = Arc::new(sink::stdout());

    let writers: Vec<_> = (0..config.writers)
        .map(|id| {
            let out = Arc::clone(&out);
            let rounds = config.rounds;
            thread::spawn(move || {
                for seq in 0..rounds {
                    out.write_str(&format!("w{id}:{seq};"));
                }
            })
        })
        .collect();

    let expected = config.writers * config.rounds;
    let mut next_seq: HashMap<usize, usize> = HashMap::new();
    for _ in 0..expected {
        let record = out.read_until(b';', config.timeout)?;
        let (id, seq) = parse_record(&record)?;
        let want = next_seq.entry(id).or_insert(0);
        if seq != *want {
            return Err(MockIoError::Mismatch {
                expected: format!("w{id}:{want};"),
                actual: record,
            });
        }
        *want += 1;
    }

    for writer in writers {
        writer.join().map_err(|_| MockIoError::Disconnected {
            what: "sink writer".into(),
        })?;
    }

    let leftover = out.read_now();
    if !leftover.is_empty() {
        return Err(MockIoError::Mismatch {
            expected: String::new(),
            actual: leftover,
        });
    }
    debug!(records = expected, "sink probe passed");
    Ok((expected, out.total_written_bytes()))
}

fn parse_record(record: &str) -> Result<(usize, usize), MockIoError> {
    let mismatch = || MockIoError::Mismatch {
        expected: "w<id>:<seq>;".into(),
        actual: record.to_string(),
    };
    let body = record
        .strip_prefix('w')
        .and_then(|r| r.strip_suffix(';'))
        .ok_or_else(mismatch)?;
    let (id, seq) = body.split_once(':').ok_or_else(mismatch)?;
    let id = id.parse().map_err(|_| mismatch())?;
    let seq = seq.parse().map_err(|_| mismatch())?;
    Ok((id, seq))
}

/// Sends lines through a console program that echoes them back.
fn probe_echo(config: &ProbeConfig) -> Result<(usize, u64), MockIoError> {
    let console = Console::new();
    let program = console.spawn(|stdin, stdout| {
        let mut pending = Vec::new();
        let mut buf = [0u8; 64];
        loop {
            let n = stdin.read_into(&mut buf);
            pending.extend_from_slice(&buf[..n]);
            while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                if line == b"exit\n" {
                    return;
                }
                stdout.write_bytes(b"> ");
                stdout.write_bytes(&line);
            }
        }
    })?;

    for round in 0..config.rounds {
        let line = format!("line {round}");
        console.send_line(&line);
        let echoed = console.expect_line(config.timeout)?;
        let expected = format!("> {line}\n");
        if echoed != expected {
            return Err(MockIoError::Mismatch {
                expected,
                actual: echoed,
            });
        }
    }
    console.send_line("exit");
    program.join()?;

    debug!(lines = config.rounds, "echo probe passed");
    Ok((config.rounds, console.stdin().handoffs()))
}

/// Writes single bytes against a looping reader and fails on the first read
/// that stays parked with its byte already buffered.
pub fn run_race(config: &RaceConfig) -> Result<RaceReport, MockIoError> {
    let start = Instant::now();
    let input = Arc::new(handshake::stdin());
    let driver = ReadDriver::for_stdin(Arc::clone(&input))?;

    for i in 0..config.iterations {
        driver.request(1)?;
        // Vary where the write lands relative to the reader's check-then-park.
        if i % 3 == 1 {
            thread::yield_now();
        }
        input.write_bytes(&[b'a' + (i % 26) as u8]);

        let got = match driver.result_within(config.stall) {
            Some(result) => result?,
            None => {
                debug!(iteration = i, "race: read stalled");
                return Err(MockIoError::ReadStalled {
                    waited: config.stall,
                });
            }
        };
        let want = char::from(b'a' + (i % 26) as u8).to_string();
        if got != want {
            return Err(MockIoError::Mismatch {
                expected: want,
                actual: got,
            });
        }
    }

    let report = RaceReport {
        iterations: config.iterations,
        handoffs: input.handoffs(),
        elapsed: start.elapsed(),
    };
    info!(?report, "race check passed");
    Ok(report)
}
