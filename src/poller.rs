use crate::record_writer::RecordWriter;
use crate::sensor_readings::{Field, SensorSample};
use crate::station::{FetchError, ParseError, Station};
use crate::time_encoder;
use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::sleep;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Source of local wall-clock time and of the pause between cycles.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Longest uninterrupted stretch of a pause before the shutdown flag is rechecked.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Sleep for `duration` in short slices, returning early once `shutdown` is raised.
pub fn sleep_until_shutdown(duration: Duration, shutdown: &AtomicBool) {
    let deadline = Instant::now() + duration;
    while !shutdown.load(Ordering::Relaxed) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        sleep(remaining.min(SLEEP_SLICE));
    }
}

/// Wall clock in a fixed reference timezone whose pauses end early on shutdown.
pub struct SystemClock {
    timezone: Tz,
    shutdown: Arc<AtomicBool>,
}

impl SystemClock {
    pub fn new(timezone: Tz, shutdown: Arc<AtomicBool>) -> Self {
        Self { timezone, shutdown }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.timezone).naive_local()
    }

    fn sleep(&self, duration: Duration) {
        sleep_until_shutdown(duration, &self.shutdown);
    }
}

/// Why a cycle produced no record.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Could not open socket to {address}")]
    SourceUnreachable {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Skiping invalid data from {address}")]
    InvalidData { address: String, field: Field },

    #[error("Could not append record to {}", path.display())]
    OutputUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<FetchError> for PollError {
    fn from(err: FetchError) -> Self {
        PollError::SourceUnreachable {
            address: err.address,
            source: err.source,
        }
    }
}

/// Cycle counts accumulated over one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollStats {
    pub recorded: u64,
    pub unreachable: u64,
    pub invalid: u64,
    pub output_failures: u64,
}

impl PollStats {
    fn count(&mut self, outcome: &Result<SensorSample, PollError>) {
        match outcome {
            Ok(_) => self.recorded += 1,
            Err(PollError::SourceUnreachable { .. }) => self.unreachable += 1,
            Err(PollError::InvalidData { .. }) => self.invalid += 1,
            Err(PollError::OutputUnavailable { .. }) => self.output_failures += 1,
        }
    }
}

pub struct Poller<S, C> {
    station: S,
    clock: C,
    writer: RecordWriter,
    delay: Duration,
}

impl<S: Station, C: Clock> Poller<S, C> {
    pub fn new(station: S, clock: C, writer: RecordWriter, delay: Duration) -> Self {
        Self {
            station,
            clock,
            writer,
            delay,
        }
    }

    /// Fetch, parse, stamp and write a single sample.
    pub fn cycle(&mut self) -> Result<SensorSample, PollError> {
        let raw = self.station.fetch()?;
        let readings = self
            .station
            .parse(&raw)
            .map_err(|ParseError::MissingField { field }| PollError::InvalidData {
                address: self.station.address().to_string(),
                field,
            })?;

        let sample = SensorSample {
            timestamp: time_encoder::encode(self.clock.now()),
            readings,
        };
        self.writer
            .append(&sample)
            .map_err(|source| PollError::OutputUnavailable {
                path: self.writer.path().to_path_buf(),
                source,
            })?;
        Ok(sample)
    }

    /// Poll until `shutdown` is raised, sleeping the configured delay after every cycle.
    pub fn run(&mut self, shutdown: &AtomicBool) -> PollStats {
        let mut stats = PollStats::default();
        info!(
            address = self.station.address(),
            output = %self.writer.path().display(),
            delay = ?self.delay,
            "starting poll loop"
        );

        while !shutdown.load(Ordering::Relaxed) {
            let outcome = self.cycle();
            match &outcome {
                Ok(sample) => debug!(%sample, "recorded sample"),
                Err(err @ PollError::SourceUnreachable { source, .. }) => {
                    warn!(error = %source, "{err}")
                }
                Err(err @ PollError::InvalidData { field, .. }) => warn!(%field, "{err}"),
                Err(err @ PollError::OutputUnavailable { source, .. }) => {
                    error!(error = %source, "{err}")
                }
            }
            stats.count(&outcome);
            self.clock.sleep(self.delay);
        }

        info!(?stats, "stopping poll loop");
        stats
    }
}
