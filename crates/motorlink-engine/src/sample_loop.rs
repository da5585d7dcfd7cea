//! The sampling session: observe, sync, poll, record, repeat.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use motorlink_protocol::DeviceProfile;
use motorlink_recorder::{BufferedRecorder, DEFAULT_BATCH_SIZE};
use motorlink_transport::{ControlChannel, ControlTransport};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{LoopError, LoopResult};
use crate::poller::TelemetryPoller;
use crate::surface::ControlSurface;
use crate::sync::{ParameterSync, SyncReport};

/// Default tick-rate cap.
pub const DEFAULT_MAX_RATE_HZ: f64 = 100.0;

/// Default number of consecutive dead ticks tolerated.
pub const DEFAULT_MAX_DEAD_TICKS: u32 = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    /// Readings per flush.
    pub batch_size: usize,
    /// Upper bound on ticks per second; `None` runs flat out.
    pub max_rate_hz: Option<f64>,
    /// Consecutive dead ticks before giving up; 0 never gives up.
    pub max_dead_ticks: u32,
    /// Stop after this many ticks.
    pub max_ticks: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_rate_hz: Some(DEFAULT_MAX_RATE_HZ),
            max_dead_ticks: DEFAULT_MAX_DEAD_TICKS,
            max_ticks: None,
        }
    }
}

/// Cooperative stop request, checked between ticks.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Sleeps off whatever is left of each tick interval.
#[derive(Debug)]
pub struct RatePacer {
    interval: Option<Duration>,
    next: Option<Instant>,
}

impl RatePacer {
    /// A non-positive or non-finite rate disables pacing.
    pub fn new(max_rate_hz: Option<f64>) -> Self {
        let interval = max_rate_hz
            .filter(|hz| hz.is_finite() && *hz > 0.0)
            .and_then(|hz| Duration::try_from_secs_f64(1.0 / hz).ok());
        Self {
            interval,
            next: None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Block until the next tick is due. The first call returns at once; a
    /// tick that overran its slot does not cause later ticks to bunch up.
    pub fn wait(&mut self) {
        let Some(interval) = self.interval else {
            return;
        };
        let now = Instant::now();
        let due = self.next.unwrap_or(now);
        if due > now {
            thread::sleep(due.saturating_duration_since(now));
        }
        self.next = due.max(now).checked_add(interval);
    }
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub sync: SyncReport,
    pub reads: usize,
    pub read_failures: usize,
    pub flushed: Option<usize>,
    pub persistence_failed: bool,
    /// Every transaction of the tick failed.
    pub dead: bool,
}

/// Totals for a finished session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoopSummary {
    pub ticks: u64,
    pub readings: u64,
    pub flushes: u64,
    pub rows_written: u64,
    pub transport_failures: u64,
    pub persistence_failures: u64,
    pub elapsed_secs: f64,
}

/// Owns the device channel and drives one sampling session.
pub struct SampleLoop<T: ControlTransport, S: ControlSurface> {
    channel: ControlChannel<T>,
    surface: S,
    sync: Option<ParameterSync>,
    poller: TelemetryPoller,
    recorder: BufferedRecorder,
    config: LoopConfig,
    dead_ticks: u32,
    summary: LoopSummary,
}

impl<T: ControlTransport, S: ControlSurface> SampleLoop<T, S> {
    /// Validate the profile and cold-start its parameters.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::Profile`] if the profile is invalid.
    pub fn new(
        mut channel: ControlChannel<T>,
        profile: DeviceProfile,
        surface: S,
        recorder: BufferedRecorder,
        config: LoopConfig,
    ) -> LoopResult<Self> {
        profile.validate()?;
        let sync = match (profile.set_parameter, profile.parameters.is_empty()) {
            (Some(request), false) => Some(ParameterSync::new(
                &profile.parameters,
                request,
                &mut channel,
            )),
            _ => None,
        };
        let poller = TelemetryPoller::new(profile)?;

        Ok(Self {
            channel,
            surface,
            sync,
            poller,
            recorder,
            config,
            dead_ticks: 0,
            summary: LoopSummary::default(),
        })
    }

    /// Run one tick.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::Poll`] for an undecodable payload and
    /// [`LoopError::DeviceUnresponsive`] once the dead-tick limit is reached.
    pub fn tick(&mut self) -> LoopResult<TickReport> {
        let observed = self.surface.observe();
        let sync = match self.sync.as_mut() {
            Some(sync) => sync.tick(&mut self.channel, &observed),
            None => SyncReport::default(),
        };

        let poll = self.poller.poll(&mut self.channel)?;

        let attempted = sync.writes.saturating_add(poll.attempted);
        let failed = sync.failures().saturating_add(poll.failed);
        let dead = attempted > 0 && failed == attempted;

        self.summary.ticks = self.summary.ticks.saturating_add(1);
        self.summary.readings = self.summary.readings.saturating_add(1);
        self.summary.transport_failures = self
            .summary
            .transport_failures
            .saturating_add(u64::try_from(failed).unwrap_or(u64::MAX));

        let appended = self.recorder.append(poll.reading);
        if let Err(e) = &appended {
            self.summary.persistence_failures =
                self.summary.persistence_failures.saturating_add(1);
            error!("Dropped a reading that does not fit the log: {e}");
        }
        let (flushed, persistence_failed) = match self.recorder.flush_if_full(self.config.batch_size)
        {
            Ok(flushed) => {
                if let Some(rows) = flushed {
                    self.note_flush(rows);
                }
                (flushed, appended.is_err())
            }
            Err(e) => {
                self.summary.persistence_failures =
                    self.summary.persistence_failures.saturating_add(1);
                error!(
                    "Failed to persist {} buffered reading(s), will retry: {e}",
                    self.recorder.len()
                );
                (None, true)
            }
        };

        if dead {
            self.dead_ticks = self.dead_ticks.saturating_add(1);
            debug!("Dead tick {} in a row", self.dead_ticks);
            if self.config.max_dead_ticks > 0 && self.dead_ticks >= self.config.max_dead_ticks {
                return Err(LoopError::DeviceUnresponsive {
                    dead_ticks: self.dead_ticks,
                });
            }
        } else {
            if self.dead_ticks > 0 {
                info!("Device responding again after {} dead tick(s)", self.dead_ticks);
            }
            self.dead_ticks = 0;
        }

        Ok(TickReport {
            sync,
            reads: poll.attempted,
            read_failures: poll.failed,
            flushed,
            persistence_failed,
            dead,
        })
    }

    fn note_flush(&mut self, rows: usize) {
        self.summary.flushes = self.summary.flushes.saturating_add(1);
        self.summary.rows_written = self
            .summary
            .rows_written
            .saturating_add(u64::try_from(rows).unwrap_or(u64::MAX));
    }

    /// Tick until stopped, the tick limit is reached, or a fatal error.
    /// Whatever is still buffered is flushed once before returning.
    ///
    /// # Errors
    ///
    /// Returns the fatal [`LoopError`] that ended the session, or
    /// [`LoopError::FinalFlush`] if the last flush failed.
    pub fn run(&mut self, stop: &StopToken) -> LoopResult<LoopSummary> {
        let started = Instant::now();
        let mut pacer = RatePacer::new(self.config.max_rate_hz);
        info!(
            "Sampling '{}' ({} channel(s), batch {}, rate cap {})",
            self.poller.profile().name,
            self.poller.profile().channels.len(),
            self.config.batch_size,
            self.config
                .max_rate_hz
                .map_or_else(|| "none".to_string(), |hz| format!("{hz} Hz"))
        );

        let outcome = loop {
            if stop.is_stopped() {
                info!("Stop requested after {} tick(s)", self.summary.ticks);
                break Ok(());
            }
            if self
                .config
                .max_ticks
                .is_some_and(|max| self.summary.ticks >= max)
            {
                break Ok(());
            }
            pacer.wait();
            if let Err(e) = self.tick() {
                break Err(e);
            }
        };

        let final_flush = self.recorder.flush_all();
        self.summary.elapsed_secs = started.elapsed().as_secs_f64();

        match (outcome, final_flush) {
            (Err(fatal), flush) => {
                if let Err(e) = flush {
                    error!(
                        "Final flush failed, {} reading(s) lost: {e}",
                        self.recorder.len()
                    );
                }
                Err(fatal)
            }
            (Ok(()), Err(source)) => {
                self.summary.persistence_failures =
                    self.summary.persistence_failures.saturating_add(1);
                Err(LoopError::FinalFlush {
                    pending: self.recorder.len(),
                    source,
                })
            }
            (Ok(()), Ok(flushed)) => {
                if let Some(rows) = flushed {
                    self.note_flush(rows);
                }
                if !self.recorder.is_enabled() && !self.recorder.is_empty() {
                    warn!(
                        "Recording disabled, discarding {} reading(s)",
                        self.recorder.len()
                    );
                }
                info!(
                    "Session finished: {} tick(s), {} row(s) written",
                    self.summary.ticks, self.summary.rows_written
                );
                Ok(self.summary.clone())
            }
        }
    }

    pub fn summary(&self) -> &LoopSummary {
        &self.summary
    }

    pub fn channel(&self) -> &ControlChannel<T> {
        &self.channel
    }

    pub fn recorder(&self) -> &BufferedRecorder {
        &self.recorder
    }

    pub fn parameters(&self) -> Option<&ParameterSync> {
        self.sync.as_ref()
    }

    pub fn poller(&self) -> &TelemetryPoller {
        &self.poller
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn into_channel(self) -> ControlChannel<T> {
        self.channel
    }
}
