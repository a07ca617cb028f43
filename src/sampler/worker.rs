//! Sampler worker loop
//!
//! The worker owns the sensor bus, the clock, and the journal, and shares
//! the ring store and settings with the rest of the appliance. It runs a
//! two-state machine: **Idle** (waiting for the next interval) and
//! **Acquiring** (mid read-cycle), plus the explicit **Suspended** state for
//! deep sleep.
//!
//! # Responsibilities
//!
//! - **Command processing**: responds to clear/suspend/resume/shutdown
//!   between cycles, never mid-acquisition
//! - **Acquisition**: one bounded-timeout bus transaction per interval; a
//!   channel that does not answer is recorded as disconnected, not retried
//!   until the next full cycle
//! - **Write-through**: ring append first (never blocked), then the durable
//!   append with a bounded retry count; durability failures are surfaced,
//!   never fatal
//! - **Housekeeping**: daily journal compaction against the configured
//!   retention
//!
//! # Interval handling
//!
//! The interval is read from the shared settings at every due-check rather
//! than cached for the worker's lifetime, so a change made from the
//! interaction loop takes effect at the next tick.

use crate::config::SharedSettings;
use crate::journal::SampleJournal;
use crate::sampler::bus::{Clock, SensorBus, DEFAULT_BUS_TIMEOUT};
use crate::sampler::{SamplerCommand, SamplerMessage, SamplerStats};
use crate::store::SharedRing;
use crate::types::{ChannelId, Sample};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::PoisonError;
use std::time::{Duration, Instant};

/// Sleep granularity of the idle loop; bounds command latency
const IDLE_TICK: Duration = Duration::from_millis(100);

/// Poll granularity while suspended
const SUSPENDED_TICK: Duration = Duration::from_millis(500);

/// Durable append attempts before surfacing a durability error
const JOURNAL_RETRY_LIMIT: u32 = 3;

/// Seconds between journal compaction runs
const COMPACT_INTERVAL_SECS: i64 = 24 * 60 * 60;

/// State of the sampling scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplerState {
    /// Waiting for the next interval
    #[default]
    Idle,
    /// Mid read-cycle
    Acquiring,
    /// Low-power state; no acquisition until resumed
    Suspended,
}

impl std::fmt::Display for SamplerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplerState::Idle => write!(f, "Idle"),
            SamplerState::Acquiring => write!(f, "Acquiring"),
            SamplerState::Suspended => write!(f, "Suspended"),
        }
    }
}

/// The worker that runs the acquisition loop
pub struct SamplerWorker {
    /// Sensor bus collaborator
    bus: Box<dyn SensorBus>,
    /// Time source
    clock: Box<dyn Clock>,
    /// Channel layout in reading order, fixed at bootstrap
    layout: Vec<ChannelId>,
    /// Shared in-memory history
    ring: SharedRing,
    /// Shared settings, re-read every cycle
    settings: SharedSettings,
    /// Durable journal
    journal: SampleJournal,
    /// Command receiver from the interaction surface
    command_rx: Receiver<SamplerCommand>,
    /// Message sender to the interaction surface
    message_tx: Sender<SamplerMessage>,
    /// Current scheduler state
    state: SamplerState,
    /// Timestamp of the last completed cycle
    last_cycle_at: Option<i64>,
    /// Timestamp of the last compaction run
    last_compact_at: i64,
    /// Statistics
    stats: SamplerStats,
}

impl SamplerWorker {
    /// Create a new worker
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bus: Box<dyn SensorBus>,
        clock: Box<dyn Clock>,
        layout: Vec<ChannelId>,
        ring: SharedRing,
        settings: SharedSettings,
        journal: SampleJournal,
        command_rx: Receiver<SamplerCommand>,
        message_tx: Sender<SamplerMessage>,
    ) -> Self {
        let last_compact_at = clock.now();
        Self {
            bus,
            clock,
            layout,
            ring,
            settings,
            journal,
            command_rx,
            message_tx,
            state: SamplerState::Idle,
            last_cycle_at: None,
            last_compact_at,
            stats: SamplerStats::default(),
        }
    }

    /// Run the main worker loop until shutdown
    pub fn run(&mut self) {
        tracing::info!(channels = self.layout.len(), "Sampler worker started");

        loop {
            if !self.process_commands() {
                break;
            }

            if self.state == SamplerState::Suspended {
                // Block until the wake signal (or shutdown) arrives
                match self.command_rx.recv_timeout(SUSPENDED_TICK) {
                    Ok(cmd) => {
                        if !self.handle_command(cmd) {
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
                continue;
            }

            let now = self.clock.now();
            if self.due(now) {
                self.run_cycle(now);
                self.maybe_compact(now);
            }

            std::thread::sleep(IDLE_TICK);
        }

        if let Err(e) = self.journal.flush() {
            tracing::warn!("Journal flush on shutdown failed: {}", e);
        }
        let _ = self.message_tx.send(SamplerMessage::Shutdown);
        tracing::info!("Sampler worker stopped");
    }

    /// True when the next acquisition is due at `now`
    ///
    /// The interval is re-read from settings here, so the first due-check
    /// after an interval change already uses the new value.
    pub fn due(&self, now: i64) -> bool {
        let interval = i64::from(
            self.settings
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .sample_interval_secs,
        );
        match self.last_cycle_at {
            None => true,
            Some(last) => now - last >= interval,
        }
    }

    /// Perform one acquisition cycle at timestamp `now`
    ///
    /// Public so a host scheduler (or a test) can drive acquisition without
    /// the thread loop.
    pub fn run_cycle(&mut self, now: i64) {
        self.state = SamplerState::Acquiring;
        let started = Instant::now();

        let readings: Vec<Option<f32>> = match self.bus.read_all(DEFAULT_BUS_TIMEOUT) {
            Ok(map) => self
                .layout
                .iter()
                .map(|id| map.get(id).copied().flatten())
                .collect(),
            Err(e) => {
                tracing::warn!("Bus transaction failed, all channels disconnected: {}", e);
                self.stats.bus_errors += 1;
                vec![None; self.layout.len()]
            }
        };

        let sample = Sample::new(now, readings);
        let disconnected = sample.readings.iter().filter(|r| r.is_none()).count();
        self.stats.disconnected_readings += disconnected as u64;

        // In-memory first: a durability failure must never block live data.
        self.ring
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .append(sample.clone());
        self.persist(&sample);

        self.stats.record_cycle(started.elapsed().as_millis() as u64);
        self.last_cycle_at = Some(now);
        self.try_send_message(SamplerMessage::SampleCommitted {
            timestamp: now,
            disconnected,
        });
        self.state = SamplerState::Idle;
    }

    /// Durable append with a bounded retry count
    fn persist(&mut self, sample: &Sample) {
        if self.journal.is_degraded() {
            return;
        }
        for attempt in 1..=JOURNAL_RETRY_LIMIT {
            match self.journal.append(sample, &self.layout) {
                Ok(()) => return,
                Err(e) if attempt == JOURNAL_RETRY_LIMIT => {
                    tracing::error!("Durable append failed after {} attempts: {}", attempt, e);
                    self.stats.durability_errors += 1;
                    self.try_send_message(SamplerMessage::DurabilityError(e.to_string()));
                }
                Err(e) => {
                    tracing::debug!("Durable append attempt {} failed, retrying: {}", attempt, e);
                }
            }
        }
    }

    /// Run journal compaction if a day has passed since the last run
    fn maybe_compact(&mut self, now: i64) {
        if now - self.last_compact_at < COMPACT_INTERVAL_SECS {
            return;
        }
        self.last_compact_at = now;
        let retain_secs = self
            .settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .retain_secs();
        match self.journal.compact(retain_secs, now) {
            Ok(kept) => tracing::info!(kept, "Journal compacted"),
            Err(e) => {
                tracing::warn!("Journal compaction failed: {}", e);
                self.stats.durability_errors += 1;
            }
        }
    }

    /// Process pending commands; returns false on shutdown
    fn process_commands(&mut self) -> bool {
        loop {
            match self.command_rx.try_recv() {
                Ok(cmd) => {
                    if !self.handle_command(cmd) {
                        return false;
                    }
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// Handle a single command; returns false on shutdown
    fn handle_command(&mut self, cmd: SamplerCommand) -> bool {
        match cmd {
            SamplerCommand::ClearData => {
                self.ring
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clear();
                if let Err(e) = self.journal.clear() {
                    tracing::error!("Journal truncate failed: {}", e);
                    self.try_send_message(SamplerMessage::DurabilityError(e.to_string()));
                }
                self.stats = SamplerStats::default();
                self.try_send_message(SamplerMessage::DataCleared);
                tracing::info!("History and journal cleared");
            }
            SamplerCommand::Suspend => {
                // Never suspend mid-acquisition; the pending write is
                // flushed before the low-power state is entered.
                if self.state == SamplerState::Idle {
                    if let Err(e) = self.journal.flush() {
                        tracing::warn!("Journal flush before suspend failed: {}", e);
                    }
                    self.state = SamplerState::Suspended;
                    self.try_send_message(SamplerMessage::Suspended);
                    tracing::info!("Sampler suspended");
                } else {
                    tracing::warn!("Suspend ignored in state {}", self.state);
                }
            }
            SamplerCommand::Resume => {
                if self.state == SamplerState::Suspended {
                    self.state = SamplerState::Idle;
                    self.try_send_message(SamplerMessage::Resumed);
                    tracing::info!("Sampler resumed");
                }
            }
            SamplerCommand::RequestStats => {
                self.try_send_message(SamplerMessage::Stats(self.stats.clone()));
            }
            SamplerCommand::Shutdown => return false,
        }
        true
    }

    /// Current scheduler state
    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Statistics snapshot
    pub fn stats(&self) -> &SamplerStats {
        &self.stats
    }

    /// Try to send a message, counting drops if the queue is full
    fn try_send_message(&mut self, msg: SamplerMessage) {
        if self.message_tx.try_send(msg).is_err() {
            self.stats.dropped_messages += 1;
        }
    }
}
