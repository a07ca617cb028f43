//! Sampling scheduler for periodic sensor acquisition
//!
//! This module runs the acquisition loop on its own thread so a multi-second
//! bus transaction can never freeze the render/interaction surface. It
//! communicates with the consumer through crossbeam channels.
//!
//! # Architecture
//!
//! - [`SamplerCommand`] - requests sent from the interaction surface to the
//!   worker (clear data, suspend, resume, shutdown)
//! - [`SamplerMessage`] - events sent back (committed samples, durability
//!   failures, state transitions)
//! - [`SamplerHandle`] - consumer-side handle for sending commands and
//!   draining messages
//! - [`SamplerWorker`] - the worker loop itself
//!
//! # Scheduling contract
//!
//! The worker is Idle between cycles and Acquiring during one; the sampling
//! interval is re-read from the shared [`Settings`] at every due-check, so
//! interval changes take effect on the next tick without a restart. Suspend
//! is only honored while Idle and flushes the journal first.
//!
//! # Example
//!
//! ```ignore
//! use templog_rs::sampler::{Sampler, SamplerMessage};
//!
//! let (handle, join) = Sampler::spawn(bus, clock, layout, ring, settings, journal);
//!
//! for msg in handle.drain() {
//!     match msg {
//!         SamplerMessage::SampleCommitted { timestamp, .. } => { /* refresh views */ }
//!         SamplerMessage::DurabilityError(e) => { /* light the status icon */ }
//!         _ => {}
//!     }
//! }
//!
//! handle.shutdown();
//! join.join().unwrap();
//! ```
//!
//! [`Settings`]: crate::config::Settings

pub mod bus;
pub mod sim;
pub mod worker;

pub use bus::{Clock, SensorBus, SystemClock, DEFAULT_BUS_TIMEOUT};
pub use sim::{SimulatedBus, TracePattern};
pub use worker::{SamplerState, SamplerWorker};

use crate::config::SharedSettings;
use crate::journal::SampleJournal;
use crate::store::SharedRing;
use crate::types::ChannelId;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::JoinHandle;

/// Capacity of the command channel (interaction surface -> worker)
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the message channel (worker -> interaction surface)
const MESSAGE_CHANNEL_CAPACITY: usize = 256;

/// Request sent to the sampler worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerCommand {
    /// Clear the in-memory history and truncate the journal
    ClearData,
    /// Enter the low-power suspended state (honored only while Idle)
    Suspend,
    /// Leave the suspended state
    Resume,
    /// Send a [`SamplerMessage::Stats`] snapshot
    RequestStats,
    /// Stop the worker
    Shutdown,
}

/// Event sent from the sampler worker
#[derive(Debug, Clone)]
pub enum SamplerMessage {
    /// One sample was appended to the ring store
    SampleCommitted {
        /// Sample timestamp, Unix seconds
        timestamp: i64,
        /// How many channels were disconnected this cycle
        disconnected: usize,
    },
    /// A durable append failed after its bounded retries; sampling continues
    DurabilityError(String),
    /// History and journal were cleared
    DataCleared,
    /// The worker entered the suspended state
    Suspended,
    /// The worker resumed from the suspended state
    Resumed,
    /// Statistics snapshot
    Stats(SamplerStats),
    /// The worker stopped
    Shutdown,
}

/// Statistics about the acquisition loop
#[derive(Debug, Clone)]
pub struct SamplerStats {
    /// Completed acquisition cycles
    pub cycles: u64,
    /// Total disconnected readings across all cycles
    pub disconnected_readings: u64,
    /// Whole-bus transaction failures
    pub bus_errors: u64,
    /// Durable appends that failed after retries
    pub durability_errors: u64,
    /// Messages dropped due to queue backpressure
    pub dropped_messages: u64,
    /// Duration of the last cycle in milliseconds
    pub last_cycle_ms: u64,
    /// Shortest cycle observed in milliseconds
    pub min_cycle_ms: u64,
    /// Longest cycle observed in milliseconds
    pub max_cycle_ms: u64,
    /// Sum of all cycle durations in milliseconds
    pub total_cycle_ms: u64,
}

impl Default for SamplerStats {
    fn default() -> Self {
        Self {
            cycles: 0,
            disconnected_readings: 0,
            bus_errors: 0,
            durability_errors: 0,
            dropped_messages: 0,
            last_cycle_ms: 0,
            min_cycle_ms: u64::MAX,
            max_cycle_ms: 0,
            total_cycle_ms: 0,
        }
    }
}

impl SamplerStats {
    /// Record the duration of one completed cycle
    pub fn record_cycle(&mut self, duration_ms: u64) {
        self.cycles += 1;
        self.last_cycle_ms = duration_ms;
        self.total_cycle_ms += duration_ms;
        if duration_ms < self.min_cycle_ms {
            self.min_cycle_ms = duration_ms;
        }
        if duration_ms > self.max_cycle_ms {
            self.max_cycle_ms = duration_ms;
        }
    }

    /// Average cycle duration in milliseconds
    pub fn avg_cycle_ms(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.total_cycle_ms as f64 / self.cycles as f64
        }
    }
}

/// Entry point for running the sampler on its own thread
pub struct Sampler;

impl Sampler {
    /// Spawn the worker thread and return the consumer-side handle
    #[allow(clippy::type_complexity)]
    pub fn spawn(
        bus: Box<dyn SensorBus>,
        clock: Box<dyn Clock>,
        layout: Vec<ChannelId>,
        ring: SharedRing,
        settings: SharedSettings,
        journal: SampleJournal,
    ) -> (SamplerHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = bounded(COMMAND_CHANNEL_CAPACITY);
        let (message_tx, message_rx) = bounded(MESSAGE_CHANNEL_CAPACITY);

        let mut worker = SamplerWorker::new(
            bus, clock, layout, ring, settings, journal, command_rx, message_tx,
        );
        let join = std::thread::Builder::new()
            .name("templog-sampler".to_string())
            .spawn(move || worker.run())
            .expect("failed to spawn sampler thread");

        (
            SamplerHandle {
                command_tx,
                message_rx,
            },
            join,
        )
    }
}

/// Consumer-side handle to the sampler worker
#[derive(Debug, Clone)]
pub struct SamplerHandle {
    command_tx: Sender<SamplerCommand>,
    message_rx: Receiver<SamplerMessage>,
}

impl SamplerHandle {
    /// Clear the in-memory history and truncate the journal
    pub fn clear_data(&self) {
        self.send(SamplerCommand::ClearData);
    }

    /// Request the suspended (low-power) state
    pub fn suspend(&self) {
        self.send(SamplerCommand::Suspend);
    }

    /// Resume from the suspended state
    pub fn resume(&self) {
        self.send(SamplerCommand::Resume);
    }

    /// Request a statistics snapshot
    pub fn request_stats(&self) {
        self.send(SamplerCommand::RequestStats);
    }

    /// Ask the worker to stop
    pub fn shutdown(&self) {
        self.send(SamplerCommand::Shutdown);
    }

    /// Drain all pending messages without blocking
    pub fn drain(&self) -> Vec<SamplerMessage> {
        self.message_rx.try_iter().collect()
    }

    /// Blocking receive with a timeout, for event-driven consumers
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<SamplerMessage> {
        self.message_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, cmd: SamplerCommand) {
        if self.command_tx.send(cmd).is_err() {
            tracing::warn!("Sampler worker is gone, command dropped: {:?}", cmd);
        }
    }
}
