//! Collaborator traits for sensor acquisition
//!
//! The core never knows the bus protocol or the time source; it only sees
//! these two contracts. Implementations must be `Send` so the sampler worker
//! can own them on its own thread.

use crate::error::Result;
use crate::types::ChannelId;
use std::collections::HashMap;
use std::time::Duration;

/// Default deadline for one full bus read transaction
///
/// Digital temperature probes commonly need close to a second of conversion
/// time, so the deadline is generous but still bounded: a cycle never blocks
/// indefinitely.
pub const DEFAULT_BUS_TIMEOUT: Duration = Duration::from_millis(2000);

/// Abstract sensor bus shared by all temperature probes
///
/// A channel that fails to answer within the deadline is reported as `None`
/// (disconnected) for that transaction, not retried within the same cycle.
#[cfg_attr(test, mockall::automock)]
pub trait SensorBus: Send {
    /// Enumerate the channels currently present on the bus
    ///
    /// Identifiers are bus addresses and therefore stable across reboots.
    fn discover(&mut self) -> Result<Vec<ChannelId>>;

    /// Read every channel once, within `timeout` for the whole transaction
    ///
    /// A missing or `None` entry means the channel was disconnected for this
    /// read. A returned error means the whole transaction failed; the caller
    /// records every channel as disconnected for the cycle.
    fn read_all(&mut self, timeout: Duration) -> Result<HashMap<ChannelId, Option<f32>>>;
}

/// Abstract time source
///
/// Only monotonic-enough wall-clock ordering is required; network time sync
/// happens outside the core.
pub trait Clock: Send {
    /// Current wall-clock time, Unix seconds
    fn now(&self) -> i64;
}

/// System clock backed by the OS wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}
