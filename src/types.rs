//! Core data types for TempLog-RS
//!
//! This module contains the fundamental data structures used throughout
//! the engine for representing sensor channels and timestamped samples.
//!
//! # Main Types
//!
//! - [`ChannelId`] - Stable identity of one sensor slot (the bus address)
//! - [`Channel`] - Configuration for one sensor slot (identity, display name)
//! - [`Sample`] - One timestamp plus an ordered per-channel optional reading
//!
//! # Disconnected readings
//!
//! A channel that produced no reading in a cycle is stored as `None`, never
//! as `0.0` or a sentinel float. Every consumer (chart scaling, table
//! rendering, statistics) must skip absent readings rather than interpolate
//! them.
//!
//! # Channel identity
//!
//! Channel identity is derived from the sensor's bus address and is therefore
//! stable across reboots. The position of a reading inside a [`Sample`] is
//! the channel's index in the discovery order; the persisted journal carries
//! the id list so a layout change is detectable on replay.

use serde::{Deserialize, Serialize};

/// Maximum number of sensor channels the appliance supports
pub const MAX_CHANNELS: usize = 10;

/// Default in-memory history capacity (samples retained per ring store)
pub const RING_CAPACITY: usize = 1000;

/// Stable identifier of a sensor channel, derived from its bus address
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Configuration for one sensor slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Stable identity (bus address)
    pub id: ChannelId,
    /// User-assigned display name
    pub name: String,
}

impl Channel {
    /// Create a channel with the default display name for its index
    pub fn new(id: ChannelId, index: usize) -> Self {
        Self {
            id,
            name: default_channel_name(index),
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Default display name for an unnamed channel ("Sensor 1", "Sensor 2", ...)
pub fn default_channel_name(index: usize) -> String {
    format!("Sensor {}", index + 1)
}

/// One timestamped set of per-channel readings
///
/// Immutable once created. `readings` is ordered by channel index; a `None`
/// entry means the channel was disconnected (or timed out) for this cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Wall-clock timestamp, Unix seconds
    pub timestamp: i64,
    /// Per-channel readings in degrees Celsius, ordered by channel index
    pub readings: Vec<Option<f32>>,
}

impl Sample {
    /// Create a new sample
    pub fn new(timestamp: i64, readings: Vec<Option<f32>>) -> Self {
        Self {
            timestamp,
            readings,
        }
    }

    /// Number of channel slots in this sample
    pub fn channel_count(&self) -> usize {
        self.readings.len()
    }

    /// Reading for a channel index, `None` if disconnected or out of range
    pub fn reading(&self, index: usize) -> Option<f32> {
        self.readings.get(index).copied().flatten()
    }

    /// Iterator over `(index, value)` pairs for channels that produced a reading
    pub fn present_readings(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.readings
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.map(|v| (i, v)))
    }

    /// True if no channel produced a reading this cycle
    pub fn is_all_disconnected(&self) -> bool {
        self.readings.iter().all(|r| r.is_none())
    }
}
