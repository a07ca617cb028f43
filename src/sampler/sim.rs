//! Simulated sensor bus
//!
//! The real probe drivers live outside this crate, so the simulated bus is
//! the in-repo [`SensorBus`] implementation: it generates plausible
//! temperature traces for development, the headless runner, and tests.
//!
//! # Trace patterns
//!
//! - [`TracePattern::Constant`] - fixed temperature
//! - [`TracePattern::Sine`] - slow sinusoid (day/night style swing)
//! - [`TracePattern::Ramp`] - linear drift from a starting point
//! - [`TracePattern::Random`] - uniform noise within a range
//!
//! Channels can additionally be unplugged and replugged at runtime to
//! exercise the disconnected-reading paths.

use crate::error::Result;
use crate::sampler::bus::SensorBus;
use crate::types::ChannelId;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Pattern for generating a simulated temperature trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TracePattern {
    /// Constant temperature in °C
    Constant(f32),
    /// Sinusoid: `offset + amplitude * sin(2π * t / period_secs)`
    Sine {
        period_secs: f32,
        amplitude: f32,
        offset: f32,
    },
    /// Linear drift: `start + slope_per_sec * t`
    Ramp { start: f32, slope_per_sec: f32 },
    /// Uniform random within `[min, max]`
    Random { min: f32, max: f32 },
}

impl Default for TracePattern {
    fn default() -> Self {
        TracePattern::Sine {
            period_secs: 3600.0,
            amplitude: 4.0,
            offset: 21.0,
        }
    }
}

impl TracePattern {
    /// Generate a value for elapsed seconds since bus creation
    fn generate(&self, elapsed_secs: f32) -> f32 {
        match *self {
            TracePattern::Constant(v) => v,
            TracePattern::Sine {
                period_secs,
                amplitude,
                offset,
            } => offset + amplitude * (2.0 * std::f32::consts::PI * elapsed_secs / period_secs).sin(),
            TracePattern::Ramp {
                start,
                slope_per_sec,
            } => start + slope_per_sec * elapsed_secs,
            TracePattern::Random { min, max } => min + rand_simple() * (max - min),
        }
    }
}

/// Simple xorshift pseudo-random number generator (no external dependency)
fn rand_simple() -> f32 {
    use std::cell::Cell;
    thread_local! {
        static SEED: Cell<u64> = const { Cell::new(0x2545F491) };
    }
    SEED.with(|seed| {
        let mut s = seed.get();
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        seed.set(s);
        (s as f32) / (u64::MAX as f32)
    })
}

/// Simulated sensor bus with per-channel trace patterns
#[derive(Debug)]
pub struct SimulatedBus {
    /// Channels in discovery order with their patterns
    channels: Vec<(ChannelId, TracePattern)>,
    /// Channels currently unplugged
    unplugged: HashSet<ChannelId>,
    /// Noise amplitude added to every reading (0.0 = none)
    noise: f32,
    /// Bus creation time, drives the trace patterns
    started: Instant,
}

impl SimulatedBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            unplugged: HashSet::new(),
            noise: 0.0,
            started: Instant::now(),
        }
    }

    /// A three-probe bus with varied traces, for the headless runner
    pub fn with_demo_channels() -> Self {
        let mut bus = Self::new();
        bus.add_channel(
            ChannelId(0x28ff_0000_0000_0001),
            TracePattern::Sine {
                period_secs: 600.0,
                amplitude: 3.0,
                offset: 21.0,
            },
        );
        bus.add_channel(
            ChannelId(0x28ff_0000_0000_0002),
            TracePattern::Ramp {
                start: 4.0,
                slope_per_sec: 0.01,
            },
        );
        bus.add_channel(
            ChannelId(0x28ff_0000_0000_0003),
            TracePattern::Constant(-18.5),
        );
        bus.noise = 0.05;
        bus
    }

    /// Add a channel with a trace pattern
    pub fn add_channel(&mut self, id: ChannelId, pattern: TracePattern) {
        self.channels.push((id, pattern));
    }

    /// Add noise to every generated reading
    pub fn with_noise(mut self, amplitude: f32) -> Self {
        self.noise = amplitude;
        self
    }

    /// Simulate unplugging a probe: subsequent reads yield disconnected
    pub fn unplug(&mut self, id: ChannelId) {
        self.unplugged.insert(id);
    }

    /// Plug a previously unplugged probe back in
    pub fn replug(&mut self, id: ChannelId) {
        self.unplugged.remove(&id);
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorBus for SimulatedBus {
    fn discover(&mut self) -> Result<Vec<ChannelId>> {
        Ok(self.channels.iter().map(|(id, _)| *id).collect())
    }

    fn read_all(&mut self, _timeout: Duration) -> Result<HashMap<ChannelId, Option<f32>>> {
        let elapsed = self.started.elapsed().as_secs_f32();
        let mut readings = HashMap::with_capacity(self.channels.len());
        for (id, pattern) in &self.channels {
            let value = if self.unplugged.contains(id) {
                None
            } else {
                let base = pattern.generate(elapsed);
                let value = if self.noise > 0.0 {
                    base + (rand_simple() - 0.5) * 2.0 * self.noise
                } else {
                    base
                };
                Some(value)
            };
            readings.insert(*id, value);
        }
        Ok(readings)
    }
}
