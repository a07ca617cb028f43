//! # TempLog-RS: Multi-Channel Temperature Logging Engine
//!
//! The data engine of a battery-powered temperature logging appliance:
//! periodic acquisition from a multi-drop sensor bus, a fixed-capacity
//! in-memory history, an append-only durable journal, and read-only query
//! views for a render/interaction surface.
//!
//! ## Architecture
//!
//! - **Sampler**: runs the acquisition loop on its own thread, commits one
//!   [`Sample`] per interval to the ring store and the journal
//! - **Store**: the fixed-capacity ring holding the newest samples in memory
//! - **Journal**: append-only persistence with replay on boot and
//!   time-based compaction
//! - **Query**: Snapshot / Series / Page views composed over the ring
//! - **Communication**: crossbeam channels for thread-safe command and
//!   message transfer
//!
//! ## Configuration
//!
//! Settings and the journal live in the platform-appropriate data directory
//! under `dev.hxyulin.templog-rs`:
//!
//! - **Linux**: `~/.local/share/dev.hxyulin.templog-rs/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.templog-rs/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.templog-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use templog_rs::{
//!     config::{shared_settings, Settings},
//!     journal::SampleJournal,
//!     query::QueryLayer,
//!     sampler::{Sampler, SensorBus, SimulatedBus, SystemClock},
//!     store::{shared_ring, RingStore},
//!     types::RING_CAPACITY,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = shared_settings(Settings::load_or_default("settings.json"));
//!     let ring = shared_ring(RingStore::new(RING_CAPACITY)?);
//!
//!     let (journal, _status) = SampleJournal::open_or_degraded("samples.jsonl");
//!     let mut bus = SimulatedBus::with_demo_channels();
//!     let layout = bus.discover()?;
//!
//!     // Warm the ring from the journal, then start sampling
//!     for sample in journal.replay(&layout)? {
//!         ring.write().unwrap().append(sample);
//!     }
//!     let (handle, join) = Sampler::spawn(
//!         Box::new(bus),
//!         Box::new(SystemClock),
//!         layout,
//!         ring.clone(),
//!         settings,
//!         journal,
//!     );
//!
//!     let query = QueryLayer::new(ring);
//!     // ... drive the render loop from query.snapshot() / series() / page()
//!
//!     handle.shutdown();
//!     join.join().unwrap();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod journal;
pub mod query;
pub mod sampler;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::{Settings, SharedSettings};
pub use error::{Result, TempLogError};
pub use journal::{SampleJournal, StorageStatus};
pub use query::{PageView, QueryLayer, Series, SeriesRange, Snapshot};
pub use sampler::{Sampler, SamplerCommand, SamplerHandle, SamplerMessage, SensorBus};
pub use store::{RingStore, SharedRing};
pub use types::{Channel, ChannelId, Sample};
