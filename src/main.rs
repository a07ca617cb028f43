//! TempLog-RS - Headless Appliance Runner
//!
//! Boots the data engine the way the appliance firmware would: mount
//! storage, replay the journal, start the sampler, and stand in for the
//! render loop by logging the query views as samples arrive.

use anyhow::Context;
use std::time::Duration;
use templog_rs::{
    config::{self, Settings, SettingsOverride},
    journal::SampleJournal,
    query::{QueryLayer, SeriesRange, DEFAULT_PAGE_SIZE},
    sampler::{Clock, Sampler, SamplerMessage, SensorBus, SimulatedBus, SystemClock},
    store::{shared_ring, RingStore},
    types::{Channel, RING_CAPACITY},
    StorageStatus,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let data_dir = config::ensure_app_data_dir().context("data directory unavailable")?;

    // Initialize logging: console plus a daily-rolled file in the data dir
    let file_appender = tracing_appender::rolling::daily(data_dir.join("logs"), "templog.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,templog_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    tracing::info!("Starting TempLog-RS");

    // Settings: durable store first, then the operator override file on top
    let settings_path = data_dir.join(config::SETTINGS_FILE);
    let mut settings = Settings::load_or_default(&settings_path);
    match SettingsOverride::load(data_dir.join(config::OVERRIDE_FILE)) {
        Ok(ov) => settings.apply_override(&ov),
        Err(e) => tracing::debug!("No operator override applied: {}", e),
    }

    // Mount the journal; a degraded mount keeps the engine alive memory-only
    let clock = SystemClock;
    let (mut journal, status) = SampleJournal::open_or_degraded(data_dir.join(config::JOURNAL_FILE));
    match status {
        StorageStatus::Healthy => {}
        StorageStatus::Reformatted => tracing::warn!("Journal was unreadable and was reformatted"),
        StorageStatus::Degraded => {
            tracing::error!("Storage mount failed, running memory-only: data will not survive power-off")
        }
    }

    // Boot-time compaction against the configured retention
    if !journal.is_degraded() {
        match journal.compact(settings.retain_secs(), clock.now()) {
            Ok(kept) => tracing::info!(kept, "Journal compacted at boot"),
            Err(e) => tracing::warn!("Boot compaction failed: {}", e),
        }
    }

    // Discover the bus and sync channel configuration with what is present
    let mut bus = SimulatedBus::with_demo_channels();
    let layout = bus.discover().context("bus discovery failed")?;
    for (index, id) in layout.iter().enumerate() {
        if !settings.channels.iter().any(|c| c.id == *id) {
            settings.channels.push(Channel::new(*id, index));
        }
    }
    settings.validate();
    if let Err(e) = settings.save(&settings_path) {
        tracing::warn!("Could not persist settings: {}", e);
    }
    tracing::info!(
        channels = layout.len(),
        interval_secs = settings.sample_interval_secs,
        "Bus discovered"
    );

    // Warm the ring from the journal so history survives a power cycle
    let ring = shared_ring(RingStore::new(RING_CAPACITY)?);
    if !journal.is_degraded() {
        let mut replay = journal.replay(&layout)?;
        {
            let mut store = ring.write().unwrap_or_else(std::sync::PoisonError::into_inner);
            for sample in replay.by_ref() {
                store.append(sample);
            }
        }
        tracing::info!(
            replayed = replay.replayed(),
            skipped = replay.skipped(),
            "Journal replayed into history"
        );
    }

    let channel_names: Vec<String> = (0..layout.len()).map(|i| settings.channel_name(i)).collect();
    let settings = config::shared_settings(settings);
    let (handle, join) = Sampler::spawn(
        Box::new(bus),
        Box::new(clock),
        layout,
        ring.clone(),
        settings,
        journal,
    );
    let query = QueryLayer::new(ring);

    // Stand-in render loop: log the query views as commits arrive
    let mut commits: u64 = 0;
    loop {
        let Some(msg) = handle.recv_timeout(Duration::from_secs(1)) else {
            continue;
        };
        match msg {
            SamplerMessage::SampleCommitted { disconnected, .. } => {
                commits += 1;
                let snap = query.snapshot();
                let readings: Vec<String> = channel_names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| match snap.reading(i) {
                        Some(v) => format!("{}: {:.2}°C", name, v),
                        None => format!("{}: --", name),
                    })
                    .collect();
                tracing::info!(disconnected, "{}", readings.join("  "));

                if commits % 10 == 0 {
                    let series = query.series(SeriesRange::SixHours, clock.now());
                    let page = query.page(0, DEFAULT_PAGE_SIZE);
                    tracing::info!(
                        window = series.samples.len(),
                        axis_min = series.axis_min,
                        axis_max = series.axis_max,
                        total = page.total,
                        "Chart window refreshed"
                    );
                }
            }
            SamplerMessage::DurabilityError(e) => {
                tracing::warn!("Durability error, sampling continues: {}", e)
            }
            SamplerMessage::Shutdown => break,
            other => tracing::debug!("Sampler message: {:?}", other),
        }
    }

    tracing::info!("Shutting down...");
    join.join().ok();
    Ok(())
}
