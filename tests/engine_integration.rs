//! Integration tests for the data engine
//!
//! These tests validate the complete engine workflow:
//! - Journal write-through and power-cycle replay
//! - Sampler lifecycle (commit, clear, suspend/resume, shutdown)
//! - Degraded (memory-only) operation

use std::time::Duration;
use templog_rs::config::{shared_settings, Settings};
use templog_rs::journal::SampleJournal;
use templog_rs::query::QueryLayer;
use templog_rs::sampler::{Sampler, SamplerHandle, SamplerMessage, SensorBus, SimulatedBus, SystemClock, TracePattern};
use templog_rs::store::{shared_ring, RingStore, SharedRing};
use templog_rs::types::{ChannelId, Sample};
use tempfile::TempDir;

/// Wait until a message matching `pred` arrives, draining everything else
fn wait_for(
    handle: &SamplerHandle,
    timeout: Duration,
    pred: impl Fn(&SamplerMessage) -> bool,
) -> Option<SamplerMessage> {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if let Some(msg) = handle.recv_timeout(Duration::from_millis(100)) {
            if pred(&msg) {
                return Some(msg);
            }
        }
    }
    None
}

fn demo_bus() -> SimulatedBus {
    let mut bus = SimulatedBus::new();
    bus.add_channel(ChannelId(0xA1), TracePattern::Constant(20.0));
    bus.add_channel(ChannelId(0xA2), TracePattern::Constant(-18.5));
    bus
}

fn spawn_engine(journal: SampleJournal) -> (SamplerHandle, std::thread::JoinHandle<()>, SharedRing) {
    let mut bus = demo_bus();
    let layout = bus.discover().unwrap();
    let ring = shared_ring(RingStore::new(100).unwrap());
    let settings = shared_settings(Settings::default());
    let (handle, join) = Sampler::spawn(
        Box::new(bus),
        Box::new(SystemClock),
        layout,
        ring.clone(),
        settings,
        journal,
    );
    (handle, join, ring)
}

#[test]
fn test_power_cycle_replay_restores_history() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("samples.jsonl");
    let layout = vec![ChannelId(0xA1), ChannelId(0xA2)];

    let written = vec![
        Sample::new(100, vec![Some(20.0), Some(-18.5)]),
        Sample::new(160, vec![Some(20.5), None]),
        Sample::new(220, vec![None, None]),
    ];

    {
        let mut journal = SampleJournal::open(&path).unwrap();
        for sample in &written {
            journal.append(sample, &layout).unwrap();
        }
    }

    // Power cycle: reopen and replay into a fresh ring
    let journal = SampleJournal::open(&path).unwrap();
    let mut ring = RingStore::new(100).unwrap();
    for sample in journal.replay(&layout).unwrap() {
        ring.append(sample);
    }

    let restored: Vec<Sample> = ring.iter().cloned().collect();
    assert_eq!(restored, written);
}

#[test]
fn test_replay_beyond_ring_capacity_keeps_newest() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("samples.jsonl");
    let layout = vec![ChannelId(1)];

    let mut journal = SampleJournal::open(&path).unwrap();
    for ts in 1..=8 {
        journal
            .append(&Sample::new(ts, vec![Some(ts as f32)]), &layout)
            .unwrap();
    }

    let mut ring = RingStore::new(5).unwrap();
    let mut replay = journal.replay(&layout).unwrap();
    for sample in replay.by_ref() {
        ring.append(sample);
    }

    assert_eq!(replay.replayed(), 8);
    assert_eq!(replay.skipped(), 0);
    assert!(ring.overflowed());
    assert_eq!(
        ring.iter().map(|s| s.timestamp).collect::<Vec<_>>(),
        vec![4, 5, 6, 7, 8]
    );
}

#[test]
fn test_sampler_commits_and_clears() {
    let dir = TempDir::new().unwrap();
    let journal = SampleJournal::open(dir.path().join("samples.jsonl")).unwrap();
    let (handle, join, ring) = spawn_engine(journal);

    // The first cycle fires immediately on startup
    let committed = wait_for(&handle, Duration::from_secs(5), |m| {
        matches!(m, SamplerMessage::SampleCommitted { .. })
    });
    assert!(committed.is_some(), "should commit a sample on startup");

    let query = QueryLayer::new(ring.clone());
    let snap = query.snapshot();
    assert_eq!(snap.reading(0), Some(20.0));
    assert_eq!(snap.reading(1), Some(-18.5));

    // Clear wipes the ring and the journal together
    handle.clear_data();
    let cleared = wait_for(&handle, Duration::from_secs(5), |m| {
        matches!(m, SamplerMessage::DataCleared)
    });
    assert!(cleared.is_some(), "should acknowledge the clear");
    assert!(ring.read().unwrap().is_empty());

    handle.shutdown();
    join.join().unwrap();
}

#[test]
fn test_sampler_suspend_resume_and_stats() {
    let (handle, join, _ring) = spawn_engine(SampleJournal::degraded());

    wait_for(&handle, Duration::from_secs(5), |m| {
        matches!(m, SamplerMessage::SampleCommitted { .. })
    })
    .unwrap();

    handle.suspend();
    let suspended = wait_for(&handle, Duration::from_secs(5), |m| {
        matches!(m, SamplerMessage::Suspended)
    });
    assert!(suspended.is_some(), "should enter the suspended state");

    handle.resume();
    let resumed = wait_for(&handle, Duration::from_secs(5), |m| {
        matches!(m, SamplerMessage::Resumed)
    });
    assert!(resumed.is_some(), "should resume from suspend");

    handle.request_stats();
    let stats = wait_for(&handle, Duration::from_secs(5), |m| {
        matches!(m, SamplerMessage::Stats(_))
    });
    match stats {
        Some(SamplerMessage::Stats(stats)) => {
            assert!(stats.cycles >= 1);
            assert_eq!(stats.durability_errors, 0);
        }
        _ => panic!("should answer a stats request"),
    }

    handle.shutdown();
    join.join().unwrap();
}

#[test]
fn test_degraded_journal_keeps_engine_alive() {
    let (handle, join, ring) = spawn_engine(SampleJournal::degraded());

    let committed = wait_for(&handle, Duration::from_secs(5), |m| {
        matches!(m, SamplerMessage::SampleCommitted { .. })
    });
    assert!(committed.is_some(), "memory-only mode still samples");
    assert!(!ring.read().unwrap().is_empty());

    handle.shutdown();
    join.join().unwrap();
}
