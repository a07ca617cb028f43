//! Append-only durable sample journal
//!
//! The journal is the power-loss story of the appliance: every committed
//! sample is appended as one JSON line ([`JournalRecord`]), and at boot the
//! ring store is repopulated by replaying the file oldest-first. The ring's
//! overwrite-on-full semantics naturally keep the newest entries when the
//! journal holds more than one ring's worth.
//!
//! # Durability policy
//!
//! - `append` failures are reported to the caller and never block live
//!   sampling; the in-memory append proceeds regardless (fail-open for
//!   availability, fail-visible through [`SamplerMessage`] and the stats).
//! - `replay` skips individually corrupt or layout-mismatched lines and
//!   counts them instead of aborting.
//! - Retention is time-based (default 30 days) and enforced only by
//!   [`SampleJournal::compact`], run at boot rather than per write: the
//!   flash-backed medium has poor random-write behavior, so rewrites are
//!   batched.
//! - If the file cannot be opened at startup, one reformat-and-retry is
//!   attempted; after that the journal degrades to memory-only operation
//!   rather than refusing to boot.
//!
//! [`SamplerMessage`]: crate::sampler::SamplerMessage

pub mod record;

pub use record::JournalRecord;

use crate::error::{Result, TempLogError};
use crate::types::{ChannelId, Sample};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};

/// Health of the durable storage after startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageStatus {
    /// Journal opened normally
    Healthy,
    /// Journal was unreadable and has been reformatted (history lost)
    Reformatted,
    /// Storage unusable after retry; running memory-only
    Degraded,
}

impl std::fmt::Display for StorageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageStatus::Healthy => write!(f, "Healthy"),
            StorageStatus::Reformatted => write!(f, "Reformatted"),
            StorageStatus::Degraded => write!(f, "Degraded (memory-only)"),
        }
    }
}

/// Append-only journal of committed samples
#[derive(Debug)]
pub struct SampleJournal {
    /// Journal file path; `None` in degraded (memory-only) mode
    path: Option<PathBuf>,
    /// Open append handle, lazily reopened after compaction and clear
    writer: Option<BufWriter<File>>,
}

impl SampleJournal {
    /// Open the journal at `path`, creating the file and parent directories
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                TempLogError::StorageMount(format!(
                    "failed to create journal directory {:?}: {}",
                    parent, e
                ))
            })?;
        }
        let writer = Self::open_writer(&path)?;
        Ok(Self {
            path: Some(path),
            writer: Some(writer),
        })
    }

    /// Open the journal with the startup recovery policy: retry once with a
    /// reformat, then fall back to memory-only operation
    pub fn open_or_degraded(path: impl Into<PathBuf>) -> (Self, StorageStatus) {
        let path = path.into();
        match Self::open(&path) {
            Ok(journal) => (journal, StorageStatus::Healthy),
            Err(first) => {
                tracing::warn!("Journal open failed, reformatting: {}", first);
                let _ = std::fs::remove_file(&path);
                match Self::open(&path) {
                    Ok(journal) => (journal, StorageStatus::Reformatted),
                    Err(second) => {
                        tracing::error!(
                            "Journal unusable after reformat, running memory-only: {}",
                            second
                        );
                        (Self::degraded(), StorageStatus::Degraded)
                    }
                }
            }
        }
    }

    /// A journal that accepts appends as no-ops (memory-only mode)
    pub fn degraded() -> Self {
        Self {
            path: None,
            writer: None,
        }
    }

    /// True when running memory-only
    pub fn is_degraded(&self) -> bool {
        self.path.is_none()
    }

    /// Journal file path, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn open_writer(path: &Path) -> Result<BufWriter<File>> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                TempLogError::StorageMount(format!("failed to open journal {:?}: {}", path, e))
            })?;
        Ok(BufWriter::new(file))
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        if self.writer.is_none() {
            if let Some(path) = self.path.clone() {
                self.writer = Some(Self::open_writer(&path)?);
            }
        }
        self.writer
            .as_mut()
            .ok_or_else(|| TempLogError::Journal("journal is degraded".to_string()))
    }

    /// Durably append one sample under the given channel layout
    ///
    /// In degraded mode this is a silent no-op; otherwise errors are returned
    /// to the caller, which keeps sampling regardless.
    pub fn append(&mut self, sample: &Sample, layout: &[ChannelId]) -> Result<()> {
        if self.is_degraded() {
            return Ok(());
        }
        let line = JournalRecord::from_sample(sample, layout)
            .encode()
            .map_err(|e| TempLogError::Journal(format!("failed to encode record: {}", e)))?;
        let writer = self.writer()?;
        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush())
            .map_err(|e| TempLogError::Journal(format!("failed to append record: {}", e)))
    }

    /// Flush pending writes (required before entering a low-power state)
    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| TempLogError::Journal(format!("failed to flush journal: {}", e)))?;
        }
        Ok(())
    }

    /// Lazily replay the journal oldest-first for bootstrap
    ///
    /// Corrupt lines and records written under a different channel layout
    /// are skipped and counted, never fatal. A degraded journal replays
    /// nothing.
    pub fn replay(&self, layout: &[ChannelId]) -> Result<Replay> {
        let Some(path) = self.path.as_ref() else {
            return Ok(Replay::empty(layout));
        };
        let file = File::open(path)
            .map_err(|e| TempLogError::Journal(format!("failed to open journal for replay: {}", e)))?;
        Ok(Replay {
            lines: Some(BufReader::new(file).lines()),
            layout: layout.to_vec(),
            replayed: 0,
            skipped: 0,
        })
    }

    /// Drop records older than `retain_secs` from durable storage
    ///
    /// Rewrites the file to a temporary sibling and renames it into place,
    /// so an unclean power loss mid-compaction leaves the old journal
    /// intact. Corrupt lines are dropped along the way. Returns the number
    /// of records kept.
    pub fn compact(&mut self, retain_secs: i64, now: i64) -> Result<usize> {
        let Some(path) = self.path.clone() else {
            return Ok(0);
        };
        let cutoff = now - retain_secs;

        // Close the append handle so the rename below is the only writer.
        self.writer = None;

        let tmp_path = path.with_extension("compact.tmp");
        let mut kept = 0usize;
        {
            let reader = BufReader::new(File::open(&path).map_err(|e| {
                TempLogError::Journal(format!("failed to open journal for compaction: {}", e))
            })?);
            let mut out = BufWriter::new(File::create(&tmp_path).map_err(|e| {
                TempLogError::Journal(format!("failed to create compaction file: {}", e))
            })?);

            for line in reader.lines() {
                let line = line
                    .map_err(|e| TempLogError::Journal(format!("read during compaction: {}", e)))?;
                let Ok(record) = JournalRecord::decode(&line) else {
                    continue;
                };
                if record.ts < cutoff {
                    continue;
                }
                out.write_all(line.as_bytes())
                    .and_then(|_| out.write_all(b"\n"))
                    .map_err(|e| {
                        TempLogError::Journal(format!("write during compaction: {}", e))
                    })?;
                kept += 1;
            }
            out.flush()
                .map_err(|e| TempLogError::Journal(format!("flush during compaction: {}", e)))?;
        }

        std::fs::rename(&tmp_path, &path)
            .map_err(|e| TempLogError::Journal(format!("failed to swap compacted journal: {}", e)))?;
        Ok(kept)
    }

    /// Truncate the journal to empty
    pub fn clear(&mut self) -> Result<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        self.writer = None;
        File::create(&path)
            .map_err(|e| TempLogError::Journal(format!("failed to truncate journal: {}", e)))?;
        Ok(())
    }
}

/// Lazy bootstrap replay over the journal
///
/// Yields samples in stored (append) order; exhaust it, then read
/// [`Replay::replayed`] and [`Replay::skipped`] for the bootstrap report.
pub struct Replay {
    lines: Option<Lines<BufReader<File>>>,
    layout: Vec<ChannelId>,
    replayed: u64,
    skipped: u64,
}

impl Replay {
    fn empty(layout: &[ChannelId]) -> Self {
        Self {
            lines: None,
            layout: layout.to_vec(),
            replayed: 0,
            skipped: 0,
        }
    }

    /// Records successfully replayed so far
    pub fn replayed(&self) -> u64 {
        self.replayed
    }

    /// Corrupt or layout-mismatched records skipped so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl Iterator for Replay {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        let lines = self.lines.as_mut()?;
        loop {
            let line = match lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("Unreadable journal line skipped: {}", e);
                    self.skipped += 1;
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match JournalRecord::decode(&line) {
                Ok(record) if record.matches_layout(&self.layout) => {
                    self.replayed += 1;
                    return Some(record.into_sample());
                }
                Ok(_) => {
                    self.skipped += 1;
                }
                Err(_) => {
                    self.skipped += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::TempDir;

    fn layout() -> Vec<ChannelId> {
        vec![ChannelId(1), ChannelId(2)]
    }

    fn sample(ts: i64) -> Sample {
        Sample::new(ts, vec![Some(ts as f32), None])
    }

    fn journal_in(dir: &TempDir) -> SampleJournal {
        SampleJournal::open(dir.path().join("samples.jsonl")).unwrap()
    }

    #[test]
    fn test_append_replay_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut journal = journal_in(&dir);
        for ts in 1..=5 {
            journal.append(&sample(ts), &layout()).unwrap();
        }

        let mut replay = journal.replay(&layout()).unwrap();
        let samples: Vec<Sample> = replay.by_ref().collect();
        assert_eq!(samples, (1..=5).map(sample).collect::<Vec<_>>());
        assert_eq!(replay.replayed(), 5);
        assert_eq!(replay.skipped(), 0);
    }

    #[test]
    fn test_replay_skips_corrupt_lines() {
        let dir = TempDir::new().unwrap();
        let mut journal = journal_in(&dir);
        journal.append(&sample(1), &layout()).unwrap();

        // Inject a torn write and a garbage line between valid records
        {
            let mut file = OpenOptions::new()
                .append(true)
                .open(journal.path().unwrap())
                .unwrap();
            writeln!(file, "{{\"ts\":2,\"chan").unwrap();
            writeln!(file, "garbage").unwrap();
        }
        journal.append(&sample(3), &layout()).unwrap();

        let mut replay = journal.replay(&layout()).unwrap();
        let ts: Vec<i64> = replay.by_ref().map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![1, 3]);
        assert_eq!(replay.skipped(), 2);
    }

    #[test]
    fn test_replay_skips_layout_mismatch() {
        let dir = TempDir::new().unwrap();
        let mut journal = journal_in(&dir);
        journal.append(&sample(1), &layout()).unwrap();
        journal
            .append(&Sample::new(2, vec![Some(9.0)]), &[ChannelId(99)])
            .unwrap();

        let mut replay = journal.replay(&layout()).unwrap();
        let ts: Vec<i64> = replay.by_ref().map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![1]);
        assert_eq!(replay.skipped(), 1);
    }

    #[test]
    fn test_compact_drops_old_records() {
        let dir = TempDir::new().unwrap();
        let mut journal = journal_in(&dir);
        for ts in [100, 200, 300, 400] {
            journal.append(&sample(ts), &layout()).unwrap();
        }

        // Keep the last 150 seconds as of t=450
        let kept = journal.compact(150, 450).unwrap();
        assert_eq!(kept, 2);

        let ts: Vec<i64> = journal
            .replay(&layout())
            .unwrap()
            .map(|s| s.timestamp)
            .collect();
        assert_eq!(ts, vec![300, 400]);

        // Appends still work after the rewrite
        journal.append(&sample(500), &layout()).unwrap();
        assert_eq!(journal.replay(&layout()).unwrap().count(), 3);
    }

    #[test]
    fn test_clear_truncates() {
        let dir = TempDir::new().unwrap();
        let mut journal = journal_in(&dir);
        journal.append(&sample(1), &layout()).unwrap();
        journal.clear().unwrap();
        assert_eq!(journal.replay(&layout()).unwrap().count(), 0);

        journal.append(&sample(2), &layout()).unwrap();
        assert_eq!(journal.replay(&layout()).unwrap().count(), 1);
    }

    #[test]
    fn test_degraded_mode_is_inert() {
        let mut journal = SampleJournal::degraded();
        assert!(journal.is_degraded());
        journal.append(&sample(1), &layout()).unwrap();
        assert_eq!(journal.replay(&layout()).unwrap().count(), 0);
        assert_eq!(journal.compact(10, 100).unwrap(), 0);
        journal.clear().unwrap();
    }

    #[test]
    fn test_open_or_degraded_reformats_unreadable_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("samples.jsonl");
        // A directory where the file should be makes the first open fail
        std::fs::create_dir(&path).unwrap();

        let (journal, status) = SampleJournal::open_or_degraded(&path);
        // remove_file cannot delete a directory, so this lands in degraded mode
        assert_eq!(status, StorageStatus::Degraded);
        assert!(journal.is_degraded());
    }
}
