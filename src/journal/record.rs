//! Durable record format for the sample journal
//!
//! One JSON object per line, append order. Every field written must be
//! exactly recoverable on read: second-resolution timestamp, the channel id
//! list in sample order, and the per-channel optional reading (a JSON `null`
//! encodes a disconnected channel, never a sentinel number).

use crate::types::{ChannelId, Sample};
use serde::{Deserialize, Serialize};

/// One persisted sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Wall-clock timestamp, Unix seconds
    pub ts: i64,
    /// Channel ids in reading order, so a layout change is detectable
    pub channels: Vec<ChannelId>,
    /// Per-channel readings; `null` means disconnected
    pub readings: Vec<Option<f32>>,
}

impl JournalRecord {
    /// Build a record from a sample and its channel layout
    pub fn from_sample(sample: &Sample, layout: &[ChannelId]) -> Self {
        Self {
            ts: sample.timestamp,
            channels: layout.to_vec(),
            readings: sample.readings.clone(),
        }
    }

    /// Encode as a single JSON line (no trailing newline)
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode from a JSON line
    pub fn decode(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    /// True if this record was written under the given channel layout
    pub fn matches_layout(&self, layout: &[ChannelId]) -> bool {
        self.channels == layout && self.readings.len() == self.channels.len()
    }

    /// Convert back into an in-memory sample
    pub fn into_sample(self) -> Sample {
        Sample::new(self.ts, self.readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Vec<ChannelId> {
        vec![ChannelId(0x28ff01), ChannelId(0x28ff02)]
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let sample = Sample::new(1_700_000_060, vec![Some(20.5), None]);
        let record = JournalRecord::from_sample(&sample, &layout());

        let line = record.encode().unwrap();
        assert!(!line.contains('\n'));

        let decoded = JournalRecord::decode(&line).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.into_sample(), sample);
    }

    #[test]
    fn test_disconnected_encodes_as_null() {
        let sample = Sample::new(10, vec![None, Some(1.0)]);
        let line = JournalRecord::from_sample(&sample, &layout())
            .encode()
            .unwrap();
        assert!(line.contains("null"));
    }

    #[test]
    fn test_layout_mismatch_detected() {
        let sample = Sample::new(10, vec![Some(1.0), Some(2.0)]);
        let record = JournalRecord::from_sample(&sample, &layout());

        assert!(record.matches_layout(&layout()));
        assert!(!record.matches_layout(&[ChannelId(0x28ff01)]));
        assert!(!record.matches_layout(&[ChannelId(0x28ff01), ChannelId(0xdead)]));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(JournalRecord::decode("not json").is_err());
        assert!(JournalRecord::decode("{\"ts\":true}").is_err());
    }
}
