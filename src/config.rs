//! Settings persistence for the appliance
//!
//! This module handles the small structured configuration that survives
//! resets: sampling interval, channel display names, deep-sleep and
//! connectivity toggles, and calibration constants.
//!
//! # Files
//!
//! - `settings.json` - the full settings document, overwritten wholesale on
//!   each save (write-to-temp-then-rename, so an unclean power loss never
//!   exposes a half-written file)
//! - `templog.toml` - optional operator-editable override file merged over
//!   the stored settings at load time
//! - `samples.jsonl` - the sample journal (owned by [`crate::journal`])
//!
//! All live in the platform data directory under `dev.hxyulin.templog-rs`.
//!
//! # Validation
//!
//! `load` returns a fully-populated value no matter what is on disk: missing
//! or unparseable fields fall back to hard defaults, the sampling interval
//! is clamped to [10, 600] seconds, the channel list is clamped to at most
//! [`MAX_CHANNELS`] entries, and unnamed channels are synthesized as
//! "Sensor N".

use crate::error::{Result, TempLogError};
use crate::types::{default_channel_name, Channel, MAX_CHANNELS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.hxyulin.templog-rs";

/// Settings filename
pub const SETTINGS_FILE: &str = "settings.json";

/// Operator override filename
pub const OVERRIDE_FILE: &str = "templog.toml";

/// Journal filename
pub const JOURNAL_FILE: &str = "samples.jsonl";

/// Minimum sampling interval in seconds
pub const MIN_SAMPLE_INTERVAL_SECS: u32 = 10;

/// Maximum sampling interval in seconds
pub const MAX_SAMPLE_INTERVAL_SECS: u32 = 600;

/// Default sampling interval in seconds
pub const DEFAULT_SAMPLE_INTERVAL_SECS: u32 = 60;

/// Default journal retention in days
pub const DEFAULT_RETAIN_DAYS: u32 = 30;

/// Shared handle to the settings, mutated by the interaction surface and
/// re-read by the sampler at the start of every cycle
pub type SharedSettings = Arc<RwLock<Settings>>;

/// Create a shared settings handle
pub fn shared_settings(settings: Settings) -> SharedSettings {
    Arc::new(RwLock::new(settings))
}

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        TempLogError::Settings("could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            TempLogError::Settings(format!("failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

// ==================== Settings ====================

/// Persisted appliance settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Version for future migration support
    #[serde(default = "default_settings_version")]
    pub version: u32,

    /// Sampling interval in seconds, clamped to [10, 600]
    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: u32,

    /// Journal retention in days (time-based; compaction enforces it)
    #[serde(default = "default_retain_days")]
    pub retain_days: u32,

    /// Known channels with their display names, at most [`MAX_CHANNELS`]
    #[serde(default)]
    pub channels: Vec<Channel>,

    /// Whether the appliance may deep-sleep between samples
    #[serde(default)]
    pub deep_sleep_enabled: bool,

    /// Calibration constants
    #[serde(default)]
    pub calibration: Calibration,

    /// Peripheral connectivity toggles
    #[serde(default)]
    pub connectivity: Connectivity,
}

fn default_settings_version() -> u32 {
    1
}

fn default_sample_interval() -> u32 {
    DEFAULT_SAMPLE_INTERVAL_SECS
}

fn default_retain_days() -> u32 {
    DEFAULT_RETAIN_DAYS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            sample_interval_secs: DEFAULT_SAMPLE_INTERVAL_SECS,
            retain_days: DEFAULT_RETAIN_DAYS,
            channels: Vec::new(),
            deep_sleep_enabled: false,
            calibration: Calibration::default(),
            connectivity: Connectivity::default(),
        }
    }
}

impl Settings {
    /// Clamp out-of-range fields and synthesize missing channel names
    ///
    /// Configuration problems are never fatal: they are absorbed here.
    pub fn validate(&mut self) {
        self.sample_interval_secs = self
            .sample_interval_secs
            .clamp(MIN_SAMPLE_INTERVAL_SECS, MAX_SAMPLE_INTERVAL_SECS);
        self.retain_days = self.retain_days.max(1);
        self.channels.truncate(MAX_CHANNELS);
        for (index, channel) in self.channels.iter_mut().enumerate() {
            if channel.name.trim().is_empty() {
                channel.name = default_channel_name(index);
            }
        }
    }

    /// Journal retention in seconds
    pub fn retain_secs(&self) -> i64 {
        i64::from(self.retain_days) * 24 * 60 * 60
    }

    /// Display name for a channel index ("Sensor N" when unnamed)
    pub fn channel_name(&self, index: usize) -> String {
        self.channels
            .get(index)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| default_channel_name(index))
    }

    /// Load settings from `path`
    ///
    /// Missing file yields defaults; unparseable content is an error the
    /// caller may absorb via [`Settings::load_or_default`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| TempLogError::Settings(format!("failed to read settings: {}", e)))?;

        let mut settings: Settings = serde_json::from_str(&content)
            .map_err(|e| TempLogError::Settings(format!("failed to parse settings: {}", e)))?;
        settings.validate();
        Ok(settings)
    }

    /// Load settings, returning all-default values on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the full structure atomically
    ///
    /// Writes to a temporary sibling and renames it into place so a reader
    /// after an unclean power loss sees either the old or the new document,
    /// never a partial one.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                TempLogError::Settings(format!("failed to create settings directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| TempLogError::Settings(format!("failed to serialize settings: {}", e)))?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)
            .map_err(|e| TempLogError::Settings(format!("failed to write settings: {}", e)))?;
        std::fs::rename(&tmp_path, path)
            .map_err(|e| TempLogError::Settings(format!("failed to swap settings file: {}", e)))
    }

    /// Merge an operator override file over these settings
    pub fn apply_override(&mut self, ov: &SettingsOverride) {
        if let Some(interval) = ov.sample_interval_secs {
            self.sample_interval_secs = interval;
        }
        if let Some(days) = ov.retain_days {
            self.retain_days = days;
        }
        if let Some(deep_sleep) = ov.deep_sleep_enabled {
            self.deep_sleep_enabled = deep_sleep;
        }
        if let Some(wifi) = ov.wifi_enabled {
            self.connectivity.wifi_enabled = wifi;
        }
        if let Some(bluetooth) = ov.bluetooth_enabled {
            self.connectivity.bluetooth_enabled = bluetooth;
        }
        self.validate();
    }
}

// ==================== Calibration ====================

/// Opaque calibration constants persisted for the hardware collaborators
///
/// The core never interprets these; it only stores them for the touch panel
/// and battery gauge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Touch panel affine transform coefficients
    #[serde(default = "default_touch_transform")]
    pub touch_transform: [f32; 6],

    /// Battery voltage at 0% charge, millivolts
    #[serde(default = "default_battery_mv_empty")]
    pub battery_mv_empty: u32,

    /// Battery voltage at 100% charge, millivolts
    #[serde(default = "default_battery_mv_full")]
    pub battery_mv_full: u32,
}

fn default_touch_transform() -> [f32; 6] {
    [1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
}

fn default_battery_mv_empty() -> u32 {
    3300
}

fn default_battery_mv_full() -> u32 {
    4200
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            touch_transform: default_touch_transform(),
            battery_mv_empty: default_battery_mv_empty(),
            battery_mv_full: default_battery_mv_full(),
        }
    }
}

// ==================== Connectivity ====================

/// Peripheral toggles with no bearing on the core logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Connectivity {
    /// WiFi radio enabled (used for network time sync when available)
    #[serde(default)]
    pub wifi_enabled: bool,

    /// Bluetooth radio enabled
    #[serde(default)]
    pub bluetooth_enabled: bool,
}

// ==================== Operator override file ====================

/// Optional operator-editable override file (`templog.toml`)
///
/// Every field is optional; absent fields leave the stored settings alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsOverride {
    pub sample_interval_secs: Option<u32>,
    pub retain_days: Option<u32>,
    pub deep_sleep_enabled: Option<bool>,
    pub wifi_enabled: Option<bool>,
    pub bluetooth_enabled: Option<bool>,
}

impl SettingsOverride {
    /// Load the override file; a missing file is an empty override
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| TempLogError::Settings(format!("failed to read override file: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| TempLogError::Settings(format!("failed to parse override file: {}", e)))
    }
}
