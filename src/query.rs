//! Read-only views over the ring store
//!
//! The render/interaction surface never touches [`RingStore`] directly; it
//! asks the [`QueryLayer`] for one of three views, each a thin composition
//! over the ring's accessors:
//!
//! - [`Snapshot`] - the newest sample, for the live dashboard
//! - [`Series`] - a time window with precomputed axis bounds, for the chart
//! - [`PageView`] - a newest-first page with scroll indicators, for the table
//!
//! Every view is a detached copy: the ring lock is held only while the view
//! is built, never while it is rendered.
//!
//! [`RingStore`]: crate::store::RingStore

use crate::store::SharedRing;
use crate::types::Sample;
use std::sync::PoisonError;

/// Rows per table page
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Axis bounds used when a window holds no present readings at all
pub const FALLBACK_AXIS_MIN: f32 = 0.0;
/// See [`FALLBACK_AXIS_MIN`]
pub const FALLBACK_AXIS_MAX: f32 = 40.0;

/// Minimum axis span; a flat trace still gets a visible band
const MIN_AXIS_SPAN: f32 = 1.0;

/// Chart time range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeriesRange {
    /// Last hour
    OneHour,
    /// Last six hours
    #[default]
    SixHours,
    /// Last day
    TwentyFourHours,
}

impl SeriesRange {
    /// Window length in seconds
    pub fn secs(self) -> i64 {
        match self {
            SeriesRange::OneHour => 60 * 60,
            SeriesRange::SixHours => 6 * 60 * 60,
            SeriesRange::TwentyFourHours => 24 * 60 * 60,
        }
    }

    /// Short label for range selector buttons
    pub fn label(self) -> &'static str {
        match self {
            SeriesRange::OneHour => "1h",
            SeriesRange::SixHours => "6h",
            SeriesRange::TwentyFourHours => "24h",
        }
    }

    /// The next range in the selector cycle
    pub fn next(self) -> Self {
        match self {
            SeriesRange::OneHour => SeriesRange::SixHours,
            SeriesRange::SixHours => SeriesRange::TwentyFourHours,
            SeriesRange::TwentyFourHours => SeriesRange::OneHour,
        }
    }
}

/// The newest committed sample, if any
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Newest sample, `None` when no data has been committed yet
    pub latest: Option<Sample>,
}

impl Snapshot {
    /// Timestamp of the newest sample
    pub fn timestamp(&self) -> Option<i64> {
        self.latest.as_ref().map(|s| s.timestamp)
    }

    /// Reading for one channel index; `None` when absent or disconnected
    pub fn reading(&self, channel_index: usize) -> Option<f32> {
        self.latest.as_ref().and_then(|s| s.reading(channel_index))
    }

    /// True when no sample has been committed yet
    pub fn is_empty(&self) -> bool {
        self.latest.is_none()
    }
}

/// A time window of samples with precomputed chart axis bounds
#[derive(Debug, Clone)]
pub struct Series {
    /// The range this window covers
    pub range: SeriesRange,
    /// Samples in ascending timestamp order
    pub samples: Vec<Sample>,
    /// Lowest present reading in the window, or the fallback band
    pub axis_min: f32,
    /// Highest present reading in the window, or the fallback band
    pub axis_max: f32,
}

impl Series {
    /// True when the window holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// One newest-first page of the history table
#[derive(Debug, Clone)]
pub struct PageView {
    /// Samples in newest-first order
    pub samples: Vec<Sample>,
    /// The (clamped) offset this page was built at
    pub offset: usize,
    /// Rows per page the view was built with
    pub page_size: usize,
    /// Total retained samples at build time
    pub total: usize,
    /// True when newer rows exist (offset > 0)
    pub can_scroll_up: bool,
    /// True when older rows exist (offset < max)
    pub can_scroll_down: bool,
}

/// Read-only query facade over the shared ring store
#[derive(Debug, Clone)]
pub struct QueryLayer {
    ring: SharedRing,
}

impl QueryLayer {
    /// Create a query layer over a shared ring
    pub fn new(ring: SharedRing) -> Self {
        Self { ring }
    }

    /// The live-dashboard view: newest sample per channel
    pub fn snapshot(&self) -> Snapshot {
        let ring = self.ring.read().unwrap_or_else(PoisonError::into_inner);
        Snapshot {
            latest: ring.latest().cloned(),
        }
    }

    /// The chart view: `[now - range, now]` with axis bounds
    ///
    /// Disconnected readings never contribute to the bounds. A window with
    /// no present reading at all (empty, or every channel disconnected
    /// throughout) yields the fallback band instead of a degenerate axis.
    pub fn series(&self, range: SeriesRange, now: i64) -> Series {
        let ring = self.ring.read().unwrap_or_else(PoisonError::into_inner);
        let samples: Vec<Sample> = ring.window(now - range.secs(), now).cloned().collect();

        let mut bounds: Option<(f32, f32)> = None;
        for (_, value) in samples.iter().flat_map(|s| s.present_readings()) {
            bounds = Some(match bounds {
                None => (value, value),
                Some((lo, hi)) => (lo.min(value), hi.max(value)),
            });
        }

        let (axis_min, axis_max) = match bounds {
            None => (FALLBACK_AXIS_MIN, FALLBACK_AXIS_MAX),
            Some((lo, hi)) if hi - lo < MIN_AXIS_SPAN => {
                let mid = (lo + hi) / 2.0;
                (mid - MIN_AXIS_SPAN / 2.0, mid + MIN_AXIS_SPAN / 2.0)
            }
            Some((lo, hi)) => (lo, hi),
        };

        Series {
            range,
            samples,
            axis_min,
            axis_max,
        }
    }

    /// The table view: one newest-first page plus scroll indicators
    ///
    /// An out-of-range offset is clamped to the last page rather than
    /// returning an empty view.
    pub fn page(&self, offset: usize, page_size: usize) -> PageView {
        let ring = self.ring.read().unwrap_or_else(PoisonError::into_inner);
        let max_offset = ring.max_page_offset(page_size);
        let offset = offset.min(max_offset);
        PageView {
            samples: ring.page(offset, page_size).cloned().collect(),
            offset,
            page_size,
            total: ring.len(),
            can_scroll_up: offset > 0,
            can_scroll_down: offset < max_offset,
        }
    }
}
