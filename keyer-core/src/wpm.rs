//! Words-per-minute to element duration conversion
//!
//! Timing follows the PARIS standard: one word is 50 units, so at `wpm` words
//! per minute one unit lasts `60_000 / (wpm * 50)` milliseconds.

use micromath::F32Ext;

use crate::sys::{elapsed, Tick, TICKS_PER_MSEC};
use crate::types::{Element, KeyerError};

/// Slowest supported speed
pub const WPM_MINIMUM: f32 = 1.0;
/// Fastest supported speed
pub const WPM_MAXIMUM: f32 = 100.0;
/// Power-on speed
pub const WPM_DEFAULT: f32 = 20.0;

/// Smallest per-element duration scale
pub const ELEMENT_SCALE_MINIMUM: f32 = 0.1;
/// Largest per-element duration scale
pub const ELEMENT_SCALE_MAXIMUM: f32 = 10.0;
/// Neutral per-element duration scale
pub const ELEMENT_SCALE_DEFAULT: f32 = 1.0;

/// Length of the reference word "PARIS" in units
const WORD_UNIT_LENGTH: f32 = 50.0;
const MSEC_PER_MIN: f32 = 60_000.0;

/// Minimum ticks between two recomputations of the cached table
pub const REFRESH_INTERVAL: Tick = 50 * TICKS_PER_MSEC;

/// Scale factor for each element, indexed by [`Element::index`]
pub type ElementScales = [f32; Element::COUNT];

/// Neutral scales for every element
pub const DEFAULT_SCALES: ElementScales = [ELEMENT_SCALE_DEFAULT; Element::COUNT];

/// Duration of every element in ticks
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DurationTable {
    ticks: [Tick; Element::COUNT],
}

impl DurationTable {
    /// Build a table from explicit tick counts, indexed by [`Element::index`]
    pub const fn from_ticks(ticks: [Tick; Element::COUNT]) -> Self {
        Self { ticks }
    }

    pub const fn get(&self, el: Element) -> Tick {
        self.ticks[el.index()]
    }

    pub const fn dot(&self) -> Tick {
        self.get(Element::Dot)
    }

    pub const fn dash(&self) -> Tick {
        self.get(Element::Dash)
    }

    pub const fn element_space(&self) -> Tick {
        self.get(Element::ElementSpace)
    }

    pub const fn letter_space(&self) -> Tick {
        self.get(Element::LetterSpace)
    }

    pub const fn word_space(&self) -> Tick {
        self.get(Element::WordSpace)
    }
}

/// Returns true if `wpm` is a usable speed
pub fn is_valid_wpm(wpm: f32) -> bool {
    (WPM_MINIMUM..=WPM_MAXIMUM).contains(&wpm)
}

/// Returns true if `scale` is a usable element scale
pub fn is_valid_scale(scale: f32) -> bool {
    (ELEMENT_SCALE_MINIMUM..=ELEMENT_SCALE_MAXIMUM).contains(&scale)
}

/// Duration of one Morse unit in milliseconds
pub fn unit_ms(wpm: f32) -> Result<f32, KeyerError> {
    if !is_valid_wpm(wpm) {
        return Err(KeyerError::SpeedOutOfRange);
    }
    Ok(MSEC_PER_MIN / (wpm * WORD_UNIT_LENGTH))
}

/// Compute the tick duration of every element
///
/// Each element lasts `units * unit_ms * scale`, rounded to the nearest tick.
/// This does floating point math; cache the result with [`TimingCache`].
pub fn compute(wpm: f32, scales: &ElementScales) -> Result<DurationTable, KeyerError> {
    let unit = unit_ms(wpm)?;
    if !scales.iter().all(|scale| is_valid_scale(*scale)) {
        return Err(KeyerError::ScaleOutOfRange);
    }

    let mut ticks = [0; Element::COUNT];
    for el in Element::ALL {
        let ms = el.units() as f32 * unit * scales[el.index()];
        ticks[el.index()] = F32Ext::round(ms * TICKS_PER_MSEC as f32) as Tick;
    }
    Ok(DurationTable { ticks })
}

/// Lazily refreshed [`DurationTable`]
///
/// The table is only recomputed when the speed or scales differ from the last
/// computation, and never more often than [`REFRESH_INTERVAL`]. Callers must
/// tolerate a table that lags a setting change by up to one interval.
#[derive(Copy, Clone, Debug)]
pub struct TimingCache {
    table: DurationTable,
    wpm: f32,
    scales: ElementScales,
    computed_at: Option<Tick>,
}

impl TimingCache {
    /// Create a cache primed for `wpm` and `scales`
    ///
    /// Out-of-range inputs leave an all-zero table until a valid refresh.
    pub fn new(wpm: f32, scales: &ElementScales) -> Self {
        Self {
            table: compute(wpm, scales).unwrap_or_default(),
            wpm,
            scales: *scales,
            computed_at: None,
        }
    }

    pub fn table(&self) -> &DurationTable {
        &self.table
    }

    /// Tick of the last refresh check that was allowed to run
    pub fn computed_at(&self) -> Option<Tick> {
        self.computed_at
    }

    /// Force the next [`TimingCache::refresh`] to run regardless of interval
    pub fn invalidate(&mut self) {
        self.computed_at = None;
    }

    /// Recompute the table if it is stale; returns true if it changed
    pub fn refresh(&mut self, now: Tick, wpm: f32, scales: &ElementScales) -> bool {
        if let Some(at) = self.computed_at {
            if elapsed(now, at) < REFRESH_INTERVAL {
                return false;
            }
        }
        self.computed_at = Some(now);

        if wpm == self.wpm && *scales == self.scales && self.table != DurationTable::default() {
            return false;
        }

        match compute(wpm, scales) {
            Ok(table) => {
                self.wpm = wpm;
                self.scales = *scales;
                let changed = table != self.table;
                self.table = table;
                #[cfg(feature = "defmt")]
                if changed {
                    defmt::debug!("⏱️ Timing: dot={} dash={} ticks", table.dot(), table.dash());
                }
                changed
            }
            // Keep serving the last good table
            Err(_) => false,
        }
    }
}
