//! Keyer configuration snapshot
//!
//! Persisting the snapshot (and protecting it against wear or corruption) is
//! left to the storage collaborator; the keyer only reads and updates it.

use crate::types::{Element, KeyerError, PaddleMode};
use crate::wpm::{
    self, ElementScales, DEFAULT_SCALES, ELEMENT_SCALE_MAXIMUM, ELEMENT_SCALE_MINIMUM, WPM_DEFAULT, WPM_MAXIMUM,
    WPM_MINIMUM,
};

/// Keyer configuration parameters
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyerConfig {
    /// Speed in words per minute (PARIS timing)
    pub wpm: f32,
    /// Per-element duration scale, indexed by [`Element::index`]
    pub element_scale: ElementScales,
    /// Squeeze resolution
    pub paddle_mode: PaddleMode,
    /// Right paddle sends dots and left paddle sends dashes
    pub paddle_invert: bool,
    /// Transmit key output is driven low when keyed
    pub output_active_low: bool,
    /// Run the keyer without asserting the transmit key output
    pub trainer_mode: bool,
}

impl Default for KeyerConfig {
    fn default() -> Self {
        Self {
            wpm: WPM_DEFAULT,
            element_scale: DEFAULT_SCALES,
            paddle_mode: PaddleMode::Iambic,
            paddle_invert: false,
            output_active_low: false,
            trainer_mode: false,
        }
    }
}

impl KeyerConfig {
    /// Create a new configuration with validation
    pub fn new(wpm: f32, paddle_mode: PaddleMode, paddle_invert: bool) -> Result<Self, KeyerError> {
        if !wpm::is_valid_wpm(wpm) {
            return Err(KeyerError::SpeedOutOfRange);
        }
        Ok(Self {
            wpm,
            paddle_mode,
            paddle_invert,
            ..Default::default()
        })
    }

    /// Check every field against its range
    pub fn validate(&self) -> Result<(), KeyerError> {
        if !wpm::is_valid_wpm(self.wpm) {
            return Err(KeyerError::SpeedOutOfRange);
        }
        if !self.element_scale.iter().all(|scale| wpm::is_valid_scale(*scale)) {
            return Err(KeyerError::ScaleOutOfRange);
        }
        Ok(())
    }

    pub fn wpm(&self) -> f32 {
        self.wpm
    }

    /// Set the speed, clamped to the supported range; NaN is ignored
    pub fn set_wpm(&mut self, wpm: f32) {
        if !wpm.is_nan() {
            self.wpm = wpm.clamp(WPM_MINIMUM, WPM_MAXIMUM);
        }
    }

    pub fn element_scale(&self, el: Element) -> f32 {
        self.element_scale[el.index()]
    }

    /// Set one element's scale, clamped to the supported range; NaN is ignored
    pub fn set_element_scale(&mut self, el: Element, scale: f32) {
        if !scale.is_nan() {
            self.element_scale[el.index()] = scale.clamp(ELEMENT_SCALE_MINIMUM, ELEMENT_SCALE_MAXIMUM);
        }
    }

    /// Restore every element scale to 1.0
    pub fn reset_element_scales(&mut self) {
        self.element_scale = DEFAULT_SCALES;
    }
}
