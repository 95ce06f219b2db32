#![cfg_attr(not(feature = "std"), no_std)]

//! # Keyer Core
//!
//! Real-time Morse keyer engine for small microcontrollers: a wraparound-safe
//! tick/event substrate, WPM timing, a text-to-Morse autokey queue and the
//! per-tick keyer state machine supporting iambic, ultimatic and
//! ultimatic-alternate paddle modes.

pub mod types;
pub mod sys;
pub mod wpm;
pub mod autokey;
pub mod config;
pub mod controller;
pub mod fsm;
pub mod hal;


pub use types::*;
pub use sys::{Event, EventSet, Sys, Tick};
pub use wpm::DurationTable;
pub use autokey::{AutokeyFlags, AutokeyQueue};
pub use config::KeyerConfig;
pub use controller::InputSample;
pub use fsm::{Activity, Keyer, KeyingSession};
pub use hal::{HalError, Indicators, KeyerHal, KeyerIo, Polarity, PwmSidetone, RolePin};

/// Keyer library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration for most amateur radio applications
pub fn default_config() -> KeyerConfig {
    KeyerConfig {
        wpm: wpm::WPM_DEFAULT, // 60 ms dots
        paddle_mode: PaddleMode::Iambic,
        ..KeyerConfig::default()
    }
}
