//! Keyer state machine
//!
//! [`Keyer::evaluate`] runs once per scheduling tick: it selects the next
//! [`KeyerState`] from the inputs and the autokey queue, then executes that
//! state against the keying session. Element start and stop deadlines are
//! compared with the wraparound-safe tick ordering, so late or skipped ticks
//! only shift an element, never wedge it.

use crate::autokey::{AutokeyFlags, AutokeyQueue, AUTOKEY_QUEUE_LEN};
use crate::config::KeyerConfig;
use crate::controller::{select_state, InputSample, PaddleTracker};
use crate::hal::KeyerHal;
use crate::sys::{is_tick_gte, Tick};
use crate::types::{Element, KeyerError, KeyerState, Led, PaddleMode};
use crate::wpm::{DurationTable, TimingCache};

/// What the key line is currently doing
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Activity {
    /// Nothing sent since the last idle reset
    #[default]
    Idle,
    /// Held down by the straight key, duration unknown
    Manual,
    /// A timed element
    Element(Element),
}

impl Activity {
    /// Returns true for a timed dot or dash
    pub fn is_keyed_element(self) -> bool {
        matches!(self, Activity::Element(el) if el.is_keyed())
    }
}

/// Bookkeeping for the element in progress
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyingSession {
    /// Element currently being sent
    pub element: Activity,
    /// Last keyed element, which owns the spacing that follows it
    pub lockout: Activity,
    /// Tick at which the keyed element must stop
    pub stop_at: Option<Tick>,
    /// Tick from which the next element may start
    pub next_start_at: Option<Tick>,
}

impl KeyingSession {
    pub const IDLE: KeyingSession = KeyingSession {
        element: Activity::Idle,
        lockout: Activity::Idle,
        stop_at: None,
        next_start_at: None,
    };

    /// True once `now` reaches the stop deadline, or if there is none
    pub fn stop_passed(&self, now: Tick) -> bool {
        self.stop_at.map_or(true, |at| is_tick_gte(now, at))
    }

    /// True once `now` reaches the next-start deadline, or if there is none
    pub fn start_passed(&self, now: Tick) -> bool {
        self.next_start_at.map_or(true, |at| is_tick_gte(now, at))
    }
}

/// The keyer engine
///
/// Owns its hardware collaborator, configuration snapshot, timing cache and
/// autokey queue. `Q` is the autokey ring size in slots.
pub struct Keyer<H, const Q: usize = AUTOKEY_QUEUE_LEN> {
    hal: H,
    config: KeyerConfig,
    timing: TimingCache,
    autokey: AutokeyQueue<Q>,
    state: KeyerState,
    session: KeyingSession,
    paddles: PaddleTracker,
    keyed: bool,
    panicked: bool,
}

impl<H: KeyerHal, const Q: usize> Keyer<H, Q> {
    /// Create a keyer; call [`Keyer::initialize`] before the first tick
    pub fn new(hal: H, config: KeyerConfig) -> Self {
        Self {
            hal,
            timing: TimingCache::new(config.wpm, &config.element_scale),
            config,
            autokey: AutokeyQueue::new(),
            state: KeyerState::Off,
            session: KeyingSession::IDLE,
            paddles: PaddleTracker::new(),
            keyed: false,
            panicked: false,
        }
    }

    /// Reset to idle with the key released
    pub fn initialize(&mut self) {
        self.state = KeyerState::Off;
        self.session = KeyingSession::IDLE;
        self.paddles.reset();
        self.autokey.clear();
        self.panicked = false;
        self.timing = TimingCache::new(self.config.wpm, &self.config.element_scale);
        self.set_keyed(false);

        #[cfg(feature = "defmt")]
        defmt::info!("🔑 Keyer initialized: {} WPM, {:?}", self.config.wpm, self.config.paddle_mode);
    }

    /// Abort: release the key now and drop queued autokey text
    ///
    /// Keying stays suppressed until the next state transition.
    pub fn panic(&mut self) {
        self.panicked = true;
        self.autokey.clear();
        self.set_keyed(false);

        #[cfg(feature = "defmt")]
        defmt::warn!("🛑 Keyer panic");
    }

    /// Per-tick entry point: select the next state, then execute it
    pub fn evaluate(&mut self, now: Tick) {
        self.timing.refresh(now, self.config.wpm, &self.config.element_scale);
        self.hal.poll(now);

        let input = match InputSample::read(&mut self.hal) {
            Ok(input) => input,
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("⚠️ Input read failed: {:?}", _e);
                InputSample::IDLE
            }
        };
        let prev = self.paddles.advance(input);

        let next = select_state(
            !self.autokey.is_empty(),
            input,
            prev,
            self.state,
            self.config.paddle_mode,
            self.config.paddle_invert,
        );
        let new_state = next != self.state;
        if new_state {
            #[cfg(feature = "defmt")]
            defmt::debug!("🔀 {:?} -> {:?}", self.state, next);
            self.state = next;
            self.panicked = false;
        }

        match self.state {
            KeyerState::Off => self.run_off(now),
            KeyerState::On => self.run_on(new_state),
            KeyerState::Dots => self.run_paddle(now, Element::Dot),
            KeyerState::Dashes => self.run_paddle(now, Element::Dash),
            KeyerState::Interleaved => {
                let el = if self.session.lockout == Activity::Element(Element::Dot) {
                    Element::Dash
                } else {
                    Element::Dot
                };
                self.run_paddle(now, el);
            }
            KeyerState::Autokey => self.run_autokey(now),
        }
    }

    fn run_off(&mut self, now: Tick) {
        if self.keyed && self.session.stop_passed(now) {
            self.set_keyed(false);
        }
        if self.session.element != Activity::Idle && self.session.start_passed(now) {
            self.session = KeyingSession::IDLE;
        }
    }

    fn run_on(&mut self, new_state: bool) {
        if !self.panicked && (new_state || !self.keyed) {
            self.session = KeyingSession {
                element: Activity::Manual,
                lockout: Activity::Manual,
                stop_at: None,
                next_start_at: None,
            };
            self.set_keyed(true);
        }
    }

    /// Single-element cadence shared by dots, dashes and interleaved
    fn run_paddle(&mut self, now: Tick, el: Element) {
        if !self.panicked && self.session.start_passed(now) && !self.keyed {
            self.begin_keyed(now, el);
        } else if self.session.stop_passed(now) && self.keyed {
            self.set_keyed(false);
        }
    }

    fn run_autokey(&mut self, now: Tick) {
        if !self.panicked && self.session.start_passed(now) {
            if let Some(el) = self.autokey.dequeue() {
                if el.is_keyed() {
                    self.begin_keyed(now, el);
                } else {
                    self.begin_space(now, el);
                }
                return;
            }
        }
        if self.session.stop_passed(now) && self.keyed {
            self.set_keyed(false);
        }
    }

    fn begin_keyed(&mut self, now: Tick, el: Element) {
        let table = *self.timing.table();
        let stop = now.wrapping_add(table.get(el));
        self.session = KeyingSession {
            element: Activity::Element(el),
            lockout: Activity::Element(el),
            stop_at: Some(stop),
            next_start_at: Some(stop.wrapping_add(table.element_space())),
        };
        self.set_keyed(true);
    }

    /// Queue a silent element
    ///
    /// The element-space already waited out after the last keyed element
    /// counts toward this gap, and a letter-space that just ran counts toward
    /// a following space.
    fn begin_space(&mut self, now: Tick, el: Element) {
        let table: DurationTable = *self.timing.table();
        let after_letter_space = self.session.element == Activity::Element(Element::LetterSpace);
        let after_keyed = self.session.lockout.is_keyed_element();

        let mut start = now.wrapping_add(table.get(el));
        if after_keyed {
            start = start.wrapping_sub(table.element_space());
        }
        if after_letter_space {
            start = start.wrapping_sub(table.letter_space().wrapping_sub(table.element_space()));
        }

        self.session.element = Activity::Element(el);
        self.session.stop_at = None;
        self.session.next_start_at = Some(start);
    }

    fn set_keyed(&mut self, keyed: bool) {
        self.keyed = keyed;
        self.sync_outputs();
    }

    /// Drive the key output, key LED and sidetone from the keyed flag
    fn sync_outputs(&mut self) {
        let output = self.keyed && !self.config.trainer_mode;
        if let Err(_e) = self.hal.set_key_output(output) {
            #[cfg(feature = "defmt")]
            defmt::warn!("⚠️ Key output failed: {:?}", _e);
        }
        if let Err(_e) = self.hal.set_led(Led::Key, self.keyed) {
            #[cfg(feature = "defmt")]
            defmt::warn!("⚠️ Key LED failed: {:?}", _e);
        }
        if let Err(_e) = self.hal.set_sidetone(self.keyed) {
            #[cfg(feature = "defmt")]
            defmt::warn!("⚠️ Sidetone failed: {:?}", _e);
        }

        #[cfg(feature = "defmt")]
        defmt::trace!("🔑 Key: {}", if self.keyed { "DOWN" } else { "UP" });
    }

    /// Queue one character for autokey
    pub fn enqueue_char(&mut self, c: char) -> Result<(), KeyerError> {
        self.enqueue_char_ex(c, AutokeyFlags::NONE)
    }

    pub fn enqueue_char_ex(&mut self, c: char, flags: AutokeyFlags) -> Result<(), KeyerError> {
        self.autokey.enqueue_char(c, flags)
    }

    /// Queue text for autokey; returns the number of characters accepted
    pub fn enqueue_string(&mut self, s: &str) -> usize {
        self.enqueue_string_ex(s, AutokeyFlags::NONE)
    }

    pub fn enqueue_string_ex(&mut self, s: &str, flags: AutokeyFlags) -> usize {
        self.autokey.enqueue_str(s, flags)
    }

    /// Queue a raw element for autokey
    pub fn enqueue_element(&mut self, el: Element) -> Result<(), KeyerError> {
        self.autokey.enqueue(el)
    }

    /// Elements waiting in the autokey queue
    pub fn autokey_count(&self) -> usize {
        self.autokey.len()
    }

    /// Free autokey slots
    pub fn autokey_available(&self) -> usize {
        self.autokey.available()
    }

    /// Logical keyed flag
    pub fn is_keyed(&self) -> bool {
        self.keyed
    }

    pub fn is_panicked(&self) -> bool {
        self.panicked
    }

    pub fn state(&self) -> KeyerState {
        self.state
    }

    pub fn session(&self) -> &KeyingSession {
        &self.session
    }

    /// Element durations currently in effect
    pub fn timing(&self) -> &DurationTable {
        self.timing.table()
    }

    pub fn config(&self) -> &KeyerConfig {
        &self.config
    }

    /// Replace the whole configuration snapshot
    ///
    /// The hardware collaborator sees the new snapshot before outputs are
    /// resynced, so a polarity change applies to the very next key command.
    pub fn set_config(&mut self, config: KeyerConfig) {
        self.config = config;
        self.timing.invalidate();
        self.hal.apply_config(&self.config);
        self.sync_outputs();
    }

    pub fn set_wpm(&mut self, wpm: f32) {
        self.config.set_wpm(wpm);
    }

    pub fn set_element_scale(&mut self, el: Element, scale: f32) {
        self.config.set_element_scale(el, scale);
    }

    pub fn reset_element_scales(&mut self) {
        self.config.reset_element_scales();
    }

    pub fn paddle_mode(&self) -> PaddleMode {
        self.config.paddle_mode
    }

    pub fn set_paddle_mode(&mut self, mode: PaddleMode) {
        self.config.paddle_mode = mode;
    }

    pub fn paddle_invert(&self) -> bool {
        self.config.paddle_invert
    }

    pub fn set_paddle_invert(&mut self, invert: bool) {
        self.config.paddle_invert = invert;
    }

    pub fn trainer_mode(&self) -> bool {
        self.config.trainer_mode
    }

    /// Enable or disable trainer mode; outputs update immediately
    pub fn set_trainer_mode(&mut self, enabled: bool) {
        self.config.trainer_mode = enabled;
        self.sync_outputs();
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }
}
