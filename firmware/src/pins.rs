//! Board pin adapters
//!
//! [`PinBoard`] turns a set of embedded-hal pins into the keyer's logical
//! collaborators. Any number of input pins (up to [`MAX_INPUT_PINS`]) may share
//! a role; the role is on when any of its pins is on. Inputs are debounced on
//! the keyer tick: the first edge is taken immediately, further edges are
//! ignored until the debounce window has passed.

use cwkeyer_core::hal::{HalError, Indicators, KeyerIo, Polarity, PwmSidetone, RolePin};
use cwkeyer_core::sys::{elapsed, Tick, TICKS_PER_MSEC};
use cwkeyer_core::{InputRole, KeyerConfig, Led};
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;
use heapless::Vec;

/// Input pins a board can route to roles
pub const MAX_INPUT_PINS: usize = 8;

/// Default debounce window
pub const DEFAULT_DEBOUNCE: Tick = 10 * TICKS_PER_MSEC;

/// Longest accepted debounce window
pub const MAX_DEBOUNCE: Tick = 100 * TICKS_PER_MSEC;

/// An input pin assigned to a role, with debouncing
pub struct DebouncedInput<P> {
    pin: RolePin<P>,
    role: InputRole,
    stable: bool,
    last_edge: Option<Tick>,
    debounce: Tick,
    failed: bool,
}

impl<P: InputPin> DebouncedInput<P> {
    pub fn new(role: InputRole, pin: RolePin<P>, debounce: Tick) -> Self {
        Self {
            pin,
            role,
            stable: false,
            last_edge: None,
            debounce: debounce.min(MAX_DEBOUNCE),
            failed: false,
        }
    }

    pub fn role(&self) -> InputRole {
        self.role
    }

    /// Debounced level as of the last sample
    pub fn is_on(&self) -> bool {
        self.stable
    }

    /// True if the last sample could not read the pin
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Read the pin and update the debounced level
    pub fn sample(&mut self, now: Tick) -> Result<bool, HalError> {
        let level = match self.pin.is_on() {
            Ok(level) => level,
            Err(e) => {
                self.failed = true;
                return Err(e);
            }
        };
        self.failed = false;

        if level != self.stable {
            if let Some(edge) = self.last_edge {
                if elapsed(now, edge) < self.debounce {
                    // Still bouncing, keep the last stable level
                    return Ok(self.stable);
                }
            }
            self.stable = level;
            self.last_edge = Some(now);
        }

        Ok(self.stable)
    }
}

fn led_index(led: Led) -> usize {
    match led {
        Led::Status => 0,
        Led::Key => 1,
    }
}

/// Board setup options
#[derive(Clone, Copy, Debug)]
pub struct PinBoardConfig {
    /// Debounce window for every input
    pub debounce: Tick,
    /// Level at which inputs read as on
    pub input_polarity: Polarity,
    /// Level at which the transmit key is on
    pub key_polarity: Polarity,
}

impl Default for PinBoardConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            input_polarity: Polarity::ActiveLow,
            key_polarity: Polarity::ActiveHigh,
        }
    }
}

impl PinBoardConfig {
    /// Board options matching a keyer configuration snapshot
    pub fn for_keyer(config: &KeyerConfig) -> Self {
        Self {
            key_polarity: Polarity::from_active_low(config.output_active_low),
            ..Self::default()
        }
    }
}

/// Complete keyer hardware: role inputs, key line, LEDs and sidetone
pub struct PinBoard<I, O, T> {
    inputs: Vec<DebouncedInput<I>, MAX_INPUT_PINS>,
    key: RolePin<O>,
    status_led: RolePin<O>,
    key_led: RolePin<O>,
    sidetone: PwmSidetone<T>,
    led_enabled: [bool; 2],
    config: PinBoardConfig,
}

impl<I, O, T> PinBoard<I, O, T>
where
    I: InputPin,
    O: OutputPin,
    T: SetDutyCycle,
{
    /// Build a board with no inputs assigned yet; LEDs are active high
    pub fn new(key: O, status_led: O, key_led: O, sidetone: T, config: PinBoardConfig) -> Self {
        #[cfg(feature = "defmt")]
        defmt::info!("🔧 Initializing keyer pins");

        Self {
            inputs: Vec::new(),
            key: RolePin::new(key, config.key_polarity),
            status_led: RolePin::new(status_led, Polarity::ActiveHigh),
            key_led: RolePin::new(key_led, Polarity::ActiveHigh),
            sidetone: PwmSidetone::new(sidetone),
            led_enabled: [true; 2],
            config,
        }
    }

    /// Route an input pin to `role`
    ///
    /// Fails with [`HalError::NotConfigured`] once every input slot is taken.
    pub fn add_input(&mut self, role: InputRole, pin: I) -> Result<(), HalError> {
        let pin = RolePin::new(pin, self.config.input_polarity);
        self.inputs
            .push(DebouncedInput::new(role, pin, self.config.debounce))
            .map_err(|_| HalError::NotConfigured)
    }

    /// Number of input pins routed to `role`
    pub fn input_count(&self, role: InputRole) -> usize {
        self.inputs.iter().filter(|input| input.role() == role).count()
    }

    /// Change the key line polarity; takes effect on the next key command
    pub fn set_key_polarity(&mut self, polarity: Polarity) {
        self.key.set_polarity(polarity);
    }

    /// Mute or unmute the sidetone
    pub fn set_sidetone_enabled(&mut self, enabled: bool) -> Result<(), HalError> {
        self.sidetone.set_enabled(enabled)
    }

    /// Enable or disable an LED; a disabled LED is driven off and stays off
    pub fn set_led_enabled(&mut self, led: Led, enabled: bool) -> Result<(), HalError> {
        self.led_enabled[led_index(led)] = enabled;
        if !enabled {
            self.led_pin(led).drive(false)?;
        }
        Ok(())
    }

    pub fn led_enabled(&self, led: Led) -> bool {
        self.led_enabled[led_index(led)]
    }

    fn led_pin(&mut self, led: Led) -> &mut RolePin<O> {
        match led {
            Led::Status => &mut self.status_led,
            Led::Key => &mut self.key_led,
        }
    }

    /// Release every pin
    pub fn release(self) -> (Vec<I, MAX_INPUT_PINS>, O, O, O, T) {
        let inputs = self.inputs.into_iter().map(|input| input.pin.into_inner()).collect();
        (
            inputs,
            self.key.into_inner(),
            self.status_led.into_inner(),
            self.key_led.into_inner(),
            self.sidetone.into_inner(),
        )
    }
}

impl<I, O, T> KeyerIo for PinBoard<I, O, T>
where
    I: InputPin,
    O: OutputPin,
    T: SetDutyCycle,
{
    fn poll(&mut self, now: Tick) {
        for input in self.inputs.iter_mut() {
            if let Err(_e) = input.sample(now) {
                #[cfg(feature = "defmt")]
                defmt::warn!("⚠️ Input {:?} read failed: {:?}", input.role(), _e);
            }
        }
    }

    /// A role with a pin that failed its last read reports the failure
    fn input_active(&mut self, role: InputRole) -> Result<bool, HalError> {
        let mut active = false;
        for input in self.inputs.iter().filter(|input| input.role() == role) {
            if input.failed() {
                return Err(HalError::GpioError);
            }
            active |= input.is_on();
        }
        Ok(active)
    }

    fn apply_config(&mut self, config: &KeyerConfig) {
        self.set_key_polarity(Polarity::from_active_low(config.output_active_low));
    }

    fn set_key_output(&mut self, on: bool) -> Result<(), HalError> {
        self.key.drive(on)?;

        #[cfg(feature = "defmt")]
        defmt::trace!("🔑 Key output: {}", if on { "DOWN" } else { "UP" });

        Ok(())
    }
}

impl<I, O, T> Indicators for PinBoard<I, O, T>
where
    I: InputPin,
    O: OutputPin,
    T: SetDutyCycle,
{
    fn set_led(&mut self, led: Led, on: bool) -> Result<(), HalError> {
        let on = on && self.led_enabled(led);
        self.led_pin(led).drive(on)
    }

    fn set_sidetone(&mut self, on: bool) -> Result<(), HalError> {
        self.sidetone.set_on(on)
    }
}
