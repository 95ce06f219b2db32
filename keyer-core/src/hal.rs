//! Hardware Abstraction Layer for the keyer engine
//!
//! The keyer talks to its collaborators through logical roles only: it asks
//! whether an input role is active and commands the transmit key, LEDs and
//! sidetone on or off. Polarity, pin assignment and debouncing live behind
//! these traits.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;

use crate::config::KeyerConfig;
use crate::sys::Tick;
use crate::types::{InputRole, Led};

/// Error types for HAL operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// GPIO operation failed
    GpioError,
    /// PWM operation failed
    PwmError,
    /// No pin is assigned to the requested role
    NotConfigured,
}

#[cfg(feature = "std")]
impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::GpioError => write!(f, "GPIO operation failed"),
            HalError::PwmError => write!(f, "PWM operation failed"),
            HalError::NotConfigured => write!(f, "No pin configured for role"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// Logical key/paddle inputs and the transmit key output
pub trait KeyerIo {
    /// Sample raw inputs at `now`; called once per tick before any query
    ///
    /// Implementations that debounce do it here.
    fn poll(&mut self, _now: Tick) {}

    /// Returns true if `role` is currently active (polarity already applied)
    fn input_active(&mut self, role: InputRole) -> Result<bool, HalError>;

    /// Command the transmit key line on or off
    fn set_key_output(&mut self, on: bool) -> Result<(), HalError>;

    /// A new configuration snapshot was installed (e.g. output polarity changed)
    fn apply_config(&mut self, _config: &KeyerConfig) {}
}

/// Local feedback outputs
pub trait Indicators {
    /// Turn an LED on or off
    fn set_led(&mut self, led: Led, on: bool) -> Result<(), HalError>;

    /// Start or stop the sidetone
    fn set_sidetone(&mut self, on: bool) -> Result<(), HalError>;
}

/// Everything the keyer drives
pub trait KeyerHal: KeyerIo + Indicators {}

impl<T: KeyerIo + Indicators> KeyerHal for T {}

/// Electrical level that means "on"
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// On when grounded (pulled-up inputs, open-drain keying)
    #[default]
    ActiveLow,
    /// On when at Vcc
    ActiveHigh,
}

impl Polarity {
    pub const fn from_active_low(active_low: bool) -> Self {
        if active_low {
            Polarity::ActiveLow
        } else {
            Polarity::ActiveHigh
        }
    }
}

/// An embedded-hal pin with a logical on/off meaning
pub struct RolePin<P> {
    pin: P,
    polarity: Polarity,
}

impl<P> RolePin<P> {
    pub fn new(pin: P, polarity: Polarity) -> Self {
        Self { pin, polarity }
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn set_polarity(&mut self, polarity: Polarity) {
        self.polarity = polarity;
    }

    /// Release the underlying pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: InputPin> RolePin<P> {
    /// Returns true if the input is at its active level
    pub fn is_on(&mut self) -> Result<bool, HalError> {
        match self.polarity {
            Polarity::ActiveLow => self.pin.is_low(),
            Polarity::ActiveHigh => self.pin.is_high(),
        }
        .map_err(|_| HalError::GpioError)
    }
}

impl<P: OutputPin> RolePin<P> {
    /// Drive the output to its active (`on`) or inactive level
    pub fn drive(&mut self, on: bool) -> Result<(), HalError> {
        let high = match self.polarity {
            Polarity::ActiveLow => !on,
            Polarity::ActiveHigh => on,
        };
        if high {
            self.pin.set_high().map_err(|_| HalError::GpioError)
        } else {
            self.pin.set_low().map_err(|_| HalError::GpioError)
        }
    }
}

/// Sidetone driven by a PWM channel at 50% duty
pub struct PwmSidetone<T> {
    pwm: T,
    enabled: bool,
}

impl<T: SetDutyCycle> PwmSidetone<T> {
    pub fn new(pwm: T) -> Self {
        Self { pwm, enabled: true }
    }

    /// A disabled sidetone stays silent
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), HalError> {
        self.enabled = enabled;
        if !enabled {
            self.set_on(false)?;
        }
        Ok(())
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Release the PWM channel
    pub fn into_inner(self) -> T {
        self.pwm
    }

    pub fn set_on(&mut self, on: bool) -> Result<(), HalError> {
        if on && self.enabled {
            self.pwm.set_duty_cycle_percent(50)
        } else {
            self.pwm.set_duty_cycle_fully_off()
        }
        .map_err(|_| HalError::PwmError)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Mock implementations for testing

    use super::*;

    /// Number of input roles tracked by [`MockHal`]
    const ROLE_COUNT: usize = 3;

    fn role_index(role: InputRole) -> usize {
        match role {
            InputRole::StraightKey => 0,
            InputRole::PaddleLeft => 1,
            InputRole::PaddleRight => 2,
        }
    }

    /// In-memory keyer hardware
    ///
    /// Inputs are set by the test; outputs record their last commanded state
    /// and count "on" commands sent to the transmit key.
    #[derive(Debug, Default, Clone)]
    pub struct MockHal {
        inputs: [bool; ROLE_COUNT],
        failing_input: Option<InputRole>,
        key_output: bool,
        key_on_commands: usize,
        key_commands: usize,
        status_led: bool,
        key_led: bool,
        sidetone: bool,
        applied_config: Option<KeyerConfig>,
    }

    impl MockHal {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_input(&mut self, role: InputRole, active: bool) {
            self.inputs[role_index(role)] = active;
        }

        /// Make reads of `role` fail until cleared with `None`
        pub fn fail_input(&mut self, role: Option<InputRole>) {
            self.failing_input = role;
        }

        pub fn release_all(&mut self) {
            self.inputs = [false; ROLE_COUNT];
        }

        pub fn key_output(&self) -> bool {
            self.key_output
        }

        /// Number of "on" commands the transmit key received
        pub fn key_on_commands(&self) -> usize {
            self.key_on_commands
        }

        /// Number of commands of either level the transmit key received
        pub fn key_commands(&self) -> usize {
            self.key_commands
        }

        pub fn led(&self, led: Led) -> bool {
            match led {
                Led::Status => self.status_led,
                Led::Key => self.key_led,
            }
        }

        pub fn sidetone(&self) -> bool {
            self.sidetone
        }

        /// Last configuration pushed through [`KeyerIo::apply_config`]
        pub fn applied_config(&self) -> Option<&KeyerConfig> {
            self.applied_config.as_ref()
        }
    }

    impl KeyerIo for MockHal {
        fn input_active(&mut self, role: InputRole) -> Result<bool, HalError> {
            if self.failing_input == Some(role) {
                return Err(HalError::GpioError);
            }
            Ok(self.inputs[role_index(role)])
        }

        fn set_key_output(&mut self, on: bool) -> Result<(), HalError> {
            self.key_commands += 1;
            if on {
                self.key_on_commands += 1;
            }
            self.key_output = on;
            Ok(())
        }

        fn apply_config(&mut self, config: &KeyerConfig) {
            self.applied_config = Some(*config);
        }
    }

    impl Indicators for MockHal {
        fn set_led(&mut self, led: Led, on: bool) -> Result<(), HalError> {
            match led {
                Led::Status => self.status_led = on,
                Led::Key => self.key_led = on,
            }
            Ok(())
        }

        fn set_sidetone(&mut self, on: bool) -> Result<(), HalError> {
            self.sidetone = on;
            Ok(())
        }
    }
}
