#![no_std]

//! Firmware library: the cooperative main loop and board adapters
//!
//! Interrupt handlers only touch the shared [`Sys`]; everything else runs in
//! [`App`] on the single mainline context, woken by [`Sys::wait`].

pub use cwkeyer_core::*;

pub use crate::app::*;
pub use crate::pins::*;
pub use crate::schedule::*;

// Periodic dividers
pub mod schedule {
    use cwkeyer_core::sys::{is_tick_gt, is_tick_gte, Tick, TICKS_PER_MSEC, TICKS_PER_SEC};

    /// Keyer evaluation period
    pub const KEYER_PERIOD: Tick = TICKS_PER_MSEC;
    /// Service housekeeping period (20 Hz)
    pub const SERVICE_PERIOD: Tick = 50 * TICKS_PER_MSEC;
    /// Heartbeat period (1 Hz)
    pub const HEARTBEAT_PERIOD: Tick = TICKS_PER_SEC;

    /// Fires once per `period` ticks
    ///
    /// Driven by the tick value rather than by counting tick events, since
    /// coalesced events can hide ticks. A late check fires once and restarts
    /// the period from the check.
    #[derive(Clone, Copy, Debug)]
    pub struct Divider {
        period: Tick,
        next: Tick,
    }

    impl Divider {
        pub const fn new(period: Tick, start: Tick) -> Self {
            Self {
                period,
                next: start.wrapping_add(period),
            }
        }

        pub const fn period(&self) -> Tick {
            self.period
        }

        /// Returns true if the period has elapsed at `now`
        pub fn due(&mut self, now: Tick) -> bool {
            if !is_tick_gte(now, self.next) {
                return false;
            }
            self.next = self.next.wrapping_add(self.period);
            if !is_tick_gt(self.next, now) {
                self.next = now.wrapping_add(self.period);
            }
            true
        }

        /// Restart the period from `now`
        pub fn reset(&mut self, now: Tick) {
            self.next = now.wrapping_add(self.period);
        }
    }
}

// Mainline event dispatch
pub mod app {
    use cwkeyer_core::autokey::AUTOKEY_QUEUE_LEN;
    use cwkeyer_core::sys::{Event, EventSet, Sys, Tick};
    use cwkeyer_core::{Keyer, KeyerHal, Led};
    use embedded_hal::delay::DelayNs;

    use crate::schedule::{Divider, HEARTBEAT_PERIOD, KEYER_PERIOD, SERVICE_PERIOD};

    /// Status LED flash length for the startup "S" (a 20 WPM dot)
    pub const STARTUP_FLASH_MS: u32 = 60;

    /// Collaborators serviced from the main loop
    ///
    /// Host protocols, message memories and configuration storage live here.
    /// Every hook runs on the mainline context and may drive the keyer.
    pub trait Services<H: KeyerHal, const Q: usize> {
        /// Called at 20 Hz
        fn periodic_50ms(&mut self, _keyer: &mut Keyer<H, Q>, _now: Tick) {}

        /// Called at 1 Hz
        fn periodic_1s(&mut self, _keyer: &mut Keyer<H, Q>, _now: Tick) {}

        /// A serial port raised `event`
        fn serial_event(&mut self, _keyer: &mut Keyer<H, Q>, _event: Event) {}
    }

    /// No services attached
    impl<H: KeyerHal, const Q: usize> Services<H, Q> for () {}

    /// The firmware main loop
    pub struct App<'a, H: KeyerHal, S, const Q: usize = AUTOKEY_QUEUE_LEN> {
        sys: &'a Sys,
        keyer: Keyer<H, Q>,
        services: S,
        keyer_tick: Divider,
        service_tick: Divider,
        heartbeat: Divider,
        status_led: bool,
    }

    impl<'a, H, S, const Q: usize> App<'a, H, S, Q>
    where
        H: KeyerHal,
        S: Services<H, Q>,
    {
        /// Initialize the keyer and start the periodic dividers at the current tick
        pub fn new(sys: &'a Sys, mut keyer: Keyer<H, Q>, services: S) -> Self {
            keyer.initialize();
            let now = sys.get_tick();
            Self {
                sys,
                keyer,
                services,
                keyer_tick: Divider::new(KEYER_PERIOD, now),
                service_tick: Divider::new(SERVICE_PERIOD, now),
                heartbeat: Divider::new(HEARTBEAT_PERIOD, now),
                status_led: false,
            }
        }

        /// Flash "S" on the status LED, then leave it on
        pub fn startup_display<D: DelayNs>(&mut self, delay: &mut D) {
            for _ in 0..3 {
                self.set_status_led(true);
                delay.delay_ms(STARTUP_FLASH_MS);
                self.set_status_led(false);
                delay.delay_ms(STARTUP_FLASH_MS);
            }
            self.set_status_led(true);

            #[cfg(feature = "defmt")]
            defmt::info!("✨ Keyer firmware ready!");
        }

        /// Handle one drained event set, in dispatch order
        pub fn dispatch(&mut self, events: EventSet) {
            for event in events.iter() {
                match event {
                    Event::Tick => self.on_tick(self.sys.get_tick()),
                    // Respond to paddles without waiting for the next tick
                    Event::InputState => self.keyer.evaluate(self.sys.get_tick()),
                    serial => self.services.serial_event(&mut self.keyer, serial),
                }
            }
        }

        fn on_tick(&mut self, now: Tick) {
            if self.keyer_tick.due(now) {
                self.keyer.evaluate(now);
            }
            if self.service_tick.due(now) {
                self.services.periodic_50ms(&mut self.keyer, now);
            }
            if self.heartbeat.due(now) {
                self.services.periodic_1s(&mut self.keyer, now);
                self.set_status_led(!self.status_led);

                #[cfg(feature = "defmt")]
                defmt::trace!("💓 Heartbeat");
            }
        }

        /// Park until events arrive, then dispatch them
        pub fn step(&mut self, park: impl FnMut()) -> EventSet {
            let events = self.sys.wait(park);
            self.dispatch(events);
            events
        }

        /// Run forever
        pub fn run(mut self, mut park: impl FnMut()) -> ! {
            #[cfg(feature = "defmt")]
            defmt::info!("🚀 Main loop started");

            loop {
                self.step(&mut park);
            }
        }

        fn set_status_led(&mut self, on: bool) {
            self.status_led = on;
            if let Err(_e) = self.keyer.hal_mut().set_led(Led::Status, on) {
                #[cfg(feature = "defmt")]
                defmt::warn!("⚠️ Status LED failed: {:?}", _e);
            }
        }

        pub fn status_led(&self) -> bool {
            self.status_led
        }

        pub fn keyer(&self) -> &Keyer<H, Q> {
            &self.keyer
        }

        pub fn keyer_mut(&mut self) -> &mut Keyer<H, Q> {
            &mut self.keyer
        }

        pub fn services(&self) -> &S {
            &self.services
        }

        pub fn services_mut(&mut self) -> &mut S {
            &mut self.services
        }
    }
}

pub mod pins;
