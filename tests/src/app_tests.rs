//! Main loop dispatch and periodic divider tests

use cwkeyer_core::hal::mock::MockHal;
use cwkeyer_core::sys::{Event, Sys, TICK_MAX};
use cwkeyer_core::{InputRole, Keyer, KeyerConfig, KeyerState, Led};
use cwkeyer_firmware::{App, Divider, HEARTBEAT_PERIOD, SERVICE_PERIOD, STARTUP_FLASH_MS};
use embedded_hal::delay::DelayNs;
use rstest::rstest;

use crate::sim::{render, Simulator};

/// Delay that only records what it was asked for
#[derive(Default)]
struct RecordingDelay {
    total_ns: u64,
    calls: usize,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
        self.calls += 1;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay_ns(ms * 1_000_000);
    }
}

#[test]
fn test_divider_fires_once_per_period() {
    let mut divider = Divider::new(50, 0);
    let fired: Vec<u32> = (1..=200).filter(|now| divider.due(*now)).collect();
    assert_eq!(fired, vec![50, 100, 150, 200]);
    assert_eq!(divider.period(), 50);
}

#[test]
fn test_divider_late_check_restarts_period() {
    let mut divider = Divider::new(50, 0);
    assert!(divider.due(170));
    assert!(!divider.due(200));
    assert!(divider.due(220));
}

#[test]
fn test_divider_across_wrap() {
    let start = TICK_MAX - 20;
    let mut divider = Divider::new(50, start);
    assert!(!divider.due(start.wrapping_add(49)));
    assert!(divider.due(29));
    assert!(divider.due(79));

    divider.reset(100);
    assert!(!divider.due(149));
    assert!(divider.due(150));
}

#[rstest]
#[case(1000, 20, 1)]
#[case(5000, 100, 5)]
#[case(2049, 40, 2)]
fn test_periodic_services(#[case] ticks: u32, #[case] fast: usize, #[case] slow: usize) {
    let mut sim = Simulator::new(KeyerConfig::default());
    sim.advance(ticks);
    assert_eq!(sim.services().periodic_50ms_calls, fast);
    assert_eq!(sim.services().periodic_1s_calls, slow);
    assert_eq!(fast as u32, ticks / SERVICE_PERIOD);
    assert_eq!(slow as u32, ticks / HEARTBEAT_PERIOD);
}

#[test]
fn test_heartbeat_toggles_status_led() {
    let mut sim = Simulator::new(KeyerConfig::default());
    assert!(!sim.app().status_led());

    sim.advance(999);
    assert!(!sim.keyer().hal().led(Led::Status));
    sim.advance(1);
    assert!(sim.app().status_led());
    assert!(sim.keyer().hal().led(Led::Status));
    sim.advance(1000);
    assert!(!sim.keyer().hal().led(Led::Status));
}

#[test]
fn test_startup_display_flashes_s() {
    let mut sim = Simulator::new(KeyerConfig::default());
    let mut delay = RecordingDelay::default();
    sim.app_mut().startup_display(&mut delay);

    assert_eq!(delay.calls, 6);
    assert_eq!(delay.total_ns, 6 * u64::from(STARTUP_FLASH_MS) * 1_000_000);
    assert!(sim.app().status_led());
    assert!(sim.keyer().hal().led(Led::Status));
    // The display never touches the transmit key
    assert_eq!(sim.keyer().hal().key_on_commands(), 0);
}

#[test]
fn test_serial_events_reach_services() {
    let mut sim = Simulator::new(KeyerConfig::default());
    sim.services_mut().rx_text = Some("E".to_string());
    sim.serial(Event::Usart1TxComplete);
    sim.serial(Event::Usart0RxComplete);
    assert_eq!(
        sim.services().serial_events,
        vec![Event::Usart1TxComplete, Event::Usart0RxComplete]
    );
    assert_eq!(sim.keyer().autokey_count(), 2);

    sim.advance(500);
    assert_eq!(render(&sim.intervals(), 60), ".");
}

#[test]
fn test_input_event_evaluates_without_tick() {
    let mut sim = Simulator::new(KeyerConfig::default());
    sim.advance(5);
    sim.set_input(InputRole::PaddleRight, true);
    // Keyed on the same tick the input changed
    assert_eq!(sim.edges(), &[(5, true)]);
    assert_eq!(sim.keyer().state(), KeyerState::Dashes);
}

#[test]
fn test_step_dispatches_coalesced_events() {
    let sys: &'static Sys = Box::leak(Box::new(Sys::new()));
    let keyer: Keyer<MockHal, 64> = Keyer::new(MockHal::new(), KeyerConfig::default());
    let mut app = App::new(sys, keyer, ());
    app.keyer_mut().hal_mut().set_input(InputRole::StraightKey, true);

    sys.on_timer_interrupt();
    sys.on_timer_interrupt();
    sys.on_input_interrupt();
    sys.enqueue_event(Event::Usart0TxComplete);

    let events = app.step(|| unreachable!());
    assert!(events.contains(Event::Tick));
    assert!(events.contains(Event::InputState));
    assert!(events.contains(Event::Usart0TxComplete));
    assert!(app.keyer().is_keyed());
    assert!(app.keyer().hal().key_output());
}
