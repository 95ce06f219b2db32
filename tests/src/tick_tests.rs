//! Tick arithmetic and event substrate properties

use cwkeyer_core::sys::{elapsed, is_tick_gt, is_tick_gte, Event, EventSet, Sys, Tick, TICK_MAX};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_elapsed_recovers_offset(then in any::<Tick>(), k in any::<Tick>()) {
        prop_assert_eq!(elapsed(then.wrapping_add(k), then), k);
    }

    #[test]
    fn test_gt_is_not_reverse_gte(a in any::<Tick>(), d in 0..=TICK_MAX / 2) {
        // Points within half the range of each other
        let b = a.wrapping_add(d);
        prop_assert_eq!(is_tick_gt(a, b), !is_tick_gte(b, a));
        prop_assert_eq!(is_tick_gt(b, a), !is_tick_gte(a, b));
    }

    #[test]
    fn test_later_tick_survives_wrap(a in any::<Tick>(), d in 1..=TICK_MAX / 2) {
        prop_assert!(is_tick_gt(a.wrapping_add(d), a));
        prop_assert!(!is_tick_gt(a, a.wrapping_add(d)));
    }

    #[test]
    fn test_event_set_iterates_in_dispatch_order(bits in 0u32..(1 << Event::COUNT)) {
        let set = EventSet::from_bits(bits);
        let events: Vec<Event> = set.iter().collect();
        prop_assert_eq!(events.len() as u32, bits.count_ones());
        prop_assert!(events.windows(2).all(|w| (w[0] as u8) < (w[1] as u8)));
        prop_assert_eq!(events.into_iter().collect::<EventSet>(), set);
    }
}

#[test]
fn test_counter_rollover_keeps_elapsed() {
    let sys = Sys::new();
    sys.init(TICK_MAX - 2);
    let start = sys.get_tick();
    for _ in 0..10 {
        sys.on_timer_interrupt();
    }
    assert_eq!(sys.get_tick(), 7);
    assert_eq!(sys.elapsed_now(start), 10);
    assert!(is_tick_gt(sys.get_tick(), start));
}

#[test]
fn test_repeated_events_coalesce() {
    let sys = Sys::new();
    for _ in 0..5 {
        sys.on_timer_interrupt();
    }
    let events = sys.wait(|| unreachable!());
    assert_eq!(events.iter().collect::<Vec<_>>(), vec![Event::Tick]);
    // Five ticks passed even though one event was seen
    assert_eq!(sys.get_tick(), 5);
}

#[test]
fn test_interrupt_producer_thread() {
    let sys: &'static Sys = Box::leak(Box::new(Sys::new()));
    let producer = std::thread::spawn(move || {
        for _ in 0..1000 {
            sys.on_timer_interrupt();
        }
        sys.enqueue_event(Event::Usart1TxComplete);
    });

    let mut seen = EventSet::empty();
    while !seen.contains(Event::Usart1TxComplete) {
        let events = sys.wait(std::thread::yield_now);
        for event in events.iter() {
            seen.insert(event);
        }
    }
    producer.join().unwrap();
    assert!(seen.contains(Event::Tick));
    assert_eq!(sys.get_tick(), 1000);
}
