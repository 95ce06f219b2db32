//! WPM timing calculator tests

use cwkeyer_core::wpm::{self, TimingCache, DEFAULT_SCALES, REFRESH_INTERVAL, WPM_MAXIMUM, WPM_MINIMUM};
use cwkeyer_core::{Element, KeyerConfig, KeyerError};
use proptest::prelude::*;
use rstest::rstest;

#[rstest]
#[case(5.0, 240, 720, 1680)]
#[case(13.0, 92, 277, 646)]
#[case(20.0, 60, 180, 420)]
#[case(25.0, 48, 144, 336)]
#[case(40.0, 30, 90, 210)]
#[case(100.0, 12, 36, 84)]
fn test_standard_speeds(#[case] wpm: f32, #[case] dot: u32, #[case] dash: u32, #[case] word: u32) {
    let table = wpm::compute(wpm, &DEFAULT_SCALES).unwrap();
    assert_eq!(table.dot(), dot);
    assert_eq!(table.element_space(), dot);
    assert_eq!(table.dash(), dash);
    assert_eq!(table.letter_space(), dash);
    assert_eq!(table.word_space(), word);
}

#[rstest]
#[case(Element::Dot, 2.0, 120)]
#[case(Element::Dash, 0.5, 90)]
#[case(Element::ElementSpace, 1.5, 90)]
#[case(Element::LetterSpace, 0.1, 18)]
#[case(Element::WordSpace, 10.0, 4200)]
fn test_element_scale(#[case] el: Element, #[case] scale: f32, #[case] ticks: u32) {
    let mut config = KeyerConfig::default();
    config.set_element_scale(el, scale);
    let table = wpm::compute(config.wpm, &config.element_scale).unwrap();
    assert_eq!(table.get(el), ticks);
    for other in Element::ALL.iter().filter(|other| **other != el) {
        assert_eq!(table.get(*other), wpm::compute(20.0, &DEFAULT_SCALES).unwrap().get(*other));
    }
}

#[rstest]
#[case(0.0)]
#[case(0.99)]
#[case(100.01)]
#[case(-20.0)]
#[case(f32::INFINITY)]
fn test_rejects_out_of_range_speed(#[case] wpm: f32) {
    assert_eq!(wpm::compute(wpm, &DEFAULT_SCALES), Err(KeyerError::SpeedOutOfRange));
}

proptest! {
    #[test]
    fn test_unit_ratios_hold(wpm in WPM_MINIMUM..=WPM_MAXIMUM) {
        let table = wpm::compute(wpm, &DEFAULT_SCALES).unwrap();
        let unit = wpm::unit_ms(wpm).unwrap();
        // Each entry is within half a tick of its exact duration
        for el in Element::ALL {
            let exact = el.units() as f32 * unit;
            prop_assert!((table.get(el) as f32 - exact).abs() <= 0.5 + 1e-3);
        }
        prop_assert_eq!(table.dot(), table.element_space());
        prop_assert_eq!(table.dash(), table.letter_space());
    }

    #[test]
    fn test_faster_is_never_longer(a in WPM_MINIMUM..=WPM_MAXIMUM, b in WPM_MINIMUM..=WPM_MAXIMUM) {
        let (slow, fast) = if a <= b { (a, b) } else { (b, a) };
        let slow = wpm::compute(slow, &DEFAULT_SCALES).unwrap();
        let fast = wpm::compute(fast, &DEFAULT_SCALES).unwrap();
        for el in Element::ALL {
            prop_assert!(fast.get(el) <= slow.get(el));
        }
    }

    #[test]
    fn test_cache_refreshes_at_most_once_per_interval(start in any::<u32>(), wpm in 5.0f32..50.0) {
        let mut cache = TimingCache::new(20.0, &DEFAULT_SCALES);
        cache.refresh(start, 20.0, &DEFAULT_SCALES);
        prop_assert!(!cache.refresh(start.wrapping_add(REFRESH_INTERVAL - 1), wpm, &DEFAULT_SCALES));
        let changed = cache.refresh(start.wrapping_add(REFRESH_INTERVAL), wpm, &DEFAULT_SCALES);
        let expected = wpm::compute(wpm, &DEFAULT_SCALES).unwrap();
        prop_assert_eq!(*cache.table(), expected);
        prop_assert_eq!(changed, expected != wpm::compute(20.0, &DEFAULT_SCALES).unwrap());
    }
}
