//! Autokey encoder and queue tests

use cwkeyer_core::autokey::{encode_char, pattern, AutokeyFlags, AutokeyQueue};
use cwkeyer_core::Element::{self, *};
use cwkeyer_core::KeyerError;
use proptest::prelude::*;
use rstest::rstest;

fn to_pattern(elements: &[Element]) -> String {
    elements
        .iter()
        .map(|el| match el {
            Dot => '.',
            Dash => '-',
            LetterSpace => ' ',
            WordSpace => '/',
            ElementSpace => '_',
        })
        .collect()
}

#[rstest]
#[case('e', ". ")]
#[case('T', "- ")]
#[case('s', "... ")]
#[case('o', "--- ")]
#[case('q', "--.- ")]
#[case('5', "..... ")]
#[case('0', "----- ")]
#[case('?', "..--.. ")]
#[case('/', "-..-. ")]
#[case('=', "-...- ")]
#[case('+', ".-.-. ")]
#[case('!', "-.-.-- ")]
#[case('-', "-....- ")]
#[case('@', ".--.-. ")]
#[case(' ', "/")]
fn test_encode_table(#[case] c: char, #[case] expected: &str) {
    let encoded = encode_char(c, AutokeyFlags::NONE).unwrap();
    assert_eq!(to_pattern(&encoded), expected);
}

#[rstest]
#[case('#')]
#[case('*')]
#[case('\n')]
#[case('ü')]
fn test_unsupported_characters(#[case] c: char) {
    assert_eq!(encode_char(c, AutokeyFlags::NONE), Err(KeyerError::UnsupportedCharacter(c)));
    let mut queue: AutokeyQueue<16> = AutokeyQueue::new();
    assert!(queue.enqueue_char(c, AutokeyFlags::NONE).is_err());
    assert!(queue.is_empty());
}

#[test]
fn test_encode_string_sos() {
    let mut queue: AutokeyQueue<64> = AutokeyQueue::new();
    assert_eq!(queue.enqueue_str("SOS", AutokeyFlags::NONE), 3);
    let queued: Vec<Element> = queue.iter().copied().collect();
    assert_eq!(to_pattern(&queued), "... --- ... ");
}

#[test]
fn test_every_letter_and_digit_encodes() {
    for c in ('a'..='z').chain('A'..='Z').chain('0'..='9') {
        let encoded = encode_char(c, AutokeyFlags::NONE).unwrap();
        assert_eq!(encoded.last(), Some(&LetterSpace), "{c}");
        assert_eq!(pattern(c).map(str::len), Some(encoded.len() - 1));
    }
}

#[test]
fn test_full_queue_leaves_contents() {
    let mut queue: AutokeyQueue<8> = AutokeyQueue::new();
    for el in [Dot, Dash, Dot, Dash, Dot, Dash, WordSpace] {
        queue.enqueue(el).unwrap();
    }
    assert_eq!(queue.enqueue(Dot), Err(KeyerError::QueueFull));
    let queued: Vec<Element> = queue.iter().copied().collect();
    assert_eq!(queued, vec![Dot, Dash, Dot, Dash, Dot, Dash, WordSpace]);
}

fn any_element() -> impl Strategy<Value = Element> {
    prop::sample::select(Element::ALL.to_vec())
}

proptest! {
    #[test]
    fn test_fifo_order(elements in prop::collection::vec(any_element(), 0..255)) {
        let mut queue: AutokeyQueue<256> = AutokeyQueue::new();
        for el in &elements {
            prop_assert!(queue.enqueue(*el).is_ok());
        }
        prop_assert_eq!(queue.len(), elements.len());
        for el in &elements {
            prop_assert_eq!(queue.dequeue(), Some(*el));
        }
        prop_assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_queue_never_exceeds_capacity(ops in prop::collection::vec(any::<Option<bool>>(), 0..200)) {
        let mut queue: AutokeyQueue<16> = AutokeyQueue::new();
        let mut model = std::collections::VecDeque::new();
        for op in ops {
            match op {
                Some(dot) => {
                    let el = if dot { Dot } else { Dash };
                    let accepted = queue.enqueue(el).is_ok();
                    prop_assert_eq!(accepted, model.len() < 15);
                    if accepted {
                        model.push_back(el);
                    }
                }
                None => prop_assert_eq!(queue.dequeue(), model.pop_front()),
            }
            prop_assert_eq!(queue.len(), model.len());
            prop_assert_eq!(queue.available(), 15 - model.len());
        }
    }

    #[test]
    fn test_string_count_matches_supported_chars(text in "[a-zA-Z0-9 #*]{0,40}") {
        let mut queue: AutokeyQueue<1024> = AutokeyQueue::new();
        let expected = text.chars().filter(|c| *c != '#' && *c != '*').count();
        prop_assert_eq!(queue.enqueue_str(&text, AutokeyFlags::NONE), expected);
    }
}
