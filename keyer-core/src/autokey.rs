//! Text-to-Morse encoder and the autokey element queue

use heapless::spsc::Queue;
use heapless::Vec;

use crate::types::{Element, KeyerError};

/// Default autokey queue size in slots; one slot always stays free
pub const AUTOKEY_QUEUE_LEN: usize = 4096;

/// Longest encoded character, including its trailing space
pub const MAX_ENCODED_LEN: usize = 8;

/// Elements produced by encoding one character
pub type Encoded = Vec<Element, MAX_ENCODED_LEN>;

/// Options for encoding a character
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AutokeyFlags(u8);

impl AutokeyFlags {
    /// Default encoding
    pub const NONE: AutokeyFlags = AutokeyFlags(0);
    /// Omit the letter-space after the character (for prosigns like "AR")
    pub const NO_LETTER_SPACE: AutokeyFlags = AutokeyFlags(1 << 0);

    pub const fn contains(self, other: AutokeyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: AutokeyFlags) -> AutokeyFlags {
        AutokeyFlags(self.0 | other.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl core::ops::BitOr for AutokeyFlags {
    type Output = AutokeyFlags;

    fn bitor(self, rhs: AutokeyFlags) -> AutokeyFlags {
        self.union(rhs)
    }
}

/// International Morse pattern for `c`, as dots and dashes
pub fn pattern(c: char) -> Option<&'static str> {
    let pattern = match c.to_ascii_uppercase() {
        'A' => ".-",
        'B' => "-...",
        'C' => "-.-.",
        'D' => "-..",
        'E' => ".",
        'F' => "..-.",
        'G' => "--.",
        'H' => "....",
        'I' => "..",
        'J' => ".---",
        'K' => "-.-",
        'L' => ".-..",
        'M' => "--",
        'N' => "-.",
        'O' => "---",
        'P' => ".--.",
        'Q' => "--.-",
        'R' => ".-.",
        'S' => "...",
        'T' => "-",
        'U' => "..-",
        'V' => "...-",
        'W' => ".--",
        'X' => "-..-",
        'Y' => "-.--",
        'Z' => "--..",
        '0' => "-----",
        '1' => ".----",
        '2' => "..---",
        '3' => "...--",
        '4' => "....-",
        '5' => ".....",
        '6' => "-....",
        '7' => "--...",
        '8' => "---..",
        '9' => "----.",
        '.' => ".-.-.-",
        ',' => "--..--",
        '?' => "..--..",
        '\'' => ".----.",
        '!' => "-.-.--",
        '-' => "-....-",
        '/' => "-..-.",
        '=' => "-...-",
        '+' => ".-.-.",
        '"' => ".-..-.",
        '_' => "..--.-",
        '(' => "-.--.",
        ')' => "-.--.-",
        ':' => "---...",
        ';' => "-.-.-.",
        '@' => ".--.-.",
        '&' => ".-...",
        _ => return None,
    };
    Some(pattern)
}

/// Encode one character into its element run
///
/// Letters end with a letter-space unless `flags` contains
/// [`AutokeyFlags::NO_LETTER_SPACE`]; a space encodes as a single word-space.
pub fn encode_char(c: char, flags: AutokeyFlags) -> Result<Encoded, KeyerError> {
    let mut out = Encoded::new();
    if c == ' ' {
        // Capacity is never exceeded: one element
        let _ = out.push(Element::WordSpace);
        return Ok(out);
    }

    let pattern = pattern(c).ok_or(KeyerError::UnsupportedCharacter(c))?;
    for symbol in pattern.bytes() {
        let el = if symbol == b'.' { Element::Dot } else { Element::Dash };
        out.push(el).map_err(|_| KeyerError::QueueFull)?;
    }
    if !flags.contains(AutokeyFlags::NO_LETTER_SPACE) {
        out.push(Element::LetterSpace).map_err(|_| KeyerError::QueueFull)?;
    }
    Ok(out)
}

/// Bounded FIFO of elements waiting to be keyed
///
/// Backed by a ring of `N` slots of which `N - 1` are usable, so full and
/// empty stay distinguishable. Command sources enqueue, the keyer is the
/// only consumer.
pub struct AutokeyQueue<const N: usize = AUTOKEY_QUEUE_LEN> {
    ring: Queue<Element, N>,
}

impl<const N: usize> AutokeyQueue<N> {
    pub const fn new() -> Self {
        Self { ring: Queue::new() }
    }

    /// Usable slots
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Queued elements
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Free slots
    pub fn available(&self) -> usize {
        self.capacity() - self.len()
    }

    /// Append one element; a full queue is left untouched
    pub fn enqueue(&mut self, el: Element) -> Result<(), KeyerError> {
        self.ring.enqueue(el).map_err(|_| KeyerError::QueueFull)
    }

    /// Remove the oldest element
    pub fn dequeue(&mut self) -> Option<Element> {
        self.ring.dequeue()
    }

    pub fn peek(&self) -> Option<&Element> {
        self.ring.peek()
    }

    /// Drop everything queued
    pub fn clear(&mut self) {
        self.ring = Queue::new();
    }

    /// Queue the elements for `c`
    ///
    /// The character is queued whole or not at all.
    pub fn enqueue_char(&mut self, c: char, flags: AutokeyFlags) -> Result<(), KeyerError> {
        let encoded = encode_char(c, flags)?;
        if encoded.len() > self.available() {
            return Err(KeyerError::QueueFull);
        }
        for el in encoded {
            self.enqueue(el)?;
        }
        Ok(())
    }

    /// Queue every encodable character of `s`, in order
    ///
    /// Characters that cannot be encoded or do not fit are skipped and later
    /// characters are still attempted. Returns the number of characters queued.
    pub fn enqueue_str(&mut self, s: &str, flags: AutokeyFlags) -> usize {
        s.chars()
            .filter(|c| self.enqueue_char(*c, flags).is_ok())
            .count()
    }

    /// Iterate queued elements, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.ring.iter()
    }
}

impl<const N: usize> Default for AutokeyQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
