//! Core data types for the keyer engine

/// Morse code elements
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "std", derive(Hash))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Element {
    /// Dot (short keyed element)
    Dot,
    /// Dash (long keyed element)
    Dash,
    /// Space between the elements of one character
    ElementSpace,
    /// Space between characters
    LetterSpace,
    /// Space between words
    WordSpace,
}

impl Element {
    /// Number of element kinds
    pub const COUNT: usize = 5;

    /// All elements, in discriminant order
    pub const ALL: [Element; Element::COUNT] = [
        Element::Dot,
        Element::Dash,
        Element::ElementSpace,
        Element::LetterSpace,
        Element::WordSpace,
    ];

    /// Names used by host-facing protocols, indexed by discriminant
    pub const NAMES: [&'static str; Element::COUNT] = [
        "dot",
        "dash",
        "element_space",
        "letter_space",
        "word_space",
    ];

    /// Returns the nominal duration of this element in Morse units
    pub const fn units(self) -> u32 {
        match self {
            Element::Dot => 1,
            Element::Dash => 3,
            Element::ElementSpace => 1,
            Element::LetterSpace => 3,
            Element::WordSpace => 7,
        }
    }

    /// Returns true if this element produces key output
    pub const fn is_keyed(self) -> bool {
        matches!(self, Element::Dot | Element::Dash)
    }

    /// Index into per-element tables
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        Self::NAMES[self.index()]
    }

    /// Look up an element by its protocol name
    pub fn from_name(name: &str) -> Option<Element> {
        Self::ALL.iter().copied().find(|el| el.name() == name)
    }
}

impl TryFrom<u8> for Element {
    type Error = KeyerError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Element::ALL
            .get(raw as usize)
            .copied()
            .ok_or(KeyerError::InvalidElement(raw))
    }
}

/// Keyer states, re-selected on every scheduling tick
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyerState {
    /// No input, key released once the current element completes
    #[default]
    Off,
    /// Straight key held, key forced on
    On,
    /// Continuous dots
    Dots,
    /// Continuous dashes
    Dashes,
    /// Alternating dots and dashes (iambic squeeze)
    Interleaved,
    /// Draining the autokey queue
    Autokey,
}

/// How a squeeze (both paddles held) is resolved
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PaddleMode {
    /// Squeeze alternates dots and dashes
    #[default]
    Iambic,
    /// Squeeze keeps sending whatever the first paddle started
    Ultimatic,
    /// Squeeze follows the most recently pressed paddle
    UltimaticAlternate,
}

impl PaddleMode {
    /// Number of paddle modes
    pub const COUNT: usize = 3;

    pub const ALL: [PaddleMode; PaddleMode::COUNT] = [
        PaddleMode::Iambic,
        PaddleMode::Ultimatic,
        PaddleMode::UltimaticAlternate,
    ];

    /// Names used by host-facing protocols, indexed by discriminant
    pub const NAMES: [&'static str; PaddleMode::COUNT] = ["iambic", "ultimatic", "ultimatic_alternate"];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        Self::NAMES[self.index()]
    }

    /// Look up a paddle mode by its protocol name
    pub fn from_name(name: &str) -> Option<PaddleMode> {
        Self::ALL.iter().copied().find(|mode| mode.name() == name)
    }
}

impl TryFrom<u8> for PaddleMode {
    type Error = KeyerError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        PaddleMode::ALL
            .get(raw as usize)
            .copied()
            .ok_or(KeyerError::InvalidPaddleMode(raw))
    }
}

/// Logical input roles provided by the IO collaborator
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputRole {
    /// Straight key (or the "key" line of a bug)
    StraightKey,
    /// Left paddle, dots unless inverted
    PaddleLeft,
    /// Right paddle, dashes unless inverted
    PaddleRight,
}

/// Indicator LEDs
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Led {
    /// Heartbeat / status LED
    Status,
    /// Mirrors the logical keyed flag
    Key,
}

// Name and variant tables must line up with the discriminants
const _: () = {
    assert!(Element::WordSpace as usize + 1 == Element::COUNT);
    assert!(PaddleMode::UltimaticAlternate as usize + 1 == PaddleMode::COUNT);
    let mut i = 0;
    while i < Element::COUNT {
        assert!(Element::ALL[i] as usize == i);
        i += 1;
    }
    let mut i = 0;
    while i < PaddleMode::COUNT {
        assert!(PaddleMode::ALL[i] as usize == i);
        i += 1;
    }
};

/// Errors reported by fallible keyer operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyerError {
    /// Autokey queue has no room for the request
    QueueFull,
    /// Character has no Morse encoding
    UnsupportedCharacter(char),
    /// Speed outside `WPM_MINIMUM..=WPM_MAXIMUM`
    SpeedOutOfRange,
    /// Element scale outside `ELEMENT_SCALE_MINIMUM..=ELEMENT_SCALE_MAXIMUM`
    ScaleOutOfRange,
    /// Raw paddle mode value has no variant
    InvalidPaddleMode(u8),
    /// Raw element value has no variant
    InvalidElement(u8),
}

#[cfg(feature = "std")]
impl core::fmt::Display for KeyerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            KeyerError::QueueFull => write!(f, "Autokey queue is full"),
            KeyerError::UnsupportedCharacter(c) => write!(f, "No Morse encoding for {:?}", c),
            KeyerError::SpeedOutOfRange => write!(f, "Speed out of range"),
            KeyerError::ScaleOutOfRange => write!(f, "Element scale out of range"),
            KeyerError::InvalidPaddleMode(raw) => write!(f, "Invalid paddle mode {}", raw),
            KeyerError::InvalidElement(raw) => write!(f, "Invalid element {}", raw),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for KeyerError {}
