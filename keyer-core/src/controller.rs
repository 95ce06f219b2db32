//! Paddle input tracking and next-state selection

use crate::hal::{HalError, KeyerIo};
use crate::types::{InputRole, KeyerState, PaddleMode};

/// Logical input levels read on one tick
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputSample {
    pub straight_key: bool,
    pub left: bool,
    pub right: bool,
}

impl InputSample {
    pub const IDLE: InputSample = InputSample {
        straight_key: false,
        left: false,
        right: false,
    };

    /// Read every input role from the IO collaborator
    pub fn read<H: KeyerIo>(io: &mut H) -> Result<Self, HalError> {
        Ok(Self {
            straight_key: io.input_active(InputRole::StraightKey)?,
            left: io.input_active(InputRole::PaddleLeft)?,
            right: io.input_active(InputRole::PaddleRight)?,
        })
    }

    /// Check if both paddles are pressed (squeeze condition)
    pub fn squeezed(&self) -> bool {
        self.left && self.right
    }

    pub fn is_idle(&self) -> bool {
        !self.straight_key && !self.left && !self.right
    }
}

/// Paddle levels remembered across ticks for edge detection
#[derive(Copy, Clone, Debug, Default)]
pub struct PaddleTracker {
    prev: InputSample,
}

impl PaddleTracker {
    pub const fn new() -> Self {
        Self {
            prev: InputSample::IDLE,
        }
    }

    /// Record `now` and return the sample it replaces
    pub fn advance(&mut self, now: InputSample) -> InputSample {
        core::mem::replace(&mut self.prev, now)
    }

    pub fn previous(&self) -> InputSample {
        self.prev
    }

    pub fn reset(&mut self) {
        self.prev = InputSample::IDLE;
    }
}

/// State a single paddle requests on its own
fn paddle_state(left: bool, invert: bool) -> KeyerState {
    // The left paddle traditionally sends dots
    if left != invert {
        KeyerState::Dots
    } else {
        KeyerState::Dashes
    }
}

/// Inputs for resolving a squeeze
#[derive(Copy, Clone, Debug)]
pub struct SqueezeContext {
    pub input: InputSample,
    pub prev: InputSample,
    pub current: KeyerState,
    pub invert: bool,
}

impl SqueezeContext {
    fn left_edge(&self) -> bool {
        self.input.left && !self.prev.left
    }

    fn right_edge(&self) -> bool {
        self.input.right && !self.prev.right
    }
}

type SqueezeResolver = fn(&SqueezeContext) -> KeyerState;

fn squeeze_iambic(_ctx: &SqueezeContext) -> KeyerState {
    KeyerState::Interleaved
}

/// First paddle is sticky: keep whatever is running.
///
/// Entering a squeeze straight from `Off` (both paddles on the same tick)
/// therefore stays `Off` until one paddle is released.
fn squeeze_ultimatic(ctx: &SqueezeContext) -> KeyerState {
    ctx.current
}

fn squeeze_ultimatic_alternate(ctx: &SqueezeContext) -> KeyerState {
    if ctx.left_edge() {
        paddle_state(true, ctx.invert)
    } else if ctx.right_edge() {
        paddle_state(false, ctx.invert)
    } else {
        ctx.current
    }
}

/// Squeeze resolvers indexed by [`PaddleMode::index`]
const SQUEEZE_RESOLVERS: [SqueezeResolver; PaddleMode::COUNT] =
    [squeeze_iambic, squeeze_ultimatic, squeeze_ultimatic_alternate];

/// Resolve a squeeze for `mode`
pub fn resolve_squeeze(mode: PaddleMode, ctx: &SqueezeContext) -> KeyerState {
    SQUEEZE_RESOLVERS[mode.index()](ctx)
}

/// Pick the keyer state for this tick
///
/// Priority: queued autokey text, then the straight key, then a squeeze
/// resolved per paddle mode, then a single paddle, otherwise `Off`.
pub fn select_state(
    autokey_pending: bool,
    input: InputSample,
    prev: InputSample,
    current: KeyerState,
    mode: PaddleMode,
    invert: bool,
) -> KeyerState {
    if autokey_pending {
        KeyerState::Autokey
    } else if input.straight_key {
        KeyerState::On
    } else if input.squeezed() {
        let ctx = SqueezeContext {
            input,
            prev,
            current,
            invert,
        };
        resolve_squeeze(mode, &ctx)
    } else if input.left {
        paddle_state(true, invert)
    } else if input.right {
        paddle_state(false, invert)
    } else {
        KeyerState::Off
    }
}
