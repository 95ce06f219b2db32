//! Monotonic tick counter and pending-event substrate
//!
//! Interrupt handlers are producers only: the timer ISR advances the tick
//! counter and posts [`Event::Tick`], other ISRs post their own events. The
//! single mainline consumer parks in [`Sys::wait`] and drains the whole set at
//! once. Repeated events of one kind between two drains collapse into a single
//! bit, so timing decisions must be made from the tick value itself.

use core::cell::Cell;

use critical_section::Mutex;
use portable_atomic::{AtomicU32, Ordering};

/// System tick count
pub type Tick = u32;

/// Largest tick value; the next increment rolls over to zero
pub const TICK_MAX: Tick = Tick::MAX;

/// Ticks per millisecond (1 kHz scheduling clock)
pub const TICKS_PER_MSEC: Tick = 1;

/// Ticks per second
pub const TICKS_PER_SEC: Tick = 1000 * TICKS_PER_MSEC;

/// Ticks elapsed from `then` to `now`, assuming at most one wraparound
#[inline]
pub const fn elapsed(now: Tick, then: Tick) -> Tick {
    if now >= then {
        now - then
    } else {
        (TICK_MAX - then) + 1 + now
    }
}

/// Returns true if `a` is strictly later than `b` on the tick ring
///
/// `a` is later when the forward distance from `b` to `a` is non-zero and
/// strictly less than half the counter range. Points exactly half the range
/// apart are not ordered.
#[inline]
pub const fn is_tick_gt(a: Tick, b: Tick) -> bool {
    let forward = a.wrapping_sub(b);
    forward != 0 && forward <= TICK_MAX / 2
}

/// Returns true if `a` is equal to or later than `b` on the tick ring
#[inline]
pub const fn is_tick_gte(a: Tick, b: Tick) -> bool {
    a == b || is_tick_gt(a, b)
}

/// Event kinds posted by interrupt handlers
///
/// Discriminant order is dispatch order: periodic timing is processed before
/// input and serial events within one wakeup.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Event {
    /// Scheduling clock advanced
    Tick,
    /// A key or paddle input changed
    InputState,
    /// USART 0 received a byte
    Usart0RxComplete,
    /// USART 0 finished transmitting
    Usart0TxComplete,
    /// USART 1 received a byte
    Usart1RxComplete,
    /// USART 1 finished transmitting
    Usart1TxComplete,
}

impl Event {
    /// Number of event kinds
    pub const COUNT: usize = 6;

    /// All events in dispatch order
    pub const ALL: [Event; Event::COUNT] = [
        Event::Tick,
        Event::InputState,
        Event::Usart0RxComplete,
        Event::Usart0TxComplete,
        Event::Usart1RxComplete,
        Event::Usart1TxComplete,
    ];

    /// Bit for this event in an [`EventSet`]
    #[inline]
    pub const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Decode a raw event index
    ///
    /// # Panics
    ///
    /// An out-of-range index is a programming defect and halts.
    pub fn from_index(index: usize) -> Event {
        match Event::ALL.get(index) {
            Some(event) => *event,
            None => panic!("invalid event index {}", index),
        }
    }
}

const _: () = assert!(Event::COUNT <= u32::BITS as usize, "not enough bits for events");
const _: () = assert!(Event::Usart1TxComplete as usize + 1 == Event::COUNT);

/// A drained snapshot of pending events
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventSet(u32);

impl EventSet {
    /// Empty set
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, event: Event) -> bool {
        self.0 & event.bit() != 0
    }

    pub fn insert(&mut self, event: Event) {
        self.0 |= event.bit();
    }

    /// Iterate the contained events in dispatch order
    pub fn iter(self) -> impl Iterator<Item = Event> {
        Event::ALL.into_iter().filter(move |event| self.contains(*event))
    }
}

impl FromIterator<Event> for EventSet {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        let mut set = EventSet::empty();
        for event in iter {
            set.insert(event);
        }
        set
    }
}

/// Monotonic tick counter shared between the timer ISR and the mainline
///
/// Reads and writes go through a critical section, so the counter stays
/// consistent on targets that cannot load 32 bits in one instruction. The
/// prior interrupt-enable state is restored by the critical-section
/// implementation.
pub struct TickCounter {
    ticks: Mutex<Cell<Tick>>,
}

impl TickCounter {
    pub const fn new() -> Self {
        Self {
            ticks: Mutex::new(Cell::new(0)),
        }
    }

    /// Restart the counter at `start`
    ///
    /// Boards may start just below [`TICK_MAX`] to exercise rollover early.
    pub fn reset(&self, start: Tick) {
        critical_section::with(|cs| self.ticks.borrow(cs).set(start));
    }

    /// Advance by one tick, wrapping at [`TICK_MAX`]
    pub fn increment(&self) -> Tick {
        critical_section::with(|cs| {
            let cell = self.ticks.borrow(cs);
            let next = cell.get().wrapping_add(1);
            cell.set(next);
            next
        })
    }

    /// Current tick
    pub fn get(&self) -> Tick {
        critical_section::with(|cs| self.ticks.borrow(cs).get())
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Pending event bitfield
///
/// Producers set bits from any context; the mainline drains every bit at once.
pub struct PendingEvents {
    bits: AtomicU32,
}

impl PendingEvents {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
        }
    }

    /// Flag `event` as pending; safe from interrupt or mainline context
    #[inline]
    pub fn enqueue(&self, event: Event) {
        self.bits.fetch_or(event.bit(), Ordering::AcqRel);
    }

    /// Read and clear all pending events in one atomic step
    #[inline]
    pub fn take(&self) -> EventSet {
        EventSet(self.bits.swap(0, Ordering::AcqRel))
    }

    /// Pending events without clearing them
    pub fn peek(&self) -> EventSet {
        EventSet(self.bits.load(Ordering::Acquire))
    }

    /// Park until at least one event is pending, then drain them all
    ///
    /// `park` is the low-power wait (e.g. `wfi`) and must return once any
    /// interrupt has fired.
    pub fn wait(&self, mut park: impl FnMut()) -> EventSet {
        loop {
            let pending = self.take();
            if !pending.is_empty() {
                return pending;
            }
            park();
        }
    }
}

impl Default for PendingEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Tick counter and event set bundled as one owned context
///
/// Firmware keeps a single `static SYS: Sys = Sys::new();` and calls
/// [`Sys::on_timer_interrupt`] from the timer ISR. Tests create as many
/// independent instances as they need.
pub struct Sys {
    ticks: TickCounter,
    events: PendingEvents,
}

impl Sys {
    pub const fn new() -> Self {
        Self {
            ticks: TickCounter::new(),
            events: PendingEvents::new(),
        }
    }

    /// Reset the counter to `start` and drop any stale events
    pub fn init(&self, start: Tick) {
        self.ticks.reset(start);
        let _ = self.events.take();
    }

    /// Timer ISR body: advance the counter and flag the tick event
    pub fn on_timer_interrupt(&self) {
        self.ticks.increment();
        self.events.enqueue(Event::Tick);
    }

    /// Input-change ISR body
    pub fn on_input_interrupt(&self) {
        self.events.enqueue(Event::InputState);
    }

    pub fn get_tick(&self) -> Tick {
        self.ticks.get()
    }

    /// Ticks elapsed since `then`
    pub fn elapsed_now(&self, then: Tick) -> Tick {
        elapsed(self.get_tick(), then)
    }

    pub fn enqueue_event(&self, event: Event) {
        self.events.enqueue(event);
    }

    /// The mainline's only suspension point
    pub fn wait(&self, park: impl FnMut()) -> EventSet {
        self.events.wait(park)
    }

    pub fn ticks(&self) -> &TickCounter {
        &self.ticks
    }

    pub fn events(&self) -> &PendingEvents {
        &self.events
    }
}

impl Default for Sys {
    fn default() -> Self {
        Self::new()
    }
}
