//! Interrupt-safe input event queue.
//!
//! Interrupt handlers (encoder, push buttons, trigger inputs, serial decoders)
//! push small fixed-size [`Event`] records into an [`EventQueue`]; the control
//! loop drains them. Every access to the ring metadata runs inside a
//! `critical-section`, so the queue can live in a `static` shared between the
//! thread-mode control loop and interrupt contexts.

use core::cell::RefCell;
use core::fmt;

use critical_section::Mutex;

/// Capacity of the controller's event queue.
pub const EVENT_QUEUE_LEN: usize = 64;

/// Registry of event kinds with their stable raw codes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EventKind {
    /// Encoder detent; `v1` is 1 for clockwise, 0 for counter-clockwise.
    Encoder,
    /// Push button edge; `v1` is the button id, `v2` the pressed level.
    Button,
    /// A watched trigger input changed level while the run engine is armed.
    InputChange,
    /// MIDI note on: channel, note, velocity.
    MidiNoteOn,
    /// MIDI note off: channel, note, velocity.
    MidiNoteOff,
    /// MIDI real-time clock: 0 start, 1 stop, 2 continue, 3 tick.
    MidiClock,
    /// MIDI system reset.
    MidiReset,
    /// MIDI pitch bend: channel, MSB, LSB.
    MidiPitchBend,
    /// MIDI channel aftertouch: channel, value.
    MidiChannelAftertouch,
    /// MIDI all notes off: channel.
    MidiAllOff,
    /// MIDI reset all controllers: channel.
    MidiControlReset,
    /// MIDI controller change: channel, controller number, value.
    MidiController,
}

impl EventKind {
    const ENCODER_CODE: u8 = 0x00;
    const BUTTON_CODE: u8 = 0x01;
    const INPUT_CHANGE_CODE: u8 = 0x02;
    const MIDI_BASE: u8 = 0x10;

    /// Encodes the kind into its registry code.
    #[must_use]
    pub const fn to_raw(self) -> u8 {
        match self {
            EventKind::Encoder => Self::ENCODER_CODE,
            EventKind::Button => Self::BUTTON_CODE,
            EventKind::InputChange => Self::INPUT_CHANGE_CODE,
            EventKind::MidiNoteOn => Self::MIDI_BASE,
            EventKind::MidiNoteOff => Self::MIDI_BASE + 1,
            EventKind::MidiClock => Self::MIDI_BASE + 2,
            EventKind::MidiReset => Self::MIDI_BASE + 3,
            EventKind::MidiPitchBend => Self::MIDI_BASE + 4,
            EventKind::MidiChannelAftertouch => Self::MIDI_BASE + 5,
            EventKind::MidiAllOff => Self::MIDI_BASE + 6,
            EventKind::MidiControlReset => Self::MIDI_BASE + 7,
            EventKind::MidiController => Self::MIDI_BASE + 8,
        }
    }

    /// Decodes a registry code, returning `None` for unassigned codes.
    #[must_use]
    pub const fn from_raw(code: u8) -> Option<Self> {
        match code {
            Self::ENCODER_CODE => Some(EventKind::Encoder),
            Self::BUTTON_CODE => Some(EventKind::Button),
            Self::INPUT_CHANGE_CODE => Some(EventKind::InputChange),
            0x10 => Some(EventKind::MidiNoteOn),
            0x11 => Some(EventKind::MidiNoteOff),
            0x12 => Some(EventKind::MidiClock),
            0x13 => Some(EventKind::MidiReset),
            0x14 => Some(EventKind::MidiPitchBend),
            0x15 => Some(EventKind::MidiChannelAftertouch),
            0x16 => Some(EventKind::MidiAllOff),
            0x17 => Some(EventKind::MidiControlReset),
            0x18 => Some(EventKind::MidiController),
            _ => None,
        }
    }
}

/// Rotation direction reported by the encoder.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    /// Returns `true` for counter-clockwise rotation (a decrement).
    #[must_use]
    pub const fn is_decrement(self) -> bool {
        matches!(self, Direction::CounterClockwise)
    }
}

/// Physical push buttons on the front panel.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ButtonId {
    /// Push switch built into the rotary encoder.
    Encoder,
    /// Auxiliary button: fast-edit modifier and manual trigger.
    Aux,
}

impl ButtonId {
    const fn to_raw(self) -> u8 {
        match self {
            ButtonId::Encoder => 0,
            ButtonId::Aux => 1,
        }
    }

    const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(ButtonId::Encoder),
            1 => Some(ButtonId::Aux),
            _ => None,
        }
    }
}

/// Immutable input event record.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub v1: u8,
    pub v2: u8,
    pub v3: u8,
}

impl Event {
    const EMPTY: Event = Event::new(EventKind::Encoder, 0, 0, 0);

    #[must_use]
    pub const fn new(kind: EventKind, v1: u8, v2: u8, v3: u8) -> Self {
        Self { kind, v1, v2, v3 }
    }

    /// Builds an encoder detent event.
    #[must_use]
    pub const fn encoder(direction: Direction) -> Self {
        let v1 = match direction {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => 0,
        };
        Self::new(EventKind::Encoder, v1, 0, 0)
    }

    /// Builds a push-button edge event carrying the new logical level.
    #[must_use]
    pub const fn button(id: ButtonId, pressed: bool) -> Self {
        Self::new(EventKind::Button, id.to_raw(), pressed as u8, 0)
    }

    /// Builds a trigger-input change event carrying the sampled input bits.
    #[must_use]
    pub const fn input_change(levels: u8) -> Self {
        Self::new(EventKind::InputChange, levels, 0, 0)
    }

    /// Returns the rotation direction when this is an encoder event.
    #[must_use]
    pub const fn as_encoder(&self) -> Option<Direction> {
        match self.kind {
            EventKind::Encoder if self.v1 != 0 => Some(Direction::Clockwise),
            EventKind::Encoder => Some(Direction::CounterClockwise),
            _ => None,
        }
    }

    /// Returns `(button, pressed)` when this is a push-button event.
    #[must_use]
    pub const fn as_button(&self) -> Option<(ButtonId, bool)> {
        match self.kind {
            EventKind::Button => match ButtonId::from_raw(self.v1) {
                Some(id) => Some((id, self.v2 != 0)),
                None => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}({}, {}, {})",
            self.kind, self.v1, self.v2, self.v3
        )
    }
}

/// Delivery class for [`EventQueue::enqueue`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Priority {
    /// Dropped when the queue is full.
    Normal,
    /// Evicts the oldest entry when the queue is full.
    Important,
}

/// Low-power wait used while the control loop has nothing to do.
///
/// [`EventQueue::sleep_until_event`] calls [`prepare_to_wait`] with
/// interrupts enabled once it has found the queue empty, then re-checks the
/// queue and calls [`wait_for_interrupt`] inside one critical section.
///
/// [`prepare_to_wait`]: IdleWait::prepare_to_wait
/// [`wait_for_interrupt`]: IdleWait::wait_for_interrupt
pub trait IdleWait {
    /// Housekeeping before sleeping, such as flushing output. Events may
    /// arrive meanwhile; they are picked up before the wait starts.
    fn prepare_to_wait(&mut self) {}

    /// Sleeps until an interrupt is pending. Must return even though
    /// interrupts are masked at the call site (Cortex-M `WFI` behaves this
    /// way); the pending handler runs once the critical section is released.
    fn wait_for_interrupt(&mut self);
}

struct QueueState<const N: usize> {
    slots: [Event; N],
    cursor: usize,
    used: usize,
    high_water: usize,
    overflowed: bool,
}

impl<const N: usize> QueueState<N> {
    const fn new() -> Self {
        Self {
            slots: [Event::EMPTY; N],
            cursor: 0,
            used: 0,
            high_water: 0,
            overflowed: false,
        }
    }

    fn push(&mut self, event: Event, priority: Priority) -> bool {
        if self.used >= N {
            self.overflowed = true;
            if priority == Priority::Important {
                self.used -= 1;
            }
        }
        if self.used >= N {
            return false;
        }

        self.slots[self.cursor] = event;
        self.cursor = (self.cursor + 1) % N;
        self.used += 1;
        self.high_water = self.high_water.max(self.used);
        true
    }

    fn pop(&mut self) -> Option<Event> {
        if self.used == 0 {
            return None;
        }

        let offset = (self.cursor + N - self.used) % N;
        self.used -= 1;
        Some(self.slots[offset])
    }
}

/// Fixed-capacity FIFO ring of [`Event`]s shared with interrupt handlers.
pub struct EventQueue<const N: usize = EVENT_QUEUE_LEN> {
    state: Mutex<RefCell<QueueState<N>>>,
}

impl<const N: usize> EventQueue<N> {
    /// Creates an empty queue; usable in `static` initialisers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(QueueState::new())),
        }
    }

    /// Returns the fixed slot count.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Appends an event.
    ///
    /// When the queue is full the sticky overflow flag is set; an
    /// [`Priority::Important`] event then evicts the oldest entry, a
    /// [`Priority::Normal`] one is dropped. Returns `true` when the event landed.
    pub fn enqueue(&self, event: Event, priority: Priority) -> bool {
        critical_section::with(|cs| self.state.borrow(cs).borrow_mut().push(event, priority))
    }

    /// Removes the oldest event, if any.
    pub fn dequeue(&self) -> Option<Event> {
        critical_section::with(|cs| self.state.borrow(cs).borrow_mut().pop())
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.state.borrow(cs).borrow().used)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deepest the queue has been since the last [`reset`](Self::reset).
    pub fn high_water(&self) -> usize {
        critical_section::with(|cs| self.state.borrow(cs).borrow().high_water)
    }

    /// Returns `true` once any enqueue has found the queue full.
    pub fn overflowed(&self) -> bool {
        critical_section::with(|cs| self.state.borrow(cs).borrow().overflowed)
    }

    pub fn clear_overflowed(&self) {
        critical_section::with(|cs| self.state.borrow(cs).borrow_mut().overflowed = false);
    }

    /// Discards pending events, keeping the statistics. Returns the number
    /// discarded.
    pub fn drain(&self) -> usize {
        critical_section::with(|cs| {
            let mut state = self.state.borrow(cs).borrow_mut();
            let discarded = state.used;
            state.used = 0;
            discarded
        })
    }

    /// Discards pending events and clears the statistics.
    pub fn reset(&self) {
        critical_section::with(|cs| *self.state.borrow(cs).borrow_mut() = QueueState::new());
    }

    /// Blocks in `waiter` until an event is available and returns it.
    ///
    /// The final emptiness check and the entry into the wait happen inside
    /// one critical section so an interrupt arriving in between still wakes
    /// the wait.
    pub fn sleep_until_event<W: IdleWait>(&self, waiter: &mut W) -> Event {
        loop {
            if let Some(event) = self.dequeue() {
                return event;
            }
            waiter.prepare_to_wait();
            let next = critical_section::with(|cs| {
                let event = self.state.borrow(cs).borrow_mut().pop();
                if event.is_none() {
                    waiter.wait_for_interrupt();
                }
                event
            });
            if let Some(event) = next {
                return event;
            }
        }
    }
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
