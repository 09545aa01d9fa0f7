//! Quadrature decoder for the rotary encoder.
//!
//! Both encoder phases are sampled on every edge. The previous and current
//! 2-bit codes index a transition table yielding -1, 0 or +1; four accumulated
//! pulses in one direction make a detent, which becomes one encoder event.

use core::cell::Cell;

use critical_section::Mutex;

use crate::event::{Direction, Event, EventQueue, Priority};

/// Quadrature pulses per mechanical detent.
pub const PULSES_PER_DETENT: i8 = 4;

/// Transition table indexed by `(previous_code << 2) | current_code`.
const TRANSITIONS: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];

/// Both phases high: the detent rest position.
const REST_CODE: u8 = 0b11;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct DecoderState {
    code: u8,
    pulses: i8,
    value: i16,
}

impl DecoderState {
    const fn new() -> Self {
        Self {
            code: REST_CODE,
            pulses: 0,
            value: 0,
        }
    }

    fn step(&mut self, a: bool, b: bool) -> Option<Direction> {
        self.code = ((self.code << 2) & 0x0f) | (u8::from(a) << 1) | u8::from(b);
        self.pulses += TRANSITIONS[usize::from(self.code)];

        if self.pulses >= PULSES_PER_DETENT {
            self.pulses = 0;
            self.value = self.value.saturating_add(1);
            Some(Direction::Clockwise)
        } else if self.pulses <= -PULSES_PER_DETENT {
            self.pulses = 0;
            self.value = self.value.saturating_sub(1);
            Some(Direction::CounterClockwise)
        } else {
            None
        }
    }
}

/// Interrupt-owned decoder state plus a saturating detent counter.
pub struct QuadratureDecoder {
    state: Mutex<Cell<DecoderState>>,
}

impl QuadratureDecoder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(DecoderState::new())),
        }
    }

    /// Feeds one sample of both phases, taken on an edge of either.
    ///
    /// Completing a detent enqueues an encoder event (normal priority) and
    /// returns its direction.
    pub fn on_transition<const N: usize>(
        &self,
        a: bool,
        b: bool,
        queue: &EventQueue<N>,
    ) -> Option<Direction> {
        let detent = critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            let detent = state.step(a, b);
            cell.set(state);
            detent
        });

        if let Some(direction) = detent {
            queue.enqueue(Event::encoder(direction), Priority::Normal);
        }
        detent
    }

    /// Net detent count, saturating at the `i16` limits.
    pub fn value(&self) -> i16 {
        critical_section::with(|cs| self.state.borrow(cs).get().value)
    }

    pub fn set_value(&self, value: i16) {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            state.value = value;
            cell.set(state);
        });
    }
}

impl Default for QuadratureDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Phase samples `(a, b)` produced by one clockwise detent from rest.
pub const CLOCKWISE_DETENT: [(bool, bool); 4] =
    [(false, true), (false, false), (true, false), (true, true)];

/// Phase samples `(a, b)` produced by one counter-clockwise detent from rest.
pub const COUNTER_CLOCKWISE_DETENT: [(bool, bool); 4] =
    [(true, false), (false, false), (false, true), (true, true)];
