//! Mock board shared by the scenario tests.
//!
//! Every collaborator advances or reads one shared virtual cycle counter, so
//! recorded output edges carry exact timestamps.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use strobe_core::event::{ButtonId, Direction, Event, EventQueue, IdleWait, Priority};
use strobe_core::run::{InputLevels, InputSampler, OutputDriver, OutputMask};
use strobe_core::timing::{CycleDelay, PlannerCalibration};

/// Virtual cycle counter.
#[derive(Clone, Default)]
pub struct VirtualClock(Rc<Cell<u64>>);

impl VirtualClock {
    pub fn now(&self) -> u64 {
        self.0.get()
    }

    pub fn advance(&self, cycles: u64) {
        self.0.set(self.0.get() + cycles);
    }
}

/// Delay that only advances the virtual clock.
pub struct VirtualDelay {
    clock: VirtualClock,
    calibration: PlannerCalibration,
}

impl VirtualDelay {
    pub fn new(clock: VirtualClock) -> Self {
        Self {
            clock,
            calibration: PlannerCalibration::DEFAULT,
        }
    }
}

impl CycleDelay for VirtualDelay {
    fn delay_cycles(&mut self, cycles: u32) {
        self.clock.advance(u64::from(cycles));
    }

    fn delay_loop(&mut self, iterations: u8) {
        self.clock
            .advance(u64::from(iterations) * u64::from(self.calibration.fine_loop));
    }

    fn sled(&mut self, cycles: u8) {
        self.clock.advance(u64::from(cycles));
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Edge {
    pub at: u64,
    pub mask: OutputMask,
}

/// Output port recording every write with its timestamp.
#[derive(Clone)]
pub struct RecordingOutputs {
    clock: VirtualClock,
    edges: Rc<RefCell<Vec<Edge>>>,
}

impl RecordingOutputs {
    pub fn new(clock: VirtualClock) -> Self {
        Self {
            clock,
            edges: Rc::default(),
        }
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.edges.borrow().clone()
    }

    /// Returns `true` if any write drove a channel high.
    pub fn ever_driven(&self) -> bool {
        self.edges.borrow().iter().any(|edge| edge.mask != OutputMask::NONE)
    }

    /// High intervals `(rise, fall)` of one channel.
    pub fn pulses(&self, channel: OutputMask) -> Vec<(u64, u64)> {
        let mut pulses = Vec::new();
        let mut rise = None;
        for edge in self.edges.borrow().iter() {
            let high = edge.mask.contains(channel);
            match (rise, high) {
                (None, true) => rise = Some(edge.at),
                (Some(start), false) => {
                    pulses.push((start, edge.at));
                    rise = None;
                }
                _ => {}
            }
        }
        pulses
    }
}

impl OutputDriver for RecordingOutputs {
    fn set(&mut self, mask: OutputMask) {
        self.edges.borrow_mut().push(Edge {
            at: self.clock.now(),
            mask,
        });
    }
}

/// Input port whose levels the scripted waiter changes.
#[derive(Clone, Default)]
pub struct ScriptedInputs {
    levels: Rc<Cell<InputLevels>>,
    armed: Rc<Cell<Option<InputLevels>>>,
    arm_count: Rc<Cell<usize>>,
}

impl ScriptedInputs {
    pub fn set_levels(&self, levels: InputLevels) {
        self.levels.set(levels);
    }

    pub fn armed(&self) -> Option<InputLevels> {
        self.armed.get()
    }

    pub fn arm_count(&self) -> usize {
        self.arm_count.get()
    }
}

impl InputSampler for ScriptedInputs {
    fn read(&mut self) -> InputLevels {
        self.levels.get()
    }

    fn arm(&mut self, watched: InputLevels) {
        self.armed.set(Some(watched));
        self.arm_count.set(self.arm_count.get() + 1);
    }

    fn disarm(&mut self) {
        self.armed.set(None);
    }
}

/// One operator action applied when the control loop goes idle.
#[derive(Copy, Clone, Debug)]
pub enum Stimulus {
    Event(Event, Priority),
    Levels(InputLevels),
}

impl Stimulus {
    pub fn turn(direction: Direction) -> Self {
        Stimulus::Event(Event::encoder(direction), Priority::Normal)
    }

    pub fn button(id: ButtonId, pressed: bool) -> Self {
        Stimulus::Event(Event::button(id, pressed), Priority::Important)
    }

    /// Press and release of a button as two stimuli.
    pub fn click(id: ButtonId) -> [Self; 2] {
        [Self::button(id, true), Self::button(id, false)]
    }

    pub fn input_change(levels: InputLevels) -> [Self; 2] {
        [
            Stimulus::Levels(levels),
            Stimulus::Event(Event::input_change(levels.bits()), Priority::Normal),
        ]
    }
}

/// Idle wait that plays back one batch of stimuli per call.
///
/// Panics when the script runs out, which ends a test that would otherwise
/// wait forever.
pub struct ScriptedWait<'q, const N: usize> {
    queue: &'q EventQueue<N>,
    inputs: ScriptedInputs,
    script: VecDeque<Vec<Stimulus>>,
    waits: usize,
}

impl<'q, const N: usize> ScriptedWait<'q, N> {
    pub fn new(queue: &'q EventQueue<N>, inputs: ScriptedInputs) -> Self {
        Self {
            queue,
            inputs,
            script: VecDeque::new(),
            waits: 0,
        }
    }

    #[must_use]
    pub fn then(mut self, batch: impl IntoIterator<Item = Stimulus>) -> Self {
        self.script.push_back(batch.into_iter().collect());
        self
    }

    pub fn waits(&self) -> usize {
        self.waits
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl<const N: usize> IdleWait for ScriptedWait<'_, N> {
    fn wait_for_interrupt(&mut self) {
        self.waits += 1;
        let batch = self
            .script
            .pop_front()
            .expect("control loop idled after the script ended");
        for stimulus in batch {
            match stimulus {
                Stimulus::Event(event, priority) => {
                    self.queue.enqueue(event, priority);
                }
                Stimulus::Levels(levels) => self.inputs.set_levels(levels),
            }
        }
    }
}

/// Output recorder, scripted inputs and virtual delay over one clock.
pub struct Board {
    pub clock: VirtualClock,
    pub outputs: RecordingOutputs,
    pub inputs: ScriptedInputs,
    pub delay: VirtualDelay,
}

impl Board {
    pub fn new() -> Self {
        let clock = VirtualClock::default();
        Self {
            outputs: RecordingOutputs::new(clock.clone()),
            inputs: ScriptedInputs::default(),
            delay: VirtualDelay::new(clock.clone()),
            clock,
        }
    }
}

/// Collects one screen row into a `String`.
pub fn row<const C: usize, const R: usize>(
    screen: &strobe_core::display::TextScreen<C, R>,
    row: usize,
) -> String {
    screen.row(row).iter().collect()
}
