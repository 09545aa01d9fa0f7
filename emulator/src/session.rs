//! Host stand-ins for the controller board and the operator console.
//!
//! Every busy-wait advances a shared virtual cycle counter instead of
//! sleeping, so output edges print with exact cycle timestamps and long
//! holdoffs complete instantly.

use std::cell::{Cell, RefCell};
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use crossterm::queue;
use crossterm::style::{Attribute, Print, SetAttribute};
use strobe_core::display::{CharDisplay, DisplayMode, TextScreen};
use strobe_core::encoder::{CLOCKWISE_DETENT, COUNTER_CLOCKWISE_DETENT, QuadratureDecoder};
use strobe_core::event::{Direction, Event, EventQueue, IdleWait, Priority};
use strobe_core::run::{InputLevels, InputSampler, OutputDriver, OutputMask};
use strobe_core::telemetry::TelemetryRecorder;
use strobe_core::timing::clock::CycleClock;
use strobe_core::timing::{CycleDelay, PlannerCalibration};

use crate::grammar::{self, ButtonAction, Stimulus};

pub const SCREEN_COLS: usize = 20;
pub const SCREEN_ROWS: usize = 4;

pub type Screen = TextScreen<SCREEN_COLS, SCREEN_ROWS>;

/// Shared virtual cycle counter.
#[derive(Clone, Default)]
pub struct VirtualClock(Rc<Cell<u64>>);

impl VirtualClock {
    pub fn now(&self) -> u64 {
        self.0.get()
    }

    fn advance(&self, cycles: u64) {
        self.0.set(self.0.get() + cycles);
    }
}

/// Delay that advances the virtual clock by exactly the requested cycles.
pub struct VirtualDelay {
    clock: VirtualClock,
    fine_loop: u32,
}

impl VirtualDelay {
    pub fn new(clock: VirtualClock, calibration: &PlannerCalibration) -> Self {
        Self {
            clock,
            fine_loop: calibration.fine_loop,
        }
    }
}

impl CycleDelay for VirtualDelay {
    fn delay_cycles(&mut self, cycles: u32) {
        self.clock.advance(u64::from(cycles));
    }

    fn delay_loop(&mut self, iterations: u8) {
        self.clock
            .advance(u64::from(iterations) * u64::from(self.fine_loop));
    }

    fn sled(&mut self, cycles: u8) {
        self.clock.advance(u64::from(cycles));
    }
}

/// Timestamped output change.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Edge {
    pub at: u64,
    pub mask: OutputMask,
}

/// Output channels that log every level change.
#[derive(Clone)]
pub struct EdgeLog {
    clock: VirtualClock,
    level: Rc<Cell<OutputMask>>,
    edges: Rc<RefCell<Vec<Edge>>>,
}

impl EdgeLog {
    pub fn new(clock: VirtualClock) -> Self {
        Self {
            clock,
            level: Rc::default(),
            edges: Rc::default(),
        }
    }

    /// Removes and returns the edges logged so far.
    pub fn take(&self) -> Vec<Edge> {
        self.edges.take()
    }
}

impl OutputDriver for EdgeLog {
    fn set(&mut self, mask: OutputMask) {
        if self.level.replace(mask) != mask {
            self.edges.borrow_mut().push(Edge {
                at: self.clock.now(),
                mask,
            });
        }
    }
}

/// Trigger inputs set from the console.
#[derive(Clone, Default)]
pub struct PanelInputs {
    levels: Rc<Cell<InputLevels>>,
    watched: Rc<Cell<InputLevels>>,
}

impl PanelInputs {
    pub fn levels(&self) -> InputLevels {
        self.levels.get()
    }

    /// Applies a new level and returns `true` when an armed input changed.
    fn set(&self, input: InputLevels, high: bool) -> bool {
        let previous = self.levels.get();
        let next = previous.with(input, high);
        self.levels.set(next);
        (previous.bits() ^ next.bits()) & self.watched.get().bits() != 0
    }
}

impl InputSampler for PanelInputs {
    fn read(&mut self) -> InputLevels {
        self.levels.get()
    }

    fn arm(&mut self, watched: InputLevels) {
        self.watched.set(watched);
    }

    fn disarm(&mut self) {
        self.watched.set(InputLevels::NONE);
    }
}

/// Display handle sharing one screen with the console.
#[derive(Clone, Default)]
pub struct SharedScreen(Rc<RefCell<Screen>>);

impl SharedScreen {
    pub fn snapshot(&self) -> Screen {
        self.0.borrow().clone()
    }
}

impl CharDisplay for SharedScreen {
    fn size(&self) -> (u8, u8) {
        self.0.borrow().size()
    }

    fn move_to(&mut self, col: u8, row: u8) {
        self.0.borrow_mut().move_to(col, row);
    }

    fn position(&self) -> (u8, u8) {
        self.0.borrow().position()
    }

    fn write_str(&mut self, text: &str) {
        self.0.borrow_mut().write_str(text);
    }

    fn clear(&mut self) {
        self.0.borrow_mut().clear();
    }

    fn clear_eol(&mut self) {
        self.0.borrow_mut().clear_eol();
    }

    fn set_mode(&mut self, mode: DisplayMode) {
        self.0.borrow_mut().set_mode(mode);
    }
}

/// Board collaborators plus the handles the console keeps.
pub struct Board {
    pub outputs: EdgeLog,
    pub inputs: PanelInputs,
    pub delay: VirtualDelay,
    pub screen: SharedScreen,
}

impl Board {
    pub fn new(calibration: &PlannerCalibration) -> Self {
        let clock = VirtualClock::default();
        Self {
            outputs: EdgeLog::new(clock.clone()),
            inputs: PanelInputs::default(),
            delay: VirtualDelay::new(clock, calibration),
            screen: SharedScreen::default(),
        }
    }
}

/// Writes run telemetry not yet reported, then queue statistics.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_report<W: Write, const T: usize, const N: usize>(
    writer: &mut W,
    telemetry: &mut TelemetryRecorder<T>,
    queue: &EventQueue<N>,
    clock: &CycleClock,
) -> io::Result<()> {
    let mut lines = Vec::new();
    let lost = telemetry.drain_new(|record| {
        lines.push(format!(
            "telemetry #{} {} t={}us",
            record.id,
            record.event,
            clock.cycles_to_micros(record.at_cycles)
        ));
    });
    for line in lines {
        writeln!(writer, "{line}")?;
    }
    if lost != 0 {
        writeln!(writer, "telemetry: {lost} records lost")?;
    }
    writeln!(writer, "queue: high-water {}/{}", queue.high_water(), N)?;
    if queue.overflowed() {
        writeln!(writer, "queue: overflowed")?;
        queue.clear_overflowed();
    }
    Ok(())
}

/// Operator console: plays stdin lines as interrupts while the controller
/// idles.
pub struct Console<'q, R, W, const N: usize> {
    reader: R,
    writer: W,
    queue: &'q EventQueue<N>,
    encoder: QuadratureDecoder,
    inputs: PanelInputs,
    outputs: EdgeLog,
    screen: SharedScreen,
    clock: CycleClock,
    drawn: Option<u32>,
    closed: bool,
}

impl<'q, R, W, const N: usize> Console<'q, R, W, N>
where
    R: BufRead,
    W: Write,
{
    pub fn new(
        reader: R,
        writer: W,
        queue: &'q EventQueue<N>,
        board: &Board,
        clock: CycleClock,
    ) -> Self {
        Self {
            reader,
            writer,
            queue,
            encoder: QuadratureDecoder::new(),
            inputs: board.inputs.clone(),
            outputs: board.outputs.clone(),
            screen: board.screen.clone(),
            clock,
            drawn: None,
            closed: false,
        }
    }

    #[cfg(test)]
    /// Returns `true` once stdin reached end of input or the operator quit.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[cfg(test)]
    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Prints output edges logged since the previous call.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn flush_edges(&mut self) -> io::Result<()> {
        for edge in self.outputs.take() {
            writeln!(
                self.writer,
                "edge t={} ({}us) ch1={} ch2={}",
                edge.at,
                self.clock.cycles_to_micros(edge.at),
                u8::from(edge.mask.contains(OutputMask::CHANNEL_1)),
                u8::from(edge.mask.contains(OutputMask::CHANNEL_2)),
            )?;
        }
        Ok(())
    }

    /// Draws the screen if it changed since the last draw, or always when
    /// `force` is set.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn render(&mut self, force: bool) -> io::Result<()> {
        let screen = self.screen.snapshot();
        if !force && self.drawn == Some(screen.generation()) {
            return Ok(());
        }
        self.drawn = Some(screen.generation());

        let mode = screen.mode();
        let (cursor_col, cursor_row) = screen.position();
        let border = "-".repeat(SCREEN_COLS);
        queue!(self.writer, Print(format!("+{border}+\n")))?;
        for row in 0..SCREEN_ROWS {
            queue!(self.writer, Print("|"))?;
            for (col, ch) in screen.row(row).iter().enumerate() {
                let at_cursor = mode.cursor
                    && usize::from(cursor_row) == row
                    && usize::from(cursor_col) == col;
                if at_cursor {
                    queue!(
                        self.writer,
                        SetAttribute(Attribute::Reverse),
                        Print(ch),
                        SetAttribute(Attribute::NoReverse)
                    )?;
                } else {
                    queue!(self.writer, Print(ch))?;
                }
            }
            queue!(self.writer, Print("|\n"))?;
        }
        queue!(self.writer, Print(format!("+{border}+\n")))?;
        self.writer.flush()
    }

    /// Applies one parsed stimulus as the interrupt handlers would.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn apply(&mut self, stimulus: Stimulus) -> io::Result<()> {
        match stimulus {
            Stimulus::Turn { direction, detents } => {
                let sequence = match direction {
                    Direction::Clockwise => CLOCKWISE_DETENT,
                    Direction::CounterClockwise => COUNTER_CLOCKWISE_DETENT,
                };
                for _ in 0..detents {
                    for (a, b) in sequence {
                        self.encoder.on_transition(a, b, self.queue);
                    }
                }
            }
            Stimulus::Button { id, action } => {
                let levels: &[bool] = match action {
                    ButtonAction::Press => &[true],
                    ButtonAction::Release => &[false],
                    ButtonAction::Click => &[true, false],
                };
                for &pressed in levels {
                    self.queue.enqueue(Event::button(id, pressed), Priority::Important);
                }
            }
            Stimulus::Input { input, high } => {
                let bit = if input == 1 {
                    InputLevels::INPUT_1
                } else {
                    InputLevels::INPUT_2
                };
                if self.inputs.set(bit, high) {
                    let levels = self.inputs.levels();
                    self.queue
                        .enqueue(Event::input_change(levels.bits()), Priority::Normal);
                }
            }
            Stimulus::Show => self.render(true)?,
            Stimulus::Help => {
                for line in grammar::HELP {
                    writeln!(self.writer, "{line}")?;
                }
            }
            Stimulus::Quit => self.closed = true,
        }
        Ok(())
    }

    /// Reads one line and applies it. Returns `false` at end of input.
    ///
    /// # Errors
    ///
    /// Propagates read and write failures.
    pub fn step(&mut self) -> io::Result<bool> {
        self.flush_edges()?;
        self.render(false)?;

        write!(self.writer, "> ")?;
        self.writer.flush()?;
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            writeln!(self.writer)?;
            self.closed = true;
            return Ok(false);
        }
        if line.trim().is_empty() {
            return Ok(true);
        }

        match grammar::parse_line(&line) {
            Ok(stimuli) => {
                for stimulus in stimuli {
                    self.apply(stimulus)?;
                }
            }
            Err(err) => writeln!(self.writer, "ERR {err}")?,
        }
        Ok(!self.closed)
    }
}

impl<R, W, const N: usize> IdleWait for Console<'_, R, W, N>
where
    R: BufRead,
    W: Write,
{
    fn prepare_to_wait(&mut self) {
        match self.step() {
            Ok(true) => {}
            Ok(false) => {
                let _ = writeln!(self.writer, "Session closed.");
                let _ = self.writer.flush();
                std::process::exit(0);
            }
            Err(err) => {
                eprintln!("console: {err}");
                std::process::exit(1);
            }
        }
    }

    // Stimuli only arrive from the prompt, so there is nothing to sleep on.
    fn wait_for_interrupt(&mut self) {}
}
