//! Owning context for the control loop.
//!
//! The controller alternates between the configuration editor and the run
//! engine forever. All state the two share (configuration, display, idle
//! wait, telemetry) lives here rather than in globals; only the event queue is
//! borrowed, since interrupt handlers need it as a `static`.

use crate::config::Config;
use crate::display::CharDisplay;
use crate::editor::{ConfigEditor, DrawError};
use crate::event::{EventQueue, IdleWait};
use crate::run::{InputSampler, OutputDriver, RunEngine, RunExit};
use crate::telemetry::{TELEMETRY_RING_CAPACITY, TelemetryRecorder};
use crate::timing::CycleDelay;

pub struct Controller<'q, O, I, D, Disp, W, const N: usize, const T: usize = TELEMETRY_RING_CAPACITY>
{
    config: Config,
    editor: ConfigEditor,
    engine: RunEngine<O, I, D>,
    display: Disp,
    waiter: W,
    queue: &'q EventQueue<N>,
    telemetry: TelemetryRecorder<T>,
}

impl<'q, O, I, D, Disp, W, const N: usize, const T: usize> Controller<'q, O, I, D, Disp, W, N, T>
where
    O: OutputDriver,
    I: InputSampler,
    D: CycleDelay,
    Disp: CharDisplay,
    W: IdleWait,
{
    /// Builds a controller holding the power-on default configuration.
    pub fn new(
        queue: &'q EventQueue<N>,
        engine: RunEngine<O, I, D>,
        display: Disp,
        waiter: W,
    ) -> Self {
        let config = Config::default();
        Self {
            editor: ConfigEditor::new(&config),
            config,
            engine,
            display,
            waiter,
            queue,
            telemetry: TelemetryRecorder::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn display(&self) -> &Disp {
        &self.display
    }

    pub fn queue(&self) -> &'q EventQueue<N> {
        self.queue
    }

    pub fn telemetry_mut(&mut self) -> &mut TelemetryRecorder<T> {
        &mut self.telemetry
    }

    /// Failure of the editor's last draw pass, if it failed.
    pub fn draw_error(&self) -> Option<DrawError> {
        self.editor.draw_error()
    }

    /// Restores the power-on configuration and empties the queue.
    pub fn reset(&mut self) {
        self.config = Config::default();
        self.editor = ConfigEditor::new(&self.config);
        self.queue.reset();
    }

    /// Runs the editor until the operator readies a run, then runs it.
    pub fn cycle(&mut self) -> RunExit {
        self.queue.drain();
        self.editor
            .run(&mut self.config, self.queue, &mut self.display, &mut self.waiter);
        let exit = self.engine.run(
            &mut self.config,
            self.queue,
            &mut self.display,
            &mut self.waiter,
            &mut self.telemetry,
        );
        // The cancel press's release is usually still to come.
        if exit == RunExit::Cancelled {
            self.editor.ignore_next_release();
        }
        exit
    }
}
