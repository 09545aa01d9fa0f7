//! Armed-state loop: wait for a trigger, fire, hold off, re-arm.
//!
//! Pulse sequences run to completion without draining the queue; events that
//! arrive meanwhile are discarded before the next trigger wait.

use crate::config::{Config, DurationUnit, Mode, OutputSelect};
use crate::display::{CharDisplay, DisplayMode};
use crate::event::{ButtonId, EventQueue, IdleWait};
use crate::telemetry::{RunEventKind, TelemetryRecorder};
use crate::timing::clock::CycleClock;
use crate::timing::{CycleDelay, PlannerCalibration, TimingPlan};

use super::{InputLevels, InputSampler, OutputDriver, OutputMask, RunError, RunParameters};

/// Seconds the rejection message stays on screen.
pub const INVALID_HOLD_SECONDS: u16 = 5;

/// How a run ended.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RunExit {
    /// Sequence finished without automatic re-arm.
    Completed,
    /// Operator pressed the encoder button while armed.
    Cancelled,
    /// Parameters were rejected; nothing was driven.
    Invalid(RunError),
}

/// Timing plans for one armed run, computed before the first trigger.
#[derive(Copy, Clone, Debug)]
struct RunPlans {
    wait1: TimingPlan,
    wait2: TimingPlan,
    on: TimingPlan,
    off: TimingPlan,
    holdoff: Option<TimingPlan>,
}

impl RunPlans {
    fn new(params: &RunParameters, calibration: &PlannerCalibration) -> Self {
        Self {
            wait1: calibration.plan(params.wait1),
            wait2: calibration.plan(params.wait2),
            on: calibration.plan(params.on),
            off: calibration.plan(params.off),
            holdoff: params.holdoff.map(|cycles| calibration.plan(cycles)),
        }
    }
}

/// What the queue contained when the engine woke.
#[derive(Copy, Clone, Debug, Default)]
struct Wake {
    cancel: bool,
    manual: bool,
}

/// Trigger/output state machine over the target's output, input and delay
/// capabilities.
pub struct RunEngine<O, I, D> {
    outputs: O,
    inputs: I,
    delay: D,
    clock: CycleClock,
    calibration: PlannerCalibration,
    elapsed: u64,
}

impl<O, I, D> RunEngine<O, I, D>
where
    O: OutputDriver,
    I: InputSampler,
    D: CycleDelay,
{
    pub fn new(outputs: O, inputs: I, delay: D, clock: CycleClock) -> Self {
        Self {
            outputs,
            inputs,
            delay,
            clock,
            calibration: PlannerCalibration::DEFAULT,
            elapsed: 0,
        }
    }

    #[must_use]
    pub fn with_calibration(mut self, calibration: PlannerCalibration) -> Self {
        self.calibration = calibration;
        self
    }

    /// Runs one armed session for `config`.
    ///
    /// Outputs are forced low, inputs disarmed and `config.ready` cleared on
    /// every exit.
    pub fn run<Disp, W, const N: usize, const T: usize>(
        &mut self,
        config: &mut Config,
        queue: &EventQueue<N>,
        display: &mut Disp,
        waiter: &mut W,
        telemetry: &mut TelemetryRecorder<T>,
    ) -> RunExit
    where
        Disp: CharDisplay,
        W: IdleWait,
    {
        self.elapsed = 0;
        display.set_mode(DisplayMode::TEXT);

        let exit = match RunParameters::derive(config, &self.clock) {
            Ok(params) => {
                telemetry.record(RunEventKind::Armed, self.elapsed);
                self.armed(&params, queue, display, waiter, telemetry)
            }
            Err(error) => {
                telemetry.record(RunEventKind::Rejected(error), self.elapsed);
                self.reject(error, display);
                RunExit::Invalid(error)
            }
        };

        self.outputs.set(OutputMask::NONE);
        self.inputs.disarm();
        config.ready = false;
        exit
    }

    fn armed<Disp, W, const N: usize, const T: usize>(
        &mut self,
        params: &RunParameters,
        queue: &EventQueue<N>,
        display: &mut Disp,
        waiter: &mut W,
        telemetry: &mut TelemetryRecorder<T>,
    ) -> RunExit
    where
        Disp: CharDisplay,
        W: IdleWait,
    {
        let plans = RunPlans::new(params, &self.calibration);
        self.inputs.arm(InputLevels::watched_by(&params.triggers));

        loop {
            show_status(
                display,
                match params.mode {
                    Mode::Oneshot => "** RUNNING: ONESHOT",
                    Mode::Strobe => "** RUNNING: STROBE",
                },
            );

            queue.drain();
            let wake = Self::collect_wake(queue, waiter);
            if wake.cancel {
                telemetry.record(RunEventKind::Cancelled, self.elapsed);
                return RunExit::Cancelled;
            }

            // A press drained from the queue counts even if already released.
            let levels = self.inputs.read();
            let levels = if wake.manual { levels | InputLevels::MANUAL } else { levels };
            if !params.trigger_fires(levels) {
                continue;
            }
            telemetry.record(RunEventKind::Triggered, self.elapsed);

            self.wait(&plans.wait1);
            match params.mode {
                Mode::Oneshot => {
                    let pulses = self.fire_oneshot(params, &plans);
                    telemetry.record(RunEventKind::Fired { pulses }, self.elapsed);

                    let Some(holdoff) = plans.holdoff else {
                        telemetry.record(RunEventKind::Completed, self.elapsed);
                        return RunExit::Completed;
                    };
                    show_status(display, "** HOLDOFF");
                    telemetry.record(RunEventKind::Holdoff, self.elapsed);
                    self.wait(&holdoff);
                }
                Mode::Strobe => {
                    let mask = OutputMask::for_output(params.output);
                    for _ in 0..params.cycles {
                        self.outputs.set(mask);
                        self.wait(&plans.on);
                        self.outputs.set(OutputMask::NONE);
                        self.wait(&plans.off);
                    }
                    let pulses = u32::try_from(params.cycles).unwrap_or(u32::MAX);
                    telemetry.record(RunEventKind::Fired { pulses }, self.elapsed);

                    if !params.has_manual_trigger() {
                        telemetry.record(RunEventKind::Completed, self.elapsed);
                        return RunExit::Completed;
                    }
                }
            }
        }
    }

    /// Sleeps until at least one event arrives, then drains the queue.
    fn collect_wake<W: IdleWait, const N: usize>(queue: &EventQueue<N>, waiter: &mut W) -> Wake {
        let mut wake = Wake::default();
        let mut next = Some(queue.sleep_until_event(waiter));
        while let Some(event) = next {
            match event.as_button() {
                Some((ButtonId::Encoder, true)) => wake.cancel = true,
                Some((ButtonId::Aux, true)) => wake.manual = true,
                _ => {}
            }
            next = queue.dequeue();
        }
        wake
    }

    /// Drives one oneshot sequence and returns the number of channel pulses.
    fn fire_oneshot(&mut self, params: &RunParameters, plans: &RunPlans) -> u32 {
        match params.output {
            OutputSelect::Channel1 | OutputSelect::Channel2 => {
                self.outputs.set(OutputMask::for_output(params.output));
                self.wait(&plans.on);
                self.outputs.set(OutputMask::NONE);
                1
            }
            OutputSelect::Both if params.off_before_ch2 => {
                self.outputs.set(OutputMask::CHANNEL_1);
                self.wait(&plans.on);
                self.outputs.set(OutputMask::NONE);
                self.wait(&plans.wait2);
                self.outputs.set(OutputMask::CHANNEL_2);
                self.wait(&plans.on);
                self.outputs.set(OutputMask::NONE);
                2
            }
            OutputSelect::Both => {
                self.outputs.set(OutputMask::CHANNEL_1);
                self.wait(&plans.wait2);
                self.outputs.set(OutputMask::BOTH);
                self.wait(&plans.on);
                self.outputs.set(OutputMask::CHANNEL_2);
                self.wait(&plans.wait2);
                self.outputs.set(OutputMask::NONE);
                2
            }
        }
    }

    fn reject<Disp: CharDisplay>(&mut self, error: RunError, display: &mut Disp) {
        display.clear();
        display.write_str("INVALID PARAMETERS");
        display.move_to(0, 1);
        display.write_str(error.detail());

        let hold = self
            .clock
            .duration_cycles(INVALID_HOLD_SECONDS, DurationUnit::Seconds);
        let plan = self.calibration.plan(hold);
        self.wait(&plan);
    }

    fn wait(&mut self, plan: &TimingPlan) {
        plan.execute(&self.calibration, &mut self.delay);
        self.elapsed += self.calibration.realized_cycles(plan);
    }
}

fn show_status<Disp: CharDisplay>(display: &mut Disp, text: &str) {
    display.move_to(0, 0);
    display.write_str(text);
    display.clear_eol();
}
