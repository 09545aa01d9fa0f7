//! Trigger evaluation and output sequencing.
//!
//! [`RunParameters`] turns the editor's [`Config`] into validated cycle
//! counts once per arm; [`engine::RunEngine`] then waits for triggers and
//! drives the outputs. Hardware access goes through [`OutputDriver`] and
//! [`InputSampler`].

pub mod engine;

use core::fmt;
use core::ops::BitOr;

use crate::config::{Combine, Config, Holdoff, Mode, OutputSelect, TriggerSource};
use crate::timing::clock::CycleClock;

pub use engine::{RunEngine, RunExit};

/// Bitmask of output channels.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct OutputMask(u8);

impl OutputMask {
    pub const NONE: Self = Self(0);
    pub const CHANNEL_1: Self = Self(1 << 0);
    pub const CHANNEL_2: Self = Self(1 << 1);
    pub const BOTH: Self = Self(Self::CHANNEL_1.0 | Self::CHANNEL_2.0);

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Channels driven for an output selection.
    #[must_use]
    pub const fn for_output(output: OutputSelect) -> Self {
        match output {
            OutputSelect::Channel1 => Self::CHANNEL_1,
            OutputSelect::Channel2 => Self::CHANNEL_2,
            OutputSelect::Both => Self::BOTH,
        }
    }
}

impl BitOr for OutputMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Sampled trigger input levels (true = high) plus the manual button.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct InputLevels(u8);

impl InputLevels {
    pub const NONE: Self = Self(0);
    pub const INPUT_1: Self = Self(1 << 0);
    pub const INPUT_2: Self = Self(1 << 1);
    pub const MANUAL: Self = Self(1 << 2);

    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b111)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn with(self, other: Self, present: bool) -> Self {
        if present {
            Self(self.0 | other.0)
        } else {
            Self(self.0 & !other.0)
        }
    }

    /// Inputs a trigger configuration watches; drives the indicator LEDs.
    #[must_use]
    pub fn watched_by(triggers: &[TriggerSource; 2]) -> Self {
        triggers.iter().fold(Self::NONE, |watched, source| match source {
            TriggerSource::Input1 | TriggerSource::Input1Inverted => watched | Self::INPUT_1,
            TriggerSource::Input2 | TriggerSource::Input2Inverted => watched | Self::INPUT_2,
            TriggerSource::Manual => watched | Self::MANUAL,
            TriggerSource::Unused => watched,
        })
    }
}

impl BitOr for InputLevels {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Evaluates one trigger slot against sampled levels.
#[must_use]
pub const fn trigger_active(source: TriggerSource, levels: InputLevels) -> bool {
    match source {
        TriggerSource::Unused => false,
        TriggerSource::Input1 => levels.contains(InputLevels::INPUT_1),
        TriggerSource::Input1Inverted => !levels.contains(InputLevels::INPUT_1),
        TriggerSource::Input2 => levels.contains(InputLevels::INPUT_2),
        TriggerSource::Input2Inverted => !levels.contains(InputLevels::INPUT_2),
        TriggerSource::Manual => levels.contains(InputLevels::MANUAL),
    }
}

/// Drives the output channels.
pub trait OutputDriver {
    /// Sets every channel at once: set bits high, clear bits low.
    fn set(&mut self, mask: OutputMask);
}

/// Reads the trigger inputs.
pub trait InputSampler {
    fn read(&mut self) -> InputLevels;

    /// Enables change notification (and indicators) for `watched` inputs.
    fn arm(&mut self, watched: InputLevels);

    /// Disables change notification and indicators.
    fn disarm(&mut self);
}

/// Why parameters were rejected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RunError {
    ZeroOnTime,
    ZeroFrequency,
    OnTimeNotBelowPeriod,
    NoStrobeCycles,
}

impl RunError {
    /// Short detail line for the 20-column display.
    #[must_use]
    pub const fn detail(self) -> &'static str {
        match self {
            RunError::ZeroOnTime => "on time is zero",
            RunError::ZeroFrequency => "frequency is zero",
            RunError::OnTimeNotBelowPeriod => "on time >= period",
            RunError::NoStrobeCycles => "no strobe cycles",
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Cycle counts derived from a [`Config`] when a run is armed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RunParameters {
    pub mode: Mode,
    pub triggers: [TriggerSource; 2],
    pub combine: Combine,
    pub output: OutputSelect,
    /// Trigger to first output edge.
    pub wait1: u64,
    /// Oneshot with both outputs: gap between the channel 1 and channel 2
    /// edges, already shortened by the on-time when `off_before_ch2`.
    pub wait2: u64,
    /// On-time; for oneshot with both outputs and `!off_before_ch2`, the
    /// overlap during which both channels are high.
    pub on: u64,
    /// Strobe off-time per period.
    pub off: u64,
    /// Strobe period; zero in oneshot mode.
    pub period: u64,
    /// Automatic oneshot holdoff, `None` for manual re-arm.
    pub holdoff: Option<u64>,
    /// Strobe pulses per burst, `ceil(length / period)`.
    pub cycles: u64,
    /// Oneshot with both outputs: channel 1 turns off before channel 2 turns on.
    pub off_before_ch2: bool,
}

impl RunParameters {
    /// Converts and validates `config`.
    ///
    /// # Errors
    ///
    /// Returns the first [`RunError`] found; no output may be driven in that
    /// case.
    pub fn derive(config: &Config, clock: &CycleClock) -> Result<Self, RunError> {
        let mut on = clock.time_cycles(config.on);
        if on == 0 {
            return Err(RunError::ZeroOnTime);
        }

        let wait1 = clock.time_cycles(config.wait);
        let mut wait2 = clock.time_cycles(config.wait2);
        let holdoff = match config.holdoff {
            Holdoff::Manual => None,
            Holdoff::After(value) => {
                Some(clock.duration_cycles(value, config.holdoff_unit))
            }
        };

        let (period, off, cycles) = match config.mode {
            Mode::Strobe => {
                let period = clock
                    .rate_cycles(config.frequency)
                    .ok_or(RunError::ZeroFrequency)?;
                if on >= period {
                    return Err(RunError::OnTimeNotBelowPeriod);
                }
                let length = clock.time_cycles(config.length);
                let cycles = length.div_ceil(period);
                if cycles == 0 {
                    return Err(RunError::NoStrobeCycles);
                }
                (period, period - on, cycles)
            }
            Mode::Oneshot => (0, 0, 0),
        };

        let mut off_before_ch2 = false;
        if config.mode == Mode::Oneshot && config.output == OutputSelect::Both {
            if on < wait2 {
                off_before_ch2 = true;
                wait2 -= on;
            } else {
                on -= wait2;
            }
        }

        Ok(Self {
            mode: config.mode,
            triggers: config.triggers,
            combine: config.combine,
            output: config.output,
            wait1,
            wait2,
            on,
            off,
            period,
            holdoff,
            cycles,
            off_before_ch2,
        })
    }

    /// Evaluates both trigger slots and the combine operator.
    #[must_use]
    pub fn trigger_fires(&self, levels: InputLevels) -> bool {
        self.combine.apply(
            trigger_active(self.triggers[0], levels),
            trigger_active(self.triggers[1], levels),
        )
    }

    #[must_use]
    pub fn has_manual_trigger(&self) -> bool {
        self.triggers.contains(&TriggerSource::Manual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DurationUnit, RateUnit, RateValue, TimeValue};

    const CLOCK: CycleClock = CycleClock::new(20_000_000);

    #[test]
    fn strobe_defaults_derive_counts() {
        let params = RunParameters::derive(&Config::default(), &CLOCK).expect("valid");
        assert_eq!(params.on, 20);
        assert_eq!(params.period, 2_000_000);
        assert_eq!(params.off, 2_000_000 - 20);
        assert_eq!(params.cycles, 100);
        assert_eq!(params.wait1, 2_000_000);
        assert!(!params.off_before_ch2);
    }

    #[test]
    fn strobe_cycles_round_up() {
        let config = Config {
            length: TimeValue::new(25, DurationUnit::Millis),
            frequency: RateValue::new(100, RateUnit::Hertz),
            ..Config::default()
        };
        let params = RunParameters::derive(&config, &CLOCK).expect("valid");
        assert_eq!(params.cycles, 3);
    }

    #[test]
    fn rejects_invalid_parameters() {
        let zero_on = Config {
            on: TimeValue::new(0, DurationUnit::Seconds),
            ..Config::default()
        };
        assert_eq!(RunParameters::derive(&zero_on, &CLOCK), Err(RunError::ZeroOnTime));

        let too_long = Config {
            on: TimeValue::new(100, DurationUnit::Millis),
            ..Config::default()
        };
        assert_eq!(
            RunParameters::derive(&too_long, &CLOCK),
            Err(RunError::OnTimeNotBelowPeriod)
        );

        let no_rate = Config {
            frequency: RateValue::new(0, RateUnit::Hertz),
            ..Config::default()
        };
        assert_eq!(RunParameters::derive(&no_rate, &CLOCK), Err(RunError::ZeroFrequency));

        let no_length = Config {
            length: TimeValue::new(0, DurationUnit::Seconds),
            ..Config::default()
        };
        assert_eq!(RunParameters::derive(&no_length, &CLOCK), Err(RunError::NoStrobeCycles));
    }

    #[test]
    fn oneshot_ignores_frequency_and_orders_channels() {
        let mut config = Config {
            mode: Mode::Oneshot,
            output: OutputSelect::Both,
            frequency: RateValue::new(0, RateUnit::Hertz),
            on: TimeValue::new(10, DurationUnit::Micros),
            wait2: TimeValue::new(4, DurationUnit::Micros),
            holdoff: Holdoff::Manual,
            ..Config::default()
        };
        let overlap = RunParameters::derive(&config, &CLOCK).expect("valid");
        assert!(!overlap.off_before_ch2);
        assert_eq!((overlap.on, overlap.wait2), (120, 80));
        assert_eq!(overlap.holdoff, None);

        config.wait2 = TimeValue::new(30, DurationUnit::Micros);
        let split = RunParameters::derive(&config, &CLOCK).expect("valid");
        assert!(split.off_before_ch2);
        assert_eq!((split.on, split.wait2), (200, 400));
    }

    #[test]
    fn triggers_combine_over_levels() {
        let config = Config {
            triggers: [TriggerSource::Input1, TriggerSource::Input2Inverted],
            combine: Combine::And,
            ..Config::default()
        };
        let params = RunParameters::derive(&config, &CLOCK).expect("valid");
        assert!(params.trigger_fires(InputLevels::INPUT_1));
        assert!(!params.trigger_fires(InputLevels::INPUT_1 | InputLevels::INPUT_2));
        assert!(!params.has_manual_trigger());
        assert_eq!(
            InputLevels::watched_by(&config.triggers),
            InputLevels::INPUT_1 | InputLevels::INPUT_2
        );
    }
}
