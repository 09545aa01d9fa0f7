//! Conversion from configured durations and rates into core cycles.

use crate::config::{DurationUnit, RateUnit, RateValue, TimeValue};

/// Fixed core clock the timing plans are computed against.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CycleClock {
    hz: u32,
}

impl CycleClock {
    #[must_use]
    pub const fn new(hz: u32) -> Self {
        Self { hz }
    }

    /// Cycles per one unit of `unit`.
    #[must_use]
    pub const fn cycles_per(&self, unit: DurationUnit) -> u64 {
        match unit {
            DurationUnit::Micros => (self.hz / 1_000_000) as u64,
            DurationUnit::Millis => (self.hz / 1_000) as u64,
            DurationUnit::Seconds => self.hz as u64,
        }
    }

    /// Cycles spanned by `value` units.
    #[must_use]
    pub const fn duration_cycles(&self, value: u16, unit: DurationUnit) -> u64 {
        value as u64 * self.cycles_per(unit)
    }

    #[must_use]
    pub const fn time_cycles(&self, time: TimeValue) -> u64 {
        self.duration_cycles(time.value, time.unit)
    }

    /// Cycles per period of a `value` frequency, `None` for zero frequency.
    #[must_use]
    pub const fn period_cycles(&self, value: u16, unit: RateUnit) -> Option<u64> {
        if value == 0 {
            return None;
        }
        let value = value as u64;
        let hz = self.hz as u64;
        Some(match unit {
            RateUnit::MegaHertz => (hz / 1_000_000) / value,
            RateUnit::KiloHertz => (hz / 1_000) / value,
            RateUnit::Hertz => hz / value,
            RateUnit::MilliHertz => (hz * 1_000) / value,
        })
    }

    #[must_use]
    pub const fn rate_cycles(&self, rate: RateValue) -> Option<u64> {
        self.period_cycles(rate.value, rate.unit)
    }

    /// Whole microseconds in `cycles`, for diagnostics.
    #[must_use]
    pub const fn cycles_to_micros(&self, cycles: u64) -> u64 {
        let per_micro = self.cycles_per(DurationUnit::Micros);
        if per_micro == 0 { 0 } else { cycles / per_micro }
    }
}
