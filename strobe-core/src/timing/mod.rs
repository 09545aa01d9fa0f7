//! Cycle-accurate delay planning.
//!
//! A requested delay in core cycles is decomposed once, ahead of the
//! time-critical section, into a [`TimingPlan`]: a mixed-radix split into
//! coarse blocks, medium blocks and fine loop iterations, or for very short
//! delays a single fixed-length instruction sled. Executing a plan costs a
//! bounded number of loop constructs whatever the requested duration, so the
//! realized delay stays within a few cycles of the request across the whole
//! range (tens of cycles up to roughly a thousand seconds).

pub mod clock;

use core::fmt;

/// Per-target constants for plan construction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PlannerCalibration {
    /// Requests below this many cycles use the sled.
    pub sled_threshold: u32,
    /// Shortest delay the sled can realize.
    pub sled_floor: u32,
    /// Fixed cost of entering the loop tiers.
    pub overhead: u32,
    /// Cycles per coarse block.
    pub coarse_block: u32,
    /// Cycles per medium block.
    pub medium_block: u32,
    /// Cycles per fine loop iteration.
    pub fine_loop: u32,
}

impl PlannerCalibration {
    pub const DEFAULT: Self = Self {
        sled_threshold: 40,
        sled_floor: 14,
        overhead: 36,
        coarse_block: 50_000_000,
        medium_block: 768,
        fine_loop: 3,
    };

    /// Worst-case difference between a request and its realization for
    /// requests at or above [`sled_floor`](Self::sled_floor).
    pub const TOLERANCE: u64 = 6;

    /// Decomposes `cycles` into a plan.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn plan(&self, cycles: u64) -> TimingPlan {
        let threshold = u64::from(self.sled_threshold);
        if cycles < threshold {
            let floor = u64::from(self.sled_floor);
            let trimmed = if cycles < floor { 0 } else { cycles - floor };
            return TimingPlan {
                sled_offset: (threshold - trimmed) as u8,
                ..TimingPlan::EMPTY
            };
        }

        let mut remaining = cycles.saturating_sub(u64::from(self.overhead));
        let coarse = remaining / u64::from(self.coarse_block);
        remaining %= u64::from(self.coarse_block);
        let medium = remaining / u64::from(self.medium_block);
        remaining %= u64::from(self.medium_block);
        let fine = remaining / u64::from(self.fine_loop);

        TimingPlan {
            coarse: u32::try_from(coarse).unwrap_or(u32::MAX),
            medium: medium as u16,
            fine: fine as u8,
            sled_offset: 0,
        }
    }

    /// Cycles a plan takes to execute on a target matching this calibration.
    #[must_use]
    pub fn realized_cycles(&self, plan: &TimingPlan) -> u64 {
        if plan.is_sled() {
            let threshold = u64::from(self.sled_threshold);
            return u64::from(self.sled_floor) + threshold.saturating_sub(u64::from(plan.sled_offset));
        }
        u64::from(self.overhead)
            + u64::from(plan.coarse) * u64::from(self.coarse_block)
            + u64::from(plan.medium) * u64::from(self.medium_block)
            + u64::from(plan.fine) * u64::from(self.fine_loop)
    }
}

impl Default for PlannerCalibration {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Decomposed delay ready for [`TimingPlan::execute`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TimingPlan {
    pub coarse: u32,
    pub medium: u16,
    pub fine: u8,
    /// Non-zero selects the sled; the value is the number of sled slots
    /// skipped. Mutually exclusive with the loop tiers.
    pub sled_offset: u8,
}

impl TimingPlan {
    const EMPTY: Self = Self {
        coarse: 0,
        medium: 0,
        fine: 0,
        sled_offset: 0,
    };

    #[must_use]
    pub const fn is_sled(&self) -> bool {
        self.sled_offset != 0
    }

    /// Runs the plan: sled, or coarse then medium then fine.
    pub fn execute<D: CycleDelay>(&self, calibration: &PlannerCalibration, delay: &mut D) {
        if self.is_sled() {
            #[allow(clippy::cast_possible_truncation)]
            let cycles = calibration.realized_cycles(self) as u8;
            delay.sled(cycles);
            return;
        }

        delay.delay_cycles(calibration.overhead);
        for _ in 0..self.coarse {
            delay.delay_cycles(calibration.coarse_block);
        }
        for _ in 0..self.medium {
            delay.delay_cycles(calibration.medium_block);
        }
        if self.fine != 0 {
            delay.delay_loop(self.fine);
        }
    }
}

impl fmt::Display for TimingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.coarse, self.medium, self.fine, self.sled_offset
        )
    }
}

/// Precision busy-wait capability of the target.
///
/// Every method spends exactly the cycles it is asked for, including its own
/// call and loop overhead, within the target's error bound.
pub trait CycleDelay {
    /// Busy-waits `cycles` cycles; used for the fixed overhead and for coarse
    /// and medium blocks.
    fn delay_cycles(&mut self, cycles: u32);

    /// Runs `iterations` fine loop iterations.
    fn delay_loop(&mut self, iterations: u8);

    /// Runs a short straight-line sequence lasting `cycles` cycles.
    fn sled(&mut self, cycles: u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAL: PlannerCalibration = PlannerCalibration::DEFAULT;

    #[derive(Default)]
    struct Counting {
        cycles: u64,
        calls: usize,
    }

    impl CycleDelay for Counting {
        fn delay_cycles(&mut self, cycles: u32) {
            self.cycles += u64::from(cycles);
            self.calls += 1;
        }

        fn delay_loop(&mut self, iterations: u8) {
            self.cycles += u64::from(iterations) * u64::from(CAL.fine_loop);
            self.calls += 1;
        }

        fn sled(&mut self, cycles: u8) {
            self.cycles += u64::from(cycles);
            self.calls += 1;
        }
    }

    #[test]
    fn short_requests_use_sled() {
        let plan = CAL.plan(20);
        assert!(plan.is_sled());
        assert_eq!(plan.sled_offset, 34);
        assert_eq!(CAL.realized_cycles(&plan), 20);

        let tiny = CAL.plan(1);
        assert_eq!(tiny.sled_offset, 40);
        assert_eq!(CAL.realized_cycles(&tiny), u64::from(CAL.sled_floor));
    }

    #[test]
    fn long_requests_decompose_by_tier() {
        let plan = CAL.plan(804);
        assert_eq!(
            plan,
            TimingPlan {
                coarse: 0,
                medium: 1,
                fine: 0,
                sled_offset: 0
            }
        );

        let plan = CAL.plan(2 * 50_000_000 + 36 + 768 * 5 + 3 * 7 + 2);
        assert_eq!((plan.coarse, plan.medium, plan.fine), (2, 5, 7));
    }

    #[test]
    fn realized_delay_stays_within_tolerance() {
        let samples = [
            14u64,
            39,
            40,
            41,
            803,
            804,
            805,
            49_999_999,
            50_000_036,
            123_456_789,
            1_000 * 20_000_000,
        ];
        for cycles in samples {
            let plan = CAL.plan(cycles);
            let realized = CAL.realized_cycles(&plan);
            assert!(
                realized.abs_diff(cycles) <= PlannerCalibration::TOLERANCE,
                "{cycles} realized as {realized} via {plan}"
            );
        }
    }

    #[test]
    fn execution_matches_realized_cycles_with_bounded_calls() {
        let plan = CAL.plan(999 * 16_000_000);
        let mut delay = Counting::default();
        plan.execute(&CAL, &mut delay);
        assert_eq!(delay.cycles, CAL.realized_cycles(&plan));

        let mut sled = Counting::default();
        CAL.plan(25).execute(&CAL, &mut sled);
        assert_eq!((sled.cycles, sled.calls), (25, 1));
    }

    #[test]
    fn plan_displays_every_tier() {
        let plan = TimingPlan {
            coarse: 1,
            medium: 2,
            fine: 3,
            sled_offset: 0,
        };
        let mut buf = heapless::String::<32>::new();
        core::fmt::write(&mut buf, format_args!("{plan}")).expect("fits");
        assert_eq!(buf.as_str(), "1 2 3 0");
    }
}
