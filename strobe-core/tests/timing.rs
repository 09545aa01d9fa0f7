use strobe_core::config::{DurationUnit, RateUnit};
use strobe_core::timing::clock::CycleClock;
use strobe_core::timing::{CycleDelay, PlannerCalibration};

const CAL: PlannerCalibration = PlannerCalibration::DEFAULT;

#[derive(Default)]
struct Tally(u64);

impl CycleDelay for Tally {
    fn delay_cycles(&mut self, cycles: u32) {
        self.0 += u64::from(cycles);
    }

    fn delay_loop(&mut self, iterations: u8) {
        self.0 += u64::from(iterations) * u64::from(CAL.fine_loop);
    }

    fn sled(&mut self, cycles: u8) {
        self.0 += u64::from(cycles);
    }
}

fn assert_within_tolerance(cycles: u64) {
    let plan = CAL.plan(cycles);
    let realized = CAL.realized_cycles(&plan);
    assert!(
        realized.abs_diff(cycles) <= PlannerCalibration::TOLERANCE,
        "{cycles} cycles realized as {realized} via plan {plan}"
    );

    let mut tally = Tally::default();
    plan.execute(&CAL, &mut tally);
    assert_eq!(tally.0, realized, "execution of {plan} disagrees with its accounting");
}

#[test]
fn every_short_request_is_exact_or_within_tolerance() {
    for cycles in u64::from(CAL.sled_floor)..4_000 {
        assert_within_tolerance(cycles);
    }
}

#[test]
fn pseudo_random_long_requests_stay_within_tolerance() {
    // Full range of the largest setting: 999 s at 20 MHz.
    let max = 999 * 20_000_000u64;
    let mut state = 0x2545_f491_4f6c_dd1du64;
    for _ in 0..20_000 {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        assert_within_tolerance(state % max);
    }
}

#[test]
fn tier_boundaries_stay_within_tolerance() {
    let overhead = u64::from(CAL.overhead);
    let medium = u64::from(CAL.medium_block);
    let coarse = u64::from(CAL.coarse_block);
    for base in [overhead, overhead + medium, overhead + coarse, overhead + 3 * coarse] {
        for delta in 0..8 {
            assert_within_tolerance(base + delta);
            assert_within_tolerance(base.saturating_sub(delta).max(u64::from(CAL.sled_floor)));
        }
    }
}

#[test]
fn every_configurable_duration_plans_within_tolerance() {
    let clock = CycleClock::new(20_000_000);
    for unit in DurationUnit::ALL {
        for value in (1..1_000).step_by(37) {
            assert_within_tolerance(clock.duration_cycles(value, unit));
        }
    }
    for unit in [RateUnit::KiloHertz, RateUnit::Hertz, RateUnit::MilliHertz] {
        for value in (1..1_000).step_by(41) {
            let period = clock.period_cycles(value, unit).expect("non-zero rate");
            if period >= u64::from(CAL.sled_floor) {
                assert_within_tolerance(period);
            }
        }
    }
}

#[test]
fn sub_floor_requests_realize_the_floor() {
    for cycles in 0..u64::from(CAL.sled_floor) {
        let plan = CAL.plan(cycles);
        assert!(plan.is_sled());
        assert_eq!(CAL.realized_cycles(&plan), u64::from(CAL.sled_floor));
    }
}
