#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Cycle-budgeted busy-waits for the Cortex-M0+ core.
//!
//! Every delay runs as a `subs`/`bne` countdown followed by at most two
//! `nop`s. On the M0+ one countdown iteration costs [`SPIN_CYCLES`]: one for
//! `subs`, two for the taken branch. The final branch falls through one cycle
//! early, which the load of the count register pays back.

#[cfg(target_os = "none")]
use strobe_core::timing::CycleDelay;
use strobe_core::timing::PlannerCalibration;

/// Cycles per countdown iteration.
pub const SPIN_CYCLES: u32 = 3;

/// Fixed cost of entering a block delay or the sled from the plan executor,
/// the executor's loop bookkeeping included.
pub const ENTRY_CYCLES: u32 = 6;

const _: () = assert!(
    PlannerCalibration::DEFAULT.fine_loop == SPIN_CYCLES,
    "fine loop calibration must match the countdown loop"
);

/// Countdown iterations and padding realizing one delay request.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SpinBudget {
    /// Cycles already spent reaching the countdown.
    pub entry: u32,
    pub iterations: u32,
    /// Trailing `nop`s, always below [`SPIN_CYCLES`].
    pub pad: u32,
}

impl SpinBudget {
    /// Budget for a block delay or sled whose entry cost is part of the
    /// request.
    #[must_use]
    pub const fn with_entry(cycles: u32) -> Self {
        Self::split(ENTRY_CYCLES, cycles.saturating_sub(ENTRY_CYCLES))
    }

    /// Budget spending all of `cycles` inside the countdown.
    #[must_use]
    pub const fn exact(cycles: u32) -> Self {
        Self::split(0, cycles)
    }

    const fn split(entry: u32, body: u32) -> Self {
        Self {
            entry,
            iterations: body / SPIN_CYCLES,
            pad: body % SPIN_CYCLES,
        }
    }

    /// Cycles the delay takes on the core.
    #[must_use]
    pub const fn cycles(self) -> u32 {
        self.entry + self.iterations * SPIN_CYCLES + self.pad
    }
}

const _: () = assert!(
    SpinBudget::with_entry(PlannerCalibration::DEFAULT.sled_floor).cycles()
        == PlannerCalibration::DEFAULT.sled_floor,
    "sled floor must cover the entry cost"
);

/// Plan executor backend on the core clock.
#[cfg(target_os = "none")]
pub struct CortexDelay;

#[cfg(target_os = "none")]
#[allow(clippy::inline_always)]
impl CycleDelay for CortexDelay {
    #[inline(always)]
    fn delay_cycles(&mut self, cycles: u32) {
        spin(SpinBudget::with_entry(cycles));
    }

    #[inline(always)]
    fn delay_loop(&mut self, iterations: u8) {
        spin(SpinBudget::exact(u32::from(iterations) * SPIN_CYCLES));
    }

    #[inline(always)]
    fn sled(&mut self, cycles: u8) {
        spin(SpinBudget::with_entry(u32::from(cycles)));
    }
}

#[cfg(target_os = "none")]
#[allow(clippy::inline_always)]
#[inline(always)]
fn spin(budget: SpinBudget) {
    if budget.iterations != 0 {
        // SAFETY: register-only countdown; no memory or stack access.
        unsafe {
            core::arch::asm!(
                "2:",
                "subs {count}, #1",
                "bne 2b",
                count = inout("r3") budget.iterations => _,
                options(nomem, nostack),
            );
        }
    }
    match budget.pad {
        0 => {}
        1 => nop(),
        _ => {
            nop();
            nop();
        }
    }
}

#[cfg(target_os = "none")]
#[allow(clippy::inline_always)]
#[inline(always)]
fn nop() {
    // SAFETY: no side effects.
    unsafe { core::arch::asm!("nop", options(nomem, nostack, preserves_flags)) };
}
