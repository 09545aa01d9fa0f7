#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! The input task runs at interrupt priority and the control loop in thread
//! mode; these atomics carry sampled trigger levels and the armed input mask
//! between them.

use portable_atomic::{AtomicU8, Ordering};
use strobe_core::run::InputLevels;

/// Latest sampled trigger input levels (bit 0 = input 1, bit 1 = input 2).
static INPUT_LEVELS: AtomicU8 = AtomicU8::new(0);
/// Inputs whose changes are reported while a run is armed (0 == disarmed).
static WATCHED_INPUTS: AtomicU8 = AtomicU8::new(0);

/// Stores freshly sampled input levels and returns the previous sample.
pub fn record_input_levels(levels: InputLevels) -> InputLevels {
    InputLevels::from_bits(INPUT_LEVELS.swap(levels.bits(), Ordering::Relaxed))
}

/// Returns the most recently sampled input levels.
pub fn input_levels() -> InputLevels {
    InputLevels::from_bits(INPUT_LEVELS.load(Ordering::Relaxed))
}

/// Arms input-change reporting for `watched`.
pub fn set_watched_inputs(watched: InputLevels) {
    WATCHED_INPUTS.store(watched.bits(), Ordering::Relaxed);
}

/// Returns the inputs currently armed for change reporting.
pub fn watched_inputs() -> InputLevels {
    InputLevels::from_bits(WATCHED_INPUTS.load(Ordering::Relaxed))
}

/// Returns `true` when the change from `previous` to `current` touches an
/// armed input.
pub fn is_reportable(previous: InputLevels, current: InputLevels) -> bool {
    let changed = previous.bits() ^ current.bits();
    changed & watched_inputs().bits() != 0
}
