//! Run telemetry and queue statistics logging.
//!
//! After every editor/run cycle the control loop drains the core telemetry
//! ring, the editor's draw status and the event queue counters through these
//! helpers. Target builds log
//! with defmt over RTT; host builds print the same lines to stdout.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::fmt::Write as _;

use heapless::String;
use strobe_core::editor::DrawError;
use strobe_core::event::EventQueue;
use strobe_core::run::RunExit;
use strobe_core::telemetry::{RunEventKind, TelemetryRecord, TelemetryRecorder};
use strobe_core::timing::clock::CycleClock;

/// Longest formatted telemetry line.
pub const LINE_CAPACITY: usize = 64;

/// Log line buffer.
pub type Line = String<LINE_CAPACITY>;

/// Formats one record as `#<id> <event> t=<micros>us`.
pub fn format_record(record: &TelemetryRecord, clock: &CycleClock) -> Line {
    let mut line = Line::new();
    let micros = clock.cycles_to_micros(record.at_cycles);
    // Truncated output is still useful for bring-up.
    let _ = write!(line, "#{} {} t={}us", record.id, record.event, micros);
    line
}

/// Logs records produced since the previous call plus the run outcome.
pub fn report_run<const T: usize>(
    exit: RunExit,
    telemetry: &mut TelemetryRecorder<T>,
    clock: &CycleClock,
) {
    let lost = telemetry.drain_new(|record| {
        let line = format_record(record, clock);
        match record.event {
            RunEventKind::Rejected(_) => emit_warn("telemetry:run", &line),
            _ => emit_info("telemetry:run", &line),
        }
    });
    if lost != 0 {
        let mut line = Line::new();
        let _ = write!(line, "{lost} records overwritten before logging");
        emit_warn("telemetry:run", &line);
    }

    let mut line = Line::new();
    let _ = write!(line, "exit {exit:?}");
    emit_info("telemetry:run", &line);
}

/// Formats a failed editor draw pass.
pub fn format_draw_error(error: DrawError) -> Line {
    let mut line = Line::new();
    let _ = write!(line, "layout draw failed: {error}");
    line
}

/// Warns when the editor could not draw its layout.
pub fn report_draw(error: Option<DrawError>) {
    if let Some(error) = error {
        emit_warn("telemetry:editor", &format_draw_error(error));
    }
}

/// Logs queue depth statistics and clears the overflow flag.
pub fn report_queue<const N: usize>(queue: &EventQueue<N>) {
    let mut line = Line::new();
    let _ = write!(line, "high-water {}/{}", queue.high_water(), queue.capacity());
    emit_info("telemetry:queue", &line);

    if queue.overflowed() {
        emit_warn("telemetry:queue", "overflowed; events were dropped");
        queue.clear_overflowed();
    }
}

#[cfg(target_os = "none")]
fn emit_info(topic: &str, message: &str) {
    defmt::info!("{} {}", topic, message);
}

#[cfg(target_os = "none")]
fn emit_warn(topic: &str, message: &str) {
    defmt::warn!("{} {}", topic, message);
}

#[cfg(not(target_os = "none"))]
fn emit_info(topic: &str, message: &str) {
    println!("{topic} {message}");
}

#[cfg(not(target_os = "none"))]
fn emit_warn(topic: &str, message: &str) {
    println!("{topic} WARN {message}");
}
