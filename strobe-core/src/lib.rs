#![no_std]

// Shared logic for the strobe/trigger controller.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library and expressing every hardware collaborator (display,
// output port, input port, precision delay, idle wait) as a trait the other
// crates implement.

pub mod config;
pub mod controller;
pub mod display;
pub mod editor;
pub mod encoder;
pub mod event;
pub mod run;
pub mod telemetry;
pub mod timing;
