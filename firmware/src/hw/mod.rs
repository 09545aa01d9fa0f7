//! STM32G0 implementations of the `strobe-core` board capabilities.
//!
//! Output channels share one GPIO port so a single BSRR store switches both
//! edges together. Trigger levels are sampled by the input task and read back
//! through [`crate::status`]; this module only drives the indicator LEDs.

#![cfg(target_os = "none")]

use core::cell::RefCell;

use cortex_m::asm;
use critical_section::Mutex;
use embassy_stm32::gpio::{Level, Output};
use embassy_stm32::pac;
use strobe_core::display::{CharDisplay, DisplayMode, TextScreen};
use strobe_core::event::IdleWait;
use strobe_core::run::{InputLevels, InputSampler, OutputDriver, OutputMask};

use crate::status;

/// Core clock after `embassy_stm32::init` with the default HSI16 setup.
pub const CORE_CLOCK_HZ: u32 = 16_000_000;

/// GPIOA pin numbers of the output channels.
const CHANNEL_1_PIN: usize = 0;
const CHANNEL_2_PIN: usize = 1;

pub const SCREEN_COLS: usize = 20;
pub const SCREEN_ROWS: usize = 4;

/// Output channels on PA0/PA1.
pub struct OutputPort<'d> {
    // Held so the pins stay configured as push-pull outputs.
    _channel_1: Output<'d>,
    _channel_2: Output<'d>,
}

impl<'d> OutputPort<'d> {
    pub fn new(channel_1: Output<'d>, channel_2: Output<'d>) -> Self {
        let mut port = Self {
            _channel_1: channel_1,
            _channel_2: channel_2,
        };
        port.set(OutputMask::NONE);
        port
    }
}

impl OutputDriver for OutputPort<'_> {
    fn set(&mut self, mask: OutputMask) {
        let ch1 = mask.contains(OutputMask::CHANNEL_1);
        let ch2 = mask.contains(OutputMask::CHANNEL_2);
        pac::GPIOA.bsrr().write(|w| {
            w.set_bs(CHANNEL_1_PIN, ch1);
            w.set_br(CHANNEL_1_PIN, !ch1);
            w.set_bs(CHANNEL_2_PIN, ch2);
            w.set_br(CHANNEL_2_PIN, !ch2);
        });
    }
}

/// Trigger input port with one indicator LED per physical input.
pub struct InputPort<'d> {
    led_1: Output<'d>,
    led_2: Output<'d>,
}

impl<'d> InputPort<'d> {
    pub fn new(led_1: Output<'d>, led_2: Output<'d>) -> Self {
        Self { led_1, led_2 }
    }

    fn show(&mut self, watched: InputLevels) {
        self.led_1
            .set_level(Level::from(watched.contains(InputLevels::INPUT_1)));
        self.led_2
            .set_level(Level::from(watched.contains(InputLevels::INPUT_2)));
    }
}

impl InputSampler for InputPort<'_> {
    fn read(&mut self) -> InputLevels {
        status::input_levels()
    }

    fn arm(&mut self, watched: InputLevels) {
        status::set_watched_inputs(watched);
        self.show(watched);
    }

    fn disarm(&mut self) {
        status::set_watched_inputs(InputLevels::NONE);
        self.show(InputLevels::NONE);
    }
}

static SCREEN: Mutex<RefCell<TextScreen<SCREEN_COLS, SCREEN_ROWS>>> =
    Mutex::new(RefCell::new(TextScreen::new()));

/// Character display backed by an in-RAM 20x4 screen mirrored over RTT by
/// [`WfiWait`].
pub struct RttDisplay;

impl RttDisplay {
    fn with<R>(f: impl FnOnce(&mut TextScreen<SCREEN_COLS, SCREEN_ROWS>) -> R) -> R {
        critical_section::with(|cs| f(&mut SCREEN.borrow_ref_mut(cs)))
    }
}

impl CharDisplay for RttDisplay {
    fn size(&self) -> (u8, u8) {
        Self::with(|screen| screen.size())
    }

    fn move_to(&mut self, col: u8, row: u8) {
        Self::with(|screen| screen.move_to(col, row));
    }

    fn position(&self) -> (u8, u8) {
        Self::with(|screen| screen.position())
    }

    fn write_str(&mut self, text: &str) {
        Self::with(|screen| screen.write_str(text));
    }

    fn clear(&mut self) {
        Self::with(CharDisplay::clear);
    }

    fn clear_eol(&mut self) {
        Self::with(CharDisplay::clear_eol);
    }

    fn set_mode(&mut self, mode: DisplayMode) {
        Self::with(|screen| screen.set_mode(mode));
    }
}

/// Idle wait that mirrors screen changes, then sleeps until an interrupt is
/// pending.
pub struct WfiWait {
    mirrored: u32,
}

impl WfiWait {
    pub const fn new() -> Self {
        // The screen starts at generation 0 and blank; nothing to mirror.
        Self { mirrored: 0 }
    }
}

impl IdleWait for WfiWait {
    fn prepare_to_wait(&mut self) {
        let changed = critical_section::with(|cs| {
            let screen = SCREEN.borrow_ref(cs);
            (screen.generation() != self.mirrored).then(|| screen.clone())
        });
        let Some(screen) = changed else {
            return;
        };
        self.mirrored = screen.generation();

        let mut buf = [0u8; SCREEN_COLS * 4];
        for row in 0..SCREEN_ROWS {
            defmt::info!("screen:{} |{}|", row, screen.row_text(row, &mut buf));
        }
    }

    fn wait_for_interrupt(&mut self) {
        asm::wfi();
    }
}
