use embassy_futures::join::join4;
use embassy_futures::select::select;
use embassy_stm32::exti::ExtiInput;
use embassy_time::{Duration, Timer};
use strobe_core::event::{ButtonId, Event, Priority};
use strobe_core::run::InputLevels;

use super::{ENCODER, EVENTS};
use crate::status;

/// Settling time before a button level is trusted.
const BUTTON_DEBOUNCE: Duration = Duration::from_millis(20);

/// Every EXTI-capable front-panel and trigger input.
pub struct Inputs {
    pub encoder_a: ExtiInput<'static>,
    pub encoder_b: ExtiInput<'static>,
    /// Active low.
    pub encoder_button: ExtiInput<'static>,
    /// Active low.
    pub aux_button: ExtiInput<'static>,
    pub trigger_1: ExtiInput<'static>,
    pub trigger_2: ExtiInput<'static>,
}

/// Owns all inputs and feeds the event queue.
#[embassy_executor::task]
pub async fn run(inputs: Inputs) {
    let Inputs {
        mut encoder_a,
        mut encoder_b,
        mut encoder_button,
        mut aux_button,
        mut trigger_1,
        mut trigger_2,
    } = inputs;

    join4(
        encoder_loop(&mut encoder_a, &mut encoder_b),
        button_loop(&mut encoder_button, ButtonId::Encoder),
        button_loop(&mut aux_button, ButtonId::Aux),
        trigger_loop(&mut trigger_1, &mut trigger_2),
    )
    .await;
}

async fn encoder_loop(a: &mut ExtiInput<'static>, b: &mut ExtiInput<'static>) -> ! {
    loop {
        ENCODER.on_transition(a.is_high(), b.is_high(), &EVENTS);
        select(a.wait_for_any_edge(), b.wait_for_any_edge()).await;
    }
}

async fn button_loop(pin: &mut ExtiInput<'static>, id: ButtonId) -> ! {
    let mut pressed = pin.is_low();
    loop {
        pin.wait_for_any_edge().await;
        Timer::after(BUTTON_DEBOUNCE).await;
        let level = pin.is_low();
        if level != pressed {
            pressed = level;
            if !EVENTS.enqueue(Event::button(id, pressed), Priority::Important) {
                defmt::warn!("input: button event dropped");
            }
        }
    }
}

async fn trigger_loop(in1: &mut ExtiInput<'static>, in2: &mut ExtiInput<'static>) -> ! {
    loop {
        let levels = InputLevels::NONE
            .with(InputLevels::INPUT_1, in1.is_high())
            .with(InputLevels::INPUT_2, in2.is_high());
        let previous = status::record_input_levels(levels);
        if status::is_reportable(previous, levels)
            && !EVENTS.enqueue(Event::input_change(levels.bits()), Priority::Normal)
        {
            defmt::warn!("input: trigger change dropped");
        }
        select(in1.wait_for_any_edge(), in2.wait_for_any_edge()).await;
    }
}
