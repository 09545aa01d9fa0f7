use cortex_m::register::primask;
use cortex_m_rt::entry;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::InterruptExecutor;
use embassy_stm32 as hal;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use strobe_core::controller::Controller;
use strobe_core::encoder::QuadratureDecoder;
use strobe_core::event::{EVENT_QUEUE_LEN, EventQueue};
use strobe_core::run::RunEngine;
use strobe_core::timing::PlannerCalibration;
use strobe_core::timing::clock::CycleClock;

use crate::delay::CortexDelay;
use crate::hw::{CORE_CLOCK_HZ, InputPort, OutputPort, RttDisplay, WfiWait};
use crate::telemetry;

mod input_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        cortex_m::interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                cortex_m::interrupt::enable();
            }
        }
    }
}

pub(super) static EVENTS: EventQueue<EVENT_QUEUE_LEN> = EventQueue::new();
pub(super) static ENCODER: QuadratureDecoder = QuadratureDecoder::new();

/// Runs the input task above thread mode so producers preempt the busy-wait
/// control loop.
static INPUT_EXECUTOR: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn USART3_4_5_6_LPUART1() {
    unsafe { INPUT_EXECUTOR.on_interrupt() }
}

#[entry]
fn main() -> ! {
    let p = hal::init(hal::Config::default());
    defmt::info!("strobe controller up at {} Hz", CORE_CLOCK_HZ);

    interrupt::USART3_4_5_6_LPUART1.set_priority(Priority::P1);
    let spawner = INPUT_EXECUTOR.start(interrupt::USART3_4_5_6_LPUART1);

    let inputs = input_task::Inputs {
        encoder_a: ExtiInput::new(p.PA6, p.EXTI6, Pull::Up),
        encoder_b: ExtiInput::new(p.PA7, p.EXTI7, Pull::Up),
        encoder_button: ExtiInput::new(p.PA8, p.EXTI8, Pull::Up),
        aux_button: ExtiInput::new(p.PA9, p.EXTI9, Pull::Up),
        trigger_1: ExtiInput::new(p.PB3, p.EXTI3, Pull::Down),
        trigger_2: ExtiInput::new(p.PB4, p.EXTI4, Pull::Down),
    };
    spawner
        .spawn(input_task::run(inputs))
        .expect("failed to spawn input task");

    let outputs = OutputPort::new(
        Output::new(p.PA0, Level::Low, Speed::VeryHigh),
        Output::new(p.PA1, Level::Low, Speed::VeryHigh),
    );
    let indicators = InputPort::new(
        Output::new(p.PB5, Level::Low, Speed::Low),
        Output::new(p.PB6, Level::Low, Speed::Low),
    );
    let clock = CycleClock::new(CORE_CLOCK_HZ);
    let calibration = PlannerCalibration::DEFAULT;
    let engine = RunEngine::new(outputs, indicators, CortexDelay, clock)
        .with_calibration(calibration);

    let mut controller: Controller<'static, _, _, _, _, _, EVENT_QUEUE_LEN> =
        Controller::new(&EVENTS, engine, RttDisplay, WfiWait::new());
    controller.reset();

    loop {
        let exit = controller.cycle();
        telemetry::report_run(exit, controller.telemetry_mut(), &clock);
        telemetry::report_draw(controller.draw_error());
        telemetry::report_queue(&EVENTS);
    }
}
