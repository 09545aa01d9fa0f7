mod grammar;
mod session;

use std::env;
use std::io::{self, Write};
use std::process;

use critical_section as _;
use strobe_core::controller::Controller;
use strobe_core::event::{EVENT_QUEUE_LEN, EventQueue};
use strobe_core::run::RunEngine;
use strobe_core::timing::PlannerCalibration;
use strobe_core::timing::clock::CycleClock;

use session::{Board, Console};

/// Core clock the emulated board runs at unless told otherwise.
const DEFAULT_CLOCK_HZ: u32 = 20_000_000;

const USAGE: &str = "Usage: strobe-emulator [--clock-hz <hz>] | strobe-emulator <hz>";

fn main() -> io::Result<()> {
    let clock_hz = parse_clock_hz().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let clock = CycleClock::new(clock_hz);
    let calibration = PlannerCalibration::DEFAULT;
    let queue: EventQueue<EVENT_QUEUE_LEN> = EventQueue::new();
    let board = Board::new(&calibration);
    let console = Console::new(io::stdin().lock(), io::stdout(), &queue, &board, clock);

    writeln!(
        io::stdout(),
        "Strobe Controller Emulator ready at {clock_hz} Hz. Type `help` for stimuli or `quit` to leave."
    )?;

    let Board {
        outputs,
        inputs,
        delay,
        screen,
    } = board;
    let engine = RunEngine::new(outputs, inputs, delay, clock).with_calibration(calibration);
    let mut controller: Controller<'_, _, _, _, _, _, EVENT_QUEUE_LEN> =
        Controller::new(&queue, engine, screen, console);
    controller.reset();

    // The console exits the process once stdin closes.
    loop {
        let exit = controller.cycle();
        let mut stdout = io::stdout();
        writeln!(stdout, "run: {exit:?}")?;
        if let Some(error) = controller.draw_error() {
            writeln!(stdout, "draw: {error}")?;
        }
        session::write_report(&mut stdout, controller.telemetry_mut(), &queue, &clock)?;
    }
}

fn parse_clock_hz() -> Result<u32, String> {
    let mut args = env::args().skip(1);
    let Some(arg) = args.next() else {
        return Ok(DEFAULT_CLOCK_HZ);
    };

    let value = if let Some(value) = arg.strip_prefix("--clock-hz=") {
        value.to_string()
    } else if arg == "--clock-hz" {
        args.next()
            .ok_or_else(|| "Expected value after --clock-hz".to_string())?
    } else if arg == "--help" || arg == "-h" {
        println!("{USAGE}");
        process::exit(0);
    } else {
        arg
    };

    match value.parse::<u32>() {
        Ok(0) => Err("Clock frequency must be non-zero".to_string()),
        Ok(hz) => Ok(hz),
        Err(err) => Err(format!("Invalid clock frequency `{value}`: {err}")),
    }
}
