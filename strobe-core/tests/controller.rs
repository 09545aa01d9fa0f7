mod common;

use common::{Board, ScriptedWait, Stimulus, row};
use strobe_core::config::Config;
use strobe_core::controller::Controller;
use strobe_core::display::{DisplayMode, TextScreen};
use strobe_core::event::{ButtonId, Direction, Event, EventQueue, Priority};
use strobe_core::run::{OutputMask, RunEngine, RunExit};
use strobe_core::telemetry::RunEventKind;
use strobe_core::timing::clock::CycleClock;

#[test]
fn default_configuration_strobes_on_manual_trigger_until_cancelled() {
    let board = Board::new();
    let queue = EventQueue::<16>::new();
    let waiter = ScriptedWait::new(&queue, board.inputs.clone())
        .then([
            Stimulus::button(ButtonId::Encoder, false),
            Stimulus::turn(Direction::Clockwise),
            Stimulus::button(ButtonId::Encoder, false),
        ])
        .then(Stimulus::click(ButtonId::Aux))
        .then([Stimulus::button(ButtonId::Encoder, true)]);
    let outputs = board.outputs.clone();
    let engine = RunEngine::new(
        board.outputs,
        board.inputs,
        board.delay,
        CycleClock::new(1_000_000),
    );
    let mut controller: Controller<'_, _, _, _, _, _, 16> =
        Controller::new(&queue, engine, TextScreen::<20, 4>::new(), waiter);

    let exit = controller.cycle();

    assert_eq!(exit, RunExit::Cancelled);
    assert!(!controller.config().ready);
    // 10 s at 10 Hz.
    assert_eq!(outputs.pulses(OutputMask::CHANNEL_1).len(), 100);
    assert_eq!(row(controller.display(), 0), "** RUNNING: STROBE  ");
    assert_eq!(controller.display().mode(), DisplayMode::TEXT);
    assert_eq!(controller.draw_error(), None);

    let mut seen = Vec::new();
    let skipped = controller
        .telemetry_mut()
        .drain_new(|record| seen.push(record.event));
    assert_eq!(skipped, 0);
    assert_eq!(seen.first(), Some(&RunEventKind::Armed));
    assert_eq!(seen.last(), Some(&RunEventKind::Cancelled));
    assert!(seen.contains(&RunEventKind::Fired { pulses: 100 }));
}

#[test]
fn reset_restores_defaults_and_empties_the_queue() {
    let board = Board::new();
    let queue = EventQueue::<16>::new();
    let waiter = ScriptedWait::new(&queue, board.inputs.clone());
    let engine = RunEngine::new(
        board.outputs,
        board.inputs,
        board.delay,
        CycleClock::new(1_000_000),
    );
    let mut controller: Controller<'_, _, _, _, _, _, 16> =
        Controller::new(&queue, engine, TextScreen::<20, 4>::new(), waiter);

    controller.config_mut().ready = true;
    controller.config_mut().on.value = 7;
    queue.enqueue(Event::encoder(Direction::Clockwise), Priority::Normal);

    controller.reset();

    assert_eq!(*controller.config(), Config::default());
    assert!(controller.queue().is_empty());
    assert_eq!(controller.queue().high_water(), 0);
}

#[test]
fn release_of_the_cancel_press_does_not_enter_value_edit() {
    let board = Board::new();
    let queue = EventQueue::<16>::new();
    let ready = [
        Stimulus::button(ButtonId::Encoder, false),
        Stimulus::turn(Direction::Clockwise),
        Stimulus::button(ButtonId::Encoder, false),
    ];
    // Any release the editor took as a toggle would leave the second
    // readying batch short and the script would run out.
    let waiter = ScriptedWait::new(&queue, board.inputs.clone())
        .then(ready)
        .then([Stimulus::button(ButtonId::Encoder, true)])
        .then([Stimulus::button(ButtonId::Encoder, false)])
        .then(ready)
        .then([Stimulus::button(ButtonId::Encoder, true)]);
    let engine = RunEngine::new(
        board.outputs,
        board.inputs,
        board.delay,
        CycleClock::new(1_000_000),
    );
    let mut controller: Controller<'_, _, _, _, _, _, 16> =
        Controller::new(&queue, engine, TextScreen::<20, 4>::new(), waiter);

    assert_eq!(controller.cycle(), RunExit::Cancelled);
    assert_eq!(controller.cycle(), RunExit::Cancelled);
    assert!(!controller.config().ready);
}
