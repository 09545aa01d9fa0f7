//! Operator stimulus grammar.
//!
//! One input line holds one or more stimuli separated by `;`:
//!
//! ```text
//! cw [n] | ccw [n]                      turn the encoder n detents
//! press|release|click enc|aux           front-panel buttons
//! in1 high|low | in2 1|0                trigger input levels
//! show | help | quit
//! ```

use std::fmt;

use strobe_core::event::{ButtonId, Direction};
use winnow::ascii::{dec_uint, space0, space1};
use winnow::combinator::{alt, cut_err, eof, opt, preceded, repeat, terminated};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;

/// What happens to a button.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ButtonAction {
    Press,
    Release,
    /// Press immediately followed by release.
    Click,
}

/// One parsed operator action.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stimulus {
    Turn { direction: Direction, detents: u16 },
    Button { id: ButtonId, action: ButtonAction },
    Input { input: u8, high: bool },
    Show,
    Help,
    Quit,
}

/// Rejected stimulus line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StimulusError {
    /// Byte offset of the failure within the line.
    pub offset: usize,
    pub message: String,
}

impl fmt::Display for StimulusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at column {}: {}", self.offset + 1, self.message)
    }
}

impl std::error::Error for StimulusError {}

pub const HELP: &[&str] = &[
    "cw [n] | ccw [n]              turn the encoder n detents (default 1)",
    "press|release|click enc|aux   encoder push button or auxiliary button",
    "in1|in2 high|low|1|0          set a trigger input level",
    "show                          redraw the screen",
    "quit                          leave the emulator",
    "Separate several stimuli on one line with `;`.",
];

/// Parses one non-empty stimulus line.
///
/// # Errors
///
/// Returns [`StimulusError`] naming the first offending column.
pub fn parse_line(line: &str) -> Result<Vec<Stimulus>, StimulusError> {
    stimuli.parse(line.trim_end()).map_err(|err| StimulusError {
        offset: err.offset(),
        message: err.inner().to_string(),
    })
}

fn stimuli(input: &mut &str) -> ModalResult<Vec<Stimulus>> {
    space0.parse_next(input)?;
    let first = stimulus.parse_next(input)?;
    let mut rest: Vec<Stimulus> =
        repeat(0.., preceded((space0, ';', space0), cut_err(stimulus))).parse_next(input)?;
    (space0, eof)
        .context(StrContext::Expected(StrContextValue::Description(
            "`;` or end of line",
        )))
        .parse_next(input)?;

    rest.insert(0, first);
    Ok(rest)
}

fn stimulus(input: &mut &str) -> ModalResult<Stimulus> {
    alt((
        turn,
        button,
        trigger_input,
        "show".value(Stimulus::Show),
        "help".value(Stimulus::Help),
        alt(("quit", "exit")).value(Stimulus::Quit),
    ))
    .context(StrContext::Label("stimulus"))
    .context(StrContext::Expected(StrContextValue::Description(
        "cw, ccw, press, release, click, in1, in2, show, help or quit",
    )))
    .parse_next(input)
}

fn turn(input: &mut &str) -> ModalResult<Stimulus> {
    let direction = alt((
        "ccw".value(Direction::CounterClockwise),
        "cw".value(Direction::Clockwise),
    ))
    .parse_next(input)?;
    let detents = opt(preceded(space1, dec_uint::<_, u16, _>)).parse_next(input)?;
    Ok(Stimulus::Turn {
        direction,
        detents: detents.unwrap_or(1),
    })
}

fn button(input: &mut &str) -> ModalResult<Stimulus> {
    let action = terminated(
        alt((
            "press".value(ButtonAction::Press),
            "release".value(ButtonAction::Release),
            "click".value(ButtonAction::Click),
        )),
        space1,
    )
    .parse_next(input)?;
    let id = cut_err(alt((
        alt(("encoder", "enc")).value(ButtonId::Encoder),
        "aux".value(ButtonId::Aux),
    )))
    .context(StrContext::Expected(StrContextValue::Description("enc or aux")))
    .parse_next(input)?;
    Ok(Stimulus::Button { id, action })
}

fn trigger_input(input: &mut &str) -> ModalResult<Stimulus> {
    let index = preceded("in", alt(('1'.value(1u8), '2'.value(2u8)))).parse_next(input)?;
    let high = cut_err(preceded(
        space1,
        alt((
            alt(("high", "1")).value(true),
            alt(("low", "0")).value(false),
        )),
    ))
    .context(StrContext::Expected(StrContextValue::Description("high or low")))
    .parse_next(input)?;
    Ok(Stimulus::Input { input: index, high })
}
