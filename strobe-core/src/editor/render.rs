//! Draws a layout onto a [`CharDisplay`].

use core::fmt::{self, Write as _};

use heapless::String;

use crate::config::layout::{Control, Layout};
use crate::config::{Config, Holdoff};
use crate::display::CharDisplay;

/// Widest value field the renderer will justify.
const MAX_FIELD_WIDTH: usize = 15;

/// Text shown for a manual holdoff.
pub const MANUAL_HOLDOFF_LABEL: &str = "MAN";

/// Malformed layout or field state detected while drawing.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DrawError {
    /// Field width too large, or value text wider than its field.
    BadWidth,
    /// Selection index outside the field's label table.
    BadSelection,
    /// Control positioned outside the screen.
    OutOfRange,
}

impl DrawError {
    /// Diagnostic written to the screen when the draw pass aborts.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            DrawError::BadWidth => "BAD WIDTH",
            DrawError::BadSelection => "BAD SELECTION",
            DrawError::OutOfRange => "BAD POSITION",
        }
    }
}

impl fmt::Display for DrawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Renders every control of `layout`.
///
/// Returns the screen position of the first character of the `active`
/// control's value, or `None` when the active control was not drawn. On error
/// the diagnostic is written at the current position and the pass stops.
pub fn draw<D: CharDisplay>(
    layout: &Layout,
    config: &Config,
    active: usize,
    display: &mut D,
) -> Result<Option<(u8, u8)>, DrawError> {
    let mut cursor = None;
    for (index, control) in layout.controls.iter().enumerate() {
        let result = draw_control(layout, index, control, config, display);
        match result {
            Ok(Some(position)) if index == active => cursor = Some(position),
            Ok(_) => {}
            Err(error) => {
                display.write_str(error.message());
                return Err(error);
            }
        }
    }
    Ok(cursor)
}

fn draw_control<D: CharDisplay>(
    layout: &Layout,
    index: usize,
    control: &Control,
    config: &Config,
    display: &mut D,
) -> Result<Option<(u8, u8)>, DrawError> {
    let (col, row) = control.position();

    if let Some(field) = control.field() {
        if config.is_skipped(field) {
            blank_skipped(layout, index, display);
            return Ok(None);
        }
    }

    let (cols, rows) = display.size();
    if col >= cols || row >= rows {
        return Err(DrawError::OutOfRange);
    }
    display.move_to(col, row);

    match *control {
        Control::Label { text, .. } => {
            display.write_str(text);
            Ok(Some((col, row)))
        }
        Control::Select { field, choices, .. } => {
            let label = config
                .selection_index(field)
                .and_then(|index| choices.labels.get(index))
                .ok_or(DrawError::BadSelection)?;
            draw_justified(label, choices.width, display)
        }
        Control::Number { field, width, .. } => {
            let value = config.number(field).ok_or(DrawError::BadSelection)?;
            let text = format_number(value)?;
            draw_justified(&text, width, display)
        }
        Control::Holdoff { width, .. } => match config.holdoff {
            Holdoff::Manual => draw_justified(MANUAL_HOLDOFF_LABEL, width, display),
            Holdoff::After(value) => {
                let text = format_number(value)?;
                draw_justified(&text, width, display)
            }
        },
    }
}

/// Blanks the span a skipped control would occupy: up to the next control on
/// the same row, or to end of line.
fn blank_skipped<D: CharDisplay>(layout: &Layout, index: usize, display: &mut D) {
    let (col, row) = layout.controls[index].position();
    let (cols, _) = display.size();
    if display.position().1 != row {
        display.move_to(col, row);
    }
    let (x, _) = display.position();

    match layout.controls.get(index + 1).map(Control::position) {
        Some((next_col, next_row)) if next_row == row => {
            if x < next_col {
                display.fill(' ', next_col - x);
            }
        }
        _ => {
            if x < cols {
                display.clear_eol();
            }
        }
    }
}

fn format_number(value: u16) -> Result<String<8>, DrawError> {
    let mut text = String::new();
    write!(text, "{value}").map_err(|_| DrawError::BadWidth)?;
    Ok(text)
}

/// Writes `text` right-justified in `width` cells at the cursor and returns
/// the position of its first character.
#[allow(clippy::cast_possible_truncation)]
fn draw_justified<D: CharDisplay>(
    text: &str,
    width: u8,
    display: &mut D,
) -> Result<Option<(u8, u8)>, DrawError> {
    let width_cells = usize::from(width);
    let len = text.chars().count();
    if width_cells > MAX_FIELD_WIDTH || len > width_cells {
        return Err(DrawError::BadWidth);
    }

    let (col, row) = display.position();
    let pad = (width_cells - len) as u8;
    display.fill(' ', pad);
    display.write_str(text);

    if len > 0 {
        Ok(Some((col + pad, row)))
    } else {
        Ok(Some((col, row)))
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::config::layout::{Choices, ONESHOT_LAYOUT, STROBE_LAYOUT};
    use crate::config::{Combine, FieldId, Mode, OutputSelect};
    use crate::display::TextScreen;

    fn rows(screen: &TextScreen<20, 4>) -> [std::string::String; 4] {
        core::array::from_fn(|row| screen.row(row).iter().collect())
    }

    #[test]
    fn strobe_defaults_render_full_screen() {
        let config = Config::default();
        let mut screen = TextScreen::<20, 4>::new();
        let cursor = draw(&STROBE_LAYOUT, &config, STROBE_LAYOUT.start, &mut screen)
            .expect("draw succeeds");

        assert_eq!(
            rows(&screen),
            [
                "Mode: strobe   ready",
                "TRIG: M     Out:   1",
                "Wait:100ms Dur: 10s ",
                "Freq: 10Hz  On:  1µs",
            ]
            .map(std::string::String::from)
        );
        assert_eq!(cursor, Some((15, 0)));
    }

    #[test]
    fn skipped_fields_are_blanked() {
        let mut config = Config {
            mode: Mode::Oneshot,
            output: OutputSelect::Both,
            combine: Combine::And,
            ..Config::default()
        };
        let mut screen = TextScreen::<20, 4>::new();
        draw(&ONESHOT_LAYOUT, &config, 1, &mut screen).expect("draw succeeds");
        assert_eq!(rows(&screen)[2], "Wait:100ms CH2:200ms");
        assert_eq!(rows(&screen)[1], "TRIG: M&    Out:both");

        config.output = OutputSelect::Channel1;
        config.combine = Combine::None;
        config.holdoff = Holdoff::Manual;
        draw(&ONESHOT_LAYOUT, &config, 1, &mut screen).expect("draw succeeds");
        let rendered = rows(&screen);
        assert_eq!(rendered[1], "TRIG: M     Out:   1");
        assert_eq!(rendered[2], "Wait:100ms CH2:     ");
        assert_eq!(rendered[3], "Dur:  1µs Hold:MAN  ");
    }

    #[test]
    fn oversized_label_reports_bad_width() {
        static WIDE: Choices = Choices {
            width: 2,
            labels: &["oneshot", "strobe"],
        };
        static BROKEN: Layout = Layout {
            controls: &[Control::Select {
                col: 0,
                row: 0,
                field: FieldId::Mode,
                choices: &WIDE,
            }],
            start: 0,
        };

        let mut screen = TextScreen::<20, 4>::new();
        let result = draw(&BROKEN, &Config::default(), 0, &mut screen);
        assert_eq!(result, Err(DrawError::BadWidth));
        assert_eq!(&rows(&screen)[0][..9], "BAD WIDTH");
    }

    #[test]
    fn off_screen_control_reports_position() {
        static OFF_SCREEN: Layout = Layout {
            controls: &[Control::Label {
                col: 3,
                row: 7,
                text: "x",
            }],
            start: 0,
        };

        let mut screen = TextScreen::<20, 4>::new();
        let result = draw(&OFF_SCREEN, &Config::default(), 0, &mut screen);
        assert_eq!(result, Err(DrawError::OutOfRange));
    }
}
