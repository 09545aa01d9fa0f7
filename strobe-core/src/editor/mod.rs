//! Modal configuration editor.
//!
//! The editor walks the active layout's controls with the encoder. While
//! browsing, each detent moves to the next or previous selectable field; a
//! release of the encoder button switches to value editing, where detents
//! change the selected field instead. Holding the auxiliary button enlarges
//! numeric steps. The editor exits once the ready flag is set and the
//! operator has returned to browsing.

pub mod render;

use crate::config::layout::{layout_for, Control, Layout};
use crate::config::{Config, FieldId, Holdoff, NUMBER_LIMIT};
use crate::display::{CharDisplay, DisplayMode};
use crate::event::{ButtonId, Event, EventQueue, IdleWait};

pub use render::DrawError;

/// Numeric step while the fast modifier is held.
pub const FAST_STEP: i32 = 50;

/// Whether detents move the cursor or edit the selected value.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EditMode {
    Browsing,
    ValueEdit,
}

/// Effect of one event on the editor.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EditOutcome {
    /// Event did not concern the editor.
    Ignored,
    /// Selection moved to another control.
    Moved,
    /// The selected field's value changed.
    Edited,
    /// Browsing and value editing swapped.
    Toggled,
    /// The fast modifier changed.
    Modifier,
    /// Mode changed; the layout was swapped and the screen must be cleared.
    ModeChanged,
}

impl EditOutcome {
    #[must_use]
    pub const fn needs_clear(self) -> bool {
        matches!(self, EditOutcome::ModeChanged)
    }
}

/// Cursor and modifier state of the editor.
#[derive(Clone, Debug)]
pub struct ConfigEditor {
    active: usize,
    mode: EditMode,
    fast: bool,
    /// Set after a cancelled run so the cancel press's release is not taken
    /// as a toggle.
    swallow_release: bool,
    draw_error: Option<DrawError>,
}

impl ConfigEditor {
    /// Creates an editor homed on the start field of `config`'s layout.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            active: layout_for(config.mode).start,
            mode: EditMode::Browsing,
            fast: false,
            swallow_release: false,
            draw_error: None,
        }
    }

    /// Re-homes the cursor and clears the modal state. A pending
    /// [`ignore_next_release`](Self::ignore_next_release) survives.
    pub fn reset(&mut self, config: &Config) {
        let swallow_release = self.swallow_release;
        *self = Self::new(config);
        self.swallow_release = swallow_release;
    }

    /// Drops the next encoder button release unless a press comes first.
    pub fn ignore_next_release(&mut self) {
        self.swallow_release = true;
    }

    /// Failure of the most recent draw pass, if it failed.
    #[must_use]
    pub const fn draw_error(&self) -> Option<DrawError> {
        self.draw_error
    }

    /// Index of the selected control in the active layout.
    #[must_use]
    pub const fn active(&self) -> usize {
        self.active
    }

    #[must_use]
    pub const fn edit_mode(&self) -> EditMode {
        self.mode
    }

    /// Field under the cursor.
    #[must_use]
    pub fn active_field(&self, config: &Config) -> Option<FieldId> {
        layout_for(config.mode)
            .controls
            .get(self.active)
            .and_then(Control::field)
    }

    /// The editor hands over to the run engine once ready is set and the
    /// operator is browsing.
    #[must_use]
    pub fn is_done(&self, config: &Config) -> bool {
        config.ready && self.mode == EditMode::Browsing
    }

    /// Applies one queued event.
    pub fn handle_event(&mut self, config: &mut Config, event: Event) -> EditOutcome {
        let previous_mode = config.mode;

        let outcome = if let Some(direction) = event.as_encoder() {
            let decrement = direction.is_decrement();
            match self.mode {
                EditMode::Browsing => {
                    self.active = layout_for(config.mode).step(self.active, decrement, config);
                    EditOutcome::Moved
                }
                EditMode::ValueEdit => {
                    if self.edit(config, decrement) {
                        EditOutcome::Edited
                    } else {
                        EditOutcome::Ignored
                    }
                }
            }
        } else if let Some((button, pressed)) = event.as_button() {
            match button {
                ButtonId::Encoder if !pressed && self.swallow_release => {
                    self.swallow_release = false;
                    EditOutcome::Ignored
                }
                ButtonId::Encoder if !pressed => {
                    self.mode = match self.mode {
                        EditMode::Browsing => EditMode::ValueEdit,
                        EditMode::ValueEdit => EditMode::Browsing,
                    };
                    EditOutcome::Toggled
                }
                ButtonId::Encoder => {
                    self.swallow_release = false;
                    EditOutcome::Ignored
                }
                ButtonId::Aux => {
                    self.fast = pressed;
                    EditOutcome::Modifier
                }
            }
        } else {
            EditOutcome::Ignored
        };

        if config.mode != previous_mode {
            self.active = layout_for(config.mode).start;
            self.mode = EditMode::Browsing;
            return EditOutcome::ModeChanged;
        }
        outcome
    }

    fn step(&self) -> i32 {
        if self.fast { FAST_STEP } else { 1 }
    }

    fn edit(&self, config: &mut Config, decrement: bool) -> bool {
        let Some(control) = layout_for(config.mode).controls.get(self.active) else {
            return false;
        };

        match *control {
            Control::Label { .. } => false,
            Control::Select { field, .. } => {
                let (Some(count), Some(index)) =
                    (Config::selection_count(field), config.selection_index(field))
                else {
                    return false;
                };
                let next = if decrement {
                    (index + count - 1) % count
                } else {
                    (index + 1) % count
                };
                config.set_selection_index(field, next)
            }
            Control::Number { field, .. } => {
                let Some(value) = config.number(field) else {
                    return false;
                };
                let limit = i32::from(NUMBER_LIMIT);
                let delta = if decrement { -self.step() } else { self.step() };
                let next = (i32::from(value) + delta).rem_euclid(limit);
                u16::try_from(next).is_ok_and(|next| config.set_number(field, next))
            }
            Control::Holdoff { .. } => {
                config.holdoff = step_holdoff(config.holdoff, decrement, self.step());
                true
            }
        }
    }

    /// Draws the layout and positions the cursor for the current state.
    pub fn render<D: CharDisplay>(&self, config: &Config, display: &mut D) -> Result<(), DrawError> {
        let layout: &Layout = layout_for(config.mode);
        let drawn = render::draw(layout, config, self.active, display);

        display.set_mode(DisplayMode::with_cursor(self.mode == EditMode::Browsing));
        match drawn {
            Ok(Some((col, row))) => display.move_to(col, row),
            Ok(None) | Err(_) => {
                let (cols, rows) = display.size();
                display.move_to(cols.saturating_sub(1), rows.saturating_sub(1));
            }
        }
        drawn.map(|_| ())
    }

    /// Runs the editor until the operator hands over to the run engine.
    ///
    /// Draw errors are shown on screen and kept for
    /// [`draw_error`](Self::draw_error); editing carries on.
    pub fn run<D, W, const N: usize>(
        &mut self,
        config: &mut Config,
        queue: &EventQueue<N>,
        display: &mut D,
        waiter: &mut W,
    ) where
        D: CharDisplay,
        W: IdleWait,
    {
        self.reset(config);
        display.move_to(0, 0);
        display.clear();

        loop {
            self.draw_error = self.render(config, display).err();
            if self.is_done(config) {
                return;
            }

            let event = queue.sleep_until_event(waiter);
            if self.handle_event(config, event).needs_clear() {
                display.clear();
            }
        }
    }
}

/// Holdoff edit with the manual state between 999 and 0.
fn step_holdoff(current: Holdoff, decrement: bool, step: i32) -> Holdoff {
    let value = match current {
        Holdoff::Manual => -1,
        Holdoff::After(value) => i32::from(value),
    };
    let limit = i32::from(NUMBER_LIMIT);

    let mut next = if decrement {
        if value == 0 { -1 } else { value - step }
    } else if value == limit - 1 {
        -1
    } else {
        value + step
    };
    if next < -1 {
        next += limit + 1;
    } else if next > 0 {
        next %= limit;
    }

    match u16::try_from(next) {
        Ok(value) => Holdoff::After(value),
        Err(_) => Holdoff::Manual,
    }
}
