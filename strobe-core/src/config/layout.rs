//! Per-mode screen layouts for the 20x4 editor.
//!
//! Each layout is an ordered table of [`Control`] descriptors. Entries must be
//! in ascending (row, column) order: the editor's advance search and the
//! blank-fill of skipped fields both rely on it.

use super::{Config, FieldId, Mode};

/// Display labels for a selection-list field.
#[derive(Debug)]
pub struct Choices {
    /// Right-justified field width in character cells.
    pub width: u8,
    pub labels: &'static [&'static str],
}

pub static MODES: Choices = Choices {
    width: 7,
    labels: &["oneshot", "strobe"],
};

pub static READY: Choices = Choices {
    width: 7,
    labels: &["ready", "*READY*"],
};

pub static TRIGGERS: Choices = Choices {
    width: 2,
    labels: &["", "1", "!1", " 2", "!2", "M"],
};

pub static OUTPUTS: Choices = Choices {
    width: 4,
    labels: &["1", "2", "both"],
};

pub static COMBINES: Choices = Choices {
    width: 1,
    labels: &["", "|", "&", "^"],
};

pub static DURATIONS: Choices = Choices {
    width: 2,
    labels: &["µs", "ms", "s "],
};

pub static RATES: Choices = Choices {
    width: 3,
    labels: &["MHz", "kHz", "Hz ", "mHz"],
};

/// Width of every bounded-integer field.
pub const NUMBER_WIDTH: u8 = 3;

/// One UI element.
#[derive(Debug)]
pub enum Control {
    /// Fixed, never selectable text.
    Label { col: u8, row: u8, text: &'static str },
    /// Selection-list field.
    Select {
        col: u8,
        row: u8,
        field: FieldId,
        choices: &'static Choices,
    },
    /// Bounded integer in `[0, 1000)`.
    Number {
        col: u8,
        row: u8,
        field: FieldId,
        width: u8,
    },
    /// Holdoff value with its extra "manual" state.
    Holdoff { col: u8, row: u8, width: u8 },
}

impl Control {
    #[must_use]
    pub const fn position(&self) -> (u8, u8) {
        match *self {
            Control::Label { col, row, .. }
            | Control::Select { col, row, .. }
            | Control::Number { col, row, .. }
            | Control::Holdoff { col, row, .. } => (col, row),
        }
    }

    /// Field edited by this control, `None` for labels.
    #[must_use]
    pub const fn field(&self) -> Option<FieldId> {
        match *self {
            Control::Label { .. } => None,
            Control::Select { field, .. } | Control::Number { field, .. } => Some(field),
            Control::Holdoff { .. } => Some(FieldId::Holdoff),
        }
    }

    /// Labels are never selectable; fields are skipped per the config.
    #[must_use]
    pub fn is_skipped(&self, config: &Config) -> bool {
        match self.field() {
            Some(field) => config.is_skipped(field),
            None => true,
        }
    }
}

/// Ordered control table plus the index the cursor homes to.
#[derive(Debug)]
pub struct Layout {
    pub controls: &'static [Control],
    pub start: usize,
}

impl Layout {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.controls.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Index of the nearest non-skipped control after (or before) `current`,
    /// wrapping around the table. Returns `current` when nothing is selectable.
    #[must_use]
    pub fn step(&self, current: usize, backwards: bool, config: &Config) -> usize {
        let len = self.controls.len();
        if len == 0 {
            return current;
        }
        let mut index = current % len;
        for _ in 0..len {
            index = if backwards {
                (index + len - 1) % len
            } else {
                (index + 1) % len
            };
            if !self.controls[index].is_skipped(config) {
                return index;
            }
        }
        current
    }
}

pub static ONESHOT_LAYOUT: Layout = Layout {
    controls: &[
        Control::Label { col: 0, row: 0, text: "Mode:" },
        Control::Select { col: 5, row: 0, field: FieldId::Mode, choices: &MODES },
        Control::Select { col: 13, row: 0, field: FieldId::Ready, choices: &READY },
        Control::Label { col: 0, row: 1, text: "TRIG:" },
        Control::Select { col: 5, row: 1, field: FieldId::Trigger1, choices: &TRIGGERS },
        Control::Select { col: 7, row: 1, field: FieldId::Combine, choices: &COMBINES },
        Control::Select { col: 8, row: 1, field: FieldId::Trigger2, choices: &TRIGGERS },
        Control::Label { col: 12, row: 1, text: "Out:" },
        Control::Select { col: 16, row: 1, field: FieldId::Output, choices: &OUTPUTS },
        Control::Label { col: 0, row: 2, text: "Wait:" },
        Control::Number { col: 5, row: 2, field: FieldId::Wait, width: NUMBER_WIDTH },
        Control::Select { col: 8, row: 2, field: FieldId::WaitUnit, choices: &DURATIONS },
        Control::Label { col: 11, row: 2, text: "CH2:" },
        Control::Number { col: 15, row: 2, field: FieldId::Wait2, width: NUMBER_WIDTH },
        Control::Select { col: 18, row: 2, field: FieldId::Wait2Unit, choices: &DURATIONS },
        Control::Label { col: 0, row: 3, text: "Dur:" },
        Control::Number { col: 4, row: 3, field: FieldId::On, width: NUMBER_WIDTH },
        Control::Select { col: 7, row: 3, field: FieldId::OnUnit, choices: &DURATIONS },
        Control::Label { col: 10, row: 3, text: "Hold:" },
        Control::Holdoff { col: 15, row: 3, width: NUMBER_WIDTH },
        Control::Select { col: 18, row: 3, field: FieldId::HoldoffUnit, choices: &DURATIONS },
    ],
    start: 2,
};

pub static STROBE_LAYOUT: Layout = Layout {
    controls: &[
        Control::Label { col: 0, row: 0, text: "Mode:" },
        Control::Select { col: 5, row: 0, field: FieldId::Mode, choices: &MODES },
        Control::Select { col: 13, row: 0, field: FieldId::Ready, choices: &READY },
        Control::Label { col: 0, row: 1, text: "TRIG:" },
        Control::Select { col: 5, row: 1, field: FieldId::Trigger1, choices: &TRIGGERS },
        Control::Select { col: 7, row: 1, field: FieldId::Combine, choices: &COMBINES },
        Control::Select { col: 8, row: 1, field: FieldId::Trigger2, choices: &TRIGGERS },
        Control::Label { col: 12, row: 1, text: "Out:" },
        Control::Select { col: 16, row: 1, field: FieldId::Output, choices: &OUTPUTS },
        Control::Label { col: 0, row: 2, text: "Wait:" },
        Control::Number { col: 5, row: 2, field: FieldId::Wait, width: NUMBER_WIDTH },
        Control::Select { col: 8, row: 2, field: FieldId::WaitUnit, choices: &DURATIONS },
        Control::Label { col: 11, row: 2, text: "Dur:" },
        Control::Number { col: 15, row: 2, field: FieldId::Length, width: NUMBER_WIDTH },
        Control::Select { col: 18, row: 2, field: FieldId::LengthUnit, choices: &DURATIONS },
        Control::Label { col: 0, row: 3, text: "Freq:" },
        Control::Number { col: 5, row: 3, field: FieldId::Frequency, width: NUMBER_WIDTH },
        Control::Select { col: 8, row: 3, field: FieldId::FrequencyUnit, choices: &RATES },
        Control::Label { col: 12, row: 3, text: "On:" },
        Control::Number { col: 15, row: 3, field: FieldId::On, width: NUMBER_WIDTH },
        Control::Select { col: 18, row: 3, field: FieldId::OnUnit, choices: &DURATIONS },
    ],
    start: 2,
};

/// Layout table for `mode`.
#[must_use]
pub const fn layout_for(mode: Mode) -> &'static Layout {
    match mode {
        Mode::Oneshot => &ONESHOT_LAYOUT,
        Mode::Strobe => &STROBE_LAYOUT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Combine, OutputSelect};

    #[test]
    fn layouts_are_in_row_column_order() {
        for layout in [&ONESHOT_LAYOUT, &STROBE_LAYOUT] {
            for pair in layout.controls.windows(2) {
                let (c0, r0) = pair[0].position();
                let (c1, r1) = pair[1].position();
                assert!((r0, c0) < (r1, c1), "{pair:?} out of order");
            }
        }
    }

    #[test]
    fn choice_tables_match_option_counts() {
        for layout in [&ONESHOT_LAYOUT, &STROBE_LAYOUT] {
            for control in layout.controls {
                if let Control::Select { field, choices, .. } = control {
                    assert_eq!(Config::selection_count(*field), Some(choices.labels.len()));
                    for label in choices.labels {
                        assert!(label.chars().count() <= usize::from(choices.width));
                    }
                }
            }
        }
    }

    #[test]
    fn start_field_is_ready_selector() {
        assert_eq!(ONESHOT_LAYOUT.controls[ONESHOT_LAYOUT.start].field(), Some(FieldId::Ready));
        assert_eq!(STROBE_LAYOUT.controls[STROBE_LAYOUT.start].field(), Some(FieldId::Ready));
    }

    #[test]
    fn step_wraps_and_skips_dependent_fields() {
        let config = Config {
            mode: Mode::Oneshot,
            combine: Combine::None,
            output: OutputSelect::Channel1,
            ..Config::default()
        };
        let layout = layout_for(config.mode);

        // Combine (5) forward skips Trigger2 and the "Out:" label.
        assert_eq!(layout.step(5, false, &config), 8);
        // Wait unit (11) forward skips "CH2:", Wait2, Wait2Unit and "Dur:".
        assert_eq!(layout.step(11, false, &config), 16);
        // Last field wraps to the mode selector.
        assert_eq!(layout.step(20, false, &config), 1);
        assert_eq!(layout.step(1, true, &config), 20);
    }
}
