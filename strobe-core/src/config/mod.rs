//! Volatile controller configuration.
//!
//! [`Config`] is the single record the editor mutates and the run engine
//! consumes. Fields are addressed generically through [`FieldId`] so the
//! table-driven editor in [`crate::editor`] can edit any of them without
//! knowing their concrete types.

pub mod layout;

/// Upper bound (exclusive) of every editable numeric field.
pub const NUMBER_LIMIT: u16 = 1000;

/// Operating mode.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Mode {
    /// Fire once per trigger, optionally followed by an automatic holdoff.
    Oneshot,
    /// Fire a fixed-length pulse train per trigger.
    Strobe,
}

impl Mode {
    pub const ALL: [Self; 2] = [Self::Oneshot, Self::Strobe];

    #[must_use]
    pub const fn as_index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::ALL.len() {
            Some(Self::ALL[index])
        } else {
            None
        }
    }
}

/// What a trigger slot watches.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TriggerSource {
    /// Slot unused; evaluates false.
    Unused,
    /// Input 1 high.
    Input1,
    /// Input 1 low.
    Input1Inverted,
    /// Input 2 high.
    Input2,
    /// Input 2 low.
    Input2Inverted,
    /// The auxiliary front-panel button.
    Manual,
}

impl TriggerSource {
    pub const ALL: [Self; 6] = [
        Self::Unused,
        Self::Input1,
        Self::Input1Inverted,
        Self::Input2,
        Self::Input2Inverted,
        Self::Manual,
    ];

    #[must_use]
    pub const fn as_index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::ALL.len() {
            Some(Self::ALL[index])
        } else {
            None
        }
    }
}

/// Logical operator joining the two trigger slots.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Combine {
    /// Only the first slot is evaluated.
    None,
    Or,
    And,
    Xor,
}

impl Combine {
    pub const ALL: [Self; 4] = [Self::None, Self::Or, Self::And, Self::Xor];

    #[must_use]
    pub const fn as_index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::ALL.len() {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// Applies the operator to the two slot results.
    #[must_use]
    pub const fn apply(self, first: bool, second: bool) -> bool {
        match self {
            Self::None => first,
            Self::Or => first || second,
            Self::And => first && second,
            Self::Xor => first ^ second,
        }
    }
}

/// Output channels driven on fire.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputSelect {
    Channel1,
    Channel2,
    Both,
}

impl OutputSelect {
    pub const ALL: [Self; 3] = [Self::Channel1, Self::Channel2, Self::Both];

    #[must_use]
    pub const fn as_index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::ALL.len() {
            Some(Self::ALL[index])
        } else {
            None
        }
    }
}

/// Unit of a duration field.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DurationUnit {
    Micros,
    Millis,
    Seconds,
}

impl DurationUnit {
    pub const ALL: [Self; 3] = [Self::Micros, Self::Millis, Self::Seconds];

    #[must_use]
    pub const fn as_index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::ALL.len() {
            Some(Self::ALL[index])
        } else {
            None
        }
    }
}

/// Unit of the strobe frequency field.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RateUnit {
    MegaHertz,
    KiloHertz,
    Hertz,
    MilliHertz,
}

impl RateUnit {
    pub const ALL: [Self; 4] = [
        Self::MegaHertz,
        Self::KiloHertz,
        Self::Hertz,
        Self::MilliHertz,
    ];

    #[must_use]
    pub const fn as_index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::ALL.len() {
            Some(Self::ALL[index])
        } else {
            None
        }
    }
}

/// A duration value paired with its unit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TimeValue {
    pub value: u16,
    pub unit: DurationUnit,
}

impl TimeValue {
    #[must_use]
    pub const fn new(value: u16, unit: DurationUnit) -> Self {
        Self { value, unit }
    }
}

/// A frequency value paired with its unit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RateValue {
    pub value: u16,
    pub unit: RateUnit,
}

impl RateValue {
    #[must_use]
    pub const fn new(value: u16, unit: RateUnit) -> Self {
        Self { value, unit }
    }
}

/// Oneshot holdoff: either an automatic delay or wait for the operator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Holdoff {
    /// No automatic re-arm; the run ends after one fire.
    Manual,
    /// Re-arm after this many holdoff units.
    After(u16),
}

/// Stable identifiers for every editable field.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FieldId {
    Mode,
    Ready,
    Trigger1,
    Combine,
    Trigger2,
    Output,
    Wait,
    WaitUnit,
    Wait2,
    Wait2Unit,
    On,
    OnUnit,
    Frequency,
    FrequencyUnit,
    Length,
    LengthUnit,
    Holdoff,
    HoldoffUnit,
}

/// The controller's complete user-tunable state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub mode: Mode,
    /// Operator hand-off flag; set in the editor, cleared after every run.
    pub ready: bool,
    pub triggers: [TriggerSource; 2],
    pub combine: Combine,
    pub output: OutputSelect,
    /// Delay from trigger to the first output edge.
    pub wait: TimeValue,
    /// Delay from the channel 1 edge to the channel 2 edge (oneshot, both outputs).
    pub wait2: TimeValue,
    pub on: TimeValue,
    pub frequency: RateValue,
    /// Strobe burst length.
    pub length: TimeValue,
    pub holdoff: Holdoff,
    pub holdoff_unit: DurationUnit,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Strobe,
            ready: false,
            triggers: [TriggerSource::Manual, TriggerSource::Unused],
            combine: Combine::None,
            output: OutputSelect::Channel1,
            wait: TimeValue::new(100, DurationUnit::Millis),
            wait2: TimeValue::new(200, DurationUnit::Millis),
            on: TimeValue::new(1, DurationUnit::Micros),
            frequency: RateValue::new(10, RateUnit::Hertz),
            length: TimeValue::new(10, DurationUnit::Seconds),
            holdoff: Holdoff::After(2),
            holdoff_unit: DurationUnit::Seconds,
        }
    }
}

impl Config {
    /// Returns `true` when `field` is irrelevant under the current settings.
    #[must_use]
    pub fn is_skipped(&self, field: FieldId) -> bool {
        match field {
            FieldId::Wait2 | FieldId::Wait2Unit => self.output != OutputSelect::Both,
            FieldId::Trigger2 => self.combine == Combine::None,
            FieldId::HoldoffUnit => self.holdoff == Holdoff::Manual,
            _ => false,
        }
    }

    /// Current option index of a selection-list field.
    #[must_use]
    pub fn selection_index(&self, field: FieldId) -> Option<usize> {
        let index = match field {
            FieldId::Mode => self.mode.as_index(),
            FieldId::Ready => usize::from(self.ready),
            FieldId::Trigger1 => self.triggers[0].as_index(),
            FieldId::Trigger2 => self.triggers[1].as_index(),
            FieldId::Combine => self.combine.as_index(),
            FieldId::Output => self.output.as_index(),
            FieldId::WaitUnit => self.wait.unit.as_index(),
            FieldId::Wait2Unit => self.wait2.unit.as_index(),
            FieldId::OnUnit => self.on.unit.as_index(),
            FieldId::FrequencyUnit => self.frequency.unit.as_index(),
            FieldId::LengthUnit => self.length.unit.as_index(),
            FieldId::HoldoffUnit => self.holdoff_unit.as_index(),
            FieldId::Wait
            | FieldId::Wait2
            | FieldId::On
            | FieldId::Frequency
            | FieldId::Length
            | FieldId::Holdoff => return None,
        };
        Some(index)
    }

    /// Number of options of a selection-list field.
    #[must_use]
    pub const fn selection_count(field: FieldId) -> Option<usize> {
        let count = match field {
            FieldId::Mode => Mode::ALL.len(),
            FieldId::Ready => 2,
            FieldId::Trigger1 | FieldId::Trigger2 => TriggerSource::ALL.len(),
            FieldId::Combine => Combine::ALL.len(),
            FieldId::Output => OutputSelect::ALL.len(),
            FieldId::WaitUnit
            | FieldId::Wait2Unit
            | FieldId::OnUnit
            | FieldId::LengthUnit
            | FieldId::HoldoffUnit => DurationUnit::ALL.len(),
            FieldId::FrequencyUnit => RateUnit::ALL.len(),
            FieldId::Wait
            | FieldId::Wait2
            | FieldId::On
            | FieldId::Frequency
            | FieldId::Length
            | FieldId::Holdoff => return None,
        };
        Some(count)
    }

    /// Stores an option index; returns `false` for out-of-range indices or
    /// non-selection fields.
    pub fn set_selection_index(&mut self, field: FieldId, index: usize) -> bool {
        fn store<T>(slot: &mut T, value: Option<T>) -> bool {
            match value {
                Some(value) => {
                    *slot = value;
                    true
                }
                None => false,
            }
        }

        match field {
            FieldId::Mode => store(&mut self.mode, Mode::from_index(index)),
            FieldId::Ready => store(&mut self.ready, (index < 2).then_some(index == 1)),
            FieldId::Trigger1 => store(&mut self.triggers[0], TriggerSource::from_index(index)),
            FieldId::Trigger2 => store(&mut self.triggers[1], TriggerSource::from_index(index)),
            FieldId::Combine => store(&mut self.combine, Combine::from_index(index)),
            FieldId::Output => store(&mut self.output, OutputSelect::from_index(index)),
            FieldId::WaitUnit => store(&mut self.wait.unit, DurationUnit::from_index(index)),
            FieldId::Wait2Unit => store(&mut self.wait2.unit, DurationUnit::from_index(index)),
            FieldId::OnUnit => store(&mut self.on.unit, DurationUnit::from_index(index)),
            FieldId::FrequencyUnit => store(&mut self.frequency.unit, RateUnit::from_index(index)),
            FieldId::LengthUnit => store(&mut self.length.unit, DurationUnit::from_index(index)),
            FieldId::HoldoffUnit => store(&mut self.holdoff_unit, DurationUnit::from_index(index)),
            FieldId::Wait
            | FieldId::Wait2
            | FieldId::On
            | FieldId::Frequency
            | FieldId::Length
            | FieldId::Holdoff => false,
        }
    }

    /// Current value of a bounded-integer field.
    #[must_use]
    pub const fn number(&self, field: FieldId) -> Option<u16> {
        match field {
            FieldId::Wait => Some(self.wait.value),
            FieldId::Wait2 => Some(self.wait2.value),
            FieldId::On => Some(self.on.value),
            FieldId::Frequency => Some(self.frequency.value),
            FieldId::Length => Some(self.length.value),
            _ => None,
        }
    }

    /// Stores a bounded-integer value; rejects values at or above
    /// [`NUMBER_LIMIT`] and non-numeric fields.
    pub fn set_number(&mut self, field: FieldId, value: u16) -> bool {
        if value >= NUMBER_LIMIT {
            return false;
        }
        let slot = match field {
            FieldId::Wait => &mut self.wait.value,
            FieldId::Wait2 => &mut self.wait2.value,
            FieldId::On => &mut self.on.value,
            FieldId::Frequency => &mut self.frequency.value,
            FieldId::Length => &mut self.length.value,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Returns `true` when either trigger slot is the manual button.
    #[must_use]
    pub fn has_manual_trigger(&self) -> bool {
        self.triggers.contains(&TriggerSource::Manual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_power_on_state() {
        let config = Config::default();
        assert_eq!(config.mode, Mode::Strobe);
        assert!(!config.ready);
        assert_eq!(config.triggers, [TriggerSource::Manual, TriggerSource::Unused]);
        assert_eq!(config.wait, TimeValue::new(100, DurationUnit::Millis));
        assert_eq!(config.frequency, RateValue::new(10, RateUnit::Hertz));
        assert_eq!(config.holdoff, Holdoff::After(2));
    }

    #[test]
    fn skip_predicate_tracks_dependent_fields() {
        let mut config = Config::default();
        assert!(config.is_skipped(FieldId::Wait2));
        assert!(config.is_skipped(FieldId::Trigger2));
        assert!(!config.is_skipped(FieldId::HoldoffUnit));

        config.output = OutputSelect::Both;
        config.combine = Combine::Xor;
        config.holdoff = Holdoff::Manual;
        assert!(!config.is_skipped(FieldId::Wait2Unit));
        assert!(!config.is_skipped(FieldId::Trigger2));
        assert!(config.is_skipped(FieldId::HoldoffUnit));
    }

    #[test]
    fn selection_access_is_bounded() {
        let mut config = Config::default();
        assert!(config.set_selection_index(FieldId::FrequencyUnit, 3));
        assert_eq!(config.frequency.unit, RateUnit::MilliHertz);
        assert!(!config.set_selection_index(FieldId::FrequencyUnit, 4));
        assert!(config.set_selection_index(FieldId::Ready, 1));
        assert!(config.ready);
        assert!(!config.set_selection_index(FieldId::Wait, 0));
        assert_eq!(config.selection_index(FieldId::Holdoff), None);
    }

    #[test]
    fn numbers_stay_below_limit() {
        let mut config = Config::default();
        assert!(config.set_number(FieldId::Wait2, 999));
        assert_eq!(config.number(FieldId::Wait2), Some(999));
        assert!(!config.set_number(FieldId::Wait2, 1000));
        assert!(!config.set_number(FieldId::Mode, 1));
    }

    #[test]
    fn combine_truth_table() {
        assert!(Combine::None.apply(true, false));
        assert!(!Combine::None.apply(false, true));
        assert!(Combine::Or.apply(false, true));
        assert!(!Combine::And.apply(true, false));
        assert!(Combine::Xor.apply(true, false));
        assert!(!Combine::Xor.apply(true, true));
    }
}
