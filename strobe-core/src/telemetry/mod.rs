//! Run telemetry shared by firmware and host targets.
//!
//! The run engine records its lifecycle (arming, rejected parameters, fires,
//! holdoffs, cancellation, completion) into a fixed-size ring buffer. Records
//! are stamped with the number of busy-wait cycles spent since arming, taken
//! from the realized timing plans, so the log reflects pulse timing exactly
//! without needing a free-running timer.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::run::RunError;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Sequential identifier assigned to each record.
pub type RecordId = u32;

/// Discriminated run lifecycle events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RunEventKind {
    /// Parameters validated and trigger inputs armed.
    Armed,
    /// Parameters rejected before any output was driven.
    Rejected(RunError),
    /// The trigger condition evaluated true.
    Triggered,
    /// An output sequence finished; carries the number of pulses driven.
    Fired { pulses: u32 },
    /// An automatic oneshot holdoff started.
    Holdoff,
    /// The operator cancelled while waiting for a trigger.
    Cancelled,
    /// The run ended normally and control returns to the editor.
    Completed,
}

impl fmt::Display for RunEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunEventKind::Armed => f.write_str("armed"),
            RunEventKind::Rejected(error) => write!(f, "rejected {error}"),
            RunEventKind::Triggered => f.write_str("triggered"),
            RunEventKind::Fired { pulses } => write!(f, "fired {pulses}"),
            RunEventKind::Holdoff => f.write_str("holdoff"),
            RunEventKind::Cancelled => f.write_str("cancelled"),
            RunEventKind::Completed => f.write_str("completed"),
        }
    }
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub id: RecordId,
    /// Busy-wait cycles elapsed since the run was armed.
    pub at_cycles: u64,
    pub event: RunEventKind,
}

/// Telemetry ring buffer type alias.
pub type TelemetryRing<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord, CAPACITY>;

/// Records run events into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: TelemetryRing<CAPACITY>,
    next_id: RecordId,
    drained_through: RecordId,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_id: 0,
            drained_through: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no telemetry records are stored.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Records an event and returns its identifier.
    pub fn record(&mut self, event: RunEventKind, at_cycles: u64) -> RecordId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            at_cycles,
            event,
        });

        id
    }

    /// Visits records not yet visited by a previous call, oldest first.
    ///
    /// Records evicted from the ring before being visited are lost; the return
    /// value counts them.
    pub fn drain_new(&mut self, mut visit: impl FnMut(&TelemetryRecord)) -> u32 {
        let mut skipped = 0;
        let mut expected = self.drained_through;
        for record in self.ring.oldest_ordered() {
            // Already visited.
            if record.id.wrapping_sub(self.drained_through) > RecordId::MAX / 2 {
                continue;
            }
            skipped += record.id.wrapping_sub(expected);
            visit(record);
            expected = record.id.wrapping_add(1);
        }
        self.drained_through = self.next_id;
        skipped
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write as _;

    #[test]
    fn events_display_as_log_words() {
        let mut line = heapless::String::<32>::new();
        write!(line, "{}", RunEventKind::Fired { pulses: 12 }).expect("fits");
        assert_eq!(line.as_str(), "fired 12");

        line.clear();
        write!(line, "{}", RunEventKind::Rejected(RunError::ZeroFrequency)).expect("fits");
        assert_eq!(line.as_str(), "rejected ZeroFrequency");
    }

    #[test]
    fn ring_keeps_newest_records() {
        let mut recorder = TelemetryRecorder::<2>::new();
        recorder.record(RunEventKind::Armed, 0);
        recorder.record(RunEventKind::Triggered, 10);
        let id = recorder.record(RunEventKind::Fired { pulses: 5 }, 40);

        assert_eq!(id, 2);
        assert_eq!(recorder.len(), 2);
        let events: [RunEventKind; 2] = {
            let mut iter = recorder.oldest_first().map(|record| record.event);
            [iter.next().expect("first"), iter.next().expect("second")]
        };
        assert_eq!(events, [RunEventKind::Triggered, RunEventKind::Fired { pulses: 5 }]);
        assert_eq!(recorder.latest().map(|record| record.at_cycles), Some(40));
    }

    #[test]
    fn drain_visits_each_record_once_and_counts_evictions() {
        let mut recorder = TelemetryRecorder::<2>::new();
        recorder.record(RunEventKind::Armed, 0);
        recorder.record(RunEventKind::Triggered, 1);
        recorder.record(RunEventKind::Completed, 2);

        let mut seen = 0;
        let skipped = recorder.drain_new(|_| seen += 1);
        assert_eq!((seen, skipped), (2, 1));

        seen = 0;
        assert_eq!(recorder.drain_new(|_| seen += 1), 0);
        assert_eq!(seen, 0);

        recorder.record(RunEventKind::Armed, 0);
        let mut last = None;
        recorder.drain_new(|record| last = Some(record.event));
        assert_eq!(last, Some(RunEventKind::Armed));
    }
}
