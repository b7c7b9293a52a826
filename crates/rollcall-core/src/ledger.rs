//! Per-day attendance state machine.
//!
//! Each (identity, date) pair moves through at most two transitions:
//! Absent → CheckedIn on the first mark of the day, CheckedIn → Complete
//! on the second. Complete is terminal until the date changes, which
//! resets the state implicitly (a new date is a new key).

use crate::types::DayTimes;

/// Attendance state of one identity on one calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceState {
    /// No record exists for the day.
    Absent,
    /// IN recorded, OUT still open.
    CheckedIn,
    /// Both times recorded; no further transitions today.
    Complete,
}

impl AttendanceState {
    /// Derive the state from the stored record, if any.
    ///
    /// A row whose in_time is unset counts as Complete: it can no longer
    /// accept an IN (the row exists) nor an OUT (there is no open IN).
    pub fn from_record(record: Option<DayTimes>) -> Self {
        match record {
            None => AttendanceState::Absent,
            Some(DayTimes {
                in_time: Some(_),
                out_time: None,
            }) => AttendanceState::CheckedIn,
            Some(_) => AttendanceState::Complete,
        }
    }

    /// Decide what a mark event does in this state.
    pub fn advance(self) -> MarkOutcome {
        match self {
            AttendanceState::Absent => MarkOutcome::In,
            AttendanceState::CheckedIn => MarkOutcome::Out,
            AttendanceState::Complete => MarkOutcome::AlreadyRecorded,
        }
    }
}

/// Effect of one mark event on the day's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// Create the day's record with in_time = now.
    In,
    /// Close the open record with out_time = now.
    Out,
    /// Day already complete; informational no-op, not an error.
    AlreadyRecorded,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_no_record_is_absent() {
        assert_eq!(AttendanceState::from_record(None), AttendanceState::Absent);
    }

    #[test]
    fn test_open_record_is_checked_in() {
        let record = DayTimes {
            in_time: Some(t(9, 0)),
            out_time: None,
        };
        assert_eq!(
            AttendanceState::from_record(Some(record)),
            AttendanceState::CheckedIn
        );
    }

    #[test]
    fn test_closed_record_is_complete() {
        let record = DayTimes {
            in_time: Some(t(9, 0)),
            out_time: Some(t(17, 0)),
        };
        assert_eq!(
            AttendanceState::from_record(Some(record)),
            AttendanceState::Complete
        );
    }

    #[test]
    fn test_record_without_in_time_is_complete() {
        // Defies the normal flow, but the row exists: neither IN nor OUT
        // applies, so the day reads as already recorded.
        let record = DayTimes {
            in_time: None,
            out_time: None,
        };
        assert_eq!(
            AttendanceState::from_record(Some(record)),
            AttendanceState::Complete
        );
    }

    #[test]
    fn test_transition_sequence() {
        assert_eq!(AttendanceState::Absent.advance(), MarkOutcome::In);
        assert_eq!(AttendanceState::CheckedIn.advance(), MarkOutcome::Out);
        assert_eq!(
            AttendanceState::Complete.advance(),
            MarkOutcome::AlreadyRecorded
        );
    }

    #[test]
    fn test_complete_is_terminal() {
        // Advancing Complete any number of times stays a no-op.
        for _ in 0..3 {
            assert_eq!(
                AttendanceState::Complete.advance(),
                MarkOutcome::AlreadyRecorded
            );
        }
    }
}
