//! Slot validation and interval-overlap availability checks
use crate::config::BookingConfig;
use crate::core::error::{DomainError, DomainResult};
use crate::core::types::WorkspaceKind;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

/// Half-open time range `[start, end)` within one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Adjacent ranges (one ends when the other starts) do not overlap
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Remaining capacity for one slot of the day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub remaining: usize,
}

/// Check a requested range against opening hours, granularity and the clock
pub fn validate_request(
    date: NaiveDate,
    range: &TimeRange,
    now: NaiveDateTime,
    config: &BookingConfig,
) -> DomainResult<()> {
    if range.end <= range.start {
        return Err(DomainError::Validation("end time must be after start time".to_string()));
    }

    let open = hour(config.open_hour);
    if range.start < open {
        return Err(DomainError::Validation(format!(
            "bookings start at {:02}:00 at the earliest",
            config.open_hour
        )));
    }
    // close_hour 24 means midnight, which NaiveTime cannot represent as an end
    if config.close_hour < 24 && range.end > hour(config.close_hour) {
        return Err(DomainError::Validation(format!(
            "bookings must end by {:02}:00",
            config.close_hour
        )));
    }

    let slot = config.slot_minutes;
    if range.start.minute() % slot != 0 || range.end.minute() % slot != 0 || range.start.second() != 0 || range.end.second() != 0 {
        return Err(DomainError::Validation(format!(
            "times must fall on {}-minute boundaries",
            slot
        )));
    }

    if range.minutes() < config.min_minutes as i64 {
        return Err(DomainError::Validation(format!(
            "minimum booking length is {} minutes",
            config.min_minutes
        )));
    }

    if date < now.date() || (date == now.date() && range.start < now.time()) {
        return Err(DomainError::Validation("cannot book a slot in the past".to_string()));
    }

    Ok(())
}

/// Number of existing ranges overlapping the candidate
pub fn overlapping_count(existing: &[TimeRange], candidate: &TimeRange) -> usize {
    existing.iter().filter(|range| range.overlaps(candidate)).count()
}

/// Whether the candidate fits beside the existing blocking bookings
pub fn is_available(
    kind: WorkspaceKind,
    capacity: i32,
    existing: &[TimeRange],
    candidate: &TimeRange,
) -> bool {
    overlapping_count(existing, candidate) < kind.concurrency(capacity)
}

/// Remaining capacity per slot across opening hours
pub fn free_slots(
    kind: WorkspaceKind,
    capacity: i32,
    existing: &[TimeRange],
    config: &BookingConfig,
) -> Vec<SlotAvailability> {
    let allowed = kind.concurrency(capacity);
    let step = config.slot_minutes.max(1);
    let open = config.open_hour * 60;
    let close = config.close_hour.min(24) * 60;

    let mut slots = Vec::new();
    let mut minute = open;
    while minute + step <= close {
        let start = minute_of_day(minute);
        let end = if minute + step >= 24 * 60 {
            NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(start)
        } else {
            minute_of_day(minute + step)
        };
        let range = TimeRange::new(start, end);
        let taken = overlapping_count(existing, &range);
        slots.push(SlotAvailability { start, end, remaining: allowed.saturating_sub(taken) });
        minute += step;
    }
    slots
}

fn hour(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h.min(23), 0, 0).unwrap_or(NaiveTime::MIN)
}

fn minute_of_day(minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(minute / 60, minute % 60, 0).unwrap_or(NaiveTime::MIN)
}
