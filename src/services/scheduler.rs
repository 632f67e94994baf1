use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::models::{SchedulingRequest, TimeSlot};
use crate::services::calendar::CalendarSource;
use crate::services::intervals::{self, BusyMap};
use crate::services::oracle::TextOracle;

const MAX_SLOTS: usize = 3;
const SCAN_DAYS: i64 = 7;
const STEP_MINUTES: i64 = 60;

/// Point-check result. `CannotVerify` is distinct from `Unavailable`:
/// callers must not collapse it into either accept or reject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotVerdict {
    Available,
    Unavailable { reason: String },
    CannotVerify { reason: String },
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Time-of-day addition without midnight wraparound; None past 24:00.
fn add_minutes(time: NaiveTime, minutes: u32) -> Option<NaiveTime> {
    let total = time.signed_duration_since(NaiveTime::MIN) + Duration::minutes(minutes as i64);
    if total >= Duration::hours(24) {
        return None;
    }
    Some(NaiveTime::MIN + total)
}

/// Enumerate free slots over the next seven calendar days, starting tomorrow.
/// Weekends are always skipped. Candidates slide across working hours in
/// fixed 60-minute steps and are excluded on any busy-interval overlap.
/// Returns at most three slots, in day order then slot order.
pub fn compute_slots(
    busy: &BusyMap,
    request: &SchedulingRequest,
    today: NaiveDate,
) -> Vec<TimeSlot> {
    let mut slots = Vec::new();

    'days: for offset in 1..=SCAN_DAYS {
        let date = today + Duration::days(offset);
        if is_weekend(date) {
            continue;
        }

        let day_busy = busy.get(&date).map(Vec::as_slice).unwrap_or(&[]);

        let mut start = request.working_hours.start;
        loop {
            let Some(end) = add_minutes(start, request.meeting_duration_minutes) else {
                break;
            };
            if end > request.working_hours.end {
                break;
            }

            let conflicted = day_busy.iter().any(|b| b.overlaps(start, end));
            if !conflicted {
                if let Ok(slot) = TimeSlot::new(date, start, end) {
                    slots.push(slot);
                }
                if slots.len() >= MAX_SLOTS {
                    break 'days;
                }
            }

            start = match add_minutes(start, STEP_MINUTES as u32) {
                Some(next) => next,
                None => break,
            };
        }
    }

    slots
}

/// Degraded mode when the calendar feed is unreachable: offer the start of
/// each working day with no conflict check ("unknown availability, offer
/// something"). Same weekend rule, same cap.
pub fn default_slots(request: &SchedulingRequest, today: NaiveDate) -> Vec<TimeSlot> {
    let mut slots = Vec::new();

    for offset in 1..=SCAN_DAYS {
        let date = today + Duration::days(offset);
        if is_weekend(date) {
            continue;
        }

        let start = request.working_hours.start;
        let Some(end) = add_minutes(start, request.meeting_duration_minutes) else {
            continue;
        };
        if let Ok(slot) = TimeSlot::new(date, start, end) {
            slots.push(slot);
        }

        if slots.len() >= MAX_SLOTS {
            break;
        }
    }

    slots
}

/// Query the calendar feed for the coming week and compute free slots from
/// it; transport failure degrades to `default_slots`.
pub async fn find_available_slots(
    calendar: &dyn CalendarSource,
    oracle: &dyn TextOracle,
    request: &SchedulingRequest,
    user_id: &str,
) -> Vec<TimeSlot> {
    let today = Local::now().date_naive();
    let query = format!(
        "What are my scheduled events from {} to {}?",
        today,
        today + Duration::days(SCAN_DAYS)
    );

    match calendar.search(&query, user_id, true).await {
        Ok(result) => {
            let busy = intervals::extract_busy_intervals(oracle, &result.documents).await;
            compute_slots(&busy, request, today)
        }
        Err(e) => {
            tracing::warn!(error = %e, "calendar query failed, falling back to default slots");
            default_slots(request, today)
        }
    }
}

/// Point check for one proposed slot. Malformed, past, weekend, and
/// out-of-hours slots are rejected without touching the calendar; an
/// upstream failure yields `CannotVerify`, never a default verdict.
pub async fn is_slot_available(
    calendar: &dyn CalendarSource,
    oracle: &dyn TextOracle,
    slot: &TimeSlot,
    user_id: &str,
    working_hours: &crate::models::WorkingHours,
    now: NaiveDateTime,
) -> SlotVerdict {
    if let Some(reason) = reject_synchronously(slot, working_hours, now) {
        return SlotVerdict::Unavailable { reason };
    }

    let query = format!("What events do I have on {}?", slot.date_string());

    let result = match calendar.search(&query, user_id, false).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, date = %slot.date_string(), "calendar point check failed");
            return SlotVerdict::CannotVerify {
                reason: format!("calendar query failed: {e}"),
            };
        }
    };

    let busy = intervals::extract_busy_intervals(oracle, &result.documents).await;
    let day_busy = busy.get(&slot.date()).map(Vec::as_slice).unwrap_or(&[]);

    let conflicted = day_busy
        .iter()
        .any(|b| b.overlaps(slot.start_time(), slot.end_time()));

    if conflicted {
        SlotVerdict::Unavailable {
            reason: "conflicts with an existing calendar event".to_string(),
        }
    } else {
        SlotVerdict::Available
    }
}

fn reject_synchronously(
    slot: &TimeSlot,
    working_hours: &crate::models::WorkingHours,
    now: NaiveDateTime,
) -> Option<String> {
    if slot.date().and_time(slot.start_time()) <= now {
        return Some("slot is in the past".to_string());
    }
    if is_weekend(slot.date()) {
        return Some("slot falls on a weekend".to_string());
    }
    if slot.start_time() < working_hours.start || slot.end_time() > working_hours.end {
        return Some("slot is outside working hours".to_string());
    }
    None
}
