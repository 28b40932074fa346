//! Due-date based hiding of tasks.

use crate::classify::ExecutionMode;
use crate::model::Task;
use time::format_description::well_known::Rfc3339;
use time::macros::{format_description, time};
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

const SECONDS_PER_DAY: i64 = 86_400;

/// A due date string in none of the supported formats.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised due date '{0}'")]
pub struct DueDateError(pub String);

/// Parse a backend due date as a UTC instant.
///
/// Accepts RFC 3339, floating `YYYY-MM-DDTHH:MM:SS` (read as UTC), all-day
/// `YYYY-MM-DD` (end of that day, UTC) and the legacy
/// `Fri 01 Mar 2024 23:59:59 +0000` format.
///
/// # Errors
/// Returns [`DueDateError`] when no format matches.
pub fn parse_due(raw: &str) -> Result<OffsetDateTime, DueDateError> {
    let raw = raw.trim();
    if let Ok(instant) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(instant.to_offset(UtcOffset::UTC));
    }
    let whole_seconds = raw.split_once('.').map_or(raw, |(head, _)| head);
    if let Ok(floating) = PrimitiveDateTime::parse(
        whole_seconds,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Ok(floating.assume_utc());
    }
    if let Ok(day) = Date::parse(raw, format_description!("[year]-[month]-[day]")) {
        return Ok(day.with_time(time!(23:59:59)).assume_utc());
    }
    let legacy = format_description!(
        "[weekday repr:short] [day] [month repr:short] [year] [hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute]"
    );
    if let Ok(instant) = OffsetDateTime::parse(raw, legacy) {
        return Ok(instant.to_offset(UtcOffset::UTC));
    }
    Err(DueDateError(raw.to_owned()))
}

/// Whether `task` is due at least `horizon_days` from `now`.
///
/// A non-positive horizon and a missing due date never hide.
///
/// # Errors
/// Returns [`DueDateError`] when the due date cannot be parsed.
pub fn is_future_hidden(task: &Task, horizon_days: i64, now: OffsetDateTime) -> Result<bool, DueDateError> {
    if horizon_days <= 0 {
        return Ok(false);
    }
    let Some(raw) = task.due.as_deref() else {
        return Ok(false);
    };
    let due = parse_due(raw)?;
    let until_due = (due - now).whole_seconds();
    Ok(until_due >= horizon_days.saturating_mul(SECONDS_PER_DAY))
}

/// Hiding rules applied before marker placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityPolicy {
    /// Hide tasks due this many days out or later; `<= 0` disables.
    pub hide_future_days: i64,
    /// Hide every dated task that has no explicit mode.
    pub hide_scheduled: bool,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self {
            hide_future_days: 7,
            hide_scheduled: false,
        }
    }
}

impl VisibilityPolicy {
    /// Whether `task` is hidden this cycle. The scheduled rule runs first.
    ///
    /// # Errors
    /// Returns [`DueDateError`] when the horizon check cannot parse the due date.
    pub fn is_hidden(
        &self,
        task: &Task,
        mode: Option<ExecutionMode>,
        now: OffsetDateTime,
    ) -> Result<bool, DueDateError> {
        if self.hide_scheduled && task.due.is_some() && mode.is_none() {
            return Ok(true);
        }
        is_future_hidden(task, self.hide_future_days, now)
    }
}
