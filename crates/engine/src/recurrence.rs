//! Recurrence engine.
//!
//! A recurring expense is an *anchor*: its date and cadence define a series
//! of occurrence dates `anchor + k * cadence` for `k >= 1`. The anchor itself
//! is never mutated; each due occurrence becomes an independent, non
//! recurring expense that points back to the anchor.
//!
//! ## Month-end rule
//!
//! Monthly steps keep the anchor's day-of-month and clamp it to the last day
//! of shorter months. The series is always measured from the anchor, so a
//! series anchored on Jan 31 yields Feb 29 (leap year), Mar 31, Apr 30 rather
//! than drifting to the 29th after February.
//!
//! All functions here are pure: they read the expenses they are given and
//! return new values.

use std::{collections::HashSet, fmt, str::FromStr};

use chrono::{DateTime, Days, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Expense, MoneyCents, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Monthly,
}

impl RecurrencePattern {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Parses an optional stored pattern, where `none` (or nothing) means the
    /// expense does not recur.
    pub fn parse_optional(value: Option<&str>) -> ResultEngine<Option<Self>> {
        match value.map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) if raw.eq_ignore_ascii_case("none") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrencePattern {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(EngineError::InvalidPattern(other.to_string())),
        }
    }
}

/// One concrete dated instance of a recurring expense.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub anchor_id: Uuid,
    pub amount: MoneyCents,
    pub description: String,
    pub category_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

impl Occurrence {
    fn of(anchor: &Expense, occurred_at: DateTime<Utc>) -> Self {
        Self {
            anchor_id: anchor.id,
            amount: anchor.amount,
            description: anchor.description.clone(),
            category_id: anchor.category_id,
            occurred_at,
        }
    }

    /// The expense record to persist for this occurrence. It does not recur.
    pub fn into_expense(self, created_at: DateTime<Utc>) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            amount: self.amount,
            description: self.description,
            category_id: self.category_id,
            occurred_at: self.occurred_at,
            recurrence: None,
            anchor_id: Some(self.anchor_id),
            created_at,
        }
    }
}

/// A recurring expense together with its next projected date.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Upcoming<'a> {
    pub expense: &'a Expense,
    pub next_date: DateTime<Utc>,
}

/// The date `n` cadence units after `anchor`.
pub fn nth_occurrence(
    anchor: DateTime<Utc>,
    pattern: RecurrencePattern,
    n: u32,
) -> ResultEngine<DateTime<Utc>> {
    let stepped = match pattern {
        RecurrencePattern::Daily => anchor.checked_add_days(Days::new(u64::from(n))),
        RecurrencePattern::Weekly => anchor.checked_add_days(Days::new(7 * u64::from(n))),
        RecurrencePattern::Monthly => anchor.checked_add_months(Months::new(n)),
    };
    stepped.ok_or_else(|| {
        EngineError::DateOutOfRange(format!("{n} {pattern} step(s) after {anchor}"))
    })
}

/// The next occurrence after `date`: +1 day, +7 days, or the same day of the
/// next month (clamped to the month's last day).
pub fn next_occurrence(
    date: DateTime<Utc>,
    pattern: RecurrencePattern,
) -> ResultEngine<DateTime<Utc>> {
    nth_occurrence(date, pattern, 1)
}

/// `true` if the occurrence following `last` is due at `now`.
///
/// Steps one unit from `last`, not from the series anchor: after a clamped
/// Feb 29 the next monthly date here is Mar 29, while
/// [`generate_due_occurrences`] counts from the anchor and yields Mar 31.
pub fn is_due(
    last: DateTime<Utc>,
    pattern: RecurrencePattern,
    now: DateTime<Utc>,
) -> ResultEngine<bool> {
    Ok(next_occurrence(last, pattern)? <= now)
}

/// Every occurrence of a recurring expense dated after its anchor and at or
/// before `now`, oldest first.
///
/// Catches up on all missed cycles, so a monthly expense that has not been
/// looked at for three months yields three occurrences. Non recurring
/// expenses yield nothing.
pub fn generate_due_occurrences(
    expense: &Expense,
    now: DateTime<Utc>,
) -> ResultEngine<Vec<Occurrence>> {
    let Some(pattern) = expense.recurrence else {
        return Ok(Vec::new());
    };

    let mut occurrences = Vec::new();
    let mut k = 1;
    loop {
        let candidate = nth_occurrence(expense.occurred_at, pattern, k)?;
        if candidate > now {
            break;
        }
        occurrences.push(Occurrence::of(expense, candidate));
        k += 1;
    }
    Ok(occurrences)
}

/// Like [`generate_due_occurrences`], minus the dates already materialised.
pub fn generate_missing_occurrences(
    expense: &Expense,
    now: DateTime<Utc>,
    known_dates: &HashSet<DateTime<Utc>>,
) -> ResultEngine<Vec<Occurrence>> {
    let mut due = generate_due_occurrences(expense, now)?;
    due.retain(|occurrence| !known_dates.contains(&occurrence.occurred_at));
    Ok(due)
}

/// First projected occurrence strictly after `now`.
fn first_after(
    anchor: DateTime<Utc>,
    pattern: RecurrencePattern,
    now: DateTime<Utc>,
) -> ResultEngine<DateTime<Utc>> {
    let mut k = 1;
    loop {
        let candidate = nth_occurrence(anchor, pattern, k)?;
        if candidate > now {
            return Ok(candidate);
        }
        k += 1;
    }
}

/// Recurring expenses whose next occurrence falls within `horizon_days` of
/// `now`, soonest first.
pub fn upcoming_within(
    expenses: &[Expense],
    horizon_days: u32,
    now: DateTime<Utc>,
) -> ResultEngine<Vec<Upcoming<'_>>> {
    let horizon = Duration::days(i64::from(horizon_days));
    let mut upcoming = Vec::new();
    for expense in expenses {
        let Some(pattern) = expense.recurrence else {
            continue;
        };
        let next_date = first_after(expense.occurred_at, pattern, now)?;
        if next_date - now <= horizon {
            upcoming.push(Upcoming { expense, next_date });
        }
    }
    upcoming.sort_by_key(|item| item.next_date);
    Ok(upcoming)
}
