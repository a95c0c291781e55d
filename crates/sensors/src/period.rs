//! Period calculation
//!
//! A cron constraint is read as a set of anchor instants rather than a
//! timer: each period starts at one anchor and ends at the next. A period is
//! ready once `delay` has passed since its end, and is only offered while its
//! start is no older than `max_age`.

use std::str::FromStr;

use chrono::{NaiveDateTime, TimeDelta, Utc};
use cron::Schedule;

use crate::error::SensorError;

/// Anchors generated for one window are capped to keep second-level
/// expressions over long windows bounded
const MAX_ANCHORS: usize = 100_000;

/// Half-open interval `[start, end)` between two consecutive anchors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Readiness and backfill bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodBounds {
    /// Wait after a period ends before it is ready
    pub delay: TimeDelta,
    /// Oldest period start still offered, relative to now
    pub max_age: TimeDelta,
    /// Reverse the ascending order
    pub newest_first: bool,
}

impl PeriodBounds {
    /// Bounds from second counts
    pub fn from_seconds(delay_seconds: u64, max_age_seconds: u64, newest_first: bool) -> Self {
        Self {
            delay: seconds(delay_seconds),
            max_age: seconds(max_age_seconds),
            newest_first,
        }
    }
}

/// Periods between consecutive anchors that are ready and young enough
///
/// Anchors may be unsorted and contain duplicates. The last anchor has no
/// successor and yields no period, so callers pass anchors through the
/// first one after `now`.
pub fn ready_periods(
    anchors: &[NaiveDateTime],
    now: NaiveDateTime,
    bounds: PeriodBounds,
) -> Vec<Period> {
    let mut anchors = anchors.to_vec();
    anchors.sort_unstable();
    anchors.dedup();

    let oldest_start = oldest_start(now, bounds.max_age);
    let mut periods: Vec<Period> = anchors
        .windows(2)
        .map(|pair| Period {
            start: pair[0],
            end: pair[1],
        })
        .filter(|p| {
            let ready_at = p.end.checked_add_signed(bounds.delay);
            p.end <= now && ready_at.is_some_and(|t| t <= now) && p.start >= oldest_start
        })
        .collect();

    if bounds.newest_first {
        periods.reverse();
    }
    periods
}

/// Cron expression producing period anchors
///
/// Five-field expressions (`min hour dom mon dow`) get a zero seconds field
/// prepended. Matches are evaluated in UTC.
#[derive(Debug, Clone)]
pub struct CronConstraint {
    expr: String,
    schedule: Schedule,
}

impl CronConstraint {
    /// Parse and check that the expression matches at least once
    pub fn parse(expr: &str) -> Result<Self, SensorError> {
        let trimmed = expr.trim();
        let normalized = match trimmed.split_whitespace().count() {
            5 => format!("0 {trimmed}"),
            _ => trimmed.to_string(),
        };

        let schedule = Schedule::from_str(&normalized).map_err(|e| SensorError::InvalidCron {
            expr: expr.to_string(),
            reason: e.to_string(),
        })?;

        if schedule.upcoming(Utc).next().is_none() {
            return Err(SensorError::InvalidCron {
                expr: expr.to_string(),
                reason: "expression never matches".into(),
            });
        }

        Ok(Self {
            expr: expr.to_string(),
            schedule,
        })
    }

    /// Expression as configured
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// Anchors at or after `from`, through the first anchor after `now`
    pub fn anchors(&self, from: NaiveDateTime, now: NaiveDateTime) -> Vec<NaiveDateTime> {
        let start = from
            .checked_sub_signed(TimeDelta::seconds(1))
            .unwrap_or(from)
            .and_utc();
        let mut anchors = Vec::new();

        for instant in self.schedule.after(&start).take(MAX_ANCHORS) {
            let anchor = instant.naive_utc();
            anchors.push(anchor);
            if anchor > now {
                return anchors;
            }
        }

        tracing::warn!(
            cron_constraint = %self.expr,
            anchors = anchors.len(),
            "anchor window truncated"
        );
        anchors
    }

    /// Ready periods for `now` under the given bounds
    pub fn ready_periods(&self, now: NaiveDateTime, bounds: PeriodBounds) -> Vec<Period> {
        let anchors = self.anchors(oldest_start(now, bounds.max_age), now);
        ready_periods(&anchors, now, bounds)
    }
}

/// Earliest period start still offered
pub(crate) fn oldest_start(now: NaiveDateTime, max_age: TimeDelta) -> NaiveDateTime {
    now.checked_sub_signed(max_age).unwrap_or(NaiveDateTime::MIN)
}

pub(crate) fn seconds(value: u64) -> TimeDelta {
    i64::try_from(value)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}
