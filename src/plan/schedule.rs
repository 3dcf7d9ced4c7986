// Copyright 2025 Cowboy AI, LLC.

//! Schedule descriptions
//!
//! A [`Schedule`] is the recurrence rule of a plan. It is relative to an
//! anchor date supplied per subject, except for [`Schedule::FixedDates`]
//! which carries absolute calendar dates.
//!
//! | type | occurrence `seq` (1-based) |
//! |---|---|
//! | `by_week` | `anchor + (seq-1) * interval_weeks * 7 days` |
//! | `by_day` | `anchor + (seq-1) * interval_days days` |
//! | `custom` | `anchor + relative_weeks[seq-1] * 7 days` |
//! | `fixed_date` | `dates[seq-1]` at 00:00 UTC |

use super::validator::PlanValidator;
use crate::errors::{DomainError, DomainResult};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discriminator of a [`Schedule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    /// Every N weeks
    ByWeek,
    /// Every N days
    ByDay,
    /// Explicit week offsets from the anchor
    Custom,
    /// Absolute calendar dates
    FixedDate,
}

impl ScheduleType {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ByWeek => "by_week",
            Self::ByDay => "by_day",
            Self::Custom => "custom",
            Self::FixedDate => "fixed_date",
        }
    }

    /// Whether the occurrence count comes from `total_times` rather than a list
    pub fn is_interval(&self) -> bool {
        matches!(self, Self::ByWeek | Self::ByDay)
    }
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "by_week" => Ok(Self::ByWeek),
            "by_day" => Ok(Self::ByDay),
            "custom" => Ok(Self::Custom),
            "fixed_date" => Ok(Self::FixedDate),
            other => Err(DomainError::validation(
                "scheduleType",
                format!("invalid schedule type: {other}"),
            )),
        }
    }
}

/// Recurrence rule of a plan
///
/// Construct through [`ScheduleDraft::into_schedule`] or validate with
/// [`PlanValidator::validate_schedule`]; plans refuse invalid schedules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schedule {
    /// Every `interval_weeks` weeks, `total_times` times
    ByWeek {
        /// Weeks between occurrences
        interval_weeks: u32,
        /// Number of occurrences
        total_times: u32,
    },
    /// Every `interval_days` days, `total_times` times
    ByDay {
        /// Days between occurrences
        interval_days: u32,
        /// Number of occurrences
        total_times: u32,
    },
    /// One occurrence per week offset
    Custom {
        /// Positive, strictly increasing week offsets
        relative_weeks: Vec<u32>,
    },
    /// One occurrence per calendar date
    #[serde(rename = "fixed_date")]
    FixedDates {
        /// Non-decreasing dates
        dates: Vec<NaiveDate>,
    },
}

impl Schedule {
    /// The discriminator
    pub fn schedule_type(&self) -> ScheduleType {
        match self {
            Self::ByWeek { .. } => ScheduleType::ByWeek,
            Self::ByDay { .. } => ScheduleType::ByDay,
            Self::Custom { .. } => ScheduleType::Custom,
            Self::FixedDates { .. } => ScheduleType::FixedDate,
        }
    }

    /// Number of occurrences the schedule implies
    pub fn total_times(&self) -> usize {
        match self {
            Self::ByWeek { total_times, .. } | Self::ByDay { total_times, .. } => {
                *total_times as usize
            }
            Self::Custom { relative_weeks } => relative_weeks.len(),
            Self::FixedDates { dates } => dates.len(),
        }
    }

    /// Planned time of occurrence `seq` (1-based) for `anchor`
    ///
    /// `None` when `seq` is out of range or the date is not representable.
    pub fn planned_at(&self, anchor: DateTime<Utc>, seq: u32) -> Option<DateTime<Utc>> {
        if seq == 0 || seq as usize > self.total_times() {
            return None;
        }
        let index = i64::from(seq - 1);

        match self {
            Self::ByWeek { interval_weeks, .. } => {
                add_days(anchor, index * i64::from(*interval_weeks) * 7)
            }
            Self::ByDay { interval_days, .. } => add_days(anchor, index * i64::from(*interval_days)),
            Self::Custom { relative_weeks } => {
                let week = relative_weeks.get(index as usize)?;
                add_days(anchor, i64::from(*week) * 7)
            }
            Self::FixedDates { dates } => dates.get(index as usize).map(|d| start_of_day(*d)),
        }
    }

    /// All occurrences for `anchor` as `(seq, planned_at)`, in order
    ///
    /// Fails when an occurrence falls outside the representable date range,
    /// so a series is never silently cut short.
    pub fn occurrences(&self, anchor: DateTime<Utc>) -> DomainResult<Vec<(u32, DateTime<Utc>)>> {
        (1..=self.total_times() as u32)
            .map(|seq| {
                self.planned_at(anchor, seq)
                    .map(|at| (seq, at))
                    .ok_or_else(|| {
                        DomainError::validation(
                            "startDate",
                            format!("occurrence {seq} from {anchor} is outside the supported date range"),
                        )
                    })
            })
            .collect()
    }

    /// Days between the anchor and the last occurrence
    ///
    /// `None` for fixed dates, which do not depend on the anchor.
    pub fn span_days(&self) -> Option<i64> {
        match self {
            Self::ByWeek {
                interval_weeks,
                total_times,
            } => Some(i64::from(total_times.saturating_sub(1)) * i64::from(*interval_weeks) * 7),
            Self::ByDay {
                interval_days,
                total_times,
            } => Some(i64::from(total_times.saturating_sub(1)) * i64::from(*interval_days)),
            Self::Custom { relative_weeks } => {
                relative_weeks.iter().max().map(|week| i64::from(*week) * 7)
            }
            Self::FixedDates { .. } => None,
        }
    }

    /// Anchor that places occurrence `seq` at `planned_at`
    ///
    /// Inverse of [`Schedule::planned_at`]. Fixed dates are absolute, so the
    /// planned time itself is returned. A custom `seq` outside the offsets
    /// also falls back to `planned_at`.
    pub fn infer_anchor(&self, seq: u32, planned_at: DateTime<Utc>) -> DateTime<Utc> {
        let steps = i64::from(seq.saturating_sub(1));

        let offset_days = match self {
            Self::ByWeek { interval_weeks, .. } => Some(steps * i64::from(*interval_weeks) * 7),
            Self::ByDay { interval_days, .. } => Some(steps * i64::from(*interval_days)),
            Self::Custom { relative_weeks } => relative_weeks
                .get(steps as usize)
                .map(|week| i64::from(*week) * 7),
            Self::FixedDates { .. } => None,
        };

        offset_days
            .and_then(|days| add_days(planned_at, -days))
            .unwrap_or(planned_at)
    }
}

/// Midnight UTC of a calendar date
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn add_days(at: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    at.checked_add_signed(TimeDelta::try_days(days)?)
}

/// Flat, unvalidated schedule input
///
/// Mirrors how callers submit a schedule: a type string plus every parameter
/// group. [`ScheduleDraft::into_schedule`] validates the fields that matter
/// for the type and produces a typed [`Schedule`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScheduleDraft {
    /// `by_week`, `by_day`, `custom` or `fixed_date`
    pub schedule_type: String,
    /// Interval for `by_week` / `by_day`
    #[serde(default)]
    pub interval: i64,
    /// Occurrences for `by_week` / `by_day`
    #[serde(default)]
    pub total_times: i64,
    /// Dates for `fixed_date`
    #[serde(default)]
    pub fixed_dates: Vec<NaiveDate>,
    /// Week offsets for `custom`
    #[serde(default)]
    pub relative_weeks: Vec<i64>,
}

impl ScheduleDraft {
    /// `by_week` draft
    pub fn by_week(interval: i64, total_times: i64) -> Self {
        Self {
            schedule_type: ScheduleType::ByWeek.as_str().to_string(),
            interval,
            total_times,
            ..Self::default()
        }
    }

    /// `by_day` draft
    pub fn by_day(interval: i64, total_times: i64) -> Self {
        Self {
            schedule_type: ScheduleType::ByDay.as_str().to_string(),
            interval,
            total_times,
            ..Self::default()
        }
    }

    /// `custom` draft
    pub fn custom(relative_weeks: Vec<i64>) -> Self {
        Self {
            schedule_type: ScheduleType::Custom.as_str().to_string(),
            relative_weeks,
            ..Self::default()
        }
    }

    /// `fixed_date` draft
    pub fn fixed_dates(dates: Vec<NaiveDate>) -> Self {
        Self {
            schedule_type: ScheduleType::FixedDate.as_str().to_string(),
            fixed_dates: dates,
            ..Self::default()
        }
    }

    /// Validate and convert into a typed schedule
    pub fn into_schedule(self) -> DomainResult<Schedule> {
        crate::errors::ValidationErrors::from(PlanValidator::validate_schedule_draft(&self))
            .into_result()?;

        let schedule_type: ScheduleType = self.schedule_type.parse()?;
        let narrow = |field: &str, value: i64| {
            u32::try_from(value)
                .map_err(|_| DomainError::validation(field, "value out of range"))
        };

        Ok(match schedule_type {
            ScheduleType::ByWeek => Schedule::ByWeek {
                interval_weeks: narrow("interval", self.interval)?,
                total_times: narrow("totalTimes", self.total_times)?,
            },
            ScheduleType::ByDay => Schedule::ByDay {
                interval_days: narrow("interval", self.interval)?,
                total_times: narrow("totalTimes", self.total_times)?,
            },
            ScheduleType::Custom => Schedule::Custom {
                relative_weeks: self
                    .relative_weeks
                    .iter()
                    .enumerate()
                    .map(|(i, week)| narrow(&format!("relativeWeeks[{i}]"), *week))
                    .collect::<DomainResult<Vec<_>>>()?,
            },
            ScheduleType::FixedDate => Schedule::FixedDates {
                dates: self.fixed_dates,
            },
        })
    }
}

impl From<&Schedule> for ScheduleDraft {
    fn from(schedule: &Schedule) -> Self {
        match schedule {
            Schedule::ByWeek {
                interval_weeks,
                total_times,
            } => Self::by_week(i64::from(*interval_weeks), i64::from(*total_times)),
            Schedule::ByDay {
                interval_days,
                total_times,
            } => Self::by_day(i64::from(*interval_days), i64::from(*total_times)),
            Schedule::Custom { relative_weeks } => {
                Self::custom(relative_weeks.iter().map(|w| i64::from(*w)).collect())
            }
            Schedule::FixedDates { dates } => Self::fixed_dates(dates.clone()),
        }
    }
}
