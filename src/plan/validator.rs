// Copyright 2025 Cowboy AI, LLC.

//! Field-level validation of plans and enrollments
//!
//! Every check returns the full list of [`FieldViolation`]s rather than the
//! first failure, so callers can report all problems at once.

use super::aggregate::AssessmentPlan;
use super::schedule::{Schedule, ScheduleDraft, ScheduleType};
use crate::errors::FieldViolation;
use crate::identifiers::{OrgId, ScaleCode, SubjectId};
use chrono::{DateTime, Utc};

/// Upper bound of occurrences for interval schedules
pub const MAX_TOTAL_TIMES: i64 = 100;

/// Upper bound of days between a series' anchor and its last occurrence
pub const MAX_SCHEDULE_SPAN_DAYS: i64 = 36_525;

/// Stateless plan validation
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanValidator;

impl PlanValidator {
    /// Organization and scale checks
    pub fn validate_owner(org_id: OrgId, scale_code: &ScaleCode) -> Vec<FieldViolation> {
        let mut violations = Vec::new();

        if !org_id.is_valid() {
            violations.push(FieldViolation::new("orgID", "organization id must be positive"));
        }
        if scale_code.is_blank() {
            violations.push(FieldViolation::new("scaleCode", "scale code must not be empty"));
        }

        violations
    }

    /// Everything needed to create a plan from raw input
    pub fn validate_for_creation(
        org_id: OrgId,
        scale_code: &ScaleCode,
        draft: &ScheduleDraft,
    ) -> Vec<FieldViolation> {
        let mut violations = Self::validate_owner(org_id, scale_code);
        violations.extend(Self::validate_schedule_draft(draft));
        violations
    }

    /// Parameter checks of a typed schedule
    pub fn validate_schedule(schedule: &Schedule) -> Vec<FieldViolation> {
        Self::validate_schedule_draft(&ScheduleDraft::from(schedule))
    }

    /// Type membership and per-type parameter ranges of a raw schedule
    pub fn validate_schedule_draft(draft: &ScheduleDraft) -> Vec<FieldViolation> {
        let mut violations = Vec::new();

        let schedule_type = match draft.schedule_type.parse::<ScheduleType>() {
            Ok(schedule_type) => schedule_type,
            Err(_) => {
                violations.push(FieldViolation::new(
                    "scheduleType",
                    format!("invalid schedule type: {}", draft.schedule_type),
                ));
                return violations;
            }
        };

        match schedule_type {
            ScheduleType::ByWeek | ScheduleType::ByDay => {
                if draft.interval <= 0 {
                    violations.push(FieldViolation::new("interval", "must be greater than 0"));
                } else if draft.interval > i64::from(u32::MAX) {
                    violations.push(FieldViolation::new("interval", "value out of range"));
                }
                if draft.total_times <= 0 {
                    violations.push(FieldViolation::new("totalTimes", "must be greater than 0"));
                }
                if draft.total_times > MAX_TOTAL_TIMES {
                    violations.push(FieldViolation::new(
                        "totalTimes",
                        format!("must not exceed {MAX_TOTAL_TIMES}"),
                    ));
                }
                if violations.is_empty() {
                    let unit = if schedule_type == ScheduleType::ByWeek { 7 } else { 1 };
                    let span = draft.interval * unit * (draft.total_times - 1);
                    if span > MAX_SCHEDULE_SPAN_DAYS {
                        violations.push(span_violation("interval"));
                    }
                }
            }
            ScheduleType::Custom => {
                if draft.relative_weeks.is_empty() {
                    violations.push(FieldViolation::new("relativeWeeks", "must not be empty"));
                }
                for (i, week) in draft.relative_weeks.iter().enumerate() {
                    let field = format!("relativeWeeks[{i}]");
                    if *week <= 0 {
                        violations.push(FieldViolation::new(&field, "week must be greater than 0"));
                    } else if *week > i64::from(u32::MAX) {
                        violations.push(FieldViolation::new(&field, "value out of range"));
                    } else if *week * 7 > MAX_SCHEDULE_SPAN_DAYS {
                        violations.push(span_violation(&field));
                    }
                    if i > 0 && *week <= draft.relative_weeks[i - 1] {
                        violations.push(FieldViolation::new(&field, "weeks must be strictly increasing"));
                    }
                }
            }
            ScheduleType::FixedDate => {
                if draft.fixed_dates.is_empty() {
                    violations.push(FieldViolation::new("fixedDates", "must not be empty"));
                }
                for (i, pair) in draft.fixed_dates.windows(2).enumerate() {
                    if pair[1] < pair[0] {
                        violations.push(FieldViolation::new(
                            format!("fixedDates[{}]", i + 1),
                            "dates must be in chronological order",
                        ));
                    }
                }
            }
        }

        violations
    }

    /// Whether `testee_id` may join `plan` from `start_date`
    pub fn validate_for_enrollment(
        plan: &AssessmentPlan,
        testee_id: SubjectId,
        start_date: Option<DateTime<Utc>>,
    ) -> Vec<FieldViolation> {
        let mut violations = Vec::new();

        if !plan.is_active() {
            violations.push(FieldViolation::new(
                "status",
                format!("plan is {}, enrollment requires an active plan", plan.status()),
            ));
        }
        if testee_id.is_zero() {
            violations.push(FieldViolation::new("testeeID", "testee id must not be empty"));
        }
        if start_date.is_none() {
            violations.push(FieldViolation::new("startDate", "start date must not be empty"));
        }

        violations
    }
}

fn span_violation(field: &str) -> FieldViolation {
    FieldViolation::new(
        field,
        format!(
            "last occurrence must fall within {MAX_SCHEDULE_SPAN_DAYS} days of the start date"
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn fields(violations: &[FieldViolation]) -> Vec<&str> {
        violations.iter().map(|v| v.field.as_str()).collect()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test_case(ScheduleDraft::by_week(2, 5), &[] ; "valid by week")]
    #[test_case(ScheduleDraft::by_day(1, 100), &[] ; "hundred occurrences")]
    #[test_case(ScheduleDraft::by_week(0, 5), &["interval"] ; "zero interval")]
    #[test_case(ScheduleDraft::by_day(-1, 0), &["interval", "totalTimes"] ; "negative interval zero times")]
    #[test_case(ScheduleDraft::by_week(1, 101), &["totalTimes"] ; "too many occurrences")]
    #[test_case(ScheduleDraft::by_week(10_000_000, 5), &["interval"] ; "by week past date range")]
    #[test_case(ScheduleDraft::by_day(i64::from(u32::MAX), 100), &["interval"] ; "by day past date range")]
    #[test_case(ScheduleDraft::by_week(53, 100), &["interval"] ; "just over span")]
    #[test_case(ScheduleDraft::by_day(365, 100), &[] ; "within span")]
    #[test_case(ScheduleDraft::by_week(10_000_000, 1), &[] ; "single occurrence ignores interval span")]
    #[test_case(ScheduleDraft::custom(vec![2, 5218]), &["relativeWeeks[1]"] ; "custom past span")]
    #[test_case(ScheduleDraft::custom(vec![2, 4, 8]), &[] ; "valid custom")]
    #[test_case(ScheduleDraft::custom(vec![]), &["relativeWeeks"] ; "empty custom")]
    #[test_case(ScheduleDraft::custom(vec![0, 4]), &["relativeWeeks[0]"] ; "zero week")]
    #[test_case(ScheduleDraft::custom(vec![2, 2, 1]), &["relativeWeeks[1]", "relativeWeeks[2]"] ; "not increasing")]
    #[test_case(ScheduleDraft::fixed_dates(vec![date(1), date(1), date(3)]), &[] ; "non decreasing dates")]
    #[test_case(ScheduleDraft::fixed_dates(vec![date(5), date(3)]), &["fixedDates[1]"] ; "dates out of order")]
    #[test_case(ScheduleDraft::fixed_dates(vec![]), &["fixedDates"] ; "no dates")]
    fn test_validate_schedule_draft(draft: ScheduleDraft, expected: &[&str]) {
        let violations = PlanValidator::validate_schedule_draft(&draft);
        assert_eq!(fields(&violations), expected.to_vec());
    }

    #[test]
    fn test_out_of_range_schedule_cannot_be_built() {
        let err = ScheduleDraft::by_week(10_000_000, 5).into_schedule().unwrap_err();
        assert!(err.is_validation_error());
        assert_eq!(err.violations()[0].field, "interval");

        let schedule = Schedule::ByWeek {
            interval_weeks: 10_000_000,
            total_times: 5,
        };
        assert_eq!(fields(&PlanValidator::validate_schedule(&schedule)), vec!["interval"]);
    }

    #[test]
    fn test_unknown_schedule_type_reported_once() {
        let violations = PlanValidator::validate_for_creation(
            OrgId::new(3),
            &ScaleCode::new("SNAP"),
            &ScheduleDraft {
                schedule_type: "yearly".into(),
                ..ScheduleDraft::default()
            },
        );

        assert_eq!(fields(&violations), vec!["scheduleType"]);
        assert!(violations[0].message.contains("yearly"));
    }

    #[test]
    fn test_enrollment_on_paused_plan_cites_status() {
        let (mut plan, _) = AssessmentPlan::new(
            OrgId::new(1),
            ScaleCode::new("PHQ-9"),
            Schedule::ByDay {
                interval_days: 1,
                total_times: 2,
            },
        )
        .unwrap();
        plan.pause(Utc::now()).unwrap();

        let violations = PlanValidator::validate_for_enrollment(&plan, SubjectId::new(0), None);
        assert_eq!(fields(&violations), vec!["status", "testeeID", "startDate"]);
        assert!(violations[0].message.contains("paused"));
    }
}
