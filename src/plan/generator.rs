// Copyright 2025 Cowboy AI, LLC.

//! Task generation from a plan's schedule
//!
//! Generation is a pure function of (schedule, subject, anchor): the same
//! inputs always yield the same series of `(seq, planned_at)` pairs. Resume
//! and schedule extension rely on that to recreate tasks instead of
//! patching old ones.

use super::aggregate::AssessmentPlan;
use super::task::AssessmentTask;
use crate::errors::DomainResult;
use crate::identifiers::{PlanId, SubjectId};
use crate::state_machine::TaskStatus;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Turns a plan schedule into a subject's task series
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskGenerator;

impl TaskGenerator {
    /// Create a generator
    pub fn new() -> Self {
        Self
    }

    /// Every task the schedule implies for `testee_id` anchored at `start`
    ///
    /// Fails instead of truncating when an occurrence cannot be dated.
    pub fn generate(
        &self,
        plan: &AssessmentPlan,
        testee_id: SubjectId,
        start: DateTime<Utc>,
    ) -> DomainResult<Vec<AssessmentTask>> {
        Ok(plan
            .schedule()
            .occurrences(start)?
            .into_iter()
            .map(|(seq, planned_at)| Self::task(plan, testee_id, seq, planned_at))
            .collect())
    }

    /// The prefix of [`TaskGenerator::generate`] planned at or before `until`
    ///
    /// Sequence numbers stay those of the full series, so a later call with
    /// a further horizon continues where this one stopped.
    pub fn generate_until(
        &self,
        plan: &AssessmentPlan,
        testee_id: SubjectId,
        start: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DomainResult<Vec<AssessmentTask>> {
        Ok(plan
            .schedule()
            .occurrences(start)?
            .into_iter()
            .take_while(|(_, planned_at)| *planned_at <= until)
            .map(|(seq, planned_at)| Self::task(plan, testee_id, seq, planned_at))
            .collect())
    }

    /// Drop generated tasks whose (plan, subject, seq) is already taken
    ///
    /// Canceled tasks do not hold their slot, so a canceled series can be
    /// generated again.
    pub fn filter_new_tasks(
        generated: Vec<AssessmentTask>,
        existing: &[AssessmentTask],
    ) -> Vec<AssessmentTask> {
        let taken: HashSet<(PlanId, SubjectId, u32)> = existing
            .iter()
            .filter(|task| task.status() != TaskStatus::Canceled)
            .map(|task| (task.plan_id(), task.testee_id(), task.seq()))
            .collect();

        generated
            .into_iter()
            .filter(|task| !taken.contains(&(task.plan_id(), task.testee_id(), task.seq())))
            .collect()
    }

    fn task(
        plan: &AssessmentPlan,
        testee_id: SubjectId,
        seq: u32,
        planned_at: DateTime<Utc>,
    ) -> AssessmentTask {
        AssessmentTask::new(
            plan.id(),
            seq,
            plan.org_id(),
            testee_id,
            plan.scale_code().clone(),
            planned_at,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{OrgId, ScaleCode};
    use crate::plan::schedule::{start_of_day, Schedule};
    use chrono::{NaiveDate, TimeDelta};
    use pretty_assertions::assert_eq;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        start_of_day(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn plan(schedule: Schedule) -> AssessmentPlan {
        AssessmentPlan::new(OrgId::new(1), ScaleCode::new("PHQ-9"), schedule)
            .unwrap()
            .0
    }

    fn planned(tasks: &[AssessmentTask]) -> Vec<(u32, DateTime<Utc>)> {
        tasks.iter().map(|t| (t.seq(), t.planned_at())).collect()
    }

    #[test]
    fn test_generate_by_week() {
        let plan = plan(Schedule::ByWeek {
            interval_weeks: 2,
            total_times: 5,
        });
        let tasks = TaskGenerator::new()
            .generate(&plan, SubjectId::new(1), day(2024, 1, 1))
            .unwrap();

        assert_eq!(
            planned(&tasks),
            vec![
                (1, day(2024, 1, 1)),
                (2, day(2024, 1, 15)),
                (3, day(2024, 1, 29)),
                (4, day(2024, 2, 12)),
                (5, day(2024, 2, 26)),
            ]
        );
        assert!(tasks.iter().all(|t| t.status() == TaskStatus::Pending));
        assert!(tasks.iter().all(|t| t.plan_id() == plan.id()));
    }

    #[test]
    fn test_generate_by_day() {
        let plan = plan(Schedule::ByDay {
            interval_days: 3,
            total_times: 3,
        });
        let tasks = TaskGenerator::new()
            .generate(&plan, SubjectId::new(1), day(2024, 2, 27))
            .unwrap();

        assert_eq!(
            planned(&tasks),
            vec![
                (1, day(2024, 2, 27)),
                (2, day(2024, 3, 1)),
                (3, day(2024, 3, 4)),
            ]
        );
    }

    #[test]
    fn test_generate_fixed_dates_verbatim() {
        let dates = vec![
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 9).unwrap(),
        ];
        let plan = plan(Schedule::FixedDates { dates });
        let tasks = TaskGenerator::new()
            .generate(&plan, SubjectId::new(1), day(2030, 1, 1))
            .unwrap();

        assert_eq!(
            planned(&tasks),
            vec![
                (1, day(2024, 3, 1)),
                (2, day(2024, 3, 1)),
                (3, day(2024, 4, 9)),
            ]
        );
    }

    #[test]
    fn test_generate_until_is_inclusive() {
        let plan = plan(Schedule::ByWeek {
            interval_weeks: 1,
            total_times: 10,
        });
        let tasks = TaskGenerator::new().generate_until(
            &plan,
            SubjectId::new(1),
            day(2024, 1, 1),
            day(2024, 1, 15),
        )
        .unwrap();

        assert_eq!(
            planned(&tasks),
            vec![
                (1, day(2024, 1, 1)),
                (2, day(2024, 1, 8)),
                (3, day(2024, 1, 15)),
            ]
        );
    }

    #[test]
    fn test_generate_until_before_start_is_empty() {
        let plan = plan(Schedule::Custom {
            relative_weeks: vec![1, 2],
        });
        let tasks = TaskGenerator::new().generate_until(
            &plan,
            SubjectId::new(1),
            day(2024, 1, 1),
            day(2024, 1, 7),
        )
        .unwrap();

        assert!(tasks.is_empty());
    }

    #[test]
    fn test_generate_never_truncates_a_series() {
        let plan = plan(Schedule::ByWeek {
            interval_weeks: 1_000,
            total_times: 5,
        });
        let near_end = start_of_day(NaiveDate::MAX) - TimeDelta::days(20_000);
        let generator = TaskGenerator::new();

        let err = generator.generate(&plan, SubjectId::new(1), near_end).unwrap_err();
        assert!(err.is_validation_error());
        assert!(generator
            .generate_until(&plan, SubjectId::new(1), near_end, near_end)
            .is_err());
    }

    #[test]
    fn test_filter_new_tasks_ignores_canceled_slots() {
        let plan = plan(Schedule::ByDay {
            interval_days: 1,
            total_times: 3,
        });
        let generator = TaskGenerator::new();
        let testee = SubjectId::new(4);

        let mut existing = generator.generate(&plan, testee, day(2024, 1, 1)).unwrap();
        existing.truncate(2);
        existing[1].cancel(Utc::now());

        let fresh = generator.generate(&plan, testee, day(2024, 1, 1)).unwrap();
        let kept = TaskGenerator::filter_new_tasks(fresh, &existing);

        assert_eq!(kept.iter().map(|t| t.seq()).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_filter_new_tasks_keys_by_subject() {
        let plan = plan(Schedule::ByDay {
            interval_days: 1,
            total_times: 2,
        });
        let generator = TaskGenerator::new();
        let existing = generator
            .generate(&plan, SubjectId::new(1), day(2024, 1, 1))
            .unwrap();
        let other = generator
            .generate(&plan, SubjectId::new(2), day(2024, 1, 1))
            .unwrap();

        assert_eq!(TaskGenerator::filter_new_tasks(other, &existing).len(), 2);
    }
}
