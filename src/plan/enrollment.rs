// Copyright 2025 Cowboy AI, LLC.

//! Enrollment of subjects into plans

use super::aggregate::AssessmentPlan;
use super::generator::TaskGenerator;
use super::task::AssessmentTask;
use super::task_lifecycle::TaskLifecycle;
use super::validator::PlanValidator;
use crate::errors::{DomainError, DomainResult, ValidationErrors};
use crate::events::{EnrollmentTerminated, Outcome, PlanEvent, TesteeEnrolled};
use crate::identifiers::SubjectId;
use crate::state_machine::TaskStatus;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Attaches subjects to plans and detaches them again
///
/// Produces tasks and events only; persisting them is the caller's job.
#[derive(Debug, Clone, Default)]
pub struct PlanEnrollment {
    generator: TaskGenerator,
    task_lifecycle: TaskLifecycle,
}

impl PlanEnrollment {
    /// Create the service
    pub fn new(generator: TaskGenerator, task_lifecycle: TaskLifecycle) -> Self {
        Self {
            generator,
            task_lifecycle,
        }
    }

    /// Generate the complete task series of `testee_id`
    ///
    /// `existing` are the subject's current tasks under the plan; a subject
    /// holding any task that is not canceled is already enrolled.
    pub fn enroll_testee(
        &self,
        plan: &AssessmentPlan,
        testee_id: SubjectId,
        start_date: Option<DateTime<Utc>>,
        existing: &[AssessmentTask],
    ) -> DomainResult<Outcome<Vec<AssessmentTask>>> {
        let start = self.check_enrollment(plan, testee_id, start_date, existing)?;
        let tasks = self.generator.generate(plan, testee_id, start)?;
        self.enrolled(plan, testee_id, start, tasks, existing)
    }

    /// Like [`PlanEnrollment::enroll_testee`] but only up to `until`
    ///
    /// The first occurrence is always generated, even when it lies after
    /// `until`, so every enrolled subject holds at least one task.
    pub fn enroll_testee_until(
        &self,
        plan: &AssessmentPlan,
        testee_id: SubjectId,
        start_date: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
        existing: &[AssessmentTask],
    ) -> DomainResult<Outcome<Vec<AssessmentTask>>> {
        let start = self.check_enrollment(plan, testee_id, start_date, existing)?;

        let mut tasks = self.generator.generate(plan, testee_id, start)?;
        let within = tasks
            .iter()
            .take_while(|task| task.planned_at() <= until)
            .count();
        tasks.truncate(within.max(1));

        self.enrolled(plan, testee_id, start, tasks, existing)
    }

    /// Cancel every non-terminal task of `testee_id` under the plan
    ///
    /// `tasks` may hold tasks of other subjects or plans; only the matching
    /// ones are touched. Returns copies of the canceled tasks.
    pub fn terminate_enrollment(
        &self,
        plan: &AssessmentPlan,
        testee_id: SubjectId,
        tasks: &mut [AssessmentTask],
    ) -> DomainResult<Outcome<Vec<AssessmentTask>>> {
        if testee_id.is_zero() {
            return Err(DomainError::validation("testeeID", "testee id must not be empty"));
        }

        let mut outcome = Outcome::new(Vec::new());
        for task in tasks
            .iter_mut()
            .filter(|task| task.belongs_to(plan.id(), testee_id))
        {
            if let Some(event) = self.task_lifecycle.cancel(task) {
                outcome.push(event);
                outcome.value.push(task.clone());
            }
        }

        info!(
            plan_id = %plan.id(),
            %testee_id,
            canceled = outcome.value.len(),
            "Enrollment terminated"
        );
        outcome.push(PlanEvent::EnrollmentTerminated(EnrollmentTerminated {
            plan_id: plan.id(),
            testee_id,
            canceled_tasks: outcome.value.len(),
            terminated_at: Utc::now(),
        }));

        Ok(outcome)
    }

    fn check_enrollment(
        &self,
        plan: &AssessmentPlan,
        testee_id: SubjectId,
        start_date: Option<DateTime<Utc>>,
        existing: &[AssessmentTask],
    ) -> DomainResult<DateTime<Utc>> {
        ValidationErrors::from(PlanValidator::validate_for_enrollment(
            plan, testee_id, start_date,
        ))
        .into_result()?;

        let already_enrolled = existing.iter().any(|task| {
            task.belongs_to(plan.id(), testee_id) && task.status() != TaskStatus::Canceled
        });
        if already_enrolled {
            return Err(DomainError::AlreadyExists(format!(
                "testee {testee_id} is already enrolled in plan {}",
                plan.id()
            )));
        }

        start_date.ok_or_else(|| DomainError::validation("startDate", "start date must not be empty"))
    }

    fn enrolled(
        &self,
        plan: &AssessmentPlan,
        testee_id: SubjectId,
        start: DateTime<Utc>,
        tasks: Vec<AssessmentTask>,
        existing: &[AssessmentTask],
    ) -> DomainResult<Outcome<Vec<AssessmentTask>>> {
        let tasks = TaskGenerator::filter_new_tasks(tasks, existing);
        if tasks.is_empty() {
            return Err(DomainError::validation("schedule", "no tasks generated"));
        }

        debug!(plan_id = %plan.id(), %testee_id, %start, count = tasks.len(), "Generated enrollment tasks");
        let event = PlanEvent::TesteeEnrolled(TesteeEnrolled {
            plan_id: plan.id(),
            testee_id,
            start_date: start,
            task_count: tasks.len(),
            enrolled_at: Utc::now(),
        });

        Ok(Outcome::with_events(tasks, vec![event]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{OrgId, ScaleCode};
    use crate::plan::plan_lifecycle::PlanLifecycle;
    use crate::plan::schedule::{start_of_day, Schedule};
    use chrono::{NaiveDate, TimeDelta};

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        start_of_day(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn plan() -> AssessmentPlan {
        AssessmentPlan::new(
            OrgId::new(1),
            ScaleCode::new("PHQ-9"),
            Schedule::ByWeek {
                interval_weeks: 2,
                total_times: 5,
            },
        )
        .unwrap()
        .0
    }

    #[test]
    fn test_enroll_generates_full_series() {
        let plan = plan();
        let outcome = PlanEnrollment::default()
            .enroll_testee(&plan, SubjectId::new(1), Some(day(2024, 1, 1)), &[])
            .unwrap();

        assert_eq!(outcome.value.len(), 5);
        assert_eq!(outcome.events.len(), 1);
        assert!(matches!(
            &outcome.events[0],
            PlanEvent::TesteeEnrolled(e) if e.task_count == 5
        ));
    }

    #[test]
    fn test_enroll_on_paused_plan_is_validation_error() {
        let mut plan = plan();
        PlanLifecycle::default().pause(&mut plan, &mut []).unwrap();

        let err = PlanEnrollment::default()
            .enroll_testee(&plan, SubjectId::new(1), Some(day(2024, 1, 1)), &[])
            .unwrap_err();

        assert!(err.is_validation_error());
        assert_eq!(err.violations()[0].field, "status");
    }

    #[test]
    fn test_enroll_requires_subject_and_start() {
        let err = PlanEnrollment::default()
            .enroll_testee(&plan(), SubjectId::new(0), None, &[])
            .unwrap_err();

        let fields: Vec<_> = err.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["testeeID", "startDate"]);
    }

    #[test]
    fn test_duplicate_enrollment_rejected() {
        let plan = plan();
        let enrollment = PlanEnrollment::default();
        let existing = enrollment
            .enroll_testee(&plan, SubjectId::new(1), Some(day(2024, 1, 1)), &[])
            .unwrap()
            .value;

        let err = enrollment
            .enroll_testee(&plan, SubjectId::new(1), Some(day(2024, 2, 1)), &existing)
            .unwrap_err();

        assert!(matches!(err, DomainError::AlreadyExists(_)));
    }

    #[test]
    fn test_reenroll_after_termination() {
        let plan = plan();
        let enrollment = PlanEnrollment::default();
        let mut existing = enrollment
            .enroll_testee(&plan, SubjectId::new(1), Some(day(2024, 1, 1)), &[])
            .unwrap()
            .value;
        enrollment
            .terminate_enrollment(&plan, SubjectId::new(1), &mut existing)
            .unwrap();

        let outcome = enrollment
            .enroll_testee(&plan, SubjectId::new(1), Some(day(2024, 6, 3)), &existing)
            .unwrap();
        assert_eq!(outcome.value[0].planned_at(), day(2024, 6, 3));
    }

    #[test]
    fn test_enroll_until_bounds_series_but_keeps_first() {
        let plan = plan();
        let enrollment = PlanEnrollment::default();

        let bounded = enrollment
            .enroll_testee_until(
                &plan,
                SubjectId::new(1),
                Some(day(2024, 1, 1)),
                day(2024, 1, 20),
                &[],
            )
            .unwrap();
        assert_eq!(bounded.value.len(), 2);

        let late = enrollment
            .enroll_testee_until(
                &plan,
                SubjectId::new(2),
                Some(day(2024, 3, 1)),
                day(2024, 1, 1),
                &[],
            )
            .unwrap();
        assert_eq!(late.value.len(), 1);
        assert_eq!(late.value[0].seq(), 1);
    }

    #[test]
    fn test_terminate_cancels_only_subject_tasks() {
        let plan = plan();
        let enrollment = PlanEnrollment::default();
        let mut tasks = enrollment
            .enroll_testee(&plan, SubjectId::new(1), Some(day(2024, 1, 1)), &[])
            .unwrap()
            .value;
        tasks.extend(
            enrollment
                .enroll_testee(&plan, SubjectId::new(2), Some(day(2024, 1, 1)), &[])
                .unwrap()
                .value,
        );
        TaskLifecycle::new()
            .open(&mut tasks[0], "tok", "url", Utc::now() + TimeDelta::days(1))
            .unwrap();

        let outcome = enrollment
            .terminate_enrollment(&plan, SubjectId::new(1), &mut tasks)
            .unwrap();

        assert_eq!(outcome.value.len(), 5);
        assert_eq!(outcome.events.len(), 6);
        assert!(tasks[..5].iter().all(|t| t.status() == TaskStatus::Canceled));
        assert!(tasks[5..].iter().all(|t| t.status() == TaskStatus::Pending));
    }
}
