// Copyright 2025 Cowboy AI, LLC.

//! Enrollment use cases

use super::commands::{EnrollTestee, TerminateEnrollment};
use super::publisher::{publish_committed, EventPublisher};
use super::views::{task_views, EnrollmentView, TaskView};
use super::load_plan;
use crate::config::SchedulerConfig;
use crate::errors::DomainResult;
use crate::persistence::UnitOfWork;
use crate::plan::{start_of_day, PlanEnrollment};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

/// Enroll subjects into plans and terminate enrollments
#[derive(Clone)]
pub struct EnrollmentService {
    uow: Arc<dyn UnitOfWork>,
    publisher: Arc<dyn EventPublisher>,
    enrollment: PlanEnrollment,
    config: SchedulerConfig,
}

impl EnrollmentService {
    /// Create the service
    pub fn new(
        uow: Arc<dyn UnitOfWork>,
        publisher: Arc<dyn EventPublisher>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            uow,
            publisher,
            enrollment: PlanEnrollment::default(),
            config,
        }
    }

    /// Generate and store a subject's task series
    ///
    /// With a configured generation horizon only the tasks planned up to
    /// `max(now, start) + horizon` are stored; the scheduler's
    /// [`extend_schedules`](super::TaskSchedulerService::extend_schedules)
    /// materializes the rest later.
    pub async fn enroll_testee(&self, command: EnrollTestee) -> DomainResult<EnrollmentView> {
        let EnrollTestee {
            plan_id,
            testee_id,
            start_date,
        } = command;
        info!(%plan_id, %testee_id, ?start_date, "Enrolling testee");

        let start = start_date.map(start_of_day);
        let mut tx = self.uow.begin().await?;
        let plan = load_plan(&mut tx, plan_id).await?;
        let existing = tx
            .tasks()
            .find_by_testee_id_and_plan_id(testee_id, plan_id)
            .await?;

        let outcome = match (self.config.generation_horizon(), start) {
            (Some(horizon), Some(start)) => {
                let until = Utc::now()
                    .max(start)
                    .checked_add_signed(horizon)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                self.enrollment
                    .enroll_testee_until(&plan, testee_id, Some(start), until, &existing)?
            }
            _ => self
                .enrollment
                .enroll_testee(&plan, testee_id, start, &existing)?,
        };
        let (mut tasks, events) = outcome.into_parts();

        tx.tasks().save_batch(&mut tasks).await?;
        tx.commit().await?;

        publish_committed(self.publisher.as_ref(), &events).await;
        info!(%plan_id, %testee_id, tasks = tasks.len(), "Testee enrolled");
        Ok(EnrollmentView {
            plan_id,
            testee_id,
            tasks: task_views(&tasks),
        })
    }

    /// Cancel every unfinished task of the subject under the plan
    ///
    /// Returns the canceled tasks.
    pub async fn terminate_enrollment(
        &self,
        command: TerminateEnrollment,
    ) -> DomainResult<Vec<TaskView>> {
        let TerminateEnrollment { plan_id, testee_id } = command;
        info!(%plan_id, %testee_id, "Terminating enrollment");

        let mut tx = self.uow.begin().await?;
        let plan = load_plan(&mut tx, plan_id).await?;
        let mut tasks = tx
            .tasks()
            .find_by_testee_id_and_plan_id(testee_id, plan_id)
            .await?;

        let (mut canceled, events) = self
            .enrollment
            .terminate_enrollment(&plan, testee_id, &mut tasks)?
            .into_parts();

        tx.tasks().save_batch(&mut canceled).await?;
        tx.commit().await?;

        publish_committed(self.publisher.as_ref(), &events).await;
        Ok(task_views(&canceled))
    }
}
