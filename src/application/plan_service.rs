// Copyright 2025 Cowboy AI, LLC.

//! Plan lifecycle use cases

use super::commands::{CreatePlan, ResumePlan};
use super::publisher::{publish_committed, EventPublisher};
use super::views::PlanView;
use super::load_plan;
use crate::errors::{DomainResult, ValidationErrors};
use crate::events::PlanEvent;
use crate::identifiers::PlanId;
use crate::persistence::{Transaction, UnitOfWork};
use crate::plan::{start_of_day, AssessmentPlan, PlanLifecycle, PlanValidator};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Create, pause, resume, cancel and finish plans
#[derive(Clone)]
pub struct PlanLifecycleService {
    uow: Arc<dyn UnitOfWork>,
    publisher: Arc<dyn EventPublisher>,
    lifecycle: PlanLifecycle,
}

impl PlanLifecycleService {
    /// Create the service
    pub fn new(uow: Arc<dyn UnitOfWork>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            uow,
            publisher,
            lifecycle: PlanLifecycle::default(),
        }
    }

    /// Validate the draft and store a new active plan
    pub async fn create_plan(&self, command: CreatePlan) -> DomainResult<PlanView> {
        let CreatePlan {
            org_id,
            scale_code,
            schedule,
        } = command;
        info!(%org_id, %scale_code, schedule_type = %schedule.schedule_type, "Creating plan");

        ValidationErrors::from(PlanValidator::validate_for_creation(
            org_id,
            &scale_code,
            &schedule,
        ))
        .into_result()?;
        let (mut plan, event) = AssessmentPlan::new(org_id, scale_code, schedule.into_schedule()?)?;

        let mut tx = self.uow.begin().await?;
        tx.plans().save(&mut plan).await?;
        tx.commit().await?;

        publish_committed(self.publisher.as_ref(), &[event]).await;
        info!(plan_id = %plan.id(), "Plan created");
        Ok(PlanView::from(&plan))
    }

    /// Pause an active plan, canceling its pending and opened tasks
    pub async fn pause_plan(&self, plan_id: PlanId) -> DomainResult<PlanView> {
        info!(%plan_id, "Pausing plan");
        let mut tx = self.uow.begin().await?;
        let mut plan = load_plan(&mut tx, plan_id).await?;
        let mut tasks = tx.tasks().find_by_plan_id(plan_id).await?;

        let (mut canceled, events) = self.lifecycle.pause(&mut plan, &mut tasks)?.into_parts();

        tx.plans().save(&mut plan).await?;
        tx.tasks().save_batch(&mut canceled).await?;
        tx.commit().await?;

        publish_committed(self.publisher.as_ref(), &events).await;
        info!(%plan_id, canceled = canceled.len(), "Plan paused");
        Ok(PlanView::from(&plan))
    }

    /// Resume a paused plan and persist the regenerated tasks
    pub async fn resume_plan(&self, command: ResumePlan) -> DomainResult<PlanView> {
        let plan_id = command.plan_id;
        info!(%plan_id, overrides = command.start_dates.len(), "Resuming plan");

        let start_dates: HashMap<_, _> = command
            .start_dates
            .into_iter()
            .map(|(testee_id, date)| (testee_id, start_of_day(date)))
            .collect();

        let mut tx = self.uow.begin().await?;
        let mut plan = load_plan(&mut tx, plan_id).await?;
        let tasks = tx.tasks().find_by_plan_id(plan_id).await?;

        let (mut regenerated, events) = self
            .lifecycle
            .resume(&mut plan, &tasks, &start_dates)?
            .into_parts();

        tx.plans().save(&mut plan).await?;
        tx.tasks().save_batch(&mut regenerated).await?;
        tx.commit().await?;

        publish_committed(self.publisher.as_ref(), &events).await;
        info!(%plan_id, regenerated = regenerated.len(), "Plan resumed");
        Ok(PlanView::from(&plan))
    }

    /// Put a paused plan back to active without regenerating tasks
    pub async fn activate_plan(&self, plan_id: PlanId) -> DomainResult<PlanView> {
        let mut tx = self.uow.begin().await?;
        let mut plan = load_plan(&mut tx, plan_id).await?;

        let event = self.lifecycle.activate(&mut plan)?;
        self.commit_transition(tx, &mut plan, event).await?;

        Ok(PlanView::from(&plan))
    }

    /// Cancel a plan; its tasks are left as they are
    pub async fn cancel_plan(&self, plan_id: PlanId) -> DomainResult<PlanView> {
        info!(%plan_id, "Canceling plan");
        let mut tx = self.uow.begin().await?;
        let mut plan = load_plan(&mut tx, plan_id).await?;

        let event = self.lifecycle.cancel(&mut plan)?;
        self.commit_transition(tx, &mut plan, event).await?;

        Ok(PlanView::from(&plan))
    }

    /// Finish a plan and cancel whatever is still pending or opened
    pub async fn finish_plan(&self, plan_id: PlanId) -> DomainResult<PlanView> {
        info!(%plan_id, "Finishing plan");
        let mut tx = self.uow.begin().await?;
        let mut plan = load_plan(&mut tx, plan_id).await?;

        let Some(event) = self.lifecycle.finish(&mut plan)? else {
            debug!(%plan_id, "Plan already finished");
            return Ok(PlanView::from(&plan));
        };

        let mut tasks = tx.tasks().find_by_plan_id(plan_id).await?;
        let (mut canceled, mut events) = self
            .lifecycle
            .cancel_open_tasks(&plan, &mut tasks)
            .into_parts();
        events.push(event);

        tx.plans().save(&mut plan).await?;
        tx.tasks().save_batch(&mut canceled).await?;
        tx.commit().await?;

        publish_committed(self.publisher.as_ref(), &events).await;
        info!(%plan_id, canceled = canceled.len(), "Plan finished");
        Ok(PlanView::from(&plan))
    }

    async fn commit_transition(
        &self,
        mut tx: Box<dyn Transaction>,
        plan: &mut AssessmentPlan,
        event: Option<PlanEvent>,
    ) -> DomainResult<()> {
        let Some(event) = event else {
            debug!(plan_id = %plan.id(), status = %plan.status(), "Plan already in requested status");
            return Ok(());
        };

        tx.plans().save(plan).await?;
        tx.commit().await?;

        publish_committed(self.publisher.as_ref(), &[event]).await;
        info!(plan_id = %plan.id(), status = %plan.status(), "Plan status changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::publisher::MockEventPublisher;
    use crate::application::InMemoryEventPublisher;
    use crate::entity::AggregateRoot;
    use crate::identifiers::{OrgId, ScaleCode, SubjectId};
    use crate::persistence::InMemoryUnitOfWork;
    use crate::plan::{ScheduleDraft, TaskGenerator};
    use crate::state_machine::{PlanStatus, TaskStatus};
    use chrono::{NaiveDate, Utc};

    fn create(schedule: ScheduleDraft) -> CreatePlan {
        CreatePlan {
            org_id: OrgId::new(1),
            scale_code: ScaleCode::new("PHQ-9"),
            schedule,
        }
    }

    fn service() -> (PlanLifecycleService, InMemoryUnitOfWork, InMemoryEventPublisher) {
        let uow = InMemoryUnitOfWork::new();
        let publisher = InMemoryEventPublisher::new();
        let service =
            PlanLifecycleService::new(Arc::new(uow.clone()), Arc::new(publisher.clone()));
        (service, uow, publisher)
    }

    async fn seed_tasks(uow: &InMemoryUnitOfWork, plan_id: PlanId) {
        let mut tx = uow.begin().await.unwrap();
        let plan = tx.plans().find_by_id(plan_id).await.unwrap().unwrap();
        let start = start_of_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let mut tasks = TaskGenerator::new().generate(&plan, SubjectId::new(1), start).unwrap();
        tx.tasks().save_batch(&mut tasks).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_create_plan_persists_and_publishes() {
        let (service, uow, publisher) = service();

        let view = service
            .create_plan(create(ScheduleDraft::by_week(2, 5)))
            .await
            .unwrap();

        assert_eq!(view.status, PlanStatus::Active);
        assert_eq!(uow.plans().await[0].version(), 1);
        assert_eq!(publisher.event_types().await, vec!["plan.created"]);
    }

    #[tokio::test]
    async fn test_create_plan_reports_every_violation() {
        let (service, uow, publisher) = service();
        let command = CreatePlan {
            org_id: OrgId::new(0),
            scale_code: ScaleCode::new(""),
            schedule: ScheduleDraft::by_day(0, 101),
        };

        let err = service.create_plan(command).await.unwrap_err();

        let fields: Vec<_> = err.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["orgID", "scaleCode", "interval", "totalTimes"]);
        assert!(uow.plans().await.is_empty());
        assert!(publisher.published_events().await.is_empty());
    }

    #[tokio::test]
    async fn test_pause_then_resume_round_trip() {
        let (service, uow, publisher) = service();
        let plan = service
            .create_plan(create(ScheduleDraft::by_week(1, 3)))
            .await
            .unwrap();
        seed_tasks(&uow, plan.id).await;

        let paused = service.pause_plan(plan.id).await.unwrap();
        assert_eq!(paused.status, PlanStatus::Paused);
        assert!(uow
            .tasks()
            .await
            .iter()
            .all(|t| t.status() == TaskStatus::Canceled));

        let resumed = service.resume_plan(ResumePlan::new(plan.id)).await.unwrap();
        assert_eq!(resumed.status, PlanStatus::Active);

        let pending: Vec<_> = uow
            .tasks()
            .await
            .into_iter()
            .filter(|t| t.status() == TaskStatus::Pending)
            .map(|t| t.seq())
            .collect();
        assert_eq!(pending, vec![1, 2, 3]);
        assert!(publisher.event_types().await.contains(&"plan.resumed"));
    }

    #[tokio::test]
    async fn test_missing_plan_is_not_found() {
        let (service, _, _) = service();

        let err = service.pause_plan(PlanId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_finish_cancels_open_tasks() {
        let (service, uow, _) = service();
        let plan = service
            .create_plan(create(ScheduleDraft::by_day(1, 4)))
            .await
            .unwrap();
        seed_tasks(&uow, plan.id).await;

        let finished = service.finish_plan(plan.id).await.unwrap();

        assert_eq!(finished.status, PlanStatus::Finished);
        assert!(uow
            .tasks()
            .await
            .iter()
            .all(|t| t.status() == TaskStatus::Canceled));

        let again = service.finish_plan(plan.id).await.unwrap();
        assert_eq!(again.status, PlanStatus::Finished);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_leaves_tasks() {
        let (service, uow, publisher) = service();
        let plan = service
            .create_plan(create(ScheduleDraft::by_day(1, 2)))
            .await
            .unwrap();
        seed_tasks(&uow, plan.id).await;

        service.cancel_plan(plan.id).await.unwrap();
        service.cancel_plan(plan.id).await.unwrap();

        assert_eq!(
            publisher.event_types().await,
            vec!["plan.created", "plan.canceled"]
        );
        assert!(uow
            .tasks()
            .await
            .iter()
            .all(|t| t.status() == TaskStatus::Pending));
        assert!(service.finish_plan(plan.id).await.unwrap_err().is_state_error());
    }

    #[tokio::test]
    async fn test_activate_paused_plan() {
        let (service, _, _) = service();
        let plan = service
            .create_plan(create(ScheduleDraft::by_day(1, 2)))
            .await
            .unwrap();

        service.pause_plan(plan.id).await.unwrap();
        let view = service.activate_plan(plan.id).await.unwrap();

        assert_eq!(view.status, PlanStatus::Active);
    }

    #[tokio::test]
    async fn test_publisher_failure_does_not_fail_use_case() {
        let uow = InMemoryUnitOfWork::new();
        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish_batch().returning(|_| {
            Err(crate::errors::DomainError::external("bus", "down"))
        });
        let service = PlanLifecycleService::new(Arc::new(uow.clone()), Arc::new(publisher));

        let view = service
            .create_plan(create(ScheduleDraft::by_week(1, 1)))
            .await
            .unwrap();

        assert_eq!(uow.plans().await[0].id(), view.id);
        assert!(uow.plans().await[0].created_at() <= Utc::now());
    }
}
