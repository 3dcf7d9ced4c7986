// Copyright 2025 Cowboy AI, LLC.

//! Read-side use cases

use super::views::{task_views, PlanView, TaskView};
use super::{load_plan, load_task};
use crate::errors::DomainResult;
use crate::identifiers::{PlanId, SubjectId, TaskId};
use crate::persistence::UnitOfWork;
use std::sync::Arc;

/// Plans and tasks as read models
#[derive(Clone)]
pub struct PlanQueryService {
    uow: Arc<dyn UnitOfWork>,
}

impl PlanQueryService {
    /// Create the service
    pub fn new(uow: Arc<dyn UnitOfWork>) -> Self {
        Self { uow }
    }

    /// One plan
    pub async fn get_plan(&self, plan_id: PlanId) -> DomainResult<PlanView> {
        let mut tx = self.uow.begin().await?;
        let plan = load_plan(&mut tx, plan_id).await?;
        Ok(PlanView::from(&plan))
    }

    /// One task
    pub async fn get_task(&self, task_id: TaskId) -> DomainResult<TaskView> {
        let mut tx = self.uow.begin().await?;
        let task = load_task(&mut tx, task_id).await?;
        Ok(TaskView::from(&task))
    }

    /// Every task of a plan, by subject then seq
    pub async fn list_plan_tasks(&self, plan_id: PlanId) -> DomainResult<Vec<TaskView>> {
        let mut tx = self.uow.begin().await?;
        load_plan(&mut tx, plan_id).await?;
        let tasks = tx.tasks().find_by_plan_id(plan_id).await?;
        Ok(task_views(&tasks))
    }

    /// Every task of a subject across plans, by planned time
    pub async fn list_testee_tasks(&self, testee_id: SubjectId) -> DomainResult<Vec<TaskView>> {
        let mut tx = self.uow.begin().await?;
        let tasks = tx.tasks().find_by_testee_id(testee_id).await?;
        Ok(task_views(&tasks))
    }

    /// Plans the subject holds tasks in
    pub async fn list_testee_plans(&self, testee_id: SubjectId) -> DomainResult<Vec<PlanView>> {
        let mut tx = self.uow.begin().await?;
        let plans = tx.plans().find_by_testee_id(testee_id).await?;
        Ok(plans.iter().map(PlanView::from).collect())
    }

    /// Active plans, oldest first
    pub async fn list_active_plans(&self) -> DomainResult<Vec<PlanView>> {
        let mut tx = self.uow.begin().await?;
        let plans = tx.plans().find_active_plans().await?;
        Ok(plans.iter().map(PlanView::from).collect())
    }
}
