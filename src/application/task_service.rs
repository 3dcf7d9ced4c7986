// Copyright 2025 Cowboy AI, LLC.

//! Single-task use cases

use super::commands::{CompleteTask, OpenTask};
use super::publisher::{publish_committed, EventPublisher};
use super::views::TaskView;
use super::load_task;
use crate::errors::DomainResult;
use crate::identifiers::TaskId;
use crate::persistence::UnitOfWork;
use crate::plan::TaskLifecycle;
use std::sync::Arc;
use tracing::info;

/// Open, complete, expire and cancel individual tasks
#[derive(Clone)]
pub struct TaskManagementService {
    uow: Arc<dyn UnitOfWork>,
    publisher: Arc<dyn EventPublisher>,
    lifecycle: TaskLifecycle,
}

impl TaskManagementService {
    /// Create the service
    pub fn new(uow: Arc<dyn UnitOfWork>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            uow,
            publisher,
            lifecycle: TaskLifecycle::new(),
        }
    }

    /// Open a pending task with the given entry
    pub async fn open_task(&self, command: OpenTask) -> DomainResult<TaskView> {
        let OpenTask {
            task_id,
            token,
            url,
            expire_at,
        } = command;

        let mut tx = self.uow.begin().await?;
        let mut task = load_task(&mut tx, task_id).await?;
        let event = self.lifecycle.open(&mut task, token, url, expire_at)?;

        tx.tasks().save(&mut task).await?;
        tx.commit().await?;

        publish_committed(self.publisher.as_ref(), &[event]).await;
        info!(%task_id, plan_id = %task.plan_id(), %expire_at, "Task opened");
        Ok(TaskView::from(&task))
    }

    /// Link an opened task to the assessment it produced
    pub async fn complete_task(&self, command: CompleteTask) -> DomainResult<TaskView> {
        let CompleteTask {
            task_id,
            assessment_id,
        } = command;

        let mut tx = self.uow.begin().await?;
        let mut task = load_task(&mut tx, task_id).await?;
        let event = self.lifecycle.complete(&mut task, assessment_id)?;

        tx.tasks().save(&mut task).await?;
        tx.commit().await?;

        publish_committed(self.publisher.as_ref(), &[event]).await;
        info!(%task_id, %assessment_id, "Task completed");
        Ok(TaskView::from(&task))
    }

    /// Close an opened task as expired
    pub async fn expire_task(&self, task_id: TaskId) -> DomainResult<TaskView> {
        let mut tx = self.uow.begin().await?;
        let mut task = load_task(&mut tx, task_id).await?;
        let event = self.lifecycle.expire(&mut task)?;

        tx.tasks().save(&mut task).await?;
        tx.commit().await?;

        publish_committed(self.publisher.as_ref(), &[event]).await;
        info!(%task_id, "Task expired");
        Ok(TaskView::from(&task))
    }

    /// Cancel a task; terminal tasks are returned unchanged
    pub async fn cancel_task(&self, task_id: TaskId) -> DomainResult<TaskView> {
        let mut tx = self.uow.begin().await?;
        let mut task = load_task(&mut tx, task_id).await?;

        if let Some(event) = self.lifecycle.cancel(&mut task) {
            tx.tasks().save(&mut task).await?;
            tx.commit().await?;

            publish_committed(self.publisher.as_ref(), &[event]).await;
            info!(%task_id, "Task canceled");
        }

        Ok(TaskView::from(&task))
    }
}
