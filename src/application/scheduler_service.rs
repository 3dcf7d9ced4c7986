// Copyright 2025 Cowboy AI, LLC.

//! Periodic task scheduling
//!
//! Entry points for an external trigger (cron, worker loop). Every run is
//! best effort: each task or plan gets its own transaction, failures are
//! logged and counted, and the run goes on. Runs are idempotent because a
//! task is re-read and its status checked before it is touched.

use super::publisher::{publish_committed, EventPublisher};
use super::views::{task_views, BatchReport, ExtensionReport, TaskView};
use crate::config::SchedulerConfig;
use crate::entry::EntryGenerator;
use crate::errors::DomainResult;
use crate::identifiers::{PlanId, TaskId};
use crate::persistence::UnitOfWork;
use crate::plan::{group_by_subject, AssessmentTask, TaskGenerator, TaskLifecycle};
use crate::state_machine::{PlanStatus, TaskStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Opens due tasks, expires overdue ones and extends bounded series
#[derive(Clone)]
pub struct TaskSchedulerService {
    uow: Arc<dyn UnitOfWork>,
    publisher: Arc<dyn EventPublisher>,
    entries: Arc<dyn EntryGenerator>,
    generator: TaskGenerator,
    lifecycle: TaskLifecycle,
    config: SchedulerConfig,
}

impl TaskSchedulerService {
    /// Create the service
    pub fn new(
        uow: Arc<dyn UnitOfWork>,
        publisher: Arc<dyn EventPublisher>,
        entries: Arc<dyn EntryGenerator>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            uow,
            publisher,
            entries,
            generator: TaskGenerator::new(),
            lifecycle: TaskLifecycle::new(),
            config,
        }
    }

    /// Open every pending task planned at or before `before`
    ///
    /// At most `max_due_tasks_per_run` tasks are handled, oldest first; the
    /// rest is picked up by the next run.
    pub async fn schedule_pending_tasks(&self, before: DateTime<Utc>) -> DomainResult<BatchReport> {
        let mut tx = self.uow.begin().await?;
        let mut due = tx.tasks().find_pending_tasks(before).await?;
        drop(tx);
        info!(%before, due = due.len(), "Scheduling pending tasks");

        if due.len() > self.config.max_due_tasks_per_run {
            warn!(
                due = due.len(),
                limit = self.config.max_due_tasks_per_run,
                "Due tasks exceed the per-run limit"
            );
            due.truncate(self.config.max_due_tasks_per_run);
        }

        let mut report = BatchReport {
            examined: due.len(),
            ..BatchReport::default()
        };
        for task in &due {
            match self.open_due(task.id()).await {
                Ok(Some(opened)) => report.succeeded.push(opened),
                Ok(None) => debug!(task_id = %task.id(), "Task no longer pending"),
                Err(err) => {
                    error!(task_id = %task.id(), error = %err, "Failed to open task");
                    report.failed.push(task.id());
                }
            }
        }

        info!(
            %before,
            opened = report.succeeded.len(),
            failed = report.failed.len(),
            "Pending tasks scheduled"
        );
        Ok(report)
    }

    /// Expire every opened task whose entry ran out at or before `as_of`
    pub async fn expire_overdue_tasks(&self, as_of: DateTime<Utc>) -> DomainResult<BatchReport> {
        let mut tx = self.uow.begin().await?;
        let overdue = tx.tasks().find_expired_tasks(as_of).await?;
        drop(tx);
        info!(%as_of, overdue = overdue.len(), "Expiring overdue tasks");

        let mut report = BatchReport {
            examined: overdue.len(),
            ..BatchReport::default()
        };
        for task in &overdue {
            match self.expire_overdue(task.id(), as_of).await {
                Ok(Some(expired)) => report.succeeded.push(expired),
                Ok(None) => debug!(task_id = %task.id(), "Task no longer overdue"),
                Err(err) => {
                    error!(task_id = %task.id(), error = %err, "Failed to expire task");
                    report.failed.push(task.id());
                }
            }
        }

        info!(
            %as_of,
            expired = report.succeeded.len(),
            failed = report.failed.len(),
            "Overdue tasks expired"
        );
        Ok(report)
    }

    /// Materialize the tasks of active plans planned up to `horizon`
    ///
    /// Only subjects still following a plan are extended, from their live
    /// series' anchor and past their highest live seq.
    pub async fn extend_schedules(&self, horizon: DateTime<Utc>) -> DomainResult<ExtensionReport> {
        let mut tx = self.uow.begin().await?;
        let plans = tx.plans().find_active_plans().await?;
        drop(tx);
        info!(%horizon, plans = plans.len(), "Extending schedules");

        let mut report = ExtensionReport {
            plans_examined: plans.len(),
            ..ExtensionReport::default()
        };
        for plan in &plans {
            match self.extend_plan(plan.id(), horizon).await {
                Ok(created) => report.created.extend(created),
                Err(err) => {
                    error!(plan_id = %plan.id(), error = %err, "Failed to extend plan");
                    report.failed_plans.push(plan.id());
                }
            }
        }

        info!(
            %horizon,
            created = report.created.len(),
            failed = report.failed_plans.len(),
            "Schedules extended"
        );
        Ok(report)
    }

    async fn open_due(&self, task_id: TaskId) -> DomainResult<Option<TaskView>> {
        let mut tx = self.uow.begin().await?;
        let Some(mut task) = tx.tasks().find_by_id(task_id).await? else {
            return Ok(None);
        };
        if task.status() != TaskStatus::Pending {
            return Ok(None);
        }

        let entry = self.entries.generate_entry(&task).await?;
        let event = self
            .lifecycle
            .open(&mut task, entry.token, entry.url, entry.expire_at)?;

        tx.tasks().save(&mut task).await?;
        tx.commit().await?;

        publish_committed(self.publisher.as_ref(), &[event]).await;
        Ok(Some(TaskView::from(&task)))
    }

    async fn expire_overdue(
        &self,
        task_id: TaskId,
        as_of: DateTime<Utc>,
    ) -> DomainResult<Option<TaskView>> {
        let mut tx = self.uow.begin().await?;
        let Some(mut task) = tx.tasks().find_by_id(task_id).await? else {
            return Ok(None);
        };
        let overdue = task.status() == TaskStatus::Opened
            && task.expire_at().is_some_and(|expire_at| expire_at <= as_of);
        if !overdue {
            return Ok(None);
        }

        let event = self.lifecycle.expire(&mut task)?;
        tx.tasks().save(&mut task).await?;
        tx.commit().await?;

        publish_committed(self.publisher.as_ref(), &[event]).await;
        Ok(Some(TaskView::from(&task)))
    }

    async fn extend_plan(
        &self,
        plan_id: PlanId,
        horizon: DateTime<Utc>,
    ) -> DomainResult<Vec<TaskView>> {
        let mut tx = self.uow.begin().await?;
        let Some(plan) = tx.plans().find_by_id(plan_id).await? else {
            return Ok(Vec::new());
        };
        if plan.status() != PlanStatus::Active {
            return Ok(Vec::new());
        }
        let tasks = tx.tasks().find_by_plan_id(plan_id).await?;

        let mut created: Vec<AssessmentTask> = Vec::new();
        for (testee_id, series) in group_by_subject(plan_id, &tasks) {
            if !series.is_following() {
                debug!(%plan_id, %testee_id, "Subject not following, skipped");
                continue;
            }
            let Some(anchor) = series.live_anchor(plan.schedule()) else {
                continue;
            };

            let frontier = series.max_live_seq();
            let generated: Vec<_> = self
                .generator
                .generate_until(&plan, testee_id, anchor, horizon)?
                .into_iter()
                .filter(|task| task.seq() > frontier)
                .collect();
            let fresh = TaskGenerator::filter_new_tasks(generated, &tasks);
            if !fresh.is_empty() {
                debug!(%plan_id, %testee_id, frontier, added = fresh.len(), "Extended series");
            }
            created.extend(fresh);
        }

        if created.is_empty() {
            return Ok(Vec::new());
        }

        tx.tasks().save_batch(&mut created).await?;
        tx.commit().await?;
        info!(%plan_id, created = created.len(), "Plan schedule extended");
        Ok(task_views(&created))
    }
}
