// Copyright 2025 Cowboy AI, LLC.

//! In-memory unit of work
//!
//! A transaction holds the store's lock for its whole lifetime, which
//! serialises overlapping use cases, and writes to a private copy of the
//! tables that replaces the shared one on commit.

use super::repository::{
    AssessmentPlanRepository, AssessmentTaskRepository, RepositoryError, Transaction, UnitOfWork,
};
use crate::entity::AggregateRoot;
use crate::identifiers::{PlanId, SubjectId, TaskId};
use crate::plan::{AssessmentPlan, AssessmentTask};
use crate::state_machine::{PlanStatus, TaskStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct Tables {
    plans: IndexMap<PlanId, AssessmentPlan>,
    tasks: IndexMap<TaskId, AssessmentTask>,
}

impl Tables {
    fn tasks_where(&self, predicate: impl Fn(&AssessmentTask) -> bool) -> Vec<AssessmentTask> {
        self.tasks
            .values()
            .filter(|task| predicate(task))
            .cloned()
            .collect()
    }
}

fn check_version(stored: Option<u64>, expected: u64) -> Result<(), RepositoryError> {
    let actual = stored.unwrap_or(0);
    if actual == expected {
        Ok(())
    } else {
        Err(RepositoryError::VersionConflict { expected, actual })
    }
}

/// Shared in-memory store handing out [`InMemoryTransaction`]s
#[derive(Debug, Clone, Default)]
pub struct InMemoryUnitOfWork {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryUnitOfWork {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed plans, in insertion order
    pub async fn plans(&self) -> Vec<AssessmentPlan> {
        self.tables.lock().await.plans.values().cloned().collect()
    }

    /// Committed tasks, in insertion order
    pub async fn tasks(&self) -> Vec<AssessmentTask> {
        self.tables.lock().await.tasks.values().cloned().collect()
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn begin(&self) -> Result<Box<dyn Transaction>, RepositoryError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, staged }))
    }
}

/// Transaction over an [`InMemoryUnitOfWork`]
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    fn plans(&mut self) -> &mut dyn AssessmentPlanRepository {
        self
    }

    fn tasks(&mut self) -> &mut dyn AssessmentTaskRepository {
        self
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let InMemoryTransaction { mut guard, staged } = *self;
        debug!(
            plans = staged.plans.len(),
            tasks = staged.tasks.len(),
            "Committing in-memory transaction"
        );
        *guard = staged;
        Ok(())
    }
}

#[async_trait]
impl AssessmentPlanRepository for InMemoryTransaction {
    async fn find_by_id(&self, id: PlanId) -> Result<Option<AssessmentPlan>, RepositoryError> {
        Ok(self.staged.plans.get(&id).cloned())
    }

    async fn find_by_testee_id(
        &self,
        testee_id: SubjectId,
    ) -> Result<Vec<AssessmentPlan>, RepositoryError> {
        let plan_ids: IndexSet<PlanId> = self
            .staged
            .tasks
            .values()
            .filter(|task| task.testee_id() == testee_id)
            .map(|task| task.plan_id())
            .collect();

        Ok(plan_ids
            .iter()
            .filter_map(|id| self.staged.plans.get(id).cloned())
            .collect())
    }

    async fn find_active_plans(&self) -> Result<Vec<AssessmentPlan>, RepositoryError> {
        let mut plans: Vec<_> = self
            .staged
            .plans
            .values()
            .filter(|plan| plan.status() == PlanStatus::Active)
            .cloned()
            .collect();
        plans.sort_by_key(|plan| plan.created_at());
        Ok(plans)
    }

    async fn save(&mut self, plan: &mut AssessmentPlan) -> Result<(), RepositoryError> {
        let stored = self.staged.plans.get(&plan.id()).map(|p| p.version());
        check_version(stored, plan.version())?;

        plan.increment_version();
        self.staged.plans.insert(plan.id(), plan.clone());
        Ok(())
    }
}

#[async_trait]
impl AssessmentTaskRepository for InMemoryTransaction {
    async fn find_by_id(&self, id: TaskId) -> Result<Option<AssessmentTask>, RepositoryError> {
        Ok(self.staged.tasks.get(&id).cloned())
    }

    async fn find_by_plan_id(
        &self,
        plan_id: PlanId,
    ) -> Result<Vec<AssessmentTask>, RepositoryError> {
        let mut tasks = self.staged.tasks_where(|task| task.plan_id() == plan_id);
        tasks.sort_by_key(|task| (task.testee_id(), task.seq()));
        Ok(tasks)
    }

    async fn find_by_testee_id(
        &self,
        testee_id: SubjectId,
    ) -> Result<Vec<AssessmentTask>, RepositoryError> {
        let mut tasks = self.staged.tasks_where(|task| task.testee_id() == testee_id);
        tasks.sort_by_key(|task| (task.planned_at(), task.seq()));
        Ok(tasks)
    }

    async fn find_by_testee_id_and_plan_id(
        &self,
        testee_id: SubjectId,
        plan_id: PlanId,
    ) -> Result<Vec<AssessmentTask>, RepositoryError> {
        let mut tasks = self
            .staged
            .tasks_where(|task| task.belongs_to(plan_id, testee_id));
        tasks.sort_by_key(|task| task.seq());
        Ok(tasks)
    }

    async fn find_pending_tasks(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<AssessmentTask>, RepositoryError> {
        let mut tasks = self.staged.tasks_where(|task| {
            task.status() == TaskStatus::Pending && task.planned_at() <= before
        });
        tasks.sort_by_key(|task| task.planned_at());
        Ok(tasks)
    }

    async fn find_expired_tasks(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<AssessmentTask>, RepositoryError> {
        let mut tasks = self.staged.tasks_where(|task| {
            task.status() == TaskStatus::Opened
                && task.expire_at().is_some_and(|expire_at| expire_at <= as_of)
        });
        tasks.sort_by_key(|task| task.expire_at());
        Ok(tasks)
    }

    async fn save(&mut self, task: &mut AssessmentTask) -> Result<(), RepositoryError> {
        let stored = self.staged.tasks.get(&task.id()).map(|t| t.version());
        check_version(stored, task.version())?;

        task.increment_version();
        self.staged.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn save_batch(&mut self, tasks: &mut [AssessmentTask]) -> Result<(), RepositoryError> {
        for task in tasks.iter() {
            let stored = self.staged.tasks.get(&task.id()).map(|t| t.version());
            check_version(stored, task.version())?;
        }

        for task in tasks.iter_mut() {
            task.increment_version();
            self.staged.tasks.insert(task.id(), task.clone());
        }
        Ok(())
    }
}
