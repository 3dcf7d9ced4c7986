// Copyright 2025 Cowboy AI, LLC.

//! Repository ports and the unit of work
//!
//! Every use case runs inside one [`Transaction`]: load, mutate, save, then
//! [`Transaction::commit`]. A transaction dropped without commit leaves the
//! store as it was. Saves check the aggregate's version against the stored
//! one and bump it on success.

use crate::identifiers::{PlanId, SubjectId, TaskId};
use crate::plan::{AssessmentPlan, AssessmentTask};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Repository errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// Aggregate not found
    #[error("Aggregate not found: {0}")]
    NotFound(String),

    /// Version conflict
    #[error("Version conflict: expected {expected}, actual {actual}")]
    VersionConflict {
        /// The expected version
        expected: u64,
        /// The actual version found
        actual: u64,
    },

    /// Storage error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::SerializationError(err.to_string())
    }
}

/// Plan persistence port
#[async_trait]
pub trait AssessmentPlanRepository: Send + Sync {
    /// Load a plan
    async fn find_by_id(&self, id: PlanId) -> Result<Option<AssessmentPlan>, RepositoryError>;

    /// Plans the subject holds tasks in
    async fn find_by_testee_id(
        &self,
        testee_id: SubjectId,
    ) -> Result<Vec<AssessmentPlan>, RepositoryError>;

    /// Plans in `active` status, oldest first
    async fn find_active_plans(&self) -> Result<Vec<AssessmentPlan>, RepositoryError>;

    /// Insert or update; bumps the plan's version
    async fn save(&mut self, plan: &mut AssessmentPlan) -> Result<(), RepositoryError>;
}

/// Task persistence port
#[async_trait]
pub trait AssessmentTaskRepository: Send + Sync {
    /// Load a task
    async fn find_by_id(&self, id: TaskId) -> Result<Option<AssessmentTask>, RepositoryError>;

    /// Every task of a plan, by subject then seq
    async fn find_by_plan_id(&self, plan_id: PlanId)
        -> Result<Vec<AssessmentTask>, RepositoryError>;

    /// Every task of a subject, by planned time
    async fn find_by_testee_id(
        &self,
        testee_id: SubjectId,
    ) -> Result<Vec<AssessmentTask>, RepositoryError>;

    /// A subject's series under one plan, by seq
    async fn find_by_testee_id_and_plan_id(
        &self,
        testee_id: SubjectId,
        plan_id: PlanId,
    ) -> Result<Vec<AssessmentTask>, RepositoryError>;

    /// Pending tasks planned at or before `before`, oldest first
    async fn find_pending_tasks(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<AssessmentTask>, RepositoryError>;

    /// Opened tasks whose entry expired at or before `as_of`, earliest deadline first
    async fn find_expired_tasks(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<AssessmentTask>, RepositoryError>;

    /// Insert or update; bumps the task's version
    async fn save(&mut self, task: &mut AssessmentTask) -> Result<(), RepositoryError>;

    /// Save several tasks; nothing is written if any version conflicts
    async fn save_batch(&mut self, tasks: &mut [AssessmentTask]) -> Result<(), RepositoryError>;
}

/// An open unit of work
#[async_trait]
pub trait Transaction: Send {
    /// Plans seen through this transaction
    fn plans(&mut self) -> &mut dyn AssessmentPlanRepository;

    /// Tasks seen through this transaction
    fn tasks(&mut self) -> &mut dyn AssessmentTaskRepository;

    /// Make every write of the transaction visible
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// Source of transactions
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Open a transaction
    async fn begin(&self) -> Result<Box<dyn Transaction>, RepositoryError>;
}
