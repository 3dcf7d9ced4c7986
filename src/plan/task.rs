// Copyright 2025 Cowboy AI, LLC.

//! Assessment task entity

use crate::entity::AggregateRoot;
use crate::events::{PlanEvent, TaskClosed, TaskCompleted, TaskOpened};
use crate::identifiers::{AssessmentId, OrgId, PlanId, ScaleCode, SubjectId, TaskId};
use crate::state_machine::{State, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access material handed to the subject when a task opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMaterials {
    /// Opaque access token
    pub token: String,
    /// Where the subject takes the measurement
    pub url: String,
}

/// One measurement obligation of a subject under a plan
///
/// # Invariants
///
/// - `seq` is 1-based and dense per (plan, subject), increasing with `planned_at`
/// - `assessment_id` is set if and only if the status is `completed`
/// - `entry`, `open_at` and `expire_at` are set once the task has been opened
/// - `created_at` records when the series the task belongs to was generated
///
/// Status changes go through [`TaskLifecycle`](super::task_lifecycle::TaskLifecycle),
/// which checks the state machine before mutating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentTask {
    id: TaskId,
    plan_id: PlanId,
    seq: u32,
    org_id: OrgId,
    testee_id: SubjectId,
    scale_code: ScaleCode,
    planned_at: DateTime<Utc>,
    open_at: Option<DateTime<Utc>>,
    expire_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    status: TaskStatus,
    assessment_id: Option<AssessmentId>,
    entry: Option<EntryMaterials>,
    created_at: DateTime<Utc>,
    version: u64,
}

/// Stored state of a task, as a repository reads it back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    /// Task id
    pub id: TaskId,
    /// Owning plan
    pub plan_id: PlanId,
    /// Position within the series
    pub seq: u32,
    /// Owning organization
    pub org_id: OrgId,
    /// Subject
    pub testee_id: SubjectId,
    /// Scale to measure
    pub scale_code: ScaleCode,
    /// Due time
    pub planned_at: DateTime<Utc>,
    /// Entry hand-out time
    pub open_at: Option<DateTime<Utc>>,
    /// Entry deadline
    pub expire_at: Option<DateTime<Utc>>,
    /// Completion time
    pub completed_at: Option<DateTime<Utc>>,
    /// Status
    pub status: TaskStatus,
    /// Assessment produced on completion
    pub assessment_id: Option<AssessmentId>,
    /// Entry token and URL
    pub entry: Option<EntryMaterials>,
    /// Generation time
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency version
    pub version: u64,
}

impl AssessmentTask {
    /// A new pending task
    pub fn new(
        plan_id: PlanId,
        seq: u32,
        org_id: OrgId,
        testee_id: SubjectId,
        scale_code: ScaleCode,
        planned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TaskId::new(),
            plan_id,
            seq,
            org_id,
            testee_id,
            scale_code,
            planned_at,
            open_at: None,
            expire_at: None,
            completed_at: None,
            status: TaskStatus::Pending,
            assessment_id: None,
            entry: None,
            created_at: Utc::now(),
            version: 0,
        }
    }

    /// Rebuild a task from stored state
    pub fn reconstitute(record: TaskRecord) -> Self {
        Self {
            id: record.id,
            plan_id: record.plan_id,
            seq: record.seq,
            org_id: record.org_id,
            testee_id: record.testee_id,
            scale_code: record.scale_code,
            planned_at: record.planned_at,
            open_at: record.open_at,
            expire_at: record.expire_at,
            completed_at: record.completed_at,
            status: record.status,
            assessment_id: record.assessment_id,
            entry: record.entry,
            created_at: record.created_at,
            version: record.version,
        }
    }

    /// Task id
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Owning plan
    pub fn plan_id(&self) -> PlanId {
        self.plan_id
    }

    /// Position within the subject's series, from 1
    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// Owning organization
    pub fn org_id(&self) -> OrgId {
        self.org_id
    }

    /// Subject
    pub fn testee_id(&self) -> SubjectId {
        self.testee_id
    }

    /// Scale to measure
    pub fn scale_code(&self) -> &ScaleCode {
        &self.scale_code
    }

    /// When the measurement is due
    pub fn planned_at(&self) -> DateTime<Utc> {
        self.planned_at
    }

    /// When the entry was handed out
    pub fn open_at(&self) -> Option<DateTime<Utc>> {
        self.open_at
    }

    /// Entry deadline
    pub fn expire_at(&self) -> Option<DateTime<Utc>> {
        self.expire_at
    }

    /// When the measurement was recorded
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Current status
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Assessment produced on completion
    pub fn assessment_id(&self) -> Option<AssessmentId> {
        self.assessment_id
    }

    /// Entry token and URL
    pub fn entry(&self) -> Option<&EntryMaterials> {
        self.entry.as_ref()
    }

    /// When the task was generated
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the task can no longer change
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the task is pending or opened
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Whether the task belongs to `testee_id` under `plan_id`
    pub fn belongs_to(&self, plan_id: PlanId, testee_id: SubjectId) -> bool {
        self.plan_id == plan_id && self.testee_id == testee_id
    }

    pub(crate) fn open(
        &mut self,
        entry: EntryMaterials,
        expire_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> PlanEvent {
        let entry_url = entry.url.clone();
        self.status = TaskStatus::Opened;
        self.open_at = Some(now);
        self.expire_at = Some(expire_at);
        self.entry = Some(entry);

        PlanEvent::TaskOpened(TaskOpened {
            task_id: self.id,
            plan_id: self.plan_id,
            testee_id: self.testee_id,
            entry_url,
            expire_at,
            open_at: now,
        })
    }

    pub(crate) fn complete(&mut self, assessment_id: AssessmentId, now: DateTime<Utc>) -> PlanEvent {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(now);
        self.assessment_id = Some(assessment_id);

        PlanEvent::TaskCompleted(TaskCompleted {
            task_id: self.id,
            plan_id: self.plan_id,
            testee_id: self.testee_id,
            assessment_id,
            completed_at: now,
        })
    }

    pub(crate) fn expire(&mut self, now: DateTime<Utc>) -> PlanEvent {
        self.status = TaskStatus::Expired;
        PlanEvent::TaskExpired(self.closed(now))
    }

    pub(crate) fn cancel(&mut self, now: DateTime<Utc>) -> PlanEvent {
        self.status = TaskStatus::Canceled;
        PlanEvent::TaskCanceled(self.closed(now))
    }

    fn closed(&self, now: DateTime<Utc>) -> TaskClosed {
        TaskClosed {
            task_id: self.id,
            plan_id: self.plan_id,
            testee_id: self.testee_id,
            occurred_at: now,
        }
    }
}

impl AggregateRoot for AssessmentTask {
    type Id = TaskId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn increment_version(&mut self) {
        self.version += 1;
    }
}
