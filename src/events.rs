// Copyright 2025 Cowboy AI, LLC.

//! Domain events for assessment plans
//!
//! Events represent facts that have occurred in the domain. Aggregates do not
//! buffer them: every mutating call returns the events it raised, and
//! application services publish them once the enclosing transaction commits.

use crate::identifiers::{AssessmentId, OrgId, PlanId, ScaleCode, SubjectId, TaskId};
use crate::plan::schedule::ScheduleType;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Base trait for all domain events
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Get the aggregate ID this event relates to
    fn aggregate_id(&self) -> Uuid;

    /// Get the event type name
    fn event_type(&self) -> &'static str;

    /// Get the schema version
    fn version(&self) -> &'static str {
        "v1"
    }
}

/// A plan was created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlanCreated {
    /// Plan
    pub plan_id: PlanId,
    /// Owning organization
    pub org_id: OrgId,
    /// Scale the plan measures
    pub scale_code: ScaleCode,
    /// Recurrence type
    pub schedule_type: ScheduleType,
    /// When
    pub created_at: DateTime<Utc>,
}

/// A plan changed status without touching tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlanStatusChanged {
    /// Plan
    pub plan_id: PlanId,
    /// When
    pub occurred_at: DateTime<Utc>,
}

/// A plan was paused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlanPaused {
    /// Plan
    pub plan_id: PlanId,
    /// Tasks canceled by the pause
    pub canceled_tasks: usize,
    /// When
    pub paused_at: DateTime<Utc>,
}

/// A paused plan was resumed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlanResumed {
    /// Plan
    pub plan_id: PlanId,
    /// Tasks regenerated for the remaining occurrences
    pub regenerated_tasks: usize,
    /// When
    pub resumed_at: DateTime<Utc>,
}

/// A subject joined a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TesteeEnrolled {
    /// Plan
    pub plan_id: PlanId,
    /// Enrolled subject
    pub testee_id: SubjectId,
    /// Anchor used for generation
    pub start_date: DateTime<Utc>,
    /// Tasks generated at enrollment
    pub task_count: usize,
    /// When
    pub enrolled_at: DateTime<Utc>,
}

/// A subject left a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EnrollmentTerminated {
    /// Plan
    pub plan_id: PlanId,
    /// Subject whose tasks were canceled
    pub testee_id: SubjectId,
    /// Tasks canceled
    pub canceled_tasks: usize,
    /// When
    pub terminated_at: DateTime<Utc>,
}

/// A task's entry was handed out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskOpened {
    /// Task
    pub task_id: TaskId,
    /// Owning plan
    pub plan_id: PlanId,
    /// Subject
    pub testee_id: SubjectId,
    /// Entry URL
    pub entry_url: String,
    /// Entry deadline
    pub expire_at: DateTime<Utc>,
    /// When
    pub open_at: DateTime<Utc>,
}

/// A task was completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskCompleted {
    /// Task
    pub task_id: TaskId,
    /// Owning plan
    pub plan_id: PlanId,
    /// Subject
    pub testee_id: SubjectId,
    /// Produced assessment record
    pub assessment_id: AssessmentId,
    /// When
    pub completed_at: DateTime<Utc>,
}

/// A task reached a terminal state without completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskClosed {
    /// Task
    pub task_id: TaskId,
    /// Owning plan
    pub plan_id: PlanId,
    /// Subject
    pub testee_id: SubjectId,
    /// When
    pub occurred_at: DateTime<Utc>,
}

/// Every event raised by plans and tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "event_type", content = "data")]
pub enum PlanEvent {
    /// `plan.created`
    #[serde(rename = "plan.created")]
    PlanCreated(PlanCreated),
    /// `plan.activated`
    #[serde(rename = "plan.activated")]
    PlanActivated(PlanStatusChanged),
    /// `plan.paused`
    #[serde(rename = "plan.paused")]
    PlanPaused(PlanPaused),
    /// `plan.resumed`
    #[serde(rename = "plan.resumed")]
    PlanResumed(PlanResumed),
    /// `plan.canceled`
    #[serde(rename = "plan.canceled")]
    PlanCanceled(PlanStatusChanged),
    /// `plan.finished`
    #[serde(rename = "plan.finished")]
    PlanFinished(PlanStatusChanged),
    /// `plan.testee_enrolled`
    #[serde(rename = "plan.testee_enrolled")]
    TesteeEnrolled(TesteeEnrolled),
    /// `plan.enrollment_terminated`
    #[serde(rename = "plan.enrollment_terminated")]
    EnrollmentTerminated(EnrollmentTerminated),
    /// `task.opened`
    #[serde(rename = "task.opened")]
    TaskOpened(TaskOpened),
    /// `task.completed`
    #[serde(rename = "task.completed")]
    TaskCompleted(TaskCompleted),
    /// `task.expired`
    #[serde(rename = "task.expired")]
    TaskExpired(TaskClosed),
    /// `task.canceled`
    #[serde(rename = "task.canceled")]
    TaskCanceled(TaskClosed),
}

impl PlanEvent {
    /// Plan the event belongs to, for task events the owning plan
    pub fn plan_id(&self) -> PlanId {
        match self {
            Self::PlanCreated(e) => e.plan_id,
            Self::PlanActivated(e) | Self::PlanCanceled(e) | Self::PlanFinished(e) => e.plan_id,
            Self::PlanPaused(e) => e.plan_id,
            Self::PlanResumed(e) => e.plan_id,
            Self::TesteeEnrolled(e) => e.plan_id,
            Self::EnrollmentTerminated(e) => e.plan_id,
            Self::TaskOpened(e) => e.plan_id,
            Self::TaskCompleted(e) => e.plan_id,
            Self::TaskExpired(e) | Self::TaskCanceled(e) => e.plan_id,
        }
    }

    /// Task the event belongs to, if it is a task event
    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            Self::TaskOpened(e) => Some(e.task_id),
            Self::TaskCompleted(e) => Some(e.task_id),
            Self::TaskExpired(e) | Self::TaskCanceled(e) => Some(e.task_id),
            _ => None,
        }
    }

    /// When the fact happened
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::PlanCreated(e) => e.created_at,
            Self::PlanActivated(e) | Self::PlanCanceled(e) | Self::PlanFinished(e) => e.occurred_at,
            Self::PlanPaused(e) => e.paused_at,
            Self::PlanResumed(e) => e.resumed_at,
            Self::TesteeEnrolled(e) => e.enrolled_at,
            Self::EnrollmentTerminated(e) => e.terminated_at,
            Self::TaskOpened(e) => e.open_at,
            Self::TaskCompleted(e) => e.completed_at,
            Self::TaskExpired(e) | Self::TaskCanceled(e) => e.occurred_at,
        }
    }
}

impl DomainEvent for PlanEvent {
    fn aggregate_id(&self) -> Uuid {
        match self.task_id() {
            Some(task_id) => *task_id.as_uuid(),
            None => *self.plan_id().as_uuid(),
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            Self::PlanCreated(_) => "plan.created",
            Self::PlanActivated(_) => "plan.activated",
            Self::PlanPaused(_) => "plan.paused",
            Self::PlanResumed(_) => "plan.resumed",
            Self::PlanCanceled(_) => "plan.canceled",
            Self::PlanFinished(_) => "plan.finished",
            Self::TesteeEnrolled(_) => "plan.testee_enrolled",
            Self::EnrollmentTerminated(_) => "plan.enrollment_terminated",
            Self::TaskOpened(_) => "task.opened",
            Self::TaskCompleted(_) => "task.completed",
            Self::TaskExpired(_) => "task.expired",
            Self::TaskCanceled(_) => "task.canceled",
        }
    }
}

/// Result of a domain operation together with the events it raised
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    /// What the operation produced
    pub value: T,
    /// Raised events, in order
    pub events: Vec<PlanEvent>,
}

impl<T> Outcome<T> {
    /// Outcome without events
    pub fn new(value: T) -> Self {
        Self {
            value,
            events: Vec::new(),
        }
    }

    /// Outcome with events
    pub fn with_events(value: T, events: Vec<PlanEvent>) -> Self {
        Self { value, events }
    }

    /// Append an event
    pub fn push(&mut self, event: PlanEvent) {
        self.events.push(event);
    }

    /// Transform the value, keeping the events
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            events: self.events,
        }
    }

    /// Split into value and events
    pub fn into_parts(self) -> (T, Vec<PlanEvent>) {
        (self.value, self.events)
    }
}
