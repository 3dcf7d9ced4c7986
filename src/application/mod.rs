// Copyright 2025 Cowboy AI, LLC.

//! # Application Layer
//!
//! Use cases over the plan domain. Each use case opens one transaction,
//! loads what it needs, runs the pure domain services, saves the results and
//! commits; events are published only after the commit succeeded.
//!
//! ```mermaid
//! sequenceDiagram
//!     participant C as Caller
//!     participant S as Service
//!     participant T as Transaction
//!     participant D as Domain
//!     participant P as EventPublisher
//!     C->>S: command
//!     S->>T: begin + load
//!     S->>D: mutate
//!     D-->>S: Outcome { value, events }
//!     S->>T: save + commit
//!     S->>P: publish_batch(events)
//!     S-->>C: view
//! ```
//!
//! Best-effort batch runs ([`TaskSchedulerService`]) use one transaction per
//! task so that a failing task neither blocks nor rolls back the others.

pub mod commands;
pub mod enrollment_service;
pub mod plan_service;
pub mod publisher;
pub mod query_service;
pub mod scheduler_service;
pub mod task_service;
pub mod views;

pub use commands::{
    CompleteTask, CreatePlan, EnrollTestee, OpenTask, ResumePlan, TerminateEnrollment,
};
pub use enrollment_service::EnrollmentService;
pub use plan_service::PlanLifecycleService;
pub use publisher::{EventPublisher, InMemoryEventPublisher};
pub use query_service::PlanQueryService;
pub use scheduler_service::TaskSchedulerService;
pub use task_service::TaskManagementService;
pub use views::{BatchReport, EnrollmentView, ExtensionReport, PlanView, TaskView};

use crate::errors::{DomainError, DomainResult};
use crate::identifiers::{PlanId, TaskId};
use crate::persistence::Transaction;
use crate::plan::{AssessmentPlan, AssessmentTask};

pub(crate) async fn load_plan(
    tx: &mut Box<dyn Transaction>,
    plan_id: PlanId,
) -> DomainResult<AssessmentPlan> {
    tx.plans()
        .find_by_id(plan_id)
        .await?
        .ok_or_else(|| DomainError::not_found("plan", plan_id))
}

pub(crate) async fn load_task(
    tx: &mut Box<dyn Transaction>,
    task_id: TaskId,
) -> DomainResult<AssessmentTask> {
    tx.tasks()
        .find_by_id(task_id)
        .await?
        .ok_or_else(|| DomainError::not_found("task", task_id))
}
