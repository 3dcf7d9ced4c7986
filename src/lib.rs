// Copyright 2025 Cowboy AI, LLC.

//! # CIM Domain Assessment
//!
//! Recurring assessment plans and the tasks they schedule.
//!
//! A plan states how often a subject is measured with a scale ("every two
//! weeks, five times", "on these dates"). Enrolling a subject turns that
//! schedule into a dated series of tasks, and both plans and tasks then move
//! through their own state machines:
//!
//! - **Plan**: `active ⇄ paused`, then `finished` or `canceled`
//! - **Task**: `pending → opened → completed | expired`, or `canceled`
//!
//! ## Layers
//!
//! 1. [`plan`]: aggregates and pure domain services (generation, validation,
//!    lifecycles, enrollment); no I/O
//! 2. [`persistence`]: repository ports, the unit of work and an in-memory store
//! 3. [`application`]: use cases that load, mutate, save, commit and publish
//!
//! ## Design Principles
//!
//! 1. **Type Safety**: phantom-typed ids, a schedule sum type, enum states
//! 2. **Explicit Effects**: mutators return the events they raise
//! 3. **Replayable Generation**: a subject's series is a function of schedule and anchor
//! 4. **Controlled State**: transitions are checked before anything changes
//!
//! ```rust
//! use cim_domain_assessment::{
//!     AssessmentPlan, OrgId, PlanEnrollment, ScaleCode, Schedule, SubjectId, start_of_day,
//! };
//! use chrono::NaiveDate;
//!
//! let (plan, _created) = AssessmentPlan::new(
//!     OrgId::new(1),
//!     ScaleCode::new("PHQ-9"),
//!     Schedule::ByWeek { interval_weeks: 2, total_times: 5 },
//! )?;
//!
//! let start = start_of_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
//! let outcome = PlanEnrollment::default().enroll_testee(&plan, SubjectId::new(7), Some(start), &[])?;
//!
//! assert_eq!(outcome.value.len(), 5);
//! # Ok::<(), cim_domain_assessment::DomainError>(())
//! ```

#![warn(missing_docs)]

pub mod application;
pub mod config;
pub mod entity;
pub mod entry;
pub mod errors;
pub mod events;
pub mod identifiers;
pub mod persistence;
pub mod plan;
pub mod state_machine;

// Re-export core types
pub use application::{
    BatchReport, CompleteTask, CreatePlan, EnrollTestee, EnrollmentService, EnrollmentView,
    EventPublisher, ExtensionReport, InMemoryEventPublisher, OpenTask, PlanLifecycleService,
    PlanQueryService, PlanView, ResumePlan, TaskManagementService, TaskSchedulerService,
    TaskView, TerminateEnrollment,
};
pub use config::SchedulerConfig;
pub use entity::{AggregateRoot, EntityId};
pub use entry::{Entry, EntryGenerator, TokenEntryGenerator};
pub use errors::{DomainError, DomainResult, FieldViolation, ValidationErrors};
pub use events::{DomainEvent, Outcome, PlanEvent};
pub use identifiers::{AssessmentId, OrgId, PlanId, ScaleCode, SubjectId, TaskId};
pub use persistence::{
    AssessmentPlanRepository, AssessmentTaskRepository, InMemoryUnitOfWork, RepositoryError,
    Transaction, UnitOfWork,
};
pub use plan::{
    start_of_day, AssessmentPlan, AssessmentTask, EntryMaterials, PlanEnrollment, PlanLifecycle,
    PlanValidator, Schedule, ScheduleDraft, ScheduleType, TaskGenerator, TaskLifecycle, TaskRecord,
};
pub use state_machine::{PlanStatus, State, StateTransitions, TaskStatus};
