// Copyright 2025 Cowboy AI, LLC.

//! Assessment plans and their tasks
//!
//! The domain layer is synchronous and does no I/O. Services take loaded
//! aggregates, mutate them in place and return new tasks plus raised events
//! as an [`Outcome`](crate::events::Outcome).
//!
//! - [`TaskGenerator`] turns a schedule into a subject's task series
//! - [`PlanValidator`] reports field violations
//! - [`TaskLifecycle`] and [`PlanLifecycle`] guard the two state machines
//! - [`PlanEnrollment`] attaches and detaches subjects

pub mod aggregate;
pub mod enrollment;
pub mod generator;
pub mod plan_lifecycle;
pub mod schedule;
pub mod series;
pub mod task;
pub mod task_lifecycle;
pub mod validator;

pub use aggregate::AssessmentPlan;
pub use enrollment::PlanEnrollment;
pub use generator::TaskGenerator;
pub use plan_lifecycle::PlanLifecycle;
pub use schedule::{start_of_day, Schedule, ScheduleDraft, ScheduleType};
pub use series::{group_by_subject, SubjectSeries};
pub use task::{AssessmentTask, EntryMaterials, TaskRecord};
pub use task_lifecycle::TaskLifecycle;
pub use validator::{PlanValidator, MAX_SCHEDULE_SPAN_DAYS, MAX_TOTAL_TIMES};
