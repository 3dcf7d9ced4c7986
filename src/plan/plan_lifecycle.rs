// Copyright 2025 Cowboy AI, LLC.

//! Plan state machine enforcement
//!
//! Pausing withdraws every open obligation of the plan; resuming rebuilds
//! each subject's remaining series from an anchor date. The anchor is either
//! supplied by the caller or reconstructed from the subject's most recently
//! generated task by inverting the schedule formula, so a resume is a pure
//! function of (schedule, anchor, completed work).
//!
//! ```mermaid
//! sequenceDiagram
//!     participant App as Application
//!     participant PL as PlanLifecycle
//!     participant TG as TaskGenerator
//!     App->>PL: resume(plan, tasks, overrides)
//!     loop every subject with tasks
//!         PL->>PL: anchor = override or infer(latest task)
//!         PL->>TG: generate(plan, subject, anchor)
//!         PL->>PL: keep seq > max completed seq
//!     end
//!     PL-->>App: new tasks + events
//! ```

use super::aggregate::AssessmentPlan;
use super::generator::TaskGenerator;
use super::series::group_by_subject;
use super::task::AssessmentTask;
use super::task_lifecycle::TaskLifecycle;
use crate::errors::{DomainError, DomainResult};
use crate::events::{Outcome, PlanEvent, PlanPaused, PlanResumed};
use crate::identifiers::SubjectId;
use crate::state_machine::{PlanStatus, State};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

/// Plan-level lifecycle operations with their task cascades
#[derive(Debug, Clone, Default)]
pub struct PlanLifecycle {
    generator: TaskGenerator,
    task_lifecycle: TaskLifecycle,
}

impl PlanLifecycle {
    /// Create the service
    pub fn new(generator: TaskGenerator, task_lifecycle: TaskLifecycle) -> Self {
        Self {
            generator,
            task_lifecycle,
        }
    }

    /// Put a paused plan back to active without regenerating tasks
    ///
    /// A no-op on an active plan. Use [`PlanLifecycle::resume`] to also
    /// rebuild the task series.
    pub fn activate(&self, plan: &mut AssessmentPlan) -> DomainResult<Option<PlanEvent>> {
        match plan.status() {
            PlanStatus::Active => Ok(None),
            PlanStatus::Finished | PlanStatus::Canceled => Err(terminal("activate", plan)),
            PlanStatus::Paused => plan.activate(Utc::now()).map(Some),
        }
    }

    /// Pause an active plan and cancel its pending and opened tasks
    ///
    /// `tasks` may contain tasks of other plans; they are ignored. Terminal
    /// tasks stay untouched. Returns copies of the newly canceled tasks for
    /// the caller to persist.
    pub fn pause(
        &self,
        plan: &mut AssessmentPlan,
        tasks: &mut [AssessmentTask],
    ) -> DomainResult<Outcome<Vec<AssessmentTask>>> {
        let now = Utc::now();
        plan.pause(now)?;

        let mut outcome = self.cancel_open_tasks(plan, tasks);
        info!(
            plan_id = %plan.id(),
            canceled = outcome.value.len(),
            "Plan paused"
        );
        outcome.push(PlanEvent::PlanPaused(PlanPaused {
            plan_id: plan.id(),
            canceled_tasks: outcome.value.len(),
            paused_at: now,
        }));

        Ok(outcome)
    }

    /// Resume a paused plan and regenerate every subject's unfinished series
    ///
    /// For each subject holding at least one task of the plan, the full
    /// series is regenerated from the anchor (override, else inferred from
    /// the most recently generated task, which belongs to the current
    /// enrollment) and only occurrences after the highest completed seq are
    /// returned.
    pub fn resume(
        &self,
        plan: &mut AssessmentPlan,
        tasks: &[AssessmentTask],
        start_dates: &HashMap<SubjectId, DateTime<Utc>>,
    ) -> DomainResult<Outcome<Vec<AssessmentTask>>> {
        let now = Utc::now();
        plan.resume(now)?;

        let mut regenerated = Vec::new();
        for (testee_id, series) in group_by_subject(plan.id(), tasks) {
            let anchor = match start_dates.get(&testee_id) {
                Some(start) => *start,
                None => match series.inferred_anchor(plan.schedule()) {
                    Some(anchor) => {
                        debug!(plan_id = %plan.id(), %testee_id, %anchor, "Inferred start date");
                        anchor
                    }
                    None => continue,
                },
            };

            let max_completed = series.max_completed_seq();
            let before = regenerated.len();
            regenerated.extend(
                self.generator
                    .generate(plan, testee_id, anchor)?
                    .into_iter()
                    .filter(|task| task.seq() > max_completed),
            );
            debug!(
                plan_id = %plan.id(),
                %testee_id,
                max_completed,
                regenerated = regenerated.len() - before,
                "Regenerated series"
            );
        }

        info!(plan_id = %plan.id(), regenerated = regenerated.len(), "Plan resumed");
        let event = PlanEvent::PlanResumed(PlanResumed {
            plan_id: plan.id(),
            regenerated_tasks: regenerated.len(),
            resumed_at: now,
        });

        Ok(Outcome::with_events(regenerated, vec![event]))
    }

    /// Cancel a plan; a no-op when already canceled
    ///
    /// Tasks are not touched here.
    pub fn cancel(&self, plan: &mut AssessmentPlan) -> DomainResult<Option<PlanEvent>> {
        match plan.status() {
            PlanStatus::Canceled => Ok(None),
            PlanStatus::Finished => Err(terminal("cancel", plan)),
            PlanStatus::Active | PlanStatus::Paused => plan.cancel(Utc::now()).map(Some),
        }
    }

    /// Finish a plan; a no-op when already finished
    pub fn finish(&self, plan: &mut AssessmentPlan) -> DomainResult<Option<PlanEvent>> {
        match plan.status() {
            PlanStatus::Finished => Ok(None),
            PlanStatus::Canceled => Err(terminal("finish", plan)),
            PlanStatus::Active | PlanStatus::Paused => plan.finish(Utc::now()).map(Some),
        }
    }

    /// Cancel every non-terminal task of the plan
    pub fn cancel_open_tasks(
        &self,
        plan: &AssessmentPlan,
        tasks: &mut [AssessmentTask],
    ) -> Outcome<Vec<AssessmentTask>> {
        let mut outcome = Outcome::new(Vec::new());
        for task in tasks.iter_mut().filter(|task| task.plan_id() == plan.id()) {
            if let Some(event) = self.task_lifecycle.cancel(task) {
                outcome.push(event);
                outcome.value.push(task.clone());
            }
        }
        outcome
    }
}

fn terminal(action: &'static str, plan: &AssessmentPlan) -> DomainError {
    DomainError::InvalidState {
        entity: "plan",
        action,
        required: "active or paused".to_string(),
        actual: plan.status().name().to_string(),
    }
}
