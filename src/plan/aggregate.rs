// Copyright 2025 Cowboy AI, LLC.

//! Assessment plan aggregate

use super::schedule::Schedule;
use super::validator::PlanValidator;
use crate::entity::AggregateRoot;
use crate::errors::{DomainResult, ValidationErrors};
use crate::events::{PlanCreated, PlanEvent, PlanStatusChanged};
use crate::identifiers::{OrgId, PlanId, ScaleCode};
use crate::state_machine::{ensure_transition, PlanStatus, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A subject-agnostic measurement schedule
///
/// The plan is a template: it says what to measure and when, relative to
/// each subject's anchor date. It never holds tasks; tasks point back to it.
///
/// # Invariants
///
/// - the schedule passed validation and never changes after creation
/// - `finished` and `canceled` are terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentPlan {
    id: PlanId,
    org_id: OrgId,
    scale_code: ScaleCode,
    schedule: Schedule,
    status: PlanStatus,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AssessmentPlan {
    /// Create an active plan
    ///
    /// Fails with every violation found in the organization, scale and
    /// schedule.
    pub fn new(
        org_id: OrgId,
        scale_code: ScaleCode,
        schedule: Schedule,
    ) -> DomainResult<(Self, PlanEvent)> {
        let mut violations = ValidationErrors::new();
        violations.extend(PlanValidator::validate_owner(org_id, &scale_code));
        violations.extend(PlanValidator::validate_schedule(&schedule));
        violations.into_result()?;

        let now = Utc::now();
        let plan = Self {
            id: PlanId::new(),
            org_id,
            scale_code,
            schedule,
            status: PlanStatus::Active,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        let event = PlanEvent::PlanCreated(PlanCreated {
            plan_id: plan.id,
            org_id: plan.org_id,
            scale_code: plan.scale_code.clone(),
            schedule_type: plan.schedule.schedule_type(),
            created_at: now,
        });

        Ok((plan, event))
    }

    /// Rebuild a plan from stored state
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: PlanId,
        org_id: OrgId,
        scale_code: ScaleCode,
        schedule: Schedule,
        status: PlanStatus,
        version: u64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            org_id,
            scale_code,
            schedule,
            status,
            version,
            created_at,
            updated_at,
        }
    }

    /// Plan id
    pub fn id(&self) -> PlanId {
        self.id
    }

    /// Owning organization
    pub fn org_id(&self) -> OrgId {
        self.org_id
    }

    /// Scale the plan measures
    pub fn scale_code(&self) -> &ScaleCode {
        &self.scale_code
    }

    /// Recurrence rule
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Current status
    pub fn status(&self) -> PlanStatus {
        self.status
    }

    /// Creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last status change
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether the plan accepts enrollments
    pub fn is_active(&self) -> bool {
        self.status == PlanStatus::Active
    }

    /// Whether the plan is paused
    pub fn is_paused(&self) -> bool {
        self.status == PlanStatus::Paused
    }

    /// Whether the plan reached `finished` or `canceled`
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub(crate) fn activate(&mut self, now: DateTime<Utc>) -> DomainResult<PlanEvent> {
        self.transition(PlanStatus::Active, "activate", now)?;
        Ok(PlanEvent::PlanActivated(self.status_changed(now)))
    }

    /// Moves to paused; the caller builds the event once tasks are canceled
    pub(crate) fn pause(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(PlanStatus::Paused, "pause", now)
    }

    /// Moves to active; the caller builds the event once tasks are regenerated
    pub(crate) fn resume(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(PlanStatus::Active, "resume", now)
    }

    pub(crate) fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<PlanEvent> {
        self.transition(PlanStatus::Canceled, "cancel", now)?;
        Ok(PlanEvent::PlanCanceled(self.status_changed(now)))
    }

    pub(crate) fn finish(&mut self, now: DateTime<Utc>) -> DomainResult<PlanEvent> {
        self.transition(PlanStatus::Finished, "finish", now)?;
        Ok(PlanEvent::PlanFinished(self.status_changed(now)))
    }

    fn transition(
        &mut self,
        target: PlanStatus,
        action: &'static str,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        ensure_transition("plan", action, &self.status, &target)?;
        self.status = target;
        self.updated_at = now;
        Ok(())
    }

    fn status_changed(&self, now: DateTime<Utc>) -> PlanStatusChanged {
        PlanStatusChanged {
            plan_id: self.id,
            occurred_at: now,
        }
    }
}

impl AggregateRoot for AssessmentPlan {
    type Id = PlanId;

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
