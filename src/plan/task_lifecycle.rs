// Copyright 2025 Cowboy AI, LLC.

//! Task state machine enforcement

use super::task::{AssessmentTask, EntryMaterials};
use crate::errors::{DomainError, DomainResult, ValidationErrors};
use crate::events::PlanEvent;
use crate::identifiers::AssessmentId;
use crate::state_machine::{ensure_transition, TaskStatus};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Moves tasks through `pending → opened → completed | expired` and cancellation
///
/// Every operation checks the current status first and leaves the task
/// untouched when a precondition fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskLifecycle;

impl TaskLifecycle {
    /// Create the service
    pub fn new() -> Self {
        Self
    }

    /// Hand out the entry of a pending task
    pub fn open(
        &self,
        task: &mut AssessmentTask,
        token: impl Into<String>,
        url: impl Into<String>,
        expire_at: DateTime<Utc>,
    ) -> DomainResult<PlanEvent> {
        ensure_transition("task", "open", &task.status(), &TaskStatus::Opened)?;

        let token = token.into();
        let url = url.into();
        let now = Utc::now();

        let mut violations = ValidationErrors::new();
        if token.trim().is_empty() {
            violations.push("token", "entry token must not be empty");
        }
        if url.trim().is_empty() {
            violations.push("url", "entry url must not be empty");
        }
        if expire_at <= now {
            violations.push("expireAt", "expiry must be in the future");
        }
        violations.into_result()?;

        debug!(task_id = %task.id(), seq = task.seq(), %expire_at, "Opening task");
        Ok(task.open(EntryMaterials { token, url }, expire_at, now))
    }

    /// Record the assessment produced by an opened task
    pub fn complete(
        &self,
        task: &mut AssessmentTask,
        assessment_id: AssessmentId,
    ) -> DomainResult<PlanEvent> {
        ensure_transition("task", "complete", &task.status(), &TaskStatus::Completed)?;

        if assessment_id.is_zero() {
            return Err(DomainError::validation(
                "assessmentID",
                "assessment id must not be empty",
            ));
        }

        debug!(task_id = %task.id(), %assessment_id, "Completing task");
        Ok(task.complete(assessment_id, Utc::now()))
    }

    /// Close an opened task whose entry ran out
    pub fn expire(&self, task: &mut AssessmentTask) -> DomainResult<PlanEvent> {
        ensure_transition("task", "expire", &task.status(), &TaskStatus::Expired)?;

        debug!(task_id = %task.id(), "Expiring task");
        Ok(task.expire(Utc::now()))
    }

    /// Withdraw a task; terminal tasks are left as they are
    ///
    /// Returns the raised event, or `None` when the task was already terminal.
    pub fn cancel(&self, task: &mut AssessmentTask) -> Option<PlanEvent> {
        if task.is_terminal() {
            return None;
        }

        debug!(task_id = %task.id(), status = %task.status(), "Canceling task");
        Some(task.cancel(Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::AggregateRoot;
    use crate::events::DomainEvent;
    use crate::identifiers::{OrgId, PlanId, ScaleCode, SubjectId};
    use chrono::TimeDelta;
    use test_case::test_case;

    fn pending() -> AssessmentTask {
        AssessmentTask::new(
            PlanId::new(),
            1,
            OrgId::new(1),
            SubjectId::new(3),
            ScaleCode::new("GAD-7"),
            Utc::now(),
        )
    }

    fn opened() -> AssessmentTask {
        let mut task = pending();
        TaskLifecycle::new()
            .open(&mut task, "tok", "https://entry/1", Utc::now() + TimeDelta::days(1))
            .unwrap();
        task
    }

    fn in_status(status: TaskStatus) -> AssessmentTask {
        let lifecycle = TaskLifecycle::new();
        match status {
            TaskStatus::Pending => pending(),
            TaskStatus::Opened => opened(),
            TaskStatus::Completed => {
                let mut task = opened();
                lifecycle.complete(&mut task, AssessmentId::new(1)).unwrap();
                task
            }
            TaskStatus::Expired => {
                let mut task = opened();
                lifecycle.expire(&mut task).unwrap();
                task
            }
            TaskStatus::Canceled => {
                let mut task = pending();
                lifecycle.cancel(&mut task);
                task
            }
        }
    }

    #[test]
    fn test_open_sets_entry_and_times() {
        let mut task = pending();
        let expire_at = Utc::now() + TimeDelta::hours(2);

        let event = TaskLifecycle::new()
            .open(&mut task, "tok", "https://entry/1", expire_at)
            .unwrap();

        assert_eq!(event.event_type(), "task.opened");
        assert_eq!(task.status(), TaskStatus::Opened);
        assert_eq!(task.expire_at(), Some(expire_at));
        assert!(task.open_at().is_some());
        assert_eq!(task.entry().map(|e| e.token.as_str()), Some("tok"));
    }

    #[test]
    fn test_open_rejects_bad_entry_without_mutation() {
        let mut task = pending();
        let before = task.clone();

        let err = TaskLifecycle::new()
            .open(&mut task, "", " ", Utc::now() - TimeDelta::minutes(1))
            .unwrap_err();

        assert!(err.is_validation_error());
        assert_eq!(err.violations().len(), 3);
        assert_eq!(task, before);
    }

    #[test_case(TaskStatus::Opened ; "opened")]
    #[test_case(TaskStatus::Completed ; "completed")]
    #[test_case(TaskStatus::Canceled ; "canceled")]
    fn test_open_requires_pending(status: TaskStatus) {
        let mut task = in_status(status);
        let before = task.clone();

        let err = TaskLifecycle::new()
            .open(&mut task, "tok", "url", Utc::now() + TimeDelta::days(1))
            .unwrap_err();

        assert!(err.is_state_error());
        assert!(err.to_string().contains("pending"));
        assert_eq!(task, before);
    }

    #[test_case(TaskStatus::Pending ; "pending")]
    #[test_case(TaskStatus::Expired ; "expired")]
    #[test_case(TaskStatus::Canceled ; "canceled")]
    fn test_complete_requires_opened(status: TaskStatus) {
        let mut task = in_status(status);
        let before = task.clone();

        let err = TaskLifecycle::new()
            .complete(&mut task, AssessmentId::new(9))
            .unwrap_err();

        assert!(err.is_state_error());
        assert!(err.to_string().contains("opened"));
        assert_eq!(task, before);
    }

    #[test]
    fn test_complete_requires_assessment() {
        let mut task = opened();
        let err = TaskLifecycle::new()
            .complete(&mut task, AssessmentId::new(0))
            .unwrap_err();

        assert!(err.is_validation_error());
        assert_eq!(task.status(), TaskStatus::Opened);
        assert!(task.assessment_id().is_none());
    }

    #[test]
    fn test_expire_requires_opened() {
        let mut task = pending();
        assert!(TaskLifecycle::new().expire(&mut task).is_err());

        let mut task = opened();
        let event = TaskLifecycle::new().expire(&mut task).unwrap();
        assert_eq!(event.event_type(), "task.expired");
        assert_eq!(task.status(), TaskStatus::Expired);
    }

    #[test_case(TaskStatus::Pending ; "pending")]
    #[test_case(TaskStatus::Opened ; "opened")]
    fn test_cancel_active_task(status: TaskStatus) {
        let mut task = in_status(status);

        let event = TaskLifecycle::new().cancel(&mut task);

        assert!(event.is_some());
        assert_eq!(task.status(), TaskStatus::Canceled);
    }

    #[test_case(TaskStatus::Completed ; "completed")]
    #[test_case(TaskStatus::Expired ; "expired")]
    #[test_case(TaskStatus::Canceled ; "canceled")]
    fn test_cancel_is_idempotent_on_terminal(status: TaskStatus) {
        let mut task = in_status(status);
        let before = task.clone();

        assert!(TaskLifecycle::new().cancel(&mut task).is_none());
        assert!(TaskLifecycle::new().cancel(&mut task).is_none());
        assert_eq!(task, before);
        assert_eq!(task.version(), before.version());
    }
}
