// Copyright 2025 Cowboy AI, LLC.

//! Read models returned by the use cases

use crate::identifiers::{AssessmentId, OrgId, PlanId, ScaleCode, SubjectId, TaskId};
use crate::plan::{AssessmentPlan, AssessmentTask, ScheduleDraft};
use crate::state_machine::{PlanStatus, TaskStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A plan as shown to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlanView {
    /// Plan id
    pub id: PlanId,
    /// Owning organization
    pub org_id: OrgId,
    /// Measured scale
    pub scale_code: ScaleCode,
    /// `by_week`, `by_day`, `custom` or `fixed_date`
    pub schedule_type: String,
    /// Interval in weeks or days, 0 for list schedules
    pub interval: i64,
    /// Number of occurrences
    pub total_times: i64,
    /// `YYYY-MM-DD` dates of a `fixed_date` schedule
    pub fixed_dates: Vec<String>,
    /// Week offsets of a `custom` schedule
    pub relative_weeks: Vec<i64>,
    /// Plan status
    pub status: PlanStatus,
    /// Creation time, RFC 3339
    pub created_at: String,
    /// Last change, RFC 3339
    pub updated_at: String,
}

impl From<&AssessmentPlan> for PlanView {
    fn from(plan: &AssessmentPlan) -> Self {
        let draft = ScheduleDraft::from(plan.schedule());
        Self {
            id: plan.id(),
            org_id: plan.org_id(),
            scale_code: plan.scale_code().clone(),
            schedule_type: draft.schedule_type,
            interval: draft.interval,
            total_times: plan.schedule().total_times() as i64,
            fixed_dates: draft
                .fixed_dates
                .iter()
                .map(|date| date.format(DATE_FORMAT).to_string())
                .collect(),
            relative_weeks: draft.relative_weeks,
            status: plan.status(),
            created_at: rfc3339(plan.created_at()),
            updated_at: rfc3339(plan.updated_at()),
        }
    }
}

/// A task as shown to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskView {
    /// Task id
    pub id: TaskId,
    /// Owning plan
    pub plan_id: PlanId,
    /// 1-based position in the subject's series
    pub seq: u32,
    /// Owning organization
    pub org_id: OrgId,
    /// Subject
    pub testee_id: SubjectId,
    /// Measured scale
    pub scale_code: ScaleCode,
    /// Planned time, RFC 3339
    pub planned_at: String,
    /// Opening time, RFC 3339
    pub open_at: Option<String>,
    /// Entry deadline, RFC 3339
    pub expire_at: Option<String>,
    /// Completion time, RFC 3339
    pub completed_at: Option<String>,
    /// Task status
    pub status: TaskStatus,
    /// Produced assessment
    pub assessment_id: Option<AssessmentId>,
    /// Entry token, empty until opened
    pub entry_token: String,
    /// Entry URL, empty until opened
    pub entry_url: String,
}

impl From<&AssessmentTask> for TaskView {
    fn from(task: &AssessmentTask) -> Self {
        let (entry_token, entry_url) = task
            .entry()
            .map(|entry| (entry.token.clone(), entry.url.clone()))
            .unwrap_or_default();

        Self {
            id: task.id(),
            plan_id: task.plan_id(),
            seq: task.seq(),
            org_id: task.org_id(),
            testee_id: task.testee_id(),
            scale_code: task.scale_code().clone(),
            planned_at: rfc3339(task.planned_at()),
            open_at: task.open_at().map(rfc3339),
            expire_at: task.expire_at().map(rfc3339),
            completed_at: task.completed_at().map(rfc3339),
            status: task.status(),
            assessment_id: task.assessment_id(),
            entry_token,
            entry_url,
        }
    }
}

/// Result of an enrollment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EnrollmentView {
    /// Plan
    pub plan_id: PlanId,
    /// Subject
    pub testee_id: SubjectId,
    /// Generated tasks, by seq
    pub tasks: Vec<TaskView>,
}

/// Summary of a best-effort batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BatchReport {
    /// Tasks the run picked up
    pub examined: usize,
    /// Tasks changed and committed
    pub succeeded: Vec<TaskView>,
    /// Tasks skipped because of an error
    pub failed: Vec<TaskId>,
}

impl BatchReport {
    /// Whether every examined task succeeded
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Summary of a schedule extension run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExtensionReport {
    /// Active plans the run looked at
    pub plans_examined: usize,
    /// Tasks materialized by the run
    pub created: Vec<TaskView>,
    /// Plans skipped because of an error
    pub failed_plans: Vec<PlanId>,
}

pub(crate) fn task_views(tasks: &[AssessmentTask]) -> Vec<TaskView> {
    tasks.iter().map(TaskView::from).collect()
}
