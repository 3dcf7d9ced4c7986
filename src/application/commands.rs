// Copyright 2025 Cowboy AI, LLC.

//! Use case inputs

use crate::identifiers::{AssessmentId, OrgId, PlanId, ScaleCode, SubjectId, TaskId};
use crate::plan::ScheduleDraft;
use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Create a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CreatePlan {
    /// Owning organization
    pub org_id: OrgId,
    /// Scale the plan measures
    pub scale_code: ScaleCode,
    /// Raw schedule as submitted
    pub schedule: ScheduleDraft,
}

/// Resume a paused plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResumePlan {
    /// Plan to resume
    pub plan_id: PlanId,
    /// Explicit anchors per subject; others are inferred from their tasks
    #[serde(default)]
    pub start_dates: HashMap<SubjectId, NaiveDate>,
}

impl ResumePlan {
    /// Resume inferring every anchor
    pub fn new(plan_id: PlanId) -> Self {
        Self {
            plan_id,
            start_dates: HashMap::new(),
        }
    }

    /// Pin the anchor of one subject
    pub fn with_start_date(mut self, testee_id: SubjectId, start_date: NaiveDate) -> Self {
        self.start_dates.insert(testee_id, start_date);
        self
    }
}

/// Enroll a subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EnrollTestee {
    /// Plan to enroll into
    pub plan_id: PlanId,
    /// Subject
    pub testee_id: SubjectId,
    /// Anchor of the series
    pub start_date: Option<NaiveDate>,
}

/// Detach a subject from a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TerminateEnrollment {
    /// Plan
    pub plan_id: PlanId,
    /// Subject
    pub testee_id: SubjectId,
}

/// Record a finished assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CompleteTask {
    /// Task
    pub task_id: TaskId,
    /// Produced assessment
    pub assessment_id: AssessmentId,
}

/// Open a task with entry material issued by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OpenTask {
    /// Task
    pub task_id: TaskId,
    /// Access token
    pub token: String,
    /// Entry URL
    pub url: String,
    /// Entry deadline
    pub expire_at: DateTime<Utc>,
}
