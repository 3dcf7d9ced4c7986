// Copyright 2025 Cowboy AI, LLC.

//! Per-subject views over a plan's tasks

use super::schedule::Schedule;
use super::task::AssessmentTask;
use crate::identifiers::{PlanId, SubjectId};
use crate::state_machine::TaskStatus;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// The tasks one subject holds under one plan
#[derive(Debug, Clone)]
pub struct SubjectSeries<'a> {
    testee_id: SubjectId,
    tasks: Vec<&'a AssessmentTask>,
}

impl<'a> SubjectSeries<'a> {
    /// Subject
    pub fn testee_id(&self) -> SubjectId {
        self.testee_id
    }

    /// Tasks in load order
    pub fn tasks(&self) -> &[&'a AssessmentTask] {
        &self.tasks
    }

    /// Task with the lowest seq
    pub fn first(&self) -> Option<&'a AssessmentTask> {
        self.tasks.iter().copied().min_by_key(|task| task.seq())
    }

    /// Task generated most recently, lowest seq among equals
    ///
    /// Every generation pass (enrollment, resume, extension) dates its tasks
    /// from the subject's current anchor, so this task carries that anchor
    /// even when older series remain in the store.
    pub fn latest(&self) -> Option<&'a AssessmentTask> {
        self.tasks.iter().copied().max_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| b.seq().cmp(&a.seq()))
        })
    }

    /// Task with the highest seq
    pub fn last(&self) -> Option<&'a AssessmentTask> {
        self.tasks.iter().copied().max_by_key(|task| task.seq())
    }

    /// Highest seq among completed tasks, 0 when none completed
    pub fn max_completed_seq(&self) -> u32 {
        self.tasks
            .iter()
            .filter(|task| task.status() == TaskStatus::Completed)
            .map(|task| task.seq())
            .max()
            .unwrap_or(0)
    }

    /// Highest seq present, whatever its status
    pub fn max_seq(&self) -> u32 {
        self.last().map_or(0, |task| task.seq())
    }

    /// Tasks that are not canceled
    pub fn live(&self) -> impl Iterator<Item = &'a AssessmentTask> + '_ {
        self.tasks
            .iter()
            .copied()
            .filter(|task| task.status() != TaskStatus::Canceled)
    }

    /// Highest seq among tasks that are not canceled, 0 when none
    pub fn max_live_seq(&self) -> u32 {
        self.live().map(|task| task.seq()).max().unwrap_or(0)
    }

    /// Whether the subject still follows the plan
    ///
    /// True while a task is pending or opened, or when nothing was canceled
    /// beyond the last live task. A terminated series fails both.
    pub fn is_following(&self) -> bool {
        let waiting = self
            .live()
            .any(|task| matches!(task.status(), TaskStatus::Pending | TaskStatus::Opened));
        let live_frontier = self.max_live_seq();

        waiting || (live_frontier > 0 && live_frontier == self.max_seq())
    }

    /// Anchor reconstructed from the most recently generated task
    pub fn inferred_anchor(&self, schedule: &Schedule) -> Option<DateTime<Utc>> {
        self.latest()
            .map(|task| schedule.infer_anchor(task.seq(), task.planned_at()))
    }

    /// Anchor reconstructed from the earliest task that is not canceled
    ///
    /// After a re-enrollment the live series may be anchored elsewhere than
    /// the canceled one it replaced.
    pub fn live_anchor(&self, schedule: &Schedule) -> Option<DateTime<Utc>> {
        self.live()
            .min_by_key(|task| task.seq())
            .map(|task| schedule.infer_anchor(task.seq(), task.planned_at()))
    }
}

/// Group the tasks of `plan_id` by subject, in first-seen order
pub fn group_by_subject(
    plan_id: PlanId,
    tasks: &[AssessmentTask],
) -> IndexMap<SubjectId, SubjectSeries<'_>> {
    let mut series: IndexMap<SubjectId, SubjectSeries<'_>> = IndexMap::new();

    for task in tasks.iter().filter(|task| task.plan_id() == plan_id) {
        series
            .entry(task.testee_id())
            .or_insert_with(|| SubjectSeries {
                testee_id: task.testee_id(),
                tasks: Vec::new(),
            })
            .tasks
            .push(task);
    }

    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{AssessmentId, OrgId, ScaleCode, TaskId};
    use crate::plan::task::TaskRecord;
    use crate::plan::schedule::start_of_day;
    use crate::plan::task_lifecycle::TaskLifecycle;
    use chrono::{NaiveDate, TimeDelta};

    fn task(plan_id: PlanId, testee: u64, seq: u32, planned_at: DateTime<Utc>) -> AssessmentTask {
        AssessmentTask::new(
            plan_id,
            seq,
            OrgId::new(1),
            SubjectId::new(testee),
            ScaleCode::new("PHQ-9"),
            planned_at,
        )
    }

    fn generated_at(
        plan_id: PlanId,
        seq: u32,
        planned_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
        status: TaskStatus,
    ) -> AssessmentTask {
        AssessmentTask::reconstitute(TaskRecord {
            id: TaskId::new(),
            plan_id,
            seq,
            org_id: OrgId::new(1),
            testee_id: SubjectId::new(1),
            scale_code: ScaleCode::new("PHQ-9"),
            planned_at,
            open_at: None,
            expire_at: None,
            completed_at: None,
            status,
            assessment_id: None,
            entry: None,
            created_at,
            version: 1,
        })
    }

    fn complete(task: &mut AssessmentTask) {
        let lifecycle = TaskLifecycle::new();
        lifecycle
            .open(task, "tok", "url", Utc::now() + TimeDelta::days(1))
            .unwrap();
        lifecycle.complete(task, AssessmentId::new(1)).unwrap();
    }

    #[test]
    fn test_group_by_subject_keeps_first_seen_order_and_plan() {
        let plan_id = PlanId::new();
        let now = Utc::now();
        let tasks = vec![
            task(plan_id, 7, 1, now),
            task(plan_id, 3, 1, now),
            task(PlanId::new(), 5, 1, now),
            task(plan_id, 7, 2, now),
        ];

        let groups = group_by_subject(plan_id, &tasks);

        assert_eq!(
            groups.keys().copied().collect::<Vec<_>>(),
            vec![SubjectId::new(7), SubjectId::new(3)]
        );
        assert_eq!(groups[&SubjectId::new(7)].tasks().len(), 2);
    }

    #[test]
    fn test_series_seq_statistics() {
        let plan_id = PlanId::new();
        let anchor = start_of_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let mut tasks = vec![
            task(plan_id, 1, 3, anchor + TimeDelta::days(28)),
            task(plan_id, 1, 2, anchor + TimeDelta::days(14)),
            task(plan_id, 1, 4, anchor + TimeDelta::days(42)),
        ];
        complete(&mut tasks[1]);
        complete(&mut tasks[0]);

        let groups = group_by_subject(plan_id, &tasks);
        let series = &groups[&SubjectId::new(1)];

        assert_eq!(series.first().map(|t| t.seq()), Some(2));
        assert_eq!(series.max_completed_seq(), 3);
        assert_eq!(series.max_seq(), 4);
        assert!(series.is_following());

        let schedule = Schedule::ByWeek {
            interval_weeks: 2,
            total_times: 5,
        };
        assert_eq!(series.inferred_anchor(&schedule), Some(anchor));
    }

    #[test]
    fn test_series_with_canceled_tail_is_not_following() {
        let plan_id = PlanId::new();
        let mut tasks = vec![task(plan_id, 1, 1, Utc::now())];
        TaskLifecycle::new().cancel(&mut tasks[0]);

        let groups = group_by_subject(plan_id, &tasks);
        assert!(!groups[&SubjectId::new(1)].is_following());
        assert_eq!(groups[&SubjectId::new(1)].max_completed_seq(), 0);
    }

    #[test]
    fn test_terminated_after_completions_is_not_following() {
        let plan_id = PlanId::new();
        let now = Utc::now();
        let mut tasks = vec![
            task(plan_id, 1, 1, now),
            task(plan_id, 1, 2, now + TimeDelta::days(7)),
            task(plan_id, 1, 3, now + TimeDelta::days(14)),
        ];
        complete(&mut tasks[0]);
        TaskLifecycle::new().cancel(&mut tasks[1]);
        TaskLifecycle::new().cancel(&mut tasks[2]);

        let groups = group_by_subject(plan_id, &tasks);
        let series = &groups[&SubjectId::new(1)];
        assert_eq!(series.max_live_seq(), 1);
        assert!(!series.is_following());
    }

    #[test]
    fn test_fully_completed_prefix_keeps_following() {
        let plan_id = PlanId::new();
        let mut tasks = vec![task(plan_id, 1, 1, Utc::now())];
        complete(&mut tasks[0]);

        let groups = group_by_subject(plan_id, &tasks);
        assert!(groups[&SubjectId::new(1)].is_following());
    }

    #[test]
    fn test_reenrolled_series_anchors_on_live_tasks() {
        let plan_id = PlanId::new();
        let old = start_of_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let new = start_of_day(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        let enrolled = old - TimeDelta::days(1);
        let reenrolled = new - TimeDelta::days(1);
        let tasks = vec![
            generated_at(plan_id, 1, old, enrolled, TaskStatus::Canceled),
            generated_at(plan_id, 2, old + TimeDelta::days(7), enrolled, TaskStatus::Canceled),
            generated_at(plan_id, 3, old + TimeDelta::days(14), enrolled, TaskStatus::Canceled),
            generated_at(plan_id, 1, new, reenrolled, TaskStatus::Pending),
        ];
        let schedule = Schedule::ByWeek {
            interval_weeks: 1,
            total_times: 3,
        };

        let groups = group_by_subject(plan_id, &tasks);
        let series = &groups[&SubjectId::new(1)];

        assert!(series.is_following());
        assert_eq!(series.max_live_seq(), 1);
        assert_eq!(series.live_anchor(&schedule), Some(new));
        assert_eq!(series.inferred_anchor(&schedule), Some(new));
    }

    #[test]
    fn test_paused_reenrollment_anchors_on_latest_series() {
        let plan_id = PlanId::new();
        let old = start_of_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let new = start_of_day(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        let schedule = Schedule::ByWeek {
            interval_weeks: 2,
            total_times: 2,
        };
        let mut tasks = Vec::new();
        for (anchor, created_at) in [(old, old), (new, new)] {
            for seq in 1..=2 {
                let planned_at = schedule.planned_at(anchor, seq).unwrap();
                tasks.push(generated_at(plan_id, seq, planned_at, created_at, TaskStatus::Canceled));
            }
        }
        tasks.reverse();

        let groups = group_by_subject(plan_id, &tasks);
        let series = &groups[&SubjectId::new(1)];

        assert_eq!(series.live_anchor(&schedule), None);
        assert_eq!(series.latest().map(|t| (t.seq(), t.planned_at())), Some((1, new)));
        assert_eq!(series.inferred_anchor(&schedule), Some(new));
    }
}
