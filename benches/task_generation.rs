// Copyright 2025 Cowboy AI, LLC.

use chrono::{NaiveDate, TimeDelta};
use cim_domain_assessment::{
    start_of_day, AssessmentPlan, OrgId, PlanEnrollment, PlanLifecycle, ScaleCode, Schedule,
    SubjectId, TaskGenerator,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashMap;

fn weekly_plan(total_times: u32) -> AssessmentPlan {
    AssessmentPlan::new(
        OrgId::new(1),
        ScaleCode::new("PHQ-9"),
        Schedule::ByWeek {
            interval_weeks: 2,
            total_times,
        },
    )
    .unwrap()
    .0
}

fn benchmark_generate(c: &mut Criterion) {
    let generator = TaskGenerator::new();
    let start = start_of_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

    let mut group = c.benchmark_group("generate");
    for total in [5u32, 25, 100] {
        let plan = weekly_plan(total);
        group.bench_with_input(BenchmarkId::from_parameter(total), &plan, |b, plan| {
            b.iter(|| generator.generate(black_box(plan), SubjectId::new(1), start).unwrap());
        });
    }
    group.finish();
}

fn benchmark_generate_until(c: &mut Criterion) {
    let generator = TaskGenerator::new();
    let start = start_of_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    let plan = weekly_plan(100);

    let mut group = c.benchmark_group("generate_until");
    for horizon_days in [30i64, 365, 1400] {
        let until = start + TimeDelta::days(horizon_days);
        group.bench_with_input(
            BenchmarkId::from_parameter(horizon_days),
            &until,
            |b, until| {
                b.iter(|| {
                    generator
                        .generate_until(&plan, SubjectId::new(1), start, black_box(*until))
                        .unwrap()
                });
            },
        );
    }
    group.finish();
}

fn benchmark_pause_resume(c: &mut Criterion) {
    let start = start_of_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    let plan = weekly_plan(50);
    let enrollment = PlanEnrollment::default();
    let lifecycle = PlanLifecycle::default();

    let mut tasks = Vec::new();
    for testee in 1..=200u64 {
        let enrolled = enrollment
            .enroll_testee(&plan, SubjectId::new(testee), Some(start), &tasks)
            .unwrap();
        tasks.extend(enrolled.value);
    }

    c.bench_function("pause_resume_200_subjects", |b| {
        b.iter(|| {
            let mut plan = plan.clone();
            let mut tasks = tasks.clone();
            lifecycle.pause(&mut plan, &mut tasks).unwrap();
            lifecycle
                .resume(&mut plan, black_box(&tasks), &HashMap::new())
                .unwrap()
        });
    });
}

criterion_group!(
    benches,
    benchmark_generate,
    benchmark_generate_until,
    benchmark_pause_resume
);
criterion_main!(benches);
