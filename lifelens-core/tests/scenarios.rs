//! End-to-end scenarios over the full pipeline: seeded source -> survey ->
//! effects, and candidate list -> allocation.

use std::collections::HashSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use lifelens_core::{
    AllocatorPolicy, CandidateItem, DateWindow, EffectStatus, HabitDef, HabitEntry,
    ImportanceTier, MemorySource, OutcomeMetric, Period, PlanHorizon, SubstringRule, TaskRecord,
    WorkloadDay, allocate, build_survey,
};

fn eval_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
}

/// Seed `days` of history; `done_by_day(i)` completed tasks out of `total`
/// per day; habit checked on days where `habit_on(i)`.
fn seeded(days: i64, total: u32, done_by_day: impl Fn(i64) -> u32, habit_on: impl Fn(i64) -> bool) -> MemorySource {
    let mut src = MemorySource::new();
    src.habits.push(HabitDef { id: "h1".to_string(), title: "morning run".to_string() });

    for i in 0..days {
        let start = eval_at() - Duration::days(i + 1);
        let done = done_by_day(i).min(total);
        for j in 0..total {
            let t = TaskRecord::new(format!("t{i}-{j}"), format!("row {i} {j}"), start);
            src.tasks.push(if j < done { t.completed() } else { t });
        }
        if habit_on(i) {
            src.habit_entries.push(HabitEntry {
                habit_id: "h1".to_string(),
                day: start.date_naive(),
                done: true,
                value: None,
            });
        }
    }
    src
}

/// Scenario A: 10 days with tasks, habit on 5 of them with completions
/// [4,5,4,5,4] vs [2,1,2,1,1]. Both partitions are >=3 but the 14-day
/// coverage gate still reports insufficient data.
#[test]
fn scenario_a_window_gate_beats_partition_sizes() {
    let on = [4u32, 5, 4, 5, 4];
    let off = [2u32, 1, 2, 1, 1];
    let src = seeded(
        10,
        6,
        |i| if i % 2 == 0 { on[(i / 2) as usize] } else { off[(i / 2) as usize] },
        |i| i % 2 == 0,
    );

    let (_, stats) = build_survey(&src, Period::Last30Days, eval_at()).unwrap();
    assert!(stats.sufficiency.basic_ok);
    assert!(!stats.sufficiency.correlation_ok);

    let effect = stats
        .habit_effects
        .iter()
        .find(|e| e.habit == "morning run" && e.metric == OutcomeMetric::TasksDone)
        .unwrap();
    match &effect.status {
        EffectStatus::Insufficient { reason } => assert!(reason.contains("14")),
        EffectStatus::Computed(_) => panic!("coverage gate must win"),
    }
}

/// Scenario B: 20 days, habit active 8 days at 5 done, inactive 12 at 3.
#[test]
fn scenario_b_exact_mean_difference() {
    let src = seeded(20, 6, |i| if i < 8 { 5 } else { 3 }, |i| i < 8);

    let (_, stats) = build_survey(&src, Period::Last30Days, eval_at()).unwrap();
    assert!(stats.sufficiency.correlation_ok);

    let effect = stats
        .habit_effects
        .iter()
        .find(|e| e.habit == "morning run" && e.metric == OutcomeMetric::TasksDone)
        .unwrap();
    let dm = effect.status.computed().expect("effect should compute");
    assert_eq!((dm.n1, dm.n0), (8, 12));
    assert!((dm.m1 - 5.0).abs() < 1e-12);
    assert!((dm.m0 - 3.0).abs() < 1e-12);
    assert!((dm.delta - 2.0).abs() < 1e-12);
}

fn candidate(title: &str, start: DateTime<Utc>, hours: f64) -> CandidateItem {
    CandidateItem {
        title: title.to_string(),
        description: String::new(),
        life_area: "general".to_string(),
        importance: ImportanceTier::Medium,
        start_time: start,
        planned_hours: hours,
        reason: String::new(),
    }
}

/// Scenario C: case/whitespace-insensitive exact duplicate is rejected.
#[test]
fn scenario_c_duplicate_title_rejected() {
    let day1 = eval_at() + Duration::days(1);
    let window = DateWindow::starting_at(eval_at(), 7);
    let candidates = vec![
        candidate("Write report", day1, 1.0),
        candidate("write   report", day1, 1.0),
    ];

    let allocation = allocate(
        &candidates,
        &[],
        &AllocatorPolicy::from_profile(PlanHorizon::Week, None),
        &HashSet::new(),
        window,
        &SubstringRule,
    );
    assert_eq!(allocation.accepted.len(), 1);
    assert_eq!(allocation.accepted[0].title, "Write report");
    assert_eq!(allocation.rejected.duplicate, 1);
}

/// Scenario D: 6h ceiling, 5h already scheduled; a 2h item is rejected and
/// a 0.5h item fits.
#[test]
fn scenario_d_capacity_ceiling() {
    let day1 = eval_at() + Duration::days(1);
    let window = DateWindow::starting_at(eval_at(), 7);
    let workload = vec![WorkloadDay {
        day: day1.date_naive(),
        existing_count: 2,
        existing_hours: 5.0,
    }];
    let candidates = vec![
        candidate("two hour deep work block", day1, 2.0),
        candidate("short follow-up call", day1, 0.5),
    ];

    let allocation = allocate(
        &candidates,
        &workload,
        &AllocatorPolicy::from_profile(PlanHorizon::Week, None),
        &HashSet::new(),
        window,
        &SubstringRule,
    );
    assert_eq!(allocation.accepted.len(), 1);
    assert_eq!(allocation.accepted[0].title, "short follow-up call");
    assert_eq!(allocation.rejected.over_capacity, 1);

    let day = &allocation.workload[&day1.date_naive()];
    assert!(day.existing_hours <= 6.0);
}
