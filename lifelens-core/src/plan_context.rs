//! Plan context: the realism inputs the allocator and the generation
//! collaborator both consume — existing per-day workload in the planning
//! window, historical completion patterns, and recent titles for duplicate
//! avoidance.

use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::{PlanHorizon, WorkloadDay, normalize_title};
use crate::source::{DataSource, GoalRecord, ImportanceTier, TaskRecord, UserProfile};
use crate::time::{DateWindow, clamp, day_key, safe_num, time_bucket};

/// History lookback feeding completion patterns and duplicate titles.
const HISTORY_DAYS: i64 = 60;
/// Lookback for habit and self-report coverage summaries.
const SUMMARY_DAYS: i64 = 30;
/// Recent titles retained for duplicate avoidance.
const RECENT_TITLE_CAP: usize = 250;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketStat {
    pub bucket: String,
    pub completion_ratio: f64,
    pub n: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifeAreaStat {
    pub tasks_total: usize,
    pub completion_ratio: f64,
    pub spent_hours_sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitSummary {
    pub name: String,
    pub done_days: usize,
    pub value_sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerCoverage {
    pub code: String,
    pub days_with_answers: usize,
}

/// Everything the planner needs about one user, computed fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanContext {
    pub horizon: PlanHorizon,
    pub window: DateWindow,
    pub profile: UserProfile,
    pub active_goals: Vec<GoalRecord>,
    pub workload_by_day: Vec<WorkloadDay>,
    /// Normalized titles of recent and upcoming tasks.
    pub known_titles: Vec<String>,
    /// Time-of-day buckets sorted by historical completion ratio.
    pub time_preference: Vec<BucketStat>,
    pub by_life_area: BTreeMap<String, LifeAreaStat>,
    pub habits_summary: Vec<HabitSummary>,
    pub answer_coverage: Vec<AnswerCoverage>,
    /// Open tasks already scheduled inside the window.
    pub upcoming_open: Vec<TaskRecord>,
}

/// Hours a task is expected to occupy: tracked spent time when present,
/// otherwise an importance-tier estimate.
pub fn estimate_hours(task: &TaskRecord) -> f64 {
    let spent = safe_num(Some(task.spent_hours), 0.0);
    let est = if spent > 0.0 {
        spent
    } else {
        match task.importance {
            ImportanceTier::High => 1.5,
            ImportanceTier::Medium => 1.0,
            ImportanceTier::Low => 0.5,
        }
    };
    clamp(est, 0.0, 6.0)
}

/// Build the plan context. Planning without at least one active long-horizon
/// goal is refused — there is nothing to anchor suggestions to.
pub fn build_plan_context(
    source: &dyn DataSource,
    horizon: PlanHorizon,
    now: DateTime<Utc>,
) -> Result<PlanContext> {
    let profile = source.profile().context("fetch profile")?;

    let goals = source.goals().context("fetch goals")?;
    let active_goals: Vec<GoalRecord> = goals.into_iter().filter(|g| !g.completed).collect();
    if active_goals.is_empty() {
        bail!("no active goals; nothing to anchor a plan to");
    }

    let window = DateWindow::starting_at(now, horizon.days());
    let fetch_window = DateWindow {
        from: now - Duration::days(HISTORY_DAYS),
        to: window.to,
    };
    let summary_window = DateWindow {
        from: now - Duration::days(SUMMARY_DAYS),
        to: now,
    };

    let mut all_tasks = source.tasks(fetch_window).context("fetch tasks")?;
    all_tasks.sort_by_key(|t| t.start_time);

    let (history, upcoming): (Vec<_>, Vec<_>) =
        all_tasks.iter().cloned().partition(|t| t.start_time < now);

    // Existing load per window day, open upcoming tasks only.
    let mut load: BTreeMap<chrono::NaiveDate, WorkloadDay> = window
        .days()
        .into_iter()
        .map(|day| {
            (day, WorkloadDay { day, existing_count: 0, existing_hours: 0.0 })
        })
        .collect();
    for t in upcoming.iter().filter(|t| !t.completed) {
        if let Some(rec) = load.get_mut(&day_key(t.start_time)) {
            rec.existing_count += 1;
            rec.existing_hours += estimate_hours(t);
        }
    }

    // Completion patterns by time of day.
    let mut bucket_total: BTreeMap<&str, usize> = BTreeMap::new();
    let mut bucket_done: BTreeMap<&str, usize> = BTreeMap::new();
    for b in ["morning", "afternoon", "evening", "night"] {
        bucket_total.insert(b, 0);
        bucket_done.insert(b, 0);
    }
    let mut by_area: BTreeMap<String, (usize, usize, f64)> = BTreeMap::new();
    for t in &history {
        let b = time_bucket(t.start_time);
        *bucket_total.get_mut(b).unwrap() += 1;
        if t.completed {
            *bucket_done.get_mut(b).unwrap() += 1;
        }
        let entry = by_area.entry(t.life_area.clone()).or_insert((0, 0, 0.0));
        entry.0 += 1;
        if t.completed {
            entry.1 += 1;
        }
        entry.2 += safe_num(Some(t.spent_hours), 0.0);
    }

    let mut time_preference: Vec<BucketStat> = bucket_total
        .iter()
        .map(|(bucket, total)| BucketStat {
            bucket: bucket.to_string(),
            completion_ratio: if *total > 0 {
                bucket_done[bucket] as f64 / *total as f64
            } else {
                0.0
            },
            n: *total,
        })
        .collect();
    time_preference.sort_by(|a, b| {
        b.completion_ratio
            .partial_cmp(&a.completion_ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let by_life_area: BTreeMap<String, LifeAreaStat> = by_area
        .into_iter()
        .map(|(area, (total, done, hours))| {
            (
                area,
                LifeAreaStat {
                    tasks_total: total,
                    completion_ratio: if total > 0 { done as f64 / total as f64 } else { 0.0 },
                    spent_hours_sum: hours,
                },
            )
        })
        .collect();

    // Recent titles, normalized and deduplicated, most recent last.
    let mut known_titles = Vec::new();
    let mut seen = HashSet::new();
    let skip = all_tasks.len().saturating_sub(RECENT_TITLE_CAP);
    for t in all_tasks.iter().skip(skip) {
        let nt = normalize_title(&t.title);
        if !nt.is_empty() && seen.insert(nt.clone()) {
            known_titles.push(nt);
        }
    }

    // Habit activity summary over the short lookback.
    let habits = source.habits().context("fetch habits")?;
    let entries = source
        .habit_entries(summary_window)
        .context("fetch habit entries")?;
    let title_by_id: BTreeMap<&str, &str> = habits
        .iter()
        .map(|h| (h.id.as_str(), h.title.as_str()))
        .collect();
    let mut done_days: BTreeMap<String, HashSet<chrono::NaiveDate>> = BTreeMap::new();
    let mut value_sum: BTreeMap<String, f64> = BTreeMap::new();
    for e in &entries {
        let name = title_by_id
            .get(e.habit_id.as_str())
            .copied()
            .unwrap_or(e.habit_id.as_str())
            .to_string();
        if e.done {
            done_days.entry(name.clone()).or_default().insert(e.day);
        }
        *value_sum.entry(name).or_insert(0.0) += safe_num(e.value, 0.0);
    }
    let habits_summary: Vec<HabitSummary> = habits
        .iter()
        .map(|h| HabitSummary {
            name: h.title.clone(),
            done_days: done_days.get(&h.title).map(HashSet::len).unwrap_or(0),
            value_sum: value_sum.get(&h.title).copied().unwrap_or(0.0),
        })
        .collect();

    // Answer coverage per question code.
    let questions = source.questions().context("fetch questions")?;
    let answers = source.answers(summary_window).context("fetch answers")?;
    let code_by_id: BTreeMap<&str, &str> = questions
        .iter()
        .map(|q| (q.id.as_str(), q.code.as_str()))
        .collect();
    let mut coverage: BTreeMap<String, HashSet<chrono::NaiveDate>> = BTreeMap::new();
    for a in &answers {
        if !a.has_value() {
            continue;
        }
        let Some(code) = code_by_id.get(a.question_id.as_str()) else {
            continue;
        };
        coverage.entry(code.to_string()).or_default().insert(a.day);
    }
    let answer_coverage: Vec<AnswerCoverage> = coverage
        .into_iter()
        .map(|(code, days)| AnswerCoverage { code, days_with_answers: days.len() })
        .collect();

    let upcoming_open: Vec<TaskRecord> =
        upcoming.into_iter().filter(|t| !t.completed).collect();

    Ok(PlanContext {
        horizon,
        window,
        profile,
        active_goals,
        workload_by_day: load.into_values().collect(),
        known_titles,
        time_preference,
        by_life_area,
        habits_summary,
        answer_coverage,
        upcoming_open,
    })
}
