//! Insight snapshot: whole-window overview facts plus the per-day records
//! and effect statistics, assembled in one pass over a `DataSource`.
//!
//! A read failure anywhere aborts the whole request; there is no partial
//! snapshot.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::daily::{DayRecord, RawRows, aggregate_daily};
use crate::effects::{HabitEffect, MentalEffect, habit_effects, mental_effects};
use crate::source::{DataSource, GoalHorizon, TransactionKind};
use crate::sufficiency::{Sufficiency, assess};
use crate::time::{DateWindow, Period, safe_num};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasksOverview {
    pub total: usize,
    pub completed: usize,
    pub completed_ratio: f64,
    pub overdue_open: usize,
    pub total_spent_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalsOverview {
    pub total: usize,
    pub completed: usize,
    pub completed_ratio: f64,
    pub by_horizon: BTreeMap<String, usize>,
    pub by_life_area: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinanceOverview {
    pub income_total: f64,
    pub expense_total: f64,
    pub net: f64,
    pub by_category: BTreeMap<String, f64>,
}

/// Server-side facts for one analysis window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightSnapshot {
    pub period: Period,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub tasks_overview: TasksOverview,
    pub goals_overview: GoalsOverview,
    pub finance_overview: FinanceOverview,
    /// Kept for drill-down; the effect statistics live in `Stats`.
    pub daily: Vec<DayRecord>,
}

/// Derived statistics for one window: the gate verdict plus both effect
/// families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub sufficiency: Sufficiency,
    pub habit_effects: Vec<HabitEffect>,
    pub mental_effects: Vec<MentalEffect>,
}

/// Fetch, aggregate, gate, and analyze one user's window.
pub fn build_survey(
    source: &dyn DataSource,
    period: Period,
    eval_instant: DateTime<Utc>,
) -> Result<(InsightSnapshot, Stats)> {
    let window = DateWindow::ending_at(eval_instant, period);

    let tasks = source.tasks(window).context("fetch tasks")?;
    let moods = source.moods(window).context("fetch moods")?;
    let habits = source.habits().context("fetch habits")?;
    let habit_entries = source.habit_entries(window).context("fetch habit entries")?;
    let questions = source.questions().context("fetch questions")?;
    let answers = source.answers(window).context("fetch answers")?;
    let goals = source.goals().context("fetch goals")?;
    let transactions = source.transactions(window).context("fetch transactions")?;

    let tasks_overview = TasksOverview {
        total: tasks.len(),
        completed: tasks.iter().filter(|t| t.completed).count(),
        completed_ratio: ratio(tasks.iter().filter(|t| t.completed).count(), tasks.len()),
        overdue_open: tasks.iter().filter(|t| t.is_overdue_open(eval_instant)).count(),
        total_spent_hours: tasks.iter().map(|t| safe_num(Some(t.spent_hours), 0.0)).sum(),
    };

    let mut by_horizon: BTreeMap<String, usize> = GoalHorizon::ALL
        .iter()
        .map(|h| (h.label().to_string(), 0))
        .collect();
    let mut by_life_area: BTreeMap<String, usize> = BTreeMap::new();
    for g in &goals {
        *by_horizon.entry(g.horizon.label().to_string()).or_insert(0) += 1;
        *by_life_area.entry(g.life_area.clone()).or_insert(0) += 1;
    }
    let goals_overview = GoalsOverview {
        total: goals.len(),
        completed: goals.iter().filter(|g| g.completed).count(),
        completed_ratio: ratio(goals.iter().filter(|g| g.completed).count(), goals.len()),
        by_horizon,
        by_life_area,
    };

    let mut by_category: BTreeMap<String, f64> = BTreeMap::new();
    let mut income_total = 0.0;
    let mut expense_total = 0.0;
    for t in &transactions {
        let amount = safe_num(Some(t.amount), 0.0).abs();
        match t.kind {
            TransactionKind::Income => income_total += amount,
            TransactionKind::Expense => expense_total += amount,
        }
        *by_category.entry(t.category.clone()).or_insert(0.0) += amount;
    }
    let finance_overview = FinanceOverview {
        income_total,
        expense_total,
        net: income_total - expense_total,
        by_category,
    };

    let rows = RawRows {
        tasks,
        moods,
        habits: habits.clone(),
        habit_entries,
        questions,
        answers,
    };
    let daily = aggregate_daily(&rows, eval_instant);

    let sufficiency = assess(&daily, period.days());
    let habit_names: Vec<String> = habits.iter().map(|h| h.title.clone()).collect();
    let stats = Stats {
        habit_effects: habit_effects(&daily, &habit_names, &sufficiency),
        mental_effects: mental_effects(&daily, &sufficiency),
        sufficiency,
    };

    let snapshot = InsightSnapshot {
        period,
        date_from: window.from_day(),
        date_to: window.to_day(),
        tasks_overview,
        goals_overview,
        finance_overview,
        daily,
    };

    Ok((snapshot, stats))
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{
        GoalRecord, HabitDef, MemorySource, TaskRecord, TransactionRecord, UserProfile,
    };
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 20, 12, 0, 0).unwrap()
    }

    fn seeded() -> MemorySource {
        let mut src = MemorySource::new();
        for i in 0..10i64 {
            let start = now() - Duration::days(i + 1);
            let t = TaskRecord::new(format!("t{i}"), format!("task {i}"), start)
                .with_spent_hours(1.0);
            src.tasks.push(if i % 2 == 0 { t.completed() } else { t });
        }
        src.tasks.push(
            TaskRecord::new("late", "overdue one", now() - Duration::days(3))
                .with_deadline(now() - Duration::days(1)),
        );
        src.habits.push(HabitDef { id: "h1".into(), title: "run".into() });
        src.goals.push(GoalRecord {
            id: "g1".into(),
            title: "ship the thing".into(),
            description: String::new(),
            life_area: "career".into(),
            horizon: crate::source::GoalHorizon::Mid,
            completed: false,
            target_date: None,
        });
        src.transactions.push(TransactionRecord {
            at: now() - Duration::days(2),
            kind: TransactionKind::Income,
            amount: 1000.0,
            category: "salary".into(),
        });
        src.transactions.push(TransactionRecord {
            at: now() - Duration::days(2),
            kind: TransactionKind::Expense,
            amount: 400.0,
            category: "rent".into(),
        });
        src.profile = UserProfile::default();
        src
    }

    #[test]
    fn test_build_survey_overviews() {
        let src = seeded();
        let (snapshot, stats) = build_survey(&src, Period::Last30Days, now()).unwrap();

        assert_eq!(snapshot.tasks_overview.total, 11);
        assert_eq!(snapshot.tasks_overview.completed, 5);
        assert_eq!(snapshot.tasks_overview.overdue_open, 1);
        assert!((snapshot.tasks_overview.total_spent_hours - 10.0).abs() < 1e-9);

        assert_eq!(snapshot.goals_overview.total, 1);
        assert_eq!(snapshot.goals_overview.by_horizon["mid"], 1);
        assert_eq!(snapshot.goals_overview.by_life_area["career"], 1);

        assert!((snapshot.finance_overview.net - 600.0).abs() < 1e-9);
        assert_eq!(snapshot.finance_overview.by_category["rent"], 400.0);

        // 10 distinct task days (the overdue task shares a day).
        assert_eq!(stats.sufficiency.days_with_tasks, 10);
        assert!(stats.sufficiency.basic_ok);
        assert!(!stats.sufficiency.correlation_ok);
        // Known habit shows up even with zero entries, gated out.
        assert!(stats.habit_effects.iter().any(|e| e.habit == "run"));
    }

    #[test]
    fn test_survey_is_idempotent_over_unchanged_rows() {
        let src = seeded();
        let a = build_survey(&src, Period::Last30Days, now()).unwrap();
        let b = build_survey(&src, Period::Last30Days, now()).unwrap();
        assert_eq!(a.0, b.0);
        assert_eq!(a.1, b.1);
    }
}
