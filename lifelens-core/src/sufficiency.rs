//! Sufficiency Gate: decides whether the observed coverage supports
//! comparison/correlation statistics at all.

use serde::{Deserialize, Serialize};

use crate::daily::DayRecord;

/// Minimum days-with-tasks for basic overview findings.
pub const BASIC_MIN_DAYS: usize = 7;
/// Minimum days-with-tasks before any effect computation is allowed.
pub const CORRELATION_MIN_DAYS: usize = 14;

/// Coverage verdict for one request. Computed once, immutable afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sufficiency {
    pub period_days: i64,
    pub days_with_any_data: usize,
    pub days_with_tasks: usize,
    pub basic_ok: bool,
    pub correlation_ok: bool,
    pub notes: Vec<String>,
}

/// Pure function of the day sequence. Thresholds are fixed policy.
pub fn assess(daily: &[DayRecord], period_days: i64) -> Sufficiency {
    let days_with_tasks = daily.iter().filter(|d| d.tasks_total > 0).count();
    let basic_ok = days_with_tasks >= BASIC_MIN_DAYS;
    let correlation_ok = days_with_tasks >= CORRELATION_MIN_DAYS;

    let mut notes = Vec::new();
    if !basic_ok {
        notes.push(format!(
            "Not enough days with tasks for meaningful findings: {days_with_tasks} observed, \
             need at least {BASIC_MIN_DAYS} (ideally {CORRELATION_MIN_DAYS}+)."
        ));
    } else if !correlation_ok {
        notes.push(format!(
            "Comparisons and correlations need at least {CORRELATION_MIN_DAYS} days with tasks \
             ({days_with_tasks} observed)."
        ));
    }

    Sufficiency {
        period_days,
        days_with_any_data: daily.len(),
        days_with_tasks,
        basic_ok,
        correlation_ok,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(offset: i64, tasks_total: u32) -> DayRecord {
        DayRecord {
            day: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap() + chrono::Duration::days(offset),
            tasks_total,
            tasks_done: tasks_total.min(1),
            tasks_overdue_open: 0,
            tasks_spent_hours: 0.0,
            mood_present: tasks_total == 0,
            habit_flags: Default::default(),
            habit_values: Default::default(),
            answer_means: Default::default(),
        }
    }

    fn days(task_days: i64, idle_days: i64) -> Vec<DayRecord> {
        let mut out: Vec<DayRecord> = (0..task_days).map(|i| day(i, 2)).collect();
        out.extend((0..idle_days).map(|i| day(100 + i, 0)));
        out
    }

    #[test]
    fn test_basic_boundary_at_7() {
        assert!(!assess(&days(6, 0), 30).basic_ok);
        assert!(assess(&days(7, 0), 30).basic_ok);
    }

    #[test]
    fn test_correlation_boundary_at_14() {
        let s13 = assess(&days(13, 0), 30);
        assert!(s13.basic_ok);
        assert!(!s13.correlation_ok);
        assert!(assess(&days(14, 0), 30).correlation_ok);
    }

    #[test]
    fn test_idle_days_count_only_as_any_data() {
        let s = assess(&days(5, 4), 30);
        assert_eq!(s.days_with_tasks, 5);
        assert_eq!(s.days_with_any_data, 9);
        assert!(!s.basic_ok);
        assert!(!s.notes.is_empty());
    }
}
