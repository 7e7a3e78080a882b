//! Daily Aggregator: folds raw task/mood/habit/answer rows into one ordered
//! `DayRecord` per day that saw any activity. Days with zero contributing
//! rows are omitted, not zero-filled.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::source::{AnswerRecord, HabitDef, HabitEntry, MoodRecord, QuestionDef, TaskRecord};
use crate::time::{day_key, safe_num};

/// Canonical per-day statistics record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub day: NaiveDate,

    pub tasks_total: u32,
    pub tasks_done: u32,
    pub tasks_overdue_open: u32,
    pub tasks_spent_hours: f64,

    pub mood_present: bool,

    /// habit title -> any done entry that day
    pub habit_flags: BTreeMap<String, bool>,
    /// habit title -> accumulated numeric value (independent of the flag)
    pub habit_values: BTreeMap<String, f64>,
    /// question code -> mean of that day's integer answers
    pub answer_means: BTreeMap<String, f64>,
}

impl DayRecord {
    fn empty(day: NaiveDate) -> Self {
        Self {
            day,
            tasks_total: 0,
            tasks_done: 0,
            tasks_overdue_open: 0,
            tasks_spent_hours: 0.0,
            mood_present: false,
            habit_flags: BTreeMap::new(),
            habit_values: BTreeMap::new(),
            answer_means: BTreeMap::new(),
        }
    }

    pub fn habit_active(&self, habit: &str) -> bool {
        self.habit_flags.get(habit).copied().unwrap_or(false)
    }

    /// Completed fraction of the day's tasks; zero when nothing was scheduled.
    pub fn completion_ratio(&self) -> f64 {
        if self.tasks_total == 0 {
            0.0
        } else {
            self.tasks_done as f64 / self.tasks_total as f64
        }
    }
}

/// Raw rows handed to the aggregator in one batch.
#[derive(Debug, Clone, Default)]
pub struct RawRows {
    pub tasks: Vec<TaskRecord>,
    pub moods: Vec<MoodRecord>,
    pub habits: Vec<HabitDef>,
    pub habit_entries: Vec<HabitEntry>,
    pub questions: Vec<QuestionDef>,
    pub answers: Vec<AnswerRecord>,
}

/// Collapse raw rows into one ordered `DayRecord` per active day.
///
/// `eval_instant` fixes the "now" used for the overdue-open check so the
/// result is reproducible over unchanged rows.
pub fn aggregate_daily(rows: &RawRows, eval_instant: DateTime<Utc>) -> Vec<DayRecord> {
    let mut by_day: BTreeMap<NaiveDate, DayRecord> = BTreeMap::new();

    // Tasks bucket by the calendar date of their start instant.
    for t in &rows.tasks {
        let rec = by_day
            .entry(day_key(t.start_time))
            .or_insert_with(|| DayRecord::empty(day_key(t.start_time)));
        rec.tasks_total += 1;
        if t.completed {
            rec.tasks_done += 1;
        }
        rec.tasks_spent_hours += safe_num(Some(t.spent_hours), 0.0);
        if t.is_overdue_open(eval_instant) {
            rec.tasks_overdue_open += 1;
        }
    }

    // Moods mark presence only.
    for m in &rows.moods {
        by_day
            .entry(m.day)
            .or_insert_with(|| DayRecord::empty(m.day))
            .mood_present = true;
    }

    // Habit entries: flag ORs across the day's entries, value accumulates
    // regardless of the done indicator. Entries for unknown habit ids keep
    // the id as the name.
    let habit_title: HashMap<&str, &str> = rows
        .habits
        .iter()
        .map(|h| (h.id.as_str(), h.title.as_str()))
        .collect();

    for e in &rows.habit_entries {
        let name = habit_title
            .get(e.habit_id.as_str())
            .copied()
            .unwrap_or(e.habit_id.as_str())
            .to_string();
        let rec = by_day
            .entry(e.day)
            .or_insert_with(|| DayRecord::empty(e.day));
        if e.done {
            rec.habit_flags.insert(name.clone(), true);
        } else {
            rec.habit_flags.entry(name.clone()).or_insert(false);
        }
        *rec.habit_values.entry(name).or_insert(0.0) += safe_num(e.value, 0.0);
    }

    // Answers: group integer values by (day, code) and reduce to the mean.
    // Rows without an integer value are ignored here.
    let question_code: HashMap<&str, &str> = rows
        .questions
        .iter()
        .map(|q| (q.id.as_str(), q.code.as_str()))
        .collect();

    let mut collector: BTreeMap<(NaiveDate, String), Vec<f64>> = BTreeMap::new();
    for a in &rows.answers {
        let Some(code) = question_code.get(a.question_id.as_str()) else {
            continue;
        };
        let Some(v) = a.value_int else {
            continue;
        };
        collector
            .entry((a.day, code.to_string()))
            .or_default()
            .push(v as f64);
    }

    for ((day, code), values) in collector {
        if values.is_empty() {
            continue;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        by_day
            .entry(day)
            .or_insert_with(|| DayRecord::empty(day))
            .answer_means
            .insert(code, mean);
    }

    by_day.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    #[test]
    fn test_tasks_bucket_by_start_date() {
        let rows = RawRows {
            tasks: vec![
                TaskRecord::new("a", "one", at(3, 9)).completed(),
                TaskRecord::new("b", "two", at(3, 15)),
                TaskRecord::new("c", "three", at(5, 10)).completed(),
            ],
            ..Default::default()
        };

        let daily = aggregate_daily(&rows, at(10, 0));
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].day, d(3));
        assert_eq!(daily[0].tasks_total, 2);
        assert_eq!(daily[0].tasks_done, 1);
        assert_eq!(daily[1].tasks_total, 1);
        for r in &daily {
            assert!(r.tasks_done <= r.tasks_total);
        }
    }

    #[test]
    fn test_overdue_open_uses_eval_instant() {
        let rows = RawRows {
            tasks: vec![
                TaskRecord::new("a", "late", at(3, 9)).with_deadline(at(4, 0)),
                TaskRecord::new("b", "done late", at(3, 10))
                    .with_deadline(at(4, 0))
                    .completed(),
                TaskRecord::new("c", "not yet", at(3, 11)).with_deadline(at(20, 0)),
            ],
            ..Default::default()
        };

        let daily = aggregate_daily(&rows, at(10, 0));
        assert_eq!(daily[0].tasks_overdue_open, 1);
    }

    #[test]
    fn test_habit_flag_or_and_value_sum() {
        let rows = RawRows {
            habits: vec![HabitDef {
                id: "h1".to_string(),
                title: "run".to_string(),
            }],
            habit_entries: vec![
                HabitEntry { habit_id: "h1".to_string(), day: d(3), done: false, value: Some(1.0) },
                HabitEntry { habit_id: "h1".to_string(), day: d(3), done: true, value: Some(2.5) },
                HabitEntry { habit_id: "h1".to_string(), day: d(4), done: false, value: None },
            ],
            ..Default::default()
        };

        let daily = aggregate_daily(&rows, at(10, 0));
        assert_eq!(daily.len(), 2);
        assert!(daily[0].habit_active("run"));
        assert_eq!(daily[0].habit_values["run"], 3.5);
        assert!(!daily[1].habit_active("run"));
        assert_eq!(daily[1].habit_values["run"], 0.0);
    }

    #[test]
    fn test_answer_day_means_skip_non_numeric() {
        let rows = RawRows {
            questions: vec![QuestionDef {
                id: "q1".to_string(),
                code: "energy".to_string(),
                answer_type: "int".to_string(),
            }],
            answers: vec![
                AnswerRecord {
                    day: d(3),
                    question_id: "q1".to_string(),
                    value_int: Some(4),
                    value_bool: None,
                    value_text: None,
                },
                AnswerRecord {
                    day: d(3),
                    question_id: "q1".to_string(),
                    value_int: Some(2),
                    value_bool: None,
                    value_text: None,
                },
                AnswerRecord {
                    day: d(3),
                    question_id: "q1".to_string(),
                    value_int: None,
                    value_bool: Some(true),
                    value_text: None,
                },
                // unknown question id is dropped
                AnswerRecord {
                    day: d(3),
                    question_id: "q9".to_string(),
                    value_int: Some(5),
                    value_bool: None,
                    value_text: None,
                },
            ],
            ..Default::default()
        };

        let daily = aggregate_daily(&rows, at(10, 0));
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].answer_means["energy"], 3.0);
        assert_eq!(daily[0].answer_means.len(), 1);
    }

    #[test]
    fn test_mood_marks_presence_only() {
        let rows = RawRows {
            moods: vec![MoodRecord { day: d(7), token: "great".to_string() }],
            ..Default::default()
        };
        let daily = aggregate_daily(&rows, at(10, 0));
        assert_eq!(daily.len(), 1);
        assert!(daily[0].mood_present);
        assert_eq!(daily[0].tasks_total, 0);
    }

    #[test]
    fn test_days_are_sorted_and_unique() {
        let rows = RawRows {
            tasks: vec![
                TaskRecord::new("a", "x", at(9, 9)),
                TaskRecord::new("b", "y", at(2, 9)),
                TaskRecord::new("c", "z", at(2, 20)),
            ],
            ..Default::default()
        };
        let daily = aggregate_daily(&rows, at(10, 0));
        let days: Vec<_> = daily.iter().map(|r| r.day).collect();
        assert_eq!(days, vec![d(2), d(9)]);
    }
}
