//! Effect Analyzer: per-signal association effects against a daily outcome
//! metric. A habit is a binary predictor (mean-difference effect); a
//! self-report code is a continuous predictor (correlation effect).
//!
//! Every gate failure is reported as an explicit `insufficient_data` result
//! with the observed counts, never silently dropped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::daily::DayRecord;
use crate::sufficiency::{CORRELATION_MIN_DAYS, Sufficiency};

/// Minimum observations required in each partition of a mean-difference.
pub const MIN_GROUP_SIZE: usize = 3;
/// Minimum paired (signal, outcome) observations for a correlation.
pub const MIN_PAIRED_DAYS: usize = 7;
/// Correlation effects presented to the caller, ranked by |r|.
pub const TOP_EFFECTS: usize = 10;

/// Daily outcome metric — the dependent variable of every effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeMetric {
    #[serde(rename = "tasks_done")]
    TasksDone,
    #[serde(rename = "completion_ratio")]
    CompletionRatio,
}

impl OutcomeMetric {
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeMetric::TasksDone => "tasks_done",
            OutcomeMetric::CompletionRatio => "completion_ratio",
        }
    }

    pub fn series(&self, daily: &[DayRecord]) -> Vec<f64> {
        match self {
            OutcomeMetric::TasksDone => daily.iter().map(|d| d.tasks_done as f64).collect(),
            OutcomeMetric::CompletionRatio => daily.iter().map(|d| d.completion_ratio()).collect(),
        }
    }
}

/// Outcome of one effect computation: either a payload or a reason it could
/// not be computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum EffectStatus<T> {
    #[serde(rename = "ok")]
    Computed(T),
    #[serde(rename = "insufficient_data")]
    Insufficient { reason: String },
}

impl<T> EffectStatus<T> {
    pub fn is_computed(&self) -> bool {
        matches!(self, EffectStatus::Computed(_))
    }

    pub fn computed(&self) -> Option<&T> {
        match self {
            EffectStatus::Computed(v) => Some(v),
            EffectStatus::Insufficient { .. } => None,
        }
    }
}

/// Mean-difference payload: group-true vs group-false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanDiff {
    /// mean(group-true) - mean(group-false); sign is direction, magnitude
    /// is uninterpreted effect size.
    pub delta: f64,
    pub n1: usize,
    pub n0: usize,
    pub m1: f64,
    pub m0: f64,
}

/// Correlation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub r: f64,
    pub n: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitEffect {
    pub habit: String,
    pub metric: OutcomeMetric,
    #[serde(flatten)]
    pub status: EffectStatus<MeanDiff>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentalEffect {
    pub question: String,
    /// Fixed to tasks_done for correlation effects.
    pub metric: OutcomeMetric,
    #[serde(flatten)]
    pub status: EffectStatus<Correlation>,
}

pub fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        None
    } else {
        Some(xs.iter().sum::<f64>() / xs.len() as f64)
    }
}

/// Population standard deviation.
pub fn std_dev(xs: &[f64]) -> Option<f64> {
    let m = mean(xs)?;
    let var = xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / xs.len() as f64;
    Some(var.sqrt())
}

/// Pearson correlation with population moments. None when the series are
/// shorter than 3, mismatched, or either has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 3 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let sx = std_dev(x)?;
    let sy = std_dev(y)?;
    if sx == 0.0 || sy == 0.0 {
        return None;
    }
    let cov = x
        .iter()
        .zip(y)
        .map(|(a, b)| (a - mx) * (b - my))
        .sum::<f64>()
        / x.len() as f64;
    Some(cov / (sx * sy))
}

/// Partition `y` by `flag` and compare group means. None when either
/// partition has fewer than `MIN_GROUP_SIZE` observations.
pub fn diff_of_means(flag: &[bool], y: &[f64]) -> Option<MeanDiff> {
    if flag.len() != y.len() {
        return None;
    }
    let mut on = Vec::new();
    let mut off = Vec::new();
    for (f, v) in flag.iter().zip(y) {
        if *f {
            on.push(*v);
        } else {
            off.push(*v);
        }
    }
    if on.len() < MIN_GROUP_SIZE || off.len() < MIN_GROUP_SIZE {
        return None;
    }
    let m1 = mean(&on)?;
    let m0 = mean(&off)?;
    Some(MeanDiff {
        delta: m1 - m0,
        n1: on.len(),
        n0: off.len(),
        m1,
        m0,
    })
}

fn coverage_reason() -> String {
    format!("Comparisons need at least {CORRELATION_MIN_DAYS} days with tasks in the period.")
}

/// Mean-difference effect for every observed habit x outcome metric.
///
/// `known_habits` lets habits with zero entries in the window still show up
/// as insufficient-data rows, so the caller can explain their absence.
pub fn habit_effects(
    daily: &[DayRecord],
    known_habits: &[String],
    sufficiency: &Sufficiency,
) -> Vec<HabitEffect> {
    let mut names: BTreeSet<String> = known_habits.iter().cloned().collect();
    for d in daily {
        names.extend(d.habit_flags.keys().cloned());
    }

    let mut out = Vec::new();
    for habit in names {
        let flag: Vec<bool> = daily.iter().map(|d| d.habit_active(&habit)).collect();

        for metric in [OutcomeMetric::TasksDone, OutcomeMetric::CompletionRatio] {
            if !sufficiency.correlation_ok {
                out.push(HabitEffect {
                    habit: habit.clone(),
                    metric,
                    status: EffectStatus::Insufficient {
                        reason: coverage_reason(),
                    },
                });
                continue;
            }

            let y = metric.series(daily);
            let status = match diff_of_means(&flag, &y) {
                Some(dm) => EffectStatus::Computed(dm),
                None => {
                    let n1 = flag.iter().filter(|f| **f).count();
                    let n0 = flag.len() - n1;
                    EffectStatus::Insufficient {
                        reason: format!(
                            "Need at least {MIN_GROUP_SIZE} days with the habit and \
                             {MIN_GROUP_SIZE} without it (now: {n1} vs {n0})."
                        ),
                    }
                }
            };
            out.push(HabitEffect {
                habit: habit.clone(),
                metric,
                status,
            });
        }
    }
    out
}

/// Correlation effect for every self-report code observed in the window,
/// against the tasks-done outcome.
pub fn mental_effects(daily: &[DayRecord], sufficiency: &Sufficiency) -> Vec<MentalEffect> {
    let mut codes: BTreeSet<&str> = BTreeSet::new();
    for d in daily {
        codes.extend(d.answer_means.keys().map(String::as_str));
    }

    let mut out = Vec::new();
    for code in codes {
        if !sufficiency.correlation_ok {
            out.push(MentalEffect {
                question: code.to_string(),
                metric: OutcomeMetric::TasksDone,
                status: EffectStatus::Insufficient {
                    reason: coverage_reason(),
                },
            });
            continue;
        }

        // Paired series over days where the signal has a value.
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for d in daily {
            if let Some(x) = d.answer_means.get(code) {
                xs.push(*x);
                ys.push(d.tasks_done as f64);
            }
        }

        let status = if xs.len() < MIN_PAIRED_DAYS {
            EffectStatus::Insufficient {
                reason: format!(
                    "Not enough days with answers for this question \
                     (need {MIN_PAIRED_DAYS}+, now {}).",
                    xs.len()
                ),
            }
        } else {
            match pearson(&xs, &ys) {
                Some(r) => EffectStatus::Computed(Correlation { r, n: xs.len() }),
                None => EffectStatus::Insufficient {
                    reason: "Not enough variability in the data to compute a correlation."
                        .to_string(),
                },
            }
        };

        out.push(MentalEffect {
            question: code.to_string(),
            metric: OutcomeMetric::TasksDone,
            status,
        });
    }

    rank_mental_effects(out)
}

/// Rank by descending |r| (non-computable effects rank as zero) and keep the
/// top slice for presentation.
fn rank_mental_effects(mut effects: Vec<MentalEffect>) -> Vec<MentalEffect> {
    effects.sort_by(|a, b| {
        let ra = a.status.computed().map(|c| c.r.abs()).unwrap_or(0.0);
        let rb = b.status.computed().map(|c| c.r.abs()).unwrap_or(0.0);
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });
    effects.truncate(TOP_EFFECTS);
    effects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sufficiency::assess;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn day(offset: i64, done: u32, total: u32) -> DayRecord {
        DayRecord {
            day: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap() + chrono::Duration::days(offset),
            tasks_total: total,
            tasks_done: done,
            tasks_overdue_open: 0,
            tasks_spent_hours: 0.0,
            mood_present: false,
            habit_flags: BTreeMap::new(),
            habit_values: BTreeMap::new(),
            answer_means: BTreeMap::new(),
        }
    }

    fn with_habit(mut d: DayRecord, habit: &str, active: bool) -> DayRecord {
        d.habit_flags.insert(habit.to_string(), active);
        d
    }

    fn with_answer(mut d: DayRecord, code: &str, v: f64) -> DayRecord {
        d.answer_means.insert(code.to_string(), v);
        d
    }

    #[test]
    fn test_effect_status_json_shape() {
        let e = HabitEffect {
            habit: "run".to_string(),
            metric: OutcomeMetric::TasksDone,
            status: EffectStatus::Computed(MeanDiff { delta: 2.0, n1: 8, n0: 12, m1: 5.0, m0: 3.0 }),
        };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["status"], "ok");
        assert_eq!(v["metric"], "tasks_done");
        assert_eq!(v["delta"], 2.0);

        let e = MentalEffect {
            question: "energy".to_string(),
            metric: OutcomeMetric::TasksDone,
            status: EffectStatus::Insufficient { reason: "too sparse".to_string() },
        };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["status"], "insufficient_data");
        assert_eq!(v["reason"], "too sparse");
        assert!(v.get("r").is_none());
    }

    #[test]
    fn test_pearson_symmetric_and_bounded() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let y = vec![2.0, 1.0, 4.0, 3.0, 6.0, 5.0, 8.0];
        let rxy = pearson(&x, &y).unwrap();
        let ryx = pearson(&y, &x).unwrap();
        assert!((rxy - ryx).abs() < 1e-12);
        assert!(rxy > 0.8 && rxy <= 1.0);
    }

    #[test]
    fn test_pearson_zero_variance_is_none() {
        let x = vec![3.0; 10];
        let y = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(pearson(&x, &y), None);
        assert_eq!(pearson(&y, &x), None);
    }

    #[test]
    fn test_pearson_short_series_is_none() {
        assert_eq!(pearson(&[1.0, 2.0], &[2.0, 4.0]), None);
    }

    #[test]
    fn test_diff_of_means_group_minimum() {
        // 2 vs 10 must not compute.
        let flag: Vec<bool> = (0..12).map(|i| i < 2).collect();
        let y: Vec<f64> = (0..12).map(|i| i as f64).collect();
        assert_eq!(diff_of_means(&flag, &y), None);

        let flag: Vec<bool> = (0..12).map(|i| i < 3).collect();
        assert!(diff_of_means(&flag, &y).is_some());
    }

    #[test]
    fn test_habit_effect_gated_by_window_coverage() {
        // 10 days with tasks: partitions are big enough (5 vs 5) but the
        // 14-day coverage gate still wins.
        let daily: Vec<DayRecord> = (0..10)
            .map(|i| with_habit(day(i, if i % 2 == 0 { 4 } else { 2 }, 5), "run", i % 2 == 0))
            .collect();
        let suff = assess(&daily, 30);
        assert!(suff.basic_ok);
        assert!(!suff.correlation_ok);

        let effects = habit_effects(&daily, &[], &suff);
        assert!(!effects.is_empty());
        assert!(effects.iter().all(|e| !e.status.is_computed()));
    }

    #[test]
    fn test_habit_effect_computed_with_exact_means() {
        // 8 active days at 5 done, 12 inactive at 3 done.
        let daily: Vec<DayRecord> = (0..20)
            .map(|i| {
                let active = i < 8;
                with_habit(day(i, if active { 5 } else { 3 }, 6), "run", active)
            })
            .collect();
        let suff = assess(&daily, 30);
        assert!(suff.correlation_ok);

        let effects = habit_effects(&daily, &[], &suff);
        let e = effects
            .iter()
            .find(|e| e.metric == OutcomeMetric::TasksDone)
            .unwrap();
        let dm = e.status.computed().unwrap();
        assert_eq!(dm.n1, 8);
        assert_eq!(dm.n0, 12);
        assert!((dm.m1 - 5.0).abs() < 1e-12);
        assert!((dm.m0 - 3.0).abs() < 1e-12);
        assert!((dm.delta - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_habit_effect_reports_observed_counts() {
        // Enough window coverage, lopsided partitions: 2 vs 18.
        let daily: Vec<DayRecord> = (0..20)
            .map(|i| with_habit(day(i, 2, 4), "read", i < 2))
            .collect();
        let suff = assess(&daily, 30);
        let effects = habit_effects(&daily, &[], &suff);
        match &effects[0].status {
            EffectStatus::Insufficient { reason } => assert!(reason.contains("2 vs 18")),
            EffectStatus::Computed(_) => panic!("expected insufficient data"),
        }
    }

    #[test]
    fn test_known_habit_without_entries_still_reported() {
        let daily: Vec<DayRecord> = (0..20).map(|i| day(i, 1, 2)).collect();
        let suff = assess(&daily, 30);
        let effects = habit_effects(&daily, &["meditate".to_string()], &suff);
        assert!(effects.iter().any(|e| e.habit == "meditate"));
    }

    #[test]
    fn test_mental_effect_needs_seven_paired_days() {
        let daily: Vec<DayRecord> = (0..20)
            .map(|i| {
                let d = day(i, (i % 5) as u32, 5);
                if i < 6 { with_answer(d, "energy", i as f64) } else { d }
            })
            .collect();
        let suff = assess(&daily, 30);
        let effects = mental_effects(&daily, &suff);
        assert_eq!(effects.len(), 1);
        match &effects[0].status {
            EffectStatus::Insufficient { reason } => assert!(reason.contains("now 6")),
            EffectStatus::Computed(_) => panic!("expected insufficient data"),
        }
    }

    #[test]
    fn test_mental_effect_zero_variance_is_insufficient() {
        let daily: Vec<DayRecord> = (0..20)
            .map(|i| with_answer(day(i, (i % 4) as u32, 5), "calm", 3.0))
            .collect();
        let suff = assess(&daily, 30);
        let effects = mental_effects(&daily, &suff);
        assert!(!effects[0].status.is_computed());
    }

    #[test]
    fn test_mental_effects_ranked_by_abs_r() {
        let daily: Vec<DayRecord> = (0..20)
            .map(|i| {
                let d = day(i, i as u32 % 7, 7);
                let d = with_answer(d, "aligned", (i % 7) as f64); // strong +
                with_answer(d, "noisy", ((i * 7) % 5) as f64)
            })
            .collect();
        let suff = assess(&daily, 30);
        let effects = mental_effects(&daily, &suff);
        assert_eq!(effects[0].question, "aligned");
        let r0 = effects[0].status.computed().map(|c| c.r.abs()).unwrap_or(0.0);
        let r1 = effects[1].status.computed().map(|c| c.r.abs()).unwrap_or(0.0);
        assert!(r0 >= r1);
    }
}
