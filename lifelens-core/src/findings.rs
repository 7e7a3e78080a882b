//! Rule-derived findings: deterministic statements built only from the
//! snapshot and stats. This is the survey-only output path; a generation
//! service may rephrase these but never invents new ones.

use serde::{Deserialize, Serialize};

use crate::effects::{EffectStatus, OutcomeMetric};
use crate::snapshot::{InsightSnapshot, Stats};
use crate::sufficiency::{BASIC_MIN_DAYS, CORRELATION_MIN_DAYS};

/// Hard cap on findings per request.
pub const MAX_FINDINGS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingKind {
    #[serde(rename = "goal")]
    Goal,
    #[serde(rename = "behavioral")]
    Behavioral,
    #[serde(rename = "emotional")]
    Emotional,
    #[serde(rename = "habit")]
    Habit,
    #[serde(rename = "risk")]
    Risk,
    #[serde(rename = "data_quality")]
    DataQuality,
}

impl FindingKind {
    pub fn label(&self) -> &'static str {
        match self {
            FindingKind::Goal => "goal",
            FindingKind::Behavioral => "behavioral",
            FindingKind::Emotional => "emotional",
            FindingKind::Habit => "habit",
            FindingKind::Risk => "risk",
            FindingKind::DataQuality => "data_quality",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactDirection {
    #[serde(rename = "positive")]
    Positive,
    #[serde(rename = "negative")]
    Negative,
    #[serde(rename = "mixed")]
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Impact {
    pub goal: String,
    pub direction: ImpactDirection,
    /// 0..1, scaled from effect size.
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<Impact>,
    pub evidence: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Build findings from facts alone. When the basic gate fails this
/// short-circuits to a single data-quality finding so nothing downstream
/// draws conclusions from noise.
pub fn rule_findings(snapshot: &InsightSnapshot, stats: &Stats) -> Vec<Finding> {
    let suff = &stats.sufficiency;
    let mut out = Vec::new();

    if !suff.basic_ok {
        out.push(Finding {
            kind: FindingKind::DataQuality,
            title: "Not enough data for meaningful analysis".to_string(),
            body: "Too few days with tasks in the selected period. No conclusions are drawn \
                   from this little data."
                .to_string(),
            impact: None,
            evidence: vec![
                format!("Days with tasks: {}", suff.days_with_tasks),
                format!(
                    "Recommended minimum: {BASIC_MIN_DAYS} days (basic findings), \
                     {CORRELATION_MIN_DAYS}+ days (comparisons)."
                ),
            ],
            suggestion: Some(
                "Track tasks daily for at least one to two weeks; comparisons also need days \
                 both with and without each habit."
                    .to_string(),
            ),
        });
        return out;
    }

    let t = &snapshot.tasks_overview;
    out.push(Finding {
        kind: FindingKind::Goal,
        title: "Task results for the period".to_string(),
        body: format!(
            "Completed {} of {} tasks ({:.0}% completion). {}",
            t.completed,
            t.total,
            t.completed_ratio * 100.0,
            if t.overdue_open > 0 {
                format!("{} overdue tasks are still open.", t.overdue_open)
            } else {
                "No overdue open tasks.".to_string()
            }
        ),
        impact: None,
        evidence: vec![
            format!("Tasks total: {}", t.total),
            format!("Completed: {}", t.completed),
            format!("Overdue open: {}", t.overdue_open),
            format!("Total spent hours: {:.1}", t.total_spent_hours),
        ],
        suggestion: None,
    });

    // Strongest computed habit effects on the raw completion count.
    let mut habit_ok: Vec<_> = stats
        .habit_effects
        .iter()
        .filter(|e| e.metric == OutcomeMetric::TasksDone)
        .filter_map(|e| e.status.computed().map(|dm| (e, dm)))
        .collect();
    habit_ok.sort_by(|a, b| {
        b.1.delta
            .abs()
            .partial_cmp(&a.1.delta.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for (e, dm) in habit_ok.into_iter().take(3) {
        let direction = if dm.delta >= 0.0 {
            ImpactDirection::Positive
        } else {
            ImpactDirection::Negative
        };
        out.push(Finding {
            kind: FindingKind::Habit,
            title: format!("Habit \"{}\" and task completion", e.habit),
            body: format!(
                "An association is observed: on days the habit is checked, the mean number of \
                 completed tasks is {} by {:.2}.",
                if dm.delta >= 0.0 { "higher" } else { "lower" },
                dm.delta.abs()
            ),
            impact: Some(Impact {
                goal: "productivity".to_string(),
                direction,
                strength: (dm.delta.abs() / 5.0).min(1.0),
            }),
            evidence: vec![
                format!("Mean tasks done with the habit: {:.2} (days: {})", dm.m1, dm.n1),
                format!("Mean tasks done without it: {:.2} (days: {})", dm.m0, dm.n0),
            ],
            suggestion: Some(
                "This is association, not causation. Keep observing alongside context \
                 (sleep, stress, load) for another two to three weeks."
                    .to_string(),
            ),
        });
    }

    // Top computed self-report correlations (already ranked by |r|).
    for e in stats
        .mental_effects
        .iter()
        .filter(|e| e.status.is_computed())
        .take(2)
    {
        let EffectStatus::Computed(c) = &e.status else {
            continue;
        };
        out.push(Finding {
            kind: FindingKind::Emotional,
            title: format!("Self-report \"{}\" and completed tasks", e.question),
            body: format!(
                "A statistical association exists: r={:.2} between \"{}\" and the number of \
                 completed tasks.",
                c.r, e.question
            ),
            impact: None,
            evidence: vec![
                format!("Observations (days with an answer): {}", c.n),
                "Metric: tasks_done".to_string(),
            ],
            suggestion: Some(
                "For a more reliable read, keep answering this question consistently over \
                 four or more weeks."
                    .to_string(),
            ),
        });
    }

    // Long-horizon goals can only be read indirectly through life-area
    // activity; say so rather than overclaim.
    let g = &snapshot.goals_overview;
    if g.total > 0 {
        out.push(Finding {
            kind: FindingKind::Goal,
            title: "Progress on long-horizon goals".to_string(),
            body: "Direct goal progress cannot be measured without an explicit task-to-goal \
                   link; only indirect activity by life area is visible."
                .to_string(),
            impact: None,
            evidence: vec![
                format!("Goals total: {}", g.total),
                format!("Goals completed: {}", g.completed),
                format!("By horizon: {:?}", g.by_horizon),
            ],
            suggestion: None,
        });
    }

    if !suff.correlation_ok {
        out.push(Finding {
            kind: FindingKind::DataQuality,
            title: "Too early for comparisons".to_string(),
            body: "Habit and self-report comparisons need more days of data, otherwise the \
                   result is noise."
                .to_string(),
            impact: None,
            evidence: vec![
                format!("Days with tasks: {}", suff.days_with_tasks),
                format!("Recommended minimum: {CORRELATION_MIN_DAYS} days (ideally 28+)."),
            ],
            suggestion: Some(
                "Fill in tasks and habits for two to four weeks so there are days both with \
                 and without each habit."
                    .to_string(),
            ),
        });
    }

    out.truncate(MAX_FINDINGS);
    out
}
