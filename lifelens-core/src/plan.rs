//! Plan Allocator: turns an unconstrained candidate list into a
//! capacity-respecting, duplicate-free accepted set.
//!
//! Candidates are processed strictly in list order (first-fit, no quality
//! re-sorting), so identical input and state always produce the same plan.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::source::ImportanceTier;
use crate::time::{DateWindow, clamp, day_key, safe_num};

/// Planning window length category. Controls total and per-day item caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanHorizon {
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "month")]
    Month,
}

impl PlanHorizon {
    pub fn days(&self) -> i64 {
        match self {
            PlanHorizon::Week => 7,
            PlanHorizon::Month => 30,
        }
    }

    pub fn max_items(&self) -> usize {
        match self {
            PlanHorizon::Week => 12,
            PlanHorizon::Month => 20,
        }
    }

    pub fn day_count_cap(&self) -> u32 {
        match self {
            PlanHorizon::Week => 4,
            PlanHorizon::Month => 5,
        }
    }

    pub fn parse(s: &str) -> Option<PlanHorizon> {
        match s.trim().to_lowercase().as_str() {
            "week" => Some(PlanHorizon::Week),
            "month" => Some(PlanHorizon::Month),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlanHorizon::Week => "week",
            PlanHorizon::Month => "month",
        }
    }
}

/// Existing commitment for one day of the planning window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadDay {
    pub day: NaiveDate,
    pub existing_count: u32,
    pub existing_hours: f64,
}

/// One externally produced suggested task. Never fabricated here; only
/// validated and filtered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub title: String,
    pub description: String,
    pub life_area: String,
    pub importance: ImportanceTier,
    pub start_time: DateTime<Utc>,
    pub planned_hours: f64,
    pub reason: String,
}

/// Loosely-typed candidate as the generation collaborator returns it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCandidate {
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub life_area: Option<String>,
    #[serde(default)]
    pub importance: Option<i64>,
    pub start_time: Option<String>,
    #[serde(default)]
    pub planned_hours: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Minimal normalization to protect downstream persistence: empty titles and
/// missing/unparseable start timestamps drop the candidate; importance is
/// coerced into its three tiers; planned hours clamp to 0..6.
pub fn sanitize_candidate(raw: &RawCandidate) -> Option<CandidateItem> {
    let title = raw.title.as_deref().unwrap_or("").trim().to_string();
    if title.is_empty() {
        return None;
    }

    let start_raw = raw.start_time.as_deref().unwrap_or("").trim();
    let start_time = DateTime::parse_from_rfc3339(start_raw)
        .ok()?
        .with_timezone(&Utc);

    let life_area = raw
        .life_area
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("general")
        .to_string();

    Some(CandidateItem {
        title,
        description: raw.description.as_deref().unwrap_or("").trim().to_string(),
        life_area,
        importance: ImportanceTier::coerce(raw.importance.unwrap_or(1)),
        start_time,
        planned_hours: clamp(safe_num(raw.planned_hours, 0.0), 0.0, 6.0),
        reason: raw.reason.as_deref().unwrap_or("").trim().to_string(),
    })
}

/// Trim, lowercase, collapse internal whitespace.
pub fn normalize_title(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Seam for near-duplicate detection, so the heuristic can be swapped
/// without touching the capacity logic.
pub trait DuplicateRule {
    fn is_duplicate(&self, title: &str, seen: &HashSet<String>) -> bool;
}

/// Cheap duplicate heuristic: exact normalized match, or substring overlap
/// against an existing title of at least `MIN_OVERLAP_LEN` characters.
///
/// Known imprecise: unrelated titles sharing a long substring over-reject,
/// and reworded duplicates slip through.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringRule;

pub const MIN_OVERLAP_LEN: usize = 10;

impl DuplicateRule for SubstringRule {
    fn is_duplicate(&self, title: &str, seen: &HashSet<String>) -> bool {
        let t = normalize_title(title);
        if t.is_empty() || seen.contains(&t) {
            return true;
        }
        seen.iter()
            .any(|e| e.len() >= MIN_OVERLAP_LEN && (t.contains(e.as_str()) || e.contains(&t)))
    }
}

/// Per-request allocation policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocatorPolicy {
    pub horizon: PlanHorizon,
    /// Hard per-day hours ceiling.
    pub hours_cap: f64,
}

/// Default ceiling when the profile carries no preference.
pub const DEFAULT_HOURS_CAP: f64 = 6.0;
pub const HOURS_CAP_MIN: f64 = 2.0;
pub const HOURS_CAP_MAX: f64 = 10.0;

impl AllocatorPolicy {
    /// Derive the hours ceiling from a profile preference, clamped into the
    /// configured range; absent or non-positive preferences use the default.
    pub fn from_profile(horizon: PlanHorizon, target_hours_per_day: Option<f64>) -> Self {
        let hours_cap = match target_hours_per_day {
            Some(h) if h.is_finite() && h > 0.0 => clamp(h, HOURS_CAP_MIN, HOURS_CAP_MAX),
            _ => DEFAULT_HOURS_CAP,
        };
        Self { horizon, hours_cap }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionCounts {
    pub out_of_window: usize,
    pub duplicate: usize,
    pub over_capacity: usize,
}

impl RejectionCounts {
    pub fn total(&self) -> usize {
        self.out_of_window + self.duplicate + self.over_capacity
    }
}

/// Distinguishes "nothing came in" from "everything was filtered out".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanVerdict {
    Planned,
    AllFiltered,
    NoCandidates,
}

/// Allocator result: the accepted subset plus the mutated workload map.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub accepted: Vec<CandidateItem>,
    pub workload: BTreeMap<NaiveDate, WorkloadDay>,
    pub rejected: RejectionCounts,
    had_candidates: bool,
}

impl Allocation {
    pub fn verdict(&self) -> PlanVerdict {
        if !self.had_candidates {
            PlanVerdict::NoCandidates
        } else if self.accepted.is_empty() {
            PlanVerdict::AllFiltered
        } else {
            PlanVerdict::Planned
        }
    }
}

/// Hours accounted per accepted item; a zero-hour candidate still occupies a
/// minimal slot.
pub const ITEM_HOURS_MIN: f64 = 0.25;
pub const ITEM_HOURS_MAX: f64 = 6.0;

/// First-fit allocation over the candidate list.
///
/// Rejections are silent filtering, not errors: out-of-window start, title
/// duplicate against `seen_titles` or earlier acceptances, or a day whose
/// count/hours budget the item would break. Accepted items immediately
/// mutate the workload map, so one pass cannot overbook a day.
pub fn allocate(
    candidates: &[CandidateItem],
    workload: &[WorkloadDay],
    policy: &AllocatorPolicy,
    seen_titles: &HashSet<String>,
    window: DateWindow,
    dup_rule: &dyn DuplicateRule,
) -> Allocation {
    let mut load: BTreeMap<NaiveDate, WorkloadDay> =
        workload.iter().map(|w| (w.day, w.clone())).collect();
    let mut seen: HashSet<String> = seen_titles.iter().map(|t| normalize_title(t)).collect();

    let mut accepted = Vec::new();
    let mut rejected = RejectionCounts::default();

    for it in candidates {
        if accepted.len() >= policy.horizon.max_items() {
            break;
        }

        if !window.contains(it.start_time) {
            rejected.out_of_window += 1;
            continue;
        }

        if dup_rule.is_duplicate(&it.title, &seen) {
            rejected.duplicate += 1;
            continue;
        }

        let day = day_key(it.start_time);
        let est = clamp(
            safe_num(Some(it.planned_hours), 1.0),
            ITEM_HOURS_MIN,
            ITEM_HOURS_MAX,
        );
        let rec = load.entry(day).or_insert_with(|| WorkloadDay {
            day,
            existing_count: 0,
            existing_hours: 0.0,
        });

        if rec.existing_count >= policy.horizon.day_count_cap()
            || rec.existing_hours + est > policy.hours_cap
        {
            rejected.over_capacity += 1;
            continue;
        }

        seen.insert(normalize_title(&it.title));
        rec.existing_count += 1;
        rec.existing_hours += est;
        accepted.push(it.clone());
    }

    Allocation {
        accepted,
        workload: load,
        rejected,
        had_candidates: !candidates.is_empty(),
    }
}
