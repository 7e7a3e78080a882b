//! Raw per-user record types and the read-only data access seam.
//!
//! The engine never talks to a store directly: each request receives a
//! `DataSource` and fetches fresh snapshots of the record sets it needs.
//! `MemorySource` is the plain-vector implementation used by the CLI (after
//! ingest) and by tests.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::time::DateWindow;

/// Ordinal importance tier for tasks and plan candidates (1 = lowest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ImportanceTier {
    Low,
    Medium,
    High,
}

impl ImportanceTier {
    /// Coerce a loosely-typed importance value; anything outside {1,2,3}
    /// becomes Low.
    pub fn coerce(n: i64) -> Self {
        match n {
            2 => ImportanceTier::Medium,
            3 => ImportanceTier::High,
            _ => ImportanceTier::Low,
        }
    }
}

impl From<ImportanceTier> for u8 {
    fn from(t: ImportanceTier) -> u8 {
        match t {
            ImportanceTier::Low => 1,
            ImportanceTier::Medium => 2,
            ImportanceTier::High => 3,
        }
    }
}

impl TryFrom<u8> for ImportanceTier {
    type Error = String;

    fn try_from(n: u8) -> std::result::Result<Self, Self::Error> {
        match n {
            1 => Ok(ImportanceTier::Low),
            2 => Ok(ImportanceTier::Medium),
            3 => Ok(ImportanceTier::High),
            other => Err(format!("importance out of range: {other}")),
        }
    }
}

/// A task-like row: completed or planned work with a start instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Life-area tag ("health", "career", ...); "general" when untagged.
    #[serde(default = "default_life_area")]
    pub life_area: String,
    pub importance: ImportanceTier,
    pub completed: bool,
    pub start_time: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    /// Hours actually spent; 0 when the user does not track it.
    #[serde(default)]
    pub spent_hours: f64,
}

pub fn default_life_area() -> String {
    "general".to_string()
}

impl TaskRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            life_area: default_life_area(),
            importance: ImportanceTier::Low,
            completed: false,
            start_time,
            deadline: None,
            spent_hours: 0.0,
        }
    }

    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_spent_hours(mut self, hours: f64) -> Self {
        self.spent_hours = hours;
        self
    }

    pub fn with_life_area(mut self, area: impl Into<String>) -> Self {
        self.life_area = area.into();
        self
    }

    pub fn with_importance(mut self, tier: ImportanceTier) -> Self {
        self.importance = tier;
        self
    }

    /// Open past its deadline as of `now`.
    pub fn is_overdue_open(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.deadline.map(|d| d < now).unwrap_or(false)
    }
}

/// Mood log row. Only presence matters to the aggregator; the token is kept
/// for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodRecord {
    pub day: NaiveDate,
    pub token: String,
}

/// Habit definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitDef {
    pub id: String,
    pub title: String,
}

/// One habit check-in. `done` drives the day's active flag; `value` is an
/// independent numeric accumulator (minutes, reps, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitEntry {
    pub habit_id: String,
    pub day: NaiveDate,
    pub done: bool,
    pub value: Option<f64>,
}

/// Self-report question definition. `code` is the signal identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDef {
    pub id: String,
    pub code: String,
    pub answer_type: String,
}

/// One self-report answer. Only `value_int` feeds the effect analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub day: NaiveDate,
    pub question_id: String,
    pub value_int: Option<i64>,
    pub value_bool: Option<bool>,
    pub value_text: Option<String>,
}

impl AnswerRecord {
    /// True when the row carries any usable value at all.
    pub fn has_value(&self) -> bool {
        self.value_int.is_some()
            || self.value_bool.is_some()
            || self
                .value_text
                .as_deref()
                .map(|t| !t.trim().is_empty())
                .unwrap_or(false)
    }
}

/// Long-horizon user goal. Planning anchor and overview material only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_life_area")]
    pub life_area: String,
    pub horizon: GoalHorizon,
    pub completed: bool,
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalHorizon {
    #[serde(rename = "tactical")]
    Tactical,
    #[serde(rename = "mid")]
    Mid,
    #[serde(rename = "long")]
    Long,
}

impl GoalHorizon {
    pub const ALL: [GoalHorizon; 3] = [GoalHorizon::Tactical, GoalHorizon::Mid, GoalHorizon::Long];

    pub fn label(&self) -> &'static str {
        match self {
            GoalHorizon::Tactical => "tactical",
            GoalHorizon::Mid => "mid",
            GoalHorizon::Long => "long",
        }
    }
}

/// Financial transaction. Feeds the snapshot overview only, never the
/// effect analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub at: DateTime<Utc>,
    pub kind: TransactionKind,
    pub amount: f64,
    #[serde(default = "default_life_area")]
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    #[serde(rename = "income")]
    Income,
    #[serde(rename = "expense")]
    Expense,
}

/// Capacity/preference hints read once per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub target_hours_per_day: Option<f64>,
    #[serde(default)]
    pub priorities: Vec<String>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            target_hours_per_day: None,
            priorities: Vec::new(),
        }
    }
}

/// Read-only access to one user's record sets. Every method returns a fresh
/// snapshot scoped to the given window; any error is fatal for the request.
pub trait DataSource {
    fn tasks(&self, window: DateWindow) -> Result<Vec<TaskRecord>>;
    fn moods(&self, window: DateWindow) -> Result<Vec<MoodRecord>>;
    fn habits(&self) -> Result<Vec<HabitDef>>;
    fn habit_entries(&self, window: DateWindow) -> Result<Vec<HabitEntry>>;
    fn questions(&self) -> Result<Vec<QuestionDef>>;
    fn answers(&self, window: DateWindow) -> Result<Vec<AnswerRecord>>;
    fn goals(&self) -> Result<Vec<GoalRecord>>;
    fn transactions(&self, window: DateWindow) -> Result<Vec<TransactionRecord>>;
    fn profile(&self) -> Result<UserProfile>;
}

/// In-memory `DataSource` over plain vectors.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub tasks: Vec<TaskRecord>,
    pub moods: Vec<MoodRecord>,
    pub habits: Vec<HabitDef>,
    pub habit_entries: Vec<HabitEntry>,
    pub questions: Vec<QuestionDef>,
    pub answers: Vec<AnswerRecord>,
    pub goals: Vec<GoalRecord>,
    pub transactions: Vec<TransactionRecord>,
    pub profile: UserProfile,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn day_in_window(day: NaiveDate, window: DateWindow) -> bool {
    day >= window.from_day() && day <= window.to_day()
}

impl DataSource for MemorySource {
    fn tasks(&self, window: DateWindow) -> Result<Vec<TaskRecord>> {
        Ok(self
            .tasks
            .iter()
            .filter(|t| window.contains(t.start_time))
            .cloned()
            .collect())
    }

    fn moods(&self, window: DateWindow) -> Result<Vec<MoodRecord>> {
        Ok(self
            .moods
            .iter()
            .filter(|m| day_in_window(m.day, window))
            .cloned()
            .collect())
    }

    fn habits(&self) -> Result<Vec<HabitDef>> {
        Ok(self.habits.clone())
    }

    fn habit_entries(&self, window: DateWindow) -> Result<Vec<HabitEntry>> {
        Ok(self
            .habit_entries
            .iter()
            .filter(|e| day_in_window(e.day, window))
            .cloned()
            .collect())
    }

    fn questions(&self) -> Result<Vec<QuestionDef>> {
        Ok(self.questions.clone())
    }

    fn answers(&self, window: DateWindow) -> Result<Vec<AnswerRecord>> {
        Ok(self
            .answers
            .iter()
            .filter(|a| day_in_window(a.day, window))
            .cloned()
            .collect())
    }

    fn goals(&self) -> Result<Vec<GoalRecord>> {
        Ok(self.goals.clone())
    }

    fn transactions(&self, window: DateWindow) -> Result<Vec<TransactionRecord>> {
        Ok(self
            .transactions
            .iter()
            .filter(|t| window.contains(t.at))
            .cloned()
            .collect())
    }

    fn profile(&self) -> Result<UserProfile> {
        Ok(self.profile.clone())
    }
}
