//! Load an exported data directory into the core record types.
//!
//! CSV files carry the high-volume sets (tasks, moods, habit check-ins,
//! answers, transactions); the small definitional sets (questions, goals,
//! profile) are JSON. Rows with an unusable key field are skipped; malformed
//! numeric cells fall back to a safe value instead of failing the load.
//!
//! Expected layout under the data directory:
//!   tasks.csv habit_entries.csv moods.csv habits.csv answers.csv
//!   transactions.csv questions.json goals.json profile.json
//! Every file is optional; a missing file just loads as empty.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use lifelens_core::{
    AnswerRecord, GoalRecord, HabitDef, HabitEntry, ImportanceTier, MemorySource, MoodRecord,
    QuestionDef, TaskRecord, TransactionKind, TransactionRecord, UserProfile,
};

fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_f64(raw: &str, fallback: f64) -> f64 {
    raw.trim().parse().unwrap_or(fallback)
}

#[derive(Debug, Deserialize)]
struct TaskRow {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    life_area: String,
    #[serde(default)]
    importance: String,
    #[serde(default)]
    completed: String,
    start_time: String,
    #[serde(default)]
    deadline: String,
    #[serde(default)]
    spent_hours: String,
}

/// Read tasks from CSV. Rows without a parseable start time are skipped.
pub fn read_tasks_csv(rdr: impl Read) -> Result<Vec<TaskRecord>> {
    let mut out = Vec::new();
    for row in csv::Reader::from_reader(rdr).deserialize() {
        let row: TaskRow = row.context("reading tasks row")?;
        if row.id.trim().is_empty() || row.title.trim().is_empty() {
            continue;
        }
        let Some(start_time) = parse_utc(&row.start_time) else {
            continue;
        };
        let life_area = row.life_area.trim();
        out.push(TaskRecord {
            id: row.id.trim().to_string(),
            title: row.title.trim().to_string(),
            description: row.description.trim().to_string(),
            life_area: if life_area.is_empty() { "general".to_string() } else { life_area.to_string() },
            importance: ImportanceTier::coerce(row.importance.trim().parse().unwrap_or(1)),
            completed: parse_bool(&row.completed),
            start_time,
            deadline: parse_utc(&row.deadline),
            spent_hours: parse_f64(&row.spent_hours, 0.0),
        });
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct MoodRow {
    day: String,
    #[serde(default)]
    token: String,
}

pub fn read_moods_csv(rdr: impl Read) -> Result<Vec<MoodRecord>> {
    let mut out = Vec::new();
    for row in csv::Reader::from_reader(rdr).deserialize() {
        let row: MoodRow = row.context("reading moods row")?;
        let Some(day) = parse_day(&row.day) else {
            continue;
        };
        out.push(MoodRecord { day, token: row.token.trim().to_string() });
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct HabitRow {
    id: String,
    title: String,
}

pub fn read_habits_csv(rdr: impl Read) -> Result<Vec<HabitDef>> {
    let mut out = Vec::new();
    for row in csv::Reader::from_reader(rdr).deserialize() {
        let row: HabitRow = row.context("reading habits row")?;
        if row.id.trim().is_empty() {
            continue;
        }
        out.push(HabitDef { id: row.id.trim().to_string(), title: row.title.trim().to_string() });
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct HabitEntryRow {
    habit_id: String,
    day: String,
    #[serde(default)]
    done: String,
    #[serde(default)]
    value: String,
}

pub fn read_habit_entries_csv(rdr: impl Read) -> Result<Vec<HabitEntry>> {
    let mut out = Vec::new();
    for row in csv::Reader::from_reader(rdr).deserialize() {
        let row: HabitEntryRow = row.context("reading habit entries row")?;
        let Some(day) = parse_day(&row.day) else {
            continue;
        };
        if row.habit_id.trim().is_empty() {
            continue;
        }
        let value = row.value.trim();
        out.push(HabitEntry {
            habit_id: row.habit_id.trim().to_string(),
            day,
            done: parse_bool(&row.done),
            value: if value.is_empty() { None } else { Some(parse_f64(value, 0.0)) },
        });
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct AnswerRow {
    day: String,
    question_id: String,
    #[serde(default)]
    value_int: String,
    #[serde(default)]
    value_bool: String,
    #[serde(default)]
    value_text: String,
}

pub fn read_answers_csv(rdr: impl Read) -> Result<Vec<AnswerRecord>> {
    let mut out = Vec::new();
    for row in csv::Reader::from_reader(rdr).deserialize() {
        let row: AnswerRow = row.context("reading answers row")?;
        let Some(day) = parse_day(&row.day) else {
            continue;
        };
        if row.question_id.trim().is_empty() {
            continue;
        }
        let text = row.value_text.trim();
        out.push(AnswerRecord {
            day,
            question_id: row.question_id.trim().to_string(),
            value_int: row.value_int.trim().parse().ok(),
            value_bool: {
                let b = row.value_bool.trim();
                if b.is_empty() { None } else { Some(parse_bool(b)) }
            },
            value_text: if text.is_empty() { None } else { Some(text.to_string()) },
        });
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct TransactionRow {
    at: String,
    kind: String,
    #[serde(default)]
    amount: String,
    #[serde(default)]
    category: String,
}

/// Read transactions from CSV. Rows with an unknown kind are skipped.
pub fn read_transactions_csv(rdr: impl Read) -> Result<Vec<TransactionRecord>> {
    let mut out = Vec::new();
    for row in csv::Reader::from_reader(rdr).deserialize() {
        let row: TransactionRow = row.context("reading transactions row")?;
        let Some(at) = parse_utc(&row.at) else {
            continue;
        };
        let kind = match row.kind.trim().to_lowercase().as_str() {
            "income" => TransactionKind::Income,
            "expense" => TransactionKind::Expense,
            _ => continue,
        };
        let category = row.category.trim();
        out.push(TransactionRecord {
            at,
            kind,
            amount: parse_f64(&row.amount, 0.0),
            category: if category.is_empty() { "general".to_string() } else { category.to_string() },
        });
    }
    Ok(out)
}

pub fn read_questions_json(rdr: impl Read) -> Result<Vec<QuestionDef>> {
    serde_json::from_reader(rdr).context("parsing questions JSON")
}

pub fn read_goals_json(rdr: impl Read) -> Result<Vec<GoalRecord>> {
    serde_json::from_reader(rdr).context("parsing goals JSON")
}

pub fn read_profile_json(rdr: impl Read) -> Result<UserProfile> {
    serde_json::from_reader(rdr).context("parsing profile JSON")
}

fn open_optional(dir: &Path, name: &str) -> Result<Option<File>> {
    let path = dir.join(name);
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
    Ok(Some(file))
}

/// Load a whole exported data directory into a `MemorySource`. Missing files
/// load as empty sets; a missing profile falls back to the default.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<MemorySource> {
    let dir = dir.as_ref();
    let mut src = MemorySource::new();

    if let Some(f) = open_optional(dir, "tasks.csv")? {
        src.tasks = read_tasks_csv(f).context("tasks.csv")?;
    }
    if let Some(f) = open_optional(dir, "moods.csv")? {
        src.moods = read_moods_csv(f).context("moods.csv")?;
    }
    if let Some(f) = open_optional(dir, "habits.csv")? {
        src.habits = read_habits_csv(f).context("habits.csv")?;
    }
    if let Some(f) = open_optional(dir, "habit_entries.csv")? {
        src.habit_entries = read_habit_entries_csv(f).context("habit_entries.csv")?;
    }
    if let Some(f) = open_optional(dir, "answers.csv")? {
        src.answers = read_answers_csv(f).context("answers.csv")?;
    }
    if let Some(f) = open_optional(dir, "transactions.csv")? {
        src.transactions = read_transactions_csv(f).context("transactions.csv")?;
    }
    if let Some(f) = open_optional(dir, "questions.json")? {
        src.questions = read_questions_json(f).context("questions.json")?;
    }
    if let Some(f) = open_optional(dir, "goals.json")? {
        src.goals = read_goals_json(f).context("goals.json")?;
    }
    if let Some(f) = open_optional(dir, "profile.json")? {
        src.profile = read_profile_json(f).context("profile.json")?;
    }

    Ok(src)
}
