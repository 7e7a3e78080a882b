//! Deterministic cleanup of journal tasks returned by a generation service.
//!
//! The structuring call itself lives in the CLI; this module owns only the
//! part that must not depend on model behavior: time normalization,
//! importance coercion, hour clamping, and dropping unusable rows.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use lifelens_core::ImportanceTier;

pub const HOURS_MIN: f64 = 0.25;
pub const HOURS_MAX: f64 = 24.0;
pub const HOURS_DEFAULT: f64 = 1.0;

/// "H:MM" / "HH:MM", also tolerating a dot separator ("9.30").
const TIME_PATTERN: &str = r"^\s*(\d{1,2})[:.](\d{2})\s*$";

/// One loosely-typed task as the generation service emitted it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJournalTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time: Option<String>,
    pub importance: Option<i64>,
    pub estimated_hours: Option<f64>,
}

/// A sanitized journal task, safe to show or persist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalTask {
    pub title: String,
    pub description: String,
    /// "HH:MM", or empty when the raw value was absent or unusable.
    pub time: String,
    pub importance: ImportanceTier,
    pub estimated_hours: f64,
}

/// Normalize a free-form time string to zero-padded "HH:MM". Out-of-range
/// components clamp into a valid wall-clock time; anything that does not
/// look like a time at all comes back empty.
pub fn normalize_time(raw: &str) -> Result<String> {
    let re = Regex::new(TIME_PATTERN)?;
    Ok(normalize_time_with(raw, &re))
}

fn normalize_time_with(raw: &str, re: &Regex) -> String {
    let Some(caps) = re.captures(raw) else {
        return String::new();
    };
    let hour: u32 = match caps[1].parse() {
        Ok(h) => h,
        Err(_) => return String::new(),
    };
    let minute: u32 = match caps[2].parse() {
        Ok(m) => m,
        Err(_) => return String::new(),
    };
    format!("{:02}:{:02}", hour.min(23), minute.min(59))
}

/// Journal rows default to Medium rather than Low: a journal entry the user
/// bothered to write down is rarely throwaway.
fn coerce_importance(raw: Option<i64>) -> ImportanceTier {
    match raw {
        Some(1) => ImportanceTier::Low,
        Some(3) => ImportanceTier::High,
        _ => ImportanceTier::Medium,
    }
}

fn coerce_hours(raw: Option<f64>) -> f64 {
    match raw {
        Some(h) if h.is_finite() => h.clamp(HOURS_MIN, HOURS_MAX),
        _ => HOURS_DEFAULT,
    }
}

/// Sanitize a batch of raw tasks. Rows with an empty title are dropped.
pub fn sanitize_tasks(raw: &[RawJournalTask]) -> Result<Vec<JournalTask>> {
    let re = Regex::new(TIME_PATTERN)?;
    let mut out = Vec::new();
    for r in raw {
        let title = r.title.as_deref().unwrap_or("").trim().to_string();
        if title.is_empty() {
            continue;
        }
        out.push(JournalTask {
            title,
            description: r.description.as_deref().unwrap_or("").trim().to_string(),
            time: normalize_time_with(r.time.as_deref().unwrap_or(""), &re),
            importance: coerce_importance(r.importance),
            estimated_hours: coerce_hours(r.estimated_hours),
        });
    }
    Ok(out)
}

/// Parse a generation payload and sanitize it. Accepts `{"tasks": [...]}`
/// or a bare array.
pub fn sanitize_json(payload: &str) -> Result<Vec<JournalTask>> {
    let value: serde_json::Value =
        serde_json::from_str(payload).context("journal payload is not valid JSON")?;
    let items = match &value {
        serde_json::Value::Array(items) => items.clone(),
        serde_json::Value::Object(map) => match map.get("tasks") {
            Some(serde_json::Value::Array(items)) => items.clone(),
            _ => anyhow::bail!("journal payload has no tasks array"),
        },
        _ => anyhow::bail!("journal payload has no tasks array"),
    };
    let raw: Vec<RawJournalTask> = items
        .into_iter()
        .map(serde_json::from_value)
        .collect::<std::result::Result<_, _>>()
        .context("journal task rows are malformed")?;
    sanitize_tasks(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_time_pads_and_accepts_dot() {
        assert_eq!(normalize_time("9:30").unwrap(), "09:30");
        assert_eq!(normalize_time("9.30").unwrap(), "09:30");
        assert_eq!(normalize_time(" 14:05 ").unwrap(), "14:05");
    }

    #[test]
    fn test_normalize_time_clamps_out_of_range_components() {
        assert_eq!(normalize_time("25:00").unwrap(), "23:00");
        assert_eq!(normalize_time("9:75").unwrap(), "09:59");
    }

    #[test]
    fn test_normalize_time_rejects_garbage() {
        assert_eq!(normalize_time("morning").unwrap(), "");
        assert_eq!(normalize_time("930").unwrap(), "");
        assert_eq!(normalize_time("").unwrap(), "");
    }

    #[test]
    fn test_sanitize_drops_empty_titles_and_defaults() {
        let raw = vec![
            RawJournalTask {
                title: Some("  call the bank  ".to_string()),
                time: Some("9.30".to_string()),
                importance: Some(7),
                estimated_hours: Some(100.0),
                ..Default::default()
            },
            RawJournalTask { title: Some("   ".to_string()), ..Default::default() },
            RawJournalTask::default(),
        ];
        let tasks = sanitize_tasks(&raw).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "call the bank");
        assert_eq!(tasks[0].time, "09:30");
        assert_eq!(tasks[0].importance, ImportanceTier::Medium);
        assert_eq!(tasks[0].estimated_hours, HOURS_MAX);
    }

    #[test]
    fn test_sanitize_hours_defaults_when_missing() {
        let raw = vec![RawJournalTask {
            title: Some("stretch".to_string()),
            estimated_hours: None,
            ..Default::default()
        }];
        let tasks = sanitize_tasks(&raw).unwrap();
        assert_eq!(tasks[0].estimated_hours, HOURS_DEFAULT);
    }

    #[test]
    fn test_sanitize_json_tolerates_wrapper_and_bare_array() {
        let wrapped = r#"{"tasks": [{"title": "a", "importance": 3}]}"#;
        let bare = r#"[{"title": "a", "importance": 3}]"#;
        for payload in [wrapped, bare] {
            let tasks = sanitize_json(payload).unwrap();
            assert_eq!(tasks.len(), 1);
            assert_eq!(tasks[0].importance, ImportanceTier::High);
        }
        assert!(sanitize_json(r#"{"nope": 1}"#).is_err());
    }
}
