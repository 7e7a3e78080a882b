//! `lifelens journal`: send scanned journal text for structuring into tasks,
//! then run the deterministic sanitizer over whatever comes back.

use anyhow::{Context, Result};
use std::path::Path;

use lifelens_ingest::journal::sanitize_json;

use crate::config;
use crate::generate::{GenerationClient, extract_json};

const JOURNAL_SYSTEM: &str = "You turn free-form journal text into a task list. Return STRICT \
JSON: {\"tasks\": [...]} where each task has title, description, time (\"HH:MM\" or empty), \
importance (1-3), estimated_hours. Only extract what the text actually says; never invent \
tasks. No markdown.";

pub async fn run(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("read {}", file.display()))?;
    if text.trim().is_empty() {
        anyhow::bail!("journal file is empty: {}", file.display());
    }

    let cfg = config::load_config()?;
    let client = GenerationClient::from_config(&cfg)?;

    let raw = client.complete(JOURNAL_SYSTEM, &text).await?;
    let tasks = sanitize_json(extract_json(&raw))?;

    if tasks.is_empty() {
        println!("No usable tasks found in the journal text.");
        return Ok(());
    }

    println!("# Extracted tasks\n");
    for t in &tasks {
        let when = if t.time.is_empty() { "--:--" } else { &t.time };
        println!(
            "- {} | {} | importance {} | {:.2}h",
            when,
            t.title,
            u8::from(t.importance),
            t.estimated_hours
        );
        if !t.description.is_empty() {
            println!("  {}", t.description);
        }
    }
    Ok(())
}
