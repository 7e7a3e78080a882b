//! `lifelens survey`: load a data directory, run the survey pipeline, and
//! print findings. Generation only ever rephrases the rule findings; the
//! numbers are computed here and stay authoritative.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use std::path::Path;

use lifelens_core::{
    EffectStatus, Finding, InsightSnapshot, Period, Stats, build_survey, rule_findings,
};

use crate::config;
use crate::generate::{GenerationClient, extract_json};
use crate::{Mode, load_source};

const POLISH_SYSTEM: &str = "You rewrite productivity findings to be clearer and warmer without \
changing their meaning. Return STRICT JSON: an array with the same length and order as the \
input; each element keeps its kind and evidence unchanged; only title, body, and suggestion may \
be reworded. Never invent numbers or new findings. No markdown.";

pub async fn run(data: &Path, period: &str, mode: Mode, json: bool) -> Result<()> {
    let src = load_source(data)?;
    let period = Period::parse(period);
    let now = Utc::now();

    let (snapshot, stats) = build_survey(&src, period, now)?;
    let mut findings = rule_findings(&snapshot, &stats);

    if mode == Mode::WithGeneration {
        match polish(&findings).await {
            Ok(polished) => findings = polished,
            Err(e) => eprintln!("generation polish failed ({e:#}); keeping rule findings"),
        }
    }

    if json {
        let out = serde_json::json!({
            "snapshot": snapshot,
            "stats": stats,
            "findings": findings,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_summary(&snapshot, &stats, &findings);
    }
    Ok(())
}

async fn polish(findings: &[Finding]) -> Result<Vec<Finding>> {
    let cfg = config::load_config()?;
    let client = GenerationClient::from_config(&cfg)?;

    let payload = serde_json::to_string(findings)?;
    let raw = client.complete(POLISH_SYSTEM, &payload).await?;
    let polished: Vec<Finding> =
        serde_json::from_str(extract_json(&raw)).context("polished findings are malformed")?;

    // Shape guard: rephrasing only, never a different set of findings.
    if polished.len() != findings.len()
        || polished.iter().zip(findings).any(|(p, f)| p.kind != f.kind)
    {
        bail!("polished findings changed shape");
    }
    Ok(polished)
}

fn print_summary(snapshot: &InsightSnapshot, stats: &Stats, findings: &[Finding]) {
    println!(
        "# Survey: {} ({} .. {})\n",
        snapshot.period.label(),
        snapshot.date_from,
        snapshot.date_to
    );

    let t = &snapshot.tasks_overview;
    println!(
        "Tasks: {}/{} completed ({:.0}%), {} overdue open, {:.1}h spent",
        t.completed,
        t.total,
        t.completed_ratio * 100.0,
        t.overdue_open,
        t.total_spent_hours
    );
    let f = &snapshot.finance_overview;
    if f.income_total > 0.0 || f.expense_total > 0.0 {
        println!(
            "Finance: +{:.2} / -{:.2} (net {:.2})",
            f.income_total, f.expense_total, f.net
        );
    }

    let s = &stats.sufficiency;
    println!(
        "Coverage: {} days with tasks of {} (basic: {}, comparisons: {})\n",
        s.days_with_tasks,
        s.period_days,
        if s.basic_ok { "ok" } else { "insufficient" },
        if s.correlation_ok { "ok" } else { "insufficient" },
    );

    let computed_habits = stats
        .habit_effects
        .iter()
        .filter(|e| e.status.is_computed())
        .count();
    let computed_mental = stats
        .mental_effects
        .iter()
        .filter(|e| e.status.is_computed())
        .count();
    println!(
        "Effects: {} habit comparisons computed, {} self-report correlations computed",
        computed_habits, computed_mental
    );
    for e in stats.mental_effects.iter().take(3) {
        if let EffectStatus::Computed(c) = &e.status {
            println!("  {} ~ {}: r={:.2} (n={})", e.question, e.metric.label(), c.r, c.n);
        }
    }

    println!("\n## Findings\n");
    for (i, f) in findings.iter().enumerate() {
        println!("{}. [{}] {}", i + 1, f.kind.label(), f.title);
        println!("   {}", f.body);
        for ev in &f.evidence {
            println!("   - {ev}");
        }
        if let Some(s) = &f.suggestion {
            println!("   => {s}");
        }
    }
}
