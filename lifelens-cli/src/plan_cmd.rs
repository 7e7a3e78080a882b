//! `lifelens plan`: build the plan context, optionally request candidate
//! items from the generation service, and allocate them against capacity.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::path::Path;

use lifelens_core::{
    Allocation, AllocatorPolicy, PlanContext, PlanHorizon, PlanVerdict, SubstringRule, allocate,
    build_plan_context, sanitize_candidate,
};

use crate::config;
use crate::generate::{GenerationClient, parse_items};
use crate::{Mode, load_source};

const PLAN_SYSTEM: &str = "You suggest concrete tasks for the user's planning window, anchored \
to their active goals and respecting their existing workload. Return STRICT JSON: \
{\"items\": [...]} where each item has title, description, life_area, importance (1-3), \
start_time (RFC3339, inside the window), planned_hours, reason. Prefer the user's historically \
productive times of day. Never repeat a known title. No markdown.";

pub async fn run(data: &Path, horizon: &str, mode: Mode, json: bool) -> Result<()> {
    let src = load_source(data)?;
    let horizon = PlanHorizon::parse(horizon).unwrap_or(PlanHorizon::Week);
    let now = Utc::now();

    let ctx = build_plan_context(&src, horizon, now)?;

    match mode {
        Mode::RuleOnly => {
            // Context only: no generation call, no items.
            if json {
                let out = serde_json::json!({ "context": ctx, "accepted": [] });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print_context(&ctx);
                println!("\nNo items planned (rule-only mode).");
            }
            Ok(())
        }
        Mode::WithGeneration => {
            let cfg = config::load_config()?;
            let client = GenerationClient::from_config(&cfg)?;

            let prompt = plan_prompt(&ctx)?;
            let raw = client.complete(PLAN_SYSTEM, &prompt).await?;
            let candidates: Vec<_> = parse_items(&raw)?
                .iter()
                .filter_map(sanitize_candidate)
                .collect();

            let policy =
                AllocatorPolicy::from_profile(horizon, ctx.profile.target_hours_per_day);
            let seen: HashSet<String> = ctx.known_titles.iter().cloned().collect();
            let allocation = allocate(
                &candidates,
                &ctx.workload_by_day,
                &policy,
                &seen,
                ctx.window,
                &SubstringRule,
            );

            match allocation.verdict() {
                PlanVerdict::NoCandidates => {
                    bail!("generation returned no usable items; nothing to allocate")
                }
                PlanVerdict::AllFiltered => {
                    println!(
                        "All {} candidates were filtered out (out of window: {}, duplicate: {}, \
                         over capacity: {}). The existing schedule already fills the window.",
                        candidates.len(),
                        allocation.rejected.out_of_window,
                        allocation.rejected.duplicate,
                        allocation.rejected.over_capacity,
                    );
                    Ok(())
                }
                PlanVerdict::Planned => {
                    if json {
                        let out = serde_json::json!({
                            "context": ctx,
                            "accepted": allocation.accepted,
                            "rejected": allocation.rejected,
                        });
                        println!("{}", serde_json::to_string_pretty(&out)?);
                    } else {
                        print_plan(&ctx, &allocation);
                    }
                    Ok(())
                }
            }
        }
    }
}

/// Compact JSON view of the context for the generation request. Titles and
/// open tasks are truncated; the model does not need all 250.
fn plan_prompt(ctx: &PlanContext) -> Result<String> {
    let goals: Vec<_> = ctx
        .active_goals
        .iter()
        .map(|g| {
            serde_json::json!({
                "title": g.title,
                "life_area": g.life_area,
                "horizon": g.horizon.label(),
            })
        })
        .collect();
    let known: Vec<_> = ctx.known_titles.iter().rev().take(60).collect();

    let body = serde_json::json!({
        "window": {
            "from": ctx.window.from.to_rfc3339(),
            "to": ctx.window.to.to_rfc3339(),
            "horizon": ctx.horizon.label(),
        },
        "timezone": ctx.profile.timezone,
        "priorities": ctx.profile.priorities,
        "active_goals": goals,
        "existing_workload": ctx.workload_by_day,
        "time_preference": ctx.time_preference,
        "by_life_area": ctx.by_life_area,
        "habits_summary": ctx.habits_summary,
        "known_titles": known,
    });
    Ok(serde_json::to_string(&body)?)
}

fn print_context(ctx: &PlanContext) {
    println!(
        "# Plan context: {} ({} .. {})\n",
        ctx.horizon.label(),
        ctx.window.from_day(),
        ctx.window.to_day()
    );
    println!("Active goals:");
    for g in &ctx.active_goals {
        println!("  - [{}] {} ({})", g.horizon.label(), g.title, g.life_area);
    }
    println!("\nExisting workload:");
    for w in ctx.workload_by_day.iter().filter(|w| w.existing_count > 0) {
        println!("  {}: {} items, {:.1}h", w.day, w.existing_count, w.existing_hours);
    }
    if let Some(best) = ctx.time_preference.first().filter(|b| b.n > 0) {
        println!(
            "\nMost productive time of day: {} ({:.0}% completion over {} tasks)",
            best.bucket,
            best.completion_ratio * 100.0,
            best.n
        );
    }
}

/// Render an instant in the profile timezone; unknown zones fall back to UTC.
fn local_stamp(t: DateTime<Utc>, tz: &str) -> String {
    match tz.parse::<Tz>() {
        Ok(zone) => t.with_timezone(&zone).format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => t.format("%Y-%m-%d %H:%M").to_string(),
    }
}

fn print_plan(ctx: &PlanContext, allocation: &Allocation) {
    print_context(ctx);
    println!("\n## Planned items\n");
    for it in &allocation.accepted {
        println!(
            "- {} | {} | {:.1}h | {}",
            local_stamp(it.start_time, &ctx.profile.timezone),
            it.title,
            it.planned_hours,
            it.life_area
        );
        if !it.reason.is_empty() {
            println!("  ({})", it.reason);
        }
    }
    let r = &allocation.rejected;
    if r.total() > 0 {
        println!(
            "\nFiltered: {} out of window, {} duplicates, {} over capacity",
            r.out_of_window, r.duplicate, r.over_capacity
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_local_stamp_uses_profile_timezone() {
        // Feb is CST (UTC-6)
        let t = Utc.with_ymd_and_hms(2026, 2, 21, 5, 59, 0).unwrap();
        assert_eq!(local_stamp(t, "America/Chicago"), "2026-02-20 23:59");
        assert_eq!(local_stamp(t, "not-a-zone"), "2026-02-21 05:59");
        assert_eq!(local_stamp(t, "UTC"), "2026-02-21 05:59");
    }
}
