//! Time utilities: analysis periods, date windows, day bucketing.

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Analysis lookback period for the survey pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "last_7_days")]
    Last7Days,
    #[serde(rename = "last_30_days")]
    Last30Days,
    #[serde(rename = "last_90_days")]
    Last90Days,
}

impl Period {
    pub fn days(&self) -> i64 {
        match self {
            Period::Last7Days => 7,
            Period::Last30Days => 30,
            Period::Last90Days => 90,
        }
    }

    /// Parse a period label, falling back to the 30-day default.
    pub fn parse(s: &str) -> Period {
        match s.trim().to_lowercase().as_str() {
            "last_7_days" => Period::Last7Days,
            "last_90_days" => Period::Last90Days,
            _ => Period::Last30Days,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::Last7Days => "last_7_days",
            Period::Last30Days => "last_30_days",
            Period::Last90Days => "last_90_days",
        }
    }
}

/// Inclusive instant window for fetching and bucketing raw rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateWindow {
    pub fn ending_at(to: DateTime<Utc>, period: Period) -> Self {
        Self {
            from: to - Duration::days(period.days()),
            to,
        }
    }

    /// Forward-looking window of `days` starting at `from`.
    pub fn starting_at(from: DateTime<Utc>, days: i64) -> Self {
        Self {
            from,
            to: from + Duration::days(days),
        }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.from && t <= self.to
    }

    pub fn from_day(&self) -> NaiveDate {
        self.from.date_naive()
    }

    pub fn to_day(&self) -> NaiveDate {
        self.to.date_naive()
    }

    /// Every calendar day in the window, inclusive on both ends.
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut out = Vec::new();
        let mut d = self.from_day();
        let last = self.to_day();
        while d <= last {
            out.push(d);
            d += Duration::days(1);
        }
        out
    }
}

/// Calendar-date bucket of an instant. Aggregation granularity.
pub fn day_key(t: DateTime<Utc>) -> NaiveDate {
    t.date_naive()
}

/// Coarse time-of-day bucket used for completion-pattern stats.
pub fn time_bucket(t: DateTime<Utc>) -> &'static str {
    match t.hour() {
        5..=11 => "morning",
        12..=17 => "afternoon",
        18..=23 => "evening",
        _ => "night",
    }
}

/// Parse a local datetime like "2026-02-20 23:59" in an IANA tz like
/// "America/Chicago", returning UTC.
pub fn parse_local_to_utc(local: &str, tz: &str) -> Result<DateTime<Utc>> {
    let tz: Tz = tz
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))?;

    let ndt = NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M")
        .map_err(|e| anyhow::anyhow!("invalid local datetime '{local}': {e}"))?;

    let local_dt = tz
        .from_local_datetime(&ndt)
        .single()
        .ok_or_else(|| anyhow::anyhow!("ambiguous or invalid local time (DST?): {local} {tz}"))?;

    Ok(local_dt.with_timezone(&Utc))
}

/// Coerce a loosely-typed numeric field, falling back instead of erroring.
pub fn safe_num(raw: Option<f64>, fallback: f64) -> f64 {
    match raw {
        Some(x) if x.is_finite() => x,
        _ => fallback,
    }
}

pub fn clamp(n: f64, min: f64, max: f64) -> f64 {
    n.max(min).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_period_parse_defaults_to_30() {
        assert_eq!(Period::parse("last_7_days"), Period::Last7Days);
        assert_eq!(Period::parse("whatever"), Period::Last30Days);
        assert_eq!(Period::Last90Days.days(), 90);
    }

    #[test]
    fn test_window_days_inclusive() {
        let to = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let w = DateWindow::ending_at(to, Period::Last7Days);
        let days = w.days();
        assert_eq!(days.len(), 8); // 7 days back plus today
        assert_eq!(*days.last().unwrap(), to.date_naive());
    }

    #[test]
    fn test_time_bucket_edges() {
        let t = |h| Utc.with_ymd_and_hms(2026, 3, 10, h, 0, 0).unwrap();
        assert_eq!(time_bucket(t(5)), "morning");
        assert_eq!(time_bucket(t(11)), "morning");
        assert_eq!(time_bucket(t(12)), "afternoon");
        assert_eq!(time_bucket(t(18)), "evening");
        assert_eq!(time_bucket(t(2)), "night");
    }

    #[test]
    fn test_parse_chicago_local() {
        // Feb is CST (UTC-6)
        let utc = parse_local_to_utc("2026-02-20 23:59", "America/Chicago").unwrap();
        assert_eq!(utc.to_rfc3339(), "2026-02-21T05:59:00+00:00");
    }

    #[test]
    fn test_safe_num_rejects_non_finite() {
        assert_eq!(safe_num(Some(2.5), 0.0), 2.5);
        assert_eq!(safe_num(Some(f64::NAN), 0.0), 0.0);
        assert_eq!(safe_num(None, 1.0), 1.0);
    }
}
