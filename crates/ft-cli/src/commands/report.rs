//! Weekly browsing report.
//!
//! Covers the past seven days including today, in local time. Sessions count
//! toward the day their `closeTime` falls on. The same data backs `ft report`,
//! the collector's `GET /` page and its `GET /browser_data` JSON.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use ft_db::{Database, SessionRecord, SiteUsage};
use serde::Serialize;

/// Days covered by the report, today included.
pub const REPORT_DAYS: i64 = 7;

/// Sites listed in the text report.
const TOP_SITES: usize = 10;

/// Focus time on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayUsage {
    pub date: NaiveDate,
    pub total_ms: i64,
}

/// Aggregated usage for the report window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyUsage {
    /// One entry per day, oldest first.
    pub days: Vec<DayUsage>,
    /// Most used first.
    pub sites: Vec<SiteUsage>,
    pub session_count: usize,
}

impl WeeklyUsage {
    /// Sum of the daily totals, saturating at `i64::MAX`.
    pub fn total_ms(&self) -> i64 {
        self.days
            .iter()
            .fold(0_i64, |acc, d| acc.saturating_add(d.total_ms))
    }
}

// ========== Period Calculation ==========

/// Converts a date at local midnight in `tz` to UTC.
/// Handles DST ambiguity by picking the earlier time.
fn midnight_to_utc<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    // DST spring-forward gap at midnight is rare but possible; 1am always exists
    let one_am = date.and_time(NaiveTime::from_hms_opt(1, 0, 0).unwrap_or(NaiveTime::MIN));
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&one_am).earliest())
        .map_or_else(|| midnight.and_utc(), |dt| dt.with_timezone(&Utc))
}

/// Half-open report window: six days before `today` at midnight up to the
/// midnight after `today`.
pub fn week_window<Tz: TimeZone>(today: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let first = today - Duration::days(REPORT_DAYS - 1);
    let after = today + Duration::days(1);
    (midnight_to_utc(first, tz), midnight_to_utc(after, tz))
}

// ========== Aggregation ==========

/// Buckets sessions into per-day totals for the week ending `today`.
///
/// Sessions closing outside the window are ignored.
pub fn summarize<Tz: TimeZone>(
    sessions: &[SessionRecord],
    sites: Vec<SiteUsage>,
    today: NaiveDate,
    tz: &Tz,
) -> WeeklyUsage {
    let first = today - Duration::days(REPORT_DAYS - 1);
    let mut days: Vec<DayUsage> = (0..REPORT_DAYS)
        .map(|offset| DayUsage {
            date: first + Duration::days(offset),
            total_ms: 0,
        })
        .collect();

    let mut session_count = 0;
    for session in sessions {
        let Some(closed) = DateTime::from_timestamp_millis(session.close_time) else {
            continue;
        };
        let date = closed.with_timezone(tz).date_naive();
        let Ok(index) = usize::try_from((date - first).num_days()) else {
            continue;
        };
        if let Some(day) = days.get_mut(index) {
            day.total_ms = day.total_ms.saturating_add(session.active_duration);
            session_count += 1;
        }
    }

    WeeklyUsage {
        days,
        sites,
        session_count,
    }
}

/// Loads the week ending `today` from the database.
pub fn load_weekly_usage<Tz: TimeZone>(
    db: &Database,
    today: NaiveDate,
    tz: &Tz,
) -> Result<WeeklyUsage> {
    let (start, end) = week_window(today, tz);
    let (start_ms, end_ms) = (start.timestamp_millis(), end.timestamp_millis());
    let sessions = db.sessions_closed_between(start_ms, end_ms)?;
    let sites = db.site_usage_between(start_ms, end_ms)?;
    Ok(summarize(&sessions, sites, today, tz))
}

// ========== Formatting ==========

/// Formats milliseconds as duration string.
/// Returns "Xh Ym" if >= 1 hour, "Xm" if < 1 hour.
/// Negative durations are treated as 0m.
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return "0m".to_string();
    }
    let total_minutes = ms / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Generates a 10-character progress bar.
/// Values <5% of max get a single block for visibility.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn progress_bar(value: i64, max: i64) -> String {
    if max <= 0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value as f64 / max as f64;
    let filled = if ratio < 0.05 && value > 0 {
        1
    } else {
        (ratio * 10.0).round().clamp(0.0, 10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

/// Milliseconds to minutes, rounded to two decimals.
#[allow(clippy::cast_precision_loss)]
pub fn to_minutes(ms: i64) -> f64 {
    (ms as f64 / 60_000.0 * 100.0).round() / 100.0
}

fn day_label(date: NaiveDate) -> String {
    date.format("%a %d %b").to_string()
}

/// Formats the human-readable report.
pub fn format_report(usage: &WeeklyUsage) -> String {
    let mut output = String::new();

    let (first, last) = match (usage.days.first(), usage.days.last()) {
        (Some(first), Some(last)) => (first.date, last.date),
        _ => return output,
    };
    writeln!(
        output,
        "BROWSING REPORT: {} - {}",
        day_label(first),
        day_label(last)
    )
    .unwrap();

    if usage.session_count == 0 {
        writeln!(output).unwrap();
        writeln!(output, "No browsing recorded this week.").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "Hint: Run 'ft status' to check the collector.").unwrap();
        return output;
    }

    writeln!(output).unwrap();
    writeln!(output, "DAILY").unwrap();
    writeln!(output, "─────").unwrap();
    let busiest = usage.days.iter().map(|d| d.total_ms).max().unwrap_or(0);
    for day in &usage.days {
        let duration = format_duration(day.total_ms);
        let bar = progress_bar(day.total_ms, busiest);
        writeln!(output, "{}  {duration:>7}  {bar}", day_label(day.date)).unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "TOP SITES").unwrap();
    writeln!(output, "─────────").unwrap();
    for (rank, site) in usage.sites.iter().take(TOP_SITES).enumerate() {
        let duration = format_duration(site.total_ms);
        let name = if site.site.is_empty() {
            "(no host)"
        } else {
            site.site.as_str()
        };
        writeln!(output, "{:>2}. {name:<30} {duration:>7}", rank + 1).unwrap();
    }
    let remaining = usage.sites.len().saturating_sub(TOP_SITES);
    if remaining > 0 {
        writeln!(output, "    ... and {remaining} more").unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "SUMMARY").unwrap();
    writeln!(output, "───────").unwrap();
    writeln!(output, "Total tracked:  {}", format_duration(usage.total_ms())).unwrap();
    writeln!(output, "Sessions:       {}", usage.session_count).unwrap();

    output
}

// ========== JSON Output ==========

/// Chart-ready weekly data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowserData {
    /// Day labels, oldest first (e.g. `Mon 06 Jan`).
    pub chart_labels: Vec<String>,
    /// Minutes per day, matching `chart_labels`.
    pub chart_data: Vec<f64>,
    pub sorted_sites: Vec<SiteMinutes>,
}

/// Total minutes on one site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteMinutes {
    pub domain: String,
    pub active_duration: f64,
}

impl From<&WeeklyUsage> for BrowserData {
    fn from(usage: &WeeklyUsage) -> Self {
        Self {
            chart_labels: usage.days.iter().map(|d| day_label(d.date)).collect(),
            chart_data: usage.days.iter().map(|d| to_minutes(d.total_ms)).collect(),
            sorted_sites: usage
                .sites
                .iter()
                .map(|s| SiteMinutes {
                    domain: s.site.clone(),
                    active_duration: to_minutes(s.total_ms),
                })
                .collect(),
        }
    }
}

// ========== Public Interface ==========

/// Prints the report for the week ending today.
pub fn run<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let usage = load_weekly_usage(db, Local::now().date_naive(), &Local)?;
    if json {
        let data = BrowserData::from(&usage);
        writeln!(writer, "{}", serde_json::to_string_pretty(&data)?)?;
    } else {
        write!(writer, "{}", format_report(&usage))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::FixedOffset;
    use ft_core::{ReportTarget, SessionReport, TabId};

    const HOUR_MS: i64 = 3_600_000;
    const DAY_MS: i64 = 86_400_000;
    /// 2025-01-01T00:00:00Z, a Wednesday.
    const JAN_1: i64 = 1_735_689_600_000;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 7).unwrap()
    }

    fn record(domain: &str, close_time: i64, duration: i64) -> SessionRecord {
        SessionRecord {
            id: close_time,
            tab_id: 1,
            target: ReportTarget::Domain(domain.to_string()),
            open_time: close_time - duration,
            close_time,
            active_duration: duration,
            received_at: String::new(),
        }
    }

    fn site(name: &str, total_ms: i64) -> SiteUsage {
        SiteUsage {
            site: name.to_string(),
            total_ms,
        }
    }

    #[test]
    fn test_format_duration_hours_and_minutes() {
        assert_eq!(format_duration(HOUR_MS + 5 * 60_000), "1h 5m");
    }

    #[test]
    fn test_format_duration_minutes_only() {
        assert_eq!(format_duration(45 * 60_000), "45m");
    }

    #[test]
    fn test_format_duration_floors_seconds() {
        assert_eq!(format_duration(119_999), "1m");
    }

    #[test]
    fn test_format_duration_negative_is_zero() {
        assert_eq!(format_duration(-1), "0m");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(10, 10), "██████████");
        assert_eq!(progress_bar(5, 10), "█████░░░░░");
        assert_eq!(progress_bar(1, 100), "█░░░░░░░░░");
        assert_eq!(progress_bar(0, 10), "░░░░░░░░░░");
        assert_eq!(progress_bar(0, 0), "░░░░░░░░░░");
    }

    #[test]
    fn test_to_minutes_rounds_to_two_decimals() {
        assert!((to_minutes(90_000) - 1.5).abs() < f64::EPSILON);
        assert!((to_minutes(1_000) - 0.02).abs() < 1e-9);
        assert!((to_minutes(0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_week_window_utc() {
        let (start, end) = week_window(today(), &Utc);
        assert_eq!(start.timestamp_millis(), JAN_1);
        assert_eq!(end.timestamp_millis(), JAN_1 + 7 * DAY_MS);
    }

    #[test]
    fn test_week_window_respects_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let (start, _) = week_window(today(), &tz);
        assert_eq!(start.timestamp_millis(), JAN_1 - 2 * HOUR_MS);
    }

    #[test]
    fn test_summarize_buckets_by_close_day() {
        let sessions = vec![
            record("a.com", JAN_1 + HOUR_MS, HOUR_MS),
            record("b.com", JAN_1 + 2 * HOUR_MS, 30 * 60_000),
            record("a.com", JAN_1 + 6 * DAY_MS + HOUR_MS, 10 * 60_000),
            // Outside the window on both sides.
            record("old.com", JAN_1 - 1, 1000),
            record("new.com", JAN_1 + 7 * DAY_MS, 1000),
        ];
        let usage = summarize(&sessions, vec![], today(), &Utc);

        assert_eq!(usage.days.len(), 7);
        assert_eq!(usage.days[0].date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(usage.days[0].total_ms, HOUR_MS + 30 * 60_000);
        assert_eq!(usage.days[6].total_ms, 10 * 60_000);
        assert_eq!(usage.session_count, 3);
        assert_eq!(usage.total_ms(), HOUR_MS + 40 * 60_000);
    }

    #[test]
    fn test_summarize_saturates_huge_totals() {
        let sessions = vec![
            record("a.com", JAN_1 + 6 * DAY_MS, i64::MAX - 10),
            record("b.com", JAN_1 + 6 * DAY_MS + 1, i64::MAX - 10),
            record("c.com", JAN_1 + 5 * DAY_MS, i64::MAX - 10),
        ];

        let usage = summarize(&sessions, vec![], today(), &Utc);

        assert_eq!(usage.days[6].total_ms, i64::MAX);
        assert_eq!(usage.total_ms(), i64::MAX);
        assert_eq!(usage.session_count, 3);
    }

    #[test]
    fn test_report_empty_week() {
        let usage = summarize(&[], vec![], today(), &Utc);
        let output = format_report(&usage);
        assert_eq!(
            output,
            "BROWSING REPORT: Wed 01 Jan - Tue 07 Jan\n\
             \n\
             No browsing recorded this week.\n\
             \n\
             Hint: Run 'ft status' to check the collector.\n"
        );
    }

    #[test]
    fn test_report_lists_days_sites_and_summary() {
        let sessions = vec![
            record("a.com", JAN_1 + HOUR_MS, HOUR_MS),
            record("b.com", JAN_1 + DAY_MS + HOUR_MS, 30 * 60_000),
        ];
        let sites = vec![site("a.com", HOUR_MS), site("b.com", 30 * 60_000)];
        let output = format_report(&summarize(&sessions, sites, today(), &Utc));

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "BROWSING REPORT: Wed 01 Jan - Tue 07 Jan");
        assert!(lines.contains(&"Wed 01 Jan    1h 0m  ██████████"));
        assert!(lines.contains(&"Thu 02 Jan      30m  █████░░░░░"));
        assert!(lines.contains(&"Tue 07 Jan       0m  ░░░░░░░░░░"));
        assert!(lines.contains(&format!(" 1. {:<30}   1h 0m", "a.com").as_str()));
        assert!(lines.contains(&format!(" 2. {:<30}     30m", "b.com").as_str()));
        assert!(lines.contains(&"Total tracked:  1h 30m"));
        assert!(lines.contains(&"Sessions:       2"));
    }

    #[test]
    fn test_report_truncates_site_list() {
        let sessions = vec![record("a.com", JAN_1 + HOUR_MS, HOUR_MS)];
        let sites = (0..12).map(|i| site(&format!("s{i}.com"), 1000)).collect();
        let output = format_report(&summarize(&sessions, sites, today(), &Utc));
        assert!(output.contains("    ... and 2 more\n"));
        assert!(output.contains("10. s9.com"));
        assert!(!output.contains("s10.com"));
    }

    #[test]
    fn test_browser_data_shape() {
        let sessions = vec![record("a.com", JAN_1 + HOUR_MS, 90_000)];
        let sites = vec![site("a.com", 90_000)];
        let data = BrowserData::from(&summarize(&sessions, sites, today(), &Utc));

        assert_eq!(data.chart_labels.len(), 7);
        assert_eq!(data.chart_labels[0], "Wed 01 Jan");
        assert_eq!(data.chart_labels[6], "Tue 07 Jan");
        assert_eq!(data.chart_data, vec![1.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["sorted_sites"][0]["domain"], "a.com");
        assert_eq!(json["sorted_sites"][0]["active_duration"], 1.5);
    }

    #[test]
    fn test_load_weekly_usage_from_database() {
        let mut db = Database::open_in_memory().unwrap();
        for (domain, close, duration) in [
            ("a.com", JAN_1 + HOUR_MS, HOUR_MS),
            ("b.com", JAN_1 + 3 * DAY_MS, 2 * HOUR_MS),
            ("a.com", JAN_1 - DAY_MS, HOUR_MS),
        ] {
            let report = SessionReport::new(
                TabId::new(1),
                ReportTarget::Domain(domain.to_string()),
                close - duration,
                close,
            );
            db.insert_report(&report, Utc::now()).unwrap();
        }

        let usage = load_weekly_usage(&db, today(), &Utc).unwrap();
        assert_eq!(usage.session_count, 2);
        assert_eq!(usage.sites, vec![site("b.com", 2 * HOUR_MS), site("a.com", HOUR_MS)]);
        assert_eq!(usage.days[0].total_ms, HOUR_MS);
        assert_eq!(usage.days[3].total_ms, 2 * HOUR_MS);
    }
}
