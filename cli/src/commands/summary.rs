use anyhow::Result;
use chrono::{Duration, Local};
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutritrack_core::models::{DailyReport, EntryCategory, LogEntry};
use nutritrack_core::service::NutriService;

use crate::config::Config;

use super::helpers::{load_session, parse_date};

pub(crate) fn cmd_summary(
    config: &Config,
    service: &NutriService,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let session = load_session(config)?;
    let report = service.day_report(&session, &date);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.entries.is_empty() {
        eprintln!("No entries for {date}");
        process::exit(2);
    }

    print_report(&report);
    Ok(())
}

pub(crate) fn cmd_history(
    config: &Config,
    service: &NutriService,
    days: u32,
    json: bool,
) -> Result<()> {
    let session = load_session(config)?;
    let today = Local::now().date_naive();

    let mut reports = Vec::new();
    for i in 0..days {
        let date = (today - Duration::days(i64::from(i)))
            .format("%Y-%m-%d")
            .to_string();
        reports.push(service.day_report(&session, &date));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if reports.iter().all(|r| r.entries.is_empty()) {
        eprintln!("No entries in the last {days} days");
        process::exit(2);
    }

    let rows: Vec<DayRow> = reports
        .iter()
        .map(|r| DayRow {
            date: r.date.clone(),
            intake: r.intake,
            burned: r.burned,
            net: r.net,
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()));
    println!("{table}");
    Ok(())
}

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Intake")]
    intake: i64,
    #[tabled(rename = "Burned")]
    burned: i64,
    #[tabled(rename = "Net")]
    net: i64,
}

fn print_report(report: &DailyReport) {
    println!("=== {} ===", report.date);
    for (idx, entry) in report.entries.iter().enumerate() {
        println!("  [{}] {}", idx + 1, entry_line(entry));
    }
    println!(
        "  INTAKE: {} kcal | BURNED: {} kcal | NET: {} kcal",
        report.intake, report.burned, report.net
    );
    if let Some(target) = report.target {
        println!("  TARGET: {target:.0} kcal");
    }
    if let Some(remaining) = report.remaining {
        println!("  REMAINING: {remaining:.0} kcal");
    }
}

fn entry_line(entry: &LogEntry) -> String {
    let calories = if entry.category == EntryCategory::Exercise {
        -entry.burn_magnitude()
    } else {
        entry.calories
    };
    let mut line = format!(
        "{} ({}): {} kcal",
        entry.name,
        entry.category.as_str(),
        calories
    );
    if let (Some(amount), Some(unit)) = (&entry.amount, &entry.unit) {
        line.push_str(&format!(" [{amount} {unit}]"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, calories: i64, category: EntryCategory) -> LogEntry {
        LogEntry {
            date: "2025-06-01".into(),
            name: name.into(),
            calories,
            category,
            amount: None,
            unit: None,
        }
    }

    #[test]
    fn exercise_lines_show_a_negative_figure() {
        let line = entry_line(&entry("Running", 300, EntryCategory::Exercise));
        assert_eq!(line, "Running (Exercise): -300 kcal");
    }

    #[test]
    fn amounts_are_appended_in_brackets() {
        let mut e = entry("Cycling", 250, EntryCategory::Exercise);
        e.amount = Some(12.5);
        e.unit = Some("km".into());
        assert_eq!(entry_line(&e), "Cycling (Exercise): -250 kcal [12.5 km]");
    }

    #[test]
    fn food_lines_keep_the_stored_calories() {
        let line = entry_line(&entry("Oatmeal", 300, EntryCategory::Food));
        assert_eq!(line, "Oatmeal (Food): 300 kcal");
    }
}
