use anyhow::{Result, bail};
use std::process;

use nutritrack_core::models::LogEntry;
use nutritrack_core::service::{CloudState, NutriService};

use crate::config::Config;

use super::helpers::{load_session, parse_date, print_entry_table, save_session, warn_cloud};

pub(crate) fn cmd_log_add(
    config: &Config,
    service: &NutriService,
    name: &str,
    calories: i64,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let mut session = load_session(config)?;
    let (entry, cloud) = service.log_manual(&mut session, &date, name, calories);
    save_session(config, &session)?;
    warn_cloud(&cloud);

    if json {
        print_entry_json(&entry, &cloud)?;
        return Ok(());
    }
    println!("Logged '{}' ({} kcal) on {date}", entry.name, entry.calories);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_log_exercise(
    config: &Config,
    service: &NutriService,
    name: &str,
    calories: i64,
    amount: Option<f64>,
    unit: Option<String>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let mut session = load_session(config)?;
    let (entry, cloud) = service.log_exercise(&mut session, &date, name, calories, amount, unit);
    save_session(config, &session)?;
    warn_cloud(&cloud);

    if json {
        print_entry_json(&entry, &cloud)?;
        return Ok(());
    }
    let burned = entry.burn_magnitude();
    println!("Logged exercise '{}' (-{burned} kcal) on {date}", entry.name);
    Ok(())
}

pub(crate) fn cmd_log_plan(
    config: &Config,
    service: &NutriService,
    number: usize,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    if number == 0 {
        bail!("Plan item numbers start at 1");
    }
    let date = parse_date(date)?;
    let mut session = load_session(config)?;
    let (entry, cloud) = service.log_from_plan(&mut session, number - 1, &date)?;
    save_session(config, &session)?;
    warn_cloud(&cloud);

    if json {
        print_entry_json(&entry, &cloud)?;
        return Ok(());
    }
    println!(
        "Logged '{}' ({} kcal) from the plan on {date}",
        entry.name, entry.calories
    );
    Ok(())
}

pub(crate) fn cmd_log_show(config: &Config, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let session = load_session(config)?;
    let entries = session.day_entries(&date);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        eprintln!("No entries for {date}");
        process::exit(2);
    }

    println!("Entries for {date}:");
    print_entry_table(&entries);
    Ok(())
}

pub(crate) fn cmd_log_remove(
    config: &Config,
    service: &NutriService,
    number: usize,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    if number == 0 {
        bail!("Entry numbers start at 1");
    }
    let date = parse_date(date)?;
    let mut session = load_session(config)?;
    let (removed, cloud) = service.remove_entry(&mut session, &date, number - 1)?;
    save_session(config, &session)?;
    warn_cloud(&cloud);

    if json {
        print_entry_json(&removed, &cloud)?;
        return Ok(());
    }
    println!("Removed '{}' from {date}", removed.name);
    Ok(())
}

fn print_entry_json(entry: &LogEntry, cloud: &CloudState) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "entry": entry,
            "cloud": cloud,
        }))?
    );
    Ok(())
}
