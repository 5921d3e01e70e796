use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutritrack_core::menu::{PlanItem, plan_total};
use nutritrack_core::service::NutriService;

use crate::config::Config;

use super::helpers::{load_session, save_session, truncate};

pub(crate) fn cmd_plan_generate(
    config: &Config,
    service: &NutriService,
    json: bool,
) -> Result<()> {
    let mut session = load_session(config)?;
    let plan = service.generate_plan(&mut session)?;
    save_session(config, &session)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "plan": plan,
                "total": plan_total(&plan),
            }))?
        );
        return Ok(());
    }

    // generate_plan only succeeds with a profile on the session
    if let Some(profile) = &session.profile {
        let target = profile.target_calories;
        println!("Daily menu for a {target:.0} kcal target:\n");
    }
    print_plan_table(&plan);
    Ok(())
}

pub(crate) fn cmd_plan_show(config: &Config, json: bool) -> Result<()> {
    let session = load_session(config)?;
    let Some(plan) = session.plan else {
        eprintln!("No plan generated yet. Run `nutritrack plan generate`.");
        process::exit(2);
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "plan": plan,
                "total": plan_total(&plan),
            }))?
        );
        return Ok(());
    }

    print_plan_table(&plan);
    Ok(())
}

fn print_plan_table(plan: &[PlanItem]) {
    #[derive(Tabled)]
    struct PlanRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Meal")]
        meal: String,
        #[tabled(rename = "Item")]
        item: String,
        #[tabled(rename = "Calories")]
        calories: i64,
    }

    let rows: Vec<PlanRow> = plan
        .iter()
        .enumerate()
        .map(|(i, item)| PlanRow {
            idx: i + 1,
            meal: item.meal_type.as_str().to_string(),
            item: truncate(&item.name, 40),
            calories: item.calories,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let total = plan_total(plan);
    println!("Plan total: {total} kcal");
    println!("Log an item with `nutritrack log plan <number>`.");
}
