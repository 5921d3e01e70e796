use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutritrack_core::calc::ACTIVITY_LEVELS;
use nutritrack_core::goals;
use nutritrack_core::models::{NewProfile, Profile, Sex};
use nutritrack_core::service::NutriService;

use crate::config::Config;

use super::helpers::{load_session, save_session, warn_cloud};

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_profile_set(
    config: &Config,
    service: &NutriService,
    weight: f64,
    height: f64,
    age: i64,
    sex: &str,
    activity: &str,
    goal_names: Vec<String>,
    json: bool,
) -> Result<()> {
    let mut session = load_session(config)?;
    let sex = Sex::parse(sex)?;
    let activity = resolve_activity(activity);

    for name in &goal_names {
        if !goals::is_catalog_goal(name) {
            eprintln!("Note: '{name}' is not in the goal catalog and will not adjust the target.");
        }
    }

    let input = NewProfile {
        weight_kg: weight,
        height_cm: height,
        age,
        sex,
        activity,
        goals: goal_names,
    };
    let (profile, cloud) = service.save_profile(&mut session, &input);
    save_session(config, &session)?;
    warn_cloud(&cloud);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "profile": profile,
                "cloud": cloud,
            }))?
        );
        return Ok(());
    }

    println!("Profile saved for {} ({})", session.display_name, profile.date);
    print_profile(&profile);
    Ok(())
}

pub(crate) fn cmd_profile_show(config: &Config, json: bool) -> Result<()> {
    let session = load_session(config)?;
    let Some(profile) = session.profile else {
        eprintln!("No profile yet. Run `nutritrack profile set` first.");
        process::exit(2);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    println!("Profile for {} ({})", session.display_name, profile.date);
    print_profile(&profile);
    Ok(())
}

pub(crate) fn cmd_profile_history(
    config: &Config,
    service: &NutriService,
    json: bool,
) -> Result<()> {
    let session = load_session(config)?;
    let history = service.profile_history(&session.username)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.is_empty() {
        eprintln!("No profile history for {}", session.username);
        process::exit(2);
    }

    #[derive(Tabled)]
    struct ProfileRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight (kg)")]
        weight: String,
        #[tabled(rename = "BMI")]
        bmi: String,
        #[tabled(rename = "Target")]
        target: String,
        #[tabled(rename = "Goals")]
        goals: String,
    }

    let rows: Vec<ProfileRow> = history
        .iter()
        .map(|p| ProfileRow {
            date: p.date.clone(),
            weight: format!("{:.1}", p.weight_kg),
            bmi: format!("{:.1}", p.bmi),
            target: format!("{:.0}", p.target_calories),
            goals: p.goals.join(", "),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

fn print_profile(profile: &Profile) {
    println!();
    let weight = profile.weight_kg;
    let height = profile.height_cm;
    let age = profile.age;
    println!("  Weight:   {weight:.1} kg");
    println!("  Height:   {height:.1} cm");
    println!("  Age:      {age}");
    println!("  Sex:      {}", profile.sex.as_str());
    println!("  Activity: {}", profile.activity);
    if profile.goals.is_empty() {
        println!("  Goals:    (none)");
    } else {
        println!("  Goals:    {}", profile.goals.join(", "));
    }
    println!();
    let bmr = profile.bmr;
    let tdee = profile.tdee;
    let bmi = profile.bmi;
    let target = profile.target_calories;
    println!("  BMR:    {bmr:.0} kcal");
    println!("  TDEE:   {tdee:.0} kcal");
    println!("  BMI:    {bmi:.1} ({})", profile.bmi_category.as_str());
    println!("  Target: {target:.0} kcal/day");
}

/// Map common shorthand onto the catalog's exact labels; anything else
/// passes through verbatim and falls back to the sedentary multiplier
/// downstream.
fn resolve_activity(input: &str) -> String {
    let index = match input.trim().to_lowercase().as_str() {
        "sedentary" | "1" => 0,
        "light" | "lightly" | "2" => 1,
        "moderate" | "moderately" | "3" => 2,
        "very" | "4" => 3,
        "athlete" | "5" => 4,
        _ => return input.trim().to_string(),
    };
    ACTIVITY_LEVELS[index].0.to_string()
}
