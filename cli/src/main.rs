mod commands;
mod config;
mod server;
mod sheets;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

use crate::commands::{
    cmd_foods, cmd_goals, cmd_history, cmd_import, cmd_log_add, cmd_log_exercise, cmd_log_plan,
    cmd_log_remove, cmd_log_show, cmd_login, cmd_logout, cmd_plan_generate, cmd_plan_show,
    cmd_profile_history, cmd_profile_set, cmd_profile_show, cmd_register, cmd_reload, cmd_summary,
    cmd_whoami, open_service,
};
use crate::config::Config;
use nutritrack_core::service::NutriService;

#[derive(Parser)]
#[command(
    name = "nutritrack",
    version,
    about = "A spreadsheet-backed personal nutrition tracker",
    long_about = "\nNutriTrack: eat with intent.

Calorie targets computed from your profile, generated daily menus, and
a food and exercise log kept in a Google Sheets workbook (or a local
SQLite file when no service account is configured)."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account (new accounts await admin approval)
    Register {
        /// Username to register
        username: String,
        /// Display name shown in greetings and reports
        #[arg(short, long)]
        name: String,
        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log in and start a session
    Login {
        /// Username to log in as
        username: String,
        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// End the current session
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the active session
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage your metabolic profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// List the goal catalog and its calorie adjustments
    Goals {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the food catalog the menu generator draws from
    Foods {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate and inspect daily menus
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Record food and exercise entries
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
    /// Show one day's report (defaults to today)
    Summary {
        /// Date to show (YYYY-MM-DD, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show daily totals for the last N days
    History {
        /// Number of days to show
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-read profile and log from the store, discarding local divergence
    Reload {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import worksheet rows from a CSV file
    Import {
        /// Worksheet tab: users, profiles, or Sheet1
        tab: String,
        /// Path to the CSV file
        file: std::path::PathBuf,
        /// Preview import without making changes
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Serve without any store; sessions last only as long as the process
        #[arg(long)]
        offline: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Save a profile snapshot and recompute the calorie target
    Set {
        /// Body weight in kilograms
        #[arg(long)]
        weight: f64,
        /// Height in centimeters
        #[arg(long)]
        height: f64,
        /// Age in years
        #[arg(long)]
        age: i64,
        /// Biological sex: male or female
        #[arg(long)]
        sex: String,
        /// Activity level (catalog label, or shorthand like "light" or "3")
        #[arg(long, default_value = "Sedentary (Office Job)")]
        activity: String,
        /// Goal name, repeatable (see `nutritrack goals`)
        #[arg(long = "goal")]
        goals: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the session's current profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show saved profile snapshots
    History {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Generate a menu for the profile's calorie target
    Generate {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the last generated menu
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum LogCommands {
    /// Log a food or drink with a known calorie count
    Add {
        /// Entry name
        name: String,
        /// Calories
        calories: i64,
        /// Date to log for (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log an exercise session and the calories it burned
    Exercise {
        /// Exercise name
        name: String,
        /// Calories burned (sign is ignored)
        calories: i64,
        /// Distance, duration, or another magnitude (paired with --unit)
        #[arg(long)]
        amount: Option<f64>,
        /// Unit for --amount (e.g. km, min)
        #[arg(long)]
        unit: Option<String>,
        /// Date to log for (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log one item from the generated menu by its number
    Plan {
        /// Plan item number as shown by `nutritrack plan show`
        number: usize,
        /// Date to log for (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List one day's entries (defaults to today)
    Show {
        /// Date to show (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove one entry of a day by its number
    Remove {
        /// Entry number as shown by `nutritrack log show`
        number: usize,
        /// Date of the entry (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let service = open_service(&config);

    match cli.command {
        Commands::Register {
            username,
            name,
            password,
            json,
        } => cmd_register(&service, &username, &name, password, json),
        Commands::Login {
            username,
            password,
            json,
        } => cmd_login(&config, &service, &username, password, json),
        Commands::Logout { json } => cmd_logout(&config, json),
        Commands::Whoami { json } => cmd_whoami(&config, json),
        Commands::Profile { command } => match command {
            ProfileCommands::Set {
                weight,
                height,
                age,
                sex,
                activity,
                goals,
                json,
            } => cmd_profile_set(
                &config, &service, weight, height, age, &sex, &activity, goals, json,
            ),
            ProfileCommands::Show { json } => cmd_profile_show(&config, json),
            ProfileCommands::History { json } => cmd_profile_history(&config, &service, json),
        },
        Commands::Goals { json } => cmd_goals(json),
        Commands::Foods { json } => cmd_foods(json),
        Commands::Plan { command } => match command {
            PlanCommands::Generate { json } => cmd_plan_generate(&config, &service, json),
            PlanCommands::Show { json } => cmd_plan_show(&config, json),
        },
        Commands::Log { command } => match command {
            LogCommands::Add {
                name,
                calories,
                date,
                json,
            } => cmd_log_add(&config, &service, &name, calories, date, json),
            LogCommands::Exercise {
                name,
                calories,
                amount,
                unit,
                date,
                json,
            } => cmd_log_exercise(&config, &service, &name, calories, amount, unit, date, json),
            LogCommands::Plan { number, date, json } => {
                cmd_log_plan(&config, &service, number, date, json)
            }
            LogCommands::Show { date, json } => cmd_log_show(&config, date, json),
            LogCommands::Remove { number, date, json } => {
                cmd_log_remove(&config, &service, number, date, json)
            }
        },
        Commands::Summary { date, json } => cmd_summary(&config, &service, date, json),
        Commands::History { days, json } => cmd_history(&config, &service, days, json),
        Commands::Reload { json } => cmd_reload(&config, &service, json),
        Commands::Import {
            tab,
            file,
            dry_run,
            json,
        } => cmd_import(&service, &tab, &file, dry_run, json),
        Commands::Serve {
            port,
            bind,
            offline,
        } => {
            let service = if offline {
                NutriService::offline()
            } else {
                service
            };
            server::start_server(service, port, &bind).await
        }
    }
}
