use anyhow::Result;
use std::process;

use nutritrack_core::service::{LoginOutcome, NutriService, RegisterOutcome};

use crate::config::Config;

use super::helpers::{clear_session, json_error, load_session, prompt_line, save_session};

pub(crate) fn cmd_register(
    service: &NutriService,
    username: &str,
    name: &str,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt_line("Password: ")?,
    };

    let outcome = service.register(username, &password, name)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match outcome {
        RegisterOutcome::Created { message, .. } => {
            println!("{message}");
            Ok(())
        }
        RegisterOutcome::DuplicateUser { message } => {
            eprintln!("{message}");
            process::exit(2);
        }
    }
}

pub(crate) fn cmd_login(
    config: &Config,
    service: &NutriService,
    username: &str,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt_line("Password: ")?,
    };

    match service.login(username, &password)? {
        LoginOutcome::Approved { session, warning } => {
            save_session(config, &session)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "outcome": "approved",
                        "username": session.username,
                        "display_name": session.display_name,
                        "session_id": session.id,
                        "warning": warning,
                    }))?
                );
                return Ok(());
            }
            println!("Welcome, {}!", session.display_name);
            if let Some(w) = warning {
                eprintln!("Warning: {w}");
            }
            if session.profile.is_none() {
                println!("No profile yet. Run `nutritrack profile set` to get a calorie target.");
            }
            Ok(())
        }
        LoginOutcome::Pending => {
            let message = "Your account is awaiting admin approval.";
            if json {
                println!("{}", serde_json::json!({ "outcome": "pending", "message": message }));
                return Ok(());
            }
            eprintln!("{message}");
            process::exit(2);
        }
        LoginOutcome::InvalidCredentials => {
            let message = "Invalid username or password.";
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "outcome": "invalid_credentials", "message": message })
                );
                return Ok(());
            }
            eprintln!("{message}");
            process::exit(2);
        }
    }
}

pub(crate) fn cmd_logout(config: &Config, json: bool) -> Result<()> {
    let removed = clear_session(config)?;
    if json {
        println!("{}", serde_json::json!({ "logged_out": removed }));
    } else if removed {
        println!("Logged out.");
    } else {
        println!("No active session.");
    }
    Ok(())
}

pub(crate) fn cmd_whoami(config: &Config, json: bool) -> Result<()> {
    let Ok(session) = load_session(config) else {
        if json {
            println!("{}", json_error("Not logged in"));
        } else {
            eprintln!("Not logged in.");
        }
        process::exit(2);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
        return Ok(());
    }

    println!("Logged in as {} ({})", session.username, session.display_name);
    println!("  Session started: {}", session.started);
    match &session.profile {
        Some(profile) => {
            let target = profile.target_calories;
            println!("  Target: {target:.0} kcal/day");
        }
        None => println!("  No profile saved yet."),
    }
    let mirrored = session.log.len();
    println!("  Log entries in session: {mirrored}");
    Ok(())
}

/// Pull the store's truth back into the session, discarding anything
/// that never made it out of the mirror.
pub(crate) fn cmd_reload(config: &Config, service: &NutriService, json: bool) -> Result<()> {
    let mut session = load_session(config)?;
    service.reload(&mut session)?;
    save_session(config, &session)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "reloaded": true,
                "profile_loaded": session.profile.is_some(),
                "log_entries": session.log.len(),
            }))?
        );
        return Ok(());
    }

    println!("Session refreshed from the store.");
    let entries = session.log.len();
    println!("  Log entries: {entries}");
    if session.profile.is_none() {
        println!("  No profile on record.");
    }
    Ok(())
}
