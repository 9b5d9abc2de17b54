mod commands;
mod logging;
mod progress;

use std::fmt::Display;
use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use tf2idle_core::{Account, AppConfig, BatchResults, Secret, Tf2IdleApp};
use tracing::error;

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let config = match tf2idle_core::config::load_configuration() {
        Ok(config) => apply_overrides(config, &args),
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return Ok(());
    };

    if let Commands::PrintConfig = command {
        println!("Configuration: {:#?}", config);
        return Ok(());
    }

    let app = Tf2IdleApp::new(config).context("could not set up tf2idle")?;

    let all_ok = match command {
        Commands::Login(names) => {
            let accounts = prompt_passwords(&names.usernames)?;
            report(app.login(&accounts, &CliReporter::new("Logging in")), |r| r.is_success())
        }
        Commands::Logout(names) => {
            let accounts = accounts(&names.usernames);
            let results = app.logout(&accounts, &CliReporter::new("Logging out"));
            report(describe(results, "logged out", "still running"), |s| *s != "still running")
        }
        Commands::LaunchTf2 {
            accounts: names,
            launch_options,
            autoexec,
        } => {
            let accounts = accounts(&names.usernames);
            let results = app.launch_tf2(
                &accounts,
                launch_options.as_deref(),
                autoexec.as_deref(),
                &CliReporter::new("Launching TF2 for"),
            );
            report(results, |r| r.is_success())
        }
        Commands::CloseTf2(names) => {
            let accounts = accounts(&names.usernames);
            let results = app.close_tf2(&accounts, &CliReporter::new("Closing TF2 for"));
            report(describe(results, "closed", "still running"), |s| *s != "still running")
        }
        Commands::Cleanup(names) => {
            let accounts = accounts(&names.usernames);
            let results: BatchResults<&str> = app
                .cleanup_all(&accounts, &CliReporter::new("Cleaning up"))
                .into_iter()
                .map(|(name, result)| (name, result.map(|()| "cleaned up")))
                .collect();
            report(results, |_| true)
        }
        Commands::Status(names) => {
            let accounts = accounts(&names.usernames);
            report(app.status(&accounts, &CliReporter::new("Checking")), |_| true)
        }
        Commands::PrintConfig => true,
    };

    if !all_ok {
        process::exit(1);
    }
    Ok(())
}

fn apply_overrides(mut config: AppConfig, args: &Cli) -> AppConfig {
    if let Some(dir) = &args.working_dir {
        config.working_dir = dir.clone();
    }
    if let Some(dir) = &args.steam_base_dir {
        config.steam_base_dir = dir.clone();
    }
    if let Some(dir) = &args.sandboxie_install_dir {
        config.sandboxie_install_dir = dir.clone();
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    config
}

fn accounts(usernames: &[String]) -> Vec<Account> {
    usernames.iter().map(Account::new).collect()
}

fn prompt_passwords(usernames: &[String]) -> anyhow::Result<Vec<Account>> {
    usernames
        .iter()
        .map(|name| {
            let password = rpassword::prompt_password(format!("Password for {}: ", name))
                .with_context(|| format!("could not read password for {}", name))?;
            let account = Account::new(name);
            Ok(if password.is_empty() {
                account
            } else {
                account.with_password(Secret::new(password))
            })
        })
        .collect()
}

fn describe(
    results: BatchResults<bool>,
    yes: &'static str,
    no: &'static str,
) -> BatchResults<&'static str> {
    results
        .into_iter()
        .map(|(name, result)| (name, result.map(|ok| if ok { yes } else { no })))
        .collect()
}

/// Print one line per account; returns whether every account succeeded.
fn report<T: Display>(results: BatchResults<T>, success: impl Fn(&T) -> bool) -> bool {
    let mut all_ok = true;
    for (username, result) in results {
        match result {
            Ok(value) if success(&value) => {
                println!("{} {}: {}", "✓".green(), username.bold(), value.to_string().green());
            }
            Ok(value) => {
                all_ok = false;
                println!("{} {}: {}", "✗".red(), username.bold(), value.to_string().yellow());
            }
            Err(err) => {
                all_ok = false;
                println!("{} {}: {}", "✗".red(), username.bold(), err.to_string().red());
            }
        }
    }
    all_ok
}
