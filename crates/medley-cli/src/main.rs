//! Medley CLI - Command-line interface for the media tracker
//!
//! Manage the local library from the terminal and sync it across devices.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands, LogCommands, MediaKindArg, SyncCommands};
use crate::commands::common::resolve_db_path;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("medley_core=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let global_profile = cli.profile.as_deref();

    match cli.command {
        Some(Commands::Add {
            kind,
            title,
            category,
            source,
            score,
            notes,
        }) => {
            commands::add::run_add(
                kind.into_kind(),
                &title,
                category.as_deref(),
                source.as_deref(),
                score,
                notes.as_deref(),
                &db_path,
            )
            .await?;
        }
        Some(Commands::List {
            kind,
            category,
            limit,
            json,
        }) => {
            commands::list::run_list(
                kind.map(MediaKindArg::into_kind),
                category.as_deref(),
                limit,
                json,
                &db_path,
            )
            .await?;
        }
        Some(Commands::Move { item, category }) => {
            commands::move_item::run_move(&item, &category, &db_path).await?;
        }
        Some(Commands::Delete { item }) => {
            commands::delete::run_delete(&item, &db_path).await?;
        }
        Some(Commands::Start { item }) => {
            commands::start::run_start(&item, &db_path).await?;
        }
        Some(Commands::Log { command }) => match command {
            LogCommands::Episode { run, number } => {
                commands::log::run_log_episode(run, number, &db_path).await?;
            }
            LogCommands::Session { run, minutes, note } => {
                commands::log::run_log_session(run, minutes, note.as_deref(), &db_path).await?;
            }
        },
        Some(Commands::Sync { command }) => match command {
            Some(SyncCommands::Conflicts { limit, json }) => {
                commands::sync::run_sync_conflicts(limit, json, &db_path).await?;
            }
            None => commands::sync::run_sync(&db_path, global_profile).await?,
        },
        Some(Commands::Config { command }) => {
            commands::config::run_config(command, global_profile)?;
        }
        Some(Commands::Auth { command }) => {
            commands::auth_cmd::run_auth(command, global_profile).await?;
        }
        Some(Commands::Completions { shell, output }) => {
            commands::completions::run_completions(shell, output.as_deref())?;
        }
        None => {
            Cli::command().print_help().map_err(CliError::Io)?;
            println!();
        }
    }

    Ok(())
}
