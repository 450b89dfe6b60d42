//! EveryNote CLI - Command-line interface for EveryNote
//!
//! Quick capture, browsing and account management from the terminal.

mod cli;
mod commands;
mod config;
mod error;


use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth_cmd::run_auth;
use crate::commands::categories::run_categories;
use crate::commands::completions::run_completions;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::config::CliSettings;
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

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "everynote=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(Commands::Completions { shell, output }) = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let settings = CliSettings::load(cli.config.as_deref(), cli.db_path)?;

    match cli.command {
        Some(Commands::Add { category, content }) => {
            run_add(&content, category.as_deref(), &settings).await?;
        }
        Some(Commands::Edit {
            id,
            category,
            content,
        }) => run_edit(&id, &content, category.as_deref(), &settings).await?,
        Some(Commands::List {
            category,
            limit,
            json,
        }) => run_list(category.as_deref(), limit, json, &settings.db_path).await?,
        Some(Commands::Delete { id }) => run_delete(&id, &settings.db_path).await?,
        Some(Commands::Categories { json }) => run_categories(json, &settings.db_path).await?,
        Some(Commands::Auth { command }) => run_auth(command, &settings).await?,
        Some(Commands::Completions { .. }) => {}
        None => {
            // Quick capture mode: everynote "my note"
            if cli.note.is_empty() {
                Cli::command().print_help().map_err(CliError::Io)?;
                println!();
            } else {
                run_add(&cli.note, None, &settings).await?;
            }
        }
    }

    Ok(())
}
