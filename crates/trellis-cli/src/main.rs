//! Trellis CLI - workspaces, projects and pages from the terminal
//!
//! Each profile points at a Supabase project and keeps its own session,
//! lockout state and workspace/project selection.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::activity::run_activity;
use crate::commands::auth_cmd::run_auth;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::dashboard::{run_dashboard, run_page};
use crate::commands::media::run_media;
use crate::commands::node::run_node;
use crate::commands::project::run_project;
use crate::commands::workspace::run_workspace;
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
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trellis=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Some(Commands::Config { command }) => run_config(command, profile)?,
        Some(Commands::Auth { command }) => run_auth(command, profile).await?,
        Some(Commands::Workspace { command }) => run_workspace(command, profile).await?,
        Some(Commands::Project { command }) => run_project(command, profile).await?,
        Some(Commands::Node { command }) => run_node(command, profile).await?,
        Some(Commands::Activity { command }) => run_activity(command, profile).await?,
        Some(Commands::Dashboard) => run_dashboard(profile).await?,
        Some(Commands::Page { command }) => run_page(command, profile).await?,
        Some(Commands::Media { command }) => run_media(command, profile)?,
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        None => {
            Cli::command().print_help().map_err(CliError::Io)?;
            println!();
        }
    }

    Ok(())
}
