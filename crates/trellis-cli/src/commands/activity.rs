use std::sync::Arc;

use chrono::Utc;
use trellis_core::stores::NodeStore;

use crate::cli::ActivityCommands;
use crate::commands::common::{format_activity_lines, print_json, AppContext};
use crate::error::CliError;

pub async fn run_activity(
    command: ActivityCommands,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let context = AppContext::load(global_profile).await?;
    let result = dispatch(command, &context).await;
    context.finish().await;
    result
}

async fn dispatch(command: ActivityCommands, context: &AppContext) -> Result<(), CliError> {
    context.require_user()?;

    match command {
        ActivityCommands::List { json } => {
            let mut store = NodeStore::new(Arc::clone(&context.data));
            let activities = store.fetch_activities().await?;
            if json {
                print_json(activities)?;
            } else if activities.is_empty() {
                println!("No activity yet.");
            } else {
                for line in format_activity_lines(activities, Utc::now()) {
                    println!("{line}");
                }
            }
        }
    }
    Ok(())
}
