use std::sync::Arc;

use trellis_core::stores::WorkspaceStore;

use crate::cli::WorkspaceCommands;
use crate::commands::common::{
    format_workspace_lines, normalize_identifier, normalize_name, print_json, AppContext,
};
use crate::error::CliError;

pub async fn run_workspace(
    command: WorkspaceCommands,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let mut context = AppContext::load(global_profile).await?;
    let result = dispatch(command, &mut context).await;
    context.finish().await;
    result
}

async fn dispatch(command: WorkspaceCommands, context: &mut AppContext) -> Result<(), CliError> {
    let user = context.require_user()?;
    let mut store = WorkspaceStore::new(Arc::clone(&context.data));
    store.select_workspace(context.selected_workspace());

    match command {
        WorkspaceCommands::List { json } => {
            store.fetch_workspaces(Some(&user)).await?;
            let workspaces = store.workspaces();
            if json {
                print_json(workspaces)?;
            } else if workspaces.is_empty() {
                println!("No workspaces yet. Create one with `trellis workspace create <name>`.");
            } else {
                for line in format_workspace_lines(workspaces, store.selected_workspace_id()) {
                    println!("{line}");
                }
            }
            let selected = store.selected_workspace_id().cloned();
            if selected != context.selected_workspace() {
                context.update_profile(|profile| profile.select_workspace(selected))?;
            }
        }
        WorkspaceCommands::Create { name } => {
            let name = normalize_name(&name, "Workspace name")?;
            let workspace = store.create_workspace(Some(&user), &name).await?;
            let selected = Some(workspace.id.clone());
            context.update_profile(|profile| profile.select_workspace(selected))?;
            println!("{}", workspace.id);
        }
        WorkspaceCommands::Select { id } => {
            let id = normalize_identifier(&id, "Workspace ID")?;
            store.fetch_workspaces(Some(&user)).await?;
            store.select_workspace(Some(id.clone()));
            let workspace = store
                .selected_workspace()
                .ok_or_else(|| CliError::NotFound {
                    kind: "Workspace",
                    id: id.to_string(),
                })?;
            println!("Selected workspace '{}'", workspace.name);
            context.update_profile(|profile| profile.select_workspace(Some(id)))?;
        }
    }
    Ok(())
}
