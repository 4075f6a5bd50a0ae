use std::sync::Arc;

use trellis_core::stores::ProjectStore;

use crate::cli::ProjectCommands;
use crate::commands::common::{
    format_project_lines, normalize_identifier, normalize_name, print_json, AppContext,
};
use crate::error::CliError;

pub async fn run_project(
    command: ProjectCommands,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let mut context = AppContext::load(global_profile).await?;
    let result = dispatch(command, &mut context).await;
    context.finish().await;
    result
}

async fn dispatch(command: ProjectCommands, context: &mut AppContext) -> Result<(), CliError> {
    let user = context.require_user()?;
    let workspace_id = context.require_workspace()?;
    let mut store = ProjectStore::new(Arc::clone(&context.data));

    match command {
        ProjectCommands::List { json } => {
            let projects = store
                .fetch_projects(Some(&user), Some(&workspace_id))
                .await?;
            if json {
                print_json(projects)?;
            } else if projects.is_empty() {
                println!("No projects yet. Create one with `trellis project create <name>`.");
            } else {
                let selected = context.selected_project();
                for line in format_project_lines(projects, selected.as_ref()) {
                    println!("{line}");
                }
            }
        }
        ProjectCommands::Create { name } => {
            let name = normalize_name(&name, "Project name")?;
            let project = store
                .create_project(Some(&user), Some(&workspace_id), &name)
                .await?;
            let selected = Some(project.id.clone());
            context.update_profile(|profile| profile.selected_project_id = selected)?;
            println!("{}", project.id);
        }
        ProjectCommands::Select { id } => {
            let id = normalize_identifier(&id, "Project ID")?;
            store
                .fetch_projects(Some(&user), Some(&workspace_id))
                .await?;
            let project = store.find(&id).ok_or_else(|| CliError::NotFound {
                kind: "Project",
                id: id.to_string(),
            })?;
            println!("Selected project '{}'", project.name);
            context.update_profile(|profile| profile.selected_project_id = Some(id))?;
        }
        ProjectCommands::Delete { id } => {
            let id = normalize_identifier(&id, "Project ID")?;
            store.delete_project(&id).await?;
            if context.selected_project().as_ref() == Some(&id) {
                context.update_profile(|profile| profile.selected_project_id = None)?;
            }
            println!("Deleted project {id}");
        }
        ProjectCommands::Access { id, users } => {
            let id = normalize_identifier(&id, "Project ID")?;
            let users = users
                .into_iter()
                .map(|user| user.trim().to_string())
                .filter(|user| !user.is_empty())
                .collect::<Vec<_>>();
            if users.is_empty() {
                return Err(CliError::EmptyArgument("User list"));
            }
            let count = users.len();
            store.update_project_access(&id, users).await?;
            println!("Project {id} is now visible to {count} user(s)");
        }
    }
    Ok(())
}
