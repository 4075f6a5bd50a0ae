use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use trellis_core::models::{DataMap, NewNode, NodePatch};
use trellis_core::rest::RestClient;
use trellis_core::stores::{Assignment, NodeStore};
use trellis_core::{NodeKind, RowId};

use crate::cli::{NodeCommands, NodeType};
use crate::commands::common::{
    format_activity_lines, format_node_lines, normalize_identifier, print_json, AppContext,
};
use crate::error::CliError;

pub async fn run_node(command: NodeCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let context = AppContext::load(global_profile).await?;
    let result = dispatch(command, &context).await;
    context.finish().await;
    result
}

/// Store for `project_id` (or the selected project), with its nodes loaded.
pub async fn load_project_nodes(
    context: &AppContext,
    project_id: Option<RowId>,
) -> Result<NodeStore<RestClient>, CliError> {
    let project_id = match project_id {
        Some(id) => id,
        None => context.require_project()?,
    };
    let mut store = NodeStore::new(Arc::clone(&context.data));
    store.select_project(Some(project_id)).await?;
    Ok(store)
}

async fn dispatch(command: NodeCommands, context: &AppContext) -> Result<(), CliError> {
    context.require_user()?;

    match command {
        NodeCommands::List {
            project,
            folder,
            all,
            json,
        } => {
            let project = project
                .map(|id| normalize_identifier(&id, "Project ID"))
                .transpose()?;
            let mut store = load_project_nodes(context, project).await?;
            if all {
                store.set_show_all_items(true);
            } else {
                let folder = folder
                    .map(|id| normalize_identifier(&id, "Folder ID"))
                    .transpose()?;
                store.select_folder(folder);
            }

            let visible = store.visible_nodes();
            if json {
                print_json(&visible)?;
            } else if visible.is_empty() {
                println!("Nothing here yet. Add a page with `trellis node add --name <name>`.");
            } else {
                for line in format_node_lines(&visible, Utc::now()) {
                    println!("{line}");
                }
            }
        }
        NodeCommands::Add { name, kind, parent } => {
            let actor = context.require_actor()?;
            let project_id = context.require_project()?;
            let parent = parent
                .map(|id| normalize_identifier(&id, "Parent ID"))
                .transpose()?;
            let kind = match kind {
                NodeType::Folder => NodeKind::Folder,
                NodeType::Page => NodeKind::Page,
            };
            let mut store = NodeStore::new(Arc::clone(&context.data));
            let node = store
                .add_node(
                    NewNode::new(project_id, name.trim(), kind).with_parent(parent),
                    &actor,
                )
                .await?;
            println!("{}", node.id);
        }
        NodeCommands::Update {
            id,
            name,
            data,
            due_date,
            clear_due_date,
        } => {
            let id = normalize_identifier(&id, "Node ID")?;
            let mut store = load_project_nodes(context, None).await?;
            let due_date = if clear_due_date {
                Some(None)
            } else {
                due_date.map(Some)
            };
            let patch = NodePatch {
                name: name.map(|name| name.trim().to_string()),
                data: data.as_deref().map(parse_data_patch).transpose()?,
                due_date,
                ..NodePatch::default()
            };

            let node = match patch {
                NodePatch {
                    due_date: Some(due_date),
                    name: None,
                    data: None,
                    ..
                } => store.update_page_due_date(&id, due_date).await?,
                patch => store.update_node(&id, patch).await?,
            };
            println!("Updated {} '{}'", node.id, node.name);
        }
        NodeCommands::Assign { id, user, remove } => {
            let actor = context.require_actor()?;
            let id = normalize_identifier(&id, "Node ID")?;
            let assignee = user.trim().to_string();
            if assignee.is_empty() {
                return Err(CliError::EmptyArgument("Assignee"));
            }

            let mut store = load_project_nodes(context, None).await?;
            let node = store.find_node(&id).ok_or_else(|| CliError::NotFound {
                kind: "Node",
                id: id.to_string(),
            })?;
            let mut assignees = node.assignees.clone();
            assignees.retain(|existing| existing != &assignee);
            if !remove {
                assignees.push(assignee.clone());
            }

            let node = store
                .update_node(
                    &id,
                    NodePatch {
                        assignees: Some(assignees),
                        ..NodePatch::default()
                    },
                )
                .await?;
            let entry = store.log_assignment(
                Assignment {
                    project_id: Some(node.project_id.clone()),
                    node_id: node.id.clone(),
                    node_name: node.name.clone(),
                    assignee_name: assignee,
                    assigned: !remove,
                },
                &actor,
            );
            for line in format_activity_lines(std::slice::from_ref(entry), Utc::now()) {
                println!("{line}");
            }
        }
        NodeCommands::Delete { id } => {
            let id = normalize_identifier(&id, "Node ID")?;
            let mut store = NodeStore::new(Arc::clone(&context.data));
            store.delete_node(&id).await?;
            println!("Deleted node {id}");
        }
    }
    Ok(())
}

/// `--data` must be a JSON object; its keys are merged into the page data.
pub fn parse_data_patch(raw: &str) -> Result<DataMap, CliError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(CliError::InvalidData),
    }
}
