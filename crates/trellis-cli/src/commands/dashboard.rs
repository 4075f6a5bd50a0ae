//! Read-only views: the dashboard and a single page.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use trellis_core::stores::{NodeStore, ProjectStore, WorkspaceStore};
use trellis_core::{Activity, Node, NodeKind};

use crate::cli::PageCommands;
use crate::commands::common::{
    format_activity_lines, format_node_lines, normalize_identifier, print_json, AppContext,
};
use crate::commands::node::load_project_nodes;
use crate::error::CliError;

const RECENT_ACTIVITY_LINES: usize = 5;
const UPCOMING_PAGES: usize = 5;

pub async fn run_dashboard(global_profile: Option<&str>) -> Result<(), CliError> {
    let context = AppContext::load(global_profile).await?;
    let result = show_dashboard(&context).await;
    context.finish().await;
    result
}

pub async fn run_page(command: PageCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let context = AppContext::load(global_profile).await?;
    let result = match command {
        PageCommands::Show { id, json } => show_page(&context, &id, json).await,
    };
    context.finish().await;
    result
}

async fn show_dashboard(context: &AppContext) -> Result<(), CliError> {
    let user = context.require_user()?;
    println!("Signed in as {}", user.display_name());

    let mut workspaces = WorkspaceStore::new(Arc::clone(&context.data));
    workspaces.select_workspace(context.selected_workspace());
    workspaces.fetch_workspaces(Some(&user)).await?;
    let Some(workspace) = workspaces.selected_workspace() else {
        println!("No workspace selected. Run `trellis workspace list` or `trellis workspace create <name>`.");
        return Ok(());
    };
    println!("Workspace: {}", workspace.name);

    let mut projects = ProjectStore::new(Arc::clone(&context.data));
    projects
        .fetch_projects(Some(&user), Some(&workspace.id))
        .await?;
    println!("Projects: {}", projects.projects().len());

    let project = context
        .selected_project()
        .and_then(|id| projects.find(&id).cloned());
    if let Some(project) = project {
        let store = load_project_nodes(context, Some(project.id.clone())).await?;
        let summary = summarize(store.nodes(), Utc::now().date_naive());
        println!(
            "Project: {} ({} folder(s), {} page(s), {} overdue)",
            project.name, summary.folders, summary.pages, summary.overdue
        );
        if !summary.upcoming.is_empty() {
            println!();
            println!("Due soon:");
            for line in format_node_lines(&summary.upcoming, Utc::now()) {
                println!("  {line}");
            }
        }
    } else {
        println!("No project selected. Run `trellis project select <id>`.");
    }

    let mut feed = NodeStore::new(Arc::clone(&context.data));
    let activities = feed.fetch_activities().await?;
    if !activities.is_empty() {
        let recent = &activities[..activities.len().min(RECENT_ACTIVITY_LINES)];
        println!();
        println!("Recent activity:");
        for line in format_activity_lines(recent, Utc::now()) {
            println!("  {line}");
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq)]
pub struct ProjectSummary<'a> {
    pub folders: usize,
    pub pages: usize,
    pub overdue: usize,
    pub upcoming: Vec<&'a Node>,
}

/// Counts by kind, overdue pages, and the next pages coming due.
pub fn summarize(nodes: &[Node], today: NaiveDate) -> ProjectSummary<'_> {
    let folders = nodes.iter().filter(|node| node.kind == NodeKind::Folder).count();
    let pages = nodes.iter().filter(|node| node.is_page()).count();
    let overdue = nodes
        .iter()
        .filter(|node| node.is_page() && node.due_date.is_some_and(|due| due < today))
        .count();

    let mut upcoming: Vec<&Node> = nodes
        .iter()
        .filter(|node| node.is_page() && node.due_date.is_some_and(|due| due >= today))
        .collect();
    upcoming.sort_by_key(|node| node.due_date);
    upcoming.truncate(UPCOMING_PAGES);

    ProjectSummary {
        folders,
        pages,
        overdue,
        upcoming,
    }
}

#[derive(Serialize)]
struct PageView<'a> {
    page: &'a Node,
    activity: Vec<&'a Activity>,
}

async fn show_page(context: &AppContext, id: &str, json: bool) -> Result<(), CliError> {
    context.require_user()?;
    let id = normalize_identifier(id, "Page ID")?;
    let mut store = load_project_nodes(context, None).await?;
    store.fetch_activities().await?;

    let page = store
        .find_node(&id)
        .filter(|node| node.is_page())
        .ok_or_else(|| CliError::NotFound {
            kind: "Page",
            id: id.to_string(),
        })?;
    let activity: Vec<&Activity> = store
        .activities()
        .iter()
        .filter(|entry| entry.node_id.as_ref() == Some(&page.id))
        .collect();

    if json {
        return print_json(&PageView { page, activity });
    }

    println!("{}", page.name);
    println!("id: {}", page.id);
    if let Some(due) = page.due_date {
        println!("due: {due}");
    }
    if !page.assignees.is_empty() {
        println!("assignees: {}", page.assignees.join(", "));
    }
    if !page.data.is_empty() {
        println!();
        println!("{}", serde_json::to_string_pretty(&page.data)?);
    }
    if !activity.is_empty() {
        let entries: Vec<Activity> = activity.into_iter().cloned().collect();
        println!();
        for line in format_activity_lines(&entries, Utc::now()) {
            println!("{line}");
        }
    }
    Ok(())
}
