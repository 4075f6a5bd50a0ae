use std::sync::Arc;

use chrono::NaiveDate;

use super::settle;
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::models::{Activity, Actor, NewActivity, NewNode, Node, NodePatch, RowId};
use crate::rest::{decode_rows, decode_single, DataService, Filter, Query};

const NODES: &str = "nodes";
const ACTIVITIES: &str = "activities";
const ACTIVITY_FEED_LIMIT: usize = 50;

/// A local-only record of someone being (un)assigned to a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub project_id: Option<RowId>,
    pub node_id: RowId,
    pub node_name: String,
    pub assignee_name: String,
    pub assigned: bool,
}

/// Folders and pages of the selected project, the folder navigation state,
/// and the activity feed.
pub struct NodeStore<D, C = SystemClock> {
    data: Arc<D>,
    clock: C,
    nodes: Vec<Node>,
    activities: Vec<Activity>,
    selected_project: Option<RowId>,
    selected_folder: Option<RowId>,
    show_all_items: bool,
    error: Option<String>,
}

impl<D: DataService> NodeStore<D> {
    pub fn new(data: Arc<D>) -> Self {
        Self::with_clock(data, SystemClock)
    }
}

impl<D: DataService, C: Clock> NodeStore<D, C> {
    pub const fn with_clock(data: Arc<D>, clock: C) -> Self {
        Self {
            data,
            clock,
            nodes: Vec::new(),
            activities: Vec::new(),
            selected_project: None,
            selected_folder: None,
            show_all_items: false,
            error: None,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn find_node(&self, id: &RowId) -> Option<&Node> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    pub const fn selected_project_id(&self) -> Option<&RowId> {
        self.selected_project.as_ref()
    }

    pub const fn selected_folder_id(&self) -> Option<&RowId> {
        self.selected_folder.as_ref()
    }

    pub const fn show_all_items(&self) -> bool {
        self.show_all_items
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Switch project: navigation resets to the root and nodes are reloaded.
    pub async fn select_project(&mut self, id: Option<RowId>) -> Result<&[Node]> {
        self.selected_project = id;
        self.selected_folder = None;
        self.show_all_items = false;
        self.fetch_nodes().await
    }

    pub fn select_folder(&mut self, id: Option<RowId>) {
        self.selected_folder = id;
        self.show_all_items = false;
    }

    pub fn set_show_all_items(&mut self, show_all: bool) {
        self.show_all_items = show_all;
        if show_all {
            self.selected_folder = None;
        }
    }

    /// Nodes under the selected folder (or the project root), or every node
    /// when "show all" is on.
    pub fn visible_nodes(&self) -> Vec<&Node> {
        if self.show_all_items {
            return self.nodes.iter().collect();
        }
        self.nodes
            .iter()
            .filter(|node| node.parent_id.as_ref() == self.selected_folder.as_ref())
            .collect()
    }

    pub async fn fetch_nodes(&mut self) -> Result<&[Node]> {
        self.error = None;
        let Some(project_id) = self.selected_project.clone() else {
            self.nodes.clear();
            return Ok(&self.nodes);
        };

        tracing::debug!(project_id = %project_id, "Fetching nodes");
        let result = self
            .data
            .select(&Query::table(NODES).eq("project_id", &project_id))
            .await
            .and_then(decode_rows::<Node>);
        match settle(&mut self.error, "fetch_nodes", result) {
            Ok(nodes) => {
                self.nodes = nodes;
                Ok(&self.nodes)
            }
            Err(error) => {
                self.nodes.clear();
                Err(error)
            }
        }
    }

    /// Insert a node. New pages also get a local "created" feed entry
    /// attributed to `actor`.
    pub async fn add_node(&mut self, node: NewNode, actor: &Actor) -> Result<Node> {
        let result = self.insert_node(node).await;
        let node = settle(&mut self.error, "add_node", result)?;

        tracing::info!(node_id = %node.id, kind = ?node.kind, "Created node");
        self.nodes.push(node.clone());
        if node.is_page() {
            let entry = self.activity_for(actor, &node, "created", "Created new page");
            self.activities.insert(0, entry.into_local());
        }
        Ok(node)
    }

    async fn insert_node(&self, node: NewNode) -> Result<Node> {
        if node.name.trim().is_empty() {
            return Err(Error::InvalidInput("node name must not be empty".to_string()));
        }
        let rows = self.data.insert(NODES, serde_json::to_value(node)?).await?;
        decode_single(NODES, rows)
    }

    /// Apply `patch` to a node. A `data` patch is merged key by key over the
    /// node's current data rather than replacing it. Nodes outside the loaded
    /// project are read from the backend first.
    pub async fn update_node(&mut self, id: &RowId, mut patch: NodePatch) -> Result<Node> {
        if let Some(changes) = patch.data.take() {
            let current = match self.find_node(id) {
                Some(node) => Ok(node.data.clone()),
                None => self.fetch_node(id).await.map(|node| node.data),
            };
            let mut merged = settle(&mut self.error, "update_node", current)?;
            merged.extend(changes);
            patch.data = Some(merged);
        }

        let result = self.send_update(id, &patch).await;
        let node = settle(&mut self.error, "update_node", result)?;

        if let Some(slot) = self.nodes.iter_mut().find(|existing| &existing.id == id) {
            *slot = node.clone();
        }
        Ok(node)
    }

    async fn fetch_node(&self, id: &RowId) -> Result<Node> {
        let rows = self
            .data
            .select(&Query::table(NODES).eq("id", id).limit(1))
            .await?;
        decode_single(NODES, rows)
    }

    async fn send_update(&self, id: &RowId, patch: &NodePatch) -> Result<Node> {
        if patch.is_empty() {
            return Err(Error::InvalidInput("nothing to update".to_string()));
        }
        let rows = self
            .data
            .update(NODES, &[Filter::eq("id", id)], serde_json::to_value(patch)?)
            .await?;
        decode_single(NODES, rows)
    }

    pub async fn update_page_due_date(
        &mut self,
        id: &RowId,
        due_date: Option<NaiveDate>,
    ) -> Result<Node> {
        self.update_node(
            id,
            NodePatch {
                due_date: Some(due_date),
                ..NodePatch::default()
            },
        )
        .await
    }

    pub async fn delete_node(&mut self, id: &RowId) -> Result<()> {
        let result = self.data.delete(NODES, &[Filter::eq("id", id)]).await;
        settle(&mut self.error, "delete_node", result)?;

        tracing::info!(node_id = %id, "Deleted node");
        self.nodes.retain(|node| &node.id != id);
        if self.selected_folder.as_ref() == Some(id) {
            self.selected_folder = None;
        }
        Ok(())
    }

    /// Newest activity entries first.
    pub async fn fetch_activities(&mut self) -> Result<&[Activity]> {
        let result = self
            .data
            .select(
                &Query::table(ACTIVITIES)
                    .order_desc("timestamp")
                    .limit(ACTIVITY_FEED_LIMIT),
            )
            .await
            .and_then(decode_rows::<Activity>);
        match settle(&mut self.error, "fetch_activities", result) {
            Ok(activities) => {
                self.activities = activities;
                Ok(&self.activities)
            }
            Err(error) => {
                self.activities.clear();
                Err(error)
            }
        }
    }

    /// Store an activity remotely and put the stored row at the top of the
    /// feed.
    pub async fn log_activity(&mut self, activity: NewActivity) -> Result<Activity> {
        let result = self.insert_activity(activity).await;
        let stored = settle(&mut self.error, "log_activity", result)?;
        self.activities.insert(0, stored.clone());
        Ok(stored)
    }

    async fn insert_activity(&self, activity: NewActivity) -> Result<Activity> {
        let rows = self
            .data
            .insert(ACTIVITIES, serde_json::to_value(activity)?)
            .await?;
        decode_single(ACTIVITIES, rows)
    }

    /// Record an assignment change in the local feed only.
    pub fn log_assignment(&mut self, assignment: Assignment, actor: &Actor) -> &Activity {
        let (action, details) = if assignment.assigned {
            ("assigned", format!("Assigned to {}", assignment.assignee_name))
        } else {
            ("unassigned", format!("Unassigned {}", assignment.assignee_name))
        };
        let entry = NewActivity {
            project_id: assignment.project_id,
            user_id: Some(actor.user_id.clone()),
            user_name: Some(actor.user_name.clone()),
            action: action.to_string(),
            node_id: Some(assignment.node_id),
            node_name: Some(assignment.node_name),
            timestamp: self.clock.now(),
            details: Some(details),
        };
        self.activities.insert(0, entry.into_local());
        &self.activities[0]
    }

    fn activity_for(&self, actor: &Actor, node: &Node, action: &str, details: &str) -> NewActivity {
        NewActivity {
            project_id: Some(node.project_id.clone()),
            user_id: Some(actor.user_id.clone()),
            user_name: Some(actor.user_name.clone()),
            action: action.to_string(),
            node_id: Some(node.id.clone()),
            node_name: Some(node.name.clone()),
            timestamp: self.clock.now(),
            details: Some(details.to_string()),
        }
    }
}
