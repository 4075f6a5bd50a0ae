//! Node model: folders and pages inside a project

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{null_as_default, RowId};

/// Free-form page payload.
pub type DataMap = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    Page,
}

/// A node row (`nodes`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: RowId,
    pub project_id: RowId,
    #[serde(default)]
    pub parent_id: Option<RowId>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: DataMap,
    #[serde(default, deserialize_with = "null_as_default")]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Node {
    pub const fn is_page(&self) -> bool {
        matches!(self.kind, NodeKind::Page)
    }

    pub const fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder)
    }
}

/// Insert payload for `nodes`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNode {
    pub project_id: RowId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<RowId>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DataMap>,
    pub assignees: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl NewNode {
    pub fn new(project_id: RowId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            project_id,
            parent_id: None,
            name: name.into(),
            kind,
            data: None,
            assignees: Vec::new(),
            due_date: None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: Option<RowId>) -> Self {
        self.parent_id = parent_id;
        self
    }
}

/// Partial update for a node. Absent fields are left untouched; the nested
/// options send an explicit `null` to clear a column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<RowId>>,
    /// Shallow-merged over the node's existing `data` before sending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DataMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
}

impl NodePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.parent_id.is_none()
            && self.data.is_none()
            && self.assignees.is_none()
            && self.due_date.is_none()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn node_tolerates_null_payload_columns() {
        let node: Node = serde_json::from_value(json!({
            "id": 3,
            "project_id": "p1",
            "parent_id": null,
            "name": "Spec",
            "type": "page",
            "data": null,
            "assignees": null,
            "due_date": "2024-03-20",
            "extra_column": true
        }))
        .unwrap();

        assert_eq!(node.id, RowId::from("3"));
        assert!(node.is_page());
        assert!(node.data.is_empty());
        assert!(node.assignees.is_empty());
        assert_eq!(node.due_date, NaiveDate::from_ymd_opt(2024, 3, 20));
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = NodePatch {
            due_date: Some(None),
            name: Some("Renamed".to_string()),
            ..NodePatch::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({ "name": "Renamed", "due_date": null })
        );
        assert!(NodePatch::default().is_empty());
    }

    #[test]
    fn new_node_defaults_to_empty_assignees() {
        let node = NewNode::new(RowId::from("p1"), "Inbox", NodeKind::Folder);
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({
                "project_id": "p1",
                "name": "Inbox",
                "type": "folder",
                "assignees": []
            })
        );
    }
}
