//! Project model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RowId;

/// A project row (`projects`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: RowId,
    pub name: String,
    pub workspace_id: RowId,
    /// `None` means every workspace member may see the project.
    #[serde(default)]
    pub allowed_user_ids: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Project {
    #[must_use]
    pub fn is_visible_to(&self, user_id: &str) -> bool {
        self.allowed_user_ids
            .as_ref()
            .map_or(true, |allowed| allowed.iter().any(|id| id == user_id))
    }
}

/// Insert payload for `projects`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProject {
    pub name: String,
    pub workspace_id: RowId,
    pub allowed_user_ids: Vec<String>,
}
