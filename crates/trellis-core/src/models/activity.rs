//! Activity feed entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RowId;
use crate::auth::AuthUser;

/// An activity row (`activities`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: RowId,
    #[serde(default)]
    pub project_id: Option<RowId>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    pub action: String,
    #[serde(default)]
    pub node_id: Option<RowId>,
    #[serde(default)]
    pub node_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub details: Option<String>,
}

/// Insert payload for `activities`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewActivity {
    pub project_id: Option<RowId>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub action: String,
    pub node_id: Option<RowId>,
    pub node_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub details: Option<String>,
}

impl NewActivity {
    /// Materialize as a local-only entry that was never sent to the backend.
    pub fn into_local(self) -> Activity {
        Activity {
            id: RowId::local(),
            project_id: self.project_id,
            user_id: self.user_id,
            user_name: self.user_name,
            action: self.action,
            node_id: self.node_id,
            node_name: self.node_name,
            timestamp: self.timestamp,
            details: self.details,
        }
    }
}

/// Who performed an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub user_name: String,
}

impl From<&AuthUser> for Actor {
    fn from(user: &AuthUser) -> Self {
        Self {
            user_id: user.id.clone(),
            user_name: user.display_name().to_string(),
        }
    }
}
