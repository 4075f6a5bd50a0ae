//! Data models mirroring the remote tables

mod activity;
mod id;
mod media;
mod node;
mod project;
mod workspace;

pub use activity::{Activity, Actor, NewActivity};
pub use id::RowId;
pub use media::MediaItem;
pub use node::{DataMap, NewNode, Node, NodeKind, NodePatch};
pub use project::{NewProject, Project};
pub use workspace::{MemberRole, NewWorkspace, Workspace, WorkspaceMember};

use serde::{Deserialize, Deserializer};

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
